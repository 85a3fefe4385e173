//! GLB binary container.
//!
//! ```text
//! header:  magic u32 | version u32 | length u32
//! chunk:   chunkLength u32 | chunkType u32 | data[chunkLength]
//! ```
//!
//! All integers are little-endian. The first chunk must be JSON; an optional
//! BIN chunk follows. Chunk data is padded to a 4-byte boundary: JSON with
//! spaces, BIN with zeros. Chunks of unknown type are skipped.

use byteorder::{ByteOrder, LittleEndian};
use glaze_core::{CodecError, Result};

/// GLB magic number, "glTF" in little-endian.
pub const GLB_MAGIC: u32 = 0x46546C67;
/// Supported container version.
pub const GLB_VERSION: u32 = 2;
/// JSON chunk type, "JSON".
pub const CHUNK_JSON: u32 = 0x4E4F534A;
/// Binary chunk type, "BIN\0".
pub const CHUNK_BIN: u32 = 0x004E4942;

const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

/// The chunks of a GLB file, borrowed from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlbChunks<'a> {
    /// JSON chunk including any trailing space padding.
    pub json: &'a [u8],
    /// BIN chunk including any trailing zero padding.
    pub bin: Option<&'a [u8]>,
}

/// Whether `data` starts with the GLB magic.
pub fn is_glb(data: &[u8]) -> bool {
    data.len() >= 4 && LittleEndian::read_u32(&data[0..4]) == GLB_MAGIC
}

/// Split a GLB file into its chunks.
pub fn read_glb(data: &[u8]) -> Result<GlbChunks<'_>> {
    if data.len() < HEADER_LEN {
        return Err(CodecError::truncated(format!(
            "GLB header needs {HEADER_LEN} bytes, got {}",
            data.len()
        )));
    }

    let magic = LittleEndian::read_u32(&data[0..4]);
    if magic != GLB_MAGIC {
        return Err(CodecError::BadMagic { found: magic });
    }
    let version = LittleEndian::read_u32(&data[4..8]);
    if version != GLB_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    let length = LittleEndian::read_u32(&data[8..12]) as usize;
    if length > data.len() {
        return Err(CodecError::truncated(format!(
            "GLB header declares {length} bytes, got {}",
            data.len()
        )));
    }
    let data = &data[..length];

    let mut offset = HEADER_LEN;
    let mut json: Option<&[u8]> = None;
    let mut bin: Option<&[u8]> = None;

    while offset < data.len() {
        if offset + CHUNK_HEADER_LEN > data.len() {
            return Err(CodecError::truncated(format!(
                "chunk header at byte {offset}"
            )));
        }
        let chunk_length = LittleEndian::read_u32(&data[offset..offset + 4]) as usize;
        let chunk_type = LittleEndian::read_u32(&data[offset + 4..offset + 8]);
        offset += CHUNK_HEADER_LEN;

        let end = offset
            .checked_add(chunk_length)
            .filter(|end| *end <= data.len())
            .ok_or_else(|| {
                CodecError::truncated(format!(
                    "chunk at byte {} declares {chunk_length} bytes",
                    offset - CHUNK_HEADER_LEN
                ))
            })?;
        let chunk = &data[offset..end];

        match chunk_type {
            CHUNK_JSON if json.is_none() && bin.is_none() => json = Some(chunk),
            CHUNK_JSON => return Err(CodecError::InvalidChunk("unexpected second JSON chunk".into())),
            _ if json.is_none() => {
                return Err(CodecError::InvalidChunk(format!(
                    "first chunk must be JSON, found type {chunk_type:#010x}"
                )))
            }
            CHUNK_BIN if bin.is_none() => bin = Some(chunk),
            CHUNK_BIN => return Err(CodecError::InvalidChunk("unexpected second BIN chunk".into())),
            _ => {}
        }

        offset = align4(end);
    }

    let json = json.ok_or_else(|| CodecError::InvalidChunk("missing JSON chunk".into()))?;
    Ok(GlbChunks { json, bin })
}

/// Assemble a GLB file from JSON text and an optional binary chunk.
///
/// Fails when the container would not fit the 32-bit length fields.
pub fn write_glb(json: &[u8], bin: Option<&[u8]>) -> Result<Vec<u8>> {
    let json_padded = align4(json.len());
    let bin_padded = bin.map(|b| align4(b.len()));
    let total = HEADER_LEN
        + CHUNK_HEADER_LEN
        + json_padded
        + bin_padded.map_or(0, |len| CHUNK_HEADER_LEN + len);

    let total_field = length_field("GLB file", total)?;
    let json_field = length_field("JSON chunk", json_padded)?;
    let bin_field = bin_padded.map(|len| length_field("BIN chunk", len)).transpose()?;

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&total_field.to_le_bytes());

    out.extend_from_slice(&json_field.to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(json);
    out.resize(out.len() + json_padded - json.len(), b' ');

    if let (Some(bin), Some(bin_padded), Some(bin_field)) = (bin, bin_padded, bin_field) {
        out.extend_from_slice(&bin_field.to_le_bytes());
        out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        out.extend_from_slice(bin);
        out.resize(out.len() + bin_padded - bin.len(), 0);
    }

    Ok(out)
}

fn length_field(what: &str, len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        CodecError::InvalidChunk(format!("{what} of {len} bytes exceeds the 4 GiB GLB limit"))
    })
}

/// Round up to the next multiple of 4.
pub fn align4(n: usize) -> usize {
    (n + 3) & !3
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_json_chunk_padded_with_spaces() {
        let json = vec![b'x'; 101];
        let glb = write_glb(&json, None).unwrap();

        let chunk_length = LittleEndian::read_u32(&glb[12..16]);
        assert_eq!(chunk_length, 104);
        assert_eq!(&glb[20 + 101..20 + 104], b"   ");
        assert_eq!(LittleEndian::read_u32(&glb[8..12]) as usize, glb.len());
        assert_eq!(glb.len(), 12 + 8 + 104);
    }

    #[test]
    fn test_bin_chunk_padded_with_zeros() {
        let glb = write_glb(b"{}", Some(&[1, 2, 3, 4, 5])).unwrap();
        let chunks = read_glb(&glb).unwrap();
        assert_eq!(chunks.json, b"{}  ");
        assert_eq!(chunks.bin, Some(&[1u8, 2, 3, 4, 5, 0, 0, 0][..]));
    }

    #[test]
    fn test_bad_magic() {
        let mut glb = write_glb(b"{}", None).unwrap();
        glb[0] = b'X';
        assert!(matches!(read_glb(&glb), Err(CodecError::BadMagic { .. })));
        assert!(!is_glb(&glb));
    }

    #[test]
    fn test_unsupported_version() {
        let mut glb = write_glb(b"{}", None).unwrap();
        glb[4] = 1;
        assert!(matches!(read_glb(&glb), Err(CodecError::UnsupportedVersion(1))));
    }

    #[test]
    fn test_truncated_chunk() {
        let glb = write_glb(b"{\"asset\":{}}", Some(&[0; 16])).unwrap();
        let mut cut = glb[..glb.len() - 4].to_vec();
        let len = cut.len() as u32;
        cut[8..12].copy_from_slice(&len.to_le_bytes());
        assert!(matches!(read_glb(&cut), Err(CodecError::Truncated { .. })));
        assert!(matches!(read_glb(&glb[..8]), Err(CodecError::Truncated { .. })));
    }

    #[test]
    fn test_first_chunk_must_be_json() {
        let mut glb = write_glb(b"{}", None).unwrap();
        glb[16..20].copy_from_slice(&CHUNK_BIN.to_le_bytes());
        assert!(matches!(read_glb(&glb), Err(CodecError::InvalidChunk(_))));
    }

    #[test]
    fn test_unknown_chunk_skipped() {
        let mut glb = write_glb(b"{}", Some(&[9; 4])).unwrap();
        glb.extend_from_slice(&4u32.to_le_bytes());
        glb.extend_from_slice(&0x12345678u32.to_le_bytes());
        glb.extend_from_slice(&[7; 4]);
        let len = glb.len() as u32;
        glb[8..12].copy_from_slice(&len.to_le_bytes());

        let chunks = read_glb(&glb).unwrap();
        assert_eq!(chunks.bin, Some(&[9u8; 4][..]));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_length_over_4gib_is_an_error() {
        assert_eq!(length_field("JSON chunk", u32::MAX as usize).unwrap(), u32::MAX);
        assert!(matches!(
            length_field("GLB file", u32::MAX as usize + 1),
            Err(CodecError::InvalidChunk(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_glb_chunks_aligned(json_len in 0usize..300, bin_len in proptest::option::of(0usize..300)) {
            let json = vec![b'a'; json_len];
            let bin = bin_len.map(|n| vec![0xAB; n]);
            let glb = write_glb(&json, bin.as_deref()).unwrap();

            prop_assert_eq!(glb.len() % 4, 0);
            let chunks = read_glb(&glb).unwrap();
            prop_assert_eq!(chunks.json.len(), align4(json_len));
            prop_assert_eq!(&chunks.json[..json_len], &json[..]);
            prop_assert!(chunks.json[json_len..].iter().all(|b| *b == b' '));
            if let Some(bin) = &bin {
                let got = chunks.bin.unwrap();
                prop_assert_eq!(got.len(), align4(bin.len()));
                prop_assert_eq!(&got[..bin.len()], &bin[..]);
            }
        }
    }
}
