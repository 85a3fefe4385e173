//! `data:` URIs (RFC 2397).
//!
//! glTF embeds buffers and images as `data:<mime>;base64,<payload>`. Plain
//! percent-encoded payloads are accepted on input; output is always base64.

use base64::Engine;
use glaze_core::{CodecError, Result};
use nom::{
    bytes::complete::{tag_no_case, take_till},
    character::complete::char,
    multi::many0,
    sequence::preceded,
    IResult,
};

/// MIME type used for emitted buffer data URIs.
pub const OCTET_STREAM: &str = "application/octet-stream";
/// Alternate MIME type glTF allows for buffers.
pub const GLTF_BUFFER: &str = "application/gltf-buffer";

/// A decoded data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Whether `uri` uses the `data:` scheme.
pub fn is_data_uri(uri: &str) -> bool {
    uri.get(..5)
        .map_or(false, |scheme| scheme.eq_ignore_ascii_case("data:"))
}

fn is_delimiter(c: char) -> bool {
    c == ';' || c == ','
}

/// `data:` mediatype *(";" parameter) ","
fn header(input: &str) -> IResult<&str, (&str, Vec<&str>)> {
    let (input, _) = tag_no_case("data:")(input)?;
    let (input, mime) = take_till(is_delimiter)(input)?;
    let (input, params) = many0(preceded(char(';'), take_till(is_delimiter)))(input)?;
    let (input, _) = char(',')(input)?;
    Ok((input, (mime, params)))
}

/// Decode a data URI into its MIME type and bytes.
pub fn decode_data_uri(uri: &str) -> Result<DataUri> {
    let (payload, (mime, params)) = header(uri).map_err(|_| CodecError::InvalidDataUri {
        reason: "malformed header".into(),
    })?;

    let is_base64 = params.iter().any(|p| p.eq_ignore_ascii_case("base64"));
    let data = if is_base64 {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| CodecError::InvalidDataUri {
                reason: e.to_string(),
            })?
    } else {
        percent_decode(payload)?
    };

    Ok(DataUri {
        mime_type: mime.to_string(),
        data,
    })
}

/// Encode bytes as a base64 data URI.
pub fn encode_data_uri(mime_type: &str, data: &[u8]) -> String {
    let payload = base64::engine::general_purpose::STANDARD.encode(data);
    format!("data:{mime_type};base64,{payload}")
}

/// Decode `%XX` escapes; other bytes pass through.
pub fn percent_decode(input: &str) -> Result<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| Some((hex_digit(h[0])? << 4) | hex_digit(h[1])?))
                .ok_or_else(|| CodecError::InvalidDataUri {
                    reason: format!("bad percent escape at offset {i}"),
                })?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64() {
        let uri = "data:application/octet-stream;base64,AAECAw==";
        let decoded = decode_data_uri(uri).unwrap();
        assert_eq!(decoded.mime_type, OCTET_STREAM);
        assert_eq!(decoded.data, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_decode_percent_encoded() {
        let decoded = decode_data_uri("data:text/plain,a%20b%2Cc").unwrap();
        assert_eq!(decoded.mime_type, "text/plain");
        assert_eq!(decoded.data, b"a b,c");
    }

    #[test]
    fn test_empty_mime_and_extra_params() {
        let decoded = decode_data_uri("DATA:;charset=x;base64,/w==").unwrap();
        assert_eq!(decoded.mime_type, "");
        assert_eq!(decoded.data, vec![0xFF]);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            decode_data_uri("data:application/octet-stream;base64"),
            Err(CodecError::InvalidDataUri { .. })
        ));
        assert!(matches!(
            decode_data_uri("data:;base64,@@@"),
            Err(CodecError::InvalidDataUri { .. })
        ));
        assert!(matches!(
            decode_data_uri("data:,%4"),
            Err(CodecError::InvalidDataUri { .. })
        ));
    }

    #[test]
    fn test_encode_matches_decode() {
        let uri = encode_data_uri(GLTF_BUFFER, &[10, 20, 30]);
        assert_eq!(uri, "data:application/gltf-buffer;base64,ChQe");
        assert!(is_data_uri(&uri));
        assert!(!is_data_uri("buffer.bin"));
        assert_eq!(decode_data_uri(&uri).unwrap().data, vec![10, 20, 30]);
    }
}
