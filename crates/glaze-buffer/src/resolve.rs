//! Loading buffer bytes after the JSON has been decoded.

use glaze_core::{BufferSource, CodecError, Document, Result};

use crate::loader::ResourceLoader;

/// Fill `data` for every buffer that is not yet loaded.
///
/// GLB buffers take the binary chunk, which may carry up to three padding
/// bytes past `byteLength`. External buffers go through `loader`. Data URI
/// buffers are decoded together with the JSON and are only length-checked
/// here.
pub fn resolve_buffers(
    doc: &mut Document,
    bin_chunk: Option<&[u8]>,
    loader: &dyn ResourceLoader,
) -> Result<()> {
    for (index, buffer) in doc.buffers.iter_mut().enumerate() {
        match &buffer.source {
            BufferSource::Glb => {
                let chunk = bin_chunk.ok_or(CodecError::MissingBinaryChunk { buffer: index })?;
                if chunk.len() < buffer.byte_length || chunk.len() - buffer.byte_length > 3 {
                    return Err(CodecError::BufferLengthMismatch {
                        buffer: index,
                        declared: buffer.byte_length,
                        actual: chunk.len(),
                    });
                }
                buffer.data = chunk[..buffer.byte_length].to_vec();
            }
            BufferSource::External(uri) => {
                buffer.data = loader.load(uri)?;
            }
            BufferSource::DataUri { .. } => {}
        }

        if buffer.data.len() != buffer.byte_length {
            return Err(CodecError::BufferLengthMismatch {
                buffer: index,
                declared: buffer.byte_length,
                actual: buffer.data.len(),
            });
        }
    }
    Ok(())
}

/// Bytes covered by a buffer view.
pub fn view_bytes(doc: &Document, view_index: usize) -> Result<&[u8]> {
    let view = doc.buffer_views.get(view_index).ok_or_else(|| {
        CodecError::invalid(
            format!("bufferViews[{view_index}]"),
            "buffer view does not exist",
        )
    })?;
    let buffer = doc.buffers.get(view.buffer).ok_or_else(|| {
        CodecError::invalid(
            format!("bufferViews[{view_index}].buffer"),
            format!("buffer {} does not exist", view.buffer),
        )
    })?;
    view.byte_offset
        .checked_add(view.byte_length)
        .and_then(|end| buffer.data.get(view.byte_offset..end))
        .ok_or_else(|| {
            CodecError::invalid(
                format!("bufferViews[{view_index}]"),
                format!(
                    "range {}..{} exceeds buffer {} ({} bytes)",
                    view.byte_offset,
                    view.byte_offset.saturating_add(view.byte_length),
                    view.buffer,
                    buffer.data.len()
                ),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{MemoryResources, NoResources};
    use glaze_core::{Buffer, BufferView};

    fn doc_with(source: BufferSource, byte_length: usize) -> Document {
        let mut doc = Document::new();
        doc.buffers.push(Buffer {
            byte_length,
            source,
            ..Default::default()
        });
        doc
    }

    #[test]
    fn test_glb_chunk_with_padding() {
        let mut doc = doc_with(BufferSource::Glb, 5);
        resolve_buffers(&mut doc, Some(&[1, 2, 3, 4, 5, 0, 0, 0]), &NoResources).unwrap();
        assert_eq!(doc.buffers[0].data, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_missing_binary_chunk() {
        let mut doc = doc_with(BufferSource::Glb, 4);
        let err = resolve_buffers(&mut doc, None, &NoResources).unwrap_err();
        assert!(matches!(err, CodecError::MissingBinaryChunk { buffer: 0 }));
    }

    #[test]
    fn test_glb_chunk_too_short() {
        let mut doc = doc_with(BufferSource::Glb, 12);
        let err = resolve_buffers(&mut doc, Some(&[0; 8]), &NoResources).unwrap_err();
        assert!(matches!(
            err,
            CodecError::BufferLengthMismatch {
                declared: 12,
                actual: 8,
                ..
            }
        ));
    }

    #[test]
    fn test_external_buffer() {
        let loader = MemoryResources::new().with("mesh.bin", vec![7; 6]);
        let mut doc = doc_with(BufferSource::External("mesh.bin".into()), 6);
        resolve_buffers(&mut doc, None, &loader).unwrap();
        assert_eq!(doc.buffers[0].data, vec![7; 6]);

        let mut doc = doc_with(BufferSource::External("mesh.bin".into()), 8);
        assert!(matches!(
            resolve_buffers(&mut doc, None, &loader),
            Err(CodecError::BufferLengthMismatch { .. })
        ));
    }

    #[test]
    fn test_external_buffer_not_found() {
        let mut doc = doc_with(BufferSource::External("gone.bin".into()), 4);
        let err = resolve_buffers(&mut doc, None, &NoResources).unwrap_err();
        match err {
            CodecError::ResourceNotFound(e) => assert_eq!(e.uri, "gone.bin"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_view_bytes_bounds() {
        let mut doc = doc_with(BufferSource::Glb, 4);
        doc.buffers[0].data = vec![1, 2, 3, 4];
        doc.buffer_views.push(BufferView {
            buffer: 0,
            byte_offset: 1,
            byte_length: 2,
            ..Default::default()
        });
        doc.buffer_views.push(BufferView {
            buffer: 0,
            byte_offset: 3,
            byte_length: 2,
            ..Default::default()
        });
        assert_eq!(view_bytes(&doc, 0).unwrap(), &[2, 3]);
        assert!(view_bytes(&doc, 1).is_err());
        assert!(view_bytes(&doc, 2).is_err());

        doc.buffer_views[1].byte_offset = usize::MAX;
        assert!(view_bytes(&doc, 1).is_err());
    }
}
