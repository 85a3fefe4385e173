//! glaze-io: parse and emit glTF 2.0 documents.
//!
//! | Entry point | Purpose |
//! |-------------|---------|
//! | [`parse`] / [`emit`] | One-shot codec calls logging through `tracing` |
//! | [`Session`] | Options, diagnostics sink, hooks and profiling for repeated calls |
//! | [`walk_scene`] | Import-side traversal with world transforms |
//! | [`export_scene`] | Build a document from a host scene graph |
//!
//! The container is detected from the first four bytes: `glTF` means GLB,
//! anything else is treated as JSON text.

mod export;
pub mod options;
mod resources;
mod session;
mod walk;

pub use export::{
    export_scene, HostAnimation, HostChannel, HostMaterial, HostMesh, HostNode, HostPrimitive,
    SceneSource,
};
pub use options::{Container, EmitOptions, ExportOptions, ParseOptions};
pub use resources::DirectoryResources;
pub use session::Session;
pub use walk::{image_bytes, primitive_attribute, walk_scene, SceneVisitor};

pub use glaze_buffer::{MemoryResources, NoResources, ResourceLoader, ResourceWriter};
pub use glaze_core::{CodecError, DiagnosticSink, Document, ExtensionHook, Result};

use glaze_core::TracingSink;

/// Container of the given bytes.
pub fn detect(bytes: &[u8]) -> Container {
    if glaze_buffer::is_glb(bytes) {
        Container::Glb
    } else {
        Container::Json
    }
}

/// Parse GLB or JSON bytes with default options.
pub fn parse(bytes: &[u8], loader: &dyn ResourceLoader) -> Result<Document> {
    let mut sink = TracingSink;
    Session::new(&mut sink).parse(bytes, loader)
}

/// Emit a document as GLB with default options.
pub fn emit(doc: &Document, writer: &mut dyn ResourceWriter) -> Result<Vec<u8>> {
    emit_with(doc, &EmitOptions::default(), writer)
}

pub fn emit_with(doc: &Document, options: &EmitOptions, writer: &mut dyn ResourceWriter) -> Result<Vec<u8>> {
    let mut sink = TracingSink;
    Session::new(&mut sink)
        .with_emit_options(options.clone())
        .emit(doc, writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        let glb = emit(&Document::new(), &mut NoResources).unwrap();
        assert_eq!(detect(&glb), Container::Glb);
        assert_eq!(detect(br#"{"asset":{"version":"2.0"}}"#), Container::Json);
        assert_eq!(detect(b"gl"), Container::Json);
    }

    #[test]
    fn test_json_emit_is_text() {
        let bytes = emit_with(&Document::new(), &EmitOptions::new().json(), &mut NoResources).unwrap();
        assert_eq!(bytes, br#"{"asset":{"version":"2.0"}}"#);
        assert_eq!(parse(&bytes, &NoResources).unwrap(), Document::new());
    }
}
