//! Parse and emit pipelines bound to one diagnostics sink.

use glaze_buffer::{is_glb, read_glb, resolve_buffers, write_glb, ResourceLoader, ResourceWriter};
use glaze_core::{
    BufferSource, DiagnosticSink, Document, ExtensionHook, NoHooks, Profiler, Result,
};
use glaze_json::{decode_document, encode_document, parse_json, to_json_bytes, EncodeOptions};

use crate::options::{Container, EmitOptions, ParseOptions};

/// One caller's codec state: options, a diagnostics sink, an optional
/// extension hook and a profiler.
///
/// Sessions hold no global state; use one per thread.
pub struct Session<'a> {
    parse_options: ParseOptions,
    emit_options: EmitOptions,
    sink: &'a mut dyn DiagnosticSink,
    hooks: Option<&'a mut dyn ExtensionHook>,
    profiler: Profiler,
}

impl<'a> Session<'a> {
    pub fn new(sink: &'a mut dyn DiagnosticSink) -> Self {
        Self {
            parse_options: ParseOptions::default(),
            emit_options: EmitOptions::default(),
            sink,
            hooks: None,
            profiler: Profiler::new(),
        }
    }

    /// Run `hooks` on every node, material and animation channel.
    pub fn with_hooks(mut self, hooks: &'a mut dyn ExtensionHook) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse_options = options;
        self
    }

    pub fn with_emit_options(mut self, options: EmitOptions) -> Self {
        self.emit_options = options;
        self
    }

    pub fn parse_options(&self) -> &ParseOptions {
        &self.parse_options
    }

    pub fn emit_options(&self) -> &EmitOptions {
        &self.emit_options
    }

    pub fn sink(&mut self) -> &mut dyn DiagnosticSink {
        &mut *self.sink
    }

    /// Decode GLB or JSON bytes into a document.
    ///
    /// External buffers are fetched through `loader`.
    pub fn parse(&mut self, bytes: &[u8], loader: &dyn ResourceLoader) -> Result<Document> {
        self.profiler.start(&mut *self.sink);
        let result = self.parse_inner(bytes, loader);
        self.profiler.end("parse", &mut *self.sink);
        result
    }

    fn parse_inner(&mut self, bytes: &[u8], loader: &dyn ResourceLoader) -> Result<Document> {
        let (json, bin) = if is_glb(bytes) {
            let chunks = read_glb(bytes)?;
            (chunks.json, chunks.bin)
        } else {
            (bytes, None)
        };

        let value = parse_json(json)?;
        let mut fallback = NoHooks;
        let hooks: &mut dyn ExtensionHook = match self.hooks.as_deref_mut() {
            Some(hooks) => hooks,
            None => &mut fallback,
        };
        let mut doc = decode_document(&value, hooks, &mut *self.sink)?;
        resolve_buffers(&mut doc, bin, loader)?;

        if self.parse_options.validate {
            glaze_resolver::validate(&doc)?;
        }
        self.sink.debug(format!(
            "parsed {} nodes, {} meshes, {} buffers",
            doc.nodes.len(),
            doc.meshes.len(),
            doc.buffers.len()
        ));
        Ok(doc)
    }

    /// Encode a document in the configured container.
    ///
    /// Bytes of external buffers are handed to `writer`.
    pub fn emit(&mut self, doc: &Document, writer: &mut dyn ResourceWriter) -> Result<Vec<u8>> {
        self.profiler.start(&mut *self.sink);
        let result = self.emit_inner(doc, writer);
        self.profiler.end("emit", &mut *self.sink);
        result
    }

    fn emit_inner(&mut self, doc: &Document, writer: &mut dyn ResourceWriter) -> Result<Vec<u8>> {
        let options = self.emit_options.clone();
        if options.validate {
            glaze_resolver::validate(doc)?;
        }

        let encode_options = EncodeOptions {
            embed_glb_buffer: options.container == Container::Json,
        };
        let mut fallback = NoHooks;
        let hooks: &mut dyn ExtensionHook = match self.hooks.as_deref_mut() {
            Some(hooks) => hooks,
            None => &mut fallback,
        };
        let value = encode_document(doc, &encode_options, hooks, &mut *self.sink)?;

        for buffer in &doc.buffers {
            if let BufferSource::External(uri) = &buffer.source {
                writer.store(uri, &buffer.data)?;
            }
        }

        let json = to_json_bytes(&value, options.pretty)?;
        Ok(match options.container {
            Container::Json => json,
            Container::Glb => {
                let bin = doc
                    .buffers
                    .iter()
                    .find(|b| b.source == BufferSource::Glb)
                    .map(|b| b.data.as_slice());
                write_glb(&json, bin)?
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glaze_buffer::{MemoryResources, NoResources};
    use glaze_core::{Buffer, CodecError, MemorySink, Severity};

    #[test]
    fn test_profiler_reports_each_call() {
        let mut sink = MemorySink::new();
        let mut session = Session::new(&mut sink);
        let bytes = session.emit(&Document::new(), &mut NoResources).unwrap();
        session.parse(&bytes, &NoResources).unwrap();
        let profile: Vec<_> = sink.of(Severity::Profile).map(|d| d.message.clone()).collect();
        assert_eq!(profile.len(), 2);
        assert!(profile[0].starts_with("Delta time: ") && profile[0].ends_with("(emit)"));
        assert!(profile[1].ends_with("(parse)"));
        assert!(!sink.has_errors());
    }

    #[test]
    fn test_failed_parse_leaves_profiler_idle() {
        let mut sink = MemorySink::new();
        let mut session = Session::new(&mut sink);
        assert!(session.parse(b"{", &NoResources).is_err());
        assert!(session.parse(br#"{"asset":{"version":"2.0"}}"#, &NoResources).is_ok());
        assert!(!sink.has_errors());
    }

    #[test]
    fn test_external_buffers_go_to_writer() {
        let mut doc = Document::new();
        doc.buffers
            .push(Buffer::with_data(BufferSource::External("mesh.bin".into()), vec![1, 2, 3, 4]));

        let mut resources = MemoryResources::new();
        let mut sink = MemorySink::new();
        let mut session = Session::new(&mut sink).with_emit_options(EmitOptions::new().json());
        let bytes = session.emit(&doc, &mut resources).unwrap();
        assert_eq!(resources.get("mesh.bin"), Some(&[1u8, 2, 3, 4][..]));

        let parsed = session.parse(&bytes, &resources).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_missing_external_buffer() {
        let json = br#"{"asset":{"version":"2.0"},"buffers":[{"uri":"gone.bin","byteLength":4}]}"#;
        let mut sink = MemorySink::new();
        let err = Session::new(&mut sink).parse(json, &NoResources).unwrap_err();
        assert!(matches!(err, CodecError::ResourceNotFound(e) if e.uri == "gone.bin"));
    }

    #[test]
    fn test_validation_can_be_skipped() {
        let json = br#"{"asset":{"version":"2.0"},"scene":3}"#;
        let mut sink = MemorySink::new();
        let mut session = Session::new(&mut sink);
        assert!(matches!(
            session.parse(json, &NoResources),
            Err(CodecError::Validation(_))
        ));
        let mut session = session.with_parse_options(ParseOptions::new().without_validation());
        assert_eq!(session.parse(json, &NoResources).unwrap().scene, Some(3));
    }
}
