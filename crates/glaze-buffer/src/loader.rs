//! Resource capabilities supplied by the caller.
//!
//! The codec performs no I/O of its own. External buffer and image URIs are
//! turned into bytes by a [`ResourceLoader`], and external buffers produced by
//! emit are handed to a [`ResourceWriter`].

use glaze_core::{CodecError, ResourceNotFound, Result};
use indexmap::IndexMap;

/// Resolves a relative or absolute URI to bytes.
pub trait ResourceLoader {
    fn load(&self, uri: &str) -> std::result::Result<Vec<u8>, ResourceNotFound>;
}

/// Receives the bytes of external resources written by emit.
pub trait ResourceWriter {
    fn store(&mut self, uri: &str, bytes: &[u8]) -> Result<()>;
}

/// Loader and writer with no backing store.
///
/// Loading always fails with [`ResourceNotFound`]; storing fails with
/// [`CodecError::ResourceWrite`]. Suitable for self-contained GLB files.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResources;

impl ResourceLoader for NoResources {
    fn load(&self, uri: &str) -> std::result::Result<Vec<u8>, ResourceNotFound> {
        Err(ResourceNotFound::new(uri))
    }
}

impl ResourceWriter for NoResources {
    fn store(&mut self, uri: &str, _bytes: &[u8]) -> Result<()> {
        Err(CodecError::ResourceWrite {
            uri: uri.to_string(),
            reason: "no resource writer configured".into(),
        })
    }
}

/// In-memory resource map, keyed by URI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryResources {
    entries: IndexMap<String, Vec<u8>>,
}

impl MemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource, replacing any previous bytes for `uri`.
    pub fn insert(&mut self, uri: impl Into<String>, bytes: Vec<u8>) {
        self.entries.insert(uri.into(), bytes);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, uri: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(uri, bytes);
        self
    }

    pub fn get(&self, uri: &str) -> Option<&[u8]> {
        self.entries.get(uri).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl ResourceLoader for MemoryResources {
    fn load(&self, uri: &str) -> std::result::Result<Vec<u8>, ResourceNotFound> {
        self.entries
            .get(uri)
            .cloned()
            .ok_or_else(|| ResourceNotFound::new(uri))
    }
}

impl ResourceWriter for MemoryResources {
    fn store(&mut self, uri: &str, bytes: &[u8]) -> Result<()> {
        self.insert(uri, bytes.to_vec());
        Ok(())
    }
}
