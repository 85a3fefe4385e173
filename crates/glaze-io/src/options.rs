//! Parse, emit and export options.

use serde::{Deserialize, Serialize};

/// Output container for emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    /// Binary `.glb`: JSON chunk plus an optional BIN chunk.
    #[default]
    Glb,
    /// Plain `.gltf` JSON text.
    Json,
}

/// Options for parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Run the resolver after decoding.
    pub validate: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { validate: true }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip structural validation.
    pub fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }
}

/// Options for emitting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitOptions {
    pub container: Container,
    /// Pretty-print the JSON text.
    pub pretty: bool,
    /// Run the resolver before encoding.
    pub validate: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            container: Container::Glb,
            pretty: false,
            validate: true,
        }
    }
}

impl EmitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a binary GLB container.
    pub fn glb(mut self) -> Self {
        self.container = Container::Glb;
        self
    }

    /// Emit plain JSON text.
    pub fn json(mut self) -> Self {
        self.container = Container::Json;
        self
    }

    /// Pretty-print output.
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// Skip structural validation.
    pub fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }
}

/// Options for building a document from a host scene.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Copy host `extras` onto nodes and materials.
    pub include_extras: bool,
    /// Value for `asset.generator`.
    pub generator: Option<String>,
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy host extras into the document.
    pub fn with_extras(mut self) -> Self {
        self.include_extras = true;
        self
    }

    /// Set the generator string.
    pub fn with_generator(mut self, generator: impl Into<String>) -> Self {
        self.generator = Some(generator.into());
        self
    }
}
