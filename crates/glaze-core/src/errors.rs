//! Error types for the glaze codec.

use crate::types::EntityKind;
use thiserror::Error;

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Top-level error type for parsing and emitting glTF documents.
///
/// Every variant is fatal for the operation that raised it; no partial
/// document is returned.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid GLB magic: {found:#010x}")]
    BadMagic { found: u32 },

    #[error("unsupported GLB version: {0}")]
    UnsupportedVersion(u32),

    #[error("truncated input: {context}")]
    Truncated { context: String },

    #[error("invalid GLB chunk: {0}")]
    InvalidChunk(String),

    #[error("JSON chunk is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("invalid data URI: {reason}")]
    InvalidDataUri { reason: String },

    #[error("JSON syntax error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    TypeMismatch(#[from] TypeMismatch),

    #[error("no decoder accepted `{path}`: {}", .attempts.join("; "))]
    UnionMismatch { path: String, attempts: Vec<String> },

    #[error("missing required field `{path}`")]
    MissingField { path: String },

    #[error("invalid value at `{path}`: {reason}")]
    InvalidValue { path: String, reason: String },

    #[error("buffer {buffer} is stored in the GLB binary chunk, but the input has none")]
    MissingBinaryChunk { buffer: usize },

    #[error("buffer {buffer} declares {declared} bytes but {actual} were resolved")]
    BufferLengthMismatch {
        buffer: usize,
        declared: usize,
        actual: usize,
    },

    #[error(transparent)]
    ResourceNotFound(#[from] ResourceNotFound),

    #[error("failed to store resource `{uri}`: {reason}")]
    ResourceWrite { uri: String, reason: String },

    #[error("accessor {accessor}: {reason}")]
    Accessor { accessor: usize, reason: String },

    #[error(transparent)]
    Validation(#[from] ValidationReport),

    #[error("extension hook failed on {kind} {index}: {reason}")]
    Hook {
        kind: EntityKind,
        index: usize,
        reason: String,
    },
}

impl CodecError {
    /// Create an invalid-value error at a field path.
    pub fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a truncation error.
    pub fn truncated(context: impl Into<String>) -> Self {
        Self::Truncated {
            context: context.into(),
        }
    }

    /// Create an accessor error.
    pub fn accessor(accessor: usize, reason: impl Into<String>) -> Self {
        Self::Accessor {
            accessor,
            reason: reason.into(),
        }
    }
}

/// A JSON value had the wrong type for the field it was read into.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("type mismatch at `{path}`: expected {expected}, found {actual}")]
pub struct TypeMismatch {
    /// Dotted field path, e.g. `meshes[0].primitives[1].indices`.
    pub path: String,
    pub expected: String,
    pub actual: String,
}

/// A resource loader could not produce bytes for a URI.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("resource not found: {uri}")]
pub struct ResourceNotFound {
    pub uri: String,
}

impl ResourceNotFound {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

/// A structural violation found by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{kind} {index}: `{field}` = {value} is out of range ({target} count is {len})")]
    DanglingIndex {
        kind: EntityKind,
        index: usize,
        /// Field path of the reference, e.g. `nodes[3].mesh`.
        field: String,
        target: EntityKind,
        value: usize,
        len: usize,
    },

    #[error("cyclic node hierarchy: {}", format_cycle(.cycle))]
    CyclicHierarchy { cycle: Vec<usize> },

    #[error("node {node} is a child of both node {first} and node {second}")]
    MultipleParents {
        node: usize,
        first: usize,
        second: usize,
    },

    #[error("{kind} {index}: {reason}")]
    OutOfBounds {
        kind: EntityKind,
        index: usize,
        reason: String,
    },

    #[error(
        "animation {animation} sampler {sampler}: CUBICSPLINE output has {output_count} elements, expected {expected}"
    )]
    CubicSplineCount {
        animation: usize,
        sampler: usize,
        output_count: usize,
        expected: usize,
    },

    #[error(
        "animation {animation} sampler {sampler}: output has {output_count} elements, expected {expected}"
    )]
    SamplerCount {
        animation: usize,
        sampler: usize,
        output_count: usize,
        expected: usize,
    },

    #[error("{kind} {index}: {reason}")]
    InvalidStructure {
        kind: EntityKind,
        index: usize,
        reason: String,
    },
}

impl ValidationError {
    /// The entity the violation is attached to, if it names a single one.
    pub fn entity(&self) -> Option<(EntityKind, usize)> {
        match self {
            Self::DanglingIndex { kind, index, .. }
            | Self::OutOfBounds { kind, index, .. }
            | Self::InvalidStructure { kind, index, .. } => Some((*kind, *index)),
            Self::MultipleParents { node, .. } => Some((EntityKind::Node, *node)),
            Self::CyclicHierarchy { cycle } => cycle.first().map(|n| (EntityKind::Node, *n)),
            Self::CubicSplineCount { animation, .. } | Self::SamplerCount { animation, .. } => {
                Some((EntityKind::Animation, *animation))
            }
        }
    }
}

fn format_cycle(cycle: &[usize]) -> String {
    cycle
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Every violation found in one resolver pass.
#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
#[error("{} validation error(s): {}", .errors.len(), format_report(.errors))]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.errors.iter()
    }

    /// Turn an empty report into `Ok`.
    pub fn into_result(self) -> std::result::Result<(), ValidationReport> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn format_report(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
