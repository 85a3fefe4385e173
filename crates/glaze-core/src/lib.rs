//! glaze-core: document model and shared infrastructure for the glaze glTF codec.
//!
//! This crate holds everything the other glaze crates agree on:
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`document`] | Typed glTF 2.0 entities and the [`Document`] root |
//! | [`types`] | Enumerated constants (component types, modes, filters) |
//! | [`errors`] | [`CodecError`], [`ValidationError`] and friends |
//! | [`diagnostics`] | Per-session [`DiagnosticSink`] and [`Profiler`] |
//! | [`hooks`] | [`ExtensionHook`] for vendor extensions |

pub mod diagnostics;
pub mod document;
pub mod errors;
pub mod hooks;
pub mod types;

pub use diagnostics::{Diagnostic, DiagnosticSink, MemorySink, NullSink, Profiler, Severity, TracingSink};
pub use document::*;
pub use errors::{CodecError, ResourceNotFound, Result, TypeMismatch, ValidationError, ValidationReport};
pub use hooks::{ExtensionHook, HookChain, HookContext, HookPhase, NoHooks};
pub use types::{
    AccessorType, AlphaMode, BufferTarget, ComponentType, EntityKind, Interpolation, MagFilter,
    MinFilter, NamedEnum, NumericEnum, PrimitiveMode, TargetPath, WrapMode,
};
