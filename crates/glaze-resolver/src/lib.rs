//! Structural validation for glaze documents.
//!
//! This crate checks:
//! - Index references (every `usize` field against its target array)
//! - The node hierarchy (single parent per node, no cycles)
//! - Animation sampler keyframe counts
//! - Byte layout of buffers, buffer views and accessors
//!
//! All passes run to completion and every violation is collected into one
//! [`ValidationReport`].

mod animation;
mod hierarchy;
mod layout;
mod references;

pub use animation::check_animations;
pub use hierarchy::{build_hierarchy, Hierarchy};
pub use layout::check_layout;
pub use references::check_references;

use glaze_core::{Document, ValidationReport};

/// Validate a document and return its node hierarchy.
pub fn resolve(doc: &Document) -> Result<Hierarchy, ValidationReport> {
    let mut report = ValidationReport::new();
    check_references(doc, &mut report);
    let hierarchy = build_hierarchy(doc, &mut report);
    check_animations(doc, &mut report);
    check_layout(doc, &mut report);
    if report.is_empty() {
        Ok(hierarchy)
    } else {
        Err(report)
    }
}

/// Validate a document, discarding the hierarchy.
pub fn validate(doc: &Document) -> Result<(), ValidationReport> {
    resolve(doc).map(|_| ())
}
