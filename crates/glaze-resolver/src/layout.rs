//! Byte ranges, strides and other structural rules.

use glaze_core::{
    Accessor, BufferSource, ComponentType, Document, EntityKind, ValidationError,
    ValidationReport,
};
use indexmap::IndexSet;

const MIN_STRIDE: usize = 4;
const MAX_STRIDE: usize = 252;

/// Check asset metadata, buffers, buffer views, accessors, meshes and skins.
///
/// References that are out of range are skipped here; the reference pass
/// reports them.
pub fn check_layout(doc: &Document, report: &mut ValidationReport) {
    check_asset(doc, report);
    check_buffers(doc, report);
    check_buffer_views(doc, report);
    for (i, accessor) in doc.accessors.iter().enumerate() {
        check_accessor(doc, i, accessor, report);
    }
    for (i, mesh) in doc.meshes.iter().enumerate() {
        if mesh.primitives.is_empty() {
            report.push(structure(EntityKind::Mesh, i, "mesh has no primitives"));
        }
        for (j, prim) in mesh.primitives.iter().enumerate() {
            let Some(indices) = prim.indices.and_then(|a| doc.accessors.get(a)) else {
                continue;
            };
            let unsigned = matches!(
                indices.component_type,
                ComponentType::U8 | ComponentType::U16 | ComponentType::U32
            );
            if indices.accessor_type != glaze_core::AccessorType::Scalar || !unsigned {
                report.push(structure(
                    EntityKind::Mesh,
                    i,
                    format!("primitive {j} indices must be unsigned integer scalars"),
                ));
            }
        }
    }
    for (i, skin) in doc.skins.iter().enumerate() {
        if skin.joints.is_empty() {
            report.push(structure(EntityKind::Skin, i, "skin has no joints"));
        }
    }
}

fn structure(kind: EntityKind, index: usize, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidStructure {
        kind,
        index,
        reason: reason.into(),
    }
}

fn out_of_bounds(kind: EntityKind, index: usize, reason: impl Into<String>) -> ValidationError {
    ValidationError::OutOfBounds {
        kind,
        index,
        reason: reason.into(),
    }
}

fn check_asset(doc: &Document, report: &mut ValidationReport) {
    let major = doc.asset.version.split('.').next().and_then(|m| m.parse::<u32>().ok());
    if major != Some(2) {
        report.push(structure(
            EntityKind::Asset,
            0,
            format!("unsupported asset version `{}`", doc.asset.version),
        ));
    }

    let used: IndexSet<&str> = doc.extensions_used.iter().map(String::as_str).collect();
    for name in &doc.extensions_required {
        if !used.contains(name.as_str()) {
            report.push(structure(
                EntityKind::Asset,
                0,
                format!("extension {name} is required but missing from extensionsUsed"),
            ));
        }
    }
}

fn check_buffers(doc: &Document, report: &mut ValidationReport) {
    for (i, buffer) in doc.buffers.iter().enumerate() {
        if buffer.source == BufferSource::Glb && i != 0 {
            report.push(structure(
                EntityKind::Buffer,
                i,
                "only buffer 0 may live in the GLB binary chunk",
            ));
        }
        if buffer.data.len() != buffer.byte_length {
            report.push(structure(
                EntityKind::Buffer,
                i,
                format!(
                    "holds {} bytes but byteLength is {}",
                    buffer.data.len(),
                    buffer.byte_length
                ),
            ));
        }
    }
}

fn check_buffer_views(doc: &Document, report: &mut ValidationReport) {
    for (i, view) in doc.buffer_views.iter().enumerate() {
        if view.byte_length == 0 {
            report.push(structure(EntityKind::BufferView, i, "byteLength must be at least 1"));
        }
        if let Some(stride) = view.byte_stride {
            if !(MIN_STRIDE..=MAX_STRIDE).contains(&stride) || stride % 4 != 0 {
                report.push(structure(
                    EntityKind::BufferView,
                    i,
                    format!("byteStride {stride} must be a multiple of 4 in {MIN_STRIDE}..={MAX_STRIDE}"),
                ));
            }
        }
        let Some(buffer) = doc.buffers.get(view.buffer) else {
            continue;
        };
        let end = view.byte_offset.saturating_add(view.byte_length);
        if end > buffer.byte_length {
            report.push(out_of_bounds(
                EntityKind::BufferView,
                i,
                format!(
                    "bytes {}..{end} exceed buffer {} of {} bytes",
                    view.byte_offset, view.buffer, buffer.byte_length
                ),
            ));
        }
    }
}

fn check_accessor(doc: &Document, i: usize, accessor: &Accessor, report: &mut ValidationReport) {
    let component = accessor.component_type;
    let element = accessor.accessor_type.element_size(component);
    let components = accessor.accessor_type.components();

    if accessor.normalized && matches!(component, ComponentType::F32 | ComponentType::U32) {
        report.push(structure(
            EntityKind::Accessor,
            i,
            format!("{component:?} components cannot be normalized"),
        ));
    }
    for (name, bound) in [("min", &accessor.min), ("max", &accessor.max)] {
        if let Some(values) = bound {
            if values.len() != components {
                report.push(structure(
                    EntityKind::Accessor,
                    i,
                    format!("`{name}` has {} values, expected {components}", values.len()),
                ));
            }
        }
    }

    if let Some(view) = accessor.buffer_view.and_then(|v| doc.buffer_views.get(v)) {
        let stride = view.byte_stride.unwrap_or(element);
        if stride < element {
            report.push(structure(
                EntityKind::Accessor,
                i,
                format!("byteStride {stride} is smaller than the {element}-byte element"),
            ));
        }
        let start = view.byte_offset.checked_add(accessor.byte_offset);
        if start.map_or(false, |start| start % component.size() != 0) {
            report.push(structure(
                EntityKind::Accessor,
                i,
                format!("data is not aligned to its {}-byte components", component.size()),
            ));
        }
        if accessor.count > 0 {
            match span(accessor.byte_offset, stride, accessor.count, element) {
                Some(end) if end <= view.byte_length => {}
                Some(end) => report.push(out_of_bounds(
                    EntityKind::Accessor,
                    i,
                    format!(
                        "{} elements need {end} bytes but buffer view has {}",
                        accessor.count, view.byte_length
                    ),
                )),
                None => report.push(out_of_bounds(
                    EntityKind::Accessor,
                    i,
                    format!(
                        "{} elements at byteOffset {} overflow the address space",
                        accessor.count, accessor.byte_offset
                    ),
                )),
            }
        }
    }

    let Some(sparse) = &accessor.sparse else {
        return;
    };
    if sparse.count == 0 || sparse.count > accessor.count {
        report.push(structure(
            EntityKind::Accessor,
            i,
            format!(
                "sparse count {} must be in 1..={}",
                sparse.count, accessor.count
            ),
        ));
    }
    if sparse.indices.component_type.is_signed_integer()
        || sparse.indices.component_type == ComponentType::F32
    {
        report.push(structure(
            EntityKind::Accessor,
            i,
            "sparse indices must be unsigned integers",
        ));
    }
    let ranges = [
        (
            "indices",
            sparse.indices.buffer_view,
            sparse.indices.byte_offset,
            sparse.indices.component_type.size(),
        ),
        ("values", sparse.values.buffer_view, sparse.values.byte_offset, element),
    ];
    for (name, view, offset, size) in ranges {
        let Some(view) = doc.buffer_views.get(view) else {
            continue;
        };
        match sparse.count.checked_mul(size).and_then(|len| len.checked_add(offset)) {
            Some(end) if end <= view.byte_length => {}
            Some(end) => report.push(out_of_bounds(
                EntityKind::Accessor,
                i,
                format!(
                    "sparse {name} need {end} bytes but buffer view has {}",
                    view.byte_length
                ),
            )),
            None => report.push(out_of_bounds(
                EntityKind::Accessor,
                i,
                format!("sparse {name} range overflows the address space"),
            )),
        }
    }
}

/// End of the last element, or `None` on overflow. `count` must be non-zero.
fn span(offset: usize, stride: usize, count: usize, element: usize) -> Option<usize> {
    stride.checked_mul(count - 1)?.checked_add(element)?.checked_add(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glaze_core::{AccessorType, Buffer, BufferView, Mesh, Skin, Sparse, SparseIndices, SparseValues};

    fn check(doc: &Document) -> Vec<ValidationError> {
        let mut report = ValidationReport::new();
        check_layout(doc, &mut report);
        report.errors
    }

    fn with_buffer(len: usize) -> Document {
        let mut doc = Document::new();
        doc.buffers.push(Buffer::with_data(BufferSource::Glb, vec![0; len]));
        doc.buffer_views.push(BufferView {
            buffer: 0,
            byte_length: len,
            ..Default::default()
        });
        doc
    }

    #[test]
    fn test_accessor_fits_view() {
        let mut doc = with_buffer(36);
        let mut accessor = Accessor::new(ComponentType::F32, AccessorType::Vec3, 3);
        accessor.buffer_view = Some(0);
        doc.accessors.push(accessor.clone());
        assert!(check(&doc).is_empty());

        accessor.count = 4;
        doc.accessors[0] = accessor;
        assert!(matches!(
            check(&doc).as_slice(),
            [ValidationError::OutOfBounds { kind: EntityKind::Accessor, index: 0, .. }]
        ));
    }

    #[test]
    fn test_huge_offsets_are_out_of_bounds() {
        let mut doc = with_buffer(16);
        let mut accessor = Accessor::new(ComponentType::F32, AccessorType::Scalar, 1);
        accessor.buffer_view = Some(0);
        accessor.byte_offset = u64::MAX as usize;
        doc.accessors.push(accessor);
        assert!(matches!(
            check(&doc).as_slice(),
            [ValidationError::OutOfBounds { kind: EntityKind::Accessor, index: 0, .. }]
        ));

        let mut doc = with_buffer(16);
        let mut accessor = Accessor::new(ComponentType::F32, AccessorType::Vec4, usize::MAX);
        accessor.buffer_view = Some(0);
        doc.accessors.push(accessor);
        assert!(matches!(
            check(&doc).as_slice(),
            [ValidationError::OutOfBounds { kind: EntityKind::Accessor, index: 0, .. }]
        ));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_huge_sparse_count_is_out_of_bounds() {
        let mut doc = with_buffer(16);
        let mut accessor = Accessor::new(ComponentType::F32, AccessorType::Scalar, usize::MAX);
        accessor.sparse = Some(Sparse {
            count: 9_223_372_036_854_775_807,
            indices: SparseIndices {
                buffer_view: 0,
                byte_offset: 0,
                component_type: ComponentType::U32,
                extensions: Default::default(),
                extras: None,
                unknown: Default::default(),
            },
            values: SparseValues {
                buffer_view: 0,
                byte_offset: u64::MAX as usize,
                extensions: Default::default(),
                extras: None,
                unknown: Default::default(),
            },
            extensions: Default::default(),
            extras: None,
            unknown: Default::default(),
        });
        doc.accessors.push(accessor);
        let errors = check(&doc);
        assert_eq!(errors.len(), 2, "{errors:?}");
        assert!(errors
            .iter()
            .all(|e| matches!(e, ValidationError::OutOfBounds { kind: EntityKind::Accessor, .. })));
    }

    #[test]
    fn test_view_exceeds_buffer() {
        let mut doc = with_buffer(8);
        doc.buffer_views[0].byte_offset = 4;
        assert!(matches!(
            check(&doc).as_slice(),
            [ValidationError::OutOfBounds { kind: EntityKind::BufferView, .. }]
        ));
    }

    #[test]
    fn test_stride_rules() {
        let mut doc = with_buffer(64);
        doc.buffer_views[0].byte_stride = Some(6);
        let mut accessor = Accessor::new(ComponentType::F32, AccessorType::Vec3, 1);
        accessor.buffer_view = Some(0);
        doc.accessors.push(accessor);
        // 6 is not a multiple of 4 and is smaller than the 12-byte element.
        assert_eq!(check(&doc).len(), 2);
    }

    #[test]
    fn test_bounds_arity() {
        let mut doc = Document::new();
        let mut accessor = Accessor::new(ComponentType::F32, AccessorType::Vec3, 0);
        accessor.min = Some(vec![0.0, 0.0]);
        accessor.max = Some(vec![1.0, 1.0, 1.0]);
        doc.accessors.push(accessor);
        assert_eq!(check(&doc).len(), 1);
    }

    #[test]
    fn test_glb_buffer_must_be_first() {
        let mut doc = Document::new();
        doc.buffers.push(Buffer::with_data(BufferSource::External("a.bin".into()), vec![0; 4]));
        doc.buffers.push(Buffer::with_data(BufferSource::Glb, vec![0; 4]));
        let errors = check(&doc);
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::InvalidStructure { kind: EntityKind::Buffer, index: 1, .. }]
        ));
    }

    #[test]
    fn test_buffer_data_length() {
        let mut doc = Document::new();
        let mut buffer = Buffer::with_data(BufferSource::Glb, vec![0; 4]);
        buffer.byte_length = 5;
        doc.buffers.push(buffer);
        assert_eq!(check(&doc).len(), 1);
    }

    #[test]
    fn test_asset_rules() {
        let mut doc = Document::new();
        doc.asset.version = "1.0".into();
        doc.extensions_required.push("EXT_meshopt_compression".into());
        assert_eq!(check(&doc).len(), 2);
    }

    #[test]
    fn test_empty_mesh_and_skin() {
        let mut doc = Document::new();
        doc.meshes.push(Mesh::default());
        doc.skins.push(Skin::default());
        assert_eq!(check(&doc).len(), 2);
    }
}
