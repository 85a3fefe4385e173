//! Accessor encoding.
//!
//! [`BufferBuilder`] appends typed columns to one buffer of a document,
//! creating a buffer view and accessor for each. Every buffer view starts on
//! a 4-byte boundary; the pad bytes are zero and counted in the buffer's
//! `byteLength`.

use glam::Vec3;
use glaze_core::{
    Accessor, AccessorType, Buffer, BufferSource, BufferTarget, BufferView, CodecError,
    ComponentType, Document, Result, Sparse, SparseIndices, SparseValues,
};

use crate::glb::align4;
use crate::layout::{normalize, quantize, write_component, ElementLayout};

/// How a column of values is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessorSpec {
    pub component_type: ComponentType,
    pub accessor_type: AccessorType,
    pub normalized: bool,
    pub target: Option<BufferTarget>,
    /// Record per-component `min`/`max`.
    pub bounds: bool,
    pub name: Option<String>,
}

impl AccessorSpec {
    pub fn new(component_type: ComponentType, accessor_type: AccessorType) -> Self {
        Self {
            component_type,
            accessor_type,
            normalized: false,
            target: None,
            bounds: false,
            name: None,
        }
    }

    /// Store floats in `[0, 1]` or `[-1, 1]` as normalized integers.
    pub fn normalized(mut self) -> Self {
        self.normalized = true;
        self
    }

    pub fn target(mut self, target: BufferTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_bounds(mut self) -> Self {
        self.bounds = true;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn layout(&self) -> ElementLayout {
        ElementLayout::new(self.component_type, self.accessor_type)
    }

    /// Distance between elements. Vertex attributes are kept 4-byte aligned.
    fn stride(&self) -> usize {
        let size = self.layout().element_size;
        if self.target == Some(BufferTarget::ArrayBuffer) {
            align4(size)
        } else {
            size
        }
    }

    /// Convert one input value to the value that will read back.
    fn store(&self, value: f64, at: usize) -> Result<f64> {
        let path = || format!("accessor data[{at}]");
        let ct = self.component_type;
        match (ct.integer_range(), self.normalized) {
            (None, true) => Err(CodecError::invalid(path(), "float components cannot be normalized")),
            (None, false) => Ok(value as f32 as f64),
            (Some(_), true) => {
                let low = if ct.is_signed_integer() { -1.0 } else { 0.0 };
                if !(low..=1.0).contains(&value) {
                    return Err(CodecError::invalid(
                        path(),
                        format!("{value} is outside the normalized range [{low}, 1]"),
                    ));
                }
                Ok(normalize(ct, quantize(ct, value)))
            }
            (Some((low, high)), false) => {
                if value.fract() != 0.0 || !(low..=high).contains(&value) {
                    return Err(CodecError::invalid(
                        path(),
                        format!("{value} is not representable as {ct:?}"),
                    ));
                }
                Ok(value)
            }
        }
    }

    /// The raw component to write for a stored value.
    fn raw(&self, stored: f64) -> f64 {
        if self.normalized {
            quantize(self.component_type, stored)
        } else {
            stored
        }
    }
}

/// Encoded element bytes plus the values they decode to.
struct Encoded {
    bytes: Vec<u8>,
    stored: Vec<f64>,
    count: usize,
}

fn encode(values: &[f64], spec: &AccessorSpec, stride: usize) -> Result<Encoded> {
    let layout = spec.layout();
    let components = layout.components();
    if values.len() % components != 0 {
        return Err(CodecError::invalid(
            "accessor data",
            format!(
                "{} values do not divide into {:?} elements",
                values.len(),
                spec.accessor_type
            ),
        ));
    }
    let count = values.len() / components;
    let stored = values
        .iter()
        .enumerate()
        .map(|(i, v)| spec.store(*v, i))
        .collect::<Result<Vec<_>>>()?;

    let rows = spec.accessor_type.rows();
    let mut bytes = Vec::with_capacity(count * stride);
    for element in stored.chunks_exact(components) {
        let start = bytes.len();
        for column in element.chunks_exact(rows) {
            let column_start = bytes.len();
            for value in column {
                write_component(spec.component_type, spec.raw(*value), &mut bytes);
            }
            bytes.resize(column_start + layout.column_stride, 0);
        }
        bytes.resize(start + stride, 0);
    }

    Ok(Encoded {
        bytes,
        stored,
        count,
    })
}

fn bounds(stored: &[f64], components: usize) -> Option<(Vec<f64>, Vec<f64>)> {
    let mut elements = stored.chunks_exact(components);
    let first = elements.next()?;
    let mut min = first.to_vec();
    let mut max = first.to_vec();
    for element in elements {
        for (i, v) in element.iter().enumerate() {
            min[i] = min[i].min(*v);
            max[i] = max[i].max(*v);
        }
    }
    Some((min, max))
}

/// Appends encoded data to one buffer of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferBuilder {
    buffer: usize,
}

impl BufferBuilder {
    /// Add an empty buffer to `doc` and write into it.
    pub fn new(doc: &mut Document, source: BufferSource) -> Self {
        doc.buffers.push(Buffer::with_data(source, Vec::new()));
        Self {
            buffer: doc.buffers.len() - 1,
        }
    }

    /// Continue writing into an existing buffer.
    pub fn attach(doc: &Document, buffer: usize) -> Result<Self> {
        if buffer >= doc.buffers.len() {
            return Err(CodecError::invalid(
                format!("buffers[{buffer}]"),
                "buffer does not exist",
            ));
        }
        Ok(Self { buffer })
    }

    pub fn buffer_index(&self) -> usize {
        self.buffer
    }

    /// Append raw bytes as a new buffer view.
    pub fn push_bytes(
        &self,
        doc: &mut Document,
        bytes: &[u8],
        target: Option<BufferTarget>,
    ) -> usize {
        self.push_view(doc, bytes, None, target)
    }

    fn push_view(
        &self,
        doc: &mut Document,
        bytes: &[u8],
        byte_stride: Option<usize>,
        target: Option<BufferTarget>,
    ) -> usize {
        let buffer = &mut doc.buffers[self.buffer];
        let byte_offset = align4(buffer.data.len());
        buffer.data.resize(byte_offset, 0);
        buffer.data.extend_from_slice(bytes);
        let padded = align4(buffer.data.len());
        buffer.data.resize(padded, 0);
        buffer.byte_length = buffer.data.len();

        doc.buffer_views.push(BufferView {
            buffer: self.buffer,
            byte_offset,
            byte_length: bytes.len(),
            byte_stride,
            target,
            ..Default::default()
        });
        doc.buffer_views.len() - 1
    }

    /// Encode a flat column of values as a new accessor.
    ///
    /// `values` holds `count * components` numbers in column-major element
    /// order. Returns the accessor index.
    pub fn push_accessor(
        &self,
        doc: &mut Document,
        values: &[f64],
        spec: &AccessorSpec,
    ) -> Result<usize> {
        let layout = spec.layout();
        let stride = spec.stride();
        let encoded = encode(values, spec, stride)?;
        let byte_stride = (stride != layout.element_size).then_some(stride);
        let view = self.push_view(doc, &encoded.bytes, byte_stride, spec.target);

        let mut accessor = Accessor::new(spec.component_type, spec.accessor_type, encoded.count);
        accessor.buffer_view = Some(view);
        accessor.normalized = spec.normalized;
        accessor.name = spec.name.clone();
        if spec.bounds {
            if let Some((min, max)) = bounds(&encoded.stored, layout.components()) {
                accessor.min = Some(min);
                accessor.max = Some(max);
            }
        }
        doc.accessors.push(accessor);
        Ok(doc.accessors.len() - 1)
    }

    /// Encode an accessor of `count` zero elements with sparse replacements.
    ///
    /// `indices` must be strictly increasing and below `count`; `values`
    /// holds one element per index.
    pub fn push_sparse(
        &self,
        doc: &mut Document,
        count: usize,
        indices: &[u32],
        values: &[f64],
        spec: &AccessorSpec,
    ) -> Result<usize> {
        let layout = spec.layout();
        if indices.windows(2).any(|w| w[0] >= w[1]) {
            return Err(CodecError::invalid(
                "sparse indices",
                "indices must be strictly increasing",
            ));
        }
        if let Some(last) = indices.last() {
            if *last as usize >= count {
                return Err(CodecError::invalid(
                    "sparse indices",
                    format!("index {last} out of range for count {count}"),
                ));
            }
        }
        let encoded = encode(values, spec, layout.element_size)?;
        if encoded.count != indices.len() {
            return Err(CodecError::invalid(
                "sparse values",
                format!(
                    "{} elements for {} indices",
                    encoded.count,
                    indices.len()
                ),
            ));
        }

        let index_type = match indices.last().copied().unwrap_or(0) {
            0..=0xFF => ComponentType::U8,
            0x100..=0xFFFF => ComponentType::U16,
            _ => ComponentType::U32,
        };
        let mut index_bytes = Vec::with_capacity(indices.len() * index_type.size());
        for i in indices {
            write_component(index_type, *i as f64, &mut index_bytes);
        }
        let indices_view = self.push_view(doc, &index_bytes, None, None);
        let values_view = self.push_view(doc, &encoded.bytes, None, None);

        let mut accessor = Accessor::new(spec.component_type, spec.accessor_type, count);
        accessor.normalized = spec.normalized;
        accessor.name = spec.name.clone();
        if spec.bounds {
            let components = layout.components();
            let mut effective = encoded.stored.clone();
            if indices.len() < count {
                effective.extend(std::iter::repeat(0.0).take(components));
            }
            if let Some((min, max)) = bounds(&effective, components) {
                accessor.min = Some(min);
                accessor.max = Some(max);
            }
        }
        accessor.sparse = Some(Sparse {
            count: indices.len(),
            indices: SparseIndices {
                buffer_view: indices_view,
                byte_offset: 0,
                component_type: index_type,
                extensions: Default::default(),
                extras: None,
                unknown: Default::default(),
            },
            values: SparseValues {
                buffer_view: values_view,
                byte_offset: 0,
                extensions: Default::default(),
                extras: None,
                unknown: Default::default(),
            },
            extensions: Default::default(),
            extras: None,
            unknown: Default::default(),
        });
        doc.accessors.push(accessor);
        Ok(doc.accessors.len() - 1)
    }

    /// Positions or normals as `VEC3` floats with bounds.
    pub fn push_vec3(&self, doc: &mut Document, data: &[Vec3]) -> Result<usize> {
        let values: Vec<f64> = data
            .iter()
            .flat_map(|v| v.to_array())
            .map(f64::from)
            .collect();
        let spec = AccessorSpec::new(ComponentType::F32, AccessorType::Vec3)
            .target(BufferTarget::ArrayBuffer)
            .with_bounds();
        self.push_accessor(doc, &values, &spec)
    }

    /// Triangle indices, stored as `u16` when they fit and `u32` otherwise.
    pub fn push_indices(&self, doc: &mut Document, indices: &[u32]) -> Result<usize> {
        let max = indices.iter().copied().max().unwrap_or(0);
        let component_type = if max <= u16::MAX as u32 {
            ComponentType::U16
        } else {
            ComponentType::U32
        };
        let values: Vec<f64> = indices.iter().map(|i| *i as f64).collect();
        let spec = AccessorSpec::new(component_type, AccessorType::Scalar)
            .target(BufferTarget::ElementArrayBuffer);
        self.push_accessor(doc, &values, &spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::read_accessor;

    #[test]
    fn test_views_are_aligned() {
        let mut doc = Document::new();
        let builder = BufferBuilder::new(&mut doc, BufferSource::Glb);
        builder.push_bytes(&mut doc, &[1, 2, 3], None);
        let view = builder.push_bytes(&mut doc, &[4], None);

        assert_eq!(doc.buffer_views[view].byte_offset, 4);
        assert_eq!(doc.buffer_views[view].byte_length, 1);
        assert_eq!(doc.buffers[0].data, vec![1, 2, 3, 0, 4, 0, 0, 0]);
        assert_eq!(doc.buffers[0].byte_length, 8);
    }

    #[test]
    fn test_bounds_and_read_back() {
        let mut doc = Document::new();
        let builder = BufferBuilder::new(&mut doc, BufferSource::Glb);
        let positions = [Vec3::new(-1.0, 0.0, 2.0), Vec3::new(3.0, -4.0, 0.5)];
        let index = builder.push_vec3(&mut doc, &positions).unwrap();

        let accessor = &doc.accessors[index];
        assert_eq!(accessor.min, Some(vec![-1.0, -4.0, 0.5]));
        assert_eq!(accessor.max, Some(vec![3.0, 0.0, 2.0]));
        assert_eq!(accessor.count, 2);
        assert_eq!(read_accessor(&doc, index).unwrap().to_vec3().unwrap(), positions);
    }

    #[test]
    fn test_vertex_attribute_stride_padding() {
        let mut doc = Document::new();
        let builder = BufferBuilder::new(&mut doc, BufferSource::Glb);
        let spec = AccessorSpec::new(ComponentType::U8, AccessorType::Vec3)
            .normalized()
            .target(BufferTarget::ArrayBuffer);
        let index = builder
            .push_accessor(&mut doc, &[1.0, 0.0, 1.0, 0.0, 1.0, 0.0], &spec)
            .unwrap();

        let view = &doc.buffer_views[doc.accessors[index].buffer_view.unwrap()];
        assert_eq!(view.byte_stride, Some(4));
        assert_eq!(doc.buffers[0].data, vec![255, 0, 255, 0, 0, 255, 0, 0]);
        assert_eq!(
            read_accessor(&doc, index).unwrap().to_f32(),
            vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0]
        );
    }

    #[test]
    fn test_mat3_i16_padding() {
        let mut doc = Document::new();
        let builder = BufferBuilder::new(&mut doc, BufferSource::Glb);
        let spec = AccessorSpec::new(ComponentType::I16, AccessorType::Mat3);
        let values: Vec<f64> = (1..=9).map(f64::from).collect();
        let index = builder.push_accessor(&mut doc, &values, &spec).unwrap();

        assert_eq!(doc.buffer_views[0].byte_length, 24);
        let e = read_accessor(&doc, index).unwrap().get(0).unwrap();
        assert_eq!(e.as_slice(), values.as_slice());
    }

    #[test]
    fn test_rejects_lossy_values() {
        let mut doc = Document::new();
        let builder = BufferBuilder::new(&mut doc, BufferSource::Glb);
        let u8_scalar = AccessorSpec::new(ComponentType::U8, AccessorType::Scalar);
        assert!(builder.push_accessor(&mut doc, &[256.0], &u8_scalar).is_err());
        assert!(builder.push_accessor(&mut doc, &[1.5], &u8_scalar).is_err());
        assert!(builder
            .push_accessor(&mut doc, &[-0.5], &u8_scalar.clone().normalized())
            .is_err());
        let vec2 = AccessorSpec::new(ComponentType::F32, AccessorType::Vec2);
        assert!(builder.push_accessor(&mut doc, &[1.0, 2.0, 3.0], &vec2).is_err());
        assert!(doc.accessors.is_empty());
    }

    #[test]
    fn test_indices_pick_component_type() {
        let mut doc = Document::new();
        let builder = BufferBuilder::new(&mut doc, BufferSource::Glb);
        let small = builder.push_indices(&mut doc, &[0, 1, 2]).unwrap();
        let large = builder.push_indices(&mut doc, &[0, 70_000]).unwrap();
        assert_eq!(doc.accessors[small].component_type, ComponentType::U16);
        assert_eq!(doc.accessors[large].component_type, ComponentType::U32);
        assert_eq!(
            read_accessor(&doc, large).unwrap().to_u32().unwrap(),
            vec![0, 70_000]
        );
    }

    #[test]
    fn test_sparse_round_trip() {
        let mut doc = Document::new();
        let builder = BufferBuilder::new(&mut doc, BufferSource::Glb);
        let spec = AccessorSpec::new(ComponentType::F32, AccessorType::Scalar).with_bounds();
        let index = builder
            .push_sparse(&mut doc, 10, &[2, 7], &[5.0, 9.0], &spec)
            .unwrap();

        assert_eq!(doc.accessors[index].min, Some(vec![0.0]));
        assert_eq!(doc.accessors[index].max, Some(vec![9.0]));
        assert_eq!(
            read_accessor(&doc, index).unwrap().to_f32(),
            vec![0.0, 0.0, 5.0, 0.0, 0.0, 0.0, 0.0, 9.0, 0.0, 0.0]
        );
        assert!(builder
            .push_sparse(&mut doc, 3, &[1, 1], &[0.0, 0.0], &spec)
            .is_err());
    }
}
