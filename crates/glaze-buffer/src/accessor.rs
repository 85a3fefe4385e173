//! Accessor decoding.
//!
//! [`read_accessor`] validates the byte ranges an accessor covers and returns
//! an [`AccessorView`]. Elements are decoded lazily while iterating; the view
//! can be iterated any number of times.

use glam::{Mat4, Vec2, Vec3, Vec4};
use glaze_core::{AccessorType, CodecError, ComponentType, Document, Result};
use smallvec::SmallVec;

use crate::layout::{normalize, read_component, ElementLayout};
use crate::resolve::view_bytes;

/// One decoded element, components in column-major order.
pub type Element = SmallVec<[f64; 16]>;

#[derive(Debug, Clone, Copy)]
struct Strided<'a> {
    bytes: &'a [u8],
    stride: usize,
}

#[derive(Debug, Clone)]
struct SparseData<'a> {
    /// Strictly increasing element indices.
    indices: Vec<usize>,
    /// Tightly packed replacement elements.
    values: &'a [u8],
}

/// Validated, lazily decoded view of an accessor's elements.
#[derive(Debug, Clone)]
pub struct AccessorView<'a> {
    index: usize,
    layout: ElementLayout,
    normalized: bool,
    count: usize,
    base: Option<Strided<'a>>,
    sparse: Option<SparseData<'a>>,
}

/// Open accessor `index` of `doc` for reading.
///
/// Buffers must already be resolved.
pub fn read_accessor(doc: &Document, index: usize) -> Result<AccessorView<'_>> {
    let accessor = doc
        .accessors
        .get(index)
        .ok_or_else(|| CodecError::accessor(index, "accessor does not exist"))?;
    let layout = ElementLayout::new(accessor.component_type, accessor.accessor_type);
    let count = accessor.count;

    let base = match accessor.buffer_view {
        None => None,
        Some(view_index) => {
            let bytes = view_bytes(doc, view_index)?;
            let stride = doc.buffer_views[view_index]
                .byte_stride
                .unwrap_or(layout.element_size);
            if stride < layout.element_size {
                return Err(CodecError::accessor(
                    index,
                    format!(
                        "byte stride {stride} is smaller than the element size {}",
                        layout.element_size
                    ),
                ));
            }
            let needed = byte_span(accessor.byte_offset, stride, count, layout.element_size)
                .ok_or_else(|| CodecError::accessor(index, "byte range overflows"))?;
            if needed > bytes.len() {
                return Err(CodecError::accessor(
                    index,
                    format!(
                        "needs {needed} bytes but buffer view {view_index} has {}",
                        bytes.len()
                    ),
                ));
            }
            Some(Strided {
                bytes: &bytes[accessor.byte_offset..],
                stride,
            })
        }
    };

    let sparse = match &accessor.sparse {
        None => None,
        Some(sparse) => {
            if sparse.count > count {
                return Err(CodecError::accessor(
                    index,
                    format!("sparse count {} exceeds count {count}", sparse.count),
                ));
            }
            let index_type = sparse.indices.component_type;
            if !matches!(
                index_type,
                ComponentType::U8 | ComponentType::U16 | ComponentType::U32
            ) {
                return Err(CodecError::accessor(
                    index,
                    "sparse indices must be unsigned integers",
                ));
            }

            let indices_view = view_bytes(doc, sparse.indices.buffer_view)?;
            let index_bytes = sparse
                .count
                .checked_mul(index_type.size())
                .and_then(|len| slice_from(indices_view, sparse.indices.byte_offset, len))
                .ok_or_else(|| CodecError::accessor(index, "sparse indices exceed their buffer view"))?;
            let values_view = view_bytes(doc, sparse.values.buffer_view)?;
            let values = sparse
                .count
                .checked_mul(layout.element_size)
                .and_then(|len| slice_from(values_view, sparse.values.byte_offset, len))
                .ok_or_else(|| CodecError::accessor(index, "sparse values exceed their buffer view"))?;

            let mut indices = Vec::with_capacity(sparse.count);
            for chunk in index_bytes.chunks_exact(index_type.size()) {
                let i = read_component(index_type, chunk) as usize;
                if i >= count {
                    return Err(CodecError::accessor(
                        index,
                        format!("sparse index {i} out of range for count {count}"),
                    ));
                }
                if indices.last().map_or(false, |prev| *prev >= i) {
                    return Err(CodecError::accessor(
                        index,
                        "sparse indices must be strictly increasing",
                    ));
                }
                indices.push(i);
            }
            Some(SparseData { indices, values })
        }
    };

    Ok(AccessorView {
        index,
        layout,
        normalized: accessor.normalized,
        count,
        base,
        sparse,
    })
}

/// End of the last element: `offset + stride * (count - 1) + element`.
///
/// `None` when the arithmetic overflows.
fn byte_span(offset: usize, stride: usize, count: usize, element: usize) -> Option<usize> {
    match count {
        0 => Some(offset),
        n => stride.checked_mul(n - 1)?.checked_add(element)?.checked_add(offset),
    }
}

fn slice_from(bytes: &[u8], offset: usize, len: usize) -> Option<&[u8]> {
    bytes.get(offset..offset.checked_add(len)?)
}

impl<'a> AccessorView<'a> {
    /// Number of elements.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn layout(&self) -> ElementLayout {
        self.layout
    }

    pub fn accessor_type(&self) -> AccessorType {
        self.layout.accessor_type
    }

    /// Decode element `i`.
    pub fn get(&self, i: usize) -> Option<Element> {
        if i >= self.count {
            return None;
        }
        if let Some(sparse) = &self.sparse {
            if let Ok(pos) = sparse.indices.binary_search(&i) {
                return Some(self.decode(sparse.values, pos * self.layout.element_size));
            }
        }
        Some(match self.base {
            Some(base) => self.decode(base.bytes, i * base.stride),
            None => SmallVec::from_elem(0.0, self.layout.components()),
        })
    }

    fn decode(&self, bytes: &[u8], offset: usize) -> Element {
        let component_type = self.layout.component_type;
        let size = component_type.size();
        self.layout
            .component_offsets()
            .map(|o| {
                let at = offset + o;
                let raw = read_component(component_type, &bytes[at..at + size]);
                if self.normalized {
                    normalize(component_type, raw)
                } else {
                    raw
                }
            })
            .collect()
    }

    /// Iterate over all elements from the start.
    pub fn iter(&self) -> Elements<'_, 'a> {
        Elements {
            view: self,
            next: 0,
        }
    }

    /// All components flattened into `f32`.
    pub fn to_f32(&self) -> Vec<f32> {
        self.iter().flatten().map(|c| c as f32).collect()
    }

    /// All components flattened into `u32`, for index data.
    pub fn to_u32(&self) -> Result<Vec<u32>> {
        if !self.layout.component_type.is_integer() || self.normalized {
            return Err(CodecError::accessor(
                self.index,
                "integer data requires an unnormalized integer accessor",
            ));
        }
        Ok(self.iter().flatten().map(|c| c as u32).collect())
    }

    pub fn to_vec2(&self) -> Result<Vec<Vec2>> {
        self.expect_type(AccessorType::Vec2)?;
        Ok(self.iter().map(|e| Vec2::new(e[0] as f32, e[1] as f32)).collect())
    }

    pub fn to_vec3(&self) -> Result<Vec<Vec3>> {
        self.expect_type(AccessorType::Vec3)?;
        Ok(self
            .iter()
            .map(|e| Vec3::new(e[0] as f32, e[1] as f32, e[2] as f32))
            .collect())
    }

    pub fn to_vec4(&self) -> Result<Vec<Vec4>> {
        self.expect_type(AccessorType::Vec4)?;
        Ok(self
            .iter()
            .map(|e| Vec4::new(e[0] as f32, e[1] as f32, e[2] as f32, e[3] as f32))
            .collect())
    }

    pub fn to_mat4(&self) -> Result<Vec<Mat4>> {
        self.expect_type(AccessorType::Mat4)?;
        Ok(self
            .iter()
            .map(|e| {
                let mut cols = [0.0f32; 16];
                for (dst, src) in cols.iter_mut().zip(e.iter()) {
                    *dst = *src as f32;
                }
                Mat4::from_cols_array(&cols)
            })
            .collect())
    }

    fn expect_type(&self, expected: AccessorType) -> Result<()> {
        if self.layout.accessor_type != expected {
            return Err(CodecError::accessor(
                self.index,
                format!(
                    "expected {expected:?} elements, found {:?}",
                    self.layout.accessor_type
                ),
            ));
        }
        Ok(())
    }
}

/// Iterator over the elements of an [`AccessorView`].
#[derive(Debug, Clone)]
pub struct Elements<'v, 'a> {
    view: &'v AccessorView<'a>,
    next: usize,
}

impl Iterator for Elements<'_, '_> {
    type Item = Element;

    fn next(&mut self) -> Option<Element> {
        let element = self.view.get(self.next)?;
        self.next += 1;
        Some(element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.view.count.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Elements<'_, '_> {}

impl<'v, 'a> IntoIterator for &'v AccessorView<'a> {
    type Item = Element;
    type IntoIter = Elements<'v, 'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
