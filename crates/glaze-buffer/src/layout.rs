//! Byte layout of accessor elements and component conversion.

use byteorder::{ByteOrder, LittleEndian};
use glaze_core::{AccessorType, ComponentType};

use crate::glb::align4;

/// How one element of an accessor is laid out in memory.
///
/// Matrix columns start on 4-byte boundaries, so byte and short matrices
/// carry padding: MAT2 of `u8` takes 8 bytes, MAT3 of `u8` 12 bytes and
/// MAT3 of `i16` 24 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementLayout {
    pub component_type: ComponentType,
    pub accessor_type: AccessorType,
    /// Distance between the starts of consecutive columns.
    pub column_stride: usize,
    /// Size of one element including column padding.
    pub element_size: usize,
}

impl ElementLayout {
    pub fn new(component_type: ComponentType, accessor_type: AccessorType) -> Self {
        let column_bytes = accessor_type.rows() * component_type.size();
        let column_stride = if accessor_type.is_matrix() {
            align4(column_bytes)
        } else {
            column_bytes
        };
        Self {
            component_type,
            accessor_type,
            column_stride,
            element_size: column_stride * accessor_type.columns(),
        }
    }

    /// Components per element.
    pub fn components(&self) -> usize {
        self.accessor_type.components()
    }

    /// Byte offsets of each component, in column-major order.
    pub fn component_offsets(&self) -> impl Iterator<Item = usize> + '_ {
        let size = self.component_type.size();
        (0..self.accessor_type.columns()).flat_map(move |col| {
            (0..self.accessor_type.rows()).map(move |row| col * self.column_stride + row * size)
        })
    }
}

/// Read one raw component value.
///
/// `bytes` must hold at least `component_type.size()` bytes.
pub fn read_component(component_type: ComponentType, bytes: &[u8]) -> f64 {
    match component_type {
        ComponentType::I8 => bytes[0] as i8 as f64,
        ComponentType::U8 => bytes[0] as f64,
        ComponentType::I16 => LittleEndian::read_i16(bytes) as f64,
        ComponentType::U16 => LittleEndian::read_u16(bytes) as f64,
        ComponentType::U32 => LittleEndian::read_u32(bytes) as f64,
        ComponentType::F32 => LittleEndian::read_f32(bytes) as f64,
    }
}

/// Append one raw component value.
///
/// Integer values must already be integral and in range.
pub fn write_component(component_type: ComponentType, value: f64, out: &mut Vec<u8>) {
    match component_type {
        ComponentType::I8 => out.push(value as i8 as u8),
        ComponentType::U8 => out.push(value as u8),
        ComponentType::I16 => out.extend_from_slice(&(value as i16).to_le_bytes()),
        ComponentType::U16 => out.extend_from_slice(&(value as u16).to_le_bytes()),
        ComponentType::U32 => out.extend_from_slice(&(value as u32).to_le_bytes()),
        ComponentType::F32 => out.extend_from_slice(&(value as f32).to_le_bytes()),
    }
}

/// Map a raw integer to its normalized float.
///
/// Unsigned types map to `[0, 1]`; signed types to `[-1, 1]`, where the most
/// negative code clamps to -1. Floats pass through.
pub fn normalize(component_type: ComponentType, raw: f64) -> f64 {
    match component_type.integer_range() {
        None => raw,
        Some((_, max)) if component_type.is_signed_integer() => (raw / max).max(-1.0),
        Some((_, max)) => raw / max,
    }
}

/// Inverse of [`normalize`], rounding to the nearest code.
pub fn quantize(component_type: ComponentType, value: f64) -> f64 {
    match component_type.integer_range() {
        None => value,
        Some((_, max)) => (value * max).round(),
    }
}
