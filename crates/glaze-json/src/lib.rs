//! glaze-json: the glTF 2.0 JSON schema as a typed codec.
//!
//! Decoding walks a `serde_json::Value` with [`value::ObjectReader`], so
//! every error carries the field path it was raised at
//! (`meshes[0].primitives[1].indices`). Encoding writes keys in schema
//! order and omits values equal to their schema default.
//!
//! Buffer bytes are not this crate's concern beyond data URIs; see
//! `glaze-buffer` for GLB chunks and external resources.

mod decode;
mod encode;
pub mod value;

pub use decode::decode_document;
pub use encode::{encode_document, EncodeOptions};

use glaze_core::Result;
use serde_json::Value;

/// Parse UTF-8 JSON text into a value.
pub fn parse_json(bytes: &[u8]) -> Result<Value> {
    let text = std::str::from_utf8(bytes)?;
    Ok(serde_json::from_str(text)?)
}

/// Serialize a value as compact or pretty JSON text.
pub fn to_json_bytes(value: &Value, pretty: bool) -> Result<Vec<u8>> {
    Ok(if pretty {
        serde_json::to_vec_pretty(value)?
    } else {
        serde_json::to_vec(value)?
    })
}
