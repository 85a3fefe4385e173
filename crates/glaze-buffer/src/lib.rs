//! glaze-buffer: the binary side of glTF.
//!
//! - [`glb`]: splitting and assembling GLB containers
//! - [`uri`]: base64 `data:` URIs
//! - [`loader`]: caller-supplied resource capabilities
//! - [`resolve`]: filling buffer bytes after JSON decoding
//! - [`accessor`] / [`writer`]: typed accessor decoding and encoding

pub mod accessor;
pub mod glb;
pub mod layout;
pub mod loader;
pub mod resolve;
pub mod uri;
pub mod writer;

pub use accessor::{read_accessor, AccessorView, Element, Elements};
pub use glb::{is_glb, read_glb, write_glb, GlbChunks};
pub use layout::ElementLayout;
pub use loader::{MemoryResources, NoResources, ResourceLoader, ResourceWriter};
pub use resolve::{resolve_buffers, view_bytes};
pub use uri::{decode_data_uri, encode_data_uri, is_data_uri, percent_decode, DataUri};
pub use writer::{AccessorSpec, BufferBuilder};
