//! The typed glTF 2.0 document model.
//!
//! Every entity lives in a top-level array of [`Document`] and is referenced
//! by its zero-based index. Indices are only meaningful within the document
//! that owns them; the resolver checks that each one is in range.
//!
//! Each entity carries three open-ended maps:
//! - `extensions`: extension payloads keyed by extension name,
//! - `extras`: application data,
//! - `unknown`: keys that are not part of the glTF schema, re-emitted verbatim.

use glam::{Mat4, Quat, Vec3};
use indexmap::IndexMap;
use serde_json::Value;

use crate::types::{
    AccessorType, AlphaMode, BufferTarget, ComponentType, EntityKind, Interpolation, MagFilter,
    MinFilter, PrimitiveMode, TargetPath, WrapMode,
};

/// Extension payloads keyed by extension name.
pub type Extensions = IndexMap<String, Value>;

/// JSON keys outside the glTF schema.
pub type Unknown = IndexMap<String, Value>;

/// Name of the material variants extension modeled by [`MaterialVariants`].
pub const KHR_MATERIALS_VARIANTS: &str = "KHR_materials_variants";

/// A complete glTF document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub asset: Asset,
    /// Default scene.
    pub scene: Option<usize>,
    pub scenes: Vec<Scene>,
    pub nodes: Vec<Node>,
    pub meshes: Vec<Mesh>,
    pub accessors: Vec<Accessor>,
    pub buffer_views: Vec<BufferView>,
    pub buffers: Vec<Buffer>,
    pub materials: Vec<Material>,
    pub textures: Vec<Texture>,
    pub images: Vec<Image>,
    pub samplers: Vec<Sampler>,
    pub animations: Vec<Animation>,
    pub skins: Vec<Skin>,
    pub cameras: Vec<Camera>,
    /// Root `KHR_materials_variants` object, if present.
    pub material_variants: Option<MaterialVariants>,
    pub extensions_used: Vec<String>,
    pub extensions_required: Vec<String>,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

impl Document {
    /// Create an empty document with a default asset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entities of the given kind.
    ///
    /// Animation samplers are per animation, so this returns 0 for them.
    pub fn len_of(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Asset => 1,
            EntityKind::Scene => self.scenes.len(),
            EntityKind::Node => self.nodes.len(),
            EntityKind::Mesh => self.meshes.len(),
            EntityKind::Accessor => self.accessors.len(),
            EntityKind::BufferView => self.buffer_views.len(),
            EntityKind::Buffer => self.buffers.len(),
            EntityKind::Material => self.materials.len(),
            EntityKind::Texture => self.textures.len(),
            EntityKind::Image => self.images.len(),
            EntityKind::Sampler => self.samplers.len(),
            EntityKind::Animation => self.animations.len(),
            EntityKind::AnimationSampler => 0,
            EntityKind::Skin => self.skins.len(),
            EntityKind::Camera => self.cameras.len(),
            EntityKind::Variant => self
                .material_variants
                .as_ref()
                .map_or(0, |v| v.variants.len()),
        }
    }

    /// Register an extension name in `extensionsUsed` if it is not there yet.
    pub fn use_extension(&mut self, name: &str) {
        if !self.extensions_used.iter().any(|n| n == name) {
            self.extensions_used.push(name.to_string());
        }
    }
}

/// Metadata about the glTF asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub version: String,
    pub min_version: Option<String>,
    pub generator: Option<String>,
    pub copyright: Option<String>,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

impl Default for Asset {
    fn default() -> Self {
        Self {
            version: "2.0".to_string(),
            min_version: None,
            generator: None,
            copyright: None,
            extensions: Extensions::new(),
            extras: None,
            unknown: Unknown::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    pub name: Option<String>,
    /// Root nodes.
    pub nodes: Vec<usize>,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

/// Local transform of a node.
///
/// glTF allows either a TRS decomposition or a column-major matrix, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    Trs {
        translation: Option<[f32; 3]>,
        rotation: Option<[f32; 4]>,
        scale: Option<[f32; 3]>,
    },
    Matrix([f32; 16]),
}

impl Default for Transform {
    fn default() -> Self {
        Self::Trs {
            translation: None,
            rotation: None,
            scale: None,
        }
    }
}

impl Transform {
    /// Build a TRS transform from glam values.
    pub fn from_trs(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self::Trs {
            translation: (translation != Vec3::ZERO).then(|| translation.to_array()),
            rotation: (rotation != Quat::IDENTITY).then(|| rotation.to_array()),
            scale: (scale != Vec3::ONE).then(|| scale.to_array()),
        }
    }

    /// The transform as a column-major matrix.
    pub fn to_matrix(&self) -> Mat4 {
        match self {
            Self::Trs {
                translation,
                rotation,
                scale,
            } => Mat4::from_scale_rotation_translation(
                scale.map_or(Vec3::ONE, Vec3::from_array),
                rotation.map_or(Quat::IDENTITY, Quat::from_array),
                translation.map_or(Vec3::ZERO, Vec3::from_array),
            ),
            Self::Matrix(m) => Mat4::from_cols_array(m),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    pub name: Option<String>,
    pub children: Vec<usize>,
    pub mesh: Option<usize>,
    pub camera: Option<usize>,
    pub skin: Option<usize>,
    pub transform: Transform,
    /// Morph target weights overriding the mesh defaults.
    pub weights: Option<Vec<f32>>,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

impl Node {
    /// Local transform as a matrix.
    pub fn local_matrix(&self) -> Mat4 {
        self.transform.to_matrix()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
    /// Default morph target weights.
    pub weights: Option<Vec<f32>>,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

/// Vertex attribute semantics mapped to accessor indices.
pub type Attributes = IndexMap<String, usize>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Primitive {
    pub attributes: Attributes,
    pub indices: Option<usize>,
    pub material: Option<usize>,
    pub mode: PrimitiveMode,
    /// Morph targets.
    pub targets: Vec<Attributes>,
    /// `KHR_materials_variants` mappings of this primitive.
    pub variants: Option<PrimitiveVariants>,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Accessor {
    pub name: Option<String>,
    pub buffer_view: Option<usize>,
    pub byte_offset: usize,
    pub component_type: ComponentType,
    pub normalized: bool,
    pub count: usize,
    pub accessor_type: AccessorType,
    pub min: Option<Vec<f64>>,
    pub max: Option<Vec<f64>>,
    pub sparse: Option<Sparse>,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

impl Accessor {
    /// Create an accessor with no data source and default layout.
    pub fn new(component_type: ComponentType, accessor_type: AccessorType, count: usize) -> Self {
        Self {
            name: None,
            buffer_view: None,
            byte_offset: 0,
            component_type,
            normalized: false,
            count,
            accessor_type,
            min: None,
            max: None,
            sparse: None,
            extensions: Extensions::new(),
            extras: None,
            unknown: Unknown::new(),
        }
    }
}

/// Sparse substitution applied on top of an accessor's base values.
#[derive(Debug, Clone, PartialEq)]
pub struct Sparse {
    pub count: usize,
    pub indices: SparseIndices,
    pub values: SparseValues,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SparseIndices {
    pub buffer_view: usize,
    pub byte_offset: usize,
    /// One of U8, U16 or U32.
    pub component_type: ComponentType,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SparseValues {
    pub buffer_view: usize,
    pub byte_offset: usize,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BufferView {
    pub name: Option<String>,
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<usize>,
    pub target: Option<BufferTarget>,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

/// Where the bytes of a buffer come from, and where they go on emit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BufferSource {
    /// The binary chunk of a GLB container.
    #[default]
    Glb,
    /// A `data:` URI carrying the bytes inline.
    DataUri { mime_type: String },
    /// A URI resolved through the caller's resource loader.
    External(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Buffer {
    pub name: Option<String>,
    pub byte_length: usize,
    pub source: BufferSource,
    /// Resolved bytes; exactly `byte_length` long once loaded.
    pub data: Vec<u8>,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

impl Buffer {
    /// Create a buffer holding `data`, with a matching byte length.
    pub fn with_data(source: BufferSource, data: Vec<u8>) -> Self {
        Self {
            byte_length: data.len(),
            source,
            data,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Material {
    pub name: Option<String>,
    pub pbr_metallic_roughness: Option<PbrMetallicRoughness>,
    pub normal_texture: Option<NormalTextureInfo>,
    pub occlusion_texture: Option<OcclusionTextureInfo>,
    pub emissive_texture: Option<TextureInfo>,
    pub emissive_factor: [f32; 3],
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: Option<f32>,
    pub double_sided: bool,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

impl Material {
    /// Effective alpha cutoff; glTF defaults it to 0.5.
    pub fn alpha_cutoff(&self) -> f32 {
        self.alpha_cutoff.unwrap_or(0.5)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PbrMetallicRoughness {
    pub base_color_factor: [f32; 4],
    pub base_color_texture: Option<TextureInfo>,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub metallic_roughness_texture: Option<TextureInfo>,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

impl Default for PbrMetallicRoughness {
    fn default() -> Self {
        Self {
            base_color_factor: [1.0; 4],
            base_color_texture: None,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            metallic_roughness_texture: None,
            extensions: Extensions::new(),
            extras: None,
            unknown: Unknown::new(),
        }
    }
}

/// Reference to a texture from a material.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextureInfo {
    pub index: usize,
    pub tex_coord: u32,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalTextureInfo {
    pub index: usize,
    pub tex_coord: u32,
    pub scale: f32,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OcclusionTextureInfo {
    pub index: usize,
    pub tex_coord: u32,
    pub strength: f32,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Texture {
    pub name: Option<String>,
    pub sampler: Option<usize>,
    pub source: Option<usize>,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

/// Where the pixels of an image come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// External or `data:` URI. Data URIs are kept verbatim.
    Uri {
        uri: String,
        mime_type: Option<String>,
    },
    /// Bytes stored in a buffer view.
    BufferView {
        buffer_view: usize,
        mime_type: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub name: Option<String>,
    pub source: ImageSource,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sampler {
    pub name: Option<String>,
    pub mag_filter: Option<MagFilter>,
    pub min_filter: Option<MinFilter>,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Animation {
    pub name: Option<String>,
    pub channels: Vec<Channel>,
    pub samplers: Vec<AnimationSampler>,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    /// Index into the owning animation's samplers.
    pub sampler: usize,
    pub target: ChannelTarget,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelTarget {
    pub node: Option<usize>,
    pub path: TargetPath,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSampler {
    /// Keyframe times.
    pub input: usize,
    /// Keyframe values.
    pub output: usize,
    pub interpolation: Interpolation,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Skin {
    pub name: Option<String>,
    pub inverse_bind_matrices: Option<usize>,
    pub skeleton: Option<usize>,
    pub joints: Vec<usize>,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub name: Option<String>,
    pub projection: Projection,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Perspective(Perspective),
    Orthographic(Orthographic),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Perspective {
    pub aspect_ratio: Option<f32>,
    pub yfov: f32,
    /// Absent for an infinite projection.
    pub zfar: Option<f32>,
    pub znear: f32,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Orthographic {
    pub xmag: f32,
    pub ymag: f32,
    pub zfar: f32,
    pub znear: f32,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

/// Root object of `KHR_materials_variants`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaterialVariants {
    pub variants: Vec<Variant>,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

/// A named material variant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Variant {
    pub name: Option<String>,
    /// Nested extension payloads: extension name to property map.
    pub extensions: Option<IndexMap<String, IndexMap<String, Value>>>,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

/// Per-primitive `KHR_materials_variants` object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PrimitiveVariants {
    pub mappings: Vec<VariantMapping>,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

/// Material to use when any of `variants` is active.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariantMapping {
    pub material: usize,
    pub variants: Vec<usize>,
    pub name: Option<String>,
    pub extensions: Extensions,
    pub extras: Option<Value>,
    pub unknown: Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trs_matrix() {
        let t = Transform::from_trs(Vec3::new(1.0, 2.0, 3.0), Quat::IDENTITY, Vec3::ONE);
        assert_eq!(
            t,
            Transform::Trs {
                translation: Some([1.0, 2.0, 3.0]),
                rotation: None,
                scale: None,
            }
        );
        let m = t.to_matrix();
        assert_eq!(m.w_axis.truncate(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_default_transform_is_identity() {
        let node = Node::default();
        assert_eq!(node.local_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_len_of_variants() {
        let mut doc = Document::new();
        assert_eq!(doc.len_of(EntityKind::Variant), 0);
        doc.material_variants = Some(MaterialVariants {
            variants: vec![Variant::default(), Variant::default()],
            ..Default::default()
        });
        assert_eq!(doc.len_of(EntityKind::Variant), 2);
        assert_eq!(doc.asset.version, "2.0");
    }

    #[test]
    fn test_use_extension_dedups() {
        let mut doc = Document::new();
        doc.use_extension(KHR_MATERIALS_VARIANTS);
        doc.use_extension(KHR_MATERIALS_VARIANTS);
        assert_eq!(doc.extensions_used, vec![KHR_MATERIALS_VARIANTS.to_string()]);
    }
}
