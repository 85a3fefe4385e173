//! Enumerated glTF constants.
//!
//! glTF stores enums either as GL numeric codes (`componentType`, filters,
//! wrap modes, buffer targets, primitive modes) or as upper-case strings
//! (`type`, `interpolation`, `alphaMode`). The two traits below give the
//! JSON codec a uniform way to convert both kinds.

use serde::{Deserialize, Serialize};

/// An enum stored as a numeric GL code.
pub trait NumericEnum: Sized + Copy {
    /// Human-readable name of the enum, used in error messages.
    const KIND: &'static str;

    /// Look up a variant by its code.
    fn from_code(code: u32) -> Option<Self>;

    /// The code written to JSON.
    fn code(self) -> u32;
}

/// An enum stored as a string constant.
pub trait NamedEnum: Sized + Copy {
    /// Human-readable name of the enum, used in error messages.
    const KIND: &'static str;

    /// Look up a variant by its JSON name.
    fn from_name(name: &str) -> Option<Self>;

    /// The name written to JSON.
    fn name(self) -> &'static str;
}

macro_rules! numeric_enum {
    ($ty:ident, $kind:literal, { $($variant:ident = $code:literal),+ $(,)? }) => {
        impl NumericEnum for $ty {
            const KIND: &'static str = $kind;

            fn from_code(code: u32) -> Option<Self> {
                match code {
                    $($code => Some(Self::$variant),)+
                    _ => None,
                }
            }

            fn code(self) -> u32 {
                match self {
                    $(Self::$variant => $code,)+
                }
            }
        }
    };
}

macro_rules! named_enum {
    ($ty:ident, $kind:literal, { $($variant:ident = $name:literal),+ $(,)? }) => {
        impl NamedEnum for $ty {
            const KIND: &'static str = $kind;

            fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Self::$variant),)+
                    _ => None,
                }
            }

            fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }
    };
}

/// Data type of a single accessor component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
}

numeric_enum!(ComponentType, "componentType", {
    I8 = 5120,
    U8 = 5121,
    I16 = 5122,
    U16 = 5123,
    U32 = 5125,
    F32 = 5126,
});

impl ComponentType {
    /// Size of one component in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::U32 | Self::F32 => 4,
        }
    }

    /// Whether the component is a signed integer.
    pub fn is_signed_integer(self) -> bool {
        matches!(self, Self::I8 | Self::I16)
    }

    /// Whether the component is an integer type.
    pub fn is_integer(self) -> bool {
        !matches!(self, Self::F32)
    }

    /// Integer range representable by this component type.
    ///
    /// Returns `None` for floats.
    pub fn integer_range(self) -> Option<(f64, f64)> {
        match self {
            Self::I8 => Some((i8::MIN as f64, i8::MAX as f64)),
            Self::U8 => Some((0.0, u8::MAX as f64)),
            Self::I16 => Some((i16::MIN as f64, i16::MAX as f64)),
            Self::U16 => Some((0.0, u16::MAX as f64)),
            Self::U32 => Some((0.0, u32::MAX as f64)),
            Self::F32 => None,
        }
    }
}

/// Shape of an accessor element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessorType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

named_enum!(AccessorType, "accessor type", {
    Scalar = "SCALAR",
    Vec2 = "VEC2",
    Vec3 = "VEC3",
    Vec4 = "VEC4",
    Mat2 = "MAT2",
    Mat3 = "MAT3",
    Mat4 = "MAT4",
});

impl AccessorType {
    /// Number of components per element.
    pub fn components(self) -> usize {
        self.columns() * self.rows()
    }

    /// Number of columns; 1 for scalars and vectors.
    pub fn columns(self) -> usize {
        match self {
            Self::Mat2 => 2,
            Self::Mat3 => 3,
            Self::Mat4 => 4,
            _ => 1,
        }
    }

    /// Number of rows per column.
    pub fn rows(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 | Self::Mat2 => 2,
            Self::Vec3 | Self::Mat3 => 3,
            Self::Vec4 | Self::Mat4 => 4,
        }
    }

    pub fn is_matrix(self) -> bool {
        matches!(self, Self::Mat2 | Self::Mat3 | Self::Mat4)
    }

    /// Bytes per element. Matrix columns start on 4-byte boundaries.
    pub fn element_size(self, component_type: ComponentType) -> usize {
        let column = self.rows() * component_type.size();
        let column = if self.is_matrix() { (column + 3) & !3 } else { column };
        column * self.columns()
    }
}

/// Topology of a mesh primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

numeric_enum!(PrimitiveMode, "primitive mode", {
    Points = 0,
    Lines = 1,
    LineLoop = 2,
    LineStrip = 3,
    Triangles = 4,
    TriangleStrip = 5,
    TriangleFan = 6,
});

/// Keyframe interpolation of an animation sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interpolation {
    #[default]
    Linear,
    Step,
    CubicSpline,
}

named_enum!(Interpolation, "interpolation", {
    Linear = "LINEAR",
    Step = "STEP",
    CubicSpline = "CUBICSPLINE",
});

/// Node property driven by an animation channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetPath {
    Translation,
    Rotation,
    Scale,
    Weights,
    /// `KHR_animation_pointer`; the target lives in the channel's extensions.
    Pointer,
}

named_enum!(TargetPath, "animation target path", {
    Translation = "translation",
    Rotation = "rotation",
    Scale = "scale",
    Weights = "weights",
    Pointer = "pointer",
});

impl TargetPath {
    /// Components per keyframe value for this path, if fixed.
    pub fn value_type(self) -> Option<AccessorType> {
        match self {
            Self::Translation | Self::Scale => Some(AccessorType::Vec3),
            Self::Rotation => Some(AccessorType::Vec4),
            Self::Weights => Some(AccessorType::Scalar),
            Self::Pointer => None,
        }
    }
}

/// Intended GPU binding of a buffer view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferTarget {
    ArrayBuffer,
    ElementArrayBuffer,
}

numeric_enum!(BufferTarget, "buffer view target", {
    ArrayBuffer = 34962,
    ElementArrayBuffer = 34963,
});

/// Alpha rendering mode of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

named_enum!(AlphaMode, "alpha mode", {
    Opaque = "OPAQUE",
    Mask = "MASK",
    Blend = "BLEND",
});

/// Magnification filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MagFilter {
    Nearest,
    Linear,
}

numeric_enum!(MagFilter, "magFilter", {
    Nearest = 9728,
    Linear = 9729,
});

/// Minification filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MinFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

numeric_enum!(MinFilter, "minFilter", {
    Nearest = 9728,
    Linear = 9729,
    NearestMipmapNearest = 9984,
    LinearMipmapNearest = 9985,
    NearestMipmapLinear = 9986,
    LinearMipmapLinear = 9987,
});

/// Texture coordinate wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WrapMode {
    ClampToEdge,
    MirroredRepeat,
    #[default]
    Repeat,
}

numeric_enum!(WrapMode, "wrap mode", {
    ClampToEdge = 33071,
    MirroredRepeat = 33648,
    Repeat = 10497,
});

/// Kind of top-level entity, used to tag references and validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Asset,
    Scene,
    Node,
    Mesh,
    Accessor,
    BufferView,
    Buffer,
    Material,
    Texture,
    Image,
    Sampler,
    Animation,
    AnimationSampler,
    Skin,
    Camera,
    Variant,
}

impl EntityKind {
    /// Name of the top-level JSON array holding this kind.
    pub fn array_name(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Scene => "scenes",
            Self::Node => "nodes",
            Self::Mesh => "meshes",
            Self::Accessor => "accessors",
            Self::BufferView => "bufferViews",
            Self::Buffer => "buffers",
            Self::Material => "materials",
            Self::Texture => "textures",
            Self::Image => "images",
            Self::Sampler => "samplers",
            Self::Animation => "animations",
            Self::AnimationSampler => "samplers",
            Self::Skin => "skins",
            Self::Camera => "cameras",
            Self::Variant => "variants",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Asset => "asset",
            Self::Scene => "scene",
            Self::Node => "node",
            Self::Mesh => "mesh",
            Self::Accessor => "accessor",
            Self::BufferView => "buffer view",
            Self::Buffer => "buffer",
            Self::Material => "material",
            Self::Texture => "texture",
            Self::Image => "image",
            Self::Sampler => "sampler",
            Self::Animation => "animation",
            Self::AnimationSampler => "animation sampler",
            Self::Skin => "skin",
            Self::Camera => "camera",
            Self::Variant => "variant",
        };
        f.write_str(name)
    }
}
