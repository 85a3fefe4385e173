//! glTF JSON to [`Document`].

use glaze_buffer::uri::{decode_data_uri, is_data_uri};
use glaze_core::{
    Accessor, AccessorType, Animation, AnimationSampler, Asset, Buffer, BufferSource, BufferView,
    Camera, Channel, ChannelTarget, CodecError, ComponentType, DiagnosticSink, Document,
    ExtensionHook, HookContext, HookPhase, Image, ImageSource, Material, MaterialVariants, Mesh,
    Node, NormalTextureInfo, OcclusionTextureInfo, Orthographic, PbrMetallicRoughness,
    Perspective, Primitive, PrimitiveVariants, Projection, Result, Sampler, Scene, Skin, Sparse,
    SparseIndices, SparseValues, TargetPath, Texture, TextureInfo, Transform, Variant,
    VariantMapping, KHR_MATERIALS_VARIANTS,
};
use indexmap::IndexMap;
use serde_json::Value;

use crate::value::{decode_null, decode_union, field_path, FromJson, ObjectReader, UnionArm};

/// Decode a parsed glTF JSON root into a document.
///
/// Buffer bytes are left empty except for data URIs; the caller resolves
/// GLB and external buffers afterwards. `hooks` sees every node, material
/// and animation channel before it is stored.
pub fn decode_document(
    root: &Value,
    hooks: &mut dyn ExtensionHook,
    sink: &mut dyn DiagnosticSink,
) -> Result<Document> {
    let mut r = ObjectReader::new(root, "")?;

    let asset = r.required_with("asset", asset)?;
    let scene = r.optional("scene")?;
    let scenes = r.list_with("scenes", |v, p, _| self::scene(v, p))?;
    let nodes = r.list_with("nodes", |v, p, i| {
        let mut node = self::node(v, p)?;
        let mut bag = std::mem::take(&mut node.extensions);
        hooks.node(&HookContext::new(HookPhase::Import, i), &node, &mut bag)?;
        node.extensions = bag;
        Ok(node)
    })?;
    let meshes = r.list_with("meshes", |v, p, _| mesh(v, p))?;
    let accessors = r.list_with("accessors", |v, p, _| accessor(v, p))?;
    let buffer_views = r.list_with("bufferViews", |v, p, _| buffer_view(v, p))?;
    let buffers = r.list_with("buffers", |v, p, _| buffer(v, p))?;
    let materials = r.list_with("materials", |v, p, i| {
        let mut material = self::material(v, p)?;
        let mut bag = std::mem::take(&mut material.extensions);
        hooks.material(&HookContext::new(HookPhase::Import, i), &material, &mut bag)?;
        material.extensions = bag;
        Ok(material)
    })?;
    let textures = r.list_with("textures", |v, p, _| texture(v, p))?;
    let images = r.list_with("images", |v, p, _| image(v, p))?;
    let samplers = r.list_with("samplers", |v, p, _| sampler(v, p))?;
    let animations = r.list_with("animations", |v, p, i| animation(v, p, i, &mut *hooks))?;
    let skins = r.list_with("skins", |v, p, _| skin(v, p))?;
    let cameras = r.list_with("cameras", |v, p, _| camera(v, p))?;
    let extensions_used: Vec<String> = r.list("extensionsUsed")?;
    let extensions_required: Vec<String> = r.list("extensionsRequired")?;
    let mut extensions = r.extensions()?;
    let extras = r.extras();
    let unknown = r.finish();

    let material_variants = match extensions.shift_remove(KHR_MATERIALS_VARIANTS) {
        Some(value) => Some(material_variants(
            &value,
            &format!("extensions.{KHR_MATERIALS_VARIANTS}"),
        )?),
        None => None,
    };

    for name in &extensions_used {
        if name != KHR_MATERIALS_VARIANTS {
            sink.debug(format!("extension {name} is carried without interpretation"));
        }
    }
    for name in &extensions_required {
        if name != KHR_MATERIALS_VARIANTS {
            sink.warning(format!(
                "required extension {name} is not implemented; its data is preserved"
            ));
        }
    }
    for key in unknown.keys() {
        sink.warning_at(key.as_str(), "unknown top-level property preserved");
    }

    Ok(Document {
        asset,
        scene,
        scenes,
        nodes,
        meshes,
        accessors,
        buffer_views,
        buffers,
        materials,
        textures,
        images,
        samplers,
        animations,
        skins,
        cameras,
        material_variants,
        extensions_used,
        extensions_required,
        extensions,
        extras,
        unknown,
    })
}

fn asset(value: &Value, path: &str) -> Result<Asset> {
    let mut r = ObjectReader::new(value, path)?;
    Ok(Asset {
        version: r.required("version")?,
        min_version: r.optional("minVersion")?,
        generator: r.optional("generator")?,
        copyright: r.optional("copyright")?,
        extensions: r.extensions()?,
        extras: r.extras(),
        unknown: r.finish(),
    })
}

fn scene(value: &Value, path: &str) -> Result<Scene> {
    let mut r = ObjectReader::new(value, path)?;
    Ok(Scene {
        name: r.optional("name")?,
        nodes: r.list("nodes")?,
        extensions: r.extensions()?,
        extras: r.extras(),
        unknown: r.finish(),
    })
}

fn node(value: &Value, path: &str) -> Result<Node> {
    let mut r = ObjectReader::new(value, path)?;
    let name = r.optional("name")?;
    let children = r.list("children")?;
    let camera = r.optional("camera")?;
    let skin = r.optional("skin")?;
    let mesh = r.optional("mesh")?;

    let matrix: Option<[f32; 16]> = r.optional("matrix")?;
    let translation = r.optional("translation")?;
    let rotation = r.optional("rotation")?;
    let scale = r.optional("scale")?;
    let transform = match matrix {
        Some(_) if translation.is_some() || rotation.is_some() || scale.is_some() => {
            return Err(CodecError::invalid(
                path,
                "node has both `matrix` and translation/rotation/scale",
            ))
        }
        Some(m) => Transform::Matrix(m),
        None => Transform::Trs {
            translation,
            rotation,
            scale,
        },
    };

    Ok(Node {
        name,
        children,
        mesh,
        camera,
        skin,
        transform,
        weights: r.optional("weights")?,
        extensions: r.extensions()?,
        extras: r.extras(),
        unknown: r.finish(),
    })
}

fn mesh(value: &Value, path: &str) -> Result<Mesh> {
    let mut r = ObjectReader::new(value, path)?;
    Ok(Mesh {
        primitives: r.list_with("primitives", |v, p, _| primitive(v, p))?,
        weights: r.optional("weights")?,
        name: r.optional("name")?,
        extensions: r.extensions()?,
        extras: r.extras(),
        unknown: r.finish(),
    })
}

fn primitive(value: &Value, path: &str) -> Result<Primitive> {
    let mut r = ObjectReader::new(value, path)?;
    let attributes = r.required("attributes")?;
    let indices = r.optional("indices")?;
    let material = r.optional("material")?;
    let mode = r.numeric("mode")?.unwrap_or_default();
    let targets = r.list("targets")?;
    let mut extensions = r.extensions()?;
    let variants = match extensions.shift_remove(KHR_MATERIALS_VARIANTS) {
        Some(value) => Some(primitive_variants(
            &value,
            &field_path(path, &format!("extensions.{KHR_MATERIALS_VARIANTS}")),
        )?),
        None => None,
    };
    Ok(Primitive {
        attributes,
        indices,
        material,
        mode,
        targets,
        variants,
        extensions,
        extras: r.extras(),
        unknown: r.finish(),
    })
}

fn accessor(value: &Value, path: &str) -> Result<Accessor> {
    let mut r = ObjectReader::new(value, path)?;
    let buffer_view = r.optional("bufferView")?;
    let byte_offset = r.or("byteOffset", 0)?;
    let component_type: ComponentType = required_enum(r.numeric("componentType")?, &r, "componentType")?;
    let normalized = r.or("normalized", false)?;
    let count = r.required("count")?;
    let accessor_type: AccessorType = required_enum(r.named("type")?, &r, "type")?;
    let max = r.optional("max")?;
    let min = r.optional("min")?;
    let sparse = r.optional_with("sparse", sparse)?;
    Ok(Accessor {
        name: r.optional("name")?,
        buffer_view,
        byte_offset,
        component_type,
        normalized,
        count,
        accessor_type,
        min,
        max,
        sparse,
        extensions: r.extensions()?,
        extras: r.extras(),
        unknown: r.finish(),
    })
}

fn required_enum<T>(value: Option<T>, r: &ObjectReader<'_>, key: &str) -> Result<T> {
    value.ok_or_else(|| CodecError::MissingField {
        path: r.field_path(key),
    })
}

fn sparse(value: &Value, path: &str) -> Result<Sparse> {
    let mut r = ObjectReader::new(value, path)?;
    Ok(Sparse {
        count: r.required("count")?,
        indices: r.required_with("indices", |v, p| {
            let mut r = ObjectReader::new(v, p)?;
            Ok(SparseIndices {
                buffer_view: r.required("bufferView")?,
                byte_offset: r.or("byteOffset", 0)?,
                component_type: required_enum(r.numeric("componentType")?, &r, "componentType")?,
                extensions: r.extensions()?,
                extras: r.extras(),
                unknown: r.finish(),
            })
        })?,
        values: r.required_with("values", |v, p| {
            let mut r = ObjectReader::new(v, p)?;
            Ok(SparseValues {
                buffer_view: r.required("bufferView")?,
                byte_offset: r.or("byteOffset", 0)?,
                extensions: r.extensions()?,
                extras: r.extras(),
                unknown: r.finish(),
            })
        })?,
        extensions: r.extensions()?,
        extras: r.extras(),
        unknown: r.finish(),
    })
}

fn buffer_view(value: &Value, path: &str) -> Result<BufferView> {
    let mut r = ObjectReader::new(value, path)?;
    Ok(BufferView {
        buffer: r.required("buffer")?,
        byte_offset: r.or("byteOffset", 0)?,
        byte_length: r.required("byteLength")?,
        byte_stride: r.optional("byteStride")?,
        target: r.numeric("target")?,
        name: r.optional("name")?,
        extensions: r.extensions()?,
        extras: r.extras(),
        unknown: r.finish(),
    })
}

fn buffer(value: &Value, path: &str) -> Result<Buffer> {
    let mut r = ObjectReader::new(value, path)?;
    let uri: Option<String> = r.optional("uri")?;
    let byte_length = r.required("byteLength")?;
    let (source, data) = match uri {
        None => (BufferSource::Glb, Vec::new()),
        Some(uri) if is_data_uri(&uri) => {
            let decoded = decode_data_uri(&uri)?;
            (
                BufferSource::DataUri {
                    mime_type: decoded.mime_type,
                },
                decoded.data,
            )
        }
        Some(uri) => (BufferSource::External(uri), Vec::new()),
    };
    Ok(Buffer {
        name: r.optional("name")?,
        byte_length,
        source,
        data,
        extensions: r.extensions()?,
        extras: r.extras(),
        unknown: r.finish(),
    })
}

fn material(value: &Value, path: &str) -> Result<Material> {
    let mut r = ObjectReader::new(value, path)?;
    Ok(Material {
        name: r.optional("name")?,
        pbr_metallic_roughness: r.optional_with("pbrMetallicRoughness", pbr)?,
        normal_texture: r.optional_with("normalTexture", |v, p| {
            let mut r = ObjectReader::new(v, p)?;
            Ok(NormalTextureInfo {
                index: r.required("index")?,
                tex_coord: r.or("texCoord", 0)?,
                scale: r.or("scale", 1.0)?,
                extensions: r.extensions()?,
                extras: r.extras(),
                unknown: r.finish(),
            })
        })?,
        occlusion_texture: r.optional_with("occlusionTexture", |v, p| {
            let mut r = ObjectReader::new(v, p)?;
            Ok(OcclusionTextureInfo {
                index: r.required("index")?,
                tex_coord: r.or("texCoord", 0)?,
                strength: r.or("strength", 1.0)?,
                extensions: r.extensions()?,
                extras: r.extras(),
                unknown: r.finish(),
            })
        })?,
        emissive_texture: r.optional_with("emissiveTexture", texture_info)?,
        emissive_factor: r.or("emissiveFactor", [0.0; 3])?,
        alpha_mode: r.named("alphaMode")?.unwrap_or_default(),
        alpha_cutoff: r.optional("alphaCutoff")?,
        double_sided: r.or("doubleSided", false)?,
        extensions: r.extensions()?,
        extras: r.extras(),
        unknown: r.finish(),
    })
}

fn pbr(value: &Value, path: &str) -> Result<PbrMetallicRoughness> {
    let mut r = ObjectReader::new(value, path)?;
    Ok(PbrMetallicRoughness {
        base_color_factor: r.or("baseColorFactor", [1.0; 4])?,
        base_color_texture: r.optional_with("baseColorTexture", texture_info)?,
        metallic_factor: r.or("metallicFactor", 1.0)?,
        roughness_factor: r.or("roughnessFactor", 1.0)?,
        metallic_roughness_texture: r.optional_with("metallicRoughnessTexture", texture_info)?,
        extensions: r.extensions()?,
        extras: r.extras(),
        unknown: r.finish(),
    })
}

fn texture_info(value: &Value, path: &str) -> Result<TextureInfo> {
    let mut r = ObjectReader::new(value, path)?;
    Ok(TextureInfo {
        index: r.required("index")?,
        tex_coord: r.or("texCoord", 0)?,
        extensions: r.extensions()?,
        extras: r.extras(),
        unknown: r.finish(),
    })
}

fn texture(value: &Value, path: &str) -> Result<Texture> {
    let mut r = ObjectReader::new(value, path)?;
    Ok(Texture {
        sampler: r.optional("sampler")?,
        source: r.optional("source")?,
        name: r.optional("name")?,
        extensions: r.extensions()?,
        extras: r.extras(),
        unknown: r.finish(),
    })
}

fn image(value: &Value, path: &str) -> Result<Image> {
    let mut r = ObjectReader::new(value, path)?;
    let uri: Option<String> = r.optional("uri")?;
    let mime_type: Option<String> = r.optional("mimeType")?;
    let buffer_view: Option<usize> = r.optional("bufferView")?;
    let source = match (uri, buffer_view) {
        (Some(_), Some(_)) => {
            return Err(CodecError::invalid(path, "image has both `uri` and `bufferView`"))
        }
        (Some(uri), None) => ImageSource::Uri { uri, mime_type },
        (None, Some(buffer_view)) => ImageSource::BufferView {
            buffer_view,
            mime_type: mime_type.ok_or_else(|| CodecError::MissingField {
                path: r.field_path("mimeType"),
            })?,
        },
        (None, None) => {
            return Err(CodecError::MissingField {
                path: r.field_path("uri"),
            })
        }
    };
    Ok(Image {
        name: r.optional("name")?,
        source,
        extensions: r.extensions()?,
        extras: r.extras(),
        unknown: r.finish(),
    })
}

fn sampler(value: &Value, path: &str) -> Result<Sampler> {
    let mut r = ObjectReader::new(value, path)?;
    Ok(Sampler {
        mag_filter: r.numeric("magFilter")?,
        min_filter: r.numeric("minFilter")?,
        wrap_s: r.numeric("wrapS")?.unwrap_or_default(),
        wrap_t: r.numeric("wrapT")?.unwrap_or_default(),
        name: r.optional("name")?,
        extensions: r.extensions()?,
        extras: r.extras(),
        unknown: r.finish(),
    })
}

fn animation(
    value: &Value,
    path: &str,
    index: usize,
    hooks: &mut dyn ExtensionHook,
) -> Result<Animation> {
    let mut r = ObjectReader::new(value, path)?;
    let channels = r.list_with("channels", |v, p, i| {
        let mut channel = channel(v, p)?;
        let mut bag = std::mem::take(&mut channel.extensions);
        hooks.animation_channel(
            &HookContext::channel(HookPhase::Import, index, i),
            &channel,
            &mut bag,
        )?;
        channel.extensions = bag;
        Ok(channel)
    })?;
    Ok(Animation {
        channels,
        samplers: r.list_with("samplers", |v, p, _| animation_sampler(v, p))?,
        name: r.optional("name")?,
        extensions: r.extensions()?,
        extras: r.extras(),
        unknown: r.finish(),
    })
}

fn channel(value: &Value, path: &str) -> Result<Channel> {
    let mut r = ObjectReader::new(value, path)?;
    Ok(Channel {
        sampler: r.required("sampler")?,
        target: r.required_with("target", |v, p| {
            let mut r = ObjectReader::new(v, p)?;
            let node = r.optional("node")?;
            let path: TargetPath = required_enum(r.named("path")?, &r, "path")?;
            Ok(ChannelTarget {
                node,
                path,
                extensions: r.extensions()?,
                extras: r.extras(),
                unknown: r.finish(),
            })
        })?,
        extensions: r.extensions()?,
        extras: r.extras(),
        unknown: r.finish(),
    })
}

fn animation_sampler(value: &Value, path: &str) -> Result<AnimationSampler> {
    let mut r = ObjectReader::new(value, path)?;
    Ok(AnimationSampler {
        input: r.required("input")?,
        interpolation: r.named("interpolation")?.unwrap_or_default(),
        output: r.required("output")?,
        extensions: r.extensions()?,
        extras: r.extras(),
        unknown: r.finish(),
    })
}

fn skin(value: &Value, path: &str) -> Result<Skin> {
    let mut r = ObjectReader::new(value, path)?;
    Ok(Skin {
        inverse_bind_matrices: r.optional("inverseBindMatrices")?,
        skeleton: r.optional("skeleton")?,
        joints: r.required("joints")?,
        name: r.optional("name")?,
        extensions: r.extensions()?,
        extras: r.extras(),
        unknown: r.finish(),
    })
}

fn camera(value: &Value, path: &str) -> Result<Camera> {
    let mut r = ObjectReader::new(value, path)?;
    let kind: String = r.required("type")?;
    let orthographic = r.optional_with("orthographic", |v, p| {
        let mut r = ObjectReader::new(v, p)?;
        Ok(Orthographic {
            xmag: r.required("xmag")?,
            ymag: r.required("ymag")?,
            zfar: r.required("zfar")?,
            znear: r.required("znear")?,
            extensions: r.extensions()?,
            extras: r.extras(),
            unknown: r.finish(),
        })
    })?;
    let perspective = r.optional_with("perspective", |v, p| {
        let mut r = ObjectReader::new(v, p)?;
        Ok(Perspective {
            aspect_ratio: r.optional("aspectRatio")?,
            yfov: r.required("yfov")?,
            zfar: r.optional("zfar")?,
            znear: r.required("znear")?,
            extensions: r.extensions()?,
            extras: r.extras(),
            unknown: r.finish(),
        })
    })?;
    let projection = match (kind.as_str(), perspective, orthographic) {
        ("perspective", Some(p), None) => Projection::Perspective(p),
        ("orthographic", None, Some(o)) => Projection::Orthographic(o),
        ("perspective", None, _) => {
            return Err(CodecError::MissingField {
                path: r.field_path("perspective"),
            })
        }
        ("orthographic", _, None) => {
            return Err(CodecError::MissingField {
                path: r.field_path("orthographic"),
            })
        }
        ("perspective", _, Some(_)) | ("orthographic", Some(_), _) => {
            return Err(CodecError::invalid(
                path,
                "camera defines both perspective and orthographic projections",
            ))
        }
        (other, _, _) => {
            return Err(CodecError::invalid(
                r.field_path("type"),
                format!("unknown camera type `{other}`"),
            ))
        }
    };
    Ok(Camera {
        name: r.optional("name")?,
        projection,
        extensions: r.extensions()?,
        extras: r.extras(),
        unknown: r.finish(),
    })
}

fn material_variants(value: &Value, path: &str) -> Result<MaterialVariants> {
    let mut r = ObjectReader::new(value, path)?;
    Ok(MaterialVariants {
        variants: r.list_with("variants", |v, p, _| variant(v, p))?,
        extensions: r.extensions()?,
        extras: r.extras(),
        unknown: r.finish(),
    })
}

type NestedExtensions = IndexMap<String, IndexMap<String, Value>>;

/// A variant's fields are each `T | null`; both spellings of "absent"
/// are accepted.
fn variant(value: &Value, path: &str) -> Result<Variant> {
    let mut r = ObjectReader::new(value, path)?;

    let as_string = |v: &Value, p: &str| -> Result<Option<String>> { String::from_json(v, p).map(Some) };
    let as_none = |v: &Value, p: &str| -> Result<Option<String>> { decode_null(v, p).map(|_| None) };
    let name_arms: [UnionArm<'_, Option<String>>; 2] = [("string", &as_string), ("null", &as_none)];

    let as_nested =
        |v: &Value, p: &str| -> Result<Option<NestedExtensions>> { NestedExtensions::from_json(v, p).map(Some) };
    let as_no_ext = |v: &Value, p: &str| -> Result<Option<NestedExtensions>> { decode_null(v, p).map(|_| None) };
    let ext_arms: [UnionArm<'_, Option<NestedExtensions>>; 2] =
        [("object", &as_nested), ("null", &as_no_ext)];

    let name = match r.raw("name") {
        Some(v) => decode_union(v, &r.field_path("name"), &name_arms)?,
        None => None,
    };
    let extensions = match r.raw("extensions") {
        Some(v) => decode_union(v, &r.field_path("extensions"), &ext_arms)?,
        None => None,
    };
    let extras = r.extras();
    Ok(Variant {
        name,
        extensions,
        extras,
        unknown: r.finish(),
    })
}

fn primitive_variants(value: &Value, path: &str) -> Result<PrimitiveVariants> {
    let mut r = ObjectReader::new(value, path)?;
    Ok(PrimitiveVariants {
        mappings: r.list_with("mappings", |v, p, _| {
            let mut r = ObjectReader::new(v, p)?;
            Ok(VariantMapping {
                variants: r.required("variants")?,
                material: r.required("material")?,
                name: r.optional("name")?,
                extensions: r.extensions()?,
                extras: r.extras(),
                unknown: r.finish(),
            })
        })?,
        extensions: r.extensions()?,
        extras: r.extras(),
        unknown: r.finish(),
    })
}
