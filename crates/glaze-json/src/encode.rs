//! [`Document`] to glTF JSON.

use glaze_buffer::uri::{encode_data_uri, GLTF_BUFFER};
use glaze_core::{
    Accessor, AlphaMode, Animation, AnimationSampler, Asset, Buffer, BufferSource, BufferView,
    Camera, Channel, ChannelTarget, DiagnosticSink, Document, ExtensionHook, Extensions,
    HookContext, HookPhase, Image, ImageSource, Interpolation, Material, MaterialVariants, Mesh,
    Node, NormalTextureInfo, OcclusionTextureInfo, PbrMetallicRoughness, Primitive,
    PrimitiveMode, PrimitiveVariants, Projection, Result, Sampler, Scene, Skin, Sparse, Texture,
    TextureInfo, Transform, Variant, WrapMode, KHR_MATERIALS_VARIANTS,
};
use serde_json::Value;

use crate::value::ObjectWriter;

/// Encoder switches that depend on the output container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Buffers stored in the GLB binary chunk are written as data URIs.
    ///
    /// Set when emitting plain JSON, which has no binary chunk.
    pub embed_glb_buffer: bool,
}

/// Encode a document as a glTF JSON value.
///
/// Keys follow the glTF schema order and values equal to their schema
/// default are omitted. `hooks` may rewrite the extension bag of every
/// node, material and animation channel; the document itself is never
/// modified.
pub fn encode_document(
    doc: &Document,
    options: &EncodeOptions,
    hooks: &mut dyn ExtensionHook,
    sink: &mut dyn DiagnosticSink,
) -> Result<Value> {
    let mut w = ObjectWriter::new();

    w.value("asset", asset(&doc.asset));
    w.opt("scene", &doc.scene);
    w.value_list("scenes", doc.scenes.iter().map(scene));

    let mut nodes = Vec::with_capacity(doc.nodes.len());
    for (i, n) in doc.nodes.iter().enumerate() {
        let mut bag = n.extensions.clone();
        hooks.node(&HookContext::new(HookPhase::Export, i), n, &mut bag)?;
        nodes.push(node(n, &bag));
    }
    w.value_list("nodes", nodes);

    w.value_list("meshes", doc.meshes.iter().map(mesh));
    w.value_list("accessors", doc.accessors.iter().map(accessor));
    w.value_list("bufferViews", doc.buffer_views.iter().map(buffer_view));

    let mut buffers = Vec::with_capacity(doc.buffers.len());
    for (i, b) in doc.buffers.iter().enumerate() {
        buffers.push(buffer(i, b, options, sink));
    }
    w.value_list("buffers", buffers);

    let mut materials = Vec::with_capacity(doc.materials.len());
    for (i, m) in doc.materials.iter().enumerate() {
        let mut bag = m.extensions.clone();
        hooks.material(&HookContext::new(HookPhase::Export, i), m, &mut bag)?;
        materials.push(material(m, &bag));
    }
    w.value_list("materials", materials);

    w.value_list("textures", doc.textures.iter().map(texture));
    w.value_list("images", doc.images.iter().map(image));
    w.value_list("samplers", doc.samplers.iter().map(sampler));

    let mut animations = Vec::with_capacity(doc.animations.len());
    for (i, a) in doc.animations.iter().enumerate() {
        animations.push(animation(i, a, hooks)?);
    }
    w.value_list("animations", animations);

    w.value_list("skins", doc.skins.iter().map(skin));
    w.value_list("cameras", doc.cameras.iter().map(camera));

    let mut used = doc.extensions_used.clone();
    if doc.material_variants.is_some() || uses_primitive_variants(doc) {
        if !used.iter().any(|e| e == KHR_MATERIALS_VARIANTS) {
            used.push(KHR_MATERIALS_VARIANTS.to_string());
        }
    }
    w.list("extensionsUsed", &used);
    w.list("extensionsRequired", &doc.extensions_required);

    let mut extensions = doc.extensions.clone();
    if let Some(variants) = &doc.material_variants {
        extensions.insert(KHR_MATERIALS_VARIANTS.to_string(), material_variants(variants));
    }
    w.extensions(&extensions);
    w.extras(&doc.extras);
    w.unknown(&doc.unknown);
    Ok(w.finish())
}

fn uses_primitive_variants(doc: &Document) -> bool {
    doc.meshes
        .iter()
        .flat_map(|m| &m.primitives)
        .any(|p| p.variants.is_some())
}

fn asset(a: &Asset) -> Value {
    ObjectWriter::new()
        .opt("copyright", &a.copyright)
        .opt("generator", &a.generator)
        .put("version", &a.version)
        .opt("minVersion", &a.min_version)
        .extensions(&a.extensions)
        .extras(&a.extras)
        .unknown(&a.unknown)
        .finish()
}

fn scene(s: &Scene) -> Value {
    ObjectWriter::new()
        .list("nodes", &s.nodes)
        .opt("name", &s.name)
        .extensions(&s.extensions)
        .extras(&s.extras)
        .unknown(&s.unknown)
        .finish()
}

fn node(n: &Node, extensions: &Extensions) -> Value {
    let mut w = ObjectWriter::new();
    w.opt("camera", &n.camera)
        .list("children", &n.children)
        .opt("skin", &n.skin);
    match &n.transform {
        Transform::Matrix(m) => {
            w.put("matrix", m);
        }
        Transform::Trs {
            translation,
            rotation,
            scale,
        } => {
            w.opt("rotation", rotation)
                .opt("scale", scale)
                .opt("translation", translation);
        }
    }
    w.opt("mesh", &n.mesh)
        .opt("weights", &n.weights)
        .opt("name", &n.name)
        .extensions(extensions)
        .extras(&n.extras)
        .unknown(&n.unknown)
        .finish()
}

fn mesh(m: &Mesh) -> Value {
    ObjectWriter::new()
        .value_list("primitives", m.primitives.iter().map(primitive))
        .opt("weights", &m.weights)
        .opt("name", &m.name)
        .extensions(&m.extensions)
        .extras(&m.extras)
        .unknown(&m.unknown)
        .finish()
}

fn primitive(p: &Primitive) -> Value {
    let mut extensions = p.extensions.clone();
    if let Some(variants) = &p.variants {
        extensions.insert(KHR_MATERIALS_VARIANTS.to_string(), primitive_variants(variants));
    }
    let mut w = ObjectWriter::new();
    w.put("attributes", &p.attributes)
        .opt("indices", &p.indices)
        .opt("material", &p.material);
    if p.mode != PrimitiveMode::default() {
        w.numeric("mode", p.mode);
    }
    w.list("targets", &p.targets)
        .extensions(&extensions)
        .extras(&p.extras)
        .unknown(&p.unknown)
        .finish()
}

fn accessor(a: &Accessor) -> Value {
    let mut w = ObjectWriter::new();
    w.opt("bufferView", &a.buffer_view)
        .non_default("byteOffset", &a.byte_offset, &0)
        .numeric("componentType", a.component_type)
        .non_default("normalized", &a.normalized, &false)
        .put("count", &a.count)
        .named("type", a.accessor_type)
        .opt("max", &a.max)
        .opt("min", &a.min);
    if let Some(s) = &a.sparse {
        w.value("sparse", sparse(s));
    }
    w.opt("name", &a.name)
        .extensions(&a.extensions)
        .extras(&a.extras)
        .unknown(&a.unknown)
        .finish()
}

fn sparse(s: &Sparse) -> Value {
    let indices = ObjectWriter::new()
        .put("bufferView", &s.indices.buffer_view)
        .non_default("byteOffset", &s.indices.byte_offset, &0)
        .numeric("componentType", s.indices.component_type)
        .extensions(&s.indices.extensions)
        .extras(&s.indices.extras)
        .unknown(&s.indices.unknown)
        .finish();
    let values = ObjectWriter::new()
        .put("bufferView", &s.values.buffer_view)
        .non_default("byteOffset", &s.values.byte_offset, &0)
        .extensions(&s.values.extensions)
        .extras(&s.values.extras)
        .unknown(&s.values.unknown)
        .finish();
    ObjectWriter::new()
        .put("count", &s.count)
        .value("indices", indices)
        .value("values", values)
        .extensions(&s.extensions)
        .extras(&s.extras)
        .unknown(&s.unknown)
        .finish()
}

fn buffer_view(v: &BufferView) -> Value {
    let mut w = ObjectWriter::new();
    w.put("buffer", &v.buffer)
        .non_default("byteOffset", &v.byte_offset, &0)
        .put("byteLength", &v.byte_length)
        .opt("byteStride", &v.byte_stride);
    if let Some(target) = v.target {
        w.numeric("target", target);
    }
    w.opt("name", &v.name)
        .extensions(&v.extensions)
        .extras(&v.extras)
        .unknown(&v.unknown)
        .finish()
}

fn buffer(index: usize, b: &Buffer, options: &EncodeOptions, sink: &mut dyn DiagnosticSink) -> Value {
    let uri = match &b.source {
        BufferSource::Glb if options.embed_glb_buffer => {
            sink.warning_at(
                format!("buffers[{index}]"),
                "binary-chunk buffer written as a data URI",
            );
            Some(encode_data_uri(GLTF_BUFFER, &b.data))
        }
        BufferSource::Glb => None,
        BufferSource::DataUri { mime_type } => Some(encode_data_uri(mime_type, &b.data)),
        BufferSource::External(uri) => Some(uri.clone()),
    };
    ObjectWriter::new()
        .opt("uri", &uri)
        .put("byteLength", &b.byte_length)
        .opt("name", &b.name)
        .extensions(&b.extensions)
        .extras(&b.extras)
        .unknown(&b.unknown)
        .finish()
}

fn material(m: &Material, extensions: &Extensions) -> Value {
    let mut w = ObjectWriter::new();
    w.opt("name", &m.name);
    if let Some(pbr) = &m.pbr_metallic_roughness {
        w.value("pbrMetallicRoughness", pbr_metallic_roughness(pbr));
    }
    if let Some(t) = &m.normal_texture {
        w.value("normalTexture", normal_texture(t));
    }
    if let Some(t) = &m.occlusion_texture {
        w.value("occlusionTexture", occlusion_texture(t));
    }
    if let Some(t) = &m.emissive_texture {
        w.value("emissiveTexture", texture_info(t));
    }
    w.non_default("emissiveFactor", &m.emissive_factor, &[0.0; 3]);
    if m.alpha_mode != AlphaMode::default() {
        w.named("alphaMode", m.alpha_mode);
    }
    w.opt("alphaCutoff", &m.alpha_cutoff)
        .non_default("doubleSided", &m.double_sided, &false)
        .extensions(extensions)
        .extras(&m.extras)
        .unknown(&m.unknown)
        .finish()
}

fn pbr_metallic_roughness(p: &PbrMetallicRoughness) -> Value {
    let mut w = ObjectWriter::new();
    w.non_default("baseColorFactor", &p.base_color_factor, &[1.0; 4]);
    if let Some(t) = &p.base_color_texture {
        w.value("baseColorTexture", texture_info(t));
    }
    w.non_default("metallicFactor", &p.metallic_factor, &1.0)
        .non_default("roughnessFactor", &p.roughness_factor, &1.0);
    if let Some(t) = &p.metallic_roughness_texture {
        w.value("metallicRoughnessTexture", texture_info(t));
    }
    w.extensions(&p.extensions)
        .extras(&p.extras)
        .unknown(&p.unknown)
        .finish()
}

fn texture_info(t: &TextureInfo) -> Value {
    ObjectWriter::new()
        .put("index", &t.index)
        .non_default("texCoord", &t.tex_coord, &0)
        .extensions(&t.extensions)
        .extras(&t.extras)
        .unknown(&t.unknown)
        .finish()
}

fn normal_texture(t: &NormalTextureInfo) -> Value {
    ObjectWriter::new()
        .put("index", &t.index)
        .non_default("texCoord", &t.tex_coord, &0)
        .non_default("scale", &t.scale, &1.0)
        .extensions(&t.extensions)
        .extras(&t.extras)
        .unknown(&t.unknown)
        .finish()
}

fn occlusion_texture(t: &OcclusionTextureInfo) -> Value {
    ObjectWriter::new()
        .put("index", &t.index)
        .non_default("texCoord", &t.tex_coord, &0)
        .non_default("strength", &t.strength, &1.0)
        .extensions(&t.extensions)
        .extras(&t.extras)
        .unknown(&t.unknown)
        .finish()
}

fn texture(t: &Texture) -> Value {
    ObjectWriter::new()
        .opt("sampler", &t.sampler)
        .opt("source", &t.source)
        .opt("name", &t.name)
        .extensions(&t.extensions)
        .extras(&t.extras)
        .unknown(&t.unknown)
        .finish()
}

fn image(i: &Image) -> Value {
    let mut w = ObjectWriter::new();
    match &i.source {
        ImageSource::Uri { uri, mime_type } => {
            w.put("uri", uri).opt("mimeType", mime_type);
        }
        ImageSource::BufferView {
            buffer_view,
            mime_type,
        } => {
            w.put("mimeType", mime_type).put("bufferView", buffer_view);
        }
    }
    w.opt("name", &i.name)
        .extensions(&i.extensions)
        .extras(&i.extras)
        .unknown(&i.unknown)
        .finish()
}

fn sampler(s: &Sampler) -> Value {
    let mut w = ObjectWriter::new();
    if let Some(f) = s.mag_filter {
        w.numeric("magFilter", f);
    }
    if let Some(f) = s.min_filter {
        w.numeric("minFilter", f);
    }
    if s.wrap_s != WrapMode::default() {
        w.numeric("wrapS", s.wrap_s);
    }
    if s.wrap_t != WrapMode::default() {
        w.numeric("wrapT", s.wrap_t);
    }
    w.opt("name", &s.name)
        .extensions(&s.extensions)
        .extras(&s.extras)
        .unknown(&s.unknown)
        .finish()
}

fn animation(index: usize, a: &Animation, hooks: &mut dyn ExtensionHook) -> Result<Value> {
    let mut channels = Vec::with_capacity(a.channels.len());
    for (i, c) in a.channels.iter().enumerate() {
        let mut bag = c.extensions.clone();
        hooks.animation_channel(&HookContext::channel(HookPhase::Export, index, i), c, &mut bag)?;
        channels.push(channel(c, &bag));
    }
    Ok(ObjectWriter::new()
        .value_list("channels", channels)
        .value_list("samplers", a.samplers.iter().map(animation_sampler))
        .opt("name", &a.name)
        .extensions(&a.extensions)
        .extras(&a.extras)
        .unknown(&a.unknown)
        .finish())
}

fn channel(c: &Channel, extensions: &Extensions) -> Value {
    ObjectWriter::new()
        .put("sampler", &c.sampler)
        .value("target", channel_target(&c.target))
        .extensions(extensions)
        .extras(&c.extras)
        .unknown(&c.unknown)
        .finish()
}

fn channel_target(t: &ChannelTarget) -> Value {
    ObjectWriter::new()
        .opt("node", &t.node)
        .named("path", t.path)
        .extensions(&t.extensions)
        .extras(&t.extras)
        .unknown(&t.unknown)
        .finish()
}

fn animation_sampler(s: &AnimationSampler) -> Value {
    let mut w = ObjectWriter::new();
    w.put("input", &s.input);
    if s.interpolation != Interpolation::default() {
        w.named("interpolation", s.interpolation);
    }
    w.put("output", &s.output)
        .extensions(&s.extensions)
        .extras(&s.extras)
        .unknown(&s.unknown)
        .finish()
}

fn skin(s: &Skin) -> Value {
    ObjectWriter::new()
        .opt("inverseBindMatrices", &s.inverse_bind_matrices)
        .opt("skeleton", &s.skeleton)
        .put("joints", &s.joints)
        .opt("name", &s.name)
        .extensions(&s.extensions)
        .extras(&s.extras)
        .unknown(&s.unknown)
        .finish()
}

fn camera(c: &Camera) -> Value {
    let mut w = ObjectWriter::new();
    match &c.projection {
        Projection::Orthographic(o) => {
            let body = ObjectWriter::new()
                .put("xmag", &o.xmag)
                .put("ymag", &o.ymag)
                .put("zfar", &o.zfar)
                .put("znear", &o.znear)
                .extensions(&o.extensions)
                .extras(&o.extras)
                .unknown(&o.unknown)
                .finish();
            w.value("orthographic", body).put("type", "orthographic");
        }
        Projection::Perspective(p) => {
            let body = ObjectWriter::new()
                .opt("aspectRatio", &p.aspect_ratio)
                .put("yfov", &p.yfov)
                .opt("zfar", &p.zfar)
                .put("znear", &p.znear)
                .extensions(&p.extensions)
                .extras(&p.extras)
                .unknown(&p.unknown)
                .finish();
            w.value("perspective", body).put("type", "perspective");
        }
    }
    w.opt("name", &c.name)
        .extensions(&c.extensions)
        .extras(&c.extras)
        .unknown(&c.unknown)
        .finish()
}

fn material_variants(v: &MaterialVariants) -> Value {
    ObjectWriter::new()
        .value_list("variants", v.variants.iter().map(variant))
        .extensions(&v.extensions)
        .extras(&v.extras)
        .unknown(&v.unknown)
        .finish()
}

fn variant(v: &Variant) -> Value {
    ObjectWriter::new()
        .opt("name", &v.name)
        .opt("extensions", &v.extensions)
        .extras(&v.extras)
        .unknown(&v.unknown)
        .finish()
}

fn primitive_variants(v: &PrimitiveVariants) -> Value {
    let mappings = v.mappings.iter().map(|m| {
        ObjectWriter::new()
            .put("variants", &m.variants)
            .put("material", &m.material)
            .opt("name", &m.name)
            .extensions(&m.extensions)
            .extras(&m.extras)
            .unknown(&m.unknown)
            .finish()
    });
    ObjectWriter::new()
        .value_list("mappings", mappings)
        .extensions(&v.extensions)
        .extras(&v.extras)
        .unknown(&v.unknown)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glaze_core::{
        AccessorType, ComponentType, MemorySink, NoHooks, Orthographic, Severity,
    };
    use serde_json::json;

    fn encode(doc: &Document) -> Value {
        encode_document(doc, &EncodeOptions::default(), &mut NoHooks, &mut MemorySink::new()).unwrap()
    }

    fn minimal() -> Document {
        let mut doc = Document::new();
        doc.scene = Some(0);
        doc.scenes.push(Scene {
            nodes: vec![0],
            ..Default::default()
        });
        doc.nodes.push(Node::default());
        doc
    }

    #[test]
    fn test_minimal_document_is_compact() {
        insta::assert_json_snapshot!(encode(&minimal()), @r###"
        {
          "asset": {
            "version": "2.0"
          },
          "scene": 0,
          "scenes": [
            {
              "nodes": [
                0
              ]
            }
          ],
          "nodes": [
            {}
          ]
        }
        "###);
    }

    #[test]
    fn test_defaults_are_omitted() {
        let mut doc = Document::new();
        doc.accessors.push(Accessor::new(ComponentType::F32, AccessorType::Vec3, 2));
        doc.materials.push(Material::default());
        doc.samplers.push(Sampler::default());
        let value = encode(&doc);
        assert_eq!(
            value["accessors"][0],
            json!({ "componentType": 5126, "count": 2, "type": "VEC3" })
        );
        assert_eq!(value["materials"][0], json!({}));
        assert_eq!(value["samplers"][0], json!({}));
    }

    #[test]
    fn test_unknown_keys_reemitted() {
        let mut doc = Document::new();
        doc.asset
            .unknown
            .insert("vendorNote".into(), json!("kept"));
        doc.unknown.insert("topLevel".into(), json!([1, 2]));
        let value = encode(&doc);
        assert_eq!(value["asset"]["vendorNote"], json!("kept"));
        assert_eq!(value["topLevel"], json!([1, 2]));
    }

    #[test]
    fn test_glb_buffer_embedding() {
        let mut doc = Document::new();
        doc.buffers.push(Buffer::with_data(BufferSource::Glb, vec![1, 2, 3, 0]));

        let value = encode(&doc);
        assert_eq!(value["buffers"][0], json!({ "byteLength": 4 }));

        let mut sink = MemorySink::new();
        let options = EncodeOptions {
            embed_glb_buffer: true,
        };
        let value = encode_document(&doc, &options, &mut NoHooks, &mut sink).unwrap();
        assert_eq!(
            value["buffers"][0]["uri"],
            json!("data:application/gltf-buffer;base64,AQIDAA==")
        );
        assert_eq!(sink.of(Severity::Warning).count(), 1);
    }

    #[test]
    fn test_variants_reinserted() {
        let mut doc = Document::new();
        doc.material_variants = Some(MaterialVariants {
            variants: vec![Variant {
                name: Some("red".into()),
                ..Default::default()
            }],
            ..Default::default()
        });
        let value = encode(&doc);
        assert_eq!(
            value["extensions"][KHR_MATERIALS_VARIANTS],
            json!({ "variants": [{ "name": "red" }] })
        );
        assert_eq!(value["extensionsUsed"], json!([KHR_MATERIALS_VARIANTS]));
    }

    #[test]
    fn test_camera_and_matrix() {
        let mut doc = Document::new();
        doc.cameras.push(Camera {
            name: None,
            projection: Projection::Orthographic(Orthographic {
                xmag: 1.0,
                ymag: 2.0,
                zfar: 10.0,
                znear: 0.5,
                extensions: Default::default(),
                extras: None,
                unknown: Default::default(),
            }),
            extensions: Default::default(),
            extras: None,
            unknown: Default::default(),
        });
        let mut identity = [0.0; 16];
        for i in 0..4 {
            identity[i * 5] = 1.0;
        }
        doc.nodes.push(Node {
            transform: Transform::Matrix(identity),
            ..Default::default()
        });
        let value = encode(&doc);
        assert_eq!(value["cameras"][0]["type"], json!("orthographic"));
        assert_eq!(value["cameras"][0]["orthographic"]["znear"], json!(0.5));
        assert_eq!(value["nodes"][0]["matrix"][15], json!(1.0));
    }

    struct Stamp;

    impl ExtensionHook for Stamp {
        fn material(&mut self, ctx: &HookContext, _m: &Material, bag: &mut Extensions) -> Result<()> {
            assert_eq!(ctx.phase, HookPhase::Export);
            bag.insert("EXT_stamp".into(), json!(ctx.index));
            Ok(())
        }
    }

    #[test]
    fn test_hook_edits_emitted_copy_only() {
        let mut doc = Document::new();
        doc.materials.push(Material::default());
        let value = encode_document(&doc, &EncodeOptions::default(), &mut Stamp, &mut MemorySink::new()).unwrap();
        assert_eq!(value["materials"][0]["extensions"]["EXT_stamp"], json!(0));
        assert!(doc.materials[0].extensions.is_empty());
    }
}
