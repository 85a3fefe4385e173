//! End-to-end parse/emit tests over both containers.

use glam::Vec3;
use glaze_buffer::{read_accessor, AccessorSpec, BufferBuilder};
use glaze_core::{
    Accessor, AccessorType, Animation, AnimationSampler, BufferSource, BufferTarget, Camera,
    Channel, ChannelTarget, CodecError, ComponentType, Extensions, HookContext, HookPhase, Image,
    ImageSource, Interpolation, Material, MaterialVariants, MemorySink, Mesh, Node,
    PbrMetallicRoughness, Perspective, Primitive, PrimitiveVariants, Projection, Sampler, Scene,
    Severity, TargetPath, Texture, TextureInfo, Transform, ValidationError, Variant, VariantMapping,
    KHR_MATERIALS_VARIANTS,
};
use glaze_io::{
    detect, emit, emit_with, export_scene, parse, primitive_attribute, walk_scene, Container,
    Document, EmitOptions, ExportOptions, ExtensionHook, HostMesh, HostNode, HostPrimitive,
    MemoryResources, NoResources, Result, SceneSource, SceneVisitor, Session,
};
use proptest::prelude::*;
use serde_json::json;

fn sample(source: BufferSource) -> Document {
    let mut doc = Document::new();
    doc.asset.generator = Some("glaze tests".into());
    let builder = BufferBuilder::new(&mut doc, source);

    let positions = builder
        .push_vec3(&mut doc, &[Vec3::ZERO, Vec3::X, Vec3::Y])
        .unwrap();
    let indices = builder.push_indices(&mut doc, &[0, 1, 2]).unwrap();
    let colors = builder
        .push_accessor(
            &mut doc,
            &[1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0],
            &AccessorSpec::new(ComponentType::U8, AccessorType::Vec4)
                .normalized()
                .target(BufferTarget::ArrayBuffer),
        )
        .unwrap();
    let times = builder
        .push_accessor(
            &mut doc,
            &[0.0, 1.0],
            &AccessorSpec::new(ComponentType::F32, AccessorType::Scalar).with_bounds(),
        )
        .unwrap();
    let offsets = builder
        .push_accessor(
            &mut doc,
            &[0.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            &AccessorSpec::new(ComponentType::F32, AccessorType::Vec3),
        )
        .unwrap();
    let png = builder.push_bytes(&mut doc, &[0x89, b'P', b'N', b'G'], None);

    let mut prim = Primitive {
        indices: Some(indices),
        material: Some(0),
        variants: Some(PrimitiveVariants {
            mappings: vec![VariantMapping {
                material: 0,
                variants: vec![0],
                ..Default::default()
            }],
            ..Default::default()
        }),
        ..Default::default()
    };
    prim.attributes.insert("POSITION".into(), positions);
    prim.attributes.insert("COLOR_0".into(), colors);
    doc.meshes.push(Mesh {
        name: Some("tri".into()),
        primitives: vec![prim],
        ..Default::default()
    });

    let mut material = Material {
        name: Some("paint".into()),
        pbr_metallic_roughness: Some(PbrMetallicRoughness {
            base_color_factor: [0.5, 0.25, 1.0, 1.0],
            base_color_texture: Some(TextureInfo {
                index: 0,
                tex_coord: 0,
                extensions: Default::default(),
                extras: None,
                unknown: Default::default(),
            }),
            ..Default::default()
        }),
        double_sided: true,
        ..Default::default()
    };
    material.extensions.insert("EXT_custom".into(), json!({ "k": 1 }));
    doc.materials.push(material);
    doc.use_extension("EXT_custom");

    doc.images.push(Image {
        name: None,
        source: ImageSource::BufferView {
            buffer_view: png,
            mime_type: "image/png".into(),
        },
        extensions: Default::default(),
        extras: None,
        unknown: Default::default(),
    });
    doc.samplers.push(Sampler::default());
    doc.textures.push(Texture {
        name: None,
        sampler: Some(0),
        source: Some(0),
        extensions: Default::default(),
        extras: None,
        unknown: Default::default(),
    });

    doc.cameras.push(Camera {
        name: None,
        projection: Projection::Perspective(Perspective {
            aspect_ratio: Some(1.5),
            yfov: 0.8,
            zfar: None,
            znear: 0.01,
            extensions: Default::default(),
            extras: None,
            unknown: Default::default(),
        }),
        extensions: Default::default(),
        extras: None,
        unknown: Default::default(),
    });

    let mut root = Node {
        name: Some("root".into()),
        children: vec![1],
        camera: Some(0),
        extras: Some(json!({ "tag": "a" })),
        ..Default::default()
    };
    root.unknown.insert("x-note".into(), json!(1));
    doc.nodes.push(root);
    doc.nodes.push(Node {
        mesh: Some(0),
        transform: Transform::from_trs(Vec3::new(0.0, 0.0, -2.0), glam::Quat::IDENTITY, Vec3::splat(2.0)),
        ..Default::default()
    });
    doc.scenes.push(Scene {
        nodes: vec![0],
        ..Default::default()
    });
    doc.scene = Some(0);

    doc.animations.push(Animation {
        name: Some("slide".into()),
        channels: vec![Channel {
            sampler: 0,
            target: ChannelTarget {
                node: Some(1),
                path: TargetPath::Translation,
                extensions: Default::default(),
                extras: None,
                unknown: Default::default(),
            },
            extensions: Default::default(),
            extras: None,
            unknown: Default::default(),
        }],
        samplers: vec![AnimationSampler {
            input: times,
            output: offsets,
            interpolation: Interpolation::Linear,
            extensions: Default::default(),
            extras: None,
            unknown: Default::default(),
        }],
        ..Default::default()
    });

    doc.material_variants = Some(MaterialVariants {
        variants: vec![Variant {
            name: Some("matte".into()),
            ..Default::default()
        }],
        ..Default::default()
    });
    doc.use_extension(KHR_MATERIALS_VARIANTS);
    doc
}

fn data_uri() -> BufferSource {
    BufferSource::DataUri {
        mime_type: "application/octet-stream".into(),
    }
}

#[test]
fn test_glb_round_trip() {
    let doc = sample(BufferSource::Glb);
    let bytes = emit(&doc, &mut NoResources).unwrap();
    assert_eq!(detect(&bytes), Container::Glb);
    assert_eq!(parse(&bytes, &NoResources).unwrap(), doc);
}

#[test]
fn test_json_round_trip() {
    let doc = sample(data_uri());
    let bytes = emit_with(&doc, &EmitOptions::new().json().pretty(), &mut NoResources).unwrap();
    assert_eq!(detect(&bytes), Container::Json);
    assert_eq!(parse(&bytes, &NoResources).unwrap(), doc);
}

#[test]
fn test_external_buffer_round_trip() {
    let doc = sample(BufferSource::External("scene.bin".into()));
    let mut resources = MemoryResources::new();
    let bytes = emit_with(&doc, &EmitOptions::new().json(), &mut resources).unwrap();
    assert_eq!(resources.uris().collect::<Vec<_>>(), ["scene.bin"]);
    assert_eq!(parse(&bytes, &resources).unwrap(), doc);
}

#[test]
fn test_emit_is_idempotent() {
    for options in [EmitOptions::new().glb(), EmitOptions::new().json()] {
        let doc = if options.container == Container::Glb {
            sample(BufferSource::Glb)
        } else {
            sample(data_uri())
        };
        let first = emit_with(&doc, &options, &mut NoResources).unwrap();
        let reparsed = parse(&first, &NoResources).unwrap();
        let second = emit_with(&reparsed, &options, &mut NoResources).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_minimal_glb_scenario() {
    let json = br#"{"asset":{"version":"2.0"},"scene":0,"scenes":[{"nodes":[0]}],"nodes":[{}]}"#;
    let glb = glaze_buffer::write_glb(json, None).unwrap();

    let doc = parse(&glb, &NoResources).unwrap();
    assert_eq!(doc.scenes[0].nodes, vec![0]);
    assert_eq!(doc.nodes.len(), 1);
    assert_eq!(doc.nodes[0].mesh, None);
    assert_eq!(doc.asset.version, "2.0");

    let again = parse(&emit(&doc, &mut NoResources).unwrap(), &NoResources).unwrap();
    assert_eq!(again, doc);
}

#[test]
fn test_json_chunk_padding() {
    let mut doc = Document::new();
    doc.asset.generator = Some("g".repeat(59));
    let json = emit_with(&doc, &EmitOptions::new().json(), &mut NoResources).unwrap();
    assert_eq!(json.len(), 101);

    let glb = emit(&doc, &mut NoResources).unwrap();
    assert_eq!(u32::from_le_bytes(glb[12..16].try_into().unwrap()), 104);
    assert_eq!(&glb[20..121], json.as_slice());
    assert_eq!(&glb[121..124], b"   ");
    assert_eq!(glb.len(), 124);
    assert_eq!(u32::from_le_bytes(glb[8..12].try_into().unwrap()), 124);
}

#[test]
fn test_normalized_accessor_end_to_end() {
    let mut doc = Document::new();
    let builder = BufferBuilder::new(&mut doc, BufferSource::Glb);
    let view = builder.push_bytes(&mut doc, &[255, 0], None);
    let mut accessor = Accessor::new(ComponentType::U8, AccessorType::Scalar, 2);
    accessor.buffer_view = Some(view);
    accessor.normalized = true;
    doc.accessors.push(accessor);

    let parsed = parse(&emit(&doc, &mut NoResources).unwrap(), &NoResources).unwrap();
    assert_eq!(read_accessor(&parsed, 0).unwrap().to_f32(), vec![1.0, 0.0]);
}

#[test]
fn test_sparse_accessor_end_to_end() {
    let mut doc = Document::new();
    let builder = BufferBuilder::new(&mut doc, BufferSource::Glb);
    let spec = AccessorSpec::new(ComponentType::F32, AccessorType::Scalar);
    let index = builder
        .push_sparse(&mut doc, 4, &[1, 3], &[2.0, 4.0], &spec)
        .unwrap();

    let parsed = parse(&emit(&doc, &mut NoResources).unwrap(), &NoResources).unwrap();
    assert!(parsed.accessors[index].sparse.is_some());
    assert_eq!(
        read_accessor(&parsed, index).unwrap().to_f32(),
        vec![0.0, 2.0, 0.0, 4.0]
    );
}

#[test]
fn test_sparse_patch_over_zero_vectors() {
    let mut doc = Document::new();
    let builder = BufferBuilder::new(&mut doc, BufferSource::Glb);
    let spec = AccessorSpec::new(ComponentType::F32, AccessorType::Vec3);
    builder
        .push_sparse(&mut doc, 5, &[2], &[1.0, 1.0, 1.0], &spec)
        .unwrap();

    let parsed = parse(&emit(&doc, &mut NoResources).unwrap(), &NoResources).unwrap();
    let vectors = read_accessor(&parsed, 0).unwrap().to_vec3().unwrap();
    assert_eq!(vectors, [Vec3::ZERO, Vec3::ZERO, Vec3::ONE, Vec3::ZERO, Vec3::ZERO]);
}

#[test]
fn test_dangling_reference_rejected_on_emit() {
    let mut doc = Document::new();
    doc.scenes.push(Scene {
        nodes: vec![0],
        ..Default::default()
    });
    assert!(emit(&doc, &mut NoResources).is_err());
    assert!(emit_with(&doc, &EmitOptions::new().without_validation(), &mut NoResources).is_ok());
}

#[test]
#[cfg(target_pointer_width = "64")]
fn test_huge_offsets_rejected_on_parse() {
    let buffers = r#""buffers": [{ "byteLength": 4, "uri": "data:application/octet-stream;base64,AAAAAA==" }],
        "bufferViews": [{ "buffer": 0, "byteLength": 4 }]"#;
    let offset = format!(
        r#"{{ "asset": {{ "version": "2.0" }}, {buffers},
        "accessors": [{{ "bufferView": 0, "byteOffset": 18446744073709551615,
                         "componentType": 5126, "count": 1, "type": "SCALAR" }}] }}"#
    );
    let sparse = format!(
        r#"{{ "asset": {{ "version": "2.0" }}, {buffers},
        "accessors": [{{ "componentType": 5126, "count": 18446744073709551615, "type": "SCALAR",
                         "sparse": {{ "count": 9223372036854775807,
                                      "indices": {{ "bufferView": 0, "componentType": 5125 }},
                                      "values": {{ "bufferView": 0 }} }} }}] }}"#
    );
    for text in [offset, sparse] {
        match parse(text.as_bytes(), &NoResources) {
            Err(CodecError::Validation(report)) => assert!(
                report
                    .iter()
                    .any(|e| matches!(e, ValidationError::OutOfBounds { .. })),
                "{report}"
            ),
            other => panic!("expected a validation error, got {other:?}"),
        }
    }
}

#[derive(Default)]
struct StampNodes {
    imported: usize,
}

impl ExtensionHook for StampNodes {
    fn node(&mut self, ctx: &HookContext, _node: &Node, bag: &mut Extensions) -> Result<()> {
        match ctx.phase {
            HookPhase::Export => {
                bag.insert("EXT_stamp".into(), json!({ "index": ctx.index }));
            }
            HookPhase::Import => self.imported += 1,
        }
        Ok(())
    }
}

#[test]
fn test_session_hooks_and_sink() {
    let doc = sample(BufferSource::Glb);
    let mut hook = StampNodes::default();
    let mut sink = MemorySink::new();

    let mut session = Session::new(&mut sink).with_hooks(&mut hook);
    let bytes = session.emit(&doc, &mut NoResources).unwrap();
    let parsed = session.parse(&bytes, &NoResources).unwrap();

    assert!(doc.nodes[1].extensions.is_empty());
    assert_eq!(parsed.nodes[1].extensions["EXT_stamp"], json!({ "index": 1 }));
    assert_eq!(hook.imported, 2);
    assert_eq!(sink.of(Severity::Profile).count(), 2);
}

#[test]
fn test_unknown_top_level_key_warns() {
    let json = br#"{"asset":{"version":"2.0"},"x-tool":{"v":1}}"#;
    let mut sink = MemorySink::new();
    let doc = Session::new(&mut sink).parse(json, &NoResources).unwrap();
    assert_eq!(doc.unknown["x-tool"], json!({ "v": 1 }));
    let warnings: Vec<_> = sink.of(Severity::Warning).collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].path.as_deref(), Some("x-tool"));
}

struct Pyramid {
    nodes: Vec<HostNode>,
    meshes: Vec<HostMesh>,
}

impl SceneSource for Pyramid {
    fn roots(&self) -> &[usize] {
        &[0]
    }
    fn nodes(&self) -> &[HostNode] {
        &self.nodes
    }
    fn meshes(&self) -> &[HostMesh] {
        &self.meshes
    }
}

struct CountMeshes(usize);

impl SceneVisitor for CountMeshes {
    fn enter_node(&mut self, doc: &Document, node: usize, _world: &glam::Mat4) -> Result<bool> {
        self.0 += usize::from(doc.nodes[node].mesh.is_some());
        Ok(true)
    }
}

#[test]
fn test_export_emit_parse_walk() {
    let points = vec![Vec3::ZERO, Vec3::X, Vec3::Z, Vec3::Y];
    let source = Pyramid {
        nodes: vec![
            HostNode {
                children: vec![1],
                ..Default::default()
            },
            HostNode {
                mesh: Some(0),
                ..Default::default()
            },
        ],
        meshes: vec![HostMesh {
            name: Some("pyramid".into()),
            primitives: vec![HostPrimitive {
                positions: points.clone(),
                indices: Some(vec![0, 1, 2, 0, 2, 3, 0, 3, 1, 1, 3, 2]),
                ..Default::default()
            }],
        }],
    };

    let mut sink = MemorySink::new();
    let doc = export_scene(&source, &ExportOptions::new().with_generator("walker"), &mut sink).unwrap();
    let parsed = parse(&emit(&doc, &mut NoResources).unwrap(), &NoResources).unwrap();
    assert_eq!(parsed.asset.generator.as_deref(), Some("walker"));

    let mut count = CountMeshes(0);
    walk_scene(&parsed, None, &mut count).unwrap();
    assert_eq!(count.0, 1);

    let view = primitive_attribute(&parsed, 0, 0, "POSITION").unwrap().unwrap();
    assert_eq!(view.to_vec3().unwrap(), points);
}

proptest! {
    #[test]
    fn prop_glb_chunks_stay_aligned(len in 0usize..48, bin in proptest::collection::vec(any::<u8>(), 0..16)) {
        let mut doc = Document::new();
        doc.asset.generator = Some("x".repeat(len));
        if !bin.is_empty() {
            let builder = BufferBuilder::new(&mut doc, BufferSource::Glb);
            builder.push_bytes(&mut doc, &bin, None);
        }
        let glb = emit(&doc, &mut NoResources).unwrap();
        let json_len = u32::from_le_bytes(glb[12..16].try_into().unwrap()) as usize;
        prop_assert_eq!(json_len % 4, 0);
        prop_assert_eq!(glb.len() % 4, 0);
        prop_assert_eq!(parse(&glb, &NoResources).unwrap(), doc);
    }
}
