//! Export-side adapter: building a document from a host scene.

use glam::{Quat, Vec2, Vec3, Vec4};
use glaze_buffer::{AccessorSpec, BufferBuilder};
use glaze_core::{
    AccessorType, AlphaMode, Animation, AnimationSampler, Asset, BufferSource, BufferTarget,
    Channel, ChannelTarget, CodecError, ComponentType, DiagnosticSink, Document, Interpolation,
    Material, MaterialVariants, Mesh, Node, PbrMetallicRoughness, Primitive, PrimitiveMode,
    PrimitiveVariants, Result, Scene, TargetPath, Transform, Variant, VariantMapping,
    KHR_MATERIALS_VARIANTS,
};
use serde_json::Value;

use crate::options::ExportOptions;

/// A host scene node. Indices refer to the slices of the [`SceneSource`].
#[derive(Debug, Clone, PartialEq)]
pub struct HostNode {
    pub name: Option<String>,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub children: Vec<usize>,
    pub mesh: Option<usize>,
    pub extras: Option<Value>,
}

impl Default for HostNode {
    fn default() -> Self {
        Self {
            name: None,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            children: Vec::new(),
            mesh: None,
            extras: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HostMesh {
    pub name: Option<String>,
    pub primitives: Vec<HostPrimitive>,
}

/// Vertex streams of one primitive. Empty streams are not exported.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HostPrimitive {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tex_coords: Vec<Vec2>,
    pub colors: Vec<Vec4>,
    pub indices: Option<Vec<u32>>,
    pub mode: PrimitiveMode,
    pub material: Option<usize>,
    /// `(material, variant indices)` pairs for `KHR_materials_variants`.
    pub variant_materials: Vec<(usize, Vec<usize>)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostMaterial {
    pub name: Option<String>,
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub emissive: [f32; 3],
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: Option<f32>,
    pub double_sided: bool,
    pub extras: Option<Value>,
}

impl Default for HostMaterial {
    fn default() -> Self {
        Self {
            name: None,
            base_color: [1.0; 4],
            metallic: 1.0,
            roughness: 1.0,
            emissive: [0.0; 3],
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: None,
            double_sided: false,
            extras: None,
        }
    }
}

/// Keyframes for one animated property of one node.
///
/// `values` is flat: components per keyframe follow the target path, and
/// CUBICSPLINE keyframes carry in-tangent, value and out-tangent.
#[derive(Debug, Clone, PartialEq)]
pub struct HostChannel {
    pub node: usize,
    pub path: TargetPath,
    pub interpolation: Interpolation,
    pub times: Vec<f32>,
    pub values: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HostAnimation {
    pub name: Option<String>,
    pub channels: Vec<HostChannel>,
}

/// A host scene graph that can be exported.
pub trait SceneSource {
    fn name(&self) -> Option<&str> {
        None
    }

    /// Top-level nodes of the exported scene.
    fn roots(&self) -> &[usize];

    fn nodes(&self) -> &[HostNode];

    fn meshes(&self) -> &[HostMesh] {
        &[]
    }

    fn materials(&self) -> &[HostMaterial] {
        &[]
    }

    fn animations(&self) -> &[HostAnimation] {
        &[]
    }

    /// Names of material variants, indexed by `variant_materials`.
    fn variants(&self) -> &[String] {
        &[]
    }
}

/// Build a document from a host scene.
///
/// Node, mesh and material indices are kept as-is. Geometry and keyframes
/// go into a single GLB-chunk buffer. Animations without channels are
/// dropped.
pub fn export_scene(
    source: &dyn SceneSource,
    options: &ExportOptions,
    sink: &mut dyn DiagnosticSink,
) -> Result<Document> {
    let mut doc = Document::new();
    doc.asset = Asset {
        generator: Some(options.generator.clone().unwrap_or_else(|| "glaze".to_string())),
        ..Asset::default()
    };

    let builder = BufferBuilder::new(&mut doc, BufferSource::Glb);

    doc.materials = source
        .materials()
        .iter()
        .map(|m| export_material(m, options))
        .collect();

    for (i, mesh) in source.meshes().iter().enumerate() {
        let mut primitives = Vec::with_capacity(mesh.primitives.len());
        for (j, prim) in mesh.primitives.iter().enumerate() {
            primitives.push(export_primitive(&mut doc, &builder, prim).map_err(|err| {
                CodecError::invalid(format!("meshes[{i}].primitives[{j}]"), err.to_string())
            })?);
        }
        doc.meshes.push(Mesh {
            name: mesh.name.clone(),
            primitives,
            ..Default::default()
        });
    }

    doc.nodes = source
        .nodes()
        .iter()
        .map(|n| Node {
            name: n.name.clone(),
            children: n.children.clone(),
            mesh: n.mesh,
            transform: Transform::from_trs(n.translation, n.rotation, n.scale),
            extras: if options.include_extras { n.extras.clone() } else { None },
            ..Default::default()
        })
        .collect();

    for (i, animation) in source.animations().iter().enumerate() {
        if animation.channels.is_empty() {
            sink.info(format!("animation {i} has no channels and is skipped"));
            continue;
        }
        let exported = export_animation(&mut doc, &builder, animation)?;
        doc.animations.push(exported);
    }

    if !source.variants().is_empty() {
        doc.material_variants = Some(MaterialVariants {
            variants: source
                .variants()
                .iter()
                .map(|name| Variant {
                    name: Some(name.clone()),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        });
    }
    if doc.material_variants.is_some()
        || doc.meshes.iter().flat_map(|m| &m.primitives).any(|p| p.variants.is_some())
    {
        doc.use_extension(KHR_MATERIALS_VARIANTS);
    }

    if !source.roots().is_empty() {
        doc.scenes.push(Scene {
            name: source.name().map(str::to_string),
            nodes: source.roots().to_vec(),
            ..Default::default()
        });
        doc.scene = Some(0);
    }

    if doc.buffers[builder.buffer_index()].data.is_empty() {
        doc.buffers.pop();
    }
    sink.debug(format!(
        "exported {} nodes, {} meshes, {} animations",
        doc.nodes.len(),
        doc.meshes.len(),
        doc.animations.len()
    ));
    Ok(doc)
}

fn export_material(m: &HostMaterial, options: &ExportOptions) -> Material {
    Material {
        name: m.name.clone(),
        pbr_metallic_roughness: Some(PbrMetallicRoughness {
            base_color_factor: m.base_color,
            metallic_factor: m.metallic,
            roughness_factor: m.roughness,
            ..Default::default()
        }),
        emissive_factor: m.emissive,
        alpha_mode: m.alpha_mode,
        alpha_cutoff: (m.alpha_mode == AlphaMode::Mask).then_some(m.alpha_cutoff).flatten(),
        double_sided: m.double_sided,
        extras: if options.include_extras { m.extras.clone() } else { None },
        ..Default::default()
    }
}

fn flatten<const N: usize>(values: impl Iterator<Item = [f32; N]>) -> Vec<f64> {
    values.flat_map(|v| v.map(f64::from)).collect()
}

fn export_primitive(doc: &mut Document, builder: &BufferBuilder, prim: &HostPrimitive) -> Result<Primitive> {
    let mut out = Primitive {
        mode: prim.mode,
        material: prim.material,
        ..Default::default()
    };

    if !prim.positions.is_empty() {
        let index = builder.push_vec3(doc, &prim.positions)?;
        out.attributes.insert("POSITION".into(), index);
    }
    if !prim.normals.is_empty() {
        let spec = AccessorSpec::new(ComponentType::F32, AccessorType::Vec3).target(BufferTarget::ArrayBuffer);
        let index = builder.push_accessor(doc, &flatten(prim.normals.iter().map(|v| v.to_array())), &spec)?;
        out.attributes.insert("NORMAL".into(), index);
    }
    if !prim.tex_coords.is_empty() {
        let spec = AccessorSpec::new(ComponentType::F32, AccessorType::Vec2).target(BufferTarget::ArrayBuffer);
        let index = builder.push_accessor(doc, &flatten(prim.tex_coords.iter().map(|v| v.to_array())), &spec)?;
        out.attributes.insert("TEXCOORD_0".into(), index);
    }
    if !prim.colors.is_empty() {
        let spec = AccessorSpec::new(ComponentType::F32, AccessorType::Vec4).target(BufferTarget::ArrayBuffer);
        let index = builder.push_accessor(doc, &flatten(prim.colors.iter().map(|v| v.to_array())), &spec)?;
        out.attributes.insert("COLOR_0".into(), index);
    }
    if let Some(indices) = prim.indices.as_ref().filter(|i| !i.is_empty()) {
        out.indices = Some(builder.push_indices(doc, indices)?);
    }

    if !prim.variant_materials.is_empty() {
        out.variants = Some(PrimitiveVariants {
            mappings: prim
                .variant_materials
                .iter()
                .map(|(material, variants)| VariantMapping {
                    material: *material,
                    variants: variants.clone(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        });
    }
    Ok(out)
}

fn export_animation(doc: &mut Document, builder: &BufferBuilder, animation: &HostAnimation) -> Result<Animation> {
    let mut out = Animation {
        name: animation.name.clone(),
        ..Default::default()
    };
    for (i, channel) in animation.channels.iter().enumerate() {
        let value_type = channel.path.value_type().ok_or_else(|| {
            CodecError::invalid(
                format!("animations[{}].channels[{i}].target.path", doc.animations.len()),
                "pointer targets cannot be exported from host keyframes",
            )
        })?;

        let input_spec = AccessorSpec::new(ComponentType::F32, AccessorType::Scalar).with_bounds();
        let times: Vec<f64> = channel.times.iter().map(|&t| f64::from(t)).collect();
        let input = builder.push_accessor(doc, &times, &input_spec)?;

        let output_spec = AccessorSpec::new(ComponentType::F32, value_type);
        let values: Vec<f64> = channel.values.iter().map(|&v| f64::from(v)).collect();
        let output = builder.push_accessor(doc, &values, &output_spec)?;

        out.samplers.push(AnimationSampler {
            input,
            output,
            interpolation: channel.interpolation,
            extensions: Default::default(),
            extras: None,
            unknown: Default::default(),
        });
        out.channels.push(Channel {
            sampler: out.samplers.len() - 1,
            target: ChannelTarget {
                node: Some(channel.node),
                path: channel.path,
                extensions: Default::default(),
                extras: None,
                unknown: Default::default(),
            },
            extensions: Default::default(),
            extras: None,
            unknown: Default::default(),
        });
    }
    Ok(out)
}
