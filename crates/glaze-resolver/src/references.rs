//! Index bounds for every cross-entity reference.
//!
//! A reference equal to or past the end of its target array is reported as
//! [`ValidationError::DanglingIndex`] with the field path it was read from.

use glaze_core::{
    Attributes, Document, EntityKind, Material, TextureInfo, ValidationError, ValidationReport,
};

/// Check every index field in the document.
pub fn check_references(doc: &Document, report: &mut ValidationReport) {
    let mut checker = ReferenceChecker { doc, report };
    checker.check_document();
}

struct ReferenceChecker<'a> {
    doc: &'a Document,
    report: &'a mut ValidationReport,
}

impl ReferenceChecker<'_> {
    fn check(&mut self, kind: EntityKind, index: usize, field: String, target: EntityKind, value: usize) {
        self.check_len(kind, index, field, target, value, self.doc.len_of(target));
    }

    fn check_len(
        &mut self,
        kind: EntityKind,
        index: usize,
        field: String,
        target: EntityKind,
        value: usize,
        len: usize,
    ) {
        if value >= len {
            self.report.push(ValidationError::DanglingIndex {
                kind,
                index,
                field,
                target,
                value,
                len,
            });
        }
    }

    fn check_document(&mut self) {
        let doc = self.doc;

        if let Some(scene) = doc.scene {
            self.check(EntityKind::Asset, 0, "scene".into(), EntityKind::Scene, scene);
        }

        for (i, scene) in doc.scenes.iter().enumerate() {
            for (j, &node) in scene.nodes.iter().enumerate() {
                self.check(EntityKind::Scene, i, format!("scenes[{i}].nodes[{j}]"), EntityKind::Node, node);
            }
        }

        for (i, node) in doc.nodes.iter().enumerate() {
            for (j, &child) in node.children.iter().enumerate() {
                self.check(EntityKind::Node, i, format!("nodes[{i}].children[{j}]"), EntityKind::Node, child);
            }
            if let Some(mesh) = node.mesh {
                self.check(EntityKind::Node, i, format!("nodes[{i}].mesh"), EntityKind::Mesh, mesh);
            }
            if let Some(camera) = node.camera {
                self.check(EntityKind::Node, i, format!("nodes[{i}].camera"), EntityKind::Camera, camera);
            }
            if let Some(skin) = node.skin {
                self.check(EntityKind::Node, i, format!("nodes[{i}].skin"), EntityKind::Skin, skin);
            }
        }

        for (i, mesh) in doc.meshes.iter().enumerate() {
            for (j, prim) in mesh.primitives.iter().enumerate() {
                let path = format!("meshes[{i}].primitives[{j}]");
                self.check_attributes(i, &format!("{path}.attributes"), &prim.attributes);
                for (k, target) in prim.targets.iter().enumerate() {
                    self.check_attributes(i, &format!("{path}.targets[{k}]"), target);
                }
                if let Some(indices) = prim.indices {
                    self.check(EntityKind::Mesh, i, format!("{path}.indices"), EntityKind::Accessor, indices);
                }
                if let Some(material) = prim.material {
                    self.check(EntityKind::Mesh, i, format!("{path}.material"), EntityKind::Material, material);
                }
                if let Some(variants) = &prim.variants {
                    for (k, mapping) in variants.mappings.iter().enumerate() {
                        let mapping_path = format!("{path}.extensions.KHR_materials_variants.mappings[{k}]");
                        self.check(
                            EntityKind::Mesh,
                            i,
                            format!("{mapping_path}.material"),
                            EntityKind::Material,
                            mapping.material,
                        );
                        for (l, &variant) in mapping.variants.iter().enumerate() {
                            self.check(
                                EntityKind::Mesh,
                                i,
                                format!("{mapping_path}.variants[{l}]"),
                                EntityKind::Variant,
                                variant,
                            );
                        }
                    }
                }
            }
        }

        for (i, accessor) in doc.accessors.iter().enumerate() {
            if let Some(view) = accessor.buffer_view {
                self.check(EntityKind::Accessor, i, format!("accessors[{i}].bufferView"), EntityKind::BufferView, view);
            }
            if let Some(sparse) = &accessor.sparse {
                self.check(
                    EntityKind::Accessor,
                    i,
                    format!("accessors[{i}].sparse.indices.bufferView"),
                    EntityKind::BufferView,
                    sparse.indices.buffer_view,
                );
                self.check(
                    EntityKind::Accessor,
                    i,
                    format!("accessors[{i}].sparse.values.bufferView"),
                    EntityKind::BufferView,
                    sparse.values.buffer_view,
                );
            }
        }

        for (i, view) in doc.buffer_views.iter().enumerate() {
            self.check(EntityKind::BufferView, i, format!("bufferViews[{i}].buffer"), EntityKind::Buffer, view.buffer);
        }

        for (i, material) in doc.materials.iter().enumerate() {
            self.check_material(i, material);
        }

        for (i, texture) in doc.textures.iter().enumerate() {
            if let Some(sampler) = texture.sampler {
                self.check(EntityKind::Texture, i, format!("textures[{i}].sampler"), EntityKind::Sampler, sampler);
            }
            if let Some(source) = texture.source {
                self.check(EntityKind::Texture, i, format!("textures[{i}].source"), EntityKind::Image, source);
            }
        }

        for (i, image) in doc.images.iter().enumerate() {
            if let glaze_core::ImageSource::BufferView { buffer_view, .. } = image.source {
                self.check(EntityKind::Image, i, format!("images[{i}].bufferView"), EntityKind::BufferView, buffer_view);
            }
        }

        for (i, animation) in doc.animations.iter().enumerate() {
            for (j, channel) in animation.channels.iter().enumerate() {
                self.check_len(
                    EntityKind::Animation,
                    i,
                    format!("animations[{i}].channels[{j}].sampler"),
                    EntityKind::AnimationSampler,
                    channel.sampler,
                    animation.samplers.len(),
                );
                if let Some(node) = channel.target.node {
                    self.check(
                        EntityKind::Animation,
                        i,
                        format!("animations[{i}].channels[{j}].target.node"),
                        EntityKind::Node,
                        node,
                    );
                }
            }
            for (j, sampler) in animation.samplers.iter().enumerate() {
                let path = format!("animations[{i}].samplers[{j}]");
                self.check(EntityKind::Animation, i, format!("{path}.input"), EntityKind::Accessor, sampler.input);
                self.check(EntityKind::Animation, i, format!("{path}.output"), EntityKind::Accessor, sampler.output);
            }
        }

        for (i, skin) in doc.skins.iter().enumerate() {
            if let Some(ibm) = skin.inverse_bind_matrices {
                self.check(EntityKind::Skin, i, format!("skins[{i}].inverseBindMatrices"), EntityKind::Accessor, ibm);
            }
            if let Some(skeleton) = skin.skeleton {
                self.check(EntityKind::Skin, i, format!("skins[{i}].skeleton"), EntityKind::Node, skeleton);
            }
            for (j, &joint) in skin.joints.iter().enumerate() {
                self.check(EntityKind::Skin, i, format!("skins[{i}].joints[{j}]"), EntityKind::Node, joint);
            }
        }
    }

    fn check_attributes(&mut self, mesh: usize, path: &str, attributes: &Attributes) {
        for (semantic, &accessor) in attributes {
            self.check(EntityKind::Mesh, mesh, format!("{path}.{semantic}"), EntityKind::Accessor, accessor);
        }
    }

    fn check_material(&mut self, i: usize, material: &Material) {
        let texture = |checker: &mut Self, field: &str, info: Option<&TextureInfo>| {
            if let Some(info) = info {
                checker.check(EntityKind::Material, i, format!("materials[{i}].{field}.index"), EntityKind::Texture, info.index);
            }
        };
        if let Some(pbr) = &material.pbr_metallic_roughness {
            texture(self, "pbrMetallicRoughness.baseColorTexture", pbr.base_color_texture.as_ref());
            texture(
                self,
                "pbrMetallicRoughness.metallicRoughnessTexture",
                pbr.metallic_roughness_texture.as_ref(),
            );
        }
        texture(self, "emissiveTexture", material.emissive_texture.as_ref());
        if let Some(normal) = &material.normal_texture {
            self.check(
                EntityKind::Material,
                i,
                format!("materials[{i}].normalTexture.index"),
                EntityKind::Texture,
                normal.index,
            );
        }
        if let Some(occlusion) = &material.occlusion_texture {
            self.check(
                EntityKind::Material,
                i,
                format!("materials[{i}].occlusionTexture.index"),
                EntityKind::Texture,
                occlusion.index,
            );
        }
    }
}
