//! Import-side adapter: walking a document's scene graph.

use std::borrow::Cow;

use glam::Mat4;
use glaze_buffer::{decode_data_uri, is_data_uri, read_accessor, view_bytes, AccessorView, ResourceLoader};
use glaze_core::{CodecError, Document, ImageSource, Result};

/// Callbacks for [`walk_scene`].
///
/// `world` is the node's transform composed with every ancestor's.
pub trait SceneVisitor {
    /// Called before a node's children. Return `false` to skip them.
    fn enter_node(&mut self, doc: &Document, node: usize, world: &Mat4) -> Result<bool>;

    /// Called after a node's children, or right after `enter_node` when they
    /// were skipped.
    fn leave_node(&mut self, doc: &Document, node: usize) -> Result<()> {
        let _ = (doc, node);
        Ok(())
    }
}

enum Step {
    Enter(usize, Mat4),
    Leave(usize),
}

/// Depth-first walk of one scene.
///
/// `scene` defaults to the document's `scene`, then to scene 0. A document
/// without scenes is walked from every parentless node.
pub fn walk_scene(doc: &Document, scene: Option<usize>, visitor: &mut dyn SceneVisitor) -> Result<()> {
    let roots: Vec<usize> = match scene.or(doc.scene) {
        Some(index) => doc
            .scenes
            .get(index)
            .ok_or_else(|| CodecError::invalid(format!("scenes[{index}]"), "scene does not exist"))?
            .nodes
            .clone(),
        None if !doc.scenes.is_empty() => doc.scenes[0].nodes.clone(),
        None => parentless(doc),
    };

    let mut visited = vec![false; doc.nodes.len()];
    let mut stack: Vec<Step> = roots
        .iter()
        .rev()
        .map(|&n| Step::Enter(n, Mat4::IDENTITY))
        .collect();

    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(index, parent) => {
                let node = doc
                    .nodes
                    .get(index)
                    .ok_or_else(|| CodecError::invalid(format!("nodes[{index}]"), "node does not exist"))?;
                if std::mem::replace(&mut visited[index], true) {
                    return Err(CodecError::invalid(
                        format!("nodes[{index}]"),
                        "node reached twice while walking the scene",
                    ));
                }
                let world = parent * node.local_matrix();
                let descend = visitor.enter_node(doc, index, &world)?;
                stack.push(Step::Leave(index));
                if descend {
                    stack.extend(node.children.iter().rev().map(|&c| Step::Enter(c, world)));
                }
            }
            Step::Leave(index) => visitor.leave_node(doc, index)?,
        }
    }
    Ok(())
}

fn parentless(doc: &Document) -> Vec<usize> {
    let mut has_parent = vec![false; doc.nodes.len()];
    for node in &doc.nodes {
        for &child in &node.children {
            if let Some(flag) = has_parent.get_mut(child) {
                *flag = true;
            }
        }
    }
    (0..doc.nodes.len()).filter(|&n| !has_parent[n]).collect()
}

/// Accessor view for one vertex attribute of a mesh primitive.
///
/// Returns `Ok(None)` when the primitive has no such attribute.
pub fn primitive_attribute<'d>(
    doc: &'d Document,
    mesh: usize,
    primitive: usize,
    semantic: &str,
) -> Result<Option<AccessorView<'d>>> {
    let prim = doc
        .meshes
        .get(mesh)
        .and_then(|m| m.primitives.get(primitive))
        .ok_or_else(|| {
            CodecError::invalid(
                format!("meshes[{mesh}].primitives[{primitive}]"),
                "primitive does not exist",
            )
        })?;
    prim.attributes
        .get(semantic)
        .map(|&accessor| read_accessor(doc, accessor))
        .transpose()
}

/// Encoded bytes of an image, from its buffer view, data URI or `loader`.
pub fn image_bytes<'d>(doc: &'d Document, image: usize, loader: &dyn ResourceLoader) -> Result<Cow<'d, [u8]>> {
    let image = doc
        .images
        .get(image)
        .ok_or_else(|| CodecError::invalid(format!("images[{image}]"), "image does not exist"))?;
    match &image.source {
        ImageSource::BufferView { buffer_view, .. } => Ok(Cow::Borrowed(view_bytes(doc, *buffer_view)?)),
        ImageSource::Uri { uri, .. } if is_data_uri(uri) => Ok(Cow::Owned(decode_data_uri(uri)?.data)),
        ImageSource::Uri { uri, .. } => Ok(Cow::Owned(loader.load(uri)?)),
    }
}
