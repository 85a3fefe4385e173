//! Keyframe count checks for animation samplers.

use glaze_core::{
    AccessorType, Animation, Document, EntityKind, Interpolation, TargetPath, ValidationError,
    ValidationReport,
};

/// Check that every sampler's output count matches its input count.
///
/// CUBICSPLINE samplers store an in-tangent, a value and an out-tangent per
/// keyframe, so they need three outputs per input. Samplers driving morph
/// target `weights` need one output per target per keyframe.
pub fn check_animations(doc: &Document, report: &mut ValidationReport) {
    for (a, animation) in doc.animations.iter().enumerate() {
        for (s, sampler) in animation.samplers.iter().enumerate() {
            let (Some(input), Some(output)) =
                (doc.accessors.get(sampler.input), doc.accessors.get(sampler.output))
            else {
                continue;
            };

            if input.accessor_type != AccessorType::Scalar {
                report.push(ValidationError::InvalidStructure {
                    kind: EntityKind::Animation,
                    index: a,
                    reason: format!("sampler {s} input accessor {} is not SCALAR", sampler.input),
                });
            }

            let per_key = morph_target_count(doc, animation, s).max(1);
            let tangents = if sampler.interpolation == Interpolation::CubicSpline {
                3
            } else {
                1
            };
            let expected = input.count.saturating_mul(per_key).saturating_mul(tangents);
            if output.count == expected {
                continue;
            }
            let error = if tangents == 3 {
                ValidationError::CubicSplineCount {
                    animation: a,
                    sampler: s,
                    output_count: output.count,
                    expected,
                }
            } else {
                ValidationError::SamplerCount {
                    animation: a,
                    sampler: s,
                    output_count: output.count,
                    expected,
                }
            };
            report.push(error);
        }

        for (c, channel) in animation.channels.iter().enumerate() {
            if channel.target.node.is_none() && channel.target.path != TargetPath::Pointer {
                report.push(ValidationError::InvalidStructure {
                    kind: EntityKind::Animation,
                    index: a,
                    reason: format!("channel {c} has no target node"),
                });
            }
        }
    }
}

/// Morph target count of the node driven by `weights` channels using
/// `sampler`, or 0 when no such channel exists.
fn morph_target_count(doc: &Document, animation: &Animation, sampler: usize) -> usize {
    animation
        .channels
        .iter()
        .filter(|c| c.sampler == sampler && c.target.path == TargetPath::Weights)
        .filter_map(|c| c.target.node)
        .filter_map(|n| doc.nodes.get(n))
        .filter_map(|node| {
            let mesh = doc.meshes.get(node.mesh?)?;
            let from_targets = mesh.primitives.first().map_or(0, |p| p.targets.len());
            let from_weights = node
                .weights
                .as_ref()
                .or(mesh.weights.as_ref())
                .map_or(0, |w| w.len());
            Some(from_targets.max(from_weights))
        })
        .max()
        .unwrap_or(0)
}
