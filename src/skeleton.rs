use crate::{
    BoneData, Error, IkConstraintData, Inherit, PathConstraintData, PositionMode, RotateMode,
    SpacingMode, TransformConstraintData, Warning,
};
use std::f32::consts::PI;

/// Absolute (world) transform of a bone, composed down the hierarchy.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BonePose {
    pub x: f32,
    pub y: f32,
    /// Radians.
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    /// Tail offset from the head along the bone's direction, scaled.
    pub tail_dx: f32,
    pub tail_dy: f32,
    /// Signed twist angle in (-pi, pi], derived from `rotation` by the
    /// mirrored folding below. Consumers that orient non-deforming handles
    /// depend on this exact mapping.
    pub roll: f32,
}

/// Bone table plus resolved absolute transforms. Write-once: after `build`
/// completes the poses are never mutated.
#[derive(Clone, Debug)]
pub struct Skeleton {
    pub bones: Vec<BoneData>,
    pub poses: Vec<BonePose>,
}

impl Skeleton {
    /// Validates the hierarchy (exactly one root, parents declared before
    /// children) and computes absolute transforms in declaration order.
    pub fn build(bones: Vec<BoneData>) -> Result<Self, Error> {
        for (index, bone) in bones.iter().enumerate() {
            match bone.parent {
                None if index != 0 => {
                    return Err(Error::Hierarchy {
                        bone: bone.name.clone(),
                        message: "second root bone; the hierarchy must have exactly one root"
                            .to_string(),
                    });
                }
                Some(parent) if parent >= index => {
                    return Err(Error::Hierarchy {
                        bone: bone.name.clone(),
                        message: format!("parent index {parent} is not declared before the bone"),
                    });
                }
                Some(_) if index == 0 => {
                    return Err(Error::Hierarchy {
                        bone: bone.name.clone(),
                        message: "first bone must be the root and have no parent".to_string(),
                    });
                }
                _ => {}
            }
        }

        let mut poses = Vec::with_capacity(bones.len());
        for bone in &bones {
            let pose = match bone.parent {
                // Root: absolute equals local, baseline tail and roll stay
                // at identity.
                None => BonePose {
                    x: bone.x,
                    y: bone.y,
                    rotation: effective_local_rotation(bone),
                    scale_x: bone.scale_x,
                    scale_y: bone.scale_y,
                    tail_dx: 0.0,
                    tail_dy: 0.0,
                    roll: 0.0,
                },
                Some(parent_index) => {
                    let parent: &BonePose = &poses[parent_index];
                    compose_pose(bone, parent)
                }
            };
            poses.push(pose);
        }

        Ok(Self { bones, poses })
    }

    pub fn pose(&self, index: usize) -> &BonePose {
        &self.poses[index]
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }
}

/// The rotation-suppressing inheritance mode zeroes the local angle before
/// composition.
pub(crate) fn effective_local_rotation(bone: &BoneData) -> f32 {
    match bone.inherit {
        Inherit::NoRotationOrReflection => 0.0,
        _ => bone.rotation,
    }
}

fn compose_pose(bone: &BoneData, parent: &BonePose) -> BonePose {
    let local_rotation = effective_local_rotation(bone);
    let rotation = local_rotation + parent.rotation;
    let scale_x = bone.scale_x * parent.scale_x;
    let scale_y = bone.scale_y * parent.scale_y;

    let (sin, cos) = parent.rotation.sin_cos();
    let x = parent.scale_x * (bone.x * cos - bone.y * sin) + parent.x;
    let y = parent.scale_y * (bone.y * cos + bone.x * sin) + parent.y;

    BonePose {
        x,
        y,
        rotation,
        scale_x,
        scale_y,
        tail_dx: scale_x * bone.length * rotation.cos(),
        tail_dy: scale_y * bone.length * rotation.sin(),
        roll: fold_roll(rotation),
    }
}

/// Folds an absolute rotation into the signed (-pi, pi] roll. The mapping is
/// mirrored: angles below pi negate, angles at or above pi reflect through
/// pi. Twist orientation for downstream consumers depends on reproducing it
/// exactly.
fn fold_roll(rotation: f32) -> f32 {
    let folded = rotation.rem_euclid(2.0 * PI);
    if folded < PI {
        -folded
    } else {
        PI - folded.rem_euclid(PI)
    }
}

/// IK parameters handed to an external constraint evaluator. The numeric
/// solve is delegated; this crate only maps the authored parameters.
#[derive(Clone, Debug)]
pub struct ResolvedIk {
    pub name: String,
    /// Chain bones, parent first (length 1 or 2).
    pub chain: Vec<usize>,
    pub target: usize,
    /// Empirical softness mapping, kept as authored by the source importer:
    /// softness ranges 0..=160 and scales the mix down linearly.
    pub influence: f32,
    /// Pole angle offset from the chain parent: -pi/2 when bending positive,
    /// +pi/2 otherwise. Only meaningful for two-bone chains.
    pub pole_angle_offset: f32,
    pub stretch: bool,
    pub compress: bool,
    pub uniform: bool,
}

pub fn resolve_ik(data: &IkConstraintData) -> ResolvedIk {
    ResolvedIk {
        name: data.name.clone(),
        chain: data.bones.clone(),
        target: data.target,
        influence: (1.0 - data.softness / 160.0) * data.mix,
        pole_angle_offset: if data.bend_positive { -PI / 2.0 } else { PI / 2.0 },
        stretch: data.stretch,
        compress: data.compress,
        uniform: data.uniform,
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TransformOpKind {
    /// Absolute copy of the target's location (the mix sentinel -1.0), with
    /// axes inverted when the sentinel is negative.
    CopyLocation { invert: bool },
    CopyRotation,
}

/// One per (constrained bone, supported channel) pair of a transform
/// constraint, for an external constraint evaluator.
#[derive(Clone, Debug)]
pub struct ResolvedTransformOp {
    pub constraint: String,
    pub bone: usize,
    pub target: usize,
    pub kind: TransformOpKind,
    pub influence: f32,
}

/// Maps a transform constraint to per-channel copy operations. Channels the
/// importer never supported (blended location, scale, shear) degrade to
/// warnings.
pub fn resolve_transform(
    data: &TransformConstraintData,
    warnings: &mut Vec<Warning>,
) -> Vec<ResolvedTransformOp> {
    let mut ops = Vec::new();
    let mut warned_x = false;
    let mut warned_scale = false;
    let mut warned_shear = false;

    for &bone in &data.bones {
        if data.mix_x == -1.0 {
            ops.push(ResolvedTransformOp {
                constraint: data.name.clone(),
                bone,
                target: data.target,
                kind: TransformOpKind::CopyLocation {
                    invert: data.mix_x < 0.0,
                },
                influence: data.mix_x.abs(),
            });
        } else if data.mix_x != 0.0 && !warned_x {
            warnings.push(Warning::TransformMixUnsupported {
                constraint: data.name.clone(),
                channel: "translate".to_string(),
            });
            warned_x = true;
        }

        if data.mix_scale_x != 0.0 && data.mix_scale_x != -1.0 && !warned_scale {
            warnings.push(Warning::TransformMixUnsupported {
                constraint: data.name.clone(),
                channel: "scale".to_string(),
            });
            warned_scale = true;
        }
        if data.mix_shear_y != 0.0 && data.mix_shear_y != -1.0 && !warned_shear {
            warnings.push(Warning::TransformMixUnsupported {
                constraint: data.name.clone(),
                channel: "shear".to_string(),
            });
            warned_shear = true;
        }

        if data.mix_rotate != 0.0 {
            ops.push(ResolvedTransformOp {
                constraint: data.name.clone(),
                bone,
                target: data.target,
                kind: TransformOpKind::CopyRotation,
                influence: data.mix_rotate,
            });
        }
    }

    ops
}

/// One bezier node of a path constraint's target spline, with both
/// coordinate variants plus the midpoint's bone hooks.
#[derive(Clone, Debug)]
pub struct PathSplineNode {
    pub handle_left: [f32; 2],
    pub point: [f32; 2],
    pub handle_right: [f32; 2],
    pub local_handle_left: [f32; 2],
    pub local_point: [f32; 2],
    pub local_handle_right: [f32; 2],
    /// (bone, weight) influences of the midpoint vertex.
    pub hooks: Vec<(usize, f32)>,
}

#[derive(Clone, Debug)]
pub struct ResolvedPath {
    pub name: String,
    pub bones: Vec<usize>,
    pub target_slot: usize,
    pub nodes: Vec<PathSplineNode>,
    pub position_mode: PositionMode,
    pub spacing_mode: SpacingMode,
    pub rotate_mode: RotateMode,
    pub offset_rotation: f32,
    pub position: f32,
    pub spacing: f32,
    pub mix_rotate: f32,
    pub mix_x: f32,
    pub mix_y: f32,
}

impl ResolvedPath {
    pub(crate) fn from_data(data: &PathConstraintData, nodes: Vec<PathSplineNode>) -> Self {
        Self {
            name: data.name.clone(),
            bones: data.bones.clone(),
            target_slot: data.target,
            nodes,
            position_mode: data.position_mode,
            spacing_mode: data.spacing_mode,
            rotate_mode: data.rotate_mode,
            offset_rotation: data.offset_rotation,
            position: data.position,
            spacing: data.spacing,
            mix_rotate: data.mix_rotate,
            mix_x: data.mix_x,
            mix_y: data.mix_y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bone(name: &str, parent: Option<usize>) -> BoneData {
        BoneData {
            name: name.to_string(),
            parent,
            length: 0.0,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            shear_x: 0.0,
            shear_y: 0.0,
            inherit: Inherit::Normal,
        }
    }

    #[test]
    fn root_pose_equals_local() {
        let mut root = bone("root", None);
        root.x = 3.0;
        root.y = -2.0;
        root.rotation = 0.5;
        root.scale_x = 2.0;
        root.scale_y = 0.5;

        let skeleton = Skeleton::build(vec![root]).unwrap();
        let pose = skeleton.pose(0);
        assert!((pose.x - 3.0).abs() <= 1.0e-6);
        assert!((pose.y + 2.0).abs() <= 1.0e-6);
        assert!((pose.rotation - 0.5).abs() <= 1.0e-6);
        assert!((pose.scale_x - 2.0).abs() <= 1.0e-6);
        assert!((pose.scale_y - 0.5).abs() <= 1.0e-6);
    }

    #[test]
    fn two_level_chain_matches_closed_form() {
        let root = bone("root", None);
        let mut a = bone("a", Some(0));
        a.x = 10.0;
        a.rotation = PI / 2.0;
        a.scale_x = 2.0;
        let mut b = bone("b", Some(1));
        b.x = 4.0;
        b.y = 1.0;
        b.rotation = PI / 4.0;
        b.scale_y = 3.0;

        let skeleton = Skeleton::build(vec![root, a, b]).unwrap();

        let a_pose = skeleton.pose(1);
        assert!((a_pose.x - 10.0).abs() <= 1.0e-6);
        assert!((a_pose.rotation - PI / 2.0).abs() <= 1.0e-6);

        // b rotates the sum, multiplies scale componentwise, and its
        // position is the parent-rotated/scaled local offset.
        let b_pose = skeleton.pose(2);
        assert!((b_pose.rotation - (PI / 2.0 + PI / 4.0)).abs() <= 1.0e-6);
        assert!((b_pose.scale_x - 2.0).abs() <= 1.0e-6);
        assert!((b_pose.scale_y - 3.0).abs() <= 1.0e-6);
        // rotate (4, 1) by pi/2 -> (-1, 4); x scaled by parent scale_x = 2.
        assert!((b_pose.x - (10.0 + 2.0 * -1.0)).abs() <= 1.0e-5);
        assert!((b_pose.y - 4.0).abs() <= 1.0e-5);
    }

    #[test]
    fn tail_offset_uses_absolute_scale_and_rotation() {
        let root = bone("root", None);
        let mut a = bone("a", Some(0));
        a.length = 5.0;
        a.rotation = PI / 2.0;
        a.scale_x = 2.0;
        a.scale_y = 3.0;

        let skeleton = Skeleton::build(vec![root, a]).unwrap();
        let pose = skeleton.pose(1);
        assert!(pose.tail_dx.abs() <= 1.0e-5);
        assert!((pose.tail_dy - 15.0).abs() <= 1.0e-5);
    }

    #[test]
    fn roll_folds_below_pi_to_negation() {
        let root = bone("root", None);
        let mut a = bone("a", Some(0));
        a.rotation = 1.0;
        let skeleton = Skeleton::build(vec![root, a]).unwrap();
        assert!((skeleton.pose(1).roll + 1.0).abs() <= 1.0e-6);
    }

    #[test]
    fn roll_folds_above_pi_through_mirror() {
        let root = bone("root", None);
        let mut a = bone("a", Some(0));
        a.rotation = 4.0; // folded = 4.0 >= pi, roll = pi - (4.0 mod pi)
        let skeleton = Skeleton::build(vec![root, a]).unwrap();
        let expected = PI - (4.0f32 - PI);
        assert!((skeleton.pose(1).roll - expected).abs() <= 1.0e-6);
    }

    #[test]
    fn no_rotation_inheritance_mode_zeroes_local_rotation() {
        let mut root = bone("root", None);
        root.rotation = 0.3;
        let mut a = bone("a", Some(0));
        a.rotation = 1.0;
        a.inherit = Inherit::NoRotationOrReflection;

        let skeleton = Skeleton::build(vec![root, a]).unwrap();
        assert!((skeleton.pose(1).rotation - 0.3).abs() <= 1.0e-6);
    }

    #[test]
    fn second_root_is_a_hierarchy_error() {
        let root = bone("root", None);
        let stray = bone("stray", None);
        let err = Skeleton::build(vec![root, stray]).unwrap_err();
        assert!(matches!(err, Error::Hierarchy { .. }));
    }

    #[test]
    fn parent_declared_after_child_is_a_hierarchy_error() {
        let root = bone("root", None);
        let child = bone("child", Some(2));
        let late = bone("late", Some(0));
        let err = Skeleton::build(vec![root, child, late]).unwrap_err();
        assert!(matches!(err, Error::Hierarchy { .. }));
    }

    #[test]
    fn ik_influence_maps_softness_and_mix() {
        let data = IkConstraintData {
            name: "ik".to_string(),
            order: 0,
            bones: vec![1, 2],
            target: 3,
            mix: 0.5,
            softness: 80.0,
            bend_positive: true,
            stretch: false,
            compress: false,
            uniform: false,
        };
        let resolved = resolve_ik(&data);
        assert!((resolved.influence - 0.25).abs() <= 1.0e-6);
        assert!((resolved.pole_angle_offset + PI / 2.0).abs() <= 1.0e-6);
    }

    #[test]
    fn transform_sentinel_resolves_to_copy_location() {
        let data = TransformConstraintData {
            name: "tk".to_string(),
            order: 0,
            bones: vec![1],
            target: 2,
            offset_rotation: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
            offset_scale_x: 0.0,
            offset_scale_y: 0.0,
            offset_shear_y: 0.0,
            mix_rotate: 0.75,
            mix_x: -1.0,
            mix_y: 0.0,
            mix_scale_x: 0.0,
            mix_scale_y: 0.0,
            mix_shear_y: 0.0,
            local: false,
            relative: false,
        };
        let mut warnings = Vec::new();
        let ops = resolve_transform(&data, &mut warnings);
        assert!(warnings.is_empty());
        assert_eq!(ops.len(), 2);
        assert_eq!(
            ops[0].kind,
            TransformOpKind::CopyLocation { invert: true }
        );
        assert!((ops[0].influence - 1.0).abs() <= 1.0e-6);
        assert_eq!(ops[1].kind, TransformOpKind::CopyRotation);
        assert!((ops[1].influence - 0.75).abs() <= 1.0e-6);
    }

    #[test]
    fn blended_translate_mix_warns_and_is_skipped() {
        let data = TransformConstraintData {
            name: "tk".to_string(),
            order: 0,
            bones: vec![1],
            target: 2,
            offset_rotation: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
            offset_scale_x: 0.0,
            offset_scale_y: 0.0,
            offset_shear_y: 0.0,
            mix_rotate: 0.0,
            mix_x: 0.5,
            mix_y: 0.0,
            mix_scale_x: 0.0,
            mix_scale_y: 0.0,
            mix_shear_y: 0.0,
            local: false,
            relative: false,
        };
        let mut warnings = Vec::new();
        let ops = resolve_transform(&data, &mut warnings);
        assert!(ops.is_empty());
        assert_eq!(
            warnings,
            vec![Warning::TransformMixUnsupported {
                constraint: "tk".to_string(),
                channel: "translate".to_string(),
            }]
        );
    }
}
