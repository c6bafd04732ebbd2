//! Multi-bone weighted vertex skinning. Pure functions over borrowed bone
//! poses; the result of `world_position` is a convex combination (weights
//! sum to 1) and is invariant to influence order.

use crate::{BonePose, SkinnedVertex};

/// Undeformed "control" position: the weighted sum of raw offsets, with no
/// bone transform applied.
pub fn local_position(vertex: &SkinnedVertex) -> [f32; 2] {
    let mut x = 0.0;
    let mut y = 0.0;
    for influence in &vertex.influences {
        x += influence.x * influence.weight;
        y += influence.y * influence.weight;
    }
    [x, y]
}

/// Deformed position: each influence's offset rotated and scaled by its
/// bone's absolute transform, translated to the bone, then blended.
pub fn world_position(vertex: &SkinnedVertex, poses: &[BonePose]) -> [f32; 2] {
    let mut x = 0.0;
    let mut y = 0.0;
    for influence in &vertex.influences {
        let pose = &poses[influence.bone];
        let (sin, cos) = pose.rotation.sin_cos();
        x += ((influence.x * cos - influence.y * sin) * pose.scale_x + pose.x) * influence.weight;
        y += ((influence.y * cos + influence.x * sin) * pose.scale_y + pose.y) * influence.weight;
    }
    [x, y]
}
