//! Orchestrates a load: parses the scene document and atlas, resolves the
//! skeleton, skins attachment geometry, maps UVs, and bakes animation
//! channels into one output bundle for the integration layer.

use crate::curve::{BakedChannel, ChannelKey};
use crate::skeleton::{
    PathSplineNode, ResolvedIk, ResolvedPath, ResolvedTransformOp, effective_local_rotation,
    resolve_ik, resolve_transform,
};
use crate::{
    AnimationData, Atlas, AtlasRegion, AttachmentData, BoneData, BonePose, DrawOrderOffset, Error,
    SceneData, Skeleton, SkinnedVertex, Warning, bake_axis, local_position, world_position,
};

#[derive(Clone, Debug)]
pub struct BakedBone {
    pub name: String,
    pub parent: Option<usize>,
    pub length: f32,
    pub pose: BonePose,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BakedAttachmentKind {
    Region,
    Mesh,
}

/// Triangle geometry for one slot attachment, in both coordinate variants,
/// with per-vertex bone weights and page UVs.
#[derive(Clone, Debug)]
pub struct BakedAttachment {
    pub slot: usize,
    pub name: String,
    pub kind: BakedAttachmentKind,
    /// Image file of the atlas page the UVs index into.
    pub image: String,
    pub world_vertices: Vec<[f32; 2]>,
    pub local_vertices: Vec<[f32; 2]>,
    pub uvs: Vec<[f32; 2]>,
    pub triangles: Vec<[u32; 3]>,
    /// Per vertex: (bone, weight) pairs summing to 1.
    pub influences: Vec<Vec<(usize, f32)>>,
}

/// Clipping polygon plus the slot range it masks.
#[derive(Clone, Debug)]
pub struct BakedClip {
    pub slot: usize,
    pub name: String,
    pub world_vertices: Vec<[f32; 2]>,
    pub local_vertices: Vec<[f32; 2]>,
    pub end_slot: usize,
    pub masked_slots: Vec<usize>,
}

/// UV rectangle of one atlas region: the four corner UVs in quad order
/// (top-left, top-right, bottom-left, bottom-right).
#[derive(Clone, Debug)]
pub struct RegionUv {
    pub name: String,
    pub image: String,
    pub degrees: u16,
    pub corners: [[f32; 2]; 4],
}

#[derive(Clone, Debug, Default)]
pub struct BakedBoneChannels {
    pub bone: usize,
    pub translate_x: Option<BakedChannel>,
    pub translate_y: Option<BakedChannel>,
    pub rotation: Option<BakedChannel>,
    pub scale_x: Option<BakedChannel>,
    pub scale_y: Option<BakedChannel>,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VisibilityKey {
    pub frame: f32,
    pub visible: bool,
}

#[derive(Clone, Debug, Default)]
pub struct BakedSlotChannels {
    pub slot: usize,
    pub alpha: Option<BakedChannel>,
    /// Hold keys: the slot shows an attachment from this frame on (or hides,
    /// when the keyed attachment is empty).
    pub visibility: Vec<VisibilityKey>,
}

/// Draw-order hold key: per-slot offsets from the setup order, constant
/// until the next key.
#[derive(Clone, Debug)]
pub struct BakedDrawOrderKey {
    pub frame: f32,
    pub offsets: Vec<DrawOrderOffset>,
}

#[derive(Clone, Debug)]
pub struct BakedAnimation {
    pub name: String,
    pub frame_end: f32,
    pub bones: Vec<BakedBoneChannels>,
    pub slots: Vec<BakedSlotChannels>,
    pub draw_order: Vec<BakedDrawOrderKey>,
}

#[derive(Clone, Debug)]
pub struct BakedSlot {
    pub name: String,
    pub bone: usize,
    pub order: usize,
}

/// The resolved pose/geometry/animation bundle.
#[derive(Clone, Debug)]
pub struct BakedScene {
    pub fps: f32,
    pub bones: Vec<BakedBone>,
    pub slots: Vec<BakedSlot>,
    pub attachments: Vec<BakedAttachment>,
    pub clips: Vec<BakedClip>,
    pub region_uvs: Vec<RegionUv>,
    pub ik_constraints: Vec<ResolvedIk>,
    pub transform_ops: Vec<ResolvedTransformOp>,
    pub path_constraints: Vec<ResolvedPath>,
    pub animations: Vec<BakedAnimation>,
    pub warnings: Vec<Warning>,
}

/// Loads and bakes a scene from its two input documents.
pub fn bake_scene(scene_json: &str, atlas_text: &str) -> Result<BakedScene, Error> {
    let mut warnings = Vec::new();
    let atlas = Atlas::parse(atlas_text, &mut warnings)?;
    let scene = SceneData::from_json_str(scene_json, &mut warnings)?;
    bake_parsed(&scene, &atlas, warnings)
}

/// Bakes an already-parsed scene against an already-parsed atlas.
pub fn bake_parsed(
    scene: &SceneData,
    atlas: &Atlas,
    mut warnings: Vec<Warning>,
) -> Result<BakedScene, Error> {
    let skeleton = Skeleton::build(scene.bones.clone())?;

    let bones = skeleton
        .bones
        .iter()
        .zip(&skeleton.poses)
        .map(|(bone, pose)| BakedBone {
            name: bone.name.clone(),
            parent: bone.parent,
            length: bone.length,
            pose: *pose,
        })
        .collect();

    let slots = scene
        .slots
        .iter()
        .map(|slot| BakedSlot {
            name: slot.name.clone(),
            bone: slot.bone,
            order: slot.order,
        })
        .collect();

    let mut attachments = Vec::new();
    let mut clips = Vec::new();
    for (slot, slot_attachments) in scene.attachments.iter().enumerate() {
        let mut names: Vec<&String> = slot_attachments.keys().collect();
        names.sort();
        for name in names {
            match &slot_attachments[name] {
                AttachmentData::Region(region) => {
                    attachments.push(bake_region(scene, atlas, &skeleton, slot, region)?);
                }
                AttachmentData::Mesh(mesh) => {
                    attachments.push(bake_mesh(scene, atlas, &skeleton, slot, mesh)?);
                }
                AttachmentData::Clipping(clip) => {
                    let world = clip
                        .vertices
                        .iter()
                        .map(|vertex| world_position(vertex, &skeleton.poses))
                        .collect();
                    let local = clip.vertices.iter().map(local_position).collect();
                    clips.push(BakedClip {
                        slot,
                        name: clip.name.clone(),
                        world_vertices: world,
                        local_vertices: local,
                        end_slot: clip.end_slot,
                        masked_slots: ((slot + 1)..=clip.end_slot).collect(),
                    });
                }
                // The target spline is consumed by path constraint
                // resolution below.
                AttachmentData::Path(_) => {}
            }
        }
    }

    let region_uvs = {
        let mut names: Vec<&String> = atlas.regions.keys().collect();
        names.sort();
        names
            .into_iter()
            .map(|name| {
                let region = &atlas.regions[name];
                let page = atlas.page_of(region);
                RegionUv {
                    name: region.name.clone(),
                    image: page.image.clone(),
                    degrees: region.degrees,
                    corners: region.corner_uvs(page),
                }
            })
            .collect()
    };

    let ik_constraints = scene.ik_constraints.iter().map(resolve_ik).collect();

    let mut transform_ops = Vec::new();
    for data in &scene.transform_constraints {
        transform_ops.extend(resolve_transform(data, &mut warnings));
    }

    let mut path_constraints = Vec::new();
    for data in &scene.path_constraints {
        path_constraints.push(resolve_path(scene, &skeleton, data)?);
    }

    let animations = scene
        .animations
        .iter()
        .map(|animation| bake_animation(scene, animation))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BakedScene {
        fps: scene.fps,
        bones,
        slots,
        attachments,
        clips,
        region_uvs,
        ik_constraints,
        transform_ops,
        path_constraints,
        animations,
        warnings,
    })
}

/// Atlas regions are keyed by the slot name when present, falling back to
/// the attachment name.
fn find_region<'a>(
    atlas: &'a Atlas,
    scene: &SceneData,
    slot: usize,
    attachment: &str,
) -> Result<&'a AtlasRegion, Error> {
    let slot_name = &scene.slots[slot].name;
    atlas
        .region(slot_name)
        .or_else(|| atlas.region(attachment))
        .ok_or_else(|| Error::MissingAtlasRegion {
            slot: slot_name.clone(),
            attachment: attachment.to_string(),
        })
}

fn bake_region(
    scene: &SceneData,
    atlas: &Atlas,
    skeleton: &Skeleton,
    slot: usize,
    region: &crate::RegionAttachmentData,
) -> Result<BakedAttachment, Error> {
    let bone_index = scene.slots[slot].bone;
    let pose = skeleton.pose(bone_index);

    let rotation = pose.rotation + region.rotation.to_radians();
    let (bone_sin, bone_cos) = pose.rotation.sin_cos();
    let dx = region.x * bone_cos - region.y * bone_sin;
    let dy = region.x * bone_sin + region.y * bone_cos;

    let half_w = region.width / 2.0;
    let half_h = region.height / 2.0;
    // Quad order: top-left, top-right, bottom-left, bottom-right.
    let corners = [
        [-half_w, half_h],
        [half_w, half_h],
        [-half_w, -half_h],
        [half_w, -half_h],
    ];

    let (sin, cos) = rotation.sin_cos();
    let world_vertices: Vec<[f32; 2]> = corners
        .iter()
        .map(|[cx, cy]| {
            [
                (cx * cos - cy * sin + dx) * pose.scale_x + pose.x,
                (cx * sin + cy * cos + dy) * pose.scale_y + pose.y,
            ]
        })
        .collect();

    let (local_sin, local_cos) = region.rotation.to_radians().sin_cos();
    let local_vertices: Vec<[f32; 2]> = corners
        .iter()
        .map(|[cx, cy]| {
            [
                cx * local_cos - cy * local_sin + region.x,
                cx * local_sin + cy * local_cos + region.y,
            ]
        })
        .collect();

    let atlas_region = find_region(atlas, scene, slot, &region.name)?;
    let page = atlas.page_of(atlas_region);

    Ok(BakedAttachment {
        slot,
        name: region.name.clone(),
        kind: BakedAttachmentKind::Region,
        image: page.image.clone(),
        world_vertices,
        local_vertices,
        uvs: atlas_region.corner_uvs(page).to_vec(),
        triangles: vec![[0, 1, 2], [1, 3, 2]],
        influences: (0..4).map(|_| vec![(bone_index, 1.0)]).collect(),
    })
}

fn bake_mesh(
    scene: &SceneData,
    atlas: &Atlas,
    skeleton: &Skeleton,
    slot: usize,
    mesh: &crate::MeshAttachmentData,
) -> Result<BakedAttachment, Error> {
    let atlas_region = find_region(atlas, scene, slot, &mesh.name)?;
    let page = atlas.page_of(atlas_region);

    let world_vertices = mesh
        .vertices
        .iter()
        .map(|vertex| world_position(vertex, &skeleton.poses))
        .collect();
    let local_vertices = mesh.vertices.iter().map(local_position).collect();
    let influences = mesh
        .vertices
        .iter()
        .map(|vertex| {
            vertex
                .influences
                .iter()
                .map(|influence| (influence.bone, influence.weight))
                .collect()
        })
        .collect();
    let uvs = mesh
        .uvs
        .iter()
        .map(|[u, v]| atlas_region.uv_normalized(page, *u, *v))
        .collect();

    Ok(BakedAttachment {
        slot,
        name: mesh.name.clone(),
        kind: BakedAttachmentKind::Mesh,
        image: page.image.clone(),
        world_vertices,
        local_vertices,
        uvs,
        triangles: mesh.triangles.clone(),
        influences,
    })
}

fn resolve_path(
    scene: &SceneData,
    skeleton: &Skeleton,
    data: &crate::PathConstraintData,
) -> Result<ResolvedPath, Error> {
    let slot_attachments = &scene.attachments[data.target];
    let mut names: Vec<&String> = slot_attachments.keys().collect();
    names.sort();
    let path = names
        .into_iter()
        .find_map(|name| match &slot_attachments[name] {
            AttachmentData::Path(path) => Some(path),
            _ => None,
        })
        .ok_or_else(|| Error::MissingPathAttachment {
            constraint: data.name.clone(),
            slot: scene.slots[data.target].name.clone(),
        })?;

    let spline_node = |vertex: &SkinnedVertex| {
        (
            world_position(vertex, &skeleton.poses),
            local_position(vertex),
        )
    };

    let mut nodes = Vec::with_capacity(path.vertices.len() / 3);
    for group in path.vertices.chunks_exact(3) {
        let (handle_left, local_handle_left) = spline_node(&group[0]);
        let (point, local_point) = spline_node(&group[1]);
        let (handle_right, local_handle_right) = spline_node(&group[2]);
        nodes.push(PathSplineNode {
            handle_left,
            point,
            handle_right,
            local_handle_left,
            local_point,
            local_handle_right,
            hooks: group[1]
                .influences
                .iter()
                .map(|influence| (influence.bone, influence.weight))
                .collect(),
        });
    }

    Ok(ResolvedPath::from_data(data, nodes))
}

fn bake_animation(scene: &SceneData, animation: &AnimationData) -> Result<BakedAnimation, Error> {
    let fps = scene.fps;

    let mut bones = Vec::with_capacity(animation.bones.len());
    for timelines in &animation.bones {
        let bone: &BoneData = &scene.bones[timelines.bone];
        let context = |channel: &str| {
            format!(
                "animation '{}', bone '{}', {channel}",
                animation.name, bone.name
            )
        };

        let mut baked = BakedBoneChannels {
            bone: timelines.bone,
            ..BakedBoneChannels::default()
        };

        if !timelines.translate.is_empty() {
            let keys_x: Vec<ChannelKey<'_>> = timelines
                .translate
                .iter()
                .map(|frame| ChannelKey {
                    time: frame.time,
                    value: frame.x,
                    curve: &frame.curve,
                })
                .collect();
            let keys_y: Vec<ChannelKey<'_>> = timelines
                .translate
                .iter()
                .map(|frame| ChannelKey {
                    time: frame.time,
                    value: frame.y,
                    curve: &frame.curve,
                })
                .collect();
            baked.translate_x = Some(bake_axis(
                &keys_x,
                0,
                2,
                fps,
                |v| bone.x + v,
                &context("translate"),
            )?);
            baked.translate_y = Some(bake_axis(
                &keys_y,
                1,
                2,
                fps,
                |v| bone.y + v,
                &context("translate"),
            )?);
        }

        if !timelines.rotate.is_empty() {
            let baseline = effective_local_rotation(bone);
            let keys: Vec<ChannelKey<'_>> = timelines
                .rotate
                .iter()
                .map(|frame| ChannelKey {
                    time: frame.time,
                    value: frame.degrees,
                    curve: &frame.curve,
                })
                .collect();
            baked.rotation = Some(bake_axis(
                &keys,
                0,
                1,
                fps,
                |v| baseline + v.to_radians(),
                &context("rotate"),
            )?);
        }

        if !timelines.scale.is_empty() {
            let keys_x: Vec<ChannelKey<'_>> = timelines
                .scale
                .iter()
                .map(|frame| ChannelKey {
                    time: frame.time,
                    value: frame.x,
                    curve: &frame.curve,
                })
                .collect();
            let keys_y: Vec<ChannelKey<'_>> = timelines
                .scale
                .iter()
                .map(|frame| ChannelKey {
                    time: frame.time,
                    value: frame.y,
                    curve: &frame.curve,
                })
                .collect();
            baked.scale_x = Some(bake_axis(
                &keys_x,
                0,
                2,
                fps,
                |v| bone.scale_x * v,
                &context("scale"),
            )?);
            baked.scale_y = Some(bake_axis(
                &keys_y,
                1,
                2,
                fps,
                |v| bone.scale_y * v,
                &context("scale"),
            )?);
        }

        bones.push(baked);
    }

    let mut slots = Vec::with_capacity(animation.slots.len());
    for timelines in &animation.slots {
        let slot_name = &scene.slots[timelines.slot].name;
        let mut baked = BakedSlotChannels {
            slot: timelines.slot,
            ..BakedSlotChannels::default()
        };

        if !timelines.color.is_empty() {
            // Alpha is the animated axis; the color curve carries 4 axes.
            let keys: Vec<ChannelKey<'_>> = timelines
                .color
                .iter()
                .map(|frame| ChannelKey {
                    time: frame.time,
                    value: frame.color[3],
                    curve: &frame.curve,
                })
                .collect();
            baked.alpha = Some(bake_axis(
                &keys,
                3,
                4,
                fps,
                |v| v,
                &format!("animation '{}', slot '{slot_name}', color", animation.name),
            )?);
        }

        for frame in &timelines.attachment {
            baked.visibility.push(VisibilityKey {
                frame: frame.time * fps,
                visible: frame.name.is_some(),
            });
        }

        slots.push(baked);
    }

    let mut draw_order = Vec::with_capacity(animation.draw_order.len());
    for frame in &animation.draw_order {
        draw_order.push(BakedDrawOrderKey {
            frame: frame.time * fps,
            offsets: frame.offsets.clone(),
        });
    }

    let channel_end =
        |channel: &Option<BakedChannel>| channel.as_ref().map_or(0.0, BakedChannel::frame_end);
    let mut frame_end = 0.0f32;
    for baked in &bones {
        for channel in [
            &baked.translate_x,
            &baked.translate_y,
            &baked.rotation,
            &baked.scale_x,
            &baked.scale_y,
        ] {
            frame_end = frame_end.max(channel_end(channel));
        }
    }
    for baked in &slots {
        frame_end = frame_end.max(channel_end(&baked.alpha));
        for key in &baked.visibility {
            frame_end = frame_end.max(key.frame);
        }
    }
    for key in &draw_order {
        frame_end = frame_end.max(key.frame);
    }

    Ok(BakedAnimation {
        name: animation.name.clone(),
        frame_end,
        bones,
        slots,
        draw_order,
    })
}
