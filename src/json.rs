//! Scene document parsing: deserializes the exported JSON into typed
//! definitions, resolves every name reference to a table index, and
//! normalizes vertex streams. Reference failures are fatal; unsupported
//! sub-types degrade to warnings.

use crate::{
    AnimationData, AttachmentData, AttachmentFrame, BoneData, BoneTimelines,
    ClippingAttachmentData, ColorFrame, Curve, DrawOrderFrame, DrawOrderOffset, Error,
    IkConstraintData, Inherit, MeshAttachmentData, PathAttachmentData, PathConstraintData,
    PositionMode, RegionAttachmentData, RotateFrame, RotateMode, SceneData, SkinnedVertex,
    SlotData, SlotTimelines, SpacingMode, TransformConstraintData, Vec2Frame, VertexInfluence,
    Warning,
};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

const DEFAULT_FPS: f32 = 30.0;

fn default_one() -> f32 {
    1.0
}

#[derive(Debug, Deserialize)]
struct Root {
    skeleton: Option<SkeletonHeaderDef>,
    bones: Vec<BoneDef>,
    #[serde(default)]
    slots: Vec<SlotDef>,
    #[serde(default)]
    ik: Vec<IkDef>,
    #[serde(default)]
    transform: Vec<TransformDef>,
    #[serde(default)]
    path: Vec<PathDef>,
    #[serde(default)]
    skins: Option<SkinsDef>,
    #[serde(default)]
    animations: BTreeMap<String, AnimationDef>,
}

#[derive(Debug, Deserialize)]
struct SkeletonHeaderDef {
    #[serde(default)]
    fps: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct BoneDef {
    name: String,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    length: f32,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    /// Degrees.
    #[serde(default)]
    rotation: f32,
    #[serde(default = "default_one", rename = "scaleX")]
    scale_x: f32,
    #[serde(default = "default_one", rename = "scaleY")]
    scale_y: f32,
    #[serde(default, rename = "shearX")]
    shear_x: f32,
    #[serde(default, rename = "shearY")]
    shear_y: f32,
    #[serde(default, rename = "transform", alias = "inherit")]
    inherit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SlotDef {
    name: String,
    bone: String,
    #[serde(default)]
    attachment: Option<String>,
    #[serde(default)]
    color: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IkDef {
    name: String,
    #[serde(default)]
    order: i32,
    bones: Vec<String>,
    target: String,
    #[serde(default = "default_one")]
    mix: f32,
    #[serde(default)]
    softness: f32,
    #[serde(default, rename = "bendPositive")]
    bend_positive: bool,
    #[serde(default)]
    stretch: bool,
    #[serde(default)]
    compress: bool,
    #[serde(default)]
    uniform: bool,
}

#[derive(Debug, Deserialize)]
struct TransformDef {
    name: String,
    #[serde(default)]
    order: i32,
    bones: Vec<String>,
    target: String,
    #[serde(default)]
    rotation: f32,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default, rename = "scaleX")]
    scale_x: f32,
    #[serde(default, rename = "scaleY")]
    scale_y: f32,
    #[serde(default, rename = "shearY")]
    shear_y: f32,
    #[serde(default, rename = "mixRotate")]
    mix_rotate: f32,
    #[serde(default, rename = "mixX")]
    mix_x: f32,
    #[serde(default, rename = "mixY")]
    mix_y: f32,
    #[serde(default, rename = "mixScaleX")]
    mix_scale_x: f32,
    #[serde(default, rename = "mixScaleY")]
    mix_scale_y: f32,
    #[serde(default, rename = "mixShearY")]
    mix_shear_y: f32,
    #[serde(default)]
    local: bool,
    #[serde(default)]
    relative: bool,
}

#[derive(Debug, Deserialize)]
struct PathDef {
    name: String,
    #[serde(default)]
    order: i32,
    bones: Vec<String>,
    target: String,
    #[serde(default, rename = "positionMode")]
    position_mode: Option<String>,
    #[serde(default, rename = "spacingMode")]
    spacing_mode: Option<String>,
    #[serde(default, rename = "rotateMode")]
    rotate_mode: Option<String>,
    #[serde(default)]
    rotation: f32,
    #[serde(default)]
    position: f32,
    #[serde(default)]
    spacing: f32,
    #[serde(default = "default_one", rename = "mixRotate")]
    mix_rotate: f32,
    #[serde(default = "default_one", rename = "mixX")]
    mix_x: f32,
    #[serde(default = "default_one", rename = "mixY")]
    mix_y: f32,
}

type AttachmentsDef = BTreeMap<String, BTreeMap<String, AttachmentDef>>;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SkinsDef {
    Array(Vec<SkinDef>),
    Map(BTreeMap<String, AttachmentsDef>),
}

#[derive(Debug, Deserialize)]
struct SkinDef {
    #[allow(dead_code)]
    name: String,
    #[serde(default)]
    attachments: AttachmentsDef,
}

#[derive(Debug, Deserialize)]
struct AttachmentDef {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    rotation: f32,
    #[serde(default)]
    width: Option<f32>,
    #[serde(default)]
    height: Option<f32>,
    #[serde(default)]
    vertices: Option<Vec<f32>>,
    #[serde(default)]
    uvs: Option<Vec<f32>>,
    #[serde(default)]
    triangles: Option<Vec<u32>>,
    #[serde(default)]
    hull: Option<usize>,
    #[serde(default, rename = "vertexCount")]
    vertex_count: Option<usize>,
    #[serde(default)]
    end: Option<String>,
    #[serde(default)]
    closed: bool,
}

#[derive(Debug, Deserialize)]
struct AnimationDef {
    #[serde(default)]
    bones: BTreeMap<String, BoneAnimDef>,
    #[serde(default)]
    slots: BTreeMap<String, SlotAnimDef>,
    #[serde(default, rename = "drawOrder", alias = "draworder")]
    draw_order: Vec<DrawOrderKeyDef>,
}

#[derive(Debug, Deserialize, Default)]
struct BoneAnimDef {
    #[serde(default)]
    translate: Vec<Vec2KeyDef>,
    #[serde(default)]
    rotate: Vec<RotateKeyDef>,
    #[serde(default)]
    scale: Vec<ScaleKeyDef>,
    #[serde(default)]
    shear: Vec<Vec2KeyDef>,
}

#[derive(Debug, Deserialize, Default)]
struct SlotAnimDef {
    #[serde(default)]
    rgba: Vec<ColorKeyDef>,
    /// Pre-4.0 exporters key slot color under `color`.
    #[serde(default)]
    color: Vec<ColorKeyDef>,
    #[serde(default)]
    attachment: Vec<AttachmentKeyDef>,
}

#[derive(Debug, Deserialize)]
struct Vec2KeyDef {
    #[serde(default)]
    time: f32,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    curve: Option<CurveDef>,
}

#[derive(Debug, Deserialize)]
struct ScaleKeyDef {
    #[serde(default)]
    time: f32,
    #[serde(default = "default_one")]
    x: f32,
    #[serde(default = "default_one")]
    y: f32,
    #[serde(default)]
    curve: Option<CurveDef>,
}

#[derive(Debug, Deserialize)]
struct RotateKeyDef {
    #[serde(default)]
    time: f32,
    #[serde(default, alias = "angle")]
    value: f32,
    #[serde(default)]
    curve: Option<CurveDef>,
}

#[derive(Debug, Deserialize)]
struct ColorKeyDef {
    #[serde(default)]
    time: f32,
    color: String,
    #[serde(default)]
    curve: Option<CurveDef>,
}

#[derive(Debug, Deserialize)]
struct AttachmentKeyDef {
    #[serde(default)]
    time: f32,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DrawOrderKeyDef {
    #[serde(default)]
    time: f32,
    #[serde(default)]
    offsets: Vec<DrawOrderOffsetDef>,
}

#[derive(Debug, Deserialize)]
struct DrawOrderOffsetDef {
    slot: String,
    offset: i32,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CurveDef {
    Name(String),
    Values(Vec<f32>),
}

impl CurveDef {
    fn resolve(def: Option<&CurveDef>, context: &str) -> Result<Curve, Error> {
        match def {
            None => Ok(Curve::Linear),
            Some(CurveDef::Name(name)) if name == "stepped" => Ok(Curve::Stepped),
            Some(CurveDef::Name(name)) => Err(Error::InvalidCurve {
                context: context.to_string(),
                message: format!("unknown curve type '{name}'"),
            }),
            Some(CurveDef::Values(values)) => {
                if values.len() % 4 != 0 || values.is_empty() {
                    return Err(Error::InvalidCurve {
                        context: context.to_string(),
                        message: format!("bezier array length {} is not a multiple of 4", values.len()),
                    });
                }
                Ok(Curve::Bezier(values.clone()))
            }
        }
    }
}

impl SceneData {
    /// Parses a scene document. Non-fatal degradations (shear, unsupported
    /// attachment types, unimplemented constraint mixes) are pushed to
    /// `warnings`; structural and reference failures abort.
    pub fn from_json_str(text: &str, warnings: &mut Vec<Warning>) -> Result<Self, Error> {
        let root: Root = serde_json::from_str(text).map_err(|err| Error::Parse {
            message: err.to_string(),
        })?;
        resolve_root(root, warnings)
    }
}

fn resolve_root(root: Root, warnings: &mut Vec<Warning>) -> Result<SceneData, Error> {
    let fps = root
        .skeleton
        .and_then(|header| header.fps)
        .unwrap_or(DEFAULT_FPS);

    let mut bone_index: HashMap<String, usize> = HashMap::new();
    for (index, def) in root.bones.iter().enumerate() {
        if bone_index.insert(def.name.clone(), index).is_some() {
            return Err(Error::Parse {
                message: format!("duplicate bone name '{}'", def.name),
            });
        }
    }

    let mut bones = Vec::with_capacity(root.bones.len());
    for (index, def) in root.bones.iter().enumerate() {
        let parent = match &def.parent {
            None => None,
            Some(parent_name) => {
                let parent = *bone_index.get(parent_name).ok_or_else(|| {
                    Error::UnknownBoneParent {
                        bone: def.name.clone(),
                        parent: parent_name.clone(),
                    }
                })?;
                if parent >= index {
                    return Err(Error::BoneParentOutOfOrder {
                        bone: def.name.clone(),
                        parent: parent_name.clone(),
                    });
                }
                Some(parent)
            }
        };

        if def.shear_x != 0.0 || def.shear_y != 0.0 {
            warnings.push(Warning::ShearBone {
                bone: def.name.clone(),
            });
        }

        bones.push(BoneData {
            name: def.name.clone(),
            parent,
            length: def.length,
            x: def.x,
            y: def.y,
            rotation: def.rotation.to_radians(),
            scale_x: def.scale_x,
            scale_y: def.scale_y,
            shear_x: def.shear_x,
            shear_y: def.shear_y,
            inherit: def
                .inherit
                .as_deref()
                .map(Inherit::from_name)
                .unwrap_or_default(),
        });
    }

    let mut slot_index: HashMap<String, usize> = HashMap::new();
    let mut slots = Vec::with_capacity(root.slots.len());
    for (order, def) in root.slots.iter().enumerate() {
        let bone =
            *bone_index
                .get(&def.bone)
                .ok_or_else(|| Error::UnknownSlotBone {
                    slot: def.name.clone(),
                    bone: def.bone.clone(),
                })?;
        if slot_index.insert(def.name.clone(), order).is_some() {
            return Err(Error::Parse {
                message: format!("duplicate slot name '{}'", def.name),
            });
        }
        slots.push(SlotData {
            name: def.name.clone(),
            bone,
            order,
            attachment: def.attachment.clone(),
            color: match &def.color {
                Some(hex) => parse_color(hex, &def.name)?,
                None => [1.0, 1.0, 1.0, 1.0],
            },
        });
    }

    let attachments = resolve_skin(
        root.skins,
        &slots,
        &slot_index,
        bones.len(),
        warnings,
    )?;

    let mut ik_constraints = Vec::with_capacity(root.ik.len());
    for def in &root.ik {
        if def.bones.is_empty() || def.bones.len() > 2 {
            return Err(Error::InvalidIkChain {
                constraint: def.name.clone(),
                len: def.bones.len(),
            });
        }
        let chain = def
            .bones
            .iter()
            .map(|bone| {
                bone_index
                    .get(bone)
                    .copied()
                    .ok_or_else(|| Error::UnknownIkBone {
                        constraint: def.name.clone(),
                        bone: bone.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let target = *bone_index
            .get(&def.target)
            .ok_or_else(|| Error::UnknownIkTarget {
                constraint: def.name.clone(),
                target: def.target.clone(),
            })?;
        ik_constraints.push(IkConstraintData {
            name: def.name.clone(),
            order: def.order,
            bones: chain,
            target,
            mix: def.mix,
            softness: def.softness,
            bend_positive: def.bend_positive,
            stretch: def.stretch,
            compress: def.compress,
            uniform: def.uniform,
        });
    }

    let mut transform_constraints = Vec::with_capacity(root.transform.len());
    for def in &root.transform {
        let chain = def
            .bones
            .iter()
            .map(|bone| {
                bone_index
                    .get(bone)
                    .copied()
                    .ok_or_else(|| Error::UnknownTransformBone {
                        constraint: def.name.clone(),
                        bone: bone.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let target =
            *bone_index
                .get(&def.target)
                .ok_or_else(|| Error::UnknownTransformTarget {
                    constraint: def.name.clone(),
                    target: def.target.clone(),
                })?;
        transform_constraints.push(TransformConstraintData {
            name: def.name.clone(),
            order: def.order,
            bones: chain,
            target,
            offset_rotation: def.rotation,
            offset_x: def.x,
            offset_y: def.y,
            offset_scale_x: def.scale_x,
            offset_scale_y: def.scale_y,
            offset_shear_y: def.shear_y,
            mix_rotate: def.mix_rotate,
            mix_x: def.mix_x,
            mix_y: def.mix_y,
            mix_scale_x: def.mix_scale_x,
            mix_scale_y: def.mix_scale_y,
            mix_shear_y: def.mix_shear_y,
            local: def.local,
            relative: def.relative,
        });
    }

    let mut path_constraints = Vec::with_capacity(root.path.len());
    for def in &root.path {
        let chain = def
            .bones
            .iter()
            .map(|bone| {
                bone_index
                    .get(bone)
                    .copied()
                    .ok_or_else(|| Error::UnknownPathBone {
                        constraint: def.name.clone(),
                        bone: bone.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let target =
            *slot_index
                .get(&def.target)
                .ok_or_else(|| Error::UnknownPathTargetSlot {
                    constraint: def.name.clone(),
                    slot: def.target.clone(),
                })?;
        path_constraints.push(PathConstraintData {
            name: def.name.clone(),
            order: def.order,
            bones: chain,
            target,
            position_mode: match def.position_mode.as_deref() {
                Some("fixed") => PositionMode::Fixed,
                _ => PositionMode::Percent,
            },
            spacing_mode: match def.spacing_mode.as_deref() {
                Some("fixed") => SpacingMode::Fixed,
                Some("percent") => SpacingMode::Percent,
                _ => SpacingMode::Length,
            },
            rotate_mode: match def.rotate_mode.as_deref() {
                Some("chain") => RotateMode::Chain,
                Some("chainScale") => RotateMode::ChainScale,
                _ => RotateMode::Tangent,
            },
            offset_rotation: def.rotation,
            position: def.position,
            spacing: def.spacing,
            mix_rotate: def.mix_rotate,
            mix_x: def.mix_x,
            mix_y: def.mix_y,
        });
    }

    let mut animations = Vec::with_capacity(root.animations.len());
    for (name, def) in &root.animations {
        animations.push(resolve_animation(
            name,
            def,
            &bone_index,
            &slot_index,
            warnings,
        )?);
    }

    Ok(SceneData {
        fps,
        bones,
        slots,
        ik_constraints,
        transform_constraints,
        path_constraints,
        attachments,
        animations,
        bone_index,
        slot_index,
    })
}

fn resolve_skin(
    skins: Option<SkinsDef>,
    slots: &[SlotData],
    slot_index: &HashMap<String, usize>,
    bone_count: usize,
    warnings: &mut Vec<Warning>,
) -> Result<Vec<HashMap<String, AttachmentData>>, Error> {
    let mut resolved: Vec<HashMap<String, AttachmentData>> =
        (0..slots.len()).map(|_| HashMap::new()).collect();

    // Only the first skin participates; alternate skins are out of scope.
    let first: Option<AttachmentsDef> = match skins {
        None => None,
        Some(SkinsDef::Array(mut array)) => {
            if array.is_empty() {
                None
            } else {
                Some(array.remove(0).attachments)
            }
        }
        Some(SkinsDef::Map(map)) => map.into_iter().next().map(|(_, attachments)| attachments),
    };
    let Some(first) = first else {
        return Ok(resolved);
    };

    for (slot_name, slot_attachments) in first {
        let slot = *slot_index
            .get(&slot_name)
            .ok_or_else(|| Error::UnknownSkinSlot {
                slot: slot_name.clone(),
            })?;
        let slot_bone = slots[slot].bone;

        for (attachment_name, def) in slot_attachments {
            let kind = def.kind.as_deref().unwrap_or("region");
            let attachment = match kind {
                "region" => {
                    // Quad extents have no sensible default; a region without
                    // them cannot be baked.
                    let missing = |field: &'static str| Error::MissingAttachmentField {
                        slot: slot_name.clone(),
                        attachment: attachment_name.clone(),
                        field,
                    };
                    AttachmentData::Region(RegionAttachmentData {
                        name: attachment_name.clone(),
                        x: def.x,
                        y: def.y,
                        rotation: def.rotation,
                        width: def.width.ok_or_else(|| missing("width"))?,
                        height: def.height.ok_or_else(|| missing("height"))?,
                    })
                }
                "mesh" => {
                    let uvs = def.uvs.as_deref().ok_or_else(|| Error::InvalidVertexData {
                        slot: slot_name.clone(),
                        attachment: attachment_name.clone(),
                        message: "mesh attachment is missing uvs".to_string(),
                    })?;
                    let vertex_count = uvs.len() / 2;
                    let vertices = parse_vertices(
                        def.vertices.as_deref().unwrap_or(&[]),
                        vertex_count,
                        slot_bone,
                        bone_count,
                        &slot_name,
                        &attachment_name,
                    )?;
                    let triangles = parse_triangles(
                        def.triangles.as_deref().unwrap_or(&[]),
                        vertex_count,
                        &slot_name,
                        &attachment_name,
                    )?;
                    AttachmentData::Mesh(MeshAttachmentData {
                        name: attachment_name.clone(),
                        vertices,
                        uvs: uvs.chunks_exact(2).map(|uv| [uv[0], uv[1]]).collect(),
                        triangles,
                        hull: def.hull.unwrap_or(0),
                    })
                }
                "clipping" => {
                    let vertex_count =
                        def.vertex_count
                            .ok_or_else(|| Error::InvalidVertexData {
                                slot: slot_name.clone(),
                                attachment: attachment_name.clone(),
                                message: "clipping attachment is missing vertexCount".to_string(),
                            })?;
                    let end_name = def.end.as_deref().unwrap_or(&slot_name);
                    let end_slot = *slot_index.get(end_name).ok_or_else(|| {
                        Error::UnknownClippingEndSlot {
                            attachment: attachment_name.clone(),
                            end: end_name.to_string(),
                        }
                    })?;
                    let vertices = parse_vertices(
                        def.vertices.as_deref().unwrap_or(&[]),
                        vertex_count,
                        slot_bone,
                        bone_count,
                        &slot_name,
                        &attachment_name,
                    )?;
                    AttachmentData::Clipping(ClippingAttachmentData {
                        name: attachment_name.clone(),
                        vertices,
                        vertex_count,
                        end_slot,
                    })
                }
                "path" => {
                    let vertex_count =
                        def.vertex_count
                            .ok_or_else(|| Error::InvalidVertexData {
                                slot: slot_name.clone(),
                                attachment: attachment_name.clone(),
                                message: "path attachment is missing vertexCount".to_string(),
                            })?;
                    if vertex_count == 0 || vertex_count % 3 != 0 {
                        return Err(Error::InvalidVertexData {
                            slot: slot_name.clone(),
                            attachment: attachment_name.clone(),
                            message: format!(
                                "path vertexCount {vertex_count} is not a positive multiple of 3"
                            ),
                        });
                    }
                    let vertices = parse_vertices(
                        def.vertices.as_deref().unwrap_or(&[]),
                        vertex_count,
                        slot_bone,
                        bone_count,
                        &slot_name,
                        &attachment_name,
                    )?;
                    AttachmentData::Path(PathAttachmentData {
                        name: attachment_name.clone(),
                        vertices,
                        vertex_count,
                        closed: def.closed,
                    })
                }
                // Rare attachment kinds degrade: recorded and skipped, the
                // rest of the skin still loads.
                other => {
                    warnings.push(Warning::UnsupportedAttachment {
                        slot: slot_name.clone(),
                        attachment: attachment_name.clone(),
                        kind: other.to_string(),
                    });
                    continue;
                }
            };
            resolved[slot].insert(attachment_name, attachment);
        }
    }

    Ok(resolved)
}

/// Decodes a flat vertex stream. A stream of exactly `vertex_count` (x, y)
/// pairs is unweighted and binds every vertex to `unweighted_bone`; anything
/// longer is the weighted encoding: per vertex, the influence count and then
/// (bone, x, y, weight) per influence.
///
/// The first weight is corrected so the influences sum to exactly 1.0; the
/// source format truncates weights, so this applies unconditionally.
fn parse_vertices(
    values: &[f32],
    vertex_count: usize,
    unweighted_bone: usize,
    bone_count: usize,
    slot: &str,
    attachment: &str,
) -> Result<Vec<SkinnedVertex>, Error> {
    let invalid = |message: String| Error::InvalidVertexData {
        slot: slot.to_string(),
        attachment: attachment.to_string(),
        message,
    };

    if values.len() == vertex_count * 2 {
        return Ok(values
            .chunks_exact(2)
            .map(|xy| SkinnedVertex {
                influences: vec![VertexInfluence {
                    bone: unweighted_bone,
                    x: xy[0],
                    y: xy[1],
                    weight: 1.0,
                }],
            })
            .collect());
    }

    let mut vertices = Vec::with_capacity(vertex_count);
    let mut cursor = 0usize;
    while cursor < values.len() {
        let influence_count = values[cursor] as usize;
        if influence_count == 0 || values[cursor].fract() != 0.0 {
            return Err(invalid(format!(
                "invalid influence count {} at stream offset {cursor}",
                values[cursor]
            )));
        }
        cursor += 1;
        if cursor + influence_count * 4 > values.len() {
            return Err(invalid("truncated weighted vertex stream".to_string()));
        }

        let mut influences = Vec::with_capacity(influence_count);
        for _ in 0..influence_count {
            let bone = values[cursor] as usize;
            if values[cursor].fract() != 0.0 || bone >= bone_count {
                return Err(invalid(format!("invalid bone index {}", values[cursor])));
            }
            influences.push(VertexInfluence {
                bone,
                x: values[cursor + 1],
                y: values[cursor + 2],
                weight: values[cursor + 3],
            });
            cursor += 4;
        }

        let rest: f32 = influences[1..].iter().map(|i| i.weight).sum();
        influences[0].weight = 1.0 - rest;

        vertices.push(SkinnedVertex { influences });
    }

    if vertices.len() != vertex_count {
        return Err(invalid(format!(
            "expected {vertex_count} vertices, decoded {}",
            vertices.len()
        )));
    }
    Ok(vertices)
}

fn parse_triangles(
    indices: &[u32],
    vertex_count: usize,
    slot: &str,
    attachment: &str,
) -> Result<Vec<[u32; 3]>, Error> {
    if indices.len() % 3 != 0 {
        return Err(Error::InvalidVertexData {
            slot: slot.to_string(),
            attachment: attachment.to_string(),
            message: format!("triangle index count {} is not a multiple of 3", indices.len()),
        });
    }
    for &index in indices {
        if index as usize >= vertex_count {
            return Err(Error::InvalidVertexData {
                slot: slot.to_string(),
                attachment: attachment.to_string(),
                message: format!("triangle index {index} out of range"),
            });
        }
    }
    Ok(indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect())
}

fn resolve_animation(
    name: &str,
    def: &AnimationDef,
    bone_index: &HashMap<String, usize>,
    slot_index: &HashMap<String, usize>,
    warnings: &mut Vec<Warning>,
) -> Result<AnimationData, Error> {
    let mut bones = Vec::with_capacity(def.bones.len());
    for (bone_name, channels) in &def.bones {
        let bone = *bone_index
            .get(bone_name)
            .ok_or_else(|| Error::UnknownAnimationBone {
                animation: name.to_string(),
                bone: bone_name.clone(),
            })?;

        if !channels.shear.is_empty() {
            warnings.push(Warning::ShearTimeline {
                animation: name.to_string(),
                bone: bone_name.clone(),
            });
        }

        let context = |channel: &str| format!("animation '{name}', bone '{bone_name}', {channel}");

        let mut timelines = BoneTimelines {
            bone,
            ..BoneTimelines::default()
        };
        for key in &channels.translate {
            timelines.translate.push(Vec2Frame {
                time: key.time,
                x: key.x,
                y: key.y,
                curve: CurveDef::resolve(key.curve.as_ref(), &context("translate"))?,
            });
        }
        for key in &channels.rotate {
            timelines.rotate.push(RotateFrame {
                time: key.time,
                degrees: key.value,
                curve: CurveDef::resolve(key.curve.as_ref(), &context("rotate"))?,
            });
        }
        for key in &channels.scale {
            timelines.scale.push(Vec2Frame {
                time: key.time,
                x: key.x,
                y: key.y,
                curve: CurveDef::resolve(key.curve.as_ref(), &context("scale"))?,
            });
        }
        bones.push(timelines);
    }

    let mut slots = Vec::with_capacity(def.slots.len());
    for (slot_name, channels) in &def.slots {
        let slot = *slot_index
            .get(slot_name)
            .ok_or_else(|| Error::UnknownAnimationSlot {
                animation: name.to_string(),
                slot: slot_name.clone(),
            })?;

        let mut timelines = SlotTimelines {
            slot,
            ..SlotTimelines::default()
        };
        let color_keys = if channels.rgba.is_empty() {
            &channels.color
        } else {
            &channels.rgba
        };
        for key in color_keys {
            let context = format!("animation '{name}', slot '{slot_name}', color");
            timelines.color.push(ColorFrame {
                time: key.time,
                color: parse_color(&key.color, &context)?,
                curve: CurveDef::resolve(key.curve.as_ref(), &context)?,
            });
        }
        for key in &channels.attachment {
            timelines.attachment.push(AttachmentFrame {
                time: key.time,
                name: key.name.clone(),
            });
        }
        slots.push(timelines);
    }

    let mut draw_order = Vec::with_capacity(def.draw_order.len());
    for key in &def.draw_order {
        let mut offsets = Vec::with_capacity(key.offsets.len());
        for offset in &key.offsets {
            let slot =
                *slot_index
                    .get(&offset.slot)
                    .ok_or_else(|| Error::UnknownAnimationSlot {
                        animation: name.to_string(),
                        slot: offset.slot.clone(),
                    })?;
            offsets.push(DrawOrderOffset {
                slot,
                offset: offset.offset,
            });
        }
        draw_order.push(DrawOrderFrame {
            time: key.time,
            offsets,
        });
    }

    Ok(AnimationData {
        name: name.to_string(),
        bones,
        slots,
        draw_order,
    })
}

/// Parses an RRGGBBAA (or RRGGBB) hex color.
fn parse_color(hex: &str, context: &str) -> Result<[f32; 4], Error> {
    let invalid = || Error::InvalidColor {
        context: context.to_string(),
        value: hex.to_string(),
    };
    if hex.len() != 6 && hex.len() != 8 {
        return Err(invalid());
    }
    let mut channels = [1.0f32; 4];
    for (i, channel) in hex.as_bytes().chunks_exact(2).enumerate() {
        let raw = std::str::from_utf8(channel).map_err(|_| invalid())?;
        let value = u8::from_str_radix(raw, 16).map_err(|_| invalid())?;
        channels[i] = value as f32 / 255.0;
    }
    Ok(channels)
}
