use std::collections::HashMap;

/// Setup-pose bone definition. Local transform fields use radians for
/// `rotation` (the document authors degrees; parsing converts).
#[derive(Clone, Debug)]
pub struct BoneData {
    pub name: String,
    /// Index into the owning bone table. `None` only for the root.
    pub parent: Option<usize>,
    pub length: f32,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub shear_x: f32,
    pub shear_y: f32,
    pub inherit: Inherit,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum Inherit {
    #[default]
    Normal,
    OnlyTranslation,
    NoRotationOrReflection,
    NoScale,
    NoScaleOrReflection,
}

impl Inherit {
    pub(crate) fn from_name(name: &str) -> Self {
        match name {
            "onlyTranslation" => Self::OnlyTranslation,
            "noRotationOrReflection" => Self::NoRotationOrReflection,
            "noScale" => Self::NoScale,
            "noScaleOrReflection" => Self::NoScaleOrReflection,
            _ => Self::Normal,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SlotData {
    pub name: String,
    pub bone: usize,
    /// Draw order position, i.e. the slot's declaration index.
    pub order: usize,
    pub attachment: Option<String>,
    pub color: [f32; 4],
}

#[derive(Clone, Debug)]
pub struct IkConstraintData {
    pub name: String,
    pub order: i32,
    /// Chain of 1 or 2 bones, parent first.
    pub bones: Vec<usize>,
    pub target: usize,
    pub mix: f32,
    pub softness: f32,
    pub bend_positive: bool,
    pub stretch: bool,
    pub compress: bool,
    pub uniform: bool,
}

#[derive(Clone, Debug)]
pub struct TransformConstraintData {
    pub name: String,
    pub order: i32,
    pub bones: Vec<usize>,
    pub target: usize,
    /// Offsets from the target: rotation (degrees), x, y, scaleX, scaleY, shearY.
    pub offset_rotation: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub offset_scale_x: f32,
    pub offset_scale_y: f32,
    pub offset_shear_y: f32,
    /// `mix_x == -1.0` is the sentinel for an absolute copy of the target's
    /// location; blended offsets for this channel are not implemented.
    pub mix_rotate: f32,
    pub mix_x: f32,
    pub mix_y: f32,
    pub mix_scale_x: f32,
    pub mix_scale_y: f32,
    pub mix_shear_y: f32,
    pub local: bool,
    pub relative: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum PositionMode {
    Fixed,
    #[default]
    Percent,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum SpacingMode {
    #[default]
    Length,
    Fixed,
    Percent,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum RotateMode {
    #[default]
    Tangent,
    Chain,
    ChainScale,
}

#[derive(Clone, Debug)]
pub struct PathConstraintData {
    pub name: String,
    pub order: i32,
    pub bones: Vec<usize>,
    /// Target slot carrying the path attachment.
    pub target: usize,
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

/// One bone influence on a skinned vertex: a local offset in the bone's
/// coordinate space plus a blend weight.
#[derive(Clone, Debug, PartialEq)]
pub struct VertexInfluence {
    pub bone: usize,
    pub x: f32,
    pub y: f32,
    pub weight: f32,
}

/// A vertex as a weighted blend of bone influences. Unweighted vertices are
/// normalized at parse time to a single influence with weight 1.0.
/// Invariant: the weights sum to exactly 1.0.
#[derive(Clone, Debug, PartialEq)]
pub struct SkinnedVertex {
    pub influences: Vec<VertexInfluence>,
}

#[derive(Clone, Debug)]
pub enum AttachmentData {
    Region(RegionAttachmentData),
    Mesh(MeshAttachmentData),
    Clipping(ClippingAttachmentData),
    Path(PathAttachmentData),
}

impl AttachmentData {
    pub fn name(&self) -> &str {
        match self {
            AttachmentData::Region(a) => a.name.as_str(),
            AttachmentData::Mesh(a) => a.name.as_str(),
            AttachmentData::Clipping(a) => a.name.as_str(),
            AttachmentData::Path(a) => a.name.as_str(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RegionAttachmentData {
    pub name: String,
    pub x: f32,
    pub y: f32,
    /// Degrees, relative to the slot bone.
    pub rotation: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Debug)]
pub struct MeshAttachmentData {
    pub name: String,
    pub vertices: Vec<SkinnedVertex>,
    /// Normalized (u, v) within the atlas region, one pair per vertex.
    pub uvs: Vec<[f32; 2]>,
    pub triangles: Vec<[u32; 3]>,
    pub hull: usize,
}

#[derive(Clone, Debug)]
pub struct ClippingAttachmentData {
    pub name: String,
    pub vertices: Vec<SkinnedVertex>,
    pub vertex_count: usize,
    /// Last slot masked by this clip.
    pub end_slot: usize,
}

#[derive(Clone, Debug)]
pub struct PathAttachmentData {
    pub name: String,
    /// Groups of exactly 3 vertices per bezier node: left handle, midpoint,
    /// right handle.
    pub vertices: Vec<SkinnedVertex>,
    pub vertex_count: usize,
    pub closed: bool,
}

/// Keyframe interpolation descriptor. Bezier control arrays carry 4 scalars
/// (cx1, cy1, cx2, cy2) per value axis of the channel.
#[derive(Clone, Debug, PartialEq)]
pub enum Curve {
    Linear,
    Stepped,
    Bezier(Vec<f32>),
}

#[derive(Clone, Debug)]
pub struct Vec2Frame {
    pub time: f32,
    pub x: f32,
    pub y: f32,
    pub curve: Curve,
}

#[derive(Clone, Debug)]
pub struct RotateFrame {
    pub time: f32,
    /// Authored delta in degrees.
    pub degrees: f32,
    pub curve: Curve,
}

#[derive(Clone, Debug)]
pub struct ColorFrame {
    pub time: f32,
    pub color: [f32; 4],
    pub curve: Curve,
}

#[derive(Clone, Debug)]
pub struct AttachmentFrame {
    pub time: f32,
    pub name: Option<String>,
}

#[derive(Clone, Debug)]
pub struct DrawOrderOffset {
    pub slot: usize,
    pub offset: i32,
}

#[derive(Clone, Debug)]
pub struct DrawOrderFrame {
    pub time: f32,
    pub offsets: Vec<DrawOrderOffset>,
}

#[derive(Clone, Debug, Default)]
pub struct BoneTimelines {
    pub bone: usize,
    pub translate: Vec<Vec2Frame>,
    pub rotate: Vec<RotateFrame>,
    pub scale: Vec<Vec2Frame>,
}

#[derive(Clone, Debug, Default)]
pub struct SlotTimelines {
    pub slot: usize,
    pub color: Vec<ColorFrame>,
    pub attachment: Vec<AttachmentFrame>,
}

#[derive(Clone, Debug)]
pub struct AnimationData {
    pub name: String,
    pub bones: Vec<BoneTimelines>,
    pub slots: Vec<SlotTimelines>,
    pub draw_order: Vec<DrawOrderFrame>,
}

/// The parsed scene document: bone/slot/constraint tables, the first skin's
/// attachments keyed by slot, and the authored animation channels. All
/// cross-references are indices into the owned tables.
#[derive(Clone, Debug)]
pub struct SceneData {
    pub fps: f32,
    pub bones: Vec<BoneData>,
    pub slots: Vec<SlotData>,
    pub ik_constraints: Vec<IkConstraintData>,
    pub transform_constraints: Vec<TransformConstraintData>,
    pub path_constraints: Vec<PathConstraintData>,
    /// Attachments of the first skin, one map per slot (indexed like `slots`).
    pub attachments: Vec<HashMap<String, AttachmentData>>,
    pub animations: Vec<AnimationData>,
    pub bone_index: HashMap<String, usize>,
    pub slot_index: HashMap<String, usize>,
}

impl SceneData {
    pub fn bone(&self, name: &str) -> Option<(usize, &BoneData)> {
        let index = *self.bone_index.get(name)?;
        Some((index, &self.bones[index]))
    }

    pub fn slot(&self, name: &str) -> Option<(usize, &SlotData)> {
        let index = *self.slot_index.get(name)?;
        Some((index, &self.slots[index]))
    }

    pub fn attachment(&self, slot_index: usize, name: &str) -> Option<&AttachmentData> {
        self.attachments.get(slot_index)?.get(name)
    }
}
