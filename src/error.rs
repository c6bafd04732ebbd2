use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to parse scene JSON: {message}")]
    Parse { message: String },

    #[error("failed to parse atlas: {message}")]
    AtlasParse { message: String },

    #[error("unknown parent bone '{parent}' for bone '{bone}'")]
    UnknownBoneParent { bone: String, parent: String },

    #[error("parent bone '{parent}' is declared after bone '{bone}'")]
    BoneParentOutOfOrder { bone: String, parent: String },

    #[error("bone hierarchy error for bone '{bone}': {message}")]
    Hierarchy { bone: String, message: String },

    #[error("unknown bone '{bone}' referenced by slot '{slot}'")]
    UnknownSlotBone { slot: String, bone: String },

    #[error("unknown bone '{bone}' referenced by IK constraint '{constraint}'")]
    UnknownIkBone { constraint: String, bone: String },

    #[error("unknown target bone '{target}' referenced by IK constraint '{constraint}'")]
    UnknownIkTarget { constraint: String, target: String },

    #[error("IK constraint '{constraint}' has a chain of {len} bones; only 1 or 2 are supported")]
    InvalidIkChain { constraint: String, len: usize },

    #[error("unknown bone '{bone}' referenced by transform constraint '{constraint}'")]
    UnknownTransformBone { constraint: String, bone: String },

    #[error("unknown target bone '{target}' referenced by transform constraint '{constraint}'")]
    UnknownTransformTarget { constraint: String, target: String },

    #[error("unknown bone '{bone}' referenced by path constraint '{constraint}'")]
    UnknownPathBone { constraint: String, bone: String },

    #[error("unknown target slot '{slot}' referenced by path constraint '{constraint}'")]
    UnknownPathTargetSlot { constraint: String, slot: String },

    #[error("path constraint '{constraint}' target slot '{slot}' has no path attachment")]
    MissingPathAttachment { constraint: String, slot: String },

    #[error("unknown bone '{bone}' referenced by animation '{animation}'")]
    UnknownAnimationBone { animation: String, bone: String },

    #[error("unknown slot '{slot}' referenced by animation '{animation}'")]
    UnknownAnimationSlot { animation: String, slot: String },

    #[error("unknown slot '{slot}' referenced by the skin")]
    UnknownSkinSlot { slot: String },

    #[error("attachment '{attachment}' in slot '{slot}' is missing required field '{field}'")]
    MissingAttachmentField {
        slot: String,
        attachment: String,
        field: &'static str,
    },

    #[error("invalid vertex data for slot '{slot}', attachment '{attachment}': {message}")]
    InvalidVertexData {
        slot: String,
        attachment: String,
        message: String,
    },

    #[error("invalid curve for {context}: {message}")]
    InvalidCurve { context: String, message: String },

    #[error("invalid color '{value}' for {context}")]
    InvalidColor { context: String, value: String },

    #[error("no atlas region found for slot '{slot}', attachment '{attachment}'")]
    MissingAtlasRegion { slot: String, attachment: String },

    #[error("unknown end slot '{end}' referenced by clipping attachment '{attachment}'")]
    UnknownClippingEndSlot { attachment: String, end: String },
}

/// Non-fatal degradation. Warnings accumulate during a load and are returned
/// alongside the successful result; they never abort it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Warning {
    #[error("shear on bone '{bone}' is not supported")]
    ShearBone { bone: String },

    #[error("shear timeline for bone '{bone}' in animation '{animation}' is not supported")]
    ShearTimeline { animation: String, bone: String },

    #[error("transform constraint '{constraint}' {channel} mix mode is not implemented")]
    TransformMixUnsupported { constraint: String, channel: String },

    #[error("unsupported atlas rotation {degrees} for region '{region}'; treated as unrotated")]
    UnsupportedAtlasRotation { region: String, degrees: u16 },

    #[error("unsupported attachment type '{kind}' for slot '{slot}', attachment '{attachment}'")]
    UnsupportedAttachment {
        slot: String,
        attachment: String,
        kind: String,
    },
}
