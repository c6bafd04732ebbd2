//! Converts authored per-keyframe interpolation descriptors into explicit
//! baked keys with handle data for a generic keyframe system.

use crate::{Curve, Error};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum KeyInterpolation {
    Linear,
    /// Hold/constant segment (authored "stepped").
    Constant,
    Bezier,
}

/// A (frame, value) control handle. Frames are in the document's frame-rate
/// units (authored seconds times fps).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Handle {
    pub frame: f32,
    pub value: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BakedKey {
    pub frame: f32,
    pub value: f32,
    pub interpolation: KeyInterpolation,
    pub handle_left: Option<Handle>,
    pub handle_right: Option<Handle>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BakedChannel {
    pub keys: Vec<BakedKey>,
}

impl BakedChannel {
    pub fn frame_end(&self) -> f32 {
        self.keys.last().map(|key| key.frame).unwrap_or(0.0)
    }
}

/// One authored keyframe of a single value axis, with the (possibly shared
/// multi-axis) interpolation descriptor of its segment.
#[derive(Clone, Debug)]
pub struct ChannelKey<'a> {
    pub time: f32,
    pub value: f32,
    pub curve: &'a Curve,
}

/// Bakes one value axis of a channel.
///
/// `axis`/`axis_count` select this axis's 4-scalar slice of a shared bezier
/// control array. `compose` maps an authored value onto the channel's static
/// baseline (authored bone values are deltas over the setup pose) and is
/// applied to key values and handle values alike; the time axis is scaled by
/// `fps`.
///
/// A bezier segment's first control pair becomes the current key's right
/// handle; the second becomes the next key's left handle, threaded through
/// an explicit pending-handle accumulator.
pub fn bake_axis(
    keys: &[ChannelKey<'_>],
    axis: usize,
    axis_count: usize,
    fps: f32,
    compose: impl Fn(f32) -> f32,
    context: &str,
) -> Result<BakedChannel, Error> {
    let mut baked = Vec::with_capacity(keys.len());
    let mut pending: Option<Handle> = None;

    for key in keys {
        let mut out = BakedKey {
            frame: key.time * fps,
            value: compose(key.value),
            interpolation: KeyInterpolation::Linear,
            handle_left: pending.take(),
            handle_right: None,
        };

        match key.curve {
            Curve::Linear => {}
            Curve::Stepped => out.interpolation = KeyInterpolation::Constant,
            Curve::Bezier(values) => {
                let base = bezier_base(values, axis, axis_count, context)?;
                out.interpolation = KeyInterpolation::Bezier;
                out.handle_right = Some(Handle {
                    frame: values[base] * fps,
                    value: compose(values[base + 1]),
                });
                pending = Some(Handle {
                    frame: values[base + 2] * fps,
                    value: compose(values[base + 3]),
                });
            }
        }

        baked.push(out);
    }

    Ok(BakedChannel { keys: baked })
}

/// Offset of this axis's (cx1, cy1, cx2, cy2) slice. Old exporters write a
/// single 4-scalar curve even for multi-axis channels; it is then shared by
/// every axis.
fn bezier_base(
    values: &[f32],
    axis: usize,
    axis_count: usize,
    context: &str,
) -> Result<usize, Error> {
    if values.len() == 4 * axis_count {
        Ok(axis * 4)
    } else if values.len() == 4 {
        Ok(0)
    } else {
        Err(Error::InvalidCurve {
            context: context.to_string(),
            message: format!(
                "expected {} bezier scalars for {axis_count} axes, found {}",
                4 * axis_count,
                values.len()
            ),
        })
    }
}
