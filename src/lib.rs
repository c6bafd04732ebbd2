//! Bakes Spine-style scene exports (JSON scene document plus texture atlas)
//! into resolved skeleton poses, skinned attachment geometry, page UVs, and
//! per-channel keyframe data ready for a generic animation system.
//!
//! The crate is renderer- and host-agnostic: it loads and resolves, an
//! integration layer consumes [`BakedScene`].

#![forbid(unsafe_code)]

mod atlas;
mod bake;
mod curve;
mod error;
mod json;
mod model;
mod skeleton;
mod skinning;

pub use atlas::*;
pub use bake::*;
pub use curve::*;
pub use error::*;
pub use model::*;
pub use skeleton::*;
pub use skinning::*;


#[cfg(test)]
mod bake_tests;
