// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframed animation curves for the Lumen compositor.
//!
//! Curves are the animated counterpart of a constant socket value: a
//! sorted list of keyframes that is sampled at the time carried by a
//! frame demand.
//!
//! ## Architecture
//!
//! - [`Keyframe`] stores a time, a scalar value and the interpolation used
//!   towards the next key
//! - [`Interpolation`] holds the interpolation kernels
//! - [`Curve`] keeps keyframes ordered and samples them

pub mod keyframe;
pub mod curve;

pub use keyframe::{Keyframe, KeyframeId, InterpolationMode, Interpolation};
pub use curve::{Curve, CurveError};
