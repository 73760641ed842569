// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe definitions and interpolation kernels.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a keyframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyframeId(pub Uuid);

impl KeyframeId {
    /// Create a new random keyframe ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for KeyframeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Interpolation mode between a keyframe and the next one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum InterpolationMode {
    /// Hold the value until the next key
    Constant,
    /// Linear interpolation
    #[default]
    Linear,
    /// Cubic bezier using the keys' tangents
    Bezier,
    /// Hermite spline with tangents derived from the neighbouring keys
    Auto,
}

/// A keyframe on a curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Unique keyframe ID
    pub id: KeyframeId,
    /// Time in seconds
    pub time: f64,
    /// Value at this keyframe
    pub value: f64,
    /// Interpolation mode to next keyframe
    pub interpolation: InterpolationMode,
    /// In-tangent as a value offset, used by bezier segments
    pub in_tangent: Option<f64>,
    /// Out-tangent as a value offset, used by bezier segments
    pub out_tangent: Option<f64>,
}

impl Keyframe {
    /// Create a new linear keyframe
    pub fn new(time: f64, value: f64) -> Self {
        Self {
            id: KeyframeId::new(),
            time,
            value,
            interpolation: InterpolationMode::Linear,
            in_tangent: None,
            out_tangent: None,
        }
    }

    /// Set interpolation mode
    pub fn with_interpolation(mut self, mode: InterpolationMode) -> Self {
        self.interpolation = mode;
        self
    }

    /// Set tangents for bezier interpolation
    pub fn with_tangents(mut self, in_tangent: f64, out_tangent: f64) -> Self {
        self.in_tangent = Some(in_tangent);
        self.out_tangent = Some(out_tangent);
        self
    }
}

/// Interpolation kernels
pub struct Interpolation;

impl Interpolation {
    /// Linear interpolation between two values
    pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
        a + (b - a) * t
    }

    /// Cubic bezier interpolation
    pub fn bezier(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;

        p0 * mt3 + 3.0 * p1 * mt2 * t + 3.0 * p2 * mt * t2 + p3 * t3
    }

    /// Hermite spline interpolation (for auto-smooth)
    pub fn hermite(p0: f64, m0: f64, p1: f64, m1: f64, t: f64) -> f64 {
        let t2 = t * t;
        let t3 = t2 * t;

        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;

        h00 * p0 + h10 * m0 + h01 * p1 + h11 * m1
    }
}
