// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scalar animation curve sampled by time.

use crate::keyframe::{Interpolation, InterpolationMode, Keyframe, KeyframeId};
use serde::{Deserialize, Serialize};

/// Keys closer than this are treated as coincident
const TIME_EPSILON: f64 = 1e-9;

/// Error when editing a curve
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CurveError {
    /// Keyframe time is NaN or infinite
    #[error("Keyframe time must be finite, got {0}")]
    NonFiniteTime(f64),

    /// Keyframe value is NaN or infinite
    #[error("Keyframe value must be finite, got {0}")]
    NonFiniteValue(f64),
}

/// An animation curve: keyframes kept sorted by time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CurveData")]
pub struct Curve {
    keyframes: Vec<Keyframe>,
}

/// Serialized form of a curve, validated on load
#[derive(Serialize, Deserialize)]
struct CurveData {
    keyframes: Vec<Keyframe>,
}

impl TryFrom<CurveData> for Curve {
    type Error = CurveError;

    fn try_from(data: CurveData) -> Result<Self, Self::Error> {
        Self::from_keyframes(data.keyframes)
    }
}

impl Curve {
    /// Create an empty curve
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a curve holding a single value at time zero
    pub fn constant(value: f64) -> Self {
        Self {
            keyframes: vec![Keyframe::new(0.0, value)],
        }
    }

    /// Build a curve from keyframes in any order
    pub fn from_keyframes(keyframes: impl IntoIterator<Item = Keyframe>) -> Result<Self, CurveError> {
        let mut curve = Self::new();
        for keyframe in keyframes {
            curve.add_keyframe(keyframe)?;
        }
        Ok(curve)
    }

    /// Add a keyframe, keeping the curve sorted
    pub fn add_keyframe(&mut self, keyframe: Keyframe) -> Result<KeyframeId, CurveError> {
        if !keyframe.time.is_finite() {
            return Err(CurveError::NonFiniteTime(keyframe.time));
        }
        if !keyframe.value.is_finite() {
            return Err(CurveError::NonFiniteValue(keyframe.value));
        }
        let id = keyframe.id;
        self.keyframes.push(keyframe);
        self.sort_keyframes();
        Ok(id)
    }

    /// Remove a keyframe
    pub fn remove_keyframe(&mut self, keyframe_id: KeyframeId) -> Option<Keyframe> {
        let idx = self.keyframes.iter().position(|k| k.id == keyframe_id)?;
        Some(self.keyframes.remove(idx))
    }

    /// Insert or update the keyframe at time
    pub fn set_keyframe_at(&mut self, time: f64, value: f64) -> Result<KeyframeId, CurveError> {
        if let Some(kf) = self.keyframes.iter_mut().find(|k| (k.time - time).abs() < TIME_EPSILON) {
            if !value.is_finite() {
                return Err(CurveError::NonFiniteValue(value));
            }
            kf.value = value;
            return Ok(kf.id);
        }
        self.add_keyframe(Keyframe::new(time, value))
    }

    /// Get all keyframes in time order
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Number of keyframes
    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    /// Whether the curve has no keyframes
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Time of the last keyframe
    pub fn duration(&self) -> f64 {
        self.keyframes.last().map_or(0.0, |k| k.time)
    }

    fn sort_keyframes(&mut self) {
        self.keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    /// Sample the curve. Times outside the keyed range hold the nearest key.
    pub fn sample(&self, time: f64) -> Option<f64> {
        let next_idx = self.keyframes.iter().position(|k| k.time >= time);

        match next_idx {
            None => self.keyframes.last().map(|k| k.value),
            Some(0) => self.keyframes.first().map(|k| k.value),
            Some(idx) => {
                let a = &self.keyframes[idx - 1];
                let b = &self.keyframes[idx];
                let span = b.time - a.time;
                if span.abs() < TIME_EPSILON {
                    return Some(b.value);
                }
                let t = (time - a.time) / span;
                Some(self.interpolate(idx - 1, t))
            }
        }
    }

    fn interpolate(&self, idx: usize, t: f64) -> f64 {
        let a = &self.keyframes[idx];
        let b = &self.keyframes[idx + 1];

        match a.interpolation {
            InterpolationMode::Constant => a.value,
            InterpolationMode::Linear => Interpolation::lerp(a.value, b.value, t),
            InterpolationMode::Bezier => {
                let p1 = a.value + a.out_tangent.unwrap_or(0.0);
                let p2 = b.value + b.in_tangent.unwrap_or(0.0);
                Interpolation::bezier(a.value, p1, p2, b.value, t)
            }
            InterpolationMode::Auto => {
                let span = b.time - a.time;
                let m0 = self.slope(idx) * span;
                let m1 = self.slope(idx + 1) * span;
                Interpolation::hermite(a.value, m0, b.value, m1, t)
            }
        }
    }

    /// Catmull-Rom style slope at a key, one-sided at the ends
    fn slope(&self, idx: usize) -> f64 {
        let prev = &self.keyframes[idx.saturating_sub(1)];
        let next = &self.keyframes[(idx + 1).min(self.keyframes.len() - 1)];
        let dt = next.time - prev.time;
        if dt.abs() < TIME_EPSILON {
            0.0
        } else {
            (next.value - prev.value) / dt
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Curve {
        Curve::from_keyframes([Keyframe::new(2.0, 10.0), Keyframe::new(0.0, 0.0)]).unwrap()
    }

    #[test]
    fn test_keyframes_are_sorted() {
        let curve = ramp();
        assert_eq!(curve.keyframes()[0].time, 0.0);
        assert_eq!(curve.keyframes()[1].time, 2.0);
        assert_eq!(curve.duration(), 2.0);
    }

    #[test]
    fn test_sample_linear_and_clamped() {
        let curve = ramp();
        assert_eq!(curve.sample(-1.0), Some(0.0));
        assert_eq!(curve.sample(1.0), Some(5.0));
        assert_eq!(curve.sample(2.0), Some(10.0));
        assert_eq!(curve.sample(7.0), Some(10.0));
    }

    #[test]
    fn test_sample_constant_holds_previous_key() {
        let curve = Curve::from_keyframes([
            Keyframe::new(0.0, 1.0).with_interpolation(InterpolationMode::Constant),
            Keyframe::new(1.0, 4.0),
        ])
        .unwrap();
        assert_eq!(curve.sample(0.99), Some(1.0));
        assert_eq!(curve.sample(1.0), Some(4.0));
    }

    #[test]
    fn test_auto_passes_through_keys() {
        let curve = Curve::from_keyframes([
            Keyframe::new(0.0, 0.0).with_interpolation(InterpolationMode::Auto),
            Keyframe::new(1.0, 3.0).with_interpolation(InterpolationMode::Auto),
            Keyframe::new(2.0, 1.0),
        ])
        .unwrap();
        assert_eq!(curve.sample(1.0), Some(3.0));
        let between = curve.sample(0.5).unwrap();
        assert!(between > 0.0 && between < 3.5);
    }

    #[test]
    fn test_empty_curve_has_no_sample() {
        assert_eq!(Curve::new().sample(0.0), None);
    }

    #[test]
    fn test_rejects_non_finite_time() {
        let mut curve = Curve::new();
        let err = curve.add_keyframe(Keyframe::new(f64::NAN, 1.0)).unwrap_err();
        assert!(matches!(err, CurveError::NonFiniteTime(_)));
        assert!(curve.is_empty());
    }

    #[test]
    fn test_set_keyframe_at_updates_existing() {
        let mut curve = ramp();
        let id = curve.set_keyframe_at(2.0, 20.0).unwrap();
        assert_eq!(curve.len(), 2);
        assert_eq!(curve.keyframes()[1].id, id);
        assert_eq!(curve.sample(1.0), Some(10.0));

        assert!(curve.remove_keyframe(id).is_some());
        assert_eq!(curve.len(), 1);
    }

    #[test]
    fn test_serialization() {
        let curve = ramp();
        let text = ron::ser::to_string_pretty(&curve, ron::ser::PrettyConfig::default()).unwrap();
        let loaded: Curve = ron::from_str(&text).unwrap();
        assert_eq!(loaded, curve);
    }

    #[test]
    fn test_loaded_keyframes_are_sorted() {
        let data = CurveData {
            keyframes: vec![Keyframe::new(2.0, 10.0), Keyframe::new(0.0, 0.0)],
        };
        let text = ron::to_string(&data).unwrap();
        let loaded: Curve = ron::from_str(&text).unwrap();
        assert_eq!(loaded.keyframes()[0].time, 0.0);
        assert_eq!(loaded.sample(1.0), Some(5.0));
    }

    #[test]
    fn test_loading_rejects_non_finite_keys() {
        let data = CurveData {
            keyframes: vec![Keyframe::new(0.0, 0.0), Keyframe::new(f64::INFINITY, 1.0)],
        };
        let text = ron::to_string(&data).unwrap();
        assert!(ron::from_str::<Curve>(&text).is_err());
    }
}
