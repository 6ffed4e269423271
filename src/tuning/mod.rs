//! Detection parameters and how they are obtained.
//!
//! A [`TuningProfile`] can only be built through clamping constructors, so
//! every profile in circulation is within range no matter where its numbers
//! came from (built-in default, `settings.yaml`, or an external suggestion).

pub mod resolver;
pub mod source;

use serde::{Deserialize, Serialize};

pub const S_MIN_DEFAULT: f64 = 0.35;
pub const V_MIN_DEFAULT: f64 = 0.25;
pub const HUE_A_DEFAULT: (f64, f64) = (0.0, 25.0);
pub const HUE_B_DEFAULT: (f64, f64) = (330.0, 360.0);
pub const DILATE_RADIUS_DEFAULT: u8 = 1;
pub const INPAINT_RADIUS_DEFAULT: u8 = 2;

pub const DILATE_RADIUS_MAX: u8 = 3;
pub const INPAINT_RADIUS_MIN: u8 = 1;
pub const INPAINT_RADIUS_MAX: u8 = 5;

/// A hue interval in degrees.
///
/// `start <= end` is the half-open interval `[start, end)`. `start > end`
/// wraps through 0°: `h >= start || h <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HueRange {
    start: f64,
    end: f64,
}

impl HueRange {
    /// Build a range from raw bounds.
    ///
    /// The upper bound 360 is kept as-is so that `[330, 360)` covers the top
    /// of the circle; every other bound is reduced modulo 360.
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start: normalize_hue(start),
            end: normalize_hue_upper(end),
        }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn wraps(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, hue: f64) -> bool {
        if self.wraps() {
            hue >= self.start || hue <= self.end
        } else {
            hue >= self.start && hue < self.end
        }
    }
}

/// Reduce any finite angle into `[0, 360)`.
pub fn normalize_hue(h: f64) -> f64 {
    let r = h.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if r >= 360.0 { 0.0 } else { r }
}

/// Upper bounds may sit at exactly 360.
fn normalize_hue_upper(h: f64) -> f64 {
    if h == 360.0 { 360.0 } else { normalize_hue(h) }
}

/// Validated detection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TuningProfile {
    s_min: f64,
    v_min: f64,
    hue_a: HueRange,
    hue_b: HueRange,
    dilate_radius: u8,
    inpaint_radius: u8,
}

impl Default for TuningProfile {
    fn default() -> Self {
        Self {
            s_min: S_MIN_DEFAULT,
            v_min: V_MIN_DEFAULT,
            hue_a: HueRange::new(HUE_A_DEFAULT.0, HUE_A_DEFAULT.1),
            hue_b: HueRange::new(HUE_B_DEFAULT.0, HUE_B_DEFAULT.1),
            dilate_radius: DILATE_RADIUS_DEFAULT,
            inpaint_radius: INPAINT_RADIUS_DEFAULT,
        }
    }
}

impl TuningProfile {
    /// Build a profile, clamping every field into its valid range.
    pub fn new(
        s_min: f64,
        v_min: f64,
        hue_a: (f64, f64),
        hue_b: (f64, f64),
        dilate_radius: f64,
        inpaint_radius: f64,
    ) -> Self {
        Self {
            s_min: clamp_unit(s_min),
            v_min: clamp_unit(v_min),
            hue_a: HueRange::new(hue_a.0, hue_a.1),
            hue_b: HueRange::new(hue_b.0, hue_b.1),
            dilate_radius: clamp_radius(dilate_radius, 0, DILATE_RADIUS_MAX),
            inpaint_radius: clamp_radius(inpaint_radius, INPAINT_RADIUS_MIN, INPAINT_RADIUS_MAX),
        }
    }

    pub fn s_min(&self) -> f64 {
        self.s_min
    }

    pub fn v_min(&self) -> f64 {
        self.v_min
    }

    pub fn hue_a(&self) -> HueRange {
        self.hue_a
    }

    pub fn hue_b(&self) -> HueRange {
        self.hue_b
    }

    pub fn dilate_radius(&self) -> u8 {
        self.dilate_radius
    }

    pub fn inpaint_radius(&self) -> u8 {
        self.inpaint_radius
    }

    /// HSV値が赤ペンとして分類されるか判定する。
    pub fn matches(&self, h: f64, s: f64, v: f64) -> bool {
        s >= self.s_min && v >= self.v_min && (self.hue_a.contains(h) || self.hue_b.contains(h))
    }
}

fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        return 0.0;
    }
    x.clamp(0.0, 1.0)
}

fn clamp_radius(x: f64, min: u8, max: u8) -> u8 {
    if x.is_nan() {
        return min;
    }
    x.round().clamp(min as f64, max as f64) as u8
}

/// A partial profile: any field left `None` is taken from a base profile.
///
/// `settings.yaml` deserializes straight into this; external suggestions are
/// converted field by field in [`resolver`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileDraft {
    pub s_min: Option<f64>,
    pub v_min: Option<f64>,
    pub hue_a: Option<[f64; 2]>,
    pub hue_b: Option<[f64; 2]>,
    pub dilate_radius: Option<f64>,
    pub inpaint_radius: Option<f64>,
}

impl ProfileDraft {
    /// Fill gaps from `base` and clamp the result.
    pub fn apply(&self, base: &TuningProfile) -> TuningProfile {
        let hue = |draft: Option<[f64; 2]>, fallback: HueRange| match draft {
            Some([a, b]) => HueRange::new(a, b),
            None => fallback,
        };
        TuningProfile {
            s_min: self.s_min.map_or(base.s_min, clamp_unit),
            v_min: self.v_min.map_or(base.v_min, clamp_unit),
            hue_a: hue(self.hue_a, base.hue_a),
            hue_b: hue(self.hue_b, base.hue_b),
            dilate_radius: self
                .dilate_radius
                .map_or(base.dilate_radius, |r| clamp_radius(r, 0, DILATE_RADIUS_MAX)),
            inpaint_radius: self.inpaint_radius.map_or(base.inpaint_radius, |r| {
                clamp_radius(r, INPAINT_RADIUS_MIN, INPAINT_RADIUS_MAX)
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
