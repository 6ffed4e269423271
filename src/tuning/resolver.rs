// TuningProfileの決定: 既定値 or 外部提案（抽出 → パース → クランプ）

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use tracing::{debug, warn};

use super::source::{TUNING_INSTRUCTION, TuningFailure, TuningRequest, TuningSource};
use super::{ProfileDraft, TuningProfile};
use crate::render::PixelBuffer;
use crate::render::encode::encode_png;

/// Produces the profile used for one page attempt.
///
/// Holds no state between calls: with a fixed default, the result depends
/// only on the source's response text.
pub struct TuningResolver {
    default: TuningProfile,
    source: Option<Box<dyn TuningSource>>,
}

impl Default for TuningResolver {
    fn default() -> Self {
        Self::new(TuningProfile::default())
    }
}

impl TuningResolver {
    pub fn new(default: TuningProfile) -> Self {
        Self {
            default,
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: Box<dyn TuningSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    pub fn default_profile(&self) -> &TuningProfile {
        &self.default
    }

    /// Resolve a profile, querying the source with `sample` when both exist.
    ///
    /// Never fails: any problem reaching or understanding the source yields
    /// the default profile.
    pub fn resolve(&self, sample: Option<&PixelBuffer>) -> TuningProfile {
        let (Some(source), Some(sample)) = (self.source.as_deref(), sample) else {
            return self.default;
        };

        match query(source, sample) {
            Ok(text) => resolve_response(&text, &self.default),
            Err(e) => {
                warn!(error = %e, "tuning suggestion unavailable, using default profile");
                self.default
            }
        }
    }
}

fn query(source: &dyn TuningSource, sample: &PixelBuffer) -> Result<String, TuningFailure> {
    let png = encode_png(sample).map_err(|e| TuningFailure::Encode(e.to_string()))?;
    let request = TuningRequest {
        instruction: TUNING_INSTRUCTION,
        image_png_base64: STANDARD.encode(png),
    };
    source.suggest(&request)
}

/// Turn a free-form response into a profile.
///
/// The text between the first `{` and the last `}` is parsed as JSON. If there
/// is no such span, it does not parse, or it is not an object, `default` is
/// returned unchanged. Otherwise each recognised field is clamped on its own
/// and every missing or mistyped field keeps its default.
pub fn resolve_response(text: &str, default: &TuningProfile) -> TuningProfile {
    let Some(span) = extract_json_span(text) else {
        debug!("tuning response contains no JSON object");
        return *default;
    };

    let value: Value = match serde_json::from_str(span) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "tuning response is not valid JSON");
            return *default;
        }
    };

    match draft_from_json(&value) {
        Some(draft) => draft.apply(default),
        None => {
            debug!("tuning response JSON is not an object");
            *default
        }
    }
}

/// First `{` to last `}` inclusive.
pub fn extract_json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

fn draft_from_json(value: &Value) -> Option<ProfileDraft> {
    let obj = value.as_object()?;
    let number = |key: &str| obj.get(key).and_then(Value::as_f64);
    let pair = |key: &str| match obj.get(key).and_then(Value::as_array)?.as_slice() {
        [a, b] => Some([a.as_f64()?, b.as_f64()?]),
        _ => None,
    };

    Some(ProfileDraft {
        s_min: number("sMin"),
        v_min: number("vMin"),
        hue_a: pair("hueA"),
        hue_b: pair("hueB"),
        dilate_radius: number("dilateRadius"),
        inpaint_radius: number("inpaintRadius"),
    })
}
