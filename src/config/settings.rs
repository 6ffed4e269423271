use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::render::encode::OutputFormat;
use crate::tuning::{ProfileDraft, TuningProfile};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// バッチ処理時のレンダリング倍率（1.0 = 72dpi）
    pub scale: f32,
    pub output_format: OutputFormat,
    pub jpeg_quality: u8,
    pub parallel_workers: usize,
    pub state_dir: PathBuf,
    /// 調整提案コマンド（argv）。未指定なら既定プロファイルのみを使う
    pub tuning_command: Option<Vec<String>>,
    /// 既定プロファイルの部分上書き
    pub tuning: ProfileDraft,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            scale: 2.0,
            output_format: OutputFormat::Png,
            jpeg_quality: 85,
            parallel_workers: 0,
            state_dir: PathBuf::from(".ink_scrub"),
            tuning_command: None,
            tuning: ProfileDraft::default(),
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        let settings: Settings = serde_yml::from_str(yaml).map_err(|e| {
            crate::error::InkScrubError::config(format!("Failed to parse settings YAML: {e}"))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// 組み込み既定値に `tuning:` ブロックを重ねたプロファイル。
    pub fn default_profile(&self) -> TuningProfile {
        self.tuning.apply(&TuningProfile::default())
    }

    fn validate(&self) -> crate::error::Result<()> {
        validate_scale(self.scale)?;
        validate_jpeg_quality(self.jpeg_quality)?;
        if let Some(argv) = &self.tuning_command
            && argv.first().is_none_or(|p| p.trim().is_empty())
        {
            return Err(crate::error::InkScrubError::config(
                "tuning_command must name a program",
            ));
        }
        Ok(())
    }
}

pub(crate) fn validate_scale(scale: f32) -> crate::error::Result<()> {
    if scale.is_finite() && scale > 0.0 {
        Ok(())
    } else {
        Err(crate::error::InkScrubError::config(format!(
            "scale must be a positive number, got {scale}"
        )))
    }
}

pub(crate) fn validate_jpeg_quality(quality: u8) -> crate::error::Result<()> {
    if (1..=100).contains(&quality) {
        Ok(())
    } else {
        Err(crate::error::InkScrubError::config(format!(
            "jpeg_quality must be within 1-100, got {quality}"
        )))
    }
}
