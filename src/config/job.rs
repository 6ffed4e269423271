use serde::Deserialize;

use super::settings::{validate_jpeg_quality, validate_scale};
use crate::render::encode::OutputFormat;

#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    pub jobs: Vec<Job>,
}

/// 1文書分のジョブ定義。未指定の項目はSettingsの値を使う。
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Job {
    pub input: String,
    pub output: String,
    pub scale: Option<f32>,
    pub output_format: Option<OutputFormat>,
    pub jpeg_quality: Option<u8>,
}

impl JobFile {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        let job_file: JobFile = serde_yml::from_str(yaml).map_err(|e| {
            crate::error::InkScrubError::config(format!("Failed to parse job YAML: {e}"))
        })?;
        if job_file.jobs.is_empty() {
            return Err(crate::error::InkScrubError::config(
                "Job file contains no jobs",
            ));
        }
        for job in &job_file.jobs {
            job.validate()?;
        }
        Ok(job_file)
    }

    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}

impl Job {
    fn validate(&self) -> crate::error::Result<()> {
        if self.input.trim().is_empty() || self.output.trim().is_empty() {
            return Err(crate::error::InkScrubError::config(
                "Job input and output must not be empty",
            ));
        }
        if let Some(scale) = self.scale {
            validate_scale(scale)?;
        }
        if let Some(quality) = self.jpeg_quality {
            validate_jpeg_quality(quality)?;
        }
        Ok(())
    }
}
