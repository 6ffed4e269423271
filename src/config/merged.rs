use super::job::Job;
use super::settings::Settings;
use crate::render::encode::OutputFormat;

/// Per-document values: job entries take precedence over settings.
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub scale: f32,
    pub output_format: OutputFormat,
    pub jpeg_quality: u8,
}

impl MergedConfig {
    /// JobのOption値がSomeならJobの値を、NoneならSettingsの値を使用する。
    pub fn new(settings: &Settings, job: &Job) -> Self {
        MergedConfig {
            scale: job.scale.unwrap_or(settings.scale),
            output_format: job.output_format.unwrap_or(settings.output_format),
            jpeg_quality: job.jpeg_quality.unwrap_or(settings.jpeg_quality),
        }
    }
}
