// 設定ファイル解析テスト

use std::io::Write;
use std::path::Path;

use ink_scrub::config::job::JobFile;
use ink_scrub::config::load_settings_for_job;
use ink_scrub::config::merged::MergedConfig;
use ink_scrub::config::settings::Settings;
use ink_scrub::render::encode::OutputFormat;
use ink_scrub::tuning::{HueRange, TuningProfile};

// ============================================================
// 1. Settings 構造体のデシリアライズ
// ============================================================

#[test]
fn test_settings_full_yaml() {
    let yaml = r#"
scale: 3.0
output_format: jpeg
jpeg_quality: 70
parallel_workers: 4
state_dir: "/tmp/ink_state"
tuning_command: ["suggest-thresholds", "--model", "small"]
tuning:
  s_min: 0.5
  hue_b: [340, 360]
"#;
    let settings = Settings::from_yaml(yaml).expect("should parse full YAML");
    assert_eq!(settings.scale, 3.0);
    assert_eq!(settings.output_format, OutputFormat::Jpeg);
    assert_eq!(settings.jpeg_quality, 70);
    assert_eq!(settings.parallel_workers, 4);
    assert_eq!(settings.state_dir, Path::new("/tmp/ink_state"));
    assert_eq!(
        settings.tuning_command,
        Some(vec![
            "suggest-thresholds".to_string(),
            "--model".to_string(),
            "small".to_string()
        ])
    );
    assert_eq!(settings.tuning.s_min, Some(0.5));
    assert_eq!(settings.tuning.hue_b, Some([340.0, 360.0]));
}

#[test]
fn test_settings_empty_yaml() {
    // 空YAML（"{}" はserde_ymlで空のマッピングを意味する）
    let settings = Settings::from_yaml("{}").expect("should use defaults for empty YAML");
    assert_eq!(settings.scale, 2.0);
    assert_eq!(settings.output_format, OutputFormat::Png);
    assert_eq!(settings.jpeg_quality, 85);
    assert_eq!(settings.parallel_workers, 0);
    assert_eq!(settings.state_dir, Path::new(".ink_scrub"));
    assert!(settings.tuning_command.is_none());
    assert!(settings.tuning.is_empty());
}

#[test]
fn test_settings_partial_yaml() {
    let settings = Settings::from_yaml("scale: 1.5").expect("should fill missing with defaults");
    assert_eq!(settings.scale, 1.5);
    // 残りはデフォルト値
    assert_eq!(settings.output_format, OutputFormat::Png);
    assert_eq!(settings.jpeg_quality, 85);
}

#[test]
fn test_settings_rejects_invalid_values() {
    assert!(Settings::from_yaml("scale: 0").is_err());
    assert!(Settings::from_yaml("scale: -1.0").is_err());
    assert!(Settings::from_yaml("jpeg_quality: 0").is_err());
    assert!(Settings::from_yaml("output_format: tiff").is_err());
    assert!(Settings::from_yaml("tuning_command: []").is_err());
    assert!(Settings::from_yaml("tuning:\n  colour: red").is_err());
}

// ============================================================
// 2. Job 構造体のデシリアライズ
// ============================================================

#[test]
fn test_job_required_fields_only() {
    let yaml = r#"
jobs:
  - input: "input.pdf"
    output: "output.pdf"
"#;
    let job_file = JobFile::from_yaml(yaml).expect("should parse required fields");
    assert_eq!(job_file.jobs.len(), 1);
    let job = &job_file.jobs[0];
    assert_eq!(job.input, "input.pdf");
    assert_eq!(job.output, "output.pdf");
    assert!(job.scale.is_none());
    assert!(job.output_format.is_none());
    assert!(job.jpeg_quality.is_none());
}

#[test]
fn test_job_with_optional_fields() {
    let yaml = r#"
jobs:
  - input: "input.pdf"
    output: "output.pdf"
    scale: 4
    output_format: jpeg
    jpeg_quality: 60
"#;
    let job_file = JobFile::from_yaml(yaml).expect("should parse with optional fields");
    let job = &job_file.jobs[0];
    assert_eq!(job.scale, Some(4.0));
    assert_eq!(job.output_format, Some(OutputFormat::Jpeg));
    assert_eq!(job.jpeg_quality, Some(60));
}

#[test]
fn test_job_missing_required_field() {
    // inputが欠損
    let yaml = r#"
jobs:
  - output: "output.pdf"
"#;
    assert!(
        JobFile::from_yaml(yaml).is_err(),
        "should fail when required field is missing"
    );
}

#[test]
fn test_job_file_validation() {
    assert!(JobFile::from_yaml("jobs: []").is_err(), "empty job list");
    let bad_quality = r#"
jobs:
  - input: "a.pdf"
    output: "b.pdf"
    jpeg_quality: 101
"#;
    assert!(JobFile::from_yaml(bad_quality).is_err());
    let unknown_field = r#"
jobs:
  - input: "a.pdf"
    output: "b.pdf"
    dpi: 300
"#;
    assert!(JobFile::from_yaml(unknown_field).is_err());
}

#[test]
fn test_job_multiple_jobs() {
    let yaml = r#"
jobs:
  - input: "a.pdf"
    output: "a_out.pdf"
  - input: "b.pdf"
    output: "b_out.pdf"
"#;
    let job_file = JobFile::from_yaml(yaml).expect("should parse multiple jobs");
    assert_eq!(job_file.jobs.len(), 2);
    assert_eq!(job_file.jobs[0].input, "a.pdf");
    assert_eq!(job_file.jobs[1].input, "b.pdf");
}

// ============================================================
// 3. 設定マージロジック
// ============================================================

#[test]
fn test_merge_job_values_override_settings() {
    let settings = Settings::from_yaml("scale: 2.0\njpeg_quality: 90").expect("parse settings");
    let job_yaml = r#"
jobs:
  - input: "in.pdf"
    output: "out.pdf"
    scale: 1.0
    output_format: jpeg
"#;
    let job_file = JobFile::from_yaml(job_yaml).expect("parse job");
    let merged = MergedConfig::new(&settings, &job_file.jobs[0]);
    assert_eq!(merged.scale, 1.0, "job scale should override settings scale");
    assert_eq!(merged.output_format, OutputFormat::Jpeg);
    assert_eq!(merged.jpeg_quality, 90, "should fall back to settings quality");
}

#[test]
fn test_merge_no_settings_uses_defaults() {
    let settings = Settings::default();
    let job_file = JobFile::from_yaml("jobs:\n  - input: in.pdf\n    output: out.pdf\n")
        .expect("parse job");
    let merged = MergedConfig::new(&settings, &job_file.jobs[0]);
    assert_eq!(merged.scale, 2.0);
    assert_eq!(merged.output_format, OutputFormat::Png);
    assert_eq!(merged.jpeg_quality, 85);
    assert_eq!(settings.default_profile(), TuningProfile::default());
}

#[test]
fn test_settings_tuning_overrides_are_clamped() {
    let yaml = r#"
tuning:
  s_min: 1.7
  hue_a: [-10, 15]
  dilate_radius: 0
"#;
    let settings = Settings::from_yaml(yaml).expect("parse settings");

    let profile = settings.default_profile();
    assert_eq!(profile.s_min(), 1.0);
    assert_eq!(profile.hue_a(), HueRange::new(350.0, 15.0));
    assert_eq!(profile.dilate_radius(), 0);
    assert_eq!(profile.inpaint_radius(), 2);
}

// ============================================================
// 4. settings.yaml自動検出
// ============================================================

#[test]
fn test_auto_detect_settings_yaml_exists() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let settings_path = dir.path().join("settings.yaml");
    let job_path = dir.path().join("jobs.yaml");

    let mut f = std::fs::File::create(&settings_path).expect("create settings.yaml");
    f.write_all(b"scale: 4.5\n").expect("write settings");

    // ジョブファイルもダミーで作成（パスの解決に必要）
    std::fs::File::create(&job_path).expect("create jobs.yaml");

    let settings = load_settings_for_job(&job_path).expect("should load settings");
    assert_eq!(settings.scale, 4.5);
}

#[test]
fn test_auto_detect_settings_yaml_missing() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let job_path = dir.path().join("jobs.yaml");
    std::fs::File::create(&job_path).expect("create jobs.yaml");

    let settings = load_settings_for_job(&job_path).expect("should return defaults");
    assert_eq!(
        settings.scale, 2.0,
        "should use default when settings.yaml absent"
    );
}
