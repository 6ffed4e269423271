use std::path::{Path, PathBuf};
use std::process::ExitCode;

use ink_scrub::config::job::JobFile;
use ink_scrub::config::merged::MergedConfig;
use ink_scrub::config::settings::Settings;
use ink_scrub::config::{self};
use ink_scrub::pipeline::{
    BatchDocument, JobStatus, Orchestrator, assemble, stored_document,
};
use ink_scrub::render::PageSource;
use ink_scrub::session::FsSessionStore;
use ink_scrub::tuning::resolver::TuningResolver;
use ink_scrub::tuning::source::CommandTuningSource;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("Usage: ink_scrub [--resume] <jobs.yaml>...");
        eprintln!("  Remove red correction ink from PDF pages as described by job files.");
        eprintln!("  --resume  continue unfinished documents from the session store");
        return if args.is_empty() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        eprintln!("ink_scrub {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let resume = args.iter().any(|a| a == "--resume");
    let job_files: Vec<&String> = args.iter().filter(|a| *a != "--resume").collect();
    if job_files.is_empty() {
        eprintln!("ERROR: No job file given");
        return ExitCode::FAILURE;
    }

    let mut pool_configured = false;
    let mut has_error = false;

    for job_file_arg in job_files {
        let job_file_path = Path::new(job_file_arg);

        // Load settings from the same directory as the job file.
        let settings = match config::load_settings_for_job(job_file_path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("ERROR: Failed to load settings for {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        let job_file = match JobFile::from_file(job_file_path) {
            Ok(jf) => jf,
            Err(e) => {
                eprintln!("ERROR: Failed to load job file {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        if !pool_configured && settings.parallel_workers > 0 {
            if let Err(e) = rayon::ThreadPoolBuilder::new()
                .num_threads(settings.parallel_workers)
                .build_global()
            {
                warn!(error = %e, "could not size the worker pool");
            }
            pool_configured = true;
        }

        // Resolve job file directory for relative paths.
        let job_dir = job_file_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        if !run_job_file(&job_dir, &settings, &job_file, resume) {
            has_error = true;
        }
    }

    if has_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

struct PreparedJob {
    input_path: PathBuf,
    output_path: PathBuf,
    merged: MergedConfig,
    source: Box<dyn PageSource>,
}

/// 1つのジョブファイルを処理する。全文書が成功した場合のみtrueを返す。
fn run_job_file(job_dir: &Path, settings: &Settings, job_file: &JobFile, resume: bool) -> bool {
    let mut ok = true;

    let state_dir = job_dir.join(&settings.state_dir);
    let store = match FsSessionStore::open(&state_dir) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(dir = %state_dir.display(), error = %e, "session store unavailable");
            None
        }
    };

    let mut prepared: Vec<PreparedJob> = Vec::new();
    for job in &job_file.jobs {
        let merged = MergedConfig::new(settings, job);
        let input_path = resolve_path(job_dir, &job.input);
        let output_path = resolve_path(job_dir, &job.output);

        // --resume: 入力が消えていてもセッションストアの原本から再開できる
        let opened = match open_source(&input_path) {
            Err(e) if resume => {
                let name = input_path.display().to_string();
                match store.as_ref().map(|s| stored_document(s, &name)) {
                    Some(Ok(Some(bytes))) => {
                        info!(input = %name, "input unavailable, using the stored copy");
                        open_stored(bytes)
                    }
                    _ => Err(e),
                }
            }
            other => other,
        };
        match opened {
            Ok(source) => prepared.push(PreparedJob {
                input_path,
                output_path,
                merged,
                source,
            }),
            Err(e) => {
                eprintln!("ERROR: Failed to open {}: {e}", input_path.display());
                ok = false;
            }
        }
    }
    if prepared.is_empty() {
        return ok;
    }

    let mut resolver = TuningResolver::new(settings.default_profile());
    if let Some(source) = settings
        .tuning_command
        .as_deref()
        .and_then(CommandTuningSource::from_argv)
    {
        resolver = resolver.with_source(Box::new(source));
    }

    let mut orchestrator = Orchestrator::new(resolver).resume_from_store(resume);
    if let Some(store) = store {
        orchestrator = orchestrator.with_store(Box::new(store));
    }

    let documents: Vec<BatchDocument<'_>> = prepared
        .iter()
        .map(|p| BatchDocument {
            name: p.input_path.display().to_string(),
            source: p.source.as_ref(),
            scale: p.merged.scale,
        })
        .collect();

    if let Err(e) = orchestrator.process_all(&documents) {
        eprintln!("ERROR: {e}");
        return false;
    }
    let Some(batch) = orchestrator.batch() else {
        return false;
    };

    for (p, job) in prepared.iter().zip(&batch.jobs) {
        if job.status != JobStatus::Done {
            eprintln!(
                "ERROR: {} -> {}: {}",
                p.input_path.display(),
                p.output_path.display(),
                job.error.as_deref().unwrap_or("cancelled")
            );
            ok = false;
            continue;
        }

        let written = assemble(job, p.merged.output_format, p.merged.jpeg_quality)
            .and_then(|bytes| Ok(std::fs::write(&p.output_path, bytes)?));
        match written {
            Ok(()) => eprintln!(
                "OK: {} -> {} ({} pages)",
                p.input_path.display(),
                p.output_path.display(),
                job.total
            ),
            Err(e) => {
                eprintln!(
                    "ERROR: {} -> {}: {e}",
                    p.input_path.display(),
                    p.output_path.display()
                );
                ok = false;
            }
        }
    }

    ok
}

#[cfg(feature = "pdfium")]
fn open_source(path: &Path) -> ink_scrub::error::Result<Box<dyn PageSource>> {
    Ok(Box::new(ink_scrub::render::pdfium::PdfiumSource::open(path)?))
}

#[cfg(feature = "pdfium")]
fn open_stored(bytes: Vec<u8>) -> ink_scrub::error::Result<Box<dyn PageSource>> {
    Ok(Box::new(ink_scrub::render::pdfium::PdfiumSource::from_bytes(bytes)?))
}

#[cfg(not(feature = "pdfium"))]
fn open_stored(_bytes: Vec<u8>) -> ink_scrub::error::Result<Box<dyn PageSource>> {
    Err(ink_scrub::error::InkScrubError::config(
        "built without the `pdfium` feature, PDF pages cannot be rendered",
    ))
}

#[cfg(not(feature = "pdfium"))]
fn open_source(_path: &Path) -> ink_scrub::error::Result<Box<dyn PageSource>> {
    Err(ink_scrub::error::InkScrubError::config(
        "built without the `pdfium` feature, PDF pages cannot be rendered",
    ))
}

/// Resolve a potentially relative path against a base directory.
/// If the path is already absolute, return it as-is.
fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}
