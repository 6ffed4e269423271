// 外部チューニング提案ソース（コマンド経由）

use std::io::Write;
use std::process::{Command, Stdio};

use serde::Serialize;
use thiserror::Error;

/// Fixed instruction sent with every sample image.
pub const TUNING_INSTRUCTION: &str = "The attached image is a scanned page with red pen \
corrections. Suggest HSV thresholds that isolate the red ink from the printed text and \
paper. Reply with one JSON object of the form \
{\"sMin\": number 0-1, \"vMin\": number 0-1, \"hueA\": [from, to], \"hueB\": [from, to], \
\"dilateRadius\": integer 0-3, \"inpaintRadius\": integer 1-5}. Hues are degrees 0-360.";

/// Why a suggestion could not be obtained. Never leaves the tuning module:
/// the resolver logs it and falls back to the default profile.
#[derive(Debug, Error)]
pub enum TuningFailure {
    #[error("tuning transport failed: {0}")]
    Transport(String),

    #[error("sample image could not be encoded: {0}")]
    Encode(String),
}

/// Payload sent to a tuning source.
#[derive(Debug, Clone, Serialize)]
pub struct TuningRequest {
    pub instruction: &'static str,
    pub image_png_base64: String,
}

/// Something that can look at a sample page and propose parameters.
///
/// The response is free-form text expected to contain one JSON object.
pub trait TuningSource {
    fn suggest(&self, request: &TuningRequest) -> Result<String, TuningFailure>;
}

/// Runs an external program per request.
///
/// The request is written to the program's stdin as one JSON object and the
/// program's stdout is taken as the response text. A non-zero exit status is
/// a transport failure. No timeout is imposed.
#[derive(Debug, Clone)]
pub struct CommandTuningSource {
    program: String,
    args: Vec<String>,
}

impl CommandTuningSource {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from an argv list (`[program, arg...]`). Returns `None` if empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl TuningSource for CommandTuningSource {
    fn suggest(&self, request: &TuningRequest) -> Result<String, TuningFailure> {
        let payload =
            serde_json::to_vec(request).map_err(|e| TuningFailure::Encode(e.to_string()))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                TuningFailure::Transport(format!("failed to execute {}: {e}", self.program))
            })?;

        // Feed stdin from another thread so a chatty child cannot deadlock us.
        let stdin = child.stdin.take();
        let writer = std::thread::spawn(move || -> std::io::Result<()> {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&payload)?;
            }
            Ok(())
        });

        let output = child
            .wait_with_output()
            .map_err(|e| TuningFailure::Transport(e.to_string()))?;

        match writer.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(TuningFailure::Transport(e.to_string())),
            Err(_) => {
                return Err(TuningFailure::Transport(
                    "stdin writer thread panicked".to_string(),
                ));
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TuningFailure::Transport(format!(
                "{} failed (exit code {}): {}",
                self.program,
                output
                    .status
                    .code()
                    .map_or_else(|| "unknown".to_string(), |c| c.to_string()),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
