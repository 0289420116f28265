//! Optical character recognition engines.
//!
//! The service treats OCR as a black box behind the [`OcrEngine`] trait:
//! image file in, extracted text out. The production engine shells out to the
//! Tesseract CLI; tests substitute deterministic engines.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::config::OcrConfig;

/// OCR engine errors
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Failed to start OCR process")]
    Spawn(#[source] std::io::Error),

    #[error("OCR failed (exit {status}): {stderr}")]
    Failed { status: i32, stderr: String },

    #[error("OCR produced non-UTF-8 output")]
    InvalidOutput(#[source] std::string::FromUtf8Error),

    #[error("OCR timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

/// A text extraction backend.
///
/// Implementations take the path of a persisted image and return every piece
/// of text they can recognize in it. A blank or unreadable-but-valid image
/// yields an empty string; corrupt or unsupported input is an error. An
/// extraction must never hang indefinitely.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn extract_text(&self, image_path: &Path) -> Result<String, OcrError>;
}

/// OCR engine backed by the Tesseract command line tool.
pub struct TesseractEngine {
    command: PathBuf,
    language: String,
    timeout: Duration,
}

impl TesseractEngine {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            command: config.command.clone(),
            language: config.language.clone(),
            timeout: config.timeout(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn extract_text(&self, image_path: &Path) -> Result<String, OcrError> {
        debug!(path = %image_path.display(), "Running tesseract");

        // `tesseract <image> stdout` prints the recognized text on stdout.
        // Dropping the output future on timeout kills the child.
        let output = Command::new(&self.command)
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| OcrError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(OcrError::Spawn)?;

        if !output.status.success() {
            return Err(OcrError::Failed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // Tesseract writes diagnostics to stderr even on success; only the
        // exit status decides failure.
        String::from_utf8(output.stdout).map_err(OcrError::InvalidOutput)
    }
}
