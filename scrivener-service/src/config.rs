//! Static configuration loaded at startup.
//! These settings affect server binding or require restart to change.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Static configuration loaded at startup
/// These settings affect server binding or require restart to change
#[derive(Debug, Clone, Deserialize)]
pub struct StaticConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_storage")]
    pub storage: StorageConfig,

    #[serde(default = "default_ocr")]
    pub ocr: OcrConfig,

    #[serde(default = "default_limits")]
    pub limits: LimitsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Spool directory for uploaded images awaiting extraction. Files only
    /// live here for the duration of one extraction.
    #[serde(default = "default_spool_dir")]
    pub spool_dir: PathBuf,

    /// Directory holding the landing page and other static assets.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

/// OCR engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Tesseract executable to invoke. A bare name is resolved via PATH.
    #[serde(default = "default_ocr_command")]
    pub command: PathBuf,

    /// Recognition language passed to tesseract's `-l` flag.
    #[serde(default = "default_ocr_language")]
    pub language: String,

    #[serde(default = "default_ocr_timeout_secs")]
    pub timeout_secs: u64,
}

impl OcrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Request size limits
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_upload_size_bytes")]
    pub max_upload_size_bytes: u64,
}

// ==================== Default Value Functions ====================

pub(crate) fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
    }
}

pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8080
}

pub(crate) fn default_storage() -> StorageConfig {
    StorageConfig {
        spool_dir: default_spool_dir(),
        static_dir: default_static_dir(),
    }
}

pub(crate) fn default_spool_dir() -> PathBuf {
    PathBuf::from("./data/spool")
}

pub(crate) fn default_static_dir() -> PathBuf {
    PathBuf::from("./static")
}

pub(crate) fn default_ocr() -> OcrConfig {
    OcrConfig {
        command: default_ocr_command(),
        language: default_ocr_language(),
        timeout_secs: default_ocr_timeout_secs(),
    }
}

pub(crate) fn default_ocr_command() -> PathBuf {
    PathBuf::from("tesseract")
}

pub(crate) fn default_ocr_language() -> String {
    "eng".to_string()
}

pub(crate) fn default_ocr_timeout_secs() -> u64 {
    30
}

pub(crate) fn default_limits() -> LimitsConfig {
    LimitsConfig {
        max_upload_size_bytes: default_max_upload_size_bytes(),
    }
}

pub(crate) fn default_max_upload_size_bytes() -> u64 {
    20 * 1024 * 1024
}
