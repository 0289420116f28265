//! Notification message types.
//!
//! Listeners receive plain-text stage messages; the typed enum exists so the
//! pipeline cannot broadcast a stage the protocol does not know about.

use std::fmt;

/// Processing-stage notification pushed to every connected listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    UploadStarted,
    ProcessingStarted,
    ProcessingComplete,
    /// Processing failed; carries a short description of the failed stage.
    Error(String),
}

impl fmt::Display for StatusUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusUpdate::UploadStarted => write!(f, "Upload started"),
            StatusUpdate::ProcessingStarted => write!(f, "Processing started"),
            StatusUpdate::ProcessingComplete => write!(f, "Processing complete"),
            StatusUpdate::Error(detail) => write!(f, "Error: {detail}"),
        }
    }
}
