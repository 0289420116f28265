//! Core upload processing service.
//!
//! One upload moves through: validate content type, persist the bytes to the
//! spool directory under a collision-free name, run OCR, record the result,
//! and push a stage notification to every listener at each step. Failures
//! broadcast a final error notification before surfacing to the caller; the
//! spool file never outlives the extraction attempt.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::StaticConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::ocr::OcrEngine;
use crate::store::ExtractionStore;
use crate::websocket::{NotificationHub, StatusUpdate};

/// Sanitize a declared filename component for use in a spool path
fn sanitize_filename_component(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            ' ' => '-',
            _ => c,
        })
        .collect::<String>()
        .to_lowercase()
}

/// Build a unique upload identifier from the declared filename.
///
/// The identifier keeps the declared stem and extension for traceability but
/// carries a UUID so concurrent uploads sharing a declared name never share a
/// spool path or a store key.
fn unique_upload_name(declared_filename: &str) -> String {
    let path = Path::new(declared_filename);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("upload");
    let stem = sanitize_filename_component(stem);

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!(
            "{stem}_{}.{}",
            uuid::Uuid::new_v4(),
            sanitize_filename_component(ext)
        ),
        None => format!("{stem}_{}", uuid::Uuid::new_v4()),
    }
}

/// Remove a spool file once extraction has run. A file that is already gone
/// is not an error.
async fn remove_spool_file(spool_path: &Path) {
    if let Err(e) = tokio::fs::remove_file(spool_path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %spool_path.display(), error = %e, "Failed to remove spool file");
    }
}

/// Response returned to the uploader after a completed extraction
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    /// Generated upload identifier; also the key for later lookups
    pub filename: String,
    pub extracted_text: String,
}

/// Main service coordinator
pub struct ScrivenerService {
    pub config: Arc<StaticConfig>,
    pub store: Arc<ExtractionStore>,
    pub hub: Arc<NotificationHub>,
    ocr: Arc<dyn OcrEngine>,
}

impl ScrivenerService {
    /// Create a new service instance
    pub fn new(config: Arc<StaticConfig>, ocr: Arc<dyn OcrEngine>) -> Self {
        info!("Initializing Scrivener service");

        Self {
            config,
            store: Arc::new(ExtractionStore::new()),
            hub: Arc::new(NotificationHub::new()),
            ocr,
        }
    }

    /// Process one uploaded image end to end.
    ///
    /// Returns the generated upload identifier and the extracted text. The
    /// declared content type must be an image; rejection happens before any
    /// side effect, so a rejected upload leaves no spool file, triggers no
    /// extraction, and broadcasts nothing.
    pub async fn handle_upload(
        &self,
        content: &[u8],
        declared_filename: &str,
        declared_content_type: &str,
    ) -> ServiceResult<UploadResponse> {
        let mime: mime::Mime =
            declared_content_type
                .parse()
                .map_err(|_| ServiceError::InvalidContentType {
                    content_type: declared_content_type.to_string(),
                })?;
        if mime.type_() != mime::IMAGE {
            return Err(ServiceError::InvalidContentType {
                content_type: declared_content_type.to_string(),
            });
        }

        let upload_id = unique_upload_name(declared_filename);
        let spool_path = self.config.storage.spool_dir.join(&upload_id);

        self.hub.broadcast(StatusUpdate::UploadStarted);

        if let Err(e) = self.persist(&spool_path, content).await {
            self.hub
                .broadcast(StatusUpdate::Error("failed to save upload".to_string()));
            return Err(ServiceError::Persist(e));
        }

        self.hub.broadcast(StatusUpdate::ProcessingStarted);

        let extraction = self.ocr.extract_text(&spool_path).await;

        // Whatever extraction did, the spool file goes away now
        remove_spool_file(&spool_path).await;

        let extracted_text = match extraction {
            Ok(text) => text,
            Err(e) => {
                self.hub
                    .broadcast(StatusUpdate::Error("text extraction failed".to_string()));
                return Err(ServiceError::Extraction(e));
            }
        };

        self.store
            .insert(upload_id.clone(), extracted_text.clone());

        self.hub.broadcast(StatusUpdate::ProcessingComplete);

        info!(
            upload_id = %upload_id,
            chars = extracted_text.len(),
            "Upload processed"
        );

        Ok(UploadResponse {
            filename: upload_id,
            extracted_text,
        })
    }

    /// Look up a previously stored extraction by upload identifier
    pub fn extraction(&self, upload_id: &str) -> ServiceResult<UploadResponse> {
        self.store
            .get(upload_id)
            .map(|extracted_text| UploadResponse {
                filename: upload_id.to_string(),
                extracted_text,
            })
            .ok_or_else(|| ServiceError::UploadNotFound {
                upload_id: upload_id.to_string(),
            })
    }

    async fn persist(&self, spool_path: &Path, content: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.config.storage.spool_dir).await?;
        tokio::fs::write(spool_path, content).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::ocr::OcrError;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    /// Returns the persisted file's bytes as text, so tests can check the
    /// pipeline fed the engine exactly what was uploaded.
    struct EchoEngine {
        calls: AtomicUsize,
    }

    impl EchoEngine {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl OcrEngine for EchoEngine {
        async fn extract_text(&self, image_path: &Path) -> Result<String, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let bytes = tokio::fs::read(image_path).await.map_err(OcrError::Spawn)?;
            Ok(String::from_utf8_lossy(&bytes).to_string())
        }
    }

    struct FailingEngine;

    #[async_trait]
    impl OcrEngine for FailingEngine {
        async fn extract_text(&self, _image_path: &Path) -> Result<String, OcrError> {
            Err(OcrError::Failed {
                status: 1,
                stderr: "unreadable image".to_string(),
            })
        }
    }

    fn test_config(spool_dir: PathBuf) -> Arc<StaticConfig> {
        Arc::new(StaticConfig {
            server: config::default_server(),
            storage: crate::config::StorageConfig {
                spool_dir,
                static_dir: config::default_static_dir(),
            },
            ocr: config::default_ocr(),
            limits: config::default_limits(),
        })
    }

    fn spool_entries(spool_dir: &Path) -> usize {
        match std::fs::read_dir(spool_dir) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }

    #[tokio::test]
    async fn test_successful_upload_round_trip() {
        let spool = tempfile::tempdir().unwrap();
        let service = ScrivenerService::new(
            test_config(spool.path().to_path_buf()),
            Arc::new(EchoEngine::new()),
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        service.hub.register("listener1".to_string(), tx);

        let response = service
            .handle_upload(b"Meeting notes, page 1", "notes.png", "image/png")
            .await
            .unwrap();

        assert_eq!(response.extracted_text, "Meeting notes, page 1");
        assert!(response.filename.starts_with("notes_"));
        assert!(response.filename.ends_with(".png"));

        // Result is retrievable under the returned identifier
        assert_eq!(
            service.store.get(&response.filename),
            Some("Meeting notes, page 1".to_string())
        );

        // Spool file removed after extraction
        assert_eq!(spool_entries(spool.path()), 0);

        // Listener saw the three stages in order
        assert_eq!(rx.try_recv().unwrap(), StatusUpdate::UploadStarted);
        assert_eq!(rx.try_recv().unwrap(), StatusUpdate::ProcessingStarted);
        assert_eq!(rx.try_recv().unwrap(), StatusUpdate::ProcessingComplete);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_rejects_non_image_content_type_without_side_effects() {
        let spool = tempfile::tempdir().unwrap();
        let engine = Arc::new(EchoEngine::new());
        let service = ScrivenerService::new(test_config(spool.path().to_path_buf()), engine.clone());

        let (tx, mut rx) = mpsc::unbounded_channel();
        service.hub.register("listener1".to_string(), tx);

        let result = service
            .handle_upload(b"just text", "notes.txt", "text/plain")
            .await;

        assert!(matches!(
            result,
            Err(ServiceError::InvalidContentType { .. })
        ));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
        assert!(service.store.is_empty());
        assert_eq!(spool_entries(spool.path()), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unparseable_content_type_is_rejected() {
        let spool = tempfile::tempdir().unwrap();
        let service = ScrivenerService::new(
            test_config(spool.path().to_path_buf()),
            Arc::new(EchoEngine::new()),
        );

        let result = service.handle_upload(b"data", "x.png", "not a mime").await;
        assert!(matches!(
            result,
            Err(ServiceError::InvalidContentType { .. })
        ));
    }

    #[tokio::test]
    async fn test_extraction_failure_cleans_up_and_notifies() {
        let spool = tempfile::tempdir().unwrap();
        let service = ScrivenerService::new(
            test_config(spool.path().to_path_buf()),
            Arc::new(FailingEngine),
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        service.hub.register("listener1".to_string(), tx);

        let result = service
            .handle_upload(b"\xff\xd8corrupt", "broken.jpg", "image/jpeg")
            .await;

        assert!(matches!(result, Err(ServiceError::Extraction(_))));
        assert!(service.store.is_empty());
        assert_eq!(spool_entries(spool.path()), 0);

        assert_eq!(rx.try_recv().unwrap(), StatusUpdate::UploadStarted);
        assert_eq!(rx.try_recv().unwrap(), StatusUpdate::ProcessingStarted);
        let last = rx.try_recv().unwrap();
        assert!(last.to_string().starts_with("Error"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_concurrent_same_name_uploads_get_distinct_identifiers() {
        let spool = tempfile::tempdir().unwrap();
        let service = ScrivenerService::new(
            test_config(spool.path().to_path_buf()),
            Arc::new(EchoEngine::new()),
        );

        let (first, second) = tokio::join!(
            service.handle_upload(b"first upload", "scan.png", "image/png"),
            service.handle_upload(b"second upload", "scan.png", "image/png"),
        );
        let first = first.unwrap();
        let second = second.unwrap();

        assert_ne!(first.filename, second.filename);
        assert_eq!(first.extracted_text, "first upload");
        assert_eq!(second.extracted_text, "second upload");
        assert_eq!(service.store.len(), 2);
    }

    #[tokio::test]
    async fn test_upload_succeeds_with_no_listeners() {
        let spool = tempfile::tempdir().unwrap();
        let service = ScrivenerService::new(
            test_config(spool.path().to_path_buf()),
            Arc::new(EchoEngine::new()),
        );

        let response = service
            .handle_upload(b"quiet", "solo.png", "image/png")
            .await
            .unwrap();
        assert_eq!(response.extracted_text, "quiet");
    }

    #[tokio::test]
    async fn test_extraction_lookup() {
        let spool = tempfile::tempdir().unwrap();
        let service = ScrivenerService::new(
            test_config(spool.path().to_path_buf()),
            Arc::new(EchoEngine::new()),
        );

        let uploaded = service
            .handle_upload(b"look me up", "memo.png", "image/png")
            .await
            .unwrap();

        let found = service.extraction(&uploaded.filename).unwrap();
        assert_eq!(found.extracted_text, "look me up");

        assert!(matches!(
            service.extraction("never-uploaded.png"),
            Err(ServiceError::UploadNotFound { .. })
        ));
    }

    #[test]
    fn test_unique_upload_name_is_filesystem_safe() {
        let name = unique_upload_name("../../etc/pass wd.PNG");
        assert!(!name.contains('/'));
        assert!(!name.contains(".."));
        assert!(!name.contains(' '));
        assert!(name.ends_with(".png"));

        // No extension on the declared name, none on the identifier
        let bare = unique_upload_name("README");
        assert!(bare.starts_with("readme_"));
        assert!(!bare.contains('.'));

        // Empty declared name still yields a usable identifier
        let fallback = unique_upload_name("");
        assert!(fallback.starts_with("upload_"));
    }

    #[test]
    fn test_upload_response_wire_shape() {
        let response = UploadResponse {
            filename: "memo_0c6f3f1e.png".to_string(),
            extracted_text: "look me up".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["filename"], "memo_0c6f3f1e.png");
        assert_eq!(json["extracted_text"], "look me up");
    }

    #[test]
    fn test_unique_upload_names_differ_for_identical_input() {
        let a = unique_upload_name("photo.png");
        let b = unique_upload_name("photo.png");
        assert_ne!(a, b);
    }
}
