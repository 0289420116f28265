//! In-memory store for extraction results.

use dashmap::DashMap;

/// Extracted text keyed by upload identifier.
///
/// Entries are written once when an extraction completes and live for the
/// lifetime of the process. Lookups and inserts from concurrent requests go
/// through the shard locks of the underlying map; callers never iterate the
/// map directly.
#[derive(Default)]
pub struct ExtractionStore {
    entries: DashMap<String, String>,
}

impl ExtractionStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Store extracted text under an upload identifier, replacing any
    /// previous entry for the same identifier.
    pub fn insert(&self, upload_id: String, text: String) {
        self.entries.insert(upload_id, text);
    }

    /// Look up the extracted text for an upload identifier.
    pub fn get(&self, upload_id: &str) -> Option<String> {
        self.entries.get(upload_id).map(|entry| entry.value().clone())
    }

    /// Number of stored extractions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_insert_and_get() {
        let store = ExtractionStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get("receipt_1.png"), None);

        store.insert("receipt_1.png".to_string(), "Total: $4.20".to_string());
        assert_eq!(
            store.get("receipt_1.png"),
            Some("Total: $4.20".to_string())
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_insert_overwrites() {
        let store = ExtractionStore::new();
        store.insert("scan.png".to_string(), "first".to_string());
        store.insert("scan.png".to_string(), "second".to_string());
        assert_eq!(store.get("scan.png"), Some("second".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_concurrent_inserts_to_distinct_keys() {
        let store = Arc::new(ExtractionStore::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        store.insert(format!("upload_{i}_{j}"), format!("text {i} {j}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 8 * 50);
        assert_eq!(store.get("upload_3_17"), Some("text 3 17".to_string()));
    }
}
