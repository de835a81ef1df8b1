//! Durable single-slot storage for the latest `ScanSession`.
//!
//! A missing record is a normal empty state (`Ok(None)`), not an error.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::scan::models::ScanSession;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Session store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to persist session file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Key-value-of-one persistence for the last scan.
///
/// Carried in `AppState` as `Arc<dyn SessionStore>`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Overwrites the slot.
    async fn save(&self, session: &ScanSession) -> Result<(), StoreError>;

    async fn load(&self) -> Result<Option<ScanSession>, StoreError>;

    /// Empties the slot. Clearing an empty slot succeeds.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// Stores the session as one JSON file.
///
/// Writes go to a temp file in the same directory followed by an atomic
/// rename, so a crash mid-write leaves either the old record or the new one.
pub struct FileSessionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn save(&self, session: &ScanSession) -> Result<(), StoreError> {
        let contents = serde_json::to_vec(session)?;
        let path = self.path.clone();

        let _guard = self.write_lock.lock().await;
        tokio::task::spawn_blocking(move || write_atomically(&path, &contents))
            .await
            .map_err(std::io::Error::other)??;

        info!(
            "Saved scan session (average {}) to {}",
            session.average,
            self.path.display()
        );
        Ok(())
    }

    async fn load(&self) -> Result<Option<ScanSession>, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let session: ScanSession = match serde_json::from_str(&contents) {
            Ok(session) => session,
            Err(e) => {
                warn!(
                    "Ignoring unreadable scan session at {}: {e}",
                    self.path.display()
                );
                return Ok(None);
            }
        };

        // Records written by older clients or by hand may break the metric bounds.
        if let Err(reason) = session.validate() {
            warn!(
                "Ignoring invalid scan session at {}: {reason}",
                self.path.display()
            );
            return Ok(None);
        }
        Ok(Some(session))
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("Cleared scan session at {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::models::HairMetrics;

    fn sample(uri: &str) -> ScanSession {
        let metrics = HairMetrics {
            face_shape: 62,
            facial_ratio: 70,
            hair_type: 58,
            jawline: 75,
            hairline: 64,
            ear_shape: 69,
        };
        ScanSession::new(uri, metrics, "oval", "wavy").unwrap()
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("current-session.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("current-session.json"));
        let session = sample("file:///one.jpg");

        store.save(&session).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn test_save_overwrites_single_slot() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("current-session.json"));

        store.save(&sample("file:///one.jpg")).await.unwrap();
        store.save(&sample("file:///two.jpg")).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.image_uri, "file:///two.jpg");
        // Only the record itself remains; temp files were renamed away.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested/data/session.json"));
        store.save(&sample("file:///one.jpg")).await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("current-session.json"));

        store.save(&sample("file:///one.jpg")).await.unwrap();
        store.clear().await.unwrap();
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("current-session.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = FileSessionStore::new(path);
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_out_of_range_record_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("current-session.json");
        std::fs::write(
            &path,
            r#"{"uri": "file:///old.jpg",
                "metrics": {"faceShape": 99, "facialRatio": 0, "hairType": 60,
                            "jawline": 60, "hairline": 60, "earShape": 60},
                "average": 12,
                "timestamp": 1700000000000}"#,
        )
        .unwrap();

        let store = FileSessionStore::new(path);
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mismatched_average_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("current-session.json");
        let mut session = sample("file:///one.jpg");
        session.average = 80;
        std::fs::write(&path, serde_json::to_vec(&session).unwrap()).unwrap();

        let store = FileSessionStore::new(path);
        assert!(store.load().await.unwrap().is_none());
    }
}
