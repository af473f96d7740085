use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::domain::files::{FileStore, FileUpload, StorageError, StoredFile};

/// Local-disk stand-in for the externally supplied object storage. Every
/// save lands under a fresh uuid-prefixed key, so concurrent writes can
/// never collide on a path.
#[derive(Clone, Debug)]
pub struct DiskFileStore {
    root: PathBuf,
}

impl DiskFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileStore for DiskFileStore {
    async fn save(&self, folder: &str, upload: &FileUpload) -> Result<StoredFile, StorageError> {
        let key = format!("{}/{}/{}", folder, Uuid::new_v4(), upload.file_name);
        let path = self.root.join(&key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Write(e.to_string()))?;
        }
        tokio::fs::write(&path, &upload.bytes)
            .await
            .map_err(|e| StorageError::Write(e.to_string()))?;

        Ok(StoredFile {
            file_name: upload.file_name.clone(),
            storage_url: key,
            mime_type: upload.mime_type.clone(),
        })
    }

    async fn delete(&self, storage_url: &str) -> Result<(), StorageError> {
        tokio::fs::remove_file(self.root.join(storage_url))
            .await
            .map_err(|e| StorageError::Delete(e.to_string()))
    }
}

#[derive(Default)]
struct FilesState {
    saved: Vec<StoredFile>,
    deleted: Vec<String>,
}

/// In-memory file store used by tests: records every save and delete so
/// ordering guarantees (save-then-delete) can be asserted.
#[derive(Clone, Default)]
pub struct InMemoryFileStore {
    state: Arc<Mutex<FilesState>>,
}

impl InMemoryFileStore {
    pub fn saved(&self) -> Vec<StoredFile> {
        self.state.lock().expect("file store lock poisoned").saved.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state
            .lock()
            .expect("file store lock poisoned")
            .deleted
            .clone()
    }
}

impl FileStore for InMemoryFileStore {
    async fn save(&self, folder: &str, upload: &FileUpload) -> Result<StoredFile, StorageError> {
        let stored = StoredFile {
            file_name: upload.file_name.clone(),
            storage_url: format!("{}/{}", folder, upload.file_name),
            mime_type: upload.mime_type.clone(),
        };
        self.state
            .lock()
            .expect("file store lock poisoned")
            .saved
            .push(stored.clone());
        Ok(stored)
    }

    async fn delete(&self, storage_url: &str) -> Result<(), StorageError> {
        self.state
            .lock()
            .expect("file store lock poisoned")
            .deleted
            .push(storage_url.to_string());
        Ok(())
    }
}
