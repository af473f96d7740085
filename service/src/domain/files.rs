use std::future::Future;

use thiserror::Error;

/// Raw file content received from a client, not yet persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Descriptor of a persisted file. `storage_url` is the unique key the
/// store generated; nothing ever writes to the same key twice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredFile {
    pub file_name: String,
    pub storage_url: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("storage write failed: {0}")]
    Write(String),
    #[error("storage delete failed: {0}")]
    Delete(String),
}

/// Seam to the externally supplied object storage holding uploaded files
/// and signatures.
pub trait FileStore: Clone + Send + Sync + 'static {
    /// Persist under a freshly generated key below `folder`.
    fn save(
        &self,
        folder: &str,
        upload: &FileUpload,
    ) -> impl Future<Output = Result<StoredFile, StorageError>> + Send;

    fn delete(&self, storage_url: &str)
    -> impl Future<Output = Result<(), StorageError>> + Send;
}
