//! Filesystem storage for ticket attachments.
//!
//! Documents only carry [`AttachmentInfo`] descriptors; the bytes live
//! under `<root>/<ticket_id>/<filename>` so reprocessing can re-read the
//! original upload.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

use super::AttachmentInfo;

/// Error type for attachment storage.
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("attachment io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("attachment not found: {0}")]
    NotFound(String),
}

/// Attachment store rooted at a configured directory.
#[derive(Debug, Clone)]
pub struct FsAttachmentStore {
    root: PathBuf,
}

impl FsAttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist uploaded bytes and return the descriptor to embed in the
    /// document. The filename is reduced to its final component so the
    /// file cannot escape the ticket directory.
    pub async fn save(
        &self,
        ticket_id: &str,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<AttachmentInfo, AttachmentError> {
        let filename = sanitize_filename(filename);
        let dir = self.root.join(ticket_id);
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(&filename);
        tokio::fs::write(&path, bytes).await?;

        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let sha256 = format!("{:x}", hasher.finalize());

        Ok(AttachmentInfo {
            filename: filename.clone(),
            content_ref: format!("{ticket_id}/{filename}"),
            content_type: content_type.to_string(),
            size_bytes: bytes.len() as u64,
            sha256,
        })
    }

    /// Read back the stored bytes for a descriptor.
    pub async fn load(&self, attachment: &AttachmentInfo) -> Result<Vec<u8>, AttachmentError> {
        let path = self.root.join(&attachment.content_ref);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(AttachmentError::NotFound(attachment.content_ref.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove every stored file for a ticket. Missing directories are
    /// fine; ticket deletion must not fail on a ticket that never had an
    /// attachment.
    pub async fn delete_all(&self, ticket_id: &str) -> Result<(), AttachmentError> {
        let dir = self.root.join(ticket_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn sanitize_filename(filename: &str) -> String {
    Path::new(filename)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "attachment.bin".to_string())
}
