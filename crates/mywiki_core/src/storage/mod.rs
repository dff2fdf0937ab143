//! Attachment store contract.
//!
//! # Responsibility
//! - Define the blob-store interface consumed by the delete cascade.
//!
//! # Invariants
//! - Attachments are keyed by article id; deleting an article deletes its
//!   whole prefix.
//! - The store is external; core ships no implementation beyond test
//!   doubles.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub type AttachmentResult<T> = Result<T, AttachmentError>;

/// Errors from the external attachment store.
#[derive(Debug)]
pub enum AttachmentError {
    /// Requested file does not exist.
    NotFound {
        article_id: String,
        file_name: String,
    },
    /// Backend-specific failure, already formatted by the implementation.
    Backend(String),
}

impl Display for AttachmentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound {
                article_id,
                file_name,
            } => write!(f, "attachment not found: {article_id}/{file_name}"),
            Self::Backend(message) => write!(f, "attachment store failure: {message}"),
        }
    }
}

impl Error for AttachmentError {}

/// One stored attachment as listed for an article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentInfo {
    /// File name within the article prefix.
    pub name: String,
    /// Public URL of the stored blob.
    pub url: String,
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAttachment {
    /// Public URL of the stored blob.
    pub url: String,
    /// Backend path (`<article_id>/<file_name>`).
    pub path: String,
}

/// External blob store keyed by article id.
pub trait AttachmentStore {
    /// Lists attachments under the article prefix.
    fn list_files(&self, article_id: &str) -> AttachmentResult<Vec<AttachmentInfo>>;
    /// Uploads one file under the article prefix.
    fn upload_file(
        &self,
        article_id: &str,
        bytes: &[u8],
        file_name: &str,
        mime_type: Option<&str>,
    ) -> AttachmentResult<StoredAttachment>;
    /// Deletes one file under the article prefix.
    fn delete_file(&self, article_id: &str, file_name: &str) -> AttachmentResult<()>;
    /// Deletes every file under the article prefix.
    fn delete_article_files(&self, article_id: &str) -> AttachmentResult<()>;
}

/// Attachment store that stores nothing and deletes nothing.
///
/// For deployments without a blob backend and for wiring tests that do not
/// exercise attachments.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAttachments;

impl AttachmentStore for NoAttachments {
    fn list_files(&self, _article_id: &str) -> AttachmentResult<Vec<AttachmentInfo>> {
        Ok(Vec::new())
    }

    fn upload_file(
        &self,
        _article_id: &str,
        _bytes: &[u8],
        _file_name: &str,
        _mime_type: Option<&str>,
    ) -> AttachmentResult<StoredAttachment> {
        Err(AttachmentError::Backend(
            "no attachment backend configured".to_string(),
        ))
    }

    fn delete_file(&self, article_id: &str, file_name: &str) -> AttachmentResult<()> {
        Err(AttachmentError::NotFound {
            article_id: article_id.to_string(),
            file_name: file_name.to_string(),
        })
    }

    fn delete_article_files(&self, _article_id: &str) -> AttachmentResult<()> {
        Ok(())
    }
}
