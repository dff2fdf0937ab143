//! Article domain model.
//!
//! # Responsibility
//! - Define the canonical article record referenced by tree nodes.
//! - Validate user-facing fields before persistence.
//!
//! # Invariants
//! - `id` is stable and never reused for another article.
//! - `title` is the source of truth; the tree node title is a denormalized
//!   copy maintained by the transaction coordinator.

use crate::model::tree::{now_epoch_ms, NodeId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable article identifier, shared with the backing tree node.
pub type ArticleId = NodeId;

/// Validation failures for article fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleValidationError {
    /// Title is blank after trimming.
    BlankTitle,
}

impl Display for ArticleValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "article title must not be blank"),
        }
    }
}

impl Error for ArticleValidationError {}

/// Article publication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    /// Visible in listings and navigation.
    Published,
    /// Saved but not yet published.
    Draft,
}

/// Canonical article record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Stable id; UUID v4 text for articles created by this crate.
    pub id: ArticleId,
    /// Display title, denormalized into the navigation tree.
    pub title: String,
    /// Markdown body.
    pub content: String,
    /// Publication state.
    pub status: ArticleStatus,
    /// Free-form labels.
    pub tags: Vec<String>,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

impl Article {
    /// Creates a published article with a generated stable id.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), title, content)
    }

    /// Creates an article with a caller-provided stable id.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(
        id: impl Into<ArticleId>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let now = now_epoch_ms();
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            status: ArticleStatus::Published,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks field-level invariants before persistence.
    ///
    /// # Errors
    /// - `ArticleValidationError::BlankTitle` when the title trims empty.
    pub fn validate(&self) -> Result<(), ArticleValidationError> {
        if self.title.trim().is_empty() {
            return Err(ArticleValidationError::BlankTitle);
        }
        Ok(())
    }
}

/// Partial update applied to an existing article.
///
/// `None` fields are left untouched; `updated_at` is always refreshed by
/// the repository on a successful update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticlePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<ArticleStatus>,
    pub tags: Option<Vec<String>>,
}

impl ArticlePatch {
    /// Returns whether this patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.status.is_none()
            && self.tags.is_none()
    }
}
