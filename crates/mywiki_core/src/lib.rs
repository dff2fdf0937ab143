//! Core domain logic for MyWiki.
//!
//! Articles live in an ordered, versioned navigation forest persisted as a
//! single document next to the article rows. This crate is the single
//! source of truth for the tree-consistency invariants: every article
//! create, rename, move, and delete is applied atomically against both the
//! article table and the tree document, with optimistic concurrency
//! detection on the document version.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod storage;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::article::{
    Article, ArticleId, ArticlePatch, ArticleStatus, ArticleValidationError,
};
pub use model::tree::{NodeId, TreeError, TreeNode, TreeStructure, ROOT_NODE_ID, ROOT_NODE_TITLE};
pub use repo::article_repo::{ArticleRepository, RepoError, RepoResult, SqliteArticleRepository};
pub use repo::tree_store::{
    SqliteTreeStore, TreeDocumentStore, TreeStoreError, TreeStoreResult, TREE_DOC_KEY,
};
pub use service::wiki_service::{
    CreateArticleRequest, WikiError, WikiResult, WikiService,
};
pub use storage::{
    AttachmentError, AttachmentInfo, AttachmentResult, AttachmentStore, NoAttachments,
    StoredAttachment,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
