//! Wiki use-case service: the transaction coordinator.
//!
//! # Responsibility
//! - Make each user-facing operation atomic across the article row and the
//!   tree document.
//! - Own the read-modify-write cycle over the singleton tree document.
//!
//! # Invariants
//! - Every compound operation runs in one IMMEDIATE transaction; any
//!   failure before commit rolls the whole operation back.
//! - Tree saves compare-and-swap on the version read inside the same
//!   transaction; a lost race surfaces as `ConcurrencyConflict`.
//! - The root node is never deleted or moved.

use crate::db::DbError;
use crate::model::article::{
    Article, ArticleId, ArticlePatch, ArticleStatus, ArticleValidationError,
};
use crate::model::tree::{NodeId, TreeError, TreeStructure, ROOT_NODE_ID};
use crate::repo::article_repo::{ArticleRepository, RepoError, SqliteArticleRepository};
use crate::repo::tree_store::{SqliteTreeStore, TreeDocumentStore, TreeStoreError};
use crate::storage::{AttachmentError, AttachmentStore};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ARTICLES_DEFAULT_LIMIT: u32 = 10;
const ARTICLES_LIMIT_MAX: u32 = 50;

pub type WikiResult<T> = Result<T, WikiError>;

/// Errors from wiki compound operations.
#[derive(Debug)]
pub enum WikiError {
    /// Title is blank after trim.
    InvalidTitle,
    /// Target article row does not exist.
    ArticleNotFound(ArticleId),
    /// The root node cannot be deleted.
    CannotDeleteRoot,
    /// The root node cannot be moved.
    CannotMoveRoot,
    /// Structural failure from the tree engine.
    Tree(TreeError),
    /// The tree document changed under this transaction; retry.
    ConcurrencyConflict { expected: u64, actual: u64 },
    /// Article persistence failure.
    Repo(RepoError),
    /// Tree document persistence failure.
    Store(TreeStoreError),
    /// Attachment store failure during the delete cascade.
    Attachment(AttachmentError),
    /// Transaction bootstrap/commit failure.
    Db(DbError),
}

impl Display for WikiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTitle => write!(f, "article title must not be blank"),
            Self::ArticleNotFound(id) => write!(f, "article not found: {id}"),
            Self::CannotDeleteRoot => write!(f, "the root node cannot be deleted"),
            Self::CannotMoveRoot => write!(f, "the root node cannot be moved"),
            Self::Tree(err) => write!(f, "{err}"),
            Self::ConcurrencyConflict { expected, actual } => write!(
                f,
                "concurrent tree update detected (expected version {expected}, found {actual}); retry"
            ),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Attachment(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for WikiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Tree(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Attachment(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl WikiError {
    /// Returns whether the caller should retry against fresh state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

impl From<TreeError> for WikiError {
    fn from(value: TreeError) -> Self {
        Self::Tree(value)
    }
}

impl From<TreeStoreError> for WikiError {
    fn from(value: TreeStoreError) -> Self {
        match value {
            TreeStoreError::ConcurrencyConflict { expected, actual } => {
                Self::ConcurrencyConflict { expected, actual }
            }
            other => Self::Store(other),
        }
    }
}

impl From<RepoError> for WikiError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::ArticleNotFound(id),
            RepoError::Validation(ArticleValidationError::BlankTitle) => Self::InvalidTitle,
            other => Self::Repo(other),
        }
    }
}

impl From<AttachmentError> for WikiError {
    fn from(value: AttachmentError) -> Self {
        Self::Attachment(value)
    }
}

impl From<rusqlite::Error> for WikiError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Request model for creating an article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateArticleRequest {
    /// Display title; must not trim empty.
    pub title: String,
    /// Markdown body; empty for a fresh page.
    pub content: String,
    /// Tree parent; `None` appends to the top-level list.
    pub parent_id: Option<NodeId>,
    /// Publication state; defaults to published.
    pub status: Option<ArticleStatus>,
    /// Free-form labels.
    pub tags: Vec<String>,
}

impl CreateArticleRequest {
    /// Creates a request for an empty page under `parent_id`.
    pub fn page(title: impl Into<String>, parent_id: Option<NodeId>) -> Self {
        Self {
            title: title.into(),
            content: String::new(),
            parent_id,
            status: None,
            tags: Vec::new(),
        }
    }
}

/// Transaction coordinator for article + tree compound operations.
///
/// Holds the connection and the external attachment store; repositories
/// are constructed per transaction so article and tree writes share one
/// commit.
pub struct WikiService<'conn, A: AttachmentStore> {
    conn: &'conn Connection,
    attachments: A,
}

impl<'conn, A: AttachmentStore> WikiService<'conn, A> {
    /// Creates a service over a migrated connection and attachment store.
    pub fn new(conn: &'conn Connection, attachments: A) -> Self {
        Self { conn, attachments }
    }

    /// Creates an article and its tree node in one transaction.
    ///
    /// # Errors
    /// - `WikiError::InvalidTitle` when the title trims empty.
    /// - `WikiError::Tree(ParentNotFound)` when `parent_id` is absent from
    ///   the tree; no article row is left behind.
    /// - `WikiError::ConcurrencyConflict` on a lost tree-version race.
    pub fn create_article(&self, request: &CreateArticleRequest) -> WikiResult<Article> {
        let title = normalize_title(request.title.as_str())?;

        let mut article =
            Article::with_id(Uuid::new_v4().to_string(), title, request.content.as_str());
        if let Some(status) = request.status {
            article.status = status;
        }
        article.tags = request.tags.clone();

        let tx = self.begin()?;
        let articles = SqliteArticleRepository::new(&tx);
        let tree_store = SqliteTreeStore::new(&tx);

        let current = tree_store.load()?;
        let updated = current.add_child(
            request.parent_id.as_deref(),
            article.id.clone(),
            article.title.clone(),
        )?;

        articles.create_article(&article)?;
        tree_store.save(current.version, &updated)?;
        tx.commit()?;

        Ok(article)
    }

    /// Loads one article by id.
    pub fn get_article(&self, id: &str) -> WikiResult<Option<Article>> {
        let articles = SqliteArticleRepository::new(self.conn);
        Ok(articles.get_article(id)?)
    }

    /// Lists articles newest-first, capped at the service limit.
    pub fn list_articles(&self, limit: Option<u32>) -> WikiResult<Vec<Article>> {
        let limit = limit
            .unwrap_or(ARTICLES_DEFAULT_LIMIT)
            .min(ARTICLES_LIMIT_MAX);
        let articles = SqliteArticleRepository::new(self.conn);
        Ok(articles.list_articles(limit)?)
    }

    /// Applies a partial update; a title change also renames the tree node
    /// in the same transaction.
    ///
    /// # Errors
    /// - `WikiError::ArticleNotFound` when the row is absent.
    /// - `WikiError::InvalidTitle` when the new title trims empty.
    pub fn update_article(&self, id: &str, patch: &ArticlePatch) -> WikiResult<Article> {
        let mut patch = patch.clone();
        if let Some(title) = patch.title.take() {
            patch.title = Some(normalize_title(title.as_str())?);
        }

        let tx = self.begin()?;
        let articles = SqliteArticleRepository::new(&tx);

        articles.update_article(id, &patch)?;

        if let Some(new_title) = &patch.title {
            let tree_store = SqliteTreeStore::new(&tx);
            let current = tree_store.load()?;
            let updated = current.update_title(id, new_title.clone())?;
            tree_store.save(current.version, &updated)?;
        }

        let article = articles
            .get_article(id)?
            .ok_or_else(|| WikiError::ArticleNotFound(id.to_string()))?;
        tx.commit()?;

        Ok(article)
    }

    /// Deletes an article, its whole subtree, every backing row in the
    /// cascade set, and their attachments. Returns the deleted id set.
    ///
    /// An article without a tree entry still gets its row and attachments
    /// deleted; the tree document is left untouched in that case.
    ///
    /// # Errors
    /// - `WikiError::CannotDeleteRoot` for the root node id.
    /// - `WikiError::ConcurrencyConflict` on a lost tree-version race.
    pub fn delete_article(&self, id: &str) -> WikiResult<Vec<ArticleId>> {
        if id == ROOT_NODE_ID {
            return Err(WikiError::CannotDeleteRoot);
        }

        let tx = self.begin()?;
        let articles = SqliteArticleRepository::new(&tx);
        let tree_store = SqliteTreeStore::new(&tx);

        let current = tree_store.load()?;
        let subtree = current.subtree_ids(id);
        let cascade = if subtree.is_empty() {
            vec![id.to_string()]
        } else {
            subtree.clone()
        };

        for article_id in &cascade {
            articles.delete_article(article_id)?;
            self.attachments.delete_article_files(article_id)?;
        }

        if !subtree.is_empty() {
            let updated = current.remove_subtree(id);
            tree_store.save(current.version, &updated)?;
        }
        tx.commit()?;

        Ok(cascade)
    }

    /// Moves an article's subtree under a new parent at an optional
    /// sibling position; article rows are unaffected.
    ///
    /// # Errors
    /// - `WikiError::CannotMoveRoot` for the root node id.
    /// - `WikiError::Tree(CyclicMoveRejected)` when the destination lies
    ///   inside the moved subtree.
    /// - `WikiError::ConcurrencyConflict` on a lost tree-version race.
    pub fn move_article(
        &self,
        id: &str,
        new_parent_id: Option<&str>,
        index: Option<usize>,
    ) -> WikiResult<TreeStructure> {
        if id == ROOT_NODE_ID {
            return Err(WikiError::CannotMoveRoot);
        }

        let tx = self.begin()?;
        let tree_store = SqliteTreeStore::new(&tx);

        let current = tree_store.load()?;
        let updated = current.move_node(id, new_parent_id, index)?;
        tree_store.save(current.version, &updated)?;
        tx.commit()?;

        Ok(updated)
    }

    /// Returns the current tree document (initial structure when the
    /// document has never been saved). Read-only; no version bump.
    pub fn get_tree(&self) -> WikiResult<TreeStructure> {
        let tree_store = SqliteTreeStore::new(self.conn);
        Ok(tree_store.load()?)
    }

    /// Returns the configured attachment store.
    pub fn attachments(&self) -> &A {
        &self.attachments
    }

    fn begin(&self) -> WikiResult<Transaction<'_>> {
        // IMMEDIATE takes the write lock up front so the read-modify-write
        // cycle is not upgraded mid-flight.
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

fn normalize_title(value: &str) -> WikiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(WikiError::InvalidTitle);
    }
    Ok(trimmed.to_string())
}
