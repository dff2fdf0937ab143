//! Article repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over `articles` storage.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths must call `Article::validate()` before SQL mutations.
//! - Read paths must reject invalid persisted state instead of masking it.
//! - Listing is deterministic: `created_at DESC, id ASC`.

use crate::db::DbError;
use crate::model::article::{Article, ArticleId, ArticlePatch, ArticleStatus, ArticleValidationError};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ARTICLE_SELECT_SQL: &str = "SELECT
    id,
    title,
    content,
    status,
    tags,
    created_at,
    updated_at
FROM articles";

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for article persistence operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ArticleValidationError),
    Db(DbError),
    NotFound(ArticleId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "article not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted article data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ArticleValidationError> for RepoError {
    fn from(value: ArticleValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for article CRUD operations.
pub trait ArticleRepository {
    fn create_article(&self, article: &Article) -> RepoResult<ArticleId>;
    fn get_article(&self, id: &str) -> RepoResult<Option<Article>>;
    fn update_article(&self, id: &str, patch: &ArticlePatch) -> RepoResult<()>;
    fn delete_article(&self, id: &str) -> RepoResult<()>;
    fn list_articles(&self, limit: u32) -> RepoResult<Vec<Article>>;
}

/// SQLite-backed article repository.
///
/// Borrows its connection so it can run inside a caller-owned transaction
/// scope; `rusqlite::Transaction` derefs to `Connection`.
pub struct SqliteArticleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteArticleRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ArticleRepository for SqliteArticleRepository<'_> {
    fn create_article(&self, article: &Article) -> RepoResult<ArticleId> {
        article.validate()?;

        self.conn.execute(
            "INSERT INTO articles (
                id,
                title,
                content,
                status,
                tags,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                article.id.as_str(),
                article.title.as_str(),
                article.content.as_str(),
                status_to_db(article.status),
                encode_tags(&article.tags)?,
                article.created_at,
                article.updated_at,
            ],
        )?;

        Ok(article.id.clone())
    }

    fn get_article(&self, id: &str) -> RepoResult<Option<Article>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ARTICLE_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_article_row(row)?));
        }

        Ok(None)
    }

    fn update_article(&self, id: &str, patch: &ArticlePatch) -> RepoResult<()> {
        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(ArticleValidationError::BlankTitle.into());
            }
        }

        let changed = self.conn.execute(
            "UPDATE articles
             SET
                title = COALESCE(?1, title),
                content = COALESCE(?2, content),
                status = COALESCE(?3, status),
                tags = COALESCE(?4, tags),
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?5;",
            params![
                patch.title.as_deref(),
                patch.content.as_deref(),
                patch.status.map(status_to_db),
                patch
                    .tags
                    .as_ref()
                    .map(|tags| encode_tags(tags))
                    .transpose()?,
                id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }

        Ok(())
    }

    fn delete_article(&self, id: &str) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM articles WHERE id = ?1;", [id])?;
        Ok(())
    }

    fn list_articles(&self, limit: u32) -> RepoResult<Vec<Article>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ARTICLE_SELECT_SQL}
             ORDER BY created_at DESC, id ASC
             LIMIT ?1;"
        ))?;

        let mut rows = stmt.query([limit])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_article_row(row)?);
        }
        Ok(items)
    }
}

fn parse_article_row(row: &Row<'_>) -> RepoResult<Article> {
    let status_text: String = row.get("status")?;
    let status = status_from_db(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in articles.status"))
    })?;

    let tags_text: String = row.get("tags")?;
    let tags = decode_tags(&tags_text)?;

    Ok(Article {
        id: row.get("id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        status,
        tags,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn status_to_db(status: ArticleStatus) -> &'static str {
    match status {
        ArticleStatus::Published => "published",
        ArticleStatus::Draft => "draft",
    }
}

fn status_from_db(value: &str) -> Option<ArticleStatus> {
    match value {
        "published" => Some(ArticleStatus::Published),
        "draft" => Some(ArticleStatus::Draft),
        _ => None,
    }
}

fn encode_tags(tags: &[String]) -> RepoResult<String> {
    serde_json::to_string(tags)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode tags: {err}")))
}

fn decode_tags(value: &str) -> RepoResult<Vec<String>> {
    serde_json::from_str(value)
        .map_err(|err| RepoError::InvalidData(format!("invalid tags payload `{value}`: {err}")))
}
