//! Tree document store contract and SQLite implementation.
//!
//! # Responsibility
//! - Load and save the singleton serialized tree document.
//! - Enforce optimistic concurrency: saves compare-and-swap on version.
//!
//! # Invariants
//! - The document is read and written whole; no field-level updates.
//! - A save whose expected version no longer matches the persisted row
//!   fails with `ConcurrencyConflict` instead of overwriting.
//! - An absent row loads as the initial structure (version 0); nothing is
//!   persisted until the first mutation saves.

use crate::db::DbError;
use crate::model::tree::TreeStructure;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Well-known key of the singleton tree document.
pub const TREE_DOC_KEY: &str = "tree";

pub type TreeStoreResult<T> = Result<T, TreeStoreError>;

/// Errors from tree document persistence.
#[derive(Debug)]
pub enum TreeStoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Persisted payload cannot be decoded into a tree document.
    InvalidData(String),
    /// The document changed between read and save.
    ConcurrencyConflict { expected: u64, actual: u64 },
}

impl Display for TreeStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid tree document: {message}"),
            Self::ConcurrencyConflict { expected, actual } => write!(
                f,
                "tree document version moved from {expected} to {actual} during the transaction"
            ),
        }
    }
}

impl Error for TreeStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
            Self::ConcurrencyConflict { .. } => None,
        }
    }
}

impl From<DbError> for TreeStoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for TreeStoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Store interface for the singleton tree document.
pub trait TreeDocumentStore {
    /// Loads the current document, or the initial structure when absent.
    fn load(&self) -> TreeStoreResult<TreeStructure>;
    /// Saves `tree` if the persisted version still equals `expected_version`.
    fn save(&self, expected_version: u64, tree: &TreeStructure) -> TreeStoreResult<()>;
}

/// SQLite-backed tree document store.
///
/// Borrows its connection so load/save can participate in a caller-owned
/// transaction together with article writes.
pub struct SqliteTreeStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTreeStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn persisted_version(&self) -> TreeStoreResult<Option<u64>> {
        let version = self
            .conn
            .query_row(
                "SELECT version FROM tree_documents WHERE doc_key = ?1;",
                [TREE_DOC_KEY],
                |row| row.get::<_, u64>(0),
            )
            .optional()?;
        Ok(version)
    }
}

impl TreeDocumentStore for SqliteTreeStore<'_> {
    fn load(&self) -> TreeStoreResult<TreeStructure> {
        let payload = self
            .conn
            .query_row(
                "SELECT payload FROM tree_documents WHERE doc_key = ?1;",
                [TREE_DOC_KEY],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        match payload {
            Some(payload) => serde_json::from_str(&payload).map_err(|err| {
                TreeStoreError::InvalidData(format!("cannot decode payload: {err}"))
            }),
            None => Ok(TreeStructure::initial()),
        }
    }

    fn save(&self, expected_version: u64, tree: &TreeStructure) -> TreeStoreResult<()> {
        let payload = serde_json::to_string(tree)
            .map_err(|err| TreeStoreError::InvalidData(format!("cannot encode payload: {err}")))?;

        let changed = self.conn.execute(
            "UPDATE tree_documents
             SET version = ?1,
                 updated_at = ?2,
                 payload = ?3
             WHERE doc_key = ?4
               AND version = ?5;",
            params![
                tree.version,
                tree.updated_at,
                payload.as_str(),
                TREE_DOC_KEY,
                expected_version,
            ],
        )?;
        if changed == 1 {
            return Ok(());
        }

        match self.persisted_version()? {
            Some(actual) => Err(TreeStoreError::ConcurrencyConflict {
                expected: expected_version,
                actual,
            }),
            // First writer inserts the row. A racing first writer trips the
            // primary key and is reported as a conflict.
            None => {
                let inserted = self.conn.execute(
                    "INSERT INTO tree_documents (doc_key, version, updated_at, payload)
                     VALUES (?1, ?2, ?3, ?4);",
                    params![TREE_DOC_KEY, tree.version, tree.updated_at, payload.as_str()],
                );
                match inserted {
                    Ok(_) => Ok(()),
                    Err(rusqlite::Error::SqliteFailure(code, _))
                        if code.code == rusqlite::ErrorCode::ConstraintViolation =>
                    {
                        let actual = self.persisted_version()?.unwrap_or(tree.version);
                        Err(TreeStoreError::ConcurrencyConflict {
                            expected: expected_version,
                            actual,
                        })
                    }
                    Err(other) => Err(other.into()),
                }
            }
        }
    }
}
