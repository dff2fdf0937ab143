//! Domain model for articles and their navigation tree.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep the pure tree structure engine free of storage concerns.
//!
//! # Invariants
//! - Every article is identified by a stable string id shared with its
//!   tree node.
//! - The tree document is versioned and always handled as one whole value.

pub mod article;
pub mod tree;
