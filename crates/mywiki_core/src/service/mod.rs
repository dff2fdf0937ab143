//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into atomic, use-case level APIs.
//! - Keep route/UI layers decoupled from storage details.

pub mod wiki_service;
