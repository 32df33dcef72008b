//! Document knowledge-base data model.
//!
//! Categories contain chapters, chapters contain paged content items,
//! content items carry threaded comments, and every mutation is recorded in
//! an append-only operation log. This crate has no internal dependencies so
//! it can back both the PostgreSQL repositories and in-process tooling.

pub mod audit;
pub mod category;
pub mod chapter;
pub mod clock;
pub mod comment;
pub mod config;
pub mod content;
pub mod error;
pub mod operation_log;
pub mod pagination;
pub mod record;
pub mod store;
pub mod thread;
pub mod types;
pub mod validation;
