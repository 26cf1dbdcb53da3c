//! quorum-store: SQLite persistence for transcripts and knowledge
//!
//! Implements the core's `TranscriptStore` and `KnowledgeStore` ports
//! on a single SQLite database, plus the knowledge management calls the
//! CLI exposes.

pub mod sqlite;

pub use sqlite::{ChatDb, KnowledgeRow};
