//! Storage Module
//!
//! SQLite-based persistence boundary:
//! - One row per card with its FSRS-5 state and an optimistic `version`
//! - Append-only review log
//! - Soft delete

mod migrations;
mod sqlite;

pub use migrations::MIGRATIONS;
pub use sqlite::{
    DeckStats, Flashcard, NewCardInput, Result, ReviewOutcome, Storage, StorageError,
    StoredReviewLog,
};
