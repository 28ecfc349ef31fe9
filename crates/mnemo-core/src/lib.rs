//! # Mnemo Core
//!
//! Spaced-repetition scheduling engine for flashcard review:
//!
//! - **FSRS-5**: 19-weight memory model (stability, difficulty, retrievability)
//! - **Scheduler**: four-way candidate outcomes per review, learning and
//!   relearning steps, optional interval fuzz
//! - **Storage**: SQLite card and review-log tables with optimistic
//!   concurrency on every write
//!
//! The engine is pure: `FSRSScheduler` never reads a clock or touches
//! storage, so calling it from many threads needs no locking. Two reviews of
//! the same card are serialized at the storage layer instead, where a stale
//! write fails with `StorageError::ConcurrentModification`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mnemo_core::{NewCardInput, Rating, Storage};
//! use chrono::Utc;
//!
//! // Create storage (uses default platform-specific location)
//! let storage = Storage::new(None)?;
//!
//! // Author a card
//! let card = storage.add_card(NewCardInput {
//!     user_id: "learner-1".to_string(),
//!     front: "Capital of Australia?".to_string(),
//!     back: "Canberra".to_string(),
//!     ..Default::default()
//! })?;
//!
//! // Show the learner what each answer would do, then record one
//! let preview = storage.preview_card(&card.id, Utc::now())?;
//! let outcome = storage.review_card(&card.id, Rating::Good, Utc::now(), None)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `bundled-sqlite` (default): Compile SQLite into the binary
//! - `encryption`: SQLCipher database encryption keyed by `MNEMO_ENCRYPTION_KEY`

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod card;
pub mod fsrs;
pub mod storage;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Card model
pub use card::{
    Card, CardState, Rating, RecordLog, RecordLogItem, ReviewLog, NEW_CARD_DIFFICULTY,
    NEW_CARD_STABILITY,
};

// FSRS-5 algorithm
pub use fsrs::{
    initial_difficulty,
    initial_stability,
    next_interval,
    // Core functions for advanced usage
    retrievability,
    ConfigError,
    FSRSParameters,
    FSRSScheduler,
    MemoryModel,
    SchedulerError,
    StepDuration,
    FSRS5_WEIGHTS,
};

// Storage layer
pub use storage::{
    DeckStats, Flashcard, NewCardInput, Result, ReviewOutcome, Storage, StorageError,
    StoredReviewLog,
};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// FSRS algorithm version (5 = 19 parameters)
pub const FSRS_VERSION: u8 = 5;

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        Card, CardState, DeckStats, FSRSParameters, FSRSScheduler, Flashcard, NewCardInput,
        Rating, RecordLog, Result, ReviewOutcome, SchedulerError, Storage, StorageError,
    };
}
