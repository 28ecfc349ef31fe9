//! SQLite Storage Implementation
//!
//! Card and review-log persistence around the scheduler. Every write to a
//! card row is conditioned on the `version` read with it, so two reviews of
//! the same card can never both commit.

use chrono::{DateTime, Duration, NaiveTime, SecondsFormat, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use uuid::Uuid;

use crate::card::{Card, CardState, Rating, RecordLog, RecordLogItem, ReviewLog};
use crate::fsrs::{retrievability, FSRSParameters, FSRSScheduler, SchedulerError};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Storage error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Card not found
    #[error("Card not found: {0}")]
    NotFound(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid timestamp
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
    /// Rejected caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The card changed between read and write; nothing was written
    #[error("Card {id} was modified concurrently (expected version {expected_version})")]
    ConcurrentModification {
        /// Card that conflicted
        id: String,
        /// Version the failed write was conditioned on
        expected_version: i64,
    },
    /// Scheduling failed or stored card state is invalid
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

impl StorageError {
    /// Only a concurrency conflict is worth retrying, and only from a fresh read
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::ConcurrentModification { .. })
    }
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

// ============================================================================
// RECORD TYPES
// ============================================================================

/// Input for authoring a card
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCardInput {
    /// Owner of the card
    pub user_id: String,
    /// Prompt side
    pub front: String,
    /// Answer side
    pub back: String,
    /// Authoring time (defaults to now)
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A persisted flashcard: content plus scheduling state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    /// Card ID
    pub id: String,
    /// Owner
    pub user_id: String,
    /// Prompt side
    pub front: String,
    /// Answer side
    pub back: String,
    /// Scheduling state
    #[serde(flatten)]
    pub card: Card,
    /// Optimistic concurrency version
    pub version: i64,
    /// When the card was authored
    pub created_at: DateTime<Utc>,
    /// Last write
    pub updated_at: DateTime<Utc>,
}

/// A review log row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReviewLog {
    /// Row ID
    pub id: i64,
    /// Reviewed card
    pub card_id: String,
    /// The review
    #[serde(flatten)]
    pub log: ReviewLog,
}

/// Result of a committed review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    /// Card as persisted after the review
    pub card: Flashcard,
    /// Appended log row
    pub log: StoredReviewLog,
}

/// Per-user deck counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckStats {
    /// Cards not soft-deleted
    pub total: i64,
    /// Never reviewed
    pub new_cards: i64,
    /// In learning steps
    pub learning: i64,
    /// Graduated
    pub review: i64,
    /// In relearning steps
    pub relearning: i64,
    /// Reviewed cards due before the end of the current UTC day
    pub due_today: i64,
    /// Reviewed cards due before the start of the current UTC day
    pub overdue: i64,
    /// Mean recall probability over reviewed cards (0 when there are none)
    pub average_retrievability: f64,
}

// ============================================================================
// ROW MAPPING
// ============================================================================

/// Card row as stored, before state and timestamps are validated
struct CardRow {
    id: String,
    user_id: String,
    front: String,
    back: String,
    state: String,
    due: String,
    stability: f64,
    difficulty: f64,
    elapsed_days: u32,
    scheduled_days: u32,
    reps: u32,
    lapses: u32,
    learning_steps: u32,
    last_review: Option<String>,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl CardRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            front: row.get("front")?,
            back: row.get("back")?,
            state: row.get("state")?,
            due: row.get("due")?,
            stability: row.get("stability")?,
            difficulty: row.get("difficulty")?,
            elapsed_days: row.get("elapsed_days")?,
            scheduled_days: row.get("scheduled_days")?,
            reps: row.get("reps")?,
            lapses: row.get("lapses")?,
            learning_steps: row.get("learning_steps")?,
            last_review: row.get("last_review")?,
            version: row.get("version")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn into_flashcard(self) -> Result<Flashcard> {
        let state: CardState = self.state.parse()?;
        let last_review = self
            .last_review
            .as_deref()
            .map(|value| parse_timestamp(value, "last_review"))
            .transpose()?;

        Ok(Flashcard {
            card: Card {
                state,
                due: parse_timestamp(&self.due, "due")?,
                stability: self.stability,
                difficulty: self.difficulty,
                elapsed_days: self.elapsed_days,
                scheduled_days: self.scheduled_days,
                reps: self.reps,
                lapses: self.lapses,
                learning_steps: self.learning_steps,
                last_review,
            },
            created_at: parse_timestamp(&self.created_at, "created_at")?,
            updated_at: parse_timestamp(&self.updated_at, "updated_at")?,
            id: self.id,
            user_id: self.user_id,
            front: self.front,
            back: self.back,
            version: self.version,
        })
    }
}

/// Review log row as stored
struct LogRow {
    id: i64,
    card_id: String,
    rating: i32,
    reviewed_at: String,
    elapsed_days: u32,
    scheduled_days: u32,
    state_before: String,
    state_after: String,
    stability_before: f64,
    stability_after: f64,
    difficulty_before: f64,
    difficulty_after: f64,
    due_before: String,
    last_review_before: Option<String>,
    elapsed_days_before: u32,
    scheduled_days_before: u32,
    learning_steps_before: u32,
    review_duration_ms: Option<i64>,
}

impl LogRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            card_id: row.get("card_id")?,
            rating: row.get("rating")?,
            reviewed_at: row.get("reviewed_at")?,
            elapsed_days: row.get("elapsed_days")?,
            scheduled_days: row.get("scheduled_days")?,
            state_before: row.get("state_before")?,
            state_after: row.get("state_after")?,
            stability_before: row.get("stability_before")?,
            stability_after: row.get("stability_after")?,
            difficulty_before: row.get("difficulty_before")?,
            difficulty_after: row.get("difficulty_after")?,
            due_before: row.get("due_before")?,
            last_review_before: row.get("last_review_before")?,
            elapsed_days_before: row.get("elapsed_days_before")?,
            scheduled_days_before: row.get("scheduled_days_before")?,
            learning_steps_before: row.get("learning_steps_before")?,
            review_duration_ms: row.get("review_duration_ms")?,
        })
    }

    fn into_stored(self) -> Result<StoredReviewLog> {
        let last_review_before = self
            .last_review_before
            .as_deref()
            .map(|value| parse_timestamp(value, "last_review_before"))
            .transpose()?;

        Ok(StoredReviewLog {
            id: self.id,
            card_id: self.card_id,
            log: ReviewLog {
                rating: Rating::try_from(self.rating)?,
                reviewed_at: parse_timestamp(&self.reviewed_at, "reviewed_at")?,
                elapsed_days: self.elapsed_days,
                scheduled_days: self.scheduled_days,
                state_before: self.state_before.parse()?,
                state_after: self.state_after.parse()?,
                stability_before: self.stability_before,
                stability_after: self.stability_after,
                difficulty_before: self.difficulty_before,
                difficulty_after: self.difficulty_after,
                due_before: parse_timestamp(&self.due_before, "due_before")?,
                last_review_before,
                elapsed_days_before: self.elapsed_days_before,
                scheduled_days_before: self.scheduled_days_before,
                learning_steps_before: self.learning_steps_before,
                review_duration_ms: self.review_duration_ms,
            },
        })
    }
}

/// Fixed-width RFC 3339 so text comparison in SQL orders chronologically
fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse RFC3339 timestamp
fn parse_timestamp(value: &str, field_name: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            StorageError::InvalidTimestamp(format!(
                "Invalid {} timestamp '{}': {}",
                field_name, value, e
            ))
        })
}

// ============================================================================
// STORAGE
// ============================================================================

/// Card store
///
/// Uses separate reader/writer connections for interior mutability.
/// All methods take `&self`, so `Arc<Storage>` can be shared across threads.
pub struct Storage {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    scheduler: FSRSScheduler,
}

impl Storage {
    /// Apply PRAGMAs and optional encryption to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        #[cfg(feature = "encryption")]
        {
            if let Ok(key) = std::env::var("MNEMO_ENCRYPTION_KEY") {
                if !key.is_empty() {
                    conn.pragma_update(None, "key", &key)?;
                }
            }
        }

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -16000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        Ok(())
    }

    /// Platform data directory location of the database
    pub fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "mnemo", "mnemo").ok_or_else(|| {
            StorageError::Init("Could not determine project directories".to_string())
        })?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        // Restrict directory permissions to owner-only on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            let _ = std::fs::set_permissions(data_dir, perms);
        }
        Ok(data_dir.join("mnemo.db"))
    }

    /// Create new storage instance with default scheduler parameters
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        Self::with_parameters(db_path, FSRSParameters::default())
    }

    /// Create storage scheduling with the given parameters
    pub fn with_parameters(db_path: Option<PathBuf>, params: FSRSParameters) -> Result<Self> {
        let scheduler = FSRSScheduler::new(params)?;

        let path = match db_path {
            Some(p) => p,
            None => Self::default_path()?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let writer_conn = Connection::open(&path)?;

        // Restrict database file permissions to owner-only on Unix
        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&path, perms);
        }

        Self::configure_connection(&writer_conn)?;

        // Apply migrations on writer only
        super::migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        tracing::debug!(path = %path.display(), "Opened card store");

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            scheduler,
        })
    }

    /// Scheduler used for every review
    pub fn scheduler(&self) -> &FSRSScheduler {
        &self.scheduler
    }

    // ========================================================================
    // CARDS
    // ========================================================================

    /// Author a new card, due immediately
    pub fn add_card(&self, input: NewCardInput) -> Result<Flashcard> {
        if input.user_id.trim().is_empty() {
            return Err(StorageError::InvalidInput("user_id must not be empty".to_string()));
        }
        if input.front.trim().is_empty() {
            return Err(StorageError::InvalidInput("front must not be empty".to_string()));
        }

        let now = input.created_at.unwrap_or_else(Utc::now);
        let id = Uuid::new_v4().to_string();
        let card = Card::new(now);
        let now_str = format_timestamp(now);

        {
            let writer = self.writer.lock()
                .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
            writer.execute(
                "INSERT INTO cards (
                    id, user_id, front, back,
                    state, due, stability, difficulty,
                    elapsed_days, scheduled_days, reps, lapses, learning_steps, last_review,
                    version, created_at, updated_at, deleted
                ) VALUES (
                    ?1, ?2, ?3, ?4,
                    ?5, ?6, ?7, ?8,
                    ?9, ?10, ?11, ?12, ?13, ?14,
                    1, ?15, ?16, 0
                )",
                params![
                    id,
                    input.user_id,
                    input.front,
                    input.back,
                    card.state.as_str(),
                    format_timestamp(card.due),
                    card.stability,
                    card.difficulty,
                    card.elapsed_days,
                    card.scheduled_days,
                    card.reps,
                    card.lapses,
                    card.learning_steps,
                    Option::<String>::None,
                    now_str,
                    now_str,
                ],
            )?;
        }

        tracing::debug!(card_id = %id, user_id = %input.user_id, "Added card");

        self.get_card(&id)?
            .ok_or_else(|| StorageError::NotFound(id))
    }

    /// Get a card by ID (soft-deleted cards are not returned)
    pub fn get_card(&self, id: &str) -> Result<Option<Flashcard>> {
        let row = {
            let reader = self.reader.lock()
                .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
            reader
                .query_row(
                    "SELECT * FROM cards WHERE id = ?1 AND deleted = 0",
                    params![id],
                    CardRow::from_row,
                )
                .optional()?
        };
        row.map(CardRow::into_flashcard).transpose()
    }

    /// Cards to study now
    ///
    /// Reviewed cards with `due <= now` come first, most overdue first, then
    /// up to `new_quota` New cards oldest first. At most `limit` overall.
    pub fn due_cards(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        new_quota: usize,
        limit: usize,
    ) -> Result<Vec<Flashcard>> {
        let now_str = format_timestamp(now);

        let (reviews, fresh) = {
            let reader = self.reader.lock()
                .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;

            let mut stmt = reader.prepare(
                "SELECT * FROM cards
                 WHERE user_id = ?1 AND deleted = 0 AND state != 'new' AND due <= ?2
                 ORDER BY due ASC, id ASC
                 LIMIT ?3",
            )?;
            let reviews = stmt
                .query_map(params![user_id, now_str, limit as i64], CardRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let new_limit = limit.saturating_sub(reviews.len()).min(new_quota);
            let mut stmt = reader.prepare(
                "SELECT * FROM cards
                 WHERE user_id = ?1 AND deleted = 0 AND state = 'new' AND due <= ?2
                 ORDER BY created_at ASC, id ASC
                 LIMIT ?3",
            )?;
            let fresh = stmt
                .query_map(params![user_id, now_str, new_limit as i64], CardRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            (reviews, fresh)
        };

        reviews
            .into_iter()
            .chain(fresh)
            .map(CardRow::into_flashcard)
            .collect()
    }

    /// Deck counters for one user
    pub fn deck_stats(&self, user_id: &str, now: DateTime<Utc>) -> Result<DeckStats> {
        let start_of_day = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let end_of_day = start_of_day + Duration::days(1);

        let rows: Vec<(String, String, f64, Option<String>)> = {
            let reader = self.reader.lock()
                .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
            let mut stmt = reader.prepare(
                "SELECT state, due, stability, last_review FROM cards
                 WHERE user_id = ?1 AND deleted = 0",
            )?;
            let rows = stmt
                .query_map(params![user_id], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        let mut stats = DeckStats::default();
        let mut retrievability_sum = 0.0;
        let mut reviewed = 0_i64;

        for (state, due, stability, last_review) in rows {
            stats.total += 1;
            let state: CardState = state.parse()?;
            match state {
                CardState::New => {
                    stats.new_cards += 1;
                    continue;
                }
                CardState::Learning => stats.learning += 1,
                CardState::Review => stats.review += 1,
                CardState::Relearning => stats.relearning += 1,
            }

            let due = parse_timestamp(&due, "due")?;
            if due < end_of_day {
                stats.due_today += 1;
            }
            if due < start_of_day {
                stats.overdue += 1;
            }

            if let Some(last) = last_review {
                let last = parse_timestamp(&last, "last_review")?;
                let days = (now - last).num_seconds().max(0) as f64 / 86_400.0;
                retrievability_sum += retrievability(stability, days);
                reviewed += 1;
            }
        }

        if reviewed > 0 {
            stats.average_retrievability = retrievability_sum / reviewed as f64;
        }

        Ok(stats)
    }

    /// What each rating would do, without writing anything
    pub fn preview_card(&self, id: &str, now: DateTime<Utc>) -> Result<RecordLog> {
        let current = self
            .get_card(id)?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        Ok(self.scheduler.repeat(&current.card, now)?)
    }

    // ========================================================================
    // REVIEWS
    // ========================================================================

    /// Review a card and persist the result
    ///
    /// On `ConcurrentModification` nothing was written; retry from a fresh
    /// read rather than re-applying this result.
    pub fn review_card(
        &self,
        id: &str,
        rating: Rating,
        now: DateTime<Utc>,
        review_duration_ms: Option<i64>,
    ) -> Result<ReviewOutcome> {
        let current = self
            .get_card(id)?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;

        let item = self.scheduler.review(&current.card, now, rating)?;
        let item = RecordLogItem {
            log: item.log.with_duration(review_duration_ms),
            card: item.card,
        };

        let outcome = self.commit_review(&current, item)?;
        tracing::debug!(
            card_id = %id,
            rating = %rating,
            state = %outcome.card.card.state,
            scheduled_days = outcome.card.card.scheduled_days,
            "Recorded review"
        );
        Ok(outcome)
    }

    /// Persist a computed review, conditioned on `current.version`
    ///
    /// Updates the card and appends the log in one transaction. If the row
    /// no longer has `current.version`, the transaction is rolled back and
    /// `ConcurrentModification` is returned.
    pub fn commit_review(&self, current: &Flashcard, item: RecordLogItem) -> Result<ReviewOutcome> {
        let RecordLogItem { card, log } = item;
        let updated_at = log.reviewed_at;

        let log_id = {
            let mut writer = self.writer.lock()
                .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
            let tx = writer.transaction()?;

            let rows =
                Self::update_card_state(&tx, &current.id, current.version, &card, updated_at)?;
            if rows == 0 {
                return Err(Self::conflict(current));
            }

            tx.execute(
                "INSERT INTO review_logs (
                    card_id, rating, reviewed_at, elapsed_days, scheduled_days,
                    state_before, state_after, stability_before, stability_after,
                    difficulty_before, difficulty_after,
                    due_before, last_review_before, elapsed_days_before,
                    scheduled_days_before, learning_steps_before, review_duration_ms
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5,
                    ?6, ?7, ?8, ?9,
                    ?10, ?11,
                    ?12, ?13, ?14,
                    ?15, ?16, ?17
                )",
                params![
                    current.id,
                    log.rating.value(),
                    format_timestamp(log.reviewed_at),
                    log.elapsed_days,
                    log.scheduled_days,
                    log.state_before.as_str(),
                    log.state_after.as_str(),
                    log.stability_before,
                    log.stability_after,
                    log.difficulty_before,
                    log.difficulty_after,
                    format_timestamp(log.due_before),
                    log.last_review_before.map(format_timestamp),
                    log.elapsed_days_before,
                    log.scheduled_days_before,
                    log.learning_steps_before,
                    log.review_duration_ms,
                ],
            )?;
            let log_id = tx.last_insert_rowid();
            tx.commit()?;
            log_id
        };

        Ok(ReviewOutcome {
            card: Flashcard {
                card,
                version: current.version + 1,
                updated_at,
                ..current.clone()
            },
            log: StoredReviewLog {
                id: log_id,
                card_id: current.id.clone(),
                log,
            },
        })
    }

    /// Review history of a card, oldest first
    pub fn review_logs(&self, card_id: &str) -> Result<Vec<StoredReviewLog>> {
        let rows = {
            let reader = self.reader.lock()
                .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
            let mut stmt = reader.prepare(
                "SELECT * FROM review_logs WHERE card_id = ?1 ORDER BY reviewed_at ASC, id ASC",
            )?;
            let rows = stmt
                .query_map(params![card_id], LogRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        rows.into_iter().map(LogRow::into_stored).collect()
    }

    /// Reset a card to New, keeping its review history
    pub fn reset_card(&self, id: &str, now: DateTime<Utc>) -> Result<Flashcard> {
        let current = self
            .get_card(id)?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        let card = self.scheduler.forget(&current.card, now);

        {
            let writer = self.writer.lock()
                .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
            let rows = Self::update_card_state(&writer, &current.id, current.version, &card, now)?;
            if rows == 0 {
                return Err(Self::conflict(&current));
            }
        }

        Ok(Flashcard {
            card,
            version: current.version + 1,
            updated_at: now,
            ..current
        })
    }

    /// Hide a card from every query; history is kept
    pub fn soft_delete(&self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        let writer = self.writer.lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
        let rows = writer.execute(
            "UPDATE cards SET deleted = 1, version = version + 1, updated_at = ?1
             WHERE id = ?2 AND deleted = 0",
            params![format_timestamp(now), id],
        )?;
        Ok(rows > 0)
    }

    fn update_card_state(
        conn: &Connection,
        id: &str,
        expected_version: i64,
        card: &Card,
        updated_at: DateTime<Utc>,
    ) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE cards SET
                state = ?1,
                due = ?2,
                stability = ?3,
                difficulty = ?4,
                elapsed_days = ?5,
                scheduled_days = ?6,
                reps = ?7,
                lapses = ?8,
                learning_steps = ?9,
                last_review = ?10,
                version = version + 1,
                updated_at = ?11
            WHERE id = ?12 AND version = ?13 AND deleted = 0",
            params![
                card.state.as_str(),
                format_timestamp(card.due),
                card.stability,
                card.difficulty,
                card.elapsed_days,
                card.scheduled_days,
                card.reps,
                card.lapses,
                card.learning_steps,
                card.last_review.map(format_timestamp),
                format_timestamp(updated_at),
                id,
                expected_version,
            ],
        )
    }

    fn conflict(current: &Flashcard) -> StorageError {
        tracing::warn!(
            card_id = %current.id,
            expected_version = current.version,
            "Concurrent modification, discarding computed update"
        );
        StorageError::ConcurrentModification {
            id: current.id.clone(),
            expected_version: current.version,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
