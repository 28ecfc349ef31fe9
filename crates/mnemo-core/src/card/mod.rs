//! Card module - Scheduling state of a single flashcard
//!
//! - `Card`: the memory state the scheduler reads and produces
//! - `CardState`: lifecycle position (new, learning, review, relearning)
//! - `Rating`: the learner's recall quality for one review
//! - `ReviewLog` / `RecordLog`: immutable records of review outcomes

mod log;

pub use log::{RecordLog, RecordLogItem, ReviewLog};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fsrs::{SchedulerError, MAX_DIFFICULTY, MIN_DIFFICULTY};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Stability given to a freshly authored card before its first review
pub const NEW_CARD_STABILITY: f64 = 0.4;

/// Difficulty given to a freshly authored card before its first review
pub const NEW_CARD_DIFFICULTY: f64 = 5.0;

// ============================================================================
// CARD STATE
// ============================================================================

/// Lifecycle position of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CardState {
    /// Authored but never reviewed
    #[default]
    New,
    /// Working through the short learning steps
    Learning,
    /// Graduated; scheduled in whole days
    Review,
    /// Lapsed from Review, working through the relearning steps
    Relearning,
}

impl CardState {
    /// All states, in lifecycle order
    pub const ALL: [CardState; 4] = [
        CardState::New,
        CardState::Learning,
        CardState::Review,
        CardState::Relearning,
    ];

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            CardState::New => "new",
            CardState::Learning => "learning",
            CardState::Review => "review",
            CardState::Relearning => "relearning",
        }
    }

    /// Whether the card is scheduled on the minute-scale step tables
    pub fn is_short_term(&self) -> bool {
        matches!(self, CardState::Learning | CardState::Relearning)
    }
}

impl std::fmt::Display for CardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Strict parse: an unrecognised stored state is an error, never a guess.
impl std::str::FromStr for CardState {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(CardState::New),
            "learning" => Ok(CardState::Learning),
            "review" => Ok(CardState::Review),
            "relearning" => Ok(CardState::Relearning),
            _ => Err(SchedulerError::UnknownCardState(s.to_string())),
        }
    }
}

// ============================================================================
// RATING
// ============================================================================

/// Recall quality supplied by the learner
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Rating {
    /// Forgot the answer
    Again = 1,
    /// Recalled with serious difficulty
    Hard = 2,
    /// Recalled after some hesitation
    Good = 3,
    /// Recalled effortlessly
    Easy = 4,
}

impl Rating {
    /// All ratings in ascending order
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    /// Numeric value (1-4)
    pub fn value(self) -> i32 {
        self as i32
    }

    /// Parse a numeric rating, `None` outside 1-4
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Rating::Again),
            2 => Some(Rating::Hard),
            3 => Some(Rating::Good),
            4 => Some(Rating::Easy),
            _ => None,
        }
    }

    /// Display name
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Again => "Again",
            Rating::Hard => "Hard",
            Rating::Good => "Good",
            Rating::Easy => "Easy",
        }
    }
}

impl TryFrom<i32> for Rating {
    type Error = SchedulerError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Rating::from_i32(value).ok_or(SchedulerError::InvalidRating(value))
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// CARD
// ============================================================================

/// Memory state of one flashcard
///
/// Cards are plain values: the scheduler never mutates its input and always
/// hands back a new `Card`, so a computed update can be dropped at any point
/// without leaving partial state behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Lifecycle position
    pub state: CardState,
    /// When the card next becomes eligible for review
    pub due: DateTime<Utc>,
    /// Days for recall probability to decay to ~90%
    pub stability: f64,
    /// Intrinsic hardness, 1.0 (easy) to 10.0 (hard)
    pub difficulty: f64,
    /// Whole days between the previous review and the latest one
    pub elapsed_days: u32,
    /// Interval in days scheduled by the latest review
    pub scheduled_days: u32,
    /// Number of reviews performed
    pub reps: u32,
    /// Number of times the card was forgotten from Review
    pub lapses: u32,
    /// Index into the learning or relearning step table
    pub learning_steps: u32,
    /// When the card was last reviewed (None until the first review)
    pub last_review: Option<DateTime<Utc>>,
}

impl Card {
    /// Create a never-reviewed card that is due immediately
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            state: CardState::New,
            due: now,
            stability: NEW_CARD_STABILITY,
            difficulty: NEW_CARD_DIFFICULTY,
            elapsed_days: 0,
            scheduled_days: 0,
            reps: 0,
            lapses: 0,
            learning_steps: 0,
            last_review: None,
        }
    }

    /// Check if the card is due at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due <= now
    }

    /// Check if the card has never been reviewed
    pub fn is_new(&self) -> bool {
        self.state == CardState::New
    }

    /// Whole days since the last review, floored, 0 if never reviewed
    ///
    /// Negative spans (clock skew) also yield 0.
    pub fn days_since_review(&self, now: DateTime<Utc>) -> u32 {
        self.last_review
            .map(|last| (now - last).num_days().max(0))
            .map(|days| u32::try_from(days).unwrap_or(u32::MAX))
            .unwrap_or(0)
    }

    /// Reject stored values the memory model cannot work with
    pub fn check_numeric(&self) -> Result<(), SchedulerError> {
        if !self.stability.is_finite() || self.stability <= 0.0 {
            return Err(SchedulerError::NumericDomain {
                quantity: "stability",
                value: self.stability,
            });
        }
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&self.difficulty) {
            return Err(SchedulerError::NumericDomain {
                quantity: "difficulty",
                value: self.difficulty,
            });
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
