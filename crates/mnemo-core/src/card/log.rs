//! Review logs and per-rating schedule candidates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Card, CardState, Rating};

/// Immutable record of one review event
///
/// Carries enough of the pre-review card to undo the review, but the
/// scheduler itself never reads logs to schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewLog {
    /// Rating the learner gave
    pub rating: Rating,
    /// When the review happened
    pub reviewed_at: DateTime<Utc>,
    /// Whole days since the previous review
    pub elapsed_days: u32,
    /// Interval in days produced by this review
    pub scheduled_days: u32,

    // ========== Before / after ==========
    /// State before the review
    pub state_before: CardState,
    /// State after the review
    pub state_after: CardState,
    /// Stability before the review
    pub stability_before: f64,
    /// Stability after the review
    pub stability_after: f64,
    /// Difficulty before the review
    pub difficulty_before: f64,
    /// Difficulty after the review
    pub difficulty_after: f64,

    // ========== Rollback snapshot ==========
    /// Due date before the review
    pub due_before: DateTime<Utc>,
    /// Previous review time
    pub last_review_before: Option<DateTime<Utc>>,
    /// Card's elapsed_days before the review
    pub elapsed_days_before: u32,
    /// Card's scheduled_days before the review
    pub scheduled_days_before: u32,
    /// Step index before the review
    pub learning_steps_before: u32,

    /// How long the learner took, if the front end measured it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_duration_ms: Option<i64>,
}

impl ReviewLog {
    /// Attach the measured answer time
    pub fn with_duration(mut self, review_duration_ms: Option<i64>) -> Self {
        self.review_duration_ms = review_duration_ms;
        self
    }

    /// Whether this review counted as a lapse
    pub fn is_lapse(&self) -> bool {
        self.rating == Rating::Again && self.state_before == CardState::Review
    }
}

/// A candidate outcome: the next card plus the log that would be recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordLogItem {
    /// Card after the review
    pub card: Card,
    /// Log of the review
    pub log: ReviewLog,
}

/// All four candidate outcomes of reviewing one card at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordLog {
    /// Outcome for Again
    pub again: RecordLogItem,
    /// Outcome for Hard
    pub hard: RecordLogItem,
    /// Outcome for Good
    pub good: RecordLogItem,
    /// Outcome for Easy
    pub easy: RecordLogItem,
}

impl RecordLog {
    /// Borrow the outcome for a rating
    pub fn get(&self, rating: Rating) -> &RecordLogItem {
        match rating {
            Rating::Again => &self.again,
            Rating::Hard => &self.hard,
            Rating::Good => &self.good,
            Rating::Easy => &self.easy,
        }
    }

    /// Take the outcome for a rating
    pub fn into_item(self, rating: Rating) -> RecordLogItem {
        match rating {
            Rating::Again => self.again,
            Rating::Hard => self.hard,
            Rating::Good => self.good,
            Rating::Easy => self.easy,
        }
    }

    /// Iterate outcomes in rating order
    pub fn iter(&self) -> impl Iterator<Item = (Rating, &RecordLogItem)> {
        Rating::ALL.into_iter().map(move |rating| (rating, self.get(rating)))
    }
}

impl std::ops::Index<Rating> for RecordLog {
    type Output = RecordLogItem;

    fn index(&self, rating: Rating) -> &Self::Output {
        self.get(rating)
    }
}
