//! Review state machine
//!
//! Given a card and the review time, `FSRSScheduler::repeat` computes the
//! four candidate outcomes (one per rating) without committing to any of
//! them. `review` selects one. Nothing here touches a clock or storage.

use chrono::{DateTime, Duration, Utc};

use super::algorithm::{MemoryModel, MAX_DIFFICULTY, MAX_STABILITY, MIN_DIFFICULTY, MIN_STABILITY};
use super::error::{Result, SchedulerError};
use super::parameters::{FSRSParameters, StepDuration};
use crate::card::{Card, CardState, Rating, RecordLog, RecordLogItem, ReviewLog};

const FUZZ_SEED_MULTIPLIER: u64 = 0x9E37_79B9_7F4A_7C15;

// ============================================================================
// PLACEMENT
// ============================================================================

/// Where a rating sends the card next
#[derive(Debug, Clone, Copy, PartialEq)]
enum Placement {
    /// Sub-day learning or relearning step
    Step {
        state: CardState,
        index: u32,
        length: StepDuration,
    },
    /// Review state, whole-day interval
    Days(u32),
}

impl Placement {
    fn step(state: CardState, index: u32, length: StepDuration) -> Self {
        if length.spans_days() {
            Placement::Days(length.whole_days())
        } else {
            Placement::Step { state, index, length }
        }
    }

    fn days(&self) -> Option<u32> {
        match self {
            Placement::Days(days) => Some(*days),
            Placement::Step { .. } => None,
        }
    }
}

struct Outcome {
    stability: f64,
    difficulty: f64,
    placement: Placement,
}

// ============================================================================
// SCHEDULER
// ============================================================================

/// FSRS scheduler bound to one validated parameter set
#[derive(Debug, Clone)]
pub struct FSRSScheduler {
    params: FSRSParameters,
    model: MemoryModel,
}

impl Default for FSRSScheduler {
    fn default() -> Self {
        let params = FSRSParameters::default();
        Self {
            model: MemoryModel::new(&params),
            params,
        }
    }
}

impl FSRSScheduler {
    /// Create a scheduler, rejecting invalid parameters
    pub fn new(params: FSRSParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            model: MemoryModel::new(&params),
            params,
        })
    }

    /// Parameters in use
    pub fn parameters(&self) -> &FSRSParameters {
        &self.params
    }

    /// Underlying memory model
    pub fn model(&self) -> &MemoryModel {
        &self.model
    }

    /// Compute all four candidate outcomes of reviewing `card` at `now`
    pub fn repeat(&self, card: &Card, now: DateTime<Utc>) -> Result<RecordLog> {
        card.check_numeric()?;

        let elapsed_days = self.elapsed_days(card, now);
        if card.state == CardState::Review && now < card.due {
            tracing::debug!(
                due = %card.due,
                now = %now,
                "Early review, scheduling with {} elapsed days",
                elapsed_days
            );
        }

        let retrievability = if card.state == CardState::New {
            0.0
        } else {
            let r = self.model.retrievability(card.stability, elapsed_days);
            if !r.is_finite() || r <= 0.0 || r > 1.0 {
                return Err(SchedulerError::NumericDomain {
                    quantity: "retrievability",
                    value: r,
                });
            }
            r
        };

        let mut outcomes = Rating::ALL
            .map(|rating| self.outcome(card, now, rating, elapsed_days, retrievability));
        self.enforce_ordering(&mut outcomes);

        let [again, hard, good, easy] = Rating::ALL;
        let [o_again, o_hard, o_good, o_easy] = outcomes;
        Ok(RecordLog {
            again: self.build_item(card, now, again, elapsed_days, o_again)?,
            hard: self.build_item(card, now, hard, elapsed_days, o_hard)?,
            good: self.build_item(card, now, good, elapsed_days, o_good)?,
            easy: self.build_item(card, now, easy, elapsed_days, o_easy)?,
        })
    }

    /// Review `card` at `now` with the learner's rating
    pub fn review(&self, card: &Card, now: DateTime<Utc>, rating: Rating) -> Result<RecordLogItem> {
        Ok(self.repeat(card, now)?.into_item(rating))
    }

    /// Review with a raw numeric rating (1-4)
    pub fn review_with_value(
        &self,
        card: &Card,
        now: DateTime<Utc>,
        rating: i32,
    ) -> Result<RecordLogItem> {
        let rating = Rating::try_from(rating)?;
        self.review(card, now, rating)
    }

    /// Current probability of recall, 0 for cards never reviewed
    pub fn retrievability_of(&self, card: &Card, now: DateTime<Utc>) -> f64 {
        match card.last_review {
            Some(last) if card.state != CardState::New => {
                let days = (now - last).num_seconds().max(0) as f64 / 86_400.0;
                super::algorithm::retrievability(card.stability, days)
            }
            _ => 0.0,
        }
    }

    /// Undo the review described by `log`
    ///
    /// The log must belong to the card's most recent review.
    pub fn rollback(&self, card: &Card, log: &ReviewLog) -> Result<Card> {
        if card.last_review != Some(log.reviewed_at) {
            return Err(SchedulerError::LogMismatch(format!(
                "log reviewed at {} but card last reviewed at {:?}",
                log.reviewed_at, card.last_review
            )));
        }
        if card.state != log.state_after || card.reps == 0 {
            return Err(SchedulerError::LogMismatch(format!(
                "card is {} with {} reps, log left it {}",
                card.state, card.reps, log.state_after
            )));
        }

        let lapses = if log.is_lapse() {
            card.lapses.saturating_sub(1)
        } else {
            card.lapses
        };

        Ok(Card {
            state: log.state_before,
            due: log.due_before,
            stability: log.stability_before,
            difficulty: log.difficulty_before,
            elapsed_days: log.elapsed_days_before,
            scheduled_days: log.scheduled_days_before,
            reps: card.reps - 1,
            lapses,
            learning_steps: log.learning_steps_before,
            last_review: log.last_review_before,
        })
    }

    /// Reset a card to a fresh New card due at `now`
    pub fn forget(&self, card: &Card, now: DateTime<Utc>) -> Card {
        tracing::debug!(
            state = %card.state,
            reps = card.reps,
            lapses = card.lapses,
            "Resetting card to new"
        );
        Card::new(now)
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn elapsed_days(&self, card: &Card, now: DateTime<Utc>) -> u32 {
        match card.last_review {
            Some(last) if now < last => {
                tracing::warn!(
                    last_review = %last,
                    now = %now,
                    "Review time precedes last review, treating elapsed days as 0"
                );
                0
            }
            _ => card.days_since_review(now),
        }
    }

    fn outcome(
        &self,
        card: &Card,
        now: DateTime<Utc>,
        rating: Rating,
        elapsed_days: u32,
        retrievability: f64,
    ) -> Outcome {
        let (stability, difficulty) = if card.state == CardState::New {
            (
                self.model.initial_stability(rating),
                self.model.initial_difficulty(rating),
            )
        } else {
            (
                self.model.next_stability(
                    card.stability,
                    card.difficulty,
                    retrievability,
                    elapsed_days,
                    rating,
                ),
                self.model.next_difficulty(card.difficulty, rating),
            )
        };

        let placement = self.placement(card, now, rating, stability, elapsed_days);
        Outcome {
            stability,
            difficulty,
            placement,
        }
    }

    fn placement(
        &self,
        card: &Card,
        now: DateTime<Utc>,
        rating: Rating,
        stability: f64,
        elapsed_days: u32,
    ) -> Placement {
        let day_interval = || {
            let seed = fuzz_seed(card, now, rating);
            Placement::Days(self.model.next_interval(stability, elapsed_days, seed))
        };

        if !self.params.enable_short_term {
            return day_interval();
        }

        match card.state {
            CardState::New | CardState::Learning | CardState::Relearning => {
                let relearning = card.state == CardState::Relearning;
                let steps = self.params.steps_for(relearning);
                if steps.is_empty() {
                    return day_interval();
                }
                let step_state = if relearning {
                    CardState::Relearning
                } else {
                    CardState::Learning
                };
                let current = if card.state == CardState::New {
                    0
                } else {
                    (card.learning_steps as usize).min(steps.len() - 1)
                };

                match rating {
                    Rating::Again => Placement::step(step_state, 0, steps[0]),
                    Rating::Hard => {
                        let length = if current == 0 {
                            hard_first_step(steps)
                        } else {
                            steps[current]
                        };
                        Placement::step(step_state, current as u32, length)
                    }
                    Rating::Good => match steps.get(current + 1) {
                        Some(next) => Placement::step(step_state, (current + 1) as u32, *next),
                        None => day_interval(),
                    },
                    Rating::Easy => day_interval(),
                }
            }
            CardState::Review => match (rating, self.params.relearning_steps.first()) {
                (Rating::Again, Some(first)) => Placement::step(CardState::Relearning, 0, *first),
                _ => day_interval(),
            },
        }
    }

    /// Again <= Hard < Good < Easy among outcomes that land in Review,
    /// then clamp to [1, maximum_interval]
    fn enforce_ordering(&self, outcomes: &mut [Outcome; 4]) {
        let mut days = [
            outcomes[0].placement.days(),
            outcomes[1].placement.days(),
            outcomes[2].placement.days(),
            outcomes[3].placement.days(),
        ];

        if let (Some(hard), Some(good)) = (days[1], days[2]) {
            days[1] = Some(hard.min(good));
        }
        if let (Some(hard), Some(good)) = (days[1], days[2]) {
            days[2] = Some(good.max(hard + 1));
        }
        if let (Some(good), Some(easy)) = (days[2], days[3]) {
            days[3] = Some(easy.max(good + 1));
        }
        if let (Some(again), Some(hard)) = (days[0], days[1]) {
            days[0] = Some(again.min(hard));
        }

        let max = self.params.maximum_interval.max(1);
        for (outcome, interval) in outcomes.iter_mut().zip(days) {
            if let Some(interval) = interval {
                outcome.placement = Placement::Days(interval.clamp(1, max));
            }
        }
    }

    fn build_item(
        &self,
        card: &Card,
        now: DateTime<Utc>,
        rating: Rating,
        elapsed_days: u32,
        outcome: Outcome,
    ) -> Result<RecordLogItem> {
        check_range("stability", outcome.stability, MIN_STABILITY, MAX_STABILITY)?;
        check_range("difficulty", outcome.difficulty, MIN_DIFFICULTY, MAX_DIFFICULTY)?;

        let (state, scheduled_days, due, learning_steps) = match outcome.placement {
            Placement::Step {
                state,
                index,
                length,
            } => (state, 0, now + length.as_duration(), index),
            Placement::Days(days) => {
                (CardState::Review, days, now + Duration::days(days as i64), 0)
            }
        };

        let lapses = if card.state == CardState::Review && rating == Rating::Again {
            card.lapses.saturating_add(1)
        } else {
            card.lapses
        };

        let next = Card {
            state,
            due,
            stability: outcome.stability,
            difficulty: outcome.difficulty,
            elapsed_days,
            scheduled_days,
            reps: card.reps.saturating_add(1),
            lapses,
            learning_steps,
            last_review: Some(now),
        };

        let log = ReviewLog {
            rating,
            reviewed_at: now,
            elapsed_days,
            scheduled_days,
            state_before: card.state,
            state_after: next.state,
            stability_before: card.stability,
            stability_after: next.stability,
            difficulty_before: card.difficulty,
            difficulty_after: next.difficulty,
            due_before: card.due,
            last_review_before: card.last_review,
            elapsed_days_before: card.elapsed_days,
            scheduled_days_before: card.scheduled_days,
            learning_steps_before: card.learning_steps,
            review_duration_ms: None,
        };

        Ok(RecordLogItem { card: next, log })
    }
}

/// Hard on the first step: halfway to the second step, or 1.5x a lone step
fn hard_first_step(steps: &[StepDuration]) -> StepDuration {
    let first = steps[0].seconds() as u64;
    let seconds = match steps.get(1) {
        Some(second) => (first + second.seconds() as u64) / 2,
        None => first * 3 / 2,
    };
    StepDuration::from_seconds(seconds.min(u32::MAX as u64) as u32)
}

fn fuzz_seed(card: &Card, now: DateTime<Utc>, rating: Rating) -> u64 {
    (now.timestamp_millis() as u64).wrapping_mul(FUZZ_SEED_MULTIPLIER)
        ^ ((card.reps as u64) << 32)
        ^ (card.difficulty * card.stability).to_bits()
        ^ rating.value() as u64
}

fn check_range(quantity: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(SchedulerError::NumericDomain { quantity, value })
    }
}

// ============================================================================
// TESTS
// ============================================================================
