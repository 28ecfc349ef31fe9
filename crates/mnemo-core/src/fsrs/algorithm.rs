//! FSRS-5 memory model
//!
//! Closed-form forgetting curve plus stability and difficulty updates.
//! Every function here is pure: same inputs, same output, no clock.
//!
//! The plain functions use the canonical FSRS-5 weights; the
//! `*_with_weights` variants take any 19-weight vector so a recalibrated
//! parameter set can be swapped in without touching the state machine.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::parameters::FSRSParameters;
use crate::card::Rating;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Number of model weights
pub const WEIGHT_COUNT: usize = 19;

/// Canonical FSRS-5 weights
pub const FSRS5_WEIGHTS: [f64; WEIGHT_COUNT] = [
    0.40255, 1.18385, 3.173, 15.69105, // w0-w3: initial stability per rating
    7.1949, 0.5345, // w4-w5: initial difficulty
    1.4604, 0.0046, // w6-w7: difficulty step, mean reversion
    1.54575, 0.1192, 1.01925, // w8-w10: recall stability growth
    1.9395, 0.11, 0.29605, 2.2698, // w11-w14: post-lapse stability
    0.2315, 2.9898, // w15-w16: hard penalty, easy bonus
    0.51655, 0.6621, // w17-w18: same-day stability
];

/// Forgetting curve exponent
pub const DECAY: f64 = -0.5;

/// Curve scale chosen so that R(S, S) = 0.9: `0.9^(1/DECAY) - 1`
pub const FACTOR: f64 = 19.0 / 81.0;

/// Default target probability of recall at the due date
pub const DEFAULT_RETENTION: f64 = 0.9;

/// Default longest interval in days (100 years)
pub const DEFAULT_MAXIMUM_INTERVAL: u32 = 36_500;

/// Lower stability bound
pub const MIN_STABILITY: f64 = 0.01;

/// Upper stability bound
pub const MAX_STABILITY: f64 = 36_500.0;

/// Lower difficulty bound
pub const MIN_DIFFICULTY: f64 = 1.0;

/// Upper difficulty bound
pub const MAX_DIFFICULTY: f64 = 10.0;

/// Fuzz bands: (start_days, end_days, factor)
const FUZZ_RANGES: [(f64, f64, f64); 3] = [
    (2.5, 7.0, 0.15),
    (7.0, 20.0, 0.1),
    (20.0, f64::INFINITY, 0.05),
];

// ============================================================================
// CORE FORMULAS
// ============================================================================

fn grade(rating: Rating) -> f64 {
    rating.value() as f64
}

/// Clamp a stability into the model's range
#[inline]
pub fn clamp_stability(stability: f64) -> f64 {
    stability.clamp(MIN_STABILITY, MAX_STABILITY)
}

/// Clamp a difficulty into the model's range
#[inline]
pub fn clamp_difficulty(difficulty: f64) -> f64 {
    difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

/// `value.min(cap)`, except a NaN `value` is kept so range checks can see it
#[inline]
fn cap_at(value: f64, cap: f64) -> f64 {
    if value.is_nan() {
        value
    } else {
        value.min(cap)
    }
}

/// Probability of recall after `elapsed_days` for a given stability
///
/// R = (1 + FACTOR * t / S)^DECAY, exactly 1.0 at t = 0.
pub fn retrievability(stability: f64, elapsed_days: f64) -> f64 {
    if elapsed_days <= 0.0 {
        return 1.0;
    }
    let stability = stability.max(MIN_STABILITY);
    (1.0 + FACTOR * elapsed_days / stability).powf(DECAY)
}

/// Initial stability for a new card
pub fn initial_stability(rating: Rating) -> f64 {
    initial_stability_with_weights(&FSRS5_WEIGHTS, rating)
}

/// Initial stability with custom weights
pub fn initial_stability_with_weights(w: &[f64; WEIGHT_COUNT], rating: Rating) -> f64 {
    clamp_stability(w[rating as usize - 1])
}

/// Initial difficulty for a new card
pub fn initial_difficulty(rating: Rating) -> f64 {
    initial_difficulty_with_weights(&FSRS5_WEIGHTS, rating)
}

/// Initial difficulty with custom weights
///
/// D0(G) = w4 - e^(w5 * (G - 1)) + 1
pub fn initial_difficulty_with_weights(w: &[f64; WEIGHT_COUNT], rating: Rating) -> f64 {
    clamp_difficulty(w[4] - (w[5] * (grade(rating) - 1.0)).exp() + 1.0)
}

/// Next difficulty after a review
pub fn next_difficulty(difficulty: f64, rating: Rating) -> f64 {
    next_difficulty_with_weights(&FSRS5_WEIGHTS, difficulty, rating)
}

/// Next difficulty with custom weights
///
/// Linear damping shrinks the step as difficulty approaches 10, then the
/// result is pulled towards D0(Easy) by w7.
pub fn next_difficulty_with_weights(
    w: &[f64; WEIGHT_COUNT],
    difficulty: f64,
    rating: Rating,
) -> f64 {
    let delta = -w[6] * (grade(rating) - 3.0);
    let damped = difficulty + delta * (10.0 - difficulty) / 9.0;
    let target = initial_difficulty_with_weights(w, Rating::Easy);
    clamp_difficulty(w[7] * target + (1.0 - w[7]) * damped)
}

/// Stability after a successful recall
pub fn next_recall_stability(
    difficulty: f64,
    stability: f64,
    retrievability: f64,
    rating: Rating,
) -> f64 {
    next_recall_stability_with_weights(
        &FSRS5_WEIGHTS,
        difficulty,
        stability,
        retrievability,
        rating,
    )
}

/// Stability after a successful recall, custom weights
///
/// Growth is larger for low retrievability: recalling a card that was
/// nearly forgotten is stronger evidence than recalling a fresh one.
pub fn next_recall_stability_with_weights(
    w: &[f64; WEIGHT_COUNT],
    difficulty: f64,
    stability: f64,
    retrievability: f64,
    rating: Rating,
) -> f64 {
    let hard_penalty = if rating == Rating::Hard { w[15] } else { 1.0 };
    let easy_bonus = if rating == Rating::Easy { w[16] } else { 1.0 };
    let growth = w[8].exp()
        * (11.0 - difficulty)
        * stability.powf(-w[9])
        * ((w[10] * (1.0 - retrievability)).exp() - 1.0)
        * hard_penalty
        * easy_bonus;
    clamp_stability(stability * (1.0 + growth))
}

/// Stability after forgetting
pub fn next_forget_stability(difficulty: f64, stability: f64, retrievability: f64) -> f64 {
    next_forget_stability_with_weights(&FSRS5_WEIGHTS, difficulty, stability, retrievability)
}

/// Stability after forgetting, custom weights
///
/// Never exceeds the stability held before the lapse. A NaN result is
/// returned as NaN.
pub fn next_forget_stability_with_weights(
    w: &[f64; WEIGHT_COUNT],
    difficulty: f64,
    stability: f64,
    retrievability: f64,
) -> f64 {
    let forget = w[11]
        * difficulty.powf(-w[12])
        * ((stability + 1.0).powf(w[13]) - 1.0)
        * (w[14] * (1.0 - retrievability)).exp();
    clamp_stability(cap_at(forget, stability))
}

/// Stability after a same-day review
pub fn same_day_stability(stability: f64, rating: Rating) -> f64 {
    same_day_stability_with_weights(&FSRS5_WEIGHTS, stability, rating)
}

/// Stability after a same-day review, custom weights
///
/// S' = S * e^(w17 * (G - 3 + w18)); Again never raises stability.
pub fn same_day_stability_with_weights(
    w: &[f64; WEIGHT_COUNT],
    stability: f64,
    rating: Rating,
) -> f64 {
    let next = stability * (w[17] * (grade(rating) - 3.0 + w[18])).exp();
    if rating == Rating::Again {
        clamp_stability(cap_at(next, stability))
    } else {
        clamp_stability(next)
    }
}

/// Multiplier turning stability into an interval for a target retention
///
/// Equals 1.0 at the default 0.9 retention.
pub fn interval_modifier(request_retention: f64) -> f64 {
    (request_retention.powf(1.0 / DECAY) - 1.0) / FACTOR
}

/// Whole-day interval for a stability at the default retention
pub fn next_interval(stability: f64, maximum_interval: u32) -> u32 {
    next_interval_with_retention(stability, DEFAULT_RETENTION, maximum_interval)
}

/// Whole-day interval for a stability and target retention, clamped to [1, max]
pub fn next_interval_with_retention(
    stability: f64,
    request_retention: f64,
    maximum_interval: u32,
) -> u32 {
    let raw = stability * interval_modifier(request_retention);
    clamp_interval(raw.round(), maximum_interval)
}

fn clamp_interval(days: f64, maximum_interval: u32) -> u32 {
    let max = maximum_interval.max(1);
    if !days.is_finite() || days >= max as f64 {
        return max;
    }
    (days.max(1.0)) as u32
}

// ============================================================================
// FUZZ
// ============================================================================

/// Inclusive range an interval may be fuzzed into
pub fn fuzz_range(interval: f64, elapsed_days: u32, maximum_interval: u32) -> (u32, u32) {
    let max = maximum_interval.max(1) as f64;
    let interval = interval.min(max);

    let mut delta = 1.0;
    for (start, end, factor) in FUZZ_RANGES {
        delta += factor * (interval.min(end) - start).max(0.0);
    }

    let mut min_ivl = (interval - delta).round().max(2.0);
    let max_ivl = (interval + delta).round().min(max);
    if interval > elapsed_days as f64 {
        min_ivl = min_ivl.max(elapsed_days as f64 + 1.0);
    }
    min_ivl = min_ivl.min(max_ivl);
    (min_ivl as u32, max_ivl as u32)
}

/// Apply seeded jitter to an unrounded interval
///
/// Intervals under 2.5 days are only rounded. The result always stays in
/// [1, maximum_interval].
pub fn fuzz_interval(interval: f64, elapsed_days: u32, maximum_interval: u32, seed: u64) -> u32 {
    if interval < 2.5 {
        return clamp_interval(interval.round(), maximum_interval);
    }
    let (min_ivl, max_ivl) = fuzz_range(interval, elapsed_days, maximum_interval);
    let mut rng = StdRng::seed_from_u64(seed);
    let fuzzed = rng.gen_range(min_ivl..=max_ivl);
    clamp_interval(fuzzed as f64, maximum_interval)
}

// ============================================================================
// MEMORY MODEL
// ============================================================================

/// The memory model bound to one parameter set
///
/// Stateless apart from its configuration; cheap to clone and safe to share
/// across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryModel {
    weights: [f64; WEIGHT_COUNT],
    request_retention: f64,
    maximum_interval: u32,
    enable_fuzz: bool,
    enable_short_term: bool,
    interval_modifier: f64,
}

impl MemoryModel {
    /// Bind the model to a parameter set
    pub fn new(params: &FSRSParameters) -> Self {
        Self {
            weights: params.w,
            request_retention: params.request_retention,
            maximum_interval: params.maximum_interval,
            enable_fuzz: params.enable_fuzz,
            enable_short_term: params.enable_short_term,
            interval_modifier: interval_modifier(params.request_retention),
        }
    }

    /// Weight vector in use
    pub fn weights(&self) -> &[f64; WEIGHT_COUNT] {
        &self.weights
    }

    /// Target retention in use
    pub fn request_retention(&self) -> f64 {
        self.request_retention
    }

    /// Longest interval in days
    pub fn maximum_interval(&self) -> u32 {
        self.maximum_interval
    }

    /// Whether same-day reviews use the short-term formula
    pub fn short_term_enabled(&self) -> bool {
        self.enable_short_term
    }

    /// Starting stability for a brand-new card
    pub fn initial_stability(&self, rating: Rating) -> f64 {
        initial_stability_with_weights(&self.weights, rating)
    }

    /// Starting difficulty for a brand-new card
    pub fn initial_difficulty(&self, rating: Rating) -> f64 {
        initial_difficulty_with_weights(&self.weights, rating)
    }

    /// Mean-reverting difficulty update
    pub fn next_difficulty(&self, difficulty: f64, rating: Rating) -> f64 {
        next_difficulty_with_weights(&self.weights, difficulty, rating)
    }

    /// Forgetting curve
    pub fn retrievability(&self, stability: f64, elapsed_days: u32) -> f64 {
        retrievability(stability, elapsed_days as f64)
    }

    /// Stability update for a reviewed card
    ///
    /// Same-day reviews (with short-term on) take the short-term formula,
    /// Again takes the forgetting branch, everything else grows stability.
    pub fn next_stability(
        &self,
        stability: f64,
        difficulty: f64,
        retrievability: f64,
        elapsed_days: u32,
        rating: Rating,
    ) -> f64 {
        let w = &self.weights;
        if elapsed_days == 0 && self.enable_short_term {
            return same_day_stability_with_weights(w, stability, rating);
        }
        match rating {
            Rating::Again => {
                let forget =
                    next_forget_stability_with_weights(w, difficulty, stability, retrievability);
                if self.enable_short_term {
                    let floor_ratio = (w[17] * w[18]).exp();
                    clamp_stability(cap_at(forget, stability / floor_ratio))
                } else {
                    forget
                }
            }
            _ => {
                next_recall_stability_with_weights(w, difficulty, stability, retrievability, rating)
            }
        }
    }

    /// Interval before fuzz, unrounded but clamped to [1, max]
    pub fn raw_interval(&self, stability: f64) -> f64 {
        (stability * self.interval_modifier).clamp(1.0, self.maximum_interval.max(1) as f64)
    }

    /// Whole-day interval for a stability
    ///
    /// `fuzz_seed` is only consulted when fuzz is enabled.
    pub fn next_interval(&self, stability: f64, elapsed_days: u32, fuzz_seed: u64) -> u32 {
        let raw = stability * self.interval_modifier;
        if self.enable_fuzz {
            fuzz_interval(
                self.raw_interval(stability),
                elapsed_days,
                self.maximum_interval,
                fuzz_seed,
            )
        } else {
            clamp_interval(raw.round(), self.maximum_interval)
        }
    }
}

impl Default for MemoryModel {
    fn default() -> Self {
        Self::new(&FSRSParameters::default())
    }
}

// ============================================================================
// TESTS
// ============================================================================
