//! FSRS-5 (Free Spaced Repetition Scheduler) Module
//!
//! Two layers:
//! - `algorithm`: the memory model, pure closed-form functions of
//!   stability, difficulty, elapsed time and rating
//! - `scheduler`: the state machine that turns a card and a review time into
//!   four candidate next states
//!
//! Reference: https://github.com/open-spaced-repetition/fsrs4anki
//!
//! ## Core Formulas:
//! - Retrievability: R = (1 + FACTOR * t / S)^(-0.5) where FACTOR = 19/81
//! - Interval: t = S/FACTOR * (R^(1/-0.5) - 1), equal to S at R = 0.9

mod algorithm;
mod error;
mod parameters;
mod scheduler;

pub use algorithm::{
    clamp_difficulty,
    clamp_stability,
    fuzz_interval,
    fuzz_range,
    initial_difficulty,
    initial_difficulty_with_weights,
    initial_stability,
    initial_stability_with_weights,
    interval_modifier,
    next_difficulty,
    next_difficulty_with_weights,
    next_forget_stability,
    next_forget_stability_with_weights,
    next_interval,
    next_interval_with_retention,
    next_recall_stability,
    next_recall_stability_with_weights,
    // Core functions
    retrievability,
    same_day_stability,
    same_day_stability_with_weights,
    MemoryModel,
    DECAY,
    DEFAULT_MAXIMUM_INTERVAL,
    DEFAULT_RETENTION,
    FACTOR,
    // Constants
    FSRS5_WEIGHTS,
    MAX_DIFFICULTY,
    MAX_STABILITY,
    MIN_DIFFICULTY,
    MIN_STABILITY,
    WEIGHT_COUNT,
};

pub use error::{Result, SchedulerError};

pub use parameters::{
    ConfigError, FSRSParameters, StepDuration, ENV_ENABLE_FUZZ, ENV_ENABLE_SHORT_TERM,
    ENV_MAXIMUM_INTERVAL, ENV_REQUEST_RETENTION,
};

pub use scheduler::FSRSScheduler;
