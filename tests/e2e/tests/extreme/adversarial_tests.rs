//! Adversarial Tests
//!
//! Hostile input and damaged data:
//! - Out-of-range ratings and unknown states
//! - Rows corrupted behind the store's back
//! - Clock skew and absurd parameters

use chrono::Duration;
use mnemo_core::{
    Card, CardState, FSRSParameters, FSRSScheduler, NewCardInput, Rating, SchedulerError, Storage,
    StepDuration, StorageError,
};
use mnemo_e2e_tests::harness::{TestDatabaseManager, DEFAULT_USER};
use mnemo_e2e_tests::mocks::TestDataFactory;
use rusqlite::{params, Connection};


fn corrupt(db: &TestDatabaseManager, sql: &str, id: &str) {
    let conn = Connection::open(db.path()).unwrap();
    let changed = conn.execute(sql, params![id]).unwrap();
    assert_eq!(changed, 1);
}

// ============================================================================
// RATINGS AND STATES
// ============================================================================

#[test]
fn test_out_of_range_ratings_are_rejected() {
    let scheduler = FSRSScheduler::default();
    let t = TestDataFactory::epoch();
    let card = Card::new(t);

    for value in [0, 5, -1, i32::MAX, i32::MIN] {
        let err = scheduler.review_with_value(&card, t, value).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidRating(v) if v == value));
        assert!(Rating::try_from(value).is_err());
    }
    for value in 1..=4 {
        assert!(scheduler.review_with_value(&card, t, value).is_ok());
    }
}

#[test]
fn test_unknown_state_names_are_rejected() {
    for name in ["", "graduated", "suspended", "re-view", "4"] {
        let err = name.parse::<CardState>().unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownCardState(_)));
    }
}

#[test]
fn test_stored_unknown_state_surfaces_as_error() {
    let db = TestDatabaseManager::new_temp();
    let id = db.seed_cards(DEFAULT_USER, 1).remove(0);
    corrupt(&db, "UPDATE cards SET state = 'graduated' WHERE id = ?1", &id);

    let err = db.storage.get_card(&id).unwrap_err();
    assert!(matches!(
        err,
        StorageError::Scheduler(SchedulerError::UnknownCardState(ref s)) if s == "graduated"
    ));

    let err = db.storage.review_card(&id, Rating::Good, db.epoch(), None).unwrap_err();
    assert!(matches!(err, StorageError::Scheduler(SchedulerError::UnknownCardState(_))));
    assert!(!err.is_retryable());
}

// ============================================================================
// CORRUPTED ROWS
// ============================================================================

#[test]
fn test_nonpositive_stability_blocks_the_review() {
    let db = TestDatabaseManager::new_temp();
    let id = db.seed_cards(DEFAULT_USER, 1).remove(0);
    let graduated = db.review_all(&id, &[Rating::Good, Rating::Good], db.epoch());
    corrupt(&db, "UPDATE cards SET stability = -3.0 WHERE id = ?1", &id);

    let err = db
        .storage
        .review_card(&id, Rating::Good, graduated.card.due, None)
        .unwrap_err();

    assert!(matches!(
        err,
        StorageError::Scheduler(SchedulerError::NumericDomain { quantity: "stability", .. })
    ));
    // Nothing was written
    let stored = db.get(&id);
    assert_eq!(stored.version, graduated.version);
    assert_eq!(db.storage.review_logs(&id).unwrap().len(), 2);
}

#[test]
fn test_out_of_range_difficulty_blocks_the_lapse() {
    let db = TestDatabaseManager::with_parameters(FSRSParameters {
        enable_short_term: false,
        ..Default::default()
    });
    let id = db.seed_cards(DEFAULT_USER, 1).remove(0);
    let graduated = db.review_all(&id, &[Rating::Good], db.epoch());
    corrupt(&db, "UPDATE cards SET difficulty = -1.0 WHERE id = ?1", &id);
    let at = graduated.card.due + Duration::days(20);

    let err = db.storage.review_card(&id, Rating::Again, at, None).unwrap_err();

    assert!(matches!(
        err,
        StorageError::Scheduler(SchedulerError::NumericDomain { quantity: "difficulty", .. })
    ));
    let stored = db.get(&id);
    assert_eq!(stored.version, graduated.version);
    assert_eq!(stored.card.stability, graduated.card.stability);
    assert_eq!(db.storage.review_logs(&id).unwrap().len(), 1);
}

#[test]
fn test_garbled_timestamp_is_reported() {
    let db = TestDatabaseManager::new_temp();
    let id = db.seed_cards(DEFAULT_USER, 1).remove(0);
    corrupt(&db, "UPDATE cards SET due = 'next tuesday' WHERE id = ?1", &id);

    let err = db.storage.get_card(&id).unwrap_err();
    assert!(matches!(err, StorageError::InvalidTimestamp(ref msg) if msg.contains("next tuesday")));
}

#[test]
fn test_hostile_content_is_stored_verbatim() {
    let db = TestDatabaseManager::new_temp();
    let front = "'); DROP TABLE cards; --";
    let back = "Ünïcödé 🦀 \n\t";

    let card = db
        .storage
        .add_card(NewCardInput {
            user_id: DEFAULT_USER.to_string(),
            front: front.to_string(),
            back: back.to_string(),
            created_at: Some(db.epoch()),
        })
        .unwrap();

    let stored = db.get(&card.id);
    assert_eq!(stored.front, front);
    assert_eq!(stored.back, back);
    assert_eq!(db.card_count(DEFAULT_USER), 1);
}

#[test]
fn test_blank_input_is_rejected() {
    let db = TestDatabaseManager::new_temp();
    let cases = [
        ("", "front"),
        ("  ", "front"),
        (DEFAULT_USER, ""),
        (DEFAULT_USER, " \n "),
    ];
    for (user_id, front) in cases {
        let err = db
            .storage
            .add_card(NewCardInput {
                user_id: user_id.to_string(),
                front: front.to_string(),
                back: "back".to_string(),
                created_at: None,
            })
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidInput(_)));
    }
    assert!(db.is_empty(DEFAULT_USER));
}

#[test]
fn test_unknown_card_ids() {
    let db = TestDatabaseManager::new_temp();
    let t = db.epoch();

    assert!(db.storage.get_card("no-such-card").unwrap().is_none());
    assert!(matches!(
        db.storage.preview_card("no-such-card", t).unwrap_err(),
        StorageError::NotFound(_)
    ));
    assert!(matches!(
        db.storage.reset_card("no-such-card", t).unwrap_err(),
        StorageError::NotFound(_)
    ));
    assert!(!db.storage.soft_delete("no-such-card", t).unwrap());
    assert!(db.storage.review_logs("no-such-card").unwrap().is_empty());
}

// ============================================================================
// CLOCKS
// ============================================================================

#[test]
fn test_review_before_last_review_is_treated_as_same_day() {
    let db = TestDatabaseManager::new_temp();
    let id = db.seed_cards(DEFAULT_USER, 1).remove(0);
    let graduated = db.review_all(&id, &[Rating::Good, Rating::Good], db.epoch());
    let skewed = db.epoch() - Duration::days(3);

    let outcome = db.storage.review_card(&id, Rating::Good, skewed, None).unwrap();

    assert_eq!(outcome.log.log.elapsed_days, 0);
    assert_eq!(outcome.card.card.last_review, Some(skewed));
    assert!(outcome.card.card.due > skewed);
    assert_eq!(outcome.card.version, graduated.version + 1);
}

#[test]
fn test_century_old_card_still_schedules() {
    let scheduler = FSRSScheduler::default();
    let now = TestDataFactory::epoch();
    let ancient = TestDataFactory::review_state(now, 2.0, 9.5, 36_500);

    let log = scheduler.repeat(&ancient, now).unwrap();
    for (_, item) in log.iter() {
        assert!(item.card.stability.is_finite() && item.card.stability > 0.0);
        assert!(item.card.scheduled_days <= scheduler.parameters().maximum_interval);
    }
}

// ============================================================================
// PARAMETERS
// ============================================================================

#[test]
fn test_absurd_parameters_are_refused() {
    let mut nan_weights = FSRSParameters::default();
    nan_weights.w[8] = f64::NAN;
    let mut zero_initial = FSRSParameters::default();
    zero_initial.w[0] = 0.0;

    let cases = [
        FSRSParameters { request_retention: 0.0, ..Default::default() },
        FSRSParameters { request_retention: 1.0, ..Default::default() },
        FSRSParameters { request_retention: f64::NAN, ..Default::default() },
        FSRSParameters { maximum_interval: 0, ..Default::default() },
        FSRSParameters {
            learning_steps: vec![StepDuration::from_seconds(0)],
            ..Default::default()
        },
        nan_weights,
        zero_initial,
    ];

    for params in cases {
        assert!(matches!(
            FSRSScheduler::new(params.clone()),
            Err(SchedulerError::InvalidParameters(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        let opened = Storage::with_parameters(Some(dir.path().join("bad.db")), params);
        assert!(matches!(
            opened,
            Err(StorageError::Scheduler(SchedulerError::InvalidParameters(_)))
        ));
        assert!(!dir.path().join("bad.db").exists());
    }
}

#[test]
fn test_one_day_cap_holds_every_outcome() {
    let db = TestDatabaseManager::with_parameters(FSRSParameters {
        maximum_interval: 1,
        ..Default::default()
    });
    let id = db.seed_cards(DEFAULT_USER, 1).remove(0);
    let card = db.review_all(
        &id,
        &[Rating::Easy, Rating::Easy, Rating::Good, Rating::Hard, Rating::Easy],
        db.epoch(),
    );

    assert_eq!(card.card.scheduled_days, 1);
    for log in db.storage.review_logs(&id).unwrap() {
        assert!(log.log.scheduled_days <= 1);
    }
}
