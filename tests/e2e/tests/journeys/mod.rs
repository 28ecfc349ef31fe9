//! Journey Tests
//!
//! Whole-deck workflows spanning many sessions:
//! - Several learners sharing one database
//! - A month of daily study sessions
//! - Schedules surviving a restart

use chrono::Duration;
use mnemo_core::{CardState, FSRSParameters, Rating};
use mnemo_e2e_tests::harness::{TestDatabaseManager, DEFAULT_USER};
use mnemo_e2e_tests::mocks::{BatchConfig, TestDataFactory};


#[test]
fn test_learners_never_see_each_others_cards() {
    let db = TestDatabaseManager::new_temp();
    let alice = TestDataFactory::create_batch_with_config(
        &db.storage,
        BatchConfig {
            count: 4,
            user_id: "alice".to_string(),
            ..Default::default()
        },
    );
    let bob = TestDataFactory::create_batch_with_config(
        &db.storage,
        BatchConfig {
            count: 2,
            user_id: "bob".to_string(),
            ..Default::default()
        },
    );
    let now = db.epoch() + Duration::hours(1);

    let alice_due = db.storage.due_cards("alice", now, 20, 100).unwrap();
    let bob_due = db.storage.due_cards("bob", now, 20, 100).unwrap();

    assert_eq!(alice_due.len(), alice.len());
    assert_eq!(bob_due.len(), bob.len());
    assert!(alice_due.iter().all(|c| c.user_id == "alice"));
    assert_eq!(db.card_count("alice"), 4);
    assert_eq!(db.card_count("bob"), 2);
    assert!(db.is_empty("carol"));
}

#[test]
fn test_a_month_of_daily_sessions() {
    let db = TestDatabaseManager::new_temp();
    let ids = TestDataFactory::create_batch(&db.storage, 30);
    let start = db.epoch();

    let mut answered = 0;
    for day in 0..30 {
        let session = start + Duration::days(day);
        // Work the queue until nothing is left for this session
        for _ in 0..10 {
            let queue = db.storage.due_cards(DEFAULT_USER, session, 5, 50).unwrap();
            if queue.is_empty() {
                break;
            }
            for card in queue {
                // Every fourth answer is a miss
                let rating = if answered % 4 == 3 { Rating::Again } else { Rating::Good };
                let at = session.max(card.card.due);
                db.storage.review_card(&card.id, rating, at, None).unwrap();
                answered += 1;
            }
        }
    }

    let stats = db.storage.deck_stats(DEFAULT_USER, start + Duration::days(30)).unwrap();
    assert_eq!(stats.total, ids.len() as i64);
    assert!(stats.new_cards < ids.len() as i64);
    assert!(stats.review > 0);
    assert!(stats.average_retrievability > 0.0 && stats.average_retrievability <= 1.0);

    for id in &ids {
        let card = db.get(id);
        let logs = db.storage.review_logs(id).unwrap();
        assert_eq!(card.card.reps as usize, logs.len());
        assert_eq!(card.version as usize, logs.len() + 1);
        assert!(card.card.stability.is_finite());
        assert!((1.0..=10.0).contains(&card.card.difficulty) || card.card.state == CardState::New);
    }
}

#[test]
fn test_schedule_survives_restart() {
    let mut db = TestDatabaseManager::new_temp();
    let ids = db.seed_with_states(DEFAULT_USER);
    let before: Vec<_> = ids.iter().map(|id| db.get(id)).collect();

    db.reopen();

    let after: Vec<_> = ids.iter().map(|id| db.get(id)).collect();
    assert_eq!(before, after);

    // Reviewing after the restart continues from the stored state
    let relearning = &after[3];
    let outcome = db
        .storage
        .review_card(&relearning.id, Rating::Good, relearning.card.due, None)
        .unwrap();
    assert_eq!(outcome.card.card.state, CardState::Review);
    assert_eq!(outcome.card.card.reps, relearning.card.reps + 1);
}

#[test]
fn test_long_term_only_schedules_whole_days() {
    let db = TestDatabaseManager::with_parameters(FSRSParameters {
        enable_short_term: false,
        ..Default::default()
    });
    let id = db.seed_cards(DEFAULT_USER, 1).remove(0);

    let card = db.review_all(&id, &[Rating::Again, Rating::Good, Rating::Again], db.epoch());

    assert_eq!(card.card.state, CardState::Review);
    assert!(card.card.scheduled_days >= 1);
    for log in db.storage.review_logs(&id).unwrap() {
        assert_eq!(log.log.state_after, CardState::Review);
        assert!(log.log.scheduled_days >= 1);
    }
}

#[test]
fn test_json_shapes_for_clients() {
    let db = TestDatabaseManager::new_temp();
    let id = db.seed_cards(DEFAULT_USER, 1).remove(0);
    let outcome = db.storage.review_card(&id, Rating::Good, db.epoch(), Some(1_500)).unwrap();

    let card = serde_json::to_value(&outcome.card).unwrap();
    assert_eq!(card["userId"], DEFAULT_USER);
    assert_eq!(card["state"], "learning");
    assert_eq!(card["version"], 2);
    assert!(card["stability"].is_f64());

    let log = serde_json::to_value(&outcome.log).unwrap();
    assert_eq!(log["cardId"], id.as_str());
    assert_eq!(log["rating"], "good");
    assert_eq!(log["reviewDurationMs"], 1_500);

    let params = serde_json::to_value(FSRSParameters::default()).unwrap();
    assert_eq!(params["learningSteps"], serde_json::json!(["1m", "10m"]));
    assert_eq!(params["requestRetention"], 0.9);
}
