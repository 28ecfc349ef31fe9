//! Journey: author cards, study them, and watch the schedule grow
//!
//! Walks one learner from a fresh deck through learning steps into
//! day-scale review, checking the queue, previews and history on the way.

use chrono::Duration;
use mnemo_core::{CardState, Rating};
use mnemo_e2e_tests::harness::{TestDatabaseManager, DEFAULT_USER};
use mnemo_e2e_tests::mocks::TestDataFactory;


// ============================================================================
// FIRST SESSION
// ============================================================================

#[test]
fn test_new_deck_is_studied_oldest_first() {
    let db = TestDatabaseManager::new_temp();
    let ids = db.seed_cards(DEFAULT_USER, 3);
    let now = db.epoch() + Duration::hours(1);

    let due = db.storage.due_cards(DEFAULT_USER, now, 20, 100).unwrap();
    let due_ids: Vec<_> = due.iter().map(|c| c.id.clone()).collect();

    assert_eq!(due_ids, ids);
    assert!(due.iter().all(|c| c.card.state == CardState::New));
}

#[test]
fn test_first_answers_walk_the_learning_steps() {
    let db = TestDatabaseManager::new_temp();
    let id = db.seed_cards(DEFAULT_USER, 1).remove(0);
    let t = db.epoch();

    let first = db.storage.review_card(&id, Rating::Good, t, Some(4_200)).unwrap();
    assert_eq!(first.card.card.state, CardState::Learning);
    assert_eq!(first.card.card.due, t + Duration::minutes(10));
    assert_eq!(first.card.card.scheduled_days, 0);
    assert_eq!(first.log.log.review_duration_ms, Some(4_200));

    // Not due again until the step elapses
    let queue = db.storage.due_cards(DEFAULT_USER, t + Duration::minutes(5), 20, 100).unwrap();
    assert!(queue.is_empty());

    let second = db
        .storage
        .review_card(&id, Rating::Good, first.card.card.due, None)
        .unwrap();
    assert_eq!(second.card.card.state, CardState::Review);
    assert!(second.card.card.scheduled_days >= 1);
    assert_eq!(
        second.card.card.due,
        first.card.card.due + Duration::days(second.card.card.scheduled_days as i64)
    );
    assert_eq!(second.card.version, first.card.version + 1);
}

#[test]
fn test_easy_on_a_new_card_skips_learning() {
    let db = TestDatabaseManager::new_temp();
    let id = db.seed_cards(DEFAULT_USER, 1).remove(0);

    let outcome = db.storage.review_card(&id, Rating::Easy, db.epoch(), None).unwrap();

    assert_eq!(outcome.card.card.state, CardState::Review);
    assert_eq!(outcome.card.card.scheduled_days, 16);
    assert_eq!(outcome.card.card.learning_steps, 0);
}

// ============================================================================
// PREVIEW
// ============================================================================

#[test]
fn test_preview_shows_every_choice_without_writing() {
    let db = TestDatabaseManager::new_temp();
    let id = db.seed_cards(DEFAULT_USER, 1).remove(0);
    let t = db.epoch();
    let before = db.get(&id);

    let preview = db.storage.preview_card(&id, t).unwrap();

    assert_eq!(preview[Rating::Again].card.due, t + Duration::minutes(1));
    // Halfway between the 1m and 10m steps
    assert_eq!(preview[Rating::Hard].card.due, t + Duration::seconds(330));
    assert_eq!(preview[Rating::Good].card.due, t + Duration::minutes(10));
    assert_eq!(preview[Rating::Easy].card.state, CardState::Review);

    assert_eq!(db.get(&id), before);
    assert!(db.storage.review_logs(&id).unwrap().is_empty());
}

#[test]
fn test_review_lands_on_the_previewed_outcome() {
    let db = TestDatabaseManager::new_temp();
    let id = db.seed_cards(DEFAULT_USER, 1).remove(0);
    let graduated = db.review_all(&id, &[Rating::Good, Rating::Good], db.epoch());
    let later = graduated.card.due + Duration::days(2);

    let preview = db.storage.preview_card(&id, later).unwrap();
    for rating in Rating::ALL {
        let projected = &preview[rating];
        assert_eq!(projected.log.rating, rating);
        assert_eq!(projected.log.state_before, CardState::Review);
    }

    let outcome = db.storage.review_card(&id, Rating::Hard, later, None).unwrap();
    assert_eq!(outcome.card.card, preview[Rating::Hard].card);
}

// ============================================================================
// DECK OVERVIEW
// ============================================================================

#[test]
fn test_due_queue_puts_reviews_before_new_cards() {
    let db = TestDatabaseManager::new_temp();
    let scenario = TestDataFactory::create_due_queue_scenario(&db.storage, DEFAULT_USER);

    let ids = |quota: usize, limit: usize| -> Vec<String> {
        db.storage
            .due_cards(DEFAULT_USER, scenario.now, quota, limit)
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect()
    };

    assert_eq!(
        ids(20, 100),
        vec![
            scenario.id("overdue"),
            scenario.id("recently_due"),
            scenario.id("new_old"),
            scenario.id("new_recent"),
        ]
    );
    assert_eq!(
        ids(1, 100),
        vec![scenario.id("overdue"), scenario.id("recently_due"), scenario.id("new_old")]
    );
    assert_eq!(ids(20, 1), vec![scenario.id("overdue")]);
    assert_eq!(ids(0, 100).len(), 2);
}

#[test]
fn test_deck_stats_for_a_mixed_deck() {
    let db = TestDatabaseManager::new_temp();
    let scenario = TestDataFactory::create_due_queue_scenario(&db.storage, DEFAULT_USER);

    let stats = db.storage.deck_stats(DEFAULT_USER, scenario.now).unwrap();

    assert_eq!(stats.total, 5);
    assert_eq!(stats.new_cards, 2);
    assert_eq!(stats.review, 3);
    assert_eq!(stats.learning + stats.relearning, 0);
    assert_eq!(stats.due_today, 2);
    assert_eq!(stats.overdue, 2);
    assert!(stats.average_retrievability > 0.0 && stats.average_retrievability < 1.0);
}

// ============================================================================
// HISTORY
// ============================================================================

#[test]
fn test_history_records_every_answer_in_order() {
    let db = TestDatabaseManager::new_temp();
    let id = db.seed_cards(DEFAULT_USER, 1).remove(0);
    db.review_all(&id, &[Rating::Again, Rating::Good, Rating::Good, Rating::Hard], db.epoch());

    let logs = db.storage.review_logs(&id).unwrap();
    let ratings: Vec<_> = logs.iter().map(|l| l.log.rating).collect();

    assert_eq!(ratings, vec![Rating::Again, Rating::Good, Rating::Good, Rating::Hard]);
    assert_eq!(logs[0].log.state_before, CardState::New);
    for pair in logs.windows(2) {
        assert!(pair[0].log.reviewed_at <= pair[1].log.reviewed_at);
        assert_eq!(pair[0].log.state_after, pair[1].log.state_before);
    }
}

#[test]
fn test_last_review_can_be_rolled_back_from_history() {
    let db = TestDatabaseManager::new_temp();
    let id = db.seed_cards(DEFAULT_USER, 1).remove(0);
    let before_last = db.review_all(&id, &[Rating::Good, Rating::Good], db.epoch());
    let after_last = db.review_all(&id, &[Rating::Hard], before_last.card.due);

    let logs = db.storage.review_logs(&id).unwrap();
    let last = &logs.last().unwrap().log;
    let restored = db.storage.scheduler().rollback(&after_last.card, last).unwrap();

    assert_eq!(restored, before_last.card);

    // Only the most recent review can be undone
    let err = db.storage.scheduler().rollback(&after_last.card, &logs[0].log);
    assert!(err.is_err());
}
