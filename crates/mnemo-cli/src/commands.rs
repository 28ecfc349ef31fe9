//! Command implementations
//!
//! Each command takes an open `Storage` so it can be exercised against a
//! temporary database.

use chrono::{DateTime, Utc};
use colored::Colorize;
use mnemo_core::{CardState, Flashcard, NewCardInput, Rating, RecordLog, Storage, StorageError};
use serde::Serialize;

use crate::config::Settings;

/// Parse a rating given as 1-4 or by name
pub fn parse_rating(raw: &str) -> anyhow::Result<Rating> {
    match raw.trim().to_lowercase().as_str() {
        "again" | "a" => Ok(Rating::Again),
        "hard" | "h" => Ok(Rating::Hard),
        "good" | "g" => Ok(Rating::Good),
        "easy" | "e" => Ok(Rating::Easy),
        other => {
            let value: i32 = other.parse().map_err(|_| {
                anyhow::anyhow!("'{}' is not a rating (use 1-4 or again/hard/good/easy)", raw)
            })?;
            Ok(Rating::try_from(value)?)
        }
    }
}

/// Human-readable span until `due`
pub fn format_interval(now: DateTime<Utc>, due: DateTime<Utc>) -> String {
    let minutes = (due - now).num_minutes().max(0);
    if minutes < 60 {
        format!("{}m", minutes)
    } else if minutes < 24 * 60 {
        format!("{}h", minutes / 60)
    } else {
        let days = minutes / (24 * 60);
        if days < 365 {
            format!("{}d", days)
        } else {
            format!("{:.1}y", days as f64 / 365.0)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn colored_state(state: CardState) -> colored::ColoredString {
    match state {
        CardState::New => state.as_str().blue(),
        CardState::Learning => state.as_str().yellow(),
        CardState::Review => state.as_str().green(),
        CardState::Relearning => state.as_str().red(),
    }
}

fn print_card_line(card: &Flashcard, now: DateTime<Utc>) {
    let overdue = if card.card.due < now {
        format!("overdue {}", format_interval(card.card.due, now))
    } else {
        "due now".to_string()
    };
    println!(
        "  {}  {:10}  {:12}  {}",
        card.id.dimmed(),
        colored_state(card.card.state),
        overdue,
        card.front
    );
}

/// Run add command
///
/// The card is created, and due, at `now`.
pub fn run_add(
    storage: &Storage,
    user: &str,
    front: String,
    back: String,
    now: DateTime<Utc>,
    json: bool,
) -> anyhow::Result<()> {
    let card = storage.add_card(NewCardInput {
        user_id: user.to_string(),
        front,
        back,
        created_at: Some(now),
    })?;

    if json {
        return print_json(&card);
    }
    println!("{}: {}", "Added card".green().bold(), card.id);
    Ok(())
}

/// Run due command
pub fn run_due(
    storage: &Storage,
    user: &str,
    now: DateTime<Utc>,
    new_quota: usize,
    limit: usize,
    json: bool,
) -> anyhow::Result<()> {
    let cards = storage.due_cards(user, now, new_quota, limit)?;
    if json {
        return print_json(&cards);
    }

    println!("{}", "=== Cards Due ===".cyan().bold());
    if cards.is_empty() {
        println!("{}", "Nothing due. Come back later.".dimmed());
        return Ok(());
    }
    for card in &cards {
        print_card_line(card, now);
    }
    println!();
    println!("{}: {}", "Total".white().bold(), cards.len());
    Ok(())
}

/// Run preview command
pub fn run_preview(
    storage: &Storage,
    id: &str,
    now: DateTime<Utc>,
    json: bool,
) -> anyhow::Result<()> {
    let preview: RecordLog = storage.preview_card(id, now)?;
    if json {
        return print_json(&preview);
    }

    println!("{}", "=== Next Intervals ===".cyan().bold());
    for (rating, item) in preview.iter() {
        println!(
            "  {} {:6} -> {:6} {}",
            rating.value(),
            rating.as_str(),
            format_interval(now, item.card.due),
            colored_state(item.card.state)
        );
    }
    Ok(())
}

/// Run review command
///
/// Any failure leaves the stored card untouched; the learner is told the
/// rating was not recorded.
pub fn run_review(
    storage: &Storage,
    id: &str,
    rating: &str,
    now: DateTime<Utc>,
    review_duration_ms: Option<i64>,
    json: bool,
) -> anyhow::Result<()> {
    let rating = match parse_rating(rating) {
        Ok(rating) => rating,
        Err(e) => {
            eprintln!("{}: {}", "Rating not recorded".red().bold(), e);
            return Err(e);
        }
    };

    let outcome = match storage.review_card(id, rating, now, review_duration_ms) {
        Ok(outcome) => outcome,
        Err(e) if e.is_retryable() => {
            eprintln!(
                "{}: the card changed while you were answering. Please review it again.",
                "Rating not recorded".red().bold()
            );
            return Err(e.into());
        }
        Err(e) => {
            eprintln!("{}: {}", "Rating not recorded".red().bold(), e);
            return Err(e.into());
        }
    };

    if json {
        return print_json(&outcome);
    }

    let card = &outcome.card.card;
    println!("{}: {}", "Recorded".green().bold(), rating);
    println!("{}: {}", "State".white().bold(), colored_state(card.state));
    println!(
        "{}: {} ({})",
        "Next Review".white().bold(),
        card.due.format("%Y-%m-%d %H:%M"),
        format_interval(now, card.due)
    );
    println!("{}: {:.2}", "Stability".white().bold(), card.stability);
    println!("{}: {:.2}", "Difficulty".white().bold(), card.difficulty);
    Ok(())
}

/// Run stats command
pub fn run_stats(
    storage: &Storage,
    user: &str,
    now: DateTime<Utc>,
    json: bool,
) -> anyhow::Result<()> {
    let stats = storage.deck_stats(user, now)?;
    if json {
        return print_json(&stats);
    }

    println!("{}", "=== Deck Statistics ===".cyan().bold());
    println!();
    println!("{}: {}", "Total Cards".white().bold(), stats.total);
    println!("{}: {}", "Due Today".white().bold(), stats.due_today);
    println!("{}: {}", "Overdue".white().bold(), stats.overdue);
    println!(
        "{}: {:.1}%",
        "Average Retrievability".white().bold(),
        stats.average_retrievability * 100.0
    );

    let total = stats.total.max(0) as usize;
    if total > 0 {
        println!();
        println!("{}", "=== State Distribution ===".yellow().bold());
        print_distribution_bar("New", stats.new_cards as usize, total, "blue");
        print_distribution_bar("Learning", stats.learning as usize, total, "yellow");
        print_distribution_bar("Review", stats.review as usize, total, "green");
        print_distribution_bar("Relearning", stats.relearning as usize, total, "red");
    }
    Ok(())
}

fn print_distribution_bar(label: &str, count: usize, total: usize, color: &str) {
    let percentage = if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        0.0
    };

    let bar_width: usize = 30;
    let filled = ((percentage / 100.0) * bar_width as f64) as usize;
    let empty = bar_width.saturating_sub(filled);

    let bar = format!("{}{}", "#".repeat(filled), "-".repeat(empty));
    let colored_bar = match color {
        "green" => bar.green(),
        "yellow" => bar.yellow(),
        "red" => bar.red(),
        "blue" => bar.blue(),
        _ => bar.white(),
    };

    println!(
        "  {:12} [{:30}] {:>4} ({:>5.1}%)",
        label, colored_bar, count, percentage
    );
}

/// Run history command
pub fn run_history(storage: &Storage, id: &str, json: bool) -> anyhow::Result<()> {
    if storage.get_card(id)?.is_none() {
        return Err(StorageError::NotFound(id.to_string()).into());
    }
    let logs = storage.review_logs(id)?;
    if json {
        return print_json(&logs);
    }

    println!("{}", "=== Review History ===".cyan().bold());
    if logs.is_empty() {
        println!("{}", "No reviews yet.".dimmed());
        return Ok(());
    }
    for entry in &logs {
        let log = &entry.log;
        println!(
            "  {}  {:6}  {} -> {}  S {:.2} -> {:.2}  D {:.2} -> {:.2}  +{}d",
            log.reviewed_at.format("%Y-%m-%d %H:%M"),
            log.rating.as_str(),
            colored_state(log.state_before),
            colored_state(log.state_after),
            log.stability_before,
            log.stability_after,
            log.difficulty_before,
            log.difficulty_after,
            log.scheduled_days
        );
    }
    Ok(())
}

/// Run delete command
pub fn run_delete(storage: &Storage, id: &str, now: DateTime<Utc>) -> anyhow::Result<()> {
    if storage.soft_delete(id, now)? {
        println!("{}: {}", "Deleted".yellow().bold(), id);
        Ok(())
    } else {
        Err(StorageError::NotFound(id.to_string()).into())
    }
}

/// Run reset command
pub fn run_reset(storage: &Storage, id: &str, now: DateTime<Utc>) -> anyhow::Result<()> {
    let card = storage.reset_card(id, now)?;
    println!("{}: {} is new again", "Reset".yellow().bold(), card.id);
    Ok(())
}

/// Run params command
pub fn run_params(settings: &Settings) -> anyhow::Result<()> {
    match &settings.params_file {
        Some(path) => eprintln!("{}: {}", "Parameters from".dimmed(), path.display()),
        None => eprintln!("{}", "Using default parameters".dimmed()),
    }
    print_json(&settings.params)
}
