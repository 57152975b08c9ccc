use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use trialrank::rank::{QuerySource, RankedEntry};
use trialrank::search::SearchOutcome;
use trialrank::session::SessionHistory;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_ranked(title: &str, ranked: &[RankedEntry]) {
    println!("{}", title.bright_cyan().bold());
    println!("{}", "=".repeat(60));

    if ranked.is_empty() {
        println!("{}", "No documents ranked.".dimmed());
        return;
    }

    for entry in ranked {
        print_entry(entry);
    }
}

fn print_entry(entry: &RankedEntry) {
    let score_text = format!("{:.3}", entry.score);
    let score = if entry.score > 0.8 {
        score_text.green()
    } else if entry.score > 0.4 {
        score_text.yellow()
    } else {
        score_text.red()
    };

    let source = match entry.source {
        QuerySource::Original => entry.source.name().normal(),
        QuerySource::Translated => entry.source.name().bright_blue(),
        QuerySource::Expanded => entry.source.name().bright_magenta(),
    };

    println!(
        "{:>3}. {:<16} {}  {}",
        entry.rank,
        entry.docno.bright_green(),
        score,
        source
    );
}

pub fn print_outcome(outcome: &SearchOutcome) {
    println!("Query:      \"{}\"", outcome.query.bright_yellow());
    println!("Translated: \"{}\"", outcome.translated_query);
    if let Some(expanded) = &outcome.expanded_query {
        println!("Expanded:   \"{}\"", expanded);
    }
    if let Some(condition) = &outcome.condition {
        println!("Condition:  {}", condition.bright_cyan());
    }
    println!();
}

pub fn print_history(history: &SessionHistory) {
    println!("{}", format!("Session {}", history.id()).dimmed());
    for (index, state) in history.states().iter().enumerate() {
        let label = match &state.feedback {
            None => format!("#{} search \"{}\"", index, state.query),
            Some(feedback) => format!("#{} feedback {} on {}", index, feedback.polarity, feedback.docno),
        };
        println!();
        print_ranked(&label, &state.results);
    }
}
