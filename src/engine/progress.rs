//! Aggregates over stored history for the progress report.

use std::collections::HashSet;

use chrono::Local;

use crate::error::GenerationError;
use crate::generator::{self, MistakeCategorizer, MistakeCategory};
use crate::session::result::{SpellingSession, TypingSession};
use crate::store::kv::KeyValueStore;
use crate::store::performance::PerformanceStore;

#[derive(Clone, Debug, PartialEq)]
pub struct SpellingPoint {
    pub label: String,
    pub accuracy: f64,
    pub wpm: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypingPoint {
    pub label: String,
    pub wpm: f64,
    pub accuracy: f64,
    pub errors: u32,
}

/// Every word ever misspelled, lowercased, in the order first seen when
/// walking the history as stored (newest session first).
pub fn unique_misspelled_words(history: &[SpellingSession]) -> Vec<String> {
    let mut seen = HashSet::new();
    history
        .iter()
        .flat_map(|session| session.incorrect_words())
        .map(str::to_lowercase)
        .filter(|word| seen.insert(word.clone()))
        .collect()
}

/// Mean spelling speed over sessions that recorded one, rounded.
pub fn average_spelling_wpm(history: &[SpellingSession]) -> f64 {
    let speeds: Vec<f64> = history
        .iter()
        .filter_map(|s| s.typing_speed_wpm)
        .filter(|wpm| *wpm > 0.0)
        .collect();
    if speeds.is_empty() {
        return 0.0;
    }
    (speeds.iter().sum::<f64>() / speeds.len() as f64).round()
}

fn date_label(session_date: &chrono::DateTime<chrono::Utc>) -> String {
    session_date.with_timezone(&Local).format("%-m/%-d").to_string()
}

/// Oldest first, for plotting.
pub fn spelling_series(history: &[SpellingSession]) -> Vec<SpellingPoint> {
    history
        .iter()
        .rev()
        .map(|s| SpellingPoint {
            label: date_label(&s.date),
            accuracy: s.accuracy.round(),
            wpm: s.typing_speed_wpm.unwrap_or(0.0).round(),
        })
        .collect()
}

/// Oldest first, for plotting.
pub fn typing_series(history: &[TypingSession]) -> Vec<TypingPoint> {
    history
        .iter()
        .rev()
        .map(|s| TypingPoint {
            label: date_label(&s.date),
            wpm: s.wpm.round(),
            accuracy: s.accuracy.round(),
            errors: s.error_count,
        })
        .collect()
}

/// Categorize everything ever misspelled, reusing the cached result unless
/// `force` is set. A fresh result replaces the cache; a failed call leaves
/// it as it was.
pub fn run_analysis<S, C>(
    store: &mut PerformanceStore<S>,
    categorizer: &mut C,
    force: bool,
) -> Result<Vec<MistakeCategory>, GenerationError>
where
    S: KeyValueStore,
    C: MistakeCategorizer + ?Sized,
{
    let words = unique_misspelled_words(&store.spelling_history());
    if words.is_empty() {
        return Ok(Vec::new());
    }
    if !force && let Some(cached) = store.cached_analysis() {
        tracing::debug!(categories = cached.len(), "using cached mistake analysis");
        return Ok(cached);
    }

    let categories = generator::categorize_mistakes(categorizer, &words)?;
    if let Err(e) = store.save_analysis(&categories) {
        tracing::warn!(error = %e, "failed to cache mistake analysis");
    }
    Ok(categories)
}

/// Everything the progress view shows.
#[derive(Clone, Debug)]
pub struct ProgressReport {
    pub spelling_sessions: usize,
    pub typing_sessions: usize,
    pub misspelled_words: Vec<String>,
    pub average_spelling_wpm: f64,
    pub spelling_series: Vec<SpellingPoint>,
    pub typing_series: Vec<TypingPoint>,
}

impl ProgressReport {
    pub fn build<S: KeyValueStore>(store: &PerformanceStore<S>) -> Self {
        let spelling = store.spelling_history();
        let typing = store.typing_history();
        Self {
            spelling_sessions: spelling.len(),
            typing_sessions: typing.len(),
            misspelled_words: unique_misspelled_words(&spelling),
            average_spelling_wpm: average_spelling_wpm(&spelling),
            spelling_series: spelling_series(&spelling),
            typing_series: typing_series(&typing),
        }
    }
}
