//! Typed session history and analysis cache over a key-value store.
//!
//! Reads never fail: unreadable or stale records are logged and treated as
//! "no data". Writes return their error so the caller can report it.

use chrono::Local;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;
use crate::generator::MistakeCategory;
use crate::session::result::{SpellingSession, TypingSession};
use crate::session::setup::TypingSetup;
use crate::store::kv::KeyValueStore;
use crate::store::schema::{
    ANALYSIS_KEY, HistoryData, SPELLING_HISTORY_KEY, TYPING_HISTORY_KEY, TYPING_SETUP_KEY,
};

pub const NO_PERFORMANCE_DATA: &str = "No past performance data available.";
pub const PERFORMANCE_READ_ERROR: &str = "Error retrieving past performance data.";
pub const SUMMARY_SESSIONS: usize = 5;
pub const MAX_PERFORMANCE_WORDS: usize = 300;

pub struct PerformanceStore<S> {
    store: S,
}

impl<S: KeyValueStore> PerformanceStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn read_history<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StoreError> {
        let Some(json) = self.store.get(key)? else {
            return Ok(Vec::new());
        };
        let history: HistoryData<T> = serde_json::from_str(&json)?;
        if history.needs_reset() {
            tracing::warn!(
                key,
                version = history.schema_version,
                "discarding history with unknown schema version"
            );
            return Ok(Vec::new());
        }
        Ok(history.sessions)
    }

    fn load_history<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        self.read_history(key).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "failed to read history");
            Vec::new()
        })
    }

    fn append<T: Serialize + DeserializeOwned>(
        &mut self,
        key: &str,
        session: T,
    ) -> Result<(), StoreError> {
        let mut history = HistoryData {
            sessions: self.load_history(key),
            ..HistoryData::default()
        };
        history.push_newest(session);
        let json = serde_json::to_string(&history)?;
        self.store.set(key, &json)
    }

    /// Record a finished spelling session. Any cached mistake analysis is
    /// dropped since it no longer covers all the data.
    pub fn append_spelling(&mut self, session: SpellingSession) -> Result<(), StoreError> {
        self.append(SPELLING_HISTORY_KEY, session)?;
        self.store.remove(ANALYSIS_KEY)
    }

    pub fn append_typing(&mut self, session: TypingSession) -> Result<(), StoreError> {
        self.append(TYPING_HISTORY_KEY, session)
    }

    /// Newest first.
    pub fn spelling_history(&self) -> Vec<SpellingSession> {
        self.load_history(SPELLING_HISTORY_KEY)
    }

    /// Newest first.
    pub fn typing_history(&self) -> Vec<TypingSession> {
        self.load_history(TYPING_HISTORY_KEY)
    }

    pub fn cached_analysis(&self) -> Option<Vec<MistakeCategory>> {
        let read = || -> Result<Option<Vec<MistakeCategory>>, StoreError> {
            match self.store.get(ANALYSIS_KEY)? {
                Some(json) => Ok(Some(serde_json::from_str(&json)?)),
                None => Ok(None),
            }
        };
        read().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to read cached analysis");
            None
        })
    }

    pub fn save_analysis(&mut self, categories: &[MistakeCategory]) -> Result<(), StoreError> {
        let json = serde_json::to_string(categories)?;
        self.store.set(ANALYSIS_KEY, &json)
    }

    pub fn last_typing_setup(&self) -> Option<TypingSetup> {
        let json = self.store.get(TYPING_SETUP_KEY).ok().flatten()?;
        match serde_json::from_str(&json) {
            Ok(setup) => Some(setup),
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse stored typing config");
                None
            }
        }
    }

    pub fn save_typing_setup(&mut self, setup: &TypingSetup) -> Result<(), StoreError> {
        let json = serde_json::to_string(setup)?;
        self.store.set(TYPING_SETUP_KEY, &json)
    }

    /// Plain-text digest of the latest spelling sessions for the word list
    /// generator, capped at [`MAX_PERFORMANCE_WORDS`] words.
    pub fn summarize_past_performance(&self) -> String {
        let history: Vec<SpellingSession> = match self.read_history(SPELLING_HISTORY_KEY) {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(error = %e, "failed to get past performance data");
                return PERFORMANCE_READ_ERROR.to_string();
            }
        };
        if history.is_empty() {
            return NO_PERFORMANCE_DATA.to_string();
        }

        let summary = history
            .iter()
            .take(SUMMARY_SESSIONS)
            .map(describe_session)
            .collect::<Vec<_>>()
            .join("\n");

        let words: Vec<&str> = summary.split_whitespace().collect();
        if words.len() > MAX_PERFORMANCE_WORDS {
            return format!("{}...", words[..MAX_PERFORMANCE_WORDS].join(" "));
        }
        summary
    }
}

fn describe_session(session: &SpellingSession) -> String {
    let correct = session.correct_words().collect::<Vec<_>>().join(", ");
    let incorrect = session.incorrect_words().collect::<Vec<_>>().join(", ");
    format!(
        "On {date}, for grade {grade} ({difficulty} {vocab}), accuracy was {accuracy}%. Correct: [{correct}]. Incorrect: [{incorrect}].",
        date = session.date.with_timezone(&Local).format("%-m/%-d/%Y"),
        grade = session.grade_level,
        difficulty = session.difficulty,
        vocab = session.vocab_type,
        accuracy = session.accuracy.round(),
    )
}
