use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

pub const SPELLING_HISTORY_KEY: &str = "spelling_history";
pub const TYPING_HISTORY_KEY: &str = "typing_history";
pub const ANALYSIS_KEY: &str = "mistake_analysis";
pub const TYPING_SETUP_KEY: &str = "typing_config";

pub const MAX_HISTORY_ITEMS: usize = 50;

/// Stored history of one kind of session, newest first.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryData<T> {
    pub schema_version: u32,
    #[serde(default = "Vec::new")]
    pub sessions: Vec<T>,
}

impl<T> Default for HistoryData<T> {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            sessions: Vec::new(),
        }
    }
}

impl<T> HistoryData<T> {
    /// Check if loaded data has a stale schema version and needs reset.
    pub fn needs_reset(&self) -> bool {
        self.schema_version != SCHEMA_VERSION
    }

    /// Insert at the front and drop the oldest entries past the cap.
    pub fn push_newest(&mut self, session: T) {
        self.sessions.insert(0, session);
        self.sessions.truncate(MAX_HISTORY_ITEMS);
    }
}
