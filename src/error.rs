use thiserror::Error;

/// Malformed session configuration. Shown to the user as a form error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("grade level must be between 1 and 12, got {0}")]
    GradeLevel(u8),

    #[error("word count must be between {min} and {max}, got {got}")]
    WordCount { min: u32, max: u32, got: u32 },

    #[error("a spelling test needs at least one word")]
    EmptyWordList,
}

/// Failure of an external generation or categorization call.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid input data: {0}")]
    InvalidInput(#[from] ValidationError),

    #[error("network error: {0}")]
    Network(String),

    #[error("provider returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("could not parse provider response: {0}")]
    Malformed(String),

    #[error("provider returned an empty {0}")]
    Empty(&'static str),

    #[error("no generation provider is available: {0}")]
    Unavailable(String),
}

impl GenerationError {
    /// Message suitable for a dismissable notification.
    pub fn user_message(&self) -> &'static str {
        match self {
            GenerationError::InvalidInput(_) => "Invalid input data.",
            GenerationError::Empty("sentence") => "AI did not return a sentence.",
            _ => "Generation failed. Please try again.",
        }
    }
}

/// Read or write failure in a key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid store key: {0:?}")]
    InvalidKey(String),
}
