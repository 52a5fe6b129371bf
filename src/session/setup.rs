use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MIN_GRADE: u8 = 1;
pub const MAX_GRADE: u8 = 12;
pub const MAX_SPELLING_WORDS: u32 = 100;
pub const MIN_TYPING_WORDS: u32 = 5;
pub const MAX_TYPING_WORDS: u32 = 100;
pub const DEFAULT_TYPING_WORDS: u32 = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VocabType {
    General,
    Science,
    History,
}

impl VocabType {
    pub fn as_str(self) -> &'static str {
        match self {
            VocabType::General => "general",
            VocabType::Science => "science",
            VocabType::History => "history",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    General,
    Science,
    History,
    Facts,
}

impl Topic {
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::General => "general",
            Topic::Science => "science",
            Topic::History => "history",
            Topic::Facts => "facts",
        }
    }
}

/// Whether the typing target is shown on screen or only spoken aloud.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TypingMode {
    Read,
    Speech,
}

impl TypingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TypingMode::Read => "read",
            TypingMode::Speech => "speech",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.as_str())
            }
        })*
    };
}

display_as_str!(Difficulty, VocabType, Topic, TypingMode);

/// Settings chosen before a spelling test is generated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellingSetup {
    pub grade_level: u8,
    pub difficulty: Difficulty,
    pub vocab_type: VocabType,
    #[serde(default)]
    pub word_count: Option<u32>,
}

impl SpellingSetup {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(MIN_GRADE..=MAX_GRADE).contains(&self.grade_level) {
            return Err(ValidationError::GradeLevel(self.grade_level));
        }
        if let Some(count) = self.word_count
            && !(1..=MAX_SPELLING_WORDS).contains(&count)
        {
            return Err(ValidationError::WordCount {
                min: 1,
                max: MAX_SPELLING_WORDS,
                got: count,
            });
        }
        Ok(())
    }
}

/// Settings chosen before a typing test sentence is generated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingSetup {
    pub difficulty: Difficulty,
    pub topic: Topic,
    pub mode: TypingMode,
    #[serde(default = "default_typing_words")]
    pub word_count: u32,
}

fn default_typing_words() -> u32 {
    DEFAULT_TYPING_WORDS
}

impl Default for TypingSetup {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Medium,
            topic: Topic::General,
            mode: TypingMode::Read,
            word_count: DEFAULT_TYPING_WORDS,
        }
    }
}

impl TypingSetup {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(MIN_TYPING_WORDS..=MAX_TYPING_WORDS).contains(&self.word_count) {
            return Err(ValidationError::WordCount {
                min: MIN_TYPING_WORDS,
                max: MAX_TYPING_WORDS,
                got: self.word_count,
            });
        }
        Ok(())
    }
}
