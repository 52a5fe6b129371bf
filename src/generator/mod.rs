pub mod llm;
pub mod mock;
pub mod offline;
pub mod prompt;

use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{GenerationError, ValidationError};
use crate::session::setup::{Difficulty, SpellingSetup, Topic, TypingSetup, VocabType};

/// Words requested when the setup leaves the count open.
pub const DEFAULT_WORD_LIST_LEN: u32 = 30;

/// Picked at random and handed to the sentence generator for variety.
pub const THEME_WORDS: &[&str] = &[
    "ocean", "mountain", "library", "volcano", "garden", "rocket", "castle", "forest",
    "robot", "desert", "island", "museum", "bridge", "planet", "river", "festival",
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MistakeCategory {
    pub category: String,
    pub count: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordListRequest {
    pub grade_level: u8,
    pub difficulty: Difficulty,
    pub vocab_type: VocabType,
    /// Digest of recent sessions, see `PerformanceStore::summarize_past_performance`.
    pub past_performance: String,
    pub word_count: Option<u32>,
}

impl WordListRequest {
    pub fn new(setup: &SpellingSetup, past_performance: String) -> Self {
        Self {
            grade_level: setup.grade_level,
            difficulty: setup.difficulty,
            vocab_type: setup.vocab_type,
            past_performance,
            word_count: setup.word_count,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        SpellingSetup {
            grade_level: self.grade_level,
            difficulty: self.difficulty,
            vocab_type: self.vocab_type,
            word_count: self.word_count,
        }
        .validate()
    }

    pub fn target_len(&self) -> u32 {
        self.word_count.unwrap_or(DEFAULT_WORD_LIST_LEN)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentenceRequest {
    pub difficulty: Difficulty,
    pub topic: Topic,
    pub word_count: u32,
    pub random_word: Option<String>,
}

impl SentenceRequest {
    pub fn new(setup: &TypingSetup) -> Self {
        Self {
            difficulty: setup.difficulty,
            topic: setup.topic,
            word_count: setup.word_count,
            random_word: None,
        }
    }

    pub fn with_random_theme<R: Rng>(mut self, rng: &mut R) -> Self {
        let idx = rng.gen_range(0..THEME_WORDS.len());
        self.random_word = Some(THEME_WORDS[idx].to_string());
        self
    }
}

pub trait WordListGenerator {
    fn generate_word_list(&mut self, request: &WordListRequest)
    -> Result<Vec<String>, GenerationError>;
}

pub trait SentenceGenerator {
    fn generate_sentence(&mut self, request: &SentenceRequest) -> Result<String, GenerationError>;
}

pub trait MistakeCategorizer {
    /// Group misspelled words. Callers go through [`categorize_mistakes`],
    /// which never passes an empty list.
    fn categorize(&mut self, words: &[String]) -> Result<Vec<MistakeCategory>, GenerationError>;
}

/// Everything the app needs from a content provider.
pub trait ContentProvider: WordListGenerator + SentenceGenerator + MistakeCategorizer {}

impl<T: WordListGenerator + SentenceGenerator + MistakeCategorizer> ContentProvider for T {}

/// Validate the request, call the generator and clean up its word list.
pub fn generate_word_list<G: WordListGenerator + ?Sized>(
    generator: &mut G,
    request: &WordListRequest,
) -> Result<Vec<String>, GenerationError> {
    request.validate()?;
    let raw = generator.generate_word_list(request)?;
    clean_word_list(raw, request.word_count)
}

pub fn generate_sentence<G: SentenceGenerator + ?Sized>(
    generator: &mut G,
    request: &SentenceRequest,
) -> Result<String, GenerationError> {
    let sentence = generator.generate_sentence(request)?;
    let sentence = sentence.split_whitespace().collect::<Vec<_>>().join(" ");
    if sentence.is_empty() {
        return Err(GenerationError::Empty("sentence"));
    }
    Ok(sentence)
}

/// Empty input short-circuits without touching the categorizer.
pub fn categorize_mistakes<C: MistakeCategorizer + ?Sized>(
    categorizer: &mut C,
    words: &[String],
) -> Result<Vec<MistakeCategory>, GenerationError> {
    if words.is_empty() {
        return Ok(Vec::new());
    }
    let raw = categorizer.categorize(words)?;
    Ok(normalize_categories(raw))
}

/// Trim, drop blanks and case-insensitive duplicates, cap at `limit`.
pub fn clean_word_list(
    raw: Vec<String>,
    limit: Option<u32>,
) -> Result<Vec<String>, GenerationError> {
    let mut seen = HashSet::new();
    let mut words: Vec<String> = raw
        .into_iter()
        .map(|w| w.trim().to_string())
        .filter(|w| !w.is_empty())
        .filter(|w| seen.insert(w.to_lowercase()))
        .collect();
    if let Some(limit) = limit {
        words.truncate(limit as usize);
    }
    if words.is_empty() {
        return Err(GenerationError::Empty("word list"));
    }
    Ok(words)
}

/// Merge duplicate labels, drop zero counts, sort by count descending.
pub fn normalize_categories(raw: Vec<MistakeCategory>) -> Vec<MistakeCategory> {
    let mut merged: Vec<MistakeCategory> = Vec::new();
    for cat in raw {
        let label = cat.category.trim();
        if label.is_empty() || cat.count == 0 {
            continue;
        }
        match merged.iter_mut().find(|m| m.category.eq_ignore_ascii_case(label)) {
            Some(existing) => existing.count += cat.count,
            None => merged.push(MistakeCategory {
                category: label.to_string(),
                count: cat.count,
            }),
        }
    }
    // Stable: ties keep the provider's order.
    merged.sort_by(|a, b| b.count.cmp(&a.count));
    merged
}
