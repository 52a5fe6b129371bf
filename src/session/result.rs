use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::scoring;
use crate::session::setup::{Difficulty, Topic, TypingMode, VocabType};

/// Final outcome for one word of a spelling test.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WordResult {
    pub word: String,
    pub correct: bool,
    #[serde(default)]
    pub user_input: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpellingSession {
    pub date: DateTime<Utc>,
    pub grade_level: u8,
    pub difficulty: Difficulty,
    pub vocab_type: VocabType,
    pub words: Vec<WordResult>,
    pub accuracy: f64,
    #[serde(default)]
    pub typing_speed_wpm: Option<f64>,
}

impl SpellingSession {
    pub fn correct_count(&self) -> usize {
        self.words.iter().filter(|w| w.correct).count()
    }

    /// Accuracy derived from the word results, independent of the stored field.
    pub fn recompute_accuracy(&self) -> f64 {
        scoring::accuracy_percent(self.correct_count(), self.words.len())
    }

    pub fn correct_words(&self) -> impl Iterator<Item = &str> {
        self.words.iter().filter(|w| w.correct).map(|w| w.word.as_str())
    }

    pub fn incorrect_words(&self) -> impl Iterator<Item = &str> {
        self.words
            .iter()
            .filter(|w| !w.correct)
            .map(|w| w.word.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypingSession {
    pub date: DateTime<Utc>,
    pub difficulty: Difficulty,
    pub topic: Topic,
    pub mode: TypingMode,
    pub wpm: f64,
    pub accuracy: f64,
    pub cpm: f64,
    /// Elapsed whole seconds.
    pub time: u32,
    #[serde(default)]
    pub error_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(w: &str, correct: bool) -> WordResult {
        WordResult {
            word: w.to_string(),
            correct,
            user_input: String::new(),
        }
    }

    #[test]
    fn test_recompute_accuracy_matches_words() {
        let session = SpellingSession {
            date: Utc::now(),
            grade_level: 2,
            difficulty: Difficulty::Easy,
            vocab_type: VocabType::General,
            words: vec![word("cat", true), word("dog", false), word("owl", true)],
            accuracy: 0.0,
            typing_speed_wpm: None,
        };
        assert_eq!(session.correct_count(), 2);
        assert!((session.recompute_accuracy() - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(session.correct_words().collect::<Vec<_>>(), vec!["cat", "owl"]);
        assert_eq!(session.incorrect_words().collect::<Vec<_>>(), vec!["dog"]);
    }

    #[test]
    fn test_legacy_record_without_optional_fields() {
        let json = r#"{
            "date": "2025-03-01T10:00:00Z",
            "grade_level": 4,
            "difficulty": "medium",
            "vocab_type": "science",
            "words": [{"word": "atom", "correct": true}],
            "accuracy": 100.0
        }"#;
        let session: SpellingSession = serde_json::from_str(json).unwrap();
        assert_eq!(session.typing_speed_wpm, None);
        assert_eq!(session.words[0].user_input, "");
        assert_eq!(session.vocab_type, VocabType::Science);
    }
}
