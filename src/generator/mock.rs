//! Canned provider for tests and demos.

use crate::error::GenerationError;
use crate::generator::{
    MistakeCategorizer, MistakeCategory, SentenceGenerator, SentenceRequest, WordListGenerator,
    WordListRequest,
};

/// Returns fixed content and records how it was called.
#[derive(Clone, Debug)]
pub struct MockProvider {
    pub words: Vec<String>,
    pub sentence: String,
    pub categories: Vec<MistakeCategory>,
    /// When set, every call fails with a network error carrying this text.
    pub fail_with: Option<String>,
    pub word_list_calls: u32,
    pub sentence_calls: u32,
    pub categorize_calls: u32,
    pub last_word_request: Option<WordListRequest>,
    pub last_sentence_request: Option<SentenceRequest>,
    pub last_categorize_input: Option<Vec<String>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            words: vec!["cat".to_string(), "dog".to_string()],
            sentence: "The quick brown fox jumps over the lazy dog.".to_string(),
            categories: Vec::new(),
            fail_with: None,
            word_list_calls: 0,
            sentence_calls: 0,
            categorize_calls: 0,
            last_word_request: None,
            last_sentence_request: None,
            last_categorize_input: None,
        }
    }
}

impl MockProvider {
    pub fn with_words(words: &[&str]) -> Self {
        Self {
            words: words.iter().map(|w| w.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    fn check_failure(&self) -> Result<(), GenerationError> {
        match &self.fail_with {
            Some(message) => Err(GenerationError::Network(message.clone())),
            None => Ok(()),
        }
    }
}

impl WordListGenerator for MockProvider {
    fn generate_word_list(
        &mut self,
        request: &WordListRequest,
    ) -> Result<Vec<String>, GenerationError> {
        self.word_list_calls += 1;
        self.last_word_request = Some(request.clone());
        self.check_failure()?;
        Ok(self.words.clone())
    }
}

impl SentenceGenerator for MockProvider {
    fn generate_sentence(&mut self, request: &SentenceRequest) -> Result<String, GenerationError> {
        self.sentence_calls += 1;
        self.last_sentence_request = Some(request.clone());
        self.check_failure()?;
        Ok(self.sentence.clone())
    }
}

impl MistakeCategorizer for MockProvider {
    fn categorize(&mut self, words: &[String]) -> Result<Vec<MistakeCategory>, GenerationError> {
        self.categorize_calls += 1;
        self.last_categorize_input = Some(words.to_vec());
        self.check_failure()?;
        Ok(self.categories.clone())
    }
}
