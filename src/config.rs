use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::session::setup::{
    Difficulty, MAX_GRADE, MAX_TYPING_WORDS, MIN_GRADE, MIN_TYPING_WORDS, VocabType,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_llm_base_url")]
    pub llm_base_url: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default = "default_llm_api_key_env")]
    pub llm_api_key_env: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,
    #[serde(default = "default_offline")]
    pub offline: bool,
    #[serde(default = "default_speech_enabled")]
    pub speech_enabled: bool,
    #[serde(default = "default_speech_program")]
    pub speech_program: String,
    #[serde(default = "default_grade_level")]
    pub default_grade_level: u8,
    #[serde(default = "default_difficulty")]
    pub default_difficulty: Difficulty,
    #[serde(default = "default_vocab_type")]
    pub default_vocab_type: VocabType,
    #[serde(default = "default_typing_word_count")]
    pub typing_word_count: u32,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_llm_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    60
}
fn default_offline() -> bool {
    false
}
fn default_speech_enabled() -> bool {
    true
}
fn default_speech_program() -> String {
    "espeak".to_string()
}
fn default_grade_level() -> u8 {
    3
}
fn default_difficulty() -> Difficulty {
    Difficulty::Medium
}
fn default_vocab_type() -> VocabType {
    VocabType::General
}
fn default_typing_word_count() -> u32 {
    20
}
fn default_data_dir() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lexilearn")
        .to_string_lossy()
        .to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_base_url: default_llm_base_url(),
            llm_model: default_llm_model(),
            llm_api_key_env: default_llm_api_key_env(),
            llm_timeout_secs: default_llm_timeout_secs(),
            offline: default_offline(),
            speech_enabled: default_speech_enabled(),
            speech_program: default_speech_program(),
            default_grade_level: default_grade_level(),
            default_difficulty: default_difficulty(),
            default_vocab_type: default_vocab_type(),
            typing_word_count: default_typing_word_count(),
            data_dir: default_data_dir(),
        }
    }
}

impl Config {
    /// Load from the user config file, falling back to defaults when it
    /// does not exist. Out-of-range values are clamped.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)?;
            toml::from_str::<Config>(&content)?
        } else {
            Config::default()
        };
        config.validate();
        Ok(config)
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lexilearn")
            .join("config.toml")
    }

    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    /// Clamp values a hand-edited file may have pushed out of range.
    pub fn validate(&mut self) {
        self.default_grade_level = self.default_grade_level.clamp(MIN_GRADE, MAX_GRADE);
        self.typing_word_count = self
            .typing_word_count
            .clamp(MIN_TYPING_WORDS, MAX_TYPING_WORDS);
        self.llm_timeout_secs = self.llm_timeout_secs.clamp(1, 600);
        if self.speech_program.trim().is_empty() {
            self.speech_program = default_speech_program();
        }
        if self.data_dir.trim().is_empty() {
            self.data_dir = default_data_dir();
        }
    }
}
