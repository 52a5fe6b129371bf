use std::time::Duration;

use crate::config::Config;
use crate::error::GenerationError;
use crate::generator::prompt::{self, CategoriesReply, SentenceReply, WordListReply};
use crate::generator::{
    MistakeCategorizer, MistakeCategory, SentenceGenerator, SentenceRequest, WordListGenerator,
    WordListRequest,
};

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct LlmClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl LlmClient {
    pub fn new(base_url: &str, model: &str, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            timeout,
        }
    }

    /// Build from config, reading the API key from the configured
    /// environment variable. A missing key is fine for local servers that
    /// do not check it.
    pub fn from_config(config: &Config) -> Self {
        let api_key = std::env::var(&config.llm_api_key_env)
            .ok()
            .filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::debug!(var = %config.llm_api_key_env, "no API key in environment");
        }
        Self::new(
            &config.llm_base_url,
            &config.llm_model,
            api_key,
            Duration::from_secs(config.llm_timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    #[cfg(feature = "network")]
    fn complete(&self, user_prompt: &str) -> Result<String, GenerationError> {
        use serde::{Deserialize, Serialize};

        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage<'a>>,
            temperature: f64,
            response_format: ResponseFormat,
        }

        #[derive(Serialize)]
        struct ChatMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct ResponseFormat {
            #[serde(rename = "type")]
            kind: &'static str,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatReply,
        }

        #[derive(Deserialize)]
        struct ChatReply {
            #[serde(default)]
            content: String,
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt::SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: 0.7,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let mut request = client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                GenerationError::Network(format!(
                    "request timed out after {}s",
                    self.timeout.as_secs()
                ))
            } else {
                GenerationError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let reply: ChatResponse = response
            .json()
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;
        reply
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(GenerationError::Empty("reply"))
    }

    #[cfg(not(feature = "network"))]
    fn complete(&self, _user_prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::Unavailable(
            "built without the network feature".to_string(),
        ))
    }
}

impl WordListGenerator for LlmClient {
    #[tracing::instrument(skip(self, request), fields(model = %self.model))]
    fn generate_word_list(
        &mut self,
        request: &WordListRequest,
    ) -> Result<Vec<String>, GenerationError> {
        let reply = self.complete(&prompt::word_list_prompt(request))?;
        let parsed: WordListReply = prompt::parse_reply(&reply)?;
        tracing::debug!(words = parsed.word_list.len(), "word list generated");
        Ok(parsed.word_list)
    }
}

impl SentenceGenerator for LlmClient {
    #[tracing::instrument(skip(self, request), fields(model = %self.model))]
    fn generate_sentence(&mut self, request: &SentenceRequest) -> Result<String, GenerationError> {
        let reply = self.complete(&prompt::sentence_prompt(request))?;
        let parsed: SentenceReply = prompt::parse_reply(&reply)?;
        Ok(parsed.sentence)
    }
}

impl MistakeCategorizer for LlmClient {
    #[tracing::instrument(skip(self, words), fields(model = %self.model, words = words.len()))]
    fn categorize(&mut self, words: &[String]) -> Result<Vec<MistakeCategory>, GenerationError> {
        let reply = self.complete(&prompt::categorize_prompt(words))?;
        let parsed: CategoriesReply = prompt::parse_reply(&reply)?;
        Ok(parsed.categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::setup::TypingSetup;

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = LlmClient::new("http://localhost:11434/v1/", "llama3", None, Duration::from_secs(1));
        assert_eq!(client.base_url, "http://localhost:11434/v1");
        assert_eq!(client.model(), "llama3");
    }

    #[test]
    fn test_from_config_reads_key_env() {
        let mut config = Config::default();
        config.llm_api_key_env = "LEXILEARN_TEST_KEY_THAT_IS_NOT_SET".to_string();
        let client = LlmClient::from_config(&config);
        assert!(client.api_key.is_none());
        assert_eq!(client.timeout, Duration::from_secs(config.llm_timeout_secs));
    }

    #[test]
    fn test_unreachable_server_is_a_generation_error() {
        // Port 9 (discard) is closed on test machines.
        let mut client = LlmClient::new("http://127.0.0.1:9/v1", "m", None, Duration::from_secs(2));
        let err = client
            .generate_sentence(&SentenceRequest::new(&TypingSetup::default()))
            .unwrap_err();
        assert!(
            matches!(
                err,
                GenerationError::Network(_) | GenerationError::Unavailable(_)
            ),
            "unexpected error: {err:?}"
        );
    }
}
