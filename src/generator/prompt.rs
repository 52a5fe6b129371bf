//! Prompt templates and reply parsing for LLM-backed generation.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::GenerationError;
use crate::generator::{MistakeCategory, SentenceRequest, WordListRequest};

pub const SYSTEM_PROMPT: &str = "You write content for a children's spelling and typing practice app. \
Always answer with a single JSON object and nothing else.";

#[derive(Debug, Deserialize)]
pub struct WordListReply {
    #[serde(rename = "wordList", alias = "word_list")]
    pub word_list: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SentenceReply {
    pub sentence: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoriesReply {
    #[serde(default)]
    pub categories: Vec<MistakeCategory>,
}

pub fn word_list_prompt(request: &WordListRequest) -> String {
    format!(
        "You are an expert spelling word list generator.
Generate a list of {count} spelling words that are challenging yet appropriate for the user.
Do not repeat words the user already spelled correctly in their past performance.

User inputs:
- Grade level: {grade}
- Difficulty: {difficulty}
- Vocabulary type: {vocab}
- Past performance data: {past}

Return a JSON object with a single key \"wordList\" containing an array of strings.",
        count = request.target_len(),
        grade = request.grade_level,
        difficulty = request.difficulty,
        vocab = request.vocab_type,
        past = request.past_performance,
    )
}

pub fn sentence_prompt(request: &SentenceRequest) -> String {
    let mut prompt = format!(
        "You are an expert content creator for educational typing games.
Generate interesting, grammatically correct text for a typing test.
It must be STRICTLY {count} words long. Count the words carefully.
Avoid complex punctuation; commas and periods are fine.
If the word count is large (over 30), write several sentences to reach it.

Difficulty: {difficulty}
Topic: {topic}
",
        count = request.word_count,
        difficulty = request.difficulty,
        topic = request.topic,
    );
    if let Some(word) = &request.random_word {
        prompt.push_str(&format!(
            "Theme word: {word} (incorporate this concept subtly or directly)\n"
        ));
    }
    prompt.push_str("\nReturn a JSON object with a single key \"sentence\".");
    prompt
}

pub fn categorize_prompt(words: &[String]) -> String {
    let mut listing = String::new();
    for word in words {
        listing.push_str("- ");
        listing.push_str(word);
        listing.push('\n');
    }
    format!(
        "You are an expert linguistic analyst specializing in spelling errors.
Group the misspelled words below into 3-5 distinct, descriptive categories based on the likely reason for the error.

Useful categories:
- Phonetic: Homophones (their/there), Vowel Teams (ie/ei), Silent Letters (knight).
- Orthographic: Suffix/Prefix Rules (hoping/hopping), Doubled Consonants (beginning), Irregular Plurals (mice).
- Etymological: words of foreign origin with unusual spellings (bouquet, psychology).

Misspelled words:
{listing}
For each category give the number of words that fit it. Sort from most to least frequent and leave out categories with a count of zero.
Return a JSON object {{\"categories\": [{{\"category\": string, \"count\": number}}]}}."
    )
}

/// The outermost `{ ... }` span of a reply, which models sometimes wrap in
/// prose or a markdown fence.
pub fn extract_json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

pub fn parse_reply<T: DeserializeOwned>(reply: &str) -> Result<T, GenerationError> {
    let json = extract_json_object(reply)
        .ok_or_else(|| GenerationError::Malformed("no JSON object in reply".to_string()))?;
    serde_json::from_str(json).map_err(|e| GenerationError::Malformed(e.to_string()))
}
