//! Spelling test: one word at a time, up to three attempts each.
//!
//! The machine is driven by [`SpellingEvent`]s and answers each one with a
//! list of [`SpellingEffect`]s for the front-end to carry out (speech, the
//! retry pause timer, clearing the input box, persisting the summary). It
//! never touches a clock, a speaker or a store itself.

use std::time::{Duration, Instant};

use chrono::Utc;

use crate::engine::scoring;
use crate::error::ValidationError;
use crate::session::announcer::{self, Utterance};
use crate::session::result::{SpellingSession, WordResult};
use crate::session::setup::SpellingSetup;

pub const MAX_ATTEMPTS: u32 = 3;
pub const RETRY_PAUSE: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feedback {
    Correct,
    /// Wrong, attempts remain. Waiting for the retry pause to elapse.
    Retry,
    /// Wrong on the last allowed attempt.
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpellingPhase {
    Ongoing,
    Feedback(Feedback),
    Revealed,
    Finished,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WordAttempt {
    pub word: String,
    /// `None` while pending. Set exactly once.
    pub correct: Option<bool>,
    pub user_input: String,
}

impl WordAttempt {
    fn pending(word: &str) -> Self {
        Self {
            word: word.to_string(),
            correct: None,
            user_input: String::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub enum SpellingEvent {
    Check { input: String, at: Instant },
    Reveal { partial: String },
    /// The retry pause scheduled by a wrong answer has run out.
    ResetElapsed,
    Advance { at: Instant },
    Replay,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SpellingEffect {
    Speak(Utterance),
    SpellOut(Vec<Utterance>),
    ScheduleReset(Duration),
    ClearInput,
    Finished(SpellingSession),
}

#[derive(Clone, Debug)]
pub struct SpellingTest {
    setup: SpellingSetup,
    words: Vec<WordAttempt>,
    index: usize,
    attempts: u32,
    phase: SpellingPhase,
    word_started_at: Instant,
    correct_secs: f64,
    correct_chars: usize,
}

impl SpellingTest {
    /// Start a test over `words`, presenting the first one at `at`.
    pub fn new(
        setup: SpellingSetup,
        words: &[String],
        at: Instant,
    ) -> Result<(Self, Vec<SpellingEffect>), ValidationError> {
        setup.validate()?;
        let words: Vec<WordAttempt> = words
            .iter()
            .map(|w| w.trim())
            .filter(|w| !w.is_empty())
            .map(WordAttempt::pending)
            .collect();
        if words.is_empty() {
            return Err(ValidationError::EmptyWordList);
        }

        let test = Self {
            setup,
            words,
            index: 0,
            attempts: 0,
            phase: SpellingPhase::Ongoing,
            word_started_at: at,
            correct_secs: 0.0,
            correct_chars: 0,
        };
        let effects = vec![test.speak_current()];
        tracing::debug!(words = test.words.len(), "spelling test started");
        Ok((test, effects))
    }

    pub fn phase(&self) -> SpellingPhase {
        self.phase
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn current_word(&self) -> &str {
        &self.words[self.index].word
    }

    pub fn current_attempt(&self) -> &WordAttempt {
        &self.words[self.index]
    }

    pub fn word_attempts(&self) -> &[WordAttempt] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn attempts_used(&self) -> u32 {
        self.attempts
    }

    pub fn attempts_left(&self) -> u32 {
        MAX_ATTEMPTS.saturating_sub(self.attempts)
    }

    pub fn setup(&self) -> &SpellingSetup {
        &self.setup
    }

    /// Fraction of the list reached, counting the word on screen.
    pub fn progress(&self) -> f64 {
        (self.index + 1) as f64 / self.words.len() as f64
    }

    /// The current word has an outcome and the test may move on.
    pub fn is_word_finished(&self) -> bool {
        self.phase == SpellingPhase::Revealed || self.words[self.index].correct.is_some()
    }

    pub fn can_reveal(&self) -> bool {
        self.phase == SpellingPhase::Ongoing && self.attempts < MAX_ATTEMPTS
    }

    pub fn correct_count(&self) -> usize {
        self.words.iter().filter(|w| w.correct == Some(true)).count()
    }

    /// Accuracy over the whole list so far; pending words count as wrong.
    pub fn accuracy(&self) -> f64 {
        scoring::accuracy_percent(self.correct_count(), self.words.len())
    }

    pub fn wpm(&self) -> f64 {
        scoring::spelling_wpm(self.correct_chars, self.correct_secs)
    }

    pub fn apply(&mut self, event: SpellingEvent) -> Vec<SpellingEffect> {
        match event {
            SpellingEvent::Check { input, at } => self.check(&input, at),
            SpellingEvent::Reveal { partial } => self.reveal(&partial),
            SpellingEvent::ResetElapsed => self.reset_elapsed(),
            SpellingEvent::Advance { at } => self.advance(at),
            SpellingEvent::Replay => self.replay(),
        }
    }

    fn check(&mut self, input: &str, at: Instant) -> Vec<SpellingEffect> {
        let input = input.trim();
        if self.phase != SpellingPhase::Ongoing || input.is_empty() {
            return Vec::new();
        }

        self.attempts += 1;
        let attempt = &mut self.words[self.index];

        if input.to_lowercase() == attempt.word.to_lowercase() {
            attempt.correct = Some(true);
            attempt.user_input = input.to_string();
            self.correct_secs += at.saturating_duration_since(self.word_started_at).as_secs_f64();
            self.correct_chars += attempt.word.chars().count();
            self.phase = SpellingPhase::Feedback(Feedback::Correct);
            tracing::debug!(word = %attempt.word, attempts = self.attempts, "spelled correctly");
            Vec::new()
        } else if self.attempts >= MAX_ATTEMPTS {
            attempt.correct = Some(false);
            attempt.user_input = input.to_string();
            self.phase = SpellingPhase::Feedback(Feedback::Failed);
            tracing::debug!(word = %attempt.word, "attempts exhausted");
            vec![SpellingEffect::SpellOut(announcer::spell_out(&attempt.word))]
        } else {
            self.phase = SpellingPhase::Feedback(Feedback::Retry);
            vec![SpellingEffect::ScheduleReset(RETRY_PAUSE)]
        }
    }

    fn reset_elapsed(&mut self) -> Vec<SpellingEffect> {
        if self.phase != SpellingPhase::Feedback(Feedback::Retry) {
            return Vec::new();
        }
        self.phase = SpellingPhase::Ongoing;
        vec![SpellingEffect::ClearInput]
    }

    fn reveal(&mut self, partial: &str) -> Vec<SpellingEffect> {
        if !self.can_reveal() {
            return Vec::new();
        }
        let attempt = &mut self.words[self.index];
        attempt.correct = Some(false);
        attempt.user_input = partial.trim().to_string();
        self.phase = SpellingPhase::Revealed;
        tracing::debug!(word = %attempt.word, "word revealed");
        vec![SpellingEffect::SpellOut(announcer::spell_out(&attempt.word))]
    }

    fn advance(&mut self, at: Instant) -> Vec<SpellingEffect> {
        if self.phase == SpellingPhase::Finished || !self.is_word_finished() {
            return Vec::new();
        }

        if self.index + 1 < self.words.len() {
            self.index += 1;
            self.attempts = 0;
            self.phase = SpellingPhase::Ongoing;
            self.word_started_at = at;
            vec![SpellingEffect::ClearInput, self.speak_current()]
        } else {
            self.phase = SpellingPhase::Finished;
            let summary = self.summary();
            tracing::info!(
                accuracy = summary.accuracy,
                words = summary.words.len(),
                "spelling test finished"
            );
            vec![SpellingEffect::Finished(summary)]
        }
    }

    fn replay(&mut self) -> Vec<SpellingEffect> {
        if self.phase == SpellingPhase::Finished {
            return Vec::new();
        }
        vec![self.speak_current()]
    }

    fn speak_current(&self) -> SpellingEffect {
        SpellingEffect::Speak(Utterance::new(self.current_word(), announcer::WORD_RATE))
    }

    /// Session record for the test as it stands. Pending words are recorded
    /// as incorrect.
    pub fn summary(&self) -> SpellingSession {
        let words: Vec<WordResult> = self
            .words
            .iter()
            .map(|w| WordResult {
                word: w.word.clone(),
                correct: w.correct == Some(true),
                user_input: w.user_input.clone(),
            })
            .collect();
        SpellingSession {
            date: Utc::now(),
            grade_level: self.setup.grade_level,
            difficulty: self.setup.difficulty,
            vocab_type: self.setup.vocab_type,
            accuracy: self.accuracy(),
            typing_speed_wpm: Some(self.wpm()),
            words,
        }
    }
}

/// Pure form of [`SpellingTest::apply`].
pub fn transition(
    mut state: SpellingTest,
    event: SpellingEvent,
) -> (SpellingTest, Vec<SpellingEffect>) {
    let effects = state.apply(event);
    (state, effects)
}
