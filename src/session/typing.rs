//! Typing test: configure, wait for a generated sentence, type it out.
//!
//! Like the spelling test this is a pure event → effects machine. The
//! one-second timer lives in the front-end; it is started and stopped through
//! [`TypingEffect::StartTimer`] / [`TypingEffect::StopTimer`] and feeds
//! [`TypingEvent::Tick`] back in.

use chrono::Utc;

use crate::engine::scoring;
use crate::session::announcer::{self, Utterance};
use crate::session::result::TypingSession;
use crate::session::setup::{TypingMode, TypingSetup};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypingPhase {
    Configuring,
    Loading,
    Ready,
    Typing,
    Finished,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharState {
    Correct,
    Incorrect,
    Pending,
}

#[derive(Clone, Debug)]
pub enum TypingEvent {
    Submit(TypingSetup),
    SentenceLoaded(String),
    GenerationFailed(String),
    /// New full contents of the input field.
    Input(String),
    Tick,
    Replay,
    Reset,
    /// Start over with the last submitted setup.
    Restart,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypingEffect {
    RememberSetup(TypingSetup),
    RequestSentence(TypingSetup),
    Speak(Utterance),
    StartTimer,
    StopTimer,
    Notify { title: String, message: String },
    Finished(TypingSession),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FinalScore {
    pub wpm: f64,
    pub cpm: f64,
    pub accuracy: f64,
    pub time: u32,
    pub error_count: u32,
}

#[derive(Clone, Debug)]
pub struct TypingTest {
    phase: TypingPhase,
    setup: Option<TypingSetup>,
    sentence: Vec<char>,
    input: Vec<char>,
    time: u32,
    error_count: u32,
    final_score: Option<FinalScore>,
}

impl Default for TypingTest {
    fn default() -> Self {
        Self::new()
    }
}

impl TypingTest {
    pub fn new() -> Self {
        Self {
            phase: TypingPhase::Configuring,
            setup: None,
            sentence: Vec::new(),
            input: Vec::new(),
            time: 0,
            error_count: 0,
            final_score: None,
        }
    }

    pub fn phase(&self) -> TypingPhase {
        self.phase
    }

    pub fn setup(&self) -> Option<&TypingSetup> {
        self.setup.as_ref()
    }

    pub fn sentence(&self) -> String {
        self.sentence.iter().collect()
    }

    pub fn input(&self) -> String {
        self.input.iter().collect()
    }

    pub fn time(&self) -> u32 {
        self.time
    }

    /// Every mistyped keystroke so far. Deleting a mistake does not take it
    /// back.
    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn live_wpm(&self) -> f64 {
        scoring::live_wpm(self.input.len(), self.time)
    }

    pub fn live_accuracy(&self) -> f64 {
        scoring::live_accuracy(self.input.len(), self.error_count)
    }

    pub fn final_score(&self) -> Option<FinalScore> {
        self.final_score
    }

    pub fn progress(&self) -> f64 {
        if self.sentence.is_empty() {
            return 0.0;
        }
        self.input.len() as f64 / self.sentence.len() as f64
    }

    /// Per-character state of the target for rendering.
    pub fn char_states(&self) -> Vec<(char, CharState)> {
        self.sentence
            .iter()
            .enumerate()
            .map(|(i, &expected)| {
                let state = match self.input.get(i) {
                    Some(&typed) if typed == expected => CharState::Correct,
                    Some(_) => CharState::Incorrect,
                    None => CharState::Pending,
                };
                (expected, state)
            })
            .collect()
    }

    /// What the typing screen shows. In speech mode the target stays
    /// hidden and only the typed characters appear, marked against it.
    pub fn display_chars(&self) -> Vec<(char, CharState)> {
        match self.setup.as_ref().map(|s| s.mode) {
            Some(TypingMode::Speech) => self
                .input
                .iter()
                .zip(&self.sentence)
                .map(|(&typed, &expected)| {
                    let state = if typed == expected {
                        CharState::Correct
                    } else {
                        CharState::Incorrect
                    };
                    (typed, state)
                })
                .collect(),
            _ => self.char_states(),
        }
    }

    pub fn apply(&mut self, event: TypingEvent) -> Vec<TypingEffect> {
        match event {
            TypingEvent::Submit(setup) => self.submit(setup),
            TypingEvent::SentenceLoaded(sentence) => self.sentence_loaded(&sentence),
            TypingEvent::GenerationFailed(message) => self.generation_failed(message),
            TypingEvent::Input(value) => self.input_changed(&value),
            TypingEvent::Tick => {
                if self.phase == TypingPhase::Typing {
                    self.time += 1;
                }
                Vec::new()
            }
            TypingEvent::Replay => match self.phase {
                TypingPhase::Ready | TypingPhase::Typing => {
                    vec![TypingEffect::Speak(self.sentence_utterance())]
                }
                _ => Vec::new(),
            },
            TypingEvent::Reset => self.reset(),
            TypingEvent::Restart => match self.setup.clone() {
                Some(setup) => {
                    let mut effects = self.reset();
                    effects.extend(self.submit(setup));
                    effects
                }
                None => self.reset(),
            },
        }
    }

    /// Convenience for keystroke-driven front-ends.
    pub fn type_char(&mut self, ch: char) -> Vec<TypingEffect> {
        let mut value = self.input.clone();
        value.push(ch);
        self.apply(TypingEvent::Input(value.into_iter().collect()))
    }

    pub fn backspace(&mut self) -> Vec<TypingEffect> {
        let mut value = self.input.clone();
        value.pop();
        self.apply(TypingEvent::Input(value.into_iter().collect()))
    }

    fn submit(&mut self, setup: TypingSetup) -> Vec<TypingEffect> {
        if !matches!(self.phase, TypingPhase::Configuring | TypingPhase::Finished) {
            return Vec::new();
        }
        if let Err(e) = setup.validate() {
            return vec![TypingEffect::Notify {
                title: "Invalid settings".to_string(),
                message: e.to_string(),
            }];
        }
        self.phase = TypingPhase::Loading;
        self.setup = Some(setup.clone());
        vec![
            TypingEffect::RememberSetup(setup.clone()),
            TypingEffect::RequestSentence(setup),
        ]
    }

    fn sentence_loaded(&mut self, sentence: &str) -> Vec<TypingEffect> {
        if self.phase != TypingPhase::Loading {
            // Stale response after the user moved on.
            tracing::debug!("discarding sentence that arrived outside loading");
            return Vec::new();
        }
        let sentence = sentence.trim();
        if sentence.is_empty() {
            return self.generation_failed("AI did not return a sentence.".to_string());
        }

        self.sentence = sentence.chars().collect();
        self.input.clear();
        self.time = 0;
        self.error_count = 0;
        self.final_score = None;
        self.phase = TypingPhase::Ready;

        match self.setup.as_ref().map(|s| s.mode) {
            Some(TypingMode::Speech) => vec![TypingEffect::Speak(self.sentence_utterance())],
            _ => Vec::new(),
        }
    }

    fn generation_failed(&mut self, message: String) -> Vec<TypingEffect> {
        if self.phase != TypingPhase::Loading {
            return Vec::new();
        }
        tracing::warn!(%message, "sentence generation failed");
        self.phase = TypingPhase::Configuring;
        vec![TypingEffect::Notify {
            title: "Failed to start test".to_string(),
            message,
        }]
    }

    fn input_changed(&mut self, value: &str) -> Vec<TypingEffect> {
        if !matches!(self.phase, TypingPhase::Ready | TypingPhase::Typing) {
            return Vec::new();
        }

        let mut effects = Vec::new();
        if self.phase == TypingPhase::Ready {
            self.phase = TypingPhase::Typing;
            effects.push(TypingEffect::StartTimer);
        }

        let value: Vec<char> = value.chars().take(self.sentence.len()).collect();
        if value.len() < self.input.len() {
            self.input = value;
            return effects;
        }

        if let Some(&typed) = value.last() {
            let position = value.len() - 1;
            if self.sentence.get(position) != Some(&typed) {
                self.error_count += 1;
            }
        }
        self.input = value;

        if self.input.len() == self.sentence.len() {
            self.phase = TypingPhase::Finished;
            effects.push(TypingEffect::StopTimer);
            let score = self.score();
            self.final_score = Some(score);
            if let Some(session) = self.session(score) {
                tracing::info!(wpm = session.wpm, accuracy = session.accuracy, "typing test finished");
                effects.push(TypingEffect::Finished(session));
            } else {
                tracing::debug!("typing test finished in under a second, not recorded");
            }
        }
        effects
    }

    fn reset(&mut self) -> Vec<TypingEffect> {
        let was_timing = self.phase == TypingPhase::Typing;
        self.phase = TypingPhase::Configuring;
        self.sentence.clear();
        self.input.clear();
        self.time = 0;
        self.error_count = 0;
        self.final_score = None;
        if was_timing {
            vec![TypingEffect::StopTimer]
        } else {
            Vec::new()
        }
    }

    fn score(&self) -> FinalScore {
        let input = self.input();
        FinalScore {
            wpm: scoring::final_wpm(&input, self.time),
            cpm: scoring::final_cpm(self.input.len(), self.time),
            accuracy: scoring::positional_accuracy(&self.input, &self.sentence),
            time: self.time,
            error_count: self.error_count,
        }
    }

    /// Nothing is recorded for a test finished before the first tick.
    fn session(&self, score: FinalScore) -> Option<TypingSession> {
        let setup = self.setup.as_ref()?;
        if score.time == 0 {
            return None;
        }
        Some(TypingSession {
            date: Utc::now(),
            difficulty: setup.difficulty,
            topic: setup.topic,
            mode: setup.mode,
            wpm: score.wpm,
            accuracy: score.accuracy,
            cpm: score.cpm,
            time: score.time,
            error_count: score.error_count,
        })
    }

    fn sentence_utterance(&self) -> Utterance {
        Utterance::new(self.sentence(), announcer::WORD_RATE)
    }
}

/// Pure form of [`TypingTest::apply`].
pub fn transition(mut state: TypingTest, event: TypingEvent) -> (TypingTest, Vec<TypingEffect>) {
    let effects = state.apply(event);
    (state, effects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::setup::{Difficulty, Topic};

    fn ready(sentence: &str) -> TypingTest {
        let mut test = TypingTest::new();
        test.apply(TypingEvent::Submit(TypingSetup::default()));
        test.apply(TypingEvent::SentenceLoaded(sentence.to_string()));
        test
    }

    fn type_str(test: &mut TypingTest, s: &str) -> Vec<TypingEffect> {
        let mut effects = Vec::new();
        for ch in s.chars() {
            effects.extend(test.type_char(ch));
        }
        effects
    }

    #[test]
    fn test_submit_requests_sentence() {
        let mut test = TypingTest::new();
        let setup = TypingSetup::default();
        let effects = test.apply(TypingEvent::Submit(setup.clone()));
        assert_eq!(test.phase(), TypingPhase::Loading);
        assert_eq!(
            effects,
            vec![
                TypingEffect::RememberSetup(setup.clone()),
                TypingEffect::RequestSentence(setup),
            ]
        );
    }

    #[test]
    fn test_invalid_setup_stays_configuring() {
        let mut test = TypingTest::new();
        let setup = TypingSetup {
            word_count: 2,
            ..TypingSetup::default()
        };
        let effects = test.apply(TypingEvent::Submit(setup));
        assert_eq!(test.phase(), TypingPhase::Configuring);
        assert!(matches!(effects.as_slice(), [TypingEffect::Notify { .. }]));
    }

    #[test]
    fn test_generation_failure_returns_to_configuring() {
        let mut test = TypingTest::new();
        test.apply(TypingEvent::Submit(TypingSetup::default()));
        let effects = test.apply(TypingEvent::GenerationFailed("boom".to_string()));
        assert_eq!(test.phase(), TypingPhase::Configuring);
        assert_eq!(
            effects,
            vec![TypingEffect::Notify {
                title: "Failed to start test".to_string(),
                message: "boom".to_string(),
            }]
        );
    }

    #[test]
    fn test_empty_sentence_is_a_failure() {
        let mut test = TypingTest::new();
        test.apply(TypingEvent::Submit(TypingSetup::default()));
        let effects = test.apply(TypingEvent::SentenceLoaded("   ".to_string()));
        assert_eq!(test.phase(), TypingPhase::Configuring);
        assert!(matches!(effects.as_slice(), [TypingEffect::Notify { .. }]));
    }

    #[test]
    fn test_stale_sentence_is_ignored() {
        let mut test = TypingTest::new();
        assert!(test.apply(TypingEvent::SentenceLoaded("late".to_string())).is_empty());
        assert_eq!(test.phase(), TypingPhase::Configuring);
    }

    #[test]
    fn test_speech_mode_speaks_sentence() {
        let mut test = TypingTest::new();
        test.apply(TypingEvent::Submit(TypingSetup {
            mode: TypingMode::Speech,
            ..TypingSetup::default()
        }));
        let effects = test.apply(TypingEvent::SentenceLoaded("hello there".to_string()));
        assert_eq!(test.phase(), TypingPhase::Ready);
        assert_eq!(
            effects,
            vec![TypingEffect::Speak(Utterance::new("hello there", 1.0))]
        );
    }

    #[test]
    fn test_first_keystroke_starts_timer() {
        let mut test = ready("abc");
        test.apply(TypingEvent::Tick);
        assert_eq!(test.time(), 0, "no ticks counted before typing");
        let effects = test.type_char('a');
        assert_eq!(effects, vec![TypingEffect::StartTimer]);
        assert_eq!(test.phase(), TypingPhase::Typing);
        test.apply(TypingEvent::Tick);
        test.apply(TypingEvent::Tick);
        assert_eq!(test.time(), 2);
    }

    #[test]
    fn test_corrected_mistake_keeps_error_but_scores_full_accuracy() {
        let mut test = ready("the fox");
        type_str(&mut test, "the");
        test.apply(TypingEvent::Tick);
        test.type_char(' ');
        test.type_char('g'); // wrong at position 4
        assert_eq!(test.error_count(), 1);
        test.backspace();
        assert_eq!(test.error_count(), 1);
        test.apply(TypingEvent::Tick);
        let effects = type_str(&mut test, "fox");

        assert_eq!(test.phase(), TypingPhase::Finished);
        assert_eq!(test.error_count(), 1);
        let score = test.final_score().unwrap();
        assert_eq!(score.accuracy, 100.0);
        assert_eq!(score.error_count, 1);

        // Live accuracy still reflects the sticky counter
        assert!((test.live_accuracy() - 600.0 / 7.0).abs() < 1e-9);

        let session = effects
            .iter()
            .find_map(|e| match e {
                TypingEffect::Finished(s) => Some(s.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(session.accuracy, 100.0);
        assert_eq!(session.error_count, 1);
        assert_eq!(session.time, 2);
        // 2 words in 2 s, 7 chars in 2 s
        assert_eq!(session.wpm, 60.0);
        assert_eq!(session.cpm, 210.0);
        assert_eq!(session.topic, Topic::General);
        assert_eq!(session.difficulty, Difficulty::Medium);
        assert!(effects.contains(&TypingEffect::StopTimer));
    }

    #[test]
    fn test_uncorrected_mistake_lowers_final_accuracy() {
        let mut test = ready("abcd");
        test.type_char('a');
        test.apply(TypingEvent::Tick);
        type_str(&mut test, "xcd");
        let score = test.final_score().unwrap();
        assert_eq!(score.accuracy, 75.0);
        assert_eq!(score.error_count, 1);
    }

    #[test]
    fn test_deletion_does_not_count_errors() {
        let mut test = ready("abcdef");
        type_str(&mut test, "abc");
        test.apply(TypingEvent::Input("a".to_string()));
        assert_eq!(test.input(), "a");
        assert_eq!(test.error_count(), 0);
    }

    #[test]
    fn test_finish_without_ticks_is_not_recorded() {
        let mut test = ready("hi");
        let effects = type_str(&mut test, "hi");
        assert_eq!(test.phase(), TypingPhase::Finished);
        assert!(test.final_score().is_some());
        assert!(!effects.iter().any(|e| matches!(e, TypingEffect::Finished(_))));
    }

    #[test]
    fn test_input_longer_than_sentence_is_truncated() {
        let mut test = ready("ab");
        test.apply(TypingEvent::Tick);
        test.apply(TypingEvent::Input("abzz".to_string()));
        assert_eq!(test.input(), "ab");
        assert_eq!(test.phase(), TypingPhase::Finished);
    }

    #[test]
    fn test_live_estimates() {
        let mut test = ready("hello world");
        assert_eq!(test.live_accuracy(), 100.0);
        assert_eq!(test.live_wpm(), 0.0);
        type_str(&mut test, "hellp");
        test.apply(TypingEvent::Tick);
        assert_eq!(test.live_accuracy(), 80.0);
        // (5 / 5) / (1 / 60)
        assert_eq!(test.live_wpm(), 60.0);
    }

    #[test]
    fn test_progress_follows_input() {
        let mut test = TypingTest::new();
        assert_eq!(test.progress(), 0.0);
        test = ready("abcd");
        type_str(&mut test, "ab");
        assert_eq!(test.progress(), 0.5);
        test.backspace();
        assert_eq!(test.progress(), 0.25);
    }

    #[test]
    fn test_speech_mode_hides_target_text() {
        let mut test = TypingTest::new();
        test.apply(TypingEvent::Submit(TypingSetup {
            mode: TypingMode::Speech,
            ..TypingSetup::default()
        }));
        test.apply(TypingEvent::SentenceLoaded("cat".to_string()));
        assert!(test.display_chars().is_empty());
        type_str(&mut test, "cx");
        assert_eq!(
            test.display_chars(),
            vec![('c', CharState::Correct), ('x', CharState::Incorrect)]
        );
    }

    #[test]
    fn test_read_mode_shows_whole_target() {
        let mut test = ready("cat");
        type_str(&mut test, "cx");
        assert_eq!(test.display_chars(), test.char_states());
        assert_eq!(test.display_chars().len(), 3);
    }

    #[test]
    fn test_char_states() {
        let mut test = ready("abc");
        type_str(&mut test, "ax");
        assert_eq!(
            test.char_states(),
            vec![
                ('a', CharState::Correct),
                ('b', CharState::Incorrect),
                ('c', CharState::Pending),
            ]
        );
    }

    #[test]
    fn test_reset_stops_timer_and_clears() {
        let mut test = ready("abc");
        test.type_char('a');
        let effects = test.apply(TypingEvent::Reset);
        assert_eq!(effects, vec![TypingEffect::StopTimer]);
        assert_eq!(test.phase(), TypingPhase::Configuring);
        assert_eq!(test.input(), "");
        assert_eq!(test.sentence(), "");
        assert!(test.setup().is_some());
    }

    #[test]
    fn test_restart_resubmits_last_setup() {
        let mut test = ready("ab");
        test.apply(TypingEvent::Tick);
        type_str(&mut test, "ab");
        let effects = test.apply(TypingEvent::Restart);
        assert_eq!(test.phase(), TypingPhase::Loading);
        assert!(effects.contains(&TypingEffect::RequestSentence(TypingSetup::default())));
    }

    #[test]
    fn test_restart_without_setup_resets() {
        let mut test = TypingTest::new();
        assert!(test.apply(TypingEvent::Restart).is_empty());
        assert_eq!(test.phase(), TypingPhase::Configuring);
    }

    #[test]
    fn test_typing_after_finish_is_ignored() {
        let mut test = ready("a");
        test.type_char('a');
        assert!(test.type_char('b').is_empty());
        assert_eq!(test.input(), "a");
    }
}
