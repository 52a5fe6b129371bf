use std::collections::VecDeque;
use std::time::{Duration, Instant};

use anyhow::Result;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::config::Config;
use crate::engine::progress::{self, ProgressReport};
use crate::error::GenerationError;
use crate::event::TickClock;
use crate::generator::llm::LlmClient;
use crate::generator::offline::OfflineGenerator;
use crate::generator::{self, ContentProvider, MistakeCategory, SentenceRequest, WordListRequest};
use crate::session::announcer::{Announcer, CommandAnnouncer, SilentAnnouncer};
use crate::session::result::{SpellingSession, TypingSession};
use crate::session::setup::{SpellingSetup, TypingSetup};
use crate::session::spelling::{SpellingEffect, SpellingEvent, SpellingTest};
use crate::session::typing::{TypingEffect, TypingEvent, TypingTest};
use crate::store::json_store::JsonStore;
use crate::store::kv::KeyValueStore;
use crate::store::performance::PerformanceStore;

/// A dismissable message for the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

/// Owns the capabilities and runs the effects the state machines emit.
pub struct App {
    pub config: Config,
    pub store: PerformanceStore<Box<dyn KeyValueStore>>,
    provider: Box<dyn ContentProvider>,
    announcer: Box<dyn Announcer>,
    rng: SmallRng,
    pub spelling: Option<SpellingTest>,
    pub typing: TypingTest,
    pub notice: Option<Notice>,
    clock: TickClock,
    pub last_spelling: Option<SpellingSession>,
    pub last_typing: Option<TypingSession>,
    reset_due: Option<Instant>,
}

impl App {
    pub fn new(
        config: Config,
        store: Box<dyn KeyValueStore>,
        provider: Box<dyn ContentProvider>,
        announcer: Box<dyn Announcer>,
    ) -> Self {
        Self {
            config,
            store: PerformanceStore::new(store),
            provider,
            announcer,
            rng: SmallRng::from_entropy(),
            spelling: None,
            typing: TypingTest::new(),
            notice: None,
            clock: TickClock::new(Duration::from_secs(1)),
            last_spelling: None,
            last_typing: None,
            reset_due: None,
        }
    }

    /// Wire up the file store, content provider and speech from config.
    pub fn from_config(config: Config) -> Result<Self> {
        let json_store = JsonStore::with_base_dir(config.data_path())?;
        json_store.clean_interrupted_writes();

        let provider: Box<dyn ContentProvider> = if config.offline {
            tracing::info!("using built-in word and sentence banks");
            Box::new(OfflineGenerator::new())
        } else {
            Box::new(LlmClient::from_config(&config))
        };
        let announcer: Box<dyn Announcer> = if config.speech_enabled {
            Box::new(CommandAnnouncer::new(&config.speech_program))
        } else {
            Box::new(SilentAnnouncer)
        };

        Ok(Self::new(config, Box::new(json_store), provider, announcer))
    }

    pub fn default_spelling_setup(&self) -> SpellingSetup {
        SpellingSetup {
            grade_level: self.config.default_grade_level,
            difficulty: self.config.default_difficulty,
            vocab_type: self.config.default_vocab_type,
            word_count: None,
        }
    }

    /// The last typing setup used, or one built from config.
    pub fn default_typing_setup(&self) -> TypingSetup {
        self.store.last_typing_setup().unwrap_or_else(|| TypingSetup {
            word_count: self.config.typing_word_count,
            ..TypingSetup::default()
        })
    }

    // --- Spelling ---

    /// Generate a word list informed by past results and start a test.
    pub fn start_spelling(
        &mut self,
        setup: SpellingSetup,
    ) -> Result<Vec<SpellingEffect>, GenerationError> {
        setup.validate()?;
        let request = WordListRequest::new(&setup, self.store.summarize_past_performance());
        let words = generator::generate_word_list(self.provider.as_mut(), &request)?;
        tracing::info!(
            words = words.len(),
            grade = setup.grade_level,
            difficulty = %setup.difficulty,
            "starting spelling test"
        );

        let (test, effects) = SpellingTest::new(setup, &words, Instant::now())?;
        self.spelling = Some(test);
        self.last_spelling = None;
        self.reset_due = None;
        self.run_spelling_effects(&effects);
        Ok(effects)
    }

    /// Feed an event to the running spelling test. Effects the app owns
    /// (speech, persistence, the retry timer) are carried out here; all of
    /// them are returned so the front-end can act on input clearing.
    pub fn spelling_event(&mut self, event: SpellingEvent) -> Vec<SpellingEffect> {
        let Some(test) = self.spelling.as_mut() else {
            return Vec::new();
        };
        let effects = test.apply(event);
        self.run_spelling_effects(&effects);
        effects
    }

    /// When the retry pause is due at or before `now`, fire it.
    pub fn poll_timers(&mut self, now: Instant) -> Vec<SpellingEffect> {
        match self.reset_due {
            Some(due) if due <= now => {
                self.reset_due = None;
                self.spelling_event(SpellingEvent::ResetElapsed)
            }
            _ => Vec::new(),
        }
    }

    pub fn reset_due(&self) -> Option<Instant> {
        self.reset_due
    }

    fn run_spelling_effects(&mut self, effects: &[SpellingEffect]) {
        for effect in effects {
            match effect {
                SpellingEffect::Speak(utterance) => {
                    self.announcer.play(&utterance.text, utterance.rate)
                }
                SpellingEffect::SpellOut(parts) => self.announcer.play_sequence(parts),
                SpellingEffect::ScheduleReset(delay) => {
                    self.reset_due = Some(Instant::now() + *delay);
                }
                SpellingEffect::ClearInput => {}
                SpellingEffect::Finished(session) => {
                    if let Err(e) = self.store.append_spelling(session.clone()) {
                        tracing::warn!(error = %e, "failed to save spelling results");
                    }
                    self.last_spelling = Some(session.clone());
                }
            }
        }
    }

    // --- Typing ---

    /// Feed an event to the typing test and run everything it triggers,
    /// including synchronous sentence generation. Returns every effect
    /// in the order it was run.
    pub fn typing_event(&mut self, event: TypingEvent) -> Vec<TypingEffect> {
        let mut queue: VecDeque<TypingEffect> = self.typing.apply(event).into();
        let mut ran = Vec::new();
        while let Some(effect) = queue.pop_front() {
            match &effect {
                TypingEffect::RememberSetup(setup) => {
                    if let Err(e) = self.store.save_typing_setup(setup) {
                        tracing::warn!(error = %e, "failed to save typing config");
                    }
                }
                TypingEffect::RequestSentence(setup) => {
                    let follow_up = match self.request_sentence(setup) {
                        Ok(sentence) => TypingEvent::SentenceLoaded(sentence),
                        Err(e) => {
                            tracing::warn!(error = %e, "sentence generation failed");
                            TypingEvent::GenerationFailed(e.user_message().to_string())
                        }
                    };
                    queue.extend(self.typing.apply(follow_up));
                }
                TypingEffect::Speak(utterance) => {
                    self.announcer.play(&utterance.text, utterance.rate)
                }
                TypingEffect::StartTimer => self.clock.start(Instant::now()),
                TypingEffect::StopTimer => self.clock.stop(),
                TypingEffect::Notify { title, message } => {
                    self.notice = Some(Notice {
                        title: title.clone(),
                        message: message.clone(),
                    });
                }
                TypingEffect::Finished(session) => {
                    if let Err(e) = self.store.append_typing(session.clone()) {
                        tracing::warn!(error = %e, "failed to save typing results");
                    }
                    self.last_typing = Some(session.clone());
                }
            }
            ran.push(effect);
        }
        ran
    }

    /// Feed one `Tick` per whole second elapsed since the timer started.
    pub fn poll_typing_clock(&mut self, now: Instant) -> Vec<TypingEffect> {
        let mut effects = Vec::new();
        for _ in 0..self.clock.take_due(now) {
            effects.extend(self.typing_event(TypingEvent::Tick));
        }
        effects
    }

    pub fn timer_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn next_tick(&self) -> Option<Instant> {
        self.clock.next_tick()
    }

    fn request_sentence(&mut self, setup: &TypingSetup) -> Result<String, GenerationError> {
        let request = SentenceRequest::new(setup).with_random_theme(&mut self.rng);
        generator::generate_sentence(self.provider.as_mut(), &request)
    }

    pub fn dismiss_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    // --- Progress ---

    pub fn progress_report(&self) -> ProgressReport {
        ProgressReport::build(&self.store)
    }

    pub fn run_analysis(&mut self, force: bool) -> Result<Vec<MistakeCategory>, GenerationError> {
        progress::run_analysis(&mut self.store, self.provider.as_mut(), force)
    }

    /// Stop any speech still playing.
    pub fn shutdown(&mut self) {
        self.announcer.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::mock::MockProvider;
    use crate::generator::{
        MistakeCategorizer, SentenceGenerator, SentenceRequest, WordListGenerator,
        WordListRequest,
    };
    use crate::session::announcer::RecordingAnnouncer;
    use crate::session::setup::{Difficulty, VocabType};
    use crate::session::spelling::SpellingPhase;
    use crate::session::typing::TypingPhase;
    use crate::store::kv::MemoryStore;

    fn app(provider: MockProvider) -> App {
        App::new(
            Config::default(),
            Box::new(MemoryStore::new()),
            Box::new(provider),
            Box::new(SilentAnnouncer),
        )
    }

    fn spelling_setup() -> SpellingSetup {
        SpellingSetup {
            grade_level: 2,
            difficulty: Difficulty::Easy,
            vocab_type: VocabType::General,
            word_count: None,
        }
    }

    #[test]
    fn test_start_spelling_invalid_grade_is_rejected() {
        let mut app = app(MockProvider::default());
        let setup = SpellingSetup {
            grade_level: 0,
            ..spelling_setup()
        };
        let err = app.start_spelling(setup).unwrap_err();
        assert_eq!(err.user_message(), "Invalid input data.");
        assert!(app.spelling.is_none());
    }

    #[test]
    fn test_generation_failure_does_not_start_session() {
        let mut app = app(MockProvider::failing("down"));
        assert!(app.start_spelling(spelling_setup()).is_err());
        assert!(app.spelling.is_none());
    }

    #[test]
    fn test_spelling_session_is_saved_when_finished() {
        let mut app = app(MockProvider::with_words(&["cat"]));
        app.start_spelling(spelling_setup()).unwrap();
        let now = Instant::now();
        app.spelling_event(SpellingEvent::Check {
            input: "cat".to_string(),
            at: now,
        });
        let effects = app.spelling_event(SpellingEvent::Advance { at: now });
        assert!(
            effects
                .iter()
                .any(|e| matches!(e, SpellingEffect::Finished(_)))
        );
        assert_eq!(app.store.spelling_history().len(), 1);
        assert_eq!(app.last_spelling.as_ref().map(|s| s.accuracy), Some(100.0));
    }

    #[test]
    fn test_retry_pause_fires_from_poll() {
        let mut app = app(MockProvider::with_words(&["cat"]));
        app.start_spelling(spelling_setup()).unwrap();
        app.spelling_event(SpellingEvent::Check {
            input: "kat".to_string(),
            at: Instant::now(),
        });
        let due = app.reset_due().unwrap();
        assert!(app.poll_timers(due - Duration::from_millis(500)).is_empty());
        let effects = app.poll_timers(due);
        assert!(effects.contains(&SpellingEffect::ClearInput));
        assert_eq!(
            app.spelling.as_ref().map(|t| t.phase()),
            Some(SpellingPhase::Ongoing)
        );
        assert_eq!(app.reset_due(), None);
    }

    #[test]
    fn test_finished_session_feeds_next_digest() {
        let mut app = app(MockProvider::with_words(&["cat"]));
        app.start_spelling(spelling_setup()).unwrap();
        app.spelling_event(SpellingEvent::Check {
            input: "cat".to_string(),
            at: Instant::now(),
        });
        app.spelling_event(SpellingEvent::Advance { at: Instant::now() });
        let digest = app.store.summarize_past_performance();
        assert!(digest.contains("Correct: [cat]. Incorrect: []."));
    }

    #[test]
    fn test_typing_flow_loads_sentence_and_remembers_setup() {
        let mut provider = MockProvider::default();
        provider.sentence = "  hi   there ".to_string();
        let mut app = app(provider);
        let setup = TypingSetup::default();
        let effects = app.typing_event(TypingEvent::Submit(setup.clone()));
        assert!(matches!(effects[0], TypingEffect::RememberSetup(_)));
        assert_eq!(app.typing.phase(), TypingPhase::Ready);
        assert_eq!(app.typing.sentence(), "hi there");
        assert_eq!(app.default_typing_setup(), setup);
    }

    #[test]
    fn test_typing_clock_starts_on_first_keystroke() {
        let mut provider = MockProvider::default();
        provider.sentence = "abc".to_string();
        let mut app = app(provider);
        app.typing_event(TypingEvent::Submit(TypingSetup::default()));
        assert_eq!(app.next_tick(), None);
        assert!(app.poll_typing_clock(Instant::now() + Duration::from_secs(5)).is_empty());

        app.typing_event(TypingEvent::Input("a".to_string()));
        let first = app.next_tick().unwrap();
        app.poll_typing_clock(first - Duration::from_millis(1));
        assert_eq!(app.typing.time(), 0);
        app.poll_typing_clock(first + Duration::from_secs(1));
        assert_eq!(app.typing.time(), 2);
    }

    #[test]
    fn test_sub_second_typing_finish_is_not_saved() {
        let mut provider = MockProvider::default();
        provider.sentence = "ab".to_string();
        let mut app = app(provider);
        app.typing_event(TypingEvent::Submit(TypingSetup::default()));
        app.typing_event(TypingEvent::Input("a".to_string()));
        let first = app.next_tick().unwrap();
        app.poll_typing_clock(first - Duration::from_millis(100));
        app.typing_event(TypingEvent::Input("ab".to_string()));
        assert_eq!(app.typing.phase(), TypingPhase::Finished);
        assert!(!app.timer_running());
        // A late poll after the finish must not count
        assert!(app.poll_typing_clock(first + Duration::from_secs(3)).is_empty());
        assert!(app.store.typing_history().is_empty());
    }

    #[test]
    fn test_typing_generation_failure_notifies() {
        let mut app = app(MockProvider::failing("timeout"));
        app.typing_event(TypingEvent::Submit(TypingSetup::default()));
        assert_eq!(app.typing.phase(), TypingPhase::Configuring);
        let notice = app.dismiss_notice().unwrap();
        assert_eq!(notice.title, "Failed to start test");
        assert!(app.notice.is_none());
    }

    /// Serves one sentence, then every call fails.
    struct OneSentenceProvider {
        inner: MockProvider,
    }

    impl WordListGenerator for OneSentenceProvider {
        fn generate_word_list(
            &mut self,
            request: &WordListRequest,
        ) -> Result<Vec<String>, GenerationError> {
            self.inner.generate_word_list(request)
        }
    }

    impl SentenceGenerator for OneSentenceProvider {
        fn generate_sentence(
            &mut self,
            request: &SentenceRequest,
        ) -> Result<String, GenerationError> {
            let sentence = self.inner.generate_sentence(request);
            self.inner.fail_with = Some("offline".to_string());
            sentence
        }
    }

    impl MistakeCategorizer for OneSentenceProvider {
        fn categorize(&mut self, words: &[String]) -> Result<Vec<MistakeCategory>, GenerationError> {
            self.inner.categorize(words)
        }
    }

    #[test]
    fn test_failed_restart_leaves_notice() {
        let mut app = App::new(
            Config::default(),
            Box::new(MemoryStore::new()),
            Box::new(OneSentenceProvider {
                inner: MockProvider::default(),
            }),
            Box::new(SilentAnnouncer),
        );
        app.typing_event(TypingEvent::Submit(TypingSetup::default()));
        assert_eq!(app.typing.phase(), TypingPhase::Ready);
        app.typing_event(TypingEvent::Input("T".to_string()));
        assert!(app.timer_running());

        app.typing_event(TypingEvent::Restart);
        assert_eq!(app.typing.phase(), TypingPhase::Configuring);
        assert!(!app.timer_running());
        let notice = app.dismiss_notice().unwrap();
        assert_eq!(notice.title, "Failed to start test");
    }

    #[test]
    fn test_typing_finish_saves_and_stops_timer() {
        let mut provider = MockProvider::default();
        provider.sentence = "ab".to_string();
        let mut app = app(provider);
        app.typing_event(TypingEvent::Submit(TypingSetup::default()));
        app.typing_event(TypingEvent::Input("a".to_string()));
        assert!(app.timer_running());
        app.typing_event(TypingEvent::Tick);
        app.typing_event(TypingEvent::Input("ab".to_string()));
        assert!(!app.timer_running());
        assert_eq!(app.store.typing_history().len(), 1);
        assert!(app.last_typing.is_some());
    }

    #[test]
    fn test_speech_routed_to_announcer() {
        let mut app = App::new(
            Config::default(),
            Box::new(MemoryStore::new()),
            Box::new(MockProvider::with_words(&["ship"])),
            Box::new(RecordingAnnouncer::default()),
        );
        // The first word is announced on start
        let effects = app.start_spelling(spelling_setup()).unwrap();
        assert!(matches!(&effects[0], SpellingEffect::Speak(u) if u.text == "ship"));
    }

    #[test]
    fn test_default_typing_setup_uses_config_word_count() {
        let mut app = app(MockProvider::default());
        app.config.typing_word_count = 35;
        assert_eq!(app.default_typing_setup().word_count, 35);
    }

    #[test]
    fn test_run_analysis_through_app() {
        let mut provider = MockProvider::with_words(&["knight"]);
        provider.categories = vec![MistakeCategory {
            category: "Silent Letters".to_string(),
            count: 1,
        }];
        let mut app = app(provider);
        assert!(app.run_analysis(false).unwrap().is_empty());

        app.start_spelling(spelling_setup()).unwrap();
        let now = Instant::now();
        for _ in 0..3 {
            app.spelling_event(SpellingEvent::Check {
                input: "nite".to_string(),
                at: now,
            });
            app.poll_timers(now + Duration::from_secs(2));
        }
        app.spelling_event(SpellingEvent::Advance { at: now });
        let categories = app.run_analysis(false).unwrap();
        assert_eq!(categories[0].category, "Silent Letters");
        assert_eq!(app.progress_report().misspelled_words, vec!["knight"]);
    }
}
