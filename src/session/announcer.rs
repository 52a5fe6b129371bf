use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub const WORD_RATE: f32 = 1.0;
pub const LETTER_RATE: f32 = 0.8;

const BASE_WORDS_PER_MINUTE: f32 = 175.0;
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Clone, Debug, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub rate: f32,
}

impl Utterance {
    pub fn new(text: impl Into<String>, rate: f32) -> Self {
        Self {
            text: text.into(),
            rate,
        }
    }
}

/// The word, each of its letters more slowly, then the word again.
pub fn spell_out(word: &str) -> Vec<Utterance> {
    let mut parts = Vec::with_capacity(word.chars().count() + 2);
    parts.push(Utterance::new(word, WORD_RATE));
    parts.extend(word.chars().map(|c| Utterance::new(c.to_string(), LETTER_RATE)));
    parts.push(Utterance::new(word, WORD_RATE));
    parts
}

/// Speech output. Playback is fire-and-forget and failures are never
/// reported; queueing anything new supersedes what is playing.
pub trait Announcer {
    fn play(&mut self, text: &str, rate: f32);

    /// Play the parts back to back. Cancelled as a whole by `cancel` or by
    /// the next `play`.
    fn play_sequence(&mut self, parts: &[Utterance]);

    fn cancel(&mut self);
}

/// Announcer that says nothing.
#[derive(Debug, Default)]
pub struct SilentAnnouncer;

impl Announcer for SilentAnnouncer {
    fn play(&mut self, _text: &str, _rate: f32) {}
    fn play_sequence(&mut self, _parts: &[Utterance]) {}
    fn cancel(&mut self) {}
}

/// Announcer that remembers what it was asked to say.
#[derive(Debug, Default)]
pub struct RecordingAnnouncer {
    pub spoken: Vec<Vec<Utterance>>,
    pub cancels: usize,
}

impl RecordingAnnouncer {
    pub fn last_text(&self) -> Option<String> {
        self.spoken.last().map(|parts| {
            parts
                .iter()
                .map(|u| u.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
    }
}

impl Announcer for RecordingAnnouncer {
    fn play(&mut self, text: &str, rate: f32) {
        self.cancel();
        self.spoken.push(vec![Utterance::new(text, rate)]);
    }

    fn play_sequence(&mut self, parts: &[Utterance]) {
        self.cancel();
        self.spoken.push(parts.to_vec());
    }

    fn cancel(&mut self) {
        self.cancels += 1;
    }
}

/// Speaks through an external text-to-speech program such as `espeak`,
/// invoked as `<program> -s <words-per-minute> <text>`.
pub struct CommandAnnouncer {
    program: String,
    /// The playing child, tagged with the generation that spawned it.
    current: Arc<Mutex<Option<(u64, Child)>>>,
    generation: Arc<AtomicU64>,
}

impl CommandAnnouncer {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            current: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn spawn(program: &str, utterance: &Utterance) -> Option<Child> {
        let speed = (BASE_WORDS_PER_MINUTE * utterance.rate).round() as u32;
        match Command::new(program)
            .arg("-s")
            .arg(speed.to_string())
            .arg(&utterance.text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => Some(child),
            Err(e) => {
                tracing::debug!(program, error = %e, "speech playback failed");
                None
            }
        }
    }

    /// Block until the child of `generation` exits. Returns false if it
    /// was cancelled or replaced by a newer sequence; a newer child is left
    /// alone for its own thread to wait on.
    fn wait_current(current: &Mutex<Option<(u64, Child)>>, generation: u64) -> bool {
        loop {
            {
                let Ok(mut guard) = current.lock() else {
                    return false;
                };
                let Some((owner, child)) = guard.as_mut() else {
                    return false;
                };
                if *owner != generation {
                    return false;
                }
                match child.try_wait() {
                    Ok(None) => {}
                    Ok(Some(_)) | Err(_) => {
                        *guard = None;
                        return true;
                    }
                }
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Announcer for CommandAnnouncer {
    fn play(&mut self, text: &str, rate: f32) {
        self.play_sequence(&[Utterance::new(text, rate)]);
    }

    fn play_sequence(&mut self, parts: &[Utterance]) {
        self.cancel();
        if parts.is_empty() {
            return;
        }
        let generation = self.generation.load(Ordering::SeqCst);
        let current = Arc::clone(&self.current);
        let latest = Arc::clone(&self.generation);
        let program = self.program.clone();
        let parts = parts.to_vec();

        thread::spawn(move || {
            for part in &parts {
                if latest.load(Ordering::SeqCst) != generation {
                    return;
                }
                let Some(mut child) = Self::spawn(&program, part) else {
                    return;
                };
                match current.lock() {
                    Ok(mut guard) => {
                        if latest.load(Ordering::SeqCst) != generation {
                            let _ = child.kill();
                            let _ = child.wait();
                            return;
                        }
                        *guard = Some((generation, child));
                    }
                    Err(_) => return,
                }
                if !Self::wait_current(&current, generation) {
                    return;
                }
            }
        });
    }

    fn cancel(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.current.lock()
            && let Some((_, mut child)) = guard.take()
        {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for CommandAnnouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spell_out_parts_and_rates() {
        let parts = spell_out("dog");
        let texts: Vec<&str> = parts.iter().map(|u| u.text.as_str()).collect();
        assert_eq!(texts, vec!["dog", "d", "o", "g", "dog"]);
        assert_eq!(parts[0].rate, WORD_RATE);
        assert_eq!(parts[1].rate, LETTER_RATE);
        assert_eq!(parts[3].rate, LETTER_RATE);
        assert_eq!(parts[4].rate, WORD_RATE);
    }

    #[test]
    fn test_recording_announcer_cancels_before_each_play() {
        let mut announcer = RecordingAnnouncer::default();
        announcer.play("cat", WORD_RATE);
        announcer.play_sequence(&spell_out("cat"));
        assert_eq!(announcer.spoken.len(), 2);
        assert_eq!(announcer.cancels, 2);
        assert_eq!(announcer.last_text().unwrap(), "cat c a t cat");
    }

    /// Fake speech program next to `log` that appends its text there and
    /// takes 150 ms to "say" it.
    #[cfg(unix)]
    fn fake_speaker(log: &std::path::Path) -> String {
        use std::os::unix::fs::PermissionsExt;

        let script = log.with_extension("sh");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho \"$3\" >> '{}'\nsleep 0.15\n", log.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script.to_string_lossy().to_string()
    }

    #[cfg(unix)]
    fn spoken_lines(log: &std::path::Path) -> Vec<String> {
        std::fs::read_to_string(log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[cfg(unix)]
    #[test]
    fn test_sequence_survives_interrupted_word() {
        let dir = tempfile::TempDir::new().unwrap();
        for run in 0..5 {
            let log = dir.path().join(format!("run{run}.log"));
            let mut announcer = CommandAnnouncer::new(&fake_speaker(&log));

            announcer.play("word", WORD_RATE);
            thread::sleep(Duration::from_millis(60));
            announcer.play_sequence(&[
                Utterance::new("x", LETTER_RATE),
                Utterance::new("y", LETTER_RATE),
                Utterance::new("z", LETTER_RATE),
            ]);

            let deadline = std::time::Instant::now() + Duration::from_secs(3);
            while !spoken_lines(&log).iter().any(|l| l == "z")
                && std::time::Instant::now() < deadline
            {
                thread::sleep(Duration::from_millis(20));
            }
            let spoken = spoken_lines(&log);
            assert!(
                spoken.ends_with(&["x".to_string(), "y".to_string(), "z".to_string()]),
                "run {run}: spoken {spoken:?}"
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_cancel_stops_sequence() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = dir.path().join("cancel.log");
        let mut announcer = CommandAnnouncer::new(&fake_speaker(&log));
        announcer.play_sequence(&spell_out("cat"));
        thread::sleep(Duration::from_millis(60));
        announcer.cancel();
        thread::sleep(Duration::from_millis(500));
        // At most the word itself got out before the cancel
        let spoken = spoken_lines(&log);
        assert!(spoken.len() <= 1, "spoken {spoken:?}");
    }

    #[test]
    fn test_missing_program_is_ignored() {
        let mut announcer = CommandAnnouncer::new("lexilearn-no-such-tts-program");
        announcer.play("hello", WORD_RATE);
        announcer.cancel();
    }
}
