use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyEvent, KeyEventKind};

pub enum AppEvent {
    Key(KeyEvent),
    /// Fired once per `tick_rate` regardless of key traffic.
    Tick,
}

/// Reads terminal key presses on a background thread and interleaves them
/// with a steady redraw tick.
pub struct EventHandler {
    rx: mpsc::Receiver<AppEvent>,
    _tx: mpsc::Sender<AppEvent>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        let _tx = tx.clone();

        thread::spawn(move || {
            let mut next_tick = Instant::now() + tick_rate;
            loop {
                let timeout = next_tick.saturating_duration_since(Instant::now());
                if event::poll(timeout).unwrap_or(false) {
                    match event::read() {
                        Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                            if tx.send(AppEvent::Key(key)).is_err() {
                                return;
                            }
                        }
                        Ok(_) => {}
                        Err(e) => tracing::debug!(error = %e, "terminal event read failed"),
                    }
                }
                if Instant::now() >= next_tick {
                    next_tick += tick_rate;
                    if tx.send(AppEvent::Tick).is_err() {
                        return;
                    }
                }
            }
        });

        Self { rx, _tx }
    }

    pub fn next(&self) -> anyhow::Result<AppEvent> {
        Ok(self.rx.recv()?)
    }
}

/// Whole-second clock for the typing test, anchored at the moment it is
/// started so the first second is always a full one.
#[derive(Clone, Copy, Debug)]
pub struct TickClock {
    interval: Duration,
    next: Option<Instant>,
}

impl TickClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: None,
        }
    }

    pub fn start(&mut self, at: Instant) {
        self.next = Some(at + self.interval);
    }

    pub fn stop(&mut self) {
        self.next = None;
    }

    pub fn is_running(&self) -> bool {
        self.next.is_some()
    }

    pub fn next_tick(&self) -> Option<Instant> {
        self.next
    }

    /// Number of whole intervals that ran out by `now`, advancing past them.
    pub fn take_due(&mut self, now: Instant) -> u32 {
        let Some(mut next) = self.next else {
            return 0;
        };
        let mut due = 0;
        while next <= now {
            due += 1;
            next += self.interval;
        }
        self.next = Some(next);
        due
    }
}
