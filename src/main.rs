use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::{Parser, Subcommand};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::style::{Print, Stylize};
use crossterm::terminal::{
    self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
    enable_raw_mode,
};
use crossterm::{cursor, execute, queue};
use tracing_subscriber::EnvFilter;

use lexilearn::app::App;
use lexilearn::config::Config;
use lexilearn::event::{AppEvent, EventHandler};
use lexilearn::session::setup::{
    Difficulty, SpellingSetup, Topic, TypingMode, TypingSetup, VocabType,
};
use lexilearn::session::spelling::{Feedback, SpellingEvent, SpellingPhase};
use lexilearn::session::typing::{CharState, TypingEvent, TypingPhase};

#[derive(Parser)]
#[command(
    name = "lexilearn",
    version,
    about = "Spelling and typing practice with generated word lists and sentences"
)]
struct Cli {
    #[arg(long, global = true, help = "Directory for saved history")]
    data_dir: Option<PathBuf>,

    #[arg(long, global = true, help = "Use the built-in word and sentence banks")]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Spell words read aloud, three attempts each
    Spell {
        #[arg(short, long, help = "Grade level (1-12)")]
        grade: Option<u8>,
        #[arg(short, long, value_enum)]
        difficulty: Option<Difficulty>,
        #[arg(short, long, value_enum)]
        vocab: Option<VocabType>,
        #[arg(short, long, help = "Number of words (1-100)")]
        words: Option<u32>,
    },
    /// Type a generated passage against the clock
    Type {
        #[arg(short, long, value_enum)]
        difficulty: Option<Difficulty>,
        #[arg(short, long, value_enum)]
        topic: Option<Topic>,
        #[arg(short, long, value_enum)]
        mode: Option<TypingMode>,
        #[arg(short, long, help = "Passage length in words (5-100)")]
        words: Option<u32>,
    },
    /// Charts and mistake analysis over saved sessions
    Progress {
        #[arg(long, help = "Re-run the mistake analysis instead of using the cached one")]
        refresh: bool,
    },
    /// List saved sessions
    History,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        Config::default()
    });
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir.to_string_lossy().to_string();
    }
    if cli.offline {
        config.offline = true;
    }

    let mut app = App::from_config(config)?;

    let result = match cli.command {
        Command::Spell {
            grade,
            difficulty,
            vocab,
            words,
        } => {
            let defaults = app.default_spelling_setup();
            let setup = SpellingSetup {
                grade_level: grade.unwrap_or(defaults.grade_level),
                difficulty: difficulty.unwrap_or(defaults.difficulty),
                vocab_type: vocab.unwrap_or(defaults.vocab_type),
                word_count: words,
            };
            run_spelling(&mut app, setup)
        }
        Command::Type {
            difficulty,
            topic,
            mode,
            words,
        } => {
            let mut setup = app.default_typing_setup();
            if let Some(difficulty) = difficulty {
                setup.difficulty = difficulty;
            }
            if let Some(topic) = topic {
                setup.topic = topic;
            }
            if let Some(mode) = mode {
                setup.mode = mode;
            }
            if let Some(words) = words {
                setup.word_count = words;
            }
            run_typing(&mut app, setup)
        }
        Command::Progress { refresh } => show_progress(&mut app, refresh),
        Command::History => show_history(&app),
    };

    app.shutdown();
    result
}

fn prompt(label: &str) -> Result<Option<String>> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Redraw rate of the typing screen; the test clock keeps its own time.
const REDRAW_INTERVAL: Duration = Duration::from_millis(200);

/// One line typed at the spelling prompt.
enum LineCommand {
    Event(SpellingEvent),
    Quit,
    Nothing,
}

/// `?` reveals the word, keeping any text after it as the partial answer;
/// `!r` repeats the word; `!q` quits; anything else is an attempt.
fn parse_spelling_line(line: &str, at: Instant) -> LineCommand {
    let line = line.trim();
    if let Some(partial) = line.strip_prefix('?') {
        return LineCommand::Event(SpellingEvent::Reveal {
            partial: partial.trim().to_string(),
        });
    }
    match line {
        "!r" => LineCommand::Event(SpellingEvent::Replay),
        "!q" => LineCommand::Quit,
        "" => LineCommand::Nothing,
        input => LineCommand::Event(SpellingEvent::Check {
            input: input.to_string(),
            at,
        }),
    }
}

fn run_spelling(app: &mut App, setup: SpellingSetup) -> Result<()> {
    println!("Generating words...");
    if let Err(e) = app.start_spelling(setup) {
        eprintln!("{} ({e})", e.user_message());
        return Ok(());
    }
    println!(
        "Type each word you hear. '?' reveals it ('?par' keeps what you had), '!r' repeats it, '!q' quits.\n"
    );

    loop {
        let Some(test) = app.spelling.as_ref() else {
            break;
        };
        let word = test.current_word().to_string();
        match test.phase() {
            SpellingPhase::Finished => break,
            SpellingPhase::Ongoing => {
                let label = format!(
                    "[{}/{} {:>3.0}%] ({} left) > ",
                    test.current_index() + 1,
                    test.len(),
                    test.progress() * 100.0,
                    test.attempts_left()
                );
                let Some(line) = prompt(&label)? else {
                    break;
                };
                match parse_spelling_line(&line, Instant::now()) {
                    LineCommand::Event(event) => {
                        app.spelling_event(event);
                    }
                    LineCommand::Quit => break,
                    LineCommand::Nothing => {}
                }
            }
            SpellingPhase::Feedback(Feedback::Retry) => {
                println!("{}", "Not quite. Try again.".yellow());
                if let Some(due) = app.reset_due() {
                    thread::sleep(due.saturating_duration_since(Instant::now()));
                }
                app.poll_timers(Instant::now());
            }
            phase => {
                let message = match phase {
                    SpellingPhase::Feedback(Feedback::Correct) => "Correct!".green().to_string(),
                    SpellingPhase::Revealed => format!("The word is \"{word}\"."),
                    _ => format!("{} The word was \"{word}\".", "Out of attempts.".red()),
                };
                println!("{message}");
                if prompt("Press Enter for the next word ")?.is_none() {
                    break;
                }
                app.spelling_event(SpellingEvent::Advance { at: Instant::now() });
            }
        }
    }

    if let Some(session) = &app.last_spelling {
        println!(
            "\nScore: {}/{} ({:.0}%), {:.0} WPM",
            session.correct_count(),
            session.words.len(),
            session.accuracy,
            session.typing_speed_wpm.unwrap_or(0.0)
        );
        for word in &session.words {
            let mark = if word.correct {
                "✓".green()
            } else {
                "✗".red()
            };
            println!("  {mark} {}", word.word);
        }
    }
    Ok(())
}

fn run_typing(app: &mut App, setup: TypingSetup) -> Result<()> {
    println!("Generating text...");
    app.typing_event(TypingEvent::Submit(setup));
    if let Some(notice) = app.dismiss_notice() {
        eprintln!("{}: {}", notice.title, notice.message);
        return Ok(());
    }

    enable_raw_mode()?;
    enter_typing_screen(&mut io::stdout(), disable_raw_mode)?;

    let events = EventHandler::new(REDRAW_INTERVAL);
    let result = typing_loop(app, &events);

    let restored = execute!(io::stdout(), cursor::Show, LeaveAlternateScreen);
    disable_raw_mode()?;
    restored?;

    if let Some(notice) = app.dismiss_notice() {
        eprintln!("{}: {}", notice.title, notice.message);
    }

    if let Some(session) = &app.last_typing {
        println!(
            "{:.0} WPM, {:.0} CPM, {:.0}% accuracy, {} errors in {}s",
            session.wpm, session.cpm, session.accuracy, session.error_count, session.time
        );
    }
    result
}

/// Switch to the alternate screen, leaving raw mode again if that fails.
fn enter_typing_screen<W: Write>(
    out: &mut W,
    leave_raw: impl FnOnce() -> io::Result<()>,
) -> io::Result<()> {
    if let Err(e) = execute!(out, EnterAlternateScreen, cursor::Hide) {
        if let Err(restore) = leave_raw() {
            tracing::warn!(error = %restore, "failed to leave raw mode");
        }
        return Err(e);
    }
    Ok(())
}

fn typing_loop(app: &mut App, events: &EventHandler) -> Result<()> {
    loop {
        draw_typing(app)?;
        match events.next()? {
            AppEvent::Tick => {}
            AppEvent::Key(key) => {
                if !handle_typing_key(app, key) {
                    return Ok(());
                }
            }
        }
        app.poll_typing_clock(Instant::now());
        if app.typing.phase() == TypingPhase::Configuring {
            // A restart failed to fetch new text.
            return Ok(());
        }
    }
}

/// Returns false when the user wants out.
fn handle_typing_key(app: &mut App, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => return false,
            KeyCode::Char('r') => {
                app.typing_event(TypingEvent::Restart);
            }
            _ => {}
        }
        return true;
    }
    match (app.typing.phase(), key.code) {
        (_, KeyCode::Esc) => return false,
        (_, KeyCode::Tab) => {
            app.typing_event(TypingEvent::Replay);
        }
        (TypingPhase::Finished, KeyCode::Enter) => {
            app.typing_event(TypingEvent::Restart);
        }
        (TypingPhase::Ready | TypingPhase::Typing, KeyCode::Char(ch)) => {
            let mut value = app.typing.input();
            value.push(ch);
            app.typing_event(TypingEvent::Input(value));
        }
        (TypingPhase::Typing, KeyCode::Backspace) => {
            let mut value = app.typing.input();
            value.pop();
            app.typing_event(TypingEvent::Input(value));
        }
        _ => {}
    }
    true
}

fn draw_typing(app: &App) -> Result<()> {
    let mut out = io::stdout();
    let (width, _) = terminal::size().unwrap_or((80, 24));
    queue!(out, Clear(ClearType::All), cursor::MoveTo(0, 0))?;

    let test = &app.typing;
    let speech = test.setup().map(|s| s.mode) == Some(TypingMode::Speech);
    if speech {
        queue!(out, Print("Listening test: type what you hear.\r\n\r\n"))?;
    }
    let mut column = 0u16;
    for (ch, state) in test.display_chars() {
        if column >= width.saturating_sub(1) && ch == ' ' {
            queue!(out, Print("\r\n"))?;
            column = 0;
            continue;
        }
        let styled = match state {
            CharState::Correct => ch.to_string().green(),
            CharState::Incorrect if ch == ' ' => "_".to_string().red(),
            CharState::Incorrect => ch.to_string().red(),
            CharState::Pending => ch.to_string().dark_grey(),
        };
        queue!(out, Print(styled))?;
        column += 1;
    }

    let status = match (test.phase(), test.final_score()) {
        (TypingPhase::Finished, Some(score)) => format!(
            "Done: {:.0} WPM  {:.0} CPM  {:.0}% accuracy  {} errors  {}s   [Enter] again  [Esc] quit",
            score.wpm, score.cpm, score.accuracy, score.error_count, score.time
        ),
        _ => format!(
            "{}s  {:>3.0}% done  {:.0} WPM  {:.0}% accuracy  {} errors   [Tab] {}  [Ctrl-R] restart  [Esc] quit",
            test.time(),
            test.progress() * 100.0,
            test.live_wpm(),
            test.live_accuracy(),
            test.error_count(),
            if speech { "listen again" } else { "read aloud" }
        ),
    };
    queue!(out, Print("\r\n\r\n"), Print(status))?;
    out.flush()?;
    Ok(())
}

fn show_progress(app: &mut App, refresh: bool) -> Result<()> {
    let report = app.progress_report();
    if report.spelling_sessions == 0 && report.typing_sessions == 0 {
        println!("No sessions yet. Try `lexilearn spell` or `lexilearn type`.");
        return Ok(());
    }

    println!(
        "Spelling sessions: {}   average speed: {:.0} WPM",
        report.spelling_sessions, report.average_spelling_wpm
    );
    for point in &report.spelling_series {
        println!(
            "  {:>6}  {:>3.0}%  {:>3.0} WPM  {}",
            point.label,
            point.accuracy,
            point.wpm,
            "#".repeat((point.accuracy / 5.0) as usize)
        );
    }

    println!("\nTyping sessions: {}", report.typing_sessions);
    for point in &report.typing_series {
        println!(
            "  {:>6}  {:>3.0} WPM  {:>3.0}%  {} errors",
            point.label, point.wpm, point.accuracy, point.errors
        );
    }

    if report.misspelled_words.is_empty() {
        return Ok(());
    }
    println!("\nMisspelled words: {}", report.misspelled_words.join(", "));
    match app.run_analysis(refresh) {
        Ok(categories) => {
            println!("\nMistake patterns:");
            for category in categories {
                println!("  {:>3}  {}", category.count, category.category);
            }
        }
        Err(e) => eprintln!("Analysis failed: {e}"),
    }
    Ok(())
}

fn show_history(app: &App) -> Result<()> {
    let spelling = app.store.spelling_history();
    let typing = app.store.typing_history();
    if spelling.is_empty() && typing.is_empty() {
        println!("No sessions yet.");
        return Ok(());
    }
    for session in &spelling {
        println!(
            "{}  spelling  grade {:>2}  {:<6} {:<7}  {:>3.0}%  {}/{} words",
            session.date.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
            session.grade_level,
            session.difficulty,
            session.vocab_type,
            session.accuracy,
            session.correct_count(),
            session.words.len()
        );
    }
    for session in &typing {
        println!(
            "{}  typing   {:<6} {:<7} {:<6}  {:>3.0} WPM  {:>3.0}%  {}s",
            session.date.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
            session.difficulty,
            session.topic,
            session.mode,
            session.wpm,
            session.accuracy,
            session.time
        );
    }
    Ok(())
}
