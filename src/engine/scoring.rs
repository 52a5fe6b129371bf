//! Speed and accuracy formulas shared by the session state machines.
//!
//! The typing test deliberately has two accuracy paths: a live estimate based
//! on the sticky error counter and a final score based on a positional
//! comparison of the finished input. They diverge whenever a mistake was
//! corrected, and both are observable.

pub const CHARS_PER_WORD: f64 = 5.0;

pub fn accuracy_percent(correct: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    correct as f64 / total as f64 * 100.0
}

/// Words per minute for the spelling test: characters of correctly spelled
/// words over the time spent on those words only.
pub fn spelling_wpm(correct_chars: usize, correct_secs: f64) -> f64 {
    let minutes = correct_secs / 60.0;
    if minutes > 0.0 {
        (correct_chars as f64 / CHARS_PER_WORD) / minutes
    } else {
        0.0
    }
}

pub fn live_wpm(input_len: usize, time_secs: u32) -> f64 {
    if time_secs == 0 {
        return 0.0;
    }
    ((input_len as f64 / CHARS_PER_WORD) / (time_secs as f64 / 60.0)).round()
}

/// Error-counter accuracy shown while typing. Not clamped: more mistakes than
/// typed characters yields a negative value.
pub fn live_accuracy(input_len: usize, error_count: u32) -> f64 {
    if input_len == 0 {
        return 100.0;
    }
    (input_len as f64 - error_count as f64) / input_len as f64 * 100.0
}

/// Whole words per minute over the finished input, space separated.
pub fn final_wpm(final_input: &str, time_secs: u32) -> f64 {
    if time_secs == 0 {
        return 0.0;
    }
    let words = final_input.split(' ').count();
    (words as f64 / time_secs as f64 * 60.0).round()
}

pub fn final_cpm(input_len: usize, time_secs: u32) -> f64 {
    if time_secs == 0 {
        return 0.0;
    }
    (input_len as f64 / time_secs as f64 * 60.0).round()
}

/// Share of target positions matched by the final input.
pub fn positional_accuracy(input: &[char], target: &[char]) -> f64 {
    if target.is_empty() {
        return 0.0;
    }
    let matches = input
        .iter()
        .zip(target.iter())
        .filter(|(typed, expected)| typed == expected)
        .count();
    matches as f64 / target.len() as f64 * 100.0
}
