//! Alarm phrase parsing for the `setAlarm` tool.
//!
//! Two forms are understood:
//! - relative: "in 5 minutes", "wake me up in 2 hours"
//! - absolute: "7", "7:30", "5 pm", "12:15am"
//!
//! The relative form is checked first. Once a phrase contains " in " it is
//! never re-read as an absolute time, so "in five minutes" is rejected rather
//! than turning into a 5 o'clock alarm.

use chrono::{Duration, NaiveTime, Timelike};

/// Result of reading an alarm phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmParse {
    /// "in N minutes/hours": fires at `at`. `unit` is the word as spoken.
    Relative { amount: u32, unit: String, at: NaiveTime },
    /// Relative form recognised but the amount or unit was unreadable.
    InvalidRelative,
    /// "H[:MM] [am|pm]". `matched` is the exact text that was read.
    Absolute {
        hour: u32,
        minute: u32,
        matched: String,
    },
    /// No time found.
    NoTime,
}

/// Parse an alarm phrase relative to `now`.
pub fn parse_alarm_command(command: &str, now: NaiveTime) -> AlarmParse {
    let command = command.trim().to_lowercase();
    let padded = format!(" {command}");

    if let Some(idx) = padded.find(" in ") {
        return parse_relative(&padded[idx + 4..], now);
    }

    parse_absolute(&command)
}

fn parse_relative(rest: &str, now: NaiveTime) -> AlarmParse {
    let mut words = rest.split_whitespace();
    let (Some(amount), Some(unit)) = (words.next(), words.next()) else {
        return AlarmParse::InvalidRelative;
    };
    let Ok(amount) = amount.parse::<u32>() else {
        return AlarmParse::InvalidRelative;
    };

    let delta = if unit.starts_with("minute") {
        Duration::minutes(i64::from(amount))
    } else if unit.starts_with("hour") {
        Duration::hours(i64::from(amount))
    } else {
        return AlarmParse::InvalidRelative;
    };

    let (at, _) = now.overflowing_add_signed(delta);
    AlarmParse::Relative {
        amount,
        unit: unit.to_string(),
        at: NaiveTime::from_hms_opt(at.hour(), at.minute(), 0).unwrap_or(at),
    }
}

fn parse_absolute(command: &str) -> AlarmParse {
    let bytes = command.as_bytes();
    let Some(start) = bytes.iter().position(u8::is_ascii_digit) else {
        return AlarmParse::NoTime;
    };

    // Hour: one or two digits.
    let mut pos = start;
    while pos < bytes.len() && pos - start < 2 && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    let mut hour: u32 = command[start..pos].parse().unwrap_or(0);

    // Optional ":MM".
    let mut minute = 0;
    if bytes.get(pos) == Some(&b':')
        && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit)
        && bytes.get(pos + 2).is_some_and(u8::is_ascii_digit)
    {
        minute = command[pos + 1..pos + 3].parse().unwrap_or(0);
        pos += 3;
    }
    let mut end = pos;

    // Optional whitespace then am/pm. Whitespace only counts when a suffix follows.
    let mut look = pos;
    while look < bytes.len() && bytes[look].is_ascii_whitespace() {
        look += 1;
    }
    let suffix = command.get(look..look + 2);
    match suffix {
        Some("pm") => {
            if hour < 12 {
                hour += 12;
            }
            end = look + 2;
        }
        Some("am") => {
            if hour == 12 {
                hour = 0;
            }
            end = look + 2;
        }
        _ => {}
    }

    if hour > 23 || minute > 59 {
        return AlarmParse::NoTime;
    }

    AlarmParse::Absolute {
        hour,
        minute,
        matched: command[start..end].to_string(),
    }
}
