//! Turns the free-text dates and times typed on the command line into concrete values.
//! Ambiguous input always resolves into the future.

use std::sync::LazyLock;

use anyhow::{anyhow, bail, Result};
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use regex::Regex;

static CLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})(?::(\d{2}))?\s*(am|pm|a|p)?$").expect("static regex")
});

/// Accepts `today`, `tomorrow`, `YYYY-MM-DD`, `MM/DD`, `friday` and `next friday`.
///
/// A bare weekday is the next such day counting today; `next <weekday>` skips today.
pub fn resolve_date(text: &str, today: NaiveDate) -> Result<NaiveDate> {
    let text = text.trim().to_lowercase();
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    match text.as_str() {
        "today" => return Ok(today),
        "tomorrow" => return after(today, 1),
        _ => {}
    }

    if let Ok(date) = NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
        return Ok(date);
    }

    if let Some((month, day)) = text.split_once('/') {
        let (month, day): (u32, u32) = match (month.parse(), day.parse()) {
            (Ok(m), Ok(d)) => (m, d),
            _ => bail!("invalid date: {}", text),
        };
        let this_year = NaiveDate::from_ymd_opt(today.year(), month, day);
        return match this_year {
            Some(date) if date >= today => Ok(date),
            _ => NaiveDate::from_ymd_opt(today.year() + 1, month, day)
                .ok_or_else(|| anyhow!("invalid date: {}", text)),
        };
    }

    let (skip_today, name) = match text.strip_prefix("next ") {
        Some(name) => (true, name),
        None => (false, text.as_str()),
    };
    let weekday: Weekday = name.parse().map_err(|_| anyhow!("invalid date: {}", text))?;

    let mut ahead =
        (7 + weekday.num_days_from_monday() - today.weekday().num_days_from_monday()) % 7;
    if ahead == 0 && skip_today {
        ahead = 7;
    }
    after(today, ahead as u64)
}

/// Accepts `9`, `9am`, `9:30 AM` and 24-hour `14:30`.
pub fn resolve_time(text: &str) -> Result<NaiveTime> {
    let text = text.trim().to_lowercase();
    let caps = CLOCK
        .captures(&text)
        .ok_or_else(|| anyhow!("invalid time: {}", text))?;

    let hour: u32 = caps[1].parse()?;
    let minute: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse()?,
        None => 0,
    };
    let hour = match caps.get(3).map(|m| m.as_str()) {
        Some(meridiem) => {
            if !(1..=12).contains(&hour) {
                bail!("invalid time: {}", text);
            }
            hour % 12 + if meridiem.starts_with('p') { 12 } else { 0 }
        }
        None => hour,
    };

    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| anyhow!("invalid time: {}", text))
}

/// Resolves command-line words holding a day and a time of day, e.g. `tomorrow 9:30 am`.
///
/// The time is expected last and may be split from its `am`/`pm`; a time given first
/// (`9:30 am tomorrow`) is accepted as well.
pub fn resolve_instant(words: &[String], today: NaiveDate) -> Result<NaiveDateTime> {
    let time_words = |meridiem_at: usize| {
        if words.len() > 2 && is_meridiem(&words[meridiem_at]) {
            2
        } else {
            1
        }
    };

    if words.len() >= 2 {
        let (date, time) = words.split_at(words.len() - time_words(words.len() - 1));
        if let Ok(instant) = combine(date, time, today) {
            return Ok(instant);
        }

        let (time, date) = words.split_at(time_words(1));
        if let Ok(instant) = combine(date, time, today) {
            return Ok(instant);
        }
    }

    bail!("expected a day and a time of day, got {:?}", words.join(" "))
}

fn combine(date: &[String], time: &[String], today: NaiveDate) -> Result<NaiveDateTime> {
    if date.is_empty() || time.is_empty() {
        bail!("missing day or time");
    }
    let date = resolve_date(&date.join(" "), today)?;
    let time = resolve_time(&time.join(" "))?;
    Ok(date.and_time(time))
}

fn is_meridiem(word: &str) -> bool {
    matches!(word.to_lowercase().as_str(), "am" | "pm" | "a" | "p")
}

fn after(date: NaiveDate, days: u64) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(days))
        .ok_or_else(|| anyhow!("date out of range"))
}
