use std::sync::LazyLock;

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::{Availability, ParseError, Reservation};

/// Element the widget renders inside the capacity cell once a slot is sold out.
const FULL_MARKER: &str = ".offering-page-event-is-full";
/// Text the widget puts in the booking cell before a slot opens for reservations.
const TOO_EARLY_MARKER: &str = "NOT AVAILABLE YET";
const MIN_CELLS: usize = 4;

static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("static selector"));
static FULL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(FULL_MARKER).expect("static selector"));
static TIME_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})(?::(\d{2}))?\s*([ap])\.?m\.?\s+to\s+(\d{1,2})(?::(\d{2}))?\s*([ap])\.?m\.?",
    )
    .expect("static regex")
});
static SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s+spaces?\b").expect("static regex"));

/// What [`parse_fragment`] does with a row whose slot label has no readable time range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowErrorPolicy {
    #[default]
    Abort,
    Skip,
}

/// Parses every slot row of one day's `event_list_html` fragment, in row order.
///
/// A [`ParseError::FragmentShape`] always aborts the whole day. A
/// [`ParseError::TimeRange`] aborts under [`RowErrorPolicy::Abort`] and drops the row under
/// [`RowErrorPolicy::Skip`]. Rows without any `<td>` (header rows) are not slots and are
/// passed over.
pub fn parse_fragment(
    html: &str,
    on: NaiveDate,
    policy: RowErrorPolicy,
) -> Result<Vec<Reservation>, ParseError> {
    // Bare <tr> rows are dropped by the HTML5 parser unless they sit inside a table.
    let document = if html.to_ascii_lowercase().contains("<table") {
        Html::parse_fragment(html)
    } else {
        Html::parse_fragment(&format!("<table>{html}</table>"))
    };

    let mut reservations = Vec::new();
    for (index, row) in document.select(&ROW).enumerate() {
        if cells(row).is_empty() {
            debug!(row = index, "skipping row without cells");
            continue;
        }

        match parse_row(row, index, on) {
            Ok(reservation) => reservations.push(reservation),
            Err(e @ ParseError::TimeRange { .. }) if policy == RowErrorPolicy::Skip => {
                warn!("skipping {}", e);
            }
            Err(e) => return Err(e),
        }
    }

    debug!("parsed {} reservations for {}", reservations.len(), on);
    Ok(reservations)
}

/// Parses a single `<tr>` of the widget's event table.
///
/// `index` is only used to identify the row in errors. `on` is the date the fragment was
/// requested for; the row's day-of-month is resolved to the first date on or after it.
///
/// Cell 0 holds `"<weekday>, <day>, <slot>"`, cell 1 the capacity text and the sold-out
/// marker, cell 3 the booking button or the not-yet-bookable text.
///
/// The sold-out check runs before the not-yet-bookable check, so a row carrying both
/// markers is [`Availability::Full`]. Keep that order.
pub fn parse_row(row: ElementRef, index: usize, on: NaiveDate) -> Result<Reservation, ParseError> {
    let cells = cells(row);
    if cells.len() < MIN_CELLS {
        return Err(ParseError::shape(
            index,
            format!("expected at least {} cells, found {}", MIN_CELLS, cells.len()),
        ));
    }

    let label = text_of(cells[0]);
    let parts: Vec<&str> = label.split(',').map(str::trim).collect();
    let [weekday, day, slot] = parts.as_slice() else {
        return Err(ParseError::shape(
            index,
            format!("label {:?} does not split into weekday, day and slot", label.trim()),
        ));
    };
    if weekday.is_empty() || day.is_empty() || slot.is_empty() {
        return Err(ParseError::shape(
            index,
            format!("label {:?} has an empty part", label.trim()),
        ));
    }

    let day_of_month: u32 = day
        .parse()
        .map_err(|_| ParseError::shape(index, format!("day of month {day:?} is not a number")))?;
    let date = resolve_day(on, day_of_month).ok_or_else(|| {
        ParseError::shape(index, format!("day of month {day_of_month} is out of range"))
    })?;
    if let Ok(stated) = weekday.parse::<Weekday>() {
        if stated != date.weekday() {
            warn!(row = index, "label says {} but {} is a {}", stated, date, date.weekday());
        }
    }

    let slot = slot.split_whitespace().collect::<Vec<_>>().join(" ");
    let (start, stop) = time_range(&slot, date).ok_or_else(|| ParseError::TimeRange {
        row: index,
        label: slot.clone(),
    })?;

    let availability = if cells[1].select(&FULL).next().is_some() {
        Availability::Full
    } else if text_of(cells[3]).to_uppercase().contains(TOO_EARLY_MARKER) {
        Availability::TooEarly
    } else {
        Availability::Available
    };

    let spaces = match SPACES.captures(&text_of(cells[1])) {
        Some(caps) => caps[1].parse().unwrap_or_else(|_| {
            warn!(row = index, "capacity {:?} is out of range, using 0", &caps[1]);
            0
        }),
        None => 0,
    };

    debug!(row = index, "{}: {}, {} spaces", slot, availability, spaces);

    Ok(Reservation::new(
        format!("{weekday} {day}"),
        availability,
        spaces,
        slot,
        start,
        stop,
    ))
}

fn cells(row: ElementRef) -> Vec<ElementRef> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "td")
        .collect()
}

fn text_of(cell: ElementRef) -> String {
    cell.text().collect::<Vec<_>>().join(" ")
}

/// First date on or after `on` whose day of month is `day`.
fn resolve_day(on: NaiveDate, day: u32) -> Option<NaiveDate> {
    if !(1..=31).contains(&day) {
        return None;
    }

    let mut month = on.with_day(1)?;
    for _ in 0..3 {
        if let Some(candidate) = month.with_day(day) {
            if candidate >= on {
                return Some(candidate);
            }
        }
        month = month.checked_add_months(Months::new(1))?;
    }
    None
}

fn time_range(slot: &str, date: NaiveDate) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let caps = TIME_RANGE.captures(slot)?;
    let start = clock(&caps[1], caps.get(2).map(|m| m.as_str()), &caps[3])?;
    let stop = clock(&caps[4], caps.get(5).map(|m| m.as_str()), &caps[6])?;

    let start = date.and_time(start);
    let mut stop = date.and_time(stop);
    // "10 PM to 12 AM" closes on the next day
    if stop < start {
        stop = stop.checked_add_days(Days::new(1))?;
    }
    Some((start, stop))
}

fn clock(hour: &str, minute: Option<&str>, meridiem: &str) -> Option<NaiveTime> {
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = match minute {
        Some(m) => m.parse().ok()?,
        None => 0,
    };
    if !(1..=12).contains(&hour) {
        return None;
    }
    let pm = meridiem.eq_ignore_ascii_case("p");
    NaiveTime::from_hms_opt(hour % 12 + if pm { 12 } else { 0 }, minute, 0)
}
