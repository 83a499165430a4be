mod error;
mod row;
mod schedule;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub use error::ParseError;
pub use row::{parse_fragment, parse_row, RowErrorPolicy};
pub use schedule::{find_at, DaySchedule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Availability {
    Available,
    Full,
    TooEarly,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::Full => "full",
            Availability::TooEarly => "too-early",
        }
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One bookable slot as rendered by the widget.
///
/// Built once from a row of markup and never mutated afterwards, so the fields are only
/// reachable through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reservation {
    date: String,
    availability: Availability,
    spaces: u32,
    slot: String,
    start: NaiveDateTime,
    stop: NaiveDateTime,
}

impl Reservation {
    pub(crate) fn new(
        date: String,
        availability: Availability,
        spaces: u32,
        slot: String,
        start: NaiveDateTime,
        stop: NaiveDateTime,
    ) -> Self {
        debug_assert!(start <= stop);
        Self {
            date,
            availability,
            spaces,
            slot,
            start,
            stop,
        }
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn availability(&self) -> Availability {
        self.availability
    }

    pub fn is_available(&self) -> bool {
        self.availability == Availability::Available
    }

    /// Remaining capacity. Zero both when the widget advertises none left and when it
    /// does not advertise a count at all; `availability` tells the two apart.
    pub fn spaces(&self) -> u32 {
        self.spaces
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn stop(&self) -> NaiveDateTime {
        self.stop
    }

    /// Closed interval check: both `start` and `stop` count as inside the slot.
    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant <= self.stop
    }
}
