use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::{parse_fragment, ParseError, Reservation, RowErrorPolicy};

/// Every reservation whose `[start, stop]` interval contains `instant`, in input order.
///
/// Both ends are inclusive. An instant on the boundary between two contiguous slots
/// matches both of them, and upstream slots sometimes overlap outright, so callers get
/// every match and decide for themselves what zero, one or several mean.
pub fn find_at(reservations: &[Reservation], instant: NaiveDateTime) -> Vec<&Reservation> {
    reservations
        .iter()
        .filter(|r| r.contains(instant))
        .collect()
}

/// The reservations listed for one requested date.
#[derive(Debug, Clone, Serialize)]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub reservations: Vec<Reservation>,
}

impl DaySchedule {
    pub fn parse(html: &str, date: NaiveDate, policy: RowErrorPolicy) -> Result<Self, ParseError> {
        Ok(Self {
            date,
            reservations: parse_fragment(html, date, policy)?,
        })
    }

    pub fn find_at(&self, instant: NaiveDateTime) -> Vec<&Reservation> {
        find_at(&self.reservations, instant)
    }

    pub fn available(&self) -> impl Iterator<Item = &Reservation> {
        self.reservations.iter().filter(|r| r.is_available())
    }
}
