use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use shared::{find_at, Reservation, RowErrorPolicy};
use std::process::ExitCode;
use tracing::info;

use crate::client::WidgetClient;

/// A reservation as handed to JSON consumers, with its derived availability flag.
#[derive(Debug, Clone, Serialize)]
pub struct ReservationView {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub is_available: bool,
}

impl From<&Reservation> for ReservationView {
    fn from(reservation: &Reservation) -> Self {
        Self {
            reservation: reservation.clone(),
            is_available: reservation.is_available(),
        }
    }
}

/// Outcome of a point lookup, as seen by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Available,
    Unavailable,
    NoMatch,
}

impl Lookup {
    pub fn of(matches: &[&Reservation]) -> Self {
        if matches.is_empty() {
            Lookup::NoMatch
        } else if matches.iter().any(|r| r.is_available()) {
            Lookup::Available
        } else {
            Lookup::Unavailable
        }
    }

    pub fn exit_code(self) -> ExitCode {
        match self {
            Lookup::Available => ExitCode::SUCCESS,
            Lookup::Unavailable => ExitCode::from(1),
            Lookup::NoMatch => ExitCode::from(2),
        }
    }
}

pub struct CommandHandler {
    client: WidgetClient,
    policy: RowErrorPolicy,
    json: bool,
}

impl CommandHandler {
    pub fn new(client: WidgetClient, policy: RowErrorPolicy, json: bool) -> Self {
        Self { client, policy, json }
    }

    pub async fn scan_days(&self, start: NaiveDate, days: u64) -> Result<()> {
        if !self.json {
            println!("Fetching reservations for {}", start);
        }
        let schedules = self.client.fetch_days(start, days, self.policy).await?;

        if self.json {
            let views: Vec<ReservationView> = schedules
                .iter()
                .flat_map(|day| day.reservations.iter())
                .map(ReservationView::from)
                .collect();
            println!("{}", serde_json::to_string_pretty(&views)?);
            return Ok(());
        }

        for day in &schedules {
            if schedules.len() > 1 {
                println!("{}", day.date.format("%A %Y-%m-%d"));
            }
            for reservation in &day.reservations {
                println!("{}", render_line(reservation));
            }
        }
        Ok(())
    }

    pub async fn lookup(&self, instant: NaiveDateTime) -> Result<Lookup> {
        let reservations = self.client.fetch_covering(instant, self.policy).await?;
        let matches = find_at(&reservations, instant);
        let outcome = Lookup::of(&matches);
        info!("{} slot(s) cover {}: {:?}", matches.len(), instant, outcome);

        if self.json {
            let views: Vec<ReservationView> = matches.iter().copied().map(ReservationView::from).collect();
            println!("{}", serde_json::to_string_pretty(&views)?);
        } else if matches.is_empty() {
            println!("No slot covers {}", instant.format("%a %Y-%m-%d %H:%M"));
        } else {
            for reservation in &matches {
                println!("{}", render_line(reservation));
            }
        }

        Ok(outcome)
    }
}

pub fn render_line(reservation: &Reservation) -> String {
    format!(
        "{}: {}, {}",
        reservation.slot(),
        reservation.availability(),
        reservation.spaces()
    )
}
