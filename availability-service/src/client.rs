use anyhow::{anyhow, bail, Context, Result};
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::Client;
use shared::{DaySchedule, Reservation, RowErrorPolicy};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::WidgetConfig;

const FRAGMENT_FIELD: &str = "event_list_html";
const EXCERPT_LEN: usize = 200;
pub const MAX_IN_FLIGHT: usize = 4;

/// Fetches day fragments from the booking widget and hands them to the row parser.
pub struct WidgetClient {
    http: Client,
    config: WidgetConfig,
}

impl WidgetClient {
    pub fn new(config: WidgetConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        headers.insert(
            REFERER,
            HeaderValue::from_str(&config.referrer()).context("invalid referrer header")?,
        );

        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("building HTTP client")?;

        Ok(Self { http, config })
    }

    /// The raw HTML fragment listing `date`'s slots.
    pub async fn fetch_fragment(&self, date: NaiveDate) -> Result<String> {
        debug!("Requesting availability for {}", date);

        let response = self
            .http
            .post(&self.config.endpoint)
            .form(&self.config.form_fields(date))
            .send()
            .await
            .with_context(|| format!("requesting availability for {}", date))?;

        let status = response.status();
        let body = response.text().await.context("reading widget response")?;
        if !status.is_success() {
            bail!("widget returned {} for {}: {}", status, date, excerpt(&body));
        }

        extract_fragment(&body)
    }

    pub async fn fetch_day(&self, date: NaiveDate, policy: RowErrorPolicy) -> Result<DaySchedule> {
        let html = self.fetch_fragment(date).await?;
        let day = DaySchedule::parse(&html, date, policy)
            .with_context(|| format!("parsing availability for {}", date))?;
        info!("Fetched {} slots for {}", day.reservations.len(), date);
        Ok(day)
    }

    /// `count` consecutive days starting at `start`, in calendar order. At most
    /// [`MAX_IN_FLIGHT`] requests are outstanding at once.
    pub async fn fetch_days(
        &self,
        start: NaiveDate,
        count: u64,
        policy: RowErrorPolicy,
    ) -> Result<Vec<DaySchedule>> {
        stream::iter(0..count)
            .map(move |offset| async move {
                let date = start
                    .checked_add_days(Days::new(offset))
                    .ok_or_else(|| anyhow!("date out of range: {} + {} days", start, offset))?;
                self.fetch_day(date, policy).await
            })
            .buffered(MAX_IN_FLIGHT)
            .try_collect()
            .await
    }

    /// Every slot that can contain `instant`. At midnight that includes the previous
    /// day's slots, whose last one may close exactly then.
    pub async fn fetch_covering(
        &self,
        instant: NaiveDateTime,
        policy: RowErrorPolicy,
    ) -> Result<Vec<Reservation>> {
        let mut reservations = Vec::new();
        for date in days_covering(instant) {
            reservations.extend(self.fetch_day(date, policy).await?.reservations);
        }
        Ok(reservations)
    }
}

/// Calendar days whose fragments may list a slot containing `instant`.
pub fn days_covering(instant: NaiveDateTime) -> Vec<NaiveDate> {
    let date = instant.date();
    match date.pred_opt() {
        Some(previous) if instant.time() == NaiveTime::MIN => vec![previous, date],
        _ => vec![date],
    }
}

/// Pulls the event table fragment out of the widget's JSON response body.
pub fn extract_fragment(body: &str) -> Result<String> {
    let doc: serde_json::Value = serde_json::from_str(body)
        .with_context(|| format!("failed to decode widget response ({} bytes): {}", body.len(), excerpt(body)))?;

    doc.get(FRAGMENT_FIELD)
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| anyhow!("widget response has no {} field", FRAGMENT_FIELD))
}

fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(EXCERPT_LEN) {
        Some((end, _)) => &body[..end],
        None => body,
    }
}
