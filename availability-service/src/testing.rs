//! In-process stand-in for the booking widget, bound to an ephemeral loopback port.

use axum::{http::StatusCode, routing::post, Form, Json, Router};
use chrono::NaiveDate;
use clap::Parser;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::client::WidgetClient;
use crate::config::WidgetConfig;

#[derive(Parser)]
struct Harness {
    #[command(flatten)]
    widget: WidgetConfig,
}

pub fn config(args: &[&str]) -> WidgetConfig {
    Harness::parse_from(std::iter::once("test").chain(args.iter().copied())).widget
}

#[derive(Default)]
struct Counters {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

pub struct Widget {
    pub endpoint: String,
    counters: Arc<Counters>,
}

impl Widget {
    /// Serves `rows(show_date)` as the event fragment, answering with `status`.
    pub async fn spawn(status: StatusCode, rows: fn(NaiveDate) -> String) -> Self {
        let counters = Arc::new(Counters::default());
        let shared = counters.clone();

        let app = Router::new().route(
            "/b/widget/",
            post(move |Form(fields): Form<HashMap<String, String>>| {
                let counters = shared.clone();
                async move {
                    let now = counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    counters.peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    counters.in_flight.fetch_sub(1, Ordering::SeqCst);

                    let date = fields
                        .get("show_date")
                        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
                    match date {
                        Some(date) => (
                            status,
                            Json(serde_json::json!({ "event_list_html": rows(date) })),
                        ),
                        None => (
                            StatusCode::BAD_REQUEST,
                            Json(serde_json::json!({ "error": "missing show_date" })),
                        ),
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            endpoint: format!("http://{}/b/widget/?a=equery", addr),
            counters,
        }
    }

    pub fn client(&self) -> WidgetClient {
        WidgetClient::new(config(&["--endpoint", self.endpoint.as_str()])).unwrap()
    }

    /// Most requests the widget was handling at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }
}

/// One open morning slot on `date`.
pub fn morning_slot(date: NaiveDate) -> String {
    format!(
        "<tr><td>{}, 9 AM to 10 AM</td><td>3 spaces</td><td></td><td></td></tr>",
        date.format("%a, %-d")
    )
}

/// One open slot on `date` that closes at the following midnight.
pub fn late_slot(date: NaiveDate) -> String {
    format!(
        "<tr><td>{}, 10 PM to 12 AM</td><td>2 spaces</td><td></td><td></td></tr>",
        date.format("%a, %-d")
    )
}
