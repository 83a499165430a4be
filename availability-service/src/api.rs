use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use shared::{find_at, RowErrorPolicy};
use std::sync::Arc;

use crate::client::WidgetClient;
use crate::handlers::{Lookup, ReservationView};

#[derive(Clone)]
pub struct AppState {
    pub client: Arc<WidgetClient>,
    pub policy: RowErrorPolicy,
}

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct InstantQuery {
    pub at: NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub struct DayResponse {
    pub date: NaiveDate,
    pub reservations: Vec<ReservationView>,
}

#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub at: NaiveDateTime,
    pub available: bool,
    pub matches: Vec<ReservationView>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/availability", get(day_availability))
        .route("/availability/at", get(availability_at))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}

pub async fn day_availability(
    State(state): State<AppState>,
    Query(query): Query<DayQuery>,
) -> Result<Json<DayResponse>, ApiError> {
    let day = state
        .client
        .fetch_day(query.date, state.policy)
        .await
        .map_err(upstream_error)?;

    Ok(Json(DayResponse {
        date: day.date,
        reservations: day.reservations.iter().map(ReservationView::from).collect(),
    }))
}

pub async fn availability_at(
    State(state): State<AppState>,
    Query(query): Query<InstantQuery>,
) -> Result<Json<LookupResponse>, ApiError> {
    let reservations = state
        .client
        .fetch_covering(query.at, state.policy)
        .await
        .map_err(upstream_error)?;

    let matches = find_at(&reservations, query.at);
    Ok(Json(LookupResponse {
        at: query.at,
        available: Lookup::of(&matches) == Lookup::Available,
        matches: matches.into_iter().map(ReservationView::from).collect(),
    }))
}

pub async fn health_check() -> &'static str {
    "OK"
}

fn upstream_error(e: anyhow::Error) -> ApiError {
    tracing::error!("Failed to fetch availability: {:#}", e);
    (
        StatusCode::BAD_GATEWAY,
        Json(ErrorResponse {
            error: format!("Failed to fetch availability: {:#}", e),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{late_slot, morning_slot, Widget};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(widget: &Widget) -> Router {
        create_router(AppState {
            client: Arc::new(widget.client()),
            policy: RowErrorPolicy::Abort,
        })
    }

    async fn get(widget: &Widget, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app(widget).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test]
    async fn test_health() {
        let widget = Widget::spawn(StatusCode::OK, morning_slot).await;
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app(&widget).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_malformed_query_is_rejected() {
        let widget = Widget::spawn(StatusCode::OK, morning_slot).await;
        assert_eq!(get(&widget, "/availability?date=tomorrow").await.0, StatusCode::BAD_REQUEST);
        assert_eq!(get(&widget, "/availability").await.0, StatusCode::BAD_REQUEST);
        assert_eq!(
            get(&widget, "/availability/at?at=2021-03-15").await.0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(widget.peak_in_flight(), 0);
    }

    #[tokio::test]
    async fn test_day_availability() {
        let widget = Widget::spawn(StatusCode::OK, morning_slot).await;
        let (status, body) = get(&widget, "/availability?date=2021-03-15").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["date"], "2021-03-15");
        assert_eq!(body["reservations"][0]["slot"], "9 AM to 10 AM");
        assert_eq!(body["reservations"][0]["spaces"], 3);
        assert_eq!(body["reservations"][0]["is_available"], true);
    }

    #[tokio::test]
    async fn test_availability_at_midnight_boundary() {
        let widget = Widget::spawn(StatusCode::OK, late_slot).await;
        let (status, body) = get(&widget, "/availability/at?at=2021-03-16T00:00:00").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["available"], true);
        assert_eq!(body["matches"].as_array().unwrap().len(), 1);
        assert_eq!(body["matches"][0]["date"], "Mon 15");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let widget = Widget::spawn(StatusCode::INTERNAL_SERVER_ERROR, morning_slot).await;
        let (status, body) = get(&widget, "/availability?date=2021-03-15").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("500"));
    }
}
