use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use fleetgate_core::domain::booking::{BookingDetails, BookingTransition};
use fleetgate_core::errors::DomainError;
use fleetgate_core::reports::{BookingFilter, StatusFilter};
use serde::Deserialize;

use crate::auth::AuthenticatedActor;
use crate::error::{ApiError, CorrelationId};
use crate::routes::parse_booking_id;
use crate::service::CreateBookingRequest;
use crate::state::AppState;

/// Query string shared by the booking list and the CSV export.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl BookingQuery {
    pub fn into_filter(self) -> Result<BookingFilter, DomainError> {
        let status = match self.status.as_deref() {
            Some(raw) => raw
                .parse::<StatusFilter>()
                .map_err(|error| DomainError::Validation(error.to_string()))?,
            None => StatusFilter::All,
        };

        let start_from =
            self.start_date.as_deref().map(|raw| parse_bound("startDate", raw, false)).transpose()?;
        let start_until =
            self.end_date.as_deref().map(|raw| parse_bound("endDate", raw, true)).transpose()?;
        if let (Some(from), Some(until)) = (start_from, start_until) {
            if from > until {
                return Err(DomainError::Validation(
                    "startDate must not be after endDate".to_string(),
                ));
            }
        }

        Ok(BookingFilter {
            status,
            search: self.search.filter(|term| !term.trim().is_empty()),
            start_from,
            start_until,
        })
    }
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DD`. A bare date used as an upper
/// bound covers that whole day.
fn parse_bound(field: &str, raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, DomainError> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        DomainError::Validation(format!("{field} `{raw}` is not a date (YYYY-MM-DD or RFC 3339)"))
    })?;
    let time = if end_of_day { date.and_hms_opt(23, 59, 59) } else { date.and_hms_opt(0, 0, 0) };
    time.map(|value| value.and_utc())
        .ok_or_else(|| DomainError::Validation(format!("{field} `{raw}` is out of range")))
}

pub async fn list(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(query): Query<BookingQuery>,
) -> Result<Json<Vec<BookingDetails>>, ApiError> {
    let filter = query.into_filter().map_err(|error| correlation_id.fail(error.into()))?;
    state
        .service
        .list_bookings(&actor, &filter)
        .await
        .map(Json)
        .map_err(|error| correlation_id.fail(error))
}

pub async fn create(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    AuthenticatedActor(actor): AuthenticatedActor,
    body: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingDetails>), ApiError> {
    let Json(request) = body.map_err(|rejection| {
        correlation_id.fail(DomainError::Validation(rejection.body_text()).into())
    })?;

    let created = state
        .service
        .create_booking(&actor, request, correlation_id.as_str())
        .await
        .map_err(|error| correlation_id.fail(error))?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn pending_for_me(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<Json<Vec<BookingDetails>>, ApiError> {
    state
        .service
        .list_pending_for_approver(&actor)
        .await
        .map(Json)
        .map_err(|error| correlation_id.fail(error))
}

pub async fn all_pending(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<Json<Vec<BookingDetails>>, ApiError> {
    state
        .service
        .list_all_pending(&actor)
        .await
        .map(Json)
        .map_err(|error| correlation_id.fail(error))
}

pub async fn mine(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<Json<Vec<BookingDetails>>, ApiError> {
    state
        .service
        .list_my_bookings(&actor)
        .await
        .map(Json)
        .map_err(|error| correlation_id.fail(error))
}

pub async fn show(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(raw_id): Path<String>,
) -> Result<Json<BookingDetails>, ApiError> {
    let id = parse_booking_id(&raw_id, &correlation_id)?;
    state
        .service
        .get_booking(&actor, id)
        .await
        .map(Json)
        .map_err(|error| correlation_id.fail(error))
}

pub async fn history(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(raw_id): Path<String>,
) -> Result<Json<Vec<BookingTransition>>, ApiError> {
    let id = parse_booking_id(&raw_id, &correlation_id)?;
    state.service.history(&actor, id).await.map(Json).map_err(|error| correlation_id.fail(error))
}

pub async fn approve(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(raw_id): Path<String>,
) -> Result<Json<BookingDetails>, ApiError> {
    let id = parse_booking_id(&raw_id, &correlation_id)?;
    state
        .service
        .approve(&actor, id, correlation_id.as_str())
        .await
        .map(Json)
        .map_err(|error| correlation_id.fail(error))
}

pub async fn reject(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(raw_id): Path<String>,
) -> Result<Json<BookingDetails>, ApiError> {
    let id = parse_booking_id(&raw_id, &correlation_id)?;
    state
        .service
        .reject(&actor, id, correlation_id.as_str())
        .await
        .map(Json)
        .map_err(|error| correlation_id.fail(error))
}
