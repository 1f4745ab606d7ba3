use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use fleetgate_core::reports::DashboardStats;

use crate::auth::AuthenticatedActor;
use crate::error::{ApiError, CorrelationId};
use crate::routes::bookings::BookingQuery;
use crate::state::AppState;

pub async fn dashboard(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<Json<DashboardStats>, ApiError> {
    state.service.dashboard(&actor).await.map(Json).map_err(|error| correlation_id.fail(error))
}

/// CSV download of the bookings matching the same filters as `GET /bookings`.
pub async fn export(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(query): Query<BookingQuery>,
) -> Result<Response, ApiError> {
    let filter = query.into_filter().map_err(|error| correlation_id.fail(error.into()))?;
    let csv = state
        .service
        .export_csv(&actor, &filter)
        .await
        .map_err(|error| correlation_id.fail(error))?;

    let filename = format!("bookings-{}.csv", Utc::now().format("%Y%m%d"));
    let mut response = (StatusCode::OK, csv).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8"));
    let disposition = format!("attachment; filename=\"{filename}\"");
    if let Ok(disposition) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }
    Ok(response)
}
