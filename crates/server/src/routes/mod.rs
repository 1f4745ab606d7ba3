use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use fleetgate_core::domain::booking::BookingId;
use fleetgate_core::errors::DomainError;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{ApiError, CorrelationId, CORRELATION_HEADER};
use crate::health;
use crate::state::AppState;

pub mod auth;
pub mod bookings;
pub mod reports;
pub mod users;
pub mod vehicles;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::HeaderName::from_static(CORRELATION_HEADER),
        ]);

    Router::new()
        .route("/health", get(health::health))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/bookings", get(bookings::list).post(bookings::create))
        .route("/bookings/pending-approvals", get(bookings::pending_for_me))
        .route("/bookings/all-pending-approvals", get(bookings::all_pending))
        .route("/bookings/my-bookings", get(bookings::mine))
        .route("/bookings/{id}", get(bookings::show))
        .route("/bookings/{id}/history", get(bookings::history))
        .route("/bookings/{id}/approve", post(bookings::approve))
        .route("/bookings/{id}/reject", post(bookings::reject))
        .route("/users", get(users::list))
        .route("/users/approvers", get(users::approvers))
        .route("/vehicles", get(vehicles::list))
        .route("/reports/dashboard", get(reports::dashboard))
        .route("/reports/export", get(reports::export))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Path ids are parsed by hand so a malformed id gets the JSON error body.
pub(crate) fn parse_booking_id(
    raw: &str,
    correlation_id: &CorrelationId,
) -> Result<BookingId, ApiError> {
    raw.trim().parse::<i64>().map(BookingId).map_err(|_| {
        correlation_id.fail(
            DomainError::Validation(format!("booking id `{raw}` is not a number")).into(),
        )
    })
}
