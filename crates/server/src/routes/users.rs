use axum::{extract::State, Json};
use fleetgate_core::domain::user::User;

use crate::auth::AuthenticatedActor;
use crate::error::{ApiError, CorrelationId};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<Json<Vec<User>>, ApiError> {
    state.service.list_users(&actor).await.map(Json).map_err(|error| correlation_id.fail(error))
}

/// Candidates for the two approver slots on the booking form.
pub async fn approvers(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<Json<Vec<User>>, ApiError> {
    state
        .service
        .list_approvers(&actor)
        .await
        .map(Json)
        .map_err(|error| correlation_id.fail(error))
}
