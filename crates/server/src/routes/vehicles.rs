use axum::{extract::State, Json};
use fleetgate_core::domain::vehicle::Vehicle;

use crate::auth::AuthenticatedActor;
use crate::error::{ApiError, CorrelationId};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<Json<Vec<Vehicle>>, ApiError> {
    state.service.list_vehicles(&actor).await.map(Json).map_err(|error| correlation_id.fail(error))
}
