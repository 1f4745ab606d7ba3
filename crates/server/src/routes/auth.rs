use axum::{extract::rejection::JsonRejection, extract::State, Json};
use fleetgate_core::domain::user::User;
use fleetgate_core::errors::{ApplicationError, DomainError};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::AuthenticatedActor;
use crate::error::{ApiError, CorrelationId};
use crate::state::AppState;

#[derive(Clone, Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: User,
}

pub async fn login(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = body.map_err(|rejection| {
        correlation_id.fail(DomainError::Validation(rejection.body_text()).into())
    })?;

    let user = state
        .service
        .authenticate(&request.username, &request.password, correlation_id.as_str())
        .await
        .map_err(|error| correlation_id.fail(error))?;
    let access_token = state
        .tokens
        .issue(&user)
        .map_err(|error| correlation_id.fail(ApplicationError::from(error)))?;

    info!(
        event_name = "auth.login.succeeded",
        correlation_id = %correlation_id.as_str(),
        actor_id = user.id.0,
        "user signed in"
    );
    Ok(Json(LoginResponse { access_token, user }))
}

pub async fn me(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<Json<User>, ApiError> {
    state.service.current_user(&actor).await.map(Json).map_err(|error| correlation_id.fail(error))
}
