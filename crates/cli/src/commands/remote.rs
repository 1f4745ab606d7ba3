use std::time::Duration;

use fleetgate_client::{ApprovalClient, ClientError};

use crate::commands::{current_thread_runtime, CommandResult};

pub const API_URL_ENV: &str = "FLEETGATE_API_URL";
pub const API_TOKEN_ENV: &str = "FLEETGATE_API_TOKEN";
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";

/// Where the approval commands send their requests.
#[derive(Clone, Debug)]
pub struct ApiTarget {
    pub url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl ApiTarget {
    pub(crate) fn client(&self, command: &str) -> Result<ApprovalClient, CommandResult> {
        let token = self
            .token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                CommandResult::failure(
                    command,
                    "missing_token",
                    format!("an access token is required (pass --token or set {API_TOKEN_ENV})"),
                    2,
                )
            })?;

        ApprovalClient::new(&self.url, self.timeout)
            .map(|client| client.with_token(token))
            .map_err(|error| {
                CommandResult::failure(command, "invalid_target", error.to_string(), 2)
            })
    }
}

/// Runs one client call on a throwaway runtime.
pub(crate) fn call<T, F, Fut>(command: &str, target: &ApiTarget, f: F) -> Result<T, CommandResult>
where
    F: FnOnce(ApprovalClient) -> Fut,
    Fut: std::future::Future<Output = Result<T, ClientError>>,
{
    let client = target.client(command)?;
    let runtime = current_thread_runtime(command)?;
    runtime.block_on(f(client)).map_err(|error| client_failure(command, &error))
}

pub(crate) fn client_failure(command: &str, error: &ClientError) -> CommandResult {
    let (error_class, exit_code) = match error {
        ClientError::Transport(_) => ("transport", 4),
        ClientError::NotAuthenticated => ("missing_token", 2),
        ClientError::InvalidBaseUrl(_) => ("invalid_target", 2),
        ClientError::Api { status: 401, .. } => ("unauthenticated", 6),
        ClientError::Api { status: 403, .. } => ("forbidden", 7),
        ClientError::Api { status: 404, .. } => ("not_found", 8),
        ClientError::Api { status: 409, .. } => ("conflict", 9),
        ClientError::Api { status: 400, .. } => ("validation", 10),
        ClientError::Api { .. } => ("server_error", 11),
    };

    let message = match error {
        ClientError::Api { message, correlation_id: Some(id), .. } => {
            format!("{message} (correlation id {id})")
        }
        other => other.to_string(),
    };
    CommandResult::failure(command, error_class, message, exit_code)
}
