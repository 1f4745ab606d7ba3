//! Typed REST client for the booking approval API.
//!
//! Calls are never retried. After an approve or reject the client refetches
//! the pending list instead of patching anything locally.

use std::time::Duration;

use chrono::{DateTime, Utc};
use fleetgate_core::domain::booking::{BookingDetails, BookingId};
use fleetgate_core::domain::user::{User, UserId};
use fleetgate_core::domain::vehicle::VehicleId;
use reqwest::{Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

pub mod error;
pub mod queue;

pub use error::ClientError;
pub use queue::ApprovalQueue;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDraft {
    pub vehicle_id: VehicleId,
    pub driver_name: String,
    pub approver1_id: UserId,
    pub approver2_id: UserId,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Result of a successful approve or reject.
///
/// The decision has been applied once this exists. A failed refetch of the
/// queue only lands in `pending` and never turns the decision into an error.
#[derive(Debug)]
pub struct Decision {
    pub booking: BookingDetails,
    /// The caller's queue as the server reports it after the change.
    pub pending: Result<Vec<BookingDetails>, ClientError>,
}

#[derive(Deserialize)]
struct LoginReply {
    access_token: String,
    user: User,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorReply {
    error: String,
    correlation_id: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ApprovalClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApprovalClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ClientError::InvalidBaseUrl(base_url));
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url, token: None })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Exchanges credentials for a token and keeps it for later calls.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<User, ClientError> {
        let body = serde_json::json!({ "username": username, "password": password });
        let response = self.http.post(self.url("/auth/login")).json(&body).send().await?;
        let reply: LoginReply = decode(response).await?;
        self.token = Some(reply.access_token);
        Ok(reply.user)
    }

    pub async fn me(&self) -> Result<User, ClientError> {
        self.get("/auth/me").await
    }

    pub async fn pending(&self) -> Result<Vec<BookingDetails>, ClientError> {
        self.get("/bookings/pending-approvals").await
    }

    pub async fn all_pending(&self) -> Result<Vec<BookingDetails>, ClientError> {
        self.get("/bookings/all-pending-approvals").await
    }

    pub async fn booking(&self, id: BookingId) -> Result<BookingDetails, ClientError> {
        self.get(&format!("/bookings/{id}")).await
    }

    pub async fn create_booking(
        &self,
        draft: &BookingDraft,
    ) -> Result<BookingDetails, ClientError> {
        let request = self.authorized(Method::POST, "/bookings")?.json(draft);
        decode(request.send().await?).await
    }

    pub async fn approve(&self, id: BookingId) -> Result<Decision, ClientError> {
        self.decide(id, "approve").await
    }

    pub async fn reject(&self, id: BookingId) -> Result<Decision, ClientError> {
        self.decide(id, "reject").await
    }

    async fn decide(&self, id: BookingId, action: &str) -> Result<Decision, ClientError> {
        let request = self.authorized(Method::POST, &format!("/bookings/{id}/{action}"))?;
        let booking: BookingDetails = decode(request.send().await?).await?;
        debug!(
            event_name = "client.booking.decided",
            booking_id = id.0,
            action = action,
            status = booking.booking.status.code(),
            "decision accepted; refetching pending list"
        );
        let pending = self.pending().await;
        if let Err(error) = &pending {
            warn!(
                event_name = "client.pending.refetch_failed",
                booking_id = id.0,
                action = action,
                error = %error,
                "decision applied but the pending list could not be refetched"
            );
        }
        Ok(Decision { booking, pending })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let request = self.authorized(Method::GET, path)?;
        decode(request.send().await?).await
    }

    fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let token = self.token.as_deref().ok_or(ClientError::NotAuthenticated)?;
        Ok(self.http.request(method, self.url(path)).bearer_auth(token))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let text = response.text().await?;
    let (message, correlation_id) = match serde_json::from_str::<ErrorReply>(&text) {
        Ok(reply) => (reply.error, reply.correlation_id),
        Err(_) => (text, None),
    };
    Err(ClientError::Api { status: status.as_u16(), message, correlation_id })
}
