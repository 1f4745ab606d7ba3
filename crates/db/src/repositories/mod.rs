use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use fleetgate_core::domain::booking::{
    Booking, BookingId, BookingStatus, BookingTransition, NewBooking,
};
use fleetgate_core::domain::user::{Role, User, UserId};
use fleetgate_core::domain::vehicle::{Ownership, Vehicle, VehicleId, VehicleType};

pub mod booking;
pub mod memory;
pub mod user;
pub mod vehicle;

pub use booking::SqlBookingRepository;
pub use memory::{InMemoryBookingRepository, InMemoryUserRepository, InMemoryVehicleRepository};
pub use user::SqlUserRepository;
pub use vehicle::SqlVehicleRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("duplicate record: {0}")]
    Duplicate(String),
}

/// Outcome of a compare-and-set status write.
#[derive(Clone, Debug, PartialEq)]
pub enum StatusChange {
    Applied(Booking),
    /// The stored status no longer matched the expected one; nothing was written.
    Stale(BookingStatus),
    NotFound,
}

/// A user row together with its stored password hash. Never leaves the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub name: String,
    pub role: Role,
    pub password_hash: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewVehicle {
    pub model_name: String,
    pub plate_number: String,
    pub vehicle_type: VehicleType,
    pub ownership: Ownership,
    pub location: String,
    pub fuel_consumption: f64,
    pub last_service: Option<DateTime<Utc>>,
    pub current_fuel: f64,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<UserCredentials>, RepositoryError>;
    async fn list(&self) -> Result<Vec<User>, RepositoryError>;
    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, RepositoryError>;
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;
}

#[async_trait]
pub trait VehicleRepository: Send + Sync {
    async fn find_by_id(&self, id: VehicleId) -> Result<Option<Vehicle>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Vehicle>, RepositoryError>;
    async fn create(&self, vehicle: NewVehicle) -> Result<Vehicle, RepositoryError>;
}

/// Booking store. Every list is returned in creation order (id ascending).
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create(
        &self,
        booking: NewBooking,
        created_at: DateTime<Utc>,
    ) -> Result<Booking, RepositoryError>;
    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Booking>, RepositoryError>;
    async fn list_by_status(
        &self,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, RepositoryError>;
    async fn list_by_creator(&self, creator_id: UserId) -> Result<Vec<Booking>, RepositoryError>;

    /// Moves the booking from `expected` to `next` only if it is still in
    /// `expected`, appending the matching history row in the same write.
    async fn update_status(
        &self,
        id: BookingId,
        expected: BookingStatus,
        next: BookingStatus,
        actor_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<StatusChange, RepositoryError>;

    async fn list_transitions(
        &self,
        id: BookingId,
    ) -> Result<Vec<BookingTransition>, RepositoryError>;
}

pub(crate) fn decode_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{column}: {error}")))
}

pub(crate) fn decode_err(error: sqlx::Error) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

pub(crate) fn map_unique_violation(error: sqlx::Error, what: &str) -> RepositoryError {
    match &error {
        sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
            RepositoryError::Duplicate(what.to_string())
        }
        _ => RepositoryError::Database(error),
    }
}
