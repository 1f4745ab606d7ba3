//! HTTP surface of the vehicle booking approval service.

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod health;
pub mod logging;
pub mod routes;
pub mod service;
pub mod state;

pub use auth::{AuthenticatedActor, TokenIssuer};
pub use bootstrap::{bootstrap, bootstrap_with_config, serve, Application, BootstrapError};
pub use error::{ApiError, CorrelationId, ErrorBody};
pub use routes::router;
pub use service::{BookingService, CreateBookingRequest};
pub use state::{AppState, Repositories};
