use std::sync::Arc;

use fleetgate_core::approvals::ApprovalWorkflow;
use fleetgate_core::audit::{AuditSink, TracingAuditSink};
use fleetgate_core::config::AppConfig;
use fleetgate_db::repositories::{
    BookingRepository, SqlBookingRepository, SqlUserRepository, SqlVehicleRepository,
    UserRepository, VehicleRepository,
};
use fleetgate_db::DbPool;

use crate::auth::TokenIssuer;
use crate::service::BookingService;

pub struct Repositories {
    pub bookings: Arc<dyn BookingRepository>,
    pub users: Arc<dyn UserRepository>,
    pub vehicles: Arc<dyn VehicleRepository>,
}

/// Shared handler state. Cheap to clone; everything is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BookingService>,
    pub tokens: Arc<TokenIssuer>,
    /// `None` when the repositories are in memory and there is nothing to probe.
    pub db_pool: Option<DbPool>,
}

impl AppState {
    pub fn new(service: BookingService, tokens: TokenIssuer, db_pool: Option<DbPool>) -> Self {
        Self { service: Arc::new(service), tokens: Arc::new(tokens), db_pool }
    }

    /// SQLite-backed state with audit events going to the tracing pipeline.
    pub fn from_pool(config: &AppConfig, db_pool: DbPool) -> Self {
        let repositories = Repositories {
            bookings: Arc::new(SqlBookingRepository::new(db_pool.clone())),
            users: Arc::new(SqlUserRepository::new(db_pool.clone())),
            vehicles: Arc::new(SqlVehicleRepository::new(db_pool.clone())),
        };
        Self::with_repositories(config, repositories, Arc::new(TracingAuditSink), Some(db_pool))
    }

    pub fn with_repositories(
        config: &AppConfig,
        repositories: Repositories,
        audit: Arc<dyn AuditSink>,
        db_pool: Option<DbPool>,
    ) -> Self {
        let service = BookingService::new(
            ApprovalWorkflow::new(config.workflow.policy()),
            repositories.bookings,
            repositories.users,
            repositories.vehicles,
            audit,
        );
        Self::new(service, TokenIssuer::from_config(&config.auth), db_pool)
    }
}
