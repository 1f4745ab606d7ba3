//! Application service behind the REST surface.
//!
//! Every operation takes the calling [`Actor`] and the request's correlation
//! id. Authorization decisions come from [`ApprovalWorkflow`]; the repositories
//! only store what the workflow allowed.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleetgate_core::approvals::{ApprovalAction, ApprovalWorkflow, TransitionPlan};
use fleetgate_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use fleetgate_core::domain::booking::{
    Booking, BookingDetails, BookingId, BookingStatus, BookingTransition, NewBooking,
};
use fleetgate_core::domain::user::{Actor, Role, User, UserId};
use fleetgate_core::domain::vehicle::{Vehicle, VehicleId};
use fleetgate_core::errors::{ApplicationError, DomainError};
use fleetgate_core::reports::{export_csv, BookingFilter, DashboardStats};
use fleetgate_core::security::verify_password;
use fleetgate_db::repositories::{
    BookingRepository, RepositoryError, StatusChange, UserRepository, VehicleRepository,
};
use serde::Deserialize;
use tracing::{error, info, warn};

/// Body of `POST /bookings`. The creator is the caller, never a body field.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub vehicle_id: VehicleId,
    pub driver_name: String,
    pub approver1_id: UserId,
    pub approver2_id: UserId,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

pub struct BookingService {
    workflow: ApprovalWorkflow,
    bookings: Arc<dyn BookingRepository>,
    users: Arc<dyn UserRepository>,
    vehicles: Arc<dyn VehicleRepository>,
    audit: Arc<dyn AuditSink>,
}

impl BookingService {
    pub fn new(
        workflow: ApprovalWorkflow,
        bookings: Arc<dyn BookingRepository>,
        users: Arc<dyn UserRepository>,
        vehicles: Arc<dyn VehicleRepository>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self { workflow, bookings, users, vehicles, audit }
    }

    pub fn workflow(&self) -> &ApprovalWorkflow {
        &self.workflow
    }

    /// Checks a username and password against the stored hash.
    ///
    /// Unknown users and wrong passwords fail the same way.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        correlation_id: &str,
    ) -> Result<User, ApplicationError> {
        let credentials =
            self.users.find_credentials(username.trim()).await.map_err(persistence)?;

        let (verified, reason) = match &credentials {
            Some(stored) => match verify_password(password, &stored.password_hash) {
                Ok(true) => (true, None),
                Ok(false) => (false, Some("wrong_password")),
                Err(error) => {
                    error!(
                        event_name = "auth.login.corrupt_hash",
                        correlation_id = correlation_id,
                        user_id = stored.user.id.0,
                        error = %error,
                        "stored password hash is unusable; refusing login"
                    );
                    (false, Some("corrupt_hash"))
                }
            },
            None => (false, Some("unknown_user")),
        };

        match credentials {
            Some(stored) if verified => {
                self.audit.emit(AuditEvent::new(
                    None,
                    correlation_id,
                    "auth.login",
                    AuditCategory::Auth,
                    Some(stored.user.id),
                    AuditOutcome::Success,
                ));
                Ok(stored.user)
            }
            _ => {
                self.audit.emit(
                    AuditEvent::new(
                        None,
                        correlation_id,
                        "auth.login",
                        AuditCategory::Auth,
                        None,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("username", username.trim())
                    .with_metadata("reason", reason.unwrap_or("unknown")),
                );
                Err(ApplicationError::Authentication("invalid username or password".to_string()))
            }
        }
    }

    pub async fn current_user(&self, actor: &Actor) -> Result<User, ApplicationError> {
        self.users
            .find_by_id(actor.id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| ApplicationError::NotFound(format!("user {}", actor.id)))
    }

    pub async fn list_bookings(
        &self,
        _actor: &Actor,
        filter: &BookingFilter,
    ) -> Result<Vec<BookingDetails>, ApplicationError> {
        let bookings = self.bookings.list().await.map_err(persistence)?;
        Ok(filter.apply(self.hydrate(bookings).await?))
    }

    pub async fn get_booking(
        &self,
        _actor: &Actor,
        id: BookingId,
    ) -> Result<BookingDetails, ApplicationError> {
        let booking = self.find_booking(id).await?;
        let mut hydrated = self.hydrate(vec![booking]).await?;
        hydrated.pop().ok_or_else(|| ApplicationError::NotFound(format!("booking {id}")))
    }

    pub async fn list_my_bookings(
        &self,
        actor: &Actor,
    ) -> Result<Vec<BookingDetails>, ApplicationError> {
        let bookings = self.bookings.list_by_creator(actor.id).await.map_err(persistence)?;
        self.hydrate(bookings).await
    }

    /// Bookings waiting on this actor's decision, in creation order.
    pub async fn list_pending_for_approver(
        &self,
        actor: &Actor,
    ) -> Result<Vec<BookingDetails>, ApplicationError> {
        let awaiting = self
            .bookings
            .list_by_status(&[BookingStatus::Pending, BookingStatus::ApprovedLevel1])
            .await
            .map_err(persistence)?;
        let mine = self.workflow.pending_for(actor, awaiting);
        self.hydrate(mine).await
    }

    /// Every booking still awaiting a decision. Administrators only.
    pub async fn list_all_pending(
        &self,
        actor: &Actor,
    ) -> Result<Vec<BookingDetails>, ApplicationError> {
        let awaiting = self
            .bookings
            .list_by_status(&[BookingStatus::Pending, BookingStatus::ApprovedLevel1])
            .await
            .map_err(persistence)?;
        let all = self.workflow.all_pending(actor, awaiting)?;
        self.hydrate(all).await
    }

    pub async fn create_booking(
        &self,
        actor: &Actor,
        request: CreateBookingRequest,
        correlation_id: &str,
    ) -> Result<BookingDetails, ApplicationError> {
        let draft = NewBooking {
            vehicle_id: request.vehicle_id,
            driver_name: request.driver_name.trim().to_string(),
            creator_id: actor.id,
            approver1_id: request.approver1_id,
            approver2_id: request.approver2_id,
            start_date: request.start_date,
            end_date: request.end_date,
        };
        self.workflow.validate_new(&draft)?;

        if self.vehicles.find_by_id(draft.vehicle_id).await.map_err(persistence)?.is_none() {
            return Err(DomainError::Validation(format!(
                "vehicle {} does not exist",
                draft.vehicle_id
            ))
            .into());
        }
        for (field, approver_id) in
            [("approver1Id", draft.approver1_id), ("approver2Id", draft.approver2_id)]
        {
            if self.users.find_by_id(approver_id).await.map_err(persistence)?.is_none() {
                return Err(DomainError::Validation(format!(
                    "{field} {approver_id} does not exist"
                ))
                .into());
            }
        }

        let booking = self.bookings.create(draft, Utc::now()).await.map_err(persistence)?;

        info!(
            event_name = "booking.created",
            correlation_id = %correlation_id,
            booking_id = booking.id.0,
            actor_id = actor.id.0,
            "booking created"
        );
        self.audit.emit(AuditEvent::new(
            Some(booking.id),
            correlation_id,
            "booking.created",
            AuditCategory::Booking,
            Some(actor.id),
            AuditOutcome::Success,
        ));

        self.get_booking(actor, booking.id).await
    }

    pub async fn approve(
        &self,
        actor: &Actor,
        id: BookingId,
        correlation_id: &str,
    ) -> Result<BookingDetails, ApplicationError> {
        self.transition(actor, id, ApprovalAction::Approve, correlation_id).await
    }

    pub async fn reject(
        &self,
        actor: &Actor,
        id: BookingId,
        correlation_id: &str,
    ) -> Result<BookingDetails, ApplicationError> {
        self.transition(actor, id, ApprovalAction::Reject, correlation_id).await
    }

    pub async fn history(
        &self,
        _actor: &Actor,
        id: BookingId,
    ) -> Result<Vec<BookingTransition>, ApplicationError> {
        self.find_booking(id).await?;
        self.bookings.list_transitions(id).await.map_err(persistence)
    }

    pub async fn dashboard(&self, _actor: &Actor) -> Result<DashboardStats, ApplicationError> {
        let vehicles = self.vehicles.list().await.map_err(persistence)?;
        let bookings = self.bookings.list().await.map_err(persistence)?;
        let hydrated = self.hydrate(bookings).await?;
        Ok(DashboardStats::compute(&vehicles, &hydrated, Utc::now()))
    }

    pub async fn export_csv(
        &self,
        actor: &Actor,
        filter: &BookingFilter,
    ) -> Result<String, ApplicationError> {
        let bookings = self.list_bookings(actor, filter).await?;
        export_csv(&bookings).map_err(|error| ApplicationError::Internal(error.to_string()))
    }

    pub async fn list_users(&self, actor: &Actor) -> Result<Vec<User>, ApplicationError> {
        self.workflow.require_role(actor, Role::Admin)?;
        self.users.list().await.map_err(persistence)
    }

    pub async fn list_approvers(&self, _actor: &Actor) -> Result<Vec<User>, ApplicationError> {
        self.users.list_by_role(Role::Approver).await.map_err(persistence)
    }

    pub async fn list_vehicles(&self, _actor: &Actor) -> Result<Vec<Vehicle>, ApplicationError> {
        self.vehicles.list().await.map_err(persistence)
    }

    async fn find_booking(&self, id: BookingId) -> Result<Booking, ApplicationError> {
        self.bookings
            .find_by_id(id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| ApplicationError::NotFound(format!("booking {id}")))
    }

    async fn transition(
        &self,
        actor: &Actor,
        id: BookingId,
        action: ApprovalAction,
        correlation_id: &str,
    ) -> Result<BookingDetails, ApplicationError> {
        let booking = self.find_booking(id).await?;

        let plan = match self.workflow.plan(actor, &booking, action) {
            Ok(plan) => plan,
            Err(error) => {
                self.refuse(actor, id, action, &error, correlation_id);
                return Err(error.into());
            }
        };

        let change = self
            .bookings
            .update_status(plan.booking_id, plan.from, plan.to, actor.id, Utc::now())
            .await
            .map_err(persistence)?;

        match change {
            StatusChange::Applied(updated) => {
                self.record(actor, &plan, correlation_id);
                let mut hydrated = self.hydrate(vec![updated]).await?;
                hydrated.pop().ok_or_else(|| ApplicationError::NotFound(format!("booking {id}")))
            }
            StatusChange::Stale(actual) => {
                let error = if actual.is_terminal() {
                    DomainError::TerminalState { booking_id: id, status: actual }
                } else {
                    DomainError::StaleStatus { booking_id: id, expected: plan.from, actual }
                };
                self.refuse(actor, id, action, &error, correlation_id);
                Err(error.into())
            }
            StatusChange::NotFound => Err(ApplicationError::NotFound(format!("booking {id}"))),
        }
    }

    fn record(&self, actor: &Actor, plan: &TransitionPlan, correlation_id: &str) {
        let event_name = match plan.action {
            ApprovalAction::Approve => "booking.approved",
            ApprovalAction::Reject => "booking.rejected",
        };
        info!(
            event_name = event_name,
            correlation_id = %correlation_id,
            booking_id = plan.booking_id.0,
            actor_id = actor.id.0,
            stage = %plan.stage,
            from = plan.from.code(),
            to = plan.to.code(),
            "booking status changed"
        );
        self.audit.emit(
            AuditEvent::new(
                Some(plan.booking_id),
                correlation_id,
                event_name,
                AuditCategory::Workflow,
                Some(actor.id),
                AuditOutcome::Success,
            )
            .with_metadata("stage", plan.stage.to_string())
            .with_metadata("from", plan.from.code().to_string())
            .with_metadata("to", plan.to.code().to_string()),
        );
    }

    fn refuse(
        &self,
        actor: &Actor,
        id: BookingId,
        action: ApprovalAction,
        error: &DomainError,
        correlation_id: &str,
    ) {
        warn!(
            event_name = "booking.transition_refused",
            correlation_id = %correlation_id,
            booking_id = id.0,
            actor_id = actor.id.0,
            action = action.as_str(),
            error = %error,
            "booking transition refused"
        );
        self.audit.emit(
            AuditEvent::new(
                Some(id),
                correlation_id,
                "booking.transition_refused",
                AuditCategory::Workflow,
                Some(actor.id),
                AuditOutcome::Rejected,
            )
            .with_metadata("action", action.as_str())
            .with_metadata("reason", error.to_string()),
        );
    }

    /// Resolves vehicle and user references. Missing rows stay `None`.
    async fn hydrate(
        &self,
        bookings: Vec<Booking>,
    ) -> Result<Vec<BookingDetails>, ApplicationError> {
        if bookings.is_empty() {
            return Ok(Vec::new());
        }

        let users: HashMap<UserId, User> = self
            .users
            .list()
            .await
            .map_err(persistence)?
            .into_iter()
            .map(|user| (user.id, user))
            .collect();
        let vehicles: HashMap<VehicleId, Vehicle> = self
            .vehicles
            .list()
            .await
            .map_err(persistence)?
            .into_iter()
            .map(|vehicle| (vehicle.id, vehicle))
            .collect();

        Ok(bookings
            .into_iter()
            .map(|booking| BookingDetails {
                vehicle: vehicles.get(&booking.vehicle_id).cloned(),
                creator: users.get(&booking.creator_id).cloned(),
                approver1: users.get(&booking.approver1_id).cloned(),
                approver2: users.get(&booking.approver2_id).cloned(),
                booking,
            })
            .collect())
    }
}
