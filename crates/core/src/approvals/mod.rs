//! Two-stage booking approval.
//!
//! A booking starts `Pending` and needs two sequential sign-offs: the level 1
//! approver moves it to `ApprovedLevel1`, then the level 2 approver moves it to
//! `ApprovedFinal`. Either approver may reject during their own stage. Both
//! `ApprovedFinal` and `Rejected` are terminal.
//!
//! Everything here is pure: the workflow decides whether a transition is
//! allowed and what it leads to, and the caller persists the result.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::booking::{Booking, BookingDetails, BookingId, BookingStatus, NewBooking};
use crate::domain::user::{Actor, Role};
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStage {
    Level1,
    Level2,
}

impl ApprovalStage {
    pub fn of(status: BookingStatus) -> Option<Self> {
        match status {
            BookingStatus::Pending => Some(Self::Level1),
            BookingStatus::ApprovedLevel1 => Some(Self::Level2),
            BookingStatus::ApprovedFinal | BookingStatus::Rejected => None,
        }
    }
}

impl fmt::Display for ApprovalStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Level1 => f.write_str("level 1"),
            Self::Level2 => f.write_str("level 2"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    Approve,
    Reject,
}

impl ApprovalAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

/// The transition table. `None` means the status accepts no further action.
pub fn next_status(current: BookingStatus, action: ApprovalAction) -> Option<BookingStatus> {
    use ApprovalAction::{Approve, Reject};
    use BookingStatus::{ApprovedFinal, ApprovedLevel1, Pending, Rejected};

    match (current, action) {
        (Pending, Approve) => Some(ApprovedLevel1),
        (ApprovedLevel1, Approve) => Some(ApprovedFinal),
        (Pending, Reject) | (ApprovedLevel1, Reject) => Some(Rejected),
        (ApprovedFinal, _) | (Rejected, _) => None,
    }
}

/// Whether `to` is reachable from `from` in one step.
pub fn is_valid_step(from: BookingStatus, to: BookingStatus) -> bool {
    [ApprovalAction::Approve, ApprovalAction::Reject]
        .into_iter()
        .any(|action| next_status(from, action) == Some(to))
}

/// Deployment switches for approver assignment and administrator powers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowPolicy {
    /// Accept bookings whose two approvers are the same user.
    pub allow_identical_approvers: bool,
    /// Let administrators approve or reject any stage, not only their own.
    pub admin_override: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionPlan {
    pub booking_id: BookingId,
    pub stage: ApprovalStage,
    pub action: ApprovalAction,
    pub from: BookingStatus,
    pub to: BookingStatus,
}

#[derive(Clone, Debug, Default)]
pub struct ApprovalWorkflow {
    policy: WorkflowPolicy,
}

impl ApprovalWorkflow {
    pub fn new(policy: WorkflowPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> WorkflowPolicy {
        self.policy
    }

    /// Identity rule: the actor is the assigned approver of the current stage.
    pub fn is_stage_approver(&self, actor: &Actor, booking: &Booking) -> bool {
        booking.stage_approver() == Some(actor.id)
    }

    /// The single authorization predicate for approve and reject.
    pub fn can_act(&self, actor: &Actor, booking: &Booking) -> bool {
        self.authorize(actor, booking).is_ok()
    }

    /// Terminal state wins over identity: acting on a finished booking is
    /// always an invalid-state error, whoever asks.
    pub fn authorize(
        &self,
        actor: &Actor,
        booking: &Booking,
    ) -> Result<ApprovalStage, DomainError> {
        let Some(stage) = ApprovalStage::of(booking.status) else {
            return Err(DomainError::TerminalState {
                booking_id: booking.id,
                status: booking.status,
            });
        };

        let overridden = self.policy.admin_override && actor.is_admin();
        if self.is_stage_approver(actor, booking) || overridden {
            return Ok(stage);
        }

        Err(DomainError::NotStageApprover { booking_id: booking.id, actor_id: actor.id, stage })
    }

    pub fn plan(
        &self,
        actor: &Actor,
        booking: &Booking,
        action: ApprovalAction,
    ) -> Result<TransitionPlan, DomainError> {
        let stage = self.authorize(actor, booking)?;
        let to = next_status(booking.status, action).ok_or(DomainError::TerminalState {
            booking_id: booking.id,
            status: booking.status,
        })?;

        Ok(TransitionPlan { booking_id: booking.id, stage, action, from: booking.status, to })
    }

    /// Visibility rule for an approver's queue. Identity only: the admin
    /// override never widens a personal queue.
    pub fn is_pending_for(&self, actor: &Actor, booking: &Booking) -> bool {
        self.is_stage_approver(actor, booking)
    }

    /// Keeps the caller's ordering.
    pub fn pending_for<T>(&self, actor: &Actor, bookings: Vec<T>) -> Vec<T>
    where
        T: AsRef<Booking>,
    {
        bookings.into_iter().filter(|item| self.is_pending_for(actor, item.as_ref())).collect()
    }

    pub fn all_pending<T>(&self, actor: &Actor, bookings: Vec<T>) -> Result<Vec<T>, DomainError>
    where
        T: AsRef<Booking>,
    {
        self.require_role(actor, Role::Admin)?;
        Ok(bookings
            .into_iter()
            .filter(|item| item.as_ref().status.is_awaiting_approval())
            .collect())
    }

    pub fn require_role(&self, actor: &Actor, required: Role) -> Result<(), DomainError> {
        if actor.role == required {
            return Ok(());
        }
        Err(DomainError::RoleRequired { required })
    }

    /// Shape checks that need no lookups. Existence of the vehicle and the
    /// approvers is checked against the store by the caller.
    pub fn validate_new(&self, draft: &NewBooking) -> Result<(), DomainError> {
        if draft.driver_name.trim().is_empty() {
            return Err(DomainError::Validation("driverName is required".to_string()));
        }
        if draft.start_date >= draft.end_date {
            return Err(DomainError::Validation("startDate must be before endDate".to_string()));
        }
        if !self.policy.allow_identical_approvers && draft.approver1_id == draft.approver2_id {
            return Err(DomainError::Validation(
                "approver1Id and approver2Id must be different users".to_string(),
            ));
        }
        Ok(())
    }
}

impl AsRef<Booking> for Booking {
    fn as_ref(&self) -> &Booking {
        self
    }
}

impl AsRef<Booking> for BookingDetails {
    fn as_ref(&self) -> &Booking {
        &self.booking
    }
}
