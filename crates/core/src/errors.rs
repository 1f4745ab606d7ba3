use thiserror::Error;

use crate::approvals::ApprovalStage;
use crate::domain::booking::{BookingId, BookingStatus};
use crate::domain::user::{Role, UserId};

/// Coarse error classes callers branch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Authorization,
    InvalidState,
    Validation,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("user {actor_id} is not the {stage} approver of booking {booking_id}")]
    NotStageApprover { booking_id: BookingId, actor_id: UserId, stage: ApprovalStage },
    #[error("role {required} is required for this operation")]
    RoleRequired { required: Role },
    #[error("booking {booking_id} is already {status:?} and cannot change")]
    TerminalState { booking_id: BookingId, status: BookingStatus },
    #[error("booking {booking_id} moved from {expected:?} to {actual:?} before this change applied")]
    StaleStatus { booking_id: BookingId, expected: BookingStatus, actual: BookingStatus },
    #[error("invalid booking request: {0}")]
    Validation(String),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotStageApprover { .. } | Self::RoleRequired { .. } => ErrorKind::Authorization,
            Self::TerminalState { .. } | Self::StaleStatus { .. } => ErrorKind::InvalidState,
            Self::Validation(_) => ErrorKind::Validation,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("unauthorized: {message}")]
    Unauthorized { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest { .. } => 400,
            Self::Unauthorized { .. } => 401,
            Self::Forbidden { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::ServiceUnavailable { .. } => 503,
            Self::Internal { .. } => 500,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Unauthorized { .. } => "Sign in again to continue.",
            Self::Forbidden { .. } => "You are not allowed to perform this action.",
            Self::NotFound { .. } => "The requested record does not exist.",
            Self::Conflict { .. } => "The booking changed in the meantime. Refresh and try again.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    /// Detail safe to show to the caller. Internal failures only expose the generic message.
    pub fn public_message(&self) -> String {
        match self {
            Self::BadRequest { message, .. }
            | Self::Unauthorized { message, .. }
            | Self::Forbidden { message, .. }
            | Self::NotFound { message, .. }
            | Self::Conflict { message, .. } => message.clone(),
            Self::ServiceUnavailable { .. } | Self::Internal { .. } => {
                self.user_message().to_string()
            }
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Unauthorized { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Unauthorized { correlation_id: id, .. }
            | InterfaceError::Forbidden { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(error) => {
                let message = error.to_string();
                match error.kind() {
                    ErrorKind::Authorization => Self::Forbidden { message, correlation_id },
                    ErrorKind::InvalidState => Self::Conflict { message, correlation_id },
                    ErrorKind::Validation => Self::BadRequest { message, correlation_id },
                }
            }
            ApplicationError::NotFound(message) => Self::NotFound { message, correlation_id },
            ApplicationError::Authentication(message) => {
                Self::Unauthorized { message, correlation_id }
            }
            ApplicationError::Persistence(message) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            ApplicationError::Configuration(message) | ApplicationError::Internal(message) => {
                Self::Internal { message, correlation_id }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::approvals::ApprovalStage;
    use crate::domain::booking::{BookingId, BookingStatus};
    use crate::domain::user::UserId;
    use crate::errors::{ApplicationError, DomainError, ErrorKind, InterfaceError};

    #[test]
    fn not_stage_approver_maps_to_forbidden() {
        let interface = ApplicationError::from(DomainError::NotStageApprover {
            booking_id: BookingId(4),
            actor_id: UserId(9),
            stage: ApprovalStage::Level1,
        })
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::Forbidden { ref correlation_id, .. } if correlation_id == "req-1"
        ));
        assert_eq!(interface.status_code(), 403);
        assert!(interface.public_message().contains("booking 4"));
    }

    #[test]
    fn terminal_and_stale_states_map_to_conflict() {
        let terminal = DomainError::TerminalState {
            booking_id: BookingId(1),
            status: BookingStatus::Rejected,
        };
        let stale = DomainError::StaleStatus {
            booking_id: BookingId(1),
            expected: BookingStatus::Pending,
            actual: BookingStatus::ApprovedLevel1,
        };
        assert_eq!(terminal.kind(), ErrorKind::InvalidState);
        assert_eq!(stale.kind(), ErrorKind::InvalidState);

        let interface = ApplicationError::from(terminal).into_interface("req-2");
        assert_eq!(interface.status_code(), 409);
    }

    #[test]
    fn validation_error_maps_to_bad_request_with_user_safe_message() {
        let interface =
            ApplicationError::from(DomainError::Validation("startDate must precede endDate".into()))
                .into_interface("req-3");

        assert!(matches!(interface, InterfaceError::BadRequest { .. }));
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn persistence_error_maps_to_service_unavailable_and_hides_detail() {
        let interface = ApplicationError::Persistence("database lock timeout".to_owned())
            .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(interface.status_code(), 503);
        assert!(!interface.public_message().contains("lock timeout"));
        assert_eq!(interface.correlation_id(), "req-4");
    }

    #[test]
    fn internal_error_maps_to_500_and_hides_detail() {
        let interface = ApplicationError::Internal("csv writer flush failed".to_owned())
            .into_interface("req-6");

        assert_eq!(interface.status_code(), 500);
        assert!(!interface.public_message().contains("csv"));
    }

    #[test]
    fn authentication_error_maps_to_unauthorized() {
        let interface = ApplicationError::Authentication("token expired".to_owned())
            .into_interface("req-5");

        assert_eq!(interface.status_code(), 401);
    }
}
