pub mod approvals;
pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod reports;
pub mod security;

pub use approvals::{
    next_status, ApprovalAction, ApprovalStage, ApprovalWorkflow, TransitionPlan, WorkflowPolicy,
};
pub use domain::booking::{
    Booking, BookingDetails, BookingId, BookingStatus, BookingTransition, NewBooking,
};
pub use domain::user::{Actor, Role, User, UserId};
pub use domain::vehicle::{Ownership, Vehicle, VehicleId, VehicleType};
pub use errors::{ApplicationError, DomainError, ErrorKind, InterfaceError};
pub use reports::{BookingFilter, DashboardStats, StatusFilter};
