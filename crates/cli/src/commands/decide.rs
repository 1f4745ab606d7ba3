use fleetgate_core::approvals::ApprovalAction;
use fleetgate_core::domain::booking::BookingId;
use serde_json::{json, Value};

use crate::commands::pending::{rows, PendingRow};
use crate::commands::remote::{call, ApiTarget};
use crate::commands::CommandResult;

/// Approves or rejects one booking, then shows the refreshed queue.
pub fn run(target: &ApiTarget, id: i64, action: ApprovalAction) -> CommandResult {
    let command = action.as_str();
    let booking_id = BookingId(id);
    let decided = call(command, target, |client| async move {
        match action {
            ApprovalAction::Approve => client.approve(booking_id).await,
            ApprovalAction::Reject => client.reject(booking_id).await,
        }
    });

    match decided {
        Ok(decision) => {
            let status = decision.booking.booking.status;
            let mut message = format!("booking {id} is now {} ({})", status.code(), status.label());
            let pending = match &decision.pending {
                Ok(pending) => json!(rows(pending)),
                Err(error) => {
                    message.push_str(&format!("; pending list not refreshed: {error}"));
                    Value::Null
                }
            };
            CommandResult::success_with_data(
                command,
                message,
                Some(json!({
                    "booking": PendingRow::from(&decision.booking),
                    "pending": pending,
                })),
            )
        }
        Err(failure) => failure,
    }
}
