use fleetgate_core::domain::booking::BookingDetails;
use serde::Serialize;

use crate::commands::remote::{call, ApiTarget};
use crate::commands::CommandResult;

/// One line of the queue as the CLI prints it.
#[derive(Debug, Serialize)]
pub struct PendingRow {
    pub id: i64,
    pub status: i8,
    pub status_label: &'static str,
    pub driver: String,
    pub vehicle: Option<String>,
    pub start_date: String,
    pub end_date: String,
}

impl From<&BookingDetails> for PendingRow {
    fn from(details: &BookingDetails) -> Self {
        let booking = &details.booking;
        Self {
            id: booking.id.0,
            status: booking.status.code(),
            status_label: booking.status.label(),
            driver: booking.driver_name.clone(),
            vehicle: details
                .vehicle
                .as_ref()
                .map(|vehicle| format!("{} ({})", vehicle.model_name, vehicle.plate_number)),
            start_date: booking.start_date.to_rfc3339(),
            end_date: booking.end_date.to_rfc3339(),
        }
    }
}

pub(crate) fn rows(bookings: &[BookingDetails]) -> Vec<PendingRow> {
    bookings.iter().map(PendingRow::from).collect()
}

/// Lists the caller's queue, or every pending booking with `all`.
pub fn run(target: &ApiTarget, all: bool) -> CommandResult {
    let command = "pending";
    let fetched = call(command, target, |client| async move {
        if all {
            client.all_pending().await
        } else {
            client.pending().await
        }
    });

    match fetched {
        Ok(bookings) => CommandResult::success_with_data(
            command,
            format!("{} booking(s) awaiting approval", bookings.len()),
            serde_json::to_value(rows(&bookings)).ok(),
        ),
        Err(failure) => failure,
    }
}
