use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::user::{User, UserId};
use crate::domain::vehicle::{Vehicle, VehicleId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(pub i64);

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Approval status, carried on the wire and in storage as its integer code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum BookingStatus {
    Pending,
    ApprovedLevel1,
    ApprovedFinal,
    Rejected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("unknown booking status code {0} (expected 0|1|2|-1)")]
pub struct UnknownStatusCode(pub i64);

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] =
        [Self::Pending, Self::ApprovedLevel1, Self::ApprovedFinal, Self::Rejected];

    pub const fn code(self) -> i8 {
        match self {
            Self::Pending => 0,
            Self::ApprovedLevel1 => 1,
            Self::ApprovedFinal => 2,
            Self::Rejected => -1,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, UnknownStatusCode> {
        match code {
            0 => Ok(Self::Pending),
            1 => Ok(Self::ApprovedLevel1),
            2 => Ok(Self::ApprovedFinal),
            -1 => Ok(Self::Rejected),
            other => Err(UnknownStatusCode(other)),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::ApprovedFinal | Self::Rejected)
    }

    /// Still waiting on one of the two approvers.
    pub fn is_awaiting_approval(self) -> bool {
        matches!(self, Self::Pending | Self::ApprovedLevel1)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Menunggu Approver 1",
            Self::ApprovedLevel1 => "Menunggu Approver 2",
            Self::ApprovedFinal => "Disetujui",
            Self::Rejected => "Ditolak",
        }
    }
}

impl From<BookingStatus> for i8 {
    fn from(status: BookingStatus) -> Self {
        status.code()
    }
}

impl TryFrom<i8> for BookingStatus {
    type Error = UnknownStatusCode;

    fn try_from(code: i8) -> Result<Self, Self::Error> {
        Self::from_code(i64::from(code))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub vehicle_id: VehicleId,
    pub driver_name: String,
    pub creator_id: UserId,
    pub approver1_id: UserId,
    pub approver2_id: UserId,
    pub status: BookingStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub fuel_start: Option<f64>,
    pub fuel_end: Option<f64>,
    pub distance_km: Option<f64>,
    pub fuel_used: Option<f64>,
}

impl Booking {
    /// The approver gating the booking's current stage, if it has one.
    pub fn stage_approver(&self) -> Option<UserId> {
        match self.status {
            BookingStatus::Pending => Some(self.approver1_id),
            BookingStatus::ApprovedLevel1 => Some(self.approver2_id),
            BookingStatus::ApprovedFinal | BookingStatus::Rejected => None,
        }
    }

    /// Whether the booking window contains `at`.
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.status == BookingStatus::ApprovedFinal && self.start_date <= at && at <= self.end_date
    }
}

/// A booking request that has not been persisted yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub vehicle_id: VehicleId,
    pub driver_name: String,
    pub creator_id: UserId,
    pub approver1_id: UserId,
    pub approver2_id: UserId,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// A booking with its referenced records resolved, as the list endpoints return it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub vehicle: Option<Vehicle>,
    pub creator: Option<User>,
    pub approver1: Option<User>,
    pub approver2: Option<User>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingTransition {
    pub booking_id: BookingId,
    pub from: BookingStatus,
    pub to: BookingStatus,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{Booking, BookingId, BookingStatus};
    use crate::domain::user::UserId;
    use crate::domain::vehicle::VehicleId;

    fn booking(status: BookingStatus) -> Booking {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 7, 0, 0).single().expect("valid date");
        Booking {
            id: BookingId(1),
            vehicle_id: VehicleId(1),
            driver_name: "Budi".to_string(),
            creator_id: UserId(1),
            approver1_id: UserId(2),
            approver2_id: UserId(3),
            status,
            start_date: start,
            end_date: start + Duration::hours(8),
            created_at: start - Duration::days(1),
            fuel_start: None,
            fuel_end: None,
            distance_km: None,
            fuel_used: None,
        }
    }

    #[test]
    fn status_codes_match_wire_contract() {
        let codes: Vec<i8> = BookingStatus::ALL.iter().map(|status| status.code()).collect();
        assert_eq!(codes, vec![0, 1, 2, -1]);

        for status in BookingStatus::ALL {
            assert_eq!(BookingStatus::from_code(i64::from(status.code())), Ok(status));
        }
        assert!(BookingStatus::from_code(3).is_err());
    }

    #[test]
    fn status_serializes_as_integer() {
        let json = serde_json::to_string(&BookingStatus::Rejected).expect("serialize");
        assert_eq!(json, "-1");

        let parsed: BookingStatus = serde_json::from_str("1").expect("deserialize");
        assert_eq!(parsed, BookingStatus::ApprovedLevel1);

        let invalid = serde_json::from_str::<BookingStatus>("7");
        assert!(invalid.is_err());
    }

    #[test]
    fn stage_approver_follows_status() {
        assert_eq!(booking(BookingStatus::Pending).stage_approver(), Some(UserId(2)));
        assert_eq!(booking(BookingStatus::ApprovedLevel1).stage_approver(), Some(UserId(3)));
        assert_eq!(booking(BookingStatus::ApprovedFinal).stage_approver(), None);
        assert_eq!(booking(BookingStatus::Rejected).stage_approver(), None);
    }

    #[test]
    fn only_final_approval_within_window_is_active() {
        let approved = booking(BookingStatus::ApprovedFinal);
        let during = approved.start_date + Duration::hours(1);
        let after = approved.end_date + Duration::hours(1);

        assert!(approved.is_active_at(during));
        assert!(!approved.is_active_at(after));
        assert!(!booking(BookingStatus::ApprovedLevel1).is_active_at(during));
    }

    #[test]
    fn booking_json_uses_camel_case_and_status_code() {
        let json = serde_json::to_value(booking(BookingStatus::ApprovedLevel1)).expect("serialize");
        assert_eq!(json["status"], 1);
        assert_eq!(json["approver1Id"], 2);
        assert_eq!(json["driverName"], "Budi");
        assert!(json["fuelUsed"].is_null());
    }
}
