//! Booking list filtering, dashboard aggregates and the CSV report.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::booking::{BookingDetails, BookingStatus};
use crate::domain::vehicle::Vehicle;

const EXPORT_DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    /// Waiting on the level 1 approver (status 0 only).
    Pending,
    Approved,
    Rejected,
    Exact(BookingStatus),
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown status filter `{0}` (expected all|pending|approved|rejected|0|1|2|-1)")]
pub struct UnknownStatusFilter(pub String);

impl FromStr for StatusFilter {
    type Err = UnknownStatusFilter;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "" | "all" => Ok(Self::All),
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => other
                .parse::<i64>()
                .ok()
                .and_then(|code| BookingStatus::from_code(code).ok())
                .map(Self::Exact)
                .ok_or_else(|| UnknownStatusFilter(value.to_string())),
        }
    }
}

impl StatusFilter {
    pub fn matches(self, status: BookingStatus) -> bool {
        match self {
            Self::All => true,
            Self::Pending => status == BookingStatus::Pending,
            Self::Approved => status == BookingStatus::ApprovedFinal,
            Self::Rejected => status == BookingStatus::Rejected,
            Self::Exact(expected) => status == expected,
        }
    }
}

/// Filters applied to the booking list. The date window bounds the booking start.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub status: StatusFilter,
    pub search: Option<String>,
    pub start_from: Option<DateTime<Utc>>,
    pub start_until: Option<DateTime<Utc>>,
}

impl BookingFilter {
    pub fn matches(&self, details: &BookingDetails) -> bool {
        let booking = &details.booking;
        if !self.status.matches(booking.status) {
            return false;
        }
        if self.start_from.is_some_and(|from| booking.start_date < from) {
            return false;
        }
        if self.start_until.is_some_and(|until| booking.start_date > until) {
            return false;
        }

        match self.search.as_deref().map(str::trim).filter(|term| !term.is_empty()) {
            None => true,
            Some(term) => {
                let term = term.to_lowercase();
                let contains = |value: &str| value.to_lowercase().contains(&term);
                contains(&booking.driver_name)
                    || details.vehicle.as_ref().is_some_and(|vehicle| {
                        contains(&vehicle.model_name) || contains(&vehicle.plate_number)
                    })
            }
        }
    }

    pub fn apply(&self, bookings: Vec<BookingDetails>) -> Vec<BookingDetails> {
        bookings.into_iter().filter(|details| self.matches(details)).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_vehicles: usize,
    pub active_bookings: usize,
    pub pending_approvals: usize,
    pub total_fuel_used: f64,
    pub vehicles_by_location: BTreeMap<String, usize>,
    /// Keyed `YYYY-MM` on the booking start.
    pub bookings_by_month: BTreeMap<String, usize>,
    pub bookings_by_vehicle_type: BTreeMap<String, usize>,
}

impl DashboardStats {
    pub fn compute(vehicles: &[Vehicle], bookings: &[BookingDetails], now: DateTime<Utc>) -> Self {
        let mut vehicles_by_location = BTreeMap::new();
        for vehicle in vehicles {
            *vehicles_by_location.entry(vehicle.location.clone()).or_insert(0) += 1;
        }

        let mut bookings_by_month = BTreeMap::new();
        let mut bookings_by_vehicle_type = BTreeMap::new();
        let mut active_bookings = 0;
        let mut pending_approvals = 0;
        let mut total_fuel_used = 0.0;

        for details in bookings {
            let booking = &details.booking;
            if booking.is_active_at(now) {
                active_bookings += 1;
            }
            if booking.status.is_awaiting_approval() {
                pending_approvals += 1;
            }
            total_fuel_used += booking.fuel_used.unwrap_or(0.0);

            let month = booking.start_date.format("%Y-%m").to_string();
            *bookings_by_month.entry(month).or_insert(0) += 1;

            if let Some(vehicle) = &details.vehicle {
                let kind = vehicle.vehicle_type.as_str().to_string();
                *bookings_by_vehicle_type.entry(kind).or_insert(0) += 1;
            }
        }

        Self {
            total_vehicles: vehicles.len(),
            active_bookings,
            pending_approvals,
            total_fuel_used,
            vehicles_by_location,
            bookings_by_month,
            bookings_by_vehicle_type,
        }
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("csv encoding failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv buffer could not be flushed: {0}")]
    Flush(String),
    #[error("csv output is not valid utf-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

const EXPORT_HEADER: [&str; 13] = [
    "ID",
    "Vehicle",
    "Plate Number",
    "Vehicle Type",
    "Driver",
    "Start",
    "End",
    "Status",
    "Approver 1",
    "Approver 2",
    "Created By",
    "Fuel Used (L)",
    "Created At",
];

/// Renders bookings as CSV, one row per booking in the given order.
pub fn export_csv(bookings: &[BookingDetails]) -> Result<String, ReportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADER)?;

    for details in bookings {
        let booking = &details.booking;
        let vehicle = details.vehicle.as_ref();
        let name_of = |user: Option<&crate::domain::user::User>| {
            user.map(|user| user.name.clone()).unwrap_or_else(|| "-".to_string())
        };

        writer.write_record([
            booking.id.to_string(),
            vehicle.map(|v| v.model_name.clone()).unwrap_or_else(|| "-".to_string()),
            vehicle.map(|v| v.plate_number.clone()).unwrap_or_else(|| "-".to_string()),
            vehicle.map(|v| v.vehicle_type.as_str().to_string()).unwrap_or_else(|| "-".to_string()),
            booking.driver_name.clone(),
            booking.start_date.format(EXPORT_DATE_FORMAT).to_string(),
            booking.end_date.format(EXPORT_DATE_FORMAT).to_string(),
            booking.status.label().to_string(),
            name_of(details.approver1.as_ref()),
            name_of(details.approver2.as_ref()),
            name_of(details.creator.as_ref()),
            booking.fuel_used.map(|fuel| fuel.to_string()).unwrap_or_else(|| "-".to_string()),
            booking.created_at.format(EXPORT_DATE_FORMAT).to_string(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|error| ReportError::Flush(error.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{export_csv, BookingFilter, DashboardStats, StatusFilter};
    use crate::domain::booking::{Booking, BookingDetails, BookingId, BookingStatus};
    use crate::domain::user::{Role, User, UserId};
    use crate::domain::vehicle::{Ownership, Vehicle, VehicleId, VehicleType};

    fn vehicle(id: i64, model: &str, plate: &str, kind: VehicleType, location: &str) -> Vehicle {
        Vehicle {
            id: VehicleId(id),
            model_name: model.to_string(),
            plate_number: plate.to_string(),
            vehicle_type: kind,
            ownership: Ownership::Company,
            location: location.to_string(),
            fuel_consumption: 10.0,
            last_service: None,
            current_fuel: 50.0,
        }
    }

    fn details(
        id: i64,
        status: BookingStatus,
        month: u32,
        driver: &str,
        car: Vehicle,
    ) -> BookingDetails {
        let start = Utc.with_ymd_and_hms(2026, month, 10, 8, 0, 0).single().expect("valid date");
        BookingDetails {
            booking: Booking {
                id: BookingId(id),
                vehicle_id: car.id,
                driver_name: driver.to_string(),
                creator_id: UserId(1),
                approver1_id: UserId(2),
                approver2_id: UserId(3),
                status,
                start_date: start,
                end_date: start + Duration::days(2),
                created_at: start - Duration::days(1),
                fuel_start: None,
                fuel_end: None,
                distance_km: None,
                fuel_used: (status == BookingStatus::ApprovedFinal).then_some(12.5),
            },
            vehicle: Some(car),
            creator: Some(User {
                id: UserId(1),
                username: "admin".to_string(),
                name: "Admin, Pool".to_string(),
                role: Role::Admin,
            }),
            approver1: None,
            approver2: None,
        }
    }

    fn sample() -> (Vec<Vehicle>, Vec<BookingDetails>) {
        let hilux = vehicle(1, "Toyota Hilux", "KT 1001 AA", VehicleType::Personnel, "Site A");
        let dyna = vehicle(2, "Hino Dyna", "KT 2002 BB", VehicleType::Freight, "Site B");
        let avanza = vehicle(3, "Toyota Avanza", "KT 3003 CC", VehicleType::Personnel, "Site A");
        let bookings = vec![
            details(1, BookingStatus::Pending, 1, "Budi", hilux.clone()),
            details(2, BookingStatus::ApprovedLevel1, 1, "Siti", dyna.clone()),
            details(3, BookingStatus::ApprovedFinal, 2, "Agus", hilux.clone()),
            details(4, BookingStatus::Rejected, 3, "Dewi", dyna.clone()),
        ];
        (vec![hilux, dyna, avanza], bookings)
    }

    fn ids(bookings: &[BookingDetails]) -> Vec<i64> {
        bookings.iter().map(|details| details.booking.id.0).collect()
    }

    #[test]
    fn status_filter_parses_names_and_codes() {
        assert_eq!("all".parse::<StatusFilter>(), Ok(StatusFilter::All));
        assert_eq!("Pending".parse::<StatusFilter>(), Ok(StatusFilter::Pending));
        assert_eq!("-1".parse::<StatusFilter>(), Ok(StatusFilter::Exact(BookingStatus::Rejected)));
        assert!("5".parse::<StatusFilter>().is_err());
        assert!("archived".parse::<StatusFilter>().is_err());
    }

    #[test]
    fn pending_filter_means_waiting_on_the_first_approver() {
        let (_, bookings) = sample();
        let filter = BookingFilter { status: StatusFilter::Pending, ..BookingFilter::default() };
        assert_eq!(ids(&filter.apply(bookings.clone())), vec![1]);

        let level1 = BookingFilter {
            status: StatusFilter::Exact(BookingStatus::ApprovedLevel1),
            ..BookingFilter::default()
        };
        assert_eq!(ids(&level1.apply(bookings)), vec![2]);
    }

    #[test]
    fn search_matches_driver_model_and_plate_case_insensitively() {
        let (_, bookings) = sample();

        let by_driver = BookingFilter { search: Some("siti".into()), ..BookingFilter::default() };
        assert_eq!(ids(&by_driver.apply(bookings.clone())), vec![2]);

        let by_model = BookingFilter { search: Some("HILUX".into()), ..BookingFilter::default() };
        assert_eq!(ids(&by_model.apply(bookings.clone())), vec![1, 3]);

        let by_plate = BookingFilter { search: Some("2002".into()), ..BookingFilter::default() };
        assert_eq!(ids(&by_plate.apply(bookings)), vec![2, 4]);
    }

    #[test]
    fn date_window_bounds_booking_start() {
        let (_, bookings) = sample();
        let filter = BookingFilter {
            start_from: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).single(),
            start_until: Utc.with_ymd_and_hms(2026, 2, 28, 0, 0, 0).single(),
            ..BookingFilter::default()
        };
        assert_eq!(ids(&filter.apply(bookings)), vec![3]);
    }

    #[test]
    fn dashboard_aggregates_counts_and_fuel() {
        let (vehicles, bookings) = sample();
        let now = Utc.with_ymd_and_hms(2026, 2, 11, 0, 0, 0).single().expect("valid date");

        let stats = DashboardStats::compute(&vehicles, &bookings, now);
        assert_eq!(stats.total_vehicles, 3);
        assert_eq!(stats.active_bookings, 1);
        assert_eq!(stats.pending_approvals, 2);
        assert!((stats.total_fuel_used - 12.5).abs() < f64::EPSILON);
        assert_eq!(stats.vehicles_by_location.get("Site A"), Some(&2));
        assert_eq!(stats.bookings_by_month.get("2026-01"), Some(&2));
        assert_eq!(stats.bookings_by_vehicle_type.get("Freight"), Some(&2));

        let json = serde_json::to_value(&stats).expect("serialize stats");
        assert_eq!(json["pendingApprovals"], 2);
        assert!(json["bookingsByVehicleType"].is_object());
    }

    #[test]
    fn csv_export_uses_status_labels_and_quotes_commas() {
        let (_, bookings) = sample();
        let csv = export_csv(&bookings).expect("export csv");
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("ID,Vehicle,Plate Number"));
        assert!(lines[1].contains("Menunggu Approver 1"));
        assert!(lines[3].contains("Disetujui"));
        assert!(lines[4].contains("Ditolak"));
        assert!(lines[1].contains("\"Admin, Pool\""));
        assert!(lines[1].contains("10/01/2026 08:00"));
    }
}
