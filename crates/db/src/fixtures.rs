use chrono::{Duration, TimeZone, Utc};
use serde::Serialize;

use fleetgate_core::domain::booking::{BookingStatus, NewBooking};
use fleetgate_core::domain::user::{Role, User};
use fleetgate_core::domain::vehicle::{Ownership, Vehicle, VehicleType};

use crate::repositories::{
    BookingRepository, NewUser, NewVehicle, RepositoryError, UserRepository, VehicleRepository,
};

/// Demo accounts: (username, display name, role, password).
pub const DEMO_USERS: &[(&str, &str, Role, &str)] = &[
    ("admin", "Administrator", Role::Admin, "admin123"),
    ("approver1", "Approver Satu", Role::Approver, "approver123"),
    ("approver2", "Approver Dua", Role::Approver, "approver123"),
];

struct DemoVehicle {
    model_name: &'static str,
    plate_number: &'static str,
    vehicle_type: VehicleType,
    ownership: Ownership,
    location: &'static str,
    fuel_consumption: f64,
    current_fuel: f64,
}

const DEMO_VEHICLES: &[DemoVehicle] = &[
    DemoVehicle {
        model_name: "Toyota Hilux",
        plate_number: "KT 1001 AA",
        vehicle_type: VehicleType::Personnel,
        ownership: Ownership::Company,
        location: "Kantor Pusat",
        fuel_consumption: 11.5,
        current_fuel: 60.0,
    },
    DemoVehicle {
        model_name: "Mitsubishi Triton",
        plate_number: "KT 1002 AB",
        vehicle_type: VehicleType::Personnel,
        ownership: Ownership::Rental,
        location: "Tambang 1",
        fuel_consumption: 12.0,
        current_fuel: 55.0,
    },
    DemoVehicle {
        model_name: "Hino Dutro",
        plate_number: "KT 2001 BA",
        vehicle_type: VehicleType::Freight,
        ownership: Ownership::Company,
        location: "Tambang 2",
        fuel_consumption: 18.0,
        current_fuel: 90.0,
    },
    DemoVehicle {
        model_name: "Isuzu Elf",
        plate_number: "KT 2002 BB",
        vehicle_type: VehicleType::Freight,
        ownership: Ownership::Rental,
        location: "Kantor Cabang",
        fuel_consumption: 16.5,
        current_fuel: 70.0,
    },
];

/// Repositories the demo dataset is written through.
pub struct SeedTargets<'a> {
    pub users: &'a dyn UserRepository,
    pub vehicles: &'a dyn VehicleRepository,
    pub bookings: &'a dyn BookingRepository,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SeedResult {
    pub users_created: usize,
    pub vehicles_created: usize,
    pub bookings_created: usize,
}

/// Deterministic demo data: three accounts, four vehicles and, on an empty
/// store, one booking in each approval status.
///
/// Loading twice is harmless: existing usernames and plates are skipped and
/// sample bookings are only added when no booking exists yet.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    /// `hash` turns each demo password into the stored credential string.
    pub async fn load<H>(targets: SeedTargets<'_>, hash: H) -> Result<SeedResult, RepositoryError>
    where
        H: Fn(&str) -> Result<String, String>,
    {
        let mut result = SeedResult::default();

        let mut users = Vec::new();
        for (username, name, role, password) in DEMO_USERS {
            if let Some(existing) = targets.users.find_credentials(*username).await? {
                users.push(existing.user);
                continue;
            }
            let password_hash = hash(*password).map_err(RepositoryError::Decode)?;
            let created = targets
                .users
                .create(NewUser {
                    username: (*username).to_string(),
                    name: (*name).to_string(),
                    role: *role,
                    password_hash,
                })
                .await?;
            result.users_created += 1;
            users.push(created);
        }

        let existing_plates: Vec<String> = targets
            .vehicles
            .list()
            .await?
            .into_iter()
            .map(|vehicle| vehicle.plate_number)
            .collect();
        for demo in DEMO_VEHICLES {
            if existing_plates.iter().any(|plate| plate == demo.plate_number) {
                continue;
            }
            targets
                .vehicles
                .create(NewVehicle {
                    model_name: demo.model_name.to_string(),
                    plate_number: demo.plate_number.to_string(),
                    vehicle_type: demo.vehicle_type,
                    ownership: demo.ownership,
                    location: demo.location.to_string(),
                    fuel_consumption: demo.fuel_consumption,
                    last_service: None,
                    current_fuel: demo.current_fuel,
                })
                .await?;
            result.vehicles_created += 1;
        }

        if targets.bookings.list().await?.is_empty() {
            let vehicles = targets.vehicles.list().await?;
            result.bookings_created = seed_bookings(targets.bookings, &users, &vehicles).await?;
        }

        tracing::info!(
            event_name = "db.seed.loaded",
            users_created = result.users_created,
            vehicles_created = result.vehicles_created,
            bookings_created = result.bookings_created,
            "demo dataset loaded"
        );
        Ok(result)
    }
}

async fn seed_bookings(
    bookings: &dyn BookingRepository,
    users: &[User],
    vehicles: &[Vehicle],
) -> Result<usize, RepositoryError> {
    let (Some(admin), Some(first), Some(second)) = (users.first(), users.get(1), users.get(2))
    else {
        return Ok(0);
    };
    if vehicles.is_empty() {
        return Ok(0);
    }

    let base = Utc.with_ymd_and_hms(2026, 1, 5, 7, 0, 0).single().ok_or_else(|| {
        RepositoryError::Decode("demo booking base date is ambiguous".to_string())
    })?;

    // Target status and the approvers' moves needed to reach it.
    let plans: [(&str, &[(BookingStatus, BookingStatus, usize)]); 4] = [
        ("Budi Santoso", &[]),
        ("Siti Aminah", &[(BookingStatus::Pending, BookingStatus::ApprovedLevel1, 1)]),
        (
            "Agus Salim",
            &[
                (BookingStatus::Pending, BookingStatus::ApprovedLevel1, 1),
                (BookingStatus::ApprovedLevel1, BookingStatus::ApprovedFinal, 2),
            ],
        ),
        ("Dewi Lestari", &[(BookingStatus::Pending, BookingStatus::Rejected, 1)]),
    ];

    let mut created = 0;
    for (index, (driver, moves)) in plans.iter().enumerate() {
        let offset = i64::try_from(index).unwrap_or(0);
        let start = base + Duration::days(7 * offset);
        let vehicle = &vehicles[index % vehicles.len()];
        let booking = bookings
            .create(
                NewBooking {
                    vehicle_id: vehicle.id,
                    driver_name: (*driver).to_string(),
                    creator_id: admin.id,
                    approver1_id: first.id,
                    approver2_id: second.id,
                    start_date: start,
                    end_date: start + Duration::hours(10),
                },
                start - Duration::days(2),
            )
            .await?;

        for (from, to, approver) in moves.iter() {
            let actor = if *approver == 1 { first.id } else { second.id };
            bookings
                .update_status(booking.id, *from, *to, actor, start - Duration::days(1))
                .await?;
        }
        created += 1;
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use fleetgate_core::domain::booking::BookingStatus;
    use fleetgate_core::domain::user::Role;

    use super::{DemoSeedDataset, SeedTargets};
    use crate::repositories::{
        BookingRepository, InMemoryBookingRepository, InMemoryUserRepository,
        InMemoryVehicleRepository, UserRepository,
    };

    fn fake_hash(password: &str) -> Result<String, String> {
        Ok(format!("plain${password}"))
    }

    #[tokio::test]
    async fn seed_is_idempotent_and_covers_every_status() {
        let users = InMemoryUserRepository::default();
        let vehicles = InMemoryVehicleRepository::default();
        let bookings = InMemoryBookingRepository::default();

        let first = DemoSeedDataset::load(
            SeedTargets { users: &users, vehicles: &vehicles, bookings: &bookings },
            fake_hash,
        )
        .await
        .expect("first load");
        assert_eq!(first.users_created, 3);
        assert_eq!(first.vehicles_created, 4);
        assert_eq!(first.bookings_created, 4);

        let second = DemoSeedDataset::load(
            SeedTargets { users: &users, vehicles: &vehicles, bookings: &bookings },
            fake_hash,
        )
        .await
        .expect("second load");
        assert_eq!(second, Default::default());

        let statuses: Vec<BookingStatus> =
            bookings.list().await.expect("list").iter().map(|b| b.status).collect();
        assert_eq!(
            statuses,
            vec![
                BookingStatus::Pending,
                BookingStatus::ApprovedLevel1,
                BookingStatus::ApprovedFinal,
                BookingStatus::Rejected,
            ]
        );

        let admin = users.find_credentials("admin").await.expect("lookup").expect("admin");
        assert_eq!(admin.user.role, Role::Admin);
        assert_eq!(admin.password_hash, "plain$admin123");
    }
}
