use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use fleetgate_core::domain::booking::{
    Booking, BookingId, BookingStatus, BookingTransition, NewBooking,
};
use fleetgate_core::domain::user::{Role, User, UserId};
use fleetgate_core::domain::vehicle::{Vehicle, VehicleId};

use super::{
    BookingRepository, NewUser, NewVehicle, RepositoryError, StatusChange, UserCredentials,
    UserRepository, VehicleRepository,
};

#[derive(Default)]
struct BookingState {
    last_id: i64,
    bookings: BTreeMap<i64, Booking>,
    transitions: Vec<BookingTransition>,
}

/// Bookings and their history behind one lock, so a status change and its
/// history row land together.
#[derive(Default)]
pub struct InMemoryBookingRepository {
    state: RwLock<BookingState>,
}

#[async_trait::async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn create(
        &self,
        booking: NewBooking,
        created_at: DateTime<Utc>,
    ) -> Result<Booking, RepositoryError> {
        let mut state = self.state.write().await;
        state.last_id += 1;
        let stored = Booking {
            id: BookingId(state.last_id),
            vehicle_id: booking.vehicle_id,
            driver_name: booking.driver_name,
            creator_id: booking.creator_id,
            approver1_id: booking.approver1_id,
            approver2_id: booking.approver2_id,
            status: BookingStatus::Pending,
            start_date: booking.start_date,
            end_date: booking.end_date,
            created_at,
            fuel_start: None,
            fuel_end: None,
            distance_km: None,
            fuel_used: None,
        };
        state.bookings.insert(stored.id.0, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.bookings.get(&id.0).cloned())
    }

    async fn list(&self) -> Result<Vec<Booking>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.bookings.values().cloned().collect())
    }

    async fn list_by_status(
        &self,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .bookings
            .values()
            .filter(|booking| statuses.contains(&booking.status))
            .cloned()
            .collect())
    }

    async fn list_by_creator(&self, creator_id: UserId) -> Result<Vec<Booking>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .bookings
            .values()
            .filter(|booking| booking.creator_id == creator_id)
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        id: BookingId,
        expected: BookingStatus,
        next: BookingStatus,
        actor_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<StatusChange, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(booking) = state.bookings.get_mut(&id.0) else {
            return Ok(StatusChange::NotFound);
        };
        if booking.status != expected {
            return Ok(StatusChange::Stale(booking.status));
        }

        booking.status = next;
        let updated = booking.clone();
        state.transitions.push(BookingTransition {
            booking_id: id,
            from: expected,
            to: next,
            actor_id,
            occurred_at: at,
        });
        Ok(StatusChange::Applied(updated))
    }

    async fn list_transitions(
        &self,
        id: BookingId,
    ) -> Result<Vec<BookingTransition>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.transitions.iter().filter(|t| t.booking_id == id).cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<BTreeMap<i64, UserCredentials>>,
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.get(&id.0).map(|stored| stored.user.clone()))
    }

    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<UserCredentials>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.values().find(|stored| stored.user.username == username).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.values().map(|stored| stored.user.clone()).collect())
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .filter(|stored| stored.user.role == role)
            .map(|stored| stored.user.clone())
            .collect())
    }

    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        if users.values().any(|stored| stored.user.username == user.username) {
            return Err(RepositoryError::Duplicate(format!("username `{}`", user.username)));
        }

        let id = users.keys().next_back().copied().unwrap_or(0) + 1;
        let created =
            User { id: UserId(id), username: user.username, name: user.name, role: user.role };
        users.insert(
            id,
            UserCredentials { user: created.clone(), password_hash: user.password_hash },
        );
        Ok(created)
    }
}

#[derive(Default)]
pub struct InMemoryVehicleRepository {
    vehicles: RwLock<BTreeMap<i64, Vehicle>>,
}

#[async_trait::async_trait]
impl VehicleRepository for InMemoryVehicleRepository {
    async fn find_by_id(&self, id: VehicleId) -> Result<Option<Vehicle>, RepositoryError> {
        let vehicles = self.vehicles.read().await;
        Ok(vehicles.get(&id.0).cloned())
    }

    async fn list(&self) -> Result<Vec<Vehicle>, RepositoryError> {
        let vehicles = self.vehicles.read().await;
        Ok(vehicles.values().cloned().collect())
    }

    async fn create(&self, vehicle: NewVehicle) -> Result<Vehicle, RepositoryError> {
        let mut vehicles = self.vehicles.write().await;
        if vehicles.values().any(|stored| stored.plate_number == vehicle.plate_number) {
            return Err(RepositoryError::Duplicate(format!("plate `{}`", vehicle.plate_number)));
        }

        let id = vehicles.keys().next_back().copied().unwrap_or(0) + 1;
        let created = Vehicle {
            id: VehicleId(id),
            model_name: vehicle.model_name,
            plate_number: vehicle.plate_number,
            vehicle_type: vehicle.vehicle_type,
            ownership: vehicle.ownership,
            location: vehicle.location,
            fuel_consumption: vehicle.fuel_consumption,
            last_service: vehicle.last_service,
            current_fuel: vehicle.current_fuel,
        };
        vehicles.insert(id, created.clone());
        Ok(created)
    }
}
