use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use fleetgate_core::domain::vehicle::{Ownership, Vehicle, VehicleId, VehicleType};

use super::{
    decode_err, decode_timestamp, map_unique_violation, NewVehicle, RepositoryError,
    VehicleRepository,
};
use crate::DbPool;

const VEHICLE_COLUMNS: &str = "id, model_name, plate_number, vehicle_type, ownership, location,
     fuel_consumption, last_service, current_fuel";

pub struct SqlVehicleRepository {
    pool: DbPool,
}

impl SqlVehicleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_vehicle(row: &SqliteRow) -> Result<Vehicle, RepositoryError> {
    let vehicle_type: String = row.try_get("vehicle_type").map_err(decode_err)?;
    let ownership: String = row.try_get("ownership").map_err(decode_err)?;
    let last_service: Option<String> = row.try_get("last_service").map_err(decode_err)?;

    Ok(Vehicle {
        id: VehicleId(row.try_get("id").map_err(decode_err)?),
        model_name: row.try_get("model_name").map_err(decode_err)?,
        plate_number: row.try_get("plate_number").map_err(decode_err)?,
        vehicle_type: VehicleType::parse(&vehicle_type).ok_or_else(|| {
            RepositoryError::Decode(format!("unknown vehicle type `{vehicle_type}`"))
        })?,
        ownership: Ownership::parse(&ownership)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown ownership `{ownership}`")))?,
        location: row.try_get("location").map_err(decode_err)?,
        fuel_consumption: row.try_get("fuel_consumption").map_err(decode_err)?,
        last_service: last_service
            .as_deref()
            .map(|raw| decode_timestamp("last_service", raw))
            .transpose()?,
        current_fuel: row.try_get("current_fuel").map_err(decode_err)?,
    })
}

#[async_trait::async_trait]
impl VehicleRepository for SqlVehicleRepository {
    async fn find_by_id(&self, id: VehicleId) -> Result<Option<Vehicle>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_vehicle).transpose()
    }

    async fn list(&self) -> Result<Vec<Vehicle>, RepositoryError> {
        let rows = sqlx::query(&format!("SELECT {VEHICLE_COLUMNS} FROM vehicles ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_vehicle).collect()
    }

    async fn create(&self, vehicle: NewVehicle) -> Result<Vehicle, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO vehicles (model_name, plate_number, vehicle_type, ownership, location,
                                   fuel_consumption, last_service, current_fuel)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&vehicle.model_name)
        .bind(&vehicle.plate_number)
        .bind(vehicle.vehicle_type.as_str())
        .bind(vehicle.ownership.as_str())
        .bind(&vehicle.location)
        .bind(vehicle.fuel_consumption)
        .bind(vehicle.last_service.map(|at| at.to_rfc3339()))
        .bind(vehicle.current_fuel)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_unique_violation(error, &format!("plate `{}`", vehicle.plate_number))
        })?;

        Ok(Vehicle {
            id: VehicleId(result.last_insert_rowid()),
            model_name: vehicle.model_name,
            plate_number: vehicle.plate_number,
            vehicle_type: vehicle.vehicle_type,
            ownership: vehicle.ownership,
            location: vehicle.location,
            fuel_consumption: vehicle.fuel_consumption,
            last_service: vehicle.last_service,
            current_fuel: vehicle.current_fuel,
        })
    }
}
