use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use fleetgate_core::domain::booking::{
    Booking, BookingId, BookingStatus, BookingTransition, NewBooking,
};
use fleetgate_core::domain::user::UserId;
use fleetgate_core::domain::vehicle::VehicleId;

use super::{decode_err, decode_timestamp, BookingRepository, RepositoryError, StatusChange};
use crate::DbPool;

const BOOKING_COLUMNS: &str = "id, vehicle_id, driver_name, creator_id, approver1_id, approver2_id,
     status, start_date, end_date, created_at, fuel_start, fuel_end, distance_km, fuel_used";

pub struct SqlBookingRepository {
    pool: DbPool,
}

impl SqlBookingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_status(code: i64) -> Result<BookingStatus, RepositoryError> {
    BookingStatus::from_code(code).map_err(|error| RepositoryError::Decode(error.to_string()))
}

fn row_to_booking(row: &SqliteRow) -> Result<Booking, RepositoryError> {
    let start_date: String = row.try_get("start_date").map_err(decode_err)?;
    let end_date: String = row.try_get("end_date").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;

    Ok(Booking {
        id: BookingId(row.try_get("id").map_err(decode_err)?),
        vehicle_id: VehicleId(row.try_get("vehicle_id").map_err(decode_err)?),
        driver_name: row.try_get("driver_name").map_err(decode_err)?,
        creator_id: UserId(row.try_get("creator_id").map_err(decode_err)?),
        approver1_id: UserId(row.try_get("approver1_id").map_err(decode_err)?),
        approver2_id: UserId(row.try_get("approver2_id").map_err(decode_err)?),
        status: decode_status(row.try_get("status").map_err(decode_err)?)?,
        start_date: decode_timestamp("start_date", &start_date)?,
        end_date: decode_timestamp("end_date", &end_date)?,
        created_at: decode_timestamp("created_at", &created_at)?,
        fuel_start: row.try_get("fuel_start").map_err(decode_err)?,
        fuel_end: row.try_get("fuel_end").map_err(decode_err)?,
        distance_km: row.try_get("distance_km").map_err(decode_err)?,
        fuel_used: row.try_get("fuel_used").map_err(decode_err)?,
    })
}

fn row_to_transition(row: &SqliteRow) -> Result<BookingTransition, RepositoryError> {
    let occurred_at: String = row.try_get("occurred_at").map_err(decode_err)?;

    Ok(BookingTransition {
        booking_id: BookingId(row.try_get("booking_id").map_err(decode_err)?),
        from: decode_status(row.try_get("from_status").map_err(decode_err)?)?,
        to: decode_status(row.try_get("to_status").map_err(decode_err)?)?,
        actor_id: UserId(row.try_get("actor_id").map_err(decode_err)?),
        occurred_at: decode_timestamp("occurred_at", &occurred_at)?,
    })
}

#[async_trait::async_trait]
impl BookingRepository for SqlBookingRepository {
    async fn create(
        &self,
        booking: NewBooking,
        created_at: DateTime<Utc>,
    ) -> Result<Booking, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO bookings (vehicle_id, driver_name, creator_id, approver1_id, approver2_id,
                                   status, start_date, end_date, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(booking.vehicle_id.0)
        .bind(&booking.driver_name)
        .bind(booking.creator_id.0)
        .bind(booking.approver1_id.0)
        .bind(booking.approver2_id.0)
        .bind(i64::from(BookingStatus::Pending.code()))
        .bind(booking.start_date.to_rfc3339())
        .bind(booking.end_date.to_rfc3339())
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let id = BookingId(result.last_insert_rowid());
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::Decode(format!("booking {id} vanished after insert")))
    }

    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_booking).transpose()
    }

    async fn list(&self) -> Result<Vec<Booking>, RepositoryError> {
        let rows = sqlx::query(&format!("SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_booking).collect()
    }

    async fn list_by_status(
        &self,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, RepositoryError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE status IN ({placeholders}) ORDER BY id"
        );
        let mut query = sqlx::query(&sql);
        for status in statuses {
            query = query.bind(i64::from(status.code()));
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_booking).collect()
    }

    async fn list_by_creator(&self, creator_id: UserId) -> Result<Vec<Booking>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE creator_id = ? ORDER BY id"
        ))
        .bind(creator_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_booking).collect()
    }

    async fn update_status(
        &self,
        id: BookingId,
        expected: BookingStatus,
        next: BookingStatus,
        actor_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<StatusChange, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE bookings SET status = ? WHERE id = ? AND status = ?")
            .bind(i64::from(next.code()))
            .bind(id.0)
            .bind(i64::from(expected.code()))
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            let current: Option<i64> =
                sqlx::query_scalar("SELECT status FROM bookings WHERE id = ?")
                    .bind(id.0)
                    .fetch_optional(&mut *tx)
                    .await?;
            tx.rollback().await?;

            return match current {
                Some(code) => Ok(StatusChange::Stale(decode_status(code)?)),
                None => Ok(StatusChange::NotFound),
            };
        }

        sqlx::query(
            "INSERT INTO booking_transitions
                 (booking_id, from_status, to_status, actor_id, occurred_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.0)
        .bind(i64::from(expected.code()))
        .bind(i64::from(next.code()))
        .bind(actor_id.0)
        .bind(at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?"))
            .bind(id.0)
            .fetch_one(&mut *tx)
            .await?;
        let booking = row_to_booking(&row)?;

        tx.commit().await?;
        Ok(StatusChange::Applied(booking))
    }

    async fn list_transitions(
        &self,
        id: BookingId,
    ) -> Result<Vec<BookingTransition>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT booking_id, from_status, to_status, actor_id, occurred_at
             FROM booking_transitions WHERE booking_id = ? ORDER BY id",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_transition).collect()
    }
}
