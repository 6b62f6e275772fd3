use crate::domain::{models::booking::Booking, ports::BookingRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;
use chrono::{DateTime, Utc};

pub struct PostgresBookingRepo {
    pool: PgPool,
}

impl PostgresBookingRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for PostgresBookingRepo {
    async fn create(&self, booking: &Booking) -> Result<Booking, AppError> {
        sqlx::query_as::<_, Booking>(
            "INSERT INTO bookings (id, property_id, guest_name, guest_email, guest_phone, check_in, check_out, status, booking_platform, total_amount, notes, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING *"
        )
            .bind(&booking.id).bind(&booking.property_id).bind(&booking.guest_name).bind(&booking.guest_email)
            .bind(&booking.guest_phone).bind(booking.check_in).bind(booking.check_out).bind(booking.status.as_str())
            .bind(&booking.booking_platform).bind(booking.total_amount).bind(&booking.notes)
            .bind(booking.created_at).bind(booking.updated_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }
    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1").bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }
    async fn list_by_property(&self, property_id: &str) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE property_id = $1 ORDER BY check_in ASC").bind(property_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }
    async fn list_active_in_range(&self, property_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE property_id = $1 AND check_in < $2 AND check_out > $3 AND status != 'cancelled' ORDER BY check_in ASC"
        )
            .bind(property_id).bind(end).bind(start)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }
    async fn list_confirmed_ending_after(&self, after: DateTime<Utc>) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE status = 'confirmed' AND check_out > $1 ORDER BY check_out ASC").bind(after).fetch_all(&self.pool).await.map_err(AppError::Database)
    }
    async fn update(&self, booking: &Booking) -> Result<Booking, AppError> {
        sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET guest_name=$1, guest_email=$2, guest_phone=$3, check_in=$4, check_out=$5, status=$6, booking_platform=$7, total_amount=$8, notes=$9, updated_at=$10
             WHERE id=$11
             RETURNING *"
        )
            .bind(&booking.guest_name).bind(&booking.guest_email).bind(&booking.guest_phone)
            .bind(booking.check_in).bind(booking.check_out).bind(booking.status.as_str())
            .bind(&booking.booking_platform).bind(booking.total_amount).bind(&booking.notes).bind(booking.updated_at)
            .bind(&booking.id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .ok_or(AppError::NotFound(format!("Booking {} not found", booking.id)))
    }
    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1").bind(id).execute(&self.pool).await.map_err(AppError::Database)?;
        if result.rows_affected() == 0 { return Err(AppError::NotFound("Booking not found".into())); }
        Ok(())
    }
}
