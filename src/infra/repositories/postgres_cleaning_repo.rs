use crate::domain::{models::cleaning::CleaningTask, ports::CleaningTaskRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;
use chrono::{DateTime, Utc};

pub struct PostgresCleaningRepo {
    pool: PgPool,
}

impl PostgresCleaningRepo {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl CleaningTaskRepository for PostgresCleaningRepo {
    async fn create(&self, task: &CleaningTask) -> Result<CleaningTask, AppError> {
        sqlx::query_as::<_, CleaningTask>(
            "INSERT INTO cleaning_tasks (id, property_id, booking_id, cleaning_date, status, cost, notes, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING *"
        )
            .bind(&task.id).bind(&task.property_id).bind(&task.booking_id).bind(task.cleaning_date)
            .bind(task.status.as_str()).bind(task.cost).bind(&task.notes)
            .bind(task.created_at).bind(task.updated_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<CleaningTask>, AppError> {
        sqlx::query_as::<_, CleaningTask>("SELECT * FROM cleaning_tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_by_property(&self, property_id: &str) -> Result<Vec<CleaningTask>, AppError> {
        sqlx::query_as::<_, CleaningTask>("SELECT * FROM cleaning_tasks WHERE property_id = $1 ORDER BY cleaning_date ASC")
            .bind(property_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_active_in_window(&self, property_id: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<CleaningTask>, AppError> {
        sqlx::query_as::<_, CleaningTask>(
            "SELECT * FROM cleaning_tasks WHERE property_id = $1 AND cleaning_date BETWEEN $2 AND $3 AND status != 'cancelled' ORDER BY cleaning_date ASC"
        )
            .bind(property_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn cancel_scheduled_in_window(&self, property_id: &str, booking_id: &str, from: DateTime<Utc>, to: DateTime<Utc>, note: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE cleaning_tasks
            SET status = 'cancelled',
                notes = CASE WHEN notes IS NULL THEN $1 ELSE notes || ' | ' || $1 END,
                updated_at = $2
            WHERE property_id = $3
            AND status = 'scheduled'
            AND cleaning_date BETWEEN $4 AND $5
            AND (booking_id = $6 OR booking_id IS NULL)
            "#
        )
            .bind(note)
            .bind(Utc::now())
            .bind(property_id)
            .bind(from)
            .bind(to)
            .bind(booking_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected())
    }
}
