use crate::domain::{models::cleaning::CleaningTask, ports::CleaningTaskRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::SqlitePool;
use chrono::{DateTime, Utc};

pub struct SqliteCleaningRepo {
    pool: SqlitePool,
}

impl SqliteCleaningRepo {
    pub fn new(pool: SqlitePool) -> Self { Self { pool } }
}

#[async_trait]
impl CleaningTaskRepository for SqliteCleaningRepo {
    async fn create(&self, task: &CleaningTask) -> Result<CleaningTask, AppError> {
        sqlx::query_as::<_, CleaningTask>(
            "INSERT INTO cleaning_tasks (id, property_id, booking_id, cleaning_date, status, cost, notes, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *"
        )
            .bind(&task.id).bind(&task.property_id).bind(&task.booking_id).bind(task.cleaning_date)
            .bind(task.status.as_str()).bind(task.cost).bind(&task.notes)
            .bind(task.created_at).bind(task.updated_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<CleaningTask>, AppError> {
        sqlx::query_as::<_, CleaningTask>("SELECT * FROM cleaning_tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_by_property(&self, property_id: &str) -> Result<Vec<CleaningTask>, AppError> {
        sqlx::query_as::<_, CleaningTask>("SELECT * FROM cleaning_tasks WHERE property_id = ? ORDER BY cleaning_date ASC")
            .bind(property_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_active_in_window(&self, property_id: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<CleaningTask>, AppError> {
        sqlx::query_as::<_, CleaningTask>(
            "SELECT * FROM cleaning_tasks WHERE property_id = ? AND cleaning_date >= ? AND cleaning_date <= ? AND status != 'cancelled' ORDER BY cleaning_date ASC"
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
                notes = CASE WHEN notes IS NULL THEN ? ELSE notes || ' | ' || ? END,
                updated_at = ?
            WHERE property_id = ?
            AND status = 'scheduled'
            AND cleaning_date >= ? AND cleaning_date <= ?
            AND (booking_id = ? OR booking_id IS NULL)
            "#
        )
            .bind(note)
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
