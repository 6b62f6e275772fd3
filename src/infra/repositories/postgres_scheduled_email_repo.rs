use crate::domain::{
    models::scheduled_email::{EmailStatus, EmailType, ScheduledEmail},
    ports::ScheduledEmailRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;
use chrono::{DateTime, Utc};

pub struct PostgresScheduledEmailRepo {
    pool: PgPool,
}

impl PostgresScheduledEmailRepo {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl ScheduledEmailRepository for PostgresScheduledEmailRepo {
    async fn create(&self, email: &ScheduledEmail) -> Result<ScheduledEmail, AppError> {
        sqlx::query_as::<_, ScheduledEmail>(
            "INSERT INTO scheduled_emails (id, booking_id, email_type, recipient_email, recipient_name, scheduled_for, status, retry_count, error_message, message_id, sent_at, claimed_at, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING *"
        )
            .bind(&email.id).bind(&email.booking_id).bind(email.email_type.as_str()).bind(&email.recipient_email)
            .bind(&email.recipient_name).bind(email.scheduled_for).bind(email.status.as_str()).bind(email.retry_count)
            .bind(&email.error_message).bind(&email.message_id).bind(email.sent_at).bind(email.claimed_at)
            .bind(email.created_at).bind(email.updated_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ScheduledEmail>, AppError> {
        sqlx::query_as::<_, ScheduledEmail>("SELECT * FROM scheduled_emails WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_by_booking(&self, booking_id: &str) -> Result<Vec<ScheduledEmail>, AppError> {
        sqlx::query_as::<_, ScheduledEmail>("SELECT * FROM scheduled_emails WHERE booking_id = $1 ORDER BY scheduled_for ASC, created_at ASC")
            .bind(booking_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_by_status(&self, status: EmailStatus, limit: i64) -> Result<Vec<ScheduledEmail>, AppError> {
        sqlx::query_as::<_, ScheduledEmail>("SELECT * FROM scheduled_emails WHERE status = $1 ORDER BY scheduled_for ASC LIMIT $2")
            .bind(status.as_str())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_active(&self, booking_id: &str, email_type: EmailType) -> Result<Option<ScheduledEmail>, AppError> {
        sqlx::query_as::<_, ScheduledEmail>(
            "SELECT * FROM scheduled_emails WHERE booking_id = $1 AND email_type = $2 AND status != 'cancelled' ORDER BY created_at DESC LIMIT 1"
        )
            .bind(booking_id)
            .bind(email_type.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn replace_pending(&self, email: &ScheduledEmail) -> Result<Option<ScheduledEmail>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let held = sqlx::query_as::<_, ScheduledEmail>(
            "SELECT * FROM scheduled_emails WHERE booking_id = $1 AND email_type = $2 AND status IN ('processing', 'sent', 'failed') LIMIT 1 FOR UPDATE"
        )
            .bind(&email.booking_id).bind(email.email_type.as_str())
            .fetch_optional(&mut *tx).await.map_err(AppError::Database)?;
        if held.is_some() {
            tx.rollback().await.map_err(AppError::Database)?;
            return Ok(None);
        }

        sqlx::query(
            "UPDATE scheduled_emails SET status = 'cancelled', error_message = 'superseded', updated_at = $1 WHERE booking_id = $2 AND email_type = $3 AND status = 'pending'"
        )
            .bind(email.created_at).bind(&email.booking_id).bind(email.email_type.as_str())
            .execute(&mut *tx).await.map_err(AppError::Database)?;

        let created = sqlx::query_as::<_, ScheduledEmail>(
            "INSERT INTO scheduled_emails (id, booking_id, email_type, recipient_email, recipient_name, scheduled_for, status, retry_count, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, 'pending', 0, $7, $8)
             RETURNING *"
        )
            .bind(&email.id).bind(&email.booking_id).bind(email.email_type.as_str()).bind(&email.recipient_email)
            .bind(&email.recipient_name).bind(email.scheduled_for).bind(email.created_at).bind(email.updated_at)
            .fetch_one(&mut *tx).await.map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(Some(created))
    }

    async fn cancel_pending(&self, booking_id: &str, email_type: Option<EmailType>) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE scheduled_emails SET status = 'cancelled', updated_at = $1 WHERE booking_id = $2 AND status = 'pending' AND ($3::TEXT IS NULL OR email_type = $3)"
        )
            .bind(Utc::now())
            .bind(booking_id)
            .bind(email_type.map(|t| t.as_str()))
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected())
    }

    async fn claim_due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<ScheduledEmail>, AppError> {
        let claimed = sqlx::query_as::<_, ScheduledEmail>(
            r#"
            UPDATE scheduled_emails
            SET status = 'processing', claimed_at = $1, updated_at = $1
            WHERE id IN (
                SELECT id
                FROM scheduled_emails
                WHERE status = 'pending' AND scheduled_for <= $1
                ORDER BY scheduled_for ASC
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#
        )
            .bind(now)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(claimed)
    }

    async fn release_stale_claims(&self, claimed_before: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE scheduled_emails SET status = 'pending', claimed_at = NULL, updated_at = $1 WHERE status = 'processing' AND claimed_at < $2"
        )
            .bind(Utc::now())
            .bind(claimed_before)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected())
    }

    async fn mark_sent(&self, id: &str, sent_at: DateTime<Utc>, message_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE scheduled_emails SET status = 'sent', sent_at = $1, message_id = $2, error_message = NULL, updated_at = $1 WHERE id = $3 AND status = 'processing'"
        )
            .bind(sent_at).bind(message_id).bind(id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_retry(&self, id: &str, retry_count: i32, next_attempt: DateTime<Utc>, error_message: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE scheduled_emails SET status = 'pending', retry_count = $1, scheduled_for = $2, error_message = $3, claimed_at = NULL, updated_at = $4 WHERE id = $5 AND status = 'processing'"
        )
            .bind(retry_count).bind(next_attempt).bind(error_message).bind(Utc::now()).bind(id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_failed(&self, id: &str, retry_count: i32, error_message: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE scheduled_emails SET status = 'failed', retry_count = $1, error_message = $2, claimed_at = NULL, updated_at = $3 WHERE id = $4 AND status = 'processing'"
        )
            .bind(retry_count).bind(error_message).bind(Utc::now()).bind(id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_cancelled(&self, id: &str, reason: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE scheduled_emails SET status = 'cancelled', error_message = $1, claimed_at = NULL, updated_at = $2 WHERE id = $3 AND status IN ('pending', 'processing')"
        )
            .bind(reason).bind(Utc::now()).bind(id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn requeue_failed(&self, id: &str, scheduled_for: DateTime<Utc>) -> Result<Option<ScheduledEmail>, AppError> {
        sqlx::query_as::<_, ScheduledEmail>(
            "UPDATE scheduled_emails SET status = 'pending', retry_count = 0, scheduled_for = $1, error_message = NULL, updated_at = $2 WHERE id = $3 AND status = 'failed' RETURNING *"
        )
            .bind(scheduled_for).bind(Utc::now()).bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }
}
