use crate::domain::{
    models::scheduled_email::{EmailStatus, EmailType, ScheduledEmail},
    ports::ScheduledEmailRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::SqlitePool;
use chrono::{DateTime, Utc};

pub struct SqliteScheduledEmailRepo {
    pool: SqlitePool,
}

impl SqliteScheduledEmailRepo {
    pub fn new(pool: SqlitePool) -> Self { Self { pool } }
}

#[async_trait]
impl ScheduledEmailRepository for SqliteScheduledEmailRepo {
    async fn create(&self, email: &ScheduledEmail) -> Result<ScheduledEmail, AppError> {
        sqlx::query_as::<_, ScheduledEmail>(
            "INSERT INTO scheduled_emails (id, booking_id, email_type, recipient_email, recipient_name, scheduled_for, status, retry_count, error_message, message_id, sent_at, claimed_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *"
        )
            .bind(&email.id).bind(&email.booking_id).bind(email.email_type.as_str()).bind(&email.recipient_email)
            .bind(&email.recipient_name).bind(email.scheduled_for).bind(email.status.as_str()).bind(email.retry_count)
            .bind(&email.error_message).bind(&email.message_id).bind(email.sent_at).bind(email.claimed_at)
            .bind(email.created_at).bind(email.updated_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ScheduledEmail>, AppError> {
        sqlx::query_as::<_, ScheduledEmail>("SELECT * FROM scheduled_emails WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_by_booking(&self, booking_id: &str) -> Result<Vec<ScheduledEmail>, AppError> {
        sqlx::query_as::<_, ScheduledEmail>("SELECT * FROM scheduled_emails WHERE booking_id = ? ORDER BY scheduled_for ASC, created_at ASC")
            .bind(booking_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_by_status(&self, status: EmailStatus, limit: i64) -> Result<Vec<ScheduledEmail>, AppError> {
        sqlx::query_as::<_, ScheduledEmail>("SELECT * FROM scheduled_emails WHERE status = ? ORDER BY scheduled_for ASC LIMIT ?")
            .bind(status.as_str())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_active(&self, booking_id: &str, email_type: EmailType) -> Result<Option<ScheduledEmail>, AppError> {
        sqlx::query_as::<_, ScheduledEmail>(
            "SELECT * FROM scheduled_emails WHERE booking_id = ? AND email_type = ? AND status != 'cancelled' ORDER BY created_at DESC LIMIT 1"
        )
            .bind(booking_id)
            .bind(email_type.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn replace_pending(&self, email: &ScheduledEmail) -> Result<Option<ScheduledEmail>, AppError> {
        // Both statements write first, so the deferred transaction never upgrades a read lock.
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        sqlx::query(
            r#"
            UPDATE scheduled_emails
            SET status = 'cancelled', error_message = 'superseded', updated_at = ?
            WHERE booking_id = ? AND email_type = ? AND status = 'pending'
            AND NOT EXISTS (
                SELECT 1 FROM scheduled_emails
                WHERE booking_id = ? AND email_type = ? AND status IN ('processing', 'sent', 'failed')
            )
            "#
        )
            .bind(email.created_at)
            .bind(&email.booking_id).bind(email.email_type.as_str())
            .bind(&email.booking_id).bind(email.email_type.as_str())
            .execute(&mut *tx).await.map_err(AppError::Database)?;

        let created = sqlx::query_as::<_, ScheduledEmail>(
            r#"
            INSERT INTO scheduled_emails (id, booking_id, email_type, recipient_email, recipient_name, scheduled_for, status, retry_count, created_at, updated_at)
            SELECT ?, ?, ?, ?, ?, ?, 'pending', 0, ?, ?
            WHERE NOT EXISTS (
                SELECT 1 FROM scheduled_emails
                WHERE booking_id = ? AND email_type = ? AND status IN ('processing', 'sent', 'failed')
            )
            RETURNING *
            "#
        )
            .bind(&email.id).bind(&email.booking_id).bind(email.email_type.as_str()).bind(&email.recipient_email)
            .bind(&email.recipient_name).bind(email.scheduled_for).bind(email.created_at).bind(email.updated_at)
            .bind(&email.booking_id).bind(email.email_type.as_str())
            .fetch_optional(&mut *tx).await.map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(created)
    }

    async fn cancel_pending(&self, booking_id: &str, email_type: Option<EmailType>) -> Result<u64, AppError> {
        let email_type = email_type.map(|t| t.as_str());
        let result = sqlx::query(
            "UPDATE scheduled_emails SET status = 'cancelled', updated_at = ? WHERE booking_id = ? AND status = 'pending' AND (? IS NULL OR email_type = ?)"
        )
            .bind(Utc::now())
            .bind(booking_id)
            .bind(email_type)
            .bind(email_type)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected())
    }

    async fn claim_due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<ScheduledEmail>, AppError> {
        sqlx::query_as::<_, ScheduledEmail>(
            r#"
            UPDATE scheduled_emails
            SET status = 'processing', claimed_at = ?, updated_at = ?
            WHERE id IN (
                SELECT id FROM scheduled_emails
                WHERE status = 'pending' AND scheduled_for <= ?
                ORDER BY scheduled_for ASC
                LIMIT ?
            )
            RETURNING *
            "#
        )
            .bind(now)
            .bind(now)
            .bind(now)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn release_stale_claims(&self, claimed_before: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE scheduled_emails SET status = 'pending', claimed_at = NULL, updated_at = ? WHERE status = 'processing' AND claimed_at < ?"
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
            "UPDATE scheduled_emails SET status = 'sent', sent_at = ?, message_id = ?, error_message = NULL, updated_at = ? WHERE id = ? AND status = 'processing'"
        )
            .bind(sent_at).bind(message_id).bind(sent_at).bind(id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_retry(&self, id: &str, retry_count: i32, next_attempt: DateTime<Utc>, error_message: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE scheduled_emails SET status = 'pending', retry_count = ?, scheduled_for = ?, error_message = ?, claimed_at = NULL, updated_at = ? WHERE id = ? AND status = 'processing'"
        )
            .bind(retry_count).bind(next_attempt).bind(error_message).bind(Utc::now()).bind(id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_failed(&self, id: &str, retry_count: i32, error_message: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE scheduled_emails SET status = 'failed', retry_count = ?, error_message = ?, claimed_at = NULL, updated_at = ? WHERE id = ? AND status = 'processing'"
        )
            .bind(retry_count).bind(error_message).bind(Utc::now()).bind(id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_cancelled(&self, id: &str, reason: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE scheduled_emails SET status = 'cancelled', error_message = ?, claimed_at = NULL, updated_at = ? WHERE id = ? AND status IN ('pending', 'processing')"
        )
            .bind(reason).bind(Utc::now()).bind(id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn requeue_failed(&self, id: &str, scheduled_for: DateTime<Utc>) -> Result<Option<ScheduledEmail>, AppError> {
        sqlx::query_as::<_, ScheduledEmail>(
            "UPDATE scheduled_emails SET status = 'pending', retry_count = 0, scheduled_for = ?, error_message = NULL, updated_at = ? WHERE id = ? AND status = 'failed' RETURNING *"
        )
            .bind(scheduled_for).bind(Utc::now()).bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }
}
