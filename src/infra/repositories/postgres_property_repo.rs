use crate::domain::{models::property::Property, ports::PropertyRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresPropertyRepo {
    pool: PgPool,
}

impl PostgresPropertyRepo {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl PropertyRepository for PostgresPropertyRepo {
    async fn create(&self, property: &Property) -> Result<Property, AppError> {
        sqlx::query_as::<_, Property>(
            "INSERT INTO properties (id, name, address, timezone, check_in_instructions, default_cleaning_cost, review_url, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *"
        )
            .bind(&property.id).bind(&property.name).bind(&property.address).bind(&property.timezone)
            .bind(&property.check_in_instructions).bind(property.default_cleaning_cost).bind(&property.review_url)
            .bind(property.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Property>, AppError> {
        sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}
