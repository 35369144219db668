//! Category repository.
//!
//! Category deletion must not race document uploads: the delete counts
//! referencing documents inside a transaction, and the foreign key on
//! `documents.category_id` (ON DELETE RESTRICT) backstops any insert that
//! commits between the count and the delete.

use async_trait::async_trait;
use chrono::Utc;
use docvault_core::models::{Category, CreateCategory};
use docvault_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::transaction::TransactionGuard;

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn create(&self, category: CreateCategory) -> Result<Category, AppError>;
    async fn get(&self, id: Uuid) -> Result<Option<Category>, AppError>;
    async fn list(&self) -> Result<Vec<Category>, AppError>;

    /// Delete a category. Fails with `CategoryInUse` if any document still
    /// references it.
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    created_at: chrono::DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgCategoryStore {
    pool: PgPool,
}

impl PgCategoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryStore for PgCategoryStore {
    #[tracing::instrument(skip(self, category), fields(db.table = "categories", db.operation = "insert"))]
    async fn create(&self, category: CreateCategory) -> Result<Category, AppError> {
        let row: CategoryRow = sqlx::query_as::<Postgres, CategoryRow>(
            r#"
            INSERT INTO categories (id, name, description, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&category.name)
        .bind(&category.description)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                AppError::InvalidInput(format!("Category '{}' already exists", category.name))
            }
            _ => AppError::from(e),
        })?;

        Ok(row.into())
    }

    #[tracing::instrument(skip(self), fields(db.table = "categories", db.operation = "select"))]
    async fn get(&self, id: Uuid) -> Result<Option<Category>, AppError> {
        let row: Option<CategoryRow> =
            sqlx::query_as::<Postgres, CategoryRow>("SELECT * FROM categories WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Category::from))
    }

    #[tracing::instrument(skip(self), fields(db.table = "categories", db.operation = "select"))]
    async fn list(&self) -> Result<Vec<Category>, AppError> {
        let rows: Vec<CategoryRow> =
            sqlx::query_as::<Postgres, CategoryRow>("SELECT * FROM categories ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "categories", db.operation = "delete"))]
    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        let documents: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE category_id = $1")
                .bind(id)
                .fetch_one(&mut **tx)
                .await?;

        if documents > 0 {
            tx.rollback().await?;
            return Err(AppError::CategoryInUse { id, documents });
        }

        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(|e| match &e {
                // A document insert can commit between the count and this
                // delete; the RESTRICT foreign key turns that race into the
                // same conflict error.
                sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23503") => {
                    AppError::CategoryInUse { id, documents: 1 }
                }
                _ => AppError::from(e),
            })?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::NotFound(format!("Category {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }
}
