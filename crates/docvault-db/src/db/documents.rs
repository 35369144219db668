//! Document metadata repository.
//!
//! Owns the `documents` table. Rows carry the storage key linking metadata
//! to the object store; the repository never touches object bytes itself.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docvault_core::models::{
    Document, DocumentFilter, DocumentUpdate, Pagination, SecurityMetadata, TagMatch,
};
use docvault_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Abstraction over document metadata persistence.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new metadata row. The caller supplies the fully-built
    /// document, storage key included.
    async fn create(&self, document: Document) -> Result<Document, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<Document>, AppError>;

    /// Apply a partial metadata update, returning the updated document.
    /// Fields absent from the update are left untouched.
    async fn update_metadata(&self, id: Uuid, update: DocumentUpdate)
        -> Result<Document, AppError>;

    async fn delete(&self, id: Uuid) -> Result<(), AppError>;

    /// Filtered, paginated listing. Returns the page of documents plus the
    /// total match count. When the filter carries a text query, results are
    /// ranked by relevance; otherwise by upload time, newest first.
    async fn list(
        &self,
        filter: &DocumentFilter,
        pagination: Pagination,
    ) -> Result<(Vec<Document>, i64), AppError>;

    /// Total stored bytes and document count for one owner.
    async fn usage(&self, owner_id: Uuid) -> Result<(i64, i64), AppError>;
}

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    filename: String,
    original_filename: String,
    content_type: String,
    file_size: i64,
    storage_key: String,
    category_id: Option<Uuid>,
    owner_id: Uuid,
    description: Option<String>,
    tags: Vec<String>,
    security: serde_json::Value,
    uploaded_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DocumentRow {
    fn into_document(self) -> Result<Document, AppError> {
        let security: SecurityMetadata = serde_json::from_value(self.security)?;
        Ok(Document {
            id: self.id,
            filename: self.filename,
            original_filename: self.original_filename,
            content_type: self.content_type,
            file_size: self.file_size,
            storage_key: self.storage_key,
            category_id: self.category_id,
            owner_id: self.owner_id,
            description: self.description,
            tags: self.tags,
            security,
            uploaded_at: self.uploaded_at,
            updated_at: self.updated_at,
        })
    }
}

fn rows_to_documents(rows: Vec<DocumentRow>) -> Result<Vec<Document>, AppError> {
    rows.into_iter().map(DocumentRow::into_document).collect()
}

/// Postgres-backed document repository.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build the WHERE clause for a filter. Conditions are appended in a
    /// fixed order; `bind_filter` must bind values in the same order.
    fn filter_conditions(filter: &DocumentFilter, mut param_index: usize) -> (Vec<String>, usize) {
        let mut parts = Vec::new();

        if filter.owner_id.is_some() {
            parts.push(format!("owner_id = ${}", param_index));
            param_index += 1;
        }
        if filter.category_id.is_some() {
            parts.push(format!("category_id = ${}", param_index));
            param_index += 1;
        }
        if filter.content_type.is_some() {
            parts.push(format!("content_type = ${}", param_index));
            param_index += 1;
        }
        if !filter.tags.is_empty() {
            let op = match filter.tag_match {
                TagMatch::Any => "&&",
                TagMatch::All => "@>",
            };
            parts.push(format!("tags {} ${}", op, param_index));
            param_index += 1;
        }
        if filter.uploaded_after.is_some() {
            parts.push(format!("uploaded_at >= ${}", param_index));
            param_index += 1;
        }
        if filter.uploaded_before.is_some() {
            parts.push(format!("uploaded_at <= ${}", param_index));
            param_index += 1;
        }
        if filter.query.is_some() {
            // Full-text match over filename and description, with a trigram-free
            // ILIKE fallback so partial tokens still hit.
            parts.push(format!(
                "(to_tsvector('english', original_filename || ' ' || coalesce(description, '')) \
                 @@ plainto_tsquery('english', ${idx}) \
                 OR original_filename ILIKE ${like} \
                 OR coalesce(description, '') ILIKE ${like})",
                idx = param_index,
                like = param_index + 1
            ));
            param_index += 2;
        }

        (parts, param_index)
    }

    /// Relevance expression for ranked ordering; only valid when the filter
    /// has a text query bound at `query_index`.
    fn rank_expression(query_index: usize) -> String {
        format!(
            "ts_rank(to_tsvector('english', original_filename || ' ' || coalesce(description, '')), \
             plainto_tsquery('english', ${}))",
            query_index
        )
    }
}

/// Bind filter values in the order `filter_conditions` emitted them.
macro_rules! bind_filter {
    ($query:expr, $filter:expr) => {{
        let mut q = $query;
        if let Some(owner) = $filter.owner_id {
            q = q.bind(owner);
        }
        if let Some(category) = $filter.category_id {
            q = q.bind(category);
        }
        if let Some(ref content_type) = $filter.content_type {
            q = q.bind(content_type);
        }
        if !$filter.tags.is_empty() {
            q = q.bind(&$filter.tags);
        }
        if let Some(after) = $filter.uploaded_after {
            q = q.bind(after);
        }
        if let Some(before) = $filter.uploaded_before {
            q = q.bind(before);
        }
        if let Some(ref text) = $filter.query {
            q = q.bind(text).bind(format!("%{}%", text));
        }
        q
    }};
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    #[tracing::instrument(skip(self, document), fields(db.table = "documents", db.operation = "insert"))]
    async fn create(&self, document: Document) -> Result<Document, AppError> {
        let security = serde_json::to_value(&document.security)?;

        let row: DocumentRow = sqlx::query_as::<Postgres, DocumentRow>(
            r#"
            INSERT INTO documents (
                id, filename, original_filename, content_type, file_size,
                storage_key, category_id, owner_id, description, tags,
                security, uploaded_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(document.id)
        .bind(&document.filename)
        .bind(&document.original_filename)
        .bind(&document.content_type)
        .bind(document.file_size)
        .bind(&document.storage_key)
        .bind(document.category_id)
        .bind(document.owner_id)
        .bind(&document.description)
        .bind(&document.tags)
        .bind(&security)
        .bind(document.uploaded_at)
        .bind(document.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23503") => {
                AppError::InvalidInput("Referenced category does not exist".to_string())
            }
            _ => AppError::from(e),
        })?;

        row.into_document()
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select"))]
    async fn get(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        let row: Option<DocumentRow> =
            sqlx::query_as::<Postgres, DocumentRow>("SELECT * FROM documents WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(DocumentRow::into_document).transpose()
    }

    #[tracing::instrument(skip(self, update), fields(db.table = "documents", db.operation = "update"))]
    async fn update_metadata(
        &self,
        id: Uuid,
        update: DocumentUpdate,
    ) -> Result<Document, AppError> {
        if update.is_empty() {
            return self
                .get(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Document {} not found", id)));
        }

        let mut set_parts = vec!["updated_at = now()".to_string()];
        let mut param_index = 2;

        if update.original_filename.is_some() {
            set_parts.push(format!("original_filename = ${}", param_index));
            param_index += 1;
        }
        if update.category_id.is_some() {
            set_parts.push(format!("category_id = ${}", param_index));
            param_index += 1;
        }
        if update.description.is_some() {
            set_parts.push(format!("description = ${}", param_index));
            param_index += 1;
        }
        if update.tags.is_some() {
            set_parts.push(format!("tags = ${}", param_index));
        }

        let query_str = format!(
            "UPDATE documents SET {} WHERE id = $1 RETURNING *",
            set_parts.join(", ")
        );

        let mut query = sqlx::query_as::<Postgres, DocumentRow>(&query_str).bind(id);
        if let Some(ref original_filename) = update.original_filename {
            query = query.bind(original_filename);
        }
        if let Some(category_id) = update.category_id {
            query = query.bind(category_id);
        }
        if let Some(ref description) = update.description {
            query = query.bind(description);
        }
        if let Some(ref tags) = update.tags {
            query = query.bind(tags);
        }

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23503") => {
                    AppError::InvalidInput("Referenced category does not exist".to_string())
                }
                _ => AppError::from(e),
            })?
            .ok_or_else(|| AppError::NotFound(format!("Document {} not found", id)))?;

        row.into_document()
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "delete"))]
    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Document {} not found", id)));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, filter), fields(db.table = "documents", db.operation = "select"))]
    async fn list(
        &self,
        filter: &DocumentFilter,
        pagination: Pagination,
    ) -> Result<(Vec<Document>, i64), AppError> {
        let (conditions, next_index) = Self::filter_conditions(filter, 1);
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_str = format!("SELECT COUNT(*) FROM documents {}", where_clause);
        let count_query = sqlx::query_scalar::<Postgres, i64>(&count_str);
        let total: i64 = bind_filter!(count_query, filter)
            .fetch_one(&self.pool)
            .await?;

        // Ranked order when searching; the query text param sits two places
        // before the end of the filter binds.
        let order_clause = if filter.query.is_some() {
            format!(
                "ORDER BY {} DESC, uploaded_at DESC",
                Self::rank_expression(next_index - 2)
            )
        } else {
            "ORDER BY uploaded_at DESC".to_string()
        };

        let rows_str = format!(
            "SELECT * FROM documents {} {} LIMIT ${} OFFSET ${}",
            where_clause,
            order_clause,
            next_index,
            next_index + 1
        );

        let rows_query = sqlx::query_as::<Postgres, DocumentRow>(&rows_str);
        let rows: Vec<DocumentRow> = bind_filter!(rows_query, filter)
            .bind(pagination.limit() as i64)
            .bind(pagination.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((rows_to_documents(rows)?, total))
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select"))]
    async fn usage(&self, owner_id: Uuid) -> Result<(i64, i64), AppError> {
        let (bytes, count): (i64, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(file_size), 0)::BIGINT, COUNT(*) FROM documents WHERE owner_id = $1",
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((bytes, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter_with(query: Option<&str>, tags: Vec<&str>) -> DocumentFilter {
        DocumentFilter {
            owner_id: Some(Uuid::new_v4()),
            tags: tags.into_iter().map(String::from).collect(),
            query: query.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_filter_conditions_order_matches_binds() {
        let filter = filter_with(Some("invoice"), vec!["finance"]);
        let (parts, next) = PgDocumentStore::filter_conditions(&filter, 1);
        assert_eq!(parts.len(), 3);
        assert!(parts[0].starts_with("owner_id = $1"));
        assert!(parts[1].contains("tags && $2"));
        assert!(parts[2].contains("plainto_tsquery('english', $3)"));
        assert!(parts[2].contains("ILIKE $4"));
        assert_eq!(next, 5);
    }

    #[test]
    fn test_all_tag_match_uses_containment() {
        let mut filter = filter_with(None, vec!["a", "b"]);
        filter.tag_match = TagMatch::All;
        let (parts, _) = PgDocumentStore::filter_conditions(&filter, 1);
        assert!(parts[1].contains("tags @> $2"));
    }

    #[test]
    fn test_empty_filter_produces_no_conditions() {
        let (parts, next) = PgDocumentStore::filter_conditions(&DocumentFilter::default(), 1);
        assert!(parts.is_empty());
        assert_eq!(next, 1);
    }
}
