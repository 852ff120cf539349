//! Category Repository Implementation
//!
//! PostgreSQL implementation of the CategoryRepository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::{
    parse_roles, roles_to_strings, Category, CategoryRepository, LastThread, LocalizedText,
};
use crate::shared::error::AppError;

const CATEGORY_COLUMNS: &str = r#"
    id, name_es, name_en, description_es, description_en, slug, icon, color,
    sort_order, is_private, allowed_roles, parent_id, thread_count, post_count,
    last_thread, created_at, updated_at
"#;

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name_es: String,
    name_en: String,
    description_es: String,
    description_en: String,
    slug: String,
    icon: String,
    color: String,
    sort_order: i32,
    is_private: bool,
    allowed_roles: Vec<String>,
    parent_id: Option<i64>,
    thread_count: i32,
    post_count: i32,
    last_thread: Option<Json<LastThread>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CategoryRow {
    fn into_category(self) -> Category {
        Category {
            id: self.id,
            name: LocalizedText::new(self.name_es, self.name_en),
            description: LocalizedText::new(self.description_es, self.description_en),
            slug: self.slug,
            icon: self.icon,
            color: self.color,
            order: self.sort_order,
            is_private: self.is_private,
            allowed_roles: parse_roles(&self.allowed_roles),
            parent_category: self.parent_id,
            thread_count: self.thread_count,
            post_count: self.post_count,
            last_thread: self.last_thread.map(|json| json.0),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn map_conflict(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("Category with this slug already exists".to_string())
        }
        _ => AppError::Database(e),
    }
}

/// PostgreSQL category repository implementation.
#[derive(Clone)]
pub struct PgCategoryRepository {
    pool: PgPool,
}

impl PgCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn list_all(&self) -> Result<Vec<Category>, AppError> {
        let sql = format!(
            "SELECT {} FROM categories ORDER BY sort_order ASC, id ASC",
            CATEGORY_COLUMNS
        );
        let rows = sqlx::query_as::<_, CategoryRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(CategoryRow::into_category).collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Category>, AppError> {
        let sql = format!("SELECT {} FROM categories WHERE id = $1", CATEGORY_COLUMNS);
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(CategoryRow::into_category))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, AppError> {
        let sql = format!("SELECT {} FROM categories WHERE slug = $1", CATEGORY_COLUMNS);
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(CategoryRow::into_category))
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE slug = $1)",
        )
        .bind(slug)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn create(&self, category: &Category) -> Result<Category, AppError> {
        let sql = format!(
            r#"
            INSERT INTO categories (id, name_es, name_en, description_es, description_en, slug,
                                    icon, color, sort_order, is_private, allowed_roles, parent_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        );
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(category.id)
            .bind(&category.name.es)
            .bind(&category.name.en)
            .bind(&category.description.es)
            .bind(&category.description.en)
            .bind(&category.slug)
            .bind(&category.icon)
            .bind(&category.color)
            .bind(category.order)
            .bind(category.is_private)
            .bind(roles_to_strings(&category.allowed_roles))
            .bind(category.parent_category)
            .fetch_one(&self.pool)
            .await
            .map_err(map_conflict)?;

        Ok(row.into_category())
    }

    async fn update(&self, category: &Category) -> Result<Category, AppError> {
        let sql = format!(
            r#"
            UPDATE categories
            SET name_es = $2,
                name_en = $3,
                description_es = $4,
                description_en = $5,
                icon = $6,
                color = $7,
                sort_order = $8,
                is_private = $9,
                allowed_roles = $10,
                parent_id = $11,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        );
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(category.id)
            .bind(&category.name.es)
            .bind(&category.name.en)
            .bind(&category.description.es)
            .bind(&category.description.en)
            .bind(&category.icon)
            .bind(&category.color)
            .bind(category.order)
            .bind(category.is_private)
            .bind(roles_to_strings(&category.allowed_roles))
            .bind(category.parent_category)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Category not found with id of {}", category.id))
            })?;

        Ok(row.into_category())
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                // A thread created after the emptiness check still holds the key
                sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                    AppError::BadRequest(
                        "Cannot delete category with existing threads".to_string(),
                    )
                }
                _ => AppError::Database(e),
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Category not found with id of {}", id)));
        }

        Ok(())
    }

    async fn reorder(&self, orders: &[(i64, i32)]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        for (id, order) in orders {
            sqlx::query("UPDATE categories SET sort_order = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(order)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(())
    }
}
