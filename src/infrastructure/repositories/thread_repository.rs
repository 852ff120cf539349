//! Thread Repository Implementation
//!
//! PostgreSQL implementation of the ThreadRepository trait. Thread creation
//! and deletion keep the category and author counters in the same
//! transaction as the rows they describe.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use super::post_repository::{insert_post, lock_thread};
use crate::domain::{
    CategorySnapshot, LastPost, LastThread, LocalizedText, Page, PageRequest, Post, Thread,
    ThreadFlag, ThreadRepository, UserSnapshot,
};
use crate::infrastructure::database::contains_pattern;
use crate::shared::error::AppError;

const THREAD_COLUMNS: &str = r#"
    id, title, slug, content, author_id, author_username, author_avatar,
    category_id, category_name_es, category_name_en, category_slug, tags, last_post,
    view_count, post_count, like_count, is_sticky, is_locked, is_announcement,
    created_at, updated_at
"#;

#[derive(Debug, sqlx::FromRow)]
struct ThreadRow {
    id: i64,
    title: String,
    slug: String,
    content: String,
    author_id: i64,
    author_username: String,
    author_avatar: String,
    category_id: i64,
    category_name_es: String,
    category_name_en: String,
    category_slug: String,
    tags: Vec<String>,
    last_post: Option<Json<LastPost>>,
    view_count: i32,
    post_count: i32,
    like_count: i32,
    is_sticky: bool,
    is_locked: bool,
    is_announcement: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ThreadRow {
    fn into_thread(self) -> Thread {
        Thread {
            id: self.id,
            title: self.title,
            slug: self.slug,
            content: self.content,
            user: UserSnapshot {
                id: self.author_id,
                username: self.author_username,
                avatar: self.author_avatar,
            },
            category: CategorySnapshot {
                id: self.category_id,
                name: LocalizedText::new(self.category_name_es, self.category_name_en),
                slug: self.category_slug,
            },
            tags: self.tags,
            last_post: self.last_post.map(|json| json.0),
            view_count: self.view_count,
            post_count: self.post_count,
            like_count: self.like_count,
            is_sticky: self.is_sticky,
            is_locked: self.is_locked,
            is_announcement: self.is_announcement,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL thread repository implementation.
#[derive(Clone)]
pub struct PgThreadRepository {
    pool: PgPool,
}

impl PgThreadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run a listing query. A filter clause refers to its value as `$1`.
    async fn fetch_page(
        &self,
        filter: Option<(&str, ThreadFilter<'_>)>,
        order: &str,
        page: PageRequest,
    ) -> Result<Page<Thread>, AppError> {
        let (where_clause, limit_param) = match filter {
            Some((clause, _)) => (clause, 2),
            None => ("TRUE", 1),
        };
        let sql = format!(
            "SELECT {} FROM threads WHERE {} ORDER BY {} LIMIT ${} OFFSET ${}",
            THREAD_COLUMNS,
            where_clause,
            order,
            limit_param,
            limit_param + 1
        );
        let count_sql = format!("SELECT COUNT(*) FROM threads WHERE {}", where_clause);

        let mut query = sqlx::query_as::<_, ThreadRow>(&sql);
        let mut count = sqlx::query_scalar::<_, i64>(&count_sql);
        match filter.map(|(_, value)| value) {
            Some(ThreadFilter::Id(id)) => {
                query = query.bind(id);
                count = count.bind(id);
            }
            Some(ThreadFilter::Text(text)) => {
                query = query.bind(text.to_string());
                count = count.bind(text.to_string());
            }
            None => {}
        }

        let rows = query
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        let total = count.fetch_one(&self.pool).await?;

        Ok(Page::new(
            rows.into_iter().map(ThreadRow::into_thread).collect(),
            total,
        ))
    }
}

/// Value bound to `$1` in a listing filter.
#[derive(Clone, Copy)]
enum ThreadFilter<'a> {
    Id(i64),
    Text(&'a str),
}

const LISTING_ORDER: &str = "is_sticky DESC, updated_at DESC, id DESC";

#[async_trait]
impl ThreadRepository for PgThreadRepository {
    async fn list(&self, page: PageRequest) -> Result<Page<Thread>, AppError> {
        self.fetch_page(None, LISTING_ORDER, page).await
    }

    async fn list_by_category(
        &self,
        category_id: i64,
        page: PageRequest,
    ) -> Result<Page<Thread>, AppError> {
        self.fetch_page(
            Some(("category_id = $1", ThreadFilter::Id(category_id))),
            LISTING_ORDER,
            page,
        )
        .await
    }

    async fn list_by_author(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> Result<Page<Thread>, AppError> {
        self.fetch_page(
            Some(("author_id = $1", ThreadFilter::Id(user_id))),
            "created_at DESC, id DESC",
            page,
        )
        .await
    }

    async fn search(&self, term: &str, page: PageRequest) -> Result<Page<Thread>, AppError> {
        let pattern = contains_pattern(term);
        self.fetch_page(
            Some((
                "(title ILIKE $1 OR content ILIKE $1)",
                ThreadFilter::Text(&pattern),
            )),
            "updated_at DESC, id DESC",
            page,
        )
        .await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Thread>, AppError> {
        let sql = format!("SELECT {} FROM threads WHERE id = $1", THREAD_COLUMNS);
        let row = sqlx::query_as::<_, ThreadRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(ThreadRow::into_thread))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Thread>, AppError> {
        let sql = format!("SELECT {} FROM threads WHERE slug = $1", THREAD_COLUMNS);
        let row = sqlx::query_as::<_, ThreadRow>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(ThreadRow::into_thread))
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, AppError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM threads WHERE slug = $1)")
                .bind(slug)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn count_by_category(&self, category_id: i64) -> Result<i64, AppError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM threads WHERE category_id = $1")
                .bind(category_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn increment_views(&self, id: i64) -> Result<Option<Thread>, AppError> {
        let sql = format!(
            "UPDATE threads SET view_count = view_count + 1 WHERE id = $1 RETURNING {}",
            THREAD_COLUMNS
        );
        let row = sqlx::query_as::<_, ThreadRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(ThreadRow::into_thread))
    }

    async fn create_with_opening_post(
        &self,
        thread: &Thread,
        opening_post: &Post,
    ) -> Result<Thread, AppError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO threads (id, title, slug, content, author_id, author_username, author_avatar,
                                 category_id, category_name_es, category_name_en, category_slug,
                                 tags, last_post, post_count, is_sticky, is_locked, is_announcement,
                                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING {}
            "#,
            THREAD_COLUMNS
        );
        let row = sqlx::query_as::<_, ThreadRow>(&sql)
            .bind(thread.id)
            .bind(&thread.title)
            .bind(&thread.slug)
            .bind(&thread.content)
            .bind(thread.user.id)
            .bind(&thread.user.username)
            .bind(&thread.user.avatar)
            .bind(thread.category.id)
            .bind(&thread.category.name.es)
            .bind(&thread.category.name.en)
            .bind(&thread.category.slug)
            .bind(&thread.tags)
            .bind(thread.last_post.clone().map(Json))
            .bind(thread.post_count)
            .bind(thread.is_sticky)
            .bind(thread.is_locked)
            .bind(thread.is_announcement)
            .bind(thread.created_at)
            .bind(thread.updated_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    AppError::Conflict("Thread with this slug already exists".to_string())
                }
                _ => AppError::Database(e),
            })?;

        insert_post(&mut *tx, opening_post).await?;

        let last_thread = LastThread {
            thread_id: thread.id,
            title: thread.title.clone(),
            user: thread.user.clone(),
            created_at: thread.created_at,
        };
        sqlx::query(
            r#"
            UPDATE categories
            SET thread_count = thread_count + 1,
                post_count = post_count + 1,
                last_thread = $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(thread.category.id)
        .bind(Json(last_thread))
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE users SET thread_count = thread_count + 1, post_count = post_count + 1 WHERE id = $1",
        )
        .bind(thread.user.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.into_thread())
    }

    async fn update(&self, thread: &Thread) -> Result<Thread, AppError> {
        let sql = format!(
            r#"
            UPDATE threads
            SET title = $2,
                content = $3,
                tags = $4,
                is_announcement = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            THREAD_COLUMNS
        );
        let row = sqlx::query_as::<_, ThreadRow>(&sql)
            .bind(thread.id)
            .bind(&thread.title)
            .bind(&thread.content)
            .bind(&thread.tags)
            .bind(thread.is_announcement)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Thread not found with id of {}", thread.id)))?;

        Ok(row.into_thread())
    }

    async fn toggle_flag(&self, id: i64, flag: ThreadFlag) -> Result<Option<Thread>, AppError> {
        let column = flag.column();
        let sql = format!(
            "UPDATE threads SET {column} = NOT {column} WHERE id = $1 RETURNING {}",
            THREAD_COLUMNS
        );
        let row = sqlx::query_as::<_, ThreadRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(ThreadRow::into_thread))
    }

    async fn delete_with_posts(&self, thread: &Thread) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        // Thread row first, then posts: the same order replies and likes lock in
        if !lock_thread(&mut *tx, thread.id).await? {
            return Err(AppError::NotFound(format!(
                "Thread not found with id of {}",
                thread.id
            )));
        }

        let removed = sqlx::query("DELETE FROM posts WHERE thread_id = $1")
            .bind(thread.id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let result = sqlx::query("DELETE FROM threads WHERE id = $1")
            .bind(thread.id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Thread not found with id of {}",
                thread.id
            )));
        }

        sqlx::query(
            r#"
            UPDATE categories
            SET thread_count = GREATEST(thread_count - 1, 0),
                post_count = GREATEST(post_count - $2, 0),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(thread.category.id)
        .bind(removed as i32)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(removed)
    }
}
