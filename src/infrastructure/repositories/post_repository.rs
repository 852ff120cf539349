//! Post Repository Implementation
//!
//! PostgreSQL implementation of the PostRepository trait. Likes, mentions,
//! attachments and edit history are stored as JSONB arrays on the post row.
//! Likes are only written under the post's row lock; edits never touch them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use crate::domain::{
    Attachment, EditEntry, LastPost, Like, LikeToggle, Mention, Page, PageRequest, Post,
    PostRepository, ThreadSnapshot, UserSnapshot,
};
use crate::infrastructure::database::contains_pattern;
use crate::shared::error::AppError;

const POST_COLUMNS: &str = r#"
    id, content, author_id, author_username, author_avatar, thread_id, thread_title,
    thread_slug, likes, mentions, attachments, is_edited, edit_history, created_at, updated_at
"#;

#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: i64,
    content: String,
    author_id: i64,
    author_username: String,
    author_avatar: String,
    thread_id: i64,
    thread_title: String,
    thread_slug: String,
    likes: Json<Vec<Like>>,
    mentions: Json<Vec<Mention>>,
    attachments: Json<Vec<Attachment>>,
    is_edited: bool,
    edit_history: Json<Vec<EditEntry>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PostRow {
    fn into_post(self) -> Post {
        Post {
            id: self.id,
            content: self.content,
            user: UserSnapshot {
                id: self.author_id,
                username: self.author_username,
                avatar: self.author_avatar,
            },
            thread: ThreadSnapshot {
                id: self.thread_id,
                title: self.thread_title,
                slug: self.thread_slug,
            },
            likes: self.likes.0,
            mentions: self.mentions.0,
            attachments: self.attachments.0,
            is_edited: self.is_edited,
            edit_history: self.edit_history.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Insert a post row on an open connection or transaction.
pub(super) async fn insert_post(conn: &mut PgConnection, post: &Post) -> Result<Post, AppError> {
    let sql = format!(
        r#"
        INSERT INTO posts (id, content, author_id, author_username, author_avatar, thread_id,
                           thread_title, thread_slug, likes, mentions, attachments, is_edited,
                           edit_history, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING {}
        "#,
        POST_COLUMNS
    );
    let row = sqlx::query_as::<_, PostRow>(&sql)
        .bind(post.id)
        .bind(&post.content)
        .bind(post.user.id)
        .bind(&post.user.username)
        .bind(&post.user.avatar)
        .bind(post.thread.id)
        .bind(&post.thread.title)
        .bind(&post.thread.slug)
        .bind(Json(&post.likes))
        .bind(Json(&post.mentions))
        .bind(Json(&post.attachments))
        .bind(post.is_edited)
        .bind(Json(&post.edit_history))
        .bind(post.created_at)
        .bind(post.updated_at)
        .fetch_one(&mut *conn)
        .await?;

    Ok(row.into_post())
}

/// Take the row lock on a thread. Replies, likes and deletes inside a thread
/// lock the thread before any of its posts, so they never deadlock and the
/// thread counters are recomputed one writer at a time.
pub(super) async fn lock_thread(conn: &mut PgConnection, thread_id: i64) -> Result<bool, AppError> {
    let locked = sqlx::query_scalar::<_, i64>("SELECT id FROM threads WHERE id = $1 FOR UPDATE")
        .bind(thread_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(locked.is_some())
}

/// Recompute the thread's `like_count` as the sum of likes over its posts.
async fn recount_thread_likes(conn: &mut PgConnection, thread_id: i64) -> Result<i64, AppError> {
    let count = sqlx::query_scalar::<_, i32>(
        r#"
        UPDATE threads
        SET like_count = (
            SELECT COALESCE(SUM(jsonb_array_length(likes)), 0)::INTEGER
            FROM posts
            WHERE thread_id = $1
        )
        WHERE id = $1
        RETURNING like_count
        "#,
    )
    .bind(thread_id)
    .fetch_optional(&mut *conn)
    .await?
    .unwrap_or_default();

    Ok(i64::from(count))
}

/// PostgreSQL post repository implementation.
#[derive(Clone)]
pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_page(
        &self,
        filter: Option<(&str, PostFilter)>,
        order: &str,
        page: PageRequest,
    ) -> Result<Page<Post>, AppError> {
        let (where_clause, limit_param) = match &filter {
            Some((clause, _)) => (*clause, 2),
            None => ("TRUE", 1),
        };
        let sql = format!(
            "SELECT {} FROM posts WHERE {} ORDER BY {} LIMIT ${} OFFSET ${}",
            POST_COLUMNS,
            where_clause,
            order,
            limit_param,
            limit_param + 1
        );
        let count_sql = format!("SELECT COUNT(*) FROM posts WHERE {}", where_clause);

        let mut query = sqlx::query_as::<_, PostRow>(&sql);
        let mut count = sqlx::query_scalar::<_, i64>(&count_sql);
        match filter.map(|(_, value)| value) {
            Some(PostFilter::Id(id)) => {
                query = query.bind(id);
                count = count.bind(id);
            }
            Some(PostFilter::Text(text)) => {
                query = query.bind(text.clone());
                count = count.bind(text);
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
            rows.into_iter().map(PostRow::into_post).collect(),
            total,
        ))
    }
}

/// Value bound to `$1` in a listing filter.
enum PostFilter {
    Id(i64),
    Text(String),
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn list(&self, page: PageRequest) -> Result<Page<Post>, AppError> {
        self.fetch_page(None, "created_at DESC, id DESC", page).await
    }

    async fn search(&self, term: &str, page: PageRequest) -> Result<Page<Post>, AppError> {
        self.fetch_page(
            Some(("content ILIKE $1", PostFilter::Text(contains_pattern(term)))),
            "created_at DESC, id DESC",
            page,
        )
        .await
    }

    async fn list_by_thread(
        &self,
        thread_id: i64,
        page: PageRequest,
    ) -> Result<Page<Post>, AppError> {
        self.fetch_page(
            Some(("thread_id = $1", PostFilter::Id(thread_id))),
            "created_at ASC, id ASC",
            page,
        )
        .await
    }

    async fn list_by_author(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> Result<Page<Post>, AppError> {
        self.fetch_page(
            Some(("author_id = $1", PostFilter::Id(user_id))),
            "created_at DESC, id DESC",
            page,
        )
        .await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, AppError> {
        let sql = format!("SELECT {} FROM posts WHERE id = $1", POST_COLUMNS);
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(PostRow::into_post))
    }

    async fn opening_post_id(&self, thread_id: i64) -> Result<Option<i64>, AppError> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM posts WHERE thread_id = $1 ORDER BY created_at ASC, id ASC LIMIT 1",
        )
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    async fn create_reply(&self, post: &Post, category_id: i64) -> Result<Post, AppError> {
        let mut tx = self.pool.begin().await?;

        let created = insert_post(&mut *tx, post).await?;

        let last_post = LastPost {
            id: post.id,
            user: post.user.clone(),
            created_at: post.created_at,
        };
        sqlx::query(
            r#"
            UPDATE threads
            SET last_post = $2,
                post_count = post_count + 1,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(post.thread.id)
        .bind(Json(last_post))
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE categories SET post_count = post_count + 1 WHERE id = $1")
            .bind(category_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE users SET post_count = post_count + 1 WHERE id = $1")
            .bind(post.user.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn update(&self, post: &Post) -> Result<Post, AppError> {
        let sql = format!(
            r#"
            UPDATE posts
            SET content = $2,
                mentions = $3,
                is_edited = $4,
                edit_history = $5,
                updated_at = $6
            WHERE id = $1
            RETURNING {}
            "#,
            POST_COLUMNS
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(post.id)
            .bind(&post.content)
            .bind(Json(&post.mentions))
            .bind(post.is_edited)
            .bind(Json(&post.edit_history))
            .bind(post.updated_at)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post not found with id of {}", post.id)))?;

        Ok(row.into_post())
    }

    async fn toggle_like(
        &self,
        post_id: i64,
        user: &UserSnapshot,
        at: DateTime<Utc>,
    ) -> Result<Option<LikeToggle>, AppError> {
        let mut tx = self.pool.begin().await?;

        let Some(thread_id) =
            sqlx::query_scalar::<_, i64>("SELECT thread_id FROM posts WHERE id = $1")
                .bind(post_id)
                .fetch_optional(&mut *tx)
                .await?
        else {
            return Ok(None);
        };
        lock_thread(&mut *tx, thread_id).await?;

        let sql = format!("SELECT {} FROM posts WHERE id = $1 FOR UPDATE", POST_COLUMNS);
        let Some(row) = sqlx::query_as::<_, PostRow>(&sql)
            .bind(post_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let mut post = row.into_post();
        let liked = post.toggle_like(user, at);
        sqlx::query("UPDATE posts SET likes = $2 WHERE id = $1")
            .bind(post_id)
            .bind(Json(&post.likes))
            .execute(&mut *tx)
            .await?;

        let thread_like_count = recount_thread_likes(&mut *tx, thread_id).await?;

        tx.commit().await?;

        Ok(Some(LikeToggle {
            post,
            liked,
            thread_like_count,
        }))
    }

    async fn delete_reply(&self, post: &Post, category_id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        lock_thread(&mut *tx, post.thread.id).await?;

        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post.id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Post not found with id of {}",
                post.id
            )));
        }

        let sql = format!(
            "SELECT {} FROM posts WHERE thread_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1",
            POST_COLUMNS
        );
        let last_post = sqlx::query_as::<_, PostRow>(&sql)
            .bind(post.thread.id)
            .fetch_optional(&mut *tx)
            .await?
            .map(|row| LastPost {
                id: row.id,
                user: UserSnapshot {
                    id: row.author_id,
                    username: row.author_username,
                    avatar: row.author_avatar,
                },
                created_at: row.created_at,
            });

        sqlx::query(
            r#"
            UPDATE threads
            SET post_count = GREATEST(post_count - 1, 0),
                last_post = $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(post.thread.id)
        .bind(last_post.map(Json))
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE categories SET post_count = GREATEST(post_count - 1, 0) WHERE id = $1",
        )
        .bind(category_id)
        .execute(&mut *tx)
        .await?;

        if !post.likes.is_empty() {
            recount_thread_likes(&mut *tx, post.thread.id).await?;
        }

        tx.commit().await?;

        Ok(())
    }
}
