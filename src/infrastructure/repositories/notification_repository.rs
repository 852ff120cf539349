//! Notification Repository Implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::{
    Notification, NotificationKind, NotificationRepository, Page, PageRequest, Reference,
    ReferenceModel, UserSnapshot,
};
use crate::shared::error::AppError;

const NOTIFICATION_COLUMNS: &str = r#"
    id, kind, title, message, recipient_id, sender, reference_model, reference_id,
    url, is_read, created_at
"#;

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: i64,
    kind: String,
    title: String,
    message: String,
    recipient_id: i64,
    sender: Option<Json<UserSnapshot>>,
    reference_model: Option<String>,
    reference_id: Option<i64>,
    url: Option<String>,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl NotificationRow {
    fn into_notification(self) -> Notification {
        Notification {
            id: self.id,
            kind: NotificationKind::parse(&self.kind).unwrap_or(NotificationKind::System),
            title: self.title,
            message: self.message,
            recipient: self.recipient_id,
            sender: self.sender.map(|json| json.0),
            reference: Reference {
                model: self.reference_model.as_deref().and_then(ReferenceModel::parse),
                id: self.reference_id,
            },
            url: self.url,
            is_read: self.is_read,
            created_at: self.created_at,
        }
    }
}

/// PostgreSQL notification repository implementation.
#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn create(&self, notification: &Notification) -> Result<Notification, AppError> {
        let sql = format!(
            r#"
            INSERT INTO notifications (id, kind, title, message, recipient_id, sender,
                                       reference_model, reference_id, url, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        );
        let row = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(notification.id)
            .bind(notification.kind.as_str())
            .bind(&notification.title)
            .bind(&notification.message)
            .bind(notification.recipient)
            .bind(notification.sender.as_ref().map(Json))
            .bind(notification.reference.model.map(|model| model.as_str()))
            .bind(notification.reference.id)
            .bind(&notification.url)
            .bind(notification.is_read)
            .bind(notification.created_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into_notification())
    }

    async fn list_for_recipient(
        &self,
        recipient: i64,
        page: PageRequest,
    ) -> Result<Page<Notification>, AppError> {
        let sql = format!(
            r#"
            SELECT {} FROM notifications
            WHERE recipient_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
            NOTIFICATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(recipient)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1",
        )
        .bind(recipient)
        .fetch_one(&self.pool)
        .await?;

        Ok(Page::new(
            rows.into_iter()
                .map(NotificationRow::into_notification)
                .collect(),
            total,
        ))
    }

    async fn count_unread(&self, recipient: i64) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND is_read = FALSE",
        )
        .bind(recipient)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Notification>, AppError> {
        let sql = format!(
            "SELECT {} FROM notifications WHERE id = $1",
            NOTIFICATION_COLUMNS
        );
        let row = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(NotificationRow::into_notification))
    }

    async fn mark_read(&self, id: i64) -> Result<Option<Notification>, AppError> {
        let sql = format!(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 RETURNING {}",
            NOTIFICATION_COLUMNS
        );
        let row = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(NotificationRow::into_notification))
    }

    async fn mark_all_read(&self, recipient: i64) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE recipient_id = $1 AND is_read = FALSE",
        )
        .bind(recipient)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_all_for(&self, recipient: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM notifications WHERE recipient_id = $1")
            .bind(recipient)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
