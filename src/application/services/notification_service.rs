//! Notification Service
//!
//! The recipient's inbox plus [`Notifier`], which stores a notification and
//! pushes it to the recipient's private channel.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use crate::domain::services::{user_channel, Actor, EventPublisher};
use crate::domain::{
    Mention, Notification, NotificationKind, NotificationRepository, Page, PageRequest,
    Reference, ThreadSnapshot, UserSnapshot,
};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Notification service trait
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn list(&self, actor: &Actor, page: PageRequest)
        -> Result<Page<Notification>, NotificationError>;

    async fn unread_count(&self, actor: &Actor) -> Result<i64, NotificationError>;

    async fn mark_read(&self, actor: &Actor, id: i64) -> Result<Notification, NotificationError>;

    async fn mark_all_read(&self, actor: &Actor) -> Result<(), NotificationError>;

    async fn delete(&self, actor: &Actor, id: i64) -> Result<(), NotificationError>;

    async fn delete_all(&self, actor: &Actor) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification not found with id of {0}")]
    NotFound(i64),

    #[error("Not authorized to access this notification")]
    NotAuthorizedToAccess,

    #[error("Not authorized to delete this notification")]
    NotAuthorizedToDelete,

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::NotFound(_) => AppError::NotFound(err.to_string()),
            NotificationError::NotAuthorizedToAccess | NotificationError::NotAuthorizedToDelete => {
                AppError::Forbidden(err.to_string())
            }
            NotificationError::Repository(inner) => inner,
        }
    }
}

pub struct NotificationServiceImpl<N>
where
    N: NotificationRepository,
{
    repo: Arc<N>,
}

impl<N> NotificationServiceImpl<N>
where
    N: NotificationRepository,
{
    pub fn new(repo: Arc<N>) -> Self {
        Self { repo }
    }

    async fn load(&self, id: i64) -> Result<Notification, NotificationError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(NotificationError::NotFound(id))
    }
}

#[async_trait]
impl<N> NotificationService for NotificationServiceImpl<N>
where
    N: NotificationRepository + 'static,
{
    async fn list(
        &self,
        actor: &Actor,
        page: PageRequest,
    ) -> Result<Page<Notification>, NotificationError> {
        Ok(self.repo.list_for_recipient(actor.id, page).await?)
    }

    async fn unread_count(&self, actor: &Actor) -> Result<i64, NotificationError> {
        Ok(self.repo.count_unread(actor.id).await?)
    }

    async fn mark_read(&self, actor: &Actor, id: i64) -> Result<Notification, NotificationError> {
        let notification = self.load(id).await?;
        if notification.recipient != actor.id {
            return Err(NotificationError::NotAuthorizedToAccess);
        }

        self.repo
            .mark_read(id)
            .await?
            .ok_or(NotificationError::NotFound(id))
    }

    async fn mark_all_read(&self, actor: &Actor) -> Result<(), NotificationError> {
        let updated = self.repo.mark_all_read(actor.id).await?;
        tracing::info!(user_id = actor.id, updated, "Notifications marked read");
        Ok(())
    }

    async fn delete(&self, actor: &Actor, id: i64) -> Result<(), NotificationError> {
        let notification = self.load(id).await?;
        if notification.recipient != actor.id {
            return Err(NotificationError::NotAuthorizedToDelete);
        }

        self.repo.delete(id).await?;
        tracing::info!(user_id = actor.id, notification_id = id, "Notification deleted");
        Ok(())
    }

    async fn delete_all(&self, actor: &Actor) -> Result<(), NotificationError> {
        let deleted = self.repo.delete_all_for(actor.id).await?;
        tracing::info!(user_id = actor.id, deleted, "Notifications cleared");
        Ok(())
    }
}

/// A notification about to be stored, plus the short text pushed live.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub recipient: i64,
    pub sender: UserSnapshot,
    pub title: String,
    pub message: String,
    pub push_message: String,
    pub url: String,
    pub reference: Reference,
}

impl NewNotification {
    pub fn mention(
        sender: UserSnapshot,
        recipient: i64,
        thread: &ThreadSnapshot,
        post_id: i64,
    ) -> Self {
        Self {
            kind: NotificationKind::Mention,
            recipient,
            title: "You were mentioned in a post".into(),
            message: format!("{} mentioned you in \"{}\"", sender.username, thread.title),
            push_message: format!("{} mentioned you in a post", sender.username),
            url: thread.post_url(post_id),
            reference: Reference::post(post_id),
            sender,
        }
    }

    pub fn reply(
        sender: UserSnapshot,
        recipient: i64,
        thread: &ThreadSnapshot,
        post_id: i64,
    ) -> Self {
        Self {
            kind: NotificationKind::Reply,
            recipient,
            title: "New reply to your thread".into(),
            message: format!(
                "{} replied to your thread \"{}\"",
                sender.username, thread.title
            ),
            push_message: format!("{} replied to your thread", sender.username),
            url: thread.post_url(post_id),
            reference: Reference::post(post_id),
            sender,
        }
    }

    pub fn like(
        sender: UserSnapshot,
        recipient: i64,
        thread: &ThreadSnapshot,
        post_id: i64,
    ) -> Self {
        Self {
            kind: NotificationKind::Like,
            recipient,
            title: "Someone liked your post".into(),
            message: format!("{} liked your post in \"{}\"", sender.username, thread.title),
            push_message: format!("{} liked your post", sender.username),
            url: thread.post_url(post_id),
            reference: Reference::post(post_id),
            sender,
        }
    }
}

/// Stores notifications and pushes `new-notification` to `user-{id}`.
pub struct Notifier<N>
where
    N: NotificationRepository,
{
    repo: Arc<N>,
    publisher: Arc<dyn EventPublisher>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<N> Notifier<N>
where
    N: NotificationRepository,
{
    pub fn new(
        repo: Arc<N>,
        publisher: Arc<dyn EventPublisher>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            repo,
            publisher,
            id_generator,
        }
    }

    /// One `mention` notification per resolved mention.
    pub async fn notify_mentions(
        &self,
        sender: &UserSnapshot,
        mentions: &[Mention],
        thread: &ThreadSnapshot,
        post_id: i64,
    ) {
        for recipient in mentions.iter().filter_map(|m| m.user) {
            self.notify(NewNotification::mention(
                sender.clone(),
                recipient,
                thread,
                post_id,
            ))
            .await;
        }
    }

    /// Insert and push. The content that triggered it is already committed,
    /// so a failed insert is logged and the push skipped.
    pub async fn notify(&self, new: NewNotification) {
        let notification = Notification {
            id: self.id_generator.generate(),
            kind: new.kind,
            title: new.title,
            message: new.message,
            recipient: new.recipient,
            sender: Some(new.sender),
            reference: new.reference,
            url: Some(new.url),
            is_read: false,
            created_at: Utc::now(),
        };

        match self.repo.create(&notification).await {
            Ok(stored) => {
                metrics::record_notification_created(stored.kind.as_str());
                tracing::info!(
                    notification_id = stored.id,
                    recipient = stored.recipient,
                    kind = stored.kind.as_str(),
                    "Notification created"
                );
                self.publisher.publish(
                    &user_channel(stored.recipient),
                    "new-notification",
                    json!({ "message": new.push_message }),
                );
            }
            Err(e) => {
                tracing::warn!(
                    recipient = new.recipient,
                    kind = new.kind.as_str(),
                    error = %e,
                    "Notification could not be stored"
                );
            }
        }
    }
}
