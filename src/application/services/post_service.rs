//! Post Service
//!
//! Replies, edits, likes and the notifications and realtime events they
//! trigger.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use super::notification_service::{NewNotification, Notifier};
use crate::application::dto::request::CreatePostRequest;
use crate::domain::services::{thread_channel, AccessDenied, AccessPolicy, Actor, EventPublisher};
use crate::domain::{
    extract_mentions, CategoryRepository, LikeToggle, Mention, NotificationRepository, Page,
    PageRequest, Post, PostRepository, Thread, ThreadRepository, UserRepository,
};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::shared::snowflake::{self, SnowflakeGenerator};

#[async_trait]
pub trait PostService: Send + Sync {
    /// Newest first.
    async fn list(&self, page: PageRequest) -> Result<Page<Post>, PostError>;

    async fn search(&self, query: Option<&str>, page: PageRequest)
        -> Result<Page<Post>, PostError>;

    async fn get(&self, id: i64, actor: Option<&Actor>) -> Result<Post, PostError>;

    /// Reply to a thread.
    async fn create(&self, actor: &Actor, request: CreatePostRequest) -> Result<Post, PostError>;

    async fn update(&self, actor: &Actor, id: i64, content: String) -> Result<Post, PostError>;

    async fn delete(&self, actor: &Actor, id: i64) -> Result<(), PostError>;

    /// Add or remove the caller's like.
    async fn toggle_like(&self, actor: &Actor, id: i64) -> Result<Post, PostError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PostError {
    #[error("Post not found with id of {0}")]
    NotFound(i64),

    #[error("Thread not found with id of {0}")]
    ThreadNotFound(String),

    #[error("Please provide a search query")]
    MissingQuery,

    #[error("Not authorized to access this post")]
    Unauthenticated,

    #[error("Not authorized to access this post")]
    Forbidden,

    #[error("Thread is locked and cannot be replied to")]
    ThreadLocked,

    #[error("Not authorized to post in this thread")]
    NotAuthorizedToPost,

    #[error("Not authorized to update this post")]
    NotAuthorizedToUpdate,

    #[error("Thread is locked and post cannot be updated")]
    LockedForUpdate,

    #[error("Not authorized to delete this post")]
    NotAuthorizedToDelete,

    #[error("Cannot delete the first post of a thread. Delete the thread instead.")]
    OpeningPost,

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<PostError> for AppError {
    fn from(err: PostError) -> Self {
        match err {
            PostError::NotFound(_) | PostError::ThreadNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            PostError::MissingQuery | PostError::OpeningPost => {
                AppError::BadRequest(err.to_string())
            }
            PostError::Unauthenticated => AppError::Unauthorized(err.to_string()),
            PostError::Forbidden
            | PostError::ThreadLocked
            | PostError::NotAuthorizedToPost
            | PostError::NotAuthorizedToUpdate
            | PostError::LockedForUpdate
            | PostError::NotAuthorizedToDelete => AppError::Forbidden(err.to_string()),
            PostError::Repository(inner) => inner,
        }
    }
}

impl From<AccessDenied> for PostError {
    fn from(denied: AccessDenied) -> Self {
        match denied {
            AccessDenied::Unauthenticated => PostError::Unauthenticated,
            AccessDenied::Forbidden => PostError::Forbidden,
        }
    }
}

/// Extract `@username` mentions and attach the ids of existing users.
pub(crate) async fn resolve_mentions<U: UserRepository + ?Sized>(
    repo: &U,
    content: &str,
) -> Result<Vec<Mention>, AppError> {
    let mut mentions = Vec::new();
    for username in extract_mentions(content) {
        let user = repo.find_by_username(&username).await?.map(|u| u.id);
        mentions.push(Mention { user, username });
    }
    Ok(mentions)
}

pub struct PostServiceImpl<P, T, C, U, N>
where
    P: PostRepository,
    T: ThreadRepository,
    C: CategoryRepository,
    U: UserRepository,
    N: NotificationRepository,
{
    post_repo: Arc<P>,
    thread_repo: Arc<T>,
    category_repo: Arc<C>,
    user_repo: Arc<U>,
    notifier: Notifier<N>,
    publisher: Arc<dyn EventPublisher>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<P, T, C, U, N> PostServiceImpl<P, T, C, U, N>
where
    P: PostRepository,
    T: ThreadRepository,
    C: CategoryRepository,
    U: UserRepository,
    N: NotificationRepository,
{
    pub fn new(
        post_repo: Arc<P>,
        thread_repo: Arc<T>,
        category_repo: Arc<C>,
        user_repo: Arc<U>,
        notifier: Notifier<N>,
        publisher: Arc<dyn EventPublisher>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            post_repo,
            thread_repo,
            category_repo,
            user_repo,
            notifier,
            publisher,
            id_generator,
        }
    }

    async fn load(&self, id: i64) -> Result<Post, PostError> {
        self.post_repo
            .find_by_id(id)
            .await?
            .ok_or(PostError::NotFound(id))
    }

    async fn load_thread(&self, id: i64) -> Result<Thread, PostError> {
        self.thread_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| PostError::ThreadNotFound(id.to_string()))
    }
}

#[async_trait]
impl<P, T, C, U, N> PostService for PostServiceImpl<P, T, C, U, N>
where
    P: PostRepository + 'static,
    T: ThreadRepository + 'static,
    C: CategoryRepository + 'static,
    U: UserRepository + 'static,
    N: NotificationRepository + 'static,
{
    async fn list(&self, page: PageRequest) -> Result<Page<Post>, PostError> {
        Ok(self.post_repo.list(page).await?)
    }

    async fn search(
        &self,
        query: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Post>, PostError> {
        let term = query
            .filter(|q| !q.is_empty())
            .ok_or(PostError::MissingQuery)?;
        Ok(self.post_repo.search(term, page).await?)
    }

    async fn get(&self, id: i64, actor: Option<&Actor>) -> Result<Post, PostError> {
        let post = self.load(id).await?;

        if let Some(thread) = self.thread_repo.find_by_id(post.thread.id).await? {
            if let Some(category) = self.category_repo.find_by_id(thread.category.id).await? {
                AccessPolicy::can_view(&category, actor)?;
            }
        }

        Ok(post)
    }

    async fn create(&self, actor: &Actor, request: CreatePostRequest) -> Result<Post, PostError> {
        let thread_id = snowflake::from_string(&request.thread_id)
            .map_err(|_| PostError::ThreadNotFound(request.thread_id.clone()))?;
        let thread = self.load_thread(thread_id).await?;

        if !AccessPolicy::can_write_to_locked(thread.is_locked, actor) {
            return Err(PostError::ThreadLocked);
        }
        if let Some(category) = self.category_repo.find_by_id(thread.category.id).await? {
            if !AccessPolicy::can_post_in(&category, actor) {
                return Err(PostError::NotAuthorizedToPost);
            }
        }

        let mentions = resolve_mentions(self.user_repo.as_ref(), &request.content).await?;
        let now = Utc::now();
        let post = Post {
            id: self.id_generator.generate(),
            content: request.content,
            user: actor.snapshot(),
            thread: thread.snapshot(),
            likes: Vec::new(),
            mentions,
            attachments: request.attachments,
            is_edited: false,
            edit_history: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let post = self.post_repo.create_reply(&post, thread.category.id).await?;
        metrics::record_post_created();

        tracing::info!(
            post_id = post.id,
            thread_id = thread.id,
            user_id = actor.id,
            "Post created"
        );

        self.notifier
            .notify_mentions(&post.user, &post.mentions, &post.thread, post.id)
            .await;

        if !thread.is_owned_by(actor.id) {
            self.notifier
                .notify(NewNotification::reply(
                    post.user.clone(),
                    thread.user.id,
                    &post.thread,
                    post.id,
                ))
                .await;
        }

        self.publisher.publish(
            &thread_channel(thread.id),
            "new-post",
            json!({
                "post": {
                    "_id": post.id.to_string(),
                    "content": post.content,
                    "user": post.user,
                    "createdAt": post.created_at,
                }
            }),
        );

        Ok(post)
    }

    async fn update(&self, actor: &Actor, id: i64, content: String) -> Result<Post, PostError> {
        let mut post = self.load(id).await?;

        if !AccessPolicy::can_modify(post.user.id, actor) {
            return Err(PostError::NotAuthorizedToUpdate);
        }

        if let Some(thread) = self.thread_repo.find_by_id(post.thread.id).await? {
            if !AccessPolicy::can_write_to_locked(thread.is_locked, actor) {
                return Err(PostError::LockedForUpdate);
            }
        }

        let mentions = resolve_mentions(self.user_repo.as_ref(), &content).await?;
        post.edit(content, mentions, Utc::now());
        let post = self.post_repo.update(&post).await?;

        tracing::info!(post_id = id, user_id = actor.id, "Post updated");

        self.publisher.publish(
            &thread_channel(post.thread.id),
            "update-post",
            json!({
                "post": {
                    "_id": post.id.to_string(),
                    "content": post.content,
                    "isEdited": post.is_edited,
                    "updatedAt": post.updated_at,
                }
            }),
        );

        Ok(post)
    }

    async fn delete(&self, actor: &Actor, id: i64) -> Result<(), PostError> {
        let post = self.load(id).await?;

        if !AccessPolicy::can_modify(post.user.id, actor) {
            return Err(PostError::NotAuthorizedToDelete);
        }

        if self.post_repo.opening_post_id(post.thread.id).await? == Some(post.id) {
            return Err(PostError::OpeningPost);
        }

        let thread = self.load_thread(post.thread.id).await?;
        self.post_repo.delete_reply(&post, thread.category.id).await?;

        tracing::info!(post_id = id, thread_id = thread.id, user_id = actor.id, "Post deleted");

        self.publisher.publish(
            &thread_channel(thread.id),
            "delete-post",
            json!({ "postId": post.id.to_string() }),
        );

        Ok(())
    }

    async fn toggle_like(&self, actor: &Actor, id: i64) -> Result<Post, PostError> {
        let LikeToggle {
            post,
            liked,
            thread_like_count: like_count,
        } = self
            .post_repo
            .toggle_like(id, &actor.snapshot(), Utc::now())
            .await?
            .ok_or(PostError::NotFound(id))?;

        if liked && !post.is_owned_by(actor.id) {
            self.notifier
                .notify(NewNotification::like(
                    actor.snapshot(),
                    post.user.id,
                    &post.thread,
                    post.id,
                ))
                .await;
        }

        tracing::info!(post_id = id, user_id = actor.id, liked, like_count, "Post like toggled");

        self.publisher.publish(
            &thread_channel(post.thread.id),
            "update-likes",
            json!({
                "postId": post.id.to_string(),
                "likes": post.likes,
            }),
        );

        Ok(post)
    }
}
