//! Thread Service
//!
//! Thread listing, viewing and moderation. Creating a thread also writes its
//! opening post.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use super::notification_service::Notifier;
use super::post_service::resolve_mentions;
use crate::application::dto::request::{CreateThreadRequest, UpdateThreadRequest};
use crate::domain::services::{AccessDenied, AccessPolicy, Actor, EventPublisher, FORUM_CHANNEL};
use crate::domain::{
    slugify, with_suffix, CategoryRepository, LastPost, NotificationRepository, Page,
    PageRequest, Post, PostRepository, Thread, ThreadFlag, ThreadRepository, UserRepository,
};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::shared::snowflake::{self, SnowflakeGenerator};

const MAX_SLUG_ATTEMPTS: u32 = 50;

#[async_trait]
pub trait ThreadService: Send + Sync {
    /// Sticky first, then most recently updated.
    async fn list(&self, page: PageRequest) -> Result<Page<Thread>, ThreadError>;

    async fn search(&self, query: Option<&str>, page: PageRequest)
        -> Result<Page<Thread>, ThreadError>;

    /// Fetch a visible thread and count the view.
    async fn get(&self, id: i64, actor: Option<&Actor>) -> Result<Thread, ThreadError>;

    async fn get_by_slug(&self, slug: &str, actor: Option<&Actor>)
        -> Result<Thread, ThreadError>;

    /// Posts of a visible thread, oldest first.
    async fn posts_of(
        &self,
        id: i64,
        actor: Option<&Actor>,
        page: PageRequest,
    ) -> Result<Page<Post>, ThreadError>;

    async fn create(&self, actor: &Actor, request: CreateThreadRequest)
        -> Result<Thread, ThreadError>;

    async fn update(
        &self,
        actor: &Actor,
        id: i64,
        request: UpdateThreadRequest,
    ) -> Result<Thread, ThreadError>;

    async fn delete(&self, actor: &Actor, id: i64) -> Result<(), ThreadError>;

    async fn toggle_sticky(&self, actor: &Actor, id: i64) -> Result<Thread, ThreadError>;

    async fn toggle_lock(&self, actor: &Actor, id: i64) -> Result<Thread, ThreadError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ThreadError {
    #[error("Thread not found with id of {0}")]
    NotFound(i64),

    #[error("Thread not found with slug of {0}")]
    SlugNotFound(String),

    #[error("Category not found with id of {0}")]
    CategoryNotFound(String),

    #[error("Please provide a search query")]
    MissingQuery,

    #[error("Not authorized to access this thread")]
    Unauthenticated,

    #[error("Not authorized to access this thread")]
    Forbidden,

    #[error("Not authorized to post in this category")]
    NotAuthorizedToPost,

    #[error("Not authorized to update this thread")]
    NotAuthorizedToUpdate,

    #[error("Thread is locked and cannot be updated")]
    Locked,

    #[error("Not authorized to delete this thread")]
    NotAuthorizedToDelete,

    #[error("Could not generate a unique slug")]
    SlugExhausted,

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<ThreadError> for AppError {
    fn from(err: ThreadError) -> Self {
        match err {
            ThreadError::NotFound(_)
            | ThreadError::SlugNotFound(_)
            | ThreadError::CategoryNotFound(_) => AppError::NotFound(err.to_string()),
            ThreadError::MissingQuery => AppError::BadRequest(err.to_string()),
            ThreadError::Unauthenticated => AppError::Unauthorized(err.to_string()),
            ThreadError::Forbidden
            | ThreadError::NotAuthorizedToPost
            | ThreadError::NotAuthorizedToUpdate
            | ThreadError::Locked
            | ThreadError::NotAuthorizedToDelete => AppError::Forbidden(err.to_string()),
            ThreadError::SlugExhausted => AppError::Conflict(err.to_string()),
            ThreadError::Repository(inner) => inner,
        }
    }
}

impl From<AccessDenied> for ThreadError {
    fn from(denied: AccessDenied) -> Self {
        match denied {
            AccessDenied::Unauthenticated => ThreadError::Unauthenticated,
            AccessDenied::Forbidden => ThreadError::Forbidden,
        }
    }
}

pub struct ThreadServiceImpl<T, P, C, U, N>
where
    T: ThreadRepository,
    P: PostRepository,
    C: CategoryRepository,
    U: UserRepository,
    N: NotificationRepository,
{
    thread_repo: Arc<T>,
    post_repo: Arc<P>,
    category_repo: Arc<C>,
    user_repo: Arc<U>,
    notifier: Notifier<N>,
    publisher: Arc<dyn EventPublisher>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<T, P, C, U, N> ThreadServiceImpl<T, P, C, U, N>
where
    T: ThreadRepository,
    P: PostRepository,
    C: CategoryRepository,
    U: UserRepository,
    N: NotificationRepository,
{
    pub fn new(
        thread_repo: Arc<T>,
        post_repo: Arc<P>,
        category_repo: Arc<C>,
        user_repo: Arc<U>,
        notifier: Notifier<N>,
        publisher: Arc<dyn EventPublisher>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            thread_repo,
            post_repo,
            category_repo,
            user_repo,
            notifier,
            publisher,
            id_generator,
        }
    }

    async fn load(&self, id: i64) -> Result<Thread, ThreadError> {
        self.thread_repo
            .find_by_id(id)
            .await?
            .ok_or(ThreadError::NotFound(id))
    }

    /// Threads whose category no longer exists are treated as public.
    async fn ensure_visible(&self, thread: &Thread, actor: Option<&Actor>) -> Result<(), ThreadError> {
        if let Some(category) = self.category_repo.find_by_id(thread.category.id).await? {
            AccessPolicy::can_view(&category, actor)?;
        }
        Ok(())
    }

    async fn record_view(&self, thread: Thread) -> Result<Thread, ThreadError> {
        self.thread_repo
            .increment_views(thread.id)
            .await?
            .ok_or(ThreadError::NotFound(thread.id))
    }

    async fn unique_slug(&self, title: &str) -> Result<String, ThreadError> {
        let base = slugify(title, "hilo");
        for attempt in 1..=MAX_SLUG_ATTEMPTS {
            let candidate = with_suffix(&base, attempt);
            if !self.thread_repo.slug_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        Err(ThreadError::SlugExhausted)
    }

    async fn load_for_moderation(&self, actor: &Actor, id: i64) -> Result<Thread, ThreadError> {
        let thread = self.load(id).await?;
        if !AccessPolicy::can_modify(thread.user.id, actor) {
            return Err(ThreadError::NotAuthorizedToUpdate);
        }
        Ok(thread)
    }
}

#[async_trait]
impl<T, P, C, U, N> ThreadService for ThreadServiceImpl<T, P, C, U, N>
where
    T: ThreadRepository + 'static,
    P: PostRepository + 'static,
    C: CategoryRepository + 'static,
    U: UserRepository + 'static,
    N: NotificationRepository + 'static,
{
    async fn list(&self, page: PageRequest) -> Result<Page<Thread>, ThreadError> {
        Ok(self.thread_repo.list(page).await?)
    }

    async fn search(
        &self,
        query: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Thread>, ThreadError> {
        let term = query
            .filter(|q| !q.is_empty())
            .ok_or(ThreadError::MissingQuery)?;
        Ok(self.thread_repo.search(term, page).await?)
    }

    async fn get(&self, id: i64, actor: Option<&Actor>) -> Result<Thread, ThreadError> {
        let thread = self.load(id).await?;
        self.ensure_visible(&thread, actor).await?;
        self.record_view(thread).await
    }

    async fn get_by_slug(
        &self,
        slug: &str,
        actor: Option<&Actor>,
    ) -> Result<Thread, ThreadError> {
        let thread = self
            .thread_repo
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| ThreadError::SlugNotFound(slug.to_string()))?;
        self.ensure_visible(&thread, actor).await?;
        self.record_view(thread).await
    }

    async fn posts_of(
        &self,
        id: i64,
        actor: Option<&Actor>,
        page: PageRequest,
    ) -> Result<Page<Post>, ThreadError> {
        let thread = self.load(id).await?;
        self.ensure_visible(&thread, actor).await?;
        Ok(self.post_repo.list_by_thread(thread.id, page).await?)
    }

    async fn create(
        &self,
        actor: &Actor,
        request: CreateThreadRequest,
    ) -> Result<Thread, ThreadError> {
        let category_id = snowflake::from_string(&request.category_id)
            .map_err(|_| ThreadError::CategoryNotFound(request.category_id.clone()))?;
        let category = self
            .category_repo
            .find_by_id(category_id)
            .await?
            .ok_or_else(|| ThreadError::CategoryNotFound(request.category_id.clone()))?;

        if !AccessPolicy::can_post_in(&category, actor) {
            return Err(ThreadError::NotAuthorizedToPost);
        }

        let title = request.title.trim().to_string();
        let slug = self.unique_slug(&title).await?;
        let mentions = resolve_mentions(self.user_repo.as_ref(), &request.content).await?;
        let author = actor.snapshot();
        let now = Utc::now();

        let thread_id = self.id_generator.generate();
        let post_id = self.id_generator.generate();
        let thread = Thread {
            id: thread_id,
            title,
            slug,
            content: request.content.clone(),
            user: author.clone(),
            category: category.snapshot(),
            tags: request.tags,
            last_post: Some(LastPost {
                id: post_id,
                user: author.clone(),
                created_at: now,
            }),
            view_count: 0,
            post_count: 1,
            like_count: 0,
            is_sticky: false,
            is_locked: false,
            is_announcement: false,
            created_at: now,
            updated_at: now,
        };
        let opening_post = Post {
            id: post_id,
            content: request.content,
            user: author,
            thread: thread.snapshot(),
            likes: Vec::new(),
            mentions,
            attachments: Vec::new(),
            is_edited: false,
            edit_history: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let thread = self
            .thread_repo
            .create_with_opening_post(&thread, &opening_post)
            .await?;
        metrics::record_thread_created();
        metrics::record_post_created();

        tracing::info!(
            thread_id = thread.id,
            category_id = category.id,
            user_id = actor.id,
            "Thread created"
        );

        self.notifier
            .notify_mentions(
                &opening_post.user,
                &opening_post.mentions,
                &thread.snapshot(),
                opening_post.id,
            )
            .await;

        self.publisher.publish(
            FORUM_CHANNEL,
            "new-thread",
            json!({
                "thread": {
                    "_id": thread.id.to_string(),
                    "title": thread.title,
                    "slug": thread.slug,
                    "category": thread.category,
                    "user": thread.user,
                    "createdAt": thread.created_at,
                }
            }),
        );

        Ok(thread)
    }

    async fn update(
        &self,
        actor: &Actor,
        id: i64,
        request: UpdateThreadRequest,
    ) -> Result<Thread, ThreadError> {
        let mut thread = self.load_for_moderation(actor, id).await?;

        if !AccessPolicy::can_write_to_locked(thread.is_locked, actor) {
            return Err(ThreadError::Locked);
        }

        if let Some(title) = request.title {
            thread.title = title.trim().to_string();
        }
        if let Some(content) = request.content {
            thread.content = content;
        }
        if let Some(tags) = request.tags {
            thread.tags = tags;
        }
        if let Some(is_announcement) = request.is_announcement {
            if actor.is_staff() {
                thread.is_announcement = is_announcement;
            }
        }
        thread.updated_at = Utc::now();

        let thread = self.thread_repo.update(&thread).await?;

        tracing::info!(thread_id = id, user_id = actor.id, "Thread updated");

        Ok(thread)
    }

    async fn delete(&self, actor: &Actor, id: i64) -> Result<(), ThreadError> {
        let thread = self.load(id).await?;

        if !AccessPolicy::can_modify(thread.user.id, actor) {
            return Err(ThreadError::NotAuthorizedToDelete);
        }

        let removed_posts = self.thread_repo.delete_with_posts(&thread).await?;

        tracing::info!(thread_id = id, user_id = actor.id, removed_posts, "Thread deleted");

        Ok(())
    }

    async fn toggle_sticky(&self, actor: &Actor, id: i64) -> Result<Thread, ThreadError> {
        let thread = self
            .thread_repo
            .toggle_flag(id, ThreadFlag::Sticky)
            .await?
            .ok_or(ThreadError::NotFound(id))?;

        tracing::info!(thread_id = id, user_id = actor.id, sticky = thread.is_sticky, "Thread sticky toggled");

        Ok(thread)
    }

    async fn toggle_lock(&self, actor: &Actor, id: i64) -> Result<Thread, ThreadError> {
        let thread = self
            .thread_repo
            .toggle_flag(id, ThreadFlag::Locked)
            .await?
            .ok_or(ThreadError::NotFound(id))?;

        tracing::info!(thread_id = id, user_id = actor.id, locked = thread.is_locked, "Thread lock toggled");

        Ok(thread)
    }
}
