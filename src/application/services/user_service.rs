//! User Service
//!
//! Profiles, account administration and per-user content listings.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::application::dto::request::{UpdateDetailsRequest, UpdateUserRequest};
use crate::domain::services::{AccessPolicy, Actor};
use crate::domain::{
    Language, Page, PageRequest, Post, PostRepository, Thread, ThreadRepository, User,
    UserRepository,
};
use crate::shared::error::AppError;

/// User service trait
#[async_trait]
pub trait UserService: Send + Sync {
    /// Every account, newest first.
    async fn list(&self, page: PageRequest) -> Result<Page<User>, UserError>;

    async fn get_by_id(&self, user_id: i64) -> Result<User, UserError>;

    async fn get_by_username(&self, username: &str) -> Result<User, UserError>;

    /// Partial profile update by the owner or an admin.
    async fn update(
        &self,
        actor: &Actor,
        user_id: i64,
        request: UpdateUserRequest,
    ) -> Result<User, UserError>;

    async fn delete(&self, actor: &Actor, user_id: i64) -> Result<(), UserError>;

    /// Threads started by the user, newest first.
    async fn threads_of(&self, user_id: i64, page: PageRequest)
        -> Result<Page<Thread>, UserError>;

    /// Posts written by the user, newest first.
    async fn posts_of(&self, user_id: i64, page: PageRequest) -> Result<Page<Post>, UserError>;
}

/// User service errors
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("User not found with id of {0}")]
    NotFound(i64),

    #[error("User not found with username of {0}")]
    UsernameNotFound(String),

    #[error("Not authorized to update this user")]
    NotAuthorizedToUpdate,

    #[error("Not authorized to delete this user")]
    NotAuthorizedToDelete,

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(_) | UserError::UsernameNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            UserError::NotAuthorizedToUpdate | UserError::NotAuthorizedToDelete => {
                AppError::Forbidden(err.to_string())
            }
            UserError::Repository(inner) => inner,
        }
    }
}

/// Apply the self-service profile fields to `user`.
///
/// A changed username or email is checked for uniqueness first.
pub(crate) async fn apply_details<U: UserRepository + ?Sized>(
    repo: &U,
    user: &mut User,
    details: UpdateDetailsRequest,
) -> Result<(), AppError> {
    if let Some(username) = details.username {
        if username != user.username {
            if repo.username_exists(&username).await? {
                return Err(AppError::Conflict("Username already exists".into()));
            }
            user.username = username;
        }
    }

    if let Some(email) = details.email {
        if email != user.email {
            if repo.email_exists(&email).await? {
                return Err(AppError::Conflict("Email already exists".into()));
            }
            user.email = email;
        }
    }

    if let Some(bio) = details.bio {
        user.bio = Some(bio);
    }
    if let Some(location) = details.location {
        user.location = Some(location);
    }
    if let Some(language) = details.preferred_language {
        user.preferred_language = Language::from_str(&language);
    }
    if let Some(notifications) = details.notifications {
        user.notifications = notifications;
    }
    user.updated_at = Utc::now();

    Ok(())
}

/// UserService implementation
pub struct UserServiceImpl<U, T, P>
where
    U: UserRepository,
    T: ThreadRepository,
    P: PostRepository,
{
    user_repo: Arc<U>,
    thread_repo: Arc<T>,
    post_repo: Arc<P>,
}

impl<U, T, P> UserServiceImpl<U, T, P>
where
    U: UserRepository,
    T: ThreadRepository,
    P: PostRepository,
{
    pub fn new(user_repo: Arc<U>, thread_repo: Arc<T>, post_repo: Arc<P>) -> Self {
        Self {
            user_repo,
            thread_repo,
            post_repo,
        }
    }

    async fn ensure_exists(&self, user_id: i64) -> Result<User, UserError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(UserError::NotFound(user_id))
    }
}

#[async_trait]
impl<U, T, P> UserService for UserServiceImpl<U, T, P>
where
    U: UserRepository + 'static,
    T: ThreadRepository + 'static,
    P: PostRepository + 'static,
{
    async fn list(&self, page: PageRequest) -> Result<Page<User>, UserError> {
        Ok(self.user_repo.list(page).await?)
    }

    async fn get_by_id(&self, user_id: i64) -> Result<User, UserError> {
        self.ensure_exists(user_id).await
    }

    async fn get_by_username(&self, username: &str) -> Result<User, UserError> {
        self.user_repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| UserError::UsernameNotFound(username.to_string()))
    }

    async fn update(
        &self,
        actor: &Actor,
        user_id: i64,
        request: UpdateUserRequest,
    ) -> Result<User, UserError> {
        let mut user = self.ensure_exists(user_id).await?;

        if !AccessPolicy::can_manage_account(user.id, actor) {
            return Err(UserError::NotAuthorizedToUpdate);
        }

        apply_details(self.user_repo.as_ref(), &mut user, request.details).await?;

        if let Some(avatar) = request.avatar {
            user.avatar = avatar;
        }
        if let Some(role) = request.role {
            if actor.is_admin() {
                user.role = role;
            } else {
                tracing::warn!(actor_id = actor.id, user_id, "Role change ignored for non-admin");
            }
        }

        let user = self.user_repo.update(&user).await?;

        tracing::info!(user_id, actor_id = actor.id, "User updated");

        Ok(user)
    }

    async fn delete(&self, actor: &Actor, user_id: i64) -> Result<(), UserError> {
        let user = self.ensure_exists(user_id).await?;

        if !AccessPolicy::can_manage_account(user.id, actor) {
            return Err(UserError::NotAuthorizedToDelete);
        }

        self.user_repo.delete(user.id).await?;

        tracing::info!(user_id, actor_id = actor.id, "User deleted");

        Ok(())
    }

    async fn threads_of(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> Result<Page<Thread>, UserError> {
        self.ensure_exists(user_id).await?;
        Ok(self.thread_repo.list_by_author(user_id, page).await?)
    }

    async fn posts_of(&self, user_id: i64, page: PageRequest) -> Result<Page<Post>, UserError> {
        self.ensure_exists(user_id).await?;
        Ok(self.post_repo.list_by_author(user_id, page).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::actor;
    use crate::domain::{MockPostRepository, MockThreadRepository, MockUserRepository, Role};
    use mockall::predicate::*;

    type Service = UserServiceImpl<MockUserRepository, MockThreadRepository, MockPostRepository>;

    fn service(repo: MockUserRepository) -> Service {
        UserServiceImpl::new(
            Arc::new(repo),
            Arc::new(MockThreadRepository::new()),
            Arc::new(MockPostRepository::new()),
        )
    }

    fn member(id: i64) -> User {
        User {
            id,
            username: format!("hincha{}", id),
            email: format!("hincha{}@riverforo.com", id),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_missing_user() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));

        let err = service(repo).get_by_id(9).await.unwrap_err();
        assert_eq!(err.to_string(), "User not found with id of 9");
        assert!(matches!(AppError::from(err), AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_by_username_missing() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_username().returning(|_| Ok(None));

        let err = service(repo).get_by_username("nadie").await.unwrap_err();
        assert_eq!(err.to_string(), "User not found with username of nadie");
    }

    #[tokio::test]
    async fn test_update_by_stranger_forbidden() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|id| Ok(Some(member(id))));

        let result = service(repo)
            .update(&actor(2, Role::Moderator), 1, UpdateUserRequest::default())
            .await;
        assert!(matches!(result, Err(UserError::NotAuthorizedToUpdate)));
    }

    #[tokio::test]
    async fn test_member_cannot_promote_self() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|id| Ok(Some(member(id))));
        repo.expect_update().returning(|user| Ok(user.clone()));

        let request = UpdateUserRequest {
            role: Some(Role::Admin),
            avatar: Some("gallardo.png".into()),
            ..Default::default()
        };
        let user = service(repo)
            .update(&actor(1, Role::User), 1, request)
            .await
            .unwrap();
        assert_eq!(user.role, Role::User);
        assert_eq!(user.avatar, "gallardo.png");
    }

    #[tokio::test]
    async fn test_admin_sets_role() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|id| Ok(Some(member(id))));
        repo.expect_update().returning(|user| Ok(user.clone()));

        let request = UpdateUserRequest {
            role: Some(Role::Moderator),
            ..Default::default()
        };
        let user = service(repo)
            .update(&actor(100, Role::Admin), 1, request)
            .await
            .unwrap();
        assert_eq!(user.role, Role::Moderator);
    }

    #[tokio::test]
    async fn test_apply_details_rejects_taken_username() {
        let mut repo = MockUserRepository::new();
        repo.expect_username_exists()
            .with(eq("muñeco"))
            .returning(|_| Ok(true));

        let mut user = member(1);
        let details = UpdateDetailsRequest {
            username: Some("muñeco".into()),
            ..Default::default()
        };
        let err = apply_details(&repo, &mut user, details).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(msg) if msg == "Username already exists"));
    }

    #[tokio::test]
    async fn test_apply_details_skips_unchanged_email() {
        let repo = MockUserRepository::new();
        let mut user = member(1);
        let details = UpdateDetailsRequest {
            email: Some(user.email.clone()),
            bio: Some("Socio vitalicio".into()),
            preferred_language: Some("en".into()),
            ..Default::default()
        };
        apply_details(&repo, &mut user, details).await.unwrap();
        assert_eq!(user.bio.as_deref(), Some("Socio vitalicio"));
        assert_eq!(user.preferred_language, Language::En);
    }

    #[tokio::test]
    async fn test_delete_self() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|id| Ok(Some(member(id))));
        repo.expect_delete().with(eq(3)).times(1).returning(|_| Ok(()));

        service(repo).delete(&actor(3, Role::User), 3).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_other_forbidden() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|id| Ok(Some(member(id))));

        let result = service(repo).delete(&actor(4, Role::Moderator), 3).await;
        assert!(matches!(result, Err(UserError::NotAuthorizedToDelete)));
    }

    #[tokio::test]
    async fn test_threads_of_missing_user() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));

        let result = service(repo).threads_of(5, PageRequest::default()).await;
        assert!(matches!(result, Err(UserError::NotFound(5))));
    }

    #[tokio::test]
    async fn test_posts_of_lists_author_posts() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|id| Ok(Some(member(id))));
        let mut posts = MockPostRepository::new();
        posts
            .expect_list_by_author()
            .with(eq(5), always())
            .returning(|_, _| Ok(Page::new(vec![crate::domain::fixtures::post(1, 5, 9)], 1)));

        let svc = UserServiceImpl::new(
            Arc::new(users),
            Arc::new(MockThreadRepository::new()),
            Arc::new(posts),
        );
        let page = svc.posts_of(5, PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].user.id, 5);
    }
}
