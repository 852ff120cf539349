//! Category Service
//!
//! Bilingual forum sections, their ordering and private-category access.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::application::dto::request::{
    CategoryDescriptionInput, CategoryNameInput, CreateCategoryRequest, ReorderCategoriesRequest,
    UpdateCategoryRequest,
};
use crate::domain::services::{AccessDenied, AccessPolicy, Actor};
use crate::domain::{
    slugify, with_suffix, Category, CategoryRepository, LocalizedText, Page, PageRequest, Thread,
    ThreadRepository,
};
use crate::shared::error::AppError;
use crate::shared::snowflake::{self, SnowflakeGenerator};

/// Gives up looking for a free slug after this many suffixes.
const MAX_SLUG_ATTEMPTS: u32 = 50;

#[async_trait]
pub trait CategoryService: Send + Sync {
    /// Every category, `order` ascending.
    async fn list(&self) -> Result<Vec<Category>, CategoryError>;

    async fn get(&self, id: i64) -> Result<Category, CategoryError>;

    async fn get_by_slug(&self, slug: &str, actor: Option<&Actor>)
        -> Result<Category, CategoryError>;

    /// Threads of a visible category, sticky first.
    async fn threads_of(
        &self,
        id: i64,
        actor: Option<&Actor>,
        page: PageRequest,
    ) -> Result<Page<Thread>, CategoryError>;

    async fn create(&self, request: CreateCategoryRequest) -> Result<Category, CategoryError>;

    async fn update(&self, id: i64, request: UpdateCategoryRequest)
        -> Result<Category, CategoryError>;

    async fn delete(&self, id: i64) -> Result<(), CategoryError>;

    /// Apply new `order` values and return the re-sorted list.
    async fn reorder(&self, request: ReorderCategoriesRequest)
        -> Result<Vec<Category>, CategoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CategoryError {
    #[error("Category not found with id of {0}")]
    NotFound(i64),

    #[error("Category not found with slug of {0}")]
    SlugNotFound(String),

    #[error("Not authorized to access this category")]
    Unauthenticated,

    #[error("Not authorized to access this category")]
    Forbidden,

    #[error("Cannot delete category with existing threads")]
    HasThreads,

    #[error("Please provide category orders array")]
    MissingOrders,

    #[error("Invalid category id {0}")]
    InvalidId(String),

    #[error("Could not generate a unique slug")]
    SlugExhausted,

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<CategoryError> for AppError {
    fn from(err: CategoryError) -> Self {
        match err {
            CategoryError::NotFound(_) | CategoryError::SlugNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            CategoryError::Unauthenticated => AppError::Unauthorized(err.to_string()),
            CategoryError::Forbidden => AppError::Forbidden(err.to_string()),
            CategoryError::HasThreads
            | CategoryError::MissingOrders
            | CategoryError::InvalidId(_) => AppError::BadRequest(err.to_string()),
            CategoryError::SlugExhausted => AppError::Conflict(err.to_string()),
            CategoryError::Repository(inner) => inner,
        }
    }
}

impl From<AccessDenied> for CategoryError {
    fn from(denied: AccessDenied) -> Self {
        match denied {
            AccessDenied::Unauthenticated => CategoryError::Unauthenticated,
            AccessDenied::Forbidden => CategoryError::Forbidden,
        }
    }
}

fn localized_name(input: CategoryNameInput) -> LocalizedText {
    LocalizedText::new(input.es.trim(), input.en.trim())
}

fn localized_description(input: CategoryDescriptionInput) -> LocalizedText {
    LocalizedText::new(input.es, input.en)
}

fn parse_id(raw: &str) -> Result<i64, CategoryError> {
    snowflake::from_string(raw).map_err(|_| CategoryError::InvalidId(raw.to_string()))
}

pub struct CategoryServiceImpl<C, T>
where
    C: CategoryRepository,
    T: ThreadRepository,
{
    category_repo: Arc<C>,
    thread_repo: Arc<T>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<C, T> CategoryServiceImpl<C, T>
where
    C: CategoryRepository,
    T: ThreadRepository,
{
    pub fn new(
        category_repo: Arc<C>,
        thread_repo: Arc<T>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            category_repo,
            thread_repo,
            id_generator,
        }
    }

    async fn load(&self, id: i64) -> Result<Category, CategoryError> {
        self.category_repo
            .find_by_id(id)
            .await?
            .ok_or(CategoryError::NotFound(id))
    }

    async fn unique_slug(&self, name: &str) -> Result<String, CategoryError> {
        let base = slugify(name, "categoria");
        for attempt in 1..=MAX_SLUG_ATTEMPTS {
            let candidate = with_suffix(&base, attempt);
            if !self.category_repo.slug_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        Err(CategoryError::SlugExhausted)
    }
}

#[async_trait]
impl<C, T> CategoryService for CategoryServiceImpl<C, T>
where
    C: CategoryRepository + 'static,
    T: ThreadRepository + 'static,
{
    async fn list(&self) -> Result<Vec<Category>, CategoryError> {
        Ok(self.category_repo.list_all().await?)
    }

    async fn get(&self, id: i64) -> Result<Category, CategoryError> {
        self.load(id).await
    }

    async fn get_by_slug(
        &self,
        slug: &str,
        actor: Option<&Actor>,
    ) -> Result<Category, CategoryError> {
        let category = self
            .category_repo
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| CategoryError::SlugNotFound(slug.to_string()))?;

        AccessPolicy::can_view(&category, actor)?;

        Ok(category)
    }

    async fn threads_of(
        &self,
        id: i64,
        actor: Option<&Actor>,
        page: PageRequest,
    ) -> Result<Page<Thread>, CategoryError> {
        let category = self.load(id).await?;
        AccessPolicy::can_view(&category, actor)?;

        Ok(self.thread_repo.list_by_category(category.id, page).await?)
    }

    async fn create(&self, request: CreateCategoryRequest) -> Result<Category, CategoryError> {
        let name = localized_name(request.name);
        let slug = self.unique_slug(&name.es).await?;
        let parent_category = request
            .parent_category
            .as_deref()
            .map(parse_id)
            .transpose()?;

        let now = Utc::now();
        let defaults = Category::default();
        let category = Category {
            id: self.id_generator.generate(),
            name,
            description: localized_description(request.description),
            slug,
            icon: request.icon.unwrap_or(defaults.icon),
            color: request.color.unwrap_or(defaults.color),
            order: request.order.unwrap_or(0),
            is_private: request.is_private.unwrap_or(false),
            allowed_roles: request.allowed_roles.unwrap_or(defaults.allowed_roles),
            parent_category,
            created_at: now,
            updated_at: now,
            ..Default::default()
        };

        let category = self.category_repo.create(&category).await?;

        tracing::info!(category_id = category.id, slug = %category.slug, "Category created");

        Ok(category)
    }

    async fn update(
        &self,
        id: i64,
        request: UpdateCategoryRequest,
    ) -> Result<Category, CategoryError> {
        let mut category = self.load(id).await?;

        if let Some(name) = request.name {
            category.name = localized_name(name);
        }
        if let Some(description) = request.description {
            category.description = localized_description(description);
        }
        if let Some(icon) = request.icon {
            category.icon = icon;
        }
        if let Some(color) = request.color {
            category.color = color;
        }
        if let Some(order) = request.order {
            category.order = order;
        }
        if let Some(is_private) = request.is_private {
            category.is_private = is_private;
        }
        if let Some(roles) = request.allowed_roles {
            category.allowed_roles = roles;
        }
        if let Some(parent) = request.parent_category.as_deref() {
            category.parent_category = Some(parse_id(parent)?);
        }
        category.updated_at = Utc::now();

        let category = self.category_repo.update(&category).await?;

        tracing::info!(category_id = id, "Category updated");

        Ok(category)
    }

    async fn delete(&self, id: i64) -> Result<(), CategoryError> {
        let category = self.load(id).await?;

        if self.thread_repo.count_by_category(category.id).await? > 0 {
            return Err(CategoryError::HasThreads);
        }

        self.category_repo.delete(category.id).await?;

        tracing::info!(category_id = id, "Category deleted");

        Ok(())
    }

    async fn reorder(
        &self,
        request: ReorderCategoriesRequest,
    ) -> Result<Vec<Category>, CategoryError> {
        let orders = request
            .category_orders
            .ok_or(CategoryError::MissingOrders)?
            .into_iter()
            .map(|entry| Ok((parse_id(&entry.id)?, entry.order)))
            .collect::<Result<Vec<_>, CategoryError>>()?;

        self.category_repo.reorder(&orders).await?;

        tracing::info!(count = orders.len(), "Categories reordered");

        Ok(self.category_repo.list_all().await?)
    }
}
