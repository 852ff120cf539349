//! Ad Service
//!
//! Ad placement CRUD, live-ad lookup and impression/click counters.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::application::dto::request::{CreateAdRequest, UpdateAdRequest};
use crate::domain::{AdLocation, AdPlacement, AdRepository, AdStats};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

#[async_trait]
pub trait AdService: Send + Sync {
    /// Live ads, optionally for one location, `displayOrder` ascending.
    async fn list_active(&self, location: Option<&str>) -> Result<Vec<AdPlacement>, AdError>;

    async fn get(&self, id: i64) -> Result<AdPlacement, AdError>;

    async fn create(&self, request: CreateAdRequest) -> Result<AdPlacement, AdError>;

    async fn update(&self, id: i64, request: UpdateAdRequest) -> Result<AdPlacement, AdError>;

    async fn delete(&self, id: i64) -> Result<(), AdError>;

    async fn record_impression(&self, id: i64) -> Result<(), AdError>;

    async fn record_click(&self, id: i64) -> Result<(), AdError>;

    async fn stats(&self) -> Result<AdStats, AdError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AdError {
    #[error("Ad not found with id of {0}")]
    NotFound(i64),

    #[error("{0}")]
    InvalidLocation(String),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<AdError> for AppError {
    fn from(err: AdError) -> Self {
        match err {
            AdError::NotFound(_) => AppError::NotFound(err.to_string()),
            AdError::InvalidLocation(msg) => AppError::BadRequest(msg),
            AdError::Repository(inner) => inner,
        }
    }
}

pub struct AdServiceImpl<A>
where
    A: AdRepository,
{
    ad_repo: Arc<A>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<A> AdServiceImpl<A>
where
    A: AdRepository,
{
    pub fn new(ad_repo: Arc<A>, id_generator: Arc<SnowflakeGenerator>) -> Self {
        Self {
            ad_repo,
            id_generator,
        }
    }

    async fn load(&self, id: i64) -> Result<AdPlacement, AdError> {
        self.ad_repo
            .find_by_id(id)
            .await?
            .ok_or(AdError::NotFound(id))
    }
}

#[async_trait]
impl<A> AdService for AdServiceImpl<A>
where
    A: AdRepository + 'static,
{
    async fn list_active(&self, location: Option<&str>) -> Result<Vec<AdPlacement>, AdError> {
        let location = location
            .map(str::parse::<AdLocation>)
            .transpose()
            .map_err(AdError::InvalidLocation)?;

        Ok(self.ad_repo.list_active(Utc::now(), location).await?)
    }

    async fn get(&self, id: i64) -> Result<AdPlacement, AdError> {
        self.load(id).await
    }

    async fn create(&self, request: CreateAdRequest) -> Result<AdPlacement, AdError> {
        let now = Utc::now();
        let defaults = AdPlacement::default();
        let ad = AdPlacement {
            id: self.id_generator.generate(),
            name: request.name.trim().to_string(),
            location: request.location,
            ad_code: request.ad_code,
            is_active: request.is_active.unwrap_or(true),
            start_date: request.start_date.unwrap_or(now),
            end_date: request.end_date,
            target_pages: request.target_pages.unwrap_or(defaults.target_pages),
            display_order: request.display_order.unwrap_or(0),
            created_at: now,
            updated_at: now,
            ..Default::default()
        };

        let ad = self.ad_repo.create(&ad).await?;

        tracing::info!(ad_id = ad.id, location = %ad.location, "Ad placement created");

        Ok(ad)
    }

    async fn update(&self, id: i64, request: UpdateAdRequest) -> Result<AdPlacement, AdError> {
        let mut ad = self.load(id).await?;

        if let Some(name) = request.name {
            ad.name = name.trim().to_string();
        }
        if let Some(location) = request.location {
            ad.location = location;
        }
        if let Some(ad_code) = request.ad_code {
            ad.ad_code = ad_code;
        }
        if let Some(is_active) = request.is_active {
            ad.is_active = is_active;
        }
        if let Some(start_date) = request.start_date {
            ad.start_date = start_date;
        }
        if let Some(end_date) = request.end_date {
            ad.end_date = end_date;
        }
        if let Some(target_pages) = request.target_pages {
            ad.target_pages = target_pages;
        }
        if let Some(display_order) = request.display_order {
            ad.display_order = display_order;
        }
        ad.updated_at = Utc::now();

        let ad = self.ad_repo.update(&ad).await?;

        tracing::info!(ad_id = id, "Ad placement updated");

        Ok(ad)
    }

    async fn delete(&self, id: i64) -> Result<(), AdError> {
        let ad = self.load(id).await?;
        self.ad_repo.delete(ad.id).await?;

        tracing::info!(ad_id = id, "Ad placement deleted");

        Ok(())
    }

    async fn record_impression(&self, id: i64) -> Result<(), AdError> {
        if !self.ad_repo.record_impression(id).await? {
            return Err(AdError::NotFound(id));
        }
        Ok(())
    }

    async fn record_click(&self, id: i64) -> Result<(), AdError> {
        if !self.ad_repo.record_click(id).await? {
            return Err(AdError::NotFound(id));
        }
        Ok(())
    }

    async fn stats(&self) -> Result<AdStats, AdError> {
        Ok(self.ad_repo.stats().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MockAdRepository;
    use chrono::Duration;
    use mockall::predicate::*;

    fn service(repo: MockAdRepository) -> AdServiceImpl<MockAdRepository> {
        AdServiceImpl::new(Arc::new(repo), Arc::new(SnowflakeGenerator::new(1, 0)))
    }

    #[tokio::test]
    async fn test_unknown_location_rejected() {
        let err = service(MockAdRepository::new())
            .list_active(Some("popup"))
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::BadRequest(msg) if msg == "Invalid ad location: popup"));
    }

    #[tokio::test]
    async fn test_location_filter_passed_through() {
        let mut repo = MockAdRepository::new();
        repo.expect_list_active()
            .with(always(), eq(Some(AdLocation::SidebarTop)))
            .times(1)
            .returning(|_, _| Ok(vec![]));

        service(repo).list_active(Some("sidebar-top")).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let mut repo = MockAdRepository::new();
        repo.expect_create().returning(|ad| Ok(ad.clone()));

        let ad = service(repo)
            .create(CreateAdRequest {
                name: " Banner principal ".into(),
                location: AdLocation::Header,
                ad_code: "<ins class=\"adsbygoogle\"></ins>".into(),
                is_active: None,
                start_date: None,
                end_date: None,
                target_pages: None,
                display_order: None,
            })
            .await
            .unwrap();
        assert_eq!(ad.name, "Banner principal");
        assert!(ad.is_active);
        assert_eq!(ad.target_pages, vec!["all"]);
        assert!(ad.end_date.is_none());
    }

    #[tokio::test]
    async fn test_update_can_clear_end_date() {
        let mut repo = MockAdRepository::new();
        repo.expect_find_by_id().returning(|id| {
            Ok(Some(AdPlacement {
                id,
                end_date: Some(Utc::now() + Duration::days(3)),
                ..Default::default()
            }))
        });
        repo.expect_update().returning(|ad| Ok(ad.clone()));

        let ad = service(repo)
            .update(
                1,
                UpdateAdRequest {
                    end_date: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(ad.end_date.is_none());
    }

    #[tokio::test]
    async fn test_click_on_missing_ad() {
        let mut repo = MockAdRepository::new();
        repo.expect_record_click().returning(|_| Ok(false));

        let err = service(repo).record_click(5).await.unwrap_err();
        assert_eq!(err.to_string(), "Ad not found with id of 5");
    }

    #[tokio::test]
    async fn test_delete_missing_ad() {
        let mut repo = MockAdRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));
        repo.expect_delete().never();

        assert!(matches!(
            service(repo).delete(5).await,
            Err(AdError::NotFound(5))
        ));
    }
}
