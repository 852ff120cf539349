//! Ad Placement Repository Implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{AdLocation, AdPlacement, AdRepository, AdStats, LocationStats};
use crate::shared::error::AppError;

const AD_COLUMNS: &str = r#"
    id, name, location, ad_code, is_active, start_date, end_date, target_pages,
    display_order, impressions, clicks, created_at, updated_at
"#;

#[derive(Debug, sqlx::FromRow)]
struct AdRow {
    id: i64,
    name: String,
    location: String,
    ad_code: String,
    is_active: bool,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    target_pages: Vec<String>,
    display_order: i32,
    impressions: i64,
    clicks: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AdRow {
    fn into_ad(self) -> AdPlacement {
        AdPlacement {
            id: self.id,
            name: self.name,
            location: self.location.parse().unwrap_or(AdLocation::Custom),
            ad_code: self.ad_code,
            is_active: self.is_active,
            start_date: self.start_date,
            end_date: self.end_date,
            target_pages: self.target_pages,
            display_order: self.display_order,
            impressions: self.impressions,
            clicks: self.clicks,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LocationStatsRow {
    location: String,
    impressions: i64,
    clicks: i64,
    count: i64,
}

/// PostgreSQL ad placement repository implementation.
#[derive(Clone)]
pub struct PgAdRepository {
    pool: PgPool,
}

impl PgAdRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn increment(&self, column: &str, id: i64) -> Result<bool, AppError> {
        let sql = format!(
            "UPDATE ad_placements SET {column} = {column} + 1 WHERE id = $1",
            column = column
        );
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AdRepository for PgAdRepository {
    async fn list_active(
        &self,
        now: DateTime<Utc>,
        location: Option<AdLocation>,
    ) -> Result<Vec<AdPlacement>, AppError> {
        let sql = format!(
            r#"
            SELECT {} FROM ad_placements
            WHERE is_active = TRUE
              AND start_date <= $1
              AND (end_date IS NULL OR end_date > $1)
              AND ($2::TEXT IS NULL OR location = $2)
            ORDER BY display_order ASC, id ASC
            "#,
            AD_COLUMNS
        );
        let rows = sqlx::query_as::<_, AdRow>(&sql)
            .bind(now)
            .bind(location.map(|l| l.as_str()))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(AdRow::into_ad).collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<AdPlacement>, AppError> {
        let sql = format!("SELECT {} FROM ad_placements WHERE id = $1", AD_COLUMNS);
        let row = sqlx::query_as::<_, AdRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(AdRow::into_ad))
    }

    async fn create(&self, ad: &AdPlacement) -> Result<AdPlacement, AppError> {
        let sql = format!(
            r#"
            INSERT INTO ad_placements (id, name, location, ad_code, is_active, start_date,
                                       end_date, target_pages, display_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            AD_COLUMNS
        );
        let row = sqlx::query_as::<_, AdRow>(&sql)
            .bind(ad.id)
            .bind(&ad.name)
            .bind(ad.location.as_str())
            .bind(&ad.ad_code)
            .bind(ad.is_active)
            .bind(ad.start_date)
            .bind(ad.end_date)
            .bind(&ad.target_pages)
            .bind(ad.display_order)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into_ad())
    }

    async fn update(&self, ad: &AdPlacement) -> Result<AdPlacement, AppError> {
        let sql = format!(
            r#"
            UPDATE ad_placements
            SET name = $2,
                location = $3,
                ad_code = $4,
                is_active = $5,
                start_date = $6,
                end_date = $7,
                target_pages = $8,
                display_order = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            AD_COLUMNS
        );
        let row = sqlx::query_as::<_, AdRow>(&sql)
            .bind(ad.id)
            .bind(&ad.name)
            .bind(ad.location.as_str())
            .bind(&ad.ad_code)
            .bind(ad.is_active)
            .bind(ad.start_date)
            .bind(ad.end_date)
            .bind(&ad.target_pages)
            .bind(ad.display_order)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ad not found with id of {}", ad.id)))?;

        Ok(row.into_ad())
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM ad_placements WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Ad not found with id of {}", id)));
        }

        Ok(())
    }

    async fn record_impression(&self, id: i64) -> Result<bool, AppError> {
        self.increment("impressions", id).await
    }

    async fn record_click(&self, id: i64) -> Result<bool, AppError> {
        self.increment("clicks", id).await
    }

    async fn stats(&self) -> Result<AdStats, AppError> {
        let rows = sqlx::query_as::<_, LocationStatsRow>(
            r#"
            SELECT location,
                   COALESCE(SUM(impressions), 0)::BIGINT AS impressions,
                   COALESCE(SUM(clicks), 0)::BIGINT AS clicks,
                   COUNT(*) AS count
            FROM ad_placements
            GROUP BY location
            ORDER BY impressions DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let by_location: Vec<LocationStats> = rows
            .into_iter()
            .map(|row| LocationStats {
                location: row.location.parse().unwrap_or(AdLocation::Custom),
                impressions: row.impressions,
                clicks: row.clicks,
                count: row.count,
            })
            .collect();

        Ok(AdStats {
            impressions: by_location.iter().map(|l| l.impressions).sum(),
            clicks: by_location.iter().map(|l| l.clicks).sum(),
            by_location,
        })
    }
}
