//! Ad placement entity and repository trait.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;
use crate::shared::snowflake::as_string;

/// Where an ad is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdLocation {
    Header,
    SidebarTop,
    SidebarBottom,
    BetweenThreads,
    Footer,
    Custom,
}

impl AdLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::SidebarTop => "sidebar-top",
            Self::SidebarBottom => "sidebar-bottom",
            Self::BetweenThreads => "between-threads",
            Self::Footer => "footer",
            Self::Custom => "custom",
        }
    }
}

impl FromStr for AdLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "header" => Ok(Self::Header),
            "sidebar-top" => Ok(Self::SidebarTop),
            "sidebar-bottom" => Ok(Self::SidebarBottom),
            "between-threads" => Ok(Self::BetweenThreads),
            "footer" => Ok(Self::Footer),
            "custom" => Ok(Self::Custom),
            other => Err(format!("Invalid ad location: {}", other)),
        }
    }
}

impl fmt::Display for AdLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps to the `ad_placements` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdPlacement {
    #[serde(rename = "_id", with = "as_string")]
    pub id: i64,
    pub name: String,
    pub location: AdLocation,
    pub ad_code: String,
    pub is_active: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub target_pages: Vec<String>,
    pub display_order: i32,
    pub impressions: i64,
    pub clicks: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for AdPlacement {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name: String::new(),
            location: AdLocation::Header,
            ad_code: String::new(),
            is_active: true,
            start_date: now,
            end_date: None,
            target_pages: vec!["all".to_string()],
            display_order: 0,
            impressions: 0,
            clicks: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Counters aggregated over one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationStats {
    #[serde(rename = "_id")]
    pub location: AdLocation,
    pub impressions: i64,
    pub clicks: i64,
    pub count: i64,
}

/// Totals plus the per-location breakdown, impressions descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdStats {
    pub impressions: i64,
    pub clicks: i64,
    pub by_location: Vec<LocationStats>,
}

impl AdStats {
    /// Click-through rate as a percentage with two decimals.
    pub fn ctr(&self) -> String {
        if self.impressions > 0 {
            format!("{:.2}", self.clicks as f64 / self.impressions as f64 * 100.0)
        } else {
            "0.00".to_string()
        }
    }
}

/// Repository trait for AdPlacement data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AdRepository: Send + Sync {
    /// Ads live at `now`, `display_order` ascending.
    async fn list_active(
        &self,
        now: DateTime<Utc>,
        location: Option<AdLocation>,
    ) -> Result<Vec<AdPlacement>, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<AdPlacement>, AppError>;

    async fn create(&self, ad: &AdPlacement) -> Result<AdPlacement, AppError>;

    async fn update(&self, ad: &AdPlacement) -> Result<AdPlacement, AppError>;

    async fn delete(&self, id: i64) -> Result<(), AppError>;

    /// Returns false when no ad has this id.
    async fn record_impression(&self, id: i64) -> Result<bool, AppError>;

    /// Returns false when no ad has this id.
    async fn record_click(&self, id: i64) -> Result<bool, AppError>;

    async fn stats(&self) -> Result<AdStats, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("header", AdLocation::Header)]
    #[test_case("sidebar-top", AdLocation::SidebarTop)]
    #[test_case("between-threads", AdLocation::BetweenThreads)]
    #[test_case("custom", AdLocation::Custom)]
    fn test_location_parse(raw: &str, expected: AdLocation) {
        assert_eq!(raw.parse::<AdLocation>().unwrap(), expected);
        assert_eq!(expected.to_string(), raw);
    }

    #[test]
    fn test_unknown_location_rejected() {
        assert!("sidebar".parse::<AdLocation>().is_err());
    }

    #[test_case(0, 0, "0.00")]
    #[test_case(200, 3, "1.50")]
    #[test_case(3, 1, "33.33")]
    fn test_ctr(impressions: i64, clicks: i64, expected: &str) {
        let stats = AdStats {
            impressions,
            clicks,
            by_location: vec![],
        };
        assert_eq!(stats.ctr(), expected);
    }
}
