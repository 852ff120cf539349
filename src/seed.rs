//! Database seeding
//!
//! Creates the admin account, the starter categories and the default ad
//! placements. Rows that already exist are left alone, so running it twice
//! is harmless.

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::PgPool;

use crate::application::services::hash_password;
use crate::domain::{
    AdLocation, AdPlacement, AdRepository, Category, CategoryRepository, LocalizedText, Role, User,
    UserRepository,
};
use crate::infrastructure::repositories::{PgAdRepository, PgCategoryRepository, PgUserRepository};
use crate::shared::snowflake::SnowflakeGenerator;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_EMAIL: &str = "admin@riverforo.com";

/// What a seed run created
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub admin_created: bool,
    pub categories_created: usize,
    pub ads_created: usize,
}

struct StarterCategory {
    slug: &'static str,
    name: (&'static str, &'static str),
    description: (&'static str, &'static str),
    icon: &'static str,
}

const STARTER_CATEGORIES: [StarterCategory; 6] = [
    StarterCategory {
        slug: "noticias-anuncios",
        name: ("Noticias y Anuncios", "News and Announcements"),
        description: (
            "Noticias oficiales y anuncios sobre River Plate y el foro",
            "Official news and announcements about River Plate and the forum",
        ),
        icon: "bullhorn",
    },
    StarterCategory {
        slug: "discusion-general",
        name: ("Discusión General", "General Discussion"),
        description: (
            "Discusiones generales sobre River Plate",
            "General discussions about River Plate",
        ),
        icon: "comments",
    },
    StarterCategory {
        slug: "partidos-eventos",
        name: ("Partidos y Eventos", "Matches and Events"),
        description: (
            "Discusiones sobre partidos pasados y futuros, y eventos relacionados con River Plate",
            "Discussions about past and upcoming matches, and events related to River Plate",
        ),
        icon: "futbol",
    },
    StarterCategory {
        slug: "jugadores-cuerpo-tecnico",
        name: ("Jugadores y Cuerpo Técnico", "Players and Staff"),
        description: (
            "Discusiones sobre jugadores, entrenadores y personal de River Plate",
            "Discussions about River Plate players, coaches, and staff",
        ),
        icon: "users",
    },
    StarterCategory {
        slug: "historia-tradiciones",
        name: ("Historia y Tradiciones", "History and Traditions"),
        description: (
            "Discusiones sobre la historia, tradiciones y logros de River Plate",
            "Discussions about River Plate's history, traditions, and achievements",
        ),
        icon: "trophy",
    },
    StarterCategory {
        slug: "ayuda-soporte",
        name: ("Ayuda y Soporte", "Help and Support"),
        description: (
            "Ayuda y soporte para el uso del foro",
            "Help and support for using the forum",
        ),
        icon: "question-circle",
    },
];

const STARTER_ADS: [(&str, AdLocation, &str); 4] = [
    ("Header Ad", AdLocation::Header, "1234567890"),
    ("Sidebar Ad", AdLocation::SidebarTop, "0987654321"),
    ("Between Threads Ad", AdLocation::BetweenThreads, "1357924680"),
    ("Footer Ad", AdLocation::Footer, "3692581470"),
];

fn adsense_code(slot: &str) -> String {
    format!(
        "<ins class=\"adsbygoogle\" style=\"display:block\" \
         data-ad-client=\"ca-pub-1234567890123456\" data-ad-slot=\"{}\" \
         data-ad-format=\"auto\" data-full-width-responsive=\"true\"></ins>",
        slot
    )
}

/// Seed an already migrated database.
pub async fn run(
    db: &PgPool,
    snowflake: &SnowflakeGenerator,
    admin_password: &str,
) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    let users = PgUserRepository::new(db.clone());
    if users.find_by_email(ADMIN_EMAIL).await?.is_none()
        && !users.username_exists(ADMIN_USERNAME).await?
    {
        let admin = User {
            id: snowflake.generate(),
            username: ADMIN_USERNAME.to_string(),
            email: ADMIN_EMAIL.to_string(),
            password_hash: hash_password(admin_password)
                .context("Failed to hash admin password")?,
            role: Role::Admin,
            bio: Some("Administrador oficial de RiverForo.com".to_string()),
            location: Some("Buenos Aires, Argentina".to_string()),
            email_verified: true,
            ..User::default()
        };
        users.create(&admin).await?;
        report.admin_created = true;
        tracing::info!(user_id = admin.id, "Admin user created");
    } else {
        tracing::info!("Admin user already exists, skipping");
    }

    let categories = PgCategoryRepository::new(db.clone());
    for (index, starter) in STARTER_CATEGORIES.iter().enumerate() {
        if categories.slug_exists(starter.slug).await? {
            continue;
        }
        let now = Utc::now();
        let category = Category {
            id: snowflake.generate(),
            name: LocalizedText::new(starter.name.0, starter.name.1),
            description: LocalizedText::new(starter.description.0, starter.description.1),
            slug: starter.slug.to_string(),
            icon: starter.icon.to_string(),
            order: index as i32 + 1,
            created_at: now,
            updated_at: now,
            ..Category::default()
        };
        categories.create(&category).await?;
        report.categories_created += 1;
        tracing::info!(category_id = category.id, slug = starter.slug, "Category created");
    }

    let ads = PgAdRepository::new(db.clone());
    let occupied: HashSet<AdLocation> = ads
        .stats()
        .await?
        .by_location
        .into_iter()
        .filter(|l| l.count > 0)
        .map(|l| l.location)
        .collect();

    for (order, (name, location, slot)) in STARTER_ADS.iter().enumerate() {
        if occupied.contains(location) {
            continue;
        }
        let ad = AdPlacement {
            id: snowflake.generate(),
            name: name.to_string(),
            location: *location,
            ad_code: adsense_code(slot),
            display_order: order as i32 + 1,
            ..AdPlacement::default()
        };
        ads.create(&ad).await?;
        report.ads_created += 1;
        tracing::info!(ad_id = ad.id, location = %location, "Ad placement created");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::slugify;

    #[test]
    fn test_starter_slugs_match_their_spanish_names() {
        for starter in &STARTER_CATEGORIES {
            let derived = slugify(starter.name.0, "categoria").replace("-y-", "-");
            assert_eq!(derived, starter.slug);
        }
    }

    #[test]
    fn test_starter_ads_cover_distinct_locations() {
        let locations: HashSet<_> = STARTER_ADS.iter().map(|(_, l, _)| *l).collect();
        assert_eq!(locations.len(), STARTER_ADS.len());
        assert!(adsense_code("42").contains("data-ad-slot=\"42\""));
    }
}
