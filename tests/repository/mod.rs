//! Repository Tests
//!
//! Run the SQL behind the forum counters against a throwaway PostgreSQL
//! database per test (`#[sqlx::test]`, needs `DATABASE_URL`).

mod category_repository_tests;
mod post_repository_tests;
mod thread_repository_tests;

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use riverforo::domain::{
    Category, CategoryRepository, LastPost, LocalizedText, Post, Thread, ThreadRepository, User,
    UserRepository, UserSnapshot,
};
use riverforo::infrastructure::repositories::{
    PgCategoryRepository, PgThreadRepository, PgUserRepository,
};
use riverforo::shared::error::AppError;

pub async fn seed_user(pool: &PgPool, id: i64, username: &str) -> UserSnapshot {
    let user = User {
        id,
        username: username.to_string(),
        email: format!("{}@riverforo.com", username),
        password_hash: "not-a-real-hash".into(),
        ..Default::default()
    };
    PgUserRepository::new(pool.clone())
        .create(&user)
        .await
        .unwrap()
        .snapshot()
}

pub async fn seed_category(pool: &PgPool, id: i64, slug: &str) -> Category {
    let category = Category {
        id,
        name: LocalizedText::new("Superclásico", "Derby"),
        description: LocalizedText::new("River contra Boca", "River against Boca"),
        slug: slug.to_string(),
        ..Default::default()
    };
    PgCategoryRepository::new(pool.clone())
        .create(&category)
        .await
        .unwrap()
}

pub fn minutes_ago(minutes: i64) -> DateTime<Utc> {
    Utc::now() - Duration::minutes(minutes)
}

pub fn new_post(id: i64, author: &UserSnapshot, thread: &Thread, at: DateTime<Utc>) -> Post {
    Post {
        id,
        content: format!("Respuesta {}", id),
        user: author.clone(),
        thread: thread.snapshot(),
        likes: vec![],
        mentions: vec![],
        attachments: vec![],
        is_edited: false,
        edit_history: vec![],
        created_at: at,
        updated_at: at,
    }
}

/// Thread plus opening post, written the way thread creation writes them.
pub fn new_thread(
    id: i64,
    opening_post_id: i64,
    title: &str,
    author: &UserSnapshot,
    category: &Category,
    at: DateTime<Utc>,
) -> (Thread, Post) {
    let thread = Thread {
        id,
        title: title.to_string(),
        slug: format!("hilo-{}", id),
        content: format!("{} (apertura)", title),
        user: author.clone(),
        category: category.snapshot(),
        tags: vec![],
        last_post: Some(LastPost {
            id: opening_post_id,
            user: author.clone(),
            created_at: at,
        }),
        view_count: 0,
        post_count: 1,
        like_count: 0,
        is_sticky: false,
        is_locked: false,
        is_announcement: false,
        created_at: at,
        updated_at: at,
    };
    let mut opening = new_post(opening_post_id, author, &thread, at);
    opening.content = thread.content.clone();
    (thread, opening)
}

pub async fn seed_thread(
    pool: &PgPool,
    id: i64,
    title: &str,
    author: &UserSnapshot,
    category: &Category,
) -> (Thread, Post) {
    let (thread, opening) = new_thread(id, id + 1, title, author, category, minutes_ago(60));
    let thread = PgThreadRepository::new(pool.clone())
        .create_with_opening_post(&thread, &opening)
        .await
        .unwrap();
    (thread, opening)
}

pub async fn reload_thread(pool: &PgPool, id: i64) -> Thread {
    PgThreadRepository::new(pool.clone())
        .find_by_id(id)
        .await
        .unwrap()
        .unwrap()
}

pub async fn reload_category(pool: &PgPool, id: i64) -> Category {
    PgCategoryRepository::new(pool.clone())
        .find_by_id(id)
        .await
        .unwrap()
        .unwrap()
}

pub async fn reload_user(pool: &PgPool, id: i64) -> User {
    PgUserRepository::new(pool.clone())
        .find_by_id(id)
        .await
        .unwrap()
        .unwrap()
}
