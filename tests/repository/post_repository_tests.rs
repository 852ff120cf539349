//! Post repository tests: reply counters, likes and search.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use sqlx::PgPool;

use riverforo::domain::{PageRequest, PostRepository, UserSnapshot};
use riverforo::infrastructure::repositories::PgPostRepository;

use super::*;

#[sqlx::test(migrations = "./migrations")]
async fn test_create_reply_bumps_counters(pool: PgPool) {
    let author = seed_user(&pool, 1, "enzo").await;
    let replier = seed_user(&pool, 2, "marcelo").await;
    let category = seed_category(&pool, 10, "superclasico").await;
    let (thread, _) = seed_thread(&pool, 100, "Previa del domingo", &author, &category).await;

    let reply = new_post(200, &replier, &thread, minutes_ago(5));
    PgPostRepository::new(pool.clone())
        .create_reply(&reply, category.id)
        .await
        .unwrap();

    let thread = reload_thread(&pool, 100).await;
    assert_eq!(thread.post_count, 2);
    let last_post = thread.last_post.unwrap();
    assert_eq!(last_post.id, 200);
    assert_eq!(last_post.user.username, "marcelo");

    assert_eq!(reload_category(&pool, 10).await.post_count, 2);
    assert_eq!(reload_user(&pool, 2).await.post_count, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_reply_recomputes_last_post(pool: PgPool) {
    let author = seed_user(&pool, 1, "enzo").await;
    let replier = seed_user(&pool, 2, "marcelo").await;
    let category = seed_category(&pool, 10, "superclasico").await;
    let (thread, _) = seed_thread(&pool, 100, "Previa del domingo", &author, &category).await;
    let repo = PgPostRepository::new(pool.clone());

    let first = new_post(200, &replier, &thread, minutes_ago(10));
    let second = new_post(201, &author, &thread, minutes_ago(5));
    repo.create_reply(&first, category.id).await.unwrap();
    repo.create_reply(&second, category.id).await.unwrap();

    repo.delete_reply(&second, category.id).await.unwrap();

    let thread = reload_thread(&pool, 100).await;
    assert_eq!(thread.post_count, 2);
    assert_eq!(thread.last_post.unwrap().id, 200);
    assert_eq!(reload_category(&pool, 10).await.post_count, 2);
    assert!(repo.find_by_id(201).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_concurrent_likes_are_all_kept(pool: PgPool) {
    let author = seed_user(&pool, 1, "enzo").await;
    let category = seed_category(&pool, 10, "superclasico").await;
    let (_, opening) = seed_thread(&pool, 100, "Previa del domingo", &author, &category).await;
    let repo = Arc::new(PgPostRepository::new(pool.clone()));

    let mut handles = Vec::new();
    for id in 0..20 {
        let repo = repo.clone();
        let post_id = opening.id;
        handles.push(tokio::spawn(async move {
            let fan = UserSnapshot {
                id: 1000 + id,
                username: format!("hincha{}", id),
                avatar: String::new(),
            };
            repo.toggle_like(post_id, &fan, minutes_ago(1)).await
        }));
    }
    for handle in handles {
        let toggle = handle.await.unwrap().unwrap().unwrap();
        assert!(toggle.liked);
    }

    let post = repo.find_by_id(opening.id).await.unwrap().unwrap();
    assert_eq!(post.likes.len(), 20);
    assert_eq!(reload_thread(&pool, 100).await.like_count, 20);

    let fan = UserSnapshot {
        id: 1003,
        username: "hincha3".into(),
        avatar: String::new(),
    };
    let toggle = repo
        .toggle_like(opening.id, &fan, minutes_ago(0))
        .await
        .unwrap()
        .unwrap();
    assert!(!toggle.liked);
    assert_eq!(toggle.thread_like_count, 19);
    assert!(!toggle.post.liked_by(1003));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_like_on_missing_post(pool: PgPool) {
    let fan = seed_user(&pool, 1, "enzo").await;
    let repo = PgPostRepository::new(pool.clone());

    let toggle = repo.toggle_like(404, &fan, minutes_ago(0)).await.unwrap();

    assert!(toggle.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_edit_keeps_likes(pool: PgPool) {
    let author = seed_user(&pool, 1, "enzo").await;
    let fan = seed_user(&pool, 2, "marcelo").await;
    let category = seed_category(&pool, 10, "superclasico").await;
    let (_, opening) = seed_thread(&pool, 100, "Previa del domingo", &author, &category).await;
    let repo = PgPostRepository::new(pool.clone());

    // Loaded before the like lands
    let mut stale = repo.find_by_id(opening.id).await.unwrap().unwrap();
    repo.toggle_like(opening.id, &fan, minutes_ago(1))
        .await
        .unwrap()
        .unwrap();

    stale.edit("Vamos River".into(), vec![], minutes_ago(0));
    let updated = repo.update(&stale).await.unwrap();

    assert_eq!(updated.content, "Vamos River");
    assert!(updated.is_edited);
    assert!(updated.liked_by(2));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_liked_reply_recounts_thread_likes(pool: PgPool) {
    let author = seed_user(&pool, 1, "enzo").await;
    let fan = seed_user(&pool, 2, "marcelo").await;
    let category = seed_category(&pool, 10, "superclasico").await;
    let (thread, opening) = seed_thread(&pool, 100, "Previa del domingo", &author, &category).await;
    let repo = PgPostRepository::new(pool.clone());

    let reply = new_post(200, &fan, &thread, minutes_ago(5));
    repo.create_reply(&reply, category.id).await.unwrap();
    repo.toggle_like(opening.id, &fan, minutes_ago(2)).await.unwrap();
    let liked_reply = repo
        .toggle_like(200, &author, minutes_ago(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(liked_reply.thread_like_count, 2);

    repo.delete_reply(&liked_reply.post, category.id).await.unwrap();

    assert_eq!(reload_thread(&pool, 100).await.like_count, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_opening_post_is_oldest_then_lowest_id(pool: PgPool) {
    let author = seed_user(&pool, 1, "enzo").await;
    let category = seed_category(&pool, 10, "superclasico").await;
    let at = minutes_ago(30);
    let (thread, opening) = new_thread(100, 150, "Previa del domingo", &author, &category, at);
    PgThreadRepository::new(pool.clone())
        .create_with_opening_post(&thread, &opening)
        .await
        .unwrap();
    let repo = PgPostRepository::new(pool.clone());

    // Same timestamp, higher id
    repo.create_reply(&new_post(170, &author, &thread, at), category.id)
        .await
        .unwrap();
    // Same timestamp, lower id
    repo.create_reply(&new_post(120, &author, &thread, at), category.id)
        .await
        .unwrap();

    assert_eq!(repo.opening_post_id(100).await.unwrap(), Some(120));
    assert_eq!(repo.opening_post_id(404).await.unwrap(), None);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_search_matches_wildcards_literally(pool: PgPool) {
    let author = seed_user(&pool, 1, "enzo").await;
    let category = seed_category(&pool, 10, "superclasico").await;
    let (thread, _) = seed_thread(&pool, 100, "Previa del domingo", &author, &category).await;
    let repo = PgPostRepository::new(pool.clone());

    let mut percent = new_post(200, &author, &thread, minutes_ago(3));
    percent.content = "Ganamos 100% del torneo".into();
    let mut underscore = new_post(201, &author, &thread, minutes_ago(2));
    underscore.content = "usuario el_muneco".into();
    let mut backslash = new_post(202, &author, &thread, minutes_ago(1));
    backslash.content = r"ruta C:\river".into();
    for post in [&percent, &underscore, &backslash] {
        repo.create_reply(post, category.id).await.unwrap();
    }

    let page = PageRequest::new(1, 20);
    let found = repo.search("100%", page).await.unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.items[0].id, 200);

    let found = repo.search("el_", page).await.unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.items[0].id, 201);

    let found = repo.search(r"C:\r", page).await.unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.items[0].id, 202);

    // `_` must not act as a single-character wildcard
    assert_eq!(repo.search("el_m_neco", page).await.unwrap().total, 0);
}
