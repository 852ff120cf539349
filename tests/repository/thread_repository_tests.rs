//! Thread repository tests: creation counters, flags, deletion and search.

use pretty_assertions::assert_eq;
use sqlx::PgPool;

use riverforo::domain::{PageRequest, PostRepository, ThreadFlag, ThreadRepository};
use riverforo::infrastructure::repositories::{PgPostRepository, PgThreadRepository};

use super::*;

#[sqlx::test(migrations = "./migrations")]
async fn test_create_with_opening_post_updates_counters(pool: PgPool) {
    let author = seed_user(&pool, 1, "enzo").await;
    let category = seed_category(&pool, 10, "superclasico").await;

    let (thread, opening) = seed_thread(&pool, 100, "Previa del domingo", &author, &category).await;

    assert_eq!(thread.post_count, 1);
    assert_eq!(thread.last_post.as_ref().unwrap().id, opening.id);

    let stored = PgPostRepository::new(pool.clone())
        .find_by_id(opening.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.thread.id, 100);
    assert_eq!(stored.content, "Previa del domingo (apertura)");

    let category = reload_category(&pool, 10).await;
    assert_eq!(category.thread_count, 1);
    assert_eq!(category.post_count, 1);
    let last_thread = category.last_thread.unwrap();
    assert_eq!(last_thread.thread_id, 100);
    assert_eq!(last_thread.title, "Previa del domingo");

    let user = reload_user(&pool, 1).await;
    assert_eq!(user.thread_count, 1);
    assert_eq!(user.post_count, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_duplicate_slug_is_conflict(pool: PgPool) {
    let author = seed_user(&pool, 1, "enzo").await;
    let category = seed_category(&pool, 10, "superclasico").await;
    seed_thread(&pool, 100, "Previa del domingo", &author, &category).await;

    let (mut thread, opening) =
        new_thread(300, 301, "Otra previa", &author, &category, minutes_ago(1));
    thread.slug = "hilo-100".into();
    let result = PgThreadRepository::new(pool.clone())
        .create_with_opening_post(&thread, &opening)
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
    // Rolled back with the thread
    assert_eq!(reload_category(&pool, 10).await.thread_count, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_with_posts_resets_category_counters(pool: PgPool) {
    let author = seed_user(&pool, 1, "enzo").await;
    let replier = seed_user(&pool, 2, "marcelo").await;
    let category = seed_category(&pool, 10, "superclasico").await;
    let (thread, _) = seed_thread(&pool, 100, "Previa del domingo", &author, &category).await;
    let posts = PgPostRepository::new(pool.clone());
    for (id, ago) in [(200, 5), (201, 4)] {
        posts
            .create_reply(&new_post(id, &replier, &thread, minutes_ago(ago)), category.id)
            .await
            .unwrap();
    }

    let repo = PgThreadRepository::new(pool.clone());
    let removed = repo.delete_with_posts(&thread).await.unwrap();

    assert_eq!(removed, 3);
    assert!(repo.find_by_id(100).await.unwrap().is_none());
    assert!(posts.find_by_id(200).await.unwrap().is_none());
    let category = reload_category(&pool, 10).await;
    assert_eq!(category.thread_count, 0);
    assert_eq!(category.post_count, 0);

    let again = repo.delete_with_posts(&thread).await;
    assert!(matches!(again, Err(AppError::NotFound(_))));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_toggle_flag_flips_in_place(pool: PgPool) {
    let author = seed_user(&pool, 1, "enzo").await;
    let category = seed_category(&pool, 10, "superclasico").await;
    seed_thread(&pool, 100, "Previa del domingo", &author, &category).await;
    let repo = PgThreadRepository::new(pool.clone());

    let sticky = repo.toggle_flag(100, ThreadFlag::Sticky).await.unwrap().unwrap();
    assert!(sticky.is_sticky);
    assert!(!sticky.is_locked);

    let locked = repo.toggle_flag(100, ThreadFlag::Locked).await.unwrap().unwrap();
    assert!(locked.is_sticky);
    assert!(locked.is_locked);

    let unstuck = repo.toggle_flag(100, ThreadFlag::Sticky).await.unwrap().unwrap();
    assert!(!unstuck.is_sticky);

    assert!(repo.toggle_flag(404, ThreadFlag::Locked).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_stale_edit_keeps_moderation_flags(pool: PgPool) {
    let author = seed_user(&pool, 1, "enzo").await;
    let category = seed_category(&pool, 10, "superclasico").await;
    seed_thread(&pool, 100, "Previa del domingo", &author, &category).await;
    let repo = PgThreadRepository::new(pool.clone());

    let mut stale = reload_thread(&pool, 100).await;
    repo.toggle_flag(100, ThreadFlag::Sticky).await.unwrap();

    stale.title = "Previa del domingo (editado)".into();
    let updated = repo.update(&stale).await.unwrap();

    assert_eq!(updated.title, "Previa del domingo (editado)");
    assert!(updated.is_sticky);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_search_matches_wildcards_literally(pool: PgPool) {
    let author = seed_user(&pool, 1, "enzo").await;
    let category = seed_category(&pool, 10, "superclasico").await;
    seed_thread(&pool, 100, "Vendo entradas 50% off", &author, &category).await;
    seed_thread(&pool, 110, "Entradas 500 pesos", &author, &category).await;
    seed_thread(&pool, 120, "Apodo el_muneco", &author, &category).await;
    let repo = PgThreadRepository::new(pool.clone());
    let page = PageRequest::new(1, 20);

    let found = repo.search("50%", page).await.unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.items[0].id, 100);

    let found = repo.search("el_m", page).await.unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.items[0].id, 120);

    // Case-insensitive, title or content
    assert_eq!(repo.search("ENTRADAS", page).await.unwrap().total, 2);
    assert_eq!(repo.search("apertura", page).await.unwrap().total, 3);
    assert_eq!(repo.search("%", page).await.unwrap().total, 1);
}
