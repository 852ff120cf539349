//! Category repository tests.

use sqlx::PgPool;

use riverforo::domain::CategoryRepository;
use riverforo::infrastructure::repositories::PgCategoryRepository;

use super::*;

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_with_threads_is_bad_request(pool: PgPool) {
    let author = seed_user(&pool, 1, "enzo").await;
    let category = seed_category(&pool, 10, "superclasico").await;
    seed_thread(&pool, 100, "Previa del domingo", &author, &category).await;
    let repo = PgCategoryRepository::new(pool.clone());

    let result = repo.delete(10).await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert!(repo.find_by_id(10).await.unwrap().is_some());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_empty_category(pool: PgPool) {
    seed_category(&pool, 10, "superclasico").await;
    let repo = PgCategoryRepository::new(pool.clone());

    repo.delete(10).await.unwrap();

    assert!(repo.find_by_id(10).await.unwrap().is_none());
}
