/// Integration tests for the public gallery endpoint
///
/// The database-backed test is skipped when DATABASE_URL is not set.

mod common;

use axum::http::StatusCode;
use common::TestContext;
use imaginify_shared::db::migrations::run_migrations;
use imaginify_shared::models::image::{CreateImage, Image};
use imaginify_shared::models::user::{CreateUser, User};
use uuid::Uuid;

#[tokio::test]
async fn test_gallery_without_database_is_server_error() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .send(TestContext::get("/api/images?search_query=cat"))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal_error");
    assert!(!body["message"].as_str().unwrap().contains("DATABASE_URL"));
    assert!(ctx.assets.expressions().is_empty());
}

#[tokio::test]
async fn test_gallery_rejects_non_numeric_page() {
    let ctx = TestContext::new();

    let (status, _) = ctx.send(TestContext::get("/api/images?page=two")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(ctx.assets.expressions().is_empty());
}

#[tokio::test]
async fn test_gallery_search_through_router() {
    let Some(ctx) = TestContext::with_database() else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };

    let pool = ctx.db.connect().await.expect("Failed to connect to test database");
    run_migrations(pool).await.expect("Failed to run migrations");

    let owner = User::create(
        pool,
        CreateUser {
            clerk_id: format!("user_{}", Uuid::new_v4().simple()),
            email: "gallery@example.com".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let mut public_ids = Vec::new();
    for n in 1..=3 {
        let view = Image::create(
            pool,
            owner.id,
            CreateImage {
                title: format!("cat {}", n),
                transformation_type: "fill".to_string(),
                public_id: format!("imaginify/{}", Uuid::new_v4().simple()),
                secure_url: "https://res.cloudinary.com/demo/image/upload/cat.jpg".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        public_ids.push(view.public_id);
    }
    *ctx.assets.ids.lock().unwrap() = public_ids[..2].to_vec();

    let (status, body) = ctx
        .send(TestContext::get("/api/images?limit=1&search_query=cat"))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert!(body["saved_images"].as_i64().unwrap() >= 3);
    assert_eq!(body["data"][0]["author"]["clerk_id"], owner.clerk_id.as_str());
    assert_eq!(ctx.assets.expressions(), vec!["folder=imaginify AND cat"]);

    User::delete_by_clerk_id(pool, &owner.clerk_id).await.unwrap();
}
