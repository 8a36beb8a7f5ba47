use apporbit::{
    models::{CreateProductRequest, CreateUserRequest, Product, ProductStatus},
    repository::{PostgresRepository, Repository, UserUpsert, VoteOutcome},
};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

// --- Test Context and Setup ---

/// Holds the pool of the database named by `DATABASE_URL`. Every test
/// namespaces its rows with a fresh token, so the suite can share one database
/// and run in parallel.
struct DbTestContext {
    pool: PgPool,
    token: String,
}

impl DbTestContext {
    /// `None` when `DATABASE_URL` is unset: the suite is skipped rather than failed.
    async fn setup() -> Option<Self> {
        dotenv::dotenv().ok();

        let Ok(db_url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping Postgres integration test");
            return None;
        };

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        Some(DbTestContext {
            pool,
            token: Uuid::new_v4().simple().to_string(),
        })
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }

    /// A name unique to this test run.
    fn name(&self, suffix: &str) -> String {
        format!("{} {}", self.token, suffix)
    }

    fn email(&self, local: &str) -> String {
        format!("{}-{}@test.com", local, self.token)
    }
}

// --- Test Data Helpers ---

async fn create_test_product(
    repo: &PostgresRepository,
    name: &str,
    status: ProductStatus,
) -> Product {
    let request = CreateProductRequest {
        name: Some(name.to_string()),
        owner_name: Some("Owner".to_string()),
        owner_email: Some("owner@test.com".to_string()),
        ..CreateProductRequest::default()
    };
    let created = repo
        .insert_product(request.validate().unwrap())
        .await
        .expect("Failed to insert test product");

    if status == ProductStatus::Pending {
        return created;
    }
    repo.set_status(created.id, status)
        .await
        .unwrap()
        .expect("Inserted product vanished")
}

// --- Tests ---

#[tokio::test]
async fn test_insert_product_round_trip() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = ctx.repository();

    let created = create_test_product(&repo, &ctx.name("Orbit"), ProductStatus::Pending).await;

    let fetched = repo.get_product(created.id).await.unwrap().unwrap();
    assert_eq!(fetched.name, created.name);
    assert_eq!(fetched.status, ProductStatus::Pending);
    assert_eq!(fetched.category, "General");
    assert_eq!(fetched.votes, 0);
    assert!(fetched.comments.is_empty());
    assert!(!fetched.is_featured);

    assert!(repo.get_product(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_upvote_twice_counts_once() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = ctx.repository();
    let product = create_test_product(&repo, &ctx.name("Votes"), ProductStatus::Accepted).await;
    let voter = ctx.email("voter");

    assert_eq!(repo.upvote(product.id, &voter).await.unwrap(), VoteOutcome::Recorded(1));
    assert_eq!(repo.upvote(product.id, &voter).await.unwrap(), VoteOutcome::Duplicate);
    assert_eq!(
        repo.upvote(Uuid::new_v4(), &voter).await.unwrap(),
        VoteOutcome::Missing
    );

    let stored = repo.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(stored.votes, 1);
    assert_eq!(stored.voted_users, vec![voter]);
}

#[tokio::test]
async fn test_concurrent_upvotes_by_same_identity_count_once() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = Arc::new(ctx.repository());
    let product = create_test_product(&repo, &ctx.name("Race"), ProductStatus::Accepted).await;
    let voter = ctx.email("racer");

    let mut handles = Vec::new();
    for _ in 0..8 {
        let repo = repo.clone();
        let voter = voter.clone();
        handles.push(tokio::spawn(async move {
            repo.upvote(product.id, &voter).await.unwrap()
        }));
    }

    let mut recorded = 0;
    for handle in handles {
        if matches!(handle.await.unwrap(), VoteOutcome::Recorded(_)) {
            recorded += 1;
        }
    }

    let stored = repo.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(recorded, 1);
    assert_eq!(stored.votes, 1);
    assert_eq!(stored.voted_users.len(), 1);
}

#[tokio::test]
async fn test_add_tag_case_insensitive() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = ctx.repository();
    let product = create_test_product(&repo, &ctx.name("Tags"), ProductStatus::Accepted).await;

    let first = repo.add_tag(product.id, "ai").await.unwrap().unwrap();
    assert!(first.added);
    assert_eq!(first.tags, vec!["ai"]);

    // Mixed-case legacy value written directly, bypassing normalization.
    sqlx::query("UPDATE products SET tags = array_append(tags, 'Rust') WHERE id = $1")
        .bind(product.id)
        .execute(&ctx.pool)
        .await
        .unwrap();

    let again = repo.add_tag(product.id, "ai").await.unwrap().unwrap();
    assert!(!again.added);
    let legacy = repo.add_tag(product.id, "rust").await.unwrap().unwrap();
    assert!(!legacy.added);
    assert_eq!(legacy.tags, vec!["ai", "Rust"]);

    assert!(repo.add_tag(Uuid::new_v4(), "ai").await.unwrap().is_none());
}

#[tokio::test]
async fn test_accepted_page_last_page() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = ctx.repository();

    for i in 0..13 {
        create_test_product(&repo, &ctx.name(&format!("App {i}")), ProductStatus::Accepted).await;
    }
    create_test_product(&repo, &ctx.name("Pending"), ProductStatus::Pending).await;

    let (third, total) = repo.accepted_page(Some(&ctx.token), 12, 6).await.unwrap();
    assert_eq!(total, 13);
    assert_eq!(third.len(), 1);

    let (first, _) = repo.accepted_page(Some(&ctx.token), 0, 6).await.unwrap();
    assert_eq!(first.len(), 6);
    assert!(first.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));

    // Case-insensitive: the token is lowercase hex.
    let (_, upper_total) = repo
        .accepted_page(Some(&ctx.token.to_uppercase()), 0, 6)
        .await
        .unwrap();
    assert_eq!(upper_total, 13);
}

#[tokio::test]
async fn test_search_metacharacters_match_literally() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = ctx.repository();

    create_test_product(&repo, &ctx.name("50% off"), ProductStatus::Accepted).await;
    create_test_product(&repo, &ctx.name("50x off"), ProductStatus::Accepted).await;
    create_test_product(&repo, &ctx.name("a_b"), ProductStatus::Accepted).await;
    create_test_product(&repo, &ctx.name("axb"), ProductStatus::Accepted).await;

    let (percent, total) = repo
        .accepted_page(Some(&ctx.name("50%")), 0, 6)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(percent[0].name, ctx.name("50% off"));

    let (underscore, total) = repo
        .accepted_page(Some(&ctx.name("a_b")), 0, 6)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(underscore[0].name, ctx.name("a_b"));
}

#[tokio::test]
async fn test_report_duplicate_and_missing() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = ctx.repository();
    let product = create_test_product(&repo, &ctx.name("Spam"), ProductStatus::Accepted).await;
    let reporter = ctx.email("reporter");

    assert_eq!(
        repo.report(product.id, &reporter).await.unwrap(),
        VoteOutcome::Recorded(1)
    );
    assert_eq!(
        repo.report(product.id, &ctx.email("second")).await.unwrap(),
        VoteOutcome::Recorded(2)
    );
    assert_eq!(
        repo.report(product.id, &reporter).await.unwrap(),
        VoteOutcome::Duplicate
    );
    assert_eq!(
        repo.report(Uuid::new_v4(), &reporter).await.unwrap(),
        VoteOutcome::Missing
    );

    let reported = repo.reported_products().await.unwrap();
    assert!(reported.iter().any(|p| p.id == product.id));
}

#[tokio::test]
async fn test_comments_append_in_order() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = ctx.repository();
    let product = create_test_product(&repo, &ctx.name("Talk"), ProductStatus::Accepted).await;

    for text in ["first", "second"] {
        let comment = apporbit::models::Comment {
            user_name: "Anonymous".to_string(),
            user_image: String::new(),
            text: text.to_string(),
        };
        assert!(repo.push_comment(product.id, comment).await.unwrap());
    }

    let stored = repo.get_product(product.id).await.unwrap().unwrap();
    let texts: Vec<_> = stored.comments.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "second"]);
}

#[tokio::test]
async fn test_user_upsert_and_role_update() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = ctx.repository();
    let email = ctx.email("ada");
    let request = CreateUserRequest {
        name: Some("Ada".to_string()),
        email: email.clone(),
        photo: None,
    };

    match repo.insert_user_if_absent(request.clone()).await.unwrap() {
        UserUpsert::Created(user) => assert_eq!(user.role, "user"),
        other => panic!("expected Created, got {other:?}"),
    }
    match repo.insert_user_if_absent(request).await.unwrap() {
        UserUpsert::Existing(user) => assert_eq!(user.name.as_deref(), Some("Ada")),
        other => panic!("expected Existing, got {other:?}"),
    }

    assert_eq!(repo.update_role(&email, "moderator").await.unwrap(), 1);
    assert_eq!(repo.update_role(&email, "moderator").await.unwrap(), 0);
    assert_eq!(repo.update_role(&ctx.email("ghost"), "admin").await.unwrap(), 0);
    assert_eq!(repo.find_user(&email).await.unwrap().unwrap().role, "moderator");
}
