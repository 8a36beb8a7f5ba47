#![allow(dead_code)]

use apporbit::{
    AppConfig, AppState, MemoryRepository, MockStorageService,
    models::{CreateProductRequest, Product, ProductStatus},
    repository::Repository,
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

pub const TEST_EMAIL: &str = "voter@example.com";

/// State over a shared in-memory repository, so the test can inspect the store
/// after driving handlers.
pub fn test_state(repo: Arc<MemoryRepository>) -> AppState {
    AppState {
        repo,
        storage: Arc::new(MockStorageService::new()),
        config: AppConfig::default(),
    }
}

pub fn product_request(name: &str) -> CreateProductRequest {
    CreateProductRequest {
        name: Some(name.to_string()),
        owner_name: Some("Owner".to_string()),
        owner_email: Some("owner@example.com".to_string()),
        ..CreateProductRequest::default()
    }
}

/// Inserts a product through the repository and moves it to `status`.
pub async fn create_with_status(repo: &MemoryRepository, name: &str, status: ProductStatus) -> Product {
    let created = repo
        .insert_product(product_request(name).validate().unwrap())
        .await
        .unwrap();
    if status == ProductStatus::Pending {
        return created;
    }
    repo.set_status(created.id, status).await.unwrap().unwrap()
}

/// A stored product with an explicit creation time `minutes_ago` in the past.
pub fn seeded_product(name: &str, status: ProductStatus, minutes_ago: i64) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: name.to_string(),
        category: "General".to_string(),
        owner_name: "Owner".to_string(),
        owner_email: "owner@example.com".to_string(),
        status,
        timestamp: Utc::now() - Duration::minutes(minutes_ago),
        ..Product::default()
    }
}
