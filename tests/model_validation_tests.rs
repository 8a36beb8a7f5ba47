use apporbit::{
    AppError,
    models::{
        AddCommentRequest, CommentInput, CreateProductRequest, PricingType, Product,
        ProductStatus, StatsResponse, normalize_tag,
    },
};
use uuid::Uuid;

fn valid_request() -> CreateProductRequest {
    CreateProductRequest {
        name: Some("Orbit".to_string()),
        owner_name: Some("Ada".to_string()),
        owner_email: Some("ada@example.com".to_string()),
        ..CreateProductRequest::default()
    }
}

#[test]
fn test_create_request_requires_name_owner_name_and_owner_email() {
    for missing in ["name", "ownerName", "ownerEmail"] {
        let mut req = valid_request();
        match missing {
            "name" => req.name = None,
            "ownerName" => req.owner_name = Some("   ".to_string()),
            _ => req.owner_email = None,
        }

        match req.validate() {
            Err(AppError::Validation(msg)) => assert!(msg.contains(missing), "{msg}"),
            other => panic!("expected validation error for {missing}, got {other:?}"),
        }
    }
}

#[test]
fn test_create_request_applies_defaults() {
    let product = valid_request().validate().unwrap();

    assert_eq!(product.category, "General");
    assert_eq!(product.pricing_type, PricingType::Free);
    assert!(product.tags.is_empty());
    assert!(product.features.is_empty());
    assert!(product.images.is_empty());
}

#[test]
fn test_create_request_rejects_unknown_pricing_type() {
    let req = CreateProductRequest {
        pricing_type: Some("Lifetime".to_string()),
        ..valid_request()
    };
    assert!(matches!(req.validate(), Err(AppError::Validation(_))));

    let req = CreateProductRequest {
        pricing_type: Some("One-Time".to_string()),
        ..valid_request()
    };
    assert_eq!(req.validate().unwrap().pricing_type, PricingType::OneTime);
}

#[test]
fn test_create_request_normalizes_initial_tags() {
    let req = CreateProductRequest {
        tags: Some(vec!["AI".to_string(), " ai ".to_string(), "Tools".to_string()]),
        ..valid_request()
    };
    assert_eq!(req.validate().unwrap().tags, vec!["ai", "tools"]);
}

#[test]
fn test_create_request_ignores_client_engagement_fields() {
    let req: CreateProductRequest = serde_json::from_value(serde_json::json!({
        "name": "Orbit",
        "ownerName": "Ada",
        "ownerEmail": "ada@example.com",
        "votes": 99,
        "votedUsers": ["x@example.com"],
        "status": "Accepted",
        "isFeatured": true
    }))
    .unwrap();

    let product = req.validate().unwrap().into_product(Uuid::new_v4(), chrono::Utc::now());
    assert_eq!(product.votes, 0);
    assert!(product.voted_users.is_empty());
    assert!(product.comments.is_empty());
    assert!(product.reports.is_empty());
    assert_eq!(product.status, ProductStatus::Pending);
    assert!(!product.is_featured);
}

#[test]
fn test_normalize_tag() {
    assert_eq!(normalize_tag("  Machine Learning ").unwrap(), "machine learning");
    assert!(matches!(normalize_tag("   "), Err(AppError::Validation(_))));
    assert_eq!(normalize_tag(&"a".repeat(30)).unwrap().len(), 30);
    assert!(matches!(normalize_tag(&"a".repeat(31)), Err(AppError::Validation(_))));
    // Length is measured in characters, after trimming.
    assert!(normalize_tag(&format!("  {}  ", "é".repeat(30))).is_ok());
}

#[test]
fn test_moderation_target_only_accepts_accepted_or_rejected() {
    assert_eq!(ProductStatus::moderation_target("Accepted"), Some(ProductStatus::Accepted));
    assert_eq!(ProductStatus::moderation_target("Rejected"), Some(ProductStatus::Rejected));
    assert_eq!(ProductStatus::moderation_target("Pending"), None);
    assert_eq!(ProductStatus::moderation_target("Approved"), None);
    assert_eq!(ProductStatus::moderation_target("accepted"), None);
}

#[test]
fn test_comment_defaults_and_empty_text() {
    let comment = AddCommentRequest {
        comment: Some(CommentInput {
            text: Some("Nice launch".to_string()),
            ..CommentInput::default()
        }),
    }
    .into_comment()
    .unwrap();
    assert_eq!(comment.user_name, "Anonymous");
    assert_eq!(comment.user_image, "");

    let empty = AddCommentRequest {
        comment: Some(CommentInput {
            user_name: Some("Bob".to_string()),
            text: Some(String::new()),
            ..CommentInput::default()
        }),
    };
    assert!(matches!(empty.into_comment(), Err(AppError::Validation(_))));
    assert!(matches!(
        AddCommentRequest::default().into_comment(),
        Err(AppError::Validation(_))
    ));
}

#[test]
fn test_product_json_uses_client_field_names() {
    let product = Product {
        pricing_type: PricingType::OneTime,
        ..Product::default()
    };
    let json = serde_json::to_value(&product).unwrap();

    assert!(json.get("_id").is_some());
    assert!(json.get("id").is_none());
    assert_eq!(json["pricingType"], "One-Time");
    assert_eq!(json["status"], "Pending");
    assert_eq!(json["isFeatured"], false);
    assert!(json.get("votedUsers").is_some());
    assert!(json.get("timestamp").is_some());
}

#[test]
fn test_stats_json_keeps_zero_fields() {
    let json = serde_json::to_value(StatsResponse::default()).unwrap();
    assert_eq!(json["totalReviews"], 0);
    assert_eq!(json["totalUsers"], 0);
    assert!(json.get("totalProducts").is_some());
}
