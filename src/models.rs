use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

/// Longest tag accepted after trimming, counted in characters.
pub const MAX_TAG_LEN: usize = 30;

/// Returned when a TEXT column holds a value outside its enum.
#[derive(Debug, Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

// --- Enumerations ---

/// ProductStatus
///
/// Moderation state. New products start as `Pending`; moderators move them to
/// `Accepted` or `Rejected`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default,
)]
#[ts(export)]
pub enum ProductStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl ProductStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductStatus::Pending => "Pending",
            ProductStatus::Accepted => "Accepted",
            ProductStatus::Rejected => "Rejected",
        }
    }

    /// Parses the target of a moderation action. Only `Accepted` and `Rejected`
    /// are reachable this way; `Pending` and anything else yield `None`.
    pub fn moderation_target(raw: &str) -> Option<Self> {
        match raw {
            "Accepted" => Some(ProductStatus::Accepted),
            "Rejected" => Some(ProductStatus::Rejected),
            _ => None,
        }
    }
}

impl TryFrom<String> for ProductStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Pending" => Ok(ProductStatus::Pending),
            "Accepted" => Ok(ProductStatus::Accepted),
            "Rejected" => Ok(ProductStatus::Rejected),
            _ => Err(UnknownVariant {
                kind: "status",
                value,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub enum PricingType {
    #[default]
    Free,
    Paid,
    Freemium,
    Subscription,
    #[serde(rename = "One-Time")]
    OneTime,
}

impl PricingType {
    pub fn as_str(self) -> &'static str {
        match self {
            PricingType::Free => "Free",
            PricingType::Paid => "Paid",
            PricingType::Freemium => "Freemium",
            PricingType::Subscription => "Subscription",
            PricingType::OneTime => "One-Time",
        }
    }
}

impl TryFrom<String> for PricingType {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Free" => Ok(PricingType::Free),
            "Paid" => Ok(PricingType::Paid),
            "Freemium" => Ok(PricingType::Freemium),
            "Subscription" => Ok(PricingType::Subscription),
            "One-Time" => Ok(PricingType::OneTime),
            _ => Err(UnknownVariant {
                kind: "pricingType",
                value,
            }),
        }
    }
}

// --- Core Schemas (Mapped to Database) ---

/// Comment
///
/// One entry of a product's comment thread, stored inline in the `comments` JSONB column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Comment {
    pub user_name: String,
    pub user_image: String,
    pub text: String,
}

/// Product
///
/// A submitted product with its descriptive fields, engagement counters and
/// moderation state. Serialized with the camelCase keys and `_id` identity the
/// web client reads.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub features: Vec<String>,
    pub video_url: Option<String>,
    pub video_file: Option<String>,
    pub images: Vec<String>,
    pub website_url: Option<String>,
    #[sqlx(try_from = "String")]
    pub pricing_type: PricingType,

    // Ownership is a plain string match, no foreign key.
    pub owner_name: String,
    pub owner_image: Option<String>,
    pub owner_email: String,

    // Engagement. `votes` always equals `voted_users.len()`.
    pub tags: Vec<String>,
    pub votes: i64,
    pub voted_users: Vec<String>,
    #[sqlx(json)]
    pub comments: Vec<Comment>,
    pub reports: Vec<String>,

    #[sqlx(try_from = "String")]
    pub status: ProductStatus,
    pub is_featured: bool,

    /// Creation time. Set once on insert.
    #[sqlx(rename = "created_at")]
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
}

/// User
///
/// A platform account, created lazily on first sign-in. `role` is free text:
/// "user", "moderator" or "admin" in practice, but never validated on update.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub photo: Option<String>,
    pub role: String,
}

pub const DEFAULT_ROLE: &str = "user";

// --- Request Payloads (Input Schemas) ---

/// CreateProductRequest
///
/// Body of POST /products/add-product. Every field is optional at the wire level so
/// that missing required fields surface as a 400 with a readable message. Any
/// engagement fields a client sends (votes, comments, ...) are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct CreateProductRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub features: Option<Vec<String>>,
    pub video_url: Option<String>,
    pub video_file: Option<String>,
    pub images: Option<Vec<String>>,
    pub website_url: Option<String>,
    #[schema(example = "Freemium")]
    pub pricing_type: Option<String>,
    pub owner_name: Option<String>,
    pub owner_image: Option<String>,
    pub owner_email: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// NewProduct
///
/// A validated submission, ready to be inserted. Engagement counters are not
/// part of it: the store always starts them empty.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub features: Vec<String>,
    pub video_url: Option<String>,
    pub video_file: Option<String>,
    pub images: Vec<String>,
    pub website_url: Option<String>,
    pub pricing_type: PricingType,
    pub owner_name: String,
    pub owner_image: Option<String>,
    pub owner_email: String,
    pub tags: Vec<String>,
}

fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::validation(format!("{field} is required"))),
    }
}

impl CreateProductRequest {
    /// Checks required fields and the pricing enum, and normalizes the initial tags.
    pub fn validate(self) -> Result<NewProduct, AppError> {
        let name = required(self.name, "name")?;
        let owner_name = required(self.owner_name, "ownerName")?;
        let owner_email = required(self.owner_email, "ownerEmail")?;

        let pricing_type = match self.pricing_type {
            None => PricingType::default(),
            Some(raw) => PricingType::try_from(raw).map_err(|e| AppError::validation(e.to_string()))?,
        };

        let mut tags: Vec<String> = Vec::new();
        for raw in self.tags.unwrap_or_default() {
            let tag = normalize_tag(&raw)?;
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        Ok(NewProduct {
            name,
            category: self
                .category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| "General".to_string()),
            description: self.description,
            long_description: self.long_description,
            features: self.features.unwrap_or_default(),
            video_url: self.video_url,
            video_file: self.video_file,
            images: self.images.unwrap_or_default(),
            website_url: self.website_url,
            pricing_type,
            owner_name,
            owner_image: self.owner_image,
            owner_email,
            tags,
        })
    }
}

impl NewProduct {
    /// Materializes the stored record: fresh id, zeroed engagement, `Pending`, not featured.
    pub fn into_product(self, id: Uuid, timestamp: DateTime<Utc>) -> Product {
        Product {
            id,
            name: self.name,
            category: self.category,
            description: self.description,
            long_description: self.long_description,
            features: self.features,
            video_url: self.video_url,
            video_file: self.video_file,
            images: self.images,
            website_url: self.website_url,
            pricing_type: self.pricing_type,
            owner_name: self.owner_name,
            owner_image: self.owner_image,
            owner_email: self.owner_email,
            tags: self.tags,
            votes: 0,
            voted_users: vec![],
            comments: vec![],
            reports: vec![],
            status: ProductStatus::Pending,
            is_featured: false,
            timestamp,
        }
    }
}

/// normalize_tag
///
/// Trims and lowercases a tag. Rejects empty results and tags longer than
/// `MAX_TAG_LEN` characters.
pub fn normalize_tag(raw: &str) -> Result<String, AppError> {
    let tag = raw.trim().to_lowercase();
    if tag.is_empty() {
        return Err(AppError::validation("Tag cannot be empty."));
    }
    if tag.chars().count() > MAX_TAG_LEN {
        return Err(AppError::validation(format!(
            "Tag is too long (max {MAX_TAG_LEN} characters)."
        )));
    }
    Ok(tag)
}

/// StatusUpdateRequest
///
/// Body of PATCH /products/{id}. Kept as a raw string so that values outside
/// {Accepted, Rejected} are reported as a 400 rather than a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct StatusUpdateRequest {
    #[schema(example = "Accepted")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct CommentInput {
    pub user_name: Option<String>,
    pub user_image: Option<String>,
    pub text: Option<String>,
}

/// AddCommentRequest
///
/// Body of POST /products/{id}/comment: `{ "comment": { userName, userImage, text } }`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(default)]
#[ts(export)]
pub struct AddCommentRequest {
    pub comment: Option<CommentInput>,
}

impl AddCommentRequest {
    /// Builds the stored comment, defaulting the author to "Anonymous".
    pub fn into_comment(self) -> Result<Comment, AppError> {
        let input = self.comment.unwrap_or_default();
        let text = match input.text {
            Some(t) if !t.trim().is_empty() => t,
            _ => return Err(AppError::validation("Comment cannot be empty.")),
        };

        Ok(Comment {
            user_name: input
                .user_name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "Anonymous".to_string()),
            user_image: input.user_image.unwrap_or_default(),
            text,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AddTagRequest {
    #[schema(example = "AI")]
    pub tag: Option<String>,
}

/// CreateUserRequest
///
/// Body of POST /api/users, sent by the client after every sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(default)]
#[ts(export)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: String,
    pub photo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RoleUpdateRequest {
    pub role: Option<String>,
}

/// TokenRequest
///
/// Claims the client wants embedded in its bearer token (POST /api/jwt).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(default)]
#[ts(export)]
pub struct TokenRequest {
    pub email: String,
    pub name: Option<String>,
    pub photo: Option<String>,
}

// --- Response Schemas (Output) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InsertedResponse {
    pub inserted_id: Uuid,
}

/// ProductPage
///
/// One page of the public catalogue plus the page count for the current filter.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StatusUpdateResponse {
    pub message: String,
    pub updated_product: Product,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct FeatureResponse {
    pub message: String,
    pub product: Product,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpvoteResponse {
    pub message: String,
    pub votes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CommentResponse {
    pub message: String,
    pub comment: Comment,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct TagResponse {
    pub message: String,
    pub tags: Vec<String>,
}

/// UserCreatedResponse
///
/// `newUser` is only present when the call actually created the record.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserCreatedResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_user: Option<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RoleResponse {
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RoleUpdateResponse {
    pub modified_count: u64,
}

/// StatsResponse
///
/// Dashboard counters. `totalReviews` and `totalUsers` are part of the contract
/// but are always zero.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StatsResponse {
    pub total_products: i64,
    pub accepted: i64,
    pub pending: i64,
    pub rejected: i64,
    pub total_reviews: i64,
    pub total_users: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ImageUploadResponse {
    pub image_url: String,
}
