use crate::{
    AppState,
    auth::issue_token,
    error::AppError,
    models::{ImageUploadResponse, TokenRequest, TokenResponse},
};
use axum::{
    Json,
    extract::{Multipart, State},
};
use uuid::Uuid;

/// issue_jwt
///
/// [Public Route] Signs a bearer token carrying the posted claims. The token is
/// what the authenticated routes expect in `Authorization: Bearer <token>`.
#[utoipa::path(
    post,
    path = "/api/jwt",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Signed token", body = TokenResponse),
        (status = 400, description = "Missing email")
    )
)]
pub async fn issue_jwt(
    State(state): State<AppState>,
    Json(payload): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let token = issue_token(&state.config, payload)?;
    Ok(Json(TokenResponse { token }))
}

/// Picks the object extension from the filename, then from the MIME subtype.
fn image_extension(filename: Option<&str>, content_type: &str) -> String {
    filename
        .and_then(|f| std::path::Path::new(f).extension())
        .and_then(std::ffi::OsStr::to_str)
        .map(str::to_lowercase)
        .or_else(|| {
            content_type
                .strip_prefix("image/")
                .and_then(|sub| sub.split(['+', ';']).next())
                .map(str::trim)
                .filter(|sub| !sub.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "bin".to_string())
}

/// upload_image
///
/// [Public Route] Accepts a multipart form with one `image` part, writes it to
/// object storage under the configured prefix with a random name, and returns
/// the public URL.
#[utoipa::path(
    post,
    path = "/api/upload/upload-image",
    responses(
        (status = 200, description = "Stored", body = ImageUploadResponse),
        (status = 400, description = "Missing or non-image part"),
        (status = 500, description = "Upload failed")
    )
)]
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImageUploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(e.body_text()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        if !content_type.starts_with("image/") {
            return Err(AppError::validation("Only image uploads are accepted."));
        }

        let extension = image_extension(field.file_name(), &content_type);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;
        if bytes.is_empty() {
            return Err(AppError::validation("Image file is empty."));
        }

        let key = format!(
            "{}/{}.{}",
            state.config.upload_prefix,
            Uuid::new_v4(),
            extension
        );

        return match state
            .storage
            .put_object(&key, &content_type, bytes.to_vec())
            .await
        {
            Ok(image_url) => {
                tracing::info!(key = %key, "image uploaded");
                Ok(Json(ImageUploadResponse { image_url }))
            }
            Err(e) => Err(AppError::Upload(format!("key {key}: {e}"))),
        };
    }

    Err(AppError::validation("No image provided."))
}
