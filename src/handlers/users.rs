use crate::{
    AppState,
    error::AppError,
    models::{
        CreateUserRequest, DEFAULT_ROLE, RoleResponse, RoleUpdateRequest, RoleUpdateResponse,
        User, UserCreatedResponse,
    },
    repository::UserUpsert,
};
use axum::{
    Json,
    extract::{Path, State},
};

/// create_user
///
/// [Public Route] Called by the client after every sign-in. Creates the account
/// with role "user" on first sight of an email; otherwise changes nothing.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "Created or already present", body = UserCreatedResponse),
        (status = 400, description = "Missing email")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<UserCreatedResponse>, AppError> {
    if payload.email.trim().is_empty() {
        return Err(AppError::validation("email is required"));
    }

    match state.repo.insert_user_if_absent(payload).await? {
        UserUpsert::Created(user) => {
            tracing::info!(email = %user.email, "user created");
            Ok(Json(UserCreatedResponse {
                message: "User created".to_string(),
                new_user: Some(user),
            }))
        }
        UserUpsert::Existing(_) => Ok(Json(UserCreatedResponse {
            message: "User already exists".to_string(),
            new_user: None,
        })),
    }
}

/// list_users
///
/// [Public Route] Every user record, unfiltered and unpaginated.
#[utoipa::path(
    get,
    path = "/api/users",
    responses((status = 200, description = "All users", body = [User]))
)]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.repo.list_users().await?))
}

/// get_role
///
/// [Public Route] The role stored for `email`, or "user" when there is no record.
#[utoipa::path(
    get,
    path = "/api/users/role/{email}",
    params(("email" = String, Path, description = "User email")),
    responses((status = 200, description = "Role", body = RoleResponse))
)]
pub async fn get_role(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<RoleResponse>, AppError> {
    let role = state
        .repo
        .find_user(&email)
        .await?
        .map(|u| u.role)
        .unwrap_or_else(|| DEFAULT_ROLE.to_string());
    Ok(Json(RoleResponse { role }))
}

/// get_user
///
/// [Public Route] Same answer as `get_role`, but 404 when the email is unknown.
#[utoipa::path(
    get,
    path = "/api/users/{email}",
    params(("email" = String, Path, description = "User email")),
    responses(
        (status = 200, description = "Role", body = RoleResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<RoleResponse>, AppError> {
    let user = state
        .repo
        .find_user(&email)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    Ok(Json(RoleResponse { role: user.role }))
}

/// update_role
///
/// [Public Route] Stores the supplied role verbatim. Neither the caller nor the
/// value is checked. A body without `role` changes nothing.
#[utoipa::path(
    patch,
    path = "/api/users/role/{email}",
    params(("email" = String, Path, description = "User email")),
    request_body = RoleUpdateRequest,
    responses((status = 200, description = "Number of records changed", body = RoleUpdateResponse))
)]
pub async fn update_role(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Json(payload): Json<RoleUpdateRequest>,
) -> Result<Json<RoleUpdateResponse>, AppError> {
    let modified_count = match payload.role {
        Some(role) => {
            let n = state.repo.update_role(&email, &role).await?;
            if n > 0 {
                tracing::warn!(email = %email, role = %role, "role changed without authorization");
            }
            n
        }
        None => 0,
    };
    Ok(Json(RoleUpdateResponse { modified_count }))
}
