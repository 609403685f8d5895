//! User Routes
//!
//! - GET /api/users - List users (?role, ?search, ?page, ?limit)
//! - POST /api/users - Create an admin or wali
//! - GET /api/users/:id - Get a user
//! - PUT /api/users/:id - Update name, email, phone
//! - DELETE /api/users/:id - Delete a user

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use regex::Regex;
use std::sync::{Arc, LazyLock};

use crate::api::dto::{CreateUserRequest, UpdateUserRequest, UserQuery, UserResponse};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::storage::{NewUser, Paged, Role, UserFilter, UserUpdate};

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// GET /api/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> ApiResult<Json<Paged<UserResponse>>> {
    let filter = UserFilter {
        role: query.role.as_deref().map(parse_role).transpose()?,
        search: query.search,
    };
    let page = state.page(query.page, query.limit);

    let users = state
        .db(move |store| store.list_users(&filter, page))
        .await?;
    Ok(Json(users.map(UserResponse::from)))
}

/// GET /api/users/:id
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<UserResponse>> {
    let user = state.db(move |store| store.get_user(id)).await?;
    Ok(Json(user.into()))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    validate_name(&req.name)?;
    validate_email(&req.email)?;
    let role = parse_role(&req.role)?;

    let user = state
        .db(move |store| {
            store.create_user(NewUser {
                name: req.name.trim().to_string(),
                email: req.email.trim().to_lowercase(),
                role,
                phone: non_empty(req.phone),
            })
        })
        .await?;

    tracing::info!(user_id = user.id, role = %user.role, "Created user");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// PUT /api/users/:id
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    let update = user_update(req.name, req.email, req.phone)?;
    let user = state.db(move |store| store.update_user(id, update)).await?;
    Ok(Json(user.into()))
}

/// DELETE /api/users/:id
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    state.db(move |store| store.delete_user(id)).await?;
    tracing::info!(user_id = id, "Deleted user");
    Ok(StatusCode::NO_CONTENT)
}

/// Validated user field changes shared by the user, guru and santri updates
pub(crate) fn user_update(
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
) -> ApiResult<UserUpdate> {
    if let Some(name) = &name {
        validate_name(name)?;
    }
    if let Some(email) = &email {
        validate_email(email)?;
    }
    Ok(UserUpdate {
        name: name.map(|n| n.trim().to_string()),
        email: email.map(|e| e.trim().to_lowercase()),
        phone,
    })
}

pub(crate) fn validate_name(name: &str) -> ApiResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("Name cannot be empty".to_string()));
    }
    if name.len() > 100 {
        return Err(ApiError::Validation(
            "Name must be 100 characters or less".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_email(email: &str) -> ApiResult<()> {
    if !EMAIL_REGEX.is_match(email.trim()) {
        return Err(ApiError::Validation(format!("Invalid email: {}", email)));
    }
    Ok(())
}

pub(crate) fn parse_role(s: &str) -> ApiResult<Role> {
    s.parse()
        .map_err(|_| ApiError::Validation(format!("Invalid role: {}", s)))
}

/// Blank strings become `None`
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("aisyah@example.com").is_ok());
        assert!(validate_email(" umar@pesantren.sch.id ").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("a b@c.com").is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Fatimah").is_ok());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role("wali").unwrap(), Role::Wali);
        assert_eq!(parse_role("ADMIN").unwrap(), Role::Admin);
        assert!(parse_role("principal").is_err());
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(Some(" 0812 ".to_string())).as_deref(), Some("0812"));
        assert_eq!(non_empty(None), None);
    }
}
