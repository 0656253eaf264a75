use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use sea_orm::{ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, Set, SqlErr};

use crate::common::AppState;
use crate::entity::users;
use crate::error::{AppError, AppResult};
use crate::routes::extract::{non_blank, ApiJson};

use super::types::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use super::validation::{is_valid_password, PASSWORD_RULES};

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = RegisterResponse),
        (status = 400, description = "Missing fields or weak password"),
        (status = 409, description = "Email or phone number already registered"),
    ),
    tag = "users"
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let (Some(name), Some(email), Some(phone_no), Some(address), Some(password)) = (
        non_blank(body.name),
        non_blank(body.email),
        non_blank(body.phone_no),
        non_blank(body.address),
        body.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::BadRequest("All fields are required.".to_string()));
    };

    if !is_valid_password(&password) {
        return Err(AppError::BadRequest(PASSWORD_RULES.to_string()));
    }

    let user = users::ActiveModel {
        user_id: NotSet,
        name: Set(name),
        email: Set(email),
        phone_no: Set(phone_no),
        address: Set(address),
        password: Set(password),
        created_at: Set(Some(Utc::now())),
    };

    let result = users::Entity::insert(user)
        .exec(state.db.as_ref())
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict(
                "A user with this email or phone number already exists.".to_string(),
            ),
            _ => AppError::Database(e),
        })?;

    tracing::info!(user_id = result.last_insert_id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully!".to_string(),
            user_id: result.last_insert_id,
        }),
    ))
}

/// Log in with phone number and password
#[utoipa::path(
    post,
    path = "/api/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing phone number or password"),
        (status = 401, description = "Invalid credentials"),
    ),
    tag = "users"
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (Some(phone_no), Some(password)) = (
        non_blank(body.phone_no),
        body.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::BadRequest(
            "Phone number and password are required.".to_string(),
        ));
    };

    let user = users::Entity::find()
        .filter(users::Column::PhoneNo.eq(phone_no))
        .filter(users::Column::Password.eq(password))
        .one(state.db.as_ref())
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid phone number or password.".to_string()))?;

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        user_id: user.user_id,
        name: user.name,
    }))
}
