// src/handlers/user.rs
use axum::{extract::State, http::StatusCode, Extension, Json};
use tracing::{info, instrument};

use crate::auth::credentials::{
    generate_api_key, hash_password, normalize_email, validate_password, verify_password,
};
use crate::dtos::response::ApiResponse;
use crate::dtos::user::{
    LoginRequest, LoginResponse, RegisterResponse, RegisterUserRequest, RemoveUserRequest,
    UpdateEmailRequest, UpdatePasswordRequest,
};
use crate::error::{required, AppError};
use crate::extract::ApiJson;
use crate::middleware::auth::AuthContext;
use crate::models::user::{NewUser, Role};
use crate::state::AppState;

/// Passwords are taken verbatim; only absence and emptiness count as missing.
fn password_field<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, AppError> {
    value
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or(AppError::MissingField(field))
}

/// Re-checks the caller's current password before an account change.
async fn confirm_password(auth: &AuthContext, password: &str) -> Result<(), AppError> {
    if !verify_password(password, &auth.password_hash).await? {
        return Err(AppError::unauthorized("Invalid credentials"));
    }
    Ok(())
}

#[instrument(skip(state, payload), fields(email = ?payload.email))]
pub async fn register_user(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RegisterResponse>>), AppError> {
    let first_name = required(&payload.first_name, "first_name")?;
    let last_name = required(&payload.last_name, "last_name")?;
    let email = required(&payload.email, "email")?;
    let password = password_field(&payload.password, "password")?;

    let role = match payload.role.as_deref().map(str::trim) {
        None | Some("") => Role::Normal,
        Some(value) => Role::parse(value)
            .ok_or_else(|| AppError::validation("Role must be 'normal' or 'admin'"))?,
    };
    let email = normalize_email(email)?;
    validate_password(password)?;

    let password_hash = hash_password(password, state.password_cost).await?;

    let user = state
        .store
        .create_user(NewUser {
            first_name: first_name.to_owned(),
            last_name: last_name.to_owned(),
            email,
            password_hash,
            role,
            api_key: generate_api_key(),
        })
        .await?;

    info!(user_id = user.id, role = user.role.as_str(), "User registered");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(RegisterResponse { user: user.into() })),
    ))
}

#[instrument(skip(state, payload), fields(email = ?payload.email))]
pub async fn login_user(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    let email = required(&payload.email, "email")?.to_lowercase();
    let password = password_field(&payload.password, "password")?;

    let user = state
        .store
        .user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if !verify_password(password, &user.password_hash).await? {
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    info!(user_id = user.id, "User logged in");

    Ok(Json(ApiResponse::success(LoginResponse {
        token: user.api_key.clone(),
        user: user.into(),
    })))
}

#[instrument(skip(state, auth, payload), fields(user_id = auth.user_id))]
pub async fn update_email(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(payload): ApiJson<UpdateEmailRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let new_email = required(&payload.new_email, "new_email")?;
    let password = password_field(&payload.password, "password")?;

    confirm_password(&auth, password).await?;
    let new_email = normalize_email(new_email)?;
    if new_email == auth.email {
        return Ok(Json(ApiResponse::message("Email unchanged")));
    }

    state.store.update_email(auth.user_id, &new_email).await?;

    info!("Email updated");
    Ok(Json(ApiResponse::message("Email updated")))
}

#[instrument(skip(state, auth, payload), fields(user_id = auth.user_id))]
pub async fn update_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(payload): ApiJson<UpdatePasswordRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let password = password_field(&payload.password, "password")?;
    let new_password = password_field(&payload.new_password, "new_password")?;

    confirm_password(&auth, password).await?;
    validate_password(new_password)?;

    let password_hash = hash_password(new_password, state.password_cost).await?;
    state.store.update_password(auth.user_id, &password_hash).await?;

    info!("Password updated");
    Ok(Json(ApiResponse::message("Password updated")))
}

#[instrument(skip(state, auth, payload), fields(user_id = auth.user_id))]
pub async fn remove_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(payload): ApiJson<RemoveUserRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let password = password_field(&payload.password, "password")?;
    confirm_password(&auth, password).await?;

    if !state.store.delete_user(auth.user_id).await? {
        return Err(AppError::not_found("User not found"));
    }

    info!("User removed");
    Ok(Json(ApiResponse::message("User removed")))
}
