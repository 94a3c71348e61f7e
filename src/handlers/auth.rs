use axum::{extract::State, http::StatusCode};
use tower_cookies::Cookies;

use crate::{
    error::{AppError, AppResult},
    models::LoginRequest,
    utils::{
        auth::REFRESH_COOKIE, check_credentials, clear_session_cookies, create_token_pair,
        set_session_cookies, verify_token, TokenType, ValidJson,
    },
    AppState,
};

/// Sets the access and refresh cookies for valid credentials. Failed logins
/// set no cookies.
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    ValidJson(credentials): ValidJson<LoginRequest>,
) -> AppResult<StatusCode> {
    let user = state
        .repos
        .users
        .find_by_username(&credentials.username)
        .await?;
    let user = check_credentials(user, &credentials.password).ok_or_else(|| {
        log::warn!("failed login for {}", credentials.username);
        AppError::Unauthorized("No active account found with the given credentials".into())
    })?;

    let tokens = create_token_pair(user.id, &user.username, &state.jwt)?;
    set_session_cookies(&cookies, tokens, &state.jwt);

    log::info!("user {} logged in", user.username);
    Ok(StatusCode::OK)
}

/// Rotates both cookies from a valid refresh cookie.
pub async fn refresh(State(state): State<AppState>, cookies: Cookies) -> AppResult<StatusCode> {
    let token = cookies
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("No refresh token".into()))?;

    let claims = verify_token(&token, TokenType::Refresh, &state.jwt)?;
    let user = match claims.user_id() {
        Some(id) => state.repos.users.find_by_id(id).await?,
        None => None,
    }
    .filter(|u| u.is_active)
    .ok_or_else(|| AppError::Unauthorized("User not found or inactive".into()))?;

    let tokens = create_token_pair(user.id, &user.username, &state.jwt)?;
    set_session_cookies(&cookies, tokens, &state.jwt);
    Ok(StatusCode::OK)
}

pub async fn logout(cookies: Cookies) -> StatusCode {
    clear_session_cookies(&cookies);
    StatusCode::OK
}
