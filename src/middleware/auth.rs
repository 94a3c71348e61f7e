use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::{
    error::{AppError, AppResult},
    utils::{auth::ACCESS_COOKIE, verify_token, TokenType},
    AppState,
};

/// The caller behind a verified access cookie, available to handlers as an
/// `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub username: String,
}

pub async fn get_current_user(cookies: &Cookies, state: &AppState) -> AppResult<AuthenticatedUser> {
    let token = cookies
        .get(ACCESS_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Authentication credentials were not provided.".into()))?;

    let claims = verify_token(&token, TokenType::Access, &state.jwt)?;
    let user_id = claims
        .user_id()
        .ok_or_else(|| AppError::Unauthorized("Token contained no recognizable user identification".into()))?;

    let user = state
        .repos
        .users
        .find_by_id(user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthorized("User not found or inactive".into()))?;

    Ok(AuthenticatedUser {
        id: user.id,
        username: user.username,
    })
}

/// Rejects the request with 401 unless it carries a valid access cookie.
pub async fn require_auth(
    State(state): State<AppState>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = get_current_user(&cookies, &state).await.map_err(|e| {
        log::warn!("{} {} rejected: {}", req.method(), req.uri().path(), e);
        e
    })?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
