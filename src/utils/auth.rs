use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tower_cookies::{cookie::SameSite, Cookie, Cookies};

use crate::{
    config::JwtSettings,
    error::{AppError, AppResult},
    models::User,
};

pub const ACCESS_COOKIE: &str = "access";
pub const REFRESH_COOKIE: &str = "refresh";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub username: String,
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: i64, username: &str, token_type: TokenType, settings: &JwtSettings) -> Self {
        let now = Utc::now();
        let ttl = match token_type {
            TokenType::Access => settings.access_ttl,
            TokenType::Refresh => settings.refresh_ttl,
        };

        Self {
            sub: user_id.to_string(),
            username: username.to_string(),
            token_type,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// An access token and its matching refresh token.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

pub fn create_token(
    user_id: i64,
    username: &str,
    token_type: TokenType,
    settings: &JwtSettings,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims::new(user_id, username, token_type, settings);

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.secret.as_ref()),
    )
}

pub fn create_token_pair(user_id: i64, username: &str, settings: &JwtSettings) -> AppResult<TokenPair> {
    Ok(TokenPair {
        access: create_token(user_id, username, TokenType::Access, settings)?,
        refresh: create_token(user_id, username, TokenType::Refresh, settings)?,
    })
}

/// Decodes and checks signature, expiry and token type.
pub fn verify_token(token: &str, expected: TokenType, settings: &JwtSettings) -> AppResult<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {e}")))?;

    if token_data.claims.token_type != expected {
        return Err(AppError::Unauthorized("Token has wrong type".to_string()));
    }

    Ok(token_data.claims)
}

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    bcrypt::verify(password, hash)
}

/// Returns the user only if it is active and the password matches.
pub fn check_credentials(user: Option<User>, password: &str) -> Option<User> {
    let user = user.filter(|u| u.is_active)?;
    if verify_password(password, &user.password_hash).unwrap_or(false) {
        Some(user)
    } else {
        None
    }
}

fn session_cookie(name: &'static str, value: String, settings: &JwtSettings) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(settings.cookie_max_age)
        .build()
}

pub fn set_session_cookies(cookies: &Cookies, tokens: TokenPair, settings: &JwtSettings) {
    cookies.add(session_cookie(ACCESS_COOKIE, tokens.access, settings));
    cookies.add(session_cookie(REFRESH_COOKIE, tokens.refresh, settings));
}

/// Always emits expiring cookies, whether or not the request carried any.
pub fn clear_session_cookies(cookies: &Cookies) {
    for name in [ACCESS_COOKIE, REFRESH_COOKIE] {
        let mut cookie = Cookie::build((name, "")).path("/").http_only(true).build();
        cookie.make_removal();
        cookies.add(cookie);
    }
}
