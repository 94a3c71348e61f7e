pub mod auth;
pub mod extract;

pub use auth::{
    check_credentials, clear_session_cookies, create_token_pair, hash_password,
    set_session_cookies, verify_token, TokenType,
};
pub use extract::ValidJson;
