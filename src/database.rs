use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{
    error::AppResult,
    models::NewUser,
    store::UserRepository,
    utils::hash_password,
};

pub type Database = Pool<Postgres>;

pub async fn create_database_pool(database_url: &str) -> Result<Database, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    // Test the connection
    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    log::info!("Connected to database successfully");
    Ok(pool)
}

pub async fn run_migrations(pool: &Database) -> AppResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Creates the account unless a user with that name already exists.
pub async fn ensure_user(
    users: &dyn UserRepository,
    username: &str,
    password: &str,
) -> AppResult<bool> {
    if users.find_by_username(username).await?.is_some() {
        return Ok(false);
    }
    users
        .insert(NewUser {
            username: username.to_string(),
            password_hash: hash_password(password)?,
        })
        .await?;
    log::info!("created user {}", username);
    Ok(true)
}
