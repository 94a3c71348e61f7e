use anyhow::Context;
use dotenvy::dotenv;

use stockroom::{
    config::Config,
    create_router,
    database::{create_database_pool, ensure_user, run_migrations},
    store::Repositories,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    let config = Config::from_env()?;

    let db = create_database_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    run_migrations(&db).await.context("Failed to run migrations")?;

    let repos = Repositories::postgres(db);

    if let Some(admin) = &config.admin {
        ensure_user(repos.users.as_ref(), &admin.username, &admin.password)
            .await
            .context("Failed to create admin user")?;
    }

    let app = create_router(AppState::from_config(repos, &config), config.max_upload_bytes);

    let addr = config.bind_addr();
    log::info!("stockroom server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}
