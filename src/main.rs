use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use baranki_market::entities::{seed_admin, setup_schema};
use baranki_market::{create_api_router, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let db: DatabaseConnection = Database::connect(&config.database_url).await?;
    setup_schema(&db).await?;

    if let Some(admin) = &config.admin {
        seed_admin(&db, &admin.username, &admin.password).await?;
    }

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "Running");

    let app = create_api_router(Arc::new(db), Arc::new(config));
    axum::serve(listener, app).await?;

    Ok(())
}
