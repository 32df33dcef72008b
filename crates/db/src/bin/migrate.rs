//! Apply the document model migrations to `DATABASE_URL`.

use docbase_db::config::DbConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docbase_db=info,docbase_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DbConfig::from_env()?;
    tracing::info!(max_connections = config.max_connections, "Connecting to database");

    let pool = docbase_db::create_pool(&config).await?;
    docbase_db::health_check(&pool).await?;
    tracing::info!("Database connection established");

    docbase_db::run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(())
}
