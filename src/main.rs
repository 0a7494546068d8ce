use credit_ledger::{
    api::{self, ApiState},
    config::{self, database},
    errors::Result,
};
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Ledger policies and scheduler settings
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Critical error loading application configuration: {}", e))?;

    // 4. Database and schema
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Serve the scheduler trigger and invoices
    let bind_address = app_config.scheduler.bind_address.clone();
    let router = api::router(ApiState {
        db: Arc::new(db),
        ledger: app_config.ledger,
        scheduler: app_config.scheduler,
    });

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Credit ledger listening on {}", bind_address);
    axum::serve(listener, router).await?;

    Ok(())
}
