//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{CloudinaryAdapter, DbAdapter, GenAiAdapter, OpenAiTopicAdapter},
    config::Config,
    error::ApiError,
    sweep::spawn_daily_sweep,
    web::{router, AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use study_assistant_core::ports::TopicContentService;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");
    info!("GenAI service at {}", config.genai_base_url);

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let cloudinary = config.cloudinary.clone().ok_or_else(|| {
        ApiError::Internal(
            "CLOUDINARY_CLOUD_NAME, CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET are required"
                .to_string(),
        )
    })?;
    let storage_adapter = Arc::new(CloudinaryAdapter::new(cloudinary)?);
    let genai_adapter = Arc::new(GenAiAdapter::new(
        config.genai_base_url.clone(),
        config.genai_timeout,
    )?);

    let topic_adapter: Arc<dyn TopicContentService> = match &config.openai_api_key {
        Some(api_key) => {
            let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
            if let Some(base_url) = &config.openai_base_url {
                openai_config = openai_config.with_api_base(base_url);
            }
            info!("Topic content via model {}", config.topic_model);
            Arc::new(OpenAiTopicAdapter::new(
                Client::with_config(openai_config),
                config.topic_model.clone(),
                config.genai_timeout,
            ))
        }
        None => {
            info!("OPENAI_API_KEY not set; topic content via the GenAI service");
            genai_adapter.clone()
        }
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        db_adapter.clone(),
        storage_adapter,
        genai_adapter,
        topic_adapter,
        config.clone(),
    ));

    // --- 5. Start the Delay Sweep ---
    let shutdown = CancellationToken::new();
    let sweep = spawn_daily_sweep(db_adapter, shutdown.clone());

    // --- 6. Create the Web Router ---
    let app = router(app_state);

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received.");
            }
            server_shutdown.cancel();
        })
        .await?;

    shutdown.cancel();
    sweep
        .await
        .map_err(|e| ApiError::Internal(format!("Delay sweep task failed: {}", e)))?;
    info!("Server stopped.");

    Ok(())
}
