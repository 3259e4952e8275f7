use bookshelf::{
    book::{BookRepository, InMemoryBookRepository, PostgresBookRepository},
    build_router,
    image::{CloudinaryImageStore, ImageStore, InMemoryImageStore},
    session::TokenConfig,
    user::{InMemoryUserRepository, PasswordHasher, PostgresUserRepository, UserRepository},
    AppConfig, AppState,
};
use sqlx::postgres::PgPoolOptions;
use std::error::Error;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type UserRepo = Arc<dyn UserRepository + Send + Sync>;
type BookRepo = Arc<dyn BookRepository + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookshelf=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting bookshelf server");

    let config = AppConfig::from_env().inspect_err(|e| error!(error = %e, "Invalid configuration"))?;

    let (user_repository, book_repository): (UserRepo, BookRepo) = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .acquire_timeout(config.external_timeout)
                .connect(database_url)
                .await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Connected to PostgreSQL and applied migrations");

            (
                Arc::new(PostgresUserRepository::new(pool.clone())),
                Arc::new(PostgresBookRepository::new(pool)),
            )
        }
        None => {
            warn!("DATABASE_URL not set, data is kept in memory only");
            (
                Arc::new(InMemoryUserRepository::new()),
                Arc::new(InMemoryBookRepository::new()),
            )
        }
    };

    let image_store: Arc<dyn ImageStore> = match config.cloudinary.clone() {
        Some(cloudinary) => {
            info!(cloud_name = %cloudinary.cloud_name, "Using Cloudinary image store");
            Arc::new(CloudinaryImageStore::new(cloudinary)?)
        }
        None => {
            warn!("Cloudinary not configured, images are kept in memory only");
            Arc::new(InMemoryImageStore::new())
        }
    };

    // Create shared application state with dependency injection
    let app_state = AppState::new(
        user_repository,
        book_repository,
        image_store,
        TokenConfig::new(config.jwt_secret.clone(), config.jwt_expires_in),
        PasswordHasher::new(config.password_hash_iterations),
    );

    let app = build_router(app_state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(port = config.port, "Server running on http://localhost:{}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
