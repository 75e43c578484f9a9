//! Lectern Server - digital library lending backend

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lectern_server::{
    api, config::AppConfig, repository::Repository, services::Services, AppState,
};

/// Interval between automatic monthly activity reports
const MONTHLY_REPORT_INTERVAL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("lectern_server={},tower_http=debug", config.logging.level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Lectern Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Initialize the Redis listing cache
    let cache = lectern_server::services::cache::CacheService::new(&config.cache)
        .await
        .expect("Failed to connect to Redis");

    if config.cache.enabled {
        tracing::info!("Connected to Redis");
    }

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create repository and services
    let repository = Repository::new(pool);
    let services = Services::new(
        repository,
        config.auth.clone(),
        config.email.clone(),
        cache,
    )
    .expect("Failed to create services");

    // Ensure the seed librarian account exists
    services
        .users
        .seed_librarian()
        .await
        .expect("Failed to seed librarian account");

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    spawn_monthly_report_task(state.clone());

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically email the monthly activity report. Skips the tick at
/// startup so a restart does not resend the report.
fn spawn_monthly_report_task(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(MONTHLY_REPORT_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = state.services.reports.send_monthly_report().await {
                tracing::error!("Monthly report failed: {}", e);
            }
        }
    });
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication
        .route("/auth/signup", post(api::auth::signup))
        .route("/auth/login", post(api::auth::login))
        .route("/auth/me", get(api::auth::me))
        // Users
        .route("/users", get(api::users::list_users))
        .route("/users/:id", get(api::users::get_user))
        .route("/users/:id", put(api::users::update_user))
        .route("/users/:id", delete(api::users::delete_user))
        .route("/users/:id/role", put(api::users::update_role))
        // Sections
        .route("/sections", get(api::catalog::list_sections))
        .route("/sections", post(api::catalog::create_section))
        .route("/sections/:id", get(api::catalog::get_section))
        .route("/sections/:id", put(api::catalog::update_section))
        .route("/sections/:id", delete(api::catalog::delete_section))
        // Authors
        .route("/authors", get(api::catalog::list_authors))
        .route("/authors", post(api::catalog::create_author))
        .route("/authors/:id", get(api::catalog::get_author))
        .route("/authors/:id", put(api::catalog::update_author))
        .route("/authors/:id", delete(api::catalog::delete_author))
        // Books
        .route("/books", get(api::books::list_books))
        .route("/books", post(api::books::create_book))
        .route("/books/:id", get(api::books::get_book))
        .route("/books/:id", put(api::books::update_book))
        .route("/books/:id", delete(api::books::delete_book))
        .route("/books/:id/access", get(api::books::get_book_access))
        .route("/books/:id/content", get(api::books::download_book_content))
        .route("/books/:id/reviews", get(api::books::list_reviews))
        .route("/books/:id/reviews", post(api::books::create_review))
        // Lending lifecycle
        .route("/books/:id/request", post(api::lending::create_request))
        .route("/books/:id/request", delete(api::lending::withdraw_request))
        .route("/books/:id/return", post(api::lending::return_book))
        .route("/books/:id/purchase", post(api::lending::create_purchase))
        .route("/requests", get(api::lending::list_requests))
        .route("/requests/:id/issue", post(api::lending::issue_book))
        .route("/requests/:id/reject", post(api::lending::reject_request))
        .route("/issues", get(api::lending::list_issues))
        .route("/issues/:id/return", post(api::lending::return_book_by_id))
        .route("/purchases", get(api::lending::list_purchases))
        // Reports
        .route("/reports/issues-csv", post(api::reports::export_issues_csv))
        .route("/stats", get(api::reports::get_stats))
        .with_state(state.clone());

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
