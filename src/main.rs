mod config;
mod database;
mod error;
mod filters;
mod handlers;
mod middleware;
mod models;
mod repository;
mod services;
mod state;
mod utils;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_extractor_with_state,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use dotenvy::dotenv;

use config::Config;
use database::{create_database_pool, ensure_admin_user, run_migrations};
use middleware::CurrentUser;
use state::AppState;

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        log::error!("clinica failed to start: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let db = create_database_pool(&config).await?;
    run_migrations(&db).await?;
    if let Some(seed) = &config.admin {
        ensure_admin_user(&db, seed).await?;
    }

    let addr = config.bind_addr();
    let app = create_router(AppState::new(db, config));

    log::info!("clinica server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router(state: AppState) -> Router {
    // Stored supplier documents are only served to signed-in staff.
    let uploads = ServiceBuilder::new()
        .layer(from_extractor_with_state::<CurrentUser, _>(state.clone()))
        .service(ServeDir::new(&state.config.upload_dir));

    Router::new()
        .route("/health", get(handlers::health))

        // Session
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/me", get(handlers::auth::me))

        // Catalog
        .route(
            "/api/inventario/productos-base",
            get(handlers::inventory::list_brands).post(handlers::inventory::create_brand),
        )
        .route(
            "/api/inventario/variantes",
            get(handlers::inventory::list_variants).post(handlers::inventory::create_variant),
        )

        // Stock lots
        .route("/api/inventario/stock-lotes", get(handlers::inventory::list_lots))
        .route(
            "/api/inventario/stock-lotes/:id",
            put(handlers::inventory::update_lot).delete(handlers::inventory::delete_lot),
        )
        .route("/api/inventario/ingreso", post(handlers::inventory::register_ingress))

        // Availability report
        .route("/api/inventario/disponibilidad", get(handlers::report::availability))
        .route("/inventario/disponibilidad", get(handlers::report::availability_page))
        .route(
            "/inventario/disponibilidad/export",
            get(handlers::report::availability_export),
        )

        // Stored ingress documents
        .nest_service("/uploads", uploads)

        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CookieManagerLayer::new())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB, ingress PDFs
        )
        .with_state(state)
}
