use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use std::sync::Arc;

use student_portal::config::{Config, StoreBackend};
use student_portal::db::init_db;
use student_portal::docs::ApiDoc;
use student_portal::routes;
use student_portal::state::AppState;
use student_portal::store::object::{LocalObjectStore, ObjectStore};
use student_portal::store::{DocumentStore, MemoryDocumentStore, MySqlDocumentStore};
use student_portal::utils::clock::{Clock, SystemClock};

use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Student portal is running"
}

async fn build_store(config: &Config, clock: Arc<dyn Clock>) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match config.store_backend {
        StoreBackend::Mysql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            let pool = init_db(url).await?;
            let store = MySqlDocumentStore::new(pool, clock);
            store.ensure_schema().await.context("Failed to prepare documents table")?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory document store; nothing survives a restart");
            Ok(Arc::new(MemoryDocumentStore::with_clock(clock)))
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = build_store(&config, clock.clone()).await?;
    let objects: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(
        &config.photo_root,
        config.photo_public_base.clone(),
    ));

    let state = Data::new(AppState::new(&config, store, objects, clock));
    let config_data = Data::new(config.clone());
    let server_addr = config.server_addr.clone();

    info!(addr = %server_addr, backend = ?config.store_backend, "Listening");

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(state.clone())
            .app_data(config_data.clone())
            .service(index)
            // Configure auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, config.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
