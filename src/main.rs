use std::str::FromStr;
use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use tracing::{error, info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use fichaje::db::init_db;
use fichaje::docs::ApiDoc;
use fichaje::{AppState, Config, MemoryStore, MySqlStore, Store, SystemClock, routes};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "fichaje.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let level = tracing::Level::from_str(&config.log_level).unwrap_or(tracing::Level::DEBUG);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(level)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => Arc::new(MySqlStore::new(init_db(url).await?)),
        None => {
            warn!("DATABASE_URL not set, using the in-memory store; nothing will persist");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::build(store, Arc::new(SystemClock), &config)?;

    match state.directory.warm_name_filter().await {
        Ok(count) => info!(count, "Name filter warmed up"),
        Err(e) => warn!(error = %e, "Failed to warm up name filter"),
    }

    if let (Some(name), Some(pin)) = (&config.bootstrap_hr_name, &config.bootstrap_hr_pin) {
        match state.directory.bootstrap_hr(name, pin).await {
            Ok(Some(hr)) => info!(employee_id = hr.id, "Bootstrapped the first HR manager"),
            Ok(None) => {}
            Err(e) => error!(error = %e, "Failed to bootstrap HR manager"),
        }
    }

    let state = Data::new(state);
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard so JS/CSS assets resolve
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(state.clone())
            .app_data(Data::new(config.clone()))
            .configure(|cfg| routes::configure(cfg, config.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
