use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};

use geovelocity::api;
use geovelocity::config::Config;
use geovelocity::geolocation::MaxMindResolver;
use geovelocity::persistence::SqliteEventStore;
use geovelocity::TravelAnomalyService;

/// HTTP daemon for impossible-travel detection
#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting geovelocity daemon...");

    // Load configuration
    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = if config_path.exists() {
        Config::from_file(&config_path)?
    } else {
        log::warn!("Config file {:?} not found, using defaults", config_path);
        Config::default()
    };

    let resolver = MaxMindResolver::new(&config.geolocation.database_path)?;
    let store = SqliteEventStore::new(&config.persistence.database_path)?;
    log::info!(
        "Login history at {:?}, threshold {} km/h",
        config.persistence.database_path,
        config.detection.max_velocity_kmh
    );

    let service = web::Data::new(TravelAnomalyService::from_config(
        Arc::new(resolver),
        Arc::new(store),
        &config,
    ));

    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(service.clone())
            .configure(api::configure)
    });
    if let Some(workers) = config.server.workers {
        server = server.workers(workers);
    }

    log::info!("Listening on {}", config.server.bind_address);
    server.bind(config.server.bind_address.as_str())?.run().await?;

    log::info!("Geovelocity daemon stopped");
    Ok(())
}
