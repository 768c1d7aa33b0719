#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for crime risk prediction.
//!
//! Serves the REST API a map frontend uses to geocode a destination,
//! resolve its precinct and borough, and predict the most likely crime
//! category for the visitor. Model artifacts are loaded once at startup;
//! boundary data failing to load leaves the server up with prediction
//! disabled.

mod handlers;

use std::path::PathBuf;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use crime_risk_geocoder::Geocoder;
use crime_risk_predictor::{PredictionContext, paths};
use crime_risk_spatial::{LocatorError, SpatialLocator};

/// Shared application state.
pub struct AppState {
    /// Fitted encoder and classifier.
    pub context: Arc<PredictionContext>,
    /// Boundary lookup, or why it couldn't be loaded.
    pub locator: Result<SpatialLocator, LocatorError>,
    /// Address lookup client.
    pub geocoder: Geocoder,
}

impl AppState {
    /// The locator, if boundary data loaded.
    #[must_use]
    pub fn locator(&self) -> Option<&SpatialLocator> {
        self.locator.as_ref().ok()
    }
}

/// Where the server reads its data and listens.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub model_dir: PathBuf,
    pub boundaries_dir: PathBuf,
    pub bind_addr: String,
    pub port: u16,
}

impl ServerConfig {
    /// Reads `BIND_ADDR` (default `127.0.0.1`) and `PORT` (default `8080`);
    /// data paths come from [`paths`].
    #[must_use]
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        Self {
            model_dir: paths::model_dir(),
            boundaries_dir: paths::boundaries_dir(),
            bind_addr,
            port,
        }
    }
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/categories", web::get().to(handlers::categories))
            .route("/options", web::get().to(handlers::options))
            .route("/locate", web::post().to(handlers::locate))
            .route("/predict", web::post().to(handlers::predict))
            .route("/geocode", web::get().to(handlers::geocode)),
    );
}

/// Loads model and boundary data as described by `config`.
///
/// # Errors
///
/// Returns an error if the model artifacts fail to load or the HTTP client
/// can't be built. A boundary loading failure is logged and kept in
/// [`AppState::locator`] instead.
pub fn load_state(
    config: &ServerConfig,
) -> Result<AppState, Box<dyn std::error::Error + Send + Sync>> {
    let context = PredictionContext::load(&config.model_dir)?;

    log::info!(
        "Loading boundaries from {}...",
        config.boundaries_dir.display()
    );
    let locator = SpatialLocator::load(&config.boundaries_dir);
    if let Err(e) = &locator {
        log::error!("Locator unavailable, predictions disabled: {e}");
    }

    let geocoder = Geocoder::nominatim()?;

    Ok(AppState {
        context: Arc::new(context),
        locator,
        geocoder,
    })
}

/// Starts the crime risk API server.
///
/// This is a regular async function; the caller is responsible for
/// providing the async runtime (e.g. via `#[actix_web::main]`) and for
/// initializing logging.
///
/// # Errors
///
/// Returns an error if the model artifacts fail to load, or if the HTTP
/// server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    let state = web::Data::new(load_state(&config).map_err(std::io::Error::other)?);

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await
}
