//! # Campus API Server
//!
//! The main entry point for the Actix-web HTTP server.

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

use campus_infra::Janitor;

mod config;
mod handlers;
mod middleware;
mod state;
mod telemetry;

use config::AppConfig;
use state::AppState;
use telemetry::TelemetryConfig;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();
    tracing::info!("Starting Campus API Server on {}:{}", config.host, config.port);

    // Policy misconfiguration stops the process here, never at request time.
    let state = AppState::new(&config).await?;
    let janitor = Janitor::spawn(state.selector.clone(), config.sweep_interval);

    let app_state = state.clone();
    let max_upload_bytes = config.max_upload_bytes;

    HttpServer::new(move || {
        let state = app_state.clone();
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .app_data(web::PayloadConfig::new(max_upload_bytes))
            .configure(|cfg| handlers::configure_routes(cfg, &state))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    janitor.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}
