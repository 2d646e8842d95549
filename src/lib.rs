// src/lib.rs
//
// Weighbridge — HTTP bridge for a serial scale indicator.
// A background polling task decodes the indicator's weight frames; a small
// JSON API exposes the latest reading and start/stop control.

#[macro_use]
mod logging;

pub mod scale;
pub mod server;
pub mod settings;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::scale::{ScaleConfig, ScaleController};

#[tokio::main]
pub async fn run() -> Result<(), String> {
    // Optional settings path override as the first argument
    let settings_path = std::env::args().nth(1).map(PathBuf::from);
    let settings = settings::load_settings(settings_path.as_deref())?;

    if let Some(dir) = &settings.log_dir {
        if let Err(e) = logging::init_file_logging(Path::new(dir)) {
            tlog!("[main] File logging disabled: {}", e);
        }
    }

    // One long-lived controller for the process, injected into the router
    let controller = Arc::new(ScaleController::new(ScaleConfig::from_settings(&settings)));
    tlog!(
        "[main] Scale configured on {} ({} baud), polling every {} ms",
        settings.port,
        settings.baud_rate,
        settings.poll_interval_ms
    );

    let app = server::router(controller, &settings);
    let listener = tokio::net::TcpListener::bind(&settings.listen_addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", settings.listen_addr, e))?;
    tlog!("[http] Listening on {}", settings.listen_addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| format!("HTTP server error: {}", e))
}
