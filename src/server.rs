// src/server.rs
//
// HTTP API for the scale controller.
// Thin handlers: translate requests into controller calls and return its
// state as JSON. The controller handle is injected as router state — there
// is no ambient global.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::scale::{ScaleController, StartOutcome, StopOutcome};
use crate::settings::AppSettings;

// ============================================================================
// Response Payloads
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub weight: String,
    pub last_frame: String,
    pub active: bool,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

type ApiError = (StatusCode, Json<MessageResponse>);

// ============================================================================
// Router
// ============================================================================

pub fn router(controller: Arc<ScaleController>, settings: &AppSettings) -> Router {
    Router::new()
        .route("/weight", get(get_weight))
        .route("/start", post(start_reading))
        .route("/stop", post(stop_reading))
        .route("/ports", get(list_ports))
        .layer(cors_layer(&settings.cors_origins))
        .with_state(controller)
}

/// CORS from the configured origin allow-list. Credentials are allowed, so
/// the origins must stay an explicit list rather than a wildcard.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

// ============================================================================
// Handlers
// ============================================================================

/// Current state snapshot plus a read-time timestamp.
async fn get_weight(State(controller): State<Arc<ScaleController>>) -> Json<StatusResponse> {
    let state = controller.state();

    Json(StatusResponse {
        weight: state.weight,
        last_frame: state.last_frame,
        active: state.active,
        timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    })
}

/// Start acquisition. Idempotent; a port open failure is the only error.
async fn start_reading(
    State(controller): State<Arc<ScaleController>>,
) -> Result<Json<MessageResponse>, ApiError> {
    match controller.start().await {
        Ok(StartOutcome::Started) => Ok(Json(MessageResponse {
            message: format!("Reading started on {}.", controller.port_name()),
        })),
        Ok(StartOutcome::AlreadyActive) => Ok(Json(MessageResponse {
            message: "Reading is already active.".to_string(),
        })),
        Err(e) => {
            tlog!("[http] Start failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MessageResponse { message: e }),
            ))
        }
    }
}

/// Stop acquisition. Idempotent, never fails.
async fn stop_reading(State(controller): State<Arc<ScaleController>>) -> Json<MessageResponse> {
    match controller.stop().await {
        StopOutcome::Stopped => Json(MessageResponse {
            message: "Reading stopped.".to_string(),
        }),
        StopOutcome::AlreadyInactive => Json(MessageResponse {
            message: "Reading is already stopped.".to_string(),
        }),
    }
}

/// Available serial devices on the host.
async fn list_ports(
    State(controller): State<Arc<ScaleController>>,
) -> Result<Json<Vec<String>>, ApiError> {
    match controller.list_ports() {
        Ok(ports) => Ok(Json(ports)),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(MessageResponse { message: e }),
        )),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::frame::WEIGHT_SENTINEL;
    use crate::scale::ScaleConfig;
    use crate::scale::port::Parity;
    use std::time::Duration;

    fn test_controller() -> Arc<ScaleController> {
        Arc::new(ScaleController::new(ScaleConfig {
            port: "/dev/weighbridge-no-such-port".to_string(),
            baud_rate: 9600,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
            poll_interval: Duration::from_millis(10),
        }))
    }

    #[tokio::test]
    async fn test_status_before_any_start() {
        let Json(resp) = get_weight(State(test_controller())).await;
        assert_eq!(resp.weight, WEIGHT_SENTINEL);
        assert_eq!(resp.last_frame, "");
        assert!(!resp.active);
        assert!(!resp.timestamp.is_empty());
    }

    #[tokio::test]
    async fn test_stop_while_inactive_is_informational() {
        let Json(resp) = stop_reading(State(test_controller())).await;
        assert_eq!(resp.message, "Reading is already stopped.");
    }

    #[tokio::test]
    async fn test_start_with_missing_device_is_500() {
        let (status, Json(body)) = start_reading(State(test_controller()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.message.contains("Failed to open"));
    }

    #[test]
    fn test_cors_layer_accepts_configured_origins() {
        // Invalid header values are dropped rather than panicking the layer
        let origins = vec![
            "http://localhost:8080".to_string(),
            "not a header value\n".to_string(),
        ];
        let _ = cors_layer(&origins);
    }
}
