// src/scale/controller.rs
//
// Lifecycle controller for the scale acquisition loop.
// Owns the shared state snapshot, opens/closes the serial connection, and
// starts/stops the polling task. One long-lived instance is constructed at
// startup and injected into the HTTP layer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::frame::WEIGHT_SENTINEL;
use super::port::{self, Parity, ScaleConfig};
use super::reader::run_acquisition_blocking;

/// Bound on how long stop() waits for the loop to observe the cancel flag.
const STOP_WAIT: Duration = Duration::from_secs(1);

// ============================================================================
// State Snapshot
// ============================================================================

/// Externally visible snapshot of the acquisition state.
/// Written by the acquisition task (and by the controller on transitions),
/// read by any number of concurrent HTTP handlers.
#[derive(Clone, Debug, Serialize)]
pub struct ScaleState {
    /// Latest decoded weight, or the sentinel when no reading is available
    pub weight: String,
    /// Text rendering of the last normalized frame
    pub last_frame: String,
    /// Whether the acquisition loop is running
    pub active: bool,
}

impl Default for ScaleState {
    fn default() -> Self {
        ScaleState {
            weight: WEIGHT_SENTINEL.to_string(),
            last_frame: String::new(),
            active: false,
        }
    }
}

/// Shared handle to the published state. The RwLock guarantees readers an
/// atomic snapshot — weight and last_frame always come from the same tick.
pub type SharedState = Arc<RwLock<ScaleState>>;

// ============================================================================
// Control Outcomes
// ============================================================================

/// Outcome of a start request; both variants are success for the caller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StartOutcome {
    Started,
    AlreadyActive,
}

/// Outcome of a stop request; both variants are success for the caller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StopOutcome {
    Stopped,
    AlreadyInactive,
}

// ============================================================================
// Controller
// ============================================================================

pub struct ScaleController {
    config: ScaleConfig,
    state: SharedState,
    cancel_flag: Arc<AtomicBool>,
    /// Transition lock and task handle in one: start/stop serialize on this
    /// mutex, so the active check-and-set can never race two loops onto the
    /// same port.
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ScaleController {
    pub fn new(config: ScaleConfig) -> Self {
        ScaleController {
            config,
            state: Arc::new(RwLock::new(ScaleState::default())),
            cancel_flag: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }

    /// The configured serial device, for status messages.
    pub fn port_name(&self) -> &str {
        &self.config.port
    }

    /// Immutable snapshot of the current state. Never blocks on the
    /// acquisition loop — only the state read lock is taken.
    pub fn state(&self) -> ScaleState {
        self.state
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Open the serial port and launch the acquisition loop.
    ///
    /// A guarded no-op while already active. Surfaces the port open failure
    /// to the caller; on failure the loop never starts and the state stays
    /// inactive.
    pub async fn start(&self) -> Result<StartOutcome, String> {
        let mut task = self.task.lock().await;

        if self.state().active {
            return Ok(StartOutcome::AlreadyActive);
        }

        let port = port::open_scale_port(&self.config)?;
        tlog!(
            "[scale] Opened {} at {} baud ({}-{}-{})",
            self.config.port,
            self.config.baud_rate,
            self.config.data_bits,
            match self.config.parity {
                Parity::None => 'N',
                Parity::Odd => 'O',
                Parity::Even => 'E',
            },
            self.config.stop_bits
        );

        if let Ok(mut s) = self.state.write() {
            *s = ScaleState {
                active: true,
                ..ScaleState::default()
            };
        }
        self.cancel_flag.store(false, Ordering::Relaxed);

        let state = self.state.clone();
        let cancel_flag = self.cancel_flag.clone();
        let tick = self.config.poll_interval;
        *task = Some(tokio::task::spawn_blocking(move || {
            run_acquisition_blocking(port, state, cancel_flag, tick)
        }));

        Ok(StartOutcome::Started)
    }

    /// Cancel the acquisition loop and reset the published state.
    ///
    /// Cooperative: sets the cancel flag, then waits (bounded) for the loop
    /// to observe it at the top of its next tick. The port handle is dropped
    /// by the exiting loop.
    pub async fn stop(&self) -> StopOutcome {
        let mut task = self.task.lock().await;

        if !self.state().active {
            return StopOutcome::AlreadyInactive;
        }

        self.cancel_flag.store(true, Ordering::Relaxed);

        if let Some(handle) = task.take() {
            match tokio::time::timeout(STOP_WAIT, handle).await {
                Ok(_) => {}
                Err(_) => {
                    tlog!(
                        "[scale] Acquisition task did not stop within {:?}",
                        STOP_WAIT
                    );
                }
            }
        }

        if let Ok(mut s) = self.state.write() {
            *s = ScaleState::default();
        }
        tlog!("[scale] Acquisition stopped, {} closed", self.config.port);

        StopOutcome::Stopped
    }

    /// Enumerate serial devices on the host.
    pub fn list_ports(&self) -> Result<Vec<String>, String> {
        port::list_scale_ports()
    }
}

// ============================================================================
// Tests
// ============================================================================
