// src/scale/reader.rs
//
// Acquisition loop for the scale indicator.
// Polls the serial port on a fixed cadence, accumulates bytes until the
// frame threshold, and publishes the decoded weight into the shared state.
// Runs as a blocking task; the controller owns start/stop.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serialport::SerialPort;

use super::controller::SharedState;
use super::frame::{
    extract_weight, frame_to_text, normalize_frame, FrameAccumulator, WEIGHT_SENTINEL,
};

/// Read all bytes the OS has already buffered for the port, without waiting.
fn read_available(port: &mut dyn SerialPort) -> Result<Vec<u8>, String> {
    let waiting = port
        .bytes_to_read()
        .map_err(|e| format!("Failed to query port: {}", e))? as usize;

    if waiting == 0 {
        return Ok(Vec::new());
    }

    let mut chunk = vec![0u8; waiting];
    port.read_exact(&mut chunk)
        .map_err(|e| format!("Read error: {}", e))?;
    Ok(chunk)
}

/// Apply one tick's received bytes to the accumulator and publish the
/// outcome.
///
/// A completed frame replaces both the weight and the frame text in a single
/// write, so readers never see the two out of step. With nothing accumulated
/// the sentinel is published; while a partial frame is pending the previous
/// weight is retained.
fn process_chunk(accumulator: &mut FrameAccumulator, chunk: &[u8], state: &SharedState) {
    match accumulator.feed(chunk) {
        Some(raw_frame) => {
            let canonical = normalize_frame(&raw_frame);
            let text = frame_to_text(&canonical);
            let weight = extract_weight(&canonical);
            tlog!(
                "[scale] Frame complete ({} bytes), weight: {:?}",
                raw_frame.len(),
                weight
            );
            if let Ok(mut s) = state.write() {
                s.last_frame = text;
                s.weight = weight;
            }
        }
        None if accumulator.is_empty() => {
            if let Ok(mut s) = state.write() {
                if s.weight != WEIGHT_SENTINEL {
                    s.weight = WEIGHT_SENTINEL.to_string();
                }
            }
        }
        None => {}
    }
}

/// Blocking acquisition loop.
///
/// Owns the port handle for its whole lifetime; the handle is dropped (and
/// the device closed) when the loop exits, whether cancelled or errored.
/// A read error flips `active` off and ends the loop — no automatic retry,
/// the next start() opens a fresh connection.
pub(crate) fn run_acquisition_blocking(
    mut port: Box<dyn SerialPort>,
    state: SharedState,
    cancel_flag: Arc<AtomicBool>,
    tick: Duration,
) {
    let mut accumulator = FrameAccumulator::new();
    let stop_reason;

    loop {
        if cancel_flag.load(Ordering::Relaxed) {
            stop_reason = "stopped";
            break;
        }

        let chunk = match read_available(port.as_mut()) {
            Ok(c) => c,
            Err(e) => {
                tlog!("[scale] {}", e);
                if let Ok(mut s) = state.write() {
                    s.active = false;
                }
                stop_reason = "error";
                break;
            }
        };

        if !chunk.is_empty() {
            tlog!(
                "[scale] Received {} bytes: {}",
                chunk.len(),
                hex::encode(&chunk)
            );
        }

        process_chunk(&mut accumulator, &chunk, &state);

        thread::sleep(tick);
    }

    tlog!("[scale] Acquisition loop ended: {}", stop_reason);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::controller::ScaleState;
    use crate::scale::frame::FRAME_LENGTH;
    use std::sync::RwLock;

    fn active_state() -> SharedState {
        Arc::new(RwLock::new(ScaleState {
            active: true,
            ..ScaleState::default()
        }))
    }

    fn weight_of(state: &SharedState) -> String {
        state.read().unwrap().weight.clone()
    }

    #[test]
    fn test_empty_tick_publishes_sentinel() {
        let state = active_state();
        state.write().unwrap().weight = "123456".to_string();

        let mut acc = FrameAccumulator::new();
        process_chunk(&mut acc, &[], &state);
        assert_eq!(weight_of(&state), WEIGHT_SENTINEL);
    }

    #[test]
    fn test_partial_frame_retains_previous_weight() {
        let state = active_state();
        state.write().unwrap().weight = "123456".to_string();

        let mut acc = FrameAccumulator::new();
        process_chunk(&mut acc, &[0x20; 10], &state);
        assert_eq!(weight_of(&state), "123456");
    }

    #[test]
    fn test_complete_frame_publishes_weight_and_text() {
        let state = active_state();
        let mut acc = FrameAccumulator::new();

        let mut raw = vec![0x8A, 0x8D, 0x02, 0x00, 0x00, 0x00];
        raw.extend_from_slice(b"004250");
        raw.resize(FRAME_LENGTH, 0x20);

        // Arrives split across two ticks; the first leaves a partial frame
        process_chunk(&mut acc, &raw[..12], &state);
        assert_eq!(weight_of(&state), WEIGHT_SENTINEL);

        process_chunk(&mut acc, &raw[12..], &state);
        let snapshot = state.read().unwrap().clone();
        assert_eq!(snapshot.weight, "004250");
        assert_eq!(snapshot.last_frame.len(), FRAME_LENGTH);
        assert!(acc.is_empty());
    }
}
