// src/scale/frame.rs
//
// Framing primitives for the scale indicator protocol.
// The indicator transmits continuously; frames are delimited by a length
// threshold rather than a terminator byte. Within a normalized frame the
// start-of-text marker (STX, 0x02) anchors the weight field.

// ============================================================================
// Protocol Constants
// ============================================================================

// These encode the fixed layout of the device's transmission frame and are
// not tunables.

/// Number of accumulated bytes that completes one frame.
pub const FRAME_LENGTH: usize = 30;

/// Start-of-text marker locating the weight field inside a normalized frame.
pub const FRAME_START: u8 = 0x02;

/// Offset from the marker to the first byte of the weight field.
pub const WEIGHT_OFFSET: usize = 4;

/// Width of the weight field in bytes.
pub const WEIGHT_LENGTH: usize = 6;

/// Published whenever no weight reading is available.
pub const WEIGHT_SENTINEL: &str = "----";

// ============================================================================
// Frame Transformation and Decoding
// ============================================================================

/// Normalize raw indicator bytes by clearing the high bit: every byte
/// >= 0x80 has 0x80 subtracted (0x82 becomes 0x02, 0x8D becomes 0x0D),
/// all other bytes pass through unchanged. Total over all byte values.
pub fn normalize_frame(raw: &[u8]) -> Vec<u8> {
    raw.iter()
        .map(|&b| if b >= 0x80 { b - 0x80 } else { b })
        .collect()
}

/// Render frame bytes as text, one char per byte (Latin-1 semantics).
/// Every byte value maps to a char, so this never fails or drops data.
pub fn frame_to_text(frame: &[u8]) -> String {
    frame.iter().map(|&b| b as char).collect()
}

/// Extract the weight field from a normalized frame.
///
/// Finds the first STX marker and takes the 6 bytes starting 4 bytes after
/// it. A window that overruns the frame yields as many bytes as are
/// available; a frame with no marker yields the sentinel. Never panics —
/// a decode miss is a normal outcome encoded in the return value.
pub fn extract_weight(frame: &[u8]) -> String {
    let marker = match frame.iter().position(|&b| b == FRAME_START) {
        Some(p) => p,
        None => return WEIGHT_SENTINEL.to_string(),
    };

    let start = (marker + WEIGHT_OFFSET).min(frame.len());
    let end = (start + WEIGHT_LENGTH).min(frame.len());
    frame_to_text(&frame[start..end])
}

// ============================================================================
// Frame Accumulator
// ============================================================================

/// Stateful accumulation buffer for the polling loop.
///
/// Bytes are appended as they arrive; once the buffer reaches the frame
/// length threshold the entire content is drained as one frame snapshot and
/// accumulation restarts from empty. The split is purely length-triggered —
/// where (or whether) the marker appears inside the consumed window is
/// irrelevant to the boundary.
pub struct FrameAccumulator {
    buffer: Vec<u8>,
}

impl FrameAccumulator {
    pub fn new() -> Self {
        FrameAccumulator { buffer: Vec::new() }
    }

    /// Append a chunk, returning the full buffer content as a frame once the
    /// threshold is met.
    pub fn feed(&mut self, data: &[u8]) -> Option<Vec<u8>> {
        self.buffer.extend_from_slice(data);

        if self.buffer.len() >= FRAME_LENGTH {
            Some(self.buffer.drain(..).collect())
        } else {
            None
        }
    }

    /// True when no bytes are pending. Distinguishes "no live data" from
    /// "partial frame pending" for the sentinel decision.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for FrameAccumulator {
    fn default() -> Self {
        FrameAccumulator::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_clears_high_bit() {
        for b in 0u8..=255 {
            let out = normalize_frame(&[b]);
            if b >= 0x80 {
                assert_eq!(out, vec![b - 0x80]);
            } else {
                assert_eq!(out, vec![b]);
            }
        }
    }

    #[test]
    fn test_normalize_idempotent_on_canonical_input() {
        let raw = vec![0x82, 0x8D, 0x02, 0x31, 0x7F, 0xFF];
        let once = normalize_frame(&raw);
        let twice = normalize_frame(&once);
        assert_eq!(once, twice);
        assert!(once.iter().all(|&b| b < 0x80));
    }

    #[test]
    fn test_extract_weight_marker_mid_frame() {
        // Marker at index 3, weight digits at indices 7..13
        let mut frame = vec![b'x', b'y', b'z', 0x02, b'A', b'B', b'C'];
        frame.extend_from_slice(b"123456");
        frame.extend_from_slice(b"trailing");
        assert_eq!(extract_weight(&frame), "123456");
    }

    #[test]
    fn test_extract_weight_no_marker_yields_sentinel() {
        assert_eq!(extract_weight(b"no marker here at all"), WEIGHT_SENTINEL);
        assert_eq!(extract_weight(&[]), WEIGHT_SENTINEL);
    }

    #[test]
    fn test_extract_weight_short_frame_truncates() {
        // Only 3 weight bytes fit before the frame ends
        let frame = [0x02, b'a', b'b', b'c', b'1', b'2', b'3'];
        assert_eq!(extract_weight(&frame), "123");
    }

    #[test]
    fn test_extract_weight_window_past_end_is_empty() {
        // Marker so late that the weight window starts beyond the frame
        let frame = [b'x', 0x02];
        assert_eq!(extract_weight(&frame), "");
    }

    #[test]
    fn test_transformed_byte_can_become_marker() {
        // 0x82 normalizes to 0x02 and wins the first-occurrence search
        let mut frame = vec![0x82, b'A', b'B', b'C'];
        frame.extend_from_slice(b"123456");
        assert_eq!(extract_weight(&normalize_frame(&frame)), "123456");
    }

    #[test]
    fn test_accumulator_holds_below_threshold() {
        let mut acc = FrameAccumulator::new();
        assert!(acc.feed(&[0u8; FRAME_LENGTH - 1]).is_none());
        assert_eq!(acc.len(), FRAME_LENGTH - 1);
        assert!(!acc.is_empty());
    }

    #[test]
    fn test_accumulator_drains_at_threshold() {
        let mut acc = FrameAccumulator::new();
        assert!(acc.feed(&[1u8; 15]).is_none());
        let frame = acc.feed(&[2u8; 20]).expect("threshold reached");
        assert_eq!(frame.len(), 35);
        assert!(acc.is_empty());
    }

    #[test]
    fn test_accumulator_reset_is_marker_independent() {
        // A full window with no marker anywhere still drains completely
        let mut acc = FrameAccumulator::new();
        let frame = acc.feed(&[0x20u8; FRAME_LENGTH]).expect("threshold reached");
        assert_eq!(extract_weight(&frame), WEIGHT_SENTINEL);
        assert!(acc.is_empty());
    }

    #[test]
    fn test_full_pipeline_decodes_weight() {
        // Raw chunk as the device sends it: leading bytes with the high bit
        // set, STX at index 2, weight digits 4 bytes after the marker,
        // padded past the frame threshold.
        let mut raw = vec![0x8A, 0x8D, 0x02, 0x00, 0x00, 0x00];
        raw.extend_from_slice(b"123456");
        raw.resize(FRAME_LENGTH + 2, 0x20);

        let mut acc = FrameAccumulator::new();
        let frame = acc.feed(&raw).expect("threshold reached");
        let canonical = normalize_frame(&frame);
        assert_eq!(extract_weight(&canonical), "123456");
        assert_eq!(frame_to_text(&canonical).len(), frame.len());
    }
}
