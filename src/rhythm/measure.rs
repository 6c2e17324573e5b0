//! Measure view - beat markers and a playhead sweeping one bar
//!
//! The two-row sequencer layout: each rhythm is a row of evenly spaced beat
//! markers across one measure, a playhead sweeps left to right, and the marker
//! under the playhead lights up for a short flash after its beat.

use crate::sequencing::Subdivision;
use crate::transport::Clock;

/// Marker offsets across the measure, `i / beats` for each beat
pub fn beat_markers(beats: usize) -> Vec<f64> {
    (0..beats).map(|i| i as f64 / beats as f64).collect()
}

/// Where the playhead is within one measure, for a row of `beats` markers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasureCursor {
    /// Playhead position across the measure, `[0, 1)`
    pub playhead: f64,
    /// Marker the playhead is in or just past (None for an empty row)
    pub active_beat: Option<usize>,
    /// Whether the active marker is still inside its flash window
    pub flashing: bool,
}

impl MeasureCursor {
    /// Compute the cursor for a playhead fraction, with the flash window given
    /// as a fraction of the measure
    pub fn at(playhead: f64, beats: usize, flash_fraction: f64) -> Self {
        let playhead = if playhead.is_finite() {
            playhead.rem_euclid(1.0)
        } else {
            0.0
        };
        if beats == 0 {
            return Self {
                playhead,
                active_beat: None,
                flashing: false,
            };
        }

        let beat_len = 1.0 / beats as f64;
        let active = ((playhead * beats as f64).floor() as usize).min(beats - 1);
        let since_beat = playhead - active as f64 * beat_len;
        Self {
            playhead,
            active_beat: Some(active),
            flashing: since_beat < flash_fraction.min(beat_len),
        }
    }

    /// Cursor from the live clock: one measure is `1m`, the flash lasts `flash`
    pub fn from_clock(clock: &Clock, beats: usize, flash: Subdivision) -> Self {
        let measure = Subdivision::Measures(1);
        let measure_seconds = clock.subdivision_seconds(&measure);
        let flash_fraction = if measure_seconds > 0.0 {
            clock.subdivision_seconds(&flash) / measure_seconds
        } else {
            0.0
        };
        Self::at(clock.subdivision_progress(&measure), beats, flash_fraction)
    }
}
