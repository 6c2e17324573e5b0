use super::geometry::Geometry;
use crate::render::Rgb;
use crate::sequencing::{PitchClass, Subdivision};

/// Pools an ensemble draws from when a session starts
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EnsembleConfig {
    /// Chords to voice rhythms from, one picked per random session
    pub chords: Vec<Vec<PitchClass>>,
    /// Octaves a rhythm's note may land in
    pub octaves: Vec<i8>,
    /// Candidate beat counts
    pub beat_counts: Vec<usize>,
    /// Fewest rhythms in a session
    pub min_rhythms: usize,
    /// Colors, shuffled and cycled per session
    pub palette: Vec<Rgb>,
    /// Symmetric copies drawn per rhythm, inclusive range
    pub min_instances: usize,
    pub max_instances: usize,
    pub geometry: Geometry,
    /// Length of each triggered note
    pub note_length: Subdivision,
    /// Tempo used when the caller's is not a number
    pub default_bpm: f64,
}

impl EnsembleConfig {
    pub fn chords(mut self, chords: Vec<Vec<PitchClass>>) -> Self {
        self.chords = chords;
        self
    }

    pub fn octaves(mut self, octaves: Vec<i8>) -> Self {
        self.octaves = octaves;
        self
    }

    pub fn beat_counts(mut self, beat_counts: Vec<usize>) -> Self {
        self.beat_counts = beat_counts;
        self
    }

    pub fn min_rhythms(mut self, min_rhythms: usize) -> Self {
        self.min_rhythms = min_rhythms;
        self
    }

    pub fn palette(mut self, palette: Vec<Rgb>) -> Self {
        self.palette = palette;
        self
    }

    /// Inclusive range of symmetric copies; swapped if given backwards
    pub fn instances(mut self, min: usize, max: usize) -> Self {
        self.min_instances = min;
        self.max_instances = max;
        let (min, max) = self.instance_range();
        self.min_instances = min;
        self.max_instances = max;
        self
    }

    /// Inclusive `(min, max)` copies with the bounds in order and at least one
    pub fn instance_range(&self) -> (usize, usize) {
        let (min, max) = (self.min_instances, self.max_instances);
        (min.min(max).max(1), max.max(min).max(1))
    }

    pub fn geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn note_length(mut self, note_length: Subdivision) -> Self {
        self.note_length = note_length;
        self
    }

    pub fn default_bpm(mut self, bpm: f64) -> Self {
        self.default_bpm = bpm;
        self
    }
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        use PitchClass as P;
        Self {
            chords: vec![
                vec![P::A, P::C, P::E],
                vec![P::B, P::D, P::F],
                vec![P::G, P::B, P::D],
            ],
            octaves: vec![4, 6],
            beat_counts: vec![2, 3, 4, 5, 6, 7],
            min_rhythms: 2,
            palette: vec![
                Rgb::new(0x00, 0xb8, 0xb8),
                Rgb::new(0xe4, 0xbd, 0x0b),
                Rgb::new(0xde, 0x3d, 0x83),
            ],
            min_instances: 2,
            max_instances: 5,
            geometry: Geometry::default(),
            note_length: Subdivision::note(32),
            default_bpm: 45.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_range_is_normalized() {
        let config = EnsembleConfig::default().instances(6, 3);
        assert_eq!((config.min_instances, config.max_instances), (3, 6));
        let config = EnsembleConfig::default().instances(0, 0);
        assert_eq!((config.min_instances, config.max_instances), (1, 1));
    }

    #[test]
    fn instance_range_orders_raw_fields() {
        let mut config = EnsembleConfig::default();
        config.min_instances = 6;
        config.max_instances = 3;
        assert_eq!(config.instance_range(), (3, 6));
        config.min_instances = 0;
        config.max_instances = 0;
        assert_eq!(config.instance_range(), (1, 1));
    }

    #[test]
    fn defaults_cover_two_to_seven_beats() {
        let config = EnsembleConfig::default();
        assert_eq!(config.beat_counts, (2..=7).collect::<Vec<_>>());
        assert_eq!(config.chords.len(), 3);
        assert_eq!(config.default_bpm, 45.0);
    }
}
