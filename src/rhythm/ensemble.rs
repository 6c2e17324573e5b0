//! Ensemble - the set of rhythms sharing one clock
//!
//! Each start replaces the whole ensemble: the clock is stopped and cleared,
//! the previous rhythms are dropped, and a fresh random selection is built and
//! scheduled before the clock restarts.

use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::config::EnsembleConfig;
use super::track::{Rhythm, RhythmError, RhythmFrame, RhythmHandle, RhythmParams, MIN_BEATS};
use crate::render::{Rgb, Surface};
use crate::sequencing::{note_name, NoteError, PitchClass, Subdivision};
use crate::synth::SharedNoteSink;
use crate::transport::{clamp_bpm, Clock};

/// Errors that leave the current session untouched
#[derive(Debug, Clone, PartialEq)]
pub enum EnsembleError {
    /// No candidate had at least two beats
    NoBeatCounts,
    /// The chord had no notes
    EmptyChord,
    /// The configuration has no chords to pick from
    NoChords,
    /// The configuration has no octaves to pick from
    NoOctaves,
    /// A chord note landed outside the MIDI range in the picked octave
    Note(NoteError),
    Rhythm(RhythmError),
}

impl fmt::Display for EnsembleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnsembleError::NoBeatCounts => {
                write!(f, "no beat counts of at least {} to choose from", MIN_BEATS)
            }
            EnsembleError::EmptyChord => write!(f, "chord has no notes"),
            EnsembleError::NoChords => write!(f, "no chords configured"),
            EnsembleError::NoOctaves => write!(f, "no octaves configured"),
            EnsembleError::Note(err) => write!(f, "{}", err),
            EnsembleError::Rhythm(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for EnsembleError {}

impl From<RhythmError> for EnsembleError {
    fn from(err: RhythmError) -> Self {
        EnsembleError::Rhythm(err)
    }
}

/// Concurrently active rhythms on one shared clock
pub struct Ensemble {
    clock: Clock,
    sink: SharedNoteSink,
    config: EnsembleConfig,
    rng: StdRng,
    rhythms: Vec<RhythmHandle>,
    /// Symmetric copies drawn per rhythm this session
    instance_count: usize,
    sessions: u64,
}

impl Ensemble {
    pub fn new(clock: Clock, sink: SharedNoteSink, config: EnsembleConfig) -> Self {
        Self::with_rng(clock, sink, config, StdRng::from_entropy())
    }

    /// Reproducible selections
    pub fn with_seed(clock: Clock, sink: SharedNoteSink, config: EnsembleConfig, seed: u64) -> Self {
        Self::with_rng(clock, sink, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(clock: Clock, sink: SharedNoteSink, config: EnsembleConfig, rng: StdRng) -> Self {
        Self {
            clock,
            sink,
            instance_count: config.instance_range().0,
            config,
            rng,
            rhythms: Vec::new(),
            sessions: 0,
        }
    }

    /// Replace the ensemble with a random selection and restart the clock
    ///
    /// Between `min_rhythms` and all of the distinct valid `beat_counts` are
    /// picked. Notes cycle through `chord`, each in a random configured
    /// octave. Returns the number of rhythms. On error nothing changes.
    pub fn start_session(
        &mut self,
        bpm: f64,
        chord: &[PitchClass],
        beat_counts: &[usize],
        min_rhythms: usize,
    ) -> Result<usize, EnsembleError> {
        let mut pool: Vec<usize> = Vec::with_capacity(beat_counts.len());
        for &count in beat_counts {
            if count >= MIN_BEATS && !pool.contains(&count) {
                pool.push(count);
            }
        }
        if pool.is_empty() {
            return Err(EnsembleError::NoBeatCounts);
        }
        if chord.is_empty() {
            return Err(EnsembleError::EmptyChord);
        }
        if self.config.octaves.is_empty() {
            return Err(EnsembleError::NoOctaves);
        }
        let bpm = clamp_bpm(bpm, self.config.default_bpm);

        pool.shuffle(&mut self.rng);
        let mut palette = self.config.palette.clone();
        if palette.is_empty() {
            palette.push(Rgb::BLACK);
        }
        palette.shuffle(&mut self.rng);
        let (min_instances, max_instances) = self.config.instance_range();
        let instance_count = self.rng.gen_range(min_instances..=max_instances);
        let min_rhythms = min_rhythms.clamp(1, pool.len());
        let count = self.rng.gen_range(min_rhythms..=pool.len());

        let mut selection = Vec::with_capacity(count);
        for (index, &beats) in pool.iter().take(count).enumerate() {
            let octaves = &self.config.octaves;
            let octave = octaves[self.rng.gen_range(0..octaves.len())];
            let note = chord[index % chord.len()]
                .in_octave(octave)
                .map_err(EnsembleError::Note)?;
            selection.push(
                RhythmParams::new(index, note, beats, Subdivision::note(beats as u32))
                    .color(palette[index % palette.len()])
                    .geometry(self.config.geometry)
                    .note_length(self.config.note_length),
            );
        }

        self.clock.stop();
        self.clock.cancel_all();
        self.rhythms.clear();
        self.clock.set_tempo(bpm);
        self.instance_count = instance_count;

        for params in selection {
            match Rhythm::create(&self.clock, self.sink.clone(), params) {
                Ok(rhythm) => self.rhythms.push(rhythm),
                Err(err) => {
                    self.stop_session();
                    return Err(err.into());
                }
            }
        }

        self.clock.start();
        self.sessions += 1;
        debug!(
            session = self.sessions,
            bpm,
            instances = instance_count,
            beats = ?pool[..count],
            notes = ?self.rhythms.iter().map(|r| note_name(r.borrow().note())).collect::<Vec<_>>(),
            "session started"
        );
        Ok(count)
    }

    /// [`Ensemble::start_session`] with a chord drawn from the configured pool
    pub fn start_random_session(&mut self, bpm: f64) -> Result<usize, EnsembleError> {
        if self.config.chords.is_empty() {
            return Err(EnsembleError::NoChords);
        }
        let pick = self.rng.gen_range(0..self.config.chords.len());
        let chord = self.config.chords[pick].clone();
        let beat_counts = self.config.beat_counts.clone();
        self.start_session(bpm, &chord, &beat_counts, self.config.min_rhythms)
    }

    /// Stop the clock, cancel every schedule and drop all rhythms
    pub fn stop_session(&mut self) {
        self.clock.stop();
        self.clock.cancel_all();
        let dropped = self.rhythms.len();
        self.rhythms.clear();
        debug!(dropped, "session stopped");
    }

    /// Move every rhythm along its edge from the clock. Returns how many moved.
    pub fn update(&mut self) -> usize {
        self.rhythms
            .iter()
            .filter(|r| r.borrow_mut().update_from_clock())
            .count()
    }

    /// Draw every rhythm with this session's symmetry
    pub fn draw(&self, surface: &mut dyn Surface) {
        for rhythm in &self.rhythms {
            rhythm.borrow().draw(surface, self.instance_count);
        }
    }

    pub fn frames(&self) -> Vec<RhythmFrame> {
        self.rhythms.iter().map(|r| r.borrow().frame()).collect()
    }

    pub fn rhythms(&self) -> &[RhythmHandle] {
        &self.rhythms
    }

    pub fn len(&self) -> usize {
        self.rhythms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rhythms.is_empty()
    }

    pub fn instance_count(&self) -> usize {
        self.instance_count
    }

    /// Sessions started so far
    pub fn sessions(&self) -> u64 {
        self.sessions
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }
}

impl fmt::Debug for Ensemble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ensemble")
            .field("clock", &self.clock)
            .field("rhythms", &self.rhythms.len())
            .field("instance_count", &self.instance_count)
            .field("sessions", &self.sessions)
            .finish()
    }
}
