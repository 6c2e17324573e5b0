//! Rhythm - one voice walking a polygon
//!
//! A rhythm owns its polygon and its vertex pointer. The clock drives the
//! pointer through [`Rhythm::play`], and the frame loop drives the point along
//! the current edge through [`Rhythm::update`].

use std::cell::RefCell;
use std::f64::consts::TAU;
use std::fmt;
use std::rc::Rc;

use super::geometry::{polygon_vertices, Geometry, Point};
use crate::render::{Rgb, Surface};
use crate::sequencing::Subdivision;
use crate::synth::{NoteEvent, SharedNoteSink};
use crate::transport::{Clock, ClockError, ScheduleId};

/// Shared handle to a live rhythm (the clock only holds weak references)
pub type RhythmHandle = Rc<RefCell<Rhythm>>;

/// Smallest polygon a rhythm can walk
pub const MIN_BEATS: usize = 2;

/// Everything needed to build a rhythm
#[derive(Debug, Clone, PartialEq)]
pub struct RhythmParams {
    /// Position in the ensemble; also the voice the sink plays on
    pub index: usize,
    /// MIDI note triggered on every beat
    pub note: u8,
    /// Vertices in the polygon
    pub beat_count: usize,
    /// Time between beats
    pub subdivision: Subdivision,
    /// How long each triggered note lasts
    pub note_length: Subdivision,
    pub color: Rgb,
    pub geometry: Geometry,
}

impl RhythmParams {
    pub fn new(index: usize, note: u8, beat_count: usize, subdivision: Subdivision) -> Self {
        Self {
            index,
            note,
            beat_count,
            subdivision,
            note_length: Subdivision::note(32),
            color: Rgb::BLACK,
            geometry: Geometry::default(),
        }
    }

    pub fn color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    pub fn geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn note_length(mut self, note_length: Subdivision) -> Self {
        self.note_length = note_length;
        self
    }
}

/// Errors from building a rhythm
#[derive(Debug, Clone, PartialEq)]
pub enum RhythmError {
    /// Fewer than two beats can't form a path
    TooFewBeats(usize),
    /// The clock refused the schedule
    Clock(ClockError),
}

impl fmt::Display for RhythmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RhythmError::TooFewBeats(count) => write!(
                f,
                "a rhythm needs at least {} beats, got {}",
                MIN_BEATS, count
            ),
            RhythmError::Clock(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for RhythmError {}

impl From<ClockError> for RhythmError {
    fn from(err: ClockError) -> Self {
        RhythmError::Clock(err)
    }
}

/// Snapshot of a rhythm for display
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RhythmFrame {
    pub index: usize,
    pub beat_count: usize,
    pub note: u8,
    /// Vertex the point last left
    pub current: usize,
    /// Vertex the point is heading to
    pub target: usize,
    /// Accepted interpolation fraction along the current edge
    pub fraction: f64,
    pub position: Point,
    pub radius: f64,
    pub color: Rgb,
    pub beats_played: u64,
}

/// One independently clocked rhythm
pub struct Rhythm {
    index: usize,
    note: u8,
    subdivision: Subdivision,
    note_length: Subdivision,
    color: Rgb,
    geometry: Geometry,
    /// Polygon vertices, computed once
    positions: Vec<Point>,
    current: usize,
    target: usize,
    /// Largest fraction accepted since the last beat (None right after a beat)
    last_fraction: Option<f64>,
    position: Point,
    radius: f64,
    /// Midpoint of the current edge, center of the pulse
    edge_mid: Point,
    beats_played: u64,
    /// Created part way through a beat on a running clock, so the point is
    /// already walking the first edge when the first beat arrives
    joined_mid_edge: bool,
    schedule: Option<ScheduleId>,
    clock: Clock,
    sink: SharedNoteSink,
}

impl Rhythm {
    /// Build a rhythm and register its repeating schedule on `clock`
    ///
    /// The rhythm starts on vertex 0 heading to vertex 1. The callback holds
    /// only a weak reference: once the returned handle is dropped, the
    /// schedule is cancelled and any stray call is inert.
    pub fn create(
        clock: &Clock,
        sink: SharedNoteSink,
        params: RhythmParams,
    ) -> Result<RhythmHandle, RhythmError> {
        if params.beat_count < MIN_BEATS {
            return Err(RhythmError::TooFewBeats(params.beat_count));
        }

        let positions = polygon_vertices(params.beat_count, params.geometry.path_radius);
        let mut rhythm = Rhythm {
            index: params.index,
            note: params.note,
            subdivision: params.subdivision,
            note_length: params.note_length,
            color: params.color,
            geometry: params.geometry,
            edge_mid: positions[0].midpoint(positions[1]),
            position: positions[0],
            positions,
            current: 0,
            target: 1,
            last_fraction: None,
            radius: 0.0,
            beats_played: 0,
            joined_mid_edge: false,
            schedule: None,
            clock: clock.clone(),
            sink,
        };
        rhythm.place(0.0);

        let handle = Rc::new(RefCell::new(rhythm));
        let weak = Rc::downgrade(&handle);
        let id = clock.schedule_repeating(params.subdivision, move |time| {
            if let Some(rhythm) = weak.upgrade() {
                rhythm.borrow_mut().play(time);
            }
        })?;
        let progress = clock.schedule_progress(id).unwrap_or(0.0);
        let mut rhythm = handle.borrow_mut();
        rhythm.schedule = Some(id);
        rhythm.joined_mid_edge = progress > 0.0 && progress < 1.0;
        drop(rhythm);
        Ok(handle)
    }

    /// Beat: trigger the note at `scheduled_time` and move on to the next edge
    ///
    /// The very first beat lands on vertex 0 where the rhythm already sits,
    /// so it sounds without advancing. A rhythm that joined a running clock
    /// between beats has been walking towards vertex 1 and advances as usual.
    pub fn play(&mut self, scheduled_time: f64) {
        let duration = self.clock.subdivision_seconds(&self.note_length);
        self.sink.borrow_mut().trigger(NoteEvent {
            voice: self.index,
            note: self.note,
            duration,
            time: scheduled_time,
        });

        if self.beats_played > 0 || self.joined_mid_edge {
            self.current = self.target;
            self.target = (self.target + 1) % self.positions.len();
        }
        self.beats_played += 1;
        self.last_fraction = None;
        self.edge_mid = self.positions[self.current].midpoint(self.positions[self.target]);
        self.place(0.0);
    }

    /// Move the point to `now_fraction` of the way along the current edge
    ///
    /// Returns false (and changes nothing) when the fraction isn't a number or
    /// is behind the last accepted one, so clock jitter can't drag the point backwards.
    pub fn update(&mut self, now_fraction: f64) -> bool {
        if now_fraction.is_nan() {
            return false;
        }
        let fraction = now_fraction.clamp(0.0, 1.0);
        if matches!(self.last_fraction, Some(last) if fraction < last) {
            return false;
        }
        self.last_fraction = Some(fraction);
        self.place(fraction);
        true
    }

    /// [`Rhythm::update`] with the fraction read off this rhythm's schedule
    pub fn update_from_clock(&mut self) -> bool {
        let fraction = self
            .schedule
            .and_then(|id| self.clock.schedule_progress(id))
            .unwrap_or_else(|| self.clock.subdivision_progress(&self.subdivision));
        self.update(fraction)
    }

    /// Draw `instances` copies evenly rotated about the current origin
    pub fn draw(&self, surface: &mut dyn Surface, instances: usize) {
        let instances = instances.max(1);
        let theta = TAU / instances as f64;
        for i in 0..instances {
            surface.push();
            surface.rotate(theta * i as f64);
            surface.fill_circle(self.position, self.radius, self.color);
            surface.pop();
        }
    }

    fn place(&mut self, fraction: f64) {
        self.position = self.positions[self.current].lerp(self.positions[self.target], fraction);
        self.radius = self
            .geometry
            .pulse_radius(self.position.distance(self.edge_mid));
    }

    pub fn frame(&self) -> RhythmFrame {
        RhythmFrame {
            index: self.index,
            beat_count: self.positions.len(),
            note: self.note,
            current: self.current,
            target: self.target,
            fraction: self.last_fraction.unwrap_or(0.0),
            position: self.position,
            radius: self.radius,
            color: self.color,
            beats_played: self.beats_played,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn beat_count(&self) -> usize {
        self.positions.len()
    }

    pub fn subdivision(&self) -> Subdivision {
        self.subdivision
    }

    pub fn positions(&self) -> &[Point] {
        &self.positions
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn target_index(&self) -> usize {
        self.target
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn last_fraction(&self) -> Option<f64> {
        self.last_fraction
    }

    pub fn beats_played(&self) -> u64 {
        self.beats_played
    }

    pub fn schedule_id(&self) -> Option<ScheduleId> {
        self.schedule
    }
}

impl Drop for Rhythm {
    fn drop(&mut self) {
        if let Some(id) = self.schedule.take() {
            self.clock.cancel(id);
        }
    }
}

impl fmt::Debug for Rhythm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rhythm")
            .field("index", &self.index)
            .field("beats", &self.positions.len())
            .field("subdivision", &self.subdivision)
            .field("current", &self.current)
            .field("target", &self.target)
            .field("last_fraction", &self.last_fraction)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::shared_sink;
    use crate::transport::{ClockConfig, ManualTimeSource};

    const EPS: f64 = 1e-9;

    struct Rig {
        clock: Clock,
        source: ManualTimeSource,
        notes: Rc<RefCell<Vec<NoteEvent>>>,
    }

    fn rig(bpm: f64) -> Rig {
        let source = ManualTimeSource::new();
        let clock = Clock::with_config(source.clone(), ClockConfig::default().bpm(bpm));
        Rig {
            clock,
            source,
            notes: shared_sink(Vec::new()),
        }
    }

    fn rhythm(rig: &Rig, beats: usize) -> RhythmHandle {
        let params = RhythmParams::new(0, 69, beats, Subdivision::note(beats as u32));
        Rhythm::create(&rig.clock, rig.notes.clone(), params).unwrap()
    }

    #[test]
    fn test_new_rhythm_starts_on_vertex_zero() {
        let rig = rig(60.0);
        let r = rhythm(&rig, 5);
        let r = r.borrow();
        assert_eq!(r.positions().len(), 5);
        assert_eq!(r.current_index(), 0);
        assert_eq!(r.target_index(), 1);
        assert_eq!(r.position(), r.positions()[0]);
        assert_eq!(rig.clock.schedule_count(), 1);
    }

    #[test]
    fn test_rejects_single_beat() {
        let rig = rig(60.0);
        let params = RhythmParams::new(0, 60, 1, Subdivision::note(1));
        let err = Rhythm::create(&rig.clock, rig.notes.clone(), params).unwrap_err();
        assert_eq!(err, RhythmError::TooFewBeats(1));
        assert_eq!(rig.clock.schedule_count(), 0);
    }

    #[test]
    fn test_square_midpoint_scenario() {
        let rig = rig(60.0);
        let r = rhythm(&rig, 4);
        let mut r = r.borrow_mut();
        assert!(r.update(0.5));
        assert!(r.position().distance(Point::new(75.0, 75.0)) < EPS);
        // On the edge midpoint the pulse is at its smallest
        assert!((r.radius() - Geometry::default().min_radius).abs() < EPS);
    }

    #[test]
    fn test_fraction_endpoints_hit_vertices() {
        let rig = rig(60.0);
        let r = rhythm(&rig, 3);
        let mut r = r.borrow_mut();
        r.update(0.0);
        assert!(r.position().distance(r.positions()[r.current_index()]) < EPS);
        r.update(1.0);
        assert!(r.position().distance(r.positions()[r.target_index()]) < EPS);
    }

    #[test]
    fn test_watchdog_ignores_backward_fractions() {
        let rig = rig(60.0);
        let r = rhythm(&rig, 4);
        let mut r = r.borrow_mut();
        let target = r.positions()[r.target_index()];

        let mut last_distance = f64::INFINITY;
        for f in [0.1, 0.4, 0.4, 0.7] {
            assert!(r.update(f));
            let d = r.position().distance(target);
            assert!(d <= last_distance + EPS);
            last_distance = d;
        }

        let held = r.position();
        assert!(!r.update(0.2));
        assert!(!r.update(f64::NAN));
        assert_eq!(r.position(), held);
        assert_eq!(r.last_fraction(), Some(0.7));
    }

    #[test]
    fn test_out_of_range_fractions_are_clamped() {
        let rig = rig(60.0);
        let r = rhythm(&rig, 2);
        let mut r = r.borrow_mut();
        assert!(r.update(-3.0));
        assert_eq!(r.last_fraction(), Some(0.0));
        assert!(r.update(7.0));
        assert_eq!(r.last_fraction(), Some(1.0));
        assert!(r.position().distance(r.positions()[1]) < EPS);
    }

    #[test]
    fn test_play_advances_and_resets_watchdog() {
        let rig = rig(60.0);
        let r = rhythm(&rig, 3);
        let mut r = r.borrow_mut();

        // First beat sounds on vertex 0 without moving
        r.play(0.0);
        assert_eq!((r.current_index(), r.target_index()), (0, 1));

        r.update(0.9);
        r.play(1.0);
        assert_eq!((r.current_index(), r.target_index()), (1, 2));
        assert_eq!(r.last_fraction(), None);
        assert!(r.update(0.05));

        r.play(2.0);
        r.play(3.0);
        assert_eq!((r.current_index(), r.target_index()), (0, 1));
        assert_eq!(r.beats_played(), 4);
    }

    #[test]
    fn test_target_follows_current_for_every_beat() {
        let rig = rig(60.0);
        for beats in 2..=7 {
            let r = rhythm(&rig, beats);
            let mut r = r.borrow_mut();
            for beat in 0..(beats * 3) {
                r.play(beat as f64);
                assert!(r.current_index() < beats);
                assert_eq!(r.target_index(), (r.current_index() + 1) % beats);
            }
        }
    }

    #[test]
    fn test_play_triggers_note_on_scheduled_time() {
        let rig = rig(60.0);
        let _r = rhythm(&rig, 4);
        rig.source.set(3.0);
        rig.clock.start();
        rig.clock.poll();
        rig.source.advance(1.0);
        rig.clock.poll();

        let notes = rig.notes.borrow();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].time, 3.0);
        assert_eq!(notes[1].time, 4.0);
        assert_eq!(notes[1].note, 69);
        // 32n at 60 bpm = an eighth of a second
        assert!((notes[0].duration - 0.125).abs() < EPS);
    }

    #[test]
    fn test_update_from_clock_tracks_progress() {
        let rig = rig(60.0);
        let r = rhythm(&rig, 4);
        rig.clock.start();
        rig.clock.poll();
        rig.source.advance(0.5);
        assert!(r.borrow_mut().update_from_clock());
        let r = r.borrow();
        assert!((r.last_fraction().unwrap() - 0.5).abs() < EPS);
        assert!(r.position().distance(Point::new(75.0, 75.0)) < EPS);
    }

    #[test]
    fn test_late_rhythm_keeps_walking_forward() {
        let rig = rig(60.0);
        rig.clock.start();
        rig.source.advance(0.5);
        let r = rhythm(&rig, 4);

        rig.source.advance(0.49);
        assert!(r.borrow_mut().update_from_clock());
        let before = r.borrow().position();
        assert!(before.distance(r.borrow().positions()[1]) < 3.0);

        rig.source.advance(0.02);
        rig.clock.poll();
        r.borrow_mut().update_from_clock();
        let r = r.borrow();
        assert_eq!((r.current_index(), r.target_index()), (1, 2));
        assert!(r.position().distance(before) < 5.0);
    }

    #[test]
    fn test_rhythm_on_a_running_downbeat_sounds_in_place() {
        let rig = rig(60.0);
        rig.clock.start();
        rig.source.advance(1.0);
        let r = rhythm(&rig, 4);
        rig.clock.poll();
        let r = r.borrow();
        assert_eq!(r.beats_played(), 1);
        assert_eq!((r.current_index(), r.target_index()), (0, 1));
    }

    #[test]
    fn test_seconds_rhythm_tracks_beats_across_tempo_change() {
        let rig = rig(120.0);
        let params = RhythmParams::new(0, 69, 3, Subdivision::Seconds(0.5));
        let r = Rhythm::create(&rig.clock, rig.notes.clone(), params).unwrap();
        rig.clock.start();
        rig.clock.poll();
        rig.source.advance(0.25);
        rig.clock.set_tempo(60.0);

        for _ in 0..100 {
            rig.source.advance(0.02);
            rig.clock.poll();
            assert!(r.borrow_mut().update_from_clock());
        }
        // Two seconds at one beat per half second
        assert_eq!(r.borrow().beats_played(), 5);
    }

    #[test]
    fn test_dropped_rhythm_cancels_its_schedule() {
        let rig = rig(60.0);
        let r = rhythm(&rig, 4);
        rig.clock.start();
        drop(r);
        assert_eq!(rig.clock.schedule_count(), 0);
        rig.source.advance(5.0);
        assert_eq!(rig.clock.poll(), 0);
        assert!(rig.notes.borrow().is_empty());
    }

    #[test]
    fn test_draw_replicates_rotated_copies() {
        use crate::render::RecordingSurface;

        let rig = rig(60.0);
        let r = rhythm(&rig, 4);
        let mut surface = RecordingSurface::new(500.0, 500.0);
        r.borrow().draw(&mut surface, 4);

        assert_eq!(surface.circles.len(), 4);
        let expected = [
            Point::new(150.0, 0.0),
            Point::new(0.0, 150.0),
            Point::new(-150.0, 0.0),
            Point::new(0.0, -150.0),
        ];
        for (circle, p) in surface.circles.iter().zip(expected) {
            assert!(circle.center.distance(p) < 1e-6);
        }
        assert_eq!(surface.depth(), 0);
    }
}
