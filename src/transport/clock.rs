//! Clock - the shared transport every rhythm is phase-locked to
//!
//! Position is kept in fractional ticks so tempo changes don't move events
//! around: the tick position is re-anchored whenever the tempo changes, and
//! every repeating schedule fires at `start + k * interval` ticks.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use super::source::TimeSource;
use crate::sequencing::{Subdivision, TimeSignature};
use crate::DEFAULT_PPQ;

/// Slowest accepted tempo
pub const MIN_BPM: f64 = 1.0;
/// Fastest accepted tempo
pub const MAX_BPM: f64 = 999.0;
/// Tempo used when nothing else is configured
pub const DEFAULT_BPM: f64 = 120.0;

/// Clamp a user-supplied tempo into `[MIN_BPM, MAX_BPM]`, falling back when it isn't a number
pub fn clamp_bpm(bpm: f64, fallback: f64) -> f64 {
    if bpm.is_finite() {
        bpm.clamp(MIN_BPM, MAX_BPM)
    } else {
        fallback.clamp(MIN_BPM, MAX_BPM)
    }
}

/// Static clock settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClockConfig {
    /// Pulses per quarter note (tick resolution)
    pub ppq: u32,
    /// Governs the length of measure-based subdivisions
    pub time_signature: TimeSignature,
    /// Initial tempo
    pub bpm: f64,
}

impl ClockConfig {
    pub fn ppq(mut self, ppq: u32) -> Self {
        self.ppq = ppq.max(1);
        self
    }

    pub fn time_signature(mut self, time_signature: TimeSignature) -> Self {
        self.time_signature = time_signature;
        self
    }

    pub fn bpm(mut self, bpm: f64) -> Self {
        self.bpm = clamp_bpm(bpm, DEFAULT_BPM);
        self
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            ppq: DEFAULT_PPQ,
            time_signature: TimeSignature::FOUR_FOUR,
            bpm: DEFAULT_BPM,
        }
    }
}

/// Handle to a registered repeating schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScheduleId(u64);

/// Errors from registering schedules
#[derive(Debug, Clone, PartialEq)]
pub enum ClockError {
    /// The subdivision resolves to zero, negative or non-finite ticks
    NonPositiveInterval(Subdivision),
}

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockError::NonPositiveInterval(subdivision) => write!(
                f,
                "cannot repeat every '{}': interval must be positive",
                subdivision
            ),
        }
    }
}

impl std::error::Error for ClockError {}

type Callback = Box<dyn FnMut(f64)>;

/// One repeating schedule
struct Schedule {
    id: ScheduleId,
    subdivision: Subdivision,
    /// Period in ticks
    interval: f64,
    /// Tick the grid is laid from; moves when a tempo change re-times the period
    origin: f64,
    /// Occurrence counter; the next event is at `origin + occurrence * interval`
    occurrence: u64,
    /// Taken out while the callback runs
    callback: Option<Callback>,
}

impl Schedule {
    fn next_tick(&self) -> f64 {
        self.origin + self.occurrence as f64 * self.interval
    }

    fn rewind(&mut self) {
        self.origin = 0.0;
        self.occurrence = 0;
    }
}

struct ClockState {
    source: Box<dyn TimeSource>,
    ppq: u32,
    time_signature: TimeSignature,
    bpm: f64,
    running: bool,
    /// Bumped on every start so a poll can tell its horizon went stale
    epoch: u64,
    /// Source time of the last start
    started_at: f64,
    /// Source time and tick position of the last start or tempo change
    anchor_source: f64,
    anchor_ticks: f64,
    schedules: Vec<Schedule>,
    next_id: u64,
}

impl ClockState {
    fn ticks_per_second(&self) -> f64 {
        (self.bpm / 60.0) * self.ppq as f64
    }

    fn position_ticks(&self) -> f64 {
        if !self.running {
            return 0.0;
        }
        let elapsed = (self.source.now() - self.anchor_source).max(0.0);
        self.anchor_ticks + elapsed * self.ticks_per_second()
    }

    fn tick_to_source_time(&self, tick: f64) -> f64 {
        self.anchor_source + (tick - self.anchor_ticks) / self.ticks_per_second()
    }

    fn interval_ticks(&self, subdivision: &Subdivision) -> f64 {
        subdivision.to_ticks(self.time_signature, self.ppq, self.bpm)
    }

    /// Re-derive every period at the current tempo
    ///
    /// Clock-time subdivisions change length in ticks with the tempo. A
    /// running schedule keeps the source time of its pending occurrence, and
    /// its grid continues from there at the new period.
    fn retime_schedules(&mut self, position: Option<f64>) {
        let (time_signature, ppq, bpm) = (self.time_signature, self.ppq, self.bpm);
        for schedule in &mut self.schedules {
            let interval = schedule.subdivision.to_ticks(time_signature, ppq, bpm);
            if !(interval.is_finite() && interval > 0.0) || interval == schedule.interval {
                continue;
            }
            if let Some(position) = position {
                let remaining = (schedule.next_tick() - position) * interval / schedule.interval;
                schedule.origin = position + remaining - schedule.occurrence as f64 * interval;
            }
            schedule.interval = interval;
        }
    }
}

/// Shared transport clock
///
/// Cloning yields another handle to the same clock. All scheduling is
/// cooperative: nothing fires until [`Clock::poll`] is called, and callbacks
/// run on the polling thread with no clock borrow held, so they may call back
/// into the clock (including [`Clock::cancel_all`]).
#[derive(Clone)]
pub struct Clock {
    state: Rc<RefCell<ClockState>>,
}

impl Clock {
    /// Create a stopped clock with default settings
    pub fn new(source: impl TimeSource + 'static) -> Self {
        Self::with_config(source, ClockConfig::default())
    }

    /// Create a stopped clock with explicit settings
    pub fn with_config(source: impl TimeSource + 'static, config: ClockConfig) -> Self {
        let now = source.now();
        Self {
            state: Rc::new(RefCell::new(ClockState {
                source: Box::new(source),
                ppq: config.ppq.max(1),
                time_signature: config.time_signature,
                bpm: clamp_bpm(config.bpm, DEFAULT_BPM),
                running: false,
                epoch: 0,
                started_at: now,
                anchor_source: now,
                anchor_ticks: 0.0,
                schedules: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Set the tempo, clamped into range. Returns the tempo actually applied.
    ///
    /// While running, the tick position carries over unchanged.
    pub fn set_tempo(&self, bpm: f64) -> f64 {
        let mut state = self.state.borrow_mut();
        let bpm = clamp_bpm(bpm, state.bpm);
        let position = state.running.then(|| state.position_ticks());
        if let Some(position) = position {
            state.anchor_source = state.source.now();
            state.anchor_ticks = position;
        }
        state.bpm = bpm;
        state.retime_schedules(position);
        debug!(bpm, "clock tempo set");
        bpm
    }

    /// Current tempo in BPM
    pub fn tempo(&self) -> f64 {
        self.state.borrow().bpm
    }

    pub fn ppq(&self) -> u32 {
        self.state.borrow().ppq
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.state.borrow().time_signature
    }

    /// Start the transport from position zero. No-op if already running.
    pub fn start(&self) {
        let mut state = self.state.borrow_mut();
        if state.running {
            return;
        }
        let now = state.source.now();
        state.running = true;
        state.epoch += 1;
        state.started_at = now;
        state.anchor_source = now;
        state.anchor_ticks = 0.0;
        for schedule in &mut state.schedules {
            schedule.rewind();
        }
        debug!(bpm = state.bpm, schedules = state.schedules.len(), "clock started");
    }

    /// Stop the transport and rewind to zero. Surviving schedules restart from
    /// their first occurrence on the next start.
    pub fn stop(&self) {
        let mut state = self.state.borrow_mut();
        if !state.running {
            return;
        }
        state.running = false;
        state.anchor_ticks = 0.0;
        for schedule in &mut state.schedules {
            schedule.rewind();
        }
        debug!("clock stopped");
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().running
    }

    /// Seconds since the last start (0 while stopped)
    pub fn now(&self) -> f64 {
        let state = self.state.borrow();
        if state.running {
            (state.source.now() - state.started_at).max(0.0)
        } else {
            0.0
        }
    }

    /// Current reading of the underlying time source, the timeline scheduled
    /// times are expressed on
    pub fn source_now(&self) -> f64 {
        self.state.borrow().source.now()
    }

    /// Transport position in fractional ticks
    pub fn position_ticks(&self) -> f64 {
        self.state.borrow().position_ticks()
    }

    /// Length of a subdivision in ticks at the current tempo
    pub fn subdivision_ticks(&self, subdivision: &Subdivision) -> f64 {
        self.state.borrow().interval_ticks(subdivision)
    }

    /// Length of a subdivision in seconds at the current tempo
    pub fn subdivision_seconds(&self, subdivision: &Subdivision) -> f64 {
        let state = self.state.borrow();
        subdivision.to_seconds(state.time_signature, state.bpm)
    }

    /// Register `callback` to run once per occurrence of `subdivision`
    ///
    /// Occurrences sit on the subdivision's grid from position zero. When the
    /// clock is already running, the first call is the next grid point that
    /// isn't in the past. The callback receives the ideal source time of the
    /// occurrence.
    pub fn schedule_repeating(
        &self,
        subdivision: Subdivision,
        callback: impl FnMut(f64) + 'static,
    ) -> Result<ScheduleId, ClockError> {
        let mut state = self.state.borrow_mut();
        let interval = state.interval_ticks(&subdivision);
        if !(interval.is_finite() && interval > 0.0) {
            return Err(ClockError::NonPositiveInterval(subdivision));
        }

        let occurrence = if state.running {
            (state.position_ticks() / interval).ceil() as u64
        } else {
            0
        };

        let id = ScheduleId(state.next_id);
        state.next_id += 1;
        state.schedules.push(Schedule {
            id,
            subdivision,
            interval,
            origin: 0.0,
            occurrence,
            callback: Some(Box::new(callback)),
        });
        debug!(%subdivision, interval_ticks = interval, "schedule registered");
        Ok(id)
    }

    /// Remove a single schedule. Returns whether it existed.
    ///
    /// The callback is dropped after the clock is released, so its captures
    /// may use the clock from their `Drop`.
    pub fn cancel(&self, id: ScheduleId) -> bool {
        let removed: Vec<Schedule> = {
            let mut state = self.state.borrow_mut();
            let (removed, kept) = std::mem::take(&mut state.schedules)
                .into_iter()
                .partition(|s| s.id == id);
            state.schedules = kept;
            removed
        };
        !removed.is_empty()
    }

    /// Remove every schedule. A callback that is mid-dispatch is dropped once it returns.
    pub fn cancel_all(&self) {
        let removed = std::mem::take(&mut self.state.borrow_mut().schedules);
        debug!(count = removed.len(), "cancelled all schedules");
    }

    /// Number of registered schedules
    pub fn schedule_count(&self) -> usize {
        self.state.borrow().schedules.len()
    }

    /// Seconds until the next grid point of `subdivision`
    ///
    /// Never negative. Exactly on a boundary this is the full interval, and so
    /// it is while the clock is stopped.
    pub fn time_until_next_subdivision(&self, subdivision: &Subdivision) -> f64 {
        let state = self.state.borrow();
        let interval = state.interval_ticks(subdivision);
        if !(interval.is_finite() && interval > 0.0) {
            return 0.0;
        }

        let mut remaining = interval;
        if state.running {
            let into = state.position_ticks().rem_euclid(interval);
            let rest = interval - into;
            if rest > 0.0 && rest <= interval {
                remaining = rest;
            }
        }
        remaining / state.ticks_per_second()
    }

    /// Progress of a schedule from its last occurrence towards its next one
    ///
    /// Follows the schedule's own grid, so it stays in step with the calls
    /// the schedule receives across tempo changes. Overdue occurrences read
    /// as 1 until polled, and a schedule waiting on its first occurrence since
    /// the start reads 0. `None` once the schedule is cancelled.
    pub fn schedule_progress(&self, id: ScheduleId) -> Option<f64> {
        let state = self.state.borrow();
        let schedule = state.schedules.iter().find(|s| s.id == id)?;
        if !state.running || schedule.occurrence == 0 {
            return Some(0.0);
        }
        let previous = schedule.next_tick() - schedule.interval;
        let into = state.position_ticks() - previous;
        Some((into / schedule.interval).clamp(0.0, 1.0))
    }

    /// Progress through the current interval of `subdivision`, 0 on the grid point and
    /// approaching 1 just before the next one
    pub fn subdivision_progress(&self, subdivision: &Subdivision) -> f64 {
        let interval = self.subdivision_seconds(subdivision);
        if !(interval.is_finite() && interval > 0.0) {
            return 0.0;
        }
        let remaining = self.time_until_next_subdivision(subdivision);
        (1.0 - remaining / interval).clamp(0.0, 1.0)
    }

    /// Fire every occurrence that is due, oldest first. Returns how many fired.
    ///
    /// Missed occurrences are all delivered (each with its own ideal time) so
    /// consumers counting beats stay in phase after a stall.
    pub fn poll(&self) -> usize {
        let (horizon, epoch) = {
            let state = self.state.borrow();
            if !state.running {
                return 0;
            }
            (state.position_ticks(), state.epoch)
        };

        let mut fired = 0;
        loop {
            let (id, time, mut callback) = {
                let mut state = self.state.borrow_mut();
                if !state.running || state.epoch != epoch {
                    break;
                }

                let due = state
                    .schedules
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.callback.is_some() && s.next_tick() <= horizon)
                    .min_by(|(_, a), (_, b)| a.next_tick().total_cmp(&b.next_tick()))
                    .map(|(idx, _)| idx);
                let Some(idx) = due else {
                    break;
                };

                let tick = state.schedules[idx].next_tick();
                let time = state.tick_to_source_time(tick);
                let schedule = &mut state.schedules[idx];
                schedule.occurrence += 1;
                trace!(subdivision = %schedule.subdivision, tick, time, "schedule fired");
                match schedule.callback.take() {
                    Some(callback) => (schedule.id, time, callback),
                    None => continue,
                }
            };

            callback(time);
            fired += 1;

            // Reinstate unless the schedule was cancelled while it ran
            let mut state = self.state.borrow_mut();
            if let Some(schedule) = state.schedules.iter_mut().find(|s| s.id == id) {
                schedule.callback = Some(callback);
            }
        }
        fired
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Clock")
            .field("bpm", &state.bpm)
            .field("ppq", &state.ppq)
            .field("running", &state.running)
            .field("schedules", &state.schedules.len())
            .finish()
    }
}
