// Purpose: the shared musical timeline that every rhythm hangs off

pub mod clock;
pub mod source;

pub use clock::{clamp_bpm, Clock, ClockConfig, ClockError, ScheduleId, DEFAULT_BPM, MAX_BPM, MIN_BPM};
pub use source::{ManualTimeSource, SystemTimeSource, TimeSource};
