pub mod duration;
pub mod notes;
pub mod subdivision;
pub mod time_signature;

pub use duration::Duration;
pub use notes::{midi_note_to_freq, note_name, parse_note, NoteError, PitchClass};
pub use subdivision::{Subdivision, SubdivisionError};
pub use time_signature::TimeSignature;
