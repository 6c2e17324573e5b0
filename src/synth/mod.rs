// Purpose: the note-trigger boundary between rhythms and whatever makes sound

pub mod message;

pub use message::{shared_sink, NoteEvent, NoteReceiver, NoteSink, SharedNoteSink, SilentSink};
