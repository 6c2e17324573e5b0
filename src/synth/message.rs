use std::cell::RefCell;
use std::rc::Rc;

#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer};

/// A note-on/off pair to be played by the audio engine
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NoteEvent {
    /// Which rhythm's voice plays it
    pub voice: usize,
    /// MIDI note number
    pub note: u8,
    /// Seconds between note-on and note-off
    pub duration: f64,
    /// Note-on time on the clock's source timeline
    pub time: f64,
}

/// Receives notes triggered by rhythms
pub trait NoteSink {
    fn trigger(&mut self, event: NoteEvent);
}

/// Single-threaded shared sink handed to every rhythm of an ensemble
pub type SharedNoteSink = Rc<RefCell<dyn NoteSink>>;

/// Wrap a sink for sharing between rhythms
pub fn shared_sink<S: NoteSink + 'static>(sink: S) -> Rc<RefCell<S>> {
    Rc::new(RefCell::new(sink))
}

/// Collect notes in memory (offline rendering, tests)
impl NoteSink for Vec<NoteEvent> {
    fn trigger(&mut self, event: NoteEvent) {
        self.push(event);
    }
}

/// Swallows every note
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSink;

impl NoteSink for SilentSink {
    fn trigger(&mut self, _event: NoteEvent) {}
}

/// Hand notes to an audio thread; a full ring buffer drops the note
#[cfg(feature = "rtrb")]
impl NoteSink for Producer<NoteEvent> {
    fn trigger(&mut self, event: NoteEvent) {
        if self.push(event).is_err() {
            tracing::debug!(voice = event.voice, "note queue full, dropping note");
        }
    }
}

/// Audio-side end of a note queue
pub trait NoteReceiver {
    fn pop(&mut self) -> Option<NoteEvent>;
}

#[cfg(feature = "rtrb")]
impl NoteReceiver for Consumer<NoteEvent> {
    fn pop(&mut self) -> Option<NoteEvent> {
        Consumer::pop(self).ok()
    }
}

impl NoteReceiver for std::collections::VecDeque<NoteEvent> {
    fn pop(&mut self) -> Option<NoteEvent> {
        self.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(voice: usize) -> NoteEvent {
        NoteEvent {
            voice,
            note: 69,
            duration: 0.05,
            time: 1.0,
        }
    }

    #[test]
    fn shared_sink_records_through_trait_object() {
        let recorded = shared_sink(Vec::<NoteEvent>::new());
        let sink: SharedNoteSink = recorded.clone();
        sink.borrow_mut().trigger(event(0));
        sink.borrow_mut().trigger(event(1));
        assert_eq!(recorded.borrow().len(), 2);
        assert_eq!(recorded.borrow()[1].voice, 1);
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn ring_buffer_drops_when_full() {
        let (mut tx, mut rx) = rtrb::RingBuffer::<NoteEvent>::new(1);
        tx.trigger(event(0));
        tx.trigger(event(1));
        assert_eq!(NoteReceiver::pop(&mut rx).map(|e| e.voice), Some(0));
        assert_eq!(NoteReceiver::pop(&mut rx), None);
    }
}
