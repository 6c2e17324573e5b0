pub mod render; // Surfaces and the frame loop
pub mod rhythm; // Rhythms, ensembles and their geometry
pub mod sequencing; // Musical durations, meters and note names
pub mod synth; // Note events handed to a sound engine
pub mod transport; // The shared clock

/// Default tick resolution, pulses per quarter note
pub const DEFAULT_PPQ: u32 = 480;
