// Purpose: polygon-walking rhythms and the ensemble that plays them together

pub mod config;
pub mod ensemble;
pub mod geometry;
pub mod measure;
pub mod track;

pub use config::EnsembleConfig;
pub use ensemble::{Ensemble, EnsembleError};
pub use geometry::{map_range, polygon_vertices, Geometry, Point};
pub use measure::{beat_markers, MeasureCursor};
pub use track::{Rhythm, RhythmError, RhythmFrame, RhythmHandle, RhythmParams, MIN_BEATS};
