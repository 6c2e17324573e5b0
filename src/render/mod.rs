// Purpose: drawing targets and the per-frame loop that feeds them

pub mod color;
pub mod render_loop;
pub mod surface;

pub use color::{ColorError, Rgb};
pub use render_loop::RenderLoop;
pub use surface::{DrawnCircle, RecordingSurface, Surface, Transform, TransformStack};
