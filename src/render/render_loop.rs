use super::surface::Surface;
use crate::rhythm::Ensemble;

/// Drives one ensemble onto a surface, one call per display frame
#[derive(Debug, Default)]
pub struct RenderLoop {
    frames: u64,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire due beats, move every rhythm, then draw around the surface center
    pub fn frame(&mut self, ensemble: &mut Ensemble, surface: &mut dyn Surface) {
        ensemble.clock().poll();
        ensemble.update();

        let (width, height) = surface.size();
        surface.push();
        surface.translate(width / 2.0, height / 2.0);
        ensemble.draw(surface);
        surface.pop();

        self.frames += 1;
    }

    /// Frames rendered so far
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingSurface;
    use crate::rhythm::{EnsembleConfig, Point};
    use crate::sequencing::PitchClass;
    use crate::synth::{shared_sink, NoteEvent};
    use crate::transport::{Clock, ManualTimeSource};

    fn setup() -> (Ensemble, ManualTimeSource, std::rc::Rc<std::cell::RefCell<Vec<NoteEvent>>>) {
        let source = ManualTimeSource::new();
        let notes = shared_sink(Vec::new());
        let config = EnsembleConfig::default().instances(1, 1);
        let ensemble = Ensemble::with_seed(Clock::new(source.clone()), notes.clone(), config, 11);
        (ensemble, source, notes)
    }

    #[test]
    fn test_frame_draws_around_center() {
        let (mut ensemble, _, notes) = setup();
        ensemble
            .start_session(60.0, &[PitchClass::A], &[4], 1)
            .unwrap();
        let mut surface = RecordingSurface::new(400.0, 300.0);
        let mut render = RenderLoop::new();
        render.frame(&mut ensemble, &mut surface);

        assert_eq!(render.frames(), 1);
        assert_eq!(notes.borrow().len(), 1);
        assert_eq!(surface.circles.len(), 1);
        // Vertex 0 of the path sits path_radius to the right of center
        let expected = Point::new(200.0 + 150.0, 150.0);
        assert!(surface.circles[0].center.distance(expected) < 1e-6);
        assert_eq!(surface.depth(), 0);
    }

    #[test]
    fn test_frame_after_stop_draws_nothing() {
        let (mut ensemble, source, notes) = setup();
        ensemble
            .start_session(60.0, &[PitchClass::C], &[2, 3], 2)
            .unwrap();
        let mut surface = RecordingSurface::new(100.0, 100.0);
        let mut render = RenderLoop::new();
        render.frame(&mut ensemble, &mut surface);
        ensemble.stop_session();

        surface.clear();
        let heard = notes.borrow().len();
        source.advance(4.0);
        render.frame(&mut ensemble, &mut surface);
        assert!(surface.circles.is_empty());
        assert_eq!(notes.borrow().len(), heard);
        assert_eq!(render.frames(), 2);
    }
}
