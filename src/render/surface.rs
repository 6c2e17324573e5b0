//! Drawing surface abstraction
//!
//! Rhythms only know how to place circles under the current transform; any
//! backend (terminal canvas, image buffer, test recorder) implements `Surface`.

use super::color::Rgb;
use crate::rhythm::geometry::Point;

/// Immediate-mode 2-D drawing target with a push/pop transform stack
pub trait Surface {
    /// Width and height in surface units
    fn size(&self) -> (f64, f64);

    /// Save the current transform
    fn push(&mut self);

    /// Restore the last saved transform
    fn pop(&mut self);

    /// Move the origin by `(dx, dy)` in the current (rotated) frame
    fn translate(&mut self, dx: f64, dy: f64);

    /// Rotate the current frame by `angle` radians
    fn rotate(&mut self, angle: f64);

    /// Fill a circle given in the current frame
    fn fill_circle(&mut self, center: Point, radius: f64, color: Rgb);
}

/// Rigid (rotate + translate) transform
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub offset: Point,
    pub angle: f64,
}

impl Transform {
    /// Map a point from this frame into surface coordinates
    pub fn apply(&self, point: Point) -> Point {
        self.offset + point.rotated(self.angle)
    }
}

/// Push/pop stack of transforms, for backends without native transforms
#[derive(Debug, Clone, Default)]
pub struct TransformStack {
    current: Transform,
    saved: Vec<Transform>,
}

impl TransformStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Transform {
        self.current
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn push(&mut self) {
        self.saved.push(self.current);
    }

    /// Unbalanced pops leave the transform untouched
    pub fn pop(&mut self) {
        if let Some(previous) = self.saved.pop() {
            self.current = previous;
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.current.offset = self.current.apply(Point::new(dx, dy));
    }

    pub fn rotate(&mut self, angle: f64) {
        self.current.angle += angle;
    }

    pub fn apply(&self, point: Point) -> Point {
        self.current.apply(point)
    }
}

/// A circle as it landed on the surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawnCircle {
    pub center: Point,
    pub radius: f64,
    pub color: Rgb,
}

/// Surface that records circles in surface coordinates
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    width: f64,
    height: f64,
    transforms: TransformStack,
    pub circles: Vec<DrawnCircle>,
}

impl RecordingSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            transforms: TransformStack::new(),
            circles: Vec::new(),
        }
    }

    /// Forget everything drawn so far
    pub fn clear(&mut self) {
        self.circles.clear();
    }

    /// Open push() calls that have not been popped
    pub fn depth(&self) -> usize {
        self.transforms.depth()
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn push(&mut self) {
        self.transforms.push();
    }

    fn pop(&mut self) {
        self.transforms.pop();
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.transforms.translate(dx, dy);
    }

    fn rotate(&mut self, angle: f64) {
        self.transforms.rotate(angle);
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: Rgb) {
        self.circles.push(DrawnCircle {
            center: self.transforms.apply(center),
            radius,
            color,
        });
    }
}
