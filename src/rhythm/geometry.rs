/*
Polygon Paths
=============

Each rhythm walks the edges of a regular polygon inscribed in a hidden
circle of radius r. One vertex per beat:

  2 beats   two points on a diameter     a straight back-and-forth line
  3 beats   three points                 triangle
  4 beats   four points                  square

        (0, r)                 vertex i sits at angle i * 2π / n:
          ●                      x = r cos(i * 2π / n)
         ╱ ╲                     y = r sin(i * 2π / n)
        ╱   ╲
 (-r,0)●  ·  ●(r, 0)           The moving point is a straight lerp between
        ╲   ╱                  the vertex it just left and the one it is
         ╲ ╱                   heading to, driven by the interpolation
          ●                    fraction f ∈ [0, 1].
        (0,-r)

The pulse
---------

The drawn circle's radius follows the point's distance from the midpoint of
the current edge. It is largest on a vertex (the beat) and smallest halfway
along the edge, so every rhythm "breathes" once per beat:

  radius = map(distance(point, edge_mid), 0 ..= r, min_radius ..= max_radius)

All rhythms share r, so rhythms line up on vertex 0 at the start of each measure
and drift apart in between.
*/

use std::f64::consts::TAU;
use std::ops::{Add, Mul, Sub};

/// A 2-D point (or vector) in surface units
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point at `angle` radians on a circle of `radius` around the origin
    pub fn polar(radius: f64, angle: f64) -> Self {
        Self::new(radius * angle.cos(), radius * angle.sin())
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn length(self) -> f64 {
        self.distance(Point::ORIGIN)
    }

    /// Linear interpolation: `t = 0` gives `self`, `t = 1` gives `other`
    pub fn lerp(self, other: Point, t: f64) -> Point {
        self + (other - self) * t
    }

    pub fn midpoint(self, other: Point) -> Point {
        self.lerp(other, 0.5)
    }

    /// Rotate about the origin by `angle` radians (counter-clockwise)
    pub fn rotated(self, angle: f64) -> Point {
        let (sin, cos) = angle.sin_cos();
        Point::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// Vertices of a regular `beat_count`-gon on a circle of `radius`, vertex 0 at angle 0
pub fn polygon_vertices(beat_count: usize, radius: f64) -> Vec<Point> {
    let step = TAU / beat_count as f64;
    (0..beat_count)
        .map(|i| Point::polar(radius, i as f64 * step))
        .collect()
}

/// Re-map `value` from one range onto another (no clamping)
#[inline]
pub fn map_range(value: f64, in_lo: f64, in_hi: f64, out_lo: f64, out_hi: f64) -> f64 {
    let span = in_hi - in_lo;
    if span == 0.0 {
        return out_lo;
    }
    out_lo + (value - in_lo) / span * (out_hi - out_lo)
}

/// Sizes shared by every rhythm in an ensemble
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Geometry {
    /// Radius of the hidden circle the polygon vertices sit on
    pub path_radius: f64,
    /// Drawn radius when the point sits on an edge midpoint
    pub min_radius: f64,
    /// Drawn radius when the point is `path_radius` away from the midpoint
    pub max_radius: f64,
}

impl Geometry {
    /// Proportions for a square surface of side `extent`
    pub fn for_extent(extent: f64) -> Self {
        Self {
            path_radius: 0.3 * extent,
            min_radius: 0.005 * extent,
            max_radius: 0.125 * extent,
        }
    }

    /// Pulse radius for a point `distance` away from its edge midpoint
    pub fn pulse_radius(&self, distance: f64) -> f64 {
        map_range(
            distance,
            0.0,
            self.path_radius,
            self.min_radius,
            self.max_radius,
        )
    }
}

impl Default for Geometry {
    fn default() -> Self {
        // A 500-unit surface: path radius 150
        Self::for_extent(500.0)
    }
}
