//! Plain geometry types shared by the resolver and the instance tracker.

use serde::{Deserialize, Serialize};

/// A point in global (screen) coordinates unless stated otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// An axis-aligned rectangle given by its top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Rect {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Area, or 0 for degenerate (zero or negative sized) rectangles.
    pub fn area(&self) -> f64 {
        if self.width <= 0.0 || self.height <= 0.0 {
            0.0
        } else {
            self.width * self.height
        }
    }

    /// Center in local coordinates (origin at the top-left corner).
    pub fn local_center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    /// Translate a global point into this rectangle's local coordinate space.
    pub fn to_local(&self, point: Point) -> Point {
        Point::new(point.x - self.left, point.y - self.top)
    }

    /// True when every edge of `other` lies within `tolerance` of ours.
    pub fn approx_eq(&self, other: &Rect, tolerance: f64) -> bool {
        (self.left - other.left).abs() <= tolerance
            && (self.top - other.top).abs() <= tolerance
            && (self.right() - other.right()).abs() <= tolerance
            && (self.bottom() - other.bottom()).abs() <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_of_degenerate_rect_is_zero() {
        assert_eq!(Rect::new(0.0, 0.0, 0.0, 10.0).area(), 0.0);
        assert_eq!(Rect::new(0.0, 0.0, -5.0, 10.0).area(), 0.0);
        assert_eq!(Rect::new(0.0, 0.0, 4.0, 5.0).area(), 20.0);
    }

    #[test]
    fn to_local_translates_by_origin() {
        let rect = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(rect.to_local(Point::new(15.0, 25.0)), Point::new(5.0, 5.0));
    }

    #[test]
    fn approx_eq_checks_all_edges() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(a.approx_eq(&Rect::new(0.5, -0.5, 100.0, 100.5), 1.0));
        // Same origin, but the right edge moved by 2
        assert!(!a.approx_eq(&Rect::new(0.0, 0.0, 102.0, 100.0), 1.0));
    }
}
