//! Axis-aligned spatial bounds attached to nodes and buckets.
//!
//! Bounds are advisory metadata: they never take part in hashing or equality
//! of tree entries, but they drive the quad-tree bucketing strategy.

use geo::{coord, Rect};
use serde::{Deserialize, Serialize};

/// A 2D axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    rect: Rect<f64>,
}

impl Envelope {
    /// Create an envelope from two corners; the coordinates are normalized so
    /// that min <= max on both axes.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            rect: Rect::new(coord! { x: min_x, y: min_y }, coord! { x: max_x, y: max_y }),
        }
    }

    /// A degenerate envelope covering a single point.
    pub fn point(x: f64, y: f64) -> Self {
        Self::new(x, y, x, y)
    }

    pub fn from_rect(rect: Rect<f64>) -> Self {
        Self { rect }
    }

    pub fn rect(&self) -> &Rect<f64> {
        &self.rect
    }

    pub fn min_x(&self) -> f64 {
        self.rect.min().x
    }

    pub fn min_y(&self) -> f64 {
        self.rect.min().y
    }

    pub fn max_x(&self) -> f64 {
        self.rect.max().x
    }

    pub fn max_y(&self) -> f64 {
        self.rect.max().y
    }

    pub fn width(&self) -> f64 {
        self.rect.width()
    }

    pub fn height(&self) -> f64 {
        self.rect.height()
    }

    pub fn center(&self) -> (f64, f64) {
        let c = self.rect.center();
        (c.x, c.y)
    }

    /// Whether every coordinate is a finite number.
    pub fn is_finite(&self) -> bool {
        self.min_x().is_finite()
            && self.min_y().is_finite()
            && self.max_x().is_finite()
            && self.max_y().is_finite()
    }

    /// Closed containment: `other` lies inside or on the boundary of `self`.
    pub fn contains(&self, other: &Envelope) -> bool {
        other.min_x() >= self.min_x()
            && other.max_x() <= self.max_x()
            && other.min_y() >= self.min_y()
            && other.max_y() <= self.max_y()
    }

    pub fn intersects(&self, other: &Envelope) -> bool {
        !(self.max_x() < other.min_x()
            || self.min_x() > other.max_x()
            || self.max_y() < other.min_y()
            || self.min_y() > other.max_y())
    }

    /// Smallest envelope covering both `self` and `other`.
    pub fn union(&self, other: &Envelope) -> Envelope {
        Envelope::new(
            self.min_x().min(other.min_x()),
            self.min_y().min(other.min_y()),
            self.max_x().max(other.max_x()),
            self.max_y().max(other.max_y()),
        )
    }

    /// Scale the envelope about its center.
    pub fn scaled(&self, factor: f64) -> Envelope {
        let (cx, cy) = self.center();
        let half_w = self.width() * factor / 2.0;
        let half_h = self.height() * factor / 2.0;
        Envelope::new(cx - half_w, cy - half_h, cx + half_w, cy + half_h)
    }
}

/// Fold an iterator of optional envelopes into their union.
pub fn union_all<'a, I>(envelopes: I) -> Option<Envelope>
where
    I: IntoIterator<Item = Option<&'a Envelope>>,
{
    envelopes
        .into_iter()
        .flatten()
        .fold(None, |acc: Option<Envelope>, env| match acc {
            Some(acc) => Some(acc.union(env)),
            None => Some(*env),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_corners() {
        let env = Envelope::new(10.0, 5.0, -10.0, -5.0);
        assert_eq!(env.min_x(), -10.0);
        assert_eq!(env.max_y(), 5.0);
        assert_eq!(env.width(), 20.0);
    }

    #[test]
    fn test_closed_containment() {
        let outer = Envelope::new(0.0, 0.0, 10.0, 10.0);
        assert!(outer.contains(&Envelope::point(10.0, 0.0)));
        assert!(outer.contains(&outer));
        assert!(!outer.contains(&Envelope::new(5.0, 5.0, 11.0, 6.0)));
    }

    #[test]
    fn test_union_all_skips_missing() {
        let a = Envelope::point(1.0, 1.0);
        let b = Envelope::new(-2.0, 0.0, 0.0, 3.0);
        let all = union_all([Some(&a), None, Some(&b)]).unwrap();
        assert_eq!(all, Envelope::new(-2.0, 0.0, 1.0, 3.0));
        assert!(union_all(std::iter::empty()).is_none());
    }

    #[test]
    fn test_scaled_keeps_center() {
        let env = Envelope::new(-1.0, -2.0, 1.0, 2.0).scaled(2.0);
        assert_eq!(env, Envelope::new(-2.0, -4.0, 2.0, 4.0));
        assert!(!Envelope::new(f64::NAN, 0.0, 1.0, 1.0).is_finite());
    }
}
