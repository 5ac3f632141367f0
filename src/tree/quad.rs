//! Quad-tree bucketing for spatial indexes
//!
//! Each depth halves the width and height of the enclosing quadrant, starting
//! from a fixed maximum envelope. Entries whose bounds are missing, not finite,
//! outside the maximum envelope, or deeper than `max_depth` can't be promoted
//! to a quadrant and go to the unpromotables bucket.

use crate::error::TreeError;
use crate::tree::envelope::Envelope;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Bucket index reserved for entries that can't be spatially classified.
pub const UNPROMOTABLE_INDEX: u32 = 4;

/// Staged-entry limit of a quad-tree node, at every depth.
pub const QUAD_SIZE_LIMIT: usize = 128;

/// Four quadrant buckets plus unpromotables.
pub const QUAD_BUCKETS: u32 = 5;

const MAX_EXPANSIONS: u32 = 64;

/// Quadrants of an envelope, in bucket index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quadrant {
    SouthWest,
    NorthWest,
    NorthEast,
    SouthEast,
}

impl Quadrant {
    pub const VALUES: [Quadrant; 4] = [
        Quadrant::SouthWest,
        Quadrant::NorthWest,
        Quadrant::NorthEast,
        Quadrant::SouthEast,
    ];

    pub fn index(self) -> u32 {
        match self {
            Quadrant::SouthWest => 0,
            Quadrant::NorthWest => 1,
            Quadrant::NorthEast => 2,
            Quadrant::SouthEast => 3,
        }
    }

    /// The part of `parent` this quadrant covers.
    pub fn slice(self, parent: &Envelope) -> Envelope {
        let (cx, cy) = parent.center();
        match self {
            Quadrant::SouthWest => Envelope::new(parent.min_x(), parent.min_y(), cx, cy),
            Quadrant::NorthWest => Envelope::new(parent.min_x(), cy, cx, parent.max_y()),
            Quadrant::NorthEast => Envelope::new(cx, cy, parent.max_x(), parent.max_y()),
            Quadrant::SouthEast => Envelope::new(cx, parent.min_y(), parent.max_x(), cy),
        }
    }
}

/// What a quad-tree does with entries outside its maximum envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuadOverflow {
    /// Store them in the unpromotables bucket
    #[default]
    Unpromotable,
    /// Grow the maximum envelope until they fit and rebuild the index
    Expand,
}

/// Parameters of the quad-tree strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadOrder {
    max_bounds: Envelope,
    max_depth: u32,
    overflow: QuadOverflow,
}

impl QuadOrder {
    pub fn new(max_bounds: Envelope, max_depth: u32) -> Result<Self, TreeError> {
        if !max_bounds.is_finite() || max_bounds.width() <= 0.0 || max_bounds.height() <= 0.0 {
            return Err(TreeError::InvalidArgument(format!(
                "quad-tree max bounds must have a finite, non-empty area: {:?}",
                max_bounds
            )));
        }
        Ok(QuadOrder {
            max_bounds,
            max_depth,
            overflow: QuadOverflow::default(),
        })
    }

    pub fn with_overflow(mut self, overflow: QuadOverflow) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn max_bounds(&self) -> &Envelope {
        &self.max_bounds
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn overflow(&self) -> QuadOverflow {
        self.overflow
    }

    pub fn max_buckets_for_level(&self, _depth: u32) -> u32 {
        QUAD_BUCKETS
    }

    pub fn normalized_size_limit(&self, _depth: u32) -> usize {
        QUAD_SIZE_LIMIT
    }

    /// Whether bounds can be placed in a quadrant at depth 0.
    pub fn is_promotable(&self, bounds: Option<&Envelope>) -> bool {
        self.quadrant(bounds, 0).is_some()
    }

    /// Quadrant holding `bounds` at `depth`, if any.
    pub fn quadrant(&self, bounds: Option<&Envelope>, depth: u32) -> Option<Quadrant> {
        let bounds = bounds?;
        if depth >= self.max_depth || !bounds.is_finite() {
            return None;
        }
        let mut parent = self.max_bounds;
        for current in 0..=depth {
            let (quadrant, slice) = Quadrant::VALUES
                .iter()
                .map(|q| (*q, q.slice(&parent)))
                .find(|(_, slice)| slice.contains(bounds))?;
            if current == depth {
                return Some(quadrant);
            }
            parent = slice;
        }
        None
    }

    /// Bucket index of `bounds` at `depth`.
    pub fn bucket(&self, bounds: Option<&Envelope>, depth: u32) -> u32 {
        if let Some(env) = bounds {
            if !env.is_finite() {
                warn!(?env, "non-finite bounds routed to unpromotables");
            }
        }
        self.quadrant(bounds, depth)
            .map(Quadrant::index)
            .unwrap_or(UNPROMOTABLE_INDEX)
    }

    /// Bucket indexes of `bounds` at every depth, stopping at the first
    /// unpromotable level.
    pub fn buckets_by_depth(&self, bounds: Option<&Envelope>) -> Vec<u32> {
        let mut path = Vec::new();
        if bounds.map_or(true, |b| !b.is_finite()) {
            return path;
        }
        for depth in 0..self.max_depth {
            let bucket = self.bucket(bounds, depth);
            path.push(bucket);
            if bucket == UNPROMOTABLE_INDEX {
                break;
            }
        }
        path
    }

    /// An order whose max bounds cover every finite envelope in `bounds`, or
    /// `None` when the current bounds already do.
    ///
    /// Bounds double about their center; each doubling adds one level to
    /// `max_depth` so leaf quadrants keep their size.
    pub fn expanded_to_fit<'a, I>(&self, bounds: I) -> Option<QuadOrder>
    where
        I: IntoIterator<Item = &'a Envelope>,
    {
        let outside: Vec<&Envelope> = bounds
            .into_iter()
            .filter(|b| b.is_finite() && !self.max_bounds.contains(b))
            .collect();
        if outside.is_empty() {
            return None;
        }
        let mut expanded = self.max_bounds;
        let mut steps = 0;
        while steps < MAX_EXPANSIONS && outside.iter().any(|b| !expanded.contains(b)) {
            expanded = expanded.scaled(2.0);
            steps += 1;
        }
        Some(QuadOrder {
            max_bounds: expanded,
            max_depth: self.max_depth + steps,
            overflow: self.overflow,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world(max_depth: u32) -> QuadOrder {
        QuadOrder::new(Envelope::new(-180.0, -90.0, 180.0, 90.0), max_depth).unwrap()
    }

    #[test]
    fn test_quadrant_slices() {
        let parent = Envelope::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(Quadrant::SouthWest.slice(&parent), Envelope::new(0.0, 0.0, 5.0, 5.0));
        assert_eq!(Quadrant::NorthWest.slice(&parent), Envelope::new(0.0, 5.0, 5.0, 10.0));
        assert_eq!(Quadrant::NorthEast.slice(&parent), Envelope::new(5.0, 5.0, 10.0, 10.0));
        assert_eq!(Quadrant::SouthEast.slice(&parent), Envelope::new(5.0, 0.0, 10.0, 5.0));
    }

    #[test]
    fn test_bucket_by_depth() {
        let order = world(8);
        let point = Envelope::point(100.0, 45.0);
        assert_eq!(order.bucket(Some(&point), 0), Quadrant::NorthEast.index());
        // (100,45) lies on the y center line of [0,180]x[0,90]; NE is tried before SE
        assert_eq!(order.bucket(Some(&point), 1), Quadrant::NorthEast.index());
        let below = Envelope::point(100.0, 40.0);
        assert_eq!(order.bucket(Some(&below), 1), Quadrant::SouthEast.index());
        let path = order.buckets_by_depth(Some(&point));
        assert_eq!(path.len(), 8);
        assert_eq!(path[0], 2);
    }

    #[test]
    fn test_unpromotables() {
        let order = world(4);
        assert_eq!(order.bucket(None, 0), UNPROMOTABLE_INDEX);
        let nan = Envelope::new(f64::NAN, 0.0, 1.0, 1.0);
        assert_eq!(order.bucket(Some(&nan), 0), UNPROMOTABLE_INDEX);
        let outside = Envelope::point(200.0, 0.0);
        assert_eq!(order.bucket(Some(&outside), 0), UNPROMOTABLE_INDEX);
        // straddles the prime meridian, no quadrant holds it
        let wide = Envelope::new(-10.0, 10.0, 10.0, 20.0);
        assert_eq!(order.bucket(Some(&wide), 0), UNPROMOTABLE_INDEX);
        let inside = Envelope::point(-100.0, -45.0);
        assert_eq!(order.bucket(Some(&inside), 4), UNPROMOTABLE_INDEX);
        assert!(order.buckets_by_depth(None).is_empty());
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        assert!(QuadOrder::new(Envelope::point(0.0, 0.0), 4).is_err());
        assert!(QuadOrder::new(Envelope::new(0.0, 0.0, f64::INFINITY, 1.0), 4).is_err());
    }

    #[test]
    fn test_expanded_to_fit() {
        let order = world(6);
        assert!(order.expanded_to_fit([&Envelope::point(1.0, 1.0)]).is_none());

        let far = Envelope::point(500.0, 0.0);
        let expanded = order.expanded_to_fit([&far]).unwrap();
        assert!(expanded.max_bounds().contains(&far));
        assert_eq!(expanded.max_bounds(), &Envelope::new(-720.0, -360.0, 720.0, 360.0));
        assert_eq!(expanded.max_depth(), 8);
        assert!(expanded.is_promotable(Some(&far)));
    }
}
