//! Bucket ordering strategies
//!
//! A [`BucketOrder`] decides, for a given tree depth, how many buckets a
//! tree shards into, how many staged entries it may hold before sharding, and
//! which bucket an entry belongs to.
//!
//! The canonical strategy hashes entry names with 64-bit FNV-1a and consumes
//! `log2(max_buckets_for_level(depth))` bits of that hash per depth, most
//! significant bits first. The quad strategy partitions by spatial bounds, see
//! [`QuadOrder`].

use crate::error::TreeError;
use crate::tree::envelope::Envelope;
use crate::tree::node::{Node, NodeKind};
use crate::tree::quad::{QuadOrder, UNPROMOTABLE_INDEX};
use std::cmp::Ordering;

/// Deepest depth the canonical strategy can partition.
pub const CANONICAL_MAX_DEPTH: u32 = 7;

const FNV64_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV64_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a over the UTF-8 bytes of `name`.
pub fn fnv1a64(name: &str) -> u64 {
    name.bytes().fold(FNV64_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV64_PRIME)
    })
}

/// Canonical storage order of nodes: name hash first, then name.
///
/// Bucket indexes are prefixes of the name hash, so this order agrees with
/// the canonical bucket order at every depth.
pub fn node_order(a: &Node, b: &Node) -> Ordering {
    name_order(a.name(), b.name())
}

pub fn name_order(a: &str, b: &str) -> Ordering {
    fnv1a64(a).cmp(&fnv1a64(b)).then_with(|| a.cmp(b))
}

pub fn canonical_max_buckets(depth: u32) -> u32 {
    match depth {
        0..=2 => 32,
        3 | 4 => 8,
        5 | 6 => 4,
        _ => 2,
    }
}

pub fn canonical_size_limit(depth: u32) -> usize {
    match depth {
        0..=2 => 512,
        _ => 256,
    }
}

fn bits_for_level(depth: u32) -> u32 {
    canonical_max_buckets(depth).trailing_zeros()
}

fn bit_offset(depth: u32) -> u32 {
    (0..depth).map(bits_for_level).sum()
}

/// Canonical bucket index of `name` at `depth`.
pub fn canonical_bucket(name: &str, depth: u32) -> Result<u32, TreeError> {
    if depth > CANONICAL_MAX_DEPTH {
        return Err(TreeError::TooDeep {
            depth,
            max: CANONICAL_MAX_DEPTH,
        });
    }
    let hash = fnv1a64(name);
    let bits = bits_for_level(depth);
    let shifted = hash << bit_offset(depth);
    Ok((shifted >> (64 - bits)) as u32)
}

/// Bucket indexes of `name` at every canonical depth, root first.
pub fn canonical_path(name: &str) -> Vec<u32> {
    (0..=CANONICAL_MAX_DEPTH)
        .filter_map(|depth| canonical_bucket(name, depth).ok())
        .collect()
}

/// How a staged deletion finds its bucket.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Route {
    /// Route like a node with these bounds
    Known(Option<Envelope>),
    /// Bounds unknown; the deletion visits every existing bucket
    Unknown,
}

/// Where a staged change goes during bucket normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Routing {
    Bucket(u32),
    Broadcast,
}

/// Bucketing strategy of a tree.
#[derive(Debug, Clone, PartialEq)]
pub enum BucketOrder {
    /// Name-hash partitioning, used for general feature storage
    Canonical,
    /// Spatial quadrant partitioning, used for spatial indexes
    Quad(QuadOrder),
}

impl Default for BucketOrder {
    fn default() -> Self {
        BucketOrder::Canonical
    }
}

impl BucketOrder {
    /// Fan-out of a tree that shards at `depth`.
    pub fn max_buckets_for_level(&self, depth: u32) -> u32 {
        match self {
            BucketOrder::Canonical => canonical_max_buckets(depth),
            BucketOrder::Quad(quad) => quad.max_buckets_for_level(depth),
        }
    }

    /// Staged-entry count above which a tree at `depth` shards into buckets.
    pub fn normalized_size_limit(&self, depth: u32) -> usize {
        match self {
            BucketOrder::Canonical => canonical_size_limit(depth),
            BucketOrder::Quad(quad) => quad.normalized_size_limit(depth),
        }
    }

    /// Bucket index of an entry with the given name and bounds at `depth`.
    pub fn bucket(
        &self,
        name: &str,
        bounds: Option<&Envelope>,
        depth: u32,
    ) -> Result<u32, TreeError> {
        if name.is_empty() {
            return Err(TreeError::InvalidArgument("key can't be empty".to_string()));
        }
        match self {
            BucketOrder::Canonical => canonical_bucket(name, depth),
            BucketOrder::Quad(quad) => Ok(quad.bucket(bounds, depth)),
        }
    }

    /// Reject nodes the strategy can't store.
    pub fn accepts(&self, node: &Node) -> Result<(), TreeError> {
        match self {
            BucketOrder::Quad(_) if node.kind() != NodeKind::Feature => {
                Err(TreeError::InvalidArgument(format!(
                    "can't add non feature node {:?} to a quad-tree",
                    node.name()
                )))
            }
            _ => Ok(()),
        }
    }

    /// Whether a put and a staged deletion of the same name end up in the
    /// same leaf, so the put alone replaces the stored node.
    pub(crate) fn same_route(&self, node: &Node, route: &Route) -> bool {
        match (self, route) {
            (BucketOrder::Canonical, _) => true,
            (BucketOrder::Quad(_), Route::Unknown) => false,
            (BucketOrder::Quad(quad), Route::Known(bounds)) => {
                quad.buckets_by_depth(node.bounds()) == quad.buckets_by_depth(bounds.as_ref())
            }
        }
    }

    pub(crate) fn route(&self, name: &str, route: &Route, depth: u32) -> Result<Routing, TreeError> {
        match (self, route) {
            (BucketOrder::Quad(_), Route::Unknown) => Ok(Routing::Broadcast),
            (_, Route::Known(bounds)) => self.bucket(name, bounds.as_ref(), depth).map(Routing::Bucket),
            (BucketOrder::Canonical, Route::Unknown) => {
                self.bucket(name, None, depth).map(Routing::Bucket)
            }
        }
    }

    /// Strategy and strategy depth used by the subtree under bucket `index`.
    ///
    /// The quad unpromotables bucket is partitioned canonically from depth 0.
    pub(crate) fn child(&self, index: u32, depth: u32) -> (BucketOrder, u32) {
        match self {
            BucketOrder::Quad(_) if index == UNPROMOTABLE_INDEX => (BucketOrder::Canonical, 0),
            _ => (self.clone(), depth + 1),
        }
    }
}
