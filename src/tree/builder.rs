//! Tree Builder
//!
//! Stages puts and removes against a starting [`RevTree`] and normalizes them
//! into a new immutable tree on [`TreeBuilder::build`].
//!
//! A tree level stays flat while its staged entry count fits the order's size
//! limit, and shards into buckets otherwise. Changes to a bucketed level are
//! partitioned by bucket and applied through recursive child stages seeded
//! from the affected bucket subtrees only; untouched buckets are never read.
//! A bucketed level whose entries fit the limit again is collapsed back into a
//! flat tree, so the shape of a tree depends only on its content.

use crate::config::BuilderSettings;
use crate::error::TreeError;
use crate::store::ObjectStore;
use crate::tree::node::{Bucket, Node, NodeKind};
use crate::tree::order::{BucketOrder, Route, Routing};
use crate::tree::pending::PendingWrites;
use crate::tree::quad::QuadOverflow;
use crate::tree::revtree::{RevObject, RevTree};
use crate::types::ContentId;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

/// Mutable accumulator of changes to a [`RevTree`].
///
/// Not shareable between threads while mutating; use
/// [`TreeWriter`](crate::concurrency::TreeWriter) to feed one builder from
/// several producers.
pub struct TreeBuilder {
    store: Arc<dyn ObjectStore>,
    original: RevTree,
    settings: BuilderSettings,
    pending: PendingWrites,
    stage: Stage,
    dirty: bool,
}

impl TreeBuilder {
    /// Builder over the empty tree with the canonical order.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self::with_order(store, None, BucketOrder::Canonical)
    }

    /// Builder amending `original` with the canonical order.
    pub fn from_tree(store: Arc<dyn ObjectStore>, original: RevTree) -> Self {
        Self::with_order(store, Some(original), BucketOrder::Canonical)
    }

    /// Builder amending `original` (or the empty tree) with an explicit order.
    ///
    /// `original` must have been built with the same order.
    pub fn with_order(
        store: Arc<dyn ObjectStore>,
        original: Option<RevTree>,
        order: BucketOrder,
    ) -> Self {
        let original = original.unwrap_or_else(RevTree::empty);
        let settings = BuilderSettings::default();
        let stage = Stage::seed(&original, order, 0, 0);
        Self {
            store,
            original,
            pending: PendingWrites::new(settings.pending_writes_threshold),
            settings,
            stage,
            dirty: false,
        }
    }

    pub fn with_settings(mut self, settings: BuilderSettings) -> Self {
        self.pending = PendingWrites::new(settings.pending_writes_threshold);
        self.settings = settings;
        self
    }

    /// The order the root level partitions with. Quad-trees that expanded
    /// report their grown bounds here; reuse this order when amending the
    /// built tree later.
    pub fn order(&self) -> &BucketOrder {
        &self.stage.order
    }

    /// The tree this builder amends.
    pub fn original(&self) -> &RevTree {
        &self.original
    }

    /// Number of staged puts and deletes at the root level.
    pub fn change_count(&self) -> usize {
        self.stage.change_count()
    }

    /// Stage an insert or replacement of the child named `node.name()`.
    pub fn put(&mut self, node: Node) -> Result<bool, TreeError> {
        node.validate()?;
        self.stage.order.accepts(&node)?;
        self.stage.put(node);
        self.dirty = true;

        let count = self.stage.change_count();
        let limit = self.stage.order.normalized_size_limit(self.stage.depth);
        if count >= self.settings.normalization_threshold && (!self.stage.is_flat() || count > limit)
        {
            debug!(staged = count, "normalizing staged changes early");
            self.normalize_staged()?;
        }
        Ok(true)
    }

    /// Stage a removal by name.
    ///
    /// Quad-tree builders don't know where an entry removed by name is
    /// stored, so the removal visits every bucket; prefer
    /// [`remove_node`](Self::remove_node) there.
    pub fn remove(&mut self, name: &str) -> Result<(), TreeError> {
        if name.is_empty() {
            return Err(TreeError::InvalidArgument("key can't be empty".to_string()));
        }
        let route = match self.stage.order {
            BucketOrder::Canonical => Route::Known(None),
            BucketOrder::Quad(_) => Route::Unknown,
        };
        self.stage.remove(name, route);
        self.dirty = true;
        Ok(())
    }

    /// Stage a removal of a node whose stored bounds are known.
    pub fn remove_node(&mut self, node: &Node) -> Result<(), TreeError> {
        if node.name().is_empty() {
            return Err(TreeError::InvalidArgument("node name can't be empty".to_string()));
        }
        self.stage.remove(node.name(), Route::Known(node.bounds().copied()));
        self.dirty = true;
        Ok(())
    }

    /// Stage the replacement of `old` by `new`.
    ///
    /// When the name or bounds change, `old` is removed from where it is
    /// stored before `new` is put.
    pub fn update(&mut self, old: &Node, new: Node) -> Result<bool, TreeError> {
        new.validate()?;
        self.stage.order.accepts(&new)?;
        if old.name() != new.name() || old.bounds() != new.bounds() {
            self.remove_node(old)?;
        }
        self.put(new)
    }

    /// Look a child up by name, through staged changes and bucket subtrees.
    pub fn get(&self, name: &str) -> Result<Option<Node>, TreeError> {
        let stage = &self.stage;
        if let Some(node) = stage.features.get(name).or_else(|| stage.trees.get(name)) {
            return Ok(Some(node.clone()));
        }
        if stage.deletes.contains_key(name) || stage.is_flat() {
            return Ok(None);
        }
        find_in_buckets(
            self.store.as_ref(),
            &self.pending,
            &stage.order,
            stage.depth,
            &stage.buckets,
            name,
        )
    }

    /// Normalize the staged changes into a new tree and persist it.
    ///
    /// Returns the original tree when nothing changed. The builder is rebased
    /// onto the result, so further changes amend the built tree. After an
    /// error the staged state is unspecified and the builder must be dropped.
    pub fn build(&mut self) -> Result<RevTree, TreeError> {
        if !self.dirty {
            return Ok(self.original.clone());
        }
        let started = Instant::now();
        self.expand_if_needed()?;

        let tree = {
            let mut ctx = Context {
                store: self.store.as_ref(),
                pending: &mut self.pending,
            };
            normalize(&mut self.stage, &mut ctx)?
        };
        tree.check_invariants()?;
        let flushed = self.pending.flush(self.store.as_ref())?;
        self.store.put(RevObject::Tree(tree.clone()))?;

        debug!(
            tree = %tree.id().short(),
            size = tree.size(),
            num_trees = tree.num_trees(),
            buckets = tree.buckets().len(),
            flushed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "built tree"
        );

        let order = self.stage.order.clone();
        self.stage = Stage::seed(&tree, order, 0, 0);
        self.dirty = false;
        if tree.id() == self.original.id() {
            return Ok(self.original.clone());
        }
        self.original = tree.clone();
        Ok(tree)
    }

    fn normalize_staged(&mut self) -> Result<RevTree, TreeError> {
        // staged nodes must never reach a bucket before the bounds cover them
        self.expand_if_needed()?;
        let tree = {
            let mut ctx = Context {
                store: self.store.as_ref(),
                pending: &mut self.pending,
            };
            normalize(&mut self.stage, &mut ctx)?
        };
        let order = self.stage.order.clone();
        self.stage = Stage::seed(&tree, order, 0, 0);
        Ok(tree)
    }

    /// Grow the quad-tree bounds until every staged node fits, then restage
    /// the full node set under the grown order.
    fn expand_if_needed(&mut self) -> Result<(), TreeError> {
        let quad = match &self.stage.order {
            BucketOrder::Quad(quad) if quad.overflow() == QuadOverflow::Expand => quad.clone(),
            _ => return Ok(()),
        };
        let Some(expanded) = quad.expanded_to_fit(self.stage.features.values().filter_map(Node::bounds))
        else {
            return Ok(());
        };
        let nodes = self.collect_nodes()?;
        debug!(
            from = ?quad.max_bounds(),
            to = ?expanded.max_bounds(),
            max_depth = expanded.max_depth(),
            nodes = nodes.len(),
            "expanding quad-tree bounds"
        );
        let mut stage = Stage::empty(BucketOrder::Quad(expanded), 0, 0);
        for node in nodes {
            stage.put(node);
        }
        self.stage = stage;
        Ok(())
    }

    /// Every node the root stage currently describes, staged changes applied.
    fn collect_nodes(&mut self) -> Result<Vec<Node>, TreeError> {
        let mut gathered = Gathered::default();
        let mut ctx = Context {
            store: self.store.as_ref(),
            pending: &mut self.pending,
        };
        gather(&ctx, &self.stage.buckets, None, &mut gathered)?;
        for id in &gathered.visited {
            ctx.pending.remove(id);
        }

        let stage = &self.stage;
        let mut nodes: Vec<Node> = gathered
            .features
            .into_iter()
            .chain(gathered.trees)
            .filter(|n| {
                !stage.deletes.contains_key(n.name())
                    && !stage.features.contains_key(n.name())
                    && !stage.trees.contains_key(n.name())
            })
            .collect();
        nodes.extend(stage.features.values().cloned());
        nodes.extend(stage.trees.values().cloned());
        Ok(nodes)
    }
}

/// Store access shared by every level of one normalization pass.
struct Context<'a> {
    store: &'a dyn ObjectStore,
    pending: &'a mut PendingWrites,
}

impl Context<'_> {
    fn resolve(&self, id: &ContentId) -> Result<RevTree, TreeError> {
        Ok(self.pending.resolve(self.store, id)?)
    }
}

/// Staged state of one tree level.
#[derive(Debug, Clone)]
struct Stage {
    order: BucketOrder,
    /// Depth as seen by `order`
    depth: u32,
    /// Distance from the root tree
    level: u32,
    features: HashMap<String, Node>,
    trees: HashMap<String, Node>,
    deletes: HashMap<String, Route>,
    buckets: BTreeMap<u32, Bucket>,
    base_size: u64,
    base_num_trees: u32,
}

impl Stage {
    fn empty(order: BucketOrder, depth: u32, level: u32) -> Self {
        Stage {
            order,
            depth,
            level,
            features: HashMap::new(),
            trees: HashMap::new(),
            deletes: HashMap::new(),
            buckets: BTreeMap::new(),
            base_size: 0,
            base_num_trees: 0,
        }
    }

    /// A flat tree stages all its nodes; a bucketed tree carries its bucket
    /// map and totals.
    fn seed(tree: &RevTree, order: BucketOrder, depth: u32, level: u32) -> Self {
        let mut stage = Stage::empty(order, depth, level);
        if tree.is_bucketed() {
            stage.buckets = tree.buckets().clone();
            stage.base_size = tree.size();
            stage.base_num_trees = tree.num_trees();
        } else {
            for node in tree.features() {
                stage.features.insert(node.name().to_string(), node.clone());
            }
            for node in tree.trees() {
                stage.trees.insert(node.name().to_string(), node.clone());
            }
        }
        stage
    }

    fn change_count(&self) -> usize {
        self.features.len() + self.trees.len() + self.deletes.len()
    }

    fn is_flat(&self) -> bool {
        self.buckets.is_empty()
    }

    fn put(&mut self, node: Node) {
        if let Some(route) = self.deletes.get(node.name()) {
            if self.order.same_route(&node, route) {
                self.deletes.remove(node.name());
            }
        }
        let name = node.name().to_string();
        match node.kind() {
            NodeKind::Feature => {
                self.trees.remove(&name);
                self.features.insert(name, node);
            }
            NodeKind::Tree => {
                self.features.remove(&name);
                self.trees.insert(name, node);
            }
        }
    }

    /// A flat stage holds every node, so dropping the staged entry is enough;
    /// bucketed stages keep a delete marker for the bucket holding the name.
    fn remove(&mut self, name: &str, route: Route) {
        self.features.remove(name);
        self.trees.remove(name);
        if !self.is_flat() {
            self.deletes.insert(name.to_string(), route);
        }
    }
}

/// Changes routed to one bucket.
#[derive(Debug, Default)]
struct Group {
    puts: Vec<Node>,
    deletes: Vec<(String, Route)>,
}

/// Nodes pulled out of bucket subtrees.
#[derive(Debug, Default)]
struct Gathered {
    features: Vec<Node>,
    trees: Vec<Node>,
    visited: Vec<ContentId>,
}

impl Gathered {
    fn len(&self) -> usize {
        self.features.len() + self.trees.len()
    }
}

fn normalize(stage: &mut Stage, ctx: &mut Context<'_>) -> Result<RevTree, TreeError> {
    let limit = stage.order.normalized_size_limit(stage.depth);
    if stage.is_flat() && stage.change_count() <= limit {
        return normalize_to_children(stage, ctx);
    }

    let tree = normalize_to_buckets(stage, ctx)?;
    match collapsible(&tree, ctx, limit)? {
        Some(gathered) => collapse(stage, &tree, gathered, ctx),
        None => Ok(tree),
    }
}

fn normalize_to_children(stage: &mut Stage, ctx: &Context<'_>) -> Result<RevTree, TreeError> {
    let features: Vec<Node> = stage.features.values().cloned().collect();
    let trees: Vec<Node> = stage.trees.values().cloned().collect();
    stage.deletes.clear();

    let mut size = features.len() as u64;
    let mut num_trees = trees.len() as u32;
    for node in &trees {
        let child = ctx.resolve(node.id())?;
        size += child.size();
        num_trees += child.num_trees();
    }
    RevTree::leaf(size, num_trees, features, trees)
}

fn normalize_to_buckets(stage: &mut Stage, ctx: &mut Context<'_>) -> Result<RevTree, TreeError> {
    let started = Instant::now();
    let groups = partition(stage)?;
    let touched = groups.len();

    let mut size_delta: i64 = 0;
    let mut trees_delta: i64 = 0;
    for (index, group) in groups {
        let (child_order, child_depth) = stage.order.child(index, stage.depth);
        let existing = stage.buckets.contains_key(&index);
        let current = match stage.buckets.get(&index) {
            Some(bucket) => ctx.resolve(bucket.id())?,
            None => RevTree::empty(),
        };

        let mut child = Stage::seed(&current, child_order, child_depth, stage.level + 1);
        for (name, route) in group.deletes {
            child.remove(&name, route);
        }
        for node in group.puts {
            child.put(node);
        }
        let built = normalize(&mut child, ctx)?;

        size_delta += built.size() as i64 - current.size() as i64;
        trees_delta += i64::from(built.num_trees()) - i64::from(current.num_trees());
        if built.id() == current.id() {
            continue;
        }
        if existing {
            ctx.pending.remove(current.id());
        }
        if built.is_empty() {
            trace!(level = stage.level, index, "bucket emptied");
            stage.buckets.remove(&index);
        } else {
            trace!(level = stage.level, index, size = built.size(), "bucket rebuilt");
            stage
                .buckets
                .insert(index, Bucket::new(index, *built.id(), built.bounds()));
            ctx.pending.insert(built);
        }
    }

    if ctx.pending.is_full() {
        ctx.pending.flush(ctx.store)?;
    }

    let max = stage.order.max_buckets_for_level(stage.depth);
    if let Some(index) = stage.buckets.keys().find(|i| **i >= max) {
        return Err(TreeError::Invariant(format!(
            "bucket index {} out of range at depth {} (max {})",
            index, stage.depth, max
        )));
    }
    let size = stage.base_size as i64 + size_delta;
    let num_trees = i64::from(stage.base_num_trees) + trees_delta;
    if size < 0 || num_trees < 0 {
        return Err(TreeError::Invariant(format!(
            "negative totals after normalization: size {}, trees {}",
            size, num_trees
        )));
    }

    let tree = RevTree::bucketed(size as u64, num_trees as u32, stage.buckets.clone())?;
    debug!(
        level = stage.level,
        touched,
        buckets = stage.buckets.len(),
        size,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "normalized to buckets"
    );
    Ok(tree)
}

/// Route every staged change to its bucket. Deletes with unknown bounds go
/// to every existing bucket.
fn partition(stage: &mut Stage) -> Result<BTreeMap<u32, Group>, TreeError> {
    let mut groups: BTreeMap<u32, Group> = BTreeMap::new();

    let deletes: Vec<(String, Route)> = stage.deletes.drain().collect();
    for (name, route) in deletes {
        match stage.order.route(&name, &route, stage.depth)? {
            Routing::Bucket(index) => groups.entry(index).or_default().deletes.push((name, route)),
            Routing::Broadcast => {
                for index in stage.buckets.keys() {
                    groups
                        .entry(*index)
                        .or_default()
                        .deletes
                        .push((name.clone(), Route::Unknown));
                }
            }
        }
    }

    let puts: Vec<Node> = stage
        .features
        .drain()
        .chain(stage.trees.drain())
        .map(|(_, node)| node)
        .collect();
    for node in puts {
        let index = stage.order.bucket(node.name(), node.bounds(), stage.depth)?;
        groups.entry(index).or_default().puts.push(node);
    }
    Ok(groups)
}

/// Entries of a bucketed tree when they fit `limit`, `None` otherwise.
fn collapsible(
    tree: &RevTree,
    ctx: &Context<'_>,
    limit: usize,
) -> Result<Option<Gathered>, TreeError> {
    // without tree nodes every entry is a feature, so size is the entry count
    if tree.num_trees() == 0 && tree.size() > limit as u64 {
        return Ok(None);
    }
    let mut gathered = Gathered::default();
    if gather(ctx, tree.buckets(), Some(limit), &mut gathered)? {
        Ok(Some(gathered))
    } else {
        Ok(None)
    }
}

fn collapse(
    stage: &Stage,
    tree: &RevTree,
    gathered: Gathered,
    ctx: &mut Context<'_>,
) -> Result<RevTree, TreeError> {
    let Gathered {
        features,
        trees,
        visited,
    } = gathered;
    for id in &visited {
        ctx.pending.remove(id);
    }
    if stage.level == 0 {
        ctx.pending.clear();
    }
    trace!(
        level = stage.level,
        entries = features.len() + trees.len(),
        "collapsed buckets"
    );
    RevTree::leaf(tree.size(), tree.num_trees(), features, trees)
}

/// Pull every node out of the subtrees under `buckets`. Returns false as soon
/// as more than `limit` nodes were found.
fn gather(
    ctx: &Context<'_>,
    buckets: &BTreeMap<u32, Bucket>,
    limit: Option<usize>,
    out: &mut Gathered,
) -> Result<bool, TreeError> {
    for bucket in buckets.values() {
        let subtree = ctx.resolve(bucket.id())?;
        out.visited.push(*bucket.id());
        if subtree.is_bucketed() {
            if !gather(ctx, subtree.buckets(), limit, out)? {
                return Ok(false);
            }
        } else {
            out.features.extend_from_slice(subtree.features());
            out.trees.extend_from_slice(subtree.trees());
            if limit.map_or(false, |limit| out.len() > limit) {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

fn find_in_buckets(
    store: &dyn ObjectStore,
    pending: &PendingWrites,
    order: &BucketOrder,
    depth: u32,
    buckets: &BTreeMap<u32, Bucket>,
    name: &str,
) -> Result<Option<Node>, TreeError> {
    let candidates: Vec<u32> = match order {
        BucketOrder::Canonical => vec![order.bucket(name, None, depth)?],
        BucketOrder::Quad(_) => buckets.keys().copied().collect(),
    };
    for index in candidates {
        let Some(bucket) = buckets.get(&index) else {
            continue;
        };
        let subtree = pending.resolve(store, bucket.id())?;
        let found = if subtree.is_bucketed() {
            let (child_order, child_depth) = order.child(index, depth);
            find_in_buckets(
                store,
                pending,
                &child_order,
                child_depth,
                subtree.buckets(),
                name,
            )?
        } else {
            subtree.child(name).cloned()
        };
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}
