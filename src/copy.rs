//! Bulk copy of trees between object stores
//!
//! Independent root trees are copied in parallel, one blocking task per
//! root. Children are written before their parent, so an interrupted copy
//! never leaves a tree in the target whose subtrees are missing, and a tree
//! already present in the target is skipped together with everything below it.

use crate::error::TreeError;
use crate::store::ObjectStore;
use crate::tree::revtree::{RevObject, RevTree};
use crate::types::ContentId;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, trace};

/// Totals of a [`copy_trees`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyReport {
    pub trees_copied: usize,
    pub features_copied: usize,
    /// Trees found in the target and not descended into
    pub skipped: usize,
    /// Feature ids referenced by a tree but absent from the source
    pub missing_features: usize,
}

impl CopyReport {
    fn merge(&mut self, other: CopyReport) {
        self.trees_copied += other.trees_copied;
        self.features_copied += other.features_copied;
        self.skipped += other.skipped;
        self.missing_features += other.missing_features;
    }
}

/// Copy every tree reachable from `roots`, and the features they reference
/// when the source has them, from `source` into `target`.
pub async fn copy_trees(
    source: Arc<dyn ObjectStore>,
    target: Arc<dyn ObjectStore>,
    roots: Vec<ContentId>,
) -> Result<CopyReport, TreeError> {
    let mut tasks = JoinSet::new();
    for root in roots {
        let source = source.clone();
        let target = target.clone();
        tasks.spawn_blocking(move || {
            let mut report = CopyReport::default();
            copy_tree(source.as_ref(), target.as_ref(), &root, &mut report)?;
            Ok::<_, TreeError>(report)
        });
    }

    let mut total = CopyReport::default();
    while let Some(joined) = tasks.join_next().await {
        let report =
            joined.map_err(|e| TreeError::Invariant(format!("copy task failed: {}", e)))??;
        total.merge(report);
    }
    debug!(
        trees = total.trees_copied,
        features = total.features_copied,
        skipped = total.skipped,
        "copied trees"
    );
    Ok(total)
}

fn copy_tree(
    source: &dyn ObjectStore,
    target: &dyn ObjectStore,
    id: &ContentId,
    report: &mut CopyReport,
) -> Result<(), TreeError> {
    if target.exists(id)? {
        report.skipped += 1;
        return Ok(());
    }
    let tree = source.get_tree(id)?;
    copy_children(source, target, &tree, report)?;
    if target.put(RevObject::Tree(tree))? {
        trace!(%id, "copied tree");
        report.trees_copied += 1;
    }
    Ok(())
}

fn copy_children(
    source: &dyn ObjectStore,
    target: &dyn ObjectStore,
    tree: &RevTree,
    report: &mut CopyReport,
) -> Result<(), TreeError> {
    for bucket in tree.buckets().values() {
        copy_tree(source, target, bucket.id(), report)?;
    }
    for node in tree.trees() {
        copy_tree(source, target, node.id(), report)?;
    }
    for node in tree.features() {
        if target.exists(node.id())? {
            continue;
        }
        match source.get_if_present(node.id())? {
            Some(object) => {
                if target.put(object)? {
                    report.features_copied += 1;
                }
            }
            None => report.missing_features += 1,
        }
    }
    Ok(())
}
