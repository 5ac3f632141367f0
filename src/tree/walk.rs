//! Lazy traversal of a built tree
//!
//! Bucket subtrees are resolved through the object store as the iterator
//! reaches them, so a walk holds at most one pending node list per level.

use crate::error::StorageError;
use crate::store::ObjectStore;
use crate::tree::node::Node;
use crate::tree::revtree::RevTree;
use crate::types::ContentId;

/// Which nodes a walk yields and whether it descends into child trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalkStrategy {
    /// Direct children of the tree, features and trees
    #[default]
    Children,
    /// Direct feature children
    FeaturesOnly,
    /// Direct tree children
    TreesOnly,
    /// Every reachable node, depth first
    DepthFirst,
    /// Every reachable feature, depth first
    DepthFirstOnlyFeatures,
    /// Every reachable tree node, depth first
    DepthFirstOnlyTrees,
}

impl WalkStrategy {
    fn recurses(self) -> bool {
        matches!(
            self,
            WalkStrategy::DepthFirst
                | WalkStrategy::DepthFirstOnlyFeatures
                | WalkStrategy::DepthFirstOnlyTrees
        )
    }

    fn yields(self, node: &Node) -> bool {
        match self {
            WalkStrategy::Children | WalkStrategy::DepthFirst => true,
            WalkStrategy::FeaturesOnly | WalkStrategy::DepthFirstOnlyFeatures => !node.is_tree(),
            WalkStrategy::TreesOnly | WalkStrategy::DepthFirstOnlyTrees => node.is_tree(),
        }
    }
}

/// A node reached by a walk, with its slash-separated path from the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: String,
    pub node: Node,
}

enum Frame {
    Unresolved { prefix: String, id: ContentId },
    Nodes {
        prefix: String,
        nodes: std::vec::IntoIter<Node>,
    },
}

/// Iterator over the nodes of a tree. Create a new one to restart.
pub struct TreeWalk<'a> {
    store: &'a dyn ObjectStore,
    strategy: WalkStrategy,
    stack: Vec<Frame>,
}

impl<'a> TreeWalk<'a> {
    pub fn new(store: &'a dyn ObjectStore, tree: &RevTree, strategy: WalkStrategy) -> Self {
        let mut walk = TreeWalk {
            store,
            strategy,
            stack: Vec::new(),
        };
        walk.push_tree(String::new(), tree);
        walk
    }

    fn push_tree(&mut self, prefix: String, tree: &RevTree) {
        if tree.is_bucketed() {
            for bucket in tree.buckets().values().rev() {
                self.stack.push(Frame::Unresolved {
                    prefix: prefix.clone(),
                    id: *bucket.id(),
                });
            }
        } else {
            let nodes: Vec<Node> = tree.children().cloned().collect();
            self.stack.push(Frame::Nodes {
                prefix,
                nodes: nodes.into_iter(),
            });
        }
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

impl Iterator for TreeWalk<'_> {
    type Item = Result<WalkEntry, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.stack.pop()? {
                Frame::Unresolved { prefix, id } => match self.store.get_tree(&id) {
                    Ok(tree) => self.push_tree(prefix, &tree),
                    Err(err) => {
                        self.stack.clear();
                        return Some(Err(err));
                    }
                },
                Frame::Nodes { prefix, mut nodes } => {
                    let Some(node) = nodes.next() else {
                        continue;
                    };
                    let path = join(&prefix, node.name());
                    self.stack.push(Frame::Nodes { prefix, nodes });
                    if node.is_tree() && self.strategy.recurses() {
                        self.stack.push(Frame::Unresolved {
                            prefix: path.clone(),
                            id: *node.id(),
                        });
                    }
                    if self.strategy.yields(&node) {
                        return Some(Ok(WalkEntry { path, node }));
                    }
                }
            }
        }
    }
}

/// Walk `tree` with the given strategy.
pub fn walk<'a>(store: &'a dyn ObjectStore, tree: &RevTree, strategy: WalkStrategy) -> TreeWalk<'a> {
    TreeWalk::new(store, tree, strategy)
}

/// Every feature reachable from `tree`.
pub fn all_features(store: &dyn ObjectStore, tree: &RevTree) -> Result<Vec<WalkEntry>, StorageError> {
    walk(store, tree, WalkStrategy::DepthFirstOnlyFeatures).collect()
}
