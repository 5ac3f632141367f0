//! Concurrent writes into one tree
//!
//! A [`TreeBuilder`] is single-owner. [`TreeWriter`] moves it onto a dedicated
//! thread and feeds it staged changes over a channel, so any number of
//! producer threads can share one builder without locking it.
//!
//! The writer's methods block; call them from plain threads or from
//! `tokio::task::spawn_blocking`, not from inside an async task.

use crate::error::TreeError;
use crate::tree::builder::TreeBuilder;
use crate::tree::node::Node;
use crate::tree::revtree::RevTree;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

enum Command {
    Put(Node),
    Remove(String),
    RemoveNode(Node),
    Update { old: Node, new: Node },
    Build(oneshot::Sender<Result<RevTree, TreeError>>),
}

/// Handle to a builder running on its own thread.
///
/// Staging calls return once the change is queued. A staging error is
/// recorded and returned by the next [`build`](Self::build), which then
/// skips building; later changes keep applying.
pub struct TreeWriter {
    tx: Option<mpsc::UnboundedSender<Command>>,
    handle: Option<JoinHandle<()>>,
}

impl TreeWriter {
    /// Start a writer thread owning `builder`.
    pub fn spawn(builder: TreeBuilder) -> Result<Self, TreeError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = std::thread::Builder::new()
            .name("revtree-writer".to_string())
            .spawn(move || run(builder, rx))
            .map_err(|e| TreeError::Invariant(format!("failed to start writer thread: {}", e)))?;
        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    pub fn put(&self, node: Node) -> Result<(), TreeError> {
        self.send(Command::Put(node))
    }

    pub fn remove(&self, name: impl Into<String>) -> Result<(), TreeError> {
        self.send(Command::Remove(name.into()))
    }

    /// Remove a node whose stored bounds are known.
    pub fn remove_node(&self, node: Node) -> Result<(), TreeError> {
        self.send(Command::RemoveNode(node))
    }

    pub fn update(&self, old: Node, new: Node) -> Result<(), TreeError> {
        self.send(Command::Update { old, new })
    }

    /// Build everything queued so far and wait for the result.
    pub fn build(&self) -> Result<RevTree, TreeError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Build(reply))?;
        response.blocking_recv().map_err(|_| TreeError::WriterClosed)?
    }

    /// Build once more and stop the thread.
    pub fn finish(mut self) -> Result<RevTree, TreeError> {
        let tree = self.build();
        self.shutdown();
        tree
    }

    fn send(&self, command: Command) -> Result<(), TreeError> {
        self.tx
            .as_ref()
            .ok_or(TreeError::WriterClosed)?
            .send(command)
            .map_err(|_| TreeError::WriterClosed)
    }

    fn shutdown(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("tree writer thread panicked");
            }
        }
    }
}

impl Drop for TreeWriter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(mut builder: TreeBuilder, mut rx: mpsc::UnboundedReceiver<Command>) {
    let mut failure: Option<TreeError> = None;
    let mut applied = 0usize;
    while let Some(command) = rx.blocking_recv() {
        let outcome = match command {
            Command::Put(node) => builder.put(node).map(|_| ()),
            Command::Remove(name) => builder.remove(&name),
            Command::RemoveNode(node) => builder.remove_node(&node),
            Command::Update { old, new } => builder.update(&old, new).map(|_| ()),
            Command::Build(reply) => {
                let result = match failure.take() {
                    Some(err) => Err(err),
                    None => builder.build(),
                };
                debug!(applied, ok = result.is_ok(), "tree writer build");
                applied = 0;
                // The caller may have given up waiting.
                let _ = reply.send(result);
                continue;
            }
        };
        applied += 1;
        if let Err(err) = outcome {
            if failure.is_none() {
                failure = Some(err);
            }
        }
    }
}
