//! Non-blocking block requests on a dedicated loader thread.
//!
//! `VolumeProvider::sample` blocks its caller until the block is ready. A
//! `BlockLoader` moves that wait off the requesting thread: requests are
//! queued to a worker thread and completions come back over a channel, to be
//! polled from e.g. a render loop.
//!
//! The worker is a plain OS thread rather than a rayon job. `sample()` holds
//! the provider lock while it fans a block out over rayon's pool, and a pool
//! worker waiting on that fan-out may run another queued job itself.
//! Completions are produced one at a time, in request order.
//!
//! # Usage
//!
//! ```ignore
//! let loader = BlockLoader::new(Arc::new(provider));
//!
//! // Queue work (non-blocking)
//! loader.request(NodeId::root(0));
//!
//! // Poll each frame
//! while let Some(done) = loader.poll() {
//!     upload(done.node, done.block);
//! }
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{self as channel, Receiver, Sender};
use tracing::debug;

use crate::normalizer::VoxelValue;
use crate::octree::NodeId;
use crate::provider::{VolumeProvider, VoxelBlock};

/// Result of one block request.
#[derive(Debug)]
pub struct BlockCompletion<T: VoxelValue> {
  pub node: NodeId,
  /// `None` when the provider had no data for the node.
  pub block: Option<VoxelBlock<T>>,
}

/// Queue of block requests against a shared provider.
///
/// Dropping the loader stops its worker once the block in flight is done.
pub struct BlockLoader<T: VoxelValue = u8> {
  provider: Arc<VolumeProvider<T>>,
  requests: Sender<NodeId>,
  completions: Receiver<BlockCompletion<T>>,
  /// Nodes requested and not yet completed.
  pending: Arc<Mutex<HashSet<NodeId>>>,
}

impl<T: VoxelValue> BlockLoader<T> {
  pub fn new(provider: Arc<VolumeProvider<T>>) -> Self {
    let (requests, queue) = channel::unbounded::<NodeId>();
    let (finished, completions) = channel::unbounded();
    let pending = Arc::new(Mutex::new(HashSet::new()));

    {
      let provider = Arc::clone(&provider);
      let pending = Arc::clone(&pending);
      thread::spawn(move || {
        // Ends when the loader (the only request sender) is dropped
        for node in queue {
          let block = provider.sample(node);
          pending.lock().unwrap_or_else(PoisonError::into_inner).remove(&node);
          // Ignore send error (loader dropped = cancelled)
          let _ = finished.send(BlockCompletion { node, block });
        }
        debug!("block loader stopped");
      });
    }

    Self {
      provider,
      requests,
      completions,
      pending,
    }
  }

  pub fn provider(&self) -> &Arc<VolumeProvider<T>> {
    &self.provider
  }

  /// Queue `node` for sampling.
  ///
  /// Returns `false` if the node is already pending or the worker is gone.
  pub fn request(&self, node: NodeId) -> bool {
    let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
    if !pending.insert(node) {
      return false;
    }
    if self.requests.send(node).is_err() {
      pending.remove(&node);
      return false;
    }
    true
  }

  /// Next completion, if any (non-blocking).
  pub fn poll(&self) -> Option<BlockCompletion<T>> {
    self.completions.try_recv().ok()
  }

  /// Wait up to `timeout` for the next completion.
  pub fn wait(&self, timeout: Duration) -> Option<BlockCompletion<T>> {
    self.completions.recv_timeout(timeout).ok()
  }

  /// All completions available now.
  pub fn drain(&self) -> Vec<BlockCompletion<T>> {
    self.completions.try_iter().collect()
  }

  /// Requests queued or running.
  pub fn pending_count(&self) -> usize {
    self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_pending(&self, node: NodeId) -> bool {
    self
      .pending
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .contains(&node)
  }
}

// =============================================================================
// Tests
// =============================================================================
