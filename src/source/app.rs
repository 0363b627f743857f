//! Application-fed source: push-style buffer injection with back-pressure.

use crate::buffer::Buffer;
use crate::component::{Chain, FrameRateQueryable, Linkable};
use crate::error::{Error, Result};
use crate::source::{SourceComponent, SourceCore};
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Default high-water mark for queued payload bytes (8 MiB).
pub const DEFAULT_MAX_QUEUED_BYTES: usize = 8 * 1024 * 1024;

struct QueueState {
    queue: VecDeque<Buffer>,
    queued_bytes: usize,
    max_queued_bytes: usize,
    block_enabled: bool,
    eos: bool,
    total_pushed: u64,
    total_popped: u64,
}

struct AppSourceInner {
    state: Mutex<QueueState>,
    space_available: Condvar,
}

/// Queue statistics snapshot.
#[derive(Debug, Clone, Copy)]
pub struct AppSourceStats {
    /// Buffers currently queued.
    pub queued_buffers: usize,
    /// Payload bytes currently queued.
    pub queued_bytes: usize,
    /// Buffers accepted since creation.
    pub total_pushed: u64,
    /// Buffers drained since creation.
    pub total_popped: u64,
    /// Whether end-of-stream has been signalled.
    pub eos: bool,
}

/// A source fed by application code pushing buffers.
///
/// The internal queue is bounded by payload bytes. A push over the
/// high-water mark either blocks until the consumer drains (block
/// enabled) or is refused (block disabled), giving the producer an
/// explicit back-pressure signal either way.
pub struct AppSource {
    core: SourceCore,
    chain: Chain,
    inner: Arc<AppSourceInner>,
}

/// Cloneable producer handle for pushing buffers into an [`AppSource`].
#[derive(Clone)]
pub struct AppSourceHandle {
    inner: Arc<AppSourceInner>,
}

impl AppSource {
    /// Create an app source with the default high-water mark.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_max_queued_bytes(name, DEFAULT_MAX_QUEUED_BYTES)
    }

    /// Create an app source with a specific byte high-water mark.
    pub fn with_max_queued_bytes(name: impl Into<String>, max_queued_bytes: usize) -> Self {
        Self {
            core: SourceCore::new(name, true),
            chain: Chain::from_names(["appfeed", "caps", "convert"]),
            inner: Arc::new(AppSourceInner {
                state: Mutex::new(QueueState {
                    queue: VecDeque::new(),
                    queued_bytes: 0,
                    max_queued_bytes,
                    block_enabled: false,
                    eos: false,
                    total_pushed: 0,
                    total_popped: 0,
                }),
                space_available: Condvar::new(),
            }),
        }
    }

    /// Whether a full queue blocks the producer instead of refusing.
    pub fn block_enabled(&self) -> bool {
        self.inner.state.lock().unwrap().block_enabled
    }

    /// Enable or disable producer blocking.
    pub fn set_block_enabled(&self, enabled: bool) {
        self.inner.state.lock().unwrap().block_enabled = enabled;
    }

    /// The byte high-water mark.
    pub fn max_queued_bytes(&self) -> usize {
        self.inner.state.lock().unwrap().max_queued_bytes
    }

    /// Set the byte high-water mark. Takes effect on the next push.
    pub fn set_max_queued_bytes(&self, max: usize) {
        let mut state = self.inner.state.lock().unwrap();
        state.max_queued_bytes = max;
        // A raised mark may unblock waiting producers.
        self.inner.space_available.notify_all();
    }

    /// Get a producer handle. Handles stay valid for the source's life.
    pub fn handle(&self) -> AppSourceHandle {
        AppSourceHandle {
            inner: self.inner.clone(),
        }
    }

    /// Drain the next buffer, if one is queued.
    pub fn pop(&self) -> Option<Buffer> {
        let mut state = self.inner.state.lock().unwrap();
        let buffer = state.queue.pop_front()?;
        state.queued_bytes -= buffer.len();
        state.total_popped += 1;
        self.inner.space_available.notify_all();
        Some(buffer)
    }

    /// Whether end-of-stream has been signalled and the queue drained.
    pub fn is_drained(&self) -> bool {
        let state = self.inner.state.lock().unwrap();
        state.eos && state.queue.is_empty()
    }

    /// Queue statistics.
    pub fn stats(&self) -> AppSourceStats {
        let state = self.inner.state.lock().unwrap();
        AppSourceStats {
            queued_buffers: state.queue.len(),
            queued_bytes: state.queued_bytes,
            total_pushed: state.total_pushed,
            total_popped: state.total_popped,
            eos: state.eos,
        }
    }
}

impl AppSourceHandle {
    /// Push a buffer.
    ///
    /// Over the high-water mark this blocks until space frees (block
    /// enabled) or returns `Ok(false)` (block disabled). Pushing after
    /// end-of-stream fails with `InvalidParameter`.
    pub fn push(&self, buffer: Buffer) -> Result<bool> {
        self.push_with_timeout(buffer, None)
    }

    /// Push with an optional bound on the blocking wait.
    ///
    /// Returns `Ok(false)` if the wait timed out or blocking is disabled
    /// and the queue is full.
    pub fn push_with_timeout(&self, buffer: Buffer, timeout: Option<Duration>) -> Result<bool> {
        let mut state = self.inner.state.lock().unwrap();

        if state.eos {
            return Err(Error::invalid("push after end-of-stream"));
        }

        while state.queued_bytes + buffer.len() > state.max_queued_bytes {
            if !state.block_enabled {
                return Ok(false);
            }
            state = match timeout {
                Some(t) => {
                    let (guard, result) = self
                        .inner
                        .space_available
                        .wait_timeout(state, t)
                        .unwrap();
                    if result.timed_out() {
                        return Ok(false);
                    }
                    guard
                }
                None => self.inner.space_available.wait(state).unwrap(),
            };
            if state.eos {
                return Err(Error::invalid("push after end-of-stream"));
            }
        }

        state.queued_bytes += buffer.len();
        state.queue.push_back(buffer);
        state.total_pushed += 1;
        Ok(true)
    }

    /// Signal end-of-stream. Queued buffers stay drainable; waiting
    /// producers are released.
    pub fn end_stream(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.eos = true;
        self.inner.space_available.notify_all();
    }
}

impl Linkable for AppSource {
    fn link(&mut self) -> Result<()> {
        self.core.link_with(&mut self.chain)
    }

    fn unlink(&mut self) {
        self.core.unlink_with(&mut self.chain);
    }

    fn is_linked(&self) -> bool {
        self.core.component().is_linked()
    }
}

impl FrameRateQueryable for AppSource {
    fn dimensions(&self) -> (u32, u32) {
        self.core.dimensions()
    }

    fn frame_rate(&self) -> (u32, u32) {
        self.core.frame_rate()
    }
}

impl SourceComponent for AppSource {
    fn source_core(&self) -> &SourceCore {
        &self.core
    }

    fn source_core_mut(&mut self) -> &mut SourceCore {
        &mut self.core
    }
}
