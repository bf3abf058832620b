//! FIFO (First-In-First-Out) replacement policy.

use std::collections::{HashSet, VecDeque};

use parking_lot::Mutex;

use crate::common::FrameId;

use super::Replacer;

/// Evicts candidates in the order they first became candidates.
///
/// Unlike [`LruReplacer`](super::LruReplacer), a frame keeps its queue
/// position across re-pins: frequently re-read frames gain no protection.
/// Mostly useful as a baseline and to exercise the policy seam.
pub struct FifoReplacer {
    inner: Mutex<FifoInner>,
    capacity: usize,
}

struct FifoInner {
    /// Frame ids in arrival order. Always holds exactly the `queued` set;
    /// entries leave only through `victim`.
    queue: VecDeque<FrameId>,

    /// Frames present in `queue`.
    queued: HashSet<FrameId>,

    /// Current candidate set (queued frames that are unpinned right now).
    candidates: HashSet<FrameId>,
}

impl FifoReplacer {
    /// Create a FIFO replacer for a pool of `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(FifoInner {
                queue: VecDeque::with_capacity(capacity),
                queued: HashSet::with_capacity(capacity),
                candidates: HashSet::with_capacity(capacity),
            }),
            capacity,
        }
    }
}

impl Replacer for FifoReplacer {
    fn victim(&self) -> Option<FrameId> {
        let mut inner = self.inner.lock();
        // Pinned frames encountered here lose their slot; their next unpin
        // re-enqueues them at the back.
        while let Some(frame_id) = inner.queue.pop_front() {
            inner.queued.remove(&frame_id);
            if inner.candidates.remove(&frame_id) {
                return Some(frame_id);
            }
        }
        None
    }

    fn pin(&self, frame_id: FrameId) {
        // The queue slot survives; only candidacy is revoked.
        self.inner.lock().candidates.remove(&frame_id);
    }

    fn unpin(&self, frame_id: FrameId) {
        if frame_id.index() >= self.capacity {
            return;
        }

        let mut inner = self.inner.lock();
        inner.candidates.insert(frame_id);
        if inner.queued.insert(frame_id) {
            inner.queue.push_back(frame_id);
        }
    }

    fn size(&self) -> usize {
        self.inner.lock().candidates.len()
    }
}
