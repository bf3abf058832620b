//! LRU (Least Recently Used) replacement policy.

use hashlink::LinkedHashMap;
use log::warn;
use parking_lot::Mutex;

use crate::common::FrameId;

use super::Replacer;

/// Evicts the frame that has gone longest without being unpinned.
///
/// Candidates live in a [`LinkedHashMap`] keyed by frame id: the map is the
/// membership index and its internal list is the recency order, front =
/// least recently unpinned, back = most recent. `victim`, `pin` and `unpin`
/// are all O(1).
///
/// A frame that is re-pinned and later unpinned again re-enters at the back,
/// so temporal locality is rewarded; unpinning an existing candidate leaves
/// its position untouched.
pub struct LruReplacer {
    /// Candidate frames in unpin order.
    candidates: Mutex<LinkedHashMap<FrameId, ()>>,

    /// Upper bound on valid frame ids, fixed at construction.
    capacity: usize,
}

impl LruReplacer {
    /// Create an LRU replacer for a pool of `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            candidates: Mutex::new(LinkedHashMap::with_capacity(capacity)),
            capacity,
        }
    }

    /// The frame id bound this replacer accepts.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Replacer for LruReplacer {
    fn victim(&self) -> Option<FrameId> {
        self.candidates
            .lock()
            .pop_front()
            .map(|(frame_id, ())| frame_id)
    }

    fn pin(&self, frame_id: FrameId) {
        self.candidates.lock().remove(&frame_id);
    }

    fn unpin(&self, frame_id: FrameId) {
        if frame_id.index() >= self.capacity {
            warn!("ignoring unpin of out-of-range {}", frame_id);
            return;
        }

        let mut candidates = self.candidates.lock();
        if !candidates.contains_key(&frame_id) {
            candidates.insert(frame_id, ());
        }
    }

    fn size(&self) -> usize {
        self.candidates.lock().len()
    }
}
