use bytes::Bytes;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::frame::Frame;

/// Single-slot holder of the most recent camera frame.
///
/// The one piece of state shared between the MQTT receive path (writer) and
/// the HTTP request path (readers). The slot holds a whole `Frame` or
/// nothing; `set` replaces it unconditionally and `latest` clones it out, so
/// every reader observes either the empty slot or some fully-formed,
/// previously-stored frame. The lock guards an `Option<Frame>` swap only —
/// the frame is stamped before the lock is taken and payload bytes are
/// refcounted, keeping the critical section O(1) regardless of frame size.
///
/// Cheap to clone; the composition root hands one handle to the subscriber
/// task and one to the HTTP state.
#[derive(Clone)]
pub struct FrameStore {
    inner: Arc<Inner>,
}

struct Inner {
    slot: RwLock<Option<Frame>>,
    seq: AtomicU64,
}

impl FrameStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                slot: RwLock::new(None),
                seq: AtomicU64::new(0),
            }),
        }
    }

    /// Replace the latest frame. Last completed call wins; there is no
    /// history and no notification of overwritten frames.
    pub fn set(&self, data: Bytes) {
        let seq = self.inner.seq.fetch_add(1, Ordering::Relaxed);
        let frame = Frame::new(data, Utc::now().timestamp_millis(), seq);
        let mut slot = self
            .inner
            .slot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(frame);
    }

    /// The current latest frame, or `None` before the first `set`.
    pub fn latest(&self) -> Option<Frame> {
        self.inner
            .slot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Default for FrameStore {
    fn default() -> Self {
        Self::new()
    }
}
