use bytes::Bytes;

/// One complete JPEG image as received from the camera topic.
///
/// The payload is opaque: nothing in this crate decodes, validates, or
/// re-encodes it. Each MQTT message carries exactly one whole image, so a
/// `Frame` is born fully formed and is never mutated afterwards. Cloning is
/// a refcount bump on the underlying `Bytes`.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw JPEG bytes, served verbatim on the HTTP surface.
    pub data: Bytes,
    /// Unix millis at receipt.
    pub received_at_ms: i64,
    /// Monotonic receipt counter, assigned by the store.
    pub seq: u64,
}

impl Frame {
    pub fn new(data: Bytes, received_at_ms: i64, seq: u64) -> Self {
        Self {
            data,
            received_at_ms,
            seq,
        }
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
