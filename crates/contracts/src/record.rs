//! Record - one opaque log message moving through the relay

use std::borrow::Cow;

use bytes::Bytes;

/// One decoded log message.
///
/// The payload is never interpreted by the relay; it is carried verbatim
/// from the listener that produced it to every destination.
/// Cloning is cheap (reference counted).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record(Bytes);

impl Record {
    /// Create a record from any byte buffer
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self(payload.into())
    }

    /// Create a record by copying a byte slice
    pub fn copy_from_slice(payload: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(payload))
    }

    /// Raw payload bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Payload as text, replacing invalid UTF-8 sequences (diagnostics only)
    pub fn to_lossy_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    /// Consume the record, returning the underlying buffer
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<Bytes> for Record {
    fn from(payload: Bytes) -> Self {
        Self(payload)
    }
}

impl From<Vec<u8>> for Record {
    fn from(payload: Vec<u8>) -> Self {
        Self(Bytes::from(payload))
    }
}

impl From<&'static str> for Record {
    fn from(payload: &'static str) -> Self {
        Self(Bytes::from_static(payload.as_bytes()))
    }
}

impl AsRef<[u8]> for Record {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
