//! Chunked datagram reassembly
//!
//! A message too large for one datagram is split by the sender into up to
//! [`MAX_CHUNKS`] chunks, each prefixed with a 12 byte header:
//!
//! | bytes  | field          |
//! |--------|----------------|
//! | 0..2   | magic `1e 0f`  |
//! | 2..10  | message id     |
//! | 10     | sequence index |
//! | 11     | sequence count |
//!
//! Datagrams without the magic prefix are complete messages.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::{BufMut, Bytes, BytesMut};
use contracts::Record;
use thiserror::Error;

/// Chunked datagram prefix
pub const CHUNK_MAGIC: [u8; 2] = [0x1e, 0x0f];

/// Maximum chunks per message
pub const MAX_CHUNKS: u8 = 128;

/// Incomplete messages older than this are discarded
pub const CHUNK_EXPIRY: Duration = Duration::from_secs(5);

const HEADER_LEN: usize = 12;

type MessageId = [u8; 8];

/// Malformed chunk
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk of {len} bytes is shorter than its header")]
    Truncated { len: usize },

    #[error("chunk count {count} outside 1..={max}", max = MAX_CHUNKS)]
    InvalidCount { count: u8 },

    #[error("chunk index {seq} out of range for {count} chunks")]
    SeqOutOfRange { seq: u8, count: u8 },

    #[error("chunk count changed from {expected} to {got} within one message")]
    CountMismatch { expected: u8, got: u8 },
}

struct Chunk<'a> {
    id: MessageId,
    seq: u8,
    count: u8,
    payload: &'a [u8],
}

impl<'a> Chunk<'a> {
    fn parse(datagram: &'a [u8]) -> Result<Self, ChunkError> {
        if datagram.len() < HEADER_LEN {
            return Err(ChunkError::Truncated {
                len: datagram.len(),
            });
        }
        let mut id = [0u8; 8];
        id.copy_from_slice(&datagram[2..10]);
        let seq = datagram[10];
        let count = datagram[11];

        if count == 0 || count > MAX_CHUNKS {
            return Err(ChunkError::InvalidCount { count });
        }
        if seq >= count {
            return Err(ChunkError::SeqOutOfRange { seq, count });
        }

        Ok(Self {
            id,
            seq,
            count,
            payload: &datagram[HEADER_LEN..],
        })
    }
}

struct Partial {
    parts: Vec<Option<Bytes>>,
    received: usize,
    first_seen: Instant,
}

impl Partial {
    fn new(count: u8, now: Instant) -> Self {
        Self {
            parts: vec![None; count as usize],
            received: 0,
            first_seen: now,
        }
    }

    fn is_complete(&self) -> bool {
        self.received == self.parts.len()
    }

    fn assemble(self) -> Record {
        let total = self.parts.iter().flatten().map(Bytes::len).sum();
        let mut buf = BytesMut::with_capacity(total);
        for part in self.parts.into_iter().flatten() {
            buf.put(part);
        }
        Record::from(buf.freeze())
    }
}

/// Reassembles chunked datagrams into records
///
/// Owned by a single UDP listener; not shared.
pub struct ChunkAssembler {
    pending: HashMap<MessageId, Partial>,
    expiry: Duration,
}

impl Default for ChunkAssembler {
    fn default() -> Self {
        Self::new(CHUNK_EXPIRY)
    }
}

impl ChunkAssembler {
    /// Create an assembler discarding partial messages after `expiry`
    pub fn new(expiry: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            expiry,
        }
    }

    /// Feed one datagram
    ///
    /// Returns the record once a message is complete, `None` while chunks are
    /// still missing. Payload bytes are forwarded untouched.
    pub fn accept(&mut self, datagram: &[u8], now: Instant) -> Result<Option<Record>, ChunkError> {
        if !datagram.starts_with(&CHUNK_MAGIC) {
            return Ok(Some(Record::copy_from_slice(datagram)));
        }

        let chunk = Chunk::parse(datagram)?;
        if chunk.count == 1 {
            return Ok(Some(Record::copy_from_slice(chunk.payload)));
        }

        self.evict_expired(now);

        let partial = self
            .pending
            .entry(chunk.id)
            .or_insert_with(|| Partial::new(chunk.count, now));

        if partial.parts.len() != chunk.count as usize {
            let expected = partial.parts.len() as u8;
            self.pending.remove(&chunk.id);
            return Err(ChunkError::CountMismatch {
                expected,
                got: chunk.count,
            });
        }

        let slot = &mut partial.parts[chunk.seq as usize];
        if slot.is_none() {
            *slot = Some(Bytes::copy_from_slice(chunk.payload));
            partial.received += 1;
        }

        if !partial.is_complete() {
            return Ok(None);
        }
        Ok(self.pending.remove(&chunk.id).map(Partial::assemble))
    }

    /// Drop partial messages older than the expiry, returning how many
    pub fn evict_expired(&mut self, now: Instant) -> usize {
        let before = self.pending.len();
        let expiry = self.expiry;
        self.pending
            .retain(|_, partial| now.saturating_duration_since(partial.first_seen) < expiry);
        before - self.pending.len()
    }

    /// Messages waiting for more chunks
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
