//! Receiving side: classify notifications and rebuild chunked samples.
//!
//! A central sees one of three frame shapes depending on the firmware
//! revision: a whole JSON object, an `id#fragment` chunk, or a CSV line.
//! Chunks are grouped by id and appended in arrival order; a message is
//! complete once its JSON braces balance and the text ends in `}`.
//! Nothing detects a lost or reordered chunk.

use core::fmt::Write;

use heapless::{FnvIndexMap, String};

use crate::chunk::{Chunk, ChunkId, CHUNK_ID_LEN, CHUNK_SEPARATOR};
use crate::config::CHUNK_HEADER_LEN;
use crate::encode::{decode_csv, decode_json};
use crate::error::Error;
use crate::sample::{Sample, Vector3};

/// A classified notification.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Frame<'a> {
    /// Whole JSON sample in one notification.
    Json(Sample),
    /// One piece of a chunked sample.
    Chunk(Chunk<'a>),
    /// CSV revision: acceleration and angular velocity, no timestamp.
    Csv(Vector3, Vector3),
}

/// Work out which wire format a notification uses.
///
/// Returns `None` for non-UTF-8 data and for text matching no format
/// (e.g. a JSON object truncated by the characteristic capacity).
pub fn classify_frame(data: &[u8]) -> Option<Frame<'_>> {
    let text = core::str::from_utf8(data).ok()?;

    if data.len() >= CHUNK_HEADER_LEN && data[CHUNK_ID_LEN] == CHUNK_SEPARATOR {
        if let Some(id) = ChunkId::parse(&data[..CHUNK_ID_LEN]) {
            return Some(Frame::Chunk(Chunk {
                id,
                fragment: &data[CHUNK_HEADER_LEN..],
            }));
        }
    }

    if text.starts_with('{') {
        return decode_json(text).map(Frame::Json);
    }

    decode_csv(text).map(|(a, g)| Frame::Csv(a, g))
}

/// One log line for a received sample: `timestamp,ax,ay,az,gx,gy,gz`.
///
/// CSV frames carry no timestamp; the first column is left empty.
pub fn csv_row<const N: usize>(
    timestamp_ms: Option<u64>,
    acceleration: &Vector3,
    angular_velocity: &Vector3,
) -> Result<String<N>, Error> {
    let mut row = String::new();
    if let Some(ts) = timestamp_ms {
        write!(row, "{}", ts)?;
    }
    for v in [acceleration, angular_velocity] {
        write!(row, ",{},{},{}", v.x, v.y, v.z)?;
    }
    Ok(row)
}

impl Frame<'_> {
    /// Log line for frames that carry a full sample; `None` for chunks.
    pub fn csv_row<const N: usize>(&self) -> Option<Result<String<N>, Error>> {
        match self {
            Frame::Json(s) => Some(csv_row(Some(s.timestamp_ms), &s.acceleration, &s.angular_velocity)),
            Frame::Csv(a, g) => Some(csv_row(None, a, g)),
            Frame::Chunk(_) => None,
        }
    }
}

/// True once `text` looks like a whole JSON object.
fn is_complete(text: &str) -> bool {
    if !text.ends_with('}') {
        return false;
    }
    let mut depth = 0i32;
    for b in text.bytes() {
        match b {
            b'{' => depth += 1,
            b'}' => depth -= 1,
            _ => {}
        }
    }
    depth == 0
}

/// Rebuilds chunked messages of up to `N` bytes, `M` in flight at once.
///
/// `M` must be a power of two (`FnvIndexMap` requirement).
pub struct Reassembler<const N: usize, const M: usize> {
    pending: FnvIndexMap<ChunkId, String<N>, M>,
    dropped: u32,
}

impl<const N: usize, const M: usize> Default for Reassembler<N, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize, const M: usize> Reassembler<N, M> {
    pub fn new() -> Self {
        Self {
            pending: FnvIndexMap::new(),
            dropped: 0,
        }
    }

    /// Append a chunk. Returns the complete message once it closes.
    ///
    /// A new id arriving with every slot busy drops one pending message.
    /// A message that outgrows `N` is discarded and reported as
    /// [`Error::BufferOverflow`].
    pub fn push(&mut self, chunk: Chunk<'_>) -> Result<Option<String<N>>, Error> {
        let fragment = core::str::from_utf8(chunk.fragment).map_err(|_| Error::InvalidFrame)?;

        if !self.pending.contains_key(&chunk.id) {
            if self.pending.len() == M {
                if let Some(stale) = self.pending.keys().next().copied() {
                    self.pending.remove(&stale);
                    self.dropped = self.dropped.saturating_add(1);
                }
            }
            self.pending
                .insert(chunk.id, String::new())
                .map_err(|_| Error::BufferOverflow)?;
        }

        let buffer = self
            .pending
            .get_mut(&chunk.id)
            .ok_or(Error::BufferOverflow)?;

        if buffer.push_str(fragment).is_err() {
            self.pending.remove(&chunk.id);
            self.dropped = self.dropped.saturating_add(1);
            return Err(Error::BufferOverflow);
        }

        if is_complete(buffer) {
            return Ok(self.pending.remove(&chunk.id));
        }
        Ok(None)
    }

    /// Messages currently waiting for more chunks.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Messages discarded so far (evicted or overflowed).
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}
