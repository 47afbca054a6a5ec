//! Splitting an encoded sample into characteristic-sized chunks.
//!
//! Frame layout (at most `capacity` bytes):
//! ```text
//! Byte 0-4: chunk id, 5 lowercase hex digits (low 20 bits of the timestamp)
//! Byte 5:   '#'
//! Byte 6-:  fragment of the encoded sample, up to `capacity - 6` bytes
//! ```
//!
//! There is no fragment index and no total count. A receiver can only
//! group frames by id and append them in arrival order; lost or reordered
//! frames go undetected.

use core::fmt;

use crate::config::CHUNK_HEADER_LEN;
use crate::error::Error;

/// Hex digits in a chunk id.
pub const CHUNK_ID_LEN: usize = 5;

/// Byte between the id and the fragment.
pub const CHUNK_SEPARATOR: u8 = b'#';

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Identifier shared by every chunk of one sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChunkId(u32);

impl ChunkId {
    const MASK: u64 = 0xF_FFFF;

    /// Keep the low 20 bits of the timestamp (5 hex digits).
    pub const fn from_timestamp(timestamp_ms: u64) -> Self {
        Self((timestamp_ms & Self::MASK) as u32)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    /// Zero-padded lowercase hex, as sent on the wire.
    pub fn to_ascii(self) -> [u8; CHUNK_ID_LEN] {
        let mut out = [b'0'; CHUNK_ID_LEN];
        for (i, digit) in out.iter_mut().rev().enumerate() {
            *digit = HEX_DIGITS[((self.0 >> (4 * i)) & 0xF) as usize];
        }
        out
    }

    /// Parse exactly five hex digits (either case).
    pub fn parse(text: &[u8]) -> Option<Self> {
        if text.len() != CHUNK_ID_LEN {
            return None;
        }
        let mut value = 0u32;
        for &b in text {
            let nibble = (b as char).to_digit(16)?;
            value = (value << 4) | nibble;
        }
        Some(Self(value))
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:05x}", self.0)
    }
}

/// One `id#fragment` frame borrowed from the encoded payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub id: ChunkId,
    pub fragment: &'a [u8],
}

impl Chunk<'_> {
    /// Size of the frame on the wire.
    pub fn encoded_len(&self) -> usize {
        CHUNK_HEADER_LEN + self.fragment.len()
    }

    /// Write the frame into `buf`.
    /// Returns the number of bytes written, or 0 if `buf` is too small.
    pub fn encode(&self, buf: &mut [u8]) -> usize {
        let total = self.encoded_len();
        if buf.len() < total {
            return 0;
        }
        buf[..CHUNK_ID_LEN].copy_from_slice(&self.id.to_ascii());
        buf[CHUNK_ID_LEN] = CHUNK_SEPARATOR;
        buf[CHUNK_HEADER_LEN..total].copy_from_slice(self.fragment);
        total
    }
}

/// Splits payloads for a characteristic of fixed capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Chunker {
    capacity: usize,
}

impl Chunker {
    /// The capacity must leave room for the header and at least one byte.
    pub fn new(capacity: usize) -> Result<Self, Error> {
        if capacity <= CHUNK_HEADER_LEN {
            return Err(Error::CapacityTooSmall);
        }
        Ok(Self { capacity })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Payload bytes carried by each chunk.
    pub fn fragment_len(&self) -> usize {
        self.capacity - CHUNK_HEADER_LEN
    }

    /// Number of chunks a payload of `payload_len` bytes needs.
    pub fn chunk_count(&self, payload_len: usize) -> usize {
        payload_len.div_ceil(self.fragment_len())
    }

    /// Chunks of `payload` in emission order, all tagged with `id`.
    pub fn chunks<'a>(&self, id: ChunkId, payload: &'a [u8]) -> Chunks<'a> {
        Chunks {
            id,
            inner: payload.chunks(self.fragment_len()),
        }
    }
}

/// Iterator returned by [`Chunker::chunks`].
pub struct Chunks<'a> {
    id: ChunkId,
    inner: core::slice::Chunks<'a, u8>,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|fragment| Chunk {
            id: self.id,
            fragment,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Chunks<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::Vec;

    const PAYLOAD: &[u8] = b"{\"id\":1,\"accelerometer\":{\"x\":0.1,\"y\":0.2}}";

    #[test]
    fn id_keeps_low_20_bits_as_five_hex_digits() {
        let id = ChunkId::from_timestamp(0x0123_4567);
        assert_eq!(id.value(), 0x34567);
        assert_eq!(&id.to_ascii(), b"34567");
    }

    #[test]
    fn id_is_zero_padded() {
        assert_eq!(&ChunkId::from_timestamp(0xAB).to_ascii(), b"000ab");
        assert_eq!(&ChunkId::from_timestamp(0).to_ascii(), b"00000");
    }

    #[test]
    fn id_display_matches_ascii() {
        let id = ChunkId::from_timestamp(0xFACE5);
        let mut s: heapless::String<8> = heapless::String::new();
        core::fmt::write(&mut s, format_args!("{}", id)).unwrap();
        assert_eq!(s.as_bytes(), &id.to_ascii());
    }

    #[test]
    fn id_parse_accepts_both_cases() {
        assert_eq!(ChunkId::parse(b"00fAc"), Some(ChunkId::from_timestamp(0xFAC)));
        assert_eq!(ChunkId::parse(b"fffff"), Some(ChunkId::from_timestamp(0xFFFFF)));
    }

    #[test]
    fn id_parse_rejects_bad_input() {
        assert_eq!(ChunkId::parse(b"1234"), None);
        assert_eq!(ChunkId::parse(b"123456"), None);
        assert_eq!(ChunkId::parse(b"12g45"), None);
        assert_eq!(ChunkId::parse(b""), None);
    }

    #[test]
    fn chunker_rejects_capacity_without_room_for_data() {
        assert_eq!(Chunker::new(0), Err(Error::CapacityTooSmall));
        assert_eq!(Chunker::new(6), Err(Error::CapacityTooSmall));
        assert_eq!(Chunker::new(7).unwrap().fragment_len(), 1);
    }

    #[test]
    fn fragment_len_reserves_six_bytes() {
        assert_eq!(Chunker::new(20).unwrap().fragment_len(), 14);
        assert_eq!(Chunker::new(24).unwrap().fragment_len(), 18);
    }

    #[test]
    fn forty_two_bytes_in_fourteen_byte_fragments() {
        let chunker = Chunker::new(20).unwrap();
        let payload = [b'a'; 42];
        let lens: Vec<usize, 8> = chunker
            .chunks(ChunkId::from_timestamp(1), &payload)
            .map(|c| c.fragment.len())
            .collect();
        assert_eq!(chunker.chunk_count(42), 3);
        assert_eq!(lens.as_slice(), &[14, 14, 14]);
    }

    #[test]
    fn chunk_count_is_ceiling_division() {
        let chunker = Chunker::new(20).unwrap();
        assert_eq!(chunker.chunk_count(0), 0);
        assert_eq!(chunker.chunk_count(1), 1);
        assert_eq!(chunker.chunk_count(14), 1);
        assert_eq!(chunker.chunk_count(15), 2);
        assert_eq!(chunker.chunk_count(43), 4);
    }

    #[test]
    fn iterator_length_matches_chunk_count() {
        for capacity in 7..=24 {
            let chunker = Chunker::new(capacity).unwrap();
            for len in 0..=PAYLOAD.len() {
                let chunks = chunker.chunks(ChunkId::from_timestamp(9), &PAYLOAD[..len]);
                assert_eq!(chunks.len(), chunker.chunk_count(len));
            }
        }
    }

    #[test]
    fn fragments_concatenate_to_original() {
        for capacity in 7..=24 {
            let chunker = Chunker::new(capacity).unwrap();
            let mut rebuilt: Vec<u8, 64> = Vec::new();
            for chunk in chunker.chunks(ChunkId::from_timestamp(77), PAYLOAD) {
                rebuilt.extend_from_slice(chunk.fragment).unwrap();
            }
            assert_eq!(rebuilt.as_slice(), PAYLOAD);
        }
    }

    #[test]
    fn every_chunk_carries_the_same_id() {
        let chunker = Chunker::new(20).unwrap();
        let id = ChunkId::from_timestamp(123_456);
        assert!(chunker.chunks(id, PAYLOAD).all(|c| c.id == id));
    }

    #[test]
    fn empty_payload_yields_no_chunks() {
        let chunker = Chunker::new(20).unwrap();
        assert_eq!(chunker.chunks(ChunkId::from_timestamp(5), b"").count(), 0);
    }

    #[test]
    fn encoded_frame_is_id_separator_fragment() {
        let chunk = Chunk {
            id: ChunkId::from_timestamp(0x1F),
            fragment: b"{\"id\"",
        };
        let mut buf = [0u8; 20];
        let written = chunk.encode(&mut buf);
        assert_eq!(written, 11);
        assert_eq!(&buf[..written], b"0001f#{\"id\"");
    }

    #[test]
    fn encoded_frames_never_exceed_capacity() {
        let chunker = Chunker::new(20).unwrap();
        let mut buf = [0u8; 20];
        for chunk in chunker.chunks(ChunkId::from_timestamp(3), PAYLOAD) {
            let written = chunk.encode(&mut buf);
            assert!(written > CHUNK_HEADER_LEN);
            assert!(written <= chunker.capacity());
        }
    }

    #[test]
    fn encode_buffer_too_small() {
        let chunk = Chunk {
            id: ChunkId::from_timestamp(1),
            fragment: b"abc",
        };
        let mut buf = [0u8; 8];
        assert_eq!(chunk.encode(&mut buf), 0);
    }
}
