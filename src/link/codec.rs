// Frame Codec
// 3-byte header framing for links that carry a raw byte stream
//
//   +--------+---------+---------+-----------------+
//   | marker | len LSB | len MSB | payload (len B) |
//   +--------+---------+---------+-----------------+

use crate::link::MAX_FRAME_SIZE;
use thiserror::Error;

/// Marker on frames leaving this node
pub const OUTBOUND_MARKER: u8 = b'>';

/// Marker a serial host puts in front of frames it sends to us
pub const INBOUND_MARKER: u8 = b'<';

pub const FRAME_HEADER_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Frame is empty")]
    Empty,

    #[error("Frame of {0} bytes exceeds the maximum frame size")]
    TooLarge(usize),
}

/// Build the header for a payload of `len` bytes
pub fn encode_header(marker: u8, len: u16) -> [u8; FRAME_HEADER_LEN] {
    let [lo, hi] = len.to_le_bytes();
    [marker, lo, hi]
}

/// Append one outbound frame (header + payload) to `out`
pub fn encode_frame(payload: &[u8], out: &mut Vec<u8>) -> Result<usize, CodecError> {
    if payload.is_empty() {
        return Err(CodecError::Empty);
    }
    if payload.len() > MAX_FRAME_SIZE {
        return Err(CodecError::TooLarge(payload.len()));
    }
    out.extend_from_slice(&encode_header(OUTBOUND_MARKER, payload.len() as u16));
    out.extend_from_slice(payload);
    Ok(FRAME_HEADER_LEN + payload.len())
}

/// How the decoder finds the start of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// The stream is trusted to start on a header boundary; the marker byte is not checked
    Trusted,
    /// Bytes before the given marker are discarded
    Marker(u8),
}

/// Accumulates stream bytes and hands out whole frame payloads.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    mode: SyncMode,
    discarded: u64,
}

impl FrameDecoder {
    pub fn new(mode: SyncMode) -> Self {
        Self {
            buf: Vec::with_capacity(FRAME_HEADER_LEN + MAX_FRAME_SIZE),
            mode,
            discarded: 0,
        }
    }

    /// Decoder for socket links
    pub fn trusted() -> Self {
        Self::new(SyncMode::Trusted)
    }

    /// Decoder for serial links, resynchronising on the inbound marker
    pub fn resync() -> Self {
        Self::new(SyncMode::Marker(INBOUND_MARKER))
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Bytes currently held for an incomplete frame
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Bytes thrown away while looking for a frame boundary
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Room left before the decoder holds one maximal frame
    pub fn spare(&self) -> usize {
        (FRAME_HEADER_LEN + MAX_FRAME_SIZE).saturating_sub(self.buf.len())
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Take the next complete payload, if one has fully arrived
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            if let SyncMode::Marker(marker) = self.mode {
                match self.buf.iter().position(|&b| b == marker) {
                    Some(0) => {}
                    Some(skip) => self.discard(skip),
                    None => {
                        let all = self.buf.len();
                        self.discard(all);
                        return None;
                    }
                }
            }

            if self.buf.len() < FRAME_HEADER_LEN {
                return None;
            }

            let len = u16::from_le_bytes([self.buf[1], self.buf[2]]) as usize;
            if len > MAX_FRAME_SIZE {
                tracing::warn!(len, mode = ?self.mode, "frame header announces oversize payload");
                match self.mode {
                    // Nothing to resync on; drop what we have.
                    SyncMode::Trusted => {
                        let all = self.buf.len();
                        self.discard(all);
                        return None;
                    }
                    SyncMode::Marker(_) => {
                        self.discard(1);
                        continue;
                    }
                }
            }

            if self.buf.len() < FRAME_HEADER_LEN + len {
                return None;
            }

            let payload = self.buf[FRAME_HEADER_LEN..FRAME_HEADER_LEN + len].to_vec();
            self.buf.drain(..FRAME_HEADER_LEN + len);
            return Some(payload);
        }
    }

    fn discard(&mut self, count: usize) {
        self.buf.drain(..count);
        self.discarded += count as u64;
    }
}
