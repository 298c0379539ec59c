//! Fragmentation for the Bluetooth LE transport.
//!
//! ```text
//! ┌───────────────┬──────────────────────────────┐
//! │ Remaining (1B)│  Payload (≤ 508 bytes)       │
//! └───────────────┴──────────────────────────────┘
//! ```
//!
//! The prefix is the number of fragments still to follow, saturating at 255;
//! only `0` reliably marks the last fragment. This is a counter, not a length
//! prefix: the receiver simply concatenates until it sees `0`.

use gw_domain::{ProtocolError, Result};

/// Payload bytes per fragment (512-byte MTU minus ATT header and prefix byte).
pub const FRAGMENT_PAYLOAD_SIZE: usize = 508;

/// Split an encoded frame into prefixed fragments of [`FRAGMENT_PAYLOAD_SIZE`].
pub fn fragment(payload: &[u8]) -> Vec<Vec<u8>> {
    fragment_with_size(payload, FRAGMENT_PAYLOAD_SIZE)
}

/// Split with an explicit chunk size. An empty payload still yields one
/// (terminal) fragment.
pub fn fragment_with_size(payload: &[u8], chunk_size: usize) -> Vec<Vec<u8>> {
    let chunk_size = chunk_size.max(1);
    if payload.is_empty() {
        return vec![vec![0]];
    }

    let count = payload.len().div_ceil(chunk_size);
    payload
        .chunks(chunk_size)
        .enumerate()
        .map(|(i, chunk)| {
            let remaining = (count - 1 - i).min(u8::MAX as usize) as u8;
            let mut fragment = Vec::with_capacity(chunk.len() + 1);
            fragment.push(remaining);
            fragment.extend_from_slice(chunk);
            fragment
        })
        .collect()
}

/// Accumulates fragments until the terminal one arrives.
///
/// Fragments of one frame must arrive in order and must not interleave with
/// another frame's fragments.
#[derive(Debug, Default)]
pub struct Reassembler {
    buffer: Vec<u8>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one notification. Returns the complete frame once the fragment
    /// with remaining-count `0` has been appended, and resets.
    pub fn push(&mut self, fragment: &[u8]) -> Result<Option<Vec<u8>>> {
        let (&remaining, payload) = fragment
            .split_first()
            .ok_or_else(|| ProtocolError::new("empty fragment"))?;

        self.buffer.extend_from_slice(payload);
        if remaining != 0 {
            return Ok(None);
        }
        Ok(Some(std::mem::take(&mut self.buffer)))
    }

    /// Drop any partially received frame.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Bytes buffered for the frame in progress.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}
