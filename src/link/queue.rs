// Outbound Queue
// Bounded FIFO of frames waiting for a peer to be flushed to

use crate::link::{FRAME_QUEUE_SIZE, MAX_FRAME_SIZE};
use std::collections::VecDeque;

/// Why a frame was not queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueReject {
    Full,
    TooLarge,
    Empty,
}

/// Bounded FIFO owned by an adapter that cannot write synchronously.
///
/// Enqueue on a full queue is rejected without touching existing entries.
#[derive(Debug, Clone)]
pub struct OutboundQueue {
    entries: VecDeque<Vec<u8>>,
    capacity: usize,
}

impl Default for OutboundQueue {
    fn default() -> Self {
        Self::new(FRAME_QUEUE_SIZE)
    }
}

impl OutboundQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Append a copy of `frame` at the tail
    pub fn enqueue(&mut self, frame: &[u8]) -> Result<usize, QueueReject> {
        if frame.is_empty() {
            return Err(QueueReject::Empty);
        }
        if frame.len() > MAX_FRAME_SIZE {
            return Err(QueueReject::TooLarge);
        }
        if self.is_full() {
            return Err(QueueReject::Full);
        }
        self.entries.push_back(frame.to_vec());
        Ok(frame.len())
    }

    /// Oldest entry, without removing it
    pub fn front(&self) -> Option<&[u8]> {
        self.entries.front().map(Vec::as_slice)
    }

    /// Remove and return the oldest entry
    pub fn dequeue(&mut self) -> Option<Vec<u8>> {
        self.entries.pop_front()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.entries.iter().map(Vec::as_slice)
    }
}
