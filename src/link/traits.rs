// Link Traits and Core Types
// Defines the Link capability contract shared by every physical adapter and arbiter

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// LIMITS
// ============================================================================

/// Largest payload a single frame may carry (header excluded)
pub const MAX_FRAME_SIZE: usize = 172;

/// Default capacity of an adapter's outbound queue
pub const FRAME_QUEUE_SIZE: usize = 4;

// ============================================================================
// LINK KIND
// ============================================================================

/// Which physical technology (or composition) sits behind a `Link`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// Always-open point-to-point byte channel
    Serial,
    /// Single-peer GATT-style pairing
    Wireless,
    /// TCP listener holding at most one client
    Socket,
    /// An arbiter composing other links
    Composite,
}

impl LinkKind {
    /// Whether the link has to accept peers on its own (needs polling even when idle)
    pub fn is_listening(&self) -> bool {
        matches!(self, Self::Wireless | Self::Socket)
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Serial => "serial",
            Self::Wireless => "wireless",
            Self::Socket => "socket",
            Self::Composite => "composite",
        };
        f.write_str(name)
    }
}

// ============================================================================
// LINK ERRORS
// ============================================================================

/// Errors raised while bringing a link into service.
///
/// Steady-state operations never return these: a failed write is a zero
/// return and a lost peer shows up through `is_connected()`.
#[derive(Debug, Clone, Error)]
pub enum LinkError {
    #[error("Failed to start {kind} link: {reason}")]
    Begin { kind: LinkKind, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl LinkError {
    pub fn begin(kind: LinkKind, reason: impl Into<String>) -> Self {
        Self::Begin {
            kind,
            reason: reason.into(),
        }
    }

    /// Check if a later `begin` may succeed without changing configuration
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Begin { .. })
    }
}

impl From<std::io::Error> for LinkError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

// ============================================================================
// LINK STATISTICS
// ============================================================================

/// Counters kept by every adapter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStats {
    /// Frames handed to the transport
    pub frames_sent: u64,
    /// Frames returned to the caller
    pub frames_received: u64,
    /// Payload bytes handed to the transport
    pub bytes_sent: u64,
    /// Payload bytes returned to the caller
    pub bytes_received: u64,
    /// Frames rejected or discarded (oversize, no peer, queue full)
    pub frames_dropped: u64,
    /// Peers that attached over the link's lifetime
    pub peers_accepted: u64,
}

impl LinkStats {
    pub(crate) fn record_sent(&mut self, len: usize) {
        self.frames_sent += 1;
        self.bytes_sent += len as u64;
    }

    pub(crate) fn record_received(&mut self, len: usize) {
        self.frames_received += 1;
        self.bytes_received += len as u64;
    }

    pub(crate) fn record_dropped(&mut self) {
        self.frames_dropped += 1;
    }

    /// Sum two sets of counters
    pub fn merged(&self, other: &LinkStats) -> LinkStats {
        LinkStats {
            frames_sent: self.frames_sent + other.frames_sent,
            frames_received: self.frames_received + other.frames_received,
            bytes_sent: self.bytes_sent + other.bytes_sent,
            bytes_received: self.bytes_received + other.bytes_received,
            frames_dropped: self.frames_dropped + other.frames_dropped,
            peers_accepted: self.peers_accepted + other.peers_accepted,
        }
    }
}

// ============================================================================
// LINK TRAIT
// ============================================================================

/// Capability contract every physical adapter (and every arbiter) offers upward.
///
/// All methods return promptly. `check_recv_frame` is a single cooperative
/// step: at most one frame is received or flushed per call.
pub trait Link {
    /// Technology behind this link
    fn kind(&self) -> LinkKind;

    /// Put the link into service. Idempotent; resets queues and partial reads.
    fn enable(&mut self);

    /// Suspend the link. Idempotent; never fails.
    fn disable(&mut self);

    fn is_enabled(&self) -> bool;

    /// True iff a peer is attached right now
    fn is_connected(&self) -> bool;

    /// True while a previously submitted frame is still being flushed
    fn is_write_busy(&self) -> bool;

    /// Submit one frame. Returns `frame.len()` on success, 0 if it was dropped.
    fn write_frame(&mut self, frame: &[u8]) -> usize;

    /// Poll once. Returns the length of a frame copied into `dest`, or 0.
    fn check_recv_frame(&mut self, dest: &mut [u8]) -> usize;

    /// Whether `service()` has bookkeeping or queued output to handle
    fn needs_service(&self) -> bool {
        false
    }

    /// Housekeeping-only poll: accept/lose peers and flush at most one queued
    /// frame, without consuming inbound data.
    fn service(&mut self) {}

    fn stats(&self) -> LinkStats;
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn kind(&self) -> LinkKind {
        (**self).kind()
    }

    fn enable(&mut self) {
        (**self).enable()
    }

    fn disable(&mut self) {
        (**self).disable()
    }

    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn is_write_busy(&self) -> bool {
        (**self).is_write_busy()
    }

    fn write_frame(&mut self, frame: &[u8]) -> usize {
        (**self).write_frame(frame)
    }

    fn check_recv_frame(&mut self, dest: &mut [u8]) -> usize {
        (**self).check_recv_frame(dest)
    }

    fn needs_service(&self) -> bool {
        (**self).needs_service()
    }

    fn service(&mut self) {
        (**self).service()
    }

    fn stats(&self) -> LinkStats {
        (**self).stats()
    }
}

impl<L: Link + ?Sized> Link for &mut L {
    fn kind(&self) -> LinkKind {
        (**self).kind()
    }

    fn enable(&mut self) {
        (**self).enable()
    }

    fn disable(&mut self) {
        (**self).disable()
    }

    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn is_write_busy(&self) -> bool {
        (**self).is_write_busy()
    }

    fn write_frame(&mut self, frame: &[u8]) -> usize {
        (**self).write_frame(frame)
    }

    fn check_recv_frame(&mut self, dest: &mut [u8]) -> usize {
        (**self).check_recv_frame(dest)
    }

    fn needs_service(&self) -> bool {
        (**self).needs_service()
    }

    fn service(&mut self) {
        (**self).service()
    }

    fn stats(&self) -> LinkStats {
        (**self).stats()
    }
}

/// Copy a received frame into the caller's buffer, or drop it if it does not fit.
pub(crate) fn deliver(frame: &[u8], dest: &mut [u8], stats: &mut LinkStats) -> usize {
    if frame.len() > dest.len() {
        tracing::warn!(len = frame.len(), capacity = dest.len(), "receive buffer too small, frame dropped");
        stats.record_dropped();
        return 0;
    }
    dest[..frame.len()].copy_from_slice(frame);
    stats.record_received(frame.len());
    frame.len()
}
