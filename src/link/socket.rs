// Socket Link Implementation
// Listening link holding at most one accepted client; frames use the 3-byte header

use crate::link::codec::{encode_frame, FrameDecoder, FRAME_HEADER_LEN};
use crate::link::queue::{OutboundQueue, QueueReject};
use crate::link::traits::deliver;
use crate::link::{Link, LinkError, LinkKind, LinkStats, FRAME_QUEUE_SIZE, MAX_FRAME_SIZE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::net::SocketAddr;

/// Port the companion TCP service listens on unless configured otherwise
pub const DEFAULT_LISTEN_PORT: u16 = 5000;

// ============================================================================
// SOCKET CONFIG
// ============================================================================

/// Configuration for the socket link
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketConfig {
    /// Address to bind to
    pub bind_address: String,
    /// Port to listen on (0 for random)
    pub port: u16,
    /// Outbound queue capacity
    pub queue_capacity: usize,
    /// Accept frames into the queue before any client has attached
    pub queue_while_disconnected: bool,
    /// Enable TCP_NODELAY on accepted clients
    pub nodelay: bool,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_LISTEN_PORT,
            queue_capacity: FRAME_QUEUE_SIZE,
            queue_while_disconnected: false,
            nodelay: true,
        }
    }
}

impl SocketConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bind_address(mut self, addr: &str) -> Self {
        self.bind_address = addr.to_string();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_queue_while_disconnected(mut self, enabled: bool) -> Self {
        self.queue_while_disconnected = enabled;
        self
    }

    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn validate(&self) -> Result<(), LinkError> {
        if self.bind_address.is_empty() {
            return Err(LinkError::InvalidConfig("bind_address cannot be empty".to_string()));
        }
        if self.queue_capacity == 0 {
            return Err(LinkError::InvalidConfig("queue_capacity cannot be 0".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// LISTENER AND STREAM CONTRACTS
// ============================================================================

/// One accepted client connection.
///
/// None of these calls may block. `read` returns `Ok(0)` when nothing is
/// available; closure is reported through `is_open`.
pub trait PeerStream {
    /// Re-check liveness with the transport
    fn is_open(&mut self) -> bool;

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Hand bytes to the transport; whatever it cannot take now is kept and
    /// pushed out by later `flush` calls.
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;

    /// Bytes accepted by `write` but not yet on the wire
    fn pending(&self) -> usize;

    fn close(&mut self);

    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }
}

/// Non-blocking accept primitive
pub trait StreamListener {
    type Stream: PeerStream;

    /// A newly arrived client, if one is waiting
    fn accept(&mut self) -> io::Result<Option<Self::Stream>>;

    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }
}

// ============================================================================
// PEER ID
// ============================================================================

/// Random identifier given to each accepted client, for logs and churn tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId([u8; 8]);

impl PeerId {
    pub fn generate() -> Self {
        use rand::Rng;
        let mut bytes = [0u8; 8];
        rand::thread_rng().fill(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

// ============================================================================
// SOCKET LINK
// ============================================================================

struct ActivePeer<S> {
    id: PeerId,
    stream: S,
}

/// Socket adapter
pub struct SocketLink<L: StreamListener> {
    listener: L,
    config: SocketConfig,
    enabled: bool,
    connected: bool,
    peer: Option<ActivePeer<L::Stream>>,
    queue: OutboundQueue,
    decoder: FrameDecoder,
    stats: LinkStats,
}

impl<L: StreamListener> SocketLink<L> {
    pub fn new(listener: L, config: SocketConfig) -> Self {
        let queue = OutboundQueue::new(config.queue_capacity);
        Self {
            listener,
            config,
            enabled: false,
            connected: false,
            peer: None,
            queue,
            decoder: FrameDecoder::trusted(),
            stats: LinkStats::default(),
        }
    }

    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr()
    }

    /// Identifier of the client currently attached
    pub fn current_peer(&self) -> Option<PeerId> {
        self.peer.as_ref().map(|p| p.id)
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Accept a waiting client (evicting the current one) and re-check liveness
    fn poll_peer(&mut self) {
        match self.listener.accept() {
            Ok(Some(stream)) => {
                if let Some(mut old) = self.peer.take() {
                    tracing::info!(peer = %old.id, "replacing socket client");
                    old.stream.close();
                }
                self.connected = false;
                self.decoder.clear();

                let id = PeerId::generate();
                tracing::info!(peer = %id, addr = ?stream.peer_addr(), "socket client accepted");
                self.peer = Some(ActivePeer { id, stream });
                self.stats.peers_accepted += 1;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "socket accept failed"),
        }

        let open = match self.peer.as_mut() {
            Some(peer) => {
                peer.stream.is_open()
                    && match peer.stream.flush() {
                        Ok(()) => true,
                        Err(e) => {
                            tracing::debug!(error = %e, "socket flush failed");
                            false
                        }
                    }
            }
            None => false,
        };

        if open && !self.connected {
            tracing::info!("socket peer connected");
            self.connected = true;
        } else if !open {
            if self.connected {
                tracing::info!("socket peer disconnected");
                self.connected = false;
            }
            if let Some(mut gone) = self.peer.take() {
                gone.stream.close();
                self.decoder.clear();
            }
        }
    }

    /// Write the head of the queue to the client. Frames stay queued while the
    /// client still holds unsent bytes, so a stalled reader fills the queue.
    fn flush_one(&mut self) {
        let Some(peer) = self.peer.as_mut() else {
            return;
        };
        if peer.stream.pending() > 0 {
            return;
        }
        let Some(frame) = self.queue.front() else {
            return;
        };

        let len = frame.len();
        let mut wire = Vec::with_capacity(FRAME_HEADER_LEN + len);
        if encode_frame(frame, &mut wire).is_err() {
            self.queue.dequeue();
            return;
        }

        match peer.stream.write(&wire) {
            Ok(()) => {
                self.queue.dequeue();
                self.stats.record_sent(len);
                tracing::debug!(len, queued = self.queue.len(), "socket frame sent");
            }
            Err(e) => {
                tracing::warn!(error = %e, peer = %peer.id, "socket write failed");
                peer.stream.close();
                self.peer = None;
                self.connected = false;
                self.decoder.clear();
            }
        }
    }

    fn receive(&mut self, dest: &mut [u8]) -> usize {
        if let Some(frame) = self.decoder.next_frame() {
            return self.hand_over(frame, dest);
        }

        let spare = self.decoder.spare();
        let Some(peer) = self.peer.as_mut() else {
            return 0;
        };
        if spare > 0 {
            let mut chunk = [0u8; FRAME_HEADER_LEN + MAX_FRAME_SIZE];
            match peer.stream.read(&mut chunk[..spare]) {
                Ok(n) => self.decoder.push(&chunk[..n]),
                Err(e) => tracing::warn!(error = %e, "socket read failed"),
            }
        }

        match self.decoder.next_frame() {
            Some(frame) => self.hand_over(frame, dest),
            None => 0,
        }
    }

    fn hand_over(&mut self, frame: Vec<u8>, dest: &mut [u8]) -> usize {
        if frame.is_empty() {
            return 0;
        }
        tracing::debug!(len = frame.len(), "socket frame received");
        deliver(&frame, dest, &mut self.stats)
    }
}

impl<L: StreamListener> Link for SocketLink<L> {
    fn kind(&self) -> LinkKind {
        LinkKind::Socket
    }

    fn enable(&mut self) {
        if self.enabled {
            return;
        }
        self.enabled = true;
        self.queue.clear();
        self.decoder.clear();
    }

    fn disable(&mut self) {
        self.enabled = false;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn is_connected(&self) -> bool {
        self.enabled && self.connected
    }

    fn is_write_busy(&self) -> bool {
        self.peer
            .as_ref()
            .map(|p| p.stream.pending() > 0)
            .unwrap_or(false)
    }

    fn write_frame(&mut self, frame: &[u8]) -> usize {
        if frame.len() > MAX_FRAME_SIZE {
            tracing::warn!(len = frame.len(), "socket write_frame: frame too big");
            self.stats.record_dropped();
            return 0;
        }
        if !self.enabled || frame.is_empty() {
            return 0;
        }
        if !self.connected && !self.config.queue_while_disconnected {
            return 0;
        }
        match self.queue.enqueue(frame) {
            Ok(len) => len,
            Err(QueueReject::Full) => {
                tracing::warn!("socket write_frame: send queue is full");
                self.stats.record_dropped();
                0
            }
            Err(_) => 0,
        }
    }

    fn check_recv_frame(&mut self, dest: &mut [u8]) -> usize {
        if !self.enabled {
            return 0;
        }
        self.poll_peer();
        if !self.connected {
            return 0;
        }

        if !self.queue.is_empty() && !self.is_write_busy() {
            self.flush_one();
            return 0;
        }
        self.receive(dest)
    }

    fn needs_service(&self) -> bool {
        self.enabled
    }

    fn service(&mut self) {
        if !self.enabled {
            return;
        }
        self.poll_peer();
        if self.connected && !self.queue.is_empty() {
            self.flush_one();
        }
    }

    fn stats(&self) -> LinkStats {
        self.stats.clone()
    }
}
