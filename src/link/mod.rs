// Link module - THE WIRE
// Per-technology adapters behind one framed, polled capability contract

mod traits;
pub mod codec;
pub mod queue;
mod serial;
mod socket;
mod tcp;
mod wireless;

pub use traits::{
    // Core trait
    Link,
    // Identification and counters
    LinkKind, LinkStats,
    // Errors
    LinkError,
    // Limits
    FRAME_QUEUE_SIZE, MAX_FRAME_SIZE,
};

pub use codec::{
    encode_frame, encode_header, CodecError, FrameDecoder, SyncMode, FRAME_HEADER_LEN, INBOUND_MARKER,
    OUTBOUND_MARKER,
};
pub use queue::{OutboundQueue, QueueReject};

pub use serial::{ByteChannel, SerialLink};

pub use wireless::{GattPeripheral, WirelessConfig, WirelessLink};

pub use socket::{
    PeerId, PeerStream, SocketConfig, SocketLink, StreamListener,
    DEFAULT_LISTEN_PORT,
};
pub use tcp::{TcpAcceptor, TcpPeer};
