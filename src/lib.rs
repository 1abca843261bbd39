// meshlink - transport arbitration for mesh companion links
//
// Exposes one framed, packet-oriented channel to the mesh layer while
// multiplexing it across serial, wireless (GATT-style) and TCP socket links.
// Everything below `node` is synchronous and non-blocking once polling has
// begun; the only blocking step is the network join at startup.

pub mod arbiter;
pub mod clock;
pub mod join;
pub mod link;
pub mod node;

pub use arbiter::{ActiveLink, FailoverArbiter, FanOutArbiter};
pub use link::{Link, LinkKind, LinkStats, FRAME_QUEUE_SIZE, MAX_FRAME_SIZE};
