// Fan-out Arbiter Tests
// Every connected link carries every frame; receives in priority order

#[path = "../common/mod.rs"]
mod common;

use common::{ManualClock, MemoryListener, MemoryPeripheral, ScriptedLink};
use meshlink::link::{encode_frame, SocketConfig, SocketLink, WirelessConfig, WirelessLink};
use meshlink::{FanOutArbiter, Link, LinkKind, MAX_FRAME_SIZE};

fn poll(arbiter: &mut FanOutArbiter<'_>) -> Option<Vec<u8>> {
    let mut buf = [0u8; MAX_FRAME_SIZE];
    match arbiter.check_recv_frame(&mut buf) {
        0 => None,
        n => Some(buf[..n].to_vec()),
    }
}

fn wireless_and_serial() -> (FanOutArbiter<'static>, ScriptedLink, ScriptedLink) {
    let a = ScriptedLink::connected(LinkKind::Wireless);
    let b = ScriptedLink::connected(LinkKind::Serial);
    let mut arbiter = FanOutArbiter::pair(a.clone(), b.clone());
    arbiter.enable();
    (arbiter, a, b)
}

// ============================================================================
// STATE
// ============================================================================

#[test]
fn test_or_semantics() {
    let (mut arbiter, a, b) = wireless_and_serial();

    assert_eq!(arbiter.kind(), LinkKind::Composite);
    assert!(arbiter.is_enabled());
    assert!(arbiter.is_connected());

    a.set_connected(false);
    assert!(arbiter.is_connected());
    b.set_connected(false);
    assert!(!arbiter.is_connected());

    arbiter.disable();
    assert!(!arbiter.is_enabled());
}

#[test]
fn test_write_busy_if_any_link_busy() {
    let (arbiter, _, b) = wireless_and_serial();
    assert!(!arbiter.is_write_busy());

    b.state.borrow_mut().busy = true;
    assert!(arbiter.is_write_busy());
}

// ============================================================================
// WRITES
// ============================================================================

#[test]
fn test_write_reaches_every_connected_link() {
    let (mut arbiter, a, b) = wireless_and_serial();

    assert_eq!(arbiter.write_frame(b"all"), 3);
    assert_eq!(a.written(), vec![b"all".to_vec()]);
    assert_eq!(b.written(), vec![b"all".to_vec()]);
}

#[test]
fn test_write_skips_disconnected_link() {
    let (mut arbiter, a, b) = wireless_and_serial();
    a.set_connected(false);

    assert_eq!(arbiter.write_frame(b"one"), 3);
    assert!(a.written().is_empty());
    assert_eq!(b.written().len(), 1);
}

#[test]
fn test_partial_acceptance_reports_success() {
    let (mut arbiter, a, b) = wireless_and_serial();
    b.set_accept_writes(false);

    assert_eq!(arbiter.write_frame(b"some"), 4);
    assert_eq!(a.written().len(), 1);
    assert!(b.written().is_empty());
}

#[test]
fn test_write_with_nothing_connected() {
    let (mut arbiter, a, b) = wireless_and_serial();
    a.set_connected(false);
    b.set_connected(false);

    assert_eq!(arbiter.write_frame(b"gone"), 0);
}

#[test]
fn test_oversize_write_rejected() {
    let (mut arbiter, a, _) = wireless_and_serial();

    assert_eq!(arbiter.write_frame(&vec![0u8; MAX_FRAME_SIZE + 1]), 0);
    assert!(a.written().is_empty());
}

// ============================================================================
// RECEIVES
// ============================================================================

#[test]
fn test_receive_priority_order() {
    let (mut arbiter, a, b) = wireless_and_serial();
    a.push_inbound(b"first");
    b.push_inbound(b"second");

    assert_eq!(poll(&mut arbiter), Some(b"first".to_vec()));
    assert_eq!(poll(&mut arbiter), Some(b"second".to_vec()));
    assert_eq!(poll(&mut arbiter), None);
}

#[test]
fn test_later_links_serviced_after_earlier_delivers() {
    let (mut arbiter, a, b) = wireless_and_serial();
    a.push_inbound(b"x");
    b.push_inbound(b"y");

    poll(&mut arbiter);

    assert_eq!(b.services(), 1);
    assert_eq!(b.polls(), 0);
    assert_eq!(b.state.borrow().inbound.len(), 1);
}

#[test]
fn test_receive_from_lower_priority_link() {
    let (mut arbiter, a, b) = wireless_and_serial();
    b.push_inbound(b"late");

    assert_eq!(poll(&mut arbiter), Some(b"late".to_vec()));
    assert_eq!(a.polls(), 1);
}

// ============================================================================
// WITH REAL ADAPTERS
// ============================================================================

#[test]
fn test_socket_keeps_flushing_while_wireless_delivers() {
    let peripheral = MemoryPeripheral::new();
    let clock = ManualClock::new();
    let wireless = WirelessLink::with_clock(peripheral.clone(), WirelessConfig::default(), clock.clone());
    let listener = MemoryListener::new();
    let socket = SocketLink::new(listener.clone(), SocketConfig::default());

    let mut arbiter = FanOutArbiter::pair(wireless, socket);
    arbiter.enable();
    peripheral.set_peers(1);
    let client = listener.connect();
    poll(&mut arbiter);
    assert!(arbiter.is_connected());

    assert_eq!(arbiter.write_frame(b"n1"), 2);
    assert_eq!(arbiter.write_frame(b"n2"), 2);
    peripheral.peer_writes(b"in-1");

    // First poll: wireless notifies n1, the socket is polled and flushes n1
    assert_eq!(poll(&mut arbiter), None);

    // Second poll: n2 is paced out on wireless so it delivers in-1, and the
    // socket still flushes n2 through its service pass
    assert_eq!(poll(&mut arbiter), Some(b"in-1".to_vec()));

    let mut expected = Vec::new();
    encode_frame(b"n1", &mut expected).unwrap();
    encode_frame(b"n2", &mut expected).unwrap();
    assert_eq!(client.received(), expected);
    assert_eq!(peripheral.notified(), vec![b"n1".to_vec()]);

    clock.advance_ms(60);
    assert_eq!(poll(&mut arbiter), None);
    assert_eq!(peripheral.notified(), vec![b"n1".to_vec(), b"n2".to_vec()]);
}
