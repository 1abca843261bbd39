// Failover Arbiter Tests
// Single active link that follows observed traffic and connection state

#[path = "../common/mod.rs"]
mod common;

use common::ScriptedLink;
use meshlink::{ActiveLink, FailoverArbiter, Link, LinkKind, MAX_FRAME_SIZE};

fn poll(arbiter: &mut FailoverArbiter<'_>) -> Option<Vec<u8>> {
    let mut buf = [0u8; MAX_FRAME_SIZE];
    match arbiter.check_recv_frame(&mut buf) {
        0 => None,
        n => Some(buf[..n].to_vec()),
    }
}

fn wireless_and_socket() -> (FailoverArbiter<'static>, ScriptedLink, ScriptedLink) {
    let a = ScriptedLink::connected(LinkKind::Wireless);
    let b = ScriptedLink::connected(LinkKind::Socket);
    let mut arbiter = FailoverArbiter::pair(a.clone(), b.clone());
    arbiter.enable();
    (arbiter, a, b)
}

// ============================================================================
// COMPOSITION
// ============================================================================

#[test]
fn test_starts_with_no_active_link() {
    let (arbiter, a, b) = wireless_and_socket();

    assert_eq!(arbiter.kind(), LinkKind::Composite);
    assert_eq!(arbiter.active(), ActiveLink::None);
    assert_eq!(arbiter.len(), 2);
    assert!(a.is_enabled_now() && b.is_enabled_now());
    assert!(arbiter.is_link_enabled(0) && arbiter.is_link_enabled(1));
}

#[test]
fn test_connected_if_any_link_connected() {
    let (arbiter, a, b) = wireless_and_socket();
    assert!(arbiter.is_connected());

    a.set_connected(false);
    assert!(arbiter.is_connected());

    b.set_connected(false);
    assert!(!arbiter.is_connected());
}

#[test]
fn test_disable_stops_every_link() {
    let (mut arbiter, a, b) = wireless_and_socket();
    arbiter.disable();

    assert!(!arbiter.is_enabled());
    assert!(!a.is_enabled_now());
    assert!(!b.is_enabled_now());
}

// ============================================================================
// SELECTION
// ============================================================================

#[test]
fn test_receive_adopts_link() {
    let (mut arbiter, _, b) = wireless_and_socket();
    b.push_inbound(b"from-b");

    assert_eq!(poll(&mut arbiter), Some(b"from-b".to_vec()));
    assert_eq!(arbiter.active(), ActiveLink::Link(1));
    assert_eq!(arbiter.active_kind(), Some(LinkKind::Socket));
}

#[test]
fn test_writes_follow_active_link() {
    let (mut arbiter, a, b) = wireless_and_socket();
    b.push_inbound(b"hello");
    poll(&mut arbiter);

    assert_eq!(arbiter.write_frame(b"reply"), 5);
    assert_eq!(b.written(), vec![b"reply".to_vec()]);
    assert!(a.written().is_empty());
}

#[test]
fn test_write_without_active_picks_first_accepting_link() {
    let (mut arbiter, a, b) = wireless_and_socket();
    a.set_accept_writes(false);

    assert_eq!(arbiter.write_frame(b"x"), 1);
    assert_eq!(arbiter.active(), ActiveLink::Link(1));
    assert_eq!(b.written().len(), 1);
}

#[test]
fn test_active_polled_first() {
    let (mut arbiter, a, b) = wireless_and_socket();
    b.push_inbound(b"b1");
    poll(&mut arbiter);

    a.push_inbound(b"a1");
    b.push_inbound(b"b2");

    assert_eq!(poll(&mut arbiter), Some(b"b2".to_vec()));
    assert_eq!(poll(&mut arbiter), Some(b"a1".to_vec()));
    assert_eq!(arbiter.active(), ActiveLink::Link(0));
}

#[test]
fn test_failover_to_surviving_link() {
    let (mut arbiter, a, b) = wireless_and_socket();
    a.push_inbound(b"a");
    poll(&mut arbiter);
    assert_eq!(arbiter.active(), ActiveLink::Link(0));

    // Active link loses its peer; the other is still connected
    a.set_connected(false);
    b.push_inbound(b"b");

    assert_eq!(poll(&mut arbiter), Some(b"b".to_vec()));
    assert_eq!(arbiter.active(), ActiveLink::Link(1));

    assert_eq!(arbiter.write_frame(b"after"), 5);
    assert_eq!(b.written(), vec![b"after".to_vec()]);
    assert!(a.written().is_empty());
}

#[test]
fn test_health_check_moves_to_connected_link() {
    let (mut arbiter, a, _) = wireless_and_socket();
    a.push_inbound(b"a");
    poll(&mut arbiter);

    a.set_connected(false);
    assert_eq!(poll(&mut arbiter), None);
    assert_eq!(arbiter.active(), ActiveLink::Link(1));
}

#[test]
fn test_lost_link_cleared_when_nothing_left() {
    let (mut arbiter, a, b) = wireless_and_socket();
    a.push_inbound(b"a");
    poll(&mut arbiter);

    a.set_connected(false);
    b.set_connected(false);
    poll(&mut arbiter);

    assert_eq!(arbiter.active(), ActiveLink::None);
    assert_eq!(arbiter.write_frame(b"void"), 0);
}

#[test]
fn test_sparse_health_check_still_drops_lost_link() {
    let a = ScriptedLink::connected(LinkKind::Wireless);
    let b = ScriptedLink::connected(LinkKind::Socket);
    let mut arbiter = FailoverArbiter::pair(a.clone(), b.clone()).with_health_check_ticks(3);
    arbiter.enable();
    a.push_inbound(b"a");
    poll(&mut arbiter);

    a.set_connected(false);
    poll(&mut arbiter);

    assert_eq!(arbiter.active(), ActiveLink::None);
}

// ============================================================================
// PER-LINK ENABLE
// ============================================================================

#[test]
fn test_disable_active_link_clears_selector() {
    let (mut arbiter, a, _) = wireless_and_socket();
    a.push_inbound(b"a");
    poll(&mut arbiter);

    arbiter.disable_link(0);

    assert_eq!(arbiter.active(), ActiveLink::None);
    assert!(!a.is_enabled_now());
    assert!(!arbiter.is_link_enabled(0));
}

#[test]
fn test_disabled_link_is_not_polled_or_written() {
    let (mut arbiter, a, b) = wireless_and_socket();
    arbiter.disable_link(0);
    let polls_before = a.polls();
    a.push_inbound(b"ignored");

    assert_eq!(poll(&mut arbiter), None);
    assert_eq!(a.polls(), polls_before);

    assert_eq!(arbiter.write_frame(b"w"), 1);
    assert!(a.written().is_empty());
    assert_eq!(b.written().len(), 1);
}

#[test]
fn test_three_links_priority_order() {
    let socket = ScriptedLink::connected(LinkKind::Socket);
    let wireless = ScriptedLink::connected(LinkKind::Wireless);
    let serial = ScriptedLink::connected(LinkKind::Serial);
    let links: Vec<Box<dyn Link>> = vec![
        Box::new(socket.clone()),
        Box::new(wireless.clone()),
        Box::new(serial.clone()),
    ];
    let mut arbiter = FailoverArbiter::new(links);
    arbiter.enable();
    wireless.push_inbound(b"w");
    serial.push_inbound(b"s");

    assert_eq!(poll(&mut arbiter), Some(b"w".to_vec()));
    assert_eq!(arbiter.active_kind(), Some(LinkKind::Wireless));
}

#[test]
fn test_links_by_reference() {
    let mut a = ScriptedLink::connected(LinkKind::Serial);
    let mut b = ScriptedLink::connected(LinkKind::Socket);
    let handle = b.clone();
    {
        let mut arbiter = FailoverArbiter::pair(&mut a, &mut b);
        arbiter.enable();
        handle.push_inbound(b"ref");
        assert_eq!(poll(&mut arbiter), Some(b"ref".to_vec()));
    }
    assert!(b.is_enabled());
}

#[test]
fn test_stats_are_summed() {
    let (mut arbiter, _, b) = wireless_and_socket();
    b.push_inbound(b"x");
    poll(&mut arbiter);
    arbiter.write_frame(b"1");
    arbiter.write_frame(b"2");

    assert_eq!(arbiter.stats().frames_sent, 2);
}
