// Frame Codec Tests
// Header layout, stream reassembly and resynchronisation

use meshlink::link::{
    codec::encode_header, encode_frame, CodecError, FrameDecoder, SyncMode, FRAME_HEADER_LEN,
    INBOUND_MARKER, OUTBOUND_MARKER,
};
use meshlink::MAX_FRAME_SIZE;

fn inbound(payload: &[u8]) -> Vec<u8> {
    let mut wire = encode_header(INBOUND_MARKER, payload.len() as u16).to_vec();
    wire.extend_from_slice(payload);
    wire
}

// ============================================================================
// ENCODING
// ============================================================================

#[test]
fn test_encode_frame_layout() {
    let mut out = Vec::new();
    let written = encode_frame(&[0xAA, 0xBB, 0xCC], &mut out).unwrap();

    assert_eq!(written, FRAME_HEADER_LEN + 3);
    assert_eq!(out, vec![b'>', 3, 0, 0xAA, 0xBB, 0xCC]);
}

#[test]
fn test_encode_max_size_length_bytes() {
    let mut out = Vec::new();
    let payload = vec![1u8; MAX_FRAME_SIZE];
    encode_frame(&payload, &mut out).unwrap();

    assert_eq!(out[0], OUTBOUND_MARKER);
    assert_eq!(out[1], MAX_FRAME_SIZE as u8);
    assert_eq!(out[2], 0);
    assert_eq!(out.len(), FRAME_HEADER_LEN + MAX_FRAME_SIZE);
}

#[test]
fn test_encode_appends() {
    let mut out = vec![0xFF];
    encode_frame(b"hi", &mut out).unwrap();
    encode_frame(b"yo", &mut out).unwrap();

    assert_eq!(out, vec![0xFF, b'>', 2, 0, b'h', b'i', b'>', 2, 0, b'y', b'o']);
}

#[test]
fn test_encode_empty_rejected() {
    let mut out = Vec::new();
    assert_eq!(encode_frame(&[], &mut out), Err(CodecError::Empty));
    assert!(out.is_empty());
}

#[test]
fn test_header_msb_carries_high_byte() {
    assert_eq!(encode_header(b'>', 300), [b'>', 0x2C, 0x01]);
}

// ============================================================================
// TRUSTED DECODING
// ============================================================================

#[test]
fn test_trusted_frame_split_across_pushes() {
    let mut decoder = FrameDecoder::trusted();
    let mut wire = Vec::new();
    encode_frame(b"hello", &mut wire).unwrap();

    decoder.push(&wire[..2]);
    assert_eq!(decoder.next_frame(), None);
    decoder.push(&wire[2..6]);
    assert_eq!(decoder.next_frame(), None);
    decoder.push(&wire[6..]);

    assert_eq!(decoder.next_frame(), Some(b"hello".to_vec()));
    assert_eq!(decoder.buffered(), 0);
}

#[test]
fn test_trusted_back_to_back_frames() {
    let mut decoder = FrameDecoder::trusted();
    let mut wire = Vec::new();
    encode_frame(b"one", &mut wire).unwrap();
    encode_frame(b"two", &mut wire).unwrap();
    decoder.push(&wire);

    assert_eq!(decoder.next_frame(), Some(b"one".to_vec()));
    assert_eq!(decoder.next_frame(), Some(b"two".to_vec()));
    assert_eq!(decoder.next_frame(), None);
}

#[test]
fn test_trusted_zero_length_frame() {
    let mut decoder = FrameDecoder::trusted();
    decoder.push(&[b'<', 0, 0, b'<', 1, 0, 9]);

    assert_eq!(decoder.next_frame(), Some(vec![]));
    assert_eq!(decoder.next_frame(), Some(vec![9]));
}

#[test]
fn test_trusted_oversize_header_drops_buffer() {
    let mut decoder = FrameDecoder::trusted();
    let len = (MAX_FRAME_SIZE + 1) as u16;
    decoder.push(&encode_header(b'<', len));
    decoder.push(&[0u8; 10]);

    assert_eq!(decoder.next_frame(), None);
    assert_eq!(decoder.buffered(), 0);
    assert_eq!(decoder.discarded(), 13);
}

#[test]
fn test_spare_shrinks_with_buffered_bytes() {
    let mut decoder = FrameDecoder::trusted();
    assert_eq!(decoder.spare(), FRAME_HEADER_LEN + MAX_FRAME_SIZE);

    decoder.push(&[b'<', 10, 0, 1, 2]);
    assert_eq!(decoder.spare(), FRAME_HEADER_LEN + MAX_FRAME_SIZE - 5);

    decoder.clear();
    assert_eq!(decoder.buffered(), 0);
}

// ============================================================================
// MARKER DECODING
// ============================================================================

#[test]
fn test_resync_mode_uses_inbound_marker() {
    assert_eq!(FrameDecoder::resync().mode(), SyncMode::Marker(b'<'));
    assert_eq!(FrameDecoder::trusted().mode(), SyncMode::Trusted);
}

#[test]
fn test_marker_noise_only_is_discarded() {
    let mut decoder = FrameDecoder::resync();
    decoder.push(b"garbage");

    assert_eq!(decoder.next_frame(), None);
    assert_eq!(decoder.buffered(), 0);
    assert_eq!(decoder.discarded(), 7);
}

#[test]
fn test_marker_recovers_after_oversize_header() {
    let mut decoder = FrameDecoder::resync();
    let bad = encode_header(INBOUND_MARKER, 0xFFFF);
    decoder.push(&bad);
    decoder.push(&inbound(b"ok"));

    assert_eq!(decoder.next_frame(), Some(b"ok".to_vec()));
    assert_eq!(decoder.discarded(), 3);
}

#[test]
fn test_marker_ignores_outbound_marker() {
    let mut decoder = FrameDecoder::new(SyncMode::Marker(INBOUND_MARKER));
    let mut echoed = Vec::new();
    encode_frame(b"x", &mut echoed).unwrap();
    decoder.push(&echoed);
    decoder.push(&inbound(b"y"));

    assert_eq!(decoder.next_frame(), Some(b"y".to_vec()));
}

#[test]
fn test_marker_waits_for_partial_frame() {
    let mut decoder = FrameDecoder::resync();
    let wire = inbound(b"abcdef");
    decoder.push(&wire[..4]);

    assert_eq!(decoder.next_frame(), None);
    assert_eq!(decoder.buffered(), 4);

    decoder.push(&wire[4..]);
    assert_eq!(decoder.next_frame(), Some(b"abcdef".to_vec()));
}
