// Serial Link Implementation
// Point-to-point byte channel (UART, USB CDC, stdio): always connected once open

use crate::link::codec::{encode_frame, FrameDecoder, FRAME_HEADER_LEN};
use crate::link::traits::deliver;
use crate::link::{Link, LinkError, LinkKind, LinkStats, MAX_FRAME_SIZE};
use std::io;

// ============================================================================
// BYTE CHANNEL
// ============================================================================

/// Downward contract of a serial peripheral.
///
/// `read` and `write` must not block: `Ok(0)` means nothing could be moved
/// right now (an `ErrorKind::WouldBlock` error is treated the same way).
pub trait ByteChannel {
    /// Open the peripheral. Failure here is the only fatal serial error.
    fn open(&mut self) -> Result<(), LinkError>;

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write as much of `data` as the peripheral takes right now
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;
}

impl<C: ByteChannel + ?Sized> ByteChannel for Box<C> {
    fn open(&mut self) -> Result<(), LinkError> {
        (**self).open()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        (**self).write(data)
    }
}

// ============================================================================
// SERIAL LINK
// ============================================================================

/// Serial adapter.
///
/// Outbound frames carry the `'>'` header and are written immediately; a
/// frame the channel only partly accepted stays in a transmit backlog and
/// keeps `is_write_busy()` true. Inbound frames must start with `'<'`; noise
/// before the marker is skipped.
pub struct SerialLink<C> {
    channel: C,
    open: bool,
    enabled: bool,
    backlog: Vec<u8>,
    decoder: FrameDecoder,
    stats: LinkStats,
}

impl<C: ByteChannel> SerialLink<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            open: false,
            enabled: false,
            backlog: Vec::with_capacity(FRAME_HEADER_LEN + MAX_FRAME_SIZE),
            decoder: FrameDecoder::resync(),
            stats: LinkStats::default(),
        }
    }

    /// Open the underlying channel
    pub fn begin(&mut self) -> Result<(), LinkError> {
        self.channel.open()?;
        self.open = true;
        self.stats.peers_accepted += 1;
        tracing::info!("serial link open");
        Ok(())
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Push as much backlog as the channel accepts. Returns false if the
    /// channel failed and the backlog was dropped.
    fn flush_backlog(&mut self) -> bool {
        while !self.backlog.is_empty() {
            match self.channel.write(&self.backlog) {
                Ok(0) => break,
                Ok(n) => {
                    self.backlog.drain(..n);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    tracing::warn!(error = %e, pending = self.backlog.len(), "serial write failed, backlog dropped");
                    self.backlog.clear();
                    self.stats.record_dropped();
                    return false;
                }
            }
        }
        true
    }

    fn fill_decoder(&mut self) {
        let spare = self.decoder.spare();
        if spare == 0 {
            return;
        }
        let mut chunk = [0u8; FRAME_HEADER_LEN + MAX_FRAME_SIZE];
        match self.channel.read(&mut chunk[..spare]) {
            Ok(n) => self.decoder.push(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => tracing::warn!(error = %e, "serial read failed"),
        }
    }
}

impl<C: ByteChannel> Link for SerialLink<C> {
    fn kind(&self) -> LinkKind {
        LinkKind::Serial
    }

    fn enable(&mut self) {
        if self.enabled {
            return;
        }
        self.enabled = true;
        self.backlog.clear();
        self.decoder.clear();
    }

    fn disable(&mut self) {
        self.enabled = false;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn is_connected(&self) -> bool {
        self.enabled && self.open
    }

    fn is_write_busy(&self) -> bool {
        !self.backlog.is_empty()
    }

    fn write_frame(&mut self, frame: &[u8]) -> usize {
        if frame.len() > MAX_FRAME_SIZE {
            tracing::warn!(len = frame.len(), "serial write_frame: frame too big");
            self.stats.record_dropped();
            return 0;
        }
        if frame.is_empty() || !self.is_connected() {
            return 0;
        }
        if !self.backlog.is_empty() {
            tracing::debug!("serial write_frame while busy");
            self.stats.record_dropped();
            return 0;
        }

        if encode_frame(frame, &mut self.backlog).is_err() {
            return 0;
        }
        if !self.flush_backlog() {
            return 0;
        }
        self.stats.record_sent(frame.len());
        frame.len()
    }

    fn check_recv_frame(&mut self, dest: &mut [u8]) -> usize {
        if !self.is_connected() {
            return 0;
        }
        if !self.backlog.is_empty() {
            self.flush_backlog();
            return 0;
        }

        self.fill_decoder();
        match self.decoder.next_frame() {
            Some(frame) if !frame.is_empty() => {
                tracing::debug!(len = frame.len(), "serial frame received");
                deliver(&frame, dest, &mut self.stats)
            }
            _ => 0,
        }
    }

    fn needs_service(&self) -> bool {
        !self.backlog.is_empty()
    }

    fn service(&mut self) {
        if self.is_connected() {
            self.flush_backlog();
        }
    }

    fn stats(&self) -> LinkStats {
        self.stats.clone()
    }
}
