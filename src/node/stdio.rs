// Stdio Channel
// Host stand-in for a UART: frames arrive on stdin and leave on stdout

use crate::link::{ByteChannel, LinkError, LinkKind};
use std::io::{self, Write};
use tokio::io::AsyncReadExt;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

const READ_CHUNK: usize = 256;
const CHANNEL_DEPTH: usize = 64;

/// Byte channel over the process's standard streams.
///
/// A task on the current tokio runtime reads stdin and hands chunks over an
/// mpsc channel, so `read` never blocks the poll loop.
pub struct StdioChannel {
    rx: Option<mpsc::Receiver<Vec<u8>>>,
    pending: Vec<u8>,
    stdout: io::Stdout,
}

impl StdioChannel {
    pub fn new() -> Self {
        Self {
            rx: None,
            pending: Vec::new(),
            stdout: io::stdout(),
        }
    }
}

impl Default for StdioChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteChannel for StdioChannel {
    fn open(&mut self) -> Result<(), LinkError> {
        if self.rx.is_some() {
            return Ok(());
        }
        let handle = Handle::try_current().map_err(|e| LinkError::begin(LinkKind::Serial, e.to_string()))?;
        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);

        handle.spawn(async move {
            let mut stdin = tokio::io::stdin();
            let mut buf = [0u8; READ_CHUNK];
            loop {
                match stdin.read(&mut buf).await {
                    Ok(0) => {
                        tracing::info!("stdin closed");
                        break;
                    }
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "stdin read failed");
                        break;
                    }
                }
            }
        });

        self.rx = Some(rx);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            let Some(rx) = self.rx.as_mut() else {
                return Ok(0);
            };
            match rx.try_recv() {
                Ok(chunk) => self.pending = chunk,
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut out = self.stdout.lock();
        out.write_all(data)?;
        out.flush()?;
        Ok(data.len())
    }
}
