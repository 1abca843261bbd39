// TCP Backend
// std::net listener and client stream in non-blocking mode, plugged into SocketLink

use crate::link::socket::{PeerStream, SocketConfig, SocketLink, StreamListener};
use crate::link::{LinkError, LinkKind};
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};

// ============================================================================
// TCP PEER
// ============================================================================

/// Accepted TCP client with a small transmit backlog for would-block writes
pub struct TcpPeer {
    stream: TcpStream,
    addr: Option<SocketAddr>,
    open: bool,
    backlog: Vec<u8>,
}

impl TcpPeer {
    pub fn new(stream: TcpStream, nodelay: bool) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        stream.set_nodelay(nodelay).ok();
        let addr = stream.peer_addr().ok();
        Ok(Self {
            stream,
            addr,
            open: true,
            backlog: Vec::new(),
        })
    }
}

impl PeerStream for TcpPeer {
    fn is_open(&mut self) -> bool {
        if !self.open {
            return false;
        }
        let mut probe = [0u8; 1];
        match self.stream.peek(&mut probe) {
            Ok(0) => self.open = false,
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(_) => self.open = false,
        }
        self.open
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.stream.read(buf) {
            Ok(0) => {
                self.open = false;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => {
                self.open = false;
                Err(e)
            }
        }
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.backlog.extend_from_slice(data);
        self.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        while !self.backlog.is_empty() {
            match self.stream.write(&self.backlog) {
                Ok(0) => {
                    self.open = false;
                    return Err(io::Error::from(io::ErrorKind::WriteZero));
                }
                Ok(n) => {
                    self.backlog.drain(..n);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => {
                    self.open = false;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn pending(&self) -> usize {
        self.backlog.len()
    }

    fn close(&mut self) {
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            tracing::debug!(error = %e, "tcp shutdown failed");
        }
        self.open = false;
        self.backlog.clear();
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.addr
    }
}

// ============================================================================
// TCP ACCEPTOR
// ============================================================================

/// Non-blocking TCP listener
pub struct TcpAcceptor {
    listener: TcpListener,
    nodelay: bool,
}

impl TcpAcceptor {
    pub fn bind(address: &str, nodelay: bool) -> io::Result<Self> {
        let listener = TcpListener::bind(address)?;
        listener.set_nonblocking(true)?;
        Ok(Self { listener, nodelay })
    }
}

impl StreamListener for TcpAcceptor {
    type Stream = TcpPeer;

    fn accept(&mut self) -> io::Result<Option<TcpPeer>> {
        match self.listener.accept() {
            Ok((stream, _)) => TcpPeer::new(stream, self.nodelay).map(Some),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr().ok()
    }
}

impl SocketLink<TcpAcceptor> {
    /// Open the TCP listener described by `config`
    pub fn bind(config: SocketConfig) -> Result<Self, LinkError> {
        config.validate()?;
        let acceptor = TcpAcceptor::bind(&config.listen_address(), config.nodelay)
            .map_err(|e| LinkError::begin(LinkKind::Socket, e.to_string()))?;
        tracing::info!(addr = ?acceptor.local_addr(), "socket link listening");
        Ok(Self::new(acceptor, config))
    }
}
