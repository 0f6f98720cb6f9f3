//! In-memory connector for unit tests.
//!
//! Each dial creates a `tokio::io::duplex` pair; the far end is kept so tests
//! can act as the remote peer. Socket ids are encoded in the local port
//! (`40000 + id`) so tests can tell transports apart.

use crate::base::neterror::NetError;
use crate::socket::address::{SocketAddress, Transport};
use crate::socket::client::{HalfClose, StreamSocket};
use crate::socket::connectjob::{Connect, Connecting};
use crate::socket::stream::PooledSocket;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};

#[derive(Debug, Default)]
struct Counters {
    real_closes: AtomicUsize,
    half_closes: AtomicUsize,
}

#[derive(Debug)]
pub(crate) struct MockSocket {
    io: DuplexStream,
    id: u16,
    half_close: HalfClose,
    peer_addr_fails: bool,
    counters: Arc<Counters>,
}

impl AsyncRead for MockSocket {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_read(cx, buf)
    }
}

impl AsyncWrite for MockSocket {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.io).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_shutdown(cx)
    }
}

impl StreamSocket for MockSocket {
    fn local_addr(&self) -> io::Result<SocketAddress> {
        Ok(SocketAddress::Inet(SocketAddr::from(([127, 0, 0, 1], 40000 + self.id))))
    }

    fn peer_addr(&self) -> io::Result<SocketAddress> {
        if self.peer_addr_fails {
            return Err(io::Error::from(io::ErrorKind::NotConnected));
        }
        Ok(SocketAddress::Inet(SocketAddr::from(([127, 0, 0, 1], 9))))
    }

    fn half_close(&self) -> HalfClose {
        self.half_close
    }

    fn shutdown_read(&self) -> io::Result<()> {
        self.counters.half_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn shutdown_write(&self) -> io::Result<()> {
        self.counters.half_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        self.counters.real_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

enum Behavior {
    Connect,
    Fail(io::ErrorKind),
    Stall,
}

pub(crate) struct MockConnector {
    behavior: Behavior,
    half_close: HalfClose,
    peer_addr_fails: bool,
    attempts: AtomicUsize,
    counters: Arc<Counters>,
    peers: Mutex<Vec<Option<DuplexStream>>>,
}

impl MockConnector {
    fn build(behavior: Behavior, half_close: HalfClose) -> Self {
        Self {
            behavior,
            half_close,
            peer_addr_fails: false,
            attempts: AtomicUsize::new(0),
            counters: Arc::new(Counters::default()),
            peers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::build(Behavior::Connect, HalfClose::NONE))
    }

    pub(crate) fn with_half_close(half_close: HalfClose) -> Arc<Self> {
        Arc::new(Self::build(Behavior::Connect, half_close))
    }

    /// Sockets whose `peer_addr` fails as after a remote reset.
    pub(crate) fn with_failing_peer_addr() -> Arc<Self> {
        Arc::new(Self {
            peer_addr_fails: true,
            ..Self::build(Behavior::Connect, HalfClose::NONE)
        })
    }

    pub(crate) fn failing(kind: io::ErrorKind) -> Arc<Self> {
        Arc::new(Self::build(Behavior::Fail(kind), HalfClose::NONE))
    }

    pub(crate) fn stalled() -> Arc<Self> {
        Arc::new(Self::build(Behavior::Stall, HalfClose::NONE))
    }

    /// Number of real dials attempted.
    pub(crate) fn dials(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn real_closes(&self) -> usize {
        self.counters.real_closes.load(Ordering::SeqCst)
    }

    pub(crate) fn half_closes(&self) -> usize {
        self.counters.half_closes.load(Ordering::SeqCst)
    }

    /// The remote end of the socket with the given id.
    pub(crate) fn take_peer(&self, id: u16) -> DuplexStream {
        self.peers.lock().unwrap()[usize::from(id)]
            .take()
            .expect("peer already taken")
    }
}

impl Connect for MockConnector {
    fn connect(&self, _transport: Transport, _address: &str) -> Connecting {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Stall => Box::pin(std::future::pending()),
            Behavior::Fail(kind) => {
                let err = NetError::from(io::Error::new(kind, "mock dial failure"));
                Box::pin(std::future::ready(Err(err)))
            }
            Behavior::Connect => {
                let (local, remote) = tokio::io::duplex(4096);
                let mut peers = self.peers.lock().unwrap();
                let id = u16::try_from(peers.len()).unwrap();
                peers.push(Some(remote));

                let socket = MockSocket {
                    io: local,
                    id,
                    half_close: self.half_close,
                    peer_addr_fails: self.peer_addr_fails,
                    counters: Arc::clone(&self.counters),
                };
                Box::pin(std::future::ready(Ok(Box::new(socket) as Box<dyn StreamSocket>)))
            }
        }
    }
}

/// Id of the mock transport behind a pooled socket.
pub(crate) fn socket_id(socket: &PooledSocket) -> u16 {
    socket.local_addr().unwrap().as_inet().unwrap().port() - 40000
}
