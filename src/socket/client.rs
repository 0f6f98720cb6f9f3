use crate::socket::address::SocketAddress;
use socket2::SockRef;
use std::fmt;
use std::io;
use std::net::Shutdown;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Which directions of a stream can be shut down independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HalfClose {
    pub read: bool,
    pub write: bool,
}

impl HalfClose {
    pub const NONE: HalfClose = HalfClose { read: false, write: false };
    pub const BOTH: HalfClose = HalfClose { read: true, write: true };
}

/// A connected bidirectional byte stream that the pool can own and recycle.
///
/// Implemented for [`TcpStream`] and, on Unix, `UnixStream`. Custom
/// transports plug in by implementing this trait and returning it from a
/// [`Connect`](crate::socket::connectjob::Connect) implementation.
pub trait StreamSocket: AsyncRead + AsyncWrite + Unpin + Send + Sync + fmt::Debug {
    fn local_addr(&self) -> io::Result<SocketAddress>;

    fn peer_addr(&self) -> io::Result<SocketAddress>;

    /// Half-close support. Queried once, when the stream is wrapped.
    fn half_close(&self) -> HalfClose {
        HalfClose::NONE
    }

    /// Shut down the read direction. Only called when [`half_close`] reports
    /// `read` support.
    ///
    /// [`half_close`]: StreamSocket::half_close
    fn shutdown_read(&self) -> io::Result<()> {
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }

    /// Shut down the write direction. Only called when [`half_close`] reports
    /// `write` support.
    ///
    /// [`half_close`]: StreamSocket::half_close
    fn shutdown_write(&self) -> io::Result<()> {
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }

    /// Really close the stream. Dropping releases the descriptor.
    fn close(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}

impl StreamSocket for TcpStream {
    fn local_addr(&self) -> io::Result<SocketAddress> {
        TcpStream::local_addr(self).map(SocketAddress::Inet)
    }

    fn peer_addr(&self) -> io::Result<SocketAddress> {
        TcpStream::peer_addr(self).map(SocketAddress::Inet)
    }

    fn half_close(&self) -> HalfClose {
        HalfClose::BOTH
    }

    fn shutdown_read(&self) -> io::Result<()> {
        SockRef::from(self).shutdown(Shutdown::Read)
    }

    fn shutdown_write(&self) -> io::Result<()> {
        SockRef::from(self).shutdown(Shutdown::Write)
    }
}

#[cfg(unix)]
impl StreamSocket for tokio::net::UnixStream {
    fn local_addr(&self) -> io::Result<SocketAddress> {
        tokio::net::UnixStream::local_addr(self)
            .map(|addr| SocketAddress::Unix(addr.as_pathname().map(|p| p.to_path_buf())))
    }

    fn peer_addr(&self) -> io::Result<SocketAddress> {
        tokio::net::UnixStream::peer_addr(self)
            .map(|addr| SocketAddress::Unix(addr.as_pathname().map(|p| p.to_path_buf())))
    }

    fn half_close(&self) -> HalfClose {
        HalfClose::BOTH
    }

    fn shutdown_read(&self) -> io::Result<()> {
        SockRef::from(self).shutdown(Shutdown::Read)
    }

    fn shutdown_write(&self) -> io::Result<()> {
        SockRef::from(self).shutdown(Shutdown::Write)
    }
}
