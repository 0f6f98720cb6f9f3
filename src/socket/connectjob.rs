use crate::base::neterror::NetError;
use crate::socket::address::Transport;
use crate::socket::client::StreamSocket;
use crate::socket::config::DialConfig;
use futures::future::BoxFuture;
use socket2::{SockRef, TcpKeepalive};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpSocket, TcpStream};

/// Alias for the `Future` type returned by a [`Connect`] implementation.
pub type Connecting = BoxFuture<'static, Result<Box<dyn StreamSocket>, NetError>>;

/// A dialer the pool falls back to on a cache miss.
///
/// The built-in dialer covers TCP and Unix domain sockets. Implement this to
/// pool other stream kinds; install it with
/// [`DialConfig::connector`](crate::socket::config::DialConfig::connector).
pub trait Connect: Send + Sync {
    fn connect(&self, transport: Transport, address: &str) -> Connecting;
}

impl<C: Connect + ?Sized> Connect for Arc<C> {
    fn connect(&self, transport: Transport, address: &str) -> Connecting {
        (**self).connect(transport, address)
    }
}

/// Performs one real dial: DNS -> TCP (or Unix connect).
pub struct ConnectJob;

impl ConnectJob {
    pub async fn connect(
        config: &DialConfig,
        transport: Transport,
        address: &str,
    ) -> Result<Box<dyn StreamSocket>, NetError> {
        let job = async {
            match config.custom_connector() {
                Some(connector) => connector.connect(transport, address).await,
                None => Self::connect_builtin(config, transport, address).await,
            }
        };

        match config.timeout {
            Some(limit) => tokio::time::timeout(limit, job).await.map_err(|_| {
                tracing::debug!(%transport, address, ?limit, "dial timed out");
                NetError::ConnectionTimedOut
            })?,
            None => job.await,
        }
    }

    async fn connect_builtin(
        config: &DialConfig,
        transport: Transport,
        address: &str,
    ) -> Result<Box<dyn StreamSocket>, NetError> {
        match transport {
            Transport::Tcp | Transport::Tcp4 | Transport::Tcp6 => {
                let stream = Self::connect_tcp(config, transport, address).await?;
                Ok(Box::new(stream))
            }
            Transport::Unix => Self::connect_unix(address).await,
        }
    }

    async fn connect_tcp(
        config: &DialConfig,
        transport: Transport,
        address: &str,
    ) -> Result<TcpStream, NetError> {
        // 1. DNS Resolution (no caching; every miss resolves again)
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host(address)
            .await?
            .filter(|addr| transport.accepts(addr))
            .collect();

        if addrs.is_empty() {
            tracing::debug!(%transport, address, "no suitable address found");
            return Err(NetError::NameNotResolved(address.to_string()));
        }

        // 2. TCP Connect: first success wins, the first failure is reported
        let mut first_err = None;
        for addr in addrs {
            match Self::connect_addr(config, addr).await {
                Ok(stream) => {
                    tracing::debug!(%addr, "tcp connect complete");
                    return Ok(stream);
                }
                Err(e) => {
                    tracing::debug!(%addr, error = %e, "tcp connect attempt failed");
                    first_err.get_or_insert(e);
                }
            }
        }

        Err(first_err
            .map(NetError::from)
            .unwrap_or_else(|| NetError::NameNotResolved(address.to_string())))
    }

    async fn connect_addr(config: &DialConfig, addr: SocketAddr) -> io::Result<TcpStream> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        if let Some(local) = config.local_addr {
            socket.bind(local)?;
        }

        let stream = socket.connect(addr).await?;
        stream.set_nodelay(config.nodelay)?;
        if let Some(idle) = config.keepalive {
            SockRef::from(&stream).set_tcp_keepalive(&TcpKeepalive::new().with_time(idle))?;
        }
        Ok(stream)
    }

    #[cfg(unix)]
    async fn connect_unix(address: &str) -> Result<Box<dyn StreamSocket>, NetError> {
        if address.is_empty() {
            return Err(NetError::AddressInvalid("empty unix socket path".to_string()));
        }
        let stream = tokio::net::UnixStream::connect(address).await?;
        tracing::debug!(path = address, "unix connect complete");
        Ok(Box::new(stream))
    }

    #[cfg(not(unix))]
    async fn connect_unix(_address: &str) -> Result<Box<dyn StreamSocket>, NetError> {
        Err(NetError::UnknownTransport(Transport::Unix.to_string()))
    }
}
