//! Transport kinds and endpoint addresses.

use crate::base::neterror::NetError;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// The kind of transport a connection is dialed over.
///
/// Parses from the conventional network names: `tcp`, `tcp4`, `tcp6`, `unix`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    /// TCP over whichever address family the name resolves to.
    Tcp,
    /// TCP restricted to IPv4.
    Tcp4,
    /// TCP restricted to IPv6.
    Tcp6,
    /// Unix domain stream socket; the address is a filesystem path.
    Unix,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Tcp => "tcp",
            Transport::Tcp4 => "tcp4",
            Transport::Tcp6 => "tcp6",
            Transport::Unix => "unix",
        }
    }

    /// Whether a resolved address may be used with this transport.
    pub(crate) fn accepts(&self, addr: &SocketAddr) -> bool {
        match self {
            Transport::Tcp => true,
            Transport::Tcp4 => addr.is_ipv4(),
            Transport::Tcp6 => addr.is_ipv6(),
            Transport::Unix => false,
        }
    }
}

impl FromStr for Transport {
    type Err = NetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Transport::Tcp),
            "tcp4" => Ok(Transport::Tcp4),
            "tcp6" => Ok(Transport::Tcp6),
            "unix" => Ok(Transport::Unix),
            other => Err(NetError::UnknownTransport(other.to_string())),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local or remote endpoint of a connected stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketAddress {
    Inet(SocketAddr),
    /// Unix socket path; `None` for unnamed sockets.
    Unix(Option<PathBuf>),
}

impl SocketAddress {
    pub fn as_inet(&self) -> Option<SocketAddr> {
        match self {
            SocketAddress::Inet(addr) => Some(*addr),
            SocketAddress::Unix(_) => None,
        }
    }
}

impl From<SocketAddr> for SocketAddress {
    fn from(addr: SocketAddr) -> Self {
        SocketAddress::Inet(addr)
    }
}

impl fmt::Display for SocketAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketAddress::Inet(addr) => fmt::Display::fmt(addr, f),
            SocketAddress::Unix(Some(path)) => write!(f, "{}", path.display()),
            SocketAddress::Unix(None) => f.write_str("(unnamed)"),
        }
    }
}
