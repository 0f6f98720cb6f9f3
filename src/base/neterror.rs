use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Errors produced by dialing through a [`ClientSocketPool`].
///
/// Transport failures are never reclassified: an [`io::Error`] raised by the
/// underlying dial is carried unchanged in [`NetError::Io`], with its kind and
/// message intact.
///
/// [`ClientSocketPool`]: crate::socket::pool::ClientSocketPool
#[derive(Debug, Error, Clone)]
pub enum NetError {
    #[error("Unknown transport: {0}")]
    UnknownTransport(String),
    #[error("Address invalid: {0}")]
    AddressInvalid(String),
    #[error("Name not resolved: {0}")]
    NameNotResolved(String),
    #[error("Connection timed out")]
    ConnectionTimedOut,
    #[error("Connection aborted")]
    ConnectionAborted,
    #[error(transparent)]
    Io(Arc<io::Error>),
}

impl NetError {
    /// Chromium `net_error_list.h` code for this error, for logging.
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::UnknownTransport(_) => -302,
            NetError::AddressInvalid(_) => -108,
            NetError::NameNotResolved(_) => -105,
            NetError::ConnectionTimedOut => -118,
            NetError::ConnectionAborted => -103,
            NetError::Io(e) => match e.kind() {
                io::ErrorKind::ConnectionReset => -101,
                io::ErrorKind::ConnectionRefused => -102,
                io::ErrorKind::ConnectionAborted => -103,
                io::ErrorKind::NotConnected => -112,
                io::ErrorKind::AddrInUse => -147,
                io::ErrorKind::AddrNotAvailable => -108,
                io::ErrorKind::TimedOut => -118,
                _ => -2,
            },
        }
    }

    /// The underlying I/O error, if this failure came from the transport.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            NetError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for NetError {
    fn from(e: io::Error) -> Self {
        NetError::Io(Arc::new(e))
    }
}

impl From<NetError> for io::Error {
    fn from(e: NetError) -> Self {
        match e {
            NetError::Io(inner) => Arc::try_unwrap(inner)
                .unwrap_or_else(|shared| io::Error::new(shared.kind(), shared.to_string())),
            NetError::UnknownTransport(_) => io::Error::new(io::ErrorKind::Unsupported, e),
            NetError::AddressInvalid(_) => io::Error::new(io::ErrorKind::InvalidInput, e),
            NetError::NameNotResolved(_) => io::Error::new(io::ErrorKind::NotFound, e),
            NetError::ConnectionTimedOut => io::Error::new(io::ErrorKind::TimedOut, e),
            NetError::ConnectionAborted => io::Error::new(io::ErrorKind::ConnectionAborted, e),
        }
    }
}
