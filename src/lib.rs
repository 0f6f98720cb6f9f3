//! # connpool
//!
//! A client-side outbound connection pool for Tokio.
//!
//! `connpool` keeps healthy connections idle after they are closed, keyed by
//! (transport, address), and hands them back out on the next dial instead of
//! paying for a new connect. A miss falls back to a real dial.
//!
//! ## Features
//!
//! - **Lazy eviction**: connections older than the configured lifetime, or
//!   that ever saw an I/O error, are discarded when their key is next dialed
//! - **Transparent close**: closing a [`PooledSocket`] returns it to the pool
//!   when it is healthy and the pool is open, and really closes it otherwise
//! - **Cancellation**: fresh dials honor a `CancellationToken` or a timeout
//! - **Transports**: TCP (`tcp`, `tcp4`, `tcp6`) and Unix domain sockets,
//!   or any stream through a custom [`Connect`](socket::connectjob::Connect)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use connpool::{ClientSocketPool, PoolConfig, Transport};
//! use tokio::io::{AsyncReadExt, AsyncWriteExt};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = ClientSocketPool::new(PoolConfig::default());
//!
//! let mut conn = pool.dial(Transport::Tcp, "127.0.0.1:7000").await?;
//! conn.write_all(b"ping").await?;
//! let mut buf = [0u8; 4];
//! conn.read_exact(&mut buf).await?;
//! conn.close()?; // back to the idle cache
//!
//! let again = pool.dial(Transport::Tcp, "127.0.0.1:7000").await?;
//! assert!(again.is_reused());
//!
//! pool.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error definitions
//! - [`socket`] - Pool, pooled connection, dialer and stream abstraction

pub mod base;
pub mod socket;

pub use base::neterror::NetError;
pub use socket::address::{SocketAddress, Transport};
pub use socket::client::{HalfClose, StreamSocket};
pub use socket::config::{DialConfig, PoolConfig};
pub use socket::pool::{ClientSocketPool, GroupId};
pub use socket::stream::PooledSocket;
