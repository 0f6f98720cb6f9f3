//! Pool and dialer configuration.

use crate::socket::connectjob::Connect;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Settings for the real dial performed on a cache miss.
#[derive(Clone)]
pub struct DialConfig {
    /// Upper bound for a single dial, DNS lookup included.
    pub timeout: Option<Duration>,
    /// TCP keepalive idle time; `None` leaves keepalive off.
    pub keepalive: Option<Duration>,
    /// Set `TCP_NODELAY` on new TCP connections.
    pub nodelay: bool,
    /// Local address to bind before connecting.
    pub local_addr: Option<SocketAddr>,
    connector: Option<Arc<dyn Connect>>,
}

impl Default for DialConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            keepalive: Some(Duration::from_secs(15)),
            nodelay: true,
            local_addr: None,
            connector: None,
        }
    }
}

impl fmt::Debug for DialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialConfig")
            .field("timeout", &self.timeout)
            .field("keepalive", &self.keepalive)
            .field("nodelay", &self.nodelay)
            .field("local_addr", &self.local_addr)
            .field("custom_connector", &self.connector.is_some())
            .finish()
    }
}

impl DialConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn keepalive(mut self, keepalive: Option<Duration>) -> Self {
        self.keepalive = keepalive;
        self
    }

    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    pub fn local_addr(mut self, addr: SocketAddr) -> Self {
        self.local_addr = Some(addr);
        self
    }

    /// Replace the built-in TCP/Unix dialer. The other settings are ignored
    /// by custom connectors except `timeout`.
    pub fn connector<C: Connect + 'static>(mut self, connector: C) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    pub(crate) fn custom_connector(&self) -> Option<&Arc<dyn Connect>> {
        self.connector.as_ref()
    }
}

/// Configuration for a [`ClientSocketPool`](crate::socket::pool::ClientSocketPool).
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum idle connections retained per (transport, address). Closing
    /// a connection beyond this really closes it; `0` disables retention.
    pub max_idle_per_key: usize,
    /// Age after which an idle connection is discarded instead of reused.
    /// `Duration::ZERO` disables expiry.
    pub max_lifetime: Duration,
    pub dial: DialConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_key: 2,
            max_lifetime: Duration::from_secs(1),
            dial: DialConfig::default(),
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_idle_per_key(mut self, max: usize) -> Self {
        self.max_idle_per_key = max;
        self
    }

    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    pub fn dial_config(mut self, dial: DialConfig) -> Self {
        self.dial = dial;
        self
    }
}
