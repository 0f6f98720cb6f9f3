use crate::base::neterror::NetError;
use crate::socket::address::Transport;
use crate::socket::config::PoolConfig;
use crate::socket::connectjob::ConnectJob;
use crate::socket::stream::PooledSocket;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Identifies a connection group (transport, address).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupId {
    transport: Transport,
    address: Box<str>,
}

impl GroupId {
    pub fn new(transport: Transport, address: impl Into<Box<str>>) -> Self {
        Self { transport, address: address.into() }
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.transport, self.address)
    }
}

/// Everything guarded by the pool lock.
#[derive(Default)]
struct PoolState {
    idle: HashMap<GroupId, VecDeque<PooledSocket>>,
    closed: bool,
}

impl PoolState {
    /// Accept a closing socket into the idle cache, or hand it back for a
    /// real close.
    fn admit(&mut self, config: &PoolConfig, mut socket: PooledSocket) -> Result<(), PooledSocket> {
        let held = self.idle.get(socket.group()).map_or(0, VecDeque::len);
        let refusal = if self.closed {
            Some("pool closed")
        } else if socket.is_broken() {
            Some("broken")
        } else if socket.expired(config.max_lifetime) {
            Some("expired")
        } else if held >= config.max_idle_per_key {
            Some("idle limit reached")
        } else {
            None
        };

        if let Some(reason) = refusal {
            tracing::debug!(group = %socket.group(), reason, "socket not admitted to idle cache");
            return Err(socket);
        }

        socket.mark_idle();
        tracing::trace!(group = %socket.group(), idle = held + 1, "socket returned to idle cache");
        self.idle.entry(socket.group().clone()).or_default().push_back(socket);
        Ok(())
    }

    /// Take the oldest healthy idle socket for `group`. Expired and broken
    /// entries ahead of it are moved to `discarded`.
    fn lookup(
        &mut self,
        group: &GroupId,
        max_lifetime: Duration,
        discarded: &mut Vec<PooledSocket>,
    ) -> Option<PooledSocket> {
        let idle = self.idle.get_mut(group)?;

        let mut found = None;
        while let Some(mut socket) = idle.pop_front() {
            if socket.expired(max_lifetime) || socket.is_broken() {
                discarded.push(socket);
                continue;
            }
            socket.mark_in_use();
            found = Some(socket);
            break;
        }

        if idle.is_empty() {
            self.idle.remove(group);
        }
        found
    }
}

pub(crate) struct PoolShared {
    config: PoolConfig,
    state: Mutex<PoolState>,
}

impl PoolShared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Close path of a leased socket.
    pub(crate) fn release(&self, socket: PooledSocket) -> io::Result<()> {
        let refused = {
            let mut state = self.lock();
            state.admit(&self.config, socket).err()
        };
        match refused {
            None => Ok(()),
            Some(socket) => socket.close_explicit(),
        }
    }
}

impl Drop for PoolShared {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        for socket in state.idle.drain().flat_map(|(_, idle)| idle) {
            let _ = socket.close_explicit();
        }
    }
}

/// Caches idle connections per (transport, address) and dials on a miss.
///
/// Cloning is cheap; clones share one cache. Idle connections are only
/// checked for age and health when their key is dialed again or the pool is
/// shut down; there is no background sweep.
#[derive(Clone)]
pub struct ClientSocketPool {
    shared: Arc<PoolShared>,
}

impl fmt::Debug for ClientSocketPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSocketPool")
            .field("config", &self.shared.config)
            .field("idle_count", &self.idle_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Default for ClientSocketPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl ClientSocketPool {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            shared: Arc::new(PoolShared { config, state: Mutex::new(PoolState::default()) }),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Get a connection to `address`, reusing an idle one when possible.
    pub async fn dial(&self, transport: Transport, address: &str) -> Result<PooledSocket, NetError> {
        self.dial_until(transport, address, std::future::pending()).await
    }

    /// Like [`dial`](Self::dial), but a fresh dial is abandoned with
    /// [`NetError::ConnectionAborted`] once `token` is cancelled. A cache hit
    /// is returned regardless of the token.
    pub async fn dial_with_cancellation(
        &self,
        token: &CancellationToken,
        transport: Transport,
        address: &str,
    ) -> Result<PooledSocket, NetError> {
        let cancelled = async {
            token.cancelled().await;
            NetError::ConnectionAborted
        };
        self.dial_until(transport, address, cancelled).await
    }

    /// Like [`dial`](Self::dial), but a fresh dial is abandoned with
    /// [`NetError::ConnectionTimedOut`] after `timeout`.
    pub async fn dial_timeout(
        &self,
        timeout: Duration,
        transport: Transport,
        address: &str,
    ) -> Result<PooledSocket, NetError> {
        let elapsed = async move {
            tokio::time::sleep(timeout).await;
            NetError::ConnectionTimedOut
        };
        self.dial_until(transport, address, elapsed).await
    }

    async fn dial_until<F>(
        &self,
        transport: Transport,
        address: &str,
        interrupted: F,
    ) -> Result<PooledSocket, NetError>
    where
        F: Future<Output = NetError>,
    {
        let group = GroupId::new(transport, address);

        // 1. Check for idle socket
        if let Some(socket) = self.take_idle(&group) {
            tracing::debug!(group = %group, reuse_count = socket.reuse_count(), "reusing idle socket");
            return Ok(socket);
        }

        // 2. Create new connection, lock released
        let connect = ConnectJob::connect(&self.shared.config.dial, transport, address);
        let raw = tokio::select! {
            biased;
            err = interrupted => {
                tracing::debug!(group = %group, error = %err, "dial interrupted");
                return Err(err);
            }
            result = connect => result.map_err(|e| {
                tracing::debug!(group = %group, error = %e, "dial failed");
                e
            })?,
        };

        tracing::debug!(group = %group, "dialed new socket");
        Ok(PooledSocket::new(Arc::downgrade(&self.shared), raw, group))
    }

    fn take_idle(&self, group: &GroupId) -> Option<PooledSocket> {
        let max_lifetime = self.shared.config.max_lifetime;
        let mut discarded = Vec::new();
        let found = {
            let mut state = self.shared.lock();
            state.lookup(group, max_lifetime, &mut discarded)
        };

        for socket in discarded {
            tracing::debug!(
                group = %group,
                broken = socket.is_broken(),
                expired = socket.expired(max_lifetime),
                "discarding idle socket"
            );
            let _ = socket.close_explicit();
        }
        found
    }

    /// Close the pool: every idle connection is really closed, and
    /// connections closed later are no longer admitted. Always succeeds.
    pub fn shutdown(&self) {
        let drained = {
            let mut state = self.shared.lock();
            state.closed = true;
            std::mem::take(&mut state.idle)
        };

        let count: usize = drained.values().map(VecDeque::len).sum();
        tracing::debug!(count, "pool shut down, closing idle sockets");
        for socket in drained.into_values().flatten() {
            // Refused admission now that the pool is closed: a real close.
            let _ = socket.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Get total idle socket count across all groups.
    pub fn idle_count(&self) -> usize {
        self.shared.lock().idle.values().map(VecDeque::len).sum()
    }

    /// Get idle socket count for one (transport, address).
    pub fn idle_count_for(&self, transport: Transport, address: &str) -> usize {
        let group = GroupId::new(transport, address);
        self.shared.lock().idle.get(&group).map_or(0, VecDeque::len)
    }
}
