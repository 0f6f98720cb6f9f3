//! Pooled connection wrapper.
//!
//! A [`PooledSocket`] owns one raw [`StreamSocket`] while it is leased. Every
//! failed operation marks it broken, which keeps it out of the idle cache for
//! good. Closing hands it back to the pool it was dialed from; the pool
//! either keeps it idle or really closes it.

use crate::socket::address::SocketAddress;
use crate::socket::client::{HalfClose, StreamSocket};
use crate::socket::pool::{GroupId, PoolShared};
use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Weak;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::{Instant, Sleep};

/// An I/O deadline. The timer is armed lazily, on the first poll after the
/// deadline is set, so setting one does not need a runtime.
#[derive(Default)]
struct Deadline {
    at: Option<Instant>,
    timer: Option<Pin<Box<Sleep>>>,
}

impl Deadline {
    fn set(&mut self, at: Option<Instant>) {
        self.at = at;
        self.timer = None;
    }

    fn poll_elapsed(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        let Some(at) = self.at else {
            return Poll::Pending;
        };
        let timer = self.timer.get_or_insert_with(|| Box::pin(tokio::time::sleep_until(at)));
        timer.as_mut().poll(cx)
    }
}

/// A connection leased from a [`ClientSocketPool`].
///
/// Implements [`AsyncRead`] and [`AsyncWrite`]; use the `tokio::io`
/// extension traits for `read`/`write`. Call [`close`](Self::close) when done
/// so the connection can be recycled. Dropping it instead closes the
/// underlying stream without returning it to the pool.
///
/// [`ClientSocketPool`]: crate::socket::pool::ClientSocketPool
pub struct PooledSocket {
    pool: Weak<PoolShared>,
    socket: Box<dyn StreamSocket>,
    group: GroupId,
    half_close: HalfClose,
    created_at: Instant,

    // Only changed while the pool lock is held.
    in_use: bool,
    returned_at: Option<Instant>,
    reuse_count: u32,

    broken: AtomicBool,
    read_deadline: Deadline,
    write_deadline: Deadline,
}

impl PooledSocket {
    pub(crate) fn new(pool: Weak<PoolShared>, socket: Box<dyn StreamSocket>, group: GroupId) -> Self {
        let half_close = socket.half_close();
        Self {
            pool,
            socket,
            group,
            half_close,
            created_at: Instant::now(),
            in_use: true,
            returned_at: None,
            reuse_count: 0,
            broken: AtomicBool::new(false),
            read_deadline: Deadline::default(),
            write_deadline: Deadline::default(),
        }
    }

    fn mark_broken(&self) {
        self.broken.store(true, Ordering::Release);
    }

    fn check<T>(&self, result: io::Result<T>) -> io::Result<T> {
        if result.is_err() {
            self.mark_broken();
        }
        result
    }

    fn check_poll<T>(&self, poll: Poll<io::Result<T>>) -> Poll<io::Result<T>> {
        if let Poll::Ready(Err(_)) = &poll {
            self.mark_broken();
        }
        poll
    }

    fn deadline_exceeded(&self, direction: &str) -> io::Error {
        self.mark_broken();
        io::Error::new(io::ErrorKind::TimedOut, format!("{} deadline exceeded", direction))
    }

    /// Whether any operation on this connection has failed. Never reset.
    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::Acquire)
    }

    /// Whether the connection is older than `timeout`. A zero timeout never
    /// expires.
    pub fn expired(&self, timeout: Duration) -> bool {
        if timeout.is_zero() {
            return false;
        }
        self.created_at
            .checked_add(timeout)
            .is_some_and(|limit| limit < Instant::now())
    }

    pub(crate) fn mark_in_use(&mut self) {
        self.in_use = true;
        self.reuse_count += 1;
    }

    pub(crate) fn mark_idle(&mut self) {
        self.in_use = false;
        self.returned_at = Some(Instant::now());
        self.read_deadline.set(None);
        self.write_deadline.set(None);
    }

    pub fn is_in_use(&self) -> bool {
        self.in_use
    }

    pub fn group(&self) -> &GroupId {
        &self.group
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// When this connection was last returned to the idle cache.
    pub fn idle_since(&self) -> Option<Instant> {
        self.returned_at
    }

    /// How many times this connection was handed out from the idle cache.
    pub fn reuse_count(&self) -> u32 {
        self.reuse_count
    }

    pub fn is_reused(&self) -> bool {
        self.reuse_count > 0
    }

    pub fn local_addr(&self) -> io::Result<SocketAddress> {
        self.check(self.socket.local_addr())
    }

    /// Fails with `NotConnected` once the peer has reset the connection.
    pub fn peer_addr(&self) -> io::Result<SocketAddress> {
        self.check(self.socket.peer_addr())
    }

    /// Shut down the read direction. A no-op if the stream cannot half-close.
    ///
    /// A half-closed connection is never returned to the idle cache.
    pub fn close_read(&self) -> io::Result<()> {
        if !self.half_close.read {
            return Ok(());
        }
        self.mark_broken();
        self.socket.shutdown_read()
    }

    /// Shut down the write direction. A no-op if the stream cannot half-close.
    ///
    /// A half-closed connection is never returned to the idle cache.
    pub fn close_write(&self) -> io::Result<()> {
        if !self.half_close.write {
            return Ok(());
        }
        self.mark_broken();
        self.socket.shutdown_write()
    }

    /// Set both read and write deadlines. `None` clears them.
    pub fn set_deadline(&mut self, at: Option<Instant>) {
        self.read_deadline.set(at);
        self.write_deadline.set(at);
    }

    pub fn set_read_deadline(&mut self, at: Option<Instant>) {
        self.read_deadline.set(at);
    }

    pub fn set_write_deadline(&mut self, at: Option<Instant>) {
        self.write_deadline.set(at);
    }

    /// Return the connection to its pool, or really close it if the pool
    /// refuses it (pool shut down or dropped, connection broken or expired,
    /// idle limit reached). Only a failing real close returns an error.
    pub fn close(self) -> io::Result<()> {
        match self.pool.upgrade() {
            Some(pool) => pool.release(self),
            None => self.close_explicit(),
        }
    }

    /// Really close the underlying stream, bypassing the pool.
    pub(crate) fn close_explicit(self) -> io::Result<()> {
        tracing::trace!(group = %self.group, broken = self.is_broken(), "closing socket");
        self.socket.close()
    }

    /// Detach the raw stream from the pool for good.
    pub fn into_inner(self) -> Box<dyn StreamSocket> {
        self.socket
    }
}

impl AsyncRead for PooledSocket {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.read_deadline.poll_elapsed(cx).is_ready() {
            return Poll::Ready(Err(this.deadline_exceeded("read")));
        }

        let wanted = buf.remaining();
        let before = buf.filled().len();
        let poll = Pin::new(&mut this.socket).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &poll {
            // End of stream: the peer is gone, never recycle.
            if wanted > 0 && buf.filled().len() == before {
                this.mark_broken();
            }
        }
        this.check_poll(poll)
    }
}

impl AsyncWrite for PooledSocket {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.write_deadline.poll_elapsed(cx).is_ready() {
            return Poll::Ready(Err(this.deadline_exceeded("write")));
        }
        let poll = Pin::new(&mut this.socket).poll_write(cx, buf);
        this.check_poll(poll)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.write_deadline.poll_elapsed(cx).is_ready() {
            return Poll::Ready(Err(this.deadline_exceeded("write")));
        }
        let poll = Pin::new(&mut this.socket).poll_flush(cx);
        this.check_poll(poll)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let poll = Pin::new(&mut this.socket).poll_shutdown(cx);
        // Write side shut: not reusable whatever the outcome.
        if poll.is_ready() {
            this.mark_broken();
        }
        poll
    }
}

impl fmt::Debug for PooledSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledSocket")
            .field("group", &self.group)
            .field("socket", &self.socket)
            .field("in_use", &self.in_use)
            .field("reuse_count", &self.reuse_count)
            .field("broken", &self.is_broken())
            .finish_non_exhaustive()
    }
}
