//! Echo servers shared by the integration tests.
//!
//! Every accepted connection is a session: bytes are echoed back as they
//! arrive. A chunk that is exactly `reset` ends the session abruptly (a TCP
//! RST where the transport allows it). The server counts accepted and ended
//! sessions so tests can observe whether the pool reused a transport.

#![allow(dead_code)]

use socket2::SockRef;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const RESET: &[u8] = b"reset";

#[derive(Default)]
struct Sessions {
    accepted: AtomicUsize,
    ended: AtomicUsize,
}

enum SessionEnd {
    Eof,
    ResetRequested,
}

async fn echo<S: AsyncRead + AsyncWrite + Unpin>(stream: &mut S) -> std::io::Result<SessionEnd> {
    let mut buf = vec![0u8; 16 * 1024];
    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(SessionEnd::Eof);
        }
        if &buf[..n] == RESET {
            return Ok(SessionEnd::ResetRequested);
        }
        stream.write_all(&buf[..n]).await?;
    }
}

pub struct EchoServer {
    pub addr: String,
    sessions: Arc<Sessions>,
    handle: JoinHandle<()>,
}

impl EchoServer {
    pub async fn tcp() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let sessions = Arc::new(Sessions::default());

        let counters = Arc::clone(&sessions);
        let handle = tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                counters.accepted.fetch_add(1, Ordering::SeqCst);
                let counters = Arc::clone(&counters);
                tokio::spawn(async move {
                    if let Ok(SessionEnd::ResetRequested) = echo(&mut stream).await {
                        let _ = SockRef::from(&stream).set_linger(Some(Duration::ZERO));
                    }
                    drop(stream);
                    counters.ended.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        Self { addr: addr.to_string(), sessions, handle }
    }

    #[cfg(unix)]
    pub async fn unix(path: &std::path::Path) -> Self {
        let listener = tokio::net::UnixListener::bind(path).unwrap();
        let sessions = Arc::new(Sessions::default());

        let counters = Arc::clone(&sessions);
        let handle = tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                counters.accepted.fetch_add(1, Ordering::SeqCst);
                let counters = Arc::clone(&counters);
                tokio::spawn(async move {
                    let _ = echo(&mut stream).await;
                    drop(stream);
                    counters.ended.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        Self { addr: path.to_str().unwrap().to_string(), sessions, handle }
    }

    /// Transports accepted so far.
    pub fn accepted(&self) -> usize {
        self.sessions.accepted.load(Ordering::SeqCst)
    }

    /// Sessions whose connection has gone away.
    pub fn ended(&self) -> usize {
        self.sessions.ended.load(Ordering::SeqCst)
    }

    /// Wait until `count` sessions have ended, or panic after two seconds.
    pub async fn wait_ended(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.ended() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("sessions did not end in time");
    }
}

impl Drop for EchoServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
