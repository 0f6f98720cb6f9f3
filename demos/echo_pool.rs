//! Dial, close and reuse against a local echo server.
//!
//! Run with `RUST_LOG=connpool=debug` to see the pool's decisions.

use connpool::{ClientSocketPool, PoolConfig, Transport};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Local echo server
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?.to_string();
    tokio::spawn(async move {
        while let Ok((mut stream, peer)) = listener.accept().await {
            println!("server: accepted {}", peer);
            tokio::spawn(async move {
                let (mut rd, mut wr) = stream.split();
                let _ = tokio::io::copy(&mut rd, &mut wr).await;
            });
        }
    });

    let pool = ClientSocketPool::new(PoolConfig::new().max_lifetime(Duration::from_secs(30)));

    for round in 1..=3 {
        let mut conn = pool.dial(Transport::Tcp, &addr).await?;
        conn.write_all(b"hello").await?;
        let mut buf = [0u8; 5];
        conn.read_exact(&mut buf).await?;

        println!(
            "round {}: local={} reused={} echo={:?}",
            round,
            conn.local_addr()?,
            conn.is_reused(),
            String::from_utf8_lossy(&buf)
        );
        conn.close()?;
    }

    println!("idle connections: {}", pool.idle_count());
    pool.shutdown();
    println!("after shutdown: {}", pool.idle_count());

    Ok(())
}
