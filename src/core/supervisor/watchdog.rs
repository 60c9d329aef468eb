// ─── Crash Test Watchdog ───
// Polls the server port until it accepts a connection or attempts run out.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};

/// Opens a connection to the server under test.
#[async_trait]
pub trait ConnectProbe: Send + Sync {
    type Conn: Send;

    async fn connect(&self, addr: SocketAddr) -> io::Result<Self::Conn>;
}

/// Plain TCP connect.
pub struct TcpProbe;

#[async_trait]
impl ConnectProbe for TcpProbe {
    type Conn = TcpStream;

    async fn connect(&self, addr: SocketAddr) -> io::Result<TcpStream> {
        TcpStream::connect(addr).await
    }
}

#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    pub addr: SocketAddr,
    /// Servers need at least this long before the port can be open.
    pub initial_delay: Duration,
    pub max_attempts: u32,
    pub connect_timeout: Duration,
    /// Time given to the server after the port opened.
    pub settle_delay: Duration,
    pub retry_delay: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 25565)),
            initial_delay: Duration::from_millis(500),
            max_attempts: 30,
            connect_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_secs(3),
            retry_delay: Duration::from_secs(3),
        }
    }
}

/// Wait for the server to accept a connection.
///
/// Returns the attempt that succeeded, or `CrashTestFailed` carrying the last
/// connect error once every attempt failed.
pub async fn run_crash_test<P: ConnectProbe>(
    probe: &P,
    config: &WatchdogConfig,
) -> LauncherResult<u32> {
    tokio::time::sleep(config.initial_delay).await;

    let mut last_error = None;
    for attempt in 1..=config.max_attempts {
        let connect = probe.connect(config.addr);
        let result = match tokio::time::timeout(config.connect_timeout, connect).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("no answer within {:?}", config.connect_timeout),
            )),
        };

        match result {
            Ok(conn) => {
                info!("Crash test: server accepted a connection (attempt {})", attempt);
                tokio::time::sleep(config.settle_delay).await;
                drop(conn);
                return Ok(attempt);
            }
            Err(err) => {
                debug!("Crash test attempt {}/{} failed: {}", attempt, config.max_attempts, err);
                last_error = Some(err);
                if attempt < config.max_attempts {
                    tokio::time::sleep(config.retry_delay).await;
                }
            }
        }
    }

    Err(LauncherError::CrashTestFailed {
        attempts: config.max_attempts,
        source: last_error
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "no connection attempts")),
    })
}
