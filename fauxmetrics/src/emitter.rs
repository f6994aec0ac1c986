//! The shared emission channel.
//!
//! Every generator funnels its observations through one [`Emitter`]. The
//! emitter owns the UDP socket and the console, both behind a single lock, so
//! that the datagram send and the console line for one observation happen as
//! a unit with respect to every other observation. A stuck send blocks every
//! other generator; payloads are small and UDP does not wait on the peer, so
//! this is accepted.

use std::{
    fmt,
    io::{self, Write},
    net::{Ipv4Addr, Ipv6Addr, SocketAddr},
    sync::Arc,
};

use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};
use tokio::{net::UdpSocket, sync::Mutex};
use tracing::{debug, trace};

use crate::metric::Observation;

/// `asctime` layout, e.g. `Sun Oct 18 09:05:01 2026`.
const ASCTIME: &[BorrowedFormatItem<'static>] = format_description!(
    "[weekday repr:short] [month repr:short] [day padding:space] [hour]:[minute]:[second] [year]"
);

/// Errors produced by [`Emitter`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Binding the local UDP socket failed.
    #[error("Failed to bind UDP socket for {addr}: {source}")]
    Bind {
        /// Destination the socket was meant for
        addr: SocketAddr,
        /// Underlying IO error
        #[source]
        source: Box<io::Error>,
    },
    /// Sending a datagram failed.
    #[error("Failed to send to {addr}: {source}")]
    Send {
        /// Destination address
        addr: SocketAddr,
        /// Underlying IO error
        #[source]
        source: Box<io::Error>,
    },
    /// Writing the console line failed.
    #[error("Failed to write console line: {0}")]
    Console(#[source] io::Error),
    /// Timestamp formatting failed.
    #[error("Failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

struct Channel {
    socket: UdpSocket,
    console: Box<dyn Write + Send>,
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("socket", &self.socket)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
/// Handle on the process-wide emission channel.
///
/// Cloning is cheap and every clone shares the same socket, console and lock.
pub struct Emitter {
    addr: SocketAddr,
    channel: Arc<Mutex<Channel>>,
}

impl Emitter {
    /// Bind a fresh UDP socket and emit to `addr`, echoing to stdout.
    ///
    /// # Errors
    ///
    /// Function will return an error if the local socket cannot be bound.
    pub async fn bind(addr: SocketAddr) -> Result<Self, Error> {
        let socket = bind_for(addr).await?;
        Ok(Self::with_socket(socket, addr, Box::new(io::stdout())))
    }

    /// Create an [`Emitter`] over an already bound socket and an arbitrary
    /// console.
    #[must_use]
    pub fn with_socket(socket: UdpSocket, addr: SocketAddr, console: Box<dyn Write + Send>) -> Self {
        Self {
            addr,
            channel: Arc::new(Mutex::new(Channel { socket, console })),
        }
    }

    /// Bind a fresh UDP socket and emit to `addr`, echoing to `console`.
    ///
    /// # Errors
    ///
    /// Function will return an error if the local socket cannot be bound.
    pub async fn bind_with_console(
        addr: SocketAddr,
        console: Box<dyn Write + Send>,
    ) -> Result<Self, Error> {
        let socket = bind_for(addr).await?;
        Ok(Self::with_socket(socket, addr, console))
    }

    /// The destination of every datagram.
    #[must_use]
    pub fn destination(&self) -> SocketAddr {
        self.addr
    }

    /// Send `observation` as one datagram and echo it to the console,
    /// returning the number of bytes sent.
    ///
    /// The lock is held from serialization through the console write. There
    /// is no retry and no acknowledgement.
    ///
    /// # Errors
    ///
    /// Function will return an error if the datagram cannot be sent or the
    /// console cannot be written. Neither is retried.
    pub async fn emit(&self, observation: &Observation) -> Result<usize, Error> {
        let mut channel = self.channel.lock().await;

        let line = observation.to_string();
        let bytes = channel
            .socket
            .send_to(line.as_bytes(), self.addr)
            .await
            .map_err(|source| {
                debug!("write failed: {}", source);
                Error::Send {
                    addr: self.addr,
                    source: Box::new(source),
                }
            })?;
        trace!("sent {bytes} bytes to {addr}", addr = self.addr);

        let now = OffsetDateTime::now_utc().format(ASCTIME)?;
        writeln!(channel.console, "{now}: {line}")
            .and_then(|()| channel.console.flush())
            .map_err(Error::Console)?;

        Ok(bytes)
    }
}

async fn bind_for(addr: SocketAddr) -> Result<UdpSocket, Error> {
    let local: SocketAddr = if addr.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(local).await.map_err(|source| Error::Bind {
        addr,
        source: Box::new(source),
    })?;
    debug!("UDP port bound for {addr}");
    Ok(socket)
}
