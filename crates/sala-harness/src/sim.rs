//! Production server over turmoil's simulated network.
//!
//! [`serve`] runs the real [`Server`] event loop, connection tasks included,
//! on a turmoil host. [`SimClient`] is a line-oriented client for turmoil
//! client hosts. Simulated time keeps timeouts deterministic.

use std::{future::Future, io, net::SocketAddr, time::Duration};

use sala_core::DriverConfig;
use sala_proto::{Reply, escape_outgoing};
use sala_server::{Listener, Server};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, ReadHalf, WriteHalf};
use turmoil::net::{TcpListener, TcpStream};

/// How long [`SimClient::recv`] waits before giving up.
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Turmoil listener usable by [`Server`].
pub struct SimListener(TcpListener);

impl SimListener {
    /// Bind on the current turmoil host.
    pub async fn bind(port: u16) -> io::Result<Self> {
        let addr = format!("0.0.0.0:{port}");
        Ok(Self(TcpListener::bind(addr.as_str()).await?))
    }
}

impl Listener for SimListener {
    type Stream = TcpStream;

    fn accept(&self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        self.0.accept()
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.0.local_addr()
    }
}

/// Run the chat server on the current turmoil host.
///
/// Meant as the body of `sim.host(..)`; never returns unless binding fails.
pub async fn serve(port: u16, config: DriverConfig) -> turmoil::Result {
    let listener = SimListener::bind(port).await?;
    Server::with_listener(listener, config).run().await?;
    Ok(())
}

/// Line-oriented chat client for turmoil client hosts.
pub struct SimClient {
    name: String,
    lines: Lines<BufReader<ReadHalf<TcpStream>>>,
    writer: WriteHalf<TcpStream>,
}

impl SimClient {
    /// Connect to `addr` (e.g. `"server:7777"`). `name` only labels logs.
    pub async fn connect(name: &str, addr: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (read, writer) = tokio::io::split(stream);
        Ok(Self { name: name.to_owned(), lines: BufReader::new(read).lines(), writer })
    }

    /// Send one raw line; a newline is appended.
    pub async fn send(&mut self, line: &str) -> io::Result<()> {
        tracing::debug!(client = %self.name, "> {}", line);
        self.writer.write_all(format!("{line}\n").as_bytes()).await
    }

    /// Send room text, escaping a leading `/`.
    pub async fn send_text(&mut self, text: &str) -> io::Result<()> {
        let line = escape_outgoing(text);
        self.send(&line).await
    }

    /// Send a line and return the first reply.
    pub async fn call(&mut self, line: &str) -> io::Result<Reply> {
        self.send(line).await?;
        self.recv().await
    }

    /// Next server line, parsed.
    ///
    /// # Errors
    ///
    /// `TimedOut` if nothing arrives in time, `UnexpectedEof` if the server
    /// closed the connection, `InvalidData` for an unparseable line.
    pub async fn recv(&mut self) -> io::Result<Reply> {
        let line = tokio::time::timeout(RECV_TIMEOUT, self.lines.next_line())
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "no line from server"))??
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "server closed"))?;

        tracing::debug!(client = %self.name, "< {}", line);
        line.parse::<Reply>().map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Wait for the server to close the connection.
    ///
    /// # Errors
    ///
    /// `InvalidData` if a line arrives instead.
    pub async fn expect_closed(&mut self) -> io::Result<()> {
        let next = tokio::time::timeout(RECV_TIMEOUT, self.lines.next_line())
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connection still open"))?;
        match next {
            Ok(None) | Err(_) => Ok(()),
            Ok(Some(line)) => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("expected close, got {line:?}"),
            )),
        }
    }

    /// Close the write side, as a peer hanging up would.
    pub async fn hang_up(mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }
}
