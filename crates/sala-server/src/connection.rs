//! Per-connection I/O tasks.
//!
//! Each accepted stream is split in two:
//!
//! - a reader task that reads into a fixed-size buffer and forwards every
//!   chunk to the event loop as [`ServerEvent::BytesReceived`]
//! - a writer task that drains a bounded, ordered queue of encoded lines
//!
//! Neither task touches chat state. Both report the end of the connection
//! (end of stream, read error, write error or timeout) as
//! [`ServerEvent::ConnectionClosed`] and let the event loop tear down.
//!
//! A peer that stops reading eventually fills its socket buffer. The writer
//! then gives up after [`ConnectionConfig::write_timeout`], and the event
//! loop gives up as soon as the queue is full, so a stalled peer never holds
//! more than [`ConnectionConfig::outbound_capacity`] lines.

use std::{net::SocketAddr, time::Duration};

use bytes::{Bytes, BytesMut};
use sala_core::{ServerEvent, SessionId};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
    time::timeout,
};

/// Size of the reusable read buffer.
pub(crate) const READ_BUFFER_SIZE: usize = 16 * 1024;

/// Per-connection output limits.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Lines queued for a peer before it counts as stalled
    pub outbound_capacity: usize,
    /// Longest a single line write may block
    pub write_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self { outbound_capacity: 1024, write_timeout: Duration::from_secs(30) }
    }
}

/// Why a line could not be queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SendFailure {
    /// Queue full: the peer is not keeping up
    Stalled,
    /// Writer task has already exited
    WriterGone,
}

/// Event loop's handle on a live connection.
pub(crate) struct ConnectionHandle {
    /// Ordered outbound queue drained by the writer task
    outbound: mpsc::Sender<Bytes>,
    /// Reader task, aborted on close
    reader: JoinHandle<()>,
    peer: SocketAddr,
}

impl ConnectionHandle {
    /// Queue an encoded line without waiting.
    pub(crate) fn send(&self, line: Bytes) -> Result<(), SendFailure> {
        self.outbound.try_send(line).map_err(|e| match e {
            TrySendError::Full(_) => SendFailure::Stalled,
            TrySendError::Closed(_) => SendFailure::WriterGone,
        })
    }

    pub(crate) fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Stop reading and let the writer flush what is queued, then close.
    pub(crate) fn close(self) {
        self.reader.abort();
        // Dropping the sender ends the writer's queue
        drop(self.outbound);
    }
}

/// Split `stream` and spawn its reader and writer tasks.
pub(crate) fn spawn<S>(
    session_id: SessionId,
    stream: S,
    peer: SocketAddr,
    config: &ConnectionConfig,
    events: mpsc::Sender<ServerEvent>,
) -> ConnectionHandle
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let (outbound, queue) = mpsc::channel(config.outbound_capacity.max(1));

    let reader = tokio::spawn(read_loop(session_id, read_half, events.clone()));
    tokio::spawn(write_loop(session_id, write_half, queue, config.write_timeout, events));

    ConnectionHandle { outbound, reader, peer }
}

async fn read_loop<R>(session_id: SessionId, mut reader: R, events: mpsc::Sender<ServerEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::zeroed(READ_BUFFER_SIZE);

    let reason = loop {
        match reader.read(&mut buf[..]).await {
            Ok(0) => break "peer closed connection".to_string(),
            Ok(n) => {
                let data = Bytes::copy_from_slice(&buf[..n]);
                if events.send(ServerEvent::BytesReceived { session_id, data }).await.is_err() {
                    return;
                }
            },
            Err(e) => break format!("read failed: {e}"),
        }
    };

    tracing::debug!(session_id, "Reader stopped: {}", reason);
    let _ = events.send(ServerEvent::ConnectionClosed { session_id, reason }).await;
}

async fn write_loop<W>(
    session_id: SessionId,
    mut writer: W,
    mut queue: mpsc::Receiver<Bytes>,
    write_timeout: Duration,
    events: mpsc::Sender<ServerEvent>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = queue.recv().await {
        let reason = match timeout(write_timeout, writer.write_all(&line)).await {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => format!("write failed: {e}"),
            Err(_) => "write timed out".to_string(),
        };

        tracing::debug!(session_id, "Writer stopped: {}", reason);
        let _ = events.send(ServerEvent::ConnectionClosed { session_id, reason }).await;
        return;
    }

    // Queue closed by the event loop: everything queued has been written
    match timeout(write_timeout, writer.shutdown()).await {
        Ok(Ok(())) => {},
        Ok(Err(e)) => tracing::debug!(session_id, "Shutdown failed: {}", e),
        Err(_) => tracing::debug!(session_id, "Shutdown timed out"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEER: &str = "127.0.0.1:4000";

    fn closed_reason(event: Option<ServerEvent>) -> String {
        match event {
            Some(ServerEvent::ConnectionClosed { session_id: 7, reason }) => reason,
            other => panic!("expected close of session 7, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn write_to_a_peer_that_never_reads_times_out() {
        // Peer end stays open but its 64-byte buffer is never drained
        let (stream, _peer) = tokio::io::duplex(64);
        let (events_tx, mut events) = mpsc::channel(4);
        let (outbound, queue) = mpsc::channel(4);

        outbound.send(Bytes::from(vec![b'x'; 256])).await.unwrap();
        tokio::spawn(write_loop(7, stream, queue, Duration::from_millis(50), events_tx));

        let event = timeout(Duration::from_secs(5), events.recv()).await.unwrap();
        assert_eq!(closed_reason(event), "write timed out");
    }

    #[tokio::test]
    async fn write_to_a_vanished_peer_fails() {
        let (stream, peer) = tokio::io::duplex(64);
        drop(peer);
        let (events_tx, mut events) = mpsc::channel(4);
        let (outbound, queue) = mpsc::channel(4);

        outbound.send(Bytes::from_static(b"OK\n")).await.unwrap();
        tokio::spawn(write_loop(7, stream, queue, Duration::from_secs(5), events_tx));

        let event = timeout(Duration::from_secs(5), events.recv()).await.unwrap();
        assert!(closed_reason(event).starts_with("write failed"));
    }

    #[tokio::test]
    async fn full_queue_reports_stalled() {
        let (stream, _peer) = tokio::io::duplex(64);
        let (events_tx, _events) = mpsc::channel(4);
        let config = ConnectionConfig { outbound_capacity: 1, write_timeout: Duration::from_secs(5) };
        let handle = spawn(7, stream, PEER.parse().unwrap(), &config, events_tx);

        // No await in between: the writer has not taken anything yet
        let line = Bytes::from_static(b"MESSAGE alice hi\n");
        assert_eq!(handle.send(line.clone()), Ok(()));
        assert_eq!(handle.send(line), Err(SendFailure::Stalled));
    }

    #[tokio::test]
    async fn closed_writer_reports_gone() {
        let (stream, peer) = tokio::io::duplex(64);
        drop(peer);
        let (events_tx, mut events) = mpsc::channel(4);
        let handle = spawn(7, stream, PEER.parse().unwrap(), &ConnectionConfig::default(), events_tx);

        // Reader sees end of stream; then a failed write stops the writer
        assert_eq!(closed_reason(events.recv().await), "peer closed connection");
        assert_eq!(handle.send(Bytes::from_static(b"OK\n")), Ok(()));
        assert!(closed_reason(events.recv().await).starts_with("write failed"));
        assert_eq!(handle.send(Bytes::from_static(b"OK\n")), Err(SendFailure::WriterGone));
    }
}
