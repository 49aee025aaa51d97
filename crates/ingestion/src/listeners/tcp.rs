//! TCP listener, records framed by a zero byte

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;

use contracts::{ContractError, Listener, Record, RecordSink};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::{TcpListener as TokioTcpListener, TcpStream};
use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{IngestionError, Result};

const FRAME_TERMINATOR: u8 = 0;

/// Longest accepted frame, terminator excluded. A peer exceeding it is
/// disconnected.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Stream listener
///
/// Every accepted connection gets its own task; the stream is split on
/// `0x00` and empty frames are skipped. Frames longer than
/// [`MAX_FRAME_LEN`] close the connection.
pub struct TcpListener {
    name: String,
    listener: TokioTcpListener,
}

impl TcpListener {
    /// Bind to `addr` (`host:port`)
    #[instrument(name = "tcp_listener_bind")]
    pub async fn bind(addr: &str) -> Result<Self> {
        let name = format!("tcp://{addr}");
        let listener = TokioTcpListener::bind(addr)
            .await
            .map_err(|e| IngestionError::bind(&name, e))?;
        info!(listener = %name, local_addr = ?listener.local_addr().ok(), "TCP listener bound");

        Ok(Self { name, listener })
    }

    /// Bound address
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Listener for TcpListener {
    fn name(&self) -> &str {
        &self.name
    }

    async fn listen(
        &mut self,
        sink: RecordSink,
        shutdown: CancellationToken,
    ) -> std::result::Result<(), ContractError> {
        let mut connections = JoinSet::new();
        let mut peers: HashMap<Id, SocketAddr> = HashMap::new();

        let outcome = loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break Ok(()),
                Some(joined) = connections.join_next_with_id(), if !connections.is_empty() => {
                    match joined {
                        Ok((id, Err(ContractError::SinkClosed))) => {
                            peers.remove(&id);
                            break Err(ContractError::SinkClosed);
                        }
                        Ok((id, _)) => {
                            peers.remove(&id);
                        }
                        Err(e) => {
                            let peer = peers.remove(&e.id());
                            warn!(listener = %self.name, ?peer, error = %e, "connection task failed");
                        }
                    }
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(listener = %self.name, %peer, "connection accepted");
                        let handle = connections.spawn(read_frames(
                            stream,
                            peer,
                            sink.clone(),
                            shutdown.clone(),
                        ));
                        peers.insert(handle.id(), peer);
                    }
                    Err(e) if is_transient(&e) => {
                        debug!(listener = %self.name, error = %e, "accept interrupted");
                    }
                    Err(e) => break Err(ContractError::listener(&self.name, e.to_string())),
                },
            }
        };

        debug!(
            listener = %self.name,
            open_connections = peers.len(),
            "TCP listener stopping"
        );
        connections.shutdown().await;
        outcome
    }
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionAborted | io::ErrorKind::ConnectionReset | io::ErrorKind::Interrupted
    )
}

async fn read_frames(
    stream: TcpStream,
    peer: SocketAddr,
    sink: RecordSink,
    shutdown: CancellationToken,
) -> std::result::Result<(), ContractError> {
    let mut reader = BufReader::new(stream);
    let mut frame = Vec::new();

    loop {
        frame.clear();
        let mut bounded = (&mut reader).take(MAX_FRAME_LEN as u64 + 1);
        let read = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            read = bounded.read_until(FRAME_TERMINATOR, &mut frame) => read,
        };

        match read {
            Ok(0) => {
                debug!(%peer, "connection closed");
                return Ok(());
            }
            Ok(_) => {}
            Err(e) => {
                debug!(%peer, error = %e, "connection read failed");
                return Ok(());
            }
        }

        if frame.last() == Some(&FRAME_TERMINATOR) {
            frame.pop();
        } else if frame.len() > MAX_FRAME_LEN {
            warn!(%peer, max = MAX_FRAME_LEN, "frame too long, closing connection");
            return Ok(());
        }
        if frame.is_empty() {
            continue;
        }

        sink.send(Record::copy_from_slice(&frame))
            .await
            .map_err(|_| ContractError::SinkClosed)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_splits_on_terminator() {
        let mut listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = async_channel::bounded(16);
        let token = CancellationToken::new();
        let handle = {
            let token = token.clone();
            tokio::spawn(async move { listener.listen(tx, token).await })
        };

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"first\0\0second\0tail").await.unwrap();
        client.shutdown().await.unwrap();

        let mut got = Vec::new();
        for _ in 0..3 {
            let record = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .unwrap()
                .unwrap();
            got.push(record.to_lossy_str().into_owned());
        }
        assert_eq!(got, vec!["first", "second", "tail"]);

        token.cancel();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_oversized_frame_closes_connection() {
        let mut listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = async_channel::bounded(16);
        let token = CancellationToken::new();
        let handle = {
            let token = token.clone();
            tokio::spawn(async move { listener.listen(tx, token).await })
        };

        let mut flood = TcpStream::connect(addr).await.unwrap();
        flood.write_all(&vec![b'x'; MAX_FRAME_LEN + 1]).await.unwrap();
        let mut buf = [0u8; 16];
        let read = tokio::time::timeout(Duration::from_secs(2), flood.read(&mut buf))
            .await
            .unwrap();
        assert!(matches!(read, Ok(0) | Err(_)));
        assert!(rx.is_empty());

        let mut ok = TcpStream::connect(addr).await.unwrap();
        ok.write_all(b"after\0").await.unwrap();
        let record = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.to_lossy_str(), "after");

        token.cancel();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_multiple_connections() {
        let mut listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = async_channel::bounded(16);
        let token = CancellationToken::new();
        let handle = {
            let token = token.clone();
            tokio::spawn(async move { listener.listen(tx, token).await })
        };

        let mut a = TcpStream::connect(addr).await.unwrap();
        let mut b = TcpStream::connect(addr).await.unwrap();
        a.write_all(b"from-a\0").await.unwrap();
        b.write_all(b"from-b\0").await.unwrap();

        let mut got = Vec::new();
        for _ in 0..2 {
            let record = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .unwrap()
                .unwrap();
            got.push(record.to_lossy_str().into_owned());
        }
        got.sort();
        assert_eq!(got, vec!["from-a", "from-b"]);

        token.cancel();
        assert!(handle.await.unwrap().is_ok());
    }
}
