//! UDP listener with chunk reassembly

use std::io;
use std::net::SocketAddr;
use std::time::Instant;

use contracts::{ContractError, Listener, RecordSink};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace};

use crate::chunk::{ChunkAssembler, CHUNK_EXPIRY};
use crate::error::{IngestionError, Result};

/// Largest datagram accepted
pub const MAX_DATAGRAM: usize = 65_535;

/// Datagram listener
///
/// Each datagram is one record unless it carries the chunk header, in which
/// case it is held until the rest of its message arrives.
pub struct UdpListener {
    name: String,
    socket: UdpSocket,
    assembler: ChunkAssembler,
}

impl UdpListener {
    /// Bind to `addr` (`host:port`)
    #[instrument(name = "udp_listener_bind")]
    pub async fn bind(addr: &str) -> Result<Self> {
        let name = format!("udp://{addr}");
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| IngestionError::bind(&name, e))?;
        info!(listener = %name, local_addr = ?socket.local_addr().ok(), "UDP listener bound");

        Ok(Self {
            name,
            socket,
            assembler: ChunkAssembler::default(),
        })
    }

    /// Bound address
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl Listener for UdpListener {
    fn name(&self) -> &str {
        &self.name
    }

    async fn listen(
        &mut self,
        sink: RecordSink,
        shutdown: CancellationToken,
    ) -> std::result::Result<(), ContractError> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let mut sweep = tokio::time::interval(CHUNK_EXPIRY);

        loop {
            let (len, peer) = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!(listener = %self.name, "UDP listener shutting down");
                    return Ok(());
                }
                _ = sweep.tick() => {
                    let expired = self.assembler.evict_expired(Instant::now());
                    if expired > 0 {
                        debug!(listener = %self.name, expired, "discarded incomplete chunked messages");
                    }
                    continue;
                }
                received = self.socket.recv_from(&mut buf) => {
                    received.map_err(|e| ContractError::listener(&self.name, e.to_string()))?
                }
            };

            match self.assembler.accept(&buf[..len], Instant::now()) {
                Ok(Some(record)) => {
                    trace!(listener = %self.name, %peer, len = record.len(), "datagram record");
                    sink.send(record)
                        .await
                        .map_err(|_| ContractError::SinkClosed)?;
                }
                Ok(None) => {}
                Err(e) => {
                    debug!(listener = %self.name, %peer, error = %e, "discarding invalid chunk");
                }
            }
        }
    }
}
