//! UdpDestination - one record per datagram

use std::net::SocketAddr;
use std::time::Duration;

use contracts::{ContractError, Destination, Record};
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::timeout;
use tracing::{debug, instrument, trace};

/// Largest payload that fits in one IPv4 UDP datagram
pub const MAX_DATAGRAM_PAYLOAD: usize = 65_507;

/// Sends each record as one datagram over a connected UDP socket
pub struct UdpDestination {
    name: String,
    addr: String,
    timeout: Duration,
    socket: Option<UdpSocket>,
}

impl UdpDestination {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        let addr = addr.into();
        Self {
            name: format!("udp://{addr}"),
            addr,
            timeout,
            socket: None,
        }
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis().try_into().unwrap_or(u64::MAX)
    }

    async fn connect(&self) -> Result<UdpSocket, ContractError> {
        let target = self.resolve().await?;
        let local: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };

        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| ContractError::destination_connection(&self.name, e.to_string()))?;
        socket
            .connect(target)
            .await
            .map_err(|e| ContractError::destination_connection(&self.name, e.to_string()))?;

        debug!(destination = %self.name, %target, "UdpDestination connected");
        Ok(socket)
    }

    async fn resolve(&self) -> Result<SocketAddr, ContractError> {
        let mut addrs = timeout(self.timeout, lookup_host(&self.addr))
            .await
            .map_err(|_| ContractError::destination_timeout(&self.name, self.timeout_ms()))?
            .map_err(|e| ContractError::destination_connection(&self.name, e.to_string()))?;
        addrs.next().ok_or_else(|| {
            ContractError::destination_connection(&self.name, "address resolved to nothing")
        })
    }

    async fn transmit(&self, payload: &[u8]) -> Result<(), ContractError> {
        let Some(socket) = self.socket.as_ref() else {
            return Err(ContractError::destination_write(&self.name, "socket not connected"));
        };

        let sent = timeout(self.timeout, socket.send(payload))
            .await
            .map_err(|_| ContractError::destination_timeout(&self.name, self.timeout_ms()))?
            .map_err(|e| ContractError::destination_write(&self.name, e.to_string()))?;

        if sent != payload.len() {
            return Err(ContractError::ShortWrite {
                destination: self.name.clone(),
                written: sent,
                expected: payload.len(),
            });
        }
        trace!(destination = %self.name, bytes = sent, "Sent");
        Ok(())
    }
}

impl Destination for UdpDestination {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "udp_destination_send",
        skip(self, record),
        fields(destination = %self.name, len = record.len())
    )]
    async fn send(&mut self, record: &Record) -> Result<(), ContractError> {
        if record.len() > MAX_DATAGRAM_PAYLOAD {
            return Err(ContractError::destination_write(
                &self.name,
                format!(
                    "record of {} bytes exceeds the {MAX_DATAGRAM_PAYLOAD} byte datagram limit",
                    record.len()
                ),
            ));
        }

        if self.socket.is_none() {
            self.socket = Some(self.connect().await?);
        }

        let result = self.transmit(record.as_bytes()).await;
        if result.is_err() {
            self.socket = None;
        }
        result
    }

    #[instrument(name = "udp_destination_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.socket = None;
        debug!(destination = %self.name, "UdpDestination closed");
        Ok(())
    }
}
