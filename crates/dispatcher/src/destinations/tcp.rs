//! TcpDestination - zero-byte framed stream delivery

use std::time::Duration;

use contracts::{ContractError, Destination, Record};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, instrument};

const FRAME_TERMINATOR: [u8; 1] = [0];

/// Sends each record followed by `0x00` over a reused TCP connection
///
/// The connection is dialed on first use and dropped after any error, so the
/// next send starts with a fresh dial.
pub struct TcpDestination {
    name: String,
    addr: String,
    timeout: Duration,
    conn: Option<TcpStream>,
}

impl TcpDestination {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        let addr = addr.into();
        Self {
            name: format!("tcp://{addr}"),
            addr,
            timeout,
            conn: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis().try_into().unwrap_or(u64::MAX)
    }

    async fn connect(&self) -> Result<TcpStream, ContractError> {
        let stream = timeout(self.timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| ContractError::destination_timeout(&self.name, self.timeout_ms()))?
            .map_err(|e| ContractError::destination_connection(&self.name, e.to_string()))?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!(destination = %self.name, error = %e, "set_nodelay failed");
        }
        debug!(destination = %self.name, "TCP connection established");
        Ok(stream)
    }

    async fn write_framed(&mut self, payload: &[u8]) -> Result<(), ContractError> {
        let name = &self.name;
        let Some(conn) = self.conn.as_mut() else {
            return Err(ContractError::destination_write(name, "not connected"));
        };
        write_fully(conn, name, payload).await?;
        write_fully(conn, name, &FRAME_TERMINATOR).await?;
        conn.flush()
            .await
            .map_err(|e| ContractError::destination_write(name, e.to_string()))
    }
}

/// Write all of `buf`; a write that makes no progress is a short write
async fn write_fully(
    conn: &mut TcpStream,
    name: &str,
    buf: &[u8],
) -> Result<(), ContractError> {
    let mut written = 0;
    while written < buf.len() {
        let n = conn
            .write(&buf[written..])
            .await
            .map_err(|e| ContractError::destination_write(name, e.to_string()))?;
        if n == 0 {
            return Err(ContractError::ShortWrite {
                destination: name.to_string(),
                written,
                expected: buf.len(),
            });
        }
        written += n;
    }
    Ok(())
}

impl Destination for TcpDestination {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "tcp_destination_send",
        skip(self, record),
        fields(destination = %self.name, len = record.len())
    )]
    async fn send(&mut self, record: &Record) -> Result<(), ContractError> {
        if self.conn.is_none() {
            self.conn = Some(self.connect().await?);
        }

        let result = match timeout(self.timeout, self.write_framed(record.as_bytes())).await {
            Ok(result) => result,
            Err(_) => Err(ContractError::destination_timeout(
                &self.name,
                self.timeout_ms(),
            )),
        };

        if result.is_err() {
            self.conn = None;
        }
        result
    }

    #[instrument(name = "tcp_destination_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut conn) = self.conn.take() {
            conn.shutdown().await?;
            debug!(destination = %self.name, "TcpDestination closed");
        }
        Ok(())
    }
}
