//! Destination implementations
//!
//! Contains TcpDestination, UdpDestination, AmqpDestination, and
//! LogDestination. [`OutputDestination`] is built from the configured
//! output endpoints; no connection is made until the first send.

mod amqp;
mod log;
mod tcp;
mod udp;

use std::time::Duration;

use contracts::{ContractError, Destination, OutputEndpoint, Record};

pub use self::amqp::{AmqpDestination, AMQP_QUEUE};
pub use self::log::LogDestination;
pub use self::tcp::TcpDestination;
pub use self::udp::{UdpDestination, MAX_DATAGRAM_PAYLOAD};

/// Destination built from an [`OutputEndpoint`]
pub enum OutputDestination {
    Tcp(TcpDestination),
    Udp(UdpDestination),
    Amqp(AmqpDestination),
    Log(LogDestination),
}

impl OutputDestination {
    pub fn from_endpoint(endpoint: &OutputEndpoint, timeout: Duration) -> Self {
        match endpoint {
            OutputEndpoint::Tcp(addr) => Self::Tcp(TcpDestination::new(addr, timeout)),
            OutputEndpoint::Udp(addr) => Self::Udp(UdpDestination::new(addr, timeout)),
            OutputEndpoint::Amqp(url) => Self::Amqp(AmqpDestination::new(url, timeout)),
            OutputEndpoint::Log => Self::Log(LogDestination::new(endpoint.to_string())),
        }
    }
}

/// One destination per endpoint, in configuration order
pub fn build_destinations(endpoints: &[OutputEndpoint], timeout: Duration) -> Vec<OutputDestination> {
    endpoints
        .iter()
        .map(|endpoint| OutputDestination::from_endpoint(endpoint, timeout))
        .collect()
}

impl Destination for OutputDestination {
    fn name(&self) -> &str {
        match self {
            Self::Tcp(d) => d.name(),
            Self::Udp(d) => d.name(),
            Self::Amqp(d) => d.name(),
            Self::Log(d) => d.name(),
        }
    }

    async fn send(&mut self, record: &Record) -> Result<(), ContractError> {
        match self {
            Self::Tcp(d) => d.send(record).await,
            Self::Udp(d) => d.send(record).await,
            Self::Amqp(d) => d.send(record).await,
            Self::Log(d) => d.send(record).await,
        }
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        match self {
            Self::Tcp(d) => d.close().await,
            Self::Udp(d) => d.close().await,
            Self::Amqp(d) => d.close().await,
            Self::Log(d) => d.close().await,
        }
    }
}
