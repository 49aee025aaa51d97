//! Concrete listeners
//!
//! [`InputListener`] is what the relay binds from its configuration; the
//! individual types are public for callers that wire listeners by hand.

mod replay;
mod tcp;
mod udp;

use std::io;
use std::net::SocketAddr;

use contracts::{ContractError, InputEndpoint, Listener, RecordSink};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::error::Result;

pub use replay::ReplayListener;
pub use tcp::{TcpListener, MAX_FRAME_LEN};
pub use udp::{UdpListener, MAX_DATAGRAM};

/// Listener bound from an [`InputEndpoint`]
pub enum InputListener {
    Udp(UdpListener),
    Tcp(TcpListener),
}

impl InputListener {
    /// Bind the socket described by `endpoint`
    #[instrument(name = "input_listener_bind", skip(endpoint), fields(endpoint = %endpoint))]
    pub async fn bind(endpoint: &InputEndpoint) -> Result<Self> {
        match endpoint {
            InputEndpoint::Udp(addr) => Ok(Self::Udp(UdpListener::bind(addr).await?)),
            InputEndpoint::Tcp(addr) => Ok(Self::Tcp(TcpListener::bind(addr).await?)),
        }
    }

    /// Address the socket is actually bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        match self {
            Self::Udp(listener) => listener.local_addr(),
            Self::Tcp(listener) => listener.local_addr(),
        }
    }
}

impl Listener for InputListener {
    fn name(&self) -> &str {
        match self {
            Self::Udp(listener) => listener.name(),
            Self::Tcp(listener) => listener.name(),
        }
    }

    async fn listen(
        &mut self,
        sink: RecordSink,
        shutdown: CancellationToken,
    ) -> std::result::Result<(), ContractError> {
        match self {
            Self::Udp(listener) => listener.listen(sink, shutdown).await,
            Self::Tcp(listener) => listener.listen(sink, shutdown).await,
        }
    }
}
