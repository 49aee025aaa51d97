//! Listener trait - inbound record source abstraction

use tokio_util::sync::CancellationToken;

use crate::{ContractError, Record};

/// Sending half of the fan-in channel shared by every listener
pub type RecordSink = async_channel::Sender<Record>;

/// Inbound record source
///
/// Decodes network traffic into records and pushes them into the sink.
/// Runs until it fails permanently or `shutdown` is cancelled. A returned
/// error is isolated to this listener; nothing restarts it.
#[trait_variant::make(Listener: Send)]
pub trait LocalListener {
    /// Listener name (used for logging)
    fn name(&self) -> &str;

    /// Run the receive loop
    ///
    /// # Errors
    /// Returns the fault that stopped the listener. A closed sink is reported
    /// as [`ContractError::SinkClosed`].
    async fn listen(
        &mut self,
        sink: RecordSink,
        shutdown: CancellationToken,
    ) -> Result<(), ContractError>;
}
