//! Destination trait - dispatch output interface

use crate::{ContractError, Record};

/// Output destination
///
/// One instance per configured output. The dispatch loop calls `send` once
/// per delivery pass and waits for it, so implementations own their connection
/// lifecycle and must bound every call with their send timeout.
#[trait_variant::make(Destination: Send)]
pub trait LocalDestination {
    /// Destination name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver one record
    ///
    /// A failed call must leave the destination usable: the next call
    /// reconnects if needed. Partial transmission is a failure.
    ///
    /// # Errors
    /// Returns the delivery error (should include context)
    async fn send(&mut self, record: &Record) -> Result<(), ContractError>;

    /// Release the underlying connection
    async fn close(&mut self) -> Result<(), ContractError>;
}
