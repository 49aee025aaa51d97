//! Fan-out strategy: how one record reaches every destination

use contracts::{ContractError, Destination, Record};

use crate::slot::DestinationSlot;

/// Delivers one record to every slot
///
/// Returns one result per slot, in slot order. Health bookkeeping is done by
/// the caller.
#[trait_variant::make(FanoutStrategy: Send)]
pub trait LocalFanoutStrategy {
    async fn deliver<D: Destination>(
        &self,
        slots: &mut [DestinationSlot<D>],
        record: &Record,
    ) -> Vec<Result<(), ContractError>>;
}

/// One destination at a time, in configuration order
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialFanout;

impl FanoutStrategy for SequentialFanout {
    async fn deliver<D: Destination>(
        &self,
        slots: &mut [DestinationSlot<D>],
        record: &Record,
    ) -> Vec<Result<(), ContractError>> {
        let mut results = Vec::with_capacity(slots.len());
        for slot in slots.iter_mut() {
            results.push(slot.destination_mut().send(record).await);
        }
        results
    }
}
