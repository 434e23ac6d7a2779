use std::fmt::Debug;

use log::*;
use meg_common::Money;

use crate::{
    api::errors::DisputeError,
    db_types::{DisputeResolution, DisputeStatus, Transaction, TransactionStatus},
    events::{DisputeResolvedEvent, EventProducers},
    traits::{EscrowDatabase, PaymentProcessor},
};

/// `DisputeApi` settles open disputes.
///
/// The processor refund, when one is due, is issued BEFORE the local state change. If the refund
/// fails the dispute stays open and can be retried; the alternative ordering could record a
/// refund that never happened.
pub struct DisputeApi<B, P> {
    db: B,
    processor: P,
    producers: EventProducers,
}

impl<B, P> Debug for DisputeApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DisputeApi")
    }
}

impl<B, P> DisputeApi<B, P>
where
    B: EscrowDatabase,
    P: PaymentProcessor,
{
    pub fn new(db: B, processor: P, producers: EventProducers) -> Self {
        Self { db, processor, producers }
    }

    /// Resolve a dispute with the operator's verdict.
    ///
    /// * `Buyer`: the full charged amount is refunded and the transaction ends `Refunded`.
    /// * `Seller`: no refund; the transaction completes and the payout stands.
    /// * `Split`: a partial refund of `split_amount`, which must be positive and no more than the
    ///   item price. When the buyer gets back more than half the item price the transaction ends
    ///   `Refunded`, otherwise `Completed`.
    pub async fn resolve(
        &self,
        id: i64,
        resolution: DisputeResolution,
        split_amount: Option<Money>,
        reason: &str,
    ) -> Result<Transaction, DisputeError> {
        let tx = self.db.fetch_transaction(id).await?.ok_or(DisputeError::TransactionNotFound(id))?;
        if tx.status != TransactionStatus::Disputed || !tx.has_open_dispute() {
            return Err(DisputeError::NotDisputed(id));
        }

        let (refund, outcome, final_status) = match resolution {
            DisputeResolution::Buyer => {
                (Some(tx.total_amount), DisputeStatus::ResolvedBuyer, TransactionStatus::Refunded)
            },
            DisputeResolution::Seller => (None, DisputeStatus::ResolvedSeller, TransactionStatus::Completed),
            DisputeResolution::Split => {
                let amount = split_amount.ok_or(DisputeError::MissingSplitAmount)?;
                if !amount.is_positive() || amount > tx.sale_price {
                    return Err(DisputeError::InvalidSplitAmount { amount, sale_price: tx.sale_price });
                }
                // Strictly more than half the item price back means the buyer won on balance.
                let buyer_favoured = amount + amount > tx.sale_price;
                let final_status =
                    if buyer_favoured { TransactionStatus::Refunded } else { TransactionStatus::Completed };
                (Some(amount), DisputeStatus::ResolvedSplit, final_status)
            },
        };

        if let Some(amount) = refund {
            let receipt = self.processor.issue_refund(&tx.payment_intent_id, Some(amount), reason).await?;
            info!("⚖️ Refund [{}] of {} issued for transaction #{id}", receipt.id, receipt.amount);
        }

        let resolved = self
            .db
            .resolve_dispute(id, outcome, refund, final_status)
            .await?
            .ok_or(DisputeError::ResolutionRaced(id))?;
        info!("⚖️ Dispute on transaction #{id} resolved as {outcome}: final state {final_status}");
        self.call_dispute_resolved_hook(&resolved).await;
        Ok(resolved)
    }

    async fn call_dispute_resolved_hook(&self, tx: &Transaction) {
        for emitter in &self.producers.dispute_resolved_producer {
            emitter.publish_event(DisputeResolvedEvent::new(tx.clone())).await;
        }
    }
}
