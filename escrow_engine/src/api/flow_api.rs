use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;

use crate::{
    api::errors::FlowError,
    db_types::{Carrier, Transaction},
    events::{
        EscrowReleasedEvent,
        EventProducers,
        PaymentConfirmedEvent,
        TransactionDeliveredEvent,
        TransactionShippedEvent,
    },
    helpers::detect_carrier,
    traits::{CarrierTracking, DeliveryRunReport, EscrowDatabase, ReleaseRunReport, ShipmentState},
};

/// `TransactionFlowApi` drives the transaction state machine: payment webhooks, shipment
/// recording, dispute opening and the two scheduled jobs (delivery reconciliation and escrow
/// release).
pub struct TransactionFlowApi<B> {
    db: B,
    producers: EventProducers,
    /// How long funds stay in escrow after a confirmed delivery.
    escrow_hold: Duration,
    /// Minimum gap between consecutive carrier lookups in one reconciliation run.
    delivery_pace: std::time::Duration,
}

impl<B> Debug for TransactionFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TransactionFlowApi")
    }
}

impl<B> TransactionFlowApi<B>
where B: EscrowDatabase
{
    pub fn new(db: B, producers: EventProducers, escrow_hold: Duration, delivery_pace: std::time::Duration) -> Self {
        Self { db, producers, escrow_hold, delivery_pace }
    }

    pub fn escrow_hold(&self) -> Duration {
        self.escrow_hold
    }

    /// Handle a successful-payment notification from the processor.
    ///
    /// Returns the updated transaction, or `Ok(None)` when the notification is a redelivery (the
    /// transaction has already left `Pending`). An unknown authorization id is an error; the
    /// processor should never confirm a charge this system did not create.
    pub async fn payment_succeeded(
        &self,
        payment_intent_id: &str,
        payment_status: &str,
    ) -> Result<Option<Transaction>, FlowError> {
        let existing = self
            .db
            .fetch_transaction_by_payment_intent(payment_intent_id)
            .await?
            .ok_or_else(|| FlowError::PaymentIntentNotFound(payment_intent_id.to_string()))?;
        let updated = self.db.mark_payment_received(payment_intent_id, payment_status).await?;
        match updated {
            Some(tx) => {
                info!("🔄️💰️ Payment confirmed for transaction #{}. Funds are in escrow.", tx.id);
                self.call_payment_confirmed_hook(&tx).await;
                Ok(Some(tx))
            },
            None => {
                debug!(
                    "🔄️💰️ Duplicate payment confirmation for [{payment_intent_id}] ignored. Transaction #{} is in \
                     state {}.",
                    existing.id, existing.status
                );
                Ok(None)
            },
        }
    }

    /// Handle a failed-payment notification. The processor's status string is recorded verbatim;
    /// the transaction stays in `Pending` so the buyer can retry the confirmation.
    pub async fn payment_failed(&self, payment_intent_id: &str, payment_status: &str) -> Result<(), FlowError> {
        self.db
            .fetch_transaction_by_payment_intent(payment_intent_id)
            .await?
            .ok_or_else(|| FlowError::PaymentIntentNotFound(payment_intent_id.to_string()))?;
        self.db.record_payment_status(payment_intent_id, payment_status).await?;
        info!("🔄️💰️ Payment failure recorded for [{payment_intent_id}]: {payment_status}");
        Ok(())
    }

    /// Record the seller's shipment. The carrier is taken from the request when given, otherwise
    /// inferred from the tracking number format.
    pub async fn record_shipment(
        &self,
        id: i64,
        seller_id: &str,
        tracking_number: &str,
        carrier: Option<Carrier>,
    ) -> Result<Transaction, FlowError> {
        let tx = self.db.fetch_transaction(id).await?.ok_or(FlowError::TransactionNotFound(id))?;
        if tx.seller_id != seller_id {
            return Err(FlowError::NotSeller);
        }
        let carrier = match carrier.or_else(|| detect_carrier(tracking_number)) {
            Some(c) => c,
            None => return Err(FlowError::UnknownCarrier(tracking_number.to_string())),
        };
        match self.db.record_shipment(id, tracking_number, carrier).await? {
            Some(updated) => {
                info!("🔄️📦️ Transaction #{id} shipped via {carrier}, tracking [{tracking_number}]");
                self.call_shipped_hook(&updated).await;
                Ok(updated)
            },
            None => Err(FlowError::WrongStatus { id, status: tx.status }),
        }
    }

    /// Open a dispute on a shipped or delivered transaction. Either party may open one.
    pub async fn open_dispute(&self, id: i64, user_id: &str, reason: &str) -> Result<Transaction, FlowError> {
        let tx = self.db.fetch_transaction(id).await?.ok_or(FlowError::TransactionNotFound(id))?;
        if !tx.is_party(user_id) {
            return Err(FlowError::NotParty);
        }
        match self.db.open_dispute(id, reason).await? {
            Some(updated) => {
                warn!("🔄️⚖️ Dispute opened on transaction #{id} by [{user_id}]: {reason}");
                Ok(updated)
            },
            None => Err(FlowError::WrongStatus { id, status: tx.status }),
        }
    }

    /// One pass of the delivery reconciliation job.
    ///
    /// Every shipped transaction with a tracking number is checked against the carrier. Confirmed
    /// deliveries move to `Delivered` and start the escrow clock. A failure on one item never
    /// aborts the run; it is recorded in the report and the run continues. Calls to the carrier
    /// service are paced to respect its rate limits.
    pub async fn run_delivery_checks<T: CarrierTracking>(&self, tracker: &T) -> Result<DeliveryRunReport, FlowError> {
        let candidates = self.db.fetch_shipped_with_tracking().await?;
        let mut report = DeliveryRunReport::default();
        info!("🚚️ Delivery reconciliation started: {} shipped transactions to check", candidates.len());
        for (i, tx) in candidates.iter().enumerate() {
            if i > 0 && !self.delivery_pace.is_zero() {
                tokio::time::sleep(self.delivery_pace).await;
            }
            report.checked += 1;
            let tracking_number = match &tx.tracking_number {
                Some(t) => t,
                // Excluded by the query filter; guard anyway.
                None => continue,
            };
            let status = match tracker.get_status(tracking_number, tx.carrier).await {
                Ok(s) => s,
                Err(e) => {
                    warn!("🚚️ Tracking lookup failed for transaction #{}: {e}", tx.id);
                    report.errors.push((tx.id, e.to_string()));
                    continue;
                },
            };
            if status.state != ShipmentState::Delivered {
                trace!("🚚️ Transaction #{} is still {:?}", tx.id, status.state);
                report.in_transit += 1;
                continue;
            }
            let delivered_at = status.delivered_at.unwrap_or_else(Utc::now);
            let release_at = delivered_at + self.escrow_hold;
            match self.db.mark_delivered(tx.id, delivered_at, release_at).await {
                Ok(Some(updated)) => {
                    info!("🚚️ Transaction #{} delivered at {delivered_at}. Escrow releases at {release_at}.", tx.id);
                    report.delivered += 1;
                    self.call_delivered_hook(&updated).await;
                },
                // Another run got there first, or a dispute intercepted. Both fine.
                Ok(None) => {
                    debug!("🚚️ Transaction #{} left the Shipped state during the run", tx.id);
                },
                Err(e) => {
                    warn!("🚚️ Could not mark transaction #{} delivered: {e}", tx.id);
                    report.errors.push((tx.id, e.to_string()));
                },
            }
        }
        info!(
            "🚚️ Delivery reconciliation finished: {} checked, {} delivered, {} in transit, {} errors",
            report.checked,
            report.delivered,
            report.in_transit,
            report.error_count()
        );
        Ok(report)
    }

    /// One pass of the escrow release job.
    ///
    /// Releases every delivered transaction whose hold deadline has passed and which has no open
    /// dispute. Under the destination-charge model the seller's funds moved at charge time, so
    /// release is bookkeeping: the funds-held flag clears, the transaction completes and the
    /// listing is marked sold. Running the job twice is harmless because completed transactions
    /// no longer match the candidate filter.
    pub async fn run_escrow_release(&self) -> Result<ReleaseRunReport, FlowError> {
        let now = Utc::now();
        let candidates = self.db.fetch_release_candidates(now).await?;
        let mut report = ReleaseRunReport::default();
        info!("🔐️ Escrow release started: {} transactions past their hold deadline", candidates.len());
        for tx in candidates {
            match self.db.mark_completed(tx.id).await {
                Ok(Some(completed)) => {
                    info!("🔐️ Escrow released for transaction #{}: payout {}", completed.id, completed.seller_payout);
                    report.released.push(completed.id);
                    self.call_escrow_released_hook(&completed).await;
                },
                Ok(None) => {
                    // A dispute opened between the fetch and the release. The guard rejected it.
                    debug!("🔐️ Transaction #{} was no longer releasable", tx.id);
                },
                Err(e) => {
                    warn!("🔐️ Could not release escrow for transaction #{}: {e}", tx.id);
                    report.errors.push((tx.id, e.to_string()));
                },
            }
        }
        info!("🔐️ Escrow release finished: {} released, {} errors", report.released_count(), report.error_count());
        Ok(report)
    }

    async fn call_payment_confirmed_hook(&self, tx: &Transaction) {
        for emitter in &self.producers.payment_confirmed_producer {
            emitter.publish_event(PaymentConfirmedEvent::new(tx.clone())).await;
        }
    }

    async fn call_shipped_hook(&self, tx: &Transaction) {
        for emitter in &self.producers.shipped_producer {
            emitter.publish_event(TransactionShippedEvent::new(tx.clone())).await;
        }
    }

    async fn call_delivered_hook(&self, tx: &Transaction) {
        for emitter in &self.producers.delivered_producer {
            emitter.publish_event(TransactionDeliveredEvent::new(tx.clone())).await;
        }
    }

    async fn call_escrow_released_hook(&self, tx: &Transaction) {
        for emitter in &self.producers.escrow_released_producer {
            emitter.publish_event(EscrowReleasedEvent::new(tx.clone())).await;
        }
    }
}
