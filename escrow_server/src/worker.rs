use chrono::Duration;
use escrow_engine::{events::EventProducers, SqliteDatabase, TransactionFlowApi};
use log::*;
use tokio::task::JoinHandle;

use crate::integrations::TrackingClient;

/// Starts the in-process job worker. Do not await the returned JoinHandle, as it will run
/// indefinitely.
///
/// Deployments with an external scheduler leave this disabled and hit the `/jobs/*` endpoints
/// instead; both paths run the same engine code, so double scheduling is merely wasteful, not
/// dangerous.
pub fn start_escrow_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    tracker: TrackingClient,
    escrow_hold: Duration,
    delivery_pace: std::time::Duration,
    interval: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let api = TransactionFlowApi::new(db, producers, escrow_hold, delivery_pace);
        info!("🕰️ Escrow worker started. Jobs run every {}s.", interval.as_secs());
        loop {
            timer.tick().await;
            info!("🕰️ Running delivery reconciliation job");
            match api.run_delivery_checks(&tracker).await {
                Ok(report) => {
                    info!(
                        "🕰️ Delivery run: {} checked, {} delivered, {} errors",
                        report.checked,
                        report.delivered,
                        report.error_count()
                    );
                },
                Err(e) => {
                    error!("🕰️ Error running delivery reconciliation job: {e}");
                },
            }
            info!("🕰️ Running escrow release job");
            match api.run_escrow_release().await {
                Ok(report) => {
                    info!("🕰️ Release run: {} released, {} errors", report.released_count(), report.error_count());
                },
                Err(e) => {
                    error!("🕰️ Error running escrow release job: {e}");
                },
            }
        }
    })
}
