use std::time::Duration;

use log::*;
use stock_sync_engine::{
    db_types::SyncSource,
    events::EventProducers,
    sync_objects::{ReconcileReport, SyncOptions},
    ReconciliationApi,
    SqliteDatabase,
};
use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::integrations::shopify::ShopifyInventory;

/// Starts the reconciliation worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// The first sweep runs one full `interval` after startup. A sweep that overruns the interval delays the next one
/// rather than stacking up behind it.
pub fn start_reconcile_worker(
    db: SqliteDatabase,
    platform: ShopifyInventory,
    producers: EventProducers,
    options: SyncOptions,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let api = ReconciliationApi::new(db, platform, producers, options);
        info!("🕰️ Reconciliation worker started. Sweeping every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            info!("🕰️ Running scheduled reconciliation sweep");
            match api.run_sweep(SyncSource::ScheduledReconcile).await {
                Ok(report) => {
                    info!("🕰️ {report}");
                    debug!("🕰️ Corrections: {}", correction_list(&report));
                },
                Err(e) => {
                    error!("🕰️ Error running reconciliation sweep: {e}");
                },
            }
        }
    })
}

fn correction_list(report: &ReconcileReport) -> String {
    if report.corrected.is_empty() {
        return "none".to_string();
    }
    report
        .corrected
        .iter()
        .map(|c| format!("{} {} -> {}", c.product_id, c.old_stock, c.new_stock))
        .collect::<Vec<String>>()
        .join(", ")
}
