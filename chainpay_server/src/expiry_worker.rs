use chainpay_engine::{
    db_types::Invoice,
    events::EventProducers,
    ReconciliationApi,
    ReconciliationConfig,
    SqliteDatabase,
};
use chrono::Duration;
use log::*;
use tokio::task::JoinHandle;

const SWEEP_INTERVAL_SECS: u64 = 60;

/// Periodically closes invoices that have gone unpaid past the configured timeout.
///
/// The worker is an explicit lifecycle object: the process entry point calls [`ExpiryWorker::start`] and
/// [`ExpiryWorker::stop`], rather than relying on a process-wide singleton wired to signals.
pub struct ExpiryWorker {
    handle: JoinHandle<()>,
}

impl ExpiryWorker {
    pub fn start(db: SqliteDatabase, producers: EventProducers, unpaid_timeout: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let api = ReconciliationApi::new(db, ReconciliationConfig::default(), producers);
            let mut timer = tokio::time::interval(std::time::Duration::from_secs(SWEEP_INTERVAL_SECS));
            info!("🕰️ Invoice expiry worker started");
            loop {
                timer.tick().await;
                match api.expire_old_invoices(unpaid_timeout).await {
                    Ok(result) if result.count() > 0 => {
                        info!("🕰️ {} invoices expired", result.count());
                        debug!("🕰️ Expired invoices: {}", invoice_list(&result.expired));
                    },
                    Ok(_) => trace!("🕰️ No invoices to expire"),
                    Err(e) => error!("🕰️ Error running invoice expiry job: {e}"),
                }
            }
        });
        Self { handle }
    }

    pub fn stop(self) {
        self.handle.abort();
        info!("🕰️ Invoice expiry worker stopped");
    }
}

fn invoice_list(invoices: &[Invoice]) -> String {
    invoices
        .iter()
        .map(|i| format!("[{}] invoice_id: {} merchant: {}", i.id, i.invoice_id, i.merchant_id))
        .collect::<Vec<String>>()
        .join(", ")
}
