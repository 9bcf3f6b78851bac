mod support;

use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use chainpay_engine::{
    db_types::ConfirmationState,
    events::{EventHandlers, EventHooks},
    ReconciliationApi,
    ReconciliationConfig,
};
use cpg_common::MicroUnit;
use support::{new_db, notification, usdt_invoice};

#[tokio::test]
async fn confirmation_fires_the_hooks_once() {
    let db = new_db().await;

    let paid_count = Arc::new(AtomicU64::new(0));
    let credited_total = Arc::new(AtomicU64::new(0));
    let mut hooks = EventHooks::default();
    let paid = Arc::clone(&paid_count);
    hooks.on_invoice_paid(move |_event| {
        let paid = Arc::clone(&paid);
        Box::pin(async move {
            paid.fetch_add(1, Ordering::SeqCst);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let credited = Arc::clone(&credited_total);
    hooks.on_invoice_confirmed(move |event| {
        let credited = Arc::clone(&credited);
        Box::pin(async move {
            credited.fetch_add(event.credited.value() as u64, Ordering::SeqCst);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });

    let handlers = EventHandlers::new(8, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let api = ReconciliationApi::new(db, ReconciliationConfig::default(), producers);
    api.create_invoice(usdt_invoice("inv-hook", "0xH001", 100)).await.unwrap();

    // Full amount, unconfirmed: the paid hook fires, the confirmed hook does not.
    let unconfirmed = notification("0xH001", "tx-h", 100);
    api.process_notification(&unconfirmed).await.unwrap();

    // Confirmation promotes the invoice and fires the confirmed hook exactly once, replays included.
    let confirmed = notification("0xH001", "tx-h", 100).with_confirmations(ConfirmationState::Flag(true));
    api.process_notification(&confirmed).await.unwrap();
    api.process_notification(&confirmed).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(paid_count.load(Ordering::SeqCst), 1);
    assert_eq!(credited_total.load(Ordering::SeqCst), MicroUnit::from(100).value() as u64);
}
