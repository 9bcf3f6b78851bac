//! Shared scaffolding for the engine integration tests.
#![allow(dead_code)]
use chainpay_engine::{
    db_types::{DepositAddress, InvoiceId, NewInvoice, Notification},
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    ReconciliationApi,
    ReconciliationConfig,
    SqliteDatabase,
};
use cpg_common::MicroUnit;

pub const MERCHANT: &str = "merchant-001";
pub const ASSET: &str = "USDT";
pub const CHAIN: &str = "BSC";

pub async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

pub fn api(db: SqliteDatabase) -> ReconciliationApi<SqliteDatabase> {
    api_with(db, ReconciliationConfig::default())
}

pub fn api_with(db: SqliteDatabase, config: ReconciliationConfig) -> ReconciliationApi<SqliteDatabase> {
    ReconciliationApi::new(db, config, EventProducers::default())
}

pub fn usdt_invoice(id: &str, address: &str, amount_due: i64) -> NewInvoice {
    NewInvoice::new(
        InvoiceId::from(id.to_string()),
        MERCHANT,
        ASSET,
        CHAIN,
        DepositAddress::new(address),
        MicroUnit::from(amount_due),
    )
}

pub fn notification(address: &str, txid: &str, amount: i64) -> Notification {
    Notification::new(CHAIN, DepositAddress::new(address), txid, MicroUnit::from(amount))
}
