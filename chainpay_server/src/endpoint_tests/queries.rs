use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chainpay_engine::{
    db_types::{DepositAddress, Invoice, InvoiceId, InvoiceStatus, LedgerEntry, MerchantBalance},
    InvoiceApi,
};
use chrono::{TimeZone, Utc};
use cpg_common::MicroUnit;

use super::{helpers::get_request, mocks::MockInvoiceManager};
use crate::routes::{InvoiceStatusRoute, MerchantBalanceRoute};

#[actix_web::test]
async fn fetch_invoice_with_ledger() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/invoice/inv-001", configure_invoice_found).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""invoice_id":"inv-001""#));
    assert!(body.contains("tx-abc"));
    assert!(body.contains(r#""status":"Underpaid""#));
}

#[actix_web::test]
async fn fetch_unknown_invoice_is_not_found() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/invoice/no-such", configure_invoice_missing).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains(r#""success":false"#));
}

#[actix_web::test]
async fn fetch_merchant_balance() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/balance/m-1/USDT/bsc", configure_balance_found).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""available":9750"#));
}

#[actix_web::test]
async fn fetch_unknown_balance_is_not_found() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/balance/m-2/USDT/BSC", configure_balance_missing).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains(r#""success":false"#));
}

fn configure_invoice_found(cfg: &mut ServiceConfig) {
    let mut manager = MockInvoiceManager::new();
    manager.expect_fetch_invoice().returning(|_| Ok(Some(sample_invoice())));
    manager.expect_fetch_ledger_for_invoice().returning(|_| Ok(vec![sample_entry()]));
    let api = InvoiceApi::new(manager);
    cfg.service(InvoiceStatusRoute::<MockInvoiceManager>::new()).app_data(web::Data::new(api));
}

fn configure_invoice_missing(cfg: &mut ServiceConfig) {
    let mut manager = MockInvoiceManager::new();
    manager.expect_fetch_invoice().returning(|_| Ok(None));
    let api = InvoiceApi::new(manager);
    cfg.service(InvoiceStatusRoute::<MockInvoiceManager>::new()).app_data(web::Data::new(api));
}

fn configure_balance_found(cfg: &mut ServiceConfig) {
    let mut manager = MockInvoiceManager::new();
    // the route upper-cases the chain before querying
    manager
        .expect_fetch_balance()
        .withf(|merchant, asset, chain| merchant == "m-1" && asset == "USDT" && chain == "BSC")
        .returning(|_, _, _| Ok(Some(sample_balance())));
    let api = InvoiceApi::new(manager);
    cfg.service(MerchantBalanceRoute::<MockInvoiceManager>::new()).app_data(web::Data::new(api));
}

fn configure_balance_missing(cfg: &mut ServiceConfig) {
    let mut manager = MockInvoiceManager::new();
    manager.expect_fetch_balance().returning(|_, _, _| Ok(None));
    let api = InvoiceApi::new(manager);
    cfg.service(MerchantBalanceRoute::<MockInvoiceManager>::new()).app_data(web::Data::new(api));
}

// Mock response data

fn sample_invoice() -> Invoice {
    Invoice {
        id: 1,
        invoice_id: InvoiceId::from("inv-001".to_string()),
        merchant_id: "m-1".to_string(),
        asset: "USDT".to_string(),
        chain: "BSC".to_string(),
        address: DepositAddress::new("0xabc001"),
        amount_due: MicroUnit::from(100),
        amount_paid: MicroUnit::from(40),
        status: InvoiceStatus::Underpaid,
        created_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 45, 0).unwrap(),
    }
}

fn sample_entry() -> LedgerEntry {
    LedgerEntry {
        id: 1,
        invoice_id: 1,
        txid: "tx-abc".to_string(),
        amount: MicroUnit::from(40),
        confirmed: false,
        block_number: Some(1_234_567),
        created_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 45, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 45, 0).unwrap(),
    }
}

fn sample_balance() -> MerchantBalance {
    MerchantBalance {
        id: 1,
        merchant_id: "m-1".to_string(),
        asset: "USDT".to_string(),
        chain: "BSC".to_string(),
        available: MicroUnit::from(9_750),
        pending: MicroUnit::from(0),
        locked: MicroUnit::from(0),
        created_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 45, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 45, 0).unwrap(),
    }
}
