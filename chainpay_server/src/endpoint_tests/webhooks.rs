//! End-to-end webhook tests: actix request in, SQLite state out.
use actix_http::Request;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::StatusCode,
    test,
    web,
    App,
    Error,
};
use chainpay_engine::{
    db_types::{ConfirmationState, DepositAddress, InvoiceId, InvoiceStatus, NewInvoice},
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::InvoiceManagement,
    ReconciliationApi,
    ReconciliationConfig,
    SqliteDatabase,
};
use cpg_common::{MicroUnit, Secret};

use crate::{
    data_objects::{NotificationResponse, PaymentNotification},
    helpers::calculate_hmac,
    middleware::SignatureMiddlewareFactory,
    routes::{webhook_info, InvoiceWebhookRoute, PaymentWebhookRoute},
};

const SECRET: &str = "wh-test-secret";
const SIGNATURE_HEADER: &str = "x-webhook-signature";

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

async fn seed_invoice(db: &SqliteDatabase, id: &str, address: &str, amount_due: i64) {
    let api = ReconciliationApi::new(db.clone(), ReconciliationConfig::default(), EventProducers::default());
    let invoice = NewInvoice::new(
        InvoiceId::from(id.to_string()),
        "m-1",
        "USDT",
        "BSC",
        DepositAddress::new(address),
        MicroUnit::from(amount_due),
    );
    api.create_invoice(invoice).await.expect("could not seed invoice");
}

async fn webhook_app(
    db: SqliteDatabase,
    secret: Option<&str>,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error> {
    let api = ReconciliationApi::new(db, ReconciliationConfig::default(), EventProducers::default());
    test::init_service(
        App::new().app_data(web::Data::new(api)).service(webhook_info).service(
            web::scope("/webhook")
                .wrap(SignatureMiddlewareFactory::new(SIGNATURE_HEADER, secret.map(|s| Secret::new(s.to_string()))))
                .service(PaymentWebhookRoute::<SqliteDatabase>::new())
                .service(InvoiceWebhookRoute::<SqliteDatabase>::new()),
        ),
    )
    .await
}

fn payload(address: &str, txid: &str, amount: i64, confirmed: bool) -> String {
    let notification = PaymentNotification {
        subscription_type: "ADDRESS_COINS_TRANSACTION".to_string(),
        address: address.to_string(),
        amount: MicroUnit::from(amount),
        tx_id: txid.to_string(),
        confirmed: ConfirmationState::Flag(confirmed),
        chain: "BSC".to_string(),
        block_number: None,
    };
    serde_json::to_string(&notification).unwrap()
}

async fn post<S, B>(app: &S, path: &str, body: String, signature: Option<String>) -> (StatusCode, String)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let mut req = test::TestRequest::post().uri(path).insert_header(("content-type", "application/json"));
    if let Some(signature) = signature {
        req = req.insert_header((SIGNATURE_HEADER, signature));
    }
    match test::try_call_service(app, req.set_payload(body).to_request()).await {
        Ok(resp) => {
            let status = resp.status();
            let body = test::read_body(resp).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            // The framework renders a returned error through `ResponseError` during real serving;
            // reproduce that here so the harness observes the same HTTP response.
            let resp = e.error_response();
            let status = resp.status();
            let body = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}

#[actix_web::test]
async fn valid_signature_is_accepted() {
    let _ = env_logger::try_init().ok();
    let db = new_db().await;
    seed_invoice(&db, "inv-w1", "0xw001", 100).await;
    let app = webhook_app(db.clone(), Some(SECRET)).await;

    let body = payload("0xW001", "tx-w1", 100, true);
    let signature = calculate_hmac(SECRET, body.as_bytes());
    let (status, response) = post(&app, "/webhook/payment", body, Some(signature)).await;
    assert_eq!(status, StatusCode::OK);

    let response: NotificationResponse = serde_json::from_str(&response).unwrap();
    assert!(response.success);
    assert_eq!(response.invoice_id, Some(InvoiceId::from("inv-w1".to_string())));
    assert_eq!(response.tx_id.as_deref(), Some("tx-w1"));
    assert_eq!(response.status, Some(InvoiceStatus::Confirmed));

    let invoice = db.fetch_invoice(&"inv-w1".parse().unwrap()).await.unwrap().unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Confirmed);
    assert_eq!(invoice.amount_paid, MicroUnit::from(100));
}

#[actix_web::test]
async fn tampered_signature_is_rejected() {
    let _ = env_logger::try_init().ok();
    let db = new_db().await;
    seed_invoice(&db, "inv-w2", "0xw002", 100).await;
    let app = webhook_app(db.clone(), Some(SECRET)).await;

    let body = payload("0xw002", "tx-w2", 100, true);
    let mut signature = calculate_hmac(SECRET, body.as_bytes()).into_bytes();
    signature[3] = if signature[3] == b'a' { b'b' } else { b'a' };
    let signature = String::from_utf8(signature).unwrap();

    let (status, response) = post(&app, "/webhook/payment", body, Some(signature)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(response.contains(r#""success":false"#));

    // Nothing reached the reconciliation engine.
    let invoice = db.fetch_invoice(&"inv-w2".parse().unwrap()).await.unwrap().unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Pending);
    assert_eq!(invoice.amount_paid, MicroUnit::from(0));
}

#[actix_web::test]
async fn missing_signature_is_rejected_when_secret_is_set() {
    let _ = env_logger::try_init().ok();
    let db = new_db().await;
    seed_invoice(&db, "inv-w3", "0xw003", 100).await;
    let app = webhook_app(db.clone(), Some(SECRET)).await;

    let (status, response) = post(&app, "/webhook/payment", payload("0xw003", "tx-w3", 100, true), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(response.contains(r#""success":false"#));
}

#[actix_web::test]
async fn unsigned_requests_pass_when_no_secret_is_configured() {
    let _ = env_logger::try_init().ok();
    let db = new_db().await;
    seed_invoice(&db, "inv-w4", "0xw004", 100).await;
    let app = webhook_app(db.clone(), None).await;

    let (status, response) = post(&app, "/webhook/payment", payload("0xw004", "tx-w4", 40, false), None).await;
    assert_eq!(status, StatusCode::OK);
    let response: NotificationResponse = serde_json::from_str(&response).unwrap();
    assert_eq!(response.status, Some(InvoiceStatus::Underpaid));
}

#[actix_web::test]
async fn unknown_address_is_not_found() {
    let _ = env_logger::try_init().ok();
    let db = new_db().await;
    seed_invoice(&db, "inv-w5", "0xw005", 100).await;
    let app = webhook_app(db, None).await;

    let (status, response) = post(&app, "/webhook/payment", payload("0xdeadbeef", "tx-w5", 100, true), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(response.contains(r#""success":false"#));
}

#[actix_web::test]
async fn duplicate_invoice_scoped_delivery_is_idempotent() {
    let _ = env_logger::try_init().ok();
    let db = new_db().await;
    seed_invoice(&db, "inv-w6", "0xw006", 100).await;
    let app = webhook_app(db.clone(), None).await;

    let body = payload("0xw006", "tx-w6", 100, true);
    let (status, first) = post(&app, "/webhook/invoice/inv-w6", body.clone(), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, second) = post(&app, "/webhook/invoice/inv-w6", body, None).await;
    assert_eq!(status, StatusCode::OK);
    // The redelivery returns the same success envelope and performs no additional credit.
    assert_eq!(first, second);

    let invoice = db.fetch_invoice(&"inv-w6".parse().unwrap()).await.unwrap().unwrap();
    assert_eq!(invoice.amount_paid, MicroUnit::from(100));
    let balance = db.fetch_balance("m-1", "USDT", "BSC").await.unwrap().unwrap();
    assert_eq!(balance.available, MicroUnit::from(100));
}

#[actix_web::test]
async fn fractional_amounts_are_bad_requests() {
    let _ = env_logger::try_init().ok();
    let db = new_db().await;
    seed_invoice(&db, "inv-w7", "0xw007", 100).await;
    let app = webhook_app(db, None).await;

    let body = r#"{"subscriptionType":"x","address":"0xw007","amount":40.5,"txId":"tx-w7","chain":"BSC"}"#;
    let (status, _) = post(&app, "/webhook/payment", body.to_string(), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn probe_is_public_even_with_a_secret() {
    let _ = env_logger::try_init().ok();
    let db = new_db().await;
    let app = webhook_app(db, Some(SECRET)).await;

    let req = test::TestRequest::get().uri("/webhook").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    let body = String::from_utf8_lossy(&body);
    assert!(body.contains("chainpay-notification-webhook"));
    assert!(body.contains("hmac-sha256-signatures"));
}
