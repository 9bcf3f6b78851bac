use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use chainpay_engine::{events::EventProducers, InvoiceApi, ReconciliationApi, SqliteDatabase};
use log::info;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    expiry_worker::ExpiryWorker,
    middleware::SignatureMiddlewareFactory,
    routes::{
        health,
        webhook_info,
        InvoiceStatusRoute,
        InvoiceWebhookRoute,
        MerchantBalanceRoute,
        MerchantInvoicesRoute,
        PaymentWebhookRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    SqliteDatabase::create_database_if_missing(&config.database_url)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let producers = EventProducers::default();
    // The expiry worker is owned here, with an explicit start and stop, rather than living as ambient global
    // state tied to process signals.
    let worker = ExpiryWorker::start(db.clone(), producers.clone(), config.unpaid_invoice_timeout);
    let srv = create_server_instance(config, db, producers)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    worker.stop();
    result
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    if config.webhook.secret.is_none() {
        info!("🔐️ Webhook signature checks are disabled for this instance.");
    }
    let srv = HttpServer::new(move || {
        let reconciliation_api = ReconciliationApi::new(db.clone(), config.reconciliation.clone(), producers.clone());
        let invoice_api = InvoiceApi::new(db.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("cpg::access_log"))
            .app_data(web::Data::new(reconciliation_api))
            .app_data(web::Data::new(invoice_api));
        // Notification ingress; every POST in this scope must carry a valid signature when a secret is set.
        let webhook_scope = web::scope("/webhook")
            .wrap(SignatureMiddlewareFactory::new(&config.webhook.signature_header, config.webhook.secret.clone()))
            .service(PaymentWebhookRoute::<SqliteDatabase>::new())
            .service(InvoiceWebhookRoute::<SqliteDatabase>::new());
        // Read-only queries
        let api_scope = web::scope("/api")
            .service(InvoiceStatusRoute::<SqliteDatabase>::new())
            .service(MerchantInvoicesRoute::<SqliteDatabase>::new())
            .service(MerchantBalanceRoute::<SqliteDatabase>::new());
        app.service(health).service(webhook_info).service(webhook_scope).service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
