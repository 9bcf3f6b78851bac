//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause
//! the current worker to stop processing new requests. For this reason, any long, non-cpu-bound operation (e.g.
//! I/O, database operations, etc.) should be expressed as futures or asynchronous functions. Async handlers get
//! executed concurrently by worker threads and thus don't block execution.

use actix_web::{get, web, HttpResponse, Responder};
use chainpay_engine::{
    db_types::InvoiceId,
    traits::{InvoiceManagement, PaymentGatewayDatabase},
    InvoiceApi,
    ReconciliationApi,
};
use log::*;

use crate::{
    data_objects::{EndpointInfo, NotificationResponse, PaymentNotification},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ident),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------

#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// ----------------------------------------------   Probe   ----------------------------------------------------

/// A read-only description of the notification endpoint: service name, version and supported features.
/// Informational only; it is registered outside the signed webhook scope.
#[get("/webhook")]
pub async fn webhook_info() -> impl Responder {
    trace!("💻️ Received webhook info request");
    HttpResponse::Ok().json(EndpointInfo::current())
}

// ----------------------------------------------  Webhooks  ----------------------------------------------------

route!(payment_webhook => Post "/payment" impl PaymentGatewayDatabase);
/// The generic notification route.
///
/// The invoice id is unknown here, so the reconciliation engine resolves the notification by its deposit address
/// (falling back to the transaction ledger for confirmation updates). Senders that know the invoice id should
/// prefer the invoice-scoped route; this one exists as compatibility glue for providers that only carry
/// address-level subscriptions.
pub async fn payment_webhook<B: PaymentGatewayDatabase>(
    body: web::Json<PaymentNotification>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let notification = body.into_inner().into_notification();
    debug!("💻️ POST payment notification [{}] for {} on {}", notification.txid, notification.address, notification.chain);
    let result = api.process_notification(&notification).await.map_err(|e| {
        debug!("💻️ Could not process notification. {e}");
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(NotificationResponse::from_result(&result)))
}

route!(invoice_webhook => Post "/invoice/{invoice_id}" impl PaymentGatewayDatabase);
/// The invoice-scoped notification route.
///
/// The invoice id is carried in the request path, so resolution is a direct lookup and the address ambiguity of
/// the generic route never arises.
pub async fn invoice_webhook<B: PaymentGatewayDatabase>(
    path: web::Path<InvoiceId>,
    body: web::Json<PaymentNotification>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let invoice_id = path.into_inner();
    let notification = body.into_inner().into_notification().for_invoice(invoice_id.clone());
    debug!("💻️ POST payment notification [{}] for invoice {invoice_id}", notification.txid);
    let result = api.process_notification(&notification).await.map_err(|e| {
        debug!("💻️ Could not process notification for invoice {invoice_id}. {e}");
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(NotificationResponse::from_result(&result)))
}

// ----------------------------------------------  Queries   ----------------------------------------------------

route!(invoice_status => Get "/invoice/{invoice_id}" impl InvoiceManagement);
/// Fetch an invoice and its payment ledger by invoice id.
pub async fn invoice_status<B: InvoiceManagement>(
    path: web::Path<InvoiceId>,
    api: web::Data<InvoiceApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let invoice_id = path.into_inner();
    debug!("💻️ GET invoice {invoice_id}");
    let result = api.invoice_with_ledger(&invoice_id).await.map_err(|e| {
        debug!("💻️ Could not fetch invoice. {e}");
        ServerError::from(e)
    })?;
    match result {
        Some(result) => Ok(HttpResponse::Ok().json(result)),
        None => Err(ServerError::NoRecordFound(format!("No invoice with id {invoice_id}"))),
    }
}

route!(merchant_invoices => Get "/invoices/{merchant_id}" impl InvoiceManagement);
/// Fetch all invoices for a merchant, oldest first.
pub async fn merchant_invoices<B: InvoiceManagement>(
    path: web::Path<String>,
    api: web::Data<InvoiceApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let merchant_id = path.into_inner();
    debug!("💻️ GET invoices for merchant {merchant_id}");
    let invoices = api.invoices_for_merchant(&merchant_id).await.map_err(|e| {
        debug!("💻️ Could not fetch invoices. {e}");
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(invoices))
}

route!(merchant_balance => Get "/balance/{merchant_id}/{asset}/{chain}" impl InvoiceManagement);
/// Fetch a merchant's balance for one asset on one chain.
pub async fn merchant_balance<B: InvoiceManagement>(
    path: web::Path<(String, String, String)>,
    api: web::Data<InvoiceApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (merchant_id, asset, chain) = path.into_inner();
    let chain = chain.to_uppercase();
    debug!("💻️ GET balance for {merchant_id}/{asset}/{chain}");
    let balance = api.balance(&merchant_id, &asset, &chain).await.map_err(|e| {
        debug!("💻️ Could not fetch balance. {e}");
        ServerError::from(e)
    })?;
    match balance {
        Some(balance) => Ok(HttpResponse::Ok().json(balance)),
        None => Err(ServerError::NoRecordFound(format!("No balance for {merchant_id}/{asset}/{chain}"))),
    }
}
