//! Webhook signature middleware for Actix Web.
//!
//! This module provides a middleware that checks the keyed signature of incoming notification requests.
//!
//! Notification senders sign the exact raw request body with HMAC-SHA256 under the shared secret and place the
//! hex-encoded digest in the signature header (`x-webhook-signature` by default).
//!
//! Wrap the webhook scope with this middleware to reject unauthenticated notifications before they reach the
//! reconciliation engine. When no secret is configured the middleware passes everything through; a request that
//! omits the header while a secret *is* configured is rejected rather than silently accepted.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorBadRequest,
    web,
    Error,
};
use cpg_common::Secret;
use log::{trace, warn};

use crate::{
    errors::{AuthError, ServerError},
    helpers::verify_hmac,
};

pub struct SignatureMiddlewareFactory {
    signature_header: String,
    // If absent, the middleware will not check signatures and always allow the call
    secret: Option<Secret<String>>,
}

impl SignatureMiddlewareFactory {
    pub fn new(signature_header: &str, secret: Option<Secret<String>>) -> Self {
        SignatureMiddlewareFactory { signature_header: signature_header.into(), secret }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SignatureMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = SignatureMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SignatureMiddlewareService {
            signature_header: self.signature_header.clone(),
            secret: self.secret.clone(),
            service: Rc::new(service),
        }))
    }
}

pub struct SignatureMiddlewareService<S> {
    signature_header: String,
    secret: Option<Secret<String>>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SignatureMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = futures::future::LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.secret.clone();
        let signature_header = self.signature_header.clone();
        Box::pin(async move {
            trace!("🔐️ Checking webhook signature for request");
            let Some(secret) = secret else {
                trace!("🔐️ No webhook secret is configured. Allowing request.");
                return service.call(req).await;
            };
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract request data: {:?}", e);
                ErrorBadRequest("Failed to extract request data.")
            })?;
            let provided = req.headers().get(&signature_header).and_then(|v| v.to_str().ok());
            let Some(provided) = provided else {
                warn!("🔐️ No webhook signature found in request. Denying access.");
                return Err(ServerError::AuthenticationError(AuthError::MissingSignature).into());
            };
            if verify_hmac(secret.reveal(), data.as_ref(), provided) {
                trace!("🔐️ Webhook signature check for request ✅️");
                req.set_payload(bytes_to_payload(data));
                service.call(req).await
            } else {
                warn!("🔐️ Invalid webhook signature found in request. Denying access.");
                Err(ServerError::AuthenticationError(AuthError::InvalidSignature).into())
            }
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
