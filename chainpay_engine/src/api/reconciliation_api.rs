use std::{collections::HashMap, fmt::Debug};

use chrono::Duration;
use log::*;

use crate::{
    db_types::{Invoice, NewInvoice, Notification},
    events::{EventProducers, InvoiceConfirmedEvent, InvoicePaidEvent},
    traits::{ExpiryResult, PaymentGatewayDatabase, PaymentGatewayError, PaymentUpdate, ReconciliationResult},
};

pub const DEFAULT_REQUIRED_CONFIRMATIONS: u32 = 3;

/// The policy knobs the reconciliation engine applies to every notification.
#[derive(Debug, Clone)]
pub struct ReconciliationConfig {
    /// The confirmation threshold used for chains without an explicit override
    pub required_confirmations: u32,
    /// Per-chain confirmation thresholds, keyed by lower-cased chain name
    pub chain_confirmations: HashMap<String, u32>,
    /// The processing fee withheld from merchant credits, in basis points
    pub fee_bps: u16,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self { required_confirmations: DEFAULT_REQUIRED_CONFIRMATIONS, chain_confirmations: HashMap::new(), fee_bps: 0 }
    }
}

impl ReconciliationConfig {
    pub fn confirmations_for(&self, chain: &str) -> u32 {
        self.chain_confirmations.get(&chain.to_lowercase()).copied().unwrap_or(self.required_confirmations)
    }
}

/// `ReconciliationApi` is the primary API for applying blockchain payment notifications to invoices.
///
/// It validates the notification, resolves it to exactly one invoice, hands it to the backend for the atomic
/// status/ledger/balance update, and fires the invoice-paid and invoice-confirmed hooks for fresh transitions.
pub struct ReconciliationApi<B> {
    db: B,
    config: ReconciliationConfig,
    producers: EventProducers,
}

impl<B> Debug for ReconciliationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B> ReconciliationApi<B> {
    pub fn new(db: B, config: ReconciliationConfig, producers: EventProducers) -> Self {
        Self { db, config, producers }
    }
}

impl<B> ReconciliationApi<B>
where B: PaymentGatewayDatabase
{
    /// Submit a new invoice to the engine on behalf of the invoice-creation flow.
    ///
    /// The invoice starts out `Pending`. The engine refuses to bind a deposit address that another active invoice
    /// already owns.
    pub async fn create_invoice(&self, invoice: NewInvoice) -> Result<Invoice, PaymentGatewayError> {
        let invoice = self.db.create_invoice(invoice).await?;
        debug!("🧾️ Invoice [{}] for {} {} accepted", invoice.invoice_id, invoice.amount_due, invoice.asset);
        Ok(invoice)
    }

    /// Apply an inbound payment notification.
    ///
    /// The notification must already have been authenticated (the signature check lives at the HTTP boundary).
    /// Processing is idempotent per transaction id: redelivery returns the recorded outcome without changing
    /// invoice, ledger or balance state.
    pub async fn process_notification(
        &self,
        notification: &Notification,
    ) -> Result<ReconciliationResult, PaymentGatewayError> {
        let update = self.validate(notification)?;
        let invoice = self.resolve_invoice(notification).await?;
        trace!("🧾️ Notification [{}] resolved to invoice [{}]", notification.txid, invoice.invoice_id);
        let result = self.db.apply_payment(&invoice.invoice_id, update).await?;
        if result.replayed {
            debug!(
                "🧾️ Notification [{}] for invoice [{}] was a replay. No state was changed.",
                notification.txid, result.invoice.invoice_id
            );
        } else {
            debug!(
                "🧾️ Notification [{}] applied. Invoice [{}] went {} -> {} ({} of {} paid)",
                notification.txid,
                result.invoice.invoice_id,
                result.previous_status,
                result.invoice.status,
                result.invoice.amount_paid,
                result.invoice.amount_due,
            );
        }
        self.call_hooks(&result).await;
        Ok(result)
    }

    /// Resolve a notification to exactly one invoice.
    ///
    /// An embedded invoice id wins. Otherwise the deposit address is looked up among active invoices, falling back
    /// to the transaction ledger so confirmation updates still resolve after an invoice left the active set.
    pub async fn resolve_invoice(&self, notification: &Notification) -> Result<Invoice, PaymentGatewayError> {
        if let Some(invoice_id) = &notification.invoice_id {
            let invoice = self
                .db
                .fetch_invoice(invoice_id)
                .await?
                .ok_or_else(|| PaymentGatewayError::InvoiceNotFound(invoice_id.clone()))?;
            return Ok(invoice);
        }
        if let Some(invoice) =
            self.db.fetch_active_invoice_for_address(&notification.chain, &notification.address).await?
        {
            return Ok(invoice);
        }
        match self.db.fetch_invoice_for_txid(&notification.chain, &notification.txid).await? {
            Some(invoice) => Ok(invoice),
            None => Err(PaymentGatewayError::NoMatchingInvoice(
                notification.chain.clone(),
                notification.address.clone(),
            )),
        }
    }

    /// Marks active invoices that have gone unpaid past `unpaid_limit` as expired.
    pub async fn expire_old_invoices(&self, unpaid_limit: Duration) -> Result<ExpiryResult, PaymentGatewayError> {
        let result = self.db.expire_old_invoices(unpaid_limit).await?;
        if result.count() > 0 {
            info!("🧾️ {} invoices expired", result.count());
        }
        Ok(result)
    }

    fn validate(&self, notification: &Notification) -> Result<PaymentUpdate, PaymentGatewayError> {
        if notification.txid.trim().is_empty() {
            return Err(PaymentGatewayError::InvalidNotification("Missing transaction id".into()));
        }
        if notification.invoice_id.is_none() && notification.address.is_empty() {
            return Err(PaymentGatewayError::InvalidNotification("Missing target address".into()));
        }
        if notification.amount.is_negative() {
            return Err(PaymentGatewayError::InvalidNotification(format!(
                "Negative amount {}",
                notification.amount
            )));
        }
        let confirmed = notification.confirmations.meets(self.config.confirmations_for(&notification.chain));
        // A zero amount is only meaningful as a confirmation signal for an earlier transfer.
        if notification.amount.is_zero() && !confirmed {
            return Err(PaymentGatewayError::InvalidNotification("Zero amount on an unconfirmed transfer".into()));
        }
        Ok(PaymentUpdate {
            txid: notification.txid.clone(),
            amount: notification.amount,
            confirmed,
            block_number: notification.block_number,
            fee_bps: self.config.fee_bps,
        })
    }

    async fn call_hooks(&self, result: &ReconciliationResult) {
        if result.newly_paid() {
            for producer in &self.producers.invoice_paid_producer {
                trace!("🧾️ Notifying invoice paid hook subscribers");
                producer.publish_event(InvoicePaidEvent::new(result.invoice.clone())).await;
            }
        }
        if result.newly_confirmed() {
            let credited = result.credited.unwrap_or_default();
            for producer in &self.producers.invoice_confirmed_producer {
                trace!("🧾️ Notifying invoice confirmed hook subscribers");
                producer.publish_event(InvoiceConfirmedEvent::new(result.invoice.clone(), credited)).await;
            }
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
