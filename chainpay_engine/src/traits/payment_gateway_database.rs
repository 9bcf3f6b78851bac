use chrono::Duration;
use thiserror::Error;

use crate::{
    db_types::{DepositAddress, Invoice, InvoiceId, InvoiceStatus, NewInvoice},
    traits::{
        data_objects::{ExpiryResult, PaymentUpdate, ReconciliationResult},
        InvoiceApiError,
        InvoiceManagement,
    },
};

/// This trait defines the mutation surface for backends supporting the ChainPay payment engine.
///
/// This behaviour includes:
/// * Creating invoices (on behalf of the out-of-scope invoice-creation flow).
/// * Resolving deposit addresses and transaction ids to invoices.
/// * Applying payment notifications to invoices atomically.
/// * Expiring stale invoices.
#[allow(async_fn_in_trait)]
pub trait PaymentGatewayDatabase: Clone + InvoiceManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Inserts a new invoice in `Pending` status.
    ///
    /// Fails with [`PaymentGatewayError::InvoiceAlreadyExists`] if the invoice id is taken, and with
    /// [`PaymentGatewayError::AddressInUse`] if another *active* invoice already owns the deposit address on the
    /// same chain. Address reuse by settled or expired invoices is allowed.
    async fn create_invoice(&self, invoice: NewInvoice) -> Result<Invoice, PaymentGatewayError>;

    /// Fetches the single active invoice bound to the given deposit address on the given chain.
    ///
    /// Zero matches returns `None`. More than one match means the active-address invariant has been violated
    /// upstream and fails with [`PaymentGatewayError::DuplicateDepositAddress`] rather than silently picking one.
    async fn fetch_active_invoice_for_address(
        &self,
        chain: &str,
        address: &DepositAddress,
    ) -> Result<Option<Invoice>, PaymentGatewayError>;

    /// Fetches the invoice that the given transaction id was previously applied to, if any.
    ///
    /// This is the fallback for confirmation updates arriving on the generic route after an invoice has left the
    /// active set and its address no longer resolves.
    async fn fetch_invoice_for_txid(&self, chain: &str, txid: &str) -> Result<Option<Invoice>, PaymentGatewayError>;

    /// Applies a validated payment to an invoice in a single atomic transaction:
    ///
    /// * If the (invoice, txid) pair is already recorded with the same-or-better confirmation state, nothing is
    ///   changed and the current state is returned with `replayed = true`.
    /// * If the pair is recorded unconfirmed and the update is confirmed, the entry is marked confirmed and the
    ///   invoice status is re-evaluated; the amount is never applied twice.
    /// * Otherwise the payment is recorded, the paid total accumulated, the status recomputed, and the merchant
    ///   balance credited if the invoice transitioned into `Paid` or `Confirmed`.
    ///
    /// Either every effect persists or none do.
    async fn apply_payment(
        &self,
        invoice_id: &InvoiceId,
        update: PaymentUpdate,
    ) -> Result<ReconciliationResult, PaymentGatewayError>;

    /// Marks active invoices that have not been updated for longer than `unpaid_limit` as `Expired`.
    ///
    /// The result lists the invoices that were expired by this sweep.
    async fn expire_old_invoices(&self, unpaid_limit: Duration) -> Result<ExpiryResult, PaymentGatewayError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), PaymentGatewayError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum PaymentGatewayError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("Cannot insert invoice, since it already exists with id {0}")]
    InvoiceAlreadyExists(InvoiceId),
    #[error("Deposit address {1} on {0} is already bound to an active invoice")]
    AddressInUse(String, DepositAddress),
    #[error("The requested invoice {0} does not exist")]
    InvoiceNotFound(InvoiceId),
    #[error("No active invoice matches address {1} on {0}")]
    NoMatchingInvoice(String, DepositAddress),
    #[error("Data integrity violation: address {1} on {0} resolves to more than one active invoice")]
    DuplicateDepositAddress(String, DepositAddress),
    #[error("Invalid notification: {0}")]
    InvalidNotification(String),
    #[error("Invoice {0} is {1} and cannot accept this notification")]
    StatusConflict(InvoiceId, InvoiceStatus),
    #[error("{0}")]
    QueryError(#[from] InvoiceApiError),
}

impl From<sqlx::Error> for PaymentGatewayError {
    fn from(e: sqlx::Error) -> Self {
        PaymentGatewayError::DatabaseError(e.to_string())
    }
}
