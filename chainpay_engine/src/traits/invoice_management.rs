use thiserror::Error;

use crate::db_types::{Invoice, InvoiceId, LedgerEntry, MerchantBalance};

#[derive(Debug, Clone, Error)]
pub enum InvoiceApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("User error constructing query: {0}")]
    QueryError(String),
}

impl From<sqlx::Error> for InvoiceApiError {
    fn from(e: sqlx::Error) -> Self {
        InvoiceApiError::DatabaseError(e.to_string())
    }
}

/// The `InvoiceManagement` trait defines the read-only query surface of a payment gateway backend.
///
/// The [`PaymentGatewayDatabase`](crate::traits::PaymentGatewayDatabase) trait handles the machinery of applying
/// notifications to invoices; `InvoiceManagement` provides methods for querying the resulting state.
#[allow(async_fn_in_trait)]
pub trait InvoiceManagement {
    /// Fetches the invoice with the given external invoice id. If no invoice exists, `None` is returned.
    async fn fetch_invoice(&self, invoice_id: &InvoiceId) -> Result<Option<Invoice>, InvoiceApiError>;

    /// Fetches all invoices belonging to the given merchant, oldest first.
    async fn fetch_invoices_for_merchant(&self, merchant_id: &str) -> Result<Vec<Invoice>, InvoiceApiError>;

    /// Fetches the payment ledger for the given invoice, in application order.
    async fn fetch_ledger_for_invoice(&self, invoice_id: &InvoiceId) -> Result<Vec<LedgerEntry>, InvoiceApiError>;

    /// Fetches the merchant balance for the given (merchant, asset, chain) triple, if one has been created.
    async fn fetch_balance(
        &self,
        merchant_id: &str,
        asset: &str,
        chain: &str,
    ) -> Result<Option<MerchantBalance>, InvoiceApiError>;
}
