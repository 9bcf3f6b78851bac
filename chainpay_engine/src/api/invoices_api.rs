//! Unified read-only API over invoices, their payment ledgers and merchant balances.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Invoice, InvoiceId, LedgerEntry, MerchantBalance},
    traits::{InvoiceApiError, InvoiceManagement},
};

/// An invoice together with its full payment ledger, as returned by the query routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceResult {
    pub invoice: Invoice,
    pub payments: Vec<LedgerEntry>,
}

/// The `InvoiceApi` provides a unified API for querying invoices and balances.
pub struct InvoiceApi<B> {
    db: B,
}

impl<B: Debug> Debug for InvoiceApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InvoiceApi ({:?})", self.db)
    }
}

impl<B> InvoiceApi<B>
where B: InvoiceManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Fetches an invoice together with every payment applied to it. If no invoice exists, `None` is returned.
    pub async fn invoice_with_ledger(&self, invoice_id: &InvoiceId) -> Result<Option<InvoiceResult>, InvoiceApiError> {
        let Some(invoice) = self.db.fetch_invoice(invoice_id).await? else {
            return Ok(None);
        };
        let payments = self.db.fetch_ledger_for_invoice(invoice_id).await?;
        Ok(Some(InvoiceResult { invoice, payments }))
    }

    /// Fetches all invoices for the given merchant, oldest first.
    pub async fn invoices_for_merchant(&self, merchant_id: &str) -> Result<Vec<Invoice>, InvoiceApiError> {
        self.db.fetch_invoices_for_merchant(merchant_id).await
    }

    /// Fetches the merchant balance for one asset on one chain, if any funds have ever been credited.
    pub async fn balance(
        &self,
        merchant_id: &str,
        asset: &str,
        chain: &str,
    ) -> Result<Option<MerchantBalance>, InvoiceApiError> {
        self.db.fetch_balance(merchant_id, asset, chain).await
    }
}
