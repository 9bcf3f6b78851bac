use cpg_common::MicroUnit;
use serde::{Deserialize, Serialize};

use crate::db_types::Invoice;

/// Fired when an invoice's amount due is fully covered but not yet confirmed on chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoicePaidEvent {
    pub invoice: Invoice,
}

impl InvoicePaidEvent {
    pub fn new(invoice: Invoice) -> Self {
        Self { invoice }
    }
}

/// Fired when an invoice reaches `Confirmed` and the merchant balance has been credited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceConfirmedEvent {
    pub invoice: Invoice,
    /// The net amount credited to the merchant's available balance
    pub credited: MicroUnit,
}

impl InvoiceConfirmedEvent {
    pub fn new(invoice: Invoice, credited: MicroUnit) -> Self {
        Self { invoice, credited }
    }
}
