use cpg_common::MicroUnit;
use serde::Serialize;

use crate::db_types::{Invoice, InvoiceStatus, LedgerEntry};

/// A validated, normalized payment ready to be applied to an invoice.
///
/// The reconciliation API produces one of these from a raw notification: the confirmation flag has already been
/// resolved against the chain's required threshold, and the fee rate is carried along so the backend can compute
/// the net credit inside the same transaction that records the payment.
#[derive(Debug, Clone)]
pub struct PaymentUpdate {
    pub txid: String,
    pub amount: MicroUnit,
    pub confirmed: bool,
    pub block_number: Option<i64>,
    pub fee_bps: u16,
}

/// The outcome of applying one notification to one invoice.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationResult {
    /// The invoice as it stands after the notification was applied
    pub invoice: Invoice,
    /// The ledger entry for the notification's transaction id
    pub entry: LedgerEntry,
    /// The invoice status before this notification was applied
    pub previous_status: InvoiceStatus,
    /// The net amount credited to the merchant's available balance by this call, if any
    pub credited: Option<MicroUnit>,
    /// True when the notification was a pure replay and nothing changed
    pub replayed: bool,
}

impl ReconciliationResult {
    /// True when this call moved the invoice into `Paid`.
    pub fn newly_paid(&self) -> bool {
        !self.replayed && self.previous_status != InvoiceStatus::Paid && self.invoice.status == InvoiceStatus::Paid
    }

    /// True when this call moved the invoice into `Confirmed` (and therefore credited the merchant).
    pub fn newly_confirmed(&self) -> bool {
        !self.replayed
            && self.previous_status != InvoiceStatus::Confirmed
            && self.invoice.status == InvoiceStatus::Confirmed
    }
}

/// The invoices closed by one expiry sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExpiryResult {
    pub expired: Vec<Invoice>,
}

impl ExpiryResult {
    pub fn count(&self) -> usize {
        self.expired.len()
    }
}
