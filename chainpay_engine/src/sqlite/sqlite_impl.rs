//! `SqliteDatabase` is a concrete implementation of a ChainPay payment engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module. Every mutation path runs inside a single database transaction: a notification either lands completely
//! (ledger entry, paid total, status, balance) or not at all.
use std::fmt::Debug;

use chrono::Duration;
use cpg_common::MicroUnit;
use log::*;
use sqlx::{SqliteConnection, SqlitePool};

use super::db::{balances, db_url, invoices, ledger, new_pool};
use crate::{
    db_types::{DepositAddress, Invoice, InvoiceId, InvoiceStatus, LedgerEntry, MerchantBalance, NewInvoice},
    traits::{
        ExpiryResult,
        InvoiceApiError,
        InvoiceManagement,
        PaymentGatewayDatabase,
        PaymentGatewayError,
        PaymentUpdate,
        ReconciliationResult,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl PaymentGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_invoice(&self, invoice: NewInvoice) -> Result<Invoice, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        if invoices::fetch_active_invoice_for_address(&invoice.chain, &invoice.address, &mut tx).await?.is_some() {
            return Err(PaymentGatewayError::AddressInUse(invoice.chain, invoice.address));
        }
        let invoice = invoices::insert_invoice(invoice, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Invoice [{}] created for merchant {} with address {}", invoice.invoice_id, invoice.merchant_id, invoice.address);
        Ok(invoice)
    }

    async fn fetch_active_invoice_for_address(
        &self,
        chain: &str,
        address: &DepositAddress,
    ) -> Result<Option<Invoice>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        invoices::fetch_active_invoice_for_address(chain, address, &mut conn).await
    }

    async fn fetch_invoice_for_txid(&self, chain: &str, txid: &str) -> Result<Option<Invoice>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let invoice = invoices::fetch_invoice_for_txid(chain, txid, &mut conn).await?;
        Ok(invoice)
    }

    /// Takes a validated payment update, and in a single atomic transaction,
    /// * replays it without side effects if its transaction id is already recorded with the same confirmation state,
    /// * promotes the recorded transaction (and possibly the invoice) to confirmed if it only adds a confirmation,
    /// * or records it, accumulates the paid total, recomputes the invoice status and credits the merchant.
    async fn apply_payment(
        &self,
        invoice_id: &InvoiceId,
        update: PaymentUpdate,
    ) -> Result<ReconciliationResult, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let invoice = invoices::fetch_invoice_by_invoice_id(invoice_id, &mut tx)
            .await?
            .ok_or_else(|| PaymentGatewayError::InvoiceNotFound(invoice_id.clone()))?;
        let previous_status = invoice.status;
        let existing = ledger::fetch_entry(invoice.id, &update.txid, &mut tx).await?;
        let result = match existing {
            Some(entry) if entry.confirmed || !update.confirmed => {
                trace!(
                    "🗃️ Transaction [{}] is already recorded against invoice [{}]. Nothing to apply.",
                    entry.txid,
                    invoice.invoice_id
                );
                ReconciliationResult { invoice, entry, previous_status, credited: None, replayed: true }
            },
            Some(entry) => {
                if matches!(previous_status, InvoiceStatus::Expired | InvoiceStatus::Failed) {
                    return Err(PaymentGatewayError::StatusConflict(invoice.invoice_id.clone(), previous_status));
                }
                let entry = ledger::confirm_entry(entry.id, &mut tx).await?;
                promote_confirmed(invoice, entry, update.fee_bps, &mut tx).await?
            },
            None => {
                if !previous_status.is_active() {
                    return Err(PaymentGatewayError::StatusConflict(invoice.invoice_id.clone(), previous_status));
                }
                let entry = ledger::insert_entry(invoice.id, &update, &mut tx).await?;
                let invoice = invoices::add_payment_amount(invoice.id, update.amount, &mut tx).await?;
                settle_payment(invoice, entry, previous_status, update.confirmed, update.fee_bps, &mut tx).await?
            },
        };
        tx.commit().await?;
        Ok(result)
    }

    async fn expire_old_invoices(&self, unpaid_limit: Duration) -> Result<ExpiryResult, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let expired = invoices::expire_invoices(unpaid_limit, &mut tx).await?;
        tx.commit().await?;
        Ok(ExpiryResult { expired })
    }

    async fn close(&mut self) -> Result<(), PaymentGatewayError> {
        self.pool.close().await;
        Ok(())
    }
}

/// Recomputes the invoice status after a new payment was accumulated, and credits the merchant on a transition
/// into `Paid` (pending funds) or `Confirmed` (available funds).
async fn settle_payment(
    invoice: Invoice,
    entry: LedgerEntry,
    previous_status: InvoiceStatus,
    confirmed: bool,
    fee_bps: u16,
    conn: &mut SqliteConnection,
) -> Result<ReconciliationResult, PaymentGatewayError> {
    let covered = invoice.amount_paid >= invoice.amount_due;
    let new_status = if covered && confirmed {
        InvoiceStatus::Confirmed
    } else if covered {
        InvoiceStatus::Paid
    } else if invoice.amount_paid.is_positive() {
        InvoiceStatus::Underpaid
    } else {
        InvoiceStatus::Pending
    };
    let mut credited = None;
    let invoice = if new_status == previous_status {
        invoice
    } else {
        let invoice = invoices::update_invoice_status(invoice.id, new_status, conn).await?;
        let net = invoice.amount_paid.less_fee(fee_bps);
        let zero = MicroUnit::from(0);
        match new_status {
            InvoiceStatus::Paid => {
                balances::adjust_balances(&invoice.merchant_id, &invoice.asset, &invoice.chain, zero, net, conn)
                    .await?;
            },
            InvoiceStatus::Confirmed => {
                balances::adjust_balances(&invoice.merchant_id, &invoice.asset, &invoice.chain, net, zero, conn)
                    .await?;
                credited = Some(net);
            },
            _ => {},
        }
        invoice
    };
    Ok(ReconciliationResult { invoice, entry, previous_status, credited, replayed: false })
}

/// Re-evaluates an invoice after one of its recorded transactions was promoted to confirmed.
///
/// A `Paid` invoice whose total is covered moves to `Confirmed` and the held pending funds move to available.
/// An `Underpaid` invoice stays where it is; a `Confirmed` invoice is never credited again.
async fn promote_confirmed(
    invoice: Invoice,
    entry: LedgerEntry,
    fee_bps: u16,
    conn: &mut SqliteConnection,
) -> Result<ReconciliationResult, PaymentGatewayError> {
    let previous_status = invoice.status;
    let covered = invoice.amount_paid >= invoice.amount_due;
    if previous_status == InvoiceStatus::Paid && covered {
        let invoice = invoices::update_invoice_status(invoice.id, InvoiceStatus::Confirmed, conn).await?;
        let net = invoice.amount_paid.less_fee(fee_bps);
        balances::adjust_balances(&invoice.merchant_id, &invoice.asset, &invoice.chain, net, -net, conn).await?;
        debug!("🗃️ Invoice [{}] confirmed. {} moved from pending to available.", invoice.invoice_id, net);
        Ok(ReconciliationResult { invoice, entry, previous_status, credited: Some(net), replayed: false })
    } else {
        trace!(
            "🗃️ Transaction [{}] confirmed, but invoice [{}] remains {}",
            entry.txid,
            invoice.invoice_id,
            previous_status
        );
        Ok(ReconciliationResult { invoice, entry, previous_status, credited: None, replayed: false })
    }
}

impl InvoiceManagement for SqliteDatabase {
    async fn fetch_invoice(&self, invoice_id: &InvoiceId) -> Result<Option<Invoice>, InvoiceApiError> {
        let mut conn = self.pool.acquire().await.map_err(|e| InvoiceApiError::DatabaseError(e.to_string()))?;
        let invoice = invoices::fetch_invoice_by_invoice_id(invoice_id, &mut conn).await?;
        Ok(invoice)
    }

    async fn fetch_invoices_for_merchant(&self, merchant_id: &str) -> Result<Vec<Invoice>, InvoiceApiError> {
        let mut conn = self.pool.acquire().await.map_err(|e| InvoiceApiError::DatabaseError(e.to_string()))?;
        let invoices = invoices::fetch_invoices_for_merchant(merchant_id, &mut conn).await?;
        Ok(invoices)
    }

    async fn fetch_ledger_for_invoice(&self, invoice_id: &InvoiceId) -> Result<Vec<LedgerEntry>, InvoiceApiError> {
        let mut conn = self.pool.acquire().await.map_err(|e| InvoiceApiError::DatabaseError(e.to_string()))?;
        let entries = ledger::fetch_entries_for_invoice(invoice_id, &mut conn).await?;
        Ok(entries)
    }

    async fn fetch_balance(
        &self,
        merchant_id: &str,
        asset: &str,
        chain: &str,
    ) -> Result<Option<MerchantBalance>, InvoiceApiError> {
        let mut conn = self.pool.acquire().await.map_err(|e| InvoiceApiError::DatabaseError(e.to_string()))?;
        let balance = balances::fetch_balance(merchant_id, asset, chain, &mut conn).await?;
        Ok(balance)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL from the environment (or the default).
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Creates the database file behind `url` if it does not exist yet.
    pub async fn create_database_if_missing(url: &str) -> Result<(), sqlx::Error> {
        super::db::create_database_if_missing(url).await
    }

    /// Brings the schema up to date by running the embedded migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        super::db::run_migrations(&self.pool).await
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
