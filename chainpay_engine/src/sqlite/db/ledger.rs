use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{InvoiceId, LedgerEntry},
    traits::{PaymentGatewayError, PaymentUpdate},
};

/// Returns the ledger entry for the given (invoice row, txid) pair, if the transaction has been applied before.
pub async fn fetch_entry(
    invoice_id: i64,
    txid: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<LedgerEntry>, sqlx::Error> {
    let entry = sqlx::query_as("SELECT * FROM invoice_payments WHERE invoice_id = $1 AND txid = $2")
        .bind(invoice_id)
        .bind(txid)
        .fetch_optional(conn)
        .await?;
    Ok(entry)
}

/// Records a transaction against an invoice.
///
/// The UNIQUE (invoice_id, txid) constraint turns a racing duplicate into an error that the caller resolves as a
/// replay, so the same on-chain transaction can never be applied twice.
pub async fn insert_entry(
    invoice_id: i64,
    update: &PaymentUpdate,
    conn: &mut SqliteConnection,
) -> Result<LedgerEntry, PaymentGatewayError> {
    let entry: LedgerEntry = sqlx::query_as(
        r#"
            INSERT INTO invoice_payments (invoice_id, txid, amount, confirmed, block_number)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(invoice_id)
    .bind(&update.txid)
    .bind(update.amount)
    .bind(update.confirmed)
    .bind(update.block_number)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => PaymentGatewayError::InvalidNotification(format!(
            "Transaction {} has already been applied to this invoice",
            update.txid
        )),
        _ => PaymentGatewayError::from(e),
    })?;
    trace!("🗃️ Recorded transaction [{}] ({}) against invoice row {invoice_id}", entry.txid, entry.amount);
    Ok(entry)
}

/// Promotes a ledger entry to confirmed.
pub async fn confirm_entry(id: i64, conn: &mut SqliteConnection) -> Result<LedgerEntry, PaymentGatewayError> {
    let entry: Option<LedgerEntry> =
        sqlx::query_as("UPDATE invoice_payments SET confirmed = 1, updated_at = CURRENT_TIMESTAMP WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(conn)
            .await?;
    entry.ok_or_else(|| PaymentGatewayError::DatabaseError(format!("Ledger entry {id} vanished")))
}

/// Fetches the full payment ledger for an invoice, in application order.
pub async fn fetch_entries_for_invoice(
    invoice_id: &InvoiceId,
    conn: &mut SqliteConnection,
) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    let entries = sqlx::query_as(
        r#"
        SELECT invoice_payments.* FROM invoice_payments JOIN invoices ON invoices.id = invoice_payments.invoice_id
        WHERE invoices.invoice_id = $1
        ORDER BY invoice_payments.id ASC"#,
    )
    .bind(invoice_id.as_str())
    .fetch_all(conn)
    .await?;
    Ok(entries)
}
