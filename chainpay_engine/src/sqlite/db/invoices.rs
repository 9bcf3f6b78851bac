use chrono::Duration;
use cpg_common::MicroUnit;
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{DepositAddress, Invoice, InvoiceId, InvoiceStatus, NewInvoice},
    traits::PaymentGatewayError,
};

/// Inserts a new invoice into the database using the given connection. This is not atomic on its own. You can embed
/// this call inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
///
/// The partial unique index on (chain, address) backstops the active-address invariant; a violation of either
/// unique constraint is mapped onto the matching domain error.
pub async fn insert_invoice(invoice: NewInvoice, conn: &mut SqliteConnection) -> Result<Invoice, PaymentGatewayError> {
    let invoice_id = invoice.invoice_id.clone();
    let inserted = sqlx::query_as(
        r#"
            INSERT INTO invoices (invoice_id, merchant_id, asset, chain, address, amount_due)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(invoice.invoice_id)
    .bind(invoice.merchant_id)
    .bind(invoice.asset)
    .bind(invoice.chain.clone())
    .bind(invoice.address.clone())
    .bind(invoice.amount_due)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => {
            if err.message().contains("invoice_id") {
                PaymentGatewayError::InvoiceAlreadyExists(invoice_id)
            } else {
                PaymentGatewayError::AddressInUse(invoice.chain, invoice.address)
            }
        },
        _ => PaymentGatewayError::from(e),
    })?;
    Ok(inserted)
}

/// Returns the invoice with the given external invoice id, if it exists.
pub async fn fetch_invoice_by_invoice_id(
    invoice_id: &InvoiceId,
    conn: &mut SqliteConnection,
) -> Result<Option<Invoice>, sqlx::Error> {
    let invoice = sqlx::query_as("SELECT * FROM invoices WHERE invoice_id = $1")
        .bind(invoice_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(invoice)
}

/// Returns the single *active* invoice bound to the given deposit address on the given chain.
///
/// Two or more matches violate the active-address invariant and surface as
/// [`PaymentGatewayError::DuplicateDepositAddress`] instead of silently picking one.
pub async fn fetch_active_invoice_for_address(
    chain: &str,
    address: &DepositAddress,
    conn: &mut SqliteConnection,
) -> Result<Option<Invoice>, PaymentGatewayError> {
    let mut matches: Vec<Invoice> = sqlx::query_as(
        r#"
        SELECT * FROM invoices
        WHERE chain = $1 AND address = $2 AND status IN ('Pending', 'Underpaid')
        ORDER BY id
        LIMIT 2"#,
    )
    .bind(chain)
    .bind(address.as_str())
    .fetch_all(conn)
    .await?;
    if matches.len() > 1 {
        return Err(PaymentGatewayError::DuplicateDepositAddress(chain.to_string(), address.clone()));
    }
    Ok(matches.pop())
}

/// Returns the invoice that the given transaction id has been applied to on the given chain, if any.
pub async fn fetch_invoice_for_txid(
    chain: &str,
    txid: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Invoice>, sqlx::Error> {
    let invoice = sqlx::query_as(
        r#"
        SELECT invoices.* FROM invoices JOIN invoice_payments ON invoices.id = invoice_payments.invoice_id
        WHERE invoices.chain = $1 AND invoice_payments.txid = $2
        LIMIT 1"#,
    )
    .bind(chain)
    .bind(txid)
    .fetch_optional(conn)
    .await?;
    Ok(invoice)
}

/// Accumulates a payment into the invoice's paid total.
///
/// The addition happens inside the UPDATE statement, so two notifications can never both observe the pre-update
/// total and apply over it.
pub(crate) async fn add_payment_amount(
    id: i64,
    amount: MicroUnit,
    conn: &mut SqliteConnection,
) -> Result<Invoice, PaymentGatewayError> {
    let result: Option<Invoice> = sqlx::query_as(
        "UPDATE invoices SET amount_paid = amount_paid + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(amount)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    let invoice = result.ok_or_else(|| PaymentGatewayError::DatabaseError(format!("Invoice row {id} vanished")))?;
    trace!("🗃️ Invoice [{}] paid total is now {}", invoice.invoice_id, invoice.amount_paid);
    Ok(invoice)
}

pub(crate) async fn update_invoice_status(
    id: i64,
    status: InvoiceStatus,
    conn: &mut SqliteConnection,
) -> Result<Invoice, PaymentGatewayError> {
    let status_str = status.to_string();
    let result: Option<Invoice> =
        sqlx::query_as("UPDATE invoices SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status_str)
            .bind(id)
            .fetch_optional(conn)
            .await?;
    let invoice = result.ok_or_else(|| PaymentGatewayError::DatabaseError(format!("Invoice row {id} vanished")))?;
    debug!("🗃️ Invoice [{}] is now {}", invoice.invoice_id, invoice.status);
    Ok(invoice)
}

/// Marks active invoices that have not been updated within `limit` as expired, returning the closed invoices.
pub(crate) async fn expire_invoices(
    limit: Duration,
    conn: &mut SqliteConnection,
) -> Result<Vec<Invoice>, PaymentGatewayError> {
    let rows = sqlx::query_as(
        format!(
            "UPDATE invoices SET updated_at = CURRENT_TIMESTAMP, status = 'Expired' WHERE status IN ('Pending', \
             'Underpaid') AND (unixepoch(CURRENT_TIMESTAMP) - unixepoch(updated_at)) > {} RETURNING *;",
            limit.num_seconds()
        )
        .as_str(),
    )
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// Fetches all invoices for the given merchant, oldest first.
pub async fn fetch_invoices_for_merchant(
    merchant_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Invoice>, sqlx::Error> {
    let invoices = sqlx::query_as("SELECT * FROM invoices WHERE merchant_id = $1 ORDER BY created_at ASC")
        .bind(merchant_id)
        .fetch_all(conn)
        .await?;
    Ok(invoices)
}
