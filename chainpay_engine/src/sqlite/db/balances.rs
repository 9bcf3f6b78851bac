use cpg_common::MicroUnit;
use log::debug;
use sqlx::SqliteConnection;

use crate::{db_types::MerchantBalance, traits::PaymentGatewayError};

/// Returns the balance row for the given (merchant, asset, chain) triple, if one has been created.
pub async fn fetch_balance(
    merchant_id: &str,
    asset: &str,
    chain: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<MerchantBalance>, sqlx::Error> {
    let balance =
        sqlx::query_as("SELECT * FROM merchant_balances WHERE merchant_id = $1 AND asset = $2 AND chain = $3")
            .bind(merchant_id)
            .bind(asset)
            .bind(chain)
            .fetch_optional(conn)
            .await?;
    Ok(balance)
}

/// Applies deltas to a merchant's balance, creating the row on first touch.
///
/// The upsert keeps the read-modify-write inside the database so concurrent credits cannot lose updates.
pub async fn adjust_balances(
    merchant_id: &str,
    asset: &str,
    chain: &str,
    available_delta: MicroUnit,
    pending_delta: MicroUnit,
    conn: &mut SqliteConnection,
) -> Result<MerchantBalance, PaymentGatewayError> {
    let balance: MerchantBalance = sqlx::query_as(
        r#"
            INSERT INTO merchant_balances (merchant_id, asset, chain, available, pending)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (merchant_id, asset, chain) DO UPDATE SET
                available = available + excluded.available,
                pending = pending + excluded.pending,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(merchant_id)
    .bind(asset)
    .bind(chain)
    .bind(available_delta)
    .bind(pending_delta)
    .fetch_one(conn)
    .await?;
    debug!(
        "🗃️ Balance for {merchant_id}/{asset}/{chain} adjusted by ({available_delta} available, {pending_delta} \
         pending). Now {} available, {} pending.",
        balance.available, balance.pending
    );
    Ok(balance)
}
