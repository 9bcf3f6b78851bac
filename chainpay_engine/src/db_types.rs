use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use cpg_common::MicroUnit;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------      InvoiceId      ---------------------------------------------------------

/// The external identifier of an invoice, as assigned by the invoice-creation flow.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct InvoiceId(pub String);

impl FromStr for InvoiceId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for InvoiceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for InvoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl InvoiceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------    DepositAddress    --------------------------------------------------------

/// A blockchain deposit address, normalized to lower case on construction.
///
/// Notification providers are inconsistent about address casing, so every address is lower-cased once at the
/// boundary and compared verbatim everywhere else.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct DepositAddress(String);

impl DepositAddress {
    pub fn new<S: AsRef<str>>(address: S) -> Self {
        Self(address.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for DepositAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: serde::Deserializer<'de> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(raw))
    }
}

impl From<&str> for DepositAddress {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DepositAddress {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl Display for DepositAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------    InvoiceStatus     --------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum InvoiceStatus {
    /// The invoice has been created and no payment has been recorded against it.
    Pending,
    /// One or more payments have been recorded, but they do not cover the amount due.
    Underpaid,
    /// The amount due is covered, but the covering payment has not reached the confirmation threshold.
    Paid,
    /// The amount due is covered and confirmed on chain. The merchant balance has been credited.
    Confirmed,
    /// The invoice went unpaid for too long and was closed.
    Expired,
    /// The invoice was abandoned or administratively failed.
    Failed,
}

impl InvoiceStatus {
    /// Active invoices are the only ones that may receive new payments, and the only ones a deposit address
    /// resolves to.
    pub fn is_active(&self) -> bool {
        matches!(self, InvoiceStatus::Pending | InvoiceStatus::Underpaid)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Confirmed | InvoiceStatus::Expired | InvoiceStatus::Failed)
    }
}

impl Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvoiceStatus::Pending => write!(f, "Pending"),
            InvoiceStatus::Underpaid => write!(f, "Underpaid"),
            InvoiceStatus::Paid => write!(f, "Paid"),
            InvoiceStatus::Confirmed => write!(f, "Confirmed"),
            InvoiceStatus::Expired => write!(f, "Expired"),
            InvoiceStatus::Failed => write!(f, "Failed"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid invoice status: {0}")]
pub struct ConversionError(String);

impl FromStr for InvoiceStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Underpaid" => Ok(Self::Underpaid),
            "Paid" => Ok(Self::Paid),
            "Confirmed" => Ok(Self::Confirmed),
            "Expired" => Ok(Self::Expired),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid invoice status: {s}"))),
        }
    }
}

//--------------------------------------        Invoice       --------------------------------------------------------

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub invoice_id: InvoiceId,
    pub merchant_id: String,
    pub asset: String,
    pub chain: String,
    pub address: DepositAddress,
    pub amount_due: MicroUnit,
    pub amount_paid: MicroUnit,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       NewInvoice     --------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewInvoice {
    /// The invoice id as assigned by the invoice-creation flow
    pub invoice_id: InvoiceId,
    /// The merchant this invoice collects funds for
    pub merchant_id: String,
    /// The asset the invoice is denominated in, e.g. "USDT"
    pub asset: String,
    /// The network the deposit address lives on, e.g. "BSC"
    pub chain: String,
    /// The freshly derived deposit address for this invoice
    pub address: DepositAddress,
    /// The requested amount, in the asset's minor units
    pub amount_due: MicroUnit,
}

impl NewInvoice {
    pub fn new<S1, S2, S3>(
        invoice_id: InvoiceId,
        merchant_id: S1,
        asset: S2,
        chain: S3,
        address: DepositAddress,
        amount_due: MicroUnit,
    ) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self {
            invoice_id,
            merchant_id: merchant_id.into(),
            asset: asset.into(),
            chain: chain.into().to_uppercase(),
            address,
            amount_due,
        }
    }
}

//--------------------------------------      LedgerEntry     --------------------------------------------------------

/// One row per distinct on-chain transaction ever applied to an invoice.
///
/// The unique (invoice, txid) pair is what makes notification processing idempotent: a transaction that is already
/// recorded is never applied a second time.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub invoice_id: i64,
    pub txid: String,
    pub amount: MicroUnit,
    pub confirmed: bool,
    pub block_number: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------   ConfirmationState  --------------------------------------------------------

/// The confirmation assurance carried by a notification. Providers send either a boolean flag or a raw
/// confirmation count; the count is compared against the chain's required threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfirmationState {
    Flag(bool),
    Count(u32),
}

impl ConfirmationState {
    pub fn meets(&self, required: u32) -> bool {
        match self {
            ConfirmationState::Flag(confirmed) => *confirmed,
            ConfirmationState::Count(count) => *count >= required,
        }
    }
}

impl Default for ConfirmationState {
    fn default() -> Self {
        Self::Flag(false)
    }
}

//--------------------------------------      Notification    --------------------------------------------------------

/// An inbound blockchain notification. Transient: it is consumed by the reconciliation engine and never stored
/// as its own entity.
#[derive(Debug, Clone)]
pub struct Notification {
    /// The network the transaction was observed on, e.g. "BSC"
    pub chain: String,
    /// The deposit address the funds were sent to
    pub address: DepositAddress,
    /// The on-chain transaction identifier
    pub txid: String,
    /// The transferred amount, in the asset's minor units
    pub amount: MicroUnit,
    /// Confirmation flag or count, as supplied by the provider
    pub confirmations: ConfirmationState,
    /// The block the transaction was included in, if known
    pub block_number: Option<i64>,
    /// The target invoice, when the notification arrived on the invoice-scoped route
    pub invoice_id: Option<InvoiceId>,
}

impl Notification {
    pub fn new<S1, S2>(chain: S1, address: DepositAddress, txid: S2, amount: MicroUnit) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            chain: chain.into().to_uppercase(),
            address,
            txid: txid.into(),
            amount,
            confirmations: ConfirmationState::default(),
            block_number: None,
            invoice_id: None,
        }
    }

    pub fn with_confirmations(mut self, confirmations: ConfirmationState) -> Self {
        self.confirmations = confirmations;
        self
    }

    pub fn with_block_number(mut self, block_number: i64) -> Self {
        self.block_number = Some(block_number);
        self
    }

    pub fn for_invoice(mut self, invoice_id: InvoiceId) -> Self {
        self.invoice_id = Some(invoice_id);
        self
    }
}

//--------------------------------------   MerchantBalance    --------------------------------------------------------

/// The funds held for a merchant in one asset on one network. Mutated only by the reconciliation engine.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MerchantBalance {
    pub id: i64,
    pub merchant_id: String,
    pub asset: String,
    pub chain: String,
    pub available: MicroUnit,
    pub pending: MicroUnit,
    pub locked: MicroUnit,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_roundtrip() {
        for status in [
            InvoiceStatus::Pending,
            InvoiceStatus::Underpaid,
            InvoiceStatus::Paid,
            InvoiceStatus::Confirmed,
            InvoiceStatus::Expired,
            InvoiceStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<InvoiceStatus>().unwrap(), status);
        }
        assert!("Foo".parse::<InvoiceStatus>().is_err());
    }

    #[test]
    fn active_and_terminal_sets() {
        assert!(InvoiceStatus::Pending.is_active());
        assert!(InvoiceStatus::Underpaid.is_active());
        assert!(!InvoiceStatus::Paid.is_active());
        assert!(!InvoiceStatus::Paid.is_terminal());
        assert!(InvoiceStatus::Confirmed.is_terminal());
        assert!(InvoiceStatus::Expired.is_terminal());
        assert!(InvoiceStatus::Failed.is_terminal());
    }

    #[test]
    fn addresses_normalize() {
        let addr = DepositAddress::new(" 0xAbCdEf1234 ");
        assert_eq!(addr.as_str(), "0xabcdef1234");
        assert_eq!(DepositAddress::from("0xABCDEF1234"), DepositAddress::new("0xabcdef1234"));
    }

    #[test]
    fn confirmation_thresholds() {
        assert!(ConfirmationState::Flag(true).meets(12));
        assert!(!ConfirmationState::Flag(false).meets(0));
        assert!(ConfirmationState::Count(12).meets(12));
        assert!(!ConfirmationState::Count(11).meets(12));
    }
}
