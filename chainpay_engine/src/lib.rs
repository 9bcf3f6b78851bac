//! ChainPay Payment Engine
//!
//! The ChainPay payment engine is the reconciliation core of a cryptocurrency payment gateway: it matches inbound
//! blockchain payment notifications to pending invoices, applies idempotent status transitions, and credits
//! merchant balances exactly once per invoice. This library contains the core logic and is transport-agnostic.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@traits`], [`SqliteDatabase`]). SQLite is the supported backend. You
//!    should never need to access the database directly; use the public APIs instead. The exception is the data
//!    types used in the database, which are defined in the [`mod@db_types`] module and are public.
//! 2. The engine public API ([`ReconciliationApi`], [`InvoiceApi`]). `ReconciliationApi` owns the notification
//!    flow (validate, resolve, apply, notify); `InvoiceApi` is the read-only query surface.
//!
//! The engine also provides a set of events that can be subscribed to. These events are emitted when invoices are
//! paid or confirmed, so that downstream components (merchant webhooks, fulfilment) can hook in without coupling
//! to the reconciliation flow.
mod api;
pub mod db_types;
pub mod events;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::{
    invoices_api::{InvoiceApi, InvoiceResult},
    reconciliation_api::{ReconciliationApi, ReconciliationConfig, DEFAULT_REQUIRED_CONFIRMATIONS},
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
