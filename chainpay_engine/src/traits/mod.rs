//! # Database backend contracts.
//!
//! This module defines the interface contracts that payment engine database *backends* must implement.
//!
//! * [`PaymentGatewayDatabase`] defines the mutation surface: invoice creation, atomic application of payment
//!   notifications, and invoice expiry. This is where the reconciliation state machine is persisted.
//! * [`InvoiceManagement`] provides read-only queries over invoices, their payment ledgers and merchant balances.
//!   The invoice resolver and the query routes are built on it.
//!
//! Backends are deliberately thin: all *decisions* (status transitions, fee computation, confirmation thresholds)
//! are either passed in as a [`PaymentUpdate`] or derived inside the single atomic transaction that
//! [`PaymentGatewayDatabase::apply_payment`] runs.
mod invoice_management;
mod payment_gateway_database;

mod data_objects;

pub use data_objects::{ExpiryResult, PaymentUpdate, ReconciliationResult};
pub use invoice_management::{InvoiceApiError, InvoiceManagement};
pub use payment_gateway_database::{PaymentGatewayDatabase, PaymentGatewayError};
