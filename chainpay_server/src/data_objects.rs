use chainpay_engine::{
    db_types::{ConfirmationState, DepositAddress, InvoiceId, InvoiceStatus, Notification},
    traits::ReconciliationResult,
};
use cpg_common::MicroUnit;
use serde::{Deserialize, Serialize};

/// The wire shape of an inbound blockchain payment notification, shared by the generic and invoice-scoped routes.
///
/// `confirmed` accepts either a boolean flag or a raw confirmation count. Amounts are integers in the asset's
/// minor units; a fractional JSON number is rejected at deserialization time so floating point never touches
/// monetary state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentNotification {
    pub subscription_type: String,
    pub address: String,
    pub amount: MicroUnit,
    pub tx_id: String,
    #[serde(default)]
    pub confirmed: ConfirmationState,
    pub chain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<i64>,
}

impl PaymentNotification {
    pub fn into_notification(self) -> Notification {
        let notification = Notification::new(self.chain, DepositAddress::new(self.address), self.tx_id, self.amount)
            .with_confirmations(self.confirmed);
        match self.block_number {
            Some(block) => notification.with_block_number(block),
            None => notification,
        }
    }
}

/// The response envelope for the webhook routes: `success` plus an echo of the reconciled invoice and
/// transaction on the happy path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<InvoiceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<InvoiceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NotificationResponse {
    pub fn from_result(result: &ReconciliationResult) -> Self {
        Self {
            success: true,
            invoice_id: Some(result.invoice.invoice_id.clone()),
            tx_id: Some(result.entry.txid.clone()),
            status: Some(result.invoice.status),
            error: None,
        }
    }
}

/// The static description returned by the `GET /webhook` probe. Informational only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub service: String,
    pub version: String,
    pub features: Vec<String>,
}

impl EndpointInfo {
    pub fn current() -> Self {
        Self {
            service: "chainpay-notification-webhook".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            features: [
                "payment-notifications",
                "invoice-scoped-notifications",
                "hmac-sha256-signatures",
                "idempotent-reconciliation",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn notifications_deserialize_both_confirmation_shapes() {
        let flag: PaymentNotification = serde_json::from_str(
            r#"{"subscriptionType":"ADDRESS_COINS_TRANSACTION","address":"0xAbC","amount":40,"txId":"t1",
                "confirmed":true,"chain":"BSC"}"#,
        )
        .unwrap();
        assert_eq!(flag.confirmed, ConfirmationState::Flag(true));

        let count: PaymentNotification = serde_json::from_str(
            r#"{"subscriptionType":"ADDRESS_COINS_TRANSACTION","address":"0xAbC","amount":40,"txId":"t1",
                "confirmed":7,"chain":"BSC","blockNumber":123}"#,
        )
        .unwrap();
        assert_eq!(count.confirmed, ConfirmationState::Count(7));
        assert_eq!(count.block_number, Some(123));

        // the flag is optional and defaults to unconfirmed
        let bare: PaymentNotification = serde_json::from_str(
            r#"{"subscriptionType":"x","address":"0xAbC","amount":40,"txId":"t1","chain":"BSC"}"#,
        )
        .unwrap();
        assert_eq!(bare.confirmed, ConfirmationState::Flag(false));
    }

    #[test]
    fn fractional_amounts_are_rejected() {
        let result = serde_json::from_str::<PaymentNotification>(
            r#"{"subscriptionType":"x","address":"0xAbC","amount":40.5,"txId":"t1","chain":"BSC"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn conversion_normalizes_chain_and_address() {
        let dto: PaymentNotification = serde_json::from_str(
            r#"{"subscriptionType":"x","address":"0xAbCDE","amount":40,"txId":"t1","chain":"bsc"}"#,
        )
        .unwrap();
        let notification = dto.into_notification();
        assert_eq!(notification.chain, "BSC");
        assert_eq!(notification.address.as_str(), "0xabcde");
        assert!(notification.invoice_id.is_none());
    }
}
