use chainpay_engine::{
    db_types::{Invoice, InvoiceId, LedgerEntry, MerchantBalance},
    traits::{InvoiceApiError, InvoiceManagement},
};
use mockall::mock;

mock! {
    pub InvoiceManager {}
    impl InvoiceManagement for InvoiceManager {
        async fn fetch_invoice(&self, invoice_id: &InvoiceId) -> Result<Option<Invoice>, InvoiceApiError>;
        async fn fetch_invoices_for_merchant(&self, merchant_id: &str) -> Result<Vec<Invoice>, InvoiceApiError>;
        async fn fetch_ledger_for_invoice(&self, invoice_id: &InvoiceId) -> Result<Vec<LedgerEntry>, InvoiceApiError>;
        async fn fetch_balance(&self, merchant_id: &str, asset: &str, chain: &str) -> Result<Option<MerchantBalance>, InvoiceApiError>;
    }
}
