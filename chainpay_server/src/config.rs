use std::{collections::HashMap, env};

use chainpay_engine::{ReconciliationConfig, DEFAULT_REQUIRED_CONFIRMATIONS};
use chrono::Duration;
use cpg_common::Secret;
use log::*;

const DEFAULT_CPG_HOST: &str = "127.0.0.1";
const DEFAULT_CPG_PORT: u16 = 8360;
const DEFAULT_SIGNATURE_HEADER: &str = "x-webhook-signature";
const DEFAULT_UNPAID_INVOICE_TIMEOUT_HOURS: i64 = 48;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Webhook signature verification settings
    pub webhook: WebhookConfig,
    /// Confirmation thresholds and fee policy applied by the reconciliation engine
    pub reconciliation: ReconciliationConfig,
    /// The time before an unpaid invoice is considered abandoned and marked as expired.
    pub unpaid_invoice_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CPG_HOST.to_string(),
            port: DEFAULT_CPG_PORT,
            database_url: String::default(),
            webhook: WebhookConfig::default(),
            reconciliation: ReconciliationConfig::default(),
            unpaid_invoice_timeout: Duration::hours(DEFAULT_UNPAID_INVOICE_TIMEOUT_HOURS),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("CPG_HOST").ok().unwrap_or_else(|| DEFAULT_CPG_HOST.into());
        let port = env::var("CPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for CPG_PORT. {e} Using the default, {DEFAULT_CPG_PORT}, instead."
                    );
                    DEFAULT_CPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_CPG_PORT);
        let database_url = env::var("CPG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ CPG_DATABASE_URL is not set. Please set it to the URL for the gateway database.");
            String::default()
        });
        let webhook = WebhookConfig::from_env_or_defaults();
        let reconciliation = configure_reconciliation();
        let unpaid_invoice_timeout = configure_invoice_timeout();
        Self { host, port, database_url, webhook, reconciliation, unpaid_invoice_timeout }
    }
}

//-------------------------------------------  WebhookConfig  --------------------------------------------------------

#[derive(Clone, Debug, Default)]
pub struct WebhookConfig {
    /// The shared secret notification senders sign their payloads with. When unset, signature verification is
    /// skipped entirely.
    pub secret: Option<Secret<String>>,
    /// The request header carrying the hex-encoded HMAC-SHA256 signature.
    pub signature_header: String,
}

impl WebhookConfig {
    pub fn from_env_or_defaults() -> Self {
        let secret = match env::var("CPG_WEBHOOK_SECRET") {
            Ok(s) if !s.trim().is_empty() => Some(Secret::new(s)),
            _ => {
                warn!(
                    "🚨️ CPG_WEBHOOK_SECRET is not set. Webhook signatures will NOT be checked and anyone who can \
                     reach this server can submit payment notifications. Do not run a production instance like this."
                );
                None
            },
        };
        let signature_header =
            env::var("CPG_WEBHOOK_SIGNATURE_HEADER").ok().unwrap_or_else(|| DEFAULT_SIGNATURE_HEADER.into());
        Self { secret, signature_header }
    }
}

//---------------------------------------  Reconciliation policy  ----------------------------------------------------

fn configure_reconciliation() -> ReconciliationConfig {
    let required_confirmations = env::var("CPG_REQUIRED_CONFIRMATIONS")
        .map_err(|_| {
            info!(
                "🪛️ CPG_REQUIRED_CONFIRMATIONS is not set. Using the default of {DEFAULT_REQUIRED_CONFIRMATIONS} \
                 confirmations."
            )
        })
        .and_then(|s| {
            s.parse::<u32>()
                .map_err(|e| warn!("🪛️ Invalid configuration value for CPG_REQUIRED_CONFIRMATIONS. {e}"))
        })
        .ok()
        .unwrap_or(DEFAULT_REQUIRED_CONFIRMATIONS);
    let chain_confirmations = env::var("CPG_CHAIN_CONFIRMATIONS").map(|s| parse_chain_overrides(&s)).unwrap_or_default();
    let fee_bps = env::var("CPG_PROCESSING_FEE_BPS")
        .map_err(|_| info!("🪛️ CPG_PROCESSING_FEE_BPS is not set. No processing fee will be withheld."))
        .and_then(|s| {
            s.parse::<u16>().map_err(|e| warn!("🪛️ Invalid configuration value for CPG_PROCESSING_FEE_BPS. {e}"))
        })
        .ok()
        .unwrap_or(0);
    ReconciliationConfig { required_confirmations, chain_confirmations, fee_bps }
}

/// Parses per-chain confirmation overrides of the form "bsc:15,eth:12". Invalid entries are skipped with a
/// warning rather than taking the server down.
fn parse_chain_overrides(value: &str) -> HashMap<String, u32> {
    value
        .split(',')
        .filter_map(|entry| {
            let entry = entry.trim();
            if entry.is_empty() {
                return None;
            }
            match entry.split_once(':') {
                Some((chain, count)) => match count.trim().parse::<u32>() {
                    Ok(count) => Some((chain.trim().to_lowercase(), count)),
                    Err(e) => {
                        warn!("🪛️ Ignoring invalid entry ({entry}) in CPG_CHAIN_CONFIRMATIONS: {e}");
                        None
                    },
                },
                None => {
                    warn!("🪛️ Ignoring invalid entry ({entry}) in CPG_CHAIN_CONFIRMATIONS: missing ':'");
                    None
                },
            }
        })
        .collect()
}

fn configure_invoice_timeout() -> Duration {
    env::var("CPG_UNPAID_INVOICE_TIMEOUT")
        .map_err(|_| {
            info!(
                "🪛️ CPG_UNPAID_INVOICE_TIMEOUT is not set. Using the default value of \
                 {DEFAULT_UNPAID_INVOICE_TIMEOUT_HOURS} hrs."
            )
        })
        .and_then(|s| {
            s.parse::<i64>()
                .map(Duration::hours)
                .map_err(|e| warn!("🪛️ Invalid configuration value for CPG_UNPAID_INVOICE_TIMEOUT. {e}"))
        })
        .ok()
        .unwrap_or_else(|| Duration::hours(DEFAULT_UNPAID_INVOICE_TIMEOUT_HOURS))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn chain_overrides_parse_leniently() {
        let parsed = parse_chain_overrides("bsc:15, ETH:12,bogus,tron:abc, ");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.get("bsc"), Some(&15));
        assert_eq!(parsed.get("eth"), Some(&12));
    }
}
