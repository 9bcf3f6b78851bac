use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The hex-encoded HMAC-SHA256 digest of `body` under `secret`. This is the value notification senders are
/// expected to place in the signature header, computed over the exact raw request body.
pub fn calculate_hmac(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take a key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Checks a hex-encoded signature against the body. The comparison runs in constant time via
/// [`Mac::verify_slice`], so signature checking leaks no timing information.
pub fn verify_hmac(secret: &str, body: &[u8], signature: &str) -> bool {
    let provided = match hex::decode(signature.trim()) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take a key of any size");
    mac.update(body);
    mac.verify_slice(&provided).is_ok()
}
