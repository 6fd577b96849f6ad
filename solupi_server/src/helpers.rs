use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The base64-encoded HMAC-SHA256 of `data`, keyed with `secret`.
///
/// This is the value a mail relay must send in the webhook signature header.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> Option<String> {
    let mut mac = keyed_mac(secret)?;
    mac.update(data);
    Some(base64::encode(mac.finalize().into_bytes()))
}

/// Checks a base64-encoded HMAC-SHA256 signature of `data` in constant time.
pub fn verify_hmac(secret: &str, data: &[u8], signature: &str) -> bool {
    let (Ok(expected), Some(mut mac)) = (base64::decode(signature.trim()), keyed_mac(secret)) else {
        return false;
    };
    mac.update(data);
    mac.verify_slice(&expected).is_ok()
}

fn keyed_mac(secret: &str) -> Option<HmacSha256> {
    <HmacSha256 as Mac>::new_from_slice(secret.as_bytes()).ok()
}
