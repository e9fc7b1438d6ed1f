//! Razorpay checkout signatures: hex HMAC-SHA256 of `order_id|payment_id`
//! keyed with the account secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac_for(secret: &str, order_id: &str, payment_id: &str) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    mac
}

/// Constant-time check of the signature returned by checkout.
pub fn verify_signature(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    mac_for(secret, order_id, payment_id)
        .verify_slice(&expected)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compute_signature(secret: &str, order_id: &str, payment_id: &str) -> String {
        hex::encode(mac_for(secret, order_id, payment_id).finalize().into_bytes())
    }

    #[test]
    fn test_signature_is_hex_sha256() {
        let sig = compute_signature("secret", "order_1", "pay_1");
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_valid_signature_verifies() {
        let sig = compute_signature("secret", "order_LmN", "pay_QrS");
        assert!(verify_signature("secret", "order_LmN", "pay_QrS", &sig));
        assert!(verify_signature("secret", "order_LmN", "pay_QrS", &sig.to_uppercase()));
    }

    #[test]
    fn test_tampered_inputs_fail() {
        let sig = compute_signature("secret", "order_LmN", "pay_QrS");
        assert!(!verify_signature("other", "order_LmN", "pay_QrS", &sig));
        assert!(!verify_signature("secret", "order_LmN", "pay_XYZ", &sig));
        assert!(!verify_signature("secret", "order_LmN", "pay_QrS", "not-hex"));
        assert!(!verify_signature("secret", "order_LmN", "pay_QrS", ""));
    }
}
