//! # Gateway signatures
//!
//! Razorpay authenticates two kinds of messages with an HMAC-SHA256 signature, hex-encoded in lowercase:
//!
//! * The checkout widget hands the browser a `razorpay_signature` for each completed payment. The signed message is
//!   `{razorpay_order_id}|{razorpay_payment_id}` and the key is the merchant's API key secret.
//! * Webhook deliveries carry an `X-Razorpay-Signature` header. The signed message is the raw request body, exactly as
//!   received, and the key is the webhook secret.
//!
//! Signatures are compared in constant time. An empty secret never verifies anything.
use bb_common::Secret;
use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// The message signed by the checkout widget for a completed payment.
pub fn payment_message(order_id: &str, payment_id: &str) -> String {
    format!("{order_id}|{payment_id}")
}

/// Calculates the lowercase hex HMAC-SHA256 of `msg` under `secret`. Returns `None` if the secret is empty.
pub fn sign(secret: &[u8], msg: &[u8]) -> Option<String> {
    if secret.is_empty() {
        return None;
    }
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(msg);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Checks `provided` against the signature of `msg` under `secret`.
///
/// The comparison is exact. Signatures with surrounding whitespace or uppercase hex digits are rejected.
pub fn verify(secret: &[u8], msg: &[u8], provided: &str) -> bool {
    let Some(expected) = sign(secret, msg) else {
        warn!("🔐️ Signature verification was attempted with an empty secret. Rejecting.");
        return false;
    };
    // ct_eq returns false for slices of different lengths
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

/// Holds a gateway secret and verifies signatures made with it.
#[derive(Debug, Clone, Default)]
pub struct SignatureVerifier {
    secret: Secret<String>,
}

impl SignatureVerifier {
    pub fn new(secret: Secret<String>) -> Self {
        Self { secret }
    }

    pub fn is_configured(&self) -> bool {
        !self.secret.is_empty()
    }

    /// Verifies the signature the checkout widget returned for a payment.
    pub fn verify_payment(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let message = payment_message(order_id, payment_id);
        verify(self.secret.reveal().as_bytes(), message.as_bytes(), signature)
    }

    /// Verifies a webhook signature over the raw, unparsed request body.
    pub fn verify_webhook(&self, raw_body: &[u8], signature: &str) -> bool {
        verify(self.secret.reveal().as_bytes(), raw_body, signature)
    }
}
