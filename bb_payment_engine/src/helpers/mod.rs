mod signature;

pub use signature::{payment_message, sign, verify, SignatureVerifier};
