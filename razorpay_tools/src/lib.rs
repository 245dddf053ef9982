//! # Razorpay tools
//!
//! A thin client for the parts of the Razorpay API used by the storefront:
//! * Creating gateway orders (`POST /v1/orders`), which the checkout widget needs before a customer can pay.
//! * Deserializing webhook payloads sent by Razorpay (`payment.captured`, `order.paid` etc.).
//!
//! Signature checks are deliberately not part of this crate. They live in the payment engine, next to the code that
//! acts on the result.
mod api;
mod config;
mod error;

mod data_objects;

pub use api::{random_receipt_id, RazorpayApi};
pub use config::RazorpayConfig;
pub use data_objects::{
    NewRazorpayOrder,
    PaymentEntity,
    PaymentEntityWrapper,
    RazorpayOrder,
    RazorpayWebhookEvent,
    WebhookPayload,
};
pub use error::RazorpayApiError;
