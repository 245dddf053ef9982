//! The order and payment flows of the storefront backend.
//!
//! * [`order_flow_api::OrderFlowApi`] records orders, reconciles verified payments against them, and applies
//!   administrator status changes. It raises lifecycle events for subscribers.
//! * [`payment_verification_api::PaymentVerificationApi`] authenticates checkout callbacks and webhook deliveries before
//!   handing them to the order flow.
pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
pub mod payment_verification_api;
