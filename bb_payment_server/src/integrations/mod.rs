//! Adapters for the services the payment server talks to.
pub mod razorpay;
