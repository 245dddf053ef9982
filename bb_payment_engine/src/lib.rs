//! BharatBartan Payment Engine
//!
//! The payment engine holds the order records of the storefront and reconciles them against payments taken by the
//! payment gateway (Razorpay). It knows nothing about HTTP; the payment server wraps it.
//!
//! The library is divided into these sections:
//! 1. Order storage ([`traits`] and [`SqliteDatabase`]). The [`OrderManagement`] trait is the contract every store
//!    backend fulfils, including the atomic, idempotent `confirm_paid` upsert that both reconciliation paths rely on.
//! 2. The order lifecycle manager ([`OrderFlowApi`]). It owns the status rules: automated paths only ever move an order
//!    from `Processing` to `Paid`, administrators may set any status.
//! 3. The reconciliation API ([`PaymentVerificationApi`]). It verifies checkout and webhook signatures with the
//!    [`helpers::SignatureVerifier`] before anything touches the store.
//!
//! The engine also emits events (see [`events`]) when orders are paid or have their status changed, so that side
//! effects such as confirmation emails can run without holding up the request that caused them.
mod bb_api;
pub mod db_types;
pub mod events;
pub mod helpers;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use bb_api::{
    errors::{OrderFlowError, ReconciliationError},
    order_flow_api::OrderFlowApi,
    order_objects,
    payment_verification_api::PaymentVerificationApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{OrderManagement, OrderStoreError};
