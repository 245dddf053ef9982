//! # Order store contracts
//!
//! The [`OrderManagement`] trait defines the behaviour a storage backend must expose to hold orders and reconcile them
//! against verified gateway payments. The SQLite backend in this crate is the reference implementation; the HTTP layer
//! is written against the trait so that it can be exercised with mocks.
mod order_management;

pub use order_management::{OrderManagement, OrderStoreError};
