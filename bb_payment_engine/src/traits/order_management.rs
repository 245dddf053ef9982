use thiserror::Error;

use crate::db_types::{
    ConfirmationResult,
    GatewayPaymentId,
    NewOrder,
    Order,
    OrderStatusType,
    PaymentConfirmation,
};

/// Durable storage for orders.
///
/// Every operation is atomic. In particular, [`OrderManagement::confirm_paid`] must leave at most one order holding a
/// given gateway payment id, no matter how many times, or how concurrently, it is called with the same payment.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new order.
    ///
    /// If the order carries a gateway payment id that is already held by another order, nothing is inserted, and the
    /// existing order is returned along with `false`. Otherwise the new order and `true` are returned.
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), OrderStoreError>;

    /// Reconciles a verified payment with the order store, in a single transaction:
    ///
    /// 1. A `Processing` order already holding the payment id is moved to `Paid`.
    /// 2. Otherwise, if an order holding the payment id exists, it is returned untouched. This is the duplicate
    ///    delivery case, and also covers orders an administrator has since relabelled.
    /// 3. Otherwise, the newest `Processing` order for the gateway order id that has no payment attached yet, receives
    ///    the payment id and is moved to `Paid`.
    /// 4. Otherwise, if `create` holds the order details, a new order is stored with `Paid` status.
    /// 5. Otherwise nothing is changed, and [`ConfirmationResult::Unmatched`] is returned.
    async fn confirm_paid(
        &self,
        confirmation: &PaymentConfirmation,
        create: Option<NewOrder>,
    ) -> Result<ConfirmationResult, OrderStoreError>;

    /// Fetches the order with the given internal id.
    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, OrderStoreError>;

    /// Fetches the order holding the given gateway payment id, if any.
    async fn fetch_order_by_payment_id(&self, payment_id: &GatewayPaymentId) -> Result<Option<Order>, OrderStoreError>;

    /// Fetches every order, newest first.
    async fn fetch_orders(&self) -> Result<Vec<Order>, OrderStoreError>;

    /// Sets the status of an order unconditionally. Returns the updated order along with the status it had
    /// immediately before the change. The read and the write happen atomically, so concurrent updates each see the
    /// status left by the one before.
    ///
    /// Returns [`OrderStoreError::OrderIdNotFound`] if the order does not exist.
    async fn update_order_status(
        &self,
        id: i64,
        status: &OrderStatusType,
    ) -> Result<(Order, OrderStatusType), OrderStoreError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), OrderStoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderStoreError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The database did not respond within {0}ms")]
    Timeout(u64),
    #[error("The requested order (internal id {0}) does not exist")]
    OrderIdNotFound(i64),
    #[error("Cannot store order, since payment {0} is already attached to another order")]
    PaymentAlreadyExists(String),
    #[error("A stored record could not be decoded. {0}")]
    CorruptRecord(String),
}

impl From<sqlx::Error> for OrderStoreError {
    fn from(e: sqlx::Error) -> Self {
        OrderStoreError::DatabaseError(e.to_string())
    }
}
