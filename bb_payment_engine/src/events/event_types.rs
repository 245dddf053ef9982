use crate::db_types::{Order, OrderStatusType};

/// Raised exactly once per order, when it first reaches `Paid` status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Raised when an administrator changes the status of an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderStatusChangedEvent {
    pub old_status: OrderStatusType,
    pub order: Order,
}

impl OrderStatusChangedEvent {
    pub fn new(old_status: OrderStatusType, order: Order) -> Self {
        Self { old_status, order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderPaid(OrderPaidEvent),
    OrderStatusChanged(OrderStatusChangedEvent),
}
