use std::fmt::Debug;

use log::*;

use crate::{
    bb_api::errors::OrderFlowError,
    db_types::{ConfirmationResult, NewOrder, Order, OrderStatusType, PaymentConfirmation},
    events::{EventProducers, OrderPaidEvent, OrderStatusChangedEvent},
    traits::OrderManagement,
};

/// `OrderFlowApi` owns the order lifecycle. Orders enter as `Processing` (or as `Paid`, when the payment is already
/// known), move to `Paid` when a verified payment is reconciled against them, and can be relabelled by administrators.
///
/// Automated paths only ever move an order from `Processing` to `Paid`. Administrative changes are unconditional.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producer {
            debug!("🔄️📦️ Notifying order paid hook subscribers for order #{}", order.id);
            emitter.try_publish_event(OrderPaidEvent::new(order.clone()));
        }
    }

    fn call_status_changed_hook(&self, old_status: &OrderStatusType, order: &Order) {
        for emitter in &self.producers.status_changed_producer {
            emitter.try_publish_event(OrderStatusChangedEvent::new(old_status.clone(), order.clone()));
        }
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement
{
    /// Applies a verified payment to the order store.
    ///
    /// See [`OrderManagement::confirm_paid`] for the matching rules. `order_data` is only used when no stored order
    /// matches the payment. Calling this any number of times with the same payment leaves exactly one `Paid` order
    /// holding it, and the order paid hook fires only for the call that made the transition.
    pub async fn confirm_paid(
        &self,
        confirmation: &PaymentConfirmation,
        order_data: Option<NewOrder>,
    ) -> Result<ConfirmationResult, OrderFlowError> {
        trace!("🔄️💰️ Confirming payment {confirmation}");
        let result = self.db.confirm_paid(confirmation, order_data).await.map_err(|e| {
            error!("🔄️💰️ Could not record payment {confirmation}. {e}");
            OrderFlowError::from(e)
        })?;
        match result.order() {
            Some(order) if result.is_new_payment() => {
                info!("🔄️💰️ Payment {confirmation} confirmed. {order} is paid");
                self.call_order_paid_hook(order);
            },
            Some(order) => {
                debug!("🔄️💰️ Payment {confirmation} has already been applied to {order}. Nothing to do.");
            },
            None => {
                info!("🔄️💰️ Payment {confirmation} does not match any order. Nothing to do.");
            },
        }
        Ok(result)
    }

    /// Records an order submitted by the storefront.
    ///
    /// The order is `Processing`, unless it carries a payment id, in which case it is recorded as `Paid`. An order
    /// carrying a payment id that is already on record is not duplicated; the existing order is returned with `false`.
    pub async fn record_order(&self, order: NewOrder) -> Result<(Order, bool), OrderFlowError> {
        order.validate()?;
        let (order, inserted) = self.db.insert_order(order).await?;
        if inserted {
            debug!("🔄️📦️ {order} recorded");
            if order.status == OrderStatusType::Paid {
                self.call_order_paid_hook(&order);
            }
        } else {
            debug!("🔄️📦️ {order} already exists. Nothing recorded");
        }
        Ok((order, inserted))
    }

    /// Sets the status of an order, whatever its current status is. The status changed hook receives the status the
    /// order held at the moment of the update.
    pub async fn set_status(&self, id: i64, status: OrderStatusType) -> Result<Order, OrderFlowError> {
        let (order, old_status) = self.db.update_order_status(id, &status).await?;
        info!("🔄️📦️ Order #{id} status changed from {old_status} to {}", order.status);
        self.call_status_changed_hook(&old_status, &order);
        Ok(order)
    }

    /// All orders, newest first.
    pub async fn fetch_orders(&self) -> Result<Vec<Order>, OrderFlowError> {
        let orders = self.db.fetch_orders().await?;
        Ok(orders)
    }

    pub async fn fetch_order(&self, id: i64) -> Result<Order, OrderFlowError> {
        self.db.fetch_order_by_id(id).await?.ok_or(OrderFlowError::NotFound(id))
    }
}
