use bb_common::Paise;
use serde::{Deserialize, Serialize};

use crate::db_types::{
    ConfirmationResult,
    GatewayOrderId,
    GatewayPaymentId,
    LineItem,
    NewOrder,
    Order,
    PaymentConfirmation,
    ValidationError,
};

/// The payment triple returned by the checkout widget, along with the cart details needed to record the order if the
/// store has not seen it yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub items: Vec<LineItem>,
}

impl VerificationRequest {
    pub fn confirmation(&self) -> Result<PaymentConfirmation, ValidationError> {
        let payment_id = self.razorpay_payment_id.parse::<GatewayPaymentId>()?;
        let order_id = self.razorpay_order_id.parse::<GatewayOrderId>()?;
        Ok(PaymentConfirmation::new(Some(order_id), payment_id))
    }

    /// The order to create if no stored order matches the payment. `None` if the request carries no line items.
    pub fn new_order(&self) -> Result<Option<NewOrder>, ValidationError> {
        if self.items.is_empty() {
            return Ok(None);
        }
        NewOrder::from_line_items(&self.items, self.email.clone(), self.address.clone()).map(Some)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerificationOutcome {
    pub result: ConfirmationResult,
}

impl VerificationOutcome {
    pub fn order(&self) -> Option<&Order> {
        self.result.order()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    Reconciled(ConfirmationResult),
    Ignored(String),
}

/// An order recorded directly by the storefront. Either the cart `items` or a pre-computed `productList` and
/// `totalAmount` must be supplied. If a payment id is given, the order is recorded as paid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOrderRequest {
    #[serde(default)]
    pub razorpay_payment_id: Option<String>,
    #[serde(default)]
    pub razorpay_order_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub product_list: Option<Vec<String>>,
    #[serde(default)]
    pub total_amount: Option<Paise>,
    #[serde(default)]
    pub items: Option<Vec<LineItem>>,
    #[serde(default)]
    pub address: Option<String>,
}

impl RecordOrderRequest {
    pub fn into_new_order(self) -> Result<NewOrder, ValidationError> {
        let mut order = match (self.items, self.product_list, self.total_amount) {
            (Some(items), _, _) if !items.is_empty() => NewOrder::from_line_items(&items, self.email, self.address)?,
            (_, Some(products), Some(total)) => NewOrder::from_summary(products, total, self.email, self.address)?,
            _ => {
                return Err(ValidationError(
                    "Either the cart items, or a product list and total amount must be provided".into(),
                ))
            },
        };
        if let Some(oid) = non_blank(self.razorpay_order_id) {
            order = order.with_gateway_order_id(GatewayOrderId::from(oid));
        }
        if let Some(pid) = non_blank(self.razorpay_payment_id) {
            order = order.with_payment_id(GatewayPaymentId::from(pid));
        }
        Ok(order)
    }
}

/// A guest order saved from the storefront's local cart, before any payment is made.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveOrderRequest {
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl SaveOrderRequest {
    pub fn into_new_order(self) -> Result<NewOrder, ValidationError> {
        NewOrder::from_line_items(&self.items, self.email, self.address)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
