use std::{fmt::Display, str::FromStr};

use bb_common::Paise;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Substituted for the purchaser email when an order is placed without one.
pub const GUEST_EMAIL: &str = "guest@bharatbartan.in";
/// Substituted for the delivery address when an order is placed without one.
pub const ADDRESS_NOT_PROVIDED: &str = "Not Provided";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// The status of an order.
///
/// `Processing` and `Paid` are the two statuses the engine assigns itself. Administrators can set any other label
/// (e.g. "Shipped"), which is stored as-is in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatusType {
    /// The order has been recorded, but no payment has been confirmed.
    #[default]
    Processing,
    /// A payment for the order has been verified.
    Paid,
    /// An administrator-assigned label.
    Other(String),
}

impl OrderStatusType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Processing => "Processing",
            Self::Paid => "Paid",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("processing") {
            Self::Processing
        } else if trimmed.eq_ignore_ascii_case("paid") {
            Self::Paid
        } else {
            Self::Other(trimmed.to_string())
        }
    }
}

impl From<&str> for OrderStatusType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<OrderStatusType> for String {
    fn from(value: OrderStatusType) -> Self {
        value.to_string()
    }
}

impl FromStr for OrderStatusType {
    type Err = ValidationError;

    /// Unlike the infallible `From<String>` conversion (used for values read back from the database), parsing rejects
    /// blank labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ValidationError("Order status cannot be empty".into()));
        }
        Ok(Self::from(s))
    }
}

//--------------------------------------    Gateway ids        ---------------------------------------------------------
macro_rules! gateway_id {
    ($name:ident, $what:literal) => {
        #[doc = concat!("The ", $what, " as assigned by the payment gateway")]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new<S: Into<String>>(id: S) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                if s.is_empty() {
                    Err(ValidationError(format!("The {} cannot be empty", $what)))
                } else {
                    Ok(Self(s.to_string()))
                }
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

gateway_id!(GatewayOrderId, "gateway order id");
gateway_id!(GatewayPaymentId, "gateway payment id");

//--------------------------------------        LineItem       ---------------------------------------------------------
/// A line item, as submitted by the storefront client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default)]
    pub product_id: Option<String>,
    pub title: String,
    /// The unit price in rupees
    pub price: f64,
    pub quantity: i64,
}

impl LineItem {
    pub fn new<S: Into<String>>(title: S, price: f64, quantity: i64) -> Self {
        Self { product_id: None, title: title.into(), price, quantity }
    }

    /// The human-readable form stored in an order's product list, e.g. `Copper Lota x2`.
    pub fn description(&self) -> String {
        format!("{} x{}", self.title.trim(), self.quantity)
    }

    /// Checks the item, and returns its total (unit price × quantity).
    pub fn validated_total(&self) -> Result<Paise, ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError("Line items must have a title".into()));
        }
        if self.quantity < 1 {
            return Err(ValidationError(format!(
                "Invalid quantity ({}) for {}. Quantities must be at least 1",
                self.quantity, self.title
            )));
        }
        let unit_price = Paise::try_from_rupees(self.price)
            .map_err(|e| ValidationError(format!("Invalid price for {}. {e}", self.title)))?;
        unit_price
            .checked_mul(self.quantity)
            .ok_or_else(|| ValidationError(format!("The total for {} is too large", self.title)))
    }
}

//--------------------------------------        Order       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub razorpay_order_id: Option<GatewayOrderId>,
    pub razorpay_payment_id: Option<GatewayPaymentId>,
    pub user_email: String,
    pub product_list: Vec<String>,
    pub total_amount: Paise,
    pub address: String,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_guest_order(&self) -> bool {
        self.user_email == GUEST_EMAIL
    }
}

impl Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Order #{} ({}, {}", self.id, self.total_amount, self.status)?;
        if let Some(pid) = &self.razorpay_payment_id {
            write!(f, ", payment {pid}")?;
        }
        write!(f, ")")
    }
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub razorpay_order_id: Option<GatewayOrderId>,
    /// If present, the order was paid for before it was recorded, and it will be stored with `Paid` status.
    pub razorpay_payment_id: Option<GatewayPaymentId>,
    pub user_email: String,
    pub product_list: Vec<String>,
    /// The order total. Calculated once, when the order is created.
    pub total_amount: Paise,
    pub address: String,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    /// Builds an order from the items in a customer's cart, computing the product list and the order total.
    ///
    /// Missing or blank email addresses and delivery addresses are replaced with [`GUEST_EMAIL`] and
    /// [`ADDRESS_NOT_PROVIDED`] respectively.
    pub fn from_line_items(
        items: &[LineItem],
        email: Option<String>,
        address: Option<String>,
    ) -> Result<Self, ValidationError> {
        if items.is_empty() {
            return Err(ValidationError("An order must contain at least one item".into()));
        }
        let total_amount = items.iter().try_fold(Paise::default(), |total, item| {
            let line_total = item.validated_total()?;
            total.checked_add(line_total).ok_or_else(|| ValidationError("The order total is too large".into()))
        })?;
        let product_list = items.iter().map(LineItem::description).collect();
        Self::from_summary(product_list, total_amount, email, address)
    }

    /// Builds an order where the client has already summarised the cart into a product list and a total.
    pub fn from_summary(
        product_list: Vec<String>,
        total_amount: Paise,
        email: Option<String>,
        address: Option<String>,
    ) -> Result<Self, ValidationError> {
        let order = Self {
            razorpay_order_id: None,
            razorpay_payment_id: None,
            user_email: or_sentinel(email, GUEST_EMAIL),
            product_list,
            total_amount,
            address: or_sentinel(address, ADDRESS_NOT_PROVIDED),
            status: OrderStatusType::Processing,
            created_at: Utc::now(),
        };
        order.validate()?;
        Ok(order)
    }

    pub fn with_gateway_order_id(mut self, id: GatewayOrderId) -> Self {
        self.razorpay_order_id = Some(id);
        self
    }

    /// Attaches a completed payment to the order. The order will be stored as `Paid`.
    pub fn with_payment_id(mut self, id: GatewayPaymentId) -> Self {
        self.razorpay_payment_id = Some(id);
        self.status = OrderStatusType::Paid;
        self
    }

    /// Applies the gateway identifiers of a verified payment to this order.
    pub fn paid_with(self, confirmation: &PaymentConfirmation) -> Self {
        let order = self.with_payment_id(confirmation.razorpay_payment_id.clone());
        match &confirmation.razorpay_order_id {
            Some(oid) => order.with_gateway_order_id(oid.clone()),
            None => order,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.total_amount.is_negative() {
            return Err(ValidationError(format!("The order total cannot be negative ({})", self.total_amount)));
        }
        if self.product_list.is_empty() {
            return Err(ValidationError("An order must contain at least one item".into()));
        }
        if self.product_list.iter().any(|p| p.trim().is_empty()) {
            return Err(ValidationError("Product descriptions cannot be blank".into()));
        }
        if self.razorpay_payment_id.as_ref().is_some_and(|p| p.as_str().trim().is_empty()) {
            return Err(ValidationError("The gateway payment id cannot be blank".into()));
        }
        Ok(())
    }
}

fn or_sentinel(value: Option<String>, sentinel: &str) -> String {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).unwrap_or_else(|| sentinel.to_string())
}

//--------------------------------------  PaymentConfirmation  ---------------------------------------------------------
/// Identifies a verified payment. The payment id is the join key; the gateway order id is used to find orders that were
/// recorded before the customer paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub razorpay_order_id: Option<GatewayOrderId>,
    pub razorpay_payment_id: GatewayPaymentId,
}

impl PaymentConfirmation {
    pub fn new(order_id: Option<GatewayOrderId>, payment_id: GatewayPaymentId) -> Self {
        Self { razorpay_order_id: order_id, razorpay_payment_id: payment_id }
    }
}

impl Display for PaymentConfirmation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.razorpay_order_id {
            Some(oid) => write!(f, "{}|{oid}", self.razorpay_payment_id),
            None => write!(f, "{}", self.razorpay_payment_id),
        }
    }
}

//--------------------------------------  ConfirmationResult   ---------------------------------------------------------
/// The result of reconciling a verified payment against the order store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationResult {
    /// No order existed for the payment, so one was created with `Paid` status.
    Created(Order),
    /// An existing `Processing` order was marked as `Paid`.
    MarkedPaid(Order),
    /// The payment had already been applied. Nothing was changed.
    AlreadySettled(Order),
    /// No order matched the payment, and no order details were supplied to create one. Nothing was changed.
    Unmatched,
}

impl ConfirmationResult {
    pub fn order(&self) -> Option<&Order> {
        match self {
            Self::Created(o) | Self::MarkedPaid(o) | Self::AlreadySettled(o) => Some(o),
            Self::Unmatched => None,
        }
    }

    /// True if this confirmation is the one that moved the order into `Paid` status.
    pub fn is_new_payment(&self) -> bool {
        matches!(self, Self::Created(_) | Self::MarkedPaid(_))
    }
}

impl Display for ConfirmationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created(o) => write!(f, "created {o}"),
            Self::MarkedPaid(o) => write!(f, "marked {o} as paid"),
            Self::AlreadySettled(o) => write!(f, "{o} was already settled"),
            Self::Unmatched => write!(f, "no matching order"),
        }
    }
}
