use serde::{Deserialize, Serialize};

//--------------------------------------     Orders API      ---------------------------------------------------------
/// The request body for `POST /v1/orders`. `amount` is in the currency's minor unit (paise for INR).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRazorpayOrder {
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
}

/// The subset of the Razorpay order entity that the storefront uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: String,
}

//--------------------------------------      Webhooks       ---------------------------------------------------------
/// A webhook delivery from Razorpay.
///
/// Only payment-carrying events are modelled. Everything else deserializes with `payload.payment == None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayWebhookEvent {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
    #[serde(default)]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub payment: Option<PaymentEntityWrapper>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEntityWrapper {
    pub entity: PaymentEntity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEntity {
    /// The gateway payment id, `pay_XXXX`
    pub id: String,
    /// The gateway order id, `order_XXXX`. Absent for payments made outside of the Orders API.
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl RazorpayWebhookEvent {
    /// Events that mean the customer's money has been taken.
    pub const PAYMENT_EVENTS: [&'static str; 3] = ["payment.captured", "payment.authorized", "order.paid"];

    pub fn is_payment_event(&self) -> bool {
        Self::PAYMENT_EVENTS.contains(&self.event.as_str())
    }

    pub fn payment(&self) -> Option<&PaymentEntity> {
        self.payload.payment.as_ref().map(|p| &p.entity)
    }
}
