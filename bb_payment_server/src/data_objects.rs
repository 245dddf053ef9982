use std::fmt::Display;

use bb_common::Paise;
use serde::{Deserialize, Serialize};

/// `POST /api/create-order`. The amount is in rupees.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub total_amount: Paise,
}

/// The gateway order the checkout widget is opened against. `amount` is in paise, as Razorpay reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyResponse {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerifyPaymentResponse {
    pub fn verified(order_id: i64) -> Self {
        Self { verified: true, order_id: Some(order_id), error: None }
    }

    /// The payment is genuine, but something went wrong afterwards.
    pub fn verified_with_error<S: Display>(error: S) -> Self {
        Self { verified: true, order_id: None, error: Some(error.to_string()) }
    }

    pub fn rejected() -> Self {
        Self { verified: false, order_id: None, error: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: String,
}

impl WebhookResponse {
    pub fn ok() -> Self {
        Self { status: "ok".into() }
    }

    pub fn invalid_signature() -> Self {
        Self { status: "invalid signature".into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSavedResponse {
    pub message: String,
    pub order_id: i64,
}

impl OrderSavedResponse {
    pub fn new<S: Display>(message: S, order_id: i64) -> Self {
        Self { message: message.to_string(), order_id }
    }
}

/// A plain acknowledgement, e.g. `{ "success": true, "message": "Status updated" }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}
