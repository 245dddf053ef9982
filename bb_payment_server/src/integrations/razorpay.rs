//! The Razorpay side of the payment server.
//!
//! [`PaymentGatewayClient`] is what the routes use to open a gateway order before checkout. [`RazorpayApi`] implements
//! it. [`extract_razorpay_payment`] teaches the (provider-agnostic) reconciliation API how to read a Razorpay webhook.
use bb_common::Paise;
use bb_payment_engine::db_types::{GatewayOrderId, GatewayPaymentId, PaymentConfirmation};
use log::*;
use razorpay_tools::{NewRazorpayOrder, RazorpayApi, RazorpayApiError, RazorpayOrder, RazorpayWebhookEvent};

#[allow(async_fn_in_trait)]
pub trait PaymentGatewayClient {
    /// The key the checkout widget is opened with. This is public information.
    fn publishable_key(&self) -> String;

    /// Opens a gateway order for `amount`. The customer pays against the returned order id.
    async fn create_order(&self, amount: Paise, currency: &str, receipt: &str)
        -> Result<RazorpayOrder, RazorpayApiError>;
}

impl PaymentGatewayClient for RazorpayApi {
    fn publishable_key(&self) -> String {
        self.key_id().to_string()
    }

    async fn create_order(
        &self,
        amount: Paise,
        currency: &str,
        receipt: &str,
    ) -> Result<RazorpayOrder, RazorpayApiError> {
        let order = NewRazorpayOrder { amount: amount.value(), currency: currency.to_string(), receipt: receipt.into() };
        RazorpayApi::create_order(self, order).await
    }
}

/// Reads the payment out of a (signature-checked) Razorpay webhook body.
///
/// Returns `Ok(None)` for events that do not mean a payment was taken, and an error message if the body is not a
/// Razorpay event, or a payment event without a usable payment entity.
pub fn extract_razorpay_payment(raw_body: &[u8]) -> Result<Option<PaymentConfirmation>, String> {
    let event = serde_json::from_slice::<RazorpayWebhookEvent>(raw_body)
        .map_err(|e| format!("Not a Razorpay webhook event. {e}"))?;
    if !event.is_payment_event() {
        debug!("🪝️ Received a {} event", event.event);
        return Ok(None);
    }
    let payment = event.payment().ok_or_else(|| format!("The {} event does not carry a payment", event.event))?;
    let payment_id =
        payment.id.parse::<GatewayPaymentId>().map_err(|e| format!("{} event has an invalid payment id. {e}", event.event))?;
    let order_id = payment.order_id.as_deref().and_then(|id| id.parse::<GatewayOrderId>().ok());
    trace!("🪝️ {} event for payment {payment_id}", event.event);
    Ok(Some(PaymentConfirmation::new(order_id, payment_id)))
}
