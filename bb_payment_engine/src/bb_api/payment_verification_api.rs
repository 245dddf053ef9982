use std::fmt::Debug;

use log::*;

use crate::{
    bb_api::{
        errors::ReconciliationError,
        order_flow_api::OrderFlowApi,
        order_objects::{VerificationOutcome, VerificationRequest, WebhookOutcome},
    },
    db_types::{ConfirmationResult, PaymentConfirmation},
    helpers::SignatureVerifier,
    traits::OrderManagement,
};

/// Authenticates payment notifications before they are allowed anywhere near the order store.
///
/// Two verifiers are held, since Razorpay signs checkout callbacks with the API key secret, but webhooks with the
/// (separately configured) webhook secret.
pub struct PaymentVerificationApi<B> {
    flow: OrderFlowApi<B>,
    checkout: SignatureVerifier,
    webhook: SignatureVerifier,
}

impl<B> Debug for PaymentVerificationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentVerificationApi")
    }
}

impl<B> PaymentVerificationApi<B> {
    pub fn new(flow: OrderFlowApi<B>, checkout: SignatureVerifier, webhook: SignatureVerifier) -> Self {
        Self { flow, checkout, webhook }
    }

    pub fn flow(&self) -> &OrderFlowApi<B> {
        &self.flow
    }
}

impl<B> PaymentVerificationApi<B>
where B: OrderManagement
{
    /// Handles the checkout widget's payment callback.
    ///
    /// The signature is checked first. A bad signature is rejected without touching the store, as is a request with
    /// invalid cart contents. Once verified, the payment is reconciled, creating the order from the request's cart if
    /// no stored order matches it.
    pub async fn verify_payment(&self, req: VerificationRequest) -> Result<VerificationOutcome, ReconciliationError> {
        if !self.checkout.verify_payment(&req.razorpay_order_id, &req.razorpay_payment_id, &req.razorpay_signature) {
            warn!("🔐️ Invalid signature for payment {} on order {}", req.razorpay_payment_id, req.razorpay_order_id);
            return Err(ReconciliationError::SignatureMismatch);
        }
        debug!("🔐️ Signature for payment {} verified", req.razorpay_payment_id);
        let confirmation = req.confirmation()?;
        let new_order = req.new_order().map_err(|e| {
            warn!("🔄️ Payment {confirmation} is genuine, but the order details are invalid. {e}");
            ReconciliationError::from(e)
        })?;
        let result = self.flow.confirm_paid(&confirmation, new_order).await?;
        Ok(VerificationOutcome { result })
    }

    /// Handles a webhook delivery.
    ///
    /// The signature is checked over the raw body before anything else is done with it. `extract` pulls the payment
    /// out of the (provider-specific) body. It returns `Ok(None)` for events that do not concern a payment, and an
    /// error message if the body cannot be understood. Neither case is an error for the caller: gateways retry failed
    /// deliveries, and retrying a signed event we cannot use achieves nothing.
    pub async fn process_webhook<F>(
        &self,
        raw_body: &[u8],
        signature: &str,
        extract: F,
    ) -> Result<WebhookOutcome, ReconciliationError>
    where
        F: FnOnce(&[u8]) -> Result<Option<PaymentConfirmation>, String>,
    {
        if !self.webhook.verify_webhook(raw_body, signature) {
            warn!("🪝️ Webhook signature mismatch. Payload rejected");
            return Err(ReconciliationError::SignatureMismatch);
        }
        let confirmation = match extract(raw_body) {
            Ok(Some(confirmation)) => confirmation,
            Ok(None) => {
                debug!("🪝️ Webhook event does not concern a payment. Ignored");
                return Ok(WebhookOutcome::Ignored("Not a payment event".into()));
            },
            Err(e) => {
                warn!("🪝️ Signed webhook payload could not be understood. {e}");
                return Ok(WebhookOutcome::Ignored(e));
            },
        };
        let result = self.reconcile_webhook_payment(&confirmation).await?;
        Ok(WebhookOutcome::Reconciled(result))
    }

    /// Reconciles a payment reported by the gateway. The webhook never carries order details, so an unmatched payment
    /// is left alone.
    pub async fn reconcile_webhook_payment(
        &self,
        confirmation: &PaymentConfirmation,
    ) -> Result<ConfirmationResult, ReconciliationError> {
        let result = self.flow.confirm_paid(confirmation, None).await?;
        if matches!(result, ConfirmationResult::Unmatched) {
            info!("🪝️ Webhook payment {confirmation} has no matching order. Accepted without effect");
        }
        Ok(result)
    }
}
