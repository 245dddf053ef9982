//! Order confirmation emails.
//!
//! Emails are sent from an engine event hook (see [`create_notification_event_handlers`]), so a slow or failing mail
//! service never holds up the request that paid for the order. Each email is retried with exponential backoff before
//! it is given up on.
use std::{future::Future, pin::Pin, sync::Arc};

use bb_payment_engine::{
    db_types::Order,
    events::{EventHandlers, EventHooks, OrderPaidEvent, OrderStatusChangedEvent},
};
use futures::future::BoxFuture;
use log::*;
use thiserror::Error;

use crate::config::NotificationConfig;

pub const CONFIRMATION_SUBJECT: &str = "BharatBartan - Order Confirmed";

#[derive(Debug, Clone, Error)]
#[error("Could not send email. {0}")]
pub struct MailerError(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConfirmationEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OrderConfirmationEmail {
    pub fn for_order(order: &Order) -> Self {
        let body = format!(
            "Namaste! Your payment of {} was successful. Your order #{} is confirmed.\n\nItems:\n{}\n\nDelivering to: {}",
            order.total_amount,
            order.id,
            order.product_list.iter().map(|p| format!("  * {p}")).collect::<Vec<_>>().join("\n"),
            order.address
        );
        Self { to: order.user_email.clone(), subject: CONFIRMATION_SUBJECT.to_string(), body }
    }
}

pub trait Mailer: Send + Sync + 'static {
    fn send(&self, email: &OrderConfirmationEmail) -> impl Future<Output = Result<(), MailerError>> + Send;
}

/// Writes emails to the log instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, email: &OrderConfirmationEmail) -> impl Future<Output = Result<(), MailerError>> + Send {
        info!("📧️ To: {} | Subject: {}\n{}", email.to, email.subject, email.body);
        futures::future::ready(Ok(()))
    }
}

/// Sends `email`, retrying up to `config.max_attempts` attempts in total. The wait between attempts starts at
/// `config.backoff` and doubles every time. Returns the number of attempts it took.
pub async fn send_with_retry<M: Mailer>(
    mailer: &M,
    email: &OrderConfirmationEmail,
    config: &NotificationConfig,
) -> Result<u32, MailerError> {
    let mut delay = config.backoff;
    let mut attempt = 1;
    loop {
        match mailer.send(email).await {
            Ok(()) => return Ok(attempt),
            Err(e) if attempt < config.max_attempts => {
                warn!("📧️ Attempt {attempt} to email {} failed. Retrying in {}ms. {e}", email.to, delay.as_millis());
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
            },
            Err(e) => return Err(e),
        }
    }
}

/// Hooks the confirmation mailer up to the engine's order events.
pub fn create_notification_event_handlers<M: Mailer>(mailer: M, config: NotificationConfig) -> EventHandlers {
    let mut hooks = EventHooks::default();
    let mailer = Arc::new(mailer);
    hooks.on_order_paid(move |ev: OrderPaidEvent| -> Pin<Box<dyn Future<Output = ()> + Send>> {
        let order = ev.order;
        if order.is_guest_order() {
            debug!("📧️ {order} was placed by a guest. No confirmation email will be sent.");
            return no_op();
        }
        let mailer = Arc::clone(&mailer);
        Box::pin(async move {
            let email = OrderConfirmationEmail::for_order(&order);
            match send_with_retry(mailer.as_ref(), &email, &config).await {
                Ok(attempts) => info!("📧️ Confirmation for order #{} sent to {} ({attempts} attempts)", order.id, email.to),
                Err(e) => error!(
                    "📧️ Giving up on the confirmation email for order #{} to {} after {} attempts. {e}",
                    order.id, email.to, config.max_attempts
                ),
            }
        })
    });
    hooks.on_status_changed(|ev: OrderStatusChangedEvent| -> Pin<Box<dyn Future<Output = ()> + Send>> {
        info!("📬️ Order #{} status changed from {} to {}", ev.order.id, ev.old_status, ev.order.status);
        no_op()
    });
    EventHandlers::new(config.queue_size, hooks)
}

fn no_op() -> BoxFuture<'static, ()> {
    Box::pin(async {})
}
