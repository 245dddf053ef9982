//! Request handlers for the storefront API and the Razorpay webhook.
//!
//! Handlers are generic over the order store (and the gateway client, for checkout set-up) so that they can be exercised
//! against mocks. The `route!` macro registers the monomorphised handler with actix, and wraps admin routes in the ACL
//! middleware.
//!
//! Every store or gateway call is awaited. Nothing in a handler may block the worker thread.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use bb_common::CURRENCY_CODE;
use bb_payment_engine::{
    db_types::OrderStatusType,
    order_objects::{RecordOrderRequest, SaveOrderRequest, StatusUpdateRequest, VerificationRequest, WebhookOutcome},
    traits::OrderManagement,
    OrderFlowApi,
    PaymentVerificationApi,
    ReconciliationError,
};
use bytes::Bytes;
use log::*;
use razorpay_tools::random_receipt_id;

use crate::{
    auth::{Role, UserRef},
    config::ServerOptions,
    data_objects::{
        CreateOrderRequest,
        CreateOrderResponse,
        JsonResponse,
        KeyResponse,
        OrderSavedResponse,
        VerifyPaymentResponse,
        WebhookResponse,
    },
    errors::ServerError,
    helpers::get_remote_ip,
    integrations::razorpay::{extract_razorpay_payment, PaymentGatewayClient},
};

pub const RAZORPAY_SIGNATURE_HEADER: &str = "x-razorpay-signature";

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

#[get("/")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().body("BharatBartan backend is running")
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(get_razorpay_key => Get "/get-razorpay-key" impl PaymentGatewayClient);
/// The key the storefront opens the Razorpay checkout widget with.
pub async fn get_razorpay_key<G: PaymentGatewayClient>(gateway: web::Data<G>) -> impl Responder {
    trace!("💻️ GET razorpay key");
    HttpResponse::Ok().json(KeyResponse { key: gateway.publishable_key() })
}

route!(create_order => Post "/create-order" impl PaymentGatewayClient);
/// Opens a Razorpay order for the cart total (in rupees). The storefront passes the returned `orderId` to the checkout
/// widget.
pub async fn create_order<G: PaymentGatewayClient>(
    body: web::Json<CreateOrderRequest>,
    gateway: web::Data<G>,
) -> Result<HttpResponse, ServerError> {
    let amount = body.into_inner().total_amount;
    debug!("💻️ POST create-order for {amount}");
    if amount.value() <= 0 {
        return Err(ServerError::InvalidRequestBody(format!("The order total must be positive. Got {amount}")));
    }
    let order = gateway.create_order(amount, CURRENCY_CODE, &random_receipt_id()).await.map_err(|e| {
        warn!("💻️ Could not create a Razorpay order for {amount}. {e}");
        ServerError::from(e)
    })?;
    info!("💻️ Razorpay order {} opened for {amount}", order.id);
    Ok(HttpResponse::Ok().json(CreateOrderResponse { order_id: order.id, amount: order.amount, currency: order.currency }))
}

route!(verify_payment => Post "/verify-payment" impl OrderManagement);
/// The checkout widget's success callback, forwarded by the storefront.
///
/// The response always says whether the payment signature checked out. A genuine payment is `verified: true` even if
/// the order could not be recorded; the `error` field then says what went wrong.
pub async fn verify_payment<B: OrderManagement>(
    body: web::Json<VerificationRequest>,
    user: Option<UserRef>,
    api: web::Data<PaymentVerificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let mut req = body.into_inner();
    debug!("💻️ POST verify-payment for payment {} on {}", req.razorpay_payment_id, req.razorpay_order_id);
    if req.email.is_none() {
        req.email = user.as_ref().and_then(|u| u.email()).map(String::from);
    }
    let response = match api.verify_payment(req).await {
        Ok(outcome) => match outcome.order() {
            Some(order) => HttpResponse::Ok().json(VerifyPaymentResponse::verified(order.id)),
            None => HttpResponse::Ok().json(VerifyPaymentResponse::verified_with_error(
                "Payment verified, but no order details were supplied to record it",
            )),
        },
        Err(ReconciliationError::SignatureMismatch) => HttpResponse::Ok().json(VerifyPaymentResponse::rejected()),
        Err(ReconciliationError::ValidationFailure(e)) => {
            HttpResponse::BadRequest().json(VerifyPaymentResponse::verified_with_error(e))
        },
        Err(e) => {
            error!("💻️ A verified payment could not be recorded. {e}");
            HttpResponse::InternalServerError()
                .json(VerifyPaymentResponse::verified_with_error("Payment verified but order save failed"))
        },
    };
    Ok(response)
}

route!(razorpay_webhook => Post "/razorpay" impl OrderManagement);
/// Razorpay webhook deliveries.
///
/// The body is taken as raw bytes, because the signature covers the body exactly as it was sent. Anything but a
/// signature mismatch or a store failure is acknowledged with a 200, so that Razorpay stops redelivering it.
pub async fn razorpay_webhook<B: OrderManagement>(
    req: HttpRequest,
    body: Bytes,
    options: web::Data<ServerOptions>,
    api: web::Data<PaymentVerificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let peer = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded)
        .map_or_else(|| "unknown peer".to_string(), |ip| ip.to_string());
    debug!("🪝️ Razorpay webhook ({} bytes) from {peer}", body.len());
    let signature = req.headers().get(RAZORPAY_SIGNATURE_HEADER).and_then(|v| v.to_str().ok()).unwrap_or_default();
    match api.process_webhook(&body, signature, extract_razorpay_payment).await {
        Ok(WebhookOutcome::Reconciled(result)) => {
            info!("🪝️ Webhook from {peer} reconciled: {result}");
            Ok(HttpResponse::Ok().json(WebhookResponse::ok()))
        },
        Ok(WebhookOutcome::Ignored(reason)) => {
            debug!("🪝️ Webhook from {peer} ignored. {reason}");
            Ok(HttpResponse::Ok().json(WebhookResponse::ok()))
        },
        Err(ReconciliationError::SignatureMismatch) => {
            warn!("🪝️ Rejected a webhook with an invalid signature from {peer}");
            Ok(HttpResponse::BadRequest().json(WebhookResponse::invalid_signature()))
        },
        Err(e) => {
            error!("🪝️ Webhook from {peer} could not be processed. Razorpay will redeliver it. {e}");
            Err(e.into())
        },
    }
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(record_order => Post "/order" impl OrderManagement);
/// Records an order submitted by the storefront. If it carries a payment id, it is recorded as paid.
pub async fn record_order<B: OrderManagement>(
    body: web::Json<RecordOrderRequest>,
    user: Option<UserRef>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let mut req = body.into_inner();
    if req.email.is_none() {
        req.email = user.as_ref().and_then(|u| u.email()).map(String::from);
    }
    let order = req.into_new_order().map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
    debug!("💻️ POST order for {} ({})", order.user_email, order.total_amount);
    let (order, inserted) = api.record_order(order).await?;
    let message = if inserted { "Order saved successfully" } else { "Order already recorded" };
    Ok(HttpResponse::Ok().json(OrderSavedResponse::new(message, order.id)))
}

route!(save_order => Post "/save-order" impl OrderManagement);
/// Saves a guest order built from the storefront's local cart. The order awaits payment.
pub async fn save_order<B: OrderManagement>(
    body: web::Json<SaveOrderRequest>,
    user: Option<UserRef>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let mut req = body.into_inner();
    if req.email.is_none() {
        req.email = user.as_ref().and_then(|u| u.email()).map(String::from);
    }
    let order = req.into_new_order().map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
    debug!("💻️ POST save-order for {} ({})", order.user_email, order.total_amount);
    let (order, _) = api.record_order(order).await?;
    Ok(HttpResponse::Ok().json(OrderSavedResponse::new("Guest order saved successfully", order.id)))
}

route!(orders => Get "/orders" impl OrderManagement where requires [Role::Admin]);
/// Every order, newest first.
pub async fn orders<B: OrderManagement>(api: web::Data<OrderFlowApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders");
    let orders = api.fetch_orders().await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{id}" impl OrderManagement where requires [Role::Admin]);
pub async fn order_by_id<B: OrderManagement>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = parse_order_id(&path.into_inner())?;
    debug!("💻️ GET order #{id}");
    let order = api.fetch_order(id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_order_status => Put "/orders/{id}/status" impl OrderManagement where requires [Role::Admin]);
/// Administrative status change. Any status can be set, including moving an order out of `Paid`.
pub async fn update_order_status<B: OrderManagement>(
    path: web::Path<String>,
    body: web::Json<StatusUpdateRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = parse_order_id(&path.into_inner())?;
    let status =
        body.status.parse::<OrderStatusType>().map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
    debug!("💻️ PUT order #{id} status to {status}");
    api.set_status(id, status).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Status updated")))
}

/// Order ids are integers. Anything else cannot name an order.
fn parse_order_id(id: &str) -> Result<i64, ServerError> {
    id.trim().parse::<i64>().map_err(|_| ServerError::NoRecordFound("Order not found".into()))
}
