use actix_web::{
    body::{to_bytes, MessageBody},
    dev::ServiceResponse,
    http::StatusCode,
    test,
    web,
    web::ServiceConfig,
};
use bb_common::{Paise, Secret};
use bb_payment_engine::{
    db_types::{GatewayOrderId, GatewayPaymentId, Order, OrderStatusType},
    events::EventProducers,
    helpers::{payment_message, sign, SignatureVerifier},
    OrderFlowApi,
    PaymentVerificationApi,
};
use chrono::{TimeZone, Utc};

use crate::{
    auth::{HmacTokenResolver, Role, TokenIssuer, UserRef},
    config::{AuthConfig, ServerOptions},
    middleware::BearerAuthFactory,
    server::json_error_handler,
};

// Test-only secrets. DO NOT re-use these anywhere.
pub const KEY_SECRET: &str = "rzp_test_key_secret_0123456789";
pub const WEBHOOK_SECRET: &str = "rzp_test_webhook_secret_abcdef";
const TOKEN_SECRET: &str = "endpoint-test-token-secret";

pub fn auth_config() -> AuthConfig {
    AuthConfig::new(Secret::new(TOKEN_SECRET.to_string()))
}

pub fn bearer_auth() -> BearerAuthFactory<HmacTokenResolver> {
    BearerAuthFactory::new(HmacTokenResolver::new(&auth_config()))
}

/// An `Authorization` header value for a user with the given roles.
pub fn bearer(roles: &[Role], email: Option<&str>) -> (&'static str, String) {
    let user = UserRef {
        subject: "test|user".into(),
        email: email.map(String::from),
        roles: roles.to_vec(),
        exp: Utc::now().timestamp() + 3600,
    };
    let token = TokenIssuer::new(&auth_config()).issue_token(&user).expect("Failed to issue token");
    ("Authorization", format!("Bearer {token}"))
}

pub fn checkout_signature(order_id: &str, payment_id: &str) -> String {
    sign(KEY_SECRET.as_bytes(), payment_message(order_id, payment_id).as_bytes()).expect("Failed to sign")
}

pub fn webhook_signature(body: &str) -> String {
    sign(WEBHOOK_SECRET.as_bytes(), body.as_bytes()).expect("Failed to sign")
}

/// The app data every route expects, apart from the APIs themselves.
pub fn configure_common(cfg: &mut ServiceConfig, options: ServerOptions) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler)).app_data(web::Data::new(options));
}

pub fn order_flow_api<B>(store: B) -> web::Data<OrderFlowApi<B>> {
    web::Data::new(OrderFlowApi::new(store, EventProducers::default()))
}

pub fn verification_api<B>(store: B) -> web::Data<PaymentVerificationApi<B>> {
    let flow = OrderFlowApi::new(store, EventProducers::default());
    web::Data::new(PaymentVerificationApi::new(
        flow,
        SignatureVerifier::new(Secret::new(KEY_SECRET.to_string())),
        SignatureVerifier::new(Secret::new(WEBHOOK_SECRET.to_string())),
    ))
}

/// Turns the result of a service call into the status and body the client would see. Errors raised by middleware
/// become responses here, as they would in the running server.
pub async fn response_parts<B: MessageBody>(res: Result<ServiceResponse<B>, actix_web::Error>) -> (StatusCode, String) {
    let (status, body) = match res {
        Ok(res) => {
            let status = res.status();
            (status, test::read_body(res).await)
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            (status, to_bytes(res.into_body()).await.unwrap_or_default())
        },
    };
    (status, String::from_utf8_lossy(&body).into_owned())
}

pub fn sample_order(id: i64, status: OrderStatusType) -> Order {
    let ts = Utc.with_ymd_and_hms(2024, 8, 15, 10, 30, 0).unwrap();
    Order {
        id,
        razorpay_order_id: Some(GatewayOrderId::new("order_abc")),
        razorpay_payment_id: (status == OrderStatusType::Paid).then(|| GatewayPaymentId::new("pay_123")),
        user_email: "meera@example.com".into(),
        product_list: vec!["Brass Diya x2".into()],
        total_amount: Paise::from(50_000),
        address: "12 MG Road, Pune".into(),
        status,
        created_at: ts,
        updated_at: ts,
    }
}
