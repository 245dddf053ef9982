use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use bb_common::Paise;
use bb_payment_engine::{
    db_types::{ConfirmationResult, GatewayPaymentId, OrderStatusType},
    test_utils::prepare_env::new_test_db,
    traits::{OrderManagement, OrderStoreError},
    SqliteDatabase,
};
use razorpay_tools::{RazorpayApiError, RazorpayOrder};
use serde_json::json;

use super::{
    helpers::{
        bearer,
        bearer_auth,
        checkout_signature,
        configure_common,
        response_parts,
        sample_order,
        verification_api,
    },
    mocks::{MockGateway, MockOrderStore},
};
use crate::{
    auth::Role,
    config::ServerOptions,
    routes::{CreateOrderRoute, GetRazorpayKeyRoute, VerifyPaymentRoute},
};

fn gateway() -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_order()
        .withf(|amount, currency, receipt| {
            *amount == Paise::from(50_000) && currency.to_string() == "INR" && receipt.starts_with("receipt_order_")
        })
        .times(1)
        .returning(|amount, currency, receipt| {
            Ok(RazorpayOrder {
                id: "order_abc".into(),
                amount: amount.value(),
                currency: currency.to_string(),
                receipt: Some(receipt.to_string()),
                status: "created".into(),
            })
        });
    gateway
}

fn verify_body(signature: &str) -> serde_json::Value {
    json!({
        "razorpay_order_id": "order_abc",
        "razorpay_payment_id": "pay_123",
        "razorpay_signature": signature,
        "email": "meera@example.com",
        "address": "12 MG Road, Pune",
        "items": [{ "title": "Brass Diya", "price": 250, "quantity": 2 }]
    })
}

#[actix_web::test]
async fn razorpay_key() {
    let mut gateway = MockGateway::new();
    gateway.expect_publishable_key().return_const("rzp_test_abc".to_string());
    let app = test::init_service(App::new().configure(|cfg| {
        configure_common(cfg, ServerOptions::default());
        cfg.app_data(web::Data::new(gateway)).service(web::scope("/api").service(GetRazorpayKeyRoute::<MockGateway>::new()));
    }))
    .await;
    let req = TestRequest::get().uri("/api/get-razorpay-key");
    let (status, body) = response_parts(test::try_call_service(&app, req.to_request()).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"key":"rzp_test_abc"}"#);
}

#[actix_web::test]
async fn checkout_then_verify_payment() {
    let _ = env_logger::try_init().ok();
    let db = new_test_db().await;
    let store = db.clone();
    let app = test::init_service(App::new().wrap(bearer_auth()).configure(move |cfg| {
        configure_common(cfg, ServerOptions::default());
        cfg.app_data(web::Data::new(gateway())).app_data(verification_api(store)).service(
            web::scope("/api")
                .service(CreateOrderRoute::<MockGateway>::new())
                .service(VerifyPaymentRoute::<SqliteDatabase>::new()),
        );
    }))
    .await;

    let req = TestRequest::post().uri("/api/create-order").set_json(json!({ "totalAmount": 500 }));
    let (status, body) = response_parts(test::try_call_service(&app, req.to_request()).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"orderId":"order_abc","amount":50000,"currency":"INR"}"#);

    let signature = checkout_signature("order_abc", "pay_123");
    let req = TestRequest::post().uri("/api/verify-payment").set_json(verify_body(&signature));
    let (status, body) = response_parts(test::try_call_service(&app, req.to_request()).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"verified":true,"orderId":1}"#);

    // The storefront retries the callback. Nothing changes.
    let req = TestRequest::post().uri("/api/verify-payment").set_json(verify_body(&signature));
    let (status, body) = response_parts(test::try_call_service(&app, req.to_request()).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"verified":true,"orderId":1}"#);

    let orders = db.fetch_orders().await.unwrap();
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.status, OrderStatusType::Paid);
    assert_eq!(order.razorpay_payment_id, Some(GatewayPaymentId::new("pay_123")));
    assert_eq!(order.total_amount, Paise::from(50_000));
    assert_eq!(order.product_list, vec!["Brass Diya x2".to_string()]);
}

#[actix_web::test]
async fn create_order_needs_a_positive_amount() {
    let mut gateway = MockGateway::new();
    gateway.expect_create_order().never();
    let app = test::init_service(App::new().configure(|cfg| {
        configure_common(cfg, ServerOptions::default());
        cfg.app_data(web::Data::new(gateway)).service(web::scope("/api").service(CreateOrderRoute::<MockGateway>::new()));
    }))
    .await;
    for amount in [json!(0), json!(-20), json!("lots")] {
        let req = TestRequest::post().uri("/api/create-order").set_json(json!({ "totalAmount": amount.clone() }));
        let (status, body) = response_parts(test::try_call_service(&app, req.to_request()).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{amount}");
        assert!(body.starts_with(r#"{"error":"#), "{body}");
    }
}

#[actix_web::test]
async fn create_order_gateway_failure() {
    let mut gateway = MockGateway::new();
    gateway.expect_create_order().times(1).returning(|_, _, _| {
        Err(RazorpayApiError::QueryError { status: 401, message: "Authentication failed".into() })
    });
    let app = test::init_service(App::new().configure(|cfg| {
        configure_common(cfg, ServerOptions::default());
        cfg.app_data(web::Data::new(gateway)).service(web::scope("/api").service(CreateOrderRoute::<MockGateway>::new()));
    }))
    .await;
    let req = TestRequest::post().uri("/api/create-order").set_json(json!({ "totalAmount": 120.5 }));
    let (status, _) = response_parts(test::try_call_service(&app, req.to_request()).await).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

async fn verify_with_store(
    store: MockOrderStore,
    body: serde_json::Value,
    auth: Option<(&'static str, String)>,
) -> (StatusCode, String) {
    let app = test::init_service(App::new().wrap(bearer_auth()).configure(|cfg| {
        configure_common(cfg, ServerOptions::default());
        cfg.app_data(verification_api(store))
            .service(web::scope("/api").service(VerifyPaymentRoute::<MockOrderStore>::new()));
    }))
    .await;
    let mut req = TestRequest::post().uri("/api/verify-payment").set_json(body);
    if let Some(header) = auth {
        req = req.insert_header(header);
    }
    response_parts(test::try_call_service(&app, req.to_request()).await).await
}

#[actix_web::test]
async fn tampered_signature_is_not_verified() {
    let _ = env_logger::try_init().ok();
    // Any store access fails the test
    let store = MockOrderStore::new();
    let mut signature = checkout_signature("order_abc", "pay_123");
    let flipped = if signature.starts_with('0') { "1" } else { "0" };
    signature.replace_range(0..1, flipped);
    let (status, body) = verify_with_store(store, verify_body(&signature), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"verified":false}"#);

    let signature = checkout_signature("order_abc", "pay_999");
    let (status, body) = verify_with_store(MockOrderStore::new(), verify_body(&signature), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"verified":false}"#);
}

#[actix_web::test]
async fn genuine_payment_with_invalid_cart() {
    let signature = checkout_signature("order_abc", "pay_123");
    let mut body = verify_body(&signature);
    body["items"] = json!([{ "title": "Brass Diya", "price": -250, "quantity": 2 }]);
    let (status, body) = verify_with_store(MockOrderStore::new(), body, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with(r#"{"verified":true,"error":"#), "{body}");
}

#[actix_web::test]
async fn verified_payment_that_cannot_be_saved() {
    let mut store = MockOrderStore::new();
    store.expect_confirm_paid().times(1).returning(|_, _| Err(OrderStoreError::Timeout(5000)));
    let signature = checkout_signature("order_abc", "pay_123");
    let (status, body) = verify_with_store(store, verify_body(&signature), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, r#"{"verified":true,"error":"Payment verified but order save failed"}"#);
}

#[actix_web::test]
async fn signed_in_users_email_is_used() {
    let mut store = MockOrderStore::new();
    store
        .expect_confirm_paid()
        .withf(|confirmation, create| {
            confirmation.razorpay_payment_id.as_str() == "pay_123" &&
                create.as_ref().is_some_and(|o| o.user_email == "devika@example.com")
        })
        .times(1)
        .returning(|_, _| Ok(ConfirmationResult::Created(sample_order(5, OrderStatusType::Paid))));
    let signature = checkout_signature("order_abc", "pay_123");
    let mut body = verify_body(&signature);
    body.as_object_mut().unwrap().remove("email");
    let auth = bearer(&[Role::User], Some("devika@example.com"));
    let (status, body) = verify_with_store(store, body, Some(auth)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"verified":true,"orderId":5}"#);
}

#[actix_web::test]
async fn verified_payment_without_cart_or_order() {
    let mut store = MockOrderStore::new();
    store
        .expect_confirm_paid()
        .withf(|_, create| create.is_none())
        .times(1)
        .returning(|_, _| Ok(ConfirmationResult::Unmatched));
    let signature = checkout_signature("order_abc", "pay_123");
    let body = json!({
        "razorpay_order_id": "order_abc",
        "razorpay_payment_id": "pay_123",
        "razorpay_signature": signature,
    });
    let (status, body) = verify_with_store(store, body, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"verified":true,"error":"Payment verified, but no order details were supplied to record it"}"#);
}
