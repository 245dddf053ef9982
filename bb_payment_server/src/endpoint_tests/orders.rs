use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use bb_common::Paise;
use bb_payment_engine::{
    db_types::{GatewayPaymentId, OrderStatusType, ADDRESS_NOT_PROVIDED, GUEST_EMAIL},
    traits::OrderStoreError,
};
use serde_json::json;

use super::{
    helpers::{bearer, bearer_auth, configure_common, order_flow_api, response_parts, sample_order},
    mocks::MockOrderStore,
};
use crate::{
    auth::Role,
    config::ServerOptions,
    routes::{OrderByIdRoute, OrdersRoute, RecordOrderRoute, SaveOrderRoute, UpdateOrderStatusRoute},
};

async fn call(store: MockOrderStore, options: ServerOptions, req: TestRequest) -> (StatusCode, String) {
    let app = test::init_service(App::new().wrap(bearer_auth()).configure(|cfg| {
        configure_common(cfg, options);
        cfg.app_data(order_flow_api(store)).service(
            web::scope("/api")
                .service(RecordOrderRoute::<MockOrderStore>::new())
                .service(SaveOrderRoute::<MockOrderStore>::new())
                .service(OrdersRoute::<MockOrderStore>::new())
                .service(OrderByIdRoute::<MockOrderStore>::new())
                .service(UpdateOrderStatusRoute::<MockOrderStore>::new()),
        );
    }))
    .await;
    response_parts(test::try_call_service(&app, req.to_request()).await).await
}

fn admin() -> (&'static str, String) {
    bearer(&[Role::User, Role::Admin], Some("admin@bharatbartan.in"))
}

//----------------------------------------------   Admin access  ----------------------------------------------------

#[actix_web::test]
async fn fetch_orders_as_admin() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store
        .expect_fetch_orders()
        .times(1)
        .returning(|| Ok(vec![sample_order(2, OrderStatusType::Paid), sample_order(1, OrderStatusType::Processing)]));
    let req = TestRequest::get().uri("/api/orders").insert_header(admin());
    let (status, body) = call(store, ServerOptions::default(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ORDERS_JSON);
}

#[actix_web::test]
async fn fetch_orders_without_token() {
    let mut store = MockOrderStore::new();
    store.expect_fetch_orders().never();
    let (status, body) = call(store, ServerOptions::default(), TestRequest::get().uri("/api/orders")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"Authentication Error. No bearer token was provided."}"#);
}

#[actix_web::test]
async fn fetch_orders_with_bad_token() {
    let req = TestRequest::get().uri("/api/orders").insert_header(("Authorization", "Bearer e30.00ff"));
    let (status, body) = call(MockOrderStore::new(), ServerOptions::default(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"Authentication Error. Bearer token signature is invalid. Signature does not match"}"#);
}

#[actix_web::test]
async fn fetch_orders_as_customer() {
    let req = TestRequest::get().uri("/api/orders").insert_header(bearer(&[Role::User], None));
    let (status, _) = call(MockOrderStore::new(), ServerOptions::default(), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn admin_checks_can_be_switched_off() {
    let mut store = MockOrderStore::new();
    store.expect_fetch_orders().times(1).returning(|| Ok(vec![]));
    let options = ServerOptions { admin_auth: false, ..ServerOptions::default() };
    let (status, body) = call(store, options, TestRequest::get().uri("/api/orders")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
}

#[actix_web::test]
async fn fetch_single_order() {
    let mut store = MockOrderStore::new();
    store.expect_fetch_order_by_id().withf(|id| *id == 1).returning(|_| Ok(Some(sample_order(1, OrderStatusType::Paid))));
    store.expect_fetch_order_by_id().withf(|id| *id == 2).returning(|_| Ok(None));
    let (status, body) =
        call(store, ServerOptions::default(), TestRequest::get().uri("/api/orders/1").insert_header(admin())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with(r#"{"id":1,"razorpayOrderId":"order_abc","razorpayPaymentId":"pay_123""#), "{body}");
}

//----------------------------------------------   Status updates  ----------------------------------------------------

#[actix_web::test]
async fn update_status() {
    let mut store = MockOrderStore::new();
    store.expect_fetch_order_by_id().never();
    store
        .expect_update_order_status()
        .withf(|id, status| *id == 1 && *status == OrderStatusType::Other("Shipped".into()))
        .times(1)
        .returning(|id, status| {
            let mut order = sample_order(id, OrderStatusType::Paid);
            order.status = status.clone();
            Ok((order, OrderStatusType::Paid))
        });
    let req =
        TestRequest::put().uri("/api/orders/1/status").insert_header(admin()).set_json(json!({ "status": "Shipped" }));
    let (status, body) = call(store, ServerOptions::default(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"Status updated"}"#);
}

#[actix_web::test]
async fn update_status_of_missing_order() {
    let mut store = MockOrderStore::new();
    store
        .expect_update_order_status()
        .withf(|id, _| *id == 99)
        .times(1)
        .returning(|id, _| Err(OrderStoreError::OrderIdNotFound(id)));
    let req =
        TestRequest::put().uri("/api/orders/99/status").insert_header(admin()).set_json(json!({ "status": "Shipped" }));
    let (status, body) = call(store, ServerOptions::default(), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"Order not found"}"#);

    // Not an order id at all
    let req = TestRequest::put()
        .uri("/api/orders/66b1f0c2e4/status")
        .insert_header(admin())
        .set_json(json!({ "status": "Shipped" }));
    let (status, _) = call(MockOrderStore::new(), ServerOptions::default(), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn update_status_needs_a_status() {
    let req = TestRequest::put().uri("/api/orders/1/status").insert_header(admin()).set_json(json!({ "status": "  " }));
    let (status, _) = call(MockOrderStore::new(), ServerOptions::default(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn update_status_as_customer() {
    let req = TestRequest::put()
        .uri("/api/orders/1/status")
        .insert_header(bearer(&[Role::User], None))
        .set_json(json!({ "status": "Delivered" }));
    let (status, _) = call(MockOrderStore::new(), ServerOptions::default(), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

//----------------------------------------------   Order submission  ----------------------------------------------------

#[actix_web::test]
async fn save_guest_order() {
    let mut store = MockOrderStore::new();
    store
        .expect_insert_order()
        .withf(|o| {
            o.user_email == GUEST_EMAIL &&
                o.address == ADDRESS_NOT_PROVIDED &&
                o.total_amount == Paise::from(90_000) &&
                o.product_list == vec!["Copper Lota x2".to_string(), "Steel Tiffin x1".to_string()] &&
                o.status == OrderStatusType::Processing
        })
        .times(1)
        .returning(|_| Ok((sample_order(7, OrderStatusType::Processing), true)));
    let req = TestRequest::post().uri("/api/save-order").set_json(json!({
        "items": [
            { "title": "Copper Lota", "price": 300, "quantity": 2 },
            { "title": "Steel Tiffin", "price": 300, "quantity": 1 }
        ]
    }));
    let (status, body) = call(store, ServerOptions::default(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"message":"Guest order saved successfully","orderId":7}"#);
}

#[actix_web::test]
async fn save_order_needs_items() {
    let mut store = MockOrderStore::new();
    store.expect_insert_order().never();
    let req = TestRequest::post().uri("/api/save-order").set_json(json!({ "items": [] }));
    let (status, _) = call(store, ServerOptions::default(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = TestRequest::post().uri("/api/save-order").set_json(json!({ "email": "x@example.com" }));
    let (status, body) = call(MockOrderStore::new(), ServerOptions::default(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with(r#"{"error":"Could not read request body"#), "{body}");
}

#[actix_web::test]
async fn record_paid_order() {
    let mut store = MockOrderStore::new();
    store
        .expect_insert_order()
        .withf(|o| {
            o.status == OrderStatusType::Paid &&
                o.razorpay_payment_id == Some(GatewayPaymentId::new("pay_123")) &&
                o.user_email == "devika@example.com" &&
                o.total_amount == Paise::from(50_000)
        })
        .times(1)
        .returning(|_| Ok((sample_order(3, OrderStatusType::Paid), true)));
    let req = TestRequest::post().uri("/api/order").insert_header(bearer(&[Role::User], Some("devika@example.com"))).set_json(
        json!({
            "razorpayPaymentId": "pay_123",
            "razorpayOrderId": "order_abc",
            "productList": ["Brass Diya x2"],
            "totalAmount": 500
        }),
    );
    let (status, body) = call(store, ServerOptions::default(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"message":"Order saved successfully","orderId":3}"#);
}

#[actix_web::test]
async fn record_order_twice() {
    let mut store = MockOrderStore::new();
    store.expect_insert_order().times(1).returning(|_| Ok((sample_order(3, OrderStatusType::Paid), false)));
    let req = TestRequest::post().uri("/api/order").set_json(json!({
        "razorpayPaymentId": "pay_123",
        "items": [{ "title": "Brass Diya", "price": 250, "quantity": 2 }]
    }));
    let (status, body) = call(store, ServerOptions::default(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"message":"Order already recorded","orderId":3}"#);
}

const ORDERS_JSON: &str = r#"[{"id":2,"razorpayOrderId":"order_abc","razorpayPaymentId":"pay_123","userEmail":"meera@example.com","productList":["Brass Diya x2"],"totalAmount":500.0,"address":"12 MG Road, Pune","status":"Paid","createdAt":"2024-08-15T10:30:00Z","updatedAt":"2024-08-15T10:30:00Z"},{"id":1,"razorpayOrderId":"order_abc","razorpayPaymentId":null,"userEmail":"meera@example.com","productList":["Brass Diya x2"],"totalAmount":500.0,"address":"12 MG Road, Pune","status":"Processing","createdAt":"2024-08-15T10:30:00Z","updatedAt":"2024-08-15T10:30:00Z"}]"#;
