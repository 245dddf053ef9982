use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use bb_payment_engine::{
    db_types::{ConfirmationResult, GatewayOrderId, GatewayPaymentId, LineItem, NewOrder, OrderStatusType},
    events::EventProducers,
    test_utils::prepare_env::new_test_db,
    traits::{OrderManagement, OrderStoreError},
    OrderFlowApi,
    SqliteDatabase,
};

use super::{
    helpers::{configure_common, response_parts, verification_api, webhook_signature},
    mocks::MockOrderStore,
};
use crate::{config::ServerOptions, routes::RazorpayWebhookRoute};

const CAPTURED: &str = r#"{"entity":"event","account_id":"acc_BFQ7uQEaa7j2z7","event":"payment.captured","contains":["payment"],"payload":{"payment":{"entity":{"id":"pay_123","entity":"payment","amount":50000,"currency":"INR","status":"captured","order_id":"order_abc","email":"meera@example.com"}}},"created_at":1723717800}"#;

fn webhook(body: &str, signature: &str) -> TestRequest {
    TestRequest::post()
        .uri("/webhook/razorpay")
        .insert_header(("Content-Type", "application/json"))
        .insert_header(("X-Razorpay-Signature", signature.to_string()))
        .set_payload(body.to_string())
}

#[actix_web::test]
async fn duplicate_webhooks_settle_one_order() {
    let _ = env_logger::try_init().ok();
    let db = new_test_db().await;
    // The storefront saved the cart before the customer paid
    let flow = OrderFlowApi::new(db.clone(), EventProducers::default());
    let order = NewOrder::from_line_items(&[LineItem::new("Brass Diya", 250.0, 2)], None, None)
        .unwrap()
        .with_gateway_order_id(GatewayOrderId::new("order_abc"));
    let (saved, _) = flow.record_order(order).await.unwrap();
    assert_eq!(saved.status, OrderStatusType::Processing);

    let store = db.clone();
    let app = test::init_service(App::new().configure(move |cfg| {
        configure_common(cfg, ServerOptions::default());
        cfg.app_data(verification_api(store))
            .service(web::scope("/webhook").service(RazorpayWebhookRoute::<SqliteDatabase>::new()));
    }))
    .await;
    let signature = webhook_signature(CAPTURED);
    for _ in 0..2 {
        let res = test::try_call_service(&app, webhook(CAPTURED, &signature).to_request()).await;
        let (status, body) = response_parts(res).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"ok"}"#);
    }
    let orders = db.fetch_orders().await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, saved.id);
    assert_eq!(orders[0].status, OrderStatusType::Paid);
    assert_eq!(orders[0].razorpay_payment_id, Some(GatewayPaymentId::new("pay_123")));
}

async fn call_with_store(store: MockOrderStore, req: TestRequest) -> (StatusCode, String) {
    let app = test::init_service(App::new().configure(|cfg| {
        configure_common(cfg, ServerOptions::default());
        cfg.app_data(verification_api(store))
            .service(web::scope("/webhook").service(RazorpayWebhookRoute::<MockOrderStore>::new()));
    }))
    .await;
    response_parts(test::try_call_service(&app, req.to_request()).await).await
}

#[actix_web::test]
async fn invalid_webhook_signatures_are_rejected() {
    let _ = env_logger::try_init().ok();
    let signature = webhook_signature(CAPTURED);
    // Re-serialising the body changes the bytes, so the signature no longer matches
    let parsed = serde_json::from_str::<serde_json::Value>(CAPTURED).unwrap();
    let reformatted = serde_json::to_string_pretty(&parsed).unwrap();
    for req in [webhook(&reformatted, &signature), webhook(CAPTURED, "deadbeef"), webhook(CAPTURED, "")] {
        let (status, body) = call_with_store(MockOrderStore::new(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, r#"{"status":"invalid signature"}"#);
    }
    let req = TestRequest::post().uri("/webhook/razorpay").set_payload(CAPTURED);
    let (status, _) = call_with_store(MockOrderStore::new(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn signed_events_that_are_not_payments_are_acknowledged() {
    let refund = r#"{"event":"refund.created","payload":{"refund":{"entity":{"id":"rfnd_1"}}}}"#;
    let (status, body) = call_with_store(MockOrderStore::new(), webhook(refund, &webhook_signature(refund))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":"ok"}"#);

    let garbage = "definitely not json";
    let (status, _) = call_with_store(MockOrderStore::new(), webhook(garbage, &webhook_signature(garbage))).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn unmatched_payments_are_acknowledged() {
    let mut store = MockOrderStore::new();
    store
        .expect_confirm_paid()
        .withf(|c, create| {
            c.razorpay_payment_id.as_str() == "pay_123" &&
                c.razorpay_order_id == Some(GatewayOrderId::new("order_abc")) &&
                create.is_none()
        })
        .times(1)
        .returning(|_, _| Ok(ConfirmationResult::Unmatched));
    let (status, body) = call_with_store(store, webhook(CAPTURED, &webhook_signature(CAPTURED))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":"ok"}"#);
}

#[actix_web::test]
async fn store_failures_ask_for_redelivery() {
    let mut store = MockOrderStore::new();
    store.expect_confirm_paid().times(1).returning(|_, _| Err(OrderStoreError::Timeout(5000)));
    let (status, body) = call_with_store(store, webhook(CAPTURED, &webhook_signature(CAPTURED))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.starts_with(r#"{"error":"#), "{body}");
}
