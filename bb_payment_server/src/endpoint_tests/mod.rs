mod helpers;
mod mocks;

mod checkout;
mod orders;
mod webhook;

mod misc {
    use actix_web::{body::MessageBody, test, test::TestRequest, App};

    use crate::routes::{health, index};

    #[actix_web::test]
    async fn health_endpoint() {
        let app = test::init_service(App::new().service(health).service(index)).await;
        let req = TestRequest::get().uri("/health").to_request();
        let (_req, res) = test::call_service(&app, req).await.into_parts();
        let status = res.status();
        let body = res.into_body().try_into_bytes().unwrap();
        assert!(status.is_success());
        assert_eq!(body, "👍️\n");

        let req = TestRequest::get().uri("/").to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "BharatBartan backend is running");
    }
}
