use std::time::Duration;

use actix_web::{
    dev::Server,
    error::JsonPayloadError,
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpRequest,
    HttpServer,
};
use bb_payment_engine::{
    events::EventProducers,
    helpers::SignatureVerifier,
    OrderFlowApi,
    PaymentVerificationApi,
    SqliteDatabase,
};
use log::*;
use razorpay_tools::RazorpayApi;

use crate::{
    auth::HmacTokenResolver,
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    middleware::BearerAuthFactory,
    notifications::{create_notification_event_handlers, LogMailer},
    routes::{
        health,
        index,
        CreateOrderRoute,
        GetRazorpayKeyRoute,
        OrderByIdRoute,
        OrdersRoute,
        RazorpayWebhookRoute,
        RecordOrderRoute,
        SaveOrderRoute,
        UpdateOrderStatusRoute,
        VerifyPaymentRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    if config.database_url.is_empty() {
        return Err(ServerError::ConfigurationError("BB_DATABASE_URL must be set".into()));
    }
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?
        .with_timeout(config.store_timeout);
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway = RazorpayApi::new(config.razorpay.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = create_notification_event_handlers(LogMailer, config.notifications);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, gateway, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: RazorpayApi,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let options = ServerOptions::from_config(&config);
    let address = (config.host.clone(), config.port);
    let payment_verifier = SignatureVerifier::new(config.razorpay.key_secret.clone());
    let webhook_verifier = SignatureVerifier::new(config.webhook_secret.clone());
    if !payment_verifier.is_configured() {
        warn!("🚀️ BB_RAZORPAY_KEY_SECRET is not set. Every payment will fail verification.");
    }
    if !webhook_verifier.is_configured() {
        warn!("🚀️ No webhook secret is configured. Every webhook will be rejected.");
    }
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let verification_api = PaymentVerificationApi::new(
            OrderFlowApi::new(db.clone(), producers.clone()),
            payment_verifier.clone(),
            webhook_verifier.clone(),
        );
        let api_scope = web::scope("/api")
            .service(GetRazorpayKeyRoute::<RazorpayApi>::new())
            .service(CreateOrderRoute::<RazorpayApi>::new())
            .service(VerifyPaymentRoute::<SqliteDatabase>::new())
            .service(RecordOrderRoute::<SqliteDatabase>::new())
            .service(SaveOrderRoute::<SqliteDatabase>::new())
            .service(OrdersRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new());
        let webhook_scope = web::scope("/webhook").service(RazorpayWebhookRoute::<SqliteDatabase>::new());
        App::new()
            .wrap(BearerAuthFactory::new(HmacTokenResolver::new(&config.auth)))
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("bb::access_log"))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::Data::new(options))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(verification_api))
            .app_data(web::Data::new(gateway.clone()))
            .service(health)
            .service(index)
            .service(api_scope)
            .service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind(address)?
    .run();
    Ok(srv)
}

/// Malformed JSON bodies get the same `{ "error": ... }` treatment as every other failure.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    debug!("💻️ Could not deserialize request body. {err}");
    ServerError::InvalidRequestBody(err.to_string()).into()
}
