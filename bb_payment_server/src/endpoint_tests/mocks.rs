use bb_common::Paise;
use bb_payment_engine::{
    db_types::{
        ConfirmationResult,
        GatewayPaymentId,
        NewOrder,
        Order,
        OrderStatusType,
        PaymentConfirmation,
    },
    traits::{OrderManagement, OrderStoreError},
};
use mockall::mock;
use razorpay_tools::{RazorpayApiError, RazorpayOrder};

use crate::integrations::razorpay::PaymentGatewayClient;

mock! {
    pub OrderStore {}
    impl OrderManagement for OrderStore {
        fn url(&self) -> &str;
        async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), OrderStoreError>;
        async fn confirm_paid(&self, confirmation: &PaymentConfirmation, create: Option<NewOrder>) -> Result<ConfirmationResult, OrderStoreError>;
        async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, OrderStoreError>;
        async fn fetch_order_by_payment_id(&self, payment_id: &GatewayPaymentId) -> Result<Option<Order>, OrderStoreError>;
        async fn fetch_orders(&self) -> Result<Vec<Order>, OrderStoreError>;
        async fn update_order_status(&self, id: i64, status: &OrderStatusType) -> Result<(Order, OrderStatusType), OrderStoreError>;
    }
}

mock! {
    pub Gateway {}
    impl PaymentGatewayClient for Gateway {
        fn publishable_key(&self) -> String;
        async fn create_order(&self, amount: Paise, currency: &str, receipt: &str) -> Result<RazorpayOrder, RazorpayApiError>;
    }
}
