//! `SqliteDatabase` is the SQLite implementation of the [`OrderManagement`] order store.
use std::{fmt::Debug, future::Future, sync::Arc, time::Duration};

use log::*;
use sqlx::{migrate, SqlitePool};
use tokio::sync::Mutex;

use super::db::{db_url, new_pool, orders};
use crate::{
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

/// How long a store operation may take (including the wait for a connection) before it fails.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
    op_timeout: Duration,
    // SQLite allows a single writer. Write transactions queue here instead of failing with SQLITE_BUSY.
    write_lock: Arc<Mutex<()>>,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl OrderManagement for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), OrderStoreError> {
        self.bounded(async {
            let _guard = self.write_lock.lock().await;
            let mut tx = self.pool.begin().await?;
            let result = orders::idempotent_insert(order, &mut tx).await?;
            tx.commit().await?;
            Ok(result)
        })
        .await
    }

    async fn confirm_paid(
        &self,
        confirmation: &PaymentConfirmation,
        create: Option<NewOrder>,
    ) -> Result<ConfirmationResult, OrderStoreError> {
        self.bounded(async {
            let _guard = self.write_lock.lock().await;
            let mut tx = self.pool.begin().await?;
            let result = orders::confirm_paid(confirmation, create, &mut tx).await?;
            tx.commit().await?;
            trace!("🗃️ Payment {confirmation} reconciled: {result}");
            Ok(result)
        })
        .await
    }

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, OrderStoreError> {
        self.bounded(async {
            let mut conn = self.pool.acquire().await?;
            let order = orders::fetch_order_by_id(id, &mut conn).await?;
            Ok(order)
        })
        .await
    }

    async fn fetch_order_by_payment_id(&self, payment_id: &GatewayPaymentId) -> Result<Option<Order>, OrderStoreError> {
        self.bounded(async {
            let mut conn = self.pool.acquire().await?;
            let order = orders::fetch_order_by_payment_id(payment_id, &mut conn).await?;
            Ok(order)
        })
        .await
    }

    async fn fetch_orders(&self) -> Result<Vec<Order>, OrderStoreError> {
        self.bounded(async {
            let mut conn = self.pool.acquire().await?;
            let orders = orders::fetch_orders(&mut conn).await?;
            Ok(orders)
        })
        .await
    }

    async fn update_order_status(
        &self,
        id: i64,
        status: &OrderStatusType,
    ) -> Result<(Order, OrderStatusType), OrderStoreError> {
        self.bounded(async {
            let _guard = self.write_lock.lock().await;
            let mut tx = self.pool.begin().await?;
            let (order, old_status) = orders::update_order_status(id, status, &mut tx).await?;
            tx.commit().await?;
            debug!("🗃️ Order #{id} status set from {old_status} to {status}");
            Ok((order, old_status))
        })
        .await
    }

    async fn close(&mut self) -> Result<(), OrderStoreError> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL in `BB_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections, DEFAULT_OPERATION_TIMEOUT).await?;
        let url = url.to_string();
        Ok(Self { url, pool, op_timeout: DEFAULT_OPERATION_TIMEOUT, write_lock: Arc::new(Mutex::new(())) })
    }

    /// Sets the upper bound on how long any single store operation may take.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Safe to call on every startup.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, OrderStoreError>
    where F: Future<Output = Result<T, OrderStoreError>> {
        match tokio::time::timeout(self.op_timeout, op).await {
            Ok(result) => result,
            Err(_) => {
                let ms = u64::try_from(self.op_timeout.as_millis()).unwrap_or(u64::MAX);
                warn!("🗃️ Database operation timed out after {ms}ms");
                Err(OrderStoreError::Timeout(ms))
            },
        }
    }
}
