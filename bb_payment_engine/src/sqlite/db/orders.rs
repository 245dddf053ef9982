use bb_common::Paise;
use chrono::Utc;
use log::{debug, trace, warn};
use sqlx::{sqlite::SqliteRow, FromRow, Row, SqliteConnection};

use crate::{
    db_types::{
        ConfirmationResult,
        GatewayOrderId,
        GatewayPaymentId,
        NewOrder,
        Order,
        OrderStatusType,
        PaymentConfirmation,
    },
    traits::OrderStoreError,
};

impl FromRow<'_, SqliteRow> for Order {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let product_list: String = row.try_get("product_list")?;
        let product_list = serde_json::from_str::<Vec<String>>(&product_list)
            .map_err(|e| sqlx::Error::ColumnDecode { index: "product_list".into(), source: Box::new(e) })?;
        Ok(Order {
            id: row.try_get("id")?,
            razorpay_order_id: row.try_get::<Option<String>, _>("razorpay_order_id")?.map(GatewayOrderId::from),
            razorpay_payment_id: row.try_get::<Option<String>, _>("razorpay_payment_id")?.map(GatewayPaymentId::from),
            user_email: row.try_get("user_email")?,
            product_list,
            total_amount: row.try_get::<Paise, _>("total_amount")?,
            address: row.try_get("address")?,
            status: OrderStatusType::from(row.try_get::<String, _>("status")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Inserts a new order into the database using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
///
/// If the order carries a payment id that another order already holds, nothing is inserted and `None` is returned.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Option<Order>, OrderStoreError> {
    order.validate().map_err(|e| OrderStoreError::CorruptRecord(e.to_string()))?;
    let product_list =
        serde_json::to_string(&order.product_list).map_err(|e| OrderStoreError::CorruptRecord(e.to_string()))?;
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                razorpay_order_id,
                razorpay_payment_id,
                user_email,
                product_list,
                total_amount,
                address,
                status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            ON CONFLICT (razorpay_payment_id) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(order.razorpay_order_id.map(|id| id.0))
    .bind(order.razorpay_payment_id.map(|id| id.0))
    .bind(order.user_email)
    .bind(product_list)
    .bind(order.total_amount)
    .bind(order.address)
    .bind(order.status.to_string())
    .bind(order.created_at)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Inserts the order into the database, returning `false` in the second parameter if an order holding the same payment
/// id already exists. In that case, the existing order is returned.
pub async fn idempotent_insert(
    order: NewOrder,
    conn: &mut SqliteConnection,
) -> Result<(Order, bool), OrderStoreError> {
    let payment_id = order.razorpay_payment_id.clone();
    if let Some(order) = insert_order(order, conn).await? {
        debug!("📝️ Order #{} inserted", order.id);
        return Ok((order, true));
    }
    let Some(pid) = payment_id else {
        return Err(OrderStoreError::DatabaseError("Order insert returned no rows".into()));
    };
    match fetch_order_by_payment_id(&pid, conn).await? {
        Some(existing) => {
            debug!("📝️ Payment {pid} is already held by order #{}. Nothing inserted", existing.id);
            Ok((existing, false))
        },
        None => Err(OrderStoreError::PaymentAlreadyExists(pid.to_string())),
    }
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

/// Returns the order holding the given payment id. There can be at most one.
pub async fn fetch_order_by_payment_id(
    payment_id: &GatewayPaymentId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE razorpay_payment_id = $1")
        .bind(payment_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Fetches every order, newest first.
pub async fn fetch_orders(conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders: Vec<Order> = sqlx::query_as("SELECT * FROM orders ORDER BY created_at DESC, id DESC").fetch_all(conn).await?;
    trace!("Result of fetch_orders: {:?}", orders.len());
    Ok(orders)
}

/// Moves the `Processing` order holding the payment id to `Paid`. The gateway order id is filled in if the order did
/// not have one yet.
pub async fn mark_paid_by_payment_id(
    confirmation: &PaymentConfirmation,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
        UPDATE orders SET
            status = $1,
            razorpay_order_id = COALESCE(razorpay_order_id, $2),
            updated_at = $3
        WHERE razorpay_payment_id = $4 AND status = $5
        RETURNING *
        "#,
    )
    .bind(OrderStatusType::Paid.to_string())
    .bind(confirmation.razorpay_order_id.as_ref().map(|id| id.as_str()))
    .bind(Utc::now())
    .bind(confirmation.razorpay_payment_id.as_str())
    .bind(OrderStatusType::Processing.to_string())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Attaches the payment to the newest `Processing` order for the gateway order that does not hold a payment yet, and
/// moves it to `Paid`.
pub async fn attach_payment_to_gateway_order(
    order_id: &GatewayOrderId,
    payment_id: &GatewayPaymentId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
        UPDATE orders SET
            status = $1,
            razorpay_payment_id = $2,
            updated_at = $3
        WHERE id = (
            SELECT id FROM orders
            WHERE razorpay_order_id = $4 AND razorpay_payment_id IS NULL AND status = $5
            ORDER BY created_at DESC, id DESC
            LIMIT 1
        )
        RETURNING *
        "#,
    )
    .bind(OrderStatusType::Paid.to_string())
    .bind(payment_id.as_str())
    .bind(Utc::now())
    .bind(order_id.as_str())
    .bind(OrderStatusType::Processing.to_string())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Reconciles a verified payment. See [`crate::traits::OrderManagement::confirm_paid`] for the rules. Call this inside
/// a transaction.
pub async fn confirm_paid(
    confirmation: &PaymentConfirmation,
    create: Option<NewOrder>,
    conn: &mut SqliteConnection,
) -> Result<ConfirmationResult, OrderStoreError> {
    if let Some(order) = mark_paid_by_payment_id(confirmation, conn).await? {
        debug!("📝️ Order #{} held payment {confirmation} and is now Paid", order.id);
        return Ok(ConfirmationResult::MarkedPaid(order));
    }
    if let Some(order) = fetch_order_by_payment_id(&confirmation.razorpay_payment_id, conn).await? {
        debug!("📝️ Payment {confirmation} was already applied to order #{} ({})", order.id, order.status);
        return Ok(ConfirmationResult::AlreadySettled(order));
    }
    if let Some(oid) = &confirmation.razorpay_order_id {
        if let Some(order) = attach_payment_to_gateway_order(oid, &confirmation.razorpay_payment_id, conn).await? {
            debug!("📝️ Payment {confirmation} attached to order #{}, which is now Paid", order.id);
            return Ok(ConfirmationResult::MarkedPaid(order));
        }
    }
    let Some(new_order) = create else {
        debug!("📝️ No order matches payment {confirmation}, and no order details were supplied");
        return Ok(ConfirmationResult::Unmatched);
    };
    let new_order = new_order.paid_with(confirmation);
    match insert_order(new_order, conn).await? {
        Some(order) => {
            debug!("📝️ Order #{} created for payment {confirmation}", order.id);
            Ok(ConfirmationResult::Created(order))
        },
        None => {
            warn!("📝️ Payment {confirmation} was attached to another order while this one was being created");
            fetch_order_by_payment_id(&confirmation.razorpay_payment_id, conn)
                .await?
                .map(ConfirmationResult::AlreadySettled)
                .ok_or_else(|| OrderStoreError::PaymentAlreadyExists(confirmation.razorpay_payment_id.to_string()))
        },
    }
}

/// Sets the order status unconditionally, returning the updated order and its previous status. Call this inside a
/// transaction.
pub(crate) async fn update_order_status(
    id: i64,
    status: &OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<(Order, OrderStatusType), OrderStoreError> {
    let old_status = fetch_order_by_id(id, conn).await?.ok_or(OrderStoreError::OrderIdNotFound(id))?.status;
    let order: Order = sqlx::query_as("UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 RETURNING *")
        .bind(status.to_string())
        .bind(Utc::now())
        .bind(id)
        .fetch_one(conn)
        .await?;
    Ok((order, old_status))
}
