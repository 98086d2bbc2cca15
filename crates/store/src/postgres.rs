use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    CategoryId, DiscountId, DiscountRate, Money, OrderId, OrderItemId, PaymentId, ProductId,
    UserId,
};
use sqlx::{PgPool, Postgres, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Discount, Order, OrderItem, Payment, PaymentStatus, Product, Result, StoreError,
    store::{CatalogReader, InventoryAdjuster, OrderStore, PaymentStore, Store, Transaction},
};

const ORDER_COLUMNS: &str = r#"
    SELECT o.id, o.user_id, o.total_cents, o.created_at,
           p.id AS payment_id, p.name AS payment_name, p.amount_cents, p.status
    FROM orders o
    JOIN payments p ON p.id = o.payment_id
"#;

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    type Tx = PostgresTransaction;

    async fn begin(&self) -> Result<Self::Tx> {
        let tx = self.pool.begin().await?;
        Ok(PostgresTransaction { tx })
    }
}

/// A transaction on a [`PostgresStore`].
///
/// Dropping it without committing rolls the database transaction back.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

fn to_quantity(value: i32, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| StoreError::DataIntegrity(format!("negative {what} quantity: {value}")))
}

fn row_to_product(row: &PgRow) -> Result<Product> {
    let price = Money::from_cents(row.try_get("price_cents")?);
    if price.is_negative() {
        return Err(StoreError::DataIntegrity(format!(
            "negative price {price} on product"
        )));
    }

    Ok(Product {
        id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price,
        quantity: to_quantity(row.try_get("quantity")?, "stock")?,
        category_id: CategoryId::from_uuid(row.try_get::<Uuid, _>("category_id")?),
        discount_id: row
            .try_get::<Option<Uuid>, _>("discount_id")?
            .map(DiscountId::from_uuid),
    })
}

fn row_to_discount(row: &PgRow) -> Result<Discount> {
    let percent: f64 = row.try_get("discount_percent")?;
    let rate = DiscountRate::from_fraction(percent)
        .map_err(|e| StoreError::DataIntegrity(e.to_string()))?;

    Ok(Discount {
        id: DiscountId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        rate,
        active: row.try_get("active")?,
    })
}

fn row_to_item(row: &PgRow) -> Result<OrderItem> {
    Ok(OrderItem {
        id: OrderItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        quantity: to_quantity(row.try_get("quantity")?, "line item")?,
        price: Money::from_cents(row.try_get("price_cents")?),
    })
}

fn row_to_order(row: &PgRow) -> Result<Order> {
    let status: String = row.try_get("status")?;
    let status = PaymentStatus::parse(&status)
        .ok_or_else(|| StoreError::DataIntegrity(format!("unknown payment status {status}")))?;

    Ok(Order {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        items: Vec::new(),
        total: Money::from_cents(row.try_get("total_cents")?),
        payment: Payment {
            id: PaymentId::from_uuid(row.try_get::<Uuid, _>("payment_id")?),
            name: row.try_get("payment_name")?,
            amount: Money::from_cents(row.try_get("amount_cents")?),
            status,
        },
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

impl PostgresTransaction {
    async fn load_items(&mut self, order: &mut Order) -> Result<()> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, quantity, price_cents
            FROM order_items
            WHERE order_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(order.id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        order.items = rows.iter().map(row_to_item).collect::<Result<_>>()?;
        Ok(())
    }

    /// Runs an order query with one bound UUID and loads the line items.
    ///
    /// With `lock` set the order and payment rows stay locked until the
    /// transaction ends.
    async fn fetch_order(
        &mut self,
        filter: &str,
        key: Uuid,
        lock: bool,
    ) -> Result<Option<Order>> {
        let suffix = if lock { " FOR UPDATE OF o, p" } else { "" };
        let sql = format!("{ORDER_COLUMNS} WHERE {filter} LIMIT 1{suffix}");
        let row = sqlx::query(&sql)
            .bind(key)
            .fetch_optional(&mut *self.tx)
            .await?;

        match row {
            Some(row) => {
                let mut order = row_to_order(&row)?;
                self.load_items(&mut order).await?;
                Ok(Some(order))
            }
            None => Ok(None),
        }
    }

    async fn stock_of(&mut self, product_id: ProductId) -> Result<Option<i32>> {
        let quantity: Option<i32> =
            sqlx::query_scalar("SELECT quantity FROM products WHERE id = $1")
                .bind(product_id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(quantity)
    }
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogReader for PostgresTransaction {
    async fn get_product(&mut self, id: ProductId) -> Result<Product> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, price_cents, quantity, category_id, discount_id
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| StoreError::not_found("Product", id))?;

        row_to_product(&row)
    }

    async fn get_discount(&mut self, id: DiscountId) -> Result<Discount> {
        let row = sqlx::query(
            r#"
            SELECT id, name, discount_percent, active
            FROM discounts
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| StoreError::not_found("Discount", id))?;

        row_to_discount(&row)
    }
}

#[async_trait]
impl InventoryAdjuster for PostgresTransaction {
    async fn reserve(&mut self, product_id: ProductId, quantity: u32) -> Result<u32> {
        let remaining: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET quantity = quantity - $2, updated_at = NOW()
            WHERE id = $1 AND quantity >= $2
            RETURNING quantity
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(i64::from(quantity))
        .fetch_optional(&mut *self.tx)
        .await?;

        match remaining {
            Some(remaining) => to_quantity(remaining, "stock"),
            None => match self.stock_of(product_id).await? {
                Some(available) => Err(StoreError::InsufficientStock {
                    product_id,
                    requested: quantity,
                    available: to_quantity(available, "stock")?,
                }),
                None => Err(StoreError::not_found("Product", product_id)),
            },
        }
    }

    async fn release(&mut self, product_id: ProductId, quantity: u32) -> Result<u32> {
        let quantity: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET quantity = quantity + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING quantity
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(i64::from(quantity))
        .fetch_optional(&mut *self.tx)
        .await?;

        let quantity = quantity.ok_or_else(|| StoreError::not_found("Product", product_id))?;
        to_quantity(quantity, "stock")
    }
}

#[async_trait]
impl OrderStore for PostgresTransaction {
    async fn lock_user(&mut self, user_id: UserId) -> Result<()> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(user_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn find_open_order(&mut self, user_id: UserId) -> Result<Option<Order>> {
        self.fetch_order(
            "o.user_id = $1 AND p.status = 'UNPAID' ORDER BY o.created_at ASC",
            user_id.as_uuid(),
            true,
        )
        .await
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, name, amount_cents, status)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(order.payment.id.as_uuid())
        .bind(&order.payment.name)
        .bind(order.payment.amount.cents())
        .bind(order.payment.status.as_str())
        .execute(&mut *self.tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, payment_id, total_cents, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.payment.id.as_uuid())
        .bind(order.total.cents())
        .bind(order.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn get_order(&mut self, id: OrderId) -> Result<Order> {
        self.fetch_order("o.id = $1", id.as_uuid(), true)
            .await?
            .ok_or_else(|| StoreError::not_found("Order", id))
    }

    async fn read_order(&mut self, id: OrderId) -> Result<Order> {
        self.fetch_order("o.id = $1", id.as_uuid(), false)
            .await?
            .ok_or_else(|| StoreError::not_found("Order", id))
    }

    async fn get_order_by_item(&mut self, item_id: OrderItemId) -> Result<Order> {
        let order_id: Option<Uuid> =
            sqlx::query_scalar("SELECT order_id FROM order_items WHERE id = $1")
                .bind(item_id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await?;

        let order_id = order_id.ok_or_else(|| StoreError::not_found("Order item", item_id))?;
        self.get_order(OrderId::from_uuid(order_id)).await
    }

    async fn list_orders(&mut self, user_id: UserId, status: PaymentStatus) -> Result<Vec<Order>> {
        let sql =
            format!("{ORDER_COLUMNS} WHERE o.user_id = $1 AND p.status = $2 ORDER BY o.created_at DESC");
        let rows = sqlx::query(&sql)
            .bind(user_id.as_uuid())
            .bind(status.as_str())
            .fetch_all(&mut *self.tx)
            .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut order = row_to_order(row)?;
            self.load_items(&mut order).await?;
            orders.push(order);
        }
        Ok(orders)
    }

    async fn insert_item(&mut self, item: &OrderItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_items (id, order_id, product_id, quantity, price_cents)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(item.order_id.as_uuid())
        .bind(item.product_id.as_uuid())
        .bind(i64::from(item.quantity))
        .bind(item.price.cents())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_item(&mut self, item: &OrderItem) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE order_items
            SET quantity = $2, price_cents = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(i64::from(item.quantity))
        .bind(item.price.cents())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Order item", item.id));
        }
        Ok(())
    }

    async fn delete_item(&mut self, item_id: OrderItemId) -> Result<()> {
        let result = sqlx::query("DELETE FROM order_items WHERE id = $1")
            .bind(item_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Order item", item_id));
        }
        Ok(())
    }

    async fn update_total(&mut self, order_id: OrderId, total: Money) -> Result<()> {
        let result =
            sqlx::query("UPDATE orders SET total_cents = $2, updated_at = NOW() WHERE id = $1")
                .bind(order_id.as_uuid())
                .bind(total.cents())
                .execute(&mut *self.tx)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Order", order_id));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for PostgresTransaction {
    async fn get_order_by_payment(&mut self, payment_id: PaymentId) -> Result<Order> {
        self.fetch_order("o.payment_id = $1", payment_id.as_uuid(), true)
            .await?
            .ok_or_else(|| StoreError::not_found("Payment", payment_id))
    }

    async fn settle_payment(
        &mut self,
        payment_id: PaymentId,
        amount: Money,
        name: &str,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET amount_cents = $2, name = $3, status = 'PAID', updated_at = NOW()
            WHERE id = $1 AND status = 'UNPAID'
            "#,
        )
        .bind(payment_id.as_uuid())
        .bind(amount.cents())
        .bind(name)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "payment {payment_id} was settled concurrently"
            )));
        }
        Ok(())
    }
}
