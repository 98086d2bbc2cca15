use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{DiscountId, Money, OrderId, OrderItemId, PaymentId, ProductId, UserId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    Discount, Order, OrderItem, Payment, PaymentStatus, Product, Result, StoreError,
    store::{CatalogReader, InventoryAdjuster, OrderStore, PaymentStore, Store, Transaction},
};

#[derive(Debug, Clone)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    payment_id: PaymentId,
    total: Money,
    created_at: DateTime<Utc>,
    seq: u64,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    products: HashMap<ProductId, Product>,
    discounts: HashMap<DiscountId, Discount>,
    payments: HashMap<PaymentId, Payment>,
    orders: Vec<OrderRow>,
    items: Vec<OrderItem>,
    next_seq: u64,
}

impl Tables {
    fn assemble(&self, row: &OrderRow) -> Result<Order> {
        let payment = self.payments.get(&row.payment_id).cloned().ok_or_else(|| {
            StoreError::DataIntegrity(format!("order {} has no payment row", row.id))
        })?;

        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            items: self
                .items
                .iter()
                .filter(|item| item.order_id == row.id)
                .cloned()
                .collect(),
            total: row.total,
            payment,
            created_at: row.created_at,
        })
    }

    fn order_row(&self, id: OrderId) -> Result<&OrderRow> {
        self.orders
            .iter()
            .find(|row| row.id == id)
            .ok_or_else(|| StoreError::not_found("Order", id))
    }

    fn product_mut(&mut self, id: ProductId) -> Result<&mut Product> {
        self.products
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Product", id))
    }
}

/// In-memory store for testing.
///
/// Transactions take an exclusive lock on the whole store and work on a
/// private copy of the tables, which replaces the shared tables on commit.
/// Dropping a transaction discards its copy.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    injected_conflicts: Arc<AtomicU32>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a catalog product.
    pub async fn put_product(&self, product: Product) {
        self.tables.lock().await.products.insert(product.id, product);
    }

    /// Adds or replaces a catalog discount.
    pub async fn put_discount(&self, discount: Discount) {
        self.tables
            .lock()
            .await
            .discounts
            .insert(discount.id, discount);
    }

    /// Returns the committed state of a product.
    pub async fn product(&self, id: ProductId) -> Option<Product> {
        self.tables.lock().await.products.get(&id).cloned()
    }

    /// Returns the committed state of an order.
    pub async fn order(&self, id: OrderId) -> Option<Order> {
        let tables = self.tables.lock().await;
        let row = tables.order_row(id).ok()?;
        tables.assemble(row).ok()
    }

    /// Returns the number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.tables.lock().await.orders.len()
    }

    /// Makes the next `count` commits fail with a serialization conflict.
    pub fn inject_conflicts(&self, count: u32) {
        self.injected_conflicts.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> Result<Self::Tx> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();

        Ok(InMemoryTransaction {
            guard,
            working,
            injected_conflicts: self.injected_conflicts.clone(),
        })
    }
}

/// A transaction on an [`InMemoryStore`].
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    injected_conflicts: Arc<AtomicU32>,
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn commit(self) -> Result<()> {
        let conflicted = self
            .injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if conflicted {
            return Err(StoreError::Conflict(
                "could not serialize access due to concurrent update".to_string(),
            ));
        }

        let mut guard = self.guard;
        *guard = self.working;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl CatalogReader for InMemoryTransaction {
    async fn get_product(&mut self, id: ProductId) -> Result<Product> {
        self.working
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Product", id))
    }

    async fn get_discount(&mut self, id: DiscountId) -> Result<Discount> {
        self.working
            .discounts
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Discount", id))
    }
}

#[async_trait]
impl InventoryAdjuster for InMemoryTransaction {
    async fn reserve(&mut self, product_id: ProductId, quantity: u32) -> Result<u32> {
        let product = self.working.product_mut(product_id)?;

        let Some(remaining) = product.quantity.checked_sub(quantity) else {
            return Err(StoreError::InsufficientStock {
                product_id,
                requested: quantity,
                available: product.quantity,
            });
        };

        product.quantity = remaining;
        Ok(remaining)
    }

    async fn release(&mut self, product_id: ProductId, quantity: u32) -> Result<u32> {
        let product = self.working.product_mut(product_id)?;

        product.quantity = product.quantity.checked_add(quantity).ok_or_else(|| {
            StoreError::DataIntegrity(format!("stock of product {product_id} overflows"))
        })?;
        Ok(product.quantity)
    }
}

#[async_trait]
impl OrderStore for InMemoryTransaction {
    async fn lock_user(&mut self, _user_id: UserId) -> Result<()> {
        // The whole store is already held exclusively.
        Ok(())
    }

    async fn find_open_order(&mut self, user_id: UserId) -> Result<Option<Order>> {
        let tables = &self.working;
        let row = tables.orders.iter().find(|row| {
            row.user_id == user_id
                && tables
                    .payments
                    .get(&row.payment_id)
                    .is_some_and(|p| p.status == PaymentStatus::Unpaid)
        });

        row.map(|row| tables.assemble(row)).transpose()
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        let tables = &mut self.working;
        if tables.orders.iter().any(|row| row.id == order.id)
            || tables.payments.contains_key(&order.payment.id)
        {
            return Err(StoreError::DataIntegrity(format!(
                "order {} already exists",
                order.id
            )));
        }

        tables.next_seq += 1;
        tables
            .payments
            .insert(order.payment.id, order.payment.clone());
        tables.orders.push(OrderRow {
            id: order.id,
            user_id: order.user_id,
            payment_id: order.payment.id,
            total: order.total,
            created_at: order.created_at,
            seq: tables.next_seq,
        });
        Ok(())
    }

    async fn get_order(&mut self, id: OrderId) -> Result<Order> {
        let row = self.working.order_row(id)?;
        self.working.assemble(row)
    }

    async fn read_order(&mut self, id: OrderId) -> Result<Order> {
        self.get_order(id).await
    }

    async fn get_order_by_item(&mut self, item_id: OrderItemId) -> Result<Order> {
        let order_id = self
            .working
            .items
            .iter()
            .find(|item| item.id == item_id)
            .map(|item| item.order_id)
            .ok_or_else(|| StoreError::not_found("Order item", item_id))?;

        self.get_order(order_id).await
    }

    async fn list_orders(&mut self, user_id: UserId, status: PaymentStatus) -> Result<Vec<Order>> {
        let tables = &self.working;
        let mut rows: Vec<&OrderRow> = tables
            .orders
            .iter()
            .filter(|row| {
                row.user_id == user_id
                    && tables
                        .payments
                        .get(&row.payment_id)
                        .is_some_and(|p| p.status == status)
            })
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.seq.cmp(&a.seq)));

        rows.into_iter().map(|row| tables.assemble(row)).collect()
    }

    async fn insert_item(&mut self, item: &OrderItem) -> Result<()> {
        let tables = &mut self.working;
        tables.order_row(item.order_id)?;
        if !tables.products.contains_key(&item.product_id) {
            return Err(StoreError::not_found("Product", item.product_id));
        }
        if item.quantity == 0 {
            return Err(StoreError::DataIntegrity(
                "line item quantity must be at least 1".to_string(),
            ));
        }
        if tables
            .items
            .iter()
            .any(|existing| existing.order_id == item.order_id && existing.product_id == item.product_id)
        {
            return Err(StoreError::Conflict(format!(
                "product {} is already in order {}",
                item.product_id, item.order_id
            )));
        }

        tables.items.push(item.clone());
        Ok(())
    }

    async fn update_item(&mut self, item: &OrderItem) -> Result<()> {
        if item.quantity == 0 {
            return Err(StoreError::DataIntegrity(
                "line item quantity must be at least 1".to_string(),
            ));
        }
        let existing = self
            .working
            .items
            .iter_mut()
            .find(|existing| existing.id == item.id)
            .ok_or_else(|| StoreError::not_found("Order item", item.id))?;

        existing.quantity = item.quantity;
        existing.price = item.price;
        Ok(())
    }

    async fn delete_item(&mut self, item_id: OrderItemId) -> Result<()> {
        let items = &mut self.working.items;
        let before = items.len();
        items.retain(|item| item.id != item_id);

        if items.len() == before {
            return Err(StoreError::not_found("Order item", item_id));
        }
        Ok(())
    }

    async fn update_total(&mut self, order_id: OrderId, total: Money) -> Result<()> {
        let row = self
            .working
            .orders
            .iter_mut()
            .find(|row| row.id == order_id)
            .ok_or_else(|| StoreError::not_found("Order", order_id))?;

        row.total = total;
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for InMemoryTransaction {
    async fn get_order_by_payment(&mut self, payment_id: PaymentId) -> Result<Order> {
        let row = self
            .working
            .orders
            .iter()
            .find(|row| row.payment_id == payment_id)
            .ok_or_else(|| StoreError::not_found("Payment", payment_id))?;

        self.working.assemble(row)
    }

    async fn settle_payment(
        &mut self,
        payment_id: PaymentId,
        amount: Money,
        name: &str,
    ) -> Result<()> {
        let payment = self
            .working
            .payments
            .get_mut(&payment_id)
            .ok_or_else(|| StoreError::not_found("Payment", payment_id))?;

        if payment.status == PaymentStatus::Paid {
            return Err(StoreError::Conflict(format!(
                "payment {payment_id} was settled concurrently"
            )));
        }

        payment.amount = amount;
        payment.name = name.to_string();
        payment.status = PaymentStatus::Paid;
        Ok(())
    }
}
