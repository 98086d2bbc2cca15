use async_trait::async_trait;
use common::{DiscountId, DiscountRate, Money, OrderId, OrderItemId, PaymentId, ProductId, UserId};

use crate::{Discount, Order, OrderItem, PaymentStatus, Product, ProductPricing, Result, StoreError};

/// Read-only catalog lookups.
///
/// Implementations run inside the caller's transaction so the engine sees a
/// consistent snapshot of prices and discounts.
#[async_trait]
pub trait CatalogReader: Send {
    /// Retrieves a product by id.
    async fn get_product(&mut self, id: ProductId) -> Result<Product>;

    /// Retrieves a discount by id.
    async fn get_discount(&mut self, id: DiscountId) -> Result<Discount>;

    /// Retrieves the unit price, effective discount and stock of a product.
    ///
    /// A product without a discount, or whose discount is missing or
    /// inactive, is priced at the full unit price.
    async fn get_product_pricing(&mut self, id: ProductId) -> Result<ProductPricing> {
        let product = self.get_product(id).await?;

        let discount = match product.discount_id {
            Some(discount_id) => match self.get_discount(discount_id).await {
                Ok(discount) if discount.active => discount.rate,
                Ok(_) | Err(StoreError::NotFound { .. }) => DiscountRate::ZERO,
                Err(e) => return Err(e),
            },
            None => DiscountRate::ZERO,
        };

        Ok(ProductPricing {
            unit_price: product.price,
            discount,
            available_quantity: product.quantity,
        })
    }
}

/// Atomic stock adjustments.
#[async_trait]
pub trait InventoryAdjuster: Send {
    /// Decrements stock by `quantity` and returns the remaining count.
    ///
    /// The check and the decrement happen in one conditional update; fails
    /// with `InsufficientStock` and leaves stock untouched if fewer than
    /// `quantity` units are available.
    async fn reserve(&mut self, product_id: ProductId, quantity: u32) -> Result<u32>;

    /// Increments stock by `quantity` and returns the new count.
    async fn release(&mut self, product_id: ProductId, quantity: u32) -> Result<u32>;
}

/// Reads and writes of orders and their line items.
#[async_trait]
pub trait OrderStore: Send {
    /// Serialises order creation for a user until the transaction ends.
    async fn lock_user(&mut self, user_id: UserId) -> Result<()>;

    /// Finds the user's unpaid order and locks it for the transaction.
    async fn find_open_order(&mut self, user_id: UserId) -> Result<Option<Order>>;

    /// Inserts a new order together with its payment.
    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// Retrieves an order by id and locks it for the transaction.
    async fn get_order(&mut self, id: OrderId) -> Result<Order>;

    /// Retrieves an order by id without locking it.
    async fn read_order(&mut self, id: OrderId) -> Result<Order>;

    /// Retrieves the order owning a line item and locks it.
    async fn get_order_by_item(&mut self, item_id: OrderItemId) -> Result<Order>;

    /// Lists a user's orders in the given payment status, newest first.
    async fn list_orders(&mut self, user_id: UserId, status: PaymentStatus) -> Result<Vec<Order>>;

    /// Inserts a line item.
    async fn insert_item(&mut self, item: &OrderItem) -> Result<()>;

    /// Persists a line item's quantity and price.
    async fn update_item(&mut self, item: &OrderItem) -> Result<()>;

    /// Deletes a line item.
    async fn delete_item(&mut self, item_id: OrderItemId) -> Result<()>;

    /// Persists an order's total.
    async fn update_total(&mut self, order_id: OrderId, total: Money) -> Result<()>;
}

/// Reads and writes of payments.
#[async_trait]
pub trait PaymentStore: Send {
    /// Retrieves the order owning a payment and locks both rows.
    async fn get_order_by_payment(&mut self, payment_id: PaymentId) -> Result<Order>;

    /// Marks an unpaid payment as paid with the submitted amount and payer.
    async fn settle_payment(
        &mut self,
        payment_id: PaymentId,
        amount: Money,
        name: &str,
    ) -> Result<()>;
}

/// A unit of work spanning every capability the engine needs.
///
/// Dropping a transaction without committing it rolls it back.
#[async_trait]
pub trait Transaction:
    CatalogReader + InventoryAdjuster + OrderStore + PaymentStore + Send + Sized
{
    /// Makes every change of this transaction visible atomically.
    async fn commit(self) -> Result<()>;

    /// Discards every change of this transaction.
    async fn rollback(self) -> Result<()>;
}

/// Entry point to storage: hands out transactions.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    /// The transaction type of this store.
    type Tx: Transaction;

    /// Begins a new transaction.
    async fn begin(&self) -> Result<Self::Tx>;
}
