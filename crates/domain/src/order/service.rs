//! Order service: one transaction per operation.

use std::time::Instant;

use common::{OrderId, UserId};
use store::{Order, OrderStore, PaymentStatus, Store};

use super::commands::{AddItem, ConfirmPayment, RemoveItem, UpdateItem};
use super::{protocol, settlement};
use crate::error::OrderError;
use crate::transaction::{finish, with_conflict_retry};

/// Service for mutating and reading orders.
///
/// Every mutation runs in its own transaction, committed on success and
/// rolled back on any error, and is retried once on a serialization
/// conflict. Dropping a returned future before it completes drops the
/// transaction with it, which rolls it back.
pub struct OrderService<S: Store> {
    store: S,
}

impl<S: Store> OrderService<S> {
    /// Creates a new order service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Adds a product to the user's open order.
    #[tracing::instrument(skip(self), fields(user_id = %cmd.user_id, product_id = %cmd.product_id))]
    pub async fn add_item(&self, cmd: AddItem) -> Result<Order, OrderError> {
        cmd.validate()?;
        let cmd = &cmd;

        let started = Instant::now();
        let result = with_conflict_retry("add_item", || self.add_item_once(cmd)).await;
        record("add_item", started, &result);

        if let Ok(order) = &result {
            metrics::counter!("orders_items_added_total").increment(1);
            tracing::info!(order_id = %order.id, total = %order.total, "item added");
        }
        result
    }

    /// Changes the quantity of a line item; zero removes it.
    #[tracing::instrument(skip(self), fields(user_id = %cmd.user_id, item_id = %cmd.item_id))]
    pub async fn update_item(&self, cmd: UpdateItem) -> Result<Order, OrderError> {
        cmd.validate()?;
        let cmd = &cmd;

        let started = Instant::now();
        let result = with_conflict_retry("update_item", || self.update_item_once(cmd)).await;
        record("update_item", started, &result);

        if let Ok(order) = &result {
            metrics::counter!("orders_items_updated_total").increment(1);
            tracing::info!(
                order_id = %order.id,
                new_quantity = cmd.new_quantity,
                total = %order.total,
                "item updated"
            );
        }
        result
    }

    /// Removes a line item, returning its stock to inventory.
    pub async fn remove_item(&self, cmd: RemoveItem) -> Result<Order, OrderError> {
        self.update_item(cmd.into()).await
    }

    /// Settles an order's payment.
    #[tracing::instrument(
        skip(self),
        fields(user_id = %cmd.user_id, payment_id = %cmd.payment_id, amount = %cmd.amount)
    )]
    pub async fn confirm_payment(&self, cmd: ConfirmPayment) -> Result<Order, OrderError> {
        cmd.validate()?;
        let cmd = &cmd;

        let started = Instant::now();
        let result =
            with_conflict_retry("confirm_payment", || self.confirm_payment_once(cmd)).await;
        record("confirm_payment", started, &result);

        if let Ok(order) = &result {
            metrics::counter!("orders_payments_confirmed_total").increment(1);
            tracing::info!(order_id = %order.id, "payment confirmed");
        }
        result
    }

    /// Loads an order by id.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, OrderError> {
        let mut tx = self.store.begin().await?;
        let result = tx.read_order(order_id).await.map_err(OrderError::from);
        finish(tx, result).await
    }

    /// Loads the user's open order.
    #[tracing::instrument(skip(self))]
    pub async fn current_order(&self, user_id: UserId) -> Result<Order, OrderError> {
        let mut tx = self.store.begin().await?;
        let result = match tx.find_open_order(user_id).await {
            Ok(Some(order)) => Ok(order),
            Ok(None) => Err(OrderError::not_found("Open order for user", user_id)),
            Err(e) => Err(e.into()),
        };
        finish(tx, result).await
    }

    /// Lists the user's paid orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn order_history(&self, user_id: UserId) -> Result<Vec<Order>, OrderError> {
        let mut tx = self.store.begin().await?;
        let result = tx
            .list_orders(user_id, PaymentStatus::Paid)
            .await
            .map_err(OrderError::from);
        finish(tx, result).await
    }

    async fn add_item_once(&self, cmd: &AddItem) -> Result<Order, OrderError> {
        let mut tx = self.store.begin().await?;
        let result = protocol::add_item(&mut tx, cmd).await;
        finish(tx, result).await
    }

    async fn update_item_once(&self, cmd: &UpdateItem) -> Result<Order, OrderError> {
        let mut tx = self.store.begin().await?;
        let result = protocol::update_item(&mut tx, cmd).await;
        finish(tx, result).await
    }

    async fn confirm_payment_once(&self, cmd: &ConfirmPayment) -> Result<Order, OrderError> {
        let mut tx = self.store.begin().await?;
        let result = settlement::confirm_payment(&mut tx, cmd).await;
        finish(tx, result).await
    }
}

fn record<T>(operation: &'static str, started: Instant, result: &Result<T, OrderError>) {
    metrics::histogram!("orders_transaction_duration_seconds", "operation" => operation)
        .record(started.elapsed().as_secs_f64());

    if let Err(e) = result {
        metrics::counter!(
            "orders_mutation_failures_total",
            "operation" => operation,
            "kind" => e.kind()
        )
        .increment(1);

        match e {
            OrderError::Store(_) => tracing::error!(operation, error = %e, "storage failure"),
            _ => tracing::debug!(operation, error = %e, "rejected"),
        }
    }
}
