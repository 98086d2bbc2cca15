//! End-to-end tests of `OrderService` over PostgreSQL.
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p domain --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;
use std::time::Duration;

use common::{CategoryId, DiscountId, Money, ProductId, UserId};
use domain::{AddItem, ConfirmPayment, OrderError, OrderService, OrderState, UpdateItem};
use serial_test::serial;
use sqlx::PgPool;
use store::{CatalogReader, OrderStore, PaymentStatus, PostgresStore, Store};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresStore::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a service over a fresh pool and cleared tables
async fn get_test_service() -> Arc<OrderService<PostgresStore>> {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query(
        "TRUNCATE TABLE order_items, orders, payments, products, discounts, categories CASCADE",
    )
    .execute(&pool)
    .await
    .unwrap();

    Arc::new(OrderService::new(PostgresStore::new(pool)))
}

async fn seed_product(
    service: &OrderService<PostgresStore>,
    price_cents: i64,
    quantity: i32,
    discount_percent: Option<f64>,
) -> ProductId {
    let pool = service.store().pool();

    let category_id = CategoryId::new();
    sqlx::query("INSERT INTO categories (id, name) VALUES ($1, $2)")
        .bind(category_id.as_uuid())
        .bind(format!("category-{category_id}"))
        .execute(pool)
        .await
        .unwrap();

    let discount_id = match discount_percent {
        Some(percent) => {
            let id = DiscountId::new();
            sqlx::query(
                "INSERT INTO discounts (id, name, discount_percent, active) VALUES ($1, $2, $3, TRUE)",
            )
            .bind(id.as_uuid())
            .bind(format!("discount-{id}"))
            .bind(percent)
            .execute(pool)
            .await
            .unwrap();
            Some(id.as_uuid())
        }
        None => None,
    };

    let product_id = ProductId::new();
    sqlx::query(
        r#"
        INSERT INTO products (id, name, price_cents, quantity, category_id, discount_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(product_id.as_uuid())
    .bind(format!("product-{product_id}"))
    .bind(price_cents)
    .bind(quantity)
    .bind(category_id.as_uuid())
    .bind(discount_id)
    .execute(pool)
    .await
    .unwrap();

    product_id
}

async fn stock(service: &OrderService<PostgresStore>, product_id: ProductId) -> u32 {
    let mut tx = service.store().begin().await.unwrap();
    tx.get_product(product_id).await.unwrap().quantity
}

async fn order_count(service: &OrderService<PostgresStore>) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(service.store().pool())
        .await
        .unwrap()
}

#[tokio::test]
#[serial]
async fn checkout_scenario() {
    let service = get_test_service().await;
    let product_id = seed_product(&service, 10_000, 10, Some(0.10)).await;
    let user_id = UserId::new();

    let order = service
        .add_item(AddItem::new(user_id, product_id, 3))
        .await
        .unwrap();
    assert_eq!(order.total, Money::from_dollars(270));
    assert_eq!(stock(&service, product_id).await, 7);

    let order = service
        .update_item(UpdateItem::new(user_id, order.items[0].id, 5))
        .await
        .unwrap();
    assert_eq!(order.total, Money::from_dollars(450));
    assert_eq!(stock(&service, product_id).await, 5);

    let err = service
        .confirm_payment(ConfirmPayment::new(
            user_id,
            order.payment.id,
            Money::from_dollars(400),
            "Jane",
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "insufficient_payment");

    let paid = service
        .confirm_payment(ConfirmPayment::new(
            user_id,
            order.payment.id,
            Money::from_dollars(450),
            "Jane",
        ))
        .await
        .unwrap();
    assert_eq!(paid.payment.status, PaymentStatus::Paid);
    assert_eq!(paid.payment.name, "Jane");
    assert_eq!(OrderState::of(&paid), OrderState::Closed);

    let err = service
        .confirm_payment(ConfirmPayment::new(
            user_id,
            order.payment.id,
            Money::from_dollars(450),
            "Jane",
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "order_already_paid");

    let history = service.order_history(user_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, order.id);
    assert!(service.current_order(user_id).await.is_err());
}

#[tokio::test]
#[serial]
async fn another_users_payment_is_not_found() {
    let service = get_test_service().await;
    let product_id = seed_product(&service, 10_000, 10, None).await;
    let owner = UserId::new();
    let order = service
        .add_item(AddItem::new(owner, product_id, 1))
        .await
        .unwrap();

    let err = service
        .confirm_payment(ConfirmPayment::new(
            UserId::new(),
            order.payment.id,
            Money::from_dollars(100),
            "Mallory",
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::NotFound { entity: "Payment", .. }));
    let current = service.get_order(order.id).await.unwrap();
    assert_eq!(current.payment.status, PaymentStatus::Unpaid);
    assert_eq!(current.payment.name, "CASH");
}

#[tokio::test]
#[serial]
async fn out_of_range_line_total_rolls_back() {
    let service = get_test_service().await;
    let product_id = seed_product(&service, i64::MAX / 2, 10, None).await;

    let err = service
        .add_item(AddItem::new(UserId::new(), product_id, 3))
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::Validation(_)));
    assert_eq!(stock(&service, product_id).await, 10);
    assert_eq!(order_count(&service).await, 0);
}

#[tokio::test]
#[serial]
async fn reading_an_order_does_not_wait_for_row_locks() {
    let service = get_test_service().await;
    let product_id = seed_product(&service, 1_000, 10, None).await;
    let user_id = UserId::new();
    let order = service
        .add_item(AddItem::new(user_id, product_id, 2))
        .await
        .unwrap();

    let mut holder = service.store().begin().await.unwrap();
    holder.get_order(order.id).await.unwrap();

    let read = tokio::time::timeout(Duration::from_secs(5), service.get_order(order.id))
        .await
        .expect("read blocked behind a row lock")
        .unwrap();
    assert_eq!(read.total, order.total);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn concurrent_first_adds_share_one_order() {
    let service = get_test_service().await;
    let mut products = Vec::new();
    for _ in 0..8 {
        products.push(seed_product(&service, 100, 10, None).await);
    }
    let user_id = UserId::new();

    let handles: Vec<_> = products
        .into_iter()
        .map(|product_id| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .add_item(AddItem::new(user_id, product_id, 1))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(order_count(&service).await, 1);
    let order = service.current_order(user_id).await.unwrap();
    assert_eq!(order.items.len(), 8);
    assert_eq!(order.total, Money::from_dollars(8));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn concurrent_adds_never_oversell() {
    let service = get_test_service().await;
    let product_id = seed_product(&service, 100, 5, None).await;

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .add_item(AddItem::new(UserId::new(), product_id, 1))
                    .await
            })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(err) => assert_eq!(err.kind(), "insufficient_stock"),
        }
    }

    assert_eq!(succeeded, 5);
    assert_eq!(stock(&service, product_id).await, 0);
    assert_eq!(order_count(&service).await, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn concurrent_updates_keep_stock_and_total_consistent() {
    let service = get_test_service().await;
    let product_id = seed_product(&service, 250, 20, None).await;
    let user_id = UserId::new();
    let order = service
        .add_item(AddItem::new(user_id, product_id, 1))
        .await
        .unwrap();
    let item_id = order.items[0].id;

    let handles: Vec<_> = (1..=10)
        .map(|quantity| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .update_item(UpdateItem::new(user_id, item_id, quantity))
                    .await
            })
        })
        .collect();
    for handle in handles {
        if let Err(err) = handle.await.unwrap() {
            assert_eq!(err.kind(), "no_change");
        }
    }

    let order = service.get_order(order.id).await.unwrap();
    let item = &order.items[0];
    assert_eq!(stock(&service, product_id).await + item.quantity, 20);
    assert_eq!(order.total, item.price);
    assert_eq!(
        item.price,
        Money::from_cents(250 * i64::from(item.quantity))
    );
}
