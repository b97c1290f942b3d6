use crate::error::OrderingError;
use crate::model::{AccountId, Cart, CustomerDetails, Order, OrderId, OrderStatus};
use crate::storage::{NewOrder, OrderStore, RemoteCartStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

/// SQLite-backed implementation of the account cart record and the order
/// book, including the atomic order-number allocator.
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub async fn new(database_url: &str) -> Result<Self, OrderingError> {
        let pool = SqlitePool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub async fn initialize_schema(&self) -> Result<(), OrderingError> {
        let init_sql = include_str!("../resources/init.sql");
        sqlx::raw_sql(init_sql).execute(&self.pool).await?;
        Ok(())
    }

    fn row_to_order(row: &SqliteRow) -> Result<Order, OrderingError> {
        let items: Vec<_> = serde_json::from_str(row.try_get("items")?)?;
        let customer_details: CustomerDetails =
            serde_json::from_str(row.try_get("customer_details")?)?;
        let total: Decimal = row
            .try_get::<&str, _>("total")?
            .parse()
            .map_err(|e: rust_decimal::Error| OrderingError::Storage(Box::new(e)))?;
        let created_at = DateTime::parse_from_rfc3339(row.try_get("created_at")?)
            .map_err(|e| OrderingError::Storage(Box::new(e)))?
            .with_timezone(&Utc);

        Ok(Order {
            id: row.try_get("id")?,
            order_number: row.try_get::<String, _>("order_number")?,
            items,
            total,
            status: OrderStatus::parse(row.try_get("status")?),
            customer_details,
            created_at,
        })
    }
}

#[async_trait]
impl RemoteCartStore for SqliteStorage {
    async fn fetch(&self, account_id: AccountId) -> Result<Cart, OrderingError> {
        let stored: Option<String> =
            sqlx::query_scalar("SELECT items FROM carts WHERE account_id = ?")
                .bind(account_id)
                .fetch_optional(&self.pool)
                .await?;

        match stored {
            Some(json) => Ok(Cart {
                items: serde_json::from_str(&json)?,
            }),
            None => {
                // Get-or-create: first access materializes an empty cart.
                debug!(account_id, "creating empty cart on first access");
                sqlx::query(
                    "INSERT OR IGNORE INTO carts (account_id, items, updated_at) VALUES (?, '[]', ?)",
                )
                .bind(account_id)
                .bind(Utc::now().to_rfc3339())
                .execute(&self.pool)
                .await?;
                Ok(Cart::new())
            }
        }
    }

    async fn replace(&self, account_id: AccountId, cart: &Cart) -> Result<Cart, OrderingError> {
        // Whole-object upsert, last-writer-wins (see the trait contract).
        let items = serde_json::to_string(&cart.items)?;
        sqlx::query(
            "INSERT INTO carts (account_id, items, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(account_id) DO UPDATE SET items = excluded.items, updated_at = excluded.updated_at",
        )
        .bind(account_id)
        .bind(&items)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(account_id, items = cart.items.len(), "replaced cart");
        Ok(cart.clone())
    }
}

#[async_trait]
impl OrderStore for SqliteStorage {
    async fn insert(
        &self,
        account_id: AccountId,
        order: &NewOrder,
    ) -> Result<Order, OrderingError> {
        let mut tx = self.pool.begin().await?;

        // Atomic allocator: bumping the single-row sequence inside the
        // insert transaction means concurrent checkouts can never observe
        // the same value, unlike a count-then-increment scheme.
        let seq: i64 =
            sqlx::query_scalar("UPDATE order_sequence SET value = value + 1 RETURNING value")
                .fetch_one(&mut *tx)
                .await?;
        let order_number = format!("ORD{:06}", seq);

        let created_at = Utc::now();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO orders \
             (account_id, order_number, items, total, status, customer_details, checkout_token, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(account_id)
        .bind(&order_number)
        .bind(serde_json::to_string(&order.items)?)
        .bind(order.total.to_string())
        .bind(OrderStatus::Received.as_str())
        .bind(serde_json::to_string(&order.customer_details)?)
        .bind(&order.checkout_token)
        .bind(created_at.to_rfc3339())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(account_id, %order_number, "persisted order");

        Ok(Order {
            id,
            order_number,
            items: order.items.clone(),
            total: order.total,
            status: OrderStatus::Received,
            customer_details: order.customer_details.clone(),
            created_at,
        })
    }

    async fn list(&self, account_id: AccountId) -> Result<Vec<Order>, OrderingError> {
        let rows = sqlx::query("SELECT * FROM orders WHERE account_id = ? ORDER BY id DESC")
            .bind(account_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_order).collect()
    }

    async fn get(
        &self,
        account_id: AccountId,
        order_id: OrderId,
    ) -> Result<Option<Order>, OrderingError> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = ? AND account_id = ?")
            .bind(order_id)
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_order).transpose()
    }

    async fn find_by_checkout_token(
        &self,
        account_id: AccountId,
        token: &str,
    ) -> Result<Option<Order>, OrderingError> {
        let row = sqlx::query("SELECT * FROM orders WHERE account_id = ? AND checkout_token = ?")
            .bind(account_id)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_order).transpose()
    }

    async fn set_status(
        &self,
        order_id: OrderId,
        status: &OrderStatus,
    ) -> Result<(), OrderingError> {
        sqlx::query("UPDATE orders SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(order_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
