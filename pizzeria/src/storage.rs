use crate::error::OrderingError;
use crate::model::{AccountId, Cart, CartItem, CustomerDetails, Order, OrderId, OrderStatus};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Per-device persisted guest cart. No network or session dependency;
/// survives process restarts and is never shared across accounts.
#[async_trait]
pub trait LocalCartStore: Send + Sync {
    /// Read the guest cart, empty if nothing has been stored yet.
    async fn read(&self) -> Result<Cart, OrderingError>;
    async fn write(&self, cart: &Cart) -> Result<(), OrderingError>;
    async fn clear(&self) -> Result<(), OrderingError>;
}

/// Per-account authoritative cart record, reachable only with a valid
/// session.
#[async_trait]
pub trait RemoteCartStore: Send + Sync {
    /// Get-or-create: a missing cart yields an empty one, never a not-found
    /// error. At most one cart exists per account.
    async fn fetch(&self, account_id: AccountId) -> Result<Cart, OrderingError>;

    /// Whole-object overwrite, returning the stored cart.
    ///
    /// Replace is last-writer-wins: two concurrent writers (e.g. two open
    /// sessions on one account) can silently drop one writer's changes.
    /// This is an accepted risk of the design, not something implementations
    /// should paper over with their own concurrency control.
    async fn replace(&self, account_id: AccountId, cart: &Cart) -> Result<Cart, OrderingError>;
}

/// Input to [`OrderStore::insert`]. The order number and creation timestamp
/// are assigned by the store, atomically with persistence.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub items: Vec<CartItem>,
    pub total: Decimal,
    pub customer_details: CustomerDetails,
    /// Client-supplied idempotency token for this checkout attempt; unique
    /// per `(account, token)`.
    pub checkout_token: String,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Allocate an order number and persist the order in one atomic step.
    async fn insert(&self, account_id: AccountId, order: &NewOrder)
        -> Result<Order, OrderingError>;

    /// The account's orders, newest first.
    async fn list(&self, account_id: AccountId) -> Result<Vec<Order>, OrderingError>;

    /// Single order scoped to the account; `None` when absent or owned by
    /// another account.
    async fn get(
        &self,
        account_id: AccountId,
        order_id: OrderId,
    ) -> Result<Option<Order>, OrderingError>;

    /// Look up a previously created order by its checkout idempotency token.
    async fn find_by_checkout_token(
        &self,
        account_id: AccountId,
        token: &str,
    ) -> Result<Option<Order>, OrderingError>;

    /// Status transition hook for the external fulfillment process.
    async fn set_status(
        &self,
        order_id: OrderId,
        status: &OrderStatus,
    ) -> Result<(), OrderingError>;
}
