use crate::error::OrderingError;
use crate::model::{AccountId, Cart, CustomerDetails, Order};
use crate::storage::{NewOrder, OrderStore, RemoteCartStore};
use std::sync::Arc;
use tracing::{error, info};

/// Converts a non-empty account cart plus validated customer details into an
/// immutable order, then clears the cart.
pub struct OrderFactory {
    carts: Arc<dyn RemoteCartStore>,
    orders: Arc<dyn OrderStore>,
}

impl OrderFactory {
    pub fn new(carts: Arc<dyn RemoteCartStore>, orders: Arc<dyn OrderStore>) -> Self {
        Self { carts, orders }
    }

    /// Create an order from the account's cart.
    ///
    /// The total is always recomputed from the stored cart's own item data;
    /// nothing the client submits is trusted for money calculations. Order
    /// persistence and cart clearing are two effects without a shared
    /// transaction: the checkout token makes a retry after partial failure
    /// return the already-created order instead of double-ordering.
    pub async fn create_order(
        &self,
        account_id: AccountId,
        details: &CustomerDetails,
        checkout_token: &str,
    ) -> Result<Order, OrderingError> {
        if let Some(existing) = self
            .orders
            .find_by_checkout_token(account_id, checkout_token)
            .await?
        {
            info!(
                account_id,
                order_number = %existing.order_number,
                "checkout retry matched an existing order"
            );
            return Ok(existing);
        }

        details.validate().map_err(OrderingError::Validation)?;

        let cart = self.carts.fetch(account_id).await?;
        if cart.is_empty() {
            // A concurrent submission of the same token may have ordered and
            // cleared the cart between the lookup above and this read.
            if let Some(existing) = self
                .orders
                .find_by_checkout_token(account_id, checkout_token)
                .await?
            {
                return Ok(existing);
            }
            return Err(OrderingError::EmptyCart);
        }

        let new_order = NewOrder {
            total: cart.total(),
            items: cart.items,
            customer_details: details.clone(),
            checkout_token: checkout_token.to_string(),
        };
        let order = match self.orders.insert(account_id, &new_order).await {
            Ok(order) => order,
            Err(e) if e.is_unique_violation() => {
                // The unique token index caught a simultaneous submission;
                // the winner's order is the one the caller gets.
                info!(account_id, "concurrent checkout detected, reusing existing order");
                return match self
                    .orders
                    .find_by_checkout_token(account_id, checkout_token)
                    .await?
                {
                    Some(existing) => Ok(existing),
                    None => Err(e),
                };
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = self.carts.replace(account_id, &Cart::new()).await {
            // The order is durable; a blind re-submission hits the checkout
            // token lookup above and stays a no-op.
            error!(
                account_id,
                order_number = %order.order_number,
                error = %e,
                "order persisted but cart clearing failed"
            );
        }

        info!(
            account_id,
            order_number = %order.order_number,
            total = %order.total,
            "created order"
        );
        Ok(order)
    }
}
