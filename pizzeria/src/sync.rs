use crate::error::OrderingError;
use crate::model::{AccountId, Cart};
use crate::storage::{LocalCartStore, RemoteCartStore};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Session lifecycle as seen by the cart layer. The synchronizer only acts
/// on the single edge into `Authenticated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTransition {
    Anonymous,
    Authenticating,
    Authenticated(AccountId),
}

/// Merge the guest cart into the account cart.
///
/// Remote items keep their positions; every local item whose fingerprint is
/// not already present is appended in local order. Same fingerprint means
/// "already in cart": no duplication and no quantity summation. The function
/// is pure and idempotent, so accidental re-merging changes nothing.
pub fn merge(local: &Cart, remote: &Cart) -> Cart {
    let mut merged = remote.clone();
    let mut seen: HashSet<String> = remote.items.iter().map(|i| i.fingerprint()).collect();

    for item in &local.items {
        let fingerprint = item.fingerprint();
        if seen.insert(fingerprint) {
            merged.items.push(item.clone());
        }
    }

    merged
}

/// Any failure inside the merge flow reads as a sync failure to callers,
/// whatever store it came from.
fn sync_err(e: OrderingError) -> OrderingError {
    match e {
        OrderingError::Sync(_) => e,
        other => OrderingError::Sync(Box::new(other)),
    }
}

/// Reconciles the guest cart with the account cart exactly once per login
/// transition.
pub struct CartSynchronizer {
    local: Arc<dyn LocalCartStore>,
    remote: Arc<dyn RemoteCartStore>,
    /// Session state as the synchronizer last saw it. `Authenticated(id)`
    /// means the merge for that account already ran. The lock also
    /// serializes merges: two overlapping login notifications queue here
    /// instead of racing.
    state: Mutex<SessionTransition>,
}

impl CartSynchronizer {
    pub fn new(local: Arc<dyn LocalCartStore>, remote: Arc<dyn RemoteCartStore>) -> Self {
        Self {
            local,
            remote,
            state: Mutex::new(SessionTransition::Anonymous),
        }
    }

    /// Handle the `* -> Authenticated` edge.
    ///
    /// Pulls the account cart, merges in local items by fingerprint, writes
    /// the result back, and clears the local store only after the remote
    /// write is confirmed. A repeat notification for the same account is a
    /// no-op that just returns the current account cart.
    pub async fn on_session_established(
        &self,
        account_id: AccountId,
    ) -> Result<Cart, OrderingError> {
        let mut guard = self.state.lock().await;
        if *guard == SessionTransition::Authenticated(account_id) {
            // Duplicate delivery of the same login edge; the merge already ran.
            return self.remote.fetch(account_id).await.map_err(sync_err);
        }
        *guard = SessionTransition::Authenticating;

        let local_cart = self.local.read().await.map_err(sync_err)?;
        let remote_cart = self.remote.fetch(account_id).await.map_err(sync_err)?;
        let merged = merge(&local_cart, &remote_cart);

        let stored = self
            .remote
            .replace(account_id, &merged)
            .await
            .map_err(|e| {
                warn!(account_id, error = %e, "cart merge write failed; guest cart retained");
                sync_err(e)
            })?;

        // Remote write confirmed; only now is it safe to drop the guest copy.
        self.local.clear().await.map_err(sync_err)?;
        *guard = SessionTransition::Authenticated(account_id);

        info!(
            account_id,
            local_items = local_cart.items.len(),
            merged_items = stored.items.len(),
            "merged guest cart into account cart"
        );
        Ok(stored)
    }

    /// Handle the `Authenticated -> Anonymous` edge (logout): persist the
    /// last known cart back into the local store so guest continuity is
    /// preserved, and re-arm the merge for the next login.
    pub async fn on_session_cleared(&self, last_known: &Cart) -> Result<(), OrderingError> {
        let mut guard = self.state.lock().await;
        self.local.write(last_known).await?;
        *guard = SessionTransition::Anonymous;
        Ok(())
    }
}
