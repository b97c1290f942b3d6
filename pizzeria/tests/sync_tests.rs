use async_trait::async_trait;
use common::test_helpers::temp_database_url;
use mockall::mock;
use mockall::predicate::*;
use pizzeria::error::OrderingError;
use pizzeria::local_store::{FileCartStore, InMemoryCartStore};
use pizzeria::model::{AccountId, Cart, CartItem};
use pizzeria::sqlite_storage::SqliteStorage;
use pizzeria::storage::{LocalCartStore, RemoteCartStore};
use pizzeria::sync::CartSynchronizer;
use std::sync::Arc;
use tokio::sync::Mutex;

mock! {
    RemoteStore {}

    #[async_trait]
    impl RemoteCartStore for RemoteStore {
        async fn fetch(&self, account_id: AccountId) -> Result<Cart, OrderingError>;
        async fn replace(&self, account_id: AccountId, cart: &Cart) -> Result<Cart, OrderingError>;
    }
}

/// Minimal in-memory account cart keyed on a single account, with a replace
/// call counter for single-fire assertions.
#[derive(Default)]
struct CountingRemote {
    cart: Mutex<Cart>,
    replace_calls: Mutex<u32>,
}

#[async_trait]
impl RemoteCartStore for CountingRemote {
    async fn fetch(&self, _account_id: AccountId) -> Result<Cart, OrderingError> {
        Ok(self.cart.lock().await.clone())
    }

    async fn replace(&self, _account_id: AccountId, cart: &Cart) -> Result<Cart, OrderingError> {
        *self.cart.lock().await = cart.clone();
        *self.replace_calls.lock().await += 1;
        Ok(cart.clone())
    }
}

fn item(name: &str) -> CartItem {
    CartItem {
        name: name.to_string(),
        price: "12.50".parse().unwrap(),
        quantity: 1,
        customizations: None,
    }
}

fn cart(names: &[&str]) -> Cart {
    Cart {
        items: names.iter().map(|n| item(n)).collect(),
    }
}

#[tokio::test]
async fn login_merges_guest_cart_and_clears_local() {
    let local = Arc::new(InMemoryCartStore::new());
    local.write(&cart(&["Margherita", "Pepperoni"])).await.unwrap();

    let remote = Arc::new(CountingRemote::default());
    let sync = CartSynchronizer::new(local.clone(), remote.clone());

    let merged = sync.on_session_established(7).await.unwrap();

    let names: Vec<&str> = merged.items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Margherita", "Pepperoni"]);
    assert!(local.read().await.unwrap().is_empty(), "local cleared after remote success");
}

#[tokio::test]
async fn repeat_login_notification_is_a_no_op() {
    let local = Arc::new(InMemoryCartStore::new());
    local.write(&cart(&["Margherita"])).await.unwrap();

    let remote = Arc::new(CountingRemote::default());
    *remote.cart.lock().await = cart(&["Hawaiian"]);
    let sync = CartSynchronizer::new(local.clone(), remote.clone());

    let first = sync.on_session_established(7).await.unwrap();
    let second = sync.on_session_established(7).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(*remote.replace_calls.lock().await, 1, "merge fired exactly once");
}

#[tokio::test]
async fn merge_after_logout_and_new_login_fires_again() {
    let local = Arc::new(InMemoryCartStore::new());
    let remote = Arc::new(CountingRemote::default());
    let sync = CartSynchronizer::new(local.clone(), remote.clone());

    local.write(&cart(&["Margherita"])).await.unwrap();
    let at_login = sync.on_session_established(7).await.unwrap();

    // Logout persists the last known cart back into the local store.
    sync.on_session_cleared(&at_login).await.unwrap();
    assert_eq!(local.read().await.unwrap(), at_login);

    // The fingerprint-skip rule keeps the second merge duplication-free.
    let again = sync.on_session_established(7).await.unwrap();
    assert_eq!(again.items.len(), 1);
    assert_eq!(*remote.replace_calls.lock().await, 2);
}

#[tokio::test]
async fn guest_continuity_across_restart_and_login() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("guest_cart.json");

    // Anonymous session: two items land in the per-device store.
    {
        let store = FileCartStore::new(&path);
        let mut guest = Cart::new();
        guest.add_item(item("Margherita"));
        guest.add_item(item("Pepperoni"));
        store.write(&guest).await.unwrap();
    }

    // "Reload": fresh local store over the same file, then login.
    let local = Arc::new(FileCartStore::new(&path));
    let remote = Arc::new(
        SqliteStorage::new(&temp_database_url("sync")).await.unwrap(),
    );
    remote.initialize_schema().await.unwrap();

    let sync = CartSynchronizer::new(local.clone(), remote.clone());
    sync.on_session_established(7).await.unwrap();

    let account_cart = remote.fetch(7).await.unwrap();
    let names: Vec<&str> = account_cart.items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Margherita", "Pepperoni"]);
    assert!(local.read().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_remote_write_retains_guest_cart() {
    let local = Arc::new(InMemoryCartStore::new());
    local.write(&cart(&["Margherita"])).await.unwrap();

    let mut remote = MockRemoteStore::new();
    remote
        .expect_fetch()
        .with(eq(7))
        .returning(|_| Ok(Cart::new()));
    remote.expect_replace().returning(|_, _| {
        Err(OrderingError::Sync("connection reset".into()))
    });

    let sync = CartSynchronizer::new(local.clone(), Arc::new(remote));

    let err = sync.on_session_established(7).await.unwrap_err();
    assert!(matches!(err, OrderingError::Sync(_)));
    assert_eq!(
        local.read().await.unwrap().items.len(),
        1,
        "guest cart untouched until remote write is confirmed"
    );
}

#[tokio::test]
async fn failed_remote_fetch_is_reported_as_sync_failure() {
    let local = Arc::new(InMemoryCartStore::new());
    local.write(&cart(&["Margherita"])).await.unwrap();

    let mut remote = MockRemoteStore::new();
    remote
        .expect_fetch()
        .with(eq(7))
        .returning(|_| Err(OrderingError::Storage("connection reset".into())));

    let sync = CartSynchronizer::new(local.clone(), Arc::new(remote));

    // Whatever store fails mid-merge, the caller sees a sync failure, not a
    // generic storage one.
    let err = sync.on_session_established(7).await.unwrap_err();
    assert!(matches!(err, OrderingError::Sync(_)));
    assert_eq!(local.read().await.unwrap().items.len(), 1);
}

#[tokio::test]
async fn merge_retries_on_next_login_after_failure() {
    let local = Arc::new(InMemoryCartStore::new());
    local.write(&cart(&["Margherita"])).await.unwrap();

    let mut remote = MockRemoteStore::new();
    remote.expect_fetch().returning(|_| Ok(Cart::new()));
    let mut fail_once = true;
    remote.expect_replace().returning(move |_, cart| {
        if fail_once {
            fail_once = false;
            Err(OrderingError::Sync("connection reset".into()))
        } else {
            Ok(cart.clone())
        }
    });

    let sync = CartSynchronizer::new(local.clone(), Arc::new(remote));

    assert!(sync.on_session_established(7).await.is_err());
    let merged = sync.on_session_established(7).await.unwrap();
    assert_eq!(merged.items.len(), 1);
    assert!(local.read().await.unwrap().is_empty());
}
