use common::test_helpers::{generate_unique_id, temp_database_url};
use pizzeria::checkout::OrderFactory;
use pizzeria::error::OrderingError;
use pizzeria::model::{Cart, CartItem, CustomerDetails, OrderStatus};
use pizzeria::sqlite_storage::SqliteStorage;
use pizzeria::storage::{OrderStore, RemoteCartStore};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;

async fn test_storage() -> Arc<SqliteStorage> {
    let storage = SqliteStorage::new(&temp_database_url("checkout"))
        .await
        .unwrap();
    storage.initialize_schema().await.unwrap();
    Arc::new(storage)
}

fn factory(storage: &Arc<SqliteStorage>) -> OrderFactory {
    OrderFactory::new(storage.clone(), storage.clone())
}

fn details() -> CustomerDetails {
    CustomerDetails {
        name: "Ada Lovelace".to_string(),
        phone: "1234567890".to_string(),
        email: "ada@example.com".to_string(),
        address: "42 Pizza Lane".to_string(),
        pincode: "560001".to_string(),
        promo_code: None,
    }
}

fn item(name: &str, price: &str, quantity: u32) -> CartItem {
    CartItem {
        name: name.to_string(),
        price: price.parse().unwrap(),
        quantity,
        customizations: None,
    }
}

#[tokio::test]
async fn total_is_computed_from_cart_items() {
    let storage = test_storage().await;
    let cart = Cart {
        items: vec![item("Custom", "14.99", 2), item("Garlic Bread", "3.00", 1)],
    };
    storage.replace(1, &cart).await.unwrap();

    let order = factory(&storage)
        .create_order(1, &details(), &generate_unique_id("tok"))
        .await
        .unwrap();

    assert_eq!(order.total, "32.98".parse::<Decimal>().unwrap());
    assert_eq!(order.status, OrderStatus::Received);
    assert_eq!(order.items.len(), 2);
}

#[tokio::test]
async fn empty_cart_checkout_fails_without_side_effects() {
    let storage = test_storage().await;

    let err = factory(&storage)
        .create_order(1, &details(), &generate_unique_id("tok"))
        .await
        .unwrap_err();

    assert!(matches!(err, OrderingError::EmptyCart));
    assert!(storage.list(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_details_fail_before_touching_the_cart() {
    let storage = test_storage().await;
    let cart = Cart {
        items: vec![item("Margherita", "9.99", 1)],
    };
    storage.replace(1, &cart).await.unwrap();

    let mut bad = details();
    bad.phone = "123".to_string();
    let err = factory(&storage)
        .create_order(1, &bad, &generate_unique_id("tok"))
        .await
        .unwrap_err();

    assert!(matches!(err, OrderingError::Validation(_)));
    assert_eq!(storage.fetch(1).await.unwrap(), cart, "cart unchanged");
    assert!(storage.list(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn successful_checkout_clears_the_cart() {
    let storage = test_storage().await;
    storage
        .replace(1, &Cart { items: vec![item("Margherita", "9.99", 1)] })
        .await
        .unwrap();

    factory(&storage)
        .create_order(1, &details(), &generate_unique_id("tok"))
        .await
        .unwrap();

    assert!(storage.fetch(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn order_snapshot_is_immune_to_later_cart_mutation() {
    let storage = test_storage().await;
    storage
        .replace(1, &Cart { items: vec![item("Margherita", "9.99", 2)] })
        .await
        .unwrap();

    let order = factory(&storage)
        .create_order(1, &details(), &generate_unique_id("tok"))
        .await
        .unwrap();

    storage
        .replace(1, &Cart { items: vec![item("Hawaiian", "11.99", 5)] })
        .await
        .unwrap();

    let reread = storage.get(1, order.id).await.unwrap().unwrap();
    assert_eq!(reread.items.len(), 1);
    assert_eq!(reread.items[0].name, "Margherita");
    assert_eq!(reread.total, "19.98".parse::<Decimal>().unwrap());
}

#[tokio::test]
async fn repeated_submission_with_same_token_is_a_no_op() {
    let storage = test_storage().await;
    storage
        .replace(1, &Cart { items: vec![item("Margherita", "9.99", 1)] })
        .await
        .unwrap();

    let factory = factory(&storage);
    let token = generate_unique_id("tok");
    let first = factory.create_order(1, &details(), &token).await.unwrap();

    // Simulates the client blindly re-submitting after a partial failure,
    // even with items back in the cart.
    storage
        .replace(1, &Cart { items: vec![item("Hawaiian", "11.99", 1)] })
        .await
        .unwrap();
    let second = factory.create_order(1, &details(), &token).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(storage.list(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn simultaneous_submissions_of_one_token_yield_one_order() {
    let storage = test_storage().await;
    storage
        .replace(1, &Cart { items: vec![item("Margherita", "9.99", 1)] })
        .await
        .unwrap();

    // A double-click: both requests carry the same token and race past the
    // initial token lookup. Whoever loses the insert must still resolve to
    // the winner's order instead of surfacing a storage error.
    let factory = Arc::new(factory(&storage));
    let token = generate_unique_id("tok");

    let mut handles = Vec::new();
    for _ in 0..2 {
        let factory = factory.clone();
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            factory.create_order(1, &details(), &token).await
        }));
    }

    let mut numbers = Vec::new();
    for handle in handles {
        numbers.push(handle.await.unwrap().unwrap().order_number);
    }
    assert_eq!(numbers[0], numbers[1]);
    assert_eq!(storage.list(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn order_numbers_are_sequential_and_well_formed() {
    let storage = test_storage().await;
    let factory = factory(&storage);

    for expected in 1..=3u32 {
        storage
            .replace(1, &Cart { items: vec![item("Margherita", "9.99", 1)] })
            .await
            .unwrap();
        let order = factory
            .create_order(1, &details(), &generate_unique_id("tok"))
            .await
            .unwrap();
        assert_eq!(order.order_number, format!("ORD{:06}", expected));
    }
}

#[tokio::test]
async fn concurrent_checkouts_get_distinct_order_numbers() {
    let storage = test_storage().await;
    let factory = Arc::new(factory(&storage));

    // One pre-filled cart per account so every task has something to order.
    for account in 1..=8 {
        storage
            .replace(account, &Cart { items: vec![item("Margherita", "9.99", 1)] })
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for account in 1..=8 {
        let factory = factory.clone();
        handles.push(tokio::spawn(async move {
            factory
                .create_order(account, &details(), &generate_unique_id("tok"))
                .await
                .unwrap()
                .order_number
        }));
    }

    let mut numbers = HashSet::new();
    for handle in handles {
        assert!(numbers.insert(handle.await.unwrap()), "duplicate order number");
    }
    assert_eq!(numbers.len(), 8);
}
