use crate::error::OrderingError;
use crate::model::Cart;
use crate::storage::LocalCartStore;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// JSON-file guest cart, durable across process restarts and scoped to one
/// device. Always available: no network or session involved.
pub struct FileCartStore {
    path: PathBuf,
}

impl FileCartStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl LocalCartStore for FileCartStore {
    async fn read(&self) -> Result<Cart, OrderingError> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Cart::new()),
            Err(e) => Err(OrderingError::Storage(Box::new(e))),
        }
    }

    async fn write(&self, cart: &Cart) -> Result<(), OrderingError> {
        let json = serde_json::to_vec(cart)?;
        fs::write(&self.path, json)
            .await
            .map_err(|e| OrderingError::Storage(Box::new(e)))?;
        debug!(path = %self.path.display(), items = cart.items.len(), "wrote guest cart");
        Ok(())
    }

    async fn clear(&self) -> Result<(), OrderingError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(OrderingError::Storage(Box::new(e))),
        }
    }
}

/// In-memory guest cart for tests and embedded use.
#[derive(Default)]
pub struct InMemoryCartStore {
    cart: Arc<Mutex<Cart>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalCartStore for InMemoryCartStore {
    async fn read(&self) -> Result<Cart, OrderingError> {
        Ok(self.cart.lock().await.clone())
    }

    async fn write(&self, cart: &Cart) -> Result<(), OrderingError> {
        *self.cart.lock().await = cart.clone();
        Ok(())
    }

    async fn clear(&self) -> Result<(), OrderingError> {
        *self.cart.lock().await = Cart::new();
        Ok(())
    }
}
