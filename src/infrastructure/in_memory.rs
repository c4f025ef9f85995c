use crate::domain::cart::{Cart, CartItem, CartSnapshot};
use crate::domain::ports::CartStore;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory cart.
///
/// Uses `Arc<RwLock<Cart>>` so the shop screens and the checkout flow can share
/// one cart. Clones see the same contents.
#[derive(Default, Clone)]
pub struct InMemoryCartStore {
    cart: Arc<RwLock<Cart>>,
}

impl InMemoryCartStore {
    /// Creates a new, empty cart store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given lines.
    pub fn with_items(items: impl IntoIterator<Item = CartItem>) -> Self {
        let mut cart = Cart::new();
        for item in items {
            cart.insert(item);
        }
        Self {
            cart: Arc::new(RwLock::new(cart)),
        }
    }

    pub async fn add(&self, product: &CartItem) {
        self.cart.write().await.add(product);
    }

    pub async fn remove(&self, product_id: &str) {
        self.cart.write().await.remove(product_id);
    }

    pub async fn quantity_of(&self, product_id: &str) -> u32 {
        self.cart.read().await.quantity_of(product_id)
    }

    pub async fn count(&self) -> u32 {
        self.cart.read().await.count()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn snapshot(&self) -> Result<CartSnapshot> {
        Ok(self.cart.read().await.snapshot())
    }

    async fn clear(&self) -> Result<()> {
        self.cart.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_in_memory_cart_store() {
        let store = InMemoryCartStore::new();
        let rice = CartItem::new("p1", "Rice", dec!(100), 1).unwrap();

        store.add(&rice).await;
        store.add(&rice).await;
        assert_eq!(store.quantity_of("p1").await, 2);

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.total_amount(), dec!(200));

        store.remove("p1").await;
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn test_clones_share_contents() {
        let store = InMemoryCartStore::with_items([
            CartItem::new("p1", "Rice", dec!(10), 3).unwrap(),
            CartItem::new("p1", "Rice", dec!(10), 1).unwrap(),
        ]);
        let view = store.clone();
        assert_eq!(view.quantity_of("p1").await, 4);

        store.clear().await.unwrap();
        assert!(view.snapshot().await.unwrap().is_empty());
    }
}
