//! In-memory cart and order history.
//!
//! Nothing here is persisted: a restart discards every cart and order.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::models::{CartItem, CartSnapshot, Order, OrderStatus};

/// One session's cart plus its order history (newest first).
#[derive(Debug, Default, Clone)]
pub struct Cart {
    items: Vec<CartItem>,
    orders: Vec<Order>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Add a line item; an id already in the cart has its quantity increased instead.
    /// Returns false, leaving the cart untouched, when the quantity would overflow.
    pub fn add(&mut self, item: CartItem) -> bool {
        match self.items.iter_mut().find(|i| i.id == item.id) {
            Some(existing) => match existing.quantity.checked_add(item.quantity) {
                Some(quantity) => existing.quantity = quantity,
                None => return false,
            },
            None => self.items.push(item),
        }
        true
    }

    /// Returns false when no line has this id.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.id != id);
        self.items.len() != before
    }

    /// Returns false when no line has this id.
    pub fn update_quantity(&mut self, id: &str, quantity: u32) -> bool {
        match self.items.iter_mut().find(|i| i.id == id) {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// No items and no order history.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.orders.is_empty()
    }

    /// Sum of price x quantity over all lines.
    pub fn total(&self) -> f64 {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            items: self.items.clone(),
            total: self.total(),
        }
    }

    pub fn add_order(&mut self, order: Order) {
        self.orders.insert(0, order);
    }

    /// Turn the current cart into a pending order and empty the cart.
    /// Returns `None` for an empty cart.
    pub fn checkout(&mut self) -> Option<Order> {
        if self.items.is_empty() {
            return None;
        }
        let order = Order {
            id: uuid::Uuid::new_v4().to_string(),
            total: self.total(),
            items: std::mem::take(&mut self.items),
            status: OrderStatus::Pending,
            created_at: Utc::now().to_rfc3339(),
        };
        self.add_order(order.clone());
        Some(order)
    }
}

/// Carts keyed by session id.
#[derive(Debug, Default)]
pub struct CartStore {
    carts: RwLock<HashMap<String, Cart>>,
}

impl CartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a session's cart; unknown sessions read as empty.
    pub async fn read<R>(&self, session: &str, f: impl FnOnce(&Cart) -> R) -> R {
        let carts = self.carts.read().await;
        match carts.get(session) {
            Some(cart) => f(cart),
            None => f(&Cart::default()),
        }
    }

    /// Mutate a session's cart. Carts left with no items and no orders are dropped.
    pub async fn update<R>(&self, session: &str, f: impl FnOnce(&mut Cart) -> R) -> R {
        let mut carts = self.carts.write().await;
        let cart = carts.entry(session.to_string()).or_default();
        let result = f(cart);
        if cart.is_empty() {
            carts.remove(session);
        }
        result
    }

    /// Number of sessions currently holding a cart or orders.
    pub async fn session_count(&self) -> usize {
        self.carts.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, price: f64, quantity: u32) -> CartItem {
        CartItem {
            id: id.to_string(),
            name: format!("item {}", id),
            price,
            quantity,
            image: None,
        }
    }

    #[test]
    fn test_add_existing_increments_quantity() {
        let mut cart = Cart::new();
        cart.add(item("banana", 0.25, 2));
        cart.add(item("banana", 0.25, 3));

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 5);
    }

    #[test]
    fn test_total_tracks_every_mutation() {
        let mut cart = Cart::new();
        cart.add(item("banana", 0.5, 4));
        cart.add(item("milk", 3.0, 1));
        assert!((cart.total() - 5.0).abs() < 1e-9);

        assert!(cart.update_quantity("milk", 2));
        assert!((cart.total() - 8.0).abs() < 1e-9);

        assert!(cart.remove("banana"));
        assert!((cart.total() - 6.0).abs() < 1e-9);

        cart.clear();
        assert_eq!(cart.total(), 0.0);
    }

    #[test]
    fn test_unknown_ids_are_reported() {
        let mut cart = Cart::new();
        assert!(!cart.remove("ghost"));
        assert!(!cart.update_quantity("ghost", 3));
    }

    #[test]
    fn test_checkout_prepends_pending_order() {
        let mut cart = Cart::new();
        assert!(cart.checkout().is_none());

        cart.add(item("eggs", 4.0, 1));
        let first = cart.checkout().unwrap();
        cart.add(item("bread", 2.5, 2));
        let second = cart.checkout().unwrap();

        assert!(cart.items().is_empty());
        assert_eq!(first.status, OrderStatus::Pending);
        assert_eq!(second.total, 5.0);
        assert_eq!(cart.orders()[0].id, second.id);
        assert_eq!(cart.orders()[1].id, first.id);
    }

    #[test]
    fn test_add_rejects_quantity_overflow() {
        let mut cart = Cart::new();
        assert!(cart.add(item("rice", 2.0, u32::MAX)));
        assert!(!cart.add(item("rice", 2.0, 1)));

        assert_eq!(cart.items()[0].quantity, u32::MAX);
        assert!((cart.total() - 2.0 * u32::MAX as f64).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_failed_updates_leave_no_session_behind() {
        let store = CartStore::new();
        assert!(!store.update("ghost", |c| c.remove("nothing")).await);
        assert!(!store.update("ghost", |c| c.update_quantity("nothing", 2)).await);
        assert_eq!(store.session_count().await, 0);

        store.update("a", |c| c.add(item("apple", 1.0, 1))).await;
        assert_eq!(store.session_count().await, 1);
        store.update("a", |c| c.clear()).await;
        assert_eq!(store.session_count().await, 0);

        store.update("b", |c| c.add(item("pear", 1.0, 1))).await;
        store.update("b", |c| c.checkout()).await;
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_store_isolates_sessions() {
        let store = CartStore::new();
        store.update("a", |c| c.add(item("apple", 1.0, 1))).await;

        assert_eq!(store.read("a", |c| c.items().len()).await, 1);
        assert_eq!(store.read("b", |c| c.items().len()).await, 0);
    }
}
