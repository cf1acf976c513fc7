use std::fmt;

use storefront_core::{CartItem, Money};
use storefront_storage::{KeyValueStore, StorageError, load_record, save_record};
use tracing::{debug, warn};

use crate::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartChange {
    Added { id: String },
    QuantityChanged { id: String, quantity: u32 },
    Removed { id: String },
    Cleared,
}

impl CartChange {
    /// Whether the set of lines changed, as opposed to values on existing lines.
    pub fn is_structural(&self) -> bool {
        !matches!(self, CartChange::QuantityChanged { .. })
    }
}

type Subscriber = Box<dyn FnMut(&CartChange)>;

/// Client-local cart, persisted to the key/value store after every change.
pub struct CartStore {
    items: Vec<CartItem>,
    storage: Box<dyn KeyValueStore>,
    storage_key: String,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl CartStore {
    /// Load the persisted cart. Unreadable data is discarded, not fatal.
    pub fn load(storage: Box<dyn KeyValueStore>, storage_key: &str) -> Result<Self, EngineError> {
        let items = match load_record::<Vec<CartItem>>(storage.as_ref(), storage_key) {
            Ok(Some(mut items)) => {
                items.retain(|item| item.quantity >= 1);
                items
            }
            Ok(None) => Vec::new(),
            Err(StorageError::Serialization(e)) => {
                warn!(key = storage_key, error = %e, "discarding unreadable cart");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        debug!(lines = items.len(), "cart loaded");

        Ok(Self {
            items,
            storage,
            storage_key: storage_key.to_string(),
            subscribers: Vec::new(),
            next_subscription: 1,
        })
    }

    pub fn into_storage(self) -> Box<dyn KeyValueStore> {
        self.storage
    }

    pub fn add_to_cart(&mut self, item: CartItem, quantity: u32) -> Result<(), EngineError> {
        if quantity == 0 {
            return Err(EngineError::InvalidQuantity { item_id: item.id, quantity });
        }
        let change = match self.items.iter_mut().find(|i| i.id == item.id) {
            Some(existing) => {
                existing.quantity = existing.quantity.checked_add(quantity).ok_or_else(|| {
                    EngineError::InvalidQuantity {
                        item_id: existing.id.clone(),
                        quantity,
                    }
                })?;
                CartChange::QuantityChanged {
                    id: existing.id.clone(),
                    quantity: existing.quantity,
                }
            }
            None => {
                let id = item.id.clone();
                self.items.push(CartItem { quantity, ..item });
                CartChange::Added { id }
            }
        };
        self.commit(change);
        Ok(())
    }

    /// Returns whether the item was in the cart.
    pub fn remove_from_cart(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.id != id);
        if self.items.len() == before {
            return false;
        }
        self.commit(CartChange::Removed { id: id.to_string() });
        true
    }

    /// Set a line's quantity. Zero removes the line.
    pub fn update_quantity(&mut self, id: &str, quantity: u32) -> Result<(), EngineError> {
        if quantity == 0 {
            return if self.remove_from_cart(id) {
                Ok(())
            } else {
                Err(EngineError::CartItemNotFound(id.to_string()))
            };
        }
        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| EngineError::CartItemNotFound(id.to_string()))?;
        if item.quantity == quantity {
            return Ok(());
        }
        item.quantity = quantity;
        self.commit(CartChange::QuantityChanged { id: id.to_string(), quantity });
        Ok(())
    }

    pub fn clear_cart(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.items.clear();
        self.commit(CartChange::Cleared);
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn item(&self, id: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across all lines, saturating at `u32::MAX`.
    pub fn item_count(&self) -> u32 {
        self.items.iter().fold(0u32, |count, i| count.saturating_add(i.quantity))
    }

    pub fn total(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn formatted_total(&self) -> String {
        self.total().to_string()
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&CartChange) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn commit(&mut self, change: CartChange) {
        if let Err(e) = save_record(self.storage.as_mut(), &self.storage_key, &self.items) {
            warn!(key = %self.storage_key, error = %e, "failed to persist cart");
        }
        debug!(?change, count = self.item_count(), total = %self.total(), "cart changed");
        for (_, subscriber) in &mut self.subscribers {
            subscriber(&change);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use storefront_storage::SqliteStorage;

    use super::*;

    fn item(id: &str, cents: i64) -> CartItem {
        CartItem {
            id: id.into(),
            name: format!("Item {id}"),
            price: Money::from_cents(cents),
            section: "prints".into(),
            image: None,
            quantity: 1,
        }
    }

    fn empty_cart() -> CartStore {
        let storage = SqliteStorage::open_in_memory().unwrap();
        CartStore::load(Box::new(storage), "cart").unwrap()
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get_item(&self, _key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            Ok(None)
        }

        fn set_item(&mut self, key: &str, _value: &[u8]) -> Result<(), StorageError> {
            Err(StorageError::NotFound(key.to_string()))
        }

        fn remove_item(&mut self, _key: &str) -> Result<bool, StorageError> {
            Ok(false)
        }

        fn keys(&self) -> Result<Vec<String>, StorageError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn adding_same_item_merges_quantity() {
        let mut cart = empty_cart();
        cart.add_to_cart(item("a", 1299), 1).unwrap();
        cart.add_to_cart(item("b", 2998), 1).unwrap();
        cart.add_to_cart(item("a", 1299), 2).unwrap();

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.items()[0].id, "a", "insertion order is kept");
        assert_eq!(cart.item("a").unwrap().quantity, 3);
        assert_eq!(cart.item_count(), 4);
        assert_eq!(cart.formatted_total(), "$68.95");
    }

    #[test]
    fn zero_quantity_add_is_rejected() {
        let mut cart = empty_cart();
        let err = cart.add_to_cart(item("a", 100), 0).unwrap_err();
        assert!(matches!(err, EngineError::InvalidQuantity { quantity: 0, .. }));
        assert!(cart.is_empty());
    }

    #[test]
    fn merge_past_u32_max_is_rejected() {
        let mut cart = empty_cart();
        cart.add_to_cart(item("a", 1299), u32::MAX).unwrap();
        let err = cart.add_to_cart(item("a", 1299), 1).unwrap_err();
        assert!(matches!(err, EngineError::InvalidQuantity { quantity: 1, .. }));
        assert_eq!(cart.item("a").map(|i| i.quantity), Some(u32::MAX));

        cart.add_to_cart(item("b", 100), 5).unwrap();
        assert_eq!(cart.item_count(), u32::MAX);
        assert!(cart.total() > Money::ZERO);
    }

    #[test]
    fn update_to_zero_removes_line() {
        let mut cart = empty_cart();
        cart.add_to_cart(item("a", 100), 1).unwrap();
        cart.update_quantity("a", 0).unwrap();
        assert!(cart.is_empty());
        assert!(matches!(
            cart.update_quantity("a", 2),
            Err(EngineError::CartItemNotFound(_))
        ));
    }

    #[test]
    fn subscribers_see_changes_until_unsubscribed() {
        let mut cart = empty_cart();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = cart.subscribe(move |change| sink.borrow_mut().push(change.clone()));

        cart.add_to_cart(item("a", 100), 1).unwrap();
        cart.update_quantity("a", 4).unwrap();
        cart.update_quantity("a", 4).unwrap();
        assert!(cart.unsubscribe(id));
        cart.clear_cart();

        assert_eq!(
            *seen.borrow(),
            vec![
                CartChange::Added { id: "a".into() },
                CartChange::QuantityChanged { id: "a".into(), quantity: 4 },
            ]
        );
        assert!(!cart.unsubscribe(id));
        assert_eq!(cart.subscriber_count(), 0);
    }

    #[test]
    fn cart_persists_across_reload() {
        let mut cart = empty_cart();
        cart.add_to_cart(item("a", 1299), 2).unwrap();
        let storage = cart.into_storage();

        let reloaded = CartStore::load(storage, "cart").unwrap();
        assert_eq!(reloaded.item("a").map(|i| i.quantity), Some(2));
        assert_eq!(reloaded.formatted_total(), "$25.98");
    }

    #[test]
    fn unreadable_cart_starts_empty() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        storage.set_item("cart", b"not msgpack at all").unwrap();
        let cart = CartStore::load(Box::new(storage), "cart").unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn persistence_failure_keeps_memory_state() {
        let mut cart = CartStore::load(Box::new(BrokenStore), "cart").unwrap();
        cart.add_to_cart(item("a", 500), 1).unwrap();
        assert_eq!(cart.item_count(), 1);
    }
}
