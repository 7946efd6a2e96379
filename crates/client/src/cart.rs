//! The client-side shopping cart.
//!
//! [`CartStore`] owns the cart lines and mirrors them into durable storage
//! under the `bookstore-cart` key. Every mutation updates memory first and
//! then writes the full line list back (write-through).
//!
//! # Invariants
//!
//! - At most one line per book.
//! - Every line has `quantity >= 1`; setting a quantity `<= 0` removes the
//!   line instead.
//! - The total is derived on every read, never stored.

use std::sync::Arc;

use bookstore_core::{BookId, Price};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::{CART_KEY, Storage, StorageError, read_json, write_json};

/// Errors that can occur when mutating the cart.
///
/// The in-memory cart has already been updated when these are returned.
#[derive(Debug, Error)]
pub enum CartError {
    /// The cart could not be written to durable storage.
    #[error("failed to save cart: {0}")]
    Storage(#[from] StorageError),

    /// The requested quantity does not fit in a cart line.
    #[error("quantity {0} is too large")]
    QuantityTooLarge(i64),
}

/// One distinct book in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// The book this line is for.
    pub id: BookId,
    /// Title shown in the cart.
    pub title: String,
    /// Unit price at the time the book was added.
    pub price: Price,
    /// Number of copies, always at least 1.
    pub quantity: u32,
}

impl CartLine {
    /// `price × quantity`.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.price * self.quantity
    }
}

/// The shopping cart and its durable mirror.
pub struct CartStore {
    storage: Arc<dyn Storage>,
    lines: Vec<CartLine>,
}

impl CartStore {
    /// Restore the cart from durable storage.
    ///
    /// A missing record gives an empty cart. A corrupt record is logged and
    /// also gives an empty cart. Lines that fail to decode (an out-of-range
    /// price, say) and zero-quantity lines are dropped; lines for the same
    /// book are merged.
    #[must_use]
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let stored = match read_json::<Vec<serde_json::Value>>(storage.as_ref(), CART_KEY) {
            Ok(lines) => lines.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse stored cart, starting empty");
                Vec::new()
            }
        };
        let stored = stored.into_iter().filter_map(|raw| {
            serde_json::from_value::<CartLine>(raw)
                .inspect_err(|e| tracing::warn!(error = %e, "Dropping unreadable cart line"))
                .ok()
        });

        let mut lines: Vec<CartLine> = Vec::new();
        for line in stored.filter(|line| line.quantity > 0) {
            match lines.iter_mut().find(|existing| existing.id == line.id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(line.quantity);
                }
                None => lines.push(line),
            }
        }

        tracing::debug!(lines = lines.len(), "Cart restored");
        Self { storage, lines }
    }

    /// Current lines, in the order they were first added.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// The line for `id`, if present.
    #[must_use]
    pub fn line(&self, id: BookId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.id == id)
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of copies across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Sum of `price × quantity` over all lines.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Add one copy of a book, creating its line if needed.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the cart cannot be saved.
    pub fn add_item(
        &mut self,
        id: BookId,
        title: impl Into<String>,
        price: Price,
    ) -> Result<(), CartError> {
        match self.lines.iter_mut().find(|line| line.id == id) {
            Some(line) => line.quantity = line.quantity.saturating_add(1),
            None => self.lines.push(CartLine {
                id,
                title: title.into(),
                price,
                quantity: 1,
            }),
        }
        self.sync()
    }

    /// Remove a book's line. Removing an absent line is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the cart cannot be saved.
    pub fn remove_item(&mut self, id: BookId) -> Result<(), CartError> {
        let before = self.lines.len();
        self.lines.retain(|line| line.id != id);
        if self.lines.len() == before {
            return Ok(());
        }
        self.sync()
    }

    /// Set a line's quantity.
    ///
    /// A quantity `<= 0` removes the line. Lines that are not in the cart
    /// are left alone.
    ///
    /// # Errors
    ///
    /// Returns `CartError::QuantityTooLarge` if `quantity` exceeds `u32::MAX`
    /// and `CartError::Storage` if the cart cannot be saved.
    pub fn update_quantity(&mut self, id: BookId, quantity: i64) -> Result<(), CartError> {
        if quantity <= 0 {
            return self.remove_item(id);
        }
        let quantity =
            u32::try_from(quantity).map_err(|_| CartError::QuantityTooLarge(quantity))?;

        let Some(line) = self.lines.iter_mut().find(|line| line.id == id) else {
            tracing::debug!(%id, "Ignoring quantity change for book not in cart");
            return Ok(());
        };
        if line.quantity == quantity {
            return Ok(());
        }
        line.quantity = quantity;
        self.sync()
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the cart cannot be saved.
    pub fn clear(&mut self) -> Result<(), CartError> {
        self.lines.clear();
        self.sync()
    }

    fn sync(&self) -> Result<(), CartError> {
        write_json(self.storage.as_ref(), CART_KEY, &self.lines).map_err(|e| {
            tracing::warn!(error = %e, "Failed to save cart");
            CartError::from(e)
        })
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("lines", &self.lines)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn empty_cart() -> (Arc<MemoryStorage>, CartStore) {
        let storage = Arc::new(MemoryStorage::new());
        let cart = CartStore::load(storage.clone());
        (storage, cart)
    }

    fn stored_lines(storage: &MemoryStorage) -> Vec<CartLine> {
        read_json(storage, CART_KEY).unwrap().unwrap()
    }

    #[test]
    fn test_repeated_adds_increment_one_line() {
        let (_, mut cart) = empty_cart();
        let id = BookId::generate();
        for _ in 0..5 {
            cart.add_item(id, "Dune", Price::from_pence(999)).unwrap();
        }
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.line(id).unwrap().quantity, 5);
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_total_is_exact_sum() {
        let (_, mut cart) = empty_cart();
        let b1 = BookId::generate();
        let b2 = BookId::generate();
        cart.add_item(b1, "b1", Price::from_pence(1000)).unwrap();
        cart.add_item(b1, "b1", Price::from_pence(1000)).unwrap();
        cart.add_item(b2, "b2", Price::from_pence(500)).unwrap();

        assert_eq!(cart.total(), Price::from_pence(2500));
        assert_eq!(cart.total().to_string(), "£25.00");

        cart.remove_item(b1).unwrap();
        cart.remove_item(b2).unwrap();
        assert_eq!(cart.total(), Price::ZERO);
    }

    #[test]
    fn test_total_avoids_float_drift() {
        let (_, mut cart) = empty_cart();
        let id = BookId::generate();
        cart.add_item(id, "cheap", Price::from_pence(10)).unwrap();
        cart.update_quantity(id, 3).unwrap();
        assert_eq!(cart.total(), Price::from_pence(30));
    }

    #[test]
    fn test_non_positive_quantity_removes_line() {
        for quantity in [0, -1, -40] {
            let (storage, mut cart) = empty_cart();
            let id = BookId::generate();
            cart.add_item(id, "Dune", Price::from_pence(999)).unwrap();

            cart.update_quantity(id, quantity).unwrap();
            assert!(cart.line(id).is_none());
            assert!(stored_lines(&storage).is_empty());
        }
    }

    #[test]
    fn test_update_quantity_is_absolute() {
        let (storage, mut cart) = empty_cart();
        let id = BookId::generate();
        cart.add_item(id, "Dune", Price::from_pence(999)).unwrap();
        cart.add_item(id, "Dune", Price::from_pence(999)).unwrap();

        cart.update_quantity(id, 7).unwrap();
        assert_eq!(cart.line(id).unwrap().quantity, 7);
        assert_eq!(stored_lines(&storage).first().unwrap().quantity, 7);
    }

    #[test]
    fn test_update_quantity_ignores_absent_line() {
        let (storage, mut cart) = empty_cart();
        cart.update_quantity(BookId::generate(), 3).unwrap();
        assert!(cart.is_empty());
        assert!(storage.get(CART_KEY).unwrap().is_none());
    }

    #[test]
    fn test_update_quantity_rejects_overflow() {
        let (_, mut cart) = empty_cart();
        let id = BookId::generate();
        cart.add_item(id, "Dune", Price::from_pence(999)).unwrap();
        assert!(matches!(
            cart.update_quantity(id, i64::from(u32::MAX) + 1),
            Err(CartError::QuantityTooLarge(_))
        ));
        assert_eq!(cart.line(id).unwrap().quantity, 1);
    }

    #[test]
    fn test_remove_absent_line_is_noop() {
        let (_, mut cart) = empty_cart();
        cart.remove_item(BookId::generate()).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_mutations_write_through() {
        let (storage, mut cart) = empty_cart();
        let id = BookId::generate();
        cart.add_item(id, "Dune", Price::from_pence(999)).unwrap();
        assert_eq!(stored_lines(&storage), cart.lines());

        let restored = CartStore::load(storage.clone());
        assert_eq!(restored.lines(), cart.lines());

        cart.clear().unwrap();
        assert!(stored_lines(&storage).is_empty());
    }

    #[test]
    fn test_stored_record_format() {
        let (storage, mut cart) = empty_cart();
        let id = BookId::generate();
        cart.add_item(id, "Dune", Price::from_pence(1250)).unwrap();

        let raw = storage.get(CART_KEY).unwrap().unwrap();
        assert_eq!(
            raw,
            format!(r#"[{{"id":"{id}","title":"Dune","price":12.5,"quantity":1}}]"#)
        );
    }

    #[test]
    fn test_corrupt_record_gives_empty_cart() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(CART_KEY, "[{\"id\":").unwrap();
        let cart = CartStore::load(storage);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_load_normalizes_lines() {
        let storage = Arc::new(MemoryStorage::new());
        let id = BookId::generate();
        let other = BookId::generate();
        storage
            .set(
                CART_KEY,
                &format!(
                    r#"[{{"id":"{id}","title":"A","price":1,"quantity":2}},
                        {{"id":"{other}","title":"B","price":1,"quantity":0}},
                        {{"id":"{id}","title":"A","price":1,"quantity":3}}]"#
                ),
            )
            .unwrap();

        let cart = CartStore::load(storage);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.line(id).unwrap().quantity, 5);
        assert!(cart.line(other).is_none());
    }

    #[test]
    fn test_load_drops_out_of_range_prices() {
        let storage = Arc::new(MemoryStorage::new());
        let id = BookId::generate();
        let pricey = BookId::generate();
        storage
            .set(
                CART_KEY,
                &format!(
                    r#"[{{"id":"{pricey}","title":"Gilded","price":5e28,"quantity":2}},
                        {{"id":"{id}","title":"Dune","price":12.5,"quantity":1}}]"#
                ),
            )
            .unwrap();

        let cart = CartStore::load(storage);
        assert!(cart.line(pricey).is_none());
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.total(), Price::from_pence(1250));
    }

    #[test]
    fn test_total_of_largest_lines_does_not_panic() {
        let (_, mut cart) = empty_cart();
        for _ in 0..3 {
            let id = BookId::generate();
            cart.add_item(id, "Folio", Price::MAX).unwrap();
            cart.update_quantity(id, i64::from(u32::MAX)).unwrap();
        }
        assert!(cart.total() > cart.lines().first().unwrap().subtotal());
    }
}
