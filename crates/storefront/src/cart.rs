//! Cart store.
//!
//! The cart is an insertion-ordered list of line items, at most one per
//! product, mirrored to durable storage on every mutation. Totals are
//! recomputed from the lines on every call.

use std::num::NonZeroU32;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use foodtruck_core::{Price, ProductId};

use crate::cache::{DurableValue, Hydration};
use crate::models::Product;
use crate::notify::Notifier;
use crate::services::auth::IdentityObserver;
use crate::storage::DurableStorage;

/// Storage key of the persisted cart.
pub const CART_KEY: &str = "foodtruck_cart";

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    /// Snapshot of the product when it was added.
    pub product: Product,
    pub quantity: NonZeroU32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl CartLineItem {
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.line_total(self.quantity.get())
    }
}

/// The customer's cart for this device.
pub struct CartStore {
    lines: DurableValue<Vec<CartLineItem>>,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("lines", &self.lines)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Hydrate the cart from storage.
    ///
    /// An undecodable stored cart is discarded and its entry removed.
    pub fn open(storage: &DurableStorage, notifier: Arc<dyn Notifier>) -> Self {
        let lines = DurableValue::load(storage, CART_KEY, Vec::new());
        if lines.hydration() == Hydration::Corrupt {
            tracing::warn!(key = CART_KEY, "removing corrupt stored cart");
            lines.remove();
        } else {
            lines.update(merge_duplicate_lines);
        }
        Self { lines, notifier }
    }

    /// Add `quantity` of `product`.
    ///
    /// An existing line is incremented and keeps its note unless a non-empty
    /// `note` is given. Otherwise a new line is appended.
    pub fn add(&self, product: &Product, quantity: NonZeroU32, note: Option<&str>) {
        let note = note.map(str::trim).filter(|n| !n.is_empty());
        let updated = self.lines.update(|items| {
            if let Some(line) = items.iter_mut().find(|l| l.product.id == product.id) {
                line.quantity = line.quantity.saturating_add(quantity.get());
                if let Some(note) = note {
                    line.note = Some(note.to_owned());
                }
                true
            } else {
                items.push(CartLineItem {
                    product: product.clone(),
                    quantity,
                    note: note.map(str::to_owned),
                });
                false
            }
        });

        tracing::debug!(product_id = %product.id, quantity = quantity.get(), updated, "cart add");
        self.notifier.success(if updated {
            "Product updated in cart"
        } else {
            "Product added to cart"
        });
    }

    /// Remove the line for `product_id`. Returns whether a line was removed.
    pub fn remove(&self, product_id: ProductId) -> bool {
        let removed = self.lines.update(|items| {
            let before = items.len();
            items.retain(|l| l.product.id != product_id);
            items.len() != before
        });
        if removed {
            tracing::debug!(product_id = %product_id, "cart remove");
            self.notifier.success("Product removed from cart");
        }
        removed
    }

    /// Overwrite the quantity of an existing line. Zero or less removes it.
    pub fn set_quantity(&self, product_id: ProductId, quantity: i64) {
        if quantity <= 0 {
            self.remove(product_id);
            return;
        }
        let quantity = NonZeroU32::new(u32::try_from(quantity).unwrap_or(u32::MAX))
            .unwrap_or(NonZeroU32::MAX);
        self.lines.update(|items| {
            if let Some(line) = items.iter_mut().find(|l| l.product.id == product_id) {
                line.quantity = quantity;
            }
        });
    }

    /// Empty the cart and erase the stored copy.
    pub fn clear(&self) {
        self.lines.remove();
    }

    /// Current lines in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<CartLineItem> {
        self.lines.get()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.get().is_empty()
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub fn total_item_count(&self) -> u64 {
        self.lines
            .get()
            .iter()
            .map(|l| u64::from(l.quantity.get()))
            .sum()
    }

    /// Sum of unit price times quantity over all lines.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.lines.get().iter().map(CartLineItem::line_total).sum()
    }

    /// Quantity of `product_id` in the cart, zero when absent.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.lines
            .get()
            .iter()
            .find(|l| l.product.id == product_id)
            .map_or(0, |l| l.quantity.get())
    }
}

impl IdentityObserver for CartStore {
    fn on_signed_out(&self) {
        tracing::debug!("identity cleared, emptying cart");
        self.clear();
    }
}

/// Fold repeated product ids into their first line.
fn merge_duplicate_lines(items: &mut Vec<CartLineItem>) {
    let mut merged: Vec<CartLineItem> = Vec::with_capacity(items.len());
    for item in items.drain(..) {
        if let Some(existing) = merged.iter_mut().find(|l| l.product.id == item.product.id) {
            existing.quantity = existing.quantity.saturating_add(item.quantity.get());
            if item.note.is_some() {
                existing.note = item.note;
            }
        } else {
            merged.push(item);
        }
    }
    *items = merged;
}
