use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Grocery,
    Food,
    Medicine,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Grocery => "grocery",
            Category::Food => "food",
            Category::Medicine => "medicine",
        };
        f.write_str(name)
    }
}

/// One cart line. Prices are in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub name: String,
    pub unit_price: i64,
    pub quantity: u32,
    pub category: Category,
}

impl CartItem {
    pub fn line_total(&self) -> Result<i64, CartError> {
        self.unit_price
            .checked_mul(i64::from(self.quantity))
            .ok_or(CartError::Overflow)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Item {0} is not in the cart")]
    UnknownItem(String),

    #[error("Quantity must be at least 1")]
    EmptyQuantity,

    #[error("Price must not be negative")]
    NegativePrice,

    #[error("Cart amount is too large")]
    Overflow,
}

/// In-memory cart, kept for the lifetime of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    items: Vec<CartItem>,
    delivery_fee: i64,
}

impl Cart {
    pub fn new(delivery_fee: i64) -> Self {
        Self {
            items: Vec::new(),
            delivery_fee,
        }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add `item`, merging its quantity into an existing line with the same id.
    pub fn add(&mut self, item: CartItem) -> Result<(), CartError> {
        if item.quantity == 0 {
            return Err(CartError::EmptyQuantity);
        }
        if item.unit_price < 0 {
            return Err(CartError::NegativePrice);
        }
        item.line_total()?;

        match self.items.iter_mut().find(|line| line.id == item.id) {
            Some(line) => {
                let quantity = line
                    .quantity
                    .checked_add(item.quantity)
                    .ok_or(CartError::Overflow)?;
                let merged = CartItem {
                    quantity,
                    ..line.clone()
                };
                merged.line_total()?;
                *line = merged;
            }
            None => self.items.push(item),
        }
        Ok(())
    }

    /// Change a line's quantity by `delta`. A line that drops to zero is
    /// removed; the new quantity is returned.
    pub fn update_quantity(&mut self, id: &str, delta: i64) -> Result<u32, CartError> {
        let index = self.position(id)?;
        let updated = i64::from(self.items[index].quantity)
            .checked_add(delta)
            .ok_or(CartError::Overflow)?;

        if updated <= 0 {
            let removed = self.items.remove(index);
            debug!(item_id = %removed.id, "Cart line removed");
            return Ok(0);
        }

        let quantity = u32::try_from(updated).map_err(|_| CartError::Overflow)?;
        let line = &mut self.items[index];
        CartItem {
            quantity,
            ..line.clone()
        }
        .line_total()?;
        line.quantity = quantity;
        Ok(quantity)
    }

    pub fn remove(&mut self, id: &str) -> Result<CartItem, CartError> {
        let index = self.position(id)?;
        Ok(self.items.remove(index))
    }

    pub fn subtotal(&self) -> Result<i64, CartError> {
        self.items.iter().try_fold(0i64, |sum, line| {
            sum.checked_add(line.line_total()?)
                .ok_or(CartError::Overflow)
        })
    }

    /// Flat fee, waived for an empty cart
    pub fn delivery_fee(&self) -> i64 {
        if self.items.is_empty() {
            0
        } else {
            self.delivery_fee
        }
    }

    pub fn total(&self) -> Result<i64, CartError> {
        self.subtotal()?
            .checked_add(self.delivery_fee())
            .ok_or(CartError::Overflow)
    }

    /// Number of units across all lines
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |count, line| count.saturating_add(line.quantity))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    fn position(&self, id: &str) -> Result<usize, CartError> {
        self.items
            .iter()
            .position(|line| line.id == id)
            .ok_or_else(|| CartError::UnknownItem(id.to_string()))
    }
}
