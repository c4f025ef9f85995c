use crate::error::{CommerceError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single cart line: one product and how many units of it were added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "price")]
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl CartItem {
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        unit_price: Decimal,
        quantity: u32,
    ) -> Result<Self> {
        if unit_price < Decimal::ZERO {
            return Err(CommerceError::ValidationError(
                "Price must not be negative".to_string(),
            ));
        }
        if quantity == 0 {
            return Err(CommerceError::ValidationError(
                "Quantity must be positive".to_string(),
            ));
        }
        Ok(Self {
            product_id: product_id.into(),
            name: name.into(),
            unit_price,
            quantity,
        })
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// The cart as captured for one checkout attempt.
///
/// Immutable once taken: the attempt keeps paying for exactly these items even
/// if the live cart changes while the user is away in a wallet app.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CartSnapshot {
    items: Vec<CartItem>,
}

impl CartSnapshot {
    pub fn new(items: Vec<CartItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of `unit_price * quantity` over every line.
    pub fn total_amount(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// Live cart state with the add/remove semantics of the shop screens.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one unit of the product, appending a new line the first time it is seen.
    pub fn add(&mut self, product: &CartItem) {
        match self
            .items
            .iter_mut()
            .find(|item| item.product_id == product.product_id)
        {
            Some(existing) => existing.quantity += 1,
            None => self.items.push(CartItem {
                quantity: 1,
                ..product.clone()
            }),
        }
    }

    /// Inserts a whole line, merging quantities with an existing line for the same product.
    pub fn insert(&mut self, item: CartItem) {
        match self
            .items
            .iter_mut()
            .find(|existing| existing.product_id == item.product_id)
        {
            Some(existing) => existing.quantity += item.quantity,
            None => self.items.push(item),
        }
    }

    /// Removes one unit, dropping the line when its last unit goes.
    pub fn remove(&mut self, product_id: &str) {
        if let Some(index) = self
            .items
            .iter()
            .position(|item| item.product_id == product_id)
        {
            if self.items[index].quantity > 1 {
                self.items[index].quantity -= 1;
            } else {
                self.items.remove(index);
            }
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn quantity_of(&self, product_id: &str) -> u32 {
        self.items
            .iter()
            .find(|item| item.product_id == product_id)
            .map_or(0, |item| item.quantity)
    }

    pub fn count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot::new(self.items.clone())
    }
}
