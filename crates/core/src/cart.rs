use serde::{Deserialize, Serialize};

use crate::money::Money;

/// One line of the cart. `quantity` is always at least 1 while the item is
/// held by a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub name: String,
    pub price: Money,
    pub section: String,
    pub image: Option<String>,
    pub quantity: u32,
}

impl CartItem {
    pub fn line_total(&self) -> Money {
        self.price * self.quantity
    }
}
