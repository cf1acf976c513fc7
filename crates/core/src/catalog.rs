use serde::{Deserialize, Serialize};

use crate::cart::CartItem;
use crate::money::Money;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: Money,
    pub section: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl Product {
    pub fn to_cart_item(&self, quantity: u32) -> CartItem {
        CartItem {
            id: self.id.clone(),
            name: self.name.clone(),
            price: self.price,
            section: self.section.clone(),
            image: self.image.clone(),
            quantity,
        }
    }
}

/// Static product data shown by the storefront.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Section names in order of first appearance.
    pub fn sections(&self) -> Vec<&str> {
        let mut sections: Vec<&str> = Vec::new();
        for product in &self.products {
            if !sections.contains(&product.section.as_str()) {
                sections.push(&product.section);
            }
        }
        sections
    }

    pub fn in_section<'a>(&'a self, section: &'a str) -> impl Iterator<Item = &'a Product> + 'a {
        self.products.iter().filter(move |p| p.section == section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, section: &str) -> Product {
        Product {
            id: id.into(),
            name: id.to_uppercase(),
            price: Money::from_cents(100),
            section: section.into(),
            image: None,
            description: String::new(),
        }
    }

    #[test]
    fn sections_keep_first_seen_order() {
        let catalog = Catalog::new(vec![
            product("a", "prints"),
            product("b", "workshops"),
            product("c", "prints"),
        ]);
        assert_eq!(catalog.sections(), vec!["prints", "workshops"]);
        assert_eq!(catalog.in_section("prints").count(), 2);
        assert!(catalog.product("b").is_some());
        assert!(catalog.product("zzz").is_none());
    }
}
