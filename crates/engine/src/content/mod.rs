mod cart;
mod checkout;
mod contact;
mod delete_data;
mod error;
mod menu;
mod products;

use storefront_core::{CoreError, OverlayId, OverlayKind};

use crate::registry::{OverlayContent, OverlayRegistry, Provider};

pub use cart::CartOverlay;
pub use checkout::CheckoutOverlay;
pub use contact::{COPY_STATUS_NODE, ContactOverlay};
pub use delete_data::{DELETE_FORM, DELETE_STATUS_NODE, DeleteDataOverlay};
pub use error::ErrorOverlay;
pub use menu::MenuOverlay;
pub use products::ProductsOverlay;

pub const CHECKOUT_STATUS_NODE: &str = "checkout-status";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinOverlay {
    Menu,
    Products,
    Cart,
    Checkout,
    Contact,
    DeleteData,
}

impl BuiltinOverlay {
    pub const ALL: [BuiltinOverlay; 6] = [
        Self::Menu,
        Self::Products,
        Self::Cart,
        Self::Checkout,
        Self::Contact,
        Self::DeleteData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Menu => "menu",
            Self::Products => "products",
            Self::Cart => "cart",
            Self::Checkout => "checkout",
            Self::Contact => "contact",
            Self::DeleteData => "delete-data",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|o| o.as_str() == s)
            .ok_or_else(|| CoreError::InvalidData(format!("unknown overlay: {s}")))
    }

    pub fn id(&self) -> OverlayId {
        OverlayId::new(self.as_str())
    }

    pub fn kind(&self) -> OverlayKind {
        match self {
            Self::Menu => OverlayKind::Menu,
            _ => OverlayKind::Module,
        }
    }
}

/// Registry with every built-in overlay and the error fallback.
pub fn builtin_registry() -> OverlayRegistry {
    let mut registry = OverlayRegistry::new(Box::new(ErrorOverlay));
    for overlay in BuiltinOverlay::ALL {
        let provider: Provider = match overlay {
            BuiltinOverlay::Menu => || -> Box<dyn OverlayContent> { Box::new(MenuOverlay) },
            BuiltinOverlay::Products => || -> Box<dyn OverlayContent> { Box::new(ProductsOverlay) },
            BuiltinOverlay::Cart => || -> Box<dyn OverlayContent> { Box::new(CartOverlay) },
            BuiltinOverlay::Checkout => || -> Box<dyn OverlayContent> { Box::new(CheckoutOverlay) },
            BuiltinOverlay::Contact => || -> Box<dyn OverlayContent> { Box::new(ContactOverlay) },
            BuiltinOverlay::DeleteData => || -> Box<dyn OverlayContent> { Box::new(DeleteDataOverlay) },
        };
        registry.register(overlay.id(), overlay.kind(), provider);
    }
    registry
}

/// Shared header with the close affordance.
fn header(title: &str) -> String {
    format!(
        r#"<header class="overlay-header"><h2>{}</h2><button class="overlay-close" data-action="close" aria-label="Close">&times;</button></header>"#,
        storefront_core::markup::escape(title)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip() {
        for overlay in BuiltinOverlay::ALL {
            assert_eq!(BuiltinOverlay::parse(overlay.as_str()).unwrap(), overlay);
        }
        assert!(BuiltinOverlay::parse("admin").is_err());
    }

    #[test]
    fn registry_is_lazy() {
        let registry = builtin_registry();
        let cart = BuiltinOverlay::Cart.id();
        assert!(registry.contains(&cart));
        assert_eq!(registry.kind_of(&BuiltinOverlay::Menu.id()), Some(OverlayKind::Menu));
        assert!(!registry.is_loaded(&cart));
        registry.resolve(&cart);
        assert!(registry.is_loaded(&cart));
        assert!(!registry.is_loaded(&BuiltinOverlay::Contact.id()));
    }
}
