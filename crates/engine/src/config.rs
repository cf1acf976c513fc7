use serde::{Deserialize, Serialize};
use storefront_core::Catalog;
use storefront_core::fragment::DEFAULT_MENU_FRAGMENT;

use crate::EngineError;

pub const DEFAULT_GUARD_WINDOW_MS: u64 = 100;
pub const DEFAULT_CLOSE_TRANSITION_MS: u64 = 300;
pub const DEFAULT_CART_STORAGE_KEY: &str = "cart";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// How long popstate events are treated as self-triggered after the
    /// navigator touches history.
    pub guard_window_ms: u64,
    /// Delay between starting an overlay's close transition and removing it.
    pub close_transition_ms: u64,
    pub cart_storage_key: String,
    pub menu_fragment: String,
    pub contact_email: String,
    pub currency: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            guard_window_ms: DEFAULT_GUARD_WINDOW_MS,
            close_transition_ms: DEFAULT_CLOSE_TRANSITION_MS,
            cart_storage_key: DEFAULT_CART_STORAGE_KEY.to_string(),
            menu_fragment: DEFAULT_MENU_FRAGMENT.to_string(),
            contact_email: "hello@aarie.ca".to_string(),
            currency: "cad".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.menu_fragment.is_empty() || self.menu_fragment.contains(['#', '?']) {
            return Err(EngineError::Config(format!(
                "menu_fragment must be a bare fragment name, got {:?}",
                self.menu_fragment
            )));
        }
        if self.cart_storage_key.is_empty() {
            return Err(EngineError::Config("cart_storage_key is empty".into()));
        }
        Ok(())
    }
}

pub fn load_catalog(json: &str) -> Result<Catalog, EngineError> {
    serde_json::from_str(json).map_err(|e| EngineError::Config(format!("catalog: {e}")))
}
