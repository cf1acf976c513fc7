use storefront_core::CoreError;
use storefront_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("product not found: {0}")]
    ProductNotFound(String),

    #[error("cart item not found: {0}")]
    CartItemNotFound(String),

    #[error("invalid quantity {quantity} for {item_id}")]
    InvalidQuantity { item_id: String, quantity: u32 },
}
