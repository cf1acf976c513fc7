pub mod cart;
pub mod catalog;
pub mod error;
pub mod fragment;
pub mod ids;
pub mod markup;
pub mod money;
pub mod payload;

pub use cart::CartItem;
pub use catalog::{Catalog, Product};
pub use error::CoreError;
pub use fragment::{Fragment, HistoryRecord, OverlayKind};
pub use ids::*;
pub use markup::Markup;
pub use money::Money;
pub use payload::{Payload, PayloadValue};
