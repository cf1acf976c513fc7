pub mod backend;
pub mod cart;
pub mod chrome;
pub mod config;
pub mod content;
pub mod error;
pub mod history;
pub mod host;
pub mod registry;
pub mod state;

pub use cart::{CartChange, CartStore, SubscriptionId};
pub use config::StoreConfig;
pub use error::EngineError;
pub use history::{CloseCause, HistorySynchronizer, Transition};
pub use registry::{Command, OverlayContent, OverlayRegistry, OverlayRenderer, RenderContext, Wiring};
pub use state::{ActiveOverlay, OverlayStateStore};

use std::collections::BTreeMap;

use storefront_core::{Catalog, OverlayId, OverlayKind, Payload};
use storefront_storage::KeyValueStore;
use tracing::{debug, info, warn};

use crate::backend::{
    ApiClient, CheckoutGateway, CheckoutRequest, DeletionError, DeletionOutcome, request_deletion,
};
use crate::chrome::VisibilityCoordinator;
use crate::content::{BuiltinOverlay, CHECKOUT_STATUS_NODE, DELETE_STATUS_NODE, builtin_registry};
use crate::host::{ChromeToggle, Clipboard, Clock, History, Patch, Surface};
use crate::registry::Provider;

pub const DELETION_SUBMITTED: &str = "Deletion Request Submitted";

/// Everything the storefront needs from the page it runs in.
pub struct Host {
    pub history: Box<dyn History>,
    pub surface: Box<dyn Surface>,
    pub chrome: Box<dyn ChromeToggle>,
    pub clock: Box<dyn Clock>,
    pub clipboard: Box<dyn Clipboard>,
    pub api: Box<dyn ApiClient>,
    pub checkout: Box<dyn CheckoutGateway>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Click { element: String },
    Submit { form: String, fields: BTreeMap<String, String> },
    KeyDown { key: String },
    PopState,
    /// Timer wake-up; lets deferred work such as DOM removal run.
    Tick,
}

/// "Load an action by name with a payload", used by menu items and
/// product flows.
pub trait ActionLoader {
    fn load_action(&mut self, action: OverlayId, payload: Payload);
}

/// Composition root. Owns one instance of every component and threads them
/// into each other explicitly.
pub struct Storefront {
    config: StoreConfig,
    catalog: Catalog,
    navigator: HistorySynchronizer,
    renderer: OverlayRenderer,
    chrome: VisibilityCoordinator,
    cart: CartStore,
    surface: Box<dyn Surface>,
    clock: Box<dyn Clock>,
    clipboard: Box<dyn Clipboard>,
    api: Box<dyn ApiClient>,
    checkout: Box<dyn CheckoutGateway>,
    pending_redirect: Option<String>,
}

impl Storefront {
    pub fn new(
        config: StoreConfig,
        catalog: Catalog,
        storage: Box<dyn KeyValueStore>,
        host: Host,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let cart = CartStore::load(storage, &config.cart_storage_key)?;
        let navigator = HistorySynchronizer::new(host.history, &config);
        let renderer = OverlayRenderer::new(builtin_registry(), &config);
        let chrome = VisibilityCoordinator::new(host.chrome);

        Ok(Self {
            config,
            catalog,
            navigator,
            renderer,
            chrome,
            cart,
            surface: host.surface,
            clock: host.clock,
            clipboard: host.clipboard,
            api: host.api,
            checkout: host.checkout,
            pending_redirect: None,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    pub fn active(&self) -> Option<&ActiveOverlay> {
        self.navigator.active()
    }

    pub fn navigator(&self) -> &HistorySynchronizer {
        &self.navigator
    }

    pub fn renderer(&self) -> &OverlayRenderer {
        &self.renderer
    }

    pub fn chrome_visible(&self) -> bool {
        self.chrome.is_visible()
    }

    /// Hosted checkout URL returned by the payment gateway, if any.
    pub fn pending_redirect(&self) -> Option<&str> {
        self.pending_redirect.as_deref()
    }

    pub fn take_redirect(&mut self) -> Option<String> {
        self.pending_redirect.take()
    }

    pub fn register_overlay(&mut self, id: impl Into<OverlayId>, kind: OverlayKind, provider: Provider) {
        self.renderer.registry_mut().register(id, kind, provider);
    }

    /// Page-load hook: opens the overlay named by a deep-link hash.
    pub fn boot(&mut self) {
        let now = self.clock.now_ms();
        let registry = self.renderer.registry();
        let transition = self.navigator.restore_on_load(|id| registry.contains(id), now);
        self.apply(transition, now);
    }

    pub fn handle(&mut self, event: UiEvent) {
        let now = self.clock.now_ms();
        debug!(?event, now, "ui event");
        match event {
            UiEvent::Click { element } => self.click(&element, now),
            UiEvent::Submit { form, fields } => self.submit(&form, &fields, now),
            UiEvent::KeyDown { key } if key == "Escape" => self.close_at(now),
            UiEvent::KeyDown { .. } => {}
            UiEvent::PopState => {
                let transition = self.navigator.on_popstate(now);
                self.apply(transition, now);
            }
            UiEvent::Tick => {}
        }
        self.renderer.sweep(self.surface.as_mut(), now);
        self.refresh();
    }

    pub fn open_menu(&mut self) {
        let now = self.clock.now_ms();
        self.open(BuiltinOverlay::Menu.kind(), BuiltinOverlay::Menu.id(), Payload::new(), now);
    }

    pub fn close(&mut self) {
        let now = self.clock.now_ms();
        self.close_at(now);
    }

    /// Rewrite the path of the current URL (clean-URL rewriting), keeping
    /// the overlay entry intact.
    pub fn rewrite_path(&mut self, path: &str) {
        self.navigator.rewrite_path(path);
    }

    /// Add a catalog product outside of any overlay interaction.
    pub fn add_product(&mut self, product_id: &str, quantity: u32) -> Result<(), EngineError> {
        let product = self
            .catalog
            .product(product_id)
            .ok_or_else(|| EngineError::ProductNotFound(product_id.to_string()))?;
        self.cart.add_to_cart(product.to_cart_item(quantity), quantity)?;
        self.refresh();
        Ok(())
    }

    fn click(&mut self, element: &str, now: u64) {
        if let Some(command) = self.renderer.click_binding(element).cloned() {
            self.run(command, None, now);
            return;
        }
        if self.navigator.active().is_none() && self.chrome.is_visible() {
            match element {
                "menu-toggle" => self.run(Command::OpenMenu, None, now),
                "cart-button" => self.run(
                    Command::LoadAction {
                        action: BuiltinOverlay::Cart.id(),
                        payload: Payload::new(),
                    },
                    None,
                    now,
                ),
                _ => debug!(element, "click on unbound chrome element"),
            }
            return;
        }
        debug!(element, "click with no binding");
    }

    fn submit(&mut self, form: &str, fields: &BTreeMap<String, String>, now: u64) {
        match self.renderer.submit_binding(form).cloned() {
            Some(command) => self.run(command, Some(fields), now),
            None => debug!(form, "submit with no binding"),
        }
    }

    /// Execute a command. Failures stay inside the overlay.
    fn run(&mut self, command: Command, fields: Option<&BTreeMap<String, String>>, now: u64) {
        if let Err(e) = self.execute(command, fields, now) {
            warn!(error = %e, "command failed");
        }
    }

    fn execute(
        &mut self,
        command: Command,
        fields: Option<&BTreeMap<String, String>>,
        now: u64,
    ) -> Result<(), EngineError> {
        match command {
            Command::Close => self.close_at(now),
            Command::OpenMenu => {
                self.open(BuiltinOverlay::Menu.kind(), BuiltinOverlay::Menu.id(), Payload::new(), now)
            }
            Command::LoadAction { action, payload } => self.load_action_at(action, payload, now),
            Command::AddToCart { product_id } => {
                let product = self
                    .catalog
                    .product(&product_id)
                    .ok_or_else(|| EngineError::ProductNotFound(product_id.clone()))?;
                self.cart.add_to_cart(product.to_cart_item(1), 1)?;
                info!(product = %product_id, count = self.cart.item_count(), "added to cart");
            }
            Command::ChangeQuantity { item_id, delta } => {
                let current = self
                    .cart
                    .item(&item_id)
                    .map(|i| i.quantity)
                    .ok_or_else(|| EngineError::CartItemNotFound(item_id.clone()))?;
                let next = (i64::from(current) + i64::from(delta)).clamp(0, i64::from(u32::MAX)) as u32;
                self.cart.update_quantity(&item_id, next)?;
            }
            Command::RemoveItem { item_id } => {
                if !self.cart.remove_from_cart(&item_id) {
                    return Err(EngineError::CartItemNotFound(item_id));
                }
            }
            Command::ClearCart => self.cart.clear_cart(),
            Command::BeginCheckout => self.begin_checkout(),
            Command::CopyText { text, status_node } => {
                let status = match self.clipboard.write_text(&text) {
                    Ok(()) => "Copied!",
                    Err(e) => {
                        warn!(error = %e, "clipboard write failed");
                        "Copy failed"
                    }
                };
                self.patch_text(&status_node, status);
            }
            Command::SubmitDeletion => {
                let email = fields
                    .and_then(|f| f.get("email"))
                    .map(String::as_str)
                    .unwrap_or_default();
                self.submit_deletion(email);
            }
        }
        Ok(())
    }

    fn submit_deletion(&mut self, email: &str) {
        let message = match request_deletion(self.api.as_mut(), email) {
            Ok(DeletionOutcome::RecordsFound) => format!(
                "{DELETION_SUBMITTED}. We found records linked to this email and will remove them within 30 days."
            ),
            Ok(DeletionOutcome::NoRecords) => format!(
                "{DELETION_SUBMITTED}. We found no records linked to this email; your request has been logged."
            ),
            Ok(DeletionOutcome::AcceptedAnonymously) => format!(
                "{DELETION_SUBMITTED}. We will process your request and confirm by email."
            ),
            Err(DeletionError::InvalidEmail) => "Please enter a valid email address.".to_string(),
            Err(e) => {
                warn!(error = %e, "deletion request failed");
                format!("Something went wrong: {e}. Please try again.")
            }
        };
        self.patch_text(DELETE_STATUS_NODE, &message);
    }

    fn begin_checkout(&mut self) {
        if self.cart.is_empty() {
            self.patch_text(CHECKOUT_STATUS_NODE, "Your cart is empty.");
            return;
        }
        let request = CheckoutRequest::from_items(self.cart.items(), &self.config.currency);
        match self.checkout.create_session(&request) {
            Ok(session) => {
                info!(session = %session.id, "checkout session created");
                self.pending_redirect = Some(session.url);
                self.patch_text(CHECKOUT_STATUS_NODE, "Redirecting to secure checkout...");
            }
            Err(e) => {
                warn!(error = %e, "checkout session failed");
                self.patch_text(CHECKOUT_STATUS_NODE, "Checkout is unavailable right now. Please try again.");
            }
        }
    }

    fn open(&mut self, kind: OverlayKind, id: OverlayId, payload: Payload, now: u64) {
        let transition = self.navigator.open(kind, id, payload, now);
        self.apply(transition, now);
    }

    fn close_at(&mut self, now: u64) {
        let transition = self.navigator.close(now);
        self.apply(transition, now);
    }

    fn load_action_at(&mut self, action: OverlayId, payload: Payload, now: u64) {
        let kind = self.renderer.registry().kind_of(&action).unwrap_or(OverlayKind::Module);
        self.open(kind, action, payload, now);
    }

    /// Render the outcome of a navigation transition and keep the chrome in
    /// step with it.
    fn apply(&mut self, transition: Transition, now: u64) {
        match transition {
            Transition::Opened { active, replaced, restored } => {
                if let Some(previous) = &replaced {
                    debug!(overlay = %previous.id, "unmounting replaced overlay");
                }
                self.renderer.unmount(&mut self.cart, self.surface.as_mut(), now);
                self.renderer.mount(
                    &active,
                    &self.catalog,
                    &self.config,
                    &mut self.cart,
                    self.surface.as_mut(),
                );
                self.chrome.set_chrome_visible(false);
                debug!(overlay = %active.id, restored, "overlay shown");
            }
            Transition::Closed { closed, cause } => {
                self.renderer.unmount(&mut self.cart, self.surface.as_mut(), now);
                self.chrome.set_chrome_visible(true);
                debug!(overlay = %closed.id, ?cause, "overlay hidden");
            }
            Transition::Blocked { .. } | Transition::Unchanged => {}
        }
    }

    fn refresh(&mut self) {
        let ctx = RenderContext {
            catalog: &self.catalog,
            cart: &self.cart,
            config: &self.config,
        };
        self.renderer.refresh(&ctx, self.surface.as_mut());
    }

    fn patch_text(&mut self, node: &str, text: &str) {
        self.renderer.patch(self.surface.as_mut(), node, Patch::Text(text.to_string()));
    }
}

impl ActionLoader for Storefront {
    fn load_action(&mut self, action: OverlayId, payload: Payload) {
        let now = self.clock.now_ms();
        self.load_action_at(action, payload, now);
        self.refresh();
    }
}
