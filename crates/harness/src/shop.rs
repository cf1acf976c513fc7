use std::collections::BTreeMap;

use storefront_core::{Catalog, Money, Product};
use storefront_engine::{EngineError, Host, StoreConfig, Storefront, UiEvent};
use storefront_storage::{KeyValueStore, SqliteStorage};

use crate::{FakeApi, FakeClipboard, FakeGateway, ManualClock, SimulatedBrowser, SimulatedDocument};

pub const LANDING_URL: &str = "/shop";

fn product(id: &str, name: &str, cents: i64, section: &str) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        price: Money::from_cents(cents),
        section: section.to_string(),
        image: None,
        description: String::new(),
    }
}

pub fn sample_catalog() -> Catalog {
    Catalog::new(vec![
        product("print-small", "Small Print", 1299, "prints"),
        product("print-large", "Large Print", 2998, "prints"),
        product("workshop-intro", "Intro Workshop", 4500, "workshops"),
        product("tote", "Canvas Tote", 2450, "merch"),
    ])
}

/// A storefront wired to simulated host pieces, with handles kept for
/// inspection.
pub struct TestShop {
    pub store: Storefront,
    pub browser: SimulatedBrowser,
    pub document: SimulatedDocument,
    pub clock: ManualClock,
    pub api: FakeApi,
    pub clipboard: FakeClipboard,
    pub gateway: FakeGateway,
}

impl TestShop {
    pub fn new() -> Result<Self, EngineError> {
        Self::at(LANDING_URL)
    }

    /// Page load at `url`, e.g. a deep link.
    pub fn at(url: &str) -> Result<Self, EngineError> {
        let storage = SqliteStorage::open_in_memory()?;
        Self::build(url, StoreConfig::default(), Box::new(storage))
    }

    pub fn with_storage(path: &str) -> Result<Self, EngineError> {
        let storage = SqliteStorage::open(path)?;
        Self::build(LANDING_URL, StoreConfig::default(), Box::new(storage))
    }

    pub fn build(
        url: &str,
        config: StoreConfig,
        storage: Box<dyn KeyValueStore>,
    ) -> Result<Self, EngineError> {
        let browser = SimulatedBrowser::new(url);
        let document = SimulatedDocument::new();
        let clock = ManualClock::new(10_000);
        let api = FakeApi::default();
        let clipboard = FakeClipboard::default();
        let gateway = FakeGateway::default();

        let host = Host {
            history: Box::new(browser.clone()),
            surface: Box::new(document.clone()),
            chrome: Box::new(document.clone()),
            clock: Box::new(clock.clone()),
            clipboard: Box::new(clipboard.clone()),
            api: Box::new(api.clone()),
            checkout: Box::new(gateway.clone()),
        };
        let mut store = Storefront::new(config, sample_catalog(), storage, host)?;
        store.boot();

        Ok(Self {
            store,
            browser,
            document,
            clock,
            api,
            clipboard,
            gateway,
        })
    }

    pub fn click(&mut self, element: &str) {
        self.store.handle(UiEvent::Click { element: element.to_string() });
        self.settle();
    }

    pub fn submit(&mut self, form: &str, fields: &[(&str, &str)]) {
        let fields: BTreeMap<String, String> = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.store.handle(UiEvent::Submit { form: form.to_string(), fields });
        self.settle();
    }

    pub fn press_key(&mut self, key: &str) {
        self.store.handle(UiEvent::KeyDown { key: key.to_string() });
        self.settle();
    }

    /// A person pressing Back. People are slower than the guard window.
    pub fn press_back(&mut self) -> bool {
        self.clear_guard();
        let moved = self.browser.user_back();
        self.settle();
        moved
    }

    pub fn press_forward(&mut self) -> bool {
        self.clear_guard();
        let moved = self.browser.user_forward();
        self.settle();
        moved
    }

    /// Deliver queued popstate events at the current time.
    pub fn settle(&mut self) {
        for _ in 0..self.browser.take_popstates() {
            self.store.handle(UiEvent::PopState);
        }
    }

    pub fn advance(&mut self, ms: u64) {
        self.clock.advance(ms);
        self.store.handle(UiEvent::Tick);
        self.settle();
    }

    fn clear_guard(&mut self) {
        let window = self.store.config().guard_window_ms;
        self.advance(window + 1);
    }

    pub fn active_id(&self) -> Option<String> {
        self.store.active().map(|a| a.id.as_str().to_string())
    }
}
