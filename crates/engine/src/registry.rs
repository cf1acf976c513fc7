use std::cell::{Cell, OnceCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use storefront_core::{Catalog, Markup, MountId, OverlayId, OverlayKind, Payload};
use tracing::{debug, warn};

use crate::cart::{CartStore, SubscriptionId};
use crate::config::StoreConfig;
use crate::host::{Patch, Surface};
use crate::state::ActiveOverlay;

/// Read-only data available while rendering.
pub struct RenderContext<'a> {
    pub catalog: &'a Catalog,
    pub cart: &'a CartStore,
    pub config: &'a StoreConfig,
}

/// What an interaction inside an overlay (or the chrome) asks the storefront
/// to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Close,
    OpenMenu,
    LoadAction { action: OverlayId, payload: Payload },
    AddToCart { product_id: String },
    ChangeQuantity { item_id: String, delta: i32 },
    RemoveItem { item_id: String },
    ClearCart,
    BeginCheckout,
    CopyText { text: String, status_node: String },
    SubmitDeletion,
}

/// A cart-derived value displayed in a node of the overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveValue {
    ItemCount,
    Subtotal,
    Total,
    LineQuantity(String),
    LineTotal(String),
}

impl LiveValue {
    pub fn text(&self, cart: &CartStore) -> String {
        match self {
            LiveValue::ItemCount => cart.item_count().to_string(),
            LiveValue::Subtotal | LiveValue::Total => cart.formatted_total(),
            LiveValue::LineQuantity(id) => cart.item(id).map(|i| i.quantity).unwrap_or(0).to_string(),
            LiveValue::LineTotal(id) => cart
                .item(id)
                .map(|i| i.line_total().to_string())
                .unwrap_or_default(),
        }
    }
}

/// Collected by `OverlayContent::attach`.
#[derive(Debug, Default)]
pub struct Wiring {
    clicks: BTreeMap<String, Command>,
    submits: BTreeMap<String, Command>,
    live: Vec<(String, LiveValue)>,
    rerender_on_structure: bool,
}

impl Wiring {
    pub fn on_click(&mut self, element: impl Into<String>, command: Command) {
        self.clicks.insert(element.into(), command);
    }

    pub fn on_submit(&mut self, form: impl Into<String>, command: Command) {
        self.submits.insert(form.into(), command);
    }

    pub fn live(&mut self, node: impl Into<String>, value: LiveValue) {
        self.live.push((node.into(), value));
    }

    /// Re-render in place when cart lines are added or removed.
    pub fn rerender_on_cart_structure(&mut self) {
        self.rerender_on_structure = true;
    }

    fn watches_cart(&self) -> bool {
        self.rerender_on_structure || !self.live.is_empty()
    }
}

pub trait OverlayContent {
    fn render(&self, payload: &Payload, ctx: &RenderContext<'_>) -> Markup;

    fn attach(&self, payload: &Payload, ctx: &RenderContext<'_>, wiring: &mut Wiring);
}

pub type Provider = fn() -> Box<dyn OverlayContent>;

struct RegistryEntry {
    kind: OverlayKind,
    provider: Provider,
    loaded: OnceCell<Box<dyn OverlayContent>>,
}

/// Maps overlay ids to content providers. Providers are constructed on first
/// use and cached.
pub struct OverlayRegistry {
    entries: BTreeMap<OverlayId, RegistryEntry>,
    fallback: Box<dyn OverlayContent>,
}

impl OverlayRegistry {
    pub fn new(fallback: Box<dyn OverlayContent>) -> Self {
        Self {
            entries: BTreeMap::new(),
            fallback,
        }
    }

    pub fn register(&mut self, id: impl Into<OverlayId>, kind: OverlayKind, provider: Provider) {
        self.entries.insert(
            id.into(),
            RegistryEntry {
                kind,
                provider,
                loaded: OnceCell::new(),
            },
        );
    }

    pub fn contains(&self, id: &OverlayId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn kind_of(&self, id: &OverlayId) -> Option<OverlayKind> {
        self.entries.get(id).map(|e| e.kind)
    }

    pub fn is_loaded(&self, id: &OverlayId) -> bool {
        self.entries.get(id).is_some_and(|e| e.loaded.get().is_some())
    }

    /// Content for `id`, or the fallback error overlay.
    pub fn resolve(&self, id: &OverlayId) -> &dyn OverlayContent {
        match self.entries.get(id) {
            Some(entry) => entry
                .loaded
                .get_or_init(|| {
                    debug!(overlay = %id, "loading overlay content");
                    (entry.provider)()
                })
                .as_ref(),
            None => {
                warn!(overlay = %id, "no content registered; rendering error overlay");
                self.fallback.as_ref()
            }
        }
    }
}

/// How much of the mounted overlay a cart change invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Staleness {
    Fresh,
    Values,
    Structure,
}

struct MountedOverlay {
    mount: MountId,
    kind: OverlayKind,
    id: OverlayId,
    payload: Payload,
    wiring: Wiring,
    subscription: Option<SubscriptionId>,
    staleness: Rc<Cell<Staleness>>,
}

struct PendingRemoval {
    kind: OverlayKind,
    mount: MountId,
    due_ms: u64,
}

/// Owns the single mounted overlay: its interaction bindings, its live
/// regions and its cart subscription all live and die with the mount.
pub struct OverlayRenderer {
    registry: OverlayRegistry,
    mounted: Option<MountedOverlay>,
    pending: Vec<PendingRemoval>,
    next_mount: MountId,
    close_transition_ms: u64,
}

impl OverlayRenderer {
    pub fn new(registry: OverlayRegistry, config: &StoreConfig) -> Self {
        Self {
            registry,
            mounted: None,
            pending: Vec::new(),
            next_mount: MountId::first(),
            close_transition_ms: config.close_transition_ms,
        }
    }

    pub fn registry(&self) -> &OverlayRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut OverlayRegistry {
        &mut self.registry
    }

    pub fn mounted_id(&self) -> Option<&OverlayId> {
        self.mounted.as_ref().map(|m| &m.id)
    }

    pub fn mounted_mount(&self) -> Option<MountId> {
        self.mounted.as_ref().map(|m| m.mount)
    }

    pub fn pending_removals(&self) -> usize {
        self.pending.len()
    }

    pub fn click_binding(&self, element: &str) -> Option<&Command> {
        self.mounted.as_ref()?.wiring.clicks.get(element)
    }

    pub fn submit_binding(&self, form: &str) -> Option<&Command> {
        self.mounted.as_ref()?.wiring.submits.get(form)
    }

    /// Render `overlay` into its slot and wire it up.
    pub fn mount(
        &mut self,
        overlay: &ActiveOverlay,
        catalog: &Catalog,
        config: &StoreConfig,
        cart: &mut CartStore,
        surface: &mut dyn Surface,
    ) -> MountId {
        let mount = self.next_mount;
        self.next_mount = mount.next();

        let (markup, wiring) = {
            let ctx = RenderContext { catalog, cart: &*cart, config };
            let content = self.registry.resolve(&overlay.id);
            let mut wiring = Wiring::default();
            content.attach(&overlay.payload, &ctx, &mut wiring);
            (content.render(&overlay.payload, &ctx), wiring)
        };
        surface.mount(overlay.kind, mount, markup);

        let staleness = Rc::new(Cell::new(Staleness::Fresh));
        let subscription = wiring.watches_cart().then(|| {
            let flag = Rc::clone(&staleness);
            cart.subscribe(move |change| {
                let level = if change.is_structural() {
                    Staleness::Structure
                } else {
                    Staleness::Values
                };
                flag.set(flag.get().max(level));
            })
        });

        debug!(overlay = %overlay.id, %mount, bindings = wiring.clicks.len(), "mounted overlay");
        self.mounted = Some(MountedOverlay {
            mount,
            kind: overlay.kind,
            id: overlay.id.clone(),
            payload: overlay.payload.clone(),
            wiring,
            subscription,
            staleness,
        });
        mount
    }

    /// Tear down the mounted overlay: bindings and cart subscription go now,
    /// the DOM node after the close transition.
    pub fn unmount(&mut self, cart: &mut CartStore, surface: &mut dyn Surface, now_ms: u64) {
        let Some(mounted) = self.mounted.take() else {
            return;
        };
        if let Some(subscription) = mounted.subscription {
            cart.unsubscribe(subscription);
        }
        surface.begin_close(mounted.kind, mounted.mount);
        self.pending.push(PendingRemoval {
            kind: mounted.kind,
            mount: mounted.mount,
            due_ms: now_ms.saturating_add(self.close_transition_ms),
        });
        debug!(overlay = %mounted.id, mount = %mounted.mount, "overlay closing");
    }

    /// Remove closed overlays whose transition has finished. A slot that has
    /// been reoccupied by a newer mount is left alone.
    pub fn sweep(&mut self, surface: &mut dyn Surface, now_ms: u64) {
        let (due, waiting): (Vec<_>, Vec<_>) = self.pending.drain(..).partition(|p| p.due_ms <= now_ms);
        self.pending = waiting;
        for removal in &due {
            let reoccupied = self
                .mounted
                .iter()
                .map(|m| (m.kind, m.mount))
                .chain(self.pending.iter().chain(&due).map(|p| (p.kind, p.mount)))
                .any(|(kind, mount)| kind == removal.kind && mount > removal.mount);
            if reoccupied {
                debug!(mount = %removal.mount, "slot reused; skipping removal");
                continue;
            }
            surface.unmount(removal.kind, removal.mount);
        }
    }

    pub fn patch(&self, surface: &mut dyn Surface, node: &str, patch: Patch) {
        match &self.mounted {
            Some(mounted) => surface.patch(mounted.mount, node, patch),
            None => debug!(node, "patch with nothing mounted"),
        }
    }

    /// Bring the mounted overlay up to date with the cart: patch live nodes
    /// for value changes, re-render for structural ones.
    pub fn refresh(&mut self, ctx: &RenderContext<'_>, surface: &mut dyn Surface) {
        let Some(mounted) = self.mounted.as_mut() else {
            return;
        };
        let staleness = mounted.staleness.replace(Staleness::Fresh);
        if staleness == Staleness::Fresh {
            return;
        }

        if staleness == Staleness::Structure && mounted.wiring.rerender_on_structure {
            let content = self.registry.resolve(&mounted.id);
            let markup = content.render(&mounted.payload, ctx);
            let mut wiring = Wiring::default();
            content.attach(&mounted.payload, ctx, &mut wiring);
            surface.rerender(mounted.kind, mounted.mount, markup);
            mounted.wiring = wiring;
            debug!(overlay = %mounted.id, "re-rendered after cart change");
            return;
        }

        for (node, value) in &mounted.wiring.live {
            surface.patch(mounted.mount, node, Patch::Text(value.text(ctx.cart)));
        }
    }
}

#[cfg(test)]
mod tests {
    use storefront_core::{CartItem, EntryId, Money};
    use storefront_storage::SqliteStorage;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Mount(OverlayKind, MountId),
        Rerender(MountId),
        BeginClose(MountId),
        Unmount(OverlayKind, MountId),
        Patch(MountId, String, Patch),
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
    }

    impl Surface for Recorder {
        fn mount(&mut self, kind: OverlayKind, mount: MountId, _markup: Markup) {
            self.calls.push(Call::Mount(kind, mount));
        }

        fn rerender(&mut self, _kind: OverlayKind, mount: MountId, _markup: Markup) {
            self.calls.push(Call::Rerender(mount));
        }

        fn begin_close(&mut self, _kind: OverlayKind, mount: MountId) {
            self.calls.push(Call::BeginClose(mount));
        }

        fn unmount(&mut self, kind: OverlayKind, mount: MountId) {
            self.calls.push(Call::Unmount(kind, mount));
        }

        fn patch(&mut self, mount: MountId, node: &str, patch: Patch) {
            self.calls.push(Call::Patch(mount, node.to_string(), patch));
        }
    }

    struct Counter;

    impl OverlayContent for Counter {
        fn render(&self, _payload: &Payload, ctx: &RenderContext<'_>) -> Markup {
            Markup::new(format!("<span data-node=\"count\">{}</span>", ctx.cart.item_count()))
        }

        fn attach(&self, _payload: &Payload, _ctx: &RenderContext<'_>, wiring: &mut Wiring) {
            wiring.on_click("close", Command::Close);
            wiring.live("count", LiveValue::ItemCount);
        }
    }

    struct Listing;

    impl OverlayContent for Listing {
        fn render(&self, _payload: &Payload, ctx: &RenderContext<'_>) -> Markup {
            Markup::new(format!("<ul>{}</ul>", ctx.cart.items().len()))
        }

        fn attach(&self, _payload: &Payload, _ctx: &RenderContext<'_>, wiring: &mut Wiring) {
            wiring.rerender_on_cart_structure();
            wiring.live("total", LiveValue::Total);
        }
    }

    struct Plain;

    impl OverlayContent for Plain {
        fn render(&self, _payload: &Payload, _ctx: &RenderContext<'_>) -> Markup {
            Markup::new("<p>plain</p>")
        }

        fn attach(&self, _payload: &Payload, _ctx: &RenderContext<'_>, wiring: &mut Wiring) {
            wiring.on_click("close", Command::Close);
        }
    }

    struct Fixture {
        renderer: OverlayRenderer,
        cart: CartStore,
        catalog: Catalog,
        config: StoreConfig,
        surface: Recorder,
    }

    impl Fixture {
        fn new() -> Self {
            let config = StoreConfig::default();
            let mut registry = OverlayRegistry::new(Box::new(Plain));
            registry.register("counter", OverlayKind::Module, || -> Box<dyn OverlayContent> {
                Box::new(Counter)
            });
            registry.register("listing", OverlayKind::Module, || -> Box<dyn OverlayContent> {
                Box::new(Listing)
            });
            registry.register("menu", OverlayKind::Menu, || -> Box<dyn OverlayContent> {
                Box::new(Plain)
            });
            let storage = SqliteStorage::open_in_memory().unwrap();
            Self {
                renderer: OverlayRenderer::new(registry, &config),
                cart: CartStore::load(Box::new(storage), "cart").unwrap(),
                catalog: Catalog::default(),
                config,
                surface: Recorder::default(),
            }
        }

        fn mount(&mut self, kind: OverlayKind, id: &str) -> MountId {
            let overlay = ActiveOverlay {
                kind,
                id: OverlayId::from(id),
                payload: Payload::new(),
                entry: EntryId::new(),
                fragment: format!("#{id}"),
            };
            self.renderer
                .mount(&overlay, &self.catalog, &self.config, &mut self.cart, &mut self.surface)
        }

        fn unmount(&mut self, now: u64) {
            self.renderer.unmount(&mut self.cart, &mut self.surface, now);
        }

        fn refresh(&mut self) {
            let ctx = RenderContext {
                catalog: &self.catalog,
                cart: &self.cart,
                config: &self.config,
            };
            self.renderer.refresh(&ctx, &mut self.surface);
        }

        fn add(&mut self, id: &str) {
            let item = CartItem {
                id: id.into(),
                name: id.into(),
                price: Money::from_cents(1000),
                section: "prints".into(),
                image: None,
                quantity: 1,
            };
            self.cart.add_to_cart(item, 1).unwrap();
        }
    }

    #[test]
    fn unknown_id_resolves_to_fallback() {
        let fixture = Fixture::new();
        let registry = fixture.renderer.registry();
        assert!(!registry.contains(&OverlayId::from("nope")));
        let markup = registry
            .resolve(&OverlayId::from("nope"))
            .render(&Payload::new(), &RenderContext {
                catalog: &fixture.catalog,
                cart: &fixture.cart,
                config: &fixture.config,
            });
        assert!(markup.contains("plain"));
        assert!(!registry.is_loaded(&OverlayId::from("nope")));
    }

    #[test]
    fn mount_wires_bindings_and_subscription() {
        let mut fx = Fixture::new();
        let mount = fx.mount(OverlayKind::Module, "counter");
        assert_eq!(fx.surface.calls, vec![Call::Mount(OverlayKind::Module, mount)]);
        assert_eq!(fx.renderer.click_binding("close"), Some(&Command::Close));
        assert_eq!(fx.renderer.click_binding("other"), None);
        assert_eq!(fx.cart.subscriber_count(), 1);

        fx.unmount(0);
        assert_eq!(fx.cart.subscriber_count(), 0);
        assert_eq!(fx.renderer.click_binding("close"), None);
        assert_eq!(fx.renderer.pending_removals(), 1);
    }

    #[test]
    fn plain_content_does_not_subscribe() {
        let mut fx = Fixture::new();
        fx.mount(OverlayKind::Menu, "menu");
        assert_eq!(fx.cart.subscriber_count(), 0);
    }

    #[test]
    fn value_change_patches_live_nodes() {
        let mut fx = Fixture::new();
        let mount = fx.mount(OverlayKind::Module, "counter");
        fx.add("a");
        fx.refresh();
        assert_eq!(
            fx.surface.calls.last(),
            Some(&Call::Patch(mount, "count".into(), Patch::Text("1".into())))
        );

        let before = fx.surface.calls.len();
        fx.refresh();
        assert_eq!(fx.surface.calls.len(), before, "nothing stale, nothing patched");
    }

    #[test]
    fn structural_change_rerenders_when_opted_in() {
        let mut fx = Fixture::new();
        let mount = fx.mount(OverlayKind::Module, "listing");
        fx.add("a");
        fx.refresh();
        assert_eq!(fx.surface.calls.last(), Some(&Call::Rerender(mount)));
        assert_eq!(fx.renderer.mounted_mount(), Some(mount));

        fx.cart.update_quantity("a", 3).unwrap();
        fx.refresh();
        assert_eq!(
            fx.surface.calls.last(),
            Some(&Call::Patch(mount, "total".into(), Patch::Text("$30.00".into())))
        );
    }

    #[test]
    fn removal_waits_for_transition() {
        let mut fx = Fixture::new();
        let mount = fx.mount(OverlayKind::Module, "counter");
        fx.unmount(1_000);

        fx.renderer.sweep(&mut fx.surface, 1_100);
        assert!(!fx.surface.calls.contains(&Call::Unmount(OverlayKind::Module, mount)));

        fx.renderer.sweep(&mut fx.surface, 1_300);
        assert!(fx.surface.calls.contains(&Call::Unmount(OverlayKind::Module, mount)));
        assert_eq!(fx.renderer.pending_removals(), 0);
    }

    #[test]
    fn removal_skips_reoccupied_slot() {
        let mut fx = Fixture::new();
        let first = fx.mount(OverlayKind::Module, "counter");
        fx.unmount(0);
        let second = fx.mount(OverlayKind::Module, "listing");
        assert!(second > first);

        fx.renderer.sweep(&mut fx.surface, 10_000);
        assert!(
            !fx.surface
                .calls
                .iter()
                .any(|c| matches!(c, Call::Unmount(..))),
            "stale removal must not touch the new mount"
        );
        assert_eq!(fx.renderer.mounted_id(), Some(&OverlayId::from("listing")));
    }

    #[test]
    fn removal_of_other_kind_still_runs() {
        let mut fx = Fixture::new();
        let menu = fx.mount(OverlayKind::Menu, "menu");
        fx.unmount(0);
        fx.mount(OverlayKind::Module, "counter");

        fx.renderer.sweep(&mut fx.surface, 300);
        assert!(fx.surface.calls.contains(&Call::Unmount(OverlayKind::Menu, menu)));
    }
}
