use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use storefront_core::{Markup, MountId, OverlayKind};
use storefront_engine::host::{ChromeToggle, Patch, Surface};

/// What one overlay container currently holds.
#[derive(Debug, Clone)]
pub struct Slot {
    pub mount: MountId,
    pub markup: Markup,
    pub closing: bool,
    pub text: BTreeMap<String, String>,
}

#[derive(Default)]
struct Page {
    menu: Option<Slot>,
    module: Option<Slot>,
    chrome_visible: Option<bool>,
    chrome_calls: usize,
    mounts: usize,
    rerenders: usize,
    patches: usize,
    stale_unmounts: usize,
}

impl Page {
    fn slot_mut(&mut self, kind: OverlayKind) -> &mut Option<Slot> {
        match kind {
            OverlayKind::Menu => &mut self.menu,
            OverlayKind::Module => &mut self.module,
        }
    }

    fn slot_by_mount(&mut self, mount: MountId) -> Option<&mut Slot> {
        [&mut self.menu, &mut self.module]
            .into_iter()
            .filter_map(Option::as_mut)
            .find(|slot| slot.mount == mount)
    }
}

/// In-memory page: one container per overlay kind plus the page chrome.
#[derive(Clone, Default)]
pub struct SimulatedDocument {
    page: Rc<RefCell<Page>>,
}

impl SimulatedDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, kind: OverlayKind) -> Option<Slot> {
        let mut page = self.page.borrow_mut();
        page.slot_mut(kind).clone()
    }

    /// Markup of the overlay that is shown and not closing.
    pub fn visible_markup(&self, kind: OverlayKind) -> Option<Markup> {
        self.slot(kind).filter(|s| !s.closing).map(|s| s.markup)
    }

    /// Patched text of `node` in the open module, falling back to the menu.
    pub fn node_text(&self, node: &str) -> Option<String> {
        [OverlayKind::Module, OverlayKind::Menu]
            .into_iter()
            .filter_map(|kind| self.slot(kind))
            .filter(|slot| !slot.closing)
            .find_map(|slot| slot.text.get(node).cloned())
    }

    pub fn chrome_visible(&self) -> Option<bool> {
        self.page.borrow().chrome_visible
    }

    pub fn chrome_calls(&self) -> usize {
        self.page.borrow().chrome_calls
    }

    pub fn mount_count(&self) -> usize {
        self.page.borrow().mounts
    }

    pub fn rerender_count(&self) -> usize {
        self.page.borrow().rerenders
    }

    pub fn patch_count(&self) -> usize {
        self.page.borrow().patches
    }

    /// Removal requests for a mount that no longer occupies its container.
    pub fn stale_unmounts(&self) -> usize {
        self.page.borrow().stale_unmounts
    }
}

impl Surface for SimulatedDocument {
    fn mount(&mut self, kind: OverlayKind, mount: MountId, markup: Markup) {
        let mut page = self.page.borrow_mut();
        page.mounts += 1;
        *page.slot_mut(kind) = Some(Slot {
            mount,
            markup,
            closing: false,
            text: BTreeMap::new(),
        });
    }

    fn rerender(&mut self, kind: OverlayKind, mount: MountId, markup: Markup) {
        let mut page = self.page.borrow_mut();
        page.rerenders += 1;
        if let Some(slot) = page.slot_mut(kind).as_mut().filter(|s| s.mount == mount) {
            slot.markup = markup;
            slot.text.clear();
        }
    }

    fn begin_close(&mut self, kind: OverlayKind, mount: MountId) {
        let mut page = self.page.borrow_mut();
        if let Some(slot) = page.slot_mut(kind).as_mut().filter(|s| s.mount == mount) {
            slot.closing = true;
        }
    }

    fn unmount(&mut self, kind: OverlayKind, mount: MountId) {
        let mut page = self.page.borrow_mut();
        let slot = page.slot_mut(kind);
        if slot.as_ref().is_some_and(|s| s.mount == mount) {
            *slot = None;
        } else {
            page.stale_unmounts += 1;
        }
    }

    fn patch(&mut self, mount: MountId, node: &str, patch: Patch) {
        let mut page = self.page.borrow_mut();
        page.patches += 1;
        if let Some(slot) = page.slot_by_mount(mount) {
            let Patch::Text(text) = patch;
            slot.text.insert(node.to_string(), text);
        }
    }
}

impl ChromeToggle for SimulatedDocument {
    fn set_chrome_visible(&mut self, visible: bool) {
        let mut page = self.page.borrow_mut();
        page.chrome_calls += 1;
        page.chrome_visible = Some(visible);
    }
}
