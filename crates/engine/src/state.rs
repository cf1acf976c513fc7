use storefront_core::{EntryId, OverlayId, OverlayKind, Payload};

/// The overlay currently shown, together with the history entry that was
/// pushed (or restored) for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveOverlay {
    pub kind: OverlayKind,
    pub id: OverlayId,
    pub payload: Payload,
    pub entry: EntryId,
    /// Hash (with `#`) the overlay was opened under.
    pub fragment: String,
}

/// Single source of truth for "what is open". Only the history synchronizer
/// writes to it.
#[derive(Debug, Default)]
pub struct OverlayStateStore {
    active: Option<ActiveOverlay>,
    /// Popstate events before this instant are treated as self-triggered.
    guard_until_ms: u64,
}

impl OverlayStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_active(&self) -> Option<&ActiveOverlay> {
        self.active.as_ref()
    }

    pub fn is_navigating_programmatically(&self, now_ms: u64) -> bool {
        now_ms < self.guard_until_ms
    }

    pub(crate) fn set_active(&mut self, overlay: ActiveOverlay) -> Option<ActiveOverlay> {
        self.active.replace(overlay)
    }

    pub(crate) fn clear_active(&mut self) -> Option<ActiveOverlay> {
        self.active.take()
    }

    /// Refresh the guard. Never shortens a window armed by an earlier call.
    pub(crate) fn arm_guard(&mut self, now_ms: u64, window_ms: u64) {
        self.guard_until_ms = self.guard_until_ms.max(now_ms.saturating_add(window_ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay(id: &str) -> ActiveOverlay {
        ActiveOverlay {
            kind: OverlayKind::Module,
            id: OverlayId::new(id),
            payload: Payload::new(),
            entry: EntryId::new(),
            fragment: format!("#{id}"),
        }
    }

    #[test]
    fn set_overwrites_and_returns_previous() {
        let mut store = OverlayStateStore::new();
        assert!(store.get_active().is_none());
        assert!(store.set_active(overlay("cart")).is_none());
        let previous = store.set_active(overlay("contact")).unwrap();
        assert_eq!(previous.id.as_str(), "cart");
        assert_eq!(store.get_active().unwrap().id.as_str(), "contact");
        assert!(store.clear_active().is_some());
        assert!(store.clear_active().is_none());
    }

    #[test]
    fn guard_is_monotonic() {
        let mut store = OverlayStateStore::new();
        assert!(!store.is_navigating_programmatically(0));
        store.arm_guard(1_000, 100);
        assert!(store.is_navigating_programmatically(1_099));
        assert!(!store.is_navigating_programmatically(1_100));

        // A shorter window armed later must not cut the first one short.
        store.arm_guard(1_050, 10);
        assert!(store.is_navigating_programmatically(1_099));

        store.arm_guard(1_090, 100);
        assert!(store.is_navigating_programmatically(1_150));
        assert!(!store.is_navigating_programmatically(1_190));
    }
}
