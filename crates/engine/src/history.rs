use storefront_core::{
    EntryId, Fragment, HistoryRecord, OverlayId, OverlayKind, Payload,
    fragment::hash_overlay_id,
};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::host::History;
use crate::state::{ActiveOverlay, OverlayStateStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCause {
    /// A close button, Escape, or content asking to close.
    Affordance,
    /// The browser already left the overlay's entry.
    HistoryBack,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Opened {
        active: ActiveOverlay,
        replaced: Option<ActiveOverlay>,
        /// Reopened from an existing entry (Forward) rather than pushed.
        restored: bool,
    },
    Closed {
        closed: ActiveOverlay,
        cause: CloseCause,
    },
    /// The request conflicts with the overlay that owns the current entry.
    Blocked { requested: OverlayId },
    Unchanged,
}

/// Couples the overlay state store to the browser history stack.
///
/// Every overlay that is open owns exactly one history entry. Opening over an
/// open overlay rewrites that entry instead of pushing a second one, and a
/// close either pops the entry itself (close affordance) or finds it already
/// popped by the browser (Back). Popstate events that arrive while the guard
/// window is armed are our own and are ignored.
pub struct HistorySynchronizer {
    history: Box<dyn History>,
    state: OverlayStateStore,
    guard_window_ms: u64,
    menu_fragment: String,
}

impl HistorySynchronizer {
    pub fn new(history: Box<dyn History>, config: &StoreConfig) -> Self {
        Self {
            history,
            state: OverlayStateStore::new(),
            guard_window_ms: config.guard_window_ms,
            menu_fragment: config.menu_fragment.clone(),
        }
    }

    pub fn active(&self) -> Option<&ActiveOverlay> {
        self.state.get_active()
    }

    pub fn state(&self) -> &OverlayStateStore {
        &self.state
    }

    pub fn menu_fragment(&self) -> &str {
        &self.menu_fragment
    }

    /// Open `id`, replacing whatever is open.
    pub fn open(&mut self, kind: OverlayKind, id: OverlayId, payload: Payload, now_ms: u64) -> Transition {
        if kind == OverlayKind::Menu
            && self.state.get_active().is_some_and(|a| a.kind == OverlayKind::Module)
        {
            warn!(requested = %id, "menu requested while a module owns the history entry");
            return Transition::Blocked { requested: id };
        }

        let fragment = Fragment::format(kind, &id, &payload, &self.menu_fragment);
        let url = format!("{}{}", self.history.path(), fragment);
        let record = HistoryRecord {
            entry: EntryId::new(),
            kind,
            overlay: id.clone(),
            payload: payload.clone(),
        };
        let active = ActiveOverlay {
            kind,
            id,
            payload,
            entry: record.entry,
            fragment,
        };

        self.state.arm_guard(now_ms, self.guard_window_ms);
        match self.state.get_active() {
            Some(current) if self.location_matches(current) => {
                info!(from = %current.id, to = %active.id, "replacing previous overlay");
                self.history.replace_state(Some(record), &url);
            }
            Some(current) => {
                warn!(from = %current.id, to = %active.id, hash = %self.history.hash(), "previous overlay lost its entry; pushing");
                self.history.push_state(record, &url);
            }
            None => {
                debug!(overlay = %active.id, kind = kind.as_str(), %url, "opening overlay");
                self.history.push_state(record, &url);
            }
        }

        let replaced = self.state.set_active(active.clone());
        Transition::Opened { active, replaced, restored: false }
    }

    /// Close the active overlay from a close affordance.
    pub fn close(&mut self, now_ms: u64) -> Transition {
        let Some(closed) = self.state.clear_active() else {
            debug!("close requested with no active overlay");
            return Transition::Unchanged;
        };

        if self.location_matches(&closed) {
            self.state.arm_guard(now_ms, self.guard_window_ms);
            self.history.back();
            debug!(overlay = %closed.id, "closed overlay; popped its entry");
        } else {
            warn!(
                overlay = %closed.id,
                hash = %self.history.hash(),
                "location no longer matches overlay; leaving history untouched"
            );
        }
        Transition::Closed { closed, cause: CloseCause::Affordance }
    }

    pub fn on_popstate(&mut self, now_ms: u64) -> Transition {
        if self.state.is_navigating_programmatically(now_ms) {
            debug!("ignoring popstate during programmatic navigation");
            return Transition::Unchanged;
        }

        let landing = self.history.state();
        let Some(current) = self.state.get_active() else {
            return match landing {
                Some(record) => self.restore(record, None),
                None => {
                    self.check_foreign_fragment();
                    Transition::Unchanged
                }
            };
        };

        if self.location_matches(current) {
            debug!(overlay = %current.id, "popstate did not leave the active overlay");
            return Transition::Unchanged;
        }

        let Some(closed) = self.state.clear_active() else {
            return Transition::Unchanged;
        };
        match landing {
            Some(record) => self.restore(record, Some(closed)),
            None => {
                info!(overlay = %closed.id, "back navigation closed overlay");
                self.check_foreign_fragment();
                Transition::Closed { closed, cause: CloseCause::HistoryBack }
            }
        }
    }

    /// Turn a deep-link hash present at page load into a normal open: the
    /// landing entry is cleaned and the overlay pushed on top of it, so Back
    /// closes the overlay instead of leaving the site.
    pub fn restore_on_load(
        &mut self,
        is_registered: impl Fn(&OverlayId) -> bool,
        now_ms: u64,
    ) -> Transition {
        let hash = self.history.hash();
        let path = self.history.path();
        match Fragment::parse(&hash, &self.menu_fragment) {
            Ok(Some(fragment)) if fragment.kind == OverlayKind::Menu => {
                debug!("dropping menu fragment from landing url");
                self.history.replace_state(None, &path);
                Transition::Unchanged
            }
            Ok(Some(fragment)) if is_registered(&fragment.overlay) => {
                info!(overlay = %fragment.overlay, "restoring overlay from landing url");
                self.history.replace_state(None, &path);
                self.open(fragment.kind, fragment.overlay, fragment.payload, now_ms)
            }
            Ok(_) => Transition::Unchanged,
            Err(e) => {
                warn!(%hash, error = %e, "unparseable landing fragment");
                Transition::Unchanged
            }
        }
    }

    /// Rewrite the path of the current entry, keeping its record and hash.
    /// All history writes go through the synchronizer.
    pub fn rewrite_path(&mut self, path: &str) {
        let record = self.history.state();
        let url = format!("{path}{}", self.history.hash());
        debug!(%url, "rewriting current entry url");
        self.history.replace_state(record, &url);
    }

    fn restore(&mut self, record: HistoryRecord, closed: Option<ActiveOverlay>) -> Transition {
        let fragment = Fragment::format(record.kind, &record.overlay, &record.payload, &self.menu_fragment);
        let active = ActiveOverlay {
            kind: record.kind,
            id: record.overlay,
            payload: record.payload,
            entry: record.entry,
            fragment,
        };
        info!(overlay = %active.id, "history navigation restored overlay");
        self.state.set_active(active.clone());
        Transition::Opened { active, replaced: closed, restored: true }
    }

    /// The overlay still owns the entry the browser is on.
    fn location_matches(&self, overlay: &ActiveOverlay) -> bool {
        if self.history.state().is_some_and(|r| r.entry == overlay.entry) {
            return true;
        }
        hash_overlay_id(&self.history.hash(), &self.menu_fragment).is_some_and(|id| id == overlay.id)
    }

    fn check_foreign_fragment(&self) {
        let hash = self.history.hash();
        if let Some(id) = hash_overlay_id(&hash, &self.menu_fragment) {
            warn!(%hash, overlay = %id, "history entry carries an overlay fragment the navigator did not write");
        }
    }
}
