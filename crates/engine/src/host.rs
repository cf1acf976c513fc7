use std::time::Instant;

use storefront_core::{HistoryRecord, Markup, MountId, OverlayKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// Browser session history for the current tab. A wasm build implements
/// this and the other host traits over `window.history`, the document and
/// `navigator.clipboard`; the test harness implements them in memory.
pub trait History {
    /// Current hash including the leading `#`, or an empty string.
    fn hash(&self) -> String;

    fn path(&self) -> String;

    /// Record stored with the current entry, if it is one of ours.
    fn state(&self) -> Option<HistoryRecord>;

    fn push_state(&mut self, record: HistoryRecord, url: &str);

    fn replace_state(&mut self, record: Option<HistoryRecord>, url: &str);

    /// Asynchronous in browsers: the matching popstate arrives later.
    fn back(&mut self);
}

/// Content of a node patched in place inside a mounted overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch {
    Text(String),
}

/// The document region overlays are rendered into. There is one slot per
/// overlay kind; a new mount into a slot replaces whatever it held.
pub trait Surface {
    fn mount(&mut self, kind: OverlayKind, mount: MountId, markup: Markup);

    /// Replace the markup of a live mount without a close transition.
    fn rerender(&mut self, kind: OverlayKind, mount: MountId, markup: Markup);

    /// Start the CSS close transition.
    fn begin_close(&mut self, kind: OverlayKind, mount: MountId);

    fn unmount(&mut self, kind: OverlayKind, mount: MountId);

    fn patch(&mut self, mount: MountId, node: &str, patch: Patch);
}

/// Shows or hides the persistent page chrome (main container, input bar).
pub trait ChromeToggle {
    fn set_chrome_visible(&mut self, visible: bool);
}

pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Milliseconds since the clock was created.
pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), HostError>;
}
