use tracing::debug;

use crate::host::ChromeToggle;

/// Keeps the page chrome hidden exactly while an overlay is shown.
pub struct VisibilityCoordinator {
    toggle: Box<dyn ChromeToggle>,
    visible: bool,
}

impl VisibilityCoordinator {
    /// The chrome starts visible; the host is told so once.
    pub fn new(mut toggle: Box<dyn ChromeToggle>) -> Self {
        toggle.set_chrome_visible(true);
        Self { toggle, visible: true }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Idempotent: repeating the current value does not reach the host.
    pub fn set_chrome_visible(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        debug!(visible, "toggling page chrome");
        self.visible = visible;
        self.toggle.set_chrome_visible(visible);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    struct Recorder(Rc<RefCell<Vec<bool>>>);

    impl ChromeToggle for Recorder {
        fn set_chrome_visible(&mut self, visible: bool) {
            self.0.borrow_mut().push(visible);
        }
    }

    #[test]
    fn repeated_values_are_not_forwarded() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut chrome = VisibilityCoordinator::new(Box::new(Recorder(Rc::clone(&calls))));
        chrome.set_chrome_visible(false);
        chrome.set_chrome_visible(false);
        chrome.set_chrome_visible(true);
        chrome.set_chrome_visible(true);
        assert_eq!(*calls.borrow(), vec![true, false, true]);
        assert!(chrome.is_visible());
    }
}
