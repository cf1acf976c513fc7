use std::cell::RefCell;
use std::rc::Rc;

use storefront_core::HistoryRecord;
use storefront_engine::host::History;

/// Records are kept serialized, the way a browser structured-clones the
/// state object it is handed.
struct Entry {
    url: String,
    record: Option<Vec<u8>>,
}

fn encode(record: Option<HistoryRecord>) -> Option<Vec<u8>> {
    record.and_then(|r| r.to_msgpack().ok())
}

struct Tab {
    entries: Vec<Entry>,
    index: usize,
    pending_popstates: usize,
    pushes: usize,
    replaces: usize,
    backs: usize,
}

/// In-memory session history for one tab. Clones share the same tab, so a
/// test can keep a handle while the storefront owns another.
#[derive(Clone)]
pub struct SimulatedBrowser {
    tab: Rc<RefCell<Tab>>,
}

impl SimulatedBrowser {
    pub fn new(url: &str) -> Self {
        Self {
            tab: Rc::new(RefCell::new(Tab {
                entries: vec![Entry { url: url.to_string(), record: None }],
                index: 0,
                pending_popstates: 0,
                pushes: 0,
                replaces: 0,
                backs: 0,
            })),
        }
    }

    pub fn url(&self) -> String {
        let tab = self.tab.borrow();
        tab.entries[tab.index].url.clone()
    }

    pub fn len(&self) -> usize {
        self.tab.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn index(&self) -> usize {
        self.tab.borrow().index
    }

    /// Entries from the landing page up to and including the current one
    /// that carry a navigator record.
    pub fn overlay_entries_behind(&self) -> usize {
        let tab = self.tab.borrow();
        tab.entries[..=tab.index].iter().filter(|e| e.record.is_some()).count()
    }

    pub fn push_count(&self) -> usize {
        self.tab.borrow().pushes
    }

    pub fn replace_count(&self) -> usize {
        self.tab.borrow().replaces
    }

    pub fn back_count(&self) -> usize {
        self.tab.borrow().backs
    }

    /// The Back button. Returns false at the start of the stack.
    pub fn user_back(&self) -> bool {
        let mut tab = self.tab.borrow_mut();
        if tab.index == 0 {
            return false;
        }
        tab.index -= 1;
        tab.pending_popstates += 1;
        true
    }

    pub fn user_forward(&self) -> bool {
        let mut tab = self.tab.borrow_mut();
        if tab.index + 1 >= tab.entries.len() {
            return false;
        }
        tab.index += 1;
        tab.pending_popstates += 1;
        true
    }

    /// Popstate events queued since the last call.
    pub fn take_popstates(&self) -> usize {
        std::mem::take(&mut self.tab.borrow_mut().pending_popstates)
    }

    /// Another script rewrites the current entry behind the navigator's back.
    pub fn external_replace(&self, url: &str) {
        let mut tab = self.tab.borrow_mut();
        let index = tab.index;
        tab.entries[index] = Entry { url: url.to_string(), record: None };
    }
}

impl History for SimulatedBrowser {
    fn hash(&self) -> String {
        let url = self.url();
        url.find('#').map(|i| url[i..].to_string()).unwrap_or_default()
    }

    fn path(&self) -> String {
        let url = self.url();
        url.split('#').next().unwrap_or_default().to_string()
    }

    fn state(&self) -> Option<HistoryRecord> {
        let tab = self.tab.borrow();
        tab.entries[tab.index]
            .record
            .as_deref()
            .and_then(|bytes| HistoryRecord::from_msgpack(bytes).ok())
    }

    fn push_state(&mut self, record: HistoryRecord, url: &str) {
        let mut tab = self.tab.borrow_mut();
        let keep = tab.index + 1;
        tab.entries.truncate(keep);
        tab.entries.push(Entry { url: url.to_string(), record: encode(Some(record)) });
        tab.index += 1;
        tab.pushes += 1;
    }

    fn replace_state(&mut self, record: Option<HistoryRecord>, url: &str) {
        let mut tab = self.tab.borrow_mut();
        let index = tab.index;
        tab.entries[index] = Entry { url: url.to_string(), record: encode(record) };
        tab.replaces += 1;
    }

    fn back(&mut self) {
        let mut tab = self.tab.borrow_mut();
        tab.backs += 1;
        if tab.index > 0 {
            tab.index -= 1;
            tab.pending_popstates += 1;
        }
    }
}
