use std::cell::RefCell;

use linkpreview_core::{Fragment, LiveDocument, NodeKey};
use web_sys::{Document, Element};

/// The page's DOM as a [`LiveDocument`].
///
/// Keys index the elements handed out by `find_by_class`, so they stay valid
/// after the element itself is detached.
pub(crate) struct BrowserDocument {
    document: Document,
    found: RefCell<Vec<Element>>,
}

impl BrowserDocument {
    pub(crate) fn current() -> Option<Self> {
        let document = web_sys::window()?.document()?;
        Some(Self {
            document,
            found: RefCell::new(Vec::new()),
        })
    }

    fn element(&self, key: NodeKey) -> Option<Element> {
        self.found.borrow().get(key.0 as usize).cloned()
    }
}

impl LiveDocument for BrowserDocument {
    fn find_by_class(&self, class: &str) -> Vec<NodeKey> {
        // The collection is live; snapshot it before anything is removed.
        let collection = self.document.get_elements_by_class_name(class);
        let mut found = self.found.borrow_mut();
        let mut keys = Vec::new();
        for idx in 0..collection.length() {
            if let Some(element) = collection.item(idx) {
                keys.push(NodeKey(found.len() as u32));
                found.push(element);
            }
        }
        keys
    }

    fn insert_after(&mut self, anchor: NodeKey, fragment: Fragment) {
        let Some(element) = self.element(anchor) else {
            return;
        };
        if let Err(err) = element.insert_adjacent_html("afterend", &fragment.to_html()) {
            log::warn!("could not insert link preview: {:?}", err);
        }
    }

    fn remove(&mut self, node: NodeKey) {
        if let Some(element) = self.element(node) {
            element.remove();
        }
    }
}
