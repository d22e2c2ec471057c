//! Change bus: the editor's observation channel.
//!
//! The store drains the template's change journal after every action and
//! publishes each entry here, followed by any session-level events. The
//! rendering layer (canvas, panels, the WASM bridge) subscribes instead of
//! polling the model.

use crate::store::{EditorTab, Theme};
use mb_core::{Change, Device, ElementId};
use serde::Serialize;
use std::fmt;

/// Everything a subscriber can be told about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum StoreEvent {
    /// A mutation of the document itself.
    Model(Change),
    SelectionChanged(Option<ElementId>),
    DeviceChanged(Device),
    TabChanged(EditorTab),
    ThemeChanged(Theme),
    /// The whole document was swapped out (load, import).
    TemplateReplaced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Rebuild a handle that crossed an FFI boundary as a number.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

type Listener = Box<dyn FnMut(&StoreEvent)>;

/// Single-threaded pub-sub. Listeners run synchronously, in subscription
/// order, before `publish` returns.
#[derive(Default)]
pub struct ChangeBus {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&StoreEvent) + 'static,
    {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    pub fn publish(&mut self, event: &StoreEvent) {
        log::trace!("publish {event:?} to {} listeners", self.listeners.len());
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn listeners_receive_events_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = ChangeBus::new();
        let a = Rc::clone(&seen);
        bus.subscribe(move |e| a.borrow_mut().push(("a", e.clone())));
        let b = Rc::clone(&seen);
        bus.subscribe(move |e| b.borrow_mut().push(("b", e.clone())));

        bus.publish(&StoreEvent::DeviceChanged(Device::Mobile));
        assert_eq!(
            *seen.borrow(),
            vec![
                ("a", StoreEvent::DeviceChanged(Device::Mobile)),
                ("b", StoreEvent::DeviceChanged(Device::Mobile)),
            ]
        );
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let count = Rc::new(RefCell::new(0));
        let mut bus = ChangeBus::new();
        let c = Rc::clone(&count);
        let id = bus.subscribe(move |_| *c.borrow_mut() += 1);
        bus.publish(&StoreEvent::TemplateReplaced);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&StoreEvent::TemplateReplaced);
        assert_eq!(*count.borrow(), 1);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn events_serialize_with_a_tag() {
        let json = serde_json::to_value(StoreEvent::DeviceChanged(Device::Tablet)).unwrap();
        assert_eq!(json, serde_json::json!({ "event": "deviceChanged", "payload": "tablet" }));
    }
}
