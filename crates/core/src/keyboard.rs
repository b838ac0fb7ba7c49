//! Keyboard events and scoped listener registration.
//!
//! Key handling is expressed as plain values so reducers can be driven without a UI
//! toolkit. Listeners registered on a [`KeyboardBus`] stay attached only as long as the
//! returned [`ListenerGuard`] lives; dropping the guard when the owning view goes away
//! deregisters the handler. [`mount`] wires a [`KeyHandler`] view so that it owns its own
//! guard.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Char(char),
    ArrowUp,
    ArrowDown,
    Enter,
    Escape,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub ctrl: bool,
    pub meta: bool,
}

impl KeyEvent {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            meta: false,
        }
    }

    pub fn ctrl(c: char) -> Self {
        Self {
            key: Key::Char(c),
            ctrl: true,
            meta: false,
        }
    }

    pub fn meta(c: char) -> Self {
        Self {
            key: Key::Char(c),
            ctrl: false,
            meta: true,
        }
    }

    /// `Ctrl+<c>` or `Cmd+<c>`, case-insensitive.
    pub fn is_shortcut(&self, c: char) -> bool {
        (self.ctrl || self.meta)
            && matches!(self.key, Key::Char(k) if k.eq_ignore_ascii_case(&c))
    }
}

type Listener = Box<dyn FnMut(&KeyEvent)>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: BTreeMap<u64, Listener>,
}

/// Process-wide key event fan-out for a single-threaded event loop.
#[derive(Clone, Default)]
pub struct KeyboardBus {
    inner: Rc<RefCell<Registry>>,
}

impl KeyboardBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `listener` until the returned guard is dropped.
    #[must_use = "dropping the guard immediately deregisters the listener"]
    pub fn subscribe(&self, listener: impl FnMut(&KeyEvent) + 'static) -> ListenerGuard {
        let mut registry = self.inner.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.insert(id, Box::new(listener));
        tracing::debug!("keyboard listener {} attached", id);

        ListenerGuard {
            id,
            registry: Rc::downgrade(&self.inner),
        }
    }

    /// Delivers `event` to every attached listener in registration order.
    ///
    /// Listeners must not subscribe or unsubscribe from inside their own callback.
    pub fn dispatch(&self, event: &KeyEvent) {
        let mut registry = self.inner.borrow_mut();
        for listener in registry.listeners.values_mut() {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

/// Keeps a listener attached; deregisters it on drop.
pub struct ListenerGuard {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().listeners.remove(&self.id);
            tracing::debug!("keyboard listener {} detached", self.id);
        }
    }
}

/// A view that consumes key events and owns its bus registration.
pub trait KeyHandler {
    /// Returns whether the key was consumed.
    fn handle_key(&mut self, key: &KeyEvent) -> bool;

    /// Stores the view's registration. `None` detaches it.
    fn set_listener(&mut self, guard: Option<ListenerGuard>);
}

/// Subscribes `view` on `bus` for as long as the view lives.
///
/// The listener holds the view weakly and the view holds the guard, so dropping the last
/// handle on the view deregisters it. Mounting again replaces the previous registration.
pub fn mount<V: KeyHandler + 'static>(bus: &KeyboardBus, view: &Rc<RefCell<V>>) {
    let weak = Rc::downgrade(view);
    let guard = bus.subscribe(move |event| {
        let Some(view) = weak.upgrade() else {
            return;
        };
        match view.try_borrow_mut() {
            Ok(mut view) => {
                view.handle_key(event);
            }
            Err(_) => tracing::warn!("key event dropped: view is busy"),
        };
    });
    view.borrow_mut().set_listener(Some(guard));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_guard_detaches_listener() {
        let bus = KeyboardBus::new();
        let hits = Rc::new(RefCell::new(0));

        let counter = Rc::clone(&hits);
        let guard = bus.subscribe(move |_| *counter.borrow_mut() += 1);
        bus.dispatch(&KeyEvent::plain(Key::Enter));
        assert_eq!(bus.listener_count(), 1);

        drop(guard);
        bus.dispatch(&KeyEvent::plain(Key::Enter));
        assert_eq!(bus.listener_count(), 0);
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn guard_outliving_bus_is_harmless() {
        let bus = KeyboardBus::new();
        let guard = bus.subscribe(|_| {});
        drop(bus);
        drop(guard);
    }

    #[derive(Default)]
    struct Counter {
        seen: Vec<KeyEvent>,
        listener: Option<ListenerGuard>,
    }

    impl KeyHandler for Counter {
        fn handle_key(&mut self, key: &KeyEvent) -> bool {
            self.seen.push(*key);
            true
        }

        fn set_listener(&mut self, guard: Option<ListenerGuard>) {
            self.listener = guard;
        }
    }

    #[test]
    fn mounted_view_detaches_when_dropped_or_unmounted() {
        let bus = KeyboardBus::new();
        let view = Rc::new(RefCell::new(Counter::default()));
        mount(&bus, &view);
        mount(&bus, &view);
        assert_eq!(bus.listener_count(), 1);

        bus.dispatch(&KeyEvent::ctrl('k'));
        assert_eq!(view.borrow().seen, vec![KeyEvent::ctrl('k')]);

        view.borrow_mut().set_listener(None);
        assert_eq!(bus.listener_count(), 0);

        mount(&bus, &view);
        drop(view);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn shortcut_matches_ctrl_or_meta() {
        assert!(KeyEvent::ctrl('k').is_shortcut('k'));
        assert!(KeyEvent::meta('K').is_shortcut('k'));
        assert!(!KeyEvent::plain(Key::Char('k')).is_shortcut('k'));
    }
}
