//! Global keyboard shortcuts with scoped subscriptions.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard, PoisonError, Weak,
};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: char,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn plain(key: char) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
        }
    }

    pub fn ctrl(key: char) -> Self {
        Self {
            key,
            modifiers: Modifiers {
                ctrl: true,
                ..Modifiers::default()
            },
        }
    }

    pub fn meta(key: char) -> Self {
        Self {
            key,
            modifiers: Modifiers {
                meta: true,
                ..Modifiers::default()
            },
        }
    }
}

/// `primary` matches either Ctrl or Cmd so one binding covers every platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    pub key: char,
    pub primary: bool,
    pub shift: bool,
}

impl KeyBinding {
    pub fn primary(key: char) -> Self {
        Self {
            key,
            primary: true,
            shift: false,
        }
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        let primary_held = event.modifiers.ctrl || event.modifiers.meta;
        event.key.eq_ignore_ascii_case(&self.key)
            && primary_held == self.primary
            && event.modifiers.shift == self.shift
            && !event.modifiers.alt
    }
}

type Handler = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Bindings {
    next_id: u64,
    entries: Vec<(u64, KeyBinding, Handler)>,
}

#[derive(Clone, Default)]
pub struct ShortcutRegistry {
    bindings: Arc<Mutex<Bindings>>,
}

impl ShortcutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The binding stays registered until the returned subscription drops.
    pub fn subscribe(
        &self,
        binding: KeyBinding,
        handler: impl Fn() + Send + Sync + 'static,
    ) -> Subscription {
        let handler: Handler = Arc::new(handler);
        let mut bindings = lock(&self.bindings);
        bindings.next_id += 1;
        let id = bindings.next_id;
        bindings.entries.push((id, binding, handler));
        Subscription {
            id,
            bindings: Arc::downgrade(&self.bindings),
        }
    }

    /// Runs every matching handler. `true` means the event was consumed and
    /// its default behaviour should be suppressed.
    pub fn dispatch(&self, event: &KeyEvent) -> bool {
        let handlers: Vec<Handler> = lock(&self.bindings)
            .entries
            .iter()
            .filter(|(_, binding, _)| binding.matches(event))
            .map(|(_, _, handler)| Arc::clone(handler))
            .collect();
        for handler in &handlers {
            handler();
        }
        !handlers.is_empty()
    }

    pub fn len(&self) -> usize {
        lock(&self.bindings).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Subscription {
    id: u64,
    bindings: Weak<Mutex<Bindings>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bindings) = self.bindings.upgrade() {
            lock(&bindings).entries.retain(|(id, _, _)| *id != self.id);
        }
    }
}

fn lock(bindings: &Mutex<Bindings>) -> MutexGuard<'_, Bindings> {
    bindings.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Open state of the command palette, toggled by Ctrl/Cmd+K while attached.
pub struct CommandPalette {
    open: Arc<AtomicBool>,
    _subscription: Subscription,
}

impl CommandPalette {
    pub const TOGGLE_KEY: char = 'k';

    pub fn attach(registry: &ShortcutRegistry) -> Self {
        let open = Arc::new(AtomicBool::new(false));
        let toggled = Arc::clone(&open);
        let subscription = registry.subscribe(KeyBinding::primary(Self::TOGGLE_KEY), move || {
            let was_open = toggled.fetch_xor(true, Ordering::SeqCst);
            debug!(open = !was_open, "command palette toggled");
        });
        Self {
            open,
            _subscription: subscription,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "tests/shortcuts_tests.rs"]
mod tests;
