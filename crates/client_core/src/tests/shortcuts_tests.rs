use std::sync::atomic::AtomicUsize;

use super::*;

#[test]
fn ctrl_and_cmd_both_toggle_the_palette() {
    let registry = ShortcutRegistry::new();
    let palette = CommandPalette::attach(&registry);
    assert!(!palette.is_open());

    assert!(registry.dispatch(&KeyEvent::ctrl('k')));
    assert!(palette.is_open());
    assert!(registry.dispatch(&KeyEvent::meta('K')));
    assert!(!palette.is_open());
}

#[test]
fn unmodified_key_is_not_consumed() {
    let registry = ShortcutRegistry::new();
    let palette = CommandPalette::attach(&registry);
    assert!(!registry.dispatch(&KeyEvent::plain('k')));
    assert!(!palette.is_open());
}

#[test]
fn dropping_subscription_unregisters_handler() {
    let registry = ShortcutRegistry::new();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let subscription = registry.subscribe(KeyBinding::primary('s'), move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    registry.dispatch(&KeyEvent::ctrl('s'));
    drop(subscription);
    assert!(registry.is_empty());
    assert!(!registry.dispatch(&KeyEvent::ctrl('s')));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn dropping_palette_releases_its_binding() {
    let registry = ShortcutRegistry::new();
    let palette = CommandPalette::attach(&registry);
    assert_eq!(registry.len(), 1);
    drop(palette);
    assert!(registry.is_empty());
}

#[test]
fn handler_may_subscribe_during_dispatch() {
    let registry = ShortcutRegistry::new();
    let inner = registry.clone();
    let held = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&held);
    let _outer = registry.subscribe(KeyBinding::primary('n'), move || {
        let subscription = inner.subscribe(KeyBinding::primary('m'), || {});
        lock_vec(&sink).push(subscription);
    });

    assert!(registry.dispatch(&KeyEvent::ctrl('n')));
    assert_eq!(registry.len(), 2);
}

fn lock_vec(held: &Mutex<Vec<Subscription>>) -> MutexGuard<'_, Vec<Subscription>> {
    held.lock().expect("lock")
}
