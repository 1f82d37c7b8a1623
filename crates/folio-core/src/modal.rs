//! Singleton overlay dialog.
//!
//! [`ModalMachine`] is a two-state machine (closed → open → closed). Every
//! operation returns the DOM effects to apply; a no-op transition returns none,
//! so opening twice installs exactly one key listener and closing a closed
//! dialog touches nothing.
//!
//! [`ModalRegistry`] guarantees one machine (and one set of bound handlers)
//! per modal element, however many times the page is re-initialized.

use tracing::trace;

/// Key that closes an open dialog.
pub const CLOSE_KEY: &str = "Escape";

/// A DOM change requested by the modal machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalEffect {
    /// Remove the `hidden` attribute from the dialog.
    Reveal,
    /// Add the visible class to the overlay.
    ShowOverlay,
    /// Mark the body as modal-active (suppresses background scroll).
    LockBody,
    /// Install the document key listener.
    InstallKeyListener,
    /// Set the `hidden` attribute on the dialog.
    Hide,
    HideOverlay,
    UnlockBody,
    RemoveKeyListener,
}

/// Open/closed state of one dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModalMachine {
    open: bool,
    key_listener: bool,
}

impl ModalMachine {
    /// A closed dialog.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            open: false,
            key_listener: false,
        }
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// Whether the key listener is currently installed.
    #[must_use]
    pub const fn has_key_listener(&self) -> bool {
        self.key_listener
    }

    pub fn open(&mut self) -> Vec<ModalEffect> {
        if self.open {
            return Vec::new();
        }
        self.open = true;
        self.key_listener = true;
        trace!("modal opened");
        vec![
            ModalEffect::Reveal,
            ModalEffect::ShowOverlay,
            ModalEffect::LockBody,
            ModalEffect::InstallKeyListener,
        ]
    }

    pub fn close(&mut self) -> Vec<ModalEffect> {
        if !self.open {
            return Vec::new();
        }
        self.open = false;
        self.key_listener = false;
        trace!("modal closed");
        vec![
            ModalEffect::Hide,
            ModalEffect::HideOverlay,
            ModalEffect::UnlockBody,
            ModalEffect::RemoveKeyListener,
        ]
    }

    /// Handle a key press (`KeyboardEvent.key`).
    pub fn key(&mut self, key: &str) -> Vec<ModalEffect> {
        if key == CLOSE_KEY {
            self.close()
        } else {
            Vec::new()
        }
    }
}

/// Whether [`ModalRegistry::ensure_with`] built a new entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setup {
    Created,
    Reused,
}

/// One entry per modal element.
///
/// `B` is whatever the host binds to the element: in the browser, the machine
/// plus its handler closures; in tests, a plain identifier.
#[derive(Debug)]
pub struct ModalRegistry<B> {
    entries: Vec<B>,
}

impl<B> Default for ModalRegistry<B> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<B> ModalRegistry<B> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the entry matching `is_same`, or build one with `create`.
    pub fn ensure_with(
        &mut self,
        is_same: impl Fn(&B) -> bool,
        create: impl FnOnce() -> B,
    ) -> (Setup, &mut B) {
        if let Some(idx) = self.entries.iter().position(|entry| is_same(entry)) {
            return (Setup::Reused, &mut self.entries[idx]);
        }
        self.entries.push(create());
        let last = self.entries.len() - 1;
        (Setup::Created, &mut self.entries[last])
    }

    /// Drop entries for elements that no longer exist.
    pub fn retain(&mut self, keep: impl FnMut(&B) -> bool) {
        self.entries.retain(keep);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &B> {
        self.entries.iter()
    }

    /// Most recently created entry accepted by `is_live`.
    ///
    /// Openers that survive a content swap resolve their dialog through this
    /// at click time instead of holding one binding's handler.
    pub fn latest(&self, is_live: impl Fn(&B) -> bool) -> Option<&B> {
        self.entries.iter().rev().find(|entry| is_live(entry))
    }
}

impl<B: PartialEq> ModalRegistry<B> {
    /// [`ensure_with`](Self::ensure_with) using equality as identity.
    pub fn ensure(&mut self, key: B) -> Setup {
        if self.entries.contains(&key) {
            return Setup::Reused;
        }
        self.entries.push(key);
        Setup::Created
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;

    use pretty_assertions::assert_eq;

    #[test]
    fn open_twice_installs_one_listener() {
        let mut modal = ModalMachine::new();
        let first = modal.open();
        let second = modal.open();
        let installs = first
            .iter()
            .chain(second.iter())
            .filter(|e| **e == ModalEffect::InstallKeyListener)
            .count();
        assert_eq!(installs, 1);
        assert_eq!(
            first.iter().filter(|e| **e == ModalEffect::Reveal).count(),
            1
        );
        assert!(second.is_empty());
        assert!(modal.is_open());
        assert!(modal.has_key_listener());
    }

    #[test]
    fn close_while_closed_is_noop() {
        let mut modal = ModalMachine::new();
        assert!(modal.close().is_empty());
        assert!(!modal.is_open());
    }

    #[test]
    fn close_undoes_open() {
        let mut modal = ModalMachine::new();
        modal.open();
        assert_eq!(
            modal.close(),
            vec![
                ModalEffect::Hide,
                ModalEffect::HideOverlay,
                ModalEffect::UnlockBody,
                ModalEffect::RemoveKeyListener,
            ]
        );
        assert!(!modal.has_key_listener());
    }

    #[test]
    fn escape_closes_exactly_once() {
        let mut modal = ModalMachine::new();
        assert!(modal.key("Escape").is_empty());

        modal.open();
        assert!(modal.key("Enter").is_empty());
        assert!(modal.is_open());
        assert_eq!(modal.key("Escape").len(), 4);
        assert!(modal.key("Escape").is_empty());
        assert!(!modal.is_open());
    }

    #[test]
    fn registry_builds_once_per_element() {
        let mut registry = ModalRegistry::new();
        assert_eq!(registry.ensure("qr-modal"), Setup::Created);
        assert_eq!(registry.ensure("qr-modal"), Setup::Reused);
        assert_eq!(registry.ensure("other"), Setup::Created);
        assert_eq!(registry.len(), 2);

        registry.retain(|id| *id != "other");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.ensure("other"), Setup::Created);
    }

    #[test]
    fn ensure_with_returns_live_entry() {
        let mut registry: ModalRegistry<(u32, ModalMachine)> = ModalRegistry::new();
        let (setup, entry) = registry.ensure_with(|e| e.0 == 7, || (7, ModalMachine::new()));
        assert_eq!(setup, Setup::Created);
        entry.1.open();

        let (setup, entry) = registry.ensure_with(|e| e.0 == 7, || (7, ModalMachine::new()));
        assert_eq!(setup, Setup::Reused);
        assert!(entry.1.is_open());
    }

    #[derive(Debug)]
    struct Dialog {
        id: u32,
        connected: Cell<bool>,
    }

    impl Dialog {
        fn new(id: u32) -> Self {
            Self {
                id,
                connected: Cell::new(true),
            }
        }

        fn is_connected(&self) -> bool {
            self.connected.get()
        }
    }

    #[test]
    fn opener_outside_swapped_content_reaches_replacement_dialog() {
        let mut registry: ModalRegistry<Dialog> = ModalRegistry::new();
        registry.ensure_with(|d| d.id == 1, || Dialog::new(1));
        assert_eq!(registry.latest(Dialog::is_connected).map(|d| d.id), Some(1));

        // Main region swapped: the first dialog is detached before the next
        // initialization pass runs.
        if let Some(first) = registry.iter().next() {
            first.connected.set(false);
        }
        assert_eq!(registry.latest(Dialog::is_connected).map(|d| d.id), None);

        registry.retain(Dialog::is_connected);
        let (setup, _) = registry.ensure_with(|d| d.id == 2, || Dialog::new(2));
        assert_eq!(setup, Setup::Created);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.latest(Dialog::is_connected).map(|d| d.id), Some(2));
    }

    #[test]
    fn latest_prefers_newest_live_entry() {
        let mut registry: ModalRegistry<Dialog> = ModalRegistry::new();
        registry.ensure_with(|d| d.id == 1, || Dialog::new(1));
        registry.ensure_with(|d| d.id == 2, || Dialog::new(2));
        assert_eq!(registry.latest(Dialog::is_connected).map(|d| d.id), Some(2));

        if let Some(second) = registry.iter().find(|d| d.id == 2) {
            second.connected.set(false);
        }
        assert_eq!(registry.latest(Dialog::is_connected).map(|d| d.id), Some(1));
    }
}
