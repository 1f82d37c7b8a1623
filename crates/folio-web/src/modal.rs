//! Binds a [`ModalMachine`] to the dialog, overlay and body elements.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use folio_core::config::SiteConfig;
use folio_core::modal::{ModalEffect, ModalMachine};
use tracing::debug;
use wasm_bindgen::prelude::*;
use web_sys::{Element, KeyboardEvent};

use crate::dom::{self, Dom, describe};

pub(crate) struct ModalShared {
    machine: RefCell<ModalMachine>,
    modal: Element,
    overlay: Element,
    dom: Dom,
    overlay_class: String,
    body_class: String,
    keydown: Closure<dyn FnMut(KeyboardEvent)>,
}

impl ModalShared {
    pub(crate) fn open(&self) {
        let effects = self.machine.borrow_mut().open();
        self.apply(effects);
    }

    pub(crate) fn close(&self) {
        let effects = self.machine.borrow_mut().close();
        self.apply(effects);
    }

    fn key(&self, key: &str) {
        let effects = self.machine.borrow_mut().key(key);
        self.apply(effects);
    }

    fn apply(&self, effects: Vec<ModalEffect>) {
        for effect in effects {
            match effect {
                ModalEffect::Reveal => {
                    if let Err(err) = self.modal.remove_attribute("hidden") {
                        debug!(error = %describe(&err), "could not reveal dialog");
                    }
                }
                ModalEffect::Hide => {
                    if let Err(err) = self.modal.set_attribute("hidden", "") {
                        debug!(error = %describe(&err), "could not hide dialog");
                    }
                }
                ModalEffect::ShowOverlay => dom::set_class(&self.overlay, &self.overlay_class, true),
                ModalEffect::HideOverlay => dom::set_class(&self.overlay, &self.overlay_class, false),
                ModalEffect::LockBody | ModalEffect::UnlockBody => {
                    if let Some(body) = self.dom.body() {
                        let on = effect == ModalEffect::LockBody;
                        dom::set_class(&body, &self.body_class, on);
                    }
                }
                ModalEffect::InstallKeyListener => {
                    dom::listen(self.dom.document(), "keydown", &self.keydown);
                }
                ModalEffect::RemoveKeyListener => {
                    dom::unlisten(self.dom.document(), "keydown", &self.keydown);
                }
            }
        }
    }
}

/// A dialog element together with the handlers registered on it and its
/// overlay.
///
/// Openers are not bound here: they may live outside the swapped content and
/// outlast this binding, so they use the app-wide open handler instead.
pub(crate) struct ModalBinding {
    shared: Rc<ModalShared>,
    close: Closure<dyn FnMut()>,
}

impl ModalBinding {
    /// Bind `modal` and wire the overlay and the dialog's close controls.
    pub(crate) fn new(dom: &Dom, modal: Element, overlay: Element, config: &SiteConfig) -> Self {
        let shared = Rc::new_cyclic(|weak: &Weak<ModalShared>| {
            let weak = weak.clone();
            ModalShared {
                machine: RefCell::new(ModalMachine::new()),
                modal,
                overlay,
                dom: dom.clone(),
                overlay_class: config.overlay_visible_class.clone(),
                body_class: config.body_modal_class.clone(),
                keydown: Closure::<dyn FnMut(KeyboardEvent)>::new(move |event: KeyboardEvent| {
                    if let Some(shared) = weak.upgrade() {
                        shared.key(&event.key());
                    }
                }),
            }
        });

        let weak = Rc::downgrade(&shared);
        let close = Closure::<dyn FnMut()>::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.close();
            }
        });

        dom::listen(&shared.overlay, "click", &close);
        if let Ok(closers) = shared.modal.query_selector_all(&config.closer_selector) {
            for closer in dom::elements(&closers) {
                dom::listen(&closer, "click", &close);
            }
        }

        Self { shared, close }
    }

    pub(crate) fn is_for(&self, modal: &Element) -> bool {
        dom::same_node(&self.shared.modal, modal)
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.shared.modal.is_connected()
    }

    pub(crate) fn shared(&self) -> Rc<ModalShared> {
        Rc::clone(&self.shared)
    }
}

impl Drop for ModalBinding {
    // The overlay and document outlive a swapped-out dialog; detach the
    // closures before they are freed.
    fn drop(&mut self) {
        dom::unlisten(&self.shared.overlay, "click", &self.close);
        dom::unlisten(self.shared.dom.document(), "keydown", &self.shared.keydown);
        dom::set_class(&self.shared.overlay, &self.shared.overlay_class, false);
        if let Some(body) = self.shared.dom.body() {
            dom::set_class(&body, &self.shared.body_class, false);
        }
    }
}
