//! Thin helpers over `window` and `document`.
//!
//! Lookups never throw: an invalid selector or a missing element is logged and
//! treated as "nothing found".

use core::time::Duration;

use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, EventTarget, HtmlElement, Node, NodeList, Window};

/// Render a JS exception for logs.
pub(crate) fn describe(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

#[derive(Debug, Clone)]
pub(crate) struct Dom {
    window: Window,
    document: Document,
}

impl Dom {
    pub(crate) fn new() -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no global `window`"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("`window` has no document"))?;
        Ok(Self { window, document })
    }

    pub(crate) fn window(&self) -> &Window {
        &self.window
    }

    pub(crate) fn document(&self) -> &Document {
        &self.document
    }

    pub(crate) fn query(&self, selector: &str) -> Option<Element> {
        self.document
            .query_selector(selector)
            .unwrap_or_else(|err| {
                debug!(selector, error = %describe(&err), "selector rejected");
                None
            })
    }

    pub(crate) fn query_all(&self, selector: &str) -> Vec<Element> {
        match self.document.query_selector_all(selector) {
            Ok(list) => elements(&list),
            Err(err) => {
                debug!(selector, error = %describe(&err), "selector rejected");
                Vec::new()
            }
        }
    }

    pub(crate) fn by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    pub(crate) fn body(&self) -> Option<HtmlElement> {
        self.document.body()
    }

    pub(crate) fn href(&self) -> String {
        self.window.location().href().unwrap_or_default()
    }

    pub(crate) fn origin(&self) -> String {
        self.window.location().origin().unwrap_or_default()
    }

    pub(crate) fn pathname(&self) -> String {
        self.window.location().pathname().unwrap_or_default()
    }

    pub(crate) fn push_history(&self, state: &JsValue, url: &str) {
        let pushed = self
            .window
            .history()
            .and_then(|history| history.push_state_with_url(state, "", Some(url)));
        if let Err(err) = pushed {
            warn!(url, error = %describe(&err), "history.pushState failed");
        }
    }

    /// Full, non-intercepted navigation.
    pub(crate) fn assign(&self, url: &str) {
        if let Err(err) = self.window.location().assign(url) {
            warn!(url, error = %describe(&err), "location.assign failed");
        }
    }

    /// Run `f` once after `delay`.
    pub(crate) fn after(&self, delay: Duration, f: impl FnOnce() + 'static) {
        let callback = Closure::once_into_js(f);
        let ms = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        if let Err(err) = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), ms)
        {
            warn!(error = %describe(&err), "setTimeout failed");
        }
    }

    /// Run `f` once on the next animation frame.
    pub(crate) fn next_frame(&self, f: impl FnOnce() + 'static) {
        let callback = Closure::once_into_js(f);
        if let Err(err) = self
            .window
            .request_animation_frame(callback.unchecked_ref())
        {
            warn!(error = %describe(&err), "requestAnimationFrame failed");
        }
    }
}

pub(crate) fn elements(list: &NodeList) -> Vec<Element> {
    (0..list.length())
        .filter_map(|idx| list.item(idx))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

pub(crate) fn query_within(root: &Element, selector: &str) -> Option<Element> {
    root.query_selector(selector).ok().flatten()
}

/// Text of the first `selector` match under `root`, or empty.
pub(crate) fn text_within(root: &Element, selector: &str) -> String {
    query_within(root, selector)
        .and_then(|el| el.text_content())
        .unwrap_or_default()
}

pub(crate) fn set_class(el: &Element, class: &str, on: bool) {
    if let Err(err) = el.class_list().toggle_with_force(class, on) {
        debug!(class, error = %describe(&err), "classList.toggle failed");
    }
}

pub(crate) fn toggle_class(el: &Element, class: &str) {
    if let Err(err) = el.class_list().toggle(class) {
        debug!(class, error = %describe(&err), "classList.toggle failed");
    }
}

/// Set the inline `display` style; an empty value restores the stylesheet's.
pub(crate) fn set_display(el: &Element, value: &str) {
    let Some(el) = el.dyn_ref::<HtmlElement>() else {
        return;
    };
    let style = el.style();
    let result = if value.is_empty() {
        style.remove_property("display").map(drop)
    } else {
        style.set_property("display", value)
    };
    if let Err(err) = result {
        debug!(error = %describe(&err), "display update failed");
    }
}

pub(crate) fn same_node(a: &Element, b: &Element) -> bool {
    let b: &Node = b;
    a.is_same_node(Some(b))
}

pub(crate) fn listen<T: ?Sized>(target: &EventTarget, event: &str, handler: &Closure<T>) {
    if let Err(err) = target.add_event_listener_with_callback(event, handler.as_ref().unchecked_ref())
    {
        warn!(event, error = %describe(&err), "addEventListener failed");
    }
}

pub(crate) fn unlisten<T: ?Sized>(target: &EventTarget, event: &str, handler: &Closure<T>) {
    if let Err(err) =
        target.remove_event_listener_with_callback(event, handler.as_ref().unchecked_ref())
    {
        debug!(event, error = %describe(&err), "removeEventListener failed");
    }
}
