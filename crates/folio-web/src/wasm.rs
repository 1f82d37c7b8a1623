//! JS-facing API.

use std::rc::Rc;

use folio_core::config::{ConfigError, SiteConfig};
use folio_core::link;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::app::App;
use crate::logging;

fn js_error(err: &ConfigError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn config_from(options: Option<JsValue>) -> Result<SiteConfig, JsValue> {
    let config = match options {
        Some(value) if !value.is_undefined() && !value.is_null() => {
            serde_wasm_bindgen::from_value::<SiteConfig>(value)
                .map_err(|err| js_error(&ConfigError::Decode(err.to_string())))?
        }
        _ => SiteConfig::default(),
    };
    config.validate().map_err(|err| js_error(&err))?;
    Ok(config)
}

/// Folio page runtime.
///
/// Construct once per document with optional camelCase options (any subset of
/// the site configuration), then call [`start`](Self::start).
#[wasm_bindgen]
pub struct FolioWeb {
    app: Rc<App>,
    started: bool,
}

#[wasm_bindgen]
impl FolioWeb {
    #[wasm_bindgen(constructor)]
    pub fn new(options: Option<JsValue>) -> Result<FolioWeb, JsValue> {
        let config = config_from(options)?;
        logging::install(config.log_filter().map_err(|err| js_error(&err))?);
        let app = App::new(config)?;
        Ok(Self {
            app,
            started: false,
        })
    }

    /// Run the initial sequence, deferred to `DOMContentLoaded` while the
    /// document is still loading. Later calls are no-ops.
    pub fn start(&mut self) -> Result<(), JsValue> {
        if self.started {
            return Ok(());
        }
        self.started = true;

        let document = self.app.dom().document().clone();
        if document.ready_state() == "loading" {
            let app = Rc::clone(&self.app);
            let callback = Closure::once_into_js(move || app.start());
            document.add_event_listener_with_callback("DOMContentLoaded", callback.unchecked_ref())?;
        } else {
            self.app.start();
        }
        Ok(())
    }

    /// Pseudo-navigate to `url` (resolved against the current location),
    /// pushing a history entry.
    pub fn navigate(&self, url: &str) {
        let base = self.app.dom().href();
        let target = link::resolve(&base, url).unwrap_or_else(|| url.to_owned());
        self.app.navigate(target, true);
    }

    /// Re-apply the search and tag filter to the current cards.
    #[wasm_bindgen(js_name = applyFilter)]
    pub fn apply_filter(&self) {
        self.app.apply_filter();
    }

    #[wasm_bindgen(js_name = openModal)]
    pub fn open_modal(&self) {
        if let Some(modal) = self.app.modal() {
            modal.open();
        }
    }

    #[wasm_bindgen(js_name = closeModal)]
    pub fn close_modal(&self) {
        if let Some(modal) = self.app.modal() {
            modal.close();
        }
    }
}

/// Construct and start in one call.
#[wasm_bindgen]
pub fn boot(options: Option<JsValue>) -> Result<FolioWeb, JsValue> {
    let mut web = FolioWeb::new(options)?;
    web.start()?;
    Ok(web)
}
