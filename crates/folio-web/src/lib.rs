#![forbid(unsafe_code)]

//! WASM frontend for Folio.
//!
//! This crate is intentionally host-specific (web/WASM). It binds the
//! decisions made by `folio-core` to the live document:
//! - intercepting same-origin page links and `popstate`,
//! - fetching, parsing and swapping the main region,
//! - decorating project cards with repository descriptions,
//! - wiring the search box, tag buttons and the overlay dialog.
//!
//! The JS entry point is [`FolioWeb`]:
//!
//! ```js
//! import init, { FolioWeb } from "./folio_web.js";
//! await init();
//! new FolioWeb({ logLevel: "debug" }).start();
//! ```

#[cfg(target_arch = "wasm32")]
mod app;
#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod host;
#[cfg(target_arch = "wasm32")]
mod logging;
#[cfg(target_arch = "wasm32")]
mod modal;
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::{FolioWeb, boot};

/// Native builds compile this crate as a stub so `cargo check --workspace` stays
/// green on non-wasm targets. The stub still validates configuration, which
/// lets build tooling check a site's options without a browser.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Default)]
pub struct FolioWeb {
    config: folio_core::SiteConfig,
}

#[cfg(not(target_arch = "wasm32"))]
impl FolioWeb {
    /// Build from optional JSON options.
    pub fn new(options: Option<&str>) -> Result<Self, folio_core::ConfigError> {
        let config = match options {
            Some(json) => folio_core::SiteConfig::from_json_str(json)?,
            None => folio_core::SiteConfig::default(),
        };
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &folio_core::SiteConfig {
        &self.config
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[test]
    fn stub_validates_options() {
        assert!(FolioWeb::new(None).is_ok());
        let web = FolioWeb::new(Some(r#"{"modalId":"share"}"#)).unwrap();
        assert_eq!(web.config().modal_id, "share");
        assert!(FolioWeb::new(Some(r#"{"cacheTtlMs":0}"#)).is_err());
    }
}
