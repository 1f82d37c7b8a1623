#![forbid(unsafe_code)]

//! Site configuration.
//!
//! Every selector, class name and constant the enhancer relies on lives in
//! [`SiteConfig`]. The defaults describe the stock portfolio markup; a host may
//! override any subset by passing a camelCase JSON object (missing fields keep
//! their defaults, unknown fields are rejected).

use core::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

/// Delay between starting the outgoing transition and swapping content.
pub const DEFAULT_TRANSITION_DELAY_MS: u32 = 180;
/// Freshness window for cached repository descriptions (6 hours).
pub const DEFAULT_CACHE_TTL_MS: u64 = 6 * 60 * 60 * 1000;
/// Text written into a card when the repository has no description.
pub const DEFAULT_PLACEHOLDER: &str = "No description yet.";

/// Configuration validation and decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The configuration object could not be decoded.
    #[error("invalid configuration: {0}")]
    Decode(String),
    /// A selector, class name or identifier is empty.
    #[error("`{field}` must not be blank")]
    Blank { field: &'static str },
    /// The cache freshness window is zero.
    #[error("`cacheTtlMs` must be greater than zero")]
    ZeroTtl,
    /// The metadata API base is not an absolute http(s) URL.
    #[error("`apiBase` is not an absolute http(s) URL: {0}")]
    ApiBase(String),
    /// The log level is not recognised.
    #[error("unknown log level `{0}` (expected trace, debug, info, warn, error or off)")]
    LogLevel(String),
}

/// Selectors, class names and constants used by every component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct SiteConfig {
    pub main_selector: String,
    pub nav_link_selector: String,
    pub active_class: String,
    pub fading_class: String,
    /// Only links whose raw `href` ends with this suffix are intercepted.
    pub page_suffix: String,
    /// Page path used when a URL path has no final segment.
    pub index_document: String,
    pub transition_delay_ms: u32,

    pub card_selector: String,
    pub repo_attribute: String,
    pub tags_attribute: String,
    pub title_selector: String,
    pub description_selector: String,
    pub search_input_id: String,
    pub tag_button_selector: String,

    pub modal_id: String,
    pub overlay_selector: String,
    pub overlay_visible_class: String,
    pub body_modal_class: String,
    pub opener_selector: String,
    pub closer_selector: String,

    pub api_base: String,
    pub cache_prefix: String,
    pub cache_ttl_ms: u64,
    pub placeholder_description: String,

    pub log_level: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            main_selector: "main".into(),
            nav_link_selector: ".nav-tabs a".into(),
            active_class: "active".into(),
            fading_class: "fading".into(),
            page_suffix: ".html".into(),
            index_document: "index.html".into(),
            transition_delay_ms: DEFAULT_TRANSITION_DELAY_MS,
            card_selector: ".project-card".into(),
            repo_attribute: "data-repo".into(),
            tags_attribute: "data-tags".into(),
            title_selector: ".project-title".into(),
            description_selector: ".project-desc".into(),
            search_input_id: "project-search".into(),
            tag_button_selector: ".tag-filter button".into(),
            modal_id: "qr-modal".into(),
            overlay_selector: ".overlay".into(),
            overlay_visible_class: "is-visible".into(),
            body_modal_class: "modal-open".into(),
            opener_selector: "[data-qr-open]".into(),
            closer_selector: "[data-qr-close]".into(),
            api_base: "https://api.github.com".into(),
            cache_prefix: "ghmeta:".into(),
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            placeholder_description: DEFAULT_PLACEHOLDER.into(),
            log_level: "info".into(),
        }
    }
}

impl SiteConfig {
    /// Decode a configuration from JSON and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Decode(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values that would silently disable a
    /// component.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required: [(&'static str, &str); 20] = [
            ("mainSelector", &self.main_selector),
            ("navLinkSelector", &self.nav_link_selector),
            ("activeClass", &self.active_class),
            ("fadingClass", &self.fading_class),
            ("pageSuffix", &self.page_suffix),
            ("indexDocument", &self.index_document),
            ("cardSelector", &self.card_selector),
            ("repoAttribute", &self.repo_attribute),
            ("tagsAttribute", &self.tags_attribute),
            ("titleSelector", &self.title_selector),
            ("descriptionSelector", &self.description_selector),
            ("searchInputId", &self.search_input_id),
            ("tagButtonSelector", &self.tag_button_selector),
            ("modalId", &self.modal_id),
            ("overlaySelector", &self.overlay_selector),
            ("overlayVisibleClass", &self.overlay_visible_class),
            ("bodyModalClass", &self.body_modal_class),
            ("openerSelector", &self.opener_selector),
            ("closerSelector", &self.closer_selector),
            ("cachePrefix", &self.cache_prefix),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::Blank { field });
        }

        if self.cache_ttl_ms == 0 {
            return Err(ConfigError::ZeroTtl);
        }

        match Url::parse(&self.api_base) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && !url.cannot_be_a_base() => {}
            _ => return Err(ConfigError::ApiBase(self.api_base.clone())),
        }

        self.log_filter()?;
        Ok(())
    }

    /// Fixed delay before the fetched content replaces the current main region.
    #[must_use]
    pub fn transition_delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.transition_delay_ms))
    }

    /// Parse [`log_level`](Self::log_level) into a tracing filter.
    pub fn log_filter(&self) -> Result<LevelFilter, ConfigError> {
        match self.log_level.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LevelFilter::TRACE),
            "debug" => Ok(LevelFilter::DEBUG),
            "info" => Ok(LevelFilter::INFO),
            "warn" => Ok(LevelFilter::WARN),
            "error" => Ok(LevelFilter::ERROR),
            "off" => Ok(LevelFilter::OFF),
            _ => Err(ConfigError::LogLevel(self.log_level.clone())),
        }
    }
}
