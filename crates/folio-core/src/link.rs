//! Link interception and history payloads.
//!
//! A click is described by the host as a [`LinkClick`]; [`intercept`] decides
//! whether it becomes a pseudo-navigation or is left to the browser.

use serde::{Deserialize, Serialize};
use tracing::trace;
use url::Url;

/// Primary (usually left) mouse button as reported by `MouseEvent.button`.
pub const PRIMARY_BUTTON: i16 = 0;

/// Keyboard modifiers held during a click.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    #[must_use]
    pub const fn any(self) -> bool {
        self.ctrl || self.meta || self.shift || self.alt
    }
}

/// A click on an anchor element, captured by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkClick {
    /// The raw `href` attribute as written in the markup.
    pub href: String,
    /// The absolute URL the browser resolved `href` to.
    pub resolved: String,
    /// Origin of the resolved URL.
    pub origin: String,
    pub button: i16,
    pub modifiers: Modifiers,
    /// The anchor's `target` attribute, if any.
    pub target: Option<String>,
    /// Whether the anchor carries a `download` attribute.
    pub download: bool,
}

impl LinkClick {
    /// A plain primary-button click with no modifiers.
    #[must_use]
    pub fn primary(href: impl Into<String>, resolved: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            resolved: resolved.into(),
            origin: origin.into(),
            button: PRIMARY_BUTTON,
            modifiers: Modifiers::default(),
            target: None,
            download: false,
        }
    }
}

/// Decide whether `click` should be turned into a pseudo-navigation.
///
/// Returns the URL to navigate to, or `None` to let the browser handle the
/// click. Only same-origin links whose raw `href` ends in `suffix` qualify;
/// gestures that open a new tab or window, and downloads, are never touched.
#[must_use]
pub fn intercept(click: &LinkClick, page_origin: &str, suffix: &str) -> Option<String> {
    let keep_default = click.href.is_empty()
        || !click.href.ends_with(suffix)
        || click.origin != page_origin
        || click.button != PRIMARY_BUTTON
        || click.modifiers.any()
        || click.download
        || click
            .target
            .as_deref()
            .is_some_and(|t| !t.is_empty() && !t.eq_ignore_ascii_case("_self"));
    if keep_default {
        trace!(href = %click.href, "click left to the browser");
        return None;
    }
    Some(click.resolved.clone())
}

/// Final path segment of `url`, used to mark the active navigation tab.
///
/// Accepts absolute URLs and bare relative paths. A path ending in `/` (or an
/// empty path) maps to `index_document`.
#[must_use]
pub fn page_path(url: &str, index_document: &str) -> String {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_owned(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_owned(),
    };
    match path.rsplit('/').next() {
        Some(last) if !last.is_empty() => last.to_owned(),
        _ => index_document.to_owned(),
    }
}

/// Resolve `href` against `base`, returning the absolute URL.
#[must_use]
pub fn resolve(base: &str, href: &str) -> Option<String> {
    Url::parse(base)
        .ok()?
        .join(href)
        .ok()
        .map(String::from)
}

/// State payload pushed on every intercepted navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryState {
    pub url: String,
}

impl HistoryState {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Choose the URL to load for a `popstate` event.
///
/// Prefers the pushed state's URL, then the current location's page path,
/// then the index document.
#[must_use]
pub fn resolve_popstate(
    state: Option<&HistoryState>,
    location_pathname: &str,
    index_document: &str,
) -> String {
    if let Some(url) = state.map(|s| s.url.as_str()).filter(|u| !u.is_empty()) {
        return url.to_owned();
    }
    page_path(location_pathname, index_document)
}
