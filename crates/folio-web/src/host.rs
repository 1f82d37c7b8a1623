//! Browser implementations of the core's host seams: `localStorage`, `fetch`
//! and the wall clock, plus the page fetch used by pseudo-navigation.

use folio_core::cache::{KeyValueStore, StoreError};
use folio_core::clock::Clock;
use folio_core::metadata::{HttpResponse, MetadataError, MetadataRequest, MetadataTransport};
use folio_core::navigator::{FetchedPage, NavError};
use tracing::debug;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    DomParser, Element, Headers, RequestCache, RequestCredentials, RequestInit, Response, Storage,
    SupportedType, Window,
};

use crate::dom::describe;

/// `localStorage`, or nothing when the browser refuses access.
#[derive(Debug)]
pub(crate) struct LocalStore {
    storage: Option<Storage>,
}

impl LocalStore {
    pub(crate) fn open(window: &Window) -> Self {
        let storage = window.local_storage().unwrap_or_else(|err| {
            debug!(error = %describe(&err), "localStorage unavailable");
            None
        });
        Self { storage }
    }

    fn storage(&self) -> Result<&Storage, StoreError> {
        self.storage
            .as_ref()
            .ok_or_else(|| StoreError::Unavailable("localStorage is disabled".into()))
    }
}

impl KeyValueStore for LocalStore {
    fn name(&self) -> &str {
        "localStorage"
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.storage()?
            .get_item(key)
            .map_err(|err| StoreError::Unavailable(describe(&err)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.storage()?
            .set_item(key, value)
            .map_err(|err| StoreError::Rejected(describe(&err)))
    }
}

/// `Date.now()`.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct JsClock;

impl Clock for JsClock {
    fn now_epoch_ms(&self) -> i64 {
        js_sys::Date::now() as i64
    }
}

/// Metadata requests over `window.fetch`.
#[derive(Debug, Clone)]
pub(crate) struct FetchTransport {
    window: Window,
}

impl FetchTransport {
    pub(crate) fn new(window: Window) -> Self {
        Self { window }
    }
}

fn transport_error(err: JsValue) -> MetadataError {
    MetadataError::Transport(describe(&err))
}

impl MetadataTransport for FetchTransport {
    async fn send(&self, request: &MetadataRequest) -> Result<HttpResponse, MetadataError> {
        let headers = Headers::new().map_err(transport_error)?;
        headers
            .set("Accept", request.accept)
            .map_err(transport_error)?;

        let init = RequestInit::new();
        init.set_method("GET");
        init.set_headers(&headers);
        if request.no_store {
            init.set_cache(RequestCache::NoStore);
        }

        let response: Response = JsFuture::from(self.window.fetch_with_str_and_init(&request.url, &init))
            .await
            .map_err(transport_error)?
            .dyn_into()
            .map_err(transport_error)?;

        let status = response.status();
        if !response.ok() {
            return Ok(HttpResponse {
                status,
                body: String::new(),
            });
        }
        let body = JsFuture::from(response.text().map_err(transport_error)?)
            .await
            .map_err(transport_error)?
            .as_string()
            .unwrap_or_default();
        Ok(HttpResponse { status, body })
    }
}

/// Fetch `url` with same-origin credentials and extract its main region.
pub(crate) async fn fetch_page(
    window: &Window,
    url: &str,
    main_selector: &str,
) -> Result<FetchedPage<Element>, NavError> {
    let network = |err: JsValue| NavError::Network(describe(&err));

    let init = RequestInit::new();
    init.set_method("GET");
    init.set_credentials(RequestCredentials::SameOrigin);

    let response: Response = JsFuture::from(window.fetch_with_str_and_init(url, &init))
        .await
        .map_err(network)?
        .dyn_into()
        .map_err(network)?;
    if !response.ok() {
        return Err(NavError::Status(response.status()));
    }

    let html = JsFuture::from(response.text().map_err(network)?)
        .await
        .map_err(network)?
        .as_string()
        .unwrap_or_default();

    let parse = |err: JsValue| NavError::Parse(describe(&err));
    let document = DomParser::new()
        .map_err(parse)?
        .parse_from_string(&html, SupportedType::TextHtml)
        .map_err(parse)?;

    let main = document
        .query_selector(main_selector)
        .map_err(parse)?
        .ok_or(NavError::MissingMain)?;
    let title = document
        .query_selector("title")
        .ok()
        .flatten()
        .and_then(|el| el.text_content());

    Ok(FetchedPage { main, title })
}
