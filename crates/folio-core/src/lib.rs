#![forbid(unsafe_code)]

//! `folio-core` holds every decision made by the Folio page enhancer.
//!
//! Design goals:
//! - **Host-driven**: the embedding environment (the browser glue in
//!   `folio-web`) reports clicks, fetch results, timer expiries and animation
//!   frames; the core answers with ordered commands.
//! - **Deterministic**: time is passed in explicitly (see [`clock`]), so every
//!   transition can be replayed in native tests.
//! - **Degrade, never fail**: cache and metadata problems turn into "leave the
//!   page as it is"; navigation problems turn into a full page load.
//!
//! Modules:
//! - [`config`]: selectors, class names and constants, all overridable.
//! - [`link`]: click interception and history payloads.
//! - [`navigator`]: the fade-out / swap / fade-in transition machine.
//! - [`cache`] and [`metadata`]: repository description lookup with a
//!   time-bounded key/value cache.
//! - [`filter`]: search text and tag filtering of project cards.
//! - [`modal`]: the singleton overlay dialog state machine.
//! - [`context`]: the application context threaded through re-initialization.

pub mod cache;
pub mod clock;
pub mod config;
pub mod context;
pub mod filter;
pub mod link;
pub mod metadata;
pub mod modal;
pub mod navigator;

pub use cache::{CacheError, CacheLookup, KeyValueStore, MemoryStore, MetadataCache, StoreError};
pub use clock::{Clock, ManualClock};
pub use config::{ConfigError, SiteConfig};
pub use context::{AppContext, Component, REINIT_ORDER};
pub use filter::{CardFacts, FilterQuery, Visibility};
pub use link::{HistoryState, LinkClick, Modifiers};
pub use metadata::{
    Decorator, HttpResponse, MetadataError, MetadataRequest, MetadataTransport, RepoId, Resolution,
};
pub use modal::{ModalEffect, ModalMachine, ModalRegistry, Setup};
pub use navigator::{FetchedPage, NavCommand, NavError, NavTicket, Navigator, TransitionPhase};
