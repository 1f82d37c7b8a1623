//! Application context threaded through every re-initialization.
//!
//! Instead of ambient globals, the host owns one [`AppContext`] holding the
//! configuration, the navigator, the modal registry and the last applied
//! filter. After a main-region swap the host calls
//! [`AppContext::reinitialize`] and runs the components in the returned order.

use tracing::debug;

use crate::config::SiteConfig;
use crate::filter::FilterQuery;
use crate::modal::ModalRegistry;
use crate::navigator::Navigator;

/// A component re-run against freshly inserted content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Metadata,
    Filter,
    Modal,
}

/// Fixed order in which components are (re-)initialized.
pub const REINIT_ORDER: [Component; 3] = [Component::Metadata, Component::Filter, Component::Modal];

/// Shared state for one document.
///
/// `P` is the host's main-region node type, `B` its modal binding type.
#[derive(Debug)]
pub struct AppContext<P, B> {
    config: SiteConfig,
    navigator: Navigator<P>,
    modals: ModalRegistry<B>,
    filter: Option<FilterQuery>,
    generation: u64,
}

impl<P: Clone, B> AppContext<P, B> {
    #[must_use]
    pub fn new(config: SiteConfig) -> Self {
        let navigator = Navigator::new(config.transition_delay(), config.index_document.clone());
        Self {
            config,
            navigator,
            modals: ModalRegistry::new(),
            filter: None,
            generation: 0,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn navigator_mut(&mut self) -> &mut Navigator<P> {
        &mut self.navigator
    }

    #[must_use]
    pub fn navigator(&self) -> &Navigator<P> {
        &self.navigator
    }

    pub fn modals_mut(&mut self) -> &mut ModalRegistry<B> {
        &mut self.modals
    }

    #[must_use]
    pub fn modals(&self) -> &ModalRegistry<B> {
        &self.modals
    }

    /// Remember the filter most recently applied to the page.
    pub fn record_filter(&mut self, query: FilterQuery) {
        self.filter = Some(query);
    }

    #[must_use]
    pub fn last_filter(&self) -> Option<&FilterQuery> {
        self.filter.as_ref()
    }

    /// Whether a description written into a card after the last filter pass
    /// can change that card's visibility. Only free-text search reads
    /// descriptions; tag matching does not.
    #[must_use]
    pub fn filter_reads_descriptions(&self) -> bool {
        self.last_filter()
            .is_some_and(|query| !query.search().is_empty())
    }

    /// Number of initialization passes run so far (initial load included).
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Start an initialization pass against the current content.
    ///
    /// The previous filter is forgotten: the new content brings its own input
    /// and buttons.
    pub fn reinitialize(&mut self) -> [Component; 3] {
        self.generation += 1;
        self.filter = None;
        debug!(generation = self.generation, "initializing components");
        REINIT_ORDER
    }
}
