//! Search and tag filtering of project cards.
//!
//! A card is shown when it matches the search text (substring of its title or
//! description) AND at least one active tag (or no tag is active). Tags are
//! canonicalized the same way on both sides: trimmed and lower-cased.

use tracing::debug;

/// Canonical form of a tag label.
#[must_use]
pub fn canonical_tag(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Parse a comma-separated tag list. Empty entries are dropped.
#[must_use]
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(canonical_tag)
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// The searchable facts of one project card, lower-cased on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardFacts {
    title: String,
    description: String,
    tags: Vec<String>,
}

impl CardFacts {
    /// Build from the card's title text, description text and raw tag list.
    #[must_use]
    pub fn new(title: &str, description: &str, raw_tags: &str) -> Self {
        Self {
            title: title.to_lowercase(),
            description: description.to_lowercase(),
            tags: parse_tags(raw_tags),
        }
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// Whether a card is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Shown,
    Hidden,
}

impl Visibility {
    /// Inline `display` value: empty resets to the stylesheet default.
    #[must_use]
    pub const fn display_value(self) -> &'static str {
        match self {
            Self::Shown => "",
            Self::Hidden => "none",
        }
    }
}

/// Current search text and active tag set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterQuery {
    search: String,
    active_tags: Vec<String>,
}

impl FilterQuery {
    /// Build from the raw input value and the labels of active tag buttons.
    #[must_use]
    pub fn new<I, L>(search: &str, active_labels: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: AsRef<str>,
    {
        let mut active_tags: Vec<String> = Vec::new();
        for label in active_labels {
            let tag = canonical_tag(label.as_ref());
            if !tag.is_empty() && !active_tags.contains(&tag) {
                active_tags.push(tag);
            }
        }
        Self {
            search: search.to_lowercase(),
            active_tags,
        }
    }

    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    #[must_use]
    pub fn active_tags(&self) -> &[String] {
        &self.active_tags
    }

    #[must_use]
    pub fn matches_search(&self, card: &CardFacts) -> bool {
        self.search.is_empty()
            || card.title.contains(&self.search)
            || card.description.contains(&self.search)
    }

    #[must_use]
    pub fn matches_tags(&self, card: &CardFacts) -> bool {
        self.active_tags.is_empty() || self.active_tags.iter().any(|tag| card.tags.contains(tag))
    }

    #[must_use]
    pub fn matches(&self, card: &CardFacts) -> bool {
        self.matches_search(card) && self.matches_tags(card)
    }

    #[must_use]
    pub fn visibility(&self, card: &CardFacts) -> Visibility {
        if self.matches(card) {
            Visibility::Shown
        } else {
            Visibility::Hidden
        }
    }
}

/// Visibility of every card, in input order.
#[must_use]
pub fn apply(query: &FilterQuery, cards: &[CardFacts]) -> Vec<Visibility> {
    let result: Vec<Visibility> = cards.iter().map(|card| query.visibility(card)).collect();
    debug!(
        search = %query.search,
        tags = query.active_tags.len(),
        shown = result.iter().filter(|v| **v == Visibility::Shown).count(),
        total = cards.len(),
        "filter applied"
    );
    result
}
