#![forbid(unsafe_code)]

//! Pseudo-navigation transition machine.
//!
//! [`Navigator`] drives each intercepted navigation through an explicit
//! two-phase transition without threads or callbacks. The host executes the
//! returned [`NavCommand`]s in order and reports back:
//!
//! 1. [`Navigator::begin`]: mark the current main region as fading, fetch.
//! 2. [`Navigator::fetched`]: on success push history and arm the swap timer;
//!    on failure clear the fading marker and fall back to a full page load.
//! 3. [`Navigator::swap_due`]: swap the main region, retitle, re-activate the
//!    tab, re-initialize components, request the next animation frame.
//! 4. [`Navigator::frame`]: reveal the new main region.
//!
//! ```text
//!   begin ──► FadingOut ──fetched(Ok)──► AwaitingSwap ──swap_due──► FadingIn ──frame──► done
//!                 │
//!                 └──fetched(Err)──► FullReload
//! ```
//!
//! Navigations are never cancelled. Two overlapping navigations both run to
//! completion and the last swap applied wins.

use core::time::Duration;
use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::link::page_path;

/// Reasons a fetched page cannot be swapped in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavError {
    /// The request never produced a response.
    #[error("navigation fetch failed: {0}")]
    Network(String),
    /// The server answered with a non-success status.
    #[error("navigation fetch returned HTTP {0}")]
    Status(u16),
    /// The body could not be read or parsed as HTML.
    #[error("fetched document could not be parsed: {0}")]
    Parse(String),
    /// The parsed document has no main region.
    #[error("fetched document has no main region")]
    MissingMain,
}

/// Identifies one navigation from `begin` until its reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NavTicket(u64);

/// Where a navigation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPhase {
    /// Outgoing transition running, fetch in flight.
    FadingOut,
    /// Page fetched, waiting for the transition delay to elapse.
    AwaitingSwap,
    /// Content swapped, waiting for the next paint to reveal it.
    FadingIn,
}

/// A fetched and parsed page, ready to be swapped in.
///
/// `P` is the host's representation of the parsed main region (a detached
/// DOM node in the browser).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage<P> {
    pub main: P,
    pub title: Option<String>,
}

/// Work the host must perform, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavCommand<P> {
    /// Add the fading marker to the current main region.
    MarkFading,
    /// Fetch `url` (same-origin, credentialed) and report via [`Navigator::fetched`].
    Fetch { ticket: NavTicket, url: String },
    /// Push `{url}` onto the history stack without reloading.
    PushHistory { url: String },
    /// Call [`Navigator::swap_due`] after `delay`.
    ScheduleSwap { ticket: NavTicket, delay: Duration },
    /// Remove the fading marker from the current main region.
    ClearFading,
    /// Abandon pseudo-navigation and load `url` for real.
    FullReload { url: String },
    /// Replace the current main region with `page` in one operation.
    ///
    /// `url` is the fallback target if the document has lost its main region.
    SwapMain { url: String, page: P },
    /// Set the document title.
    SetTitle { title: String },
    /// Mark the navigation link for `path` as current.
    ActivateTab { path: String },
    /// Re-run the components against the new content, in
    /// [`REINIT_ORDER`](crate::context::REINIT_ORDER).
    Reinitialize,
    /// Call [`Navigator::frame`] on the next animation frame.
    RequestFrame { ticket: NavTicket },
    /// Remove the fading marker from the swapped-in main region.
    RevealMain { page: P },
}

#[derive(Debug)]
struct Transition<P> {
    url: String,
    push: bool,
    phase: TransitionPhase,
    pending: Option<FetchedPage<P>>,
    swapped: Option<P>,
}

/// Host-driven pseudo-navigation state machine.
#[derive(Debug)]
pub struct Navigator<P> {
    delay: Duration,
    index_document: String,
    next_ticket: u64,
    transitions: BTreeMap<NavTicket, Transition<P>>,
    swaps_applied: u64,
    fallbacks: u64,
}

impl<P: Clone> Navigator<P> {
    /// Create a navigator with a fixed transition `delay`.
    #[must_use]
    pub fn new(delay: Duration, index_document: impl Into<String>) -> Self {
        Self {
            delay,
            index_document: index_document.into(),
            next_ticket: 0,
            transitions: BTreeMap::new(),
            swaps_applied: 0,
            fallbacks: 0,
        }
    }

    /// Start navigating to `url`.
    ///
    /// `push` is false when replaying a history entry (the browser already
    /// moved its own stack).
    pub fn begin(&mut self, url: impl Into<String>, push: bool) -> Vec<NavCommand<P>> {
        let url = url.into();
        self.next_ticket += 1;
        let ticket = NavTicket(self.next_ticket);
        info!(ticket = ticket.0, url = %url, push, "navigation started");

        self.transitions.insert(
            ticket,
            Transition {
                url: url.clone(),
                push,
                phase: TransitionPhase::FadingOut,
                pending: None,
                swapped: None,
            },
        );
        vec![NavCommand::MarkFading, NavCommand::Fetch { ticket, url }]
    }

    /// Report the outcome of the fetch for `ticket`.
    pub fn fetched(
        &mut self,
        ticket: NavTicket,
        result: Result<FetchedPage<P>, NavError>,
    ) -> Vec<NavCommand<P>> {
        let Some(transition) = self
            .transitions
            .get_mut(&ticket)
            .filter(|t| t.phase == TransitionPhase::FadingOut)
        else {
            debug!(ticket = ticket.0, "ignoring fetch result for unknown navigation");
            return Vec::new();
        };

        match result {
            Ok(page) => {
                transition.phase = TransitionPhase::AwaitingSwap;
                transition.pending = Some(page);
                let mut commands = Vec::with_capacity(2);
                if transition.push {
                    commands.push(NavCommand::PushHistory {
                        url: transition.url.clone(),
                    });
                }
                commands.push(NavCommand::ScheduleSwap {
                    ticket,
                    delay: self.delay,
                });
                commands
            }
            Err(err) => {
                let url = transition.url.clone();
                self.transitions.remove(&ticket);
                self.fallbacks += 1;
                warn!(ticket = ticket.0, url = %url, error = %err, "navigation failed, falling back to full load");
                vec![NavCommand::ClearFading, NavCommand::FullReload { url }]
            }
        }
    }

    /// The transition delay for `ticket` has elapsed.
    pub fn swap_due(&mut self, ticket: NavTicket) -> Vec<NavCommand<P>> {
        let Some(transition) = self
            .transitions
            .get_mut(&ticket)
            .filter(|t| t.phase == TransitionPhase::AwaitingSwap)
        else {
            debug!(ticket = ticket.0, "ignoring swap timer for unknown navigation");
            return Vec::new();
        };
        let Some(page) = transition.pending.take() else {
            return Vec::new();
        };

        transition.phase = TransitionPhase::FadingIn;
        transition.swapped = Some(page.main.clone());
        self.swaps_applied += 1;
        info!(ticket = ticket.0, url = %transition.url, "swapping main region");

        let mut commands = Vec::with_capacity(6);
        commands.push(NavCommand::SwapMain {
            url: transition.url.clone(),
            page: page.main,
        });
        if let Some(title) = page.title.filter(|t| !t.is_empty()) {
            commands.push(NavCommand::SetTitle { title });
        }
        commands.push(NavCommand::ActivateTab {
            path: page_path(&transition.url, &self.index_document),
        });
        commands.push(NavCommand::Reinitialize);
        commands.push(NavCommand::RequestFrame { ticket });
        commands
    }

    /// The first animation frame after the swap for `ticket` has arrived.
    pub fn frame(&mut self, ticket: NavTicket) -> Vec<NavCommand<P>> {
        match self.transitions.get(&ticket).map(|t| t.phase) {
            Some(TransitionPhase::FadingIn) => {}
            _ => return Vec::new(),
        }
        let Some(page) = self.transitions.remove(&ticket).and_then(|t| t.swapped) else {
            return Vec::new();
        };
        vec![NavCommand::RevealMain { page }]
    }

    /// Phase of `ticket`, or `None` once it completed or fell back.
    #[must_use]
    pub fn phase(&self, ticket: NavTicket) -> Option<TransitionPhase> {
        self.transitions.get(&ticket).map(|t| t.phase)
    }

    /// Number of navigations not yet revealed or abandoned.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.transitions.len()
    }

    /// Number of main-region swaps issued so far.
    #[must_use]
    pub const fn swaps_applied(&self) -> u64 {
        self.swaps_applied
    }

    /// Number of navigations that fell back to a full page load.
    #[must_use]
    pub const fn fallbacks(&self) -> u64 {
        self.fallbacks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn nav() -> Navigator<&'static str> {
        Navigator::new(Duration::from_millis(180), "index.html")
    }

    fn ticket_of(commands: &[NavCommand<&'static str>]) -> NavTicket {
        commands
            .iter()
            .find_map(|c| match c {
                NavCommand::Fetch { ticket, .. } => Some(*ticket),
                _ => None,
            })
            .expect("begin emits a fetch")
    }

    fn page(main: &'static str, title: Option<&str>) -> FetchedPage<&'static str> {
        FetchedPage {
            main,
            title: title.map(str::to_owned),
        }
    }

    #[test]
    fn successful_navigation_runs_every_phase() {
        let mut nav = nav();
        let begin = nav.begin("https://x.dev/projects.html", true);
        let t = ticket_of(&begin);
        assert_eq!(
            begin,
            vec![
                NavCommand::MarkFading,
                NavCommand::Fetch {
                    ticket: t,
                    url: "https://x.dev/projects.html".into()
                },
            ]
        );
        assert_eq!(nav.phase(t), Some(TransitionPhase::FadingOut));

        let fetched = nav.fetched(t, Ok(page("<main/>", Some("Projects"))));
        assert_eq!(
            fetched,
            vec![
                NavCommand::PushHistory {
                    url: "https://x.dev/projects.html".into()
                },
                NavCommand::ScheduleSwap {
                    ticket: t,
                    delay: Duration::from_millis(180)
                },
            ]
        );
        assert_eq!(nav.phase(t), Some(TransitionPhase::AwaitingSwap));

        let swapped = nav.swap_due(t);
        assert_eq!(
            swapped,
            vec![
                NavCommand::SwapMain {
                    url: "https://x.dev/projects.html".into(),
                    page: "<main/>"
                },
                NavCommand::SetTitle {
                    title: "Projects".into()
                },
                NavCommand::ActivateTab {
                    path: "projects.html".into()
                },
                NavCommand::Reinitialize,
                NavCommand::RequestFrame { ticket: t },
            ]
        );
        assert_eq!(nav.phase(t), Some(TransitionPhase::FadingIn));

        assert_eq!(nav.frame(t), vec![NavCommand::RevealMain { page: "<main/>" }]);
        assert_eq!(nav.phase(t), None);
        assert_eq!(nav.in_flight(), 0);
        assert_eq!(nav.swaps_applied(), 1);
    }

    #[test]
    fn history_replay_does_not_push() {
        let mut nav = nav();
        let t = ticket_of(&nav.begin("about.html", false));
        let fetched = nav.fetched(t, Ok(page("m", None)));
        assert!(
            !fetched
                .iter()
                .any(|c| matches!(c, NavCommand::PushHistory { .. }))
        );
    }

    #[test]
    fn missing_title_keeps_current_title() {
        let mut nav = nav();
        let t = ticket_of(&nav.begin("about.html", true));
        nav.fetched(t, Ok(page("m", Some(""))));
        let swapped = nav.swap_due(t);
        assert!(
            !swapped
                .iter()
                .any(|c| matches!(c, NavCommand::SetTitle { .. }))
        );
    }

    #[test]
    fn failure_falls_back_to_full_load() {
        for err in [
            NavError::Network("offline".into()),
            NavError::Status(500),
            NavError::MissingMain,
            NavError::Parse("bad".into()),
        ] {
            let mut nav = nav();
            let t = ticket_of(&nav.begin("broken.html", true));
            assert_eq!(
                nav.fetched(t, Err(err)),
                vec![
                    NavCommand::ClearFading,
                    NavCommand::FullReload {
                        url: "broken.html".into()
                    },
                ]
            );
            assert_eq!(nav.phase(t), None);
            assert_eq!(nav.fallbacks(), 1);
            // A late timer for the abandoned ticket does nothing.
            assert!(nav.swap_due(t).is_empty());
        }
    }

    #[test]
    fn out_of_order_reports_are_ignored() {
        let mut nav = nav();
        let t = ticket_of(&nav.begin("a.html", true));
        assert!(nav.swap_due(t).is_empty());
        assert!(nav.frame(t).is_empty());
        nav.fetched(t, Ok(page("m", None)));
        assert!(nav.fetched(t, Ok(page("dup", None))).is_empty());
        assert!(nav.frame(t).is_empty());
        assert!(nav.frame(NavTicket(99)).is_empty());
    }

    #[test]
    fn overlapping_navigations_both_swap_last_wins() {
        let mut nav = nav();
        let first = ticket_of(&nav.begin("a.html", true));
        let second = ticket_of(&nav.begin("b.html", true));
        assert_ne!(first, second);
        assert_eq!(nav.in_flight(), 2);

        nav.fetched(second, Ok(page("b", None)));
        nav.fetched(first, Ok(page("a", None)));

        let mut applied = Vec::new();
        for t in [second, first] {
            for command in nav.swap_due(t) {
                if let NavCommand::SwapMain { page, .. } = command {
                    applied.push(page);
                }
            }
        }
        assert_eq!(applied, vec!["b", "a"]);
        assert_eq!(nav.swaps_applied(), 2);
    }
}
