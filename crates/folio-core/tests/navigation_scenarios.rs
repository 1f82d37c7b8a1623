//! Scripted pseudo-navigation against a simulated document.
//!
//! The simulated host executes [`NavCommand`]s the way the browser glue does
//! and records what a user would observe: the main region, title, active tab,
//! history stack and any full page loads.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use folio_core::config::SiteConfig;
use folio_core::context::{AppContext, Component};
use folio_core::link::{self, HistoryState, LinkClick};
use folio_core::navigator::{FetchedPage, NavCommand, NavError, NavTicket};
use pretty_assertions::assert_eq;

const ORIGIN: &str = "https://folio.example";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Main {
    html: String,
    fading: bool,
}

/// Host events waiting to be delivered, in delivery order.
#[derive(Debug)]
enum Pending {
    Fetch { ticket: NavTicket, url: String },
    Timer { ticket: NavTicket, delay: Duration },
    Frame { ticket: NavTicket },
}

struct SimulatedSite {
    ctx: AppContext<Main, ()>,
    server: BTreeMap<String, Result<(String, Option<String>), NavError>>,
    main: Option<Main>,
    title: String,
    active_tab: String,
    history: Vec<HistoryState>,
    full_loads: Vec<String>,
    reinit_passes: Vec<[Component; 3]>,
    pending: VecDeque<Pending>,
}

impl SimulatedSite {
    fn new() -> Self {
        let config = SiteConfig::default();
        let mut site = Self {
            ctx: AppContext::new(config),
            server: BTreeMap::new(),
            main: Some(Main {
                html: "home".into(),
                fading: false,
            }),
            title: "Home".into(),
            active_tab: String::new(),
            history: Vec::new(),
            full_loads: Vec::new(),
            reinit_passes: Vec::new(),
            pending: VecDeque::new(),
        };
        site.active_tab = link::page_path(&format!("{ORIGIN}/"), "index.html");
        let order = site.ctx.reinitialize();
        site.reinit_passes.push(order);
        site
    }

    fn serve(&mut self, page: &str, main: &str, title: Option<&str>) {
        self.server.insert(
            format!("{ORIGIN}/{page}"),
            Ok((main.to_owned(), title.map(str::to_owned))),
        );
    }

    fn serve_error(&mut self, page: &str, err: NavError) {
        self.server.insert(format!("{ORIGIN}/{page}"), Err(err));
    }

    fn click(&mut self, href: &str) -> bool {
        let resolved = link::resolve(&format!("{ORIGIN}/index.html"), href).unwrap();
        let origin = url_origin(&resolved);
        let click = LinkClick::primary(href, resolved, origin);
        match link::intercept(&click, ORIGIN, &self.ctx.config().page_suffix) {
            Some(url) => {
                let commands = self.ctx.navigator_mut().begin(url, true);
                self.run(commands);
                true
            }
            None => false,
        }
    }

    fn back(&mut self) {
        self.history.pop();
        let state = self.history.last().cloned();
        let url = link::resolve_popstate(state.as_ref(), "/", "index.html");
        let url = link::resolve(&format!("{ORIGIN}/"), &url).unwrap();
        let commands = self.ctx.navigator_mut().begin(url, false);
        self.run(commands);
    }

    fn run(&mut self, commands: Vec<NavCommand<Main>>) {
        for command in commands {
            match command {
                NavCommand::MarkFading | NavCommand::ClearFading => {
                    let fading = matches!(command, NavCommand::MarkFading);
                    if let Some(main) = self.main.as_mut() {
                        main.fading = fading;
                    }
                }
                NavCommand::Fetch { ticket, url } => {
                    self.pending.push_back(Pending::Fetch { ticket, url });
                }
                NavCommand::PushHistory { url } => self.history.push(HistoryState::new(url)),
                NavCommand::ScheduleSwap { ticket, delay } => {
                    self.pending.push_back(Pending::Timer { ticket, delay });
                }
                NavCommand::FullReload { url } => self.full_loads.push(url),
                NavCommand::SwapMain { page, .. } => {
                    let mut page = page;
                    page.fading = true;
                    self.main = Some(page);
                }
                NavCommand::SetTitle { title } => self.title = title,
                NavCommand::ActivateTab { path } => self.active_tab = path,
                NavCommand::Reinitialize => {
                    let order = self.ctx.reinitialize();
                    self.reinit_passes.push(order);
                }
                NavCommand::RequestFrame { ticket } => {
                    self.pending.push_back(Pending::Frame { ticket });
                }
                NavCommand::RevealMain { page } => {
                    if let Some(main) = self.main.as_mut().filter(|m| m.html == page.html) {
                        main.fading = false;
                    }
                }
            }
        }
    }

    /// Deliver every pending host event until the page is idle.
    fn settle(&mut self) {
        while let Some(event) = self.pending.pop_front() {
            let commands = match event {
                Pending::Fetch { ticket, url } => {
                    let result = match self.server.get(&url) {
                        Some(Ok((html, title))) => Ok(FetchedPage {
                            main: Main {
                                html: html.clone(),
                                fading: false,
                            },
                            title: title.clone(),
                        }),
                        Some(Err(err)) => Err(err.clone()),
                        None => Err(NavError::Status(404)),
                    };
                    self.ctx.navigator_mut().fetched(ticket, result)
                }
                Pending::Timer { ticket, delay } => {
                    assert_eq!(delay, Duration::from_millis(180));
                    self.ctx.navigator_mut().swap_due(ticket)
                }
                Pending::Frame { ticket } => self.ctx.navigator_mut().frame(ticket),
            };
            self.run(commands);
        }
    }
}

fn url_origin(resolved: &str) -> String {
    url::Url::parse(resolved)
        .map(|u| u.origin().ascii_serialization())
        .unwrap_or_default()
}

#[test]
fn same_origin_page_link_swaps_without_reload() {
    let mut site = SimulatedSite::new();
    site.serve("projects.html", "projects", Some("Projects"));

    assert!(site.click("projects.html"));
    assert_eq!(site.main.as_ref().map(|m| m.fading), Some(true));
    site.settle();

    assert_eq!(
        site.main,
        Some(Main {
            html: "projects".into(),
            fading: false
        })
    );
    assert_eq!(site.title, "Projects");
    assert_eq!(site.active_tab, "projects.html");
    assert_eq!(
        site.history,
        vec![HistoryState::new(format!("{ORIGIN}/projects.html"))]
    );
    assert!(site.full_loads.is_empty());
    assert_eq!(site.reinit_passes.len(), 2);
    assert_eq!(
        site.reinit_passes[1],
        [Component::Metadata, Component::Filter, Component::Modal]
    );
    assert_eq!(site.ctx.navigator().in_flight(), 0);
}

#[test]
fn foreign_links_are_not_intercepted() {
    let mut site = SimulatedSite::new();
    assert!(!site.click("https://github.com/octo/auth-server"));
    assert!(!site.click("https://other.example/page.html"));
    assert!(!site.click("resume.pdf"));
    assert!(site.pending.is_empty());
    assert_eq!(site.main.as_ref().map(|m| m.html.as_str()), Some("home"));
}

#[test]
fn missing_main_falls_back_to_full_load() {
    let mut site = SimulatedSite::new();
    site.serve_error("broken.html", NavError::MissingMain);

    assert!(site.click("broken.html"));
    site.settle();

    assert_eq!(site.full_loads, vec![format!("{ORIGIN}/broken.html")]);
    assert_eq!(
        site.main,
        Some(Main {
            html: "home".into(),
            fading: false
        })
    );
    assert!(site.history.is_empty());
    assert_eq!(site.reinit_passes.len(), 1);
}

#[test]
fn unknown_page_falls_back_to_full_load() {
    let mut site = SimulatedSite::new();
    assert!(site.click("nowhere.html"));
    site.settle();
    assert_eq!(site.full_loads, vec![format!("{ORIGIN}/nowhere.html")]);
}

#[test]
fn back_navigation_replays_without_pushing() {
    let mut site = SimulatedSite::new();
    site.serve("projects.html", "projects", Some("Projects"));
    site.serve("about.html", "about", Some("About"));
    site.serve("index.html", "home", Some("Home"));

    site.click("projects.html");
    site.settle();
    site.click("about.html");
    site.settle();
    assert_eq!(site.history.len(), 2);

    site.back();
    site.settle();
    assert_eq!(site.main.as_ref().map(|m| m.html.as_str()), Some("projects"));
    assert_eq!(site.active_tab, "projects.html");
    assert_eq!(site.history.len(), 1);

    site.back();
    site.settle();
    assert_eq!(site.main.as_ref().map(|m| m.html.as_str()), Some("home"));
    assert_eq!(site.active_tab, "index.html");
    assert!(site.history.is_empty());
}

#[test]
fn rapid_double_click_applies_both_last_wins() {
    let mut site = SimulatedSite::new();
    site.serve("projects.html", "projects", Some("Projects"));
    site.serve("about.html", "about", Some("About"));

    site.click("projects.html");
    site.click("about.html");
    site.settle();

    assert_eq!(site.ctx.navigator().swaps_applied(), 2);
    assert_eq!(site.main.as_ref().map(|m| m.html.as_str()), Some("about"));
    assert_eq!(site.title, "About");
    assert_eq!(site.history.len(), 2);
}
