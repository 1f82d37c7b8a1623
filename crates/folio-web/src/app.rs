//! The browser runtime: executes navigator commands against the live document
//! and (re-)initializes the page components.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use folio_core::config::SiteConfig;
use folio_core::context::{AppContext, Component};
use folio_core::filter::{self, CardFacts, FilterQuery};
use folio_core::link::{self, HistoryState, LinkClick, Modifiers};
use folio_core::metadata::{Decorator, RepoId};
use folio_core::modal::Setup;
use folio_core::navigator::{NavCommand, NavTicket};
use tracing::{debug, info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, Event, HtmlAnchorElement, HtmlInputElement, MouseEvent, Node, PopStateEvent};

use crate::dom::{self, Dom, describe};
use crate::host::{FetchTransport, JsClock, LocalStore, fetch_page};
use crate::modal::{ModalBinding, ModalShared};

type WebDecorator = Decorator<LocalStore, FetchTransport, JsClock>;

/// Event handlers that live as long as the app.
///
/// Registering the same function twice on an element is a no-op in the DOM,
/// so re-running initialization never stacks listeners.
struct Handlers {
    search_input: Closure<dyn FnMut()>,
    tag_click: Closure<dyn FnMut(Event)>,
    modal_open: Closure<dyn FnMut()>,
    link_click: Closure<dyn FnMut(MouseEvent)>,
    popstate: Closure<dyn FnMut(PopStateEvent)>,
}

impl Handlers {
    fn new(weak: &Weak<App>) -> Self {
        let app = weak.clone();
        let search_input = Closure::<dyn FnMut()>::new(move || {
            if let Some(app) = app.upgrade() {
                app.apply_filter();
            }
        });

        let app = weak.clone();
        let tag_click = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let Some(app) = app.upgrade() else {
                return;
            };
            if let Some(button) = event
                .current_target()
                .and_then(|target| target.dyn_into::<Element>().ok())
            {
                dom::toggle_class(&button, &app.config.active_class);
            }
            app.apply_filter();
        });

        let app = weak.clone();
        let modal_open = Closure::<dyn FnMut()>::new(move || {
            if let Some(modal) = app.upgrade().and_then(|app| app.modal()) {
                modal.open();
            }
        });

        let app = weak.clone();
        let link_click = Closure::<dyn FnMut(MouseEvent)>::new(move |event: MouseEvent| {
            if let Some(app) = app.upgrade() {
                app.on_click(&event);
            }
        });

        let app = weak.clone();
        let popstate = Closure::<dyn FnMut(PopStateEvent)>::new(move |event: PopStateEvent| {
            let Some(app) = app.upgrade() else {
                return;
            };
            let state = serde_wasm_bindgen::from_value::<HistoryState>(event.state()).ok();
            let target = link::resolve_popstate(
                state.as_ref(),
                &app.dom.pathname(),
                &app.config.index_document,
            );
            let url = link::resolve(&app.dom.href(), &target).unwrap_or(target);
            app.navigate(url, false);
        });

        Self {
            search_input,
            tag_click,
            modal_open,
            link_click,
            popstate,
        }
    }
}

pub(crate) struct App {
    config: SiteConfig,
    dom: Dom,
    ctx: RefCell<AppContext<Element, ModalBinding>>,
    decorator: Rc<WebDecorator>,
    handlers: Handlers,
}

impl App {
    pub(crate) fn new(config: SiteConfig) -> Result<Rc<Self>, JsValue> {
        let dom = Dom::new()?;
        let decorator = Rc::new(Decorator::new(
            &config,
            LocalStore::open(dom.window()),
            FetchTransport::new(dom.window().clone()),
            JsClock,
        ));
        Ok(Rc::new_cyclic(|weak| Self {
            ctx: RefCell::new(AppContext::new(config.clone())),
            config,
            dom,
            decorator,
            handlers: Handlers::new(weak),
        }))
    }

    pub(crate) fn dom(&self) -> &Dom {
        &self.dom
    }

    /// Initial sequence: mark the current tab, initialize components, then
    /// start intercepting links and history traversal.
    pub(crate) fn start(self: &Rc<Self>) {
        let path = link::page_path(&self.dom.href(), &self.config.index_document);
        self.activate_tab(&path);
        self.reinitialize();
        dom::listen(self.dom.document(), "click", &self.handlers.link_click);
        dom::listen(self.dom.window(), "popstate", &self.handlers.popstate);
        info!(page = %path, "folio started");
    }

    pub(crate) fn navigate(self: &Rc<Self>, url: String, push: bool) {
        let commands = self.ctx.borrow_mut().navigator_mut().begin(url, push);
        self.run(commands);
    }

    fn on_click(self: &Rc<Self>, event: &MouseEvent) {
        if event.default_prevented() {
            return;
        }
        let Some(anchor) = anchor_for(event) else {
            return;
        };
        let click = LinkClick {
            href: anchor.get_attribute("href").unwrap_or_default(),
            resolved: anchor.href(),
            origin: anchor.origin(),
            button: event.button(),
            modifiers: Modifiers {
                ctrl: event.ctrl_key(),
                meta: event.meta_key(),
                shift: event.shift_key(),
                alt: event.alt_key(),
            },
            target: Some(anchor.target()).filter(|target| !target.is_empty()),
            download: anchor.has_attribute("download"),
        };
        if let Some(url) = link::intercept(&click, &self.dom.origin(), &self.config.page_suffix) {
            event.prevent_default();
            self.navigate(url, true);
        }
    }

    fn run(self: &Rc<Self>, commands: Vec<NavCommand<Element>>) {
        for command in commands {
            match command {
                NavCommand::MarkFading => self.set_main_fading(true),
                NavCommand::ClearFading => self.set_main_fading(false),
                NavCommand::Fetch { ticket, url } => self.fetch(ticket, url),
                NavCommand::PushHistory { url } => self.push_history(&url),
                NavCommand::ScheduleSwap { ticket, delay } => {
                    let app = Rc::clone(self);
                    self.dom.after(delay, move || {
                        let commands = app.ctx.borrow_mut().navigator_mut().swap_due(ticket);
                        app.run(commands);
                    });
                }
                NavCommand::FullReload { url } => self.dom.assign(&url),
                NavCommand::SwapMain { url, page } => {
                    if !self.swap_main(&page) {
                        self.dom.assign(&url);
                        return;
                    }
                }
                NavCommand::SetTitle { title } => self.dom.document().set_title(&title),
                NavCommand::ActivateTab { path } => self.activate_tab(&path),
                NavCommand::Reinitialize => self.reinitialize(),
                NavCommand::RequestFrame { ticket } => {
                    let app = Rc::clone(self);
                    self.dom.next_frame(move || {
                        let commands = app.ctx.borrow_mut().navigator_mut().frame(ticket);
                        app.run(commands);
                    });
                }
                NavCommand::RevealMain { page } => {
                    dom::set_class(&page, &self.config.fading_class, false);
                }
            }
        }
    }

    fn fetch(self: &Rc<Self>, ticket: NavTicket, url: String) {
        let app = Rc::clone(self);
        spawn_local(async move {
            let result = fetch_page(app.dom.window(), &url, &app.config.main_selector).await;
            let commands = app.ctx.borrow_mut().navigator_mut().fetched(ticket, result);
            app.run(commands);
        });
    }

    fn set_main_fading(&self, on: bool) {
        if let Some(main) = self.dom.query(&self.config.main_selector) {
            dom::set_class(&main, &self.config.fading_class, on);
        }
    }

    fn push_history(&self, url: &str) {
        match serde_wasm_bindgen::to_value(&HistoryState::new(url)) {
            Ok(state) => self.dom.push_history(&state, url),
            Err(err) => warn!(url, error = %err, "history state not serializable"),
        }
    }

    /// Replace the current main region with `page`, inserted faded.
    fn swap_main(&self, page: &Element) -> bool {
        let Some(current) = self.dom.query(&self.config.main_selector) else {
            warn!("current document has no main region; reloading");
            return false;
        };
        dom::set_class(page, &self.config.fading_class, true);
        let incoming: &Node = page;
        match current.replace_with_with_node_1(incoming) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %describe(&err), "main region swap failed; reloading");
                false
            }
        }
    }

    fn activate_tab(&self, path: &str) {
        for link in self.dom.query_all(&self.config.nav_link_selector) {
            let current = link.get_attribute("href").as_deref() == Some(path);
            dom::set_class(&link, &self.config.active_class, current);
        }
    }

    fn reinitialize(self: &Rc<Self>) {
        let order = self.ctx.borrow_mut().reinitialize();
        for component in order {
            match component {
                Component::Metadata => self.decorate_cards(),
                Component::Filter => self.init_filtering(),
                Component::Modal => self.init_modal(),
            }
        }
    }

    /// Start one independent description lookup per decorated card.
    fn decorate_cards(self: &Rc<Self>) {
        let mut started = 0_usize;
        for card in self.dom.query_all(&self.config.card_selector) {
            let Some(raw) = card.get_attribute(&self.config.repo_attribute) else {
                continue;
            };
            let Some(target) = dom::query_within(&card, &self.config.description_selector) else {
                continue;
            };
            let repo = match RepoId::parse(&raw) {
                Ok(repo) => repo,
                Err(err) => {
                    debug!(error = %err, "skipping card");
                    continue;
                }
            };
            let decorator = Rc::clone(&self.decorator);
            let app = Rc::downgrade(self);
            spawn_local(async move {
                let resolution = decorator.resolve(&repo).await;
                let Some(text) = resolution.description() else {
                    return;
                };
                target.set_text_content(Some(text));
                if let Some(app) = app.upgrade() {
                    let refilter = app.ctx.borrow().filter_reads_descriptions();
                    if refilter {
                        app.apply_filter();
                    }
                }
            });
            started += 1;
        }
        debug!(cards = started, "decorating cards");
    }

    fn init_filtering(&self) {
        let Some(input) = self.dom.by_id(&self.config.search_input_id) else {
            return;
        };
        dom::listen(&input, "input", &self.handlers.search_input);
        for button in self.dom.query_all(&self.config.tag_button_selector) {
            dom::listen(&button, "click", &self.handlers.tag_click);
        }
        self.apply_filter();
    }

    /// Recompute card visibility from the search box and active tag buttons.
    pub(crate) fn apply_filter(&self) {
        let Some(input) = self
            .dom
            .by_id(&self.config.search_input_id)
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
        else {
            return;
        };
        let active: Vec<String> = self
            .dom
            .query_all(&self.config.tag_button_selector)
            .into_iter()
            .filter(|button| button.class_list().contains(&self.config.active_class))
            .map(|button| button.text_content().unwrap_or_default())
            .collect();
        let query = FilterQuery::new(&input.value(), active);

        let cards = self.dom.query_all(&self.config.card_selector);
        let facts: Vec<CardFacts> = cards
            .iter()
            .map(|card| {
                CardFacts::new(
                    &dom::text_within(card, &self.config.title_selector),
                    &dom::text_within(card, &self.config.description_selector),
                    &card
                        .get_attribute(&self.config.tags_attribute)
                        .unwrap_or_default(),
                )
            })
            .collect();
        for (card, visibility) in cards.iter().zip(filter::apply(&query, &facts)) {
            dom::set_display(card, visibility.display_value());
        }
        self.ctx.borrow_mut().record_filter(query);
    }

    fn init_modal(&self) {
        let Some(modal) = self.dom.by_id(&self.config.modal_id) else {
            return;
        };
        let Some(overlay) = self.dom.query(&self.config.overlay_selector) else {
            debug!("dialog present without overlay; skipping");
            return;
        };
        let mut ctx = self.ctx.borrow_mut();
        let registry = ctx.modals_mut();
        registry.retain(ModalBinding::is_connected);
        let (setup, _) = registry.ensure_with(
            |binding| binding.is_for(&modal),
            || ModalBinding::new(&self.dom, modal.clone(), overlay, &self.config),
        );
        drop(ctx);
        if setup == Setup::Created {
            debug!("dialog bound");
        }
        for opener in self.dom.query_all(&self.config.opener_selector) {
            dom::listen(&opener, "click", &self.handlers.modal_open);
        }
    }

    /// The most recently bound dialog still in the document.
    pub(crate) fn modal(&self) -> Option<Rc<ModalShared>> {
        self.ctx
            .borrow()
            .modals()
            .latest(ModalBinding::is_connected)
            .map(ModalBinding::shared)
    }
}

fn anchor_for(event: &Event) -> Option<HtmlAnchorElement> {
    let target = event.target()?;
    let element = match target.dyn_into::<Element>() {
        Ok(element) => element,
        Err(other) => other.dyn_into::<Node>().ok()?.parent_element()?,
    };
    element.closest("a").ok()??.dyn_into::<HtmlAnchorElement>().ok()
}
