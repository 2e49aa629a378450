//! In-memory page for exercising the helpers without a browser
//!
//! [`MockPage`] keeps a small DOM tree with display flags and scripted click
//! effects, and answers the [`Browser`] calls the way a WebDriver session
//! would: hidden elements render no text and cannot be clicked, element
//! references go stale once their node leaves the document, and
//! `confirm()`-style prompts block clicks until accepted.
//!
//! [`MockPage::pam`] builds the PAM application shell used throughout the
//! tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::browser::{Browser, By, ElementRef};
use crate::error::{E2eError, E2eResult};
use crate::menu::MenuOption;
use crate::theme::THEME_ATTRIBUTE;

const ROOT: usize = 0;
const ELEMENT_PREFIX: &str = "mock-node-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Element description used to build the tree
#[derive(Debug, Clone, Default)]
pub struct El {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    text: String,
    hidden: bool,
    children: Vec<El>,
}

impl El {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Add one or more whitespace-separated classes
    pub fn class(mut self, classes: &str) -> Self {
        self.classes
            .extend(classes.split_whitespace().map(String::from));
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn child(mut self, child: El) -> Self {
        self.children.push(child);
        self
    }
}

/// What happens when a node is clicked
#[derive(Debug, Clone)]
pub enum Effect {
    Show(NodeId),
    Hide(NodeId),
    SetAttribute {
        node: NodeId,
        name: String,
        value: String,
    },
    /// Move a node (and its subtree) under `parent`
    Attach { node: NodeId, parent: NodeId },
    /// Take a node out of the document
    Detach(NodeId),
    /// Open a new browser window
    OpenWindow,
    /// Raise a native confirm prompt; `then` runs when it is accepted
    Confirm { message: String, then: Vec<Effect> },
}

#[derive(Debug)]
struct Node {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    text: String,
    value: String,
    displayed: bool,
    parent: Option<usize>,
    children: Vec<usize>,
    on_click: Vec<Effect>,
}

#[derive(Debug)]
struct State {
    nodes: Vec<Node>,
    url: Option<String>,
    window_size: (u32, u32),
    windows: Vec<String>,
    current_window: Option<String>,
    next_window: usize,
    alert: Option<(String, Vec<Effect>)>,
    clicks: Vec<usize>,
}

/// In-memory stand-in for a browser page
#[derive(Debug)]
pub struct MockPage {
    state: Mutex<State>,
}

impl Default for MockPage {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPage {
    /// Empty document: `<html><body></body></html>` in a single window
    pub fn new() -> Self {
        let page = Self {
            state: Mutex::new(State {
                nodes: vec![Node::from_el(&El::new("html"), None)],
                url: None,
                window_size: (1280, 800),
                windows: vec!["window-1".to_string()],
                current_window: Some("window-1".to_string()),
                next_window: 2,
                alert: None,
                clicks: Vec::new(),
            }),
        };
        page.append(page.root(), El::new("body"));
        page
    }

    pub fn root(&self) -> NodeId {
        NodeId(ROOT)
    }

    pub fn body(&self) -> NodeId {
        let state = self.state.lock();
        NodeId(state.nodes[ROOT].children[0])
    }

    /// Append `el` (with its children) under `parent`
    pub fn append(&self, parent: NodeId, el: El) -> NodeId {
        let mut state = self.state.lock();
        let id = state.insert(&el, Some(parent.0));
        state.nodes[parent.0].children.push(id);
        NodeId(id)
    }

    /// Build `el` outside the document, ready to be attached by an effect
    pub fn create_detached(&self, el: El) -> NodeId {
        let mut state = self.state.lock();
        NodeId(state.insert(&el, None))
    }

    pub fn on_click(&self, node: NodeId, effect: Effect) {
        self.state.lock().nodes[node.0].on_click.push(effect);
    }

    pub fn element(&self, node: NodeId) -> ElementRef {
        ElementRef::new(format!("{}{}", ELEMENT_PREFIX, node.0))
    }

    /// First node in the document matching `by`
    pub fn node(&self, by: &By) -> Option<NodeId> {
        let state = self.state.lock();
        state
            .descendants(ROOT)
            .into_iter()
            .find(|&i| state.nodes[i].matches(by).unwrap_or(false))
            .map(NodeId)
    }

    /// Descendants of `node` matching `by`
    pub fn nodes_in(&self, node: NodeId, by: &By) -> Vec<NodeId> {
        let state = self.state.lock();
        state
            .descendants(node.0)
            .into_iter()
            .filter(|&i| state.nodes[i].matches(by).unwrap_or(false))
            .map(NodeId)
            .collect()
    }

    pub fn set_displayed(&self, node: NodeId, displayed: bool) {
        self.state.lock().nodes[node.0].displayed = displayed;
    }

    pub fn detach(&self, node: NodeId) {
        self.state.lock().apply(&Effect::Detach(node));
    }

    /// Total clicks delivered to any element
    pub fn click_count(&self) -> usize {
        self.state.lock().clicks.len()
    }

    pub fn clicks_on(&self, node: NodeId) -> usize {
        self.state.lock().clicks.iter().filter(|&&i| i == node.0).count()
    }

    /// Last URL navigated to
    pub fn url(&self) -> Option<String> {
        self.state.lock().url.clone()
    }

    pub fn window_size(&self) -> (u32, u32) {
        self.state.lock().window_size
    }

    fn resolve(&self, element: &ElementRef) -> E2eResult<usize> {
        let state = self.state.lock();
        state.resolve(element)
    }
}

impl Node {
    fn from_el(el: &El, parent: Option<usize>) -> Self {
        Self {
            tag: el.tag.clone(),
            id: el.id.clone(),
            classes: el.classes.clone(),
            attributes: el.attributes.clone(),
            text: el.text.clone(),
            value: String::new(),
            displayed: !el.hidden,
            parent,
            children: Vec::new(),
            on_click: Vec::new(),
        }
    }

    fn attribute(&self, name: &str) -> Option<String> {
        match name {
            "id" => self.id.clone(),
            "class" => (!self.classes.is_empty()).then(|| self.classes.join(" ")),
            "value" if !self.value.is_empty() => Some(self.value.clone()),
            _ => self.attributes.get(name).cloned(),
        }
    }

    /// `None` when the selector kind is not understood by the mock
    fn matches(&self, by: &By) -> Option<bool> {
        match by {
            By::Id(id) => Some(self.id.as_deref() == Some(id.as_str())),
            By::ClassName(class) => Some(self.classes.iter().any(|c| c == class)),
            By::TagName(tag) => Some(self.tag.eq_ignore_ascii_case(tag)),
            By::Name(name) => Some(self.attributes.get("name") == Some(name)),
            By::Attribute { name, value } => {
                Some(self.attribute(name).as_deref() == Some(value.as_str()))
            }
            By::Css(css) => match By::parse(css) {
                By::Css(_) => None,
                simple => self.matches(&simple),
            },
            By::XPath(_) => None,
        }
    }
}

impl State {
    fn insert(&mut self, el: &El, parent: Option<usize>) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::from_el(el, parent));
        for child in &el.children {
            let child_id = self.insert(child, Some(id));
            self.nodes[id].children.push(child_id);
        }
        id
    }

    fn in_document(&self, mut index: usize) -> bool {
        loop {
            if index == ROOT {
                return true;
            }
            match self.nodes[index].parent {
                Some(parent) => index = parent,
                None => return false,
            }
        }
    }

    fn resolve(&self, element: &ElementRef) -> E2eResult<usize> {
        let index = element
            .id()
            .strip_prefix(ELEMENT_PREFIX)
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|&i| i < self.nodes.len())
            .ok_or_else(|| E2eError::WebDriver {
                error: "no such element".to_string(),
                message: format!("unknown element reference {}", element),
            })?;
        if !self.in_document(index) {
            return Err(E2eError::WebDriver {
                error: "stale element reference".to_string(),
                message: format!("{} is no longer attached to the document", element),
            });
        }
        Ok(index)
    }

    /// Preorder descendants of `index`, excluding itself
    fn descendants(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.nodes[index].children.iter().rev().copied().collect();
        while let Some(i) = stack.pop() {
            out.push(i);
            stack.extend(self.nodes[i].children.iter().rev().copied());
        }
        out
    }

    fn is_displayed(&self, mut index: usize) -> bool {
        loop {
            if !self.nodes[index].displayed {
                return false;
            }
            match self.nodes[index].parent {
                Some(parent) => index = parent,
                None => return index == ROOT,
            }
        }
    }

    fn raw_text(&self, index: usize, visible_only: bool) -> String {
        let node = &self.nodes[index];
        let mut text = node.text.clone();
        for &child in &node.children {
            if !visible_only || self.nodes[child].displayed {
                text.push_str(&self.raw_text(child, visible_only));
            }
        }
        text
    }

    fn rendered_text(&self, index: usize) -> String {
        if !self.is_displayed(index) {
            return String::new();
        }
        self.raw_text(index, true).replace('\u{a0}', " ").trim().to_string()
    }

    fn find_all(&self, root: usize, by: &By) -> E2eResult<Vec<usize>> {
        if let By::XPath(path) = by {
            return match path.as_str() {
                "./.." | ".." => Ok(self.nodes[root].parent.into_iter().collect()),
                "./child::*" | "./*" => Ok(self.nodes[root].children.clone()),
                "." | "./self::*" => Ok(vec![root]),
                other => Err(invalid_selector(other)),
            };
        }

        let mut found = Vec::new();
        for index in self.descendants(root) {
            match self.nodes[index].matches(by) {
                Some(true) => found.push(index),
                Some(false) => {}
                None => return Err(invalid_selector(&by.to_string())),
            }
        }
        Ok(found)
    }

    fn find(&self, root: usize, by: &By) -> E2eResult<usize> {
        self.find_all(root, by)?
            .into_iter()
            .next()
            .ok_or_else(|| E2eError::ElementNotFound(by.to_string()))
    }

    fn detach(&mut self, index: usize) {
        if let Some(parent) = self.nodes[index].parent.take() {
            self.nodes[parent].children.retain(|&c| c != index);
        }
    }

    fn apply(&mut self, effect: &Effect) {
        match effect {
            Effect::Show(node) => self.nodes[node.0].displayed = true,
            Effect::Hide(node) => self.nodes[node.0].displayed = false,
            Effect::SetAttribute { node, name, value } => {
                self.nodes[node.0]
                    .attributes
                    .insert(name.clone(), value.clone());
            }
            Effect::Attach { node, parent } => {
                self.detach(node.0);
                self.nodes[node.0].parent = Some(parent.0);
                self.nodes[parent.0].children.push(node.0);
            }
            Effect::Detach(node) => self.detach(node.0),
            Effect::OpenWindow => {
                let handle = format!("window-{}", self.next_window);
                self.next_window += 1;
                self.windows.push(handle);
            }
            Effect::Confirm { message, then } => {
                self.alert = Some((message.clone(), then.clone()));
            }
        }
    }

    fn require_window(&self) -> E2eResult<&str> {
        self.current_window.as_deref().ok_or_else(|| E2eError::WebDriver {
            error: "no such window".to_string(),
            message: "the current window has been closed".to_string(),
        })
    }

    fn require_no_alert(&self) -> E2eResult<()> {
        match &self.alert {
            Some((message, _)) => Err(E2eError::WebDriver {
                error: "unexpected alert open".to_string(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn require_interactable(&self, index: usize) -> E2eResult<()> {
        if self.is_displayed(index) {
            Ok(())
        } else {
            Err(E2eError::WebDriver {
                error: "element not interactable".to_string(),
                message: format!("<{}> is not displayed", self.nodes[index].tag),
            })
        }
    }
}

fn invalid_selector(selector: &str) -> E2eError {
    E2eError::WebDriver {
        error: "invalid selector".to_string(),
        message: format!("the in-memory page cannot evaluate '{}'", selector),
    }
}

#[async_trait]
impl Browser for MockPage {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        let mut state = self.state.lock();
        state.require_window()?;
        state.url = Some(url.to_string());
        Ok(())
    }

    async fn set_window_size(&self, width: u32, height: u32) -> E2eResult<()> {
        self.state.lock().window_size = (width, height);
        Ok(())
    }

    async fn find(&self, by: &By) -> E2eResult<ElementRef> {
        let index = self.state.lock().find(ROOT, by)?;
        Ok(self.element(NodeId(index)))
    }

    async fn find_all(&self, by: &By) -> E2eResult<Vec<ElementRef>> {
        let found = self.state.lock().find_all(ROOT, by)?;
        Ok(found.into_iter().map(|i| self.element(NodeId(i))).collect())
    }

    async fn find_in(&self, root: &ElementRef, by: &By) -> E2eResult<ElementRef> {
        let root = self.resolve(root)?;
        let index = self.state.lock().find(root, by)?;
        Ok(self.element(NodeId(index)))
    }

    async fn find_all_in(&self, root: &ElementRef, by: &By) -> E2eResult<Vec<ElementRef>> {
        let root = self.resolve(root)?;
        let found = self.state.lock().find_all(root, by)?;
        Ok(found.into_iter().map(|i| self.element(NodeId(i))).collect())
    }

    async fn click(&self, element: &ElementRef) -> E2eResult<()> {
        let mut state = self.state.lock();
        let index = state.resolve(element)?;
        state.require_no_alert()?;
        state.require_interactable(index)?;

        state.clicks.push(index);
        let effects = state.nodes[index].on_click.clone();
        for effect in &effects {
            state.apply(effect);
        }
        Ok(())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> E2eResult<()> {
        let mut state = self.state.lock();
        let index = state.resolve(element)?;
        state.require_interactable(index)?;
        state.nodes[index].value.push_str(text);
        Ok(())
    }

    async fn text(&self, element: &ElementRef) -> E2eResult<String> {
        let state = self.state.lock();
        let index = state.resolve(element)?;
        Ok(state.rendered_text(index))
    }

    async fn attribute(&self, element: &ElementRef, name: &str) -> E2eResult<Option<String>> {
        let state = self.state.lock();
        let index = state.resolve(element)?;
        Ok(state.nodes[index].attribute(name))
    }

    async fn property(&self, element: &ElementRef, name: &str) -> E2eResult<Value> {
        let state = self.state.lock();
        let index = state.resolve(element)?;
        let node = &state.nodes[index];
        Ok(match name {
            "innerHTML" => {
                let inner: String = node
                    .children
                    .iter()
                    .map(|&c| state.raw_text(c, false))
                    .collect();
                Value::String(format!("{}{}", node.text, inner))
            }
            "value" => Value::String(node.value.clone()),
            "tagName" => Value::String(node.tag.to_ascii_uppercase()),
            other => node.attribute(other).map(Value::String).unwrap_or(Value::Null),
        })
    }

    async fn is_displayed(&self, element: &ElementRef) -> E2eResult<bool> {
        let state = self.state.lock();
        let index = state.resolve(element)?;
        Ok(state.is_displayed(index))
    }

    async fn is_enabled(&self, element: &ElementRef) -> E2eResult<bool> {
        let state = self.state.lock();
        let index = state.resolve(element)?;
        let node = &state.nodes[index];
        Ok(!node.attributes.contains_key("disabled") && !node.classes.iter().any(|c| c == "disabled"))
    }

    async fn tag_name(&self, element: &ElementRef) -> E2eResult<String> {
        let state = self.state.lock();
        let index = state.resolve(element)?;
        Ok(state.nodes[index].tag.clone())
    }

    async fn window_handle(&self) -> E2eResult<String> {
        let state = self.state.lock();
        state.require_window().map(str::to_string)
    }

    async fn window_handles(&self) -> E2eResult<Vec<String>> {
        Ok(self.state.lock().windows.clone())
    }

    async fn switch_to_window(&self, handle: &str) -> E2eResult<()> {
        let mut state = self.state.lock();
        if !state.windows.iter().any(|w| w == handle) {
            return Err(E2eError::WebDriver {
                error: "no such window".to_string(),
                message: format!("no window with handle {}", handle),
            });
        }
        state.current_window = Some(handle.to_string());
        Ok(())
    }

    async fn close_window(&self) -> E2eResult<()> {
        let mut state = self.state.lock();
        let current = state.require_window()?.to_string();
        state.windows.retain(|w| *w != current);
        state.current_window = None;
        Ok(())
    }

    async fn alert_text(&self) -> E2eResult<String> {
        let state = self.state.lock();
        state
            .alert
            .as_ref()
            .map(|(message, _)| message.clone())
            .ok_or(E2eError::NoAlert)
    }

    async fn accept_alert(&self) -> E2eResult<()> {
        let mut state = self.state.lock();
        let (_, then) = state.alert.take().ok_or(E2eError::NoAlert)?;
        for effect in &then {
            state.apply(effect);
        }
        Ok(())
    }
}

/// Names of the predefined record fields and their input types
pub const PAM_FIELD_TYPES: [(&str, &str); 17] = [
    ("account", "text"),
    ("datetime", "datetime-local"),
    ("email", "email"),
    ("host", "text"),
    ("key", "password"),
    ("login", "text"),
    ("name", "text"),
    ("note", "textarea"),
    ("number", "number"),
    ("password", "password"),
    ("phone", "phone"),
    ("secret", "password"),
    ("text", "text"),
    ("textarea", "textarea"),
    ("time", "time"),
    ("url", "url"),
    ("username", "text"),
];

/// Titles of the example records, in accordion order
pub const PAM_EXAMPLE_RECORDS: [&str; 7] = [
    "Amazon",
    "Bank",
    "Email",
    "GitHub",
    "Home WiFi",
    "Netflix",
    "Work VPN",
];

impl MockPage {
    /// The PAM application shell in dark mode with the menu closed
    pub fn pam() -> Self {
        let page = Self::new();
        let body = page.body();
        page.state.lock().nodes[body.0]
            .attributes
            .insert(THEME_ATTRIBUTE.to_string(), "dark".to_string());

        let top = page.append(body, El::new("div").id("top-section"));
        let dropdown = page.append(top, El::new("div").class("dropdown"));
        let trigger = page.append(
            dropdown,
            El::new("button")
                .id("menu")
                .class("btn btn-lg dropdown-toggle")
                .attr("data-bs-toggle", "dropdown")
                .child(El::new("i").class("bi bi-list")),
        );
        let items = page.append(
            dropdown,
            El::new("ul")
                .class("dropdown-menu fs-5")
                .attr("aria-labelledby", "menu")
                .hidden(),
        );
        page.on_click(trigger, Effect::Show(items));

        let mid = page.append(body, El::new("div").id("mid-section"));
        let accordion = page.append(mid, El::new("div").class("accordion").id("records-accordion"));

        let footer = page.append(body, El::new("footer").id("status").class("fixed-bottom"));
        let dark_button = page.append(
            footer,
            El::new("button")
                .id("x-dark-mode-button")
                .attr("title", "dark mode")
                .hidden(),
        );
        let light_button = page.append(
            footer,
            El::new("button")
                .id("x-light-mode-button")
                .attr("title", "light mode"),
        );
        for (button, theme, hide, show) in [
            (light_button, "light", light_button, dark_button),
            (dark_button, "dark", dark_button, light_button),
        ] {
            page.on_click(
                button,
                Effect::SetAttribute {
                    node: body,
                    name: THEME_ATTRIBUTE.to_string(),
                    value: theme.to_string(),
                },
            );
            page.on_click(button, Effect::Hide(hide));
            page.on_click(button, Effect::Show(show));
        }

        for (position, option) in MenuOption::ALL.into_iter().enumerate() {
            if matches!(position, 2 | 4 | 6) {
                let divider = match position {
                    6 => "dropdown-divider x-print",
                    _ => "dropdown-divider",
                };
                page.append(items, El::new("li").child(El::new("hr").class(divider)));
            }
            if option == MenuOption::Help {
                page.append(items, El::new("li").child(El::new("hr").class("dropdown-divider")));
            }

            let mut button = El::new("button")
                .class("dropdown-item")
                .attr("type", "button")
                .child(El::new("i").class("bi"))
                .child(El::new("span").text(&format!("\u{a0}{}", option.label())));
            if let Some(id) = option.dialog_id() {
                button = button
                    .attr("data-bs-target", &format!("#{}", id))
                    .attr("data-bs-toggle", "modal");
            }
            match option {
                MenuOption::Print => button = button.class("x-print"),
                MenuOption::Help => button = button.attr("title", "app help"),
                _ => {}
            }

            // Save, Print and Help sit directly in the list, the rest in <li>.
            let entry = match option {
                MenuOption::SaveFile | MenuOption::Print | MenuOption::Help => {
                    page.append(items, button)
                }
                _ => {
                    let li = page.append(items, El::new("li"));
                    page.append(li, button)
                }
            };

            page.on_click(entry, Effect::Hide(items));
            match option.dialog_id() {
                Some(id) => {
                    let modal = page.add_pam_dialog(body, option, id);
                    page.on_click(entry, Effect::Show(modal));
                    match option {
                        MenuOption::NewRecord => page.fill_record_editor(modal),
                        MenuOption::LoadFile => page.fill_load_dialog(modal, accordion),
                        _ => {}
                    }
                }
                None => page.on_click(entry, Effect::OpenWindow),
            }
        }

        page
    }

    fn add_pam_dialog(&self, body: NodeId, option: MenuOption, id: &str) -> NodeId {
        let label = format!("{}Label", id);
        let modal = self.append(
            body,
            El::new("div")
                .id(id)
                .class("modal fade")
                .attr("aria-labelledby", &label)
                .attr("tabindex", "-1")
                .hidden(),
        );
        let content = self.append(
            modal,
            El::new("div")
                .class("modal-dialog modal-dialog-centered modal-lg")
                .child(El::new("div").class("modal-content")),
        );
        let content = self.nodes_in(content, &By::class("modal-content"))[0];
        self.append(
            content,
            El::new("div")
                .class("modal-header")
                .child(El::new("span").id(&label).class("modal-title fs-5").text(option.label())),
        );
        self.append(content, El::new("div").class("modal-body"));
        let footer = self.append(content, El::new("div").class("modal-footer"));

        let close = self.append(
            footer,
            El::new("button")
                .class("btn btn-secondary x-fld-record-close")
                .attr("type", "button")
                .text("Close"),
        );
        self.on_click(close, Effect::Hide(modal));

        let primary = match option {
            MenuOption::NewRecord | MenuOption::SaveFile => Some("Save"),
            MenuOption::ClearRecords => Some("Clear"),
            MenuOption::LoadFile => Some("Load"),
            _ => None,
        };
        if let Some(text) = primary {
            let button = self.append(
                footer,
                El::new("button")
                    .class(&format!(
                        "btn btn-primary x-fld-record-{}",
                        text.to_ascii_lowercase()
                    ))
                    .attr("type", "button")
                    .text(text),
            );
            self.on_click(button, Effect::Hide(modal));
        }

        modal
    }

    fn modal_body(&self, modal: NodeId) -> NodeId {
        self.nodes_in(modal, &By::class("modal-body"))[0]
    }

    fn fill_record_editor(&self, modal: NodeId) {
        let body = self.modal_body(modal);
        let container = self.append(body, El::new("div").class("container"));
        self.append(
            container,
            El::new("div").class("row").child(
                El::new("div").class("col-12").child(
                    El::new("input")
                        .class("w-100 fs-5 m-2 x-record-title")
                        .attr("placeholder", "Record Title"),
                ),
            ),
        );
        let row = self.append(container, El::new("div").class("row"));
        let col = self.append(row, El::new("div").class("col"));
        let dropdown = self.append(col, El::new("div").class("dropdown"));
        let type_button = self.append(
            dropdown,
            El::new("button")
                .id("x-new-field-type")
                .class("btn btn-secondary dropdown-toggle")
                .text("New Field"),
        );
        let types = self.append(
            dropdown,
            El::new("ul")
                .class("dropdown-menu")
                .attr("aria-labelledby", "x-new-field-type")
                .hidden(),
        );
        self.on_click(type_button, Effect::Show(types));

        for (name, kind) in PAM_FIELD_TYPES {
            let li = self.append(types, El::new("li"));
            let item = self.append(
                li,
                El::new("a")
                    .class("dropdown-item")
                    .attr("value", name)
                    .text(name),
            );

            let form = self.create_detached(
                El::new("form").class("x-fld-form").child(
                    El::new("div")
                        .class("row")
                        .child(El::new("div").class("col-12 x-fld-name").text(name))
                        .child(
                            El::new("div")
                                .class("col-12 x-fld-value-div")
                                .child(El::new("input").class("x-fld-value form-control").attr("type", kind)),
                        ),
                ),
            );
            let row = self.nodes_in(form, &By::class("row"))[0];
            let delete = self.append(
                row,
                El::new("button")
                    .class("btn")
                    .attr("type", "button")
                    .attr("title", "delete")
                    .child(El::new("i").class("bi bi-trash3-fill")),
            );
            self.on_click(delete, Effect::Detach(form));

            self.on_click(item, Effect::Hide(types));
            self.on_click(
                item,
                Effect::Attach {
                    node: form,
                    parent: container,
                },
            );
        }
    }

    fn fill_load_dialog(&self, modal: NodeId, accordion: NodeId) {
        let body = self.modal_body(modal);
        let load_examples = self.append(
            body,
            El::new("button")
                .class("btn btn-secondary")
                .attr("type", "button")
                .text("Load Example Records"),
        );

        let mut then: Vec<Effect> = PAM_EXAMPLE_RECORDS
            .iter()
            .map(|title| {
                let record = self.create_detached(
                    El::new("div").class("accordion-item").child(
                        El::new("h2")
                            .class("accordion-header")
                            .child(El::new("button").class("accordion-button collapsed").text(title)),
                    ),
                );
                Effect::Attach {
                    node: record,
                    parent: accordion,
                }
            })
            .collect();
        then.push(Effect::Hide(modal));

        self.on_click(
            load_examples,
            Effect::Confirm {
                message: "Do you really want to load the example records?".to_string(),
                then,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hidden_elements_render_no_text_and_reject_clicks() {
        let page = MockPage::pam();
        let about = page
            .find(&By::attr("data-bs-target", "#menuAboutDlg"))
            .await
            .unwrap();

        assert_eq!(page.text(&about).await.unwrap(), "");
        let err = page.click(&about).await.unwrap_err();
        assert!(matches!(err, E2eError::WebDriver { ref error, .. } if error == "element not interactable"));

        let menu = page.find(&By::id("menu")).await.unwrap();
        page.click(&menu).await.unwrap();
        assert_eq!(page.text(&about).await.unwrap(), "About");
    }

    #[tokio::test]
    async fn test_detached_nodes_go_stale() {
        let page = MockPage::pam();
        let about = page.node(&By::id("menuAboutDlg")).unwrap();
        let element = page.element(about);
        page.detach(about);

        let err = page.is_displayed(&element).await.unwrap_err();
        assert!(matches!(err, E2eError::WebDriver { ref error, .. } if error == "stale element reference"));
        assert!(matches!(
            page.find(&By::id("menuAboutDlg")).await,
            Err(E2eError::ElementNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_confirm_blocks_until_accepted() {
        let page = MockPage::new();
        let body = page.body();
        let button = page.append(body, El::new("button").text("Go"));
        let target = page.append(body, El::new("p").text("done").hidden());
        page.on_click(
            button,
            Effect::Confirm {
                message: "Sure?".to_string(),
                then: vec![Effect::Show(target)],
            },
        );

        let element = page.element(button);
        page.click(&element).await.unwrap();
        assert_eq!(page.alert_text().await.unwrap(), "Sure?");
        assert!(page.click(&element).await.is_err());

        page.accept_alert().await.unwrap();
        assert!(matches!(page.alert_text().await, Err(E2eError::NoAlert)));
        assert!(page.is_displayed(&page.element(target)).await.unwrap());
    }

    #[tokio::test]
    async fn test_windows() {
        let page = MockPage::new();
        let main = page.window_handle().await.unwrap();
        page.state.lock().apply(&Effect::OpenWindow);

        let handles = page.window_handles().await.unwrap();
        assert_eq!(handles.len(), 2);
        let other = handles.iter().find(|h| **h != main).unwrap().clone();

        page.switch_to_window(&other).await.unwrap();
        page.close_window().await.unwrap();
        assert!(page.window_handle().await.is_err());

        page.switch_to_window(&main).await.unwrap();
        assert_eq!(page.window_handles().await.unwrap(), vec![main]);
    }

    #[tokio::test]
    async fn test_unsupported_selector_is_rejected() {
        let page = MockPage::pam();
        let err = page.find_all(&By::Css("div > span".into())).await.unwrap_err();
        assert!(matches!(err, E2eError::WebDriver { ref error, .. } if error == "invalid selector"));
    }
}
