// Common test utilities: an in-memory page that answers injected scripts

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use dompilot::errors::PageError;
use dompilot::page::{PageDriver, TabLocation};
use dompilot::scripts::PageScript;
use dompilot::types::{Rect, ViewportSize};

pub const CHROME_UA: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.6099.109 Safari/537.36";

static NEXT_TAB: AtomicUsize = AtomicUsize::new(1);

/// One element the fake page knows about. Script replies that shape the
/// executor path are stored as the raw JSON the page would return.
#[derive(Debug, Clone)]
pub struct FakeElement {
    pub tag: String,
    pub label: String,
    pub rect: Rect,
    /// Rect after a `native-center` scroll step
    pub scrolls_to: Option<Rect>,
    pub click_target: Value,
    pub hit: Value,
    pub backup: Value,
    pub input_kind: Value,
    pub newline_effect: &'static str,
    pub assign: Value,
    /// Reply to option selection; `None` selects the element
    pub select: Option<Value>,
    pub detached: bool,
    pub typed: String,
    pub clicks: u32,
}

impl FakeElement {
    pub fn button(label: &str) -> Self {
        Self {
            tag: "button".to_string(),
            label: label.to_string(),
            rect: Rect {
                x: 100.0,
                y: 100.0,
                width: 120.0,
                height: 40.0,
            },
            scrolls_to: None,
            click_target: json!({ "kind": "generic" }),
            hit: json!({ "status": "hit" }),
            backup: json!({ "status": "clicked", "method": "native-click", "tried": ["native-click"] }),
            input_kind: json!({ "kind": "unsupported", "reason": "buttons do not take text" }),
            newline_effect: "line-break",
            assign: json!({ "status": "failed", "reason": "not a form field" }),
            select: None,
            detached: false,
            typed: String::new(),
            clicks: 0,
        }
    }

    pub fn input(label: &str) -> Self {
        Self {
            tag: "input".to_string(),
            input_kind: json!({ "kind": "input" }),
            newline_effect: "enter-key",
            assign: json!({ "status": "done" }),
            ..Self::button(label)
        }
    }

    pub fn at(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }

    pub fn scrolls_to(mut self, rect: Rect) -> Self {
        self.scrolls_to = Some(rect);
        self
    }

    pub fn with_click_target(mut self, target: Value) -> Self {
        self.click_target = target;
        self
    }

    pub fn with_hit(mut self, hit: Value) -> Self {
        self.hit = hit;
        self
    }

    pub fn with_backup(mut self, backup: Value) -> Self {
        self.backup = backup;
        self
    }

    pub fn with_input_kind(mut self, kind: Value) -> Self {
        self.input_kind = kind;
        self
    }

    pub fn with_newline_effect(mut self, effect: &'static str) -> Self {
        self.newline_effect = effect;
        self
    }

    pub fn with_assign(mut self, assign: Value) -> Self {
        self.assign = assign;
        self
    }

    pub fn with_select(mut self, reply: Value) -> Self {
        self.select = Some(reply);
        self
    }

    fn uid(index: usize) -> String {
        format!("uid{index:05}")
    }
}

pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Rect {
    Rect {
        x,
        y,
        width,
        height,
    }
}

#[derive(Debug, Clone)]
pub enum NavigateBehavior {
    Succeed,
    /// Never finishes loading
    Hang,
    /// Never finishes loading and blocks every later tab query, like a
    /// driver that runs commands one at a time
    HangBlockingTab,
    Fail(String),
}

struct FakeState {
    url: String,
    ready_state: String,
    viewport: ViewportSize,
    annotated: bool,
    elements: Vec<FakeElement>,
    uids: Vec<Option<String>>,
    pending_requests: u32,
    instrumented: bool,
    navigate: NavigateBehavior,
    tab_blocked: bool,
    calls: Vec<(PageScript, Value)>,
}

pub struct FakePage {
    tab_id: String,
    state: Mutex<FakeState>,
}

impl FakePage {
    pub fn new() -> Self {
        let n = NEXT_TAB.fetch_add(1, Ordering::SeqCst);
        Self {
            tab_id: format!("fake-tab-{n}"),
            state: Mutex::new(FakeState {
                url: "https://shop.example.com/".to_string(),
                ready_state: "complete".to_string(),
                viewport: ViewportSize {
                    width: 1280,
                    height: 800,
                },
                annotated: false,
                elements: Vec::new(),
                uids: Vec::new(),
                pending_requests: 0,
                instrumented: false,
                navigate: NavigateBehavior::Succeed,
                tab_blocked: false,
                calls: Vec::new(),
            }),
        }
    }

    /// Add an element; its handle is its position
    pub fn with(self, element: FakeElement) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.elements.push(element);
            state.uids.push(None);
        }
        self
    }

    /// Mark the page as annotated without recording a script call
    pub fn annotated(self) -> Self {
        self.state.lock().unwrap().annotated = true;
        self
    }

    pub fn set_pending_requests(&self, count: u32) {
        self.state.lock().unwrap().pending_requests = count;
    }

    pub fn set_navigate(&self, behavior: NavigateBehavior) {
        self.state.lock().unwrap().navigate = behavior;
    }

    pub fn detach(&self, handle: usize) {
        self.state.lock().unwrap().elements[handle].detached = true;
    }

    pub fn element(&self, handle: usize) -> FakeElement {
        self.state.lock().unwrap().elements[handle].clone()
    }

    pub fn url(&self) -> String {
        self.state.lock().unwrap().url.clone()
    }

    pub fn calls(&self, script: PageScript) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(s, _)| *s == script)
            .map(|(_, args)| args.clone())
            .collect()
    }

    pub fn count(&self, script: PageScript) -> usize {
        self.calls(script).len()
    }

    fn answer(state: &mut FakeState, script: PageScript, args: &Value) -> Value {
        let uid = args["uid"].as_str().unwrap_or_default().to_string();
        let index = state
            .uids
            .iter()
            .position(|u| u.as_deref() == Some(uid.as_str()))
            .filter(|i| !state.elements[*i].detached);
        let viewport = state.viewport;

        match script {
            PageScript::Annotate => {
                state.annotated = true;
                let lines: Vec<String> = state
                    .elements
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| !e.detached)
                    .map(|(i, e)| format!("[{i}] <{}> {}", e.tag, e.label))
                    .collect();
                json!({
                    "url": state.url,
                    "title": "Fake shop",
                    "element_count": lines.len(),
                    "text": lines.join("\n"),
                })
            }
            PageScript::ResolveHandle => {
                if !state.annotated {
                    return json!({ "status": "no-table" });
                }
                let handle = args["numeric_id"].as_u64().unwrap_or(u64::MAX) as usize;
                if handle >= state.elements.len() {
                    return json!({ "status": "unknown-handle", "table_size": state.elements.len() });
                }
                if state.elements[handle].detached {
                    return json!({ "status": "detached" });
                }
                let uid = state.uids[handle]
                    .get_or_insert_with(|| FakeElement::uid(handle))
                    .clone();
                json!({ "status": "assigned", "uid": uid })
            }
            PageScript::QueryUnique => match index {
                Some(i) => json!({ "status": "found", "tag": state.elements[i].tag }),
                None => json!({
                    "status": "missing",
                    "attribute_count": state.uids.iter().flatten().count(),
                    "ready_state": state.ready_state,
                    "body_child_count": state.elements.len(),
                }),
            },
            PageScript::Geometry => match index {
                Some(i) => json!({
                    "status": "measured",
                    "rect": state.elements[i].rect,
                    "viewport": viewport,
                    "style": {
                        "display": "block",
                        "visibility": "visible",
                        "opacity": "1",
                        "position": "static",
                    },
                }),
                None => json!({ "status": "missing" }),
            },
            PageScript::InstallInstrumentation => {
                state.instrumented = true;
                json!({ "status": "installed" })
            }
            PageScript::StabilitySignals => json!({
                "ready_state": state.ready_state,
                "pending_requests": state.pending_requests,
                "loading_images": 0,
                "loading_stylesheets": 0,
                "loading_indicators": 0,
                "recent_mutations": 0,
                "timer_activity": false,
                "framework_loading": false,
                "instrumented": state.instrumented,
            }),
            PageScript::ScrollStep => {
                let Some(i) = index else {
                    return json!({ "status": "missing" });
                };
                let element = &mut state.elements[i];
                let before = element.rect;
                if args["strategy"] == "native-center" {
                    if let Some(target) = element.scrolls_to {
                        element.rect = target;
                    }
                }
                json!({
                    "status": "scrolled",
                    "before": before,
                    "after": element.rect,
                    "viewport": viewport,
                })
            }
            PageScript::ClassifyClickTarget => match index {
                Some(i) => state.elements[i].click_target.clone(),
                None => json!({ "kind": "missing" }),
            },
            PageScript::HitTest => match index {
                Some(i) => state.elements[i].hit.clone(),
                None => json!({ "status": "missing" }),
            },
            PageScript::DispatchClickAtPoint => {
                let x = args["x"].as_f64().unwrap_or_default();
                let y = args["y"].as_f64().unwrap_or_default();
                let target = state.elements.iter_mut().rev().find(|e| {
                    !e.detached
                        && x >= e.rect.x
                        && x <= e.rect.right()
                        && y >= e.rect.y
                        && y <= e.rect.bottom()
                });
                match target {
                    Some(element) => {
                        element.clicks += 1;
                        json!({ "status": "done" })
                    }
                    None => json!({ "status": "failed", "reason": "no element at point" }),
                }
            }
            PageScript::BackupClick => match index {
                Some(i) => {
                    let element = &mut state.elements[i];
                    if element.backup["status"] == "clicked" {
                        element.clicks += 1;
                    }
                    element.backup.clone()
                }
                None => json!({ "status": "failed", "reason": "element is gone", "tried": [] }),
            },
            PageScript::SelectNativeOption | PageScript::SelectAriaOption => match index {
                Some(i) => match state.elements[i].select.clone() {
                    Some(reply) => reply,
                    None => {
                        state.elements[i].clicks += 1;
                        json!({ "status": "done", "value": state.elements[i].label })
                    }
                },
                None => json!({ "status": "failed", "reason": "option is gone" }),
            },
            PageScript::ClassifyInput => match index {
                Some(i) => state.elements[i].input_kind.clone(),
                None => json!({ "kind": "missing" }),
            },
            PageScript::ClearField => match index {
                Some(i) => {
                    state.elements[i].typed.clear();
                    json!({ "status": "done" })
                }
                None => json!({ "status": "failed", "reason": "field is gone" }),
            },
            PageScript::TypeCharacter => match index {
                Some(i) => {
                    state.elements[i]
                        .typed
                        .push_str(args["ch"].as_str().unwrap_or_default());
                    json!({ "status": "done" })
                }
                None => json!({ "status": "failed", "reason": "field is gone" }),
            },
            PageScript::InsertNewline => match index {
                Some(i) => {
                    let element = &mut state.elements[i];
                    element.typed.push('\n');
                    json!({ "status": "inserted", "effect": element.newline_effect })
                }
                None => json!({ "status": "failed", "reason": "field is gone" }),
            },
            PageScript::FinishTyping => match index {
                Some(i) => json!({ "status": "done", "value": state.elements[i].typed }),
                None => json!({ "status": "failed", "reason": "field is gone" }),
            },
            PageScript::AssignValue => match index {
                Some(i) => {
                    let element = &mut state.elements[i];
                    if element.assign["status"] == "done" {
                        element.typed = args["value"].as_str().unwrap_or_default().to_string();
                    }
                    element.assign.clone()
                }
                None => json!({ "status": "failed", "reason": "field is gone" }),
            },
            PageScript::FocusElement | PageScript::CursorMove | PageScript::CursorHide => {
                json!({ "status": "done" })
            }
        }
    }
}

impl Default for FakePage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageDriver for FakePage {
    fn tab_id(&self) -> &str {
        &self.tab_id
    }

    async fn evaluate(&self, script: PageScript, args: Value) -> Result<Value, PageError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push((script, args.clone()));
        Ok(Self::answer(&mut state, script, &args))
    }

    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        let behavior = self.state.lock().unwrap().navigate.clone();
        match behavior {
            NavigateBehavior::Succeed => {
                let mut state = self.state.lock().unwrap();
                state.url = url.to_string();
                state.annotated = false;
                state.instrumented = false;
                state.uids.iter_mut().for_each(|u| *u = None);
                Ok(())
            }
            NavigateBehavior::Hang => {
                {
                    let mut state = self.state.lock().unwrap();
                    state.url = url.to_string();
                    state.ready_state = "loading".to_string();
                }
                std::future::pending::<()>().await;
                Ok(())
            }
            NavigateBehavior::HangBlockingTab => {
                {
                    let mut state = self.state.lock().unwrap();
                    state.ready_state = "loading".to_string();
                    state.tab_blocked = true;
                }
                std::future::pending::<()>().await;
                Ok(())
            }
            NavigateBehavior::Fail(message) => Err(PageError::Driver(message)),
        }
    }

    async fn location(&self) -> Result<TabLocation, PageError> {
        let blocked = self.state.lock().unwrap().tab_blocked;
        if blocked {
            std::future::pending::<()>().await;
        }
        let state = self.state.lock().unwrap();
        Ok(TabLocation {
            url: state.url.clone(),
            ready_state: state.ready_state.clone(),
        })
    }

    async fn user_agent(&self) -> Result<String, PageError> {
        Ok(CHROME_UA.to_string())
    }
}
