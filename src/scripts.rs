//! Scripts injected into the page.
//!
//! Every script is a WebDriver function body that receives one JSON object
//! as `arguments[0]` and returns a JSON object. Result fields are snake_case
//! and tagged by `status` (or `kind` for classifiers) so the Rust side can
//! decode them into closed enums.

use serde::Deserialize;

/// Identifies one injected script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageScript {
    Annotate,
    ResolveHandle,
    QueryUnique,
    Geometry,
    InstallInstrumentation,
    StabilitySignals,
    ScrollStep,
    FocusElement,
    ClassifyClickTarget,
    HitTest,
    DispatchClickAtPoint,
    BackupClick,
    SelectNativeOption,
    SelectAriaOption,
    ClassifyInput,
    ClearField,
    TypeCharacter,
    InsertNewline,
    FinishTyping,
    AssignValue,
    CursorMove,
    CursorHide,
}

impl PageScript {
    pub fn name(&self) -> &'static str {
        match self {
            PageScript::Annotate => "annotate",
            PageScript::ResolveHandle => "resolve-handle",
            PageScript::QueryUnique => "query-unique",
            PageScript::Geometry => "geometry",
            PageScript::InstallInstrumentation => "install-instrumentation",
            PageScript::StabilitySignals => "stability-signals",
            PageScript::ScrollStep => "scroll-step",
            PageScript::FocusElement => "focus-element",
            PageScript::ClassifyClickTarget => "classify-click-target",
            PageScript::HitTest => "hit-test",
            PageScript::DispatchClickAtPoint => "dispatch-click-at-point",
            PageScript::BackupClick => "backup-click",
            PageScript::SelectNativeOption => "select-native-option",
            PageScript::SelectAriaOption => "select-aria-option",
            PageScript::ClassifyInput => "classify-input",
            PageScript::ClearField => "clear-field",
            PageScript::TypeCharacter => "type-character",
            PageScript::InsertNewline => "insert-newline",
            PageScript::FinishTyping => "finish-typing",
            PageScript::AssignValue => "assign-value",
            PageScript::CursorMove => "cursor-move",
            PageScript::CursorHide => "cursor-hide",
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            PageScript::Annotate => ANNOTATE,
            PageScript::ResolveHandle => RESOLVE_HANDLE,
            PageScript::QueryUnique => QUERY_UNIQUE,
            PageScript::Geometry => GEOMETRY,
            PageScript::InstallInstrumentation => INSTALL_INSTRUMENTATION,
            PageScript::StabilitySignals => STABILITY_SIGNALS,
            PageScript::ScrollStep => SCROLL_STEP,
            PageScript::FocusElement => FOCUS_ELEMENT,
            PageScript::ClassifyClickTarget => CLASSIFY_CLICK_TARGET,
            PageScript::HitTest => HIT_TEST,
            PageScript::DispatchClickAtPoint => DISPATCH_CLICK_AT_POINT,
            PageScript::BackupClick => BACKUP_CLICK,
            PageScript::SelectNativeOption => SELECT_NATIVE_OPTION,
            PageScript::SelectAriaOption => SELECT_ARIA_OPTION,
            PageScript::ClassifyInput => CLASSIFY_INPUT,
            PageScript::ClearField => CLEAR_FIELD,
            PageScript::TypeCharacter => TYPE_CHARACTER,
            PageScript::InsertNewline => INSERT_NEWLINE,
            PageScript::FinishTyping => FINISH_TYPING,
            PageScript::AssignValue => ASSIGN_VALUE,
            PageScript::CursorMove => CURSOR_MOVE,
            PageScript::CursorHide => CURSOR_HIDE,
        }
    }
}

/// Result of scripts that either succeed or explain why not
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum StepReport {
    Done {
        #[serde(default)]
        value: Option<String>,
    },
    Failed {
        reason: String,
    },
}

const ANNOTATE: &str = r##"
const args = arguments[0] || {};
const selector = [
    'a[href]', 'button', 'input:not([type="hidden"])', 'select', 'textarea', 'summary',
    '[contenteditable=""]', '[contenteditable="true"]', '[onclick]', 'label[for]',
    '[role="button"]', '[role="link"]', '[role="checkbox"]', '[role="radio"]', '[role="tab"]',
    '[role="menuitem"]', '[role="option"]', '[role="combobox"]', '[role="switch"]', '[role="textbox"]'
].join(', ');
const visible = (el) => {
    const r = el.getBoundingClientRect();
    if (r.width <= 0 || r.height <= 0) return false;
    const s = window.getComputedStyle(el);
    return s.display !== 'none' && s.visibility !== 'hidden' && parseFloat(s.opacity || '1') > 0;
};
const clip = (text, max) => {
    const t = (text || '').replace(/\s+/g, ' ').trim();
    return t.length > max ? t.slice(0, max) + '…' : t;
};
const nodes = Array.from(document.querySelectorAll(selector)).filter(visible);
window.__dompilotNodes = nodes;
const lines = nodes.map((el, i) => {
    const tag = el.tagName.toLowerCase();
    const parts = [tag];
    for (const name of ['type', 'name', 'role', 'aria-label', 'placeholder', 'href', 'title']) {
        const v = el.getAttribute(name);
        if (v) parts.push(name + '="' + clip(v, 60) + '"');
    }
    if ((tag === 'input' || tag === 'textarea') && el.value) parts.push('value="' + clip(el.value, 40) + '"');
    return '[' + i + '] <' + parts.join(' ') + '> ' + clip(el.innerText || el.textContent, 80);
});
return {
    url: location.href,
    title: document.title,
    element_count: nodes.length,
    text: lines.join('\n')
};
"##;

const RESOLVE_HANDLE: &str = r##"
const args = arguments[0];
const attr = 'data-dompilot-uid';
const table = window.__dompilotNodes;
if (!Array.isArray(table)) return { status: 'no-table' };
const el = table[args.numeric_id];
if (!el) return { status: 'unknown-handle', table_size: table.length };
if (!el.isConnected) return { status: 'detached' };
let uid = el.getAttribute(attr);
if (!uid) {
    do {
        uid = Math.random().toString(36).slice(2, 10).padEnd(8, '0');
    } while (document.querySelector('[' + attr + '="' + uid + '"]'));
    el.setAttribute(attr, uid);
}
return { status: 'assigned', uid: uid };
"##;

const QUERY_UNIQUE: &str = r##"
const args = arguments[0];
const attr = 'data-dompilot-uid';
const el = document.querySelector('[' + attr + '="' + CSS.escape(args.uid) + '"]');
if (el) return { status: 'found', tag: el.tagName.toLowerCase() };
return {
    status: 'missing',
    attribute_count: document.querySelectorAll('[' + attr + ']').length,
    ready_state: document.readyState,
    body_child_count: document.body ? document.body.children.length : 0
};
"##;

const GEOMETRY: &str = r##"
const args = arguments[0];
const el = document.querySelector('[data-dompilot-uid="' + CSS.escape(args.uid) + '"]');
if (!el) return { status: 'missing' };
const r = el.getBoundingClientRect();
const s = window.getComputedStyle(el);
return {
    status: 'measured',
    rect: { x: r.left, y: r.top, width: r.width, height: r.height },
    viewport: { width: window.innerWidth, height: window.innerHeight },
    style: { display: s.display, visibility: s.visibility, opacity: s.opacity, position: s.position }
};
"##;

const INSTALL_INSTRUMENTATION: &str = r##"
if (window.__dompilotInstrumentation) return { status: 'present' };
const state = { pending: 0, mutations: [], last_timer_at: 0 };
window.__dompilotInstrumentation = state;
const settle = () => { state.pending = Math.max(0, state.pending - 1); };
if (window.fetch) {
    const originalFetch = window.fetch;
    window.fetch = function () {
        state.pending++;
        try {
            return originalFetch.apply(this, arguments).finally(settle);
        } catch (e) {
            settle();
            throw e;
        }
    };
}
const originalSend = XMLHttpRequest.prototype.send;
XMLHttpRequest.prototype.send = function () {
    state.pending++;
    this.addEventListener('loadend', settle, { once: true });
    try {
        return originalSend.apply(this, arguments);
    } catch (e) {
        settle();
        throw e;
    }
};
const originalSetTimeout = window.setTimeout;
window.setTimeout = function (fn, delay) {
    if ((delay || 0) < 1000) state.last_timer_at = Date.now();
    return originalSetTimeout.apply(this, arguments);
};
const benign = new Set(['class', 'style']);
const observer = new MutationObserver((records) => {
    const now = Date.now();
    for (const m of records) {
        if (m.type === 'attributes' && benign.has(m.attributeName) && m.target instanceof Element) {
            const s = window.getComputedStyle(m.target);
            const hidden = s.display === 'none' || s.visibility === 'hidden';
            const known = m.target.__dompilotHidden;
            m.target.__dompilotHidden = hidden;
            if (known === undefined || known === hidden) continue;
        }
        state.mutations.push(now);
    }
    if (state.mutations.length > 500) state.mutations.splice(0, state.mutations.length - 500);
});
observer.observe(document.documentElement, { childList: true, subtree: true, attributes: true, characterData: true });
return { status: 'installed' };
"##;

const STABILITY_SIGNALS: &str = r##"
const args = arguments[0];
const st = window.__dompilotInstrumentation;
const now = Date.now();
let recent = 0;
let pending = 0;
let timers = false;
if (st) {
    st.mutations = st.mutations.filter((t) => now - t < args.window_ms);
    recent = st.mutations.length;
    pending = st.pending;
    timers = now - st.last_timer_at < args.window_ms;
}
const shown = (el) => {
    const r = el.getBoundingClientRect();
    const s = window.getComputedStyle(el);
    return r.width > 0 && r.height > 0 && s.display !== 'none' && s.visibility !== 'hidden';
};
const indicators = '[aria-busy="true"], .loading, .loader, .spinner, .skeleton, [class*="skeleton"], [class*="spinner"], [class*="loading"]';
const nextLoading = !!(window.next && window.next.router && window.next.router.isReady === false);
const reactBusy = !!document.querySelector('[data-reactroot][aria-busy="true"], #root[aria-busy="true"]');
const vueCloak = !!(window.__VUE__ && document.querySelector('[v-cloak]'));
const nuxtLoading = !!(window.$nuxt && window.$nuxt.$loading && window.$nuxt.$loading.show);
return {
    ready_state: document.readyState,
    pending_requests: pending,
    loading_images: Array.from(document.images).filter((img) => img.src && img.loading !== 'lazy' && !img.complete).length,
    loading_stylesheets: Array.from(document.querySelectorAll('link[rel="stylesheet"]')).filter((l) => !l.sheet).length,
    loading_indicators: Array.from(document.querySelectorAll(indicators)).filter(shown).length,
    recent_mutations: recent,
    timer_activity: timers,
    framework_loading: nextLoading || reactBusy || vueCloak || nuxtLoading,
    instrumented: !!st
};
"##;

const SCROLL_STEP: &str = r##"
const args = arguments[0];
const el = document.querySelector('[data-dompilot-uid="' + CSS.escape(args.uid) + '"]');
if (!el) return { status: 'missing' };
const measure = () => {
    const r = el.getBoundingClientRect();
    return { x: r.left, y: r.top, width: r.width, height: r.height };
};
const before = measure();
const viewport = { width: window.innerWidth, height: window.innerHeight };
const scrollableAncestor = (node) => {
    const scrolls = (v) => v === 'auto' || v === 'scroll' || v === 'overlay';
    let p = node.parentElement;
    while (p && p !== document.body && p !== document.documentElement) {
        const s = window.getComputedStyle(p);
        if ((scrolls(s.overflowY) && p.scrollHeight > p.clientHeight) ||
            (scrolls(s.overflowX) && p.scrollWidth > p.clientWidth)) return p;
        p = p.parentElement;
    }
    return null;
};
try {
    switch (args.strategy) {
        case 'nested-container': {
            const c = scrollableAncestor(el);
            if (!c) return { status: 'not-applicable' };
            const cr = c.getBoundingClientRect();
            c.scrollTop += (before.y + before.height / 2) - (cr.top + cr.height / 2);
            c.scrollLeft += (before.x + before.width / 2) - (cr.left + cr.width / 2);
            break;
        }
        case 'native-center':
            el.scrollIntoView({ block: 'center', inline: 'center', behavior: 'instant' });
            break;
        case 'native-nearest':
            el.scrollIntoView({ block: 'nearest', inline: 'nearest', behavior: 'instant' });
            break;
        case 'window-center': {
            const top = window.scrollY + before.y + before.height / 2 - viewport.height / 2;
            const left = window.scrollX + before.x + before.width / 2 - viewport.width / 2;
            window.scrollTo({ top: Math.max(0, top), left: Math.max(0, left), behavior: 'instant' });
            break;
        }
        case 'forced-smooth':
            el.scrollIntoView({ block: 'center', inline: 'center', behavior: 'smooth' });
            try { el.focus({ preventScroll: false }); } catch (e) {}
            break;
        default:
            return { status: 'error', reason: 'unknown strategy ' + args.strategy };
    }
} catch (e) {
    return { status: 'error', reason: String(e) };
}
return { status: 'scrolled', before: before, after: measure(), viewport: viewport };
"##;

const FOCUS_ELEMENT: &str = r##"
const args = arguments[0];
const el = document.querySelector('[data-dompilot-uid="' + CSS.escape(args.uid) + '"]');
if (!el) return { status: 'failed', reason: 'element missing' };
try {
    el.focus({ preventScroll: true });
} catch (e) {
    return { status: 'failed', reason: String(e) };
}
const active = document.activeElement;
if (active === el || el.contains(active)) return { status: 'done' };
return { status: 'failed', reason: 'focus landed on ' + (active ? active.tagName.toLowerCase() : 'nothing') };
"##;

const CLASSIFY_CLICK_TARGET: &str = r##"
const args = arguments[0];
const attr = 'data-dompilot-uid';
const el = document.querySelector('[' + attr + '="' + CSS.escape(args.uid) + '"]');
if (!el) return { kind: 'missing' };
const tag = el.tagName.toLowerCase();
if (tag === 'option' && el.closest('select')) return { kind: 'native-option' };
const r = el.getBoundingClientRect();
const hidden = r.width <= 0 || r.height <= 0 || window.getComputedStyle(el).visibility === 'hidden';
const menu = el.closest('[role="listbox"], [role="menu"], .dropdown-menu, .dropdown-content, [class*="dropdown"]');
if (hidden && menu) {
    let trigger = null;
    if (menu.id) {
        const id = CSS.escape(menu.id);
        trigger = document.querySelector('[aria-controls="' + id + '"], [aria-owns="' + id + '"]');
    }
    if (!trigger && menu.parentElement) {
        trigger = menu.parentElement.querySelector('[aria-haspopup], [aria-expanded], [data-toggle="dropdown"], [data-bs-toggle="dropdown"], .dropdown-toggle');
    }
    if (trigger && trigger !== el && !menu.contains(trigger)) {
        let uid = trigger.getAttribute(attr);
        if (!uid) {
            uid = Math.random().toString(36).slice(2, 10).padEnd(8, '0');
            trigger.setAttribute(attr, uid);
        }
        return { kind: 'collapsed-dropdown-item', trigger_uid: uid };
    }
}
if (el.getAttribute('role') === 'option') return { kind: 'aria-option' };
return { kind: 'generic' };
"##;

const HIT_TEST: &str = r##"
const args = arguments[0];
const el = document.querySelector('[data-dompilot-uid="' + CSS.escape(args.uid) + '"]');
if (!el) return { status: 'missing' };
const hit = document.elementFromPoint(args.x, args.y);
if (!hit) return { status: 'miss', reason: 'no element at point' };
if (hit === el || el.contains(hit) || (hit.tagName === 'LABEL' && hit.control === el)) return { status: 'hit' };
const describe = (n) => n.tagName.toLowerCase() + (n.id ? '#' + n.id : '') +
    (typeof n.className === 'string' && n.className.trim() ? '.' + n.className.trim().split(/\s+/).join('.') : '');
return { status: 'obscured', by: describe(hit) };
"##;

const DISPATCH_CLICK_AT_POINT: &str = r##"
const args = arguments[0];
const target = document.elementFromPoint(args.x, args.y);
if (!target) return { status: 'failed', reason: 'no element at point' };
const opts = { bubbles: true, cancelable: true, composed: true, view: window, clientX: args.x, clientY: args.y, button: 0 };
try {
    if (window.PointerEvent) target.dispatchEvent(new PointerEvent('pointerdown', Object.assign({ pointerType: 'mouse', isPrimary: true }, opts)));
    target.dispatchEvent(new MouseEvent('mousedown', opts));
    if (typeof target.focus === 'function') target.focus({ preventScroll: true });
    if (window.PointerEvent) target.dispatchEvent(new PointerEvent('pointerup', Object.assign({ pointerType: 'mouse', isPrimary: true }, opts)));
    target.dispatchEvent(new MouseEvent('mouseup', opts));
    target.dispatchEvent(new MouseEvent('click', Object.assign({ detail: 1 }, opts)));
} catch (e) {
    return { status: 'failed', reason: String(e) };
}
return { status: 'done', value: 'dispatched-mouse-events' };
"##;

const BACKUP_CLICK: &str = r##"
const args = arguments[0];
const el = document.querySelector('[data-dompilot-uid="' + CSS.escape(args.uid) + '"]');
if (!el) return { status: 'failed', reason: 'element missing', tried: [] };
const tried = [];
const attempt = (name, fn) => {
    tried.push(name);
    try {
        fn();
        return true;
    } catch (e) {
        return false;
    }
};
const opts = { bubbles: true, cancelable: true, view: window, button: 0 };
if (typeof el.click === 'function' && attempt('native-click', () => el.click())) {
    return { status: 'clicked', method: 'native-click', tried: tried };
}
if (attempt('click-event', () => el.dispatchEvent(new MouseEvent('click', opts)))) {
    return { status: 'clicked', method: 'click-event', tried: tried };
}
if (attempt('mouse-down-up', () => {
    el.dispatchEvent(new MouseEvent('mousedown', opts));
    el.dispatchEvent(new MouseEvent('mouseup', opts));
})) {
    return { status: 'clicked', method: 'mouse-down-up', tried: tried };
}
if (window.jQuery && attempt('jquery-trigger', () => window.jQuery(el).trigger('click'))) {
    return { status: 'clicked', method: 'jquery-trigger', tried: tried };
}
if (typeof el.onclick === 'function' && attempt('onclick-handler', () => el.onclick.call(el, new MouseEvent('click', opts)))) {
    return { status: 'clicked', method: 'onclick-handler', tried: tried };
}
return { status: 'failed', reason: 'every backup click method threw', tried: tried };
"##;

const SELECT_NATIVE_OPTION: &str = r##"
const args = arguments[0];
const opt = document.querySelector('[data-dompilot-uid="' + CSS.escape(args.uid) + '"]');
const sel = opt && opt.closest('select');
if (!sel) return { status: 'failed', reason: 'option is not inside a select' };
if (opt.disabled || sel.disabled) return { status: 'failed', reason: 'option or select is disabled' };
const setter = Object.getOwnPropertyDescriptor(HTMLSelectElement.prototype, 'value').set;
setter.call(sel, opt.value);
opt.selected = true;
sel.dispatchEvent(new Event('input', { bubbles: true }));
sel.dispatchEvent(new Event('change', { bubbles: true }));
return { status: 'done', value: sel.value };
"##;

const SELECT_ARIA_OPTION: &str = r##"
const args = arguments[0];
const opt = document.querySelector('[data-dompilot-uid="' + CSS.escape(args.uid) + '"]');
if (!opt) return { status: 'failed', reason: 'element missing' };
if (opt.getAttribute('aria-disabled') === 'true') return { status: 'failed', reason: 'option is aria-disabled' };
const listbox = opt.closest('[role="listbox"]');
if (listbox && listbox.getAttribute('aria-multiselectable') !== 'true') {
    listbox.querySelectorAll('[role="option"][aria-selected="true"]').forEach((o) => o.setAttribute('aria-selected', 'false'));
}
opt.setAttribute('aria-selected', 'true');
opt.click();
let combobox = null;
if (listbox && listbox.id) {
    const id = CSS.escape(listbox.id);
    combobox = document.querySelector('[role="combobox"][aria-controls="' + id + '"], [role="combobox"][aria-owns="' + id + '"]');
}
if (!combobox) combobox = opt.closest('[role="combobox"]');
const label = (opt.getAttribute('data-value') || opt.textContent || '').trim();
if (combobox) {
    combobox.setAttribute('aria-expanded', 'false');
    if (opt.id) combobox.setAttribute('aria-activedescendant', opt.id);
    const input = combobox.matches('input') ? combobox : combobox.querySelector('input');
    if (input) {
        const setter = Object.getOwnPropertyDescriptor(HTMLInputElement.prototype, 'value').set;
        setter.call(input, label);
        input.dispatchEvent(new Event('input', { bubbles: true }));
        input.dispatchEvent(new Event('change', { bubbles: true }));
    }
}
opt.dispatchEvent(new Event('change', { bubbles: true }));
return { status: 'done', value: label };
"##;

const CLASSIFY_INPUT: &str = r##"
const args = arguments[0];
const el = document.querySelector('[data-dompilot-uid="' + CSS.escape(args.uid) + '"]');
if (!el) return { kind: 'missing' };
const rich = '[data-lexical-editor="true"], .ProseMirror, .ql-editor, .public-DraftEditor-content, [data-slate-editor="true"], .cke_editable, .tox-edit-area';
if (el.closest(rich) || el.querySelector(rich)) return { kind: 'rich-editor' };
const tag = el.tagName.toLowerCase();
if (tag === 'textarea') return { kind: 'textarea' };
if (tag === 'input') {
    const type = (el.getAttribute('type') || 'text').toLowerCase();
    if (['checkbox', 'radio', 'file', 'submit', 'button', 'image', 'reset', 'hidden', 'range', 'color'].includes(type)) {
        return { kind: 'unsupported', reason: 'input of type ' + type + ' does not take text' };
    }
    return { kind: 'input' };
}
if (el.isContentEditable) return { kind: 'content-editable' };
return { kind: 'unsupported', reason: tag + ' is not editable' };
"##;

const CLEAR_FIELD: &str = r##"
const args = arguments[0];
const el = document.querySelector('[data-dompilot-uid="' + CSS.escape(args.uid) + '"]');
if (!el) return { status: 'failed', reason: 'element missing' };
const rich = '[data-lexical-editor="true"], .ProseMirror, .ql-editor, .public-DraftEditor-content, [data-slate-editor="true"], .cke_editable, .tox-edit-area';
try {
    if (args.kind === 'rich-editor') {
        const target = el.closest(rich) || el.querySelector(rich) || el;
        target.focus();
        const selection = window.getSelection();
        const range = document.createRange();
        range.selectNodeContents(target);
        selection.removeAllRanges();
        selection.addRange(range);
        document.execCommand('selectAll', false, null);
        target.dispatchEvent(new InputEvent('beforeinput', { bubbles: true, cancelable: true, inputType: 'deleteContentBackward' }));
        document.execCommand('delete', false, null);
        return { status: 'done' };
    }
    if (args.kind === 'content-editable') {
        el.focus();
        el.textContent = '';
        el.dispatchEvent(new InputEvent('input', { bubbles: true, inputType: 'deleteContentBackward' }));
        return { status: 'done' };
    }
    const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
    Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, '');
    el.dispatchEvent(new Event('input', { bubbles: true }));
    return { status: 'done' };
} catch (e) {
    return { status: 'failed', reason: String(e) };
}
"##;

const TYPE_CHARACTER: &str = r##"
const args = arguments[0];
const el = document.querySelector('[data-dompilot-uid="' + CSS.escape(args.uid) + '"]');
if (!el) return { status: 'failed', reason: 'element missing' };
const rich = '[data-lexical-editor="true"], .ProseMirror, .ql-editor, .public-DraftEditor-content, [data-slate-editor="true"], .cke_editable, .tox-edit-area';
const ch = args.ch;
const target = args.kind === 'rich-editor' ? (el.closest(rich) || el.querySelector(rich) || el) : el;
const keyOpts = { key: ch, bubbles: true, cancelable: true, composed: true };
try {
    if (document.activeElement !== target && !target.contains(document.activeElement)) target.focus();
    const proceed = target.dispatchEvent(new KeyboardEvent('keydown', keyOpts));
    target.dispatchEvent(new KeyboardEvent('keypress', Object.assign({ charCode: ch.charCodeAt(0) }, keyOpts)));
    if (proceed) {
        if (args.kind === 'rich-editor' || args.kind === 'content-editable') {
            target.dispatchEvent(new InputEvent('beforeinput', { bubbles: true, cancelable: true, inputType: 'insertText', data: ch }));
            if (!document.execCommand('insertText', false, ch)) {
                const selection = window.getSelection();
                if (selection && selection.rangeCount && target.contains(selection.anchorNode)) {
                    const range = selection.getRangeAt(0);
                    range.deleteContents();
                    range.insertNode(document.createTextNode(ch));
                    range.collapse(false);
                } else {
                    target.appendChild(document.createTextNode(ch));
                }
                target.dispatchEvent(new InputEvent('input', { bubbles: true, inputType: 'insertText', data: ch }));
            }
        } else {
            const proto = target instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
            const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
            const value = target.value || '';
            const start = typeof target.selectionStart === 'number' ? target.selectionStart : value.length;
            const end = typeof target.selectionEnd === 'number' ? target.selectionEnd : value.length;
            setter.call(target, value.slice(0, start) + ch + value.slice(end));
            try { target.setSelectionRange(start + 1, start + 1); } catch (e) {}
            target.dispatchEvent(new InputEvent('input', { bubbles: true, inputType: 'insertText', data: ch }));
        }
    }
    target.dispatchEvent(new KeyboardEvent('keyup', keyOpts));
} catch (e) {
    return { status: 'failed', reason: String(e) };
}
return { status: 'done' };
"##;

const INSERT_NEWLINE: &str = r##"
const args = arguments[0];
const el = document.querySelector('[data-dompilot-uid="' + CSS.escape(args.uid) + '"]');
if (!el) return { status: 'failed', reason: 'element missing' };
const rich = '[data-lexical-editor="true"], .ProseMirror, .ql-editor, .public-DraftEditor-content, [data-slate-editor="true"], .cke_editable, .tox-edit-area';
const enter = { key: 'Enter', code: 'Enter', keyCode: 13, which: 13, bubbles: true, cancelable: true, composed: true };
const pressEnter = (target) => {
    const proceed = target.dispatchEvent(new KeyboardEvent('keydown', enter));
    target.dispatchEvent(new KeyboardEvent('keypress', enter));
    target.dispatchEvent(new KeyboardEvent('keyup', enter));
    return proceed;
};
try {
    if (args.kind === 'textarea') {
        const setter = Object.getOwnPropertyDescriptor(HTMLTextAreaElement.prototype, 'value').set;
        const value = el.value || '';
        const start = typeof el.selectionStart === 'number' ? el.selectionStart : value.length;
        const end = typeof el.selectionEnd === 'number' ? el.selectionEnd : value.length;
        setter.call(el, value.slice(0, start) + '\n' + value.slice(end));
        el.setSelectionRange(start + 1, start + 1);
        el.dispatchEvent(new InputEvent('input', { bubbles: true, inputType: 'insertLineBreak' }));
        return { status: 'inserted', effect: 'line-break' };
    }
    if (args.kind === 'rich-editor') {
        const target = el.closest(rich) || el.querySelector(rich) || el;
        target.dispatchEvent(new InputEvent('beforeinput', { bubbles: true, cancelable: true, inputType: 'insertParagraph' }));
        if (pressEnter(target)) document.execCommand('insertParagraph', false, null);
        return { status: 'inserted', effect: 'enter-key' };
    }
    if (args.kind === 'content-editable') {
        el.dispatchEvent(new InputEvent('beforeinput', { bubbles: true, cancelable: true, inputType: 'insertLineBreak' }));
        if (document.execCommand('insertLineBreak', false, null)) return { status: 'inserted', effect: 'line-break' };
        if (document.execCommand('insertHTML', false, '<br>')) return { status: 'inserted', effect: 'line-break' };
        const selection = window.getSelection();
        const br = document.createElement('br');
        if (selection && selection.rangeCount && el.contains(selection.anchorNode)) {
            const range = selection.getRangeAt(0);
            range.deleteContents();
            range.insertNode(br);
            range.setStartAfter(br);
            range.collapse(true);
        } else {
            el.appendChild(br);
        }
        el.dispatchEvent(new InputEvent('input', { bubbles: true, inputType: 'insertLineBreak' }));
        return { status: 'inserted', effect: 'line-break' };
    }
    if (!pressEnter(el)) return { status: 'inserted', effect: 'enter-key' };
    const form = el.form || el.closest('form');
    if (form) {
        const button = form.querySelector('button[type="submit"], input[type="submit"], button:not([type])');
        if (button) {
            button.click();
            return { status: 'inserted', effect: 'submit-button-clicked' };
        }
        if (typeof form.requestSubmit === 'function') form.requestSubmit(); else form.submit();
        return { status: 'inserted', effect: 'form-submitted' };
    }
    return { status: 'inserted', effect: 'enter-key' };
} catch (e) {
    return { status: 'failed', reason: String(e) };
}
"##;

const FINISH_TYPING: &str = r##"
const args = arguments[0];
const el = document.querySelector('[data-dompilot-uid="' + CSS.escape(args.uid) + '"]');
if (!el) return { status: 'failed', reason: 'element missing' };
el.dispatchEvent(new Event('change', { bubbles: true }));
const value = 'value' in el && typeof el.value === 'string' ? el.value : (el.innerText || el.textContent || '');
return { status: 'done', value: value.slice(0, 200) };
"##;

const ASSIGN_VALUE: &str = r##"
const args = arguments[0];
const el = document.querySelector('[data-dompilot-uid="' + CSS.escape(args.uid) + '"]');
if (!el) return { status: 'failed', reason: 'element missing' };
const rich = '[data-lexical-editor="true"], .ProseMirror, .ql-editor, .public-DraftEditor-content, [data-slate-editor="true"], .cke_editable, .tox-edit-area';
const tag = el.tagName.toLowerCase();
try {
    if (tag === 'input' || tag === 'textarea') {
        const proto = tag === 'textarea' ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
        Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, args.value);
    } else if (el.isContentEditable || el.querySelector(rich)) {
        const target = el.closest(rich) || el.querySelector(rich) || el;
        target.textContent = args.value;
    } else {
        return { status: 'failed', reason: tag + ' does not accept text' };
    }
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
} catch (e) {
    return { status: 'failed', reason: String(e) };
}
return { status: 'done' };
"##;

const CURSOR_MOVE: &str = r##"
const args = arguments[0];
let cursor = document.getElementById('__dompilot_cursor');
if (!cursor) {
    cursor = document.createElement('div');
    cursor.id = '__dompilot_cursor';
    Object.assign(cursor.style, {
        position: 'fixed', left: args.from_x + 'px', top: args.from_y + 'px',
        width: '18px', height: '18px', marginLeft: '-9px', marginTop: '-9px',
        borderRadius: '50%', background: 'rgba(66, 133, 244, 0.45)',
        border: '2px solid rgba(66, 133, 244, 0.9)', pointerEvents: 'none', zIndex: '2147483647'
    });
    (document.body || document.documentElement).appendChild(cursor);
    cursor.getBoundingClientRect();
}
cursor.style.display = 'block';
cursor.style.transition = 'left ' + args.duration_ms + 'ms ease-out, top ' + args.duration_ms + 'ms ease-out';
cursor.style.left = args.x + 'px';
cursor.style.top = args.y + 'px';
return { status: 'done' };
"##;

const CURSOR_HIDE: &str = r##"
const cursor = document.getElementById('__dompilot_cursor');
if (cursor) cursor.style.display = 'none';
return { status: 'done' };
"##;
