//! Typed element locators.
//!
//! A locator is a strategy plus a value, rendered on demand into a
//! JavaScript expression that resolves to the target element (or `null`).
//! Keeping page-structure coupling behind these constructors means a page
//! object swaps a selector in one place when the markup changes.

use std::fmt;

/// Element lookup strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// CSS selector, e.g. `.userName`.
    Css(String),
    /// XPath expression.
    XPath(String),
    /// Element whose visible text contains the given fragment.
    Text(String),
    /// Input or textarea with an exact `placeholder` attribute.
    Placeholder(String),
    /// ARIA-style role with an exact accessible name.
    Role { role: String, name: String },
    /// `data-testid` attribute value.
    TestId(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Locator::XPath(expression.into())
    }

    pub fn text(fragment: impl Into<String>) -> Self {
        Locator::Text(fragment.into())
    }

    pub fn placeholder(placeholder: impl Into<String>) -> Self {
        Locator::Placeholder(placeholder.into())
    }

    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Locator::Role {
            role: role.into(),
            name: name.into(),
        }
    }

    pub fn test_id(id: impl Into<String>) -> Self {
        Locator::TestId(id.into())
    }

    /// JS expression evaluating to the matched element or `null`.
    pub fn to_query(&self) -> String {
        match self {
            Locator::Css(selector) => {
                format!("document.querySelector({})", js_string(selector))
            }
            Locator::XPath(expression) => format!(
                "document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
                js_string(expression)
            ),
            Locator::Text(fragment) => format!(
                "(Array.from(document.querySelectorAll('*')).find(el => el.childElementCount === 0 && el.textContent.includes({})) || null)",
                js_string(fragment)
            ),
            Locator::Placeholder(placeholder) => format!(
                "(Array.from(document.querySelectorAll('input, textarea')).find(el => el.getAttribute('placeholder') === {}) || null)",
                js_string(placeholder)
            ),
            Locator::Role { role, name } => format!(
                "(Array.from(document.querySelectorAll({})).find(el => ((el.innerText || el.value || '').trim() === {})) || null)",
                js_string(&role_selector(role)),
                js_string(name)
            ),
            Locator::TestId(id) => format!(
                "document.querySelector('[data-testid=' + CSS.escape({}) + ']')",
                js_string(id)
            ),
        }
    }

    /// JS expression counting matches; used by strictness checks in waits.
    pub fn to_count_query(&self) -> String {
        match self {
            Locator::Css(selector) => {
                format!("document.querySelectorAll({}).length", js_string(selector))
            }
            Locator::XPath(expression) => format!(
                "document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null).snapshotLength",
                js_string(expression)
            ),
            Locator::Text(fragment) => format!(
                "Array.from(document.querySelectorAll('*')).filter(el => el.childElementCount === 0 && el.textContent.includes({})).length",
                js_string(fragment)
            ),
            Locator::Placeholder(placeholder) => format!(
                "Array.from(document.querySelectorAll('input, textarea')).filter(el => el.getAttribute('placeholder') === {}).length",
                js_string(placeholder)
            ),
            Locator::Role { role, name } => format!(
                "Array.from(document.querySelectorAll({})).filter(el => ((el.innerText || el.value || '').trim() === {})).length",
                js_string(&role_selector(role)),
                js_string(name)
            ),
            Locator::TestId(id) => format!(
                "document.querySelectorAll('[data-testid=' + CSS.escape({}) + ']').length",
                js_string(id)
            ),
        }
    }

    /// JS expression returning `true` when the element exists, has a
    /// non-empty box and is not hidden by CSS.
    pub fn to_visibility_query(&self) -> String {
        format!(
            "(() => {{ const el = {}; if (!el) return false; \
             const rect = el.getBoundingClientRect(); \
             const style = window.getComputedStyle(el); \
             return rect.width > 0 && rect.height > 0 && \
             style.visibility !== 'hidden' && style.display !== 'none'; }})()",
            self.to_query()
        )
    }

    /// JS that clicks the element. Returns `"ok"`, or `"missing"` /
    /// `"hidden"` so the polling caller knows whether to keep waiting.
    pub fn to_click_script(&self) -> String {
        format!(
            "(() => {{ const el = {}; if (!el) return 'missing'; \
             const rect = el.getBoundingClientRect(); \
             if (rect.width === 0 || rect.height === 0) return 'hidden'; \
             el.click(); return 'ok'; }})()",
            self.to_query()
        )
    }

    /// JS that fills an input with `value` through the native value setter,
    /// so framework change listeners fire the same way they would for real
    /// keystrokes.
    pub fn to_fill_script(&self, value: &str) -> String {
        format!(
            "(() => {{ const el = {query}; if (!el) return 'missing'; \
             el.focus(); \
             const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype; \
             const descriptor = Object.getOwnPropertyDescriptor(proto, 'value'); \
             if (descriptor && descriptor.set) {{ descriptor.set.call(el, {value}); }} else {{ el.value = {value}; }} \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return 'ok'; }})()",
            query = self.to_query(),
            value = js_string(value)
        )
    }

    /// JS returning the element's rendered text, or `null` when missing.
    pub fn to_text_script(&self) -> String {
        format!(
            "(() => {{ const el = {}; return el ? el.innerText : null; }})()",
            self.to_query()
        )
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css={s}"),
            Locator::XPath(s) => write!(f, "xpath={s}"),
            Locator::Text(s) => write!(f, "text={s}"),
            Locator::Placeholder(s) => write!(f, "placeholder={s}"),
            Locator::Role { role, name } => write!(f, "role={role}[name={name}]"),
            Locator::TestId(s) => write!(f, "testid={s}"),
        }
    }
}

/// CSS selector list for elements that carry a role implicitly, plus the
/// explicit `role` attribute.
fn role_selector(role: &str) -> String {
    match role {
        "button" => "button, input[type=\"submit\"], input[type=\"button\"], [role=\"button\"]"
            .to_string(),
        "link" => "a[href], [role=\"link\"]".to_string(),
        "textbox" => {
            "input:not([type]), input[type=\"text\"], input[type=\"password\"], textarea, [role=\"textbox\"]"
                .to_string()
        }
        other => format!("[role=\"{other}\"]"),
    }
}

/// Encode a Rust string as a JS double-quoted string literal.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}
