//! Typed element locators
//!
//! The admin UI identifies almost everything by literal element IDs
//! (`settings-countries-add`, `chat-input`, ...). `Locator` keeps those IDs
//! verbatim and renders every variant to a JavaScript expression that
//! evaluates to an array of matching elements, so lookups never do implicit
//! waiting and never throw for a missing element.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// `document.getElementById(..)`
    Id(String),
    /// CSS selector, all matches in document order
    Css(String),
    /// XPath expression, all matches in document order
    XPath(String),
    /// Innermost elements matching `css` whose visible text contains `text`
    Text { css: String, text: String },
    /// Elements matching `css` inside any element matched by `parent`
    Within { parent: Box<Locator>, css: String },
    /// The `index`-th match (0-based) of `inner`
    Nth { inner: Box<Locator>, index: usize },
}

impl Locator {
    pub fn id(id: impl Into<String>) -> Self {
        Locator::Id(id.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(path: impl Into<String>) -> Self {
        Locator::XPath(path.into())
    }

    pub fn text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Locator::Text {
            css: css.into(),
            text: text.into(),
        }
    }

    /// Descend into this locator's matches with a CSS selector
    pub fn child(&self, css: impl Into<String>) -> Self {
        Locator::Within {
            parent: Box::new(self.clone()),
            css: css.into(),
        }
    }

    pub fn nth(&self, index: usize) -> Self {
        Locator::Nth {
            inner: Box::new(self.clone()),
            index,
        }
    }

    /// Parse the CLI form: `css=..`, `xpath=..`, `text=<css>|<text>`, or a bare id
    pub fn parse(input: &str) -> Self {
        if let Some(css) = input.strip_prefix("css=") {
            Locator::css(css)
        } else if let Some(path) = input.strip_prefix("xpath=") {
            Locator::xpath(path)
        } else if let Some(rest) = input.strip_prefix("text=") {
            match rest.split_once('|') {
                Some((css, text)) => Locator::text(css, text),
                None => Locator::text("*", rest),
            }
        } else {
            Locator::id(input.strip_prefix("id=").unwrap_or(input))
        }
    }

    /// JavaScript expression evaluating to `Element[]`
    pub fn to_js(&self) -> String {
        match self {
            Locator::Id(id) => format!(
                "(() => {{ const e = document.getElementById({}); return e ? [e] : []; }})()",
                js_string(id)
            ),
            Locator::Css(selector) => format!(
                "Array.from(document.querySelectorAll({}))",
                js_string(selector)
            ),
            Locator::XPath(path) => format!(
                "(() => {{ const r = document.evaluate({}, document, null, \
                 XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const out = []; \
                 for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i)); \
                 return out; }})()",
                js_string(path)
            ),
            // An ancestor's text contains its descendants' text, so keep only
            // matches that contain no other match
            Locator::Text { css, text } => format!(
                "Array.from(document.querySelectorAll({})).filter(e => \
                 (e.innerText || e.textContent || '').includes({}))\
                 .filter((e, _, all) => !all.some(o => o !== e && e.contains(o)))",
                js_string(css),
                js_string(text)
            ),
            Locator::Within { parent, css } => format!(
                "{}.flatMap(p => Array.from(p.querySelectorAll({})))",
                parent.to_js(),
                js_string(css)
            ),
            Locator::Nth { inner, index } => format!(
                "(() => {{ const a = {}; return a.length > {} ? [a[{}]] : []; }})()",
                inner.to_js(),
                index,
                index
            ),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id(id) => write!(f, "#{}", id),
            Locator::Css(selector) => write!(f, "css={}", selector),
            Locator::XPath(path) => write!(f, "xpath={}", path),
            Locator::Text { css, text } => write!(f, "{} with text '{}'", css, text),
            Locator::Within { parent, css } => write!(f, "{} >> {}", parent, css),
            Locator::Nth { inner, index } => write!(f, "{}[{}]", inner, index),
        }
    }
}

fn js_string(value: &str) -> String {
    // JSON string literals are valid JavaScript string literals
    serde_json::Value::String(value.to_string()).to_string()
}
