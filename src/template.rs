//! Minimal logic-less templates.
//!
//! `{{ key }}` inserts the HTML-escaped value of `key`, `{{{ key }}}` inserts
//! it verbatim. Unknown keys render as nothing. There are no loops or
//! conditionals: lists are rendered by the caller and passed in as raw HTML.

use std::borrow::Cow;

/// Values available to a template, looked up by key.
#[derive(Debug, Clone, Default)]
pub struct Context {
    values: Vec<(String, String)>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, replacing an earlier value.
    pub fn set(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.values.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.values.push((key.to_owned(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

/// Renders `template` against `ctx`.
///
/// An unterminated tag is copied through unchanged.
pub fn render(template: &str, ctx: &Context) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let tag = &rest[open..];
        let (raw, inner_start, close) = if tag.starts_with("{{{") {
            (true, 3, "}}}")
        } else {
            (false, 2, "}}")
        };
        let Some(end) = tag[inner_start..].find(close) else {
            out.push_str(tag);
            return out;
        };
        let key = tag[inner_start..inner_start + end].trim();
        let value = ctx.get(key).unwrap_or("");
        if raw {
            out.push_str(value);
        } else {
            out.push_str(&escape(value));
        }
        rest = &tag[inner_start + end + close.len()..];
    }
    out.push_str(rest);
    out
}

/// Escapes the five HTML-significant characters.
pub fn escape(input: &str) -> Cow<'_, str> {
    if !input.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}
