//! Route definitions and path compilation.
//!
//! A path pattern such as `/articles/{id}/{slug}` compiles into an anchored
//! regular expression with one named capture group per placeholder. The
//! placeholder's *name* picks the sub-pattern:
//!
//! | Name   | Matches                                      |
//! |--------|----------------------------------------------|
//! | `id`   | decimal digits                               |
//! | `slug` | lowercase ASCII letters, digits and `-`      |
//! | `uuid` | canonical 8-4-4-4-12 hexadecimal UUID        |
//! | other  | one path segment (anything but `/`)          |
//!
//! Static text between placeholders is escaped, so `.` or `+` in a pattern
//! only ever match themselves.

use std::fmt::Write as _;
use std::sync::Arc;

use regex::Regex;

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::middleware::Middleware;

const ID: &str = r"\d+";
const SLUG: &str = "[a-z0-9-]+";
const UUID: &str = "[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}";
const SEGMENT: &str = "[^/]+";

/// Sub-pattern used for a placeholder called `name`.
pub fn placeholder_pattern(name: &str) -> &'static str {
    match name {
        "id" => ID,
        "slug" => SLUG,
        "uuid" => UUID,
        _ => SEGMENT,
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    /// A placeholder and the anchored check its values must pass.
    Param { name: String, check: Regex },
}

/// A path pattern compiled to an anchored regular expression.
#[derive(Debug, Clone)]
pub struct CompiledPath {
    pattern: String,
    regex: Regex,
    segments: Vec<Segment>,
}

/// Compiles `pattern` into a [`CompiledPath`].
///
/// Fails on an empty, unclosed, nested or duplicated placeholder, and on a
/// placeholder name that is not an identifier.
pub fn compile(pattern: &str) -> Result<CompiledPath, Error> {
    let mut source = String::from("^");
    let mut segments = Vec::new();
    let mut names: Vec<&str> = Vec::new();
    let mut rest = pattern;

    while let Some(open) = rest.find('{') {
        let literal = &rest[..open];
        if literal.contains('}') {
            return Err(Error::invalid_route(pattern, "unmatched `}`"));
        }
        push_literal(&mut source, &mut segments, literal);

        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| Error::invalid_route(pattern, "unclosed `{`"))?;
        let name = &after[..close];
        if name.contains('{') {
            return Err(Error::invalid_route(pattern, "nested `{`"));
        }
        if !is_identifier(name) {
            return Err(Error::invalid_route(
                pattern,
                format!("placeholder `{{{name}}}` is not an identifier"),
            ));
        }
        if names.contains(&name) {
            return Err(Error::invalid_route(
                pattern,
                format!("placeholder `{name}` appears twice"),
            ));
        }
        // `write!` into a String cannot fail.
        let _ = write!(source, "(?P<{name}>{})", placeholder_pattern(name));
        let check = Regex::new(&format!("^(?:{})$", placeholder_pattern(name)))
            .map_err(|e| Error::invalid_route(pattern, e.to_string()))?;
        segments.push(Segment::Param { name: name.to_owned(), check });
        names.push(name);
        rest = &after[close + 1..];
    }
    if rest.contains('}') {
        return Err(Error::invalid_route(pattern, "unmatched `}`"));
    }
    push_literal(&mut source, &mut segments, rest);
    source.push('$');

    let regex = Regex::new(&source).map_err(|e| Error::invalid_route(pattern, e.to_string()))?;
    Ok(CompiledPath { pattern: pattern.to_owned(), regex, segments })
}

fn push_literal(source: &mut String, segments: &mut Vec<Segment>, literal: &str) {
    if literal.is_empty() {
        return;
    }
    source.push_str(&regex::escape(literal));
    segments.push(Segment::Literal(literal.to_owned()));
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl CompiledPath {
    /// The pattern this path was compiled from.
    pub fn pattern(&self) -> &str { &self.pattern }

    /// The generated regular expression source.
    pub fn regex(&self) -> &str { self.regex.as_str() }

    /// Placeholder names in order of appearance.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Matches `path`, returning the captured parameters in placeholder order.
    pub fn captures(&self, path: &str) -> Option<Vec<(String, String)>> {
        let caps = self.regex.captures(path)?;
        Some(
            self.param_names()
                .filter_map(|name| caps.name(name).map(|m| (name.to_owned(), m.as_str().to_owned())))
                .collect(),
        )
    }

    /// Renders a concrete path by substituting `params` into the pattern.
    ///
    /// Every placeholder needs a value, and the value must satisfy the
    /// placeholder's sub-pattern.
    pub fn build(&self, params: &[(&str, &str)]) -> Result<String, Error> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Param { name, check } => {
                    let value = params
                        .iter()
                        .find(|(k, _)| k == name)
                        .map(|(_, v)| *v)
                        .ok_or_else(|| self.build_error(format!("missing parameter `{name}`")))?;
                    if !check.is_match(value) {
                        return Err(self.build_error(format!(
                            "`{value}` does not fit placeholder `{name}`"
                        )));
                    }
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }

    fn build_error(&self, reason: String) -> Error {
        Error::UrlGeneration { pattern: self.pattern.clone(), reason }
    }
}

// ── Route definition ─────────────────────────────────────────────────────────

/// A route definition: methods, path pattern, handler, plus an optional
/// name and per-route middleware.
///
/// ```rust,no_run
/// # use capsule::{Request, Response, Route, Router, middleware};
/// # async fn dashboard(_: Request) -> Response { Response::text("") }
/// # let require_auth = middleware::from_fn(|req, next: middleware::Next| next.run(req));
/// Router::new().route(
///     Route::get("/admin", dashboard)
///         .name("admin.dashboard")
///         .layer(require_auth),
/// );
/// ```
pub struct Route {
    pub(crate) methods: Vec<Method>,
    pub(crate) pattern: String,
    pub(crate) name: Option<String>,
    pub(crate) middleware: Vec<Arc<dyn Middleware>>,
    pub(crate) handler: BoxedHandler,
}

impl Route {
    pub fn new<H, T>(methods: &[Method], pattern: &str, handler: H) -> Self
    where
        H: Handler<T>,
        T: 'static,
    {
        Self {
            methods: methods.to_vec(),
            pattern: pattern.to_owned(),
            name: None,
            middleware: Vec::new(),
            handler: handler.into_boxed_handler(),
        }
    }

    pub fn get<H: Handler<T>, T: 'static>(pattern: &str, handler: H) -> Self {
        Self::new(&[Method::Get], pattern, handler)
    }

    pub fn post<H: Handler<T>, T: 'static>(pattern: &str, handler: H) -> Self {
        Self::new(&[Method::Post], pattern, handler)
    }

    pub fn put<H: Handler<T>, T: 'static>(pattern: &str, handler: H) -> Self {
        Self::new(&[Method::Put], pattern, handler)
    }

    pub fn patch<H: Handler<T>, T: 'static>(pattern: &str, handler: H) -> Self {
        Self::new(&[Method::Patch], pattern, handler)
    }

    pub fn delete<H: Handler<T>, T: 'static>(pattern: &str, handler: H) -> Self {
        Self::new(&[Method::Delete], pattern, handler)
    }

    /// Names the route for [`Router::url_for`](crate::Router::url_for).
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_owned());
        self
    }

    /// Adds a per-route middleware. Earlier layers wrap later ones.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn pattern(&self) -> &str { &self.pattern }
    pub fn methods(&self) -> &[Method] { &self.methods }
}
