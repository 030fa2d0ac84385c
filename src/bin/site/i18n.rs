//! French / Breton strings.
//!
//! Strings live in `lang/<code>.toml`, grouped in tables (`[nav] home = ...`
//! is looked up as `nav.home`). A key missing from Breton falls back to
//! French, and a key missing everywhere renders as itself.

use std::collections::HashMap;
use std::fmt;

use capsule::middleware::{Middleware, Next};
use capsule::template::Context;
use capsule::{BoxFuture, Request};
use serde::Deserialize;

const FR: &str = include_str!("../../../lang/fr.toml");
const BR: &str = include_str!("../../../lang/br.toml");

pub const COOKIE: &str = "lang";

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Fr,
    Br,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::Fr, Locale::Br];

    pub fn code(self) -> &'static str {
        match self {
            Self::Fr => "fr",
            Self::Br => "br",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.code() == code)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

pub struct Translator {
    strings: HashMap<Locale, HashMap<String, String>>,
}

impl Translator {
    /// Loads the bundled string files.
    pub fn bundled() -> Result<Self, toml::de::Error> {
        Self::from_sources(FR, BR)
    }

    pub fn from_sources(fr: &str, br: &str) -> Result<Self, toml::de::Error> {
        let mut strings = HashMap::new();
        strings.insert(Locale::Fr, flatten(fr)?);
        strings.insert(Locale::Br, flatten(br)?);
        Ok(Self { strings })
    }

    pub fn get<'a>(&'a self, locale: Locale, key: &'a str) -> &'a str {
        self.lookup(locale, key)
            .or_else(|| self.lookup(Locale::Fr, key))
            .unwrap_or(key)
    }

    /// Every known string for `locale`, keyed by its dotted name.
    pub fn context(&self, locale: Locale) -> Context {
        let mut ctx = Context::new();
        if let Some(keys) = self.strings.get(&Locale::Fr) {
            for key in keys.keys() {
                ctx.insert(key, self.get(locale, key));
            }
        }
        ctx
    }

    fn lookup(&self, locale: Locale, key: &str) -> Option<&str> {
        self.strings.get(&locale)?.get(key).map(String::as_str)
    }
}

fn flatten(source: &str) -> Result<HashMap<String, String>, toml::de::Error> {
    let table: toml::Table = toml::from_str(source)?;
    let mut out = HashMap::new();
    walk("", &table, &mut out);
    Ok(out)
}

fn walk(prefix: &str, table: &toml::Table, out: &mut HashMap<String, String>) {
    for (key, value) in table {
        let full = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
        match value {
            toml::Value::Table(inner) => walk(&full, inner, out),
            toml::Value::String(s) => {
                out.insert(full, s.clone());
            }
            other => {
                out.insert(full, other.to_string());
            }
        }
    }
}

/// Stores the request's [`Locale`] as an extension: the `lang` cookie when
/// it names a known locale, the site default otherwise.
pub struct LocaleLayer {
    pub default: Locale,
}

impl Middleware for LocaleLayer {
    fn handle(&self, mut req: Request, next: Next) -> BoxFuture {
        let locale = req.cookie(COOKIE).and_then(Locale::parse).unwrap_or(self.default);
        req.insert_extension(locale);
        next.run(req)
    }
}
