//! Site configuration file.

use std::path::PathBuf;

use capsule::config::{LogConfig, ServerConfig, Validate};
use serde::Deserialize;

use crate::i18n::Locale;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub log: LogConfig,
    pub site: SiteConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub default_locale: Locale,
    /// Directory whose images make up the gallery page.
    pub gallery_dir: PathBuf,
    pub session_ttl_minutes: u64,
    pub contact_email: String,
    /// Account created at startup so the dashboard is reachable.
    pub admin: AdminAccount,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            default_locale: Locale::Fr,
            gallery_dir: PathBuf::from("public/gallery"),
            session_ttl_minutes: 120,
            contact_email: "contact@example.org".to_owned(),
            admin: AdminAccount::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdminAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Default for AdminAccount {
    fn default() -> Self {
        Self {
            name: "Admin".to_owned(),
            email: "admin@example.org".to_owned(),
            password: "change-me".to_owned(),
        }
    }
}

impl Validate for Settings {
    fn validate(&self) -> Vec<String> {
        let mut problems = self.server.validate();
        problems.extend(self.log.validate());
        if self.site.session_ttl_minutes == 0 {
            problems.push("site.session_ttl_minutes must be positive".to_owned());
        }
        if !self.site.admin.email.contains('@') {
            problems.push(format!("site.admin.email `{}` is not an e-mail address", self.site.admin.email));
        }
        if self.site.admin.password.is_empty() {
            problems.push("site.admin.password must not be empty".to_owned());
        }
        problems
    }
}
