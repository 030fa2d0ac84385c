//! Public pages.

use std::path::{Path, PathBuf};
use std::{fs, io};

use capsule::extract::{Inject, Params};
use capsule::{ContentType, Request, Response, Status};
use chrono::Local;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::i18n::{self, Locale};
use crate::repo::{ArticleRepository, EventRepository};
use crate::settings::SiteConfig;
use crate::views::{self, View};

const HOME_ARTICLES: usize = 5;
const HOME_EVENTS: usize = 5;

// ── Gallery ───────────────────────────────────────────────────────────────────

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Image files of one directory.
pub struct Gallery {
    dir: PathBuf,
}

impl Gallery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Sorted image file names. A missing or unreadable directory is an
    /// empty gallery.
    pub fn images(&self) -> Vec<String> {
        match self.read_images() {
            Ok(images) => images,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "gallery directory unreadable");
                Vec::new()
            }
        }
    }

    fn read_images(&self) -> io::Result<Vec<String>> {
        let mut images = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str().filter(|n| content_type(n).is_some()) {
                images.push(name.to_owned());
            }
        }
        images.sort();
        Ok(images)
    }

    /// Reads one image, refusing anything that is not a plain image file name.
    pub fn read(&self, name: &str) -> Option<(ContentType, Vec<u8>)> {
        let content_type = content_type(name)?;
        if name.starts_with('.') || name.contains(['/', '\\']) {
            return None;
        }
        let bytes = fs::read(self.dir.join(name)).ok()?;
        Some((content_type, bytes))
    }
}

fn content_type(name: &str) -> Option<ContentType> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    Some(match ext.as_str() {
        "png" => ContentType::Png,
        "gif" => ContentType::Gif,
        "webp" => ContentType::Webp,
        _ => ContentType::Jpeg,
    })
}

// ── Handlers ──────────────────────────────────────────────────────────────────

// GET /
pub async fn home(
    view: View,
    Inject(articles): Inject<dyn ArticleRepository>,
    Inject(events): Inject<dyn EventRepository>,
) -> Response {
    let articles = articles.latest(view.locale, HOME_ARTICLES);
    let events = events.upcoming(Local::now().date_naive(), HOME_EVENTS);
    view.page("home.title", views::home(&view, &articles, &events))
}

// GET /projet
pub async fn project(view: View) -> Response {
    view.page("project.title", views::project(&view))
}

// GET /contact
pub async fn contact(view: View, Inject(site): Inject<SiteConfig>) -> Response {
    view.page("contact.title", views::contact(&view, &site.contact_email))
}

// GET /galerie
pub async fn gallery(view: View, Inject(gallery): Inject<Gallery>) -> Response {
    let images = gallery.images();
    view.page("gallery.title", views::gallery(&view, &images))
}

#[derive(Deserialize)]
pub struct ImagePath {
    file: String,
}

// GET /galerie/{file}
pub async fn image(view: View, Params(path): Params<ImagePath>, Inject(gallery): Inject<Gallery>) -> Response {
    match gallery.read(&path.file) {
        Some((content_type, bytes)) => Response::builder()
            .header("cache-control", "public, max-age=86400")
            .bytes(content_type, bytes),
        None => not_found_page(&view),
    }
}

#[derive(Deserialize)]
pub struct ArticlePath {
    id: u64,
}

// GET /articles/{id}
pub async fn article(
    view: View,
    Params(path): Params<ArticlePath>,
    Inject(articles): Inject<dyn ArticleRepository>,
) -> Response {
    match articles.find(path.id) {
        Some(article) => view.document(Status::Ok, &article.title, views::article(&view, &article)),
        None => not_found_page(&view),
    }
}

#[derive(Deserialize)]
pub struct LangPath {
    code: Locale,
}

// GET /lang/{code}
pub async fn switch_lang(Params(path): Params<LangPath>, req: Request) -> Response {
    debug!(locale = %path.code, "switching language");
    let back = req
        .header("referer")
        .and_then(local_path)
        .unwrap_or("/")
        .to_owned();
    Response::redirect(&back).with_header(
        "set-cookie",
        &format!("{}={}; Path=/; SameSite=Lax; Max-Age=31536000", i18n::COOKIE, path.code),
    )
}

/// Keeps redirects on this site: the path of a referer, never its host.
fn local_path(referer: &str) -> Option<&str> {
    let path = match referer.find("://") {
        Some(scheme_end) => {
            let after = &referer[scheme_end + 3..];
            &after[after.find('/')?..]
        }
        None => referer,
    };
    (path.starts_with('/') && !path.starts_with("//")).then_some(path)
}

/// Router fallback.
pub async fn not_found(view: View) -> Response {
    not_found_page(&view)
}

fn not_found_page(view: &View) -> Response {
    let body = format!("<p>{}</p>", capsule::template::escape(view.t("error.not_found")));
    view.page_with_status(Status::NotFound, "error.not_found", body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gallery_lists_sorted_images_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.JPG", "notes.txt", "c.webp"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("sub.png")).unwrap();
        let gallery = Gallery::new(dir.path());
        assert_eq!(gallery.images(), ["a.JPG", "b.png", "c.webp"]);
        assert!(gallery.read("b.png").is_some());
        assert!(gallery.read("notes.txt").is_none());
        assert!(gallery.read("../b.png").is_none());
    }

    #[test]
    fn missing_gallery_is_empty() {
        assert!(Gallery::new("/definitely/not/here").images().is_empty());
    }

    #[test]
    fn referer_paths_stay_local() {
        assert_eq!(local_path("http://capsule.bzh/galerie?x=1"), Some("/galerie?x=1"));
        assert_eq!(local_path("/contact"), Some("/contact"));
        assert_eq!(local_path("https://capsule.bzh"), None);
        assert_eq!(local_path("//evil.example/"), None);
    }
}
