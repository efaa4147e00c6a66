//! Wiki pages and their photos, served through the `rest` layer.

pub mod menu;
pub mod models;

use std::sync::Arc;

use axum::http::Method;
use log::{info, warn};
use serde::Serialize;

use crate::errors::WikiError;
use crate::rest::template::VARIABLE_CACHE_KEY;
use crate::rest::{
    Arg, Args, Cache, Handler, HandlerResult, Locatable, Markup, Registry, Request, Response,
    Router, Value, handler, resource,
};
use crate::store::EntityStore;

pub use menu::build_menu;
pub use models::{PAGE_KIND, PHOTO_KIND, Page, Photo};

pub const IMAGE_TYPES: [&str; 4] = ["image/png", "image/jpg", "image/jpeg", "image/gif"];

const MENU: &str = "menu";

/// True when `value` is absent or only whitespace.
pub fn blank(value: Option<&str>) -> bool {
    value.is_none_or(|text| text.chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n')))
}

/// True when `body` links to `url` (not merely to a longer id sharing its prefix).
fn references(body: &str, url: &str) -> bool {
    body.match_indices(url)
        .any(|(at, _)| !body[at + url.len()..].starts_with(|c: char| c.is_ascii_digit()))
}

#[derive(Debug, Serialize)]
struct PhotoUpload {
    message: &'static str,
    markup: String,
}

type Action = fn(&Wiki, &Request, Args) -> HandlerResult;

/// Application state behind the wiki routes.
pub struct Wiki {
    store: Arc<dyn EntityStore>,
    cache: Cache,
}

impl Wiki {
    pub fn new(store: Arc<dyn EntityStore>, cache: Cache) -> Arc<Self> {
        Arc::new(Self { store, cache })
    }

    /// Template variables provided by the wiki.
    pub fn registry(self: &Arc<Self>) -> Registry {
        let wiki = Arc::clone(self);
        Registry::new().with(MENU, move || {
            let pages = Page::all(wiki.store.as_ref())?;
            Ok(Some(Value::from(build_menu(&pages))))
        })
    }

    /// The route table. Order matters: the first match answers the request.
    pub fn router(self: &Arc<Self>) -> Result<Router, WikiError> {
        let store = Arc::clone(&self.store);
        let page = |inner: Handler| resource(Arc::clone(&store), PAGE_KIND, inner);
        let photo = |inner: Handler| resource(Arc::clone(&store), PHOTO_KIND, inner);

        let view_page = page(self.action(Wiki::view_page));
        let home_view = Arc::clone(&view_page);
        let wiki = Arc::clone(self);
        let view_home_page = handler(move |request, _| {
            let id = wiki.home_page_id()?;
            home_view(request, Args::new(vec![Arg::Raw(id)]))
        });

        Router::new()
            .route(r"/create", Method::GET, self.action(Wiki::create_page_form))?
            .route(r"/create", Method::POST, self.action(Wiki::create_page))?
            .route(r"/pages/([0-9]+)/edit", Method::GET, page(self.action(Wiki::edit_page_form)))?
            .route(r"/pages/([0-9]+)/photos", Method::POST, page(self.action(Wiki::add_photo)))?
            .route(
                r"/pages/([0-9]+)/photos/([0-9]+)",
                Method::GET,
                page(photo(self.action(Wiki::get_photo))),
            )?
            .route(r"/pages/([0-9]+)", Method::POST, page(self.action(Wiki::edit_page)))?
            .route(r"/pages/([0-9]+)", Method::GET, view_page)?
            .route(r"/", Method::GET, view_home_page)
    }

    fn action(self: &Arc<Self>, action: Action) -> Handler {
        let wiki = Arc::clone(self);
        handler(move |request, args| action(&wiki, request, args))
    }

    fn invalidate_menu(&self) -> Result<(), WikiError> {
        self.cache.invalidate(VARIABLE_CACHE_KEY, &[&MENU])
    }

    fn create_page_form(&self, _request: &Request, _args: Args) -> HandlerResult {
        Ok(Some(Response::template("create_page")))
    }

    fn create_page(&self, request: &Request, _args: Args) -> HandlerResult {
        let (name, body) = (request.text("name"), request.text("body"));
        if blank(name) {
            return Ok(Some(Response::template("create_page")
                .with("message", "Please enter a page title before submitting.")));
        }
        if blank(body) {
            return Ok(Some(Response::template("create_page")
                .with("message", "Please enter a page body before submitting.")));
        }

        let page = Page::create(self.store.as_ref(), name.unwrap_or_default(), body.unwrap_or_default())?;
        self.invalidate_menu()?;
        info!("Created page {} '{}'", page.id(), name.unwrap_or_default());
        Ok(Some(Response::redirect_to(&page)))
    }

    fn edit_form(page: &Page) -> Response {
        Response::template("edit_page")
            .with("title", page.name.clone().unwrap_or_default())
            .with("body", page.body.clone().unwrap_or_default())
            .with("page", Value::location(page))
    }

    fn edit_page_form(&self, _request: &Request, args: Args) -> HandlerResult {
        let page: Page = args.model(0)?;
        Ok(Some(Self::edit_form(&page)))
    }

    fn add_photo(&self, request: &Request, args: Args) -> HandlerResult {
        let page: Page = args.model(0)?;

        let upload = match request.file("upload") {
            Some(upload) if IMAGE_TYPES.contains(&upload.content_type.as_str()) => upload,
            other => {
                warn!(
                    "Rejected attachment for page {} ({})",
                    page.id(),
                    other.map(|u| u.content_type.as_str()).unwrap_or("no file")
                );
                return Ok(Some(Response::json(&PhotoUpload {
                    message: "Please only attach images.",
                    markup: String::new(),
                })?));
            }
        };

        let result = match Photo::create(self.store.as_ref(), &page, upload.data.clone(), &upload.content_type) {
            Ok(photo) => {
                let location = photo.locate();
                let markup = if request.text("type") == Some("html") {
                    format!("\n<img src=\"{}\"/>\n", location)
                } else {
                    format!("\n![Description of Image]({})\n", location)
                };
                info!("Attached {} to page {}", location, page.id());
                PhotoUpload { message: "Successfully attached image.", markup }
            }
            Err(e) => {
                warn!("Could not store photo for page {}: {}", page.id(), e);
                PhotoUpload {
                    message: "Unable to attach image; perhaps you should try a smaller one.",
                    markup: String::new(),
                }
            }
        };
        Ok(Some(Response::json(&result)?))
    }

    fn get_photo(&self, _request: &Request, args: Args) -> HandlerResult {
        let photo: Photo = args.model(1)?;
        Ok(Some(Response::raw(photo.data, photo.content_type)))
    }

    fn edit_page(&self, request: &Request, args: Args) -> HandlerResult {
        let mut page: Page = args.model(0)?;

        if blank(request.text("name")) {
            return Ok(Some(Self::edit_form(&page)
                .with("message", "Please enter a page name before submitting.")));
        }

        page.name = request.text("name").map(str::to_string);
        let body = request.text("body").unwrap_or_default().to_string();

        for photo in page.photos(self.store.as_ref())? {
            if !references(&body, &photo.locate()) {
                info!("Removing unreferenced photo {}", photo.locate());
                photo.delete(self.store.as_ref())?;
            }
        }

        page.body = Some(body);
        page.save(self.store.as_ref())?;
        self.invalidate_menu()?;
        Ok(Some(Response::redirect_to(&page)))
    }

    fn view_page(&self, _request: &Request, args: Args) -> HandlerResult {
        let page: Page = args.model(0)?;
        Ok(Some(Response::template("view_page")
            .with("title", page.name.clone().unwrap_or_default())
            .with("body", Markup::markdown(page.body.as_deref().unwrap_or_default()))
            .with("page", Value::location(&page))))
    }

    /// Id of the first page whose name mentions HOME, else the last page seen,
    /// else empty (which resolves to nothing).
    fn home_page_id(&self) -> Result<String, WikiError> {
        let mut fallback = String::new();
        for page in Page::all(self.store.as_ref())? {
            fallback = page.id().to_string();
            if page.name.as_deref().is_some_and(|name| name.to_uppercase().contains("HOME")) {
                return Ok(fallback);
            }
        }
        Ok(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::{MemoryTemplates, Rendered, Templates, UploadedFile};
    use crate::store::MemoryStore;
    use axum::http::{StatusCode, header};

    struct Fixture {
        store: Arc<MemoryStore>,
        router: Router,
        templates: Templates,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_store(MemoryStore::new())
        }

        fn with_store(store: MemoryStore) -> Self {
            let store = Arc::new(store);
            let cache = Cache::in_memory();
            let wiki = Wiki::new(store.clone(), cache.clone());
            let templates = Templates::new(
                Arc::new(
                    MemoryTemplates::new()
                        .with("index", "<nav>{{menu}}</nav><main>{{content}}</main>")
                        .with("view_page", "<h1>{{title}}</h1>{{body}}")
                        .with("edit_page", "<form action=\"{{page}}\">{{message}}<input value=\"{{title}}\"></form>")
                        .with("create_page", "<form>{{message}}</form>"),
                ),
                Arc::new(wiki.registry()),
                cache,
                "index",
            );
            Self { store, router: wiki.router().unwrap(), templates }
        }

        fn handle(&self, request: Request) -> Rendered {
            self.router.handle(&request, &self.templates).unwrap()
        }
    }

    fn body(rendered: &Rendered) -> String {
        String::from_utf8(rendered.body.clone()).unwrap()
    }

    fn png(data: &[u8]) -> UploadedFile {
        UploadedFile {
            filename: Some("photo.png".into()),
            content_type: "image/png".into(),
            data: data.to_vec(),
        }
    }

    #[test]
    fn blank_detects_missing_and_whitespace() {
        assert!(blank(None));
        assert!(blank(Some(" \t\r\n")));
        assert!(!blank(Some(" x ")));
    }

    #[test]
    fn references_ignore_longer_ids() {
        assert!(references("see /pages/1/photos/2 here", "/pages/1/photos/2"));
        assert!(references("(/pages/1/photos/2)", "/pages/1/photos/2"));
        assert!(references("/pages/1/photos/2", "/pages/1/photos/2"));
        assert!(!references("/pages/1/photos/23", "/pages/1/photos/2"));
        assert!(!references("nothing", "/pages/1/photos/2"));
    }

    #[test]
    fn create_validates_then_redirects() {
        let fixture = Fixture::new();

        let missing = fixture.handle(Request::post("/create").with_text("body", "text"));
        assert_eq!(missing.status, StatusCode::OK);
        assert!(body(&missing).contains(&crate::rest::escape("Please enter a page title before submitting.")));

        let created = fixture.handle(Request::post("/create").with_text("name", "Home").with_text("body", "# Welcome"));
        assert_eq!(created.status, StatusCode::FOUND);
        let page = &Page::all(fixture.store.as_ref()).unwrap()[0];
        assert_eq!(created.header(&header::LOCATION), Some(page.locate().as_str()));
    }

    #[test]
    fn view_renders_markdown_inside_the_layout() {
        let fixture = Fixture::new();
        let page = Page::create(fixture.store.as_ref(), "Notes", "Some *emphasis*").unwrap();

        let rendered = fixture.handle(Request::get(page.locate()));
        let html = body(&rendered);
        assert_eq!(rendered.status, StatusCode::OK);
        assert!(html.starts_with("<nav><h2>"));
        assert!(html.contains("<main><h1>Notes</h1><p>Some <em>emphasis</em></p>"));
    }

    #[test]
    fn unknown_pages_are_not_found() {
        let fixture = Fixture::new();
        assert_eq!(fixture.handle(Request::get("/pages/99")).status, StatusCode::NOT_FOUND);
        assert_eq!(fixture.handle(Request::get("/pages/abc")).status, StatusCode::NOT_FOUND);
        assert_eq!(fixture.handle(Request::get("/")).status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn home_prefers_a_page_named_home() {
        let fixture = Fixture::new();
        Page::create(fixture.store.as_ref(), "First", "one").unwrap();
        Page::create(fixture.store.as_ref(), "The Homestead", "home body").unwrap();
        Page::create(fixture.store.as_ref(), "Last", "last body").unwrap();

        let html = body(&fixture.handle(Request::get("/")));
        assert!(html.contains("home body"));
    }

    #[test]
    fn home_falls_back_to_the_last_page() {
        let fixture = Fixture::new();
        Page::create(fixture.store.as_ref(), "First", "one").unwrap();
        Page::create(fixture.store.as_ref(), "Second", "two").unwrap();

        let html = body(&fixture.handle(Request::get("/")));
        assert!(html.contains("<p>two</p>"));
    }

    #[test]
    fn menu_is_refreshed_after_edits() {
        let fixture = Fixture::new();
        let page = Page::create(fixture.store.as_ref(), "Before", "body").unwrap();

        assert!(body(&fixture.handle(Request::get(page.locate()))).contains(">Before</a>"));

        let edited = fixture.handle(
            Request::post(page.locate()).with_text("name", "After").with_text("body", "body"),
        );
        assert_eq!(edited.status, StatusCode::FOUND);
        let html = body(&fixture.handle(Request::get(page.locate())));
        assert!(html.contains(">After</a>"));
        assert!(!html.contains(">Before</a>"));
    }

    #[test]
    fn edit_requires_a_name() {
        let fixture = Fixture::new();
        let page = Page::create(fixture.store.as_ref(), "Keep", "body").unwrap();
        let rendered = fixture.handle(Request::post(page.locate()).with_text("name", "  "));
        assert_eq!(rendered.status, StatusCode::OK);
        assert!(body(&rendered).contains(&crate::rest::escape("Please enter a page name before submitting.")));
        assert_eq!(Page::all(fixture.store.as_ref()).unwrap()[0].name.as_deref(), Some("Keep"));
    }

    #[test]
    fn photo_upload_serve_and_cleanup() {
        let fixture = Fixture::new();
        let page = Page::create(fixture.store.as_ref(), "Gallery", "").unwrap();
        let upload_path = format!("{}/photos", page.locate());

        let uploaded = fixture.handle(
            Request::post(upload_path.clone()).with_file("upload", png(b"png-bytes")).with_text("type", "html"),
        );
        let reply: serde_json::Value = serde_json::from_slice(&uploaded.body).unwrap();
        assert_eq!(reply["message"], "Successfully attached image.");
        let photo = page.photos(fixture.store.as_ref()).unwrap().remove(0);
        assert_eq!(reply["markup"], format!("\n<img src=\"{}\"/>\n", photo.locate()));

        let served = fixture.handle(Request::get(photo.locate()));
        assert_eq!(served.body, b"png-bytes".to_vec());
        assert_eq!(served.header(&header::CONTENT_TYPE), Some("image/png"));

        let other = Page::create(fixture.store.as_ref(), "Other", "").unwrap();
        let elsewhere = format!("{}/photos/{}", other.locate(), photo.key().id());
        assert_eq!(fixture.handle(Request::get(elsewhere)).status, StatusCode::NOT_FOUND);

        fixture.handle(
            Request::post(page.locate())
                .with_text("name", "Gallery")
                .with_text("body", &format!("![x]({})", photo.locate())),
        );
        assert_eq!(page.photos(fixture.store.as_ref()).unwrap().len(), 1);

        fixture.handle(Request::post(page.locate()).with_text("name", "Gallery").with_text("body", "gone"));
        assert!(page.photos(fixture.store.as_ref()).unwrap().is_empty());
    }

    #[test]
    fn markdown_markup_is_the_default() {
        let fixture = Fixture::new();
        let page = Page::create(fixture.store.as_ref(), "Gallery", "").unwrap();
        let uploaded = fixture.handle(
            Request::post(format!("{}/photos", page.locate())).with_file("upload", png(b"x")),
        );
        let reply: serde_json::Value = serde_json::from_slice(&uploaded.body).unwrap();
        assert!(reply["markup"].as_str().unwrap().starts_with("\n![Description of Image](/pages/"));
    }

    #[test]
    fn non_images_are_rejected() {
        let fixture = Fixture::new();
        let page = Page::create(fixture.store.as_ref(), "Gallery", "").unwrap();
        let text = UploadedFile {
            filename: Some("notes.txt".into()),
            content_type: "text/plain".into(),
            data: b"hello".to_vec(),
        };
        let uploaded = fixture.handle(Request::post(format!("{}/photos", page.locate())).with_file("upload", text));
        let reply: serde_json::Value = serde_json::from_slice(&uploaded.body).unwrap();
        assert_eq!(reply["message"], "Please only attach images.");
        assert_eq!(reply["markup"], "");
        assert!(page.photos(fixture.store.as_ref()).unwrap().is_empty());
    }

    #[test]
    fn oversized_images_report_a_friendly_failure() {
        let fixture = Fixture::with_store(MemoryStore::with_max_entity_size(256));
        let page = Page::create(fixture.store.as_ref(), "Gallery", "").unwrap();
        let uploaded = fixture.handle(
            Request::post(format!("{}/photos", page.locate())).with_file("upload", png(&[0u8; 1024])),
        );
        let reply: serde_json::Value = serde_json::from_slice(&uploaded.body).unwrap();
        assert_eq!(reply["message"], "Unable to attach image; perhaps you should try a smaller one.");
    }
}
