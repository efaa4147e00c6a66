use axum::http::Method;

/// A file submitted through a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// One submitted parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Text(String),
    File(UploadedFile),
}

/// Session attached to the request by the hosting layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    id: Option<String>,
}

impl Session {
    pub fn new(id: Option<String>) -> Self {
        Self { id }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// Read-only view of an incoming request.
///
/// `params` holds query-string and form-body values in arrival order; lookups
/// return the first value for a name. `query` keeps the query string alone.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    params: Vec<(String, Param)>,
    session: Session,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            params: Vec::new(),
            session: Session::default(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Add a query-string pair; it is also visible as a parameter.
    pub fn with_query(mut self, name: &str, value: &str) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self.params.push((name.to_string(), Param::Text(value.to_string())));
        self
    }

    /// Add a form-body text field.
    pub fn with_text(mut self, name: &str, value: &str) -> Self {
        self.params.push((name.to_string(), Param::Text(value.to_string())));
        self
    }

    /// Add a form-body file field.
    pub fn with_file(mut self, name: &str, file: UploadedFile) -> Self {
        self.params.push((name.to_string(), Param::File(file)));
        self
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// First value for `name` if it was submitted as text.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.param(name) {
            Some(Param::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// First value for `name` if it was submitted as a file.
    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        match self.param(name) {
            Some(Param::File(file)) => Some(file),
            _ => None,
        }
    }

    /// Every query-string value for `name`.
    pub fn query_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.query
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_returns_first_value_or_none() {
        let request = Request::post("/create")
            .with_text("name", "first")
            .with_text("name", "second");
        assert_eq!(request.text("name"), Some("first"));
        assert_eq!(request.param("missing"), None);
    }

    #[test]
    fn files_and_text_are_distinguished() {
        let upload = UploadedFile {
            filename: Some("cat.png".into()),
            content_type: "image/png".into(),
            data: vec![1, 2, 3],
        };
        let request = Request::post("/pages/1/photos")
            .with_file("upload", upload.clone())
            .with_text("type", "html");
        assert_eq!(request.file("upload"), Some(&upload));
        assert_eq!(request.text("upload"), None);
        assert_eq!(request.file("type"), None);
    }

    #[test]
    fn query_values_are_also_params() {
        let request = Request::get("/")
            .with_query("callback", "f")
            .with_query("callback", "g");
        assert_eq!(request.query_values("callback").collect::<Vec<_>>(), vec!["f", "g"]);
        assert_eq!(request.text("callback"), Some("f"));
        assert_eq!(request.session().id(), None);
    }
}
