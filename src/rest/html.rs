use std::fmt::Write;

use pulldown_cmark::{Options, Parser, html};
use serde::{Deserialize, Serialize};

/// Markup that is already safe to embed and is inserted without escaping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markup(String);

impl Markup {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Convert Markdown source to HTML.
    pub fn markdown(source: &str) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);

        let mut out = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut out, Parser::new_ext(source, options));
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Escape text for HTML: every character other than an ASCII letter or digit
/// becomes a hexadecimal character reference.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else {
            let _ = write!(out, "&#x{:02x};", ch as u32);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_leaves_no_markup_characters() {
        let escaped = escape("<script>alert('x')</script>");
        assert!(!escaped.contains('<'));
        assert!(!escaped.contains('>'));
        assert!(escaped.starts_with("&#x3c;script&#x3e;"));
    }

    #[test]
    fn escape_keeps_alphanumerics_and_encodes_the_rest() {
        assert_eq!(escape("Page 7"), "Page&#x20;7");
        assert_eq!(escape("/pages/3"), "&#x2f;pages&#x2f;3");
        assert_eq!(escape("é"), "&#xe9;");
        assert_eq!(escape("中"), "&#x4e2d;");
        assert_eq!(escape(""), "");
    }

    #[test]
    fn markdown_produces_html() {
        let markup = Markup::markdown("# Title\n\nSome *text*.");
        assert!(markup.as_str().contains("<h1>Title</h1>"));
        assert!(markup.as_str().contains("<em>text</em>"));
    }
}
