use std::collections::BTreeMap;

use crate::rest::{Locatable, Markup, escape};

use super::models::Page;

/// Section for page names without a `section|title` prefix.
///
/// Historically this was `"Crown House "`, which lower-cased to a heading
/// with a trailing space. The trailing space is dropped here.
pub const DEFAULT_SECTION: &str = "crown house";

/// Build the sidebar menu: named pages grouped by lower-cased section, with
/// sections and titles in sorted order.
pub fn build_menu(pages: &[Page]) -> Markup {
    let mut sections: BTreeMap<String, Vec<(&str, &Page)>> = BTreeMap::new();

    for page in pages {
        let Some(name) = page.name.as_deref().filter(|name| !name.is_empty()) else {
            continue;
        };
        let (section, title) = name.split_once('|').unwrap_or((DEFAULT_SECTION, name));
        sections
            .entry(section.to_lowercase())
            .or_default()
            .push((title, page));
    }

    let mut html = String::new();
    for (section, mut entries) in sections {
        entries.sort_by(|(a_title, a), (b_title, b)| a_title.cmp(b_title).then(a.id().cmp(&b.id())));
        html.push_str(&format!("<h2>{}</h2><ul>", escape(&section)));
        for (title, page) in entries {
            html.push_str(&format!(
                "<li><a href=\"{}\">{}</a></li>",
                escape(&page.locate()),
                escape(title)
            ));
        }
        html.push_str("</ul>");
    }
    Markup::new(html)
}
