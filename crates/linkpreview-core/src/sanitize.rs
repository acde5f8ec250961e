use ammonia::Builder;
use std::collections::{HashMap, HashSet};

/// Sanitizes preview markup against the allow-list used for embedded previews.
///
/// Anchors keep ammonia's default `rel="noopener noreferrer"`, so a preview
/// can never open a `target="_blank"` window without `noopener`.
pub fn clean_html(raw_html: &str) -> String {
    let tags: HashSet<&'static str> = [
        "a",
        "abbr",
        "article",
        "aside",
        "b",
        "blockquote",
        "br",
        "cite",
        "code",
        "div",
        "em",
        "figcaption",
        "figure",
        "footer",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "header",
        "hr",
        "i",
        "img",
        "li",
        "ol",
        "p",
        "pre",
        "small",
        "span",
        "strong",
        "time",
        "ul",
    ]
    .iter()
    .copied()
    .collect();

    let mut generic_attributes: HashSet<&'static str> = HashSet::new();
    generic_attributes.insert("class");
    generic_attributes.insert("id");

    let mut tag_attributes = HashMap::new();
    tag_attributes.insert("a", ["href", "title"].iter().copied().collect());
    tag_attributes.insert("abbr", ["title"].iter().copied().collect());
    tag_attributes.insert(
        "img",
        ["alt", "src", "title", "width", "height"]
            .iter()
            .copied()
            .collect(),
    );
    tag_attributes.insert("ol", ["start"].iter().copied().collect());
    tag_attributes.insert("time", ["datetime"].iter().copied().collect());

    let mut generic_attribute_prefixes = HashSet::new();
    generic_attribute_prefixes.insert("data-");

    Builder::new()
        .tags(tags)
        .generic_attributes(generic_attributes)
        .tag_attributes(tag_attributes)
        .generic_attribute_prefixes(generic_attribute_prefixes)
        .clean(raw_html)
        .to_string()
}

/// Renders untrusted text so it can be embedded as element content.
///
/// Every tag is dropped (script and style bodies included) and the rest is
/// entity-escaped.
pub fn clean_text(raw: &str) -> String {
    let clean_content_tags: HashSet<&'static str> = ["script", "style"].iter().copied().collect();
    Builder::empty()
        .clean_content_tags(clean_content_tags)
        .clean(raw)
        .to_string()
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::new();
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

pub(crate) fn escape_attr(text: &str) -> String {
    let mut out = String::new();
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
