//! Live document surface patched by deferred previews.
//!
//! Deferred rendering only needs three primitives from whatever displays the
//! rendered markup: find the elements carrying a class, insert a fragment right
//! after an element, and remove an element. [`LiveDocument`] names them;
//! [`MarkupDocument`] implements them over rendered HTML held in memory.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::handle::DEFAULT_PLACEHOLDER_PREFIX;
use crate::preview::PreviewResult;
use crate::sanitize::{escape_attr, escape_html};

static DIV_OPEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<div class="([^"]*)"[^>]*>"#).expect("Failed to compile DIV_OPEN_RE regex.")
});

const DIV_CLOSE: &str = "</div>";

/// Stable identity of a node for as long as it stays in its document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub u32);

/// Content swapped in for a resolved placeholder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fragment {
    /// Already sanitized preview markup.
    Markup(String),
    Anchor {
        href: String,
        rel: &'static str,
        text: String,
    },
}

impl Fragment {
    /// Plain link shown when a URL could not be turned into a preview.
    ///
    /// Deliberately without `target="_blank"`: opening a new window would
    /// also need `noopener`.
    pub fn nofollow_anchor(link: &str) -> Self {
        Fragment::Anchor {
            href: link.to_string(),
            rel: "nofollow",
            text: link.to_string(),
        }
    }

    pub fn replacement(link: &str, result: &PreviewResult) -> Self {
        match result {
            PreviewResult::Markup(html) => Fragment::Markup(html.clone()),
            PreviewResult::NoContent => Fragment::nofollow_anchor(link),
        }
    }

    pub fn to_html(&self) -> String {
        match self {
            Fragment::Markup(html) => html.clone(),
            Fragment::Anchor { href, rel, text } => format!(
                "<a href=\"{}\" rel=\"{}\">{}</a>",
                escape_attr(href),
                rel,
                escape_html(text)
            ),
        }
    }
}

pub trait LiveDocument {
    /// Every element currently carrying `class`, in document order.
    fn find_by_class(&self, class: &str) -> Vec<NodeKey>;

    /// Inserts `fragment` as the next sibling of `anchor`. Unknown keys are ignored.
    fn insert_after(&mut self, anchor: NodeKey, fragment: Fragment);

    /// Removes `node`. Unknown keys are ignored.
    fn remove(&mut self, node: NodeKey);
}

/// Rendered HTML split into opaque markup runs and placeholder elements.
///
/// Only `<div class="...">` elements with a class starting with the
/// placeholder prefix are addressable; everything else is kept verbatim.
/// Placeholders never nest a `<div>`, so an element ends at the first
/// `</div>` after its opening tag.
#[derive(Clone, Debug)]
pub struct MarkupDocument {
    prefix: String,
    nodes: Vec<DocNode>,
    next_key: u32,
}

#[derive(Clone, Debug)]
struct DocNode {
    key: NodeKey,
    kind: DocNodeKind,
}

#[derive(Clone, Debug)]
enum DocNodeKind {
    Markup(String),
    Element { classes: Vec<String>, html: String },
    Fragment(Fragment),
}

impl MarkupDocument {
    pub fn parse(html: &str) -> Self {
        Self::parse_with_prefix(html, DEFAULT_PLACEHOLDER_PREFIX)
    }

    pub fn parse_with_prefix(html: &str, prefix: &str) -> Self {
        let mut document = Self {
            prefix: prefix.to_string(),
            nodes: Vec::new(),
            next_key: 1,
        };
        document.load(html);
        document
    }

    /// Swaps the whole content, as when the user edits the text behind it.
    /// Keys handed out before are invalidated.
    pub fn replace_markup(&mut self, html: &str) {
        self.nodes.clear();
        self.load(html);
    }

    /// Drops everything, as when the editor is closed.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn placeholder_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node.kind, DocNodeKind::Element { .. }))
            .count()
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match &node.kind {
                DocNodeKind::Markup(html) => out.push_str(html),
                DocNodeKind::Element { html, .. } => out.push_str(html),
                DocNodeKind::Fragment(fragment) => out.push_str(&fragment.to_html()),
            }
        }
        out
    }

    fn load(&mut self, html: &str) {
        let mut cursor = 0;
        let mut run_start = 0;
        while let Some(caps) = DIV_OPEN_RE.captures(&html[cursor..]) {
            let (Some(open), Some(class_attr)) = (caps.get(0), caps.get(1)) else {
                break;
            };
            let start = cursor + open.start();
            let after_open = cursor + open.end();
            let classes: Vec<String> = class_attr
                .as_str()
                .split_whitespace()
                .map(str::to_string)
                .collect();
            if !classes.iter().any(|class| class.starts_with(&self.prefix)) {
                cursor = after_open;
                continue;
            }
            let Some(close) = html[after_open..].find(DIV_CLOSE) else {
                break;
            };
            let end = after_open + close + DIV_CLOSE.len();

            self.push_markup(&html[run_start..start]);
            self.push(DocNodeKind::Element {
                classes,
                html: html[start..end].to_string(),
            });
            cursor = end;
            run_start = end;
        }
        self.push_markup(&html[run_start..]);
    }

    fn push_markup(&mut self, html: &str) {
        if !html.is_empty() {
            self.push(DocNodeKind::Markup(html.to_string()));
        }
    }

    fn push(&mut self, kind: DocNodeKind) {
        let key = self.mint_key();
        self.nodes.push(DocNode { key, kind });
    }

    fn mint_key(&mut self) -> NodeKey {
        let key = NodeKey(self.next_key);
        self.next_key += 1;
        key
    }

    fn position(&self, key: NodeKey) -> Option<usize> {
        self.nodes.iter().position(|node| node.key == key)
    }
}

impl LiveDocument for MarkupDocument {
    fn find_by_class(&self, class: &str) -> Vec<NodeKey> {
        self.nodes
            .iter()
            .filter(|node| match &node.kind {
                DocNodeKind::Element { classes, .. } => classes.iter().any(|c| c == class),
                _ => false,
            })
            .map(|node| node.key)
            .collect()
    }

    fn insert_after(&mut self, anchor: NodeKey, fragment: Fragment) {
        let Some(idx) = self.position(anchor) else {
            return;
        };
        let key = self.mint_key();
        self.nodes.insert(
            idx + 1,
            DocNode {
                key,
                kind: DocNodeKind::Fragment(fragment),
            },
        );
    }

    fn remove(&mut self, node: NodeKey) {
        self.nodes.retain(|candidate| candidate.key != node);
    }
}
