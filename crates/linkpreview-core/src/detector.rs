use markdown_it::parser::block::{BlockRule, BlockState};
use markdown_it::parser::core::Root;
use markdown_it::plugins::cmark::block::paragraph::{Paragraph, ParagraphScanner};
use markdown_it::{MarkdownIt, Node, NodeValue, Renderer};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::dom::Fragment;

static LONE_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://\S+\s*$").expect("Failed to compile LONE_LINK_RE regex."));

/// A paragraph that consists of nothing but one link.
///
/// Emitted by [`LinkPreviewScanner`] and consumed once by the preview render
/// pass, which swaps it for the rendered preview markup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkPreviewMarker {
    /// The link exactly as written, minus trailing whitespace.
    pub link: String,
    /// 0 at the document root, 1 inside a paragraph context.
    pub level: u32,
}

impl NodeValue for LinkPreviewMarker {
    // Reached only when a host renders the tree without running the preview
    // pass; a plain link is still better than nothing.
    fn render(&self, _: &Node, fmt: &mut dyn Renderer) {
        fmt.text_raw(&Fragment::nofollow_anchor(&self.link).to_html());
    }
}

pub struct LinkPreviewScanner;

impl BlockRule for LinkPreviewScanner {
    // A link on the last line of prose belongs to that paragraph.
    fn check(_: &mut BlockState) -> Option<()> {
        None
    }

    fn run(state: &mut BlockState) -> Option<(Node, usize)> {
        // Indentation beyond the block's own makes the line start with a space.
        if state.line_indent(state.line) != 0 {
            return None;
        }

        let next_line = state.line + 1;
        if next_line < state.line_max && !state.is_empty(next_line) {
            return None;
        }

        let level = context_level(&state.node)?;
        let link = match_lone_link(state.get_line(state.line))?;

        log::trace!("lone link at line {}: {}", state.line + 1, link);
        let marker = LinkPreviewMarker {
            link: link.to_string(),
            level,
        };
        Some((Node::new(marker), 1))
    }
}

/// Registers the lone-link rule in front of the paragraph rule.
pub fn add(md: &mut MarkdownIt) {
    md.block
        .add_rule::<LinkPreviewScanner>()
        .before::<ParagraphScanner>();
}

/// Returns the link when `line` holds a single `http(s)://` link and nothing
/// else but trailing whitespace.
pub fn match_lone_link(line: &str) -> Option<&str> {
    if !line.starts_with("http") {
        return None;
    }
    if LONE_LINK_RE.is_match(line) {
        Some(line.trim_end())
    } else {
        None
    }
}

fn context_level(parent: &Node) -> Option<u32> {
    if parent.is::<Root>() {
        Some(0)
    } else if parent.is::<Paragraph>() {
        Some(1)
    } else {
        None
    }
}
