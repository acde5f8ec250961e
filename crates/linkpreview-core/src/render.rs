use std::sync::Arc;

use markdown_it::plugins::cmark::inline::autolink::Autolink;
use markdown_it::plugins::cmark::inline::link::Link;
use markdown_it::plugins::extra::linkify::Linkified;
use markdown_it::{Node, NodeValue, Renderer};

use crate::deferred::DeferredPreviews;
use crate::detector::LinkPreviewMarker;
use crate::dom::Fragment;
use crate::preview::{PreviewConfig, PreviewGenerator, PreviewResult, PreviewSource};

pub const EMBED_WRAPPER: &str = "<div class=\"embed-responsive embed-responsive-16by9\">\n  <b>Link Preview Block !!</b>\n</div>\n";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    Instant,
    Deferred,
}

/// Rendered preview (or placeholder) standing where a marker was.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviewMarkup {
    pub html: String,
}

impl NodeValue for PreviewMarkup {
    fn render(&self, _: &Node, fmt: &mut dyn Renderer) {
        fmt.text_raw(&self.html);
    }
}

/// Fixed responsive-embed wrapper rendered instead of an inline anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmbedBlock;

impl NodeValue for EmbedBlock {
    fn render(&self, _: &Node, fmt: &mut dyn Renderer) {
        fmt.text_raw(EMBED_WRAPPER);
    }
}

/// The `href` of an inline link node, if `node` is one.
pub fn link_href(node: &Node) -> Option<&str> {
    if let Some(link) = node.cast::<Link>() {
        return Some(link.url.as_str());
    }
    if let Some(link) = node.cast::<Autolink>() {
        return Some(link.url.as_str());
    }
    if let Some(link) = node.cast::<Linkified>() {
        return Some(link.url.as_str());
    }
    None
}

/// Renders an inline link with an `href` as [`EmbedBlock`]; other nodes are
/// left to their default rendering. Returns whether `node` was replaced.
///
/// The `href` is not matched against anything: every such link becomes the
/// wrapper. Hosts that only want lone-link previews turn
/// [`PreviewConfig::embed_links`] off.
pub fn intercept_link_open(node: &mut Node) -> bool {
    if link_href(node).is_none() {
        return false;
    }
    node.replace(EmbedBlock);
    true
}

/// Turns markers into markup, instantly or through placeholders.
pub enum PreviewRenderer {
    Instant(Arc<dyn PreviewGenerator>),
    Deferred(DeferredPreviews),
}

impl PreviewRenderer {
    pub fn new(config: &PreviewConfig) -> Self {
        match &config.source {
            PreviewSource::Instant(generator) => PreviewRenderer::Instant(Arc::clone(generator)),
            PreviewSource::Deferred(fetcher) => {
                let previews = DeferredPreviews::new(Arc::clone(fetcher), &config.placeholder_prefix);
                PreviewRenderer::Deferred(previews)
            }
        }
    }

    pub fn mode(&self) -> RenderMode {
        match self {
            PreviewRenderer::Instant(_) => RenderMode::Instant,
            PreviewRenderer::Deferred(_) => RenderMode::Deferred,
        }
    }

    pub fn render(&mut self, marker: &LinkPreviewMarker) -> String {
        match self {
            PreviewRenderer::Instant(generator) => render_instant(generator.as_ref(), &marker.link),
            PreviewRenderer::Deferred(previews) => previews.begin(&marker.link),
        }
    }

    pub fn deferred(&mut self) -> Option<&mut DeferredPreviews> {
        match self {
            PreviewRenderer::Instant(_) => None,
            PreviewRenderer::Deferred(previews) => Some(previews),
        }
    }
}

/// Asks `generator` for the preview and returns it verbatim; a link it cannot
/// preview renders as a plain nofollow anchor.
pub fn render_instant(generator: &dyn PreviewGenerator, link: &str) -> String {
    // The generator gets its own owned copy of the link.
    let url = link.to_string();
    match PreviewResult::from_html(generator.generate(&url)) {
        PreviewResult::Markup(html) => html,
        PreviewResult::NoContent => {
            log::debug!("no instant preview for {}", link);
            Fragment::nofollow_anchor(link).to_html()
        }
    }
}
