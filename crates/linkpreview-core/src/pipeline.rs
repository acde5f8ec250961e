use std::sync::Arc;

use markdown_it::{MarkdownIt, Node};

use crate::deferred::DeferredPreviews;
use crate::detector::{self, LinkPreviewMarker};
use crate::preview::{PreviewConfig, PreviewFetcher, PreviewGenerator};
use crate::render::{PreviewMarkup, PreviewRenderer, RenderMode, intercept_link_open};

/// CommonMark rendering with lone-link previews.
pub struct LinkPreviewMarkdown {
    md: MarkdownIt,
    previews: PreviewRenderer,
    embed_links: bool,
}

impl LinkPreviewMarkdown {
    pub fn with_config(config: PreviewConfig) -> Self {
        let mut md = MarkdownIt::new();
        markdown_it::plugins::cmark::add(&mut md);
        if config.linkify {
            markdown_it::plugins::extra::linkify::add(&mut md);
        }
        detector::add(&mut md);

        let previews = PreviewRenderer::new(&config);
        log::debug!("link previews render in {:?} mode", previews.mode());
        Self {
            md,
            previews,
            embed_links: config.embed_links,
        }
    }

    /// Synchronous previews from `generator`.
    pub fn instant(generator: Arc<dyn PreviewGenerator>) -> Self {
        Self::with_config(PreviewConfig::instant(generator))
    }

    /// Placeholders now, previews from `fetcher` later.
    pub fn deferred(fetcher: Arc<dyn PreviewFetcher>) -> Self {
        Self::with_config(PreviewConfig::deferred(fetcher))
    }

    pub fn mode(&self) -> RenderMode {
        self.previews.mode()
    }

    /// The pending previews, in deferred mode.
    pub fn deferred_previews(&mut self) -> Option<&mut DeferredPreviews> {
        self.previews.deferred()
    }

    pub fn parse(&self, source: &str) -> Node {
        self.md.parse(source)
    }

    pub fn render(&mut self, source: &str) -> String {
        let mut ast = self.parse(source);
        self.render_previews(&mut ast);
        ast.render()
    }

    /// Replaces every marker in `ast` with its rendered preview and, unless
    /// disabled, every inline link with the embed wrapper.
    pub fn render_previews(&mut self, ast: &mut Node) {
        let embed_links = self.embed_links;
        let previews = &mut self.previews;
        ast.walk_mut(|node, _| {
            let html = node
                .cast::<LinkPreviewMarker>()
                .map(|marker| previews.render(marker));
            if let Some(html) = html {
                node.replace(PreviewMarkup { html });
                return;
            }
            if embed_links {
                intercept_link_open(node);
            }
        });
    }
}
