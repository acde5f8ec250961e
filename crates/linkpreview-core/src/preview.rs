use std::fmt;
use std::sync::Arc;

use crate::handle::DEFAULT_PLACEHOLDER_PREFIX;

/// Outcome of turning a link into preview markup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreviewResult {
    /// Sanitized markup, safe to embed as is.
    Markup(String),
    NoContent,
}

impl PreviewResult {
    /// Blank markup means the link could not be previewed.
    pub fn from_html(html: impl Into<String>) -> Self {
        let html = html.into();
        if html.trim().is_empty() {
            PreviewResult::NoContent
        } else {
            PreviewResult::Markup(html)
        }
    }

    pub fn markup(&self) -> Option<&str> {
        match self {
            PreviewResult::Markup(html) => Some(html),
            PreviewResult::NoContent => None,
        }
    }
}

impl From<Option<String>> for PreviewResult {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(html) => PreviewResult::from_html(html),
            None => PreviewResult::NoContent,
        }
    }
}

/// In-process preview generation, used for instant rendering.
///
/// Implementations return sanitized markup and swallow their own failures:
/// an empty string means "no preview".
pub trait PreviewGenerator: Send + Sync {
    fn generate(&self, url: &str) -> String;
}

impl<F> PreviewGenerator for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn generate(&self, url: &str) -> String {
        self(url)
    }
}

pub type PreviewCallback = Box<dyn FnOnce(PreviewResult) + Send>;

/// Out-of-band preview loading, used for deferred rendering.
///
/// `fetch` must return without waiting for the result and call `done` at most
/// once, from any thread.
pub trait PreviewFetcher: Send + Sync {
    fn fetch(&self, url: &str, done: PreviewCallback);
}

impl<F> PreviewFetcher for F
where
    F: Fn(&str, PreviewCallback) + Send + Sync,
{
    fn fetch(&self, url: &str, done: PreviewCallback) {
        self(url, done)
    }
}

/// Where preview markup comes from. Also decides the rendering mode.
#[derive(Clone)]
pub enum PreviewSource {
    /// Rendered synchronously while the Markdown is rendered.
    Instant(Arc<dyn PreviewGenerator>),
    /// Placeholders first, previews patched in when the fetch completes.
    Deferred(Arc<dyn PreviewFetcher>),
}

impl fmt::Debug for PreviewSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviewSource::Instant(_) => f.write_str("Instant"),
            PreviewSource::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

/// Rendering configuration, fixed when the renderer is built.
#[derive(Clone, Debug)]
pub struct PreviewConfig {
    pub source: PreviewSource,
    pub placeholder_prefix: String,
    /// Render every `href`-bearing inline link as the embed wrapper.
    pub embed_links: bool,
    /// Turn bare URLs inside prose into links.
    pub linkify: bool,
}

impl PreviewConfig {
    pub fn instant(generator: Arc<dyn PreviewGenerator>) -> Self {
        Self::with_source(PreviewSource::Instant(generator))
    }

    pub fn deferred(fetcher: Arc<dyn PreviewFetcher>) -> Self {
        Self::with_source(PreviewSource::Deferred(fetcher))
    }

    fn with_source(source: PreviewSource) -> Self {
        Self {
            source,
            placeholder_prefix: DEFAULT_PLACEHOLDER_PREFIX.to_string(),
            embed_links: true,
            linkify: true,
        }
    }
}
