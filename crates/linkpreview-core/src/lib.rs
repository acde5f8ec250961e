mod catalog;
mod deferred;
mod detector;
mod dom;
mod error;
mod fetch;
mod handle;
mod pipeline;
mod preview;
mod render;
pub mod sanitize;

pub use catalog::StaticPreviews;
pub use deferred::{DeferredPreviews, placeholder_html, replace_placeholders};
pub use detector::{LinkPreviewMarker, LinkPreviewScanner, add, match_lone_link};
pub use dom::{Fragment, LiveDocument, MarkupDocument, NodeKey};
pub use error::PreviewError;
pub use fetch::SpawnedFetcher;
pub use handle::{DEFAULT_PLACEHOLDER_PREFIX, HandleRegistry, PlaceholderHandle};
pub use pipeline::LinkPreviewMarkdown;
pub use preview::{
    PreviewCallback, PreviewConfig, PreviewFetcher, PreviewGenerator, PreviewResult, PreviewSource,
};
pub use render::{
    EMBED_WRAPPER, EmbedBlock, PreviewMarkup, PreviewRenderer, RenderMode, intercept_link_open,
    link_href, render_instant,
};
