use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use linkpreview_core::{
    LinkPreviewMarkdown, MarkupDocument, PreviewConfig, SpawnedFetcher, StaticPreviews,
};

/// Render Markdown to HTML, turning links that stand alone on a line into
/// link previews.
#[derive(Debug, Parser)]
#[command(name = "linkpreview-cli", version)]
struct Args {
    /// TOML catalog of previews: a `[previews]` table mapping URL to HTML.
    #[arg(long, value_name = "FILE")]
    previews: Option<PathBuf>,

    /// Emit placeholders first and resolve them from a worker thread.
    #[arg(long)]
    deferred: bool,

    /// With --deferred, print the placeholders without resolving them.
    #[arg(long, requires = "deferred")]
    no_wait: bool,

    /// With --deferred, how long to wait for previews.
    #[arg(long, value_name = "N", default_value_t = 5000)]
    timeout_ms: u64,

    /// Keep inline links as anchors instead of the embed wrapper.
    #[arg(long)]
    no_embed: bool,

    /// Do not turn bare URLs inside paragraphs into links.
    #[arg(long)]
    no_linkify: bool,

    /// Markdown file to render; stdin when omitted.
    input: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let source = read_source(args.input.as_ref())?;
    let catalog = match &args.previews {
        Some(path) => StaticPreviews::load(path)
            .with_context(|| format!("failed to load previews from {}", path.display()))?,
        None => StaticPreviews::new(),
    };
    log::debug!("{} preview(s) in catalog", catalog.len());

    let mut config = if args.deferred {
        PreviewConfig::deferred(Arc::new(SpawnedFetcher::new(catalog)))
    } else {
        PreviewConfig::instant(Arc::new(catalog))
    };
    config.embed_links = !args.no_embed;
    config.linkify = !args.no_linkify;

    let mut md = LinkPreviewMarkdown::with_config(config);
    let html = md.render(&source);
    let Some(previews) = md.deferred_previews() else {
        print!("{}", html);
        return Ok(());
    };
    if args.no_wait {
        print!("{}", html);
        return Ok(());
    }

    let mut document = MarkupDocument::parse_with_prefix(&html, previews.placeholder_prefix());
    let waited = previews.wait(&mut document, Duration::from_millis(args.timeout_ms));
    // Partial output is still useful when some previews timed out.
    print!("{}", document.to_html());
    let applied = waited.context("link previews did not finish")?;
    log::debug!("applied {} deferred preview(s)", applied);
    Ok(())
}

fn read_source(input: Option<&PathBuf>) -> Result<String> {
    match input {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
        }
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            Ok(buffer)
        }
    }
}
