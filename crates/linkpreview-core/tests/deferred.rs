use std::sync::{Arc, Mutex};
use std::time::Duration;

use linkpreview_core::{
    LinkPreviewMarkdown, LiveDocument, MarkupDocument, PreviewCallback, PreviewConfig,
    PreviewError, PreviewFetcher, PreviewResult, RenderMode, SpawnedFetcher, StaticPreviews,
};

/// Holds every fetch until the test resolves it.
#[derive(Default)]
struct ManualFetcher {
    calls: Mutex<Vec<(String, PreviewCallback)>>,
}

impl ManualFetcher {
    fn take(&self, url: &str) -> PreviewCallback {
        let mut calls = self.calls.lock().expect("lock");
        let idx = calls
            .iter()
            .position(|(candidate, _)| candidate == url)
            .expect("fetch was started");
        calls.remove(idx).1
    }
}

impl PreviewFetcher for ManualFetcher {
    fn fetch(&self, url: &str, done: PreviewCallback) {
        self.calls
            .lock()
            .expect("lock")
            .push((url.to_string(), done));
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn failed_preview_ends_as_nofollow_link() {
    init_logging();
    let mut md = LinkPreviewMarkdown::deferred(Arc::new(StaticPreviews::new()));
    assert_eq!(md.mode(), RenderMode::Deferred);

    let html = md.render("https://example.com/article\n");
    assert!(html.starts_with("<div class=\"onebox-"));
    assert!(html.contains("icon-loading"));
    assert!(html.contains("<a>https://example.com/article</a>"));

    let mut document = MarkupDocument::parse(&html);
    let previews = md.deferred_previews().expect("deferred mode");
    assert_eq!(previews.pending(), 1);
    assert_eq!(previews.poll(&mut document), 1);
    assert_eq!(previews.pending(), 0);

    assert_eq!(
        document.to_html().trim_end(),
        "<a href=\"https://example.com/article\" rel=\"nofollow\">https://example.com/article</a>"
    );
    assert_eq!(document.placeholder_count(), 0);
}

#[test]
fn render_returns_before_the_fetch_resolves() {
    let fetcher = Arc::new(ManualFetcher::default());
    let mut md = LinkPreviewMarkdown::deferred(fetcher.clone());
    let html = md.render("Intro.\n\nhttps://a.com\n");
    assert!(html.contains("<p>Intro.</p>"));
    assert!(html.contains("icon-loading"));

    let mut document = MarkupDocument::parse(&html);
    let previews = md.deferred_previews().expect("deferred mode");
    assert_eq!(previews.poll(&mut document), 0);
    assert_eq!(previews.pending(), 1);

    fetcher.take("https://a.com")(PreviewResult::from_html("<div>A</div>"));
    assert_eq!(previews.poll(&mut document), 1);
    assert_eq!(document.to_html(), "<p>Intro.</p>\n<div>A</div>");
}

#[test]
fn concurrent_previews_only_touch_their_own_placeholder() {
    for b_first in [true, false] {
        let fetcher = Arc::new(ManualFetcher::default());
        let mut md = LinkPreviewMarkdown::deferred(fetcher.clone());
        let html = md.render("https://a.com\n\nhttps://b.com\n");
        let mut document = MarkupDocument::parse(&html);
        let previews = md.deferred_previews().expect("deferred mode");

        let handles: Vec<(String, String)> = previews
            .pending_handles()
            .map(|(handle, link)| (handle.to_string(), link.to_string()))
            .collect();
        assert_eq!(handles.len(), 2);
        assert_ne!(handles[0].0, handles[1].0);

        let (first, second) = if b_first {
            ("https://b.com", "https://a.com")
        } else {
            ("https://a.com", "https://b.com")
        };
        fetcher.take(first)(PreviewResult::from_html(format!("<div>{}</div>", first)));
        previews.poll(&mut document);

        // The other placeholder is still loading.
        assert_eq!(document.placeholder_count(), 1);
        assert!(document.to_html().contains(&format!("<div>{}</div>", first)));
        assert!(document.to_html().contains(&format!("<a>{}</a>", second)));

        fetcher.take(second)(PreviewResult::NoContent);
        previews.poll(&mut document);
        let preview = format!("<div>{}</div>", first);
        let anchor = format!("<a href=\"{0}\" rel=\"nofollow\">{0}</a>", second);
        let expected = if b_first {
            format!("{}{}", anchor, preview)
        } else {
            format!("{}{}", preview, anchor)
        };
        assert_eq!(document.to_html(), expected);
    }
}

#[test]
fn resolution_after_the_text_changed_is_a_no_op() {
    let fetcher = Arc::new(ManualFetcher::default());
    let mut md = LinkPreviewMarkdown::deferred(fetcher.clone());
    let html = md.render("https://a.com\n");
    let mut document = MarkupDocument::parse(&html);
    document.replace_markup("<p>edited</p>");

    fetcher.take("https://a.com")(PreviewResult::from_html("<div>A</div>"));
    let previews = md.deferred_previews().expect("deferred mode");
    assert_eq!(previews.poll(&mut document), 1);
    assert_eq!(previews.pending(), 0);
    assert_eq!(document.to_html(), "<p>edited</p>");
}

#[test]
fn resolution_after_the_editor_closed_is_a_no_op() {
    let fetcher = Arc::new(ManualFetcher::default());
    let mut md = LinkPreviewMarkdown::deferred(fetcher.clone());
    let html = md.render("https://a.com\n");
    let mut document = MarkupDocument::parse(&html);
    document.clear();

    fetcher.take("https://a.com")(PreviewResult::NoContent);
    let previews = md.deferred_previews().expect("deferred mode");
    assert_eq!(previews.poll(&mut document), 1);
    assert!(document.is_empty());
}

#[test]
fn every_copy_of_a_placeholder_is_replaced() {
    let fetcher = Arc::new(ManualFetcher::default());
    let mut md = LinkPreviewMarkdown::deferred(fetcher.clone());
    let html = md.render("https://a.com\n");
    let mut document = MarkupDocument::parse(&format!("{}<hr />{}", html, html));
    assert_eq!(document.placeholder_count(), 2);

    fetcher.take("https://a.com")(PreviewResult::from_html("<div>A</div>"));
    let previews = md.deferred_previews().expect("deferred mode");
    previews.poll(&mut document);
    assert_eq!(document.to_html(), "<div>A</div><hr /><div>A</div>");
}

#[test]
fn untrusted_link_text_is_sanitized() {
    let mut md = LinkPreviewMarkdown::deferred(Arc::new(StaticPreviews::new()));
    let html = md.render("https://a.com/<script>alert(1)</script>\n");
    assert!(html.contains("icon-loading"));
    assert!(!html.contains("<script"));

    let mut document = MarkupDocument::parse(&html);
    let previews = md.deferred_previews().expect("deferred mode");
    previews.poll(&mut document);
    let resolved = document.to_html();
    assert!(!resolved.contains("<script"));
    assert!(resolved.contains("rel=\"nofollow\""));
}

#[test]
fn wait_times_out_on_unanswered_fetches() {
    let fetcher = Arc::new(ManualFetcher::default());
    let mut md = LinkPreviewMarkdown::deferred(fetcher.clone());
    let html = md.render("https://a.com\n");
    let mut document = MarkupDocument::parse(&html);

    let previews = md.deferred_previews().expect("deferred mode");
    let err = previews
        .wait(&mut document, Duration::from_millis(20))
        .expect_err("nothing answers");
    assert!(matches!(err, PreviewError::Timeout { pending: 1, .. }));
    assert_eq!(document.placeholder_count(), 1);
}

#[test]
fn worker_thread_previews_are_applied_by_wait() {
    init_logging();
    let catalog = StaticPreviews::new().with_preview("https://a.com", "<div class=\"onebox\">A</div>");
    let fetcher = SpawnedFetcher::new(catalog).with_delay(Duration::from_millis(5));
    let mut md = LinkPreviewMarkdown::deferred(Arc::new(fetcher));
    let html = md.render("https://a.com\n\nhttps://b.com\n");
    let mut document = MarkupDocument::parse(&html);

    let previews = md.deferred_previews().expect("deferred mode");
    let applied = previews
        .wait(&mut document, Duration::from_secs(5))
        .expect("previews arrive");
    assert_eq!(applied, 2);
    assert_eq!(
        document.to_html(),
        "<div class=\"onebox\">A</div><a href=\"https://b.com\" rel=\"nofollow\">https://b.com</a>"
    );
}

#[test]
fn placeholders_are_found_by_their_handle() {
    let fetcher = Arc::new(ManualFetcher::default());
    let mut md = LinkPreviewMarkdown::deferred(fetcher);
    let html = md.render("https://a.com\n");
    let document = MarkupDocument::parse(&html);
    let previews = md.deferred_previews().expect("deferred mode");
    let (handle, link) = previews.pending_handles().next().expect("pending");
    assert_eq!(link, "https://a.com");
    assert_eq!(document.find_by_class(handle.as_str()).len(), 1);
}

#[test]
fn pending_handles_follow_document_order() {
    let fetcher = Arc::new(ManualFetcher::default());
    let mut md = LinkPreviewMarkdown::deferred(fetcher);
    let html = md.render("https://c.com\n\nhttps://a.com\n\ntext\n\nhttps://b.com\n");
    let previews = md.deferred_previews().expect("deferred mode");

    let pending: Vec<(String, String)> = previews
        .pending_handles()
        .map(|(handle, link)| (handle.to_string(), link.to_string()))
        .collect();
    let links: Vec<&str> = pending.iter().map(|(_, link)| link.as_str()).collect();
    assert_eq!(links, ["https://c.com", "https://a.com", "https://b.com"]);

    let offsets: Vec<usize> = pending
        .iter()
        .map(|(handle, _)| html.find(handle.as_str()).expect("placeholder in output"))
        .collect();
    assert!(offsets.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn custom_placeholder_prefix_resolves() {
    let config = PreviewConfig {
        placeholder_prefix: "lp-".to_string(),
        ..PreviewConfig::deferred(Arc::new(StaticPreviews::new()))
    };
    let mut md = LinkPreviewMarkdown::with_config(config);
    let html = md.render("https://a.com\n");
    assert!(html.starts_with("<div class=\"lp-"));

    let previews = md.deferred_previews().expect("deferred mode");
    assert_eq!(previews.placeholder_prefix(), "lp-");
    let mut document = MarkupDocument::parse_with_prefix(&html, previews.placeholder_prefix());
    assert_eq!(previews.poll(&mut document), 1);
    assert_eq!(
        document.to_html(),
        "<a href=\"https://a.com\" rel=\"nofollow\">https://a.com</a>"
    );
}
