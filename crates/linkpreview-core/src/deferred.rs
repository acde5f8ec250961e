use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use crate::dom::{Fragment, LiveDocument};
use crate::error::PreviewError;
use crate::handle::{HandleRegistry, PlaceholderHandle};
use crate::preview::{PreviewFetcher, PreviewResult};
use crate::sanitize::clean_text;

// A finished fetch, waiting to be applied to the live document.
#[derive(Clone, Debug, PartialEq, Eq)]
struct PreviewEvent {
    handle: PlaceholderHandle,
    result: PreviewResult,
}

/// Deferred preview rendering.
///
/// [`begin`](Self::begin) hands out placeholder markup right away and starts
/// the fetch. Fetch callbacks may run on any thread but only queue their
/// result; the document is patched solely by whoever calls
/// [`poll`](Self::poll) or [`wait`](Self::wait).
pub struct DeferredPreviews {
    fetcher: Arc<dyn PreviewFetcher>,
    registry: HandleRegistry,
    events_tx: Sender<PreviewEvent>,
    events_rx: Receiver<PreviewEvent>,
}

impl DeferredPreviews {
    pub fn new(fetcher: Arc<dyn PreviewFetcher>, placeholder_prefix: &str) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            fetcher,
            registry: HandleRegistry::new(placeholder_prefix),
            events_tx,
            events_rx,
        }
    }

    /// Starts loading a preview for `link` and returns its placeholder markup.
    pub fn begin(&mut self, link: &str) -> String {
        let handle = self.registry.mint(link);
        log::debug!("link preview {} pending for {}", handle, link);

        let events = self.events_tx.clone();
        let pending = handle.clone();
        self.fetcher.fetch(
            link,
            Box::new(move |result| {
                // Fails only once the renderer is gone, and with it the document.
                let _ = events.send(PreviewEvent {
                    handle: pending,
                    result,
                });
            }),
        );

        placeholder_html(&handle, link)
    }

    /// Class prefix shared by every placeholder this renderer emits.
    pub fn placeholder_prefix(&self) -> &str {
        self.registry.prefix()
    }

    pub fn pending(&self) -> usize {
        self.registry.len()
    }

    pub fn pending_handles(&self) -> impl Iterator<Item = (&PlaceholderHandle, &str)> {
        self.registry.iter()
    }

    /// Applies every preview that has already arrived. Never blocks.
    pub fn poll<D: LiveDocument + ?Sized>(&mut self, document: &mut D) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(document, event);
            applied += 1;
        }
        applied
    }

    /// Applies previews as they arrive until none is pending.
    pub fn wait<D: LiveDocument + ?Sized>(
        &mut self,
        document: &mut D,
        timeout: Duration,
    ) -> Result<usize, PreviewError> {
        let deadline = Instant::now() + timeout;
        let mut applied = self.poll(document);
        while !self.registry.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.events_rx.recv_timeout(remaining) {
                Ok(event) => {
                    self.apply(document, event);
                    applied += 1;
                }
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!(
                        "{} link preview(s) unresolved after {:?}",
                        self.registry.len(),
                        timeout
                    );
                    return Err(PreviewError::Timeout {
                        pending: self.registry.len(),
                        waited: timeout,
                    });
                }
                // We hold a sender ourselves.
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        Ok(applied)
    }

    fn apply<D: LiveDocument + ?Sized>(&mut self, document: &mut D, event: PreviewEvent) {
        let Some(link) = self.registry.release(&event.handle) else {
            log::debug!("preview {} resolved twice, ignoring", event.handle);
            return;
        };
        let replaced = replace_placeholders(document, &event.handle, &link, &event.result);
        if replaced == 0 {
            log::debug!("placeholder {} is gone, dropping its preview", event.handle);
        }
    }
}

/// Replaces every element tagged with `handle` by the preview for `link`, or
/// by a plain nofollow link when there is no preview. Returns how many
/// placeholders were replaced; zero when the region no longer exists.
pub fn replace_placeholders<D: LiveDocument + ?Sized>(
    document: &mut D,
    handle: &PlaceholderHandle,
    link: &str,
    result: &PreviewResult,
) -> usize {
    let placeholders = document.find_by_class(handle.as_str());
    for placeholder in &placeholders {
        document.insert_after(*placeholder, Fragment::replacement(link, result));
        document.remove(*placeholder);
    }
    placeholders.len()
}

pub fn placeholder_html(handle: &PlaceholderHandle, link: &str) -> String {
    format!(
        "<div class=\"{} icon icon-loading\"><a>{}</a></div>",
        handle,
        clean_text(link)
    )
}
