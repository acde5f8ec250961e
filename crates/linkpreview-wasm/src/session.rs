use linkpreview_core::{LinkPreviewMarkdown, LiveDocument};

/// Deferred renderers whose placeholders may still be on the page.
///
/// A render's previews arrive after `render_html` has returned, so its
/// renderer is parked here until every preview it started has been applied.
#[derive(Default)]
pub(crate) struct LiveRenderers {
    renderers: Vec<LinkPreviewMarkdown>,
}

impl LiveRenderers {
    /// Keeps `md` around if it still has previews in flight.
    pub(crate) fn track(&mut self, mut md: LinkPreviewMarkdown) {
        let pending = md.deferred_previews().map_or(0, |previews| previews.pending());
        if pending > 0 {
            self.renderers.push(md);
        }
    }

    /// Applies every preview that has arrived, then drops finished renderers.
    pub(crate) fn apply_ready<D: LiveDocument + ?Sized>(&mut self, document: &mut D) -> usize {
        let mut applied = 0;
        self.renderers.retain_mut(|md| match md.deferred_previews() {
            Some(previews) => {
                applied += previews.poll(document);
                previews.pending() > 0
            }
            None => false,
        });
        applied
    }

    pub(crate) fn len(&self) -> usize {
        self.renderers.len()
    }
}
