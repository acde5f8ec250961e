mod browser;
mod session;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use js_sys::Function;
use linkpreview_core::{
    Fragment, LinkPreviewMarkdown, PreviewCallback, PreviewConfig, PreviewFetcher,
    PreviewGenerator, PreviewResult,
};
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::browser::BrowserDocument;
use crate::session::LiveRenderers;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = linkPreview, js_name = renderAndSanitizeOnebox)]
    fn render_and_sanitize_onebox(url: &str) -> Result<JsValue, JsValue>;
}

thread_local! {
    // Set only while a render is running.
    static PAGE_FETCH: RefCell<Option<Function>> = const { RefCell::new(None) };
    static LIVE: RefCell<LiveRenderers> = RefCell::new(LiveRenderers::default());
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderOptions {
    instant: Option<bool>,
    embed_links: Option<bool>,
    linkify: Option<bool>,
    /// `fetch(url, callback)`; `callback(safeHtml)` resolves the preview.
    #[serde(default = "undefined", with = "serde_wasm_bindgen::preserve")]
    fetch: JsValue,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            instant: None,
            embed_links: None,
            linkify: None,
            fetch: undefined(),
        }
    }
}

fn undefined() -> JsValue {
    JsValue::UNDEFINED
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderResult {
    html: String,
    pending: Vec<JsPendingPreview>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsPendingPreview {
    placeholder: String,
    link: String,
}

/// Previews from the page's `linkPreview.renderAndSanitizeOnebox`.
struct HostPreviews;

impl PreviewGenerator for HostPreviews {
    fn generate(&self, url: &str) -> String {
        match render_and_sanitize_onebox(url) {
            Ok(value) => value.as_string().unwrap_or_default(),
            Err(err) => {
                log::debug!("onebox renderer threw for {}: {:?}", url, err);
                String::new()
            }
        }
    }
}

/// Deferred previews through the `fetch` function passed to the render.
///
/// Each completion patches the page right away. Without a `fetch` function
/// the page resolves the `pending` placeholders itself.
struct PageFetch;

impl PreviewFetcher for PageFetch {
    fn fetch(&self, url: &str, done: PreviewCallback) {
        let Some(fetch) = PAGE_FETCH.with(|slot| slot.borrow().clone()) else {
            log::trace!("preview for {} left to the page", url);
            return;
        };

        let slot = Rc::new(RefCell::new(Some(done)));
        let callback_slot = Rc::clone(&slot);
        let callback = Closure::once(move |value: JsValue| {
            let done = callback_slot.borrow_mut().take();
            if let Some(done) = done {
                done(PreviewResult::from(value.as_string()));
            }
            apply_ready_previews();
        });

        let url_value = JsValue::from_str(url);
        if let Err(err) = fetch.call2(&JsValue::NULL, &url_value, &callback.into_js_value()) {
            log::debug!("preview fetch threw for {}: {:?}", url, err);
            let done = slot.borrow_mut().take();
            if let Some(done) = done {
                done(PreviewResult::NoContent);
            }
        }
    }
}

#[wasm_bindgen]
pub fn render_html(source: &str) -> Result<JsValue, JsValue> {
    render_html_with_options(source, JsValue::UNDEFINED)
}

/// Renders `source`. In deferred mode with a `fetch` option, previews replace
/// their placeholders on the page as they arrive; call
/// [`apply_ready_previews`] once the returned HTML is on the page to pick up
/// previews that were answered before it got there.
#[wasm_bindgen]
pub fn render_html_with_options(source: &str, options: JsValue) -> Result<JsValue, JsValue> {
    let options = options_from_js(options)?;
    let mut config = if options.instant.unwrap_or(false) {
        PreviewConfig::instant(Arc::new(HostPreviews))
    } else {
        PreviewConfig::deferred(Arc::new(PageFetch))
    };
    if let Some(embed_links) = options.embed_links {
        config.embed_links = embed_links;
    }
    if let Some(linkify) = options.linkify {
        config.linkify = linkify;
    }

    let fetch = options.fetch.dyn_into::<Function>().ok();
    let page_resolves = fetch.is_none();
    PAGE_FETCH.with(|slot| *slot.borrow_mut() = fetch);
    let mut md = LinkPreviewMarkdown::with_config(config);
    let html = md.render(source);
    PAGE_FETCH.with(|slot| *slot.borrow_mut() = None);

    let pending = md
        .deferred_previews()
        .map(|previews| {
            previews
                .pending_handles()
                .map(|(handle, link)| JsPendingPreview {
                    placeholder: handle.to_string(),
                    link: link.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();
    if !page_resolves {
        LIVE.with(|live| live.borrow_mut().track(md));
    }

    let result = RenderResult { html, pending };
    serde_wasm_bindgen::to_value(&result).map_err(|err| JsValue::from_str(&err.to_string()))
}

/// Patches every preview that has arrived into the page. Returns how many
/// were applied.
#[wasm_bindgen]
pub fn apply_ready_previews() -> usize {
    let Some(mut document) = BrowserDocument::current() else {
        return 0;
    };
    LIVE.with(|live| match live.try_borrow_mut() {
        Ok(mut live) => live.apply_ready(&mut document),
        Err(_) => 0,
    })
}

/// Markup that replaces every element carrying a pending placeholder class:
/// `safe_html` itself, or a nofollow link to `link` when it is blank.
#[wasm_bindgen]
pub fn replacement_html(link: &str, safe_html: &str) -> String {
    Fragment::replacement(link, &PreviewResult::from_html(safe_html)).to_html()
}

fn options_from_js(value: JsValue) -> Result<RenderOptions, JsValue> {
    if value.is_null() || value.is_undefined() {
        return Ok(RenderOptions::default());
    }
    serde_wasm_bindgen::from_value(value).map_err(|err| JsValue::from_str(&err.to_string()))
}
