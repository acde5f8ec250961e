use std::io;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::preview::{PreviewCallback, PreviewFetcher, PreviewGenerator, PreviewResult};

type Job = Box<dyn FnOnce() + Send>;

/// Runs a [`PreviewGenerator`] off the rendering thread, one worker thread per
/// request, and reports back through the fetch callback.
pub struct SpawnedFetcher<G> {
    generator: Arc<G>,
    delay: Option<Duration>,
}

impl<G: PreviewGenerator + 'static> SpawnedFetcher<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator: Arc::new(generator),
            delay: None,
        }
    }

    /// Holds every response back by `delay`, like a slow network would.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl<G: PreviewGenerator + 'static> PreviewFetcher for SpawnedFetcher<G> {
    fn fetch(&self, url: &str, done: PreviewCallback) {
        let generator = Arc::clone(&self.generator);
        let owned_url = url.to_string();
        let delay = self.delay;
        let work = move || {
            if let Some(delay) = delay {
                thread::sleep(delay);
            }
            PreviewResult::from_html(generator.generate(&owned_url))
        };
        dispatch(spawn_worker, url, work, done);
    }
}

fn spawn_worker(job: Job) -> io::Result<()> {
    thread::Builder::new()
        .name("link-preview".to_string())
        .spawn(job)
        .map(|_| ())
}

/// Hands `work` to `spawn`. `done` is called exactly once: with the work's
/// result, or with [`PreviewResult::NoContent`] when the job never starts.
fn dispatch<S, W>(spawn: S, url: &str, work: W, done: PreviewCallback)
where
    S: FnOnce(Job) -> io::Result<()>,
    W: FnOnce() -> PreviewResult + Send + 'static,
{
    let slot = Arc::new(Mutex::new(Some(done)));
    let worker_slot = Arc::clone(&slot);
    let job: Job = Box::new(move || {
        let result = work();
        if let Some(done) = take_callback(&worker_slot) {
            done(result);
        }
    });

    if let Err(err) = spawn(job) {
        log::warn!("could not start link preview worker for {}: {}", url, err);
        if let Some(done) = take_callback(&slot) {
            done(PreviewResult::NoContent);
        }
    }
}

fn take_callback(slot: &Mutex<Option<PreviewCallback>>) -> Option<PreviewCallback> {
    match slot.lock() {
        Ok(mut callback) => callback.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    }
}
