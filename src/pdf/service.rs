//! Render service - manages worker pool, cache and stale-result filtering

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use flume::{Receiver, Sender};
use log::{debug, warn};

use super::cache::{CacheKey, PageCache};
use super::engine::{EngineFault, RenderEngine};
use super::request::{RenderRequest, RenderResponse, RenderTarget, RequestId};
use super::types::RasterSurface;
use super::worker::render_worker;
use super::{DEFAULT_CACHE_SIZE, DEFAULT_WORKERS};

/// Result of a render that is still current
#[derive(Debug)]
pub enum RenderEvent {
    Ready(Arc<RasterSurface>),
    Failed { target: RenderTarget, error: EngineFault },
}

/// Renders pages on worker threads for one loaded document.
///
/// Only the result of the latest [`request_current`](Self::request_current) is ever handed
/// back from [`poll`](Self::poll); older results are dropped on arrival.
pub struct RenderService {
    request_tx: Sender<RenderRequest>,
    response_rx: Receiver<RenderResponse>,
    next_request_id: u64,
    generation: u64,
    latest: Option<RenderTarget>,
    pending_requests: HashMap<RequestId, RenderTarget>,
    cache: Arc<Mutex<PageCache>>,
    num_workers: usize,
    stale_dropped: u64,
}

impl RenderService {
    /// Create a new render service with default configuration
    #[must_use]
    pub fn new(engine: Arc<dyn RenderEngine>, bytes: Arc<[u8]>) -> Self {
        Self::with_config(engine, bytes, DEFAULT_WORKERS, DEFAULT_CACHE_SIZE)
    }

    /// Create a new render service with custom configuration
    #[must_use]
    pub fn with_config(
        engine: Arc<dyn RenderEngine>,
        bytes: Arc<[u8]>,
        num_workers: usize,
        cache_size: usize,
    ) -> Self {
        let cache = Arc::new(Mutex::new(PageCache::new(cache_size)));

        // flume gives MPMC channels: every worker pulls from one shared queue.
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        for _ in 0..num_workers.max(1) {
            let engine = Arc::clone(&engine);
            let bytes = Arc::clone(&bytes);
            let rx = request_rx.clone();
            let tx = response_tx.clone();
            let cache_clone = cache.clone();

            std::thread::spawn(move || {
                render_worker(engine, bytes, rx, tx, cache_clone);
            });
        }

        Self {
            request_tx,
            response_rx,
            next_request_id: 1,
            generation: 0,
            latest: None,
            pending_requests: HashMap::new(),
            cache,
            num_workers: num_workers.max(1),
            stale_dropped: 0,
        }
    }

    /// Request the page that should be on screen now.
    ///
    /// Supersedes every earlier request.
    pub fn request_current(&mut self, page: usize, scale: f32) -> RenderTarget {
        self.generation += 1;
        let target = RenderTarget {
            page,
            scale,
            generation: self.generation,
        };
        self.latest = Some(target);

        let id = self.next_id();
        let _ = self.request_tx.send(RenderRequest::Page { id, target });
        self.pending_requests.insert(id, target);
        debug!("Requested page {page} at {scale} (generation {})", target.generation);

        target
    }

    /// Latest requested target, if any
    #[must_use]
    pub fn latest(&self) -> Option<RenderTarget> {
        self.latest
    }

    fn is_current(&self, target: &RenderTarget) -> bool {
        self.latest.is_some_and(|latest| {
            latest.generation == target.generation
                && latest.page == target.page
                && CacheKey::new(latest.page, latest.scale)
                    == CacheKey::new(target.page, target.scale)
        })
    }

    /// Drain completed renders, keeping only those for the latest request
    pub fn poll(&mut self) -> Vec<RenderEvent> {
        let mut events = vec![];

        while let Ok(response) = self.response_rx.try_recv() {
            let target = response.target();
            match &response {
                RenderResponse::Page { id, .. } | RenderResponse::Error { id, .. } => {
                    self.pending_requests.remove(id);
                }
            }

            if !self.is_current(&target) {
                self.stale_dropped += 1;
                debug!(
                    "Dropping stale render of page {} (generation {})",
                    target.page, target.generation
                );
                continue;
            }

            match response {
                RenderResponse::Page { surface, .. } => events.push(RenderEvent::Ready(surface)),
                RenderResponse::Error { target, error, .. } => {
                    warn!("Render of page {} failed: {error}", target.page);
                    events.push(RenderEvent::Failed { target, error });
                }
            }
        }

        events
    }

    /// Block until the latest request resolves; used by tests and snapshots
    pub fn wait_current(&mut self) -> Option<RenderEvent> {
        loop {
            if self.pending_requests.is_empty() {
                return None;
            }
            let response = self.response_rx.recv().ok()?;
            let target = response.target();
            match &response {
                RenderResponse::Page { id, .. } | RenderResponse::Error { id, .. } => {
                    self.pending_requests.remove(id);
                }
            }
            if !self.is_current(&target) {
                self.stale_dropped += 1;
                continue;
            }
            return Some(match response {
                RenderResponse::Page { surface, .. } => RenderEvent::Ready(surface),
                RenderResponse::Error { target, error, .. } => {
                    RenderEvent::Failed { target, error }
                }
            });
        }
    }

    /// Number of renders discarded because a newer request superseded them
    #[must_use]
    pub fn stale_dropped(&self) -> u64 {
        self.stale_dropped
    }

    /// Requests sent but not yet answered
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.pending_requests.len()
    }

    /// Check if a page is cached
    #[must_use]
    pub fn is_page_cached(&self, page: usize, scale: f32) -> bool {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(&CacheKey::new(page, scale))
    }

    /// Shutdown all workers
    pub fn shutdown(&self) {
        for _ in 0..self.num_workers {
            let _ = self.request_tx.send(RenderRequest::Shutdown);
        }
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl Drop for RenderService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
