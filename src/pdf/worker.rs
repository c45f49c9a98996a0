//! Page render worker - runs in separate thread(s)

use std::sync::{Arc, Mutex};

use flume::{Receiver, Sender};
use log::{debug, error};

use super::cache::{CacheKey, PageCache};
use super::engine::{RenderEngine, RenderedDocument};
use super::request::{RenderRequest, RenderResponse, RenderTarget, RequestId};

/// Main worker function - runs in a dedicated thread
#[expect(
    clippy::needless_pass_by_value,
    reason = "Values moved into thread, need ownership"
)]
pub fn render_worker(
    engine: Arc<dyn RenderEngine>,
    bytes: Arc<[u8]>,
    requests: Receiver<RenderRequest>,
    responses: Sender<RenderResponse>,
    cache: Arc<Mutex<PageCache>>,
) {
    let doc = match engine.open(&bytes) {
        Ok(d) => d,
        Err(e) => {
            error!("Render worker could not open document: {e}");
            // Drain requests so callers see failures instead of silence.
            for request in requests {
                match request {
                    RenderRequest::Page { id, target } => {
                        let _ = responses.send(RenderResponse::Error {
                            id,
                            target,
                            error: super::engine::EngineFault::generic(e.to_string()),
                        });
                    }
                    RenderRequest::Shutdown => break,
                }
            }
            return;
        }
    };

    for request in requests {
        match request {
            RenderRequest::Page { id, target } => {
                handle_page_request(doc.as_ref(), id, target, &cache, &responses);
            }

            RenderRequest::Shutdown => break,
        }
    }
    debug!("Render worker exiting");
}

fn handle_page_request(
    doc: &dyn RenderedDocument,
    id: RequestId,
    target: RenderTarget,
    cache: &Arc<Mutex<PageCache>>,
    responses: &Sender<RenderResponse>,
) {
    let key = CacheKey::new(target.page, target.scale);

    let cached = cache
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .get(&key);
    if let Some(cached) = cached {
        let _ = responses.send(RenderResponse::Page {
            id,
            target,
            surface: cached,
        });
        return;
    }

    match doc.render(target.page, target.scale) {
        Ok(surface) => {
            let cached = cache
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .insert(key, surface);
            let _ = responses.send(RenderResponse::Page {
                id,
                target,
                surface: cached,
            });
        }
        Err(error) => {
            let _ = responses.send(RenderResponse::Error { id, target, error });
        }
    }
}
