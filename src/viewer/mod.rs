//! Interaction layer between the session and whatever draws the page
//!
//! [`FormViewer`] keeps the render pipeline pointed at the session's current
//! page and zoom, holds the last raster that matched, and turns catalog
//! records into [`Overlay`]s that can be drawn and clicked.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};

use crate::geometry::{ScreenPoint, SurfaceOffset};
use crate::pdf::{DEFAULT_CACHE_SIZE, DEFAULT_WORKERS, RasterSurface, RenderEvent, RenderService};
use crate::session::DocumentSession;

mod editor;
mod overlay;
mod snapshot;

pub use editor::FieldEditor;
pub use overlay::{Overlay, compute_overlays, hit_test};
pub use snapshot::{SnapshotError, compose, snapshot_file_name, write_snapshot};

pub struct FormViewer {
    render: Option<RenderService>,
    /// Session epoch the render service was built for
    render_epoch: Option<u64>,
    surface: Option<Arc<RasterSurface>>,
    render_error: Option<String>,
    offset: SurfaceOffset,
    workers: usize,
    cache_size: usize,
    pub editor: FieldEditor,
}

impl Default for FormViewer {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS, DEFAULT_CACHE_SIZE)
    }
}

impl FormViewer {
    pub fn new(workers: usize, cache_size: usize) -> Self {
        Self {
            render: None,
            render_epoch: None,
            surface: None,
            render_error: None,
            offset: SurfaceOffset::default(),
            workers,
            cache_size,
            editor: FieldEditor::new(),
        }
    }

    /// Point the render pipeline at the session's current page and zoom.
    ///
    /// Rebuilds the pipeline when the session's document changed and issues
    /// a render request only when page or zoom moved.
    pub fn sync(&mut self, session: &DocumentSession) {
        if self.render_epoch != Some(session.epoch()) {
            self.render = None;
            self.surface = None;
            self.render_error = None;
            self.editor.cancel();
            self.render_epoch = Some(session.epoch());

            if session.is_ready() {
                if let Some(bytes) = session.bytes() {
                    debug!("Starting render service for epoch {}", session.epoch());
                    self.render = Some(RenderService::with_config(
                        session.engine(),
                        bytes,
                        self.workers,
                        self.cache_size,
                    ));
                }
            }
        }

        let Some(render) = &mut self.render else {
            return;
        };

        let page = session.current_page();
        let scale = session.scale();
        let up_to_date = render.latest().is_some_and(|latest| {
            latest.page == page
                && crate::pdf::scale_key(latest.scale) == crate::pdf::scale_key(scale)
        });
        if !up_to_date {
            self.render_error = None;
            render.request_current(page, scale);
        }
    }

    /// Apply finished renders. Returns true when something visible changed.
    pub fn poll(&mut self) -> bool {
        let Some(render) = &mut self.render else {
            return false;
        };
        let events = render.poll();
        let changed = !events.is_empty();
        for event in events {
            self.apply(event);
        }
        changed
    }

    /// Block until the current request resolves
    pub fn wait_for_render(&mut self) -> bool {
        let Some(render) = &mut self.render else {
            return false;
        };
        let event = render.wait_current();
        match event {
            Some(event) => {
                self.apply(event);
                true
            }
            None => false,
        }
    }

    fn apply(&mut self, event: RenderEvent) {
        match event {
            RenderEvent::Ready(surface) => {
                debug!(
                    "Showing page {} at {} ({}x{})",
                    surface.page, surface.scale, surface.width_px, surface.height_px
                );
                self.surface = Some(surface);
                self.render_error = None;
            }
            RenderEvent::Failed { target, error } => {
                warn!("Page {} could not be rendered: {error}", target.page);
                self.render_error = Some(error.to_string());
            }
        }
    }

    /// Raster on screen; it may lag behind the session's page or zoom
    pub fn surface(&self) -> Option<&RasterSurface> {
        self.surface.as_deref()
    }

    /// Raster that matches the session's current page and zoom
    pub fn current_surface(&self, session: &DocumentSession) -> Option<&RasterSurface> {
        self.surface()
            .filter(|surface| surface.matches(session.current_page(), session.scale()))
    }

    pub fn render_error(&self) -> Option<&str> {
        self.render_error.as_deref()
    }

    pub fn set_offset(&mut self, offset: SurfaceOffset) {
        self.offset = offset;
    }

    pub fn offset(&self) -> SurfaceOffset {
        self.offset
    }

    pub fn stale_dropped(&self) -> u64 {
        self.render.as_ref().map_or(0, RenderService::stale_dropped)
    }

    /// Overlays for the current page, empty until a matching raster is applied
    pub fn overlays(&self, session: &DocumentSession) -> Vec<Overlay> {
        self.overlays_at(session, self.offset)
    }

    /// Overlays for the current page placed with an explicit surface offset
    pub fn overlays_at(&self, session: &DocumentSession, offset: SurfaceOffset) -> Vec<Overlay> {
        if !session.show_overlay() {
            return vec![];
        }
        let Some(surface) = self.current_surface(session) else {
            return vec![];
        };
        compute_overlays(
            session.fields_on_current_page(),
            surface,
            offset,
            session.selected_field(),
        )
    }

    pub fn hit_test(&self, session: &DocumentSession, point: ScreenPoint) -> Option<usize> {
        hit_test(&self.overlays(session), point)
    }

    /// Select whatever is under the point; clicking empty space clears the
    /// selection. Any open edit for another field is dropped.
    pub fn click(&mut self, session: &mut DocumentSession, point: ScreenPoint) -> Option<usize> {
        let hit = self.hit_test(session, point);
        if self.editor.editing_field().is_some_and(|id| Some(id) != hit) {
            self.editor.cancel();
        }
        session.select_field(hit);
        hit
    }

    /// Start editing the selected field
    pub fn edit_selected(&mut self, session: &DocumentSession) -> bool {
        match session.selected_field() {
            Some(id) => self.editor.begin_edit(session, id),
            None => false,
        }
    }

    /// Write `page-<n>-overlay.png` for the current page
    pub fn snapshot(
        &self,
        session: &DocumentSession,
        dir: &Path,
    ) -> Option<Result<PathBuf, SnapshotError>> {
        let surface = self.current_surface(session)?;
        let overlays = self.overlays_at(session, SurfaceOffset::default());
        Some(write_snapshot(surface, &overlays, dir))
    }
}
