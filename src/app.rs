//! Terminal front end: event routing and the main loop

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEventKind};
use log::{debug, info, warn};
use ratatui::{Frame, Terminal, layout::Rect};

use crate::event_source::EventSource;
use crate::session::{DocumentSession, SessionConfig, Upload};
use crate::settings;
use crate::ui::{self, PageFit};
use crate::viewer::FormViewer;

const MAX_PAGE_DIGITS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Quit,
}

pub struct App {
    pub session: DocumentSession,
    pub viewer: FormViewer,
    pub output_dir: PathBuf,
    /// Layout of the page panel from the last draw
    page_fit: Option<PageFit>,
    /// Paths written by the last save
    pub last_written: Vec<PathBuf>,
    /// Digits typed ahead of `g`
    page_input: String,
}

impl App {
    pub fn new(session: DocumentSession, viewer: FormViewer, output_dir: PathBuf) -> Self {
        Self {
            session,
            viewer,
            output_dir,
            page_fit: None,
            last_written: Vec::new(),
            page_input: String::new(),
        }
    }

    /// App wired from the global settings
    pub fn from_settings() -> Self {
        let current = settings::current();
        Self::new(
            DocumentSession::with_defaults(SessionConfig::from(&current)),
            FormViewer::new(current.render_workers, current.page_cache_size),
            settings::get_output_dir(),
        )
    }

    /// Begin loading a file; errors surface through the session state
    pub fn open_path(&mut self, path: &std::path::Path) -> Result<()> {
        let upload = Upload::from_path(path)?;
        if let Err(e) = self.session.start_load(upload) {
            warn!("Rejected {path:?}: {e}");
        }
        Ok(())
    }

    /// Commit finished loads, keep renders pointed at the current page and
    /// apply finished ones. Returns true when a redraw is needed.
    pub fn tick(&mut self) -> bool {
        let loaded = self.session.poll();
        self.viewer.sync(&self.session);
        let rendered = self.viewer.poll();
        let expired = self.session.notifications.update();
        loaded || rendered || expired
    }

    /// Block until any pending load and the current page render are done
    pub fn settle(&mut self) {
        if let Err(e) = self.session.wait_for_load() {
            debug!("Load settled with error: {e}");
        }
        self.viewer.sync(&self.session);
        self.viewer.wait_for_render();
    }

    pub fn draw(&mut self, f: &mut Frame) {
        let (page_area, fields_area, status_area) = ui::layout(f.area());
        self.page_fit = ui::draw_page(f, page_area, &self.session, &self.viewer);
        if let Some(fit) = &self.page_fit {
            self.viewer.set_offset(fit.surface_offset());
        }
        ui::draw_fields(f, fields_area, &self.session, &self.viewer);
        ui::draw_status(f, status_area, &self.session, &self.page_input);
    }

    /// Cells occupied by each overlay in the last drawn layout
    pub fn overlay_cells(&self) -> Vec<(usize, Rect)> {
        let Some(fit) = &self.page_fit else {
            return vec![];
        };
        ui::overlay_cells(&self.session, &self.viewer, fit)
            .into_iter()
            .map(|(overlay, cells)| (overlay.field_id, cells))
            .collect()
    }

    pub fn handle_event(&mut self, event: &Event) -> Option<AppAction> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(*key),
            Event::Mouse(mouse) => {
                if mouse.kind == MouseEventKind::Down(MouseButton::Left) {
                    self.handle_click(mouse.column, mouse.row);
                }
                None
            }
            _ => None,
        }
    }

    fn handle_click(&mut self, column: u16, row: u16) {
        let Some(point) = self.page_fit.and_then(|fit| fit.cell_to_point(column, row)) else {
            return;
        };
        if let Some(id) = self.viewer.click(&mut self.session, point) {
            debug!("Clicked field #{id}");
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<AppAction> {
        if self.viewer.editor.is_editing() {
            self.handle_edit_key(key);
            return None;
        }

        if let KeyCode::Char(c @ '0'..='9') = key.code {
            if self.page_input.len() < MAX_PAGE_DIGITS {
                self.page_input.push(c);
            }
            return None;
        }
        let page_input = std::mem::take(&mut self.page_input);
        if key.code == KeyCode::Esc && !page_input.is_empty() {
            return None;
        }

        match key.code {
            KeyCode::Char('q') => return Some(AppAction::Quit),
            KeyCode::Char('g') => self.jump_to_page(&page_input),
            KeyCode::Char('n') | KeyCode::Right | KeyCode::PageDown => self.session.next_page(),
            KeyCode::Char('p') | KeyCode::Left | KeyCode::PageUp => self.session.prev_page(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.session.zoom_in(),
            KeyCode::Char('-') => self.session.zoom_out(),
            KeyCode::Char('o') => self.session.toggle_overlay(),
            KeyCode::Char('j') | KeyCode::Down => self.session.cycle_selection(true),
            KeyCode::Char('k') | KeyCode::Up => self.session.cycle_selection(false),
            KeyCode::Char('e') | KeyCode::Enter => self.begin_edit(),
            KeyCode::Esc => self.session.select_field(None),
            KeyCode::Char('s') => self.save(),
            KeyCode::Char('x') => self.snapshot(),
            KeyCode::Char('r') => {
                self.viewer.editor.cancel();
                self.session.reset();
                self.last_written.clear();
            }
            _ => {}
        }
        None
    }

    fn handle_edit_key(&mut self, key: KeyEvent) {
        let editor = &mut self.viewer.editor;
        match key.code {
            KeyCode::Enter => {
                if let Err(e) = editor.commit(&mut self.session) {
                    self.session.notifications.warn(e.to_string());
                }
            }
            KeyCode::Esc => editor.cancel(),
            KeyCode::Backspace => editor.backspace(),
            KeyCode::Left => editor.move_left(),
            KeyCode::Right => editor.move_right(),
            KeyCode::Char(c) => editor.insert_char(c),
            _ => {}
        }
    }

    /// `g` alone goes to the first page, `<n>g` to page n
    fn jump_to_page(&mut self, digits: &str) {
        let page = if digits.is_empty() {
            1
        } else {
            match digits.parse::<usize>() {
                Ok(page) => page,
                Err(e) => {
                    debug!("Ignoring page number {digits:?}: {e}");
                    return;
                }
            }
        };
        self.session.set_page(page);
    }

    fn begin_edit(&mut self) {
        if self.session.selected_field().is_none() {
            self.session.cycle_selection(true);
        }
        if !self.viewer.edit_selected(&self.session) && self.session.selected_field().is_some() {
            self.session
                .notifications
                .warn("This field has no form entry and cannot be renamed");
        }
    }

    /// Save and write the resulting artifacts to the output directory
    pub fn save(&mut self) {
        let Some(outcome) = self.session.save() else {
            return;
        };
        match outcome.write_to(&self.output_dir) {
            Ok(paths) => {
                info!("Saved {} artifact(s) to {:?}", paths.len(), self.output_dir);
                self.last_written = paths;
            }
            Err(e) => self
                .session
                .notifications
                .error(format!("Could not write to {:?}: {e}", self.output_dir)),
        }
    }

    /// Write a PNG of the current page with its overlays
    pub fn snapshot(&mut self) {
        match self.viewer.snapshot(&self.session, &self.output_dir) {
            Some(Ok(path)) => {
                self.session
                    .notifications
                    .info(format!("Snapshot written to {}", path.display()));
                self.last_written = vec![path];
            }
            Some(Err(e)) => self.session.notifications.error(e.to_string()),
            None => self
                .session
                .notifications
                .warn("Nothing rendered yet to snapshot"),
        }
    }
}

pub fn run_app_with_event_source<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    event_source: &mut dyn EventSource,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    let tick_rate = Duration::from_millis(50);
    let mut first_render = true;

    loop {
        let mut needs_redraw = app.tick();
        if first_render {
            needs_redraw = true;
            first_render = false;
        }
        if needs_redraw {
            terminal.draw(|f| app.draw(f))?;
        }

        let mut events_processed = 0;
        while event_source.poll(if events_processed == 0 {
            tick_rate
        } else {
            Duration::ZERO
        })? && events_processed < 50
        {
            let event = event_source.read()?;
            events_processed += 1;
            if app.handle_event(&event) == Some(AppAction::Quit) {
                terminal.draw(|f| app.draw(f))?;
                return Ok(());
            }
            app.tick();
            terminal.draw(|f| app.draw(f))?;
        }
    }
}
