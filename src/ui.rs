//! Terminal drawing: the page raster, overlay boxes, field list and status line

use ratatui::{
    Frame,
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Widget, Wrap},
};

use crate::catalog::Placement;
use crate::geometry::{ScreenPoint, ScreenRect, SurfaceOffset};
use crate::notification::NotificationLevel;
use crate::pdf::RasterSurface;
use crate::session::{DocumentSession, SessionState};
use crate::viewer::{FormViewer, Overlay};

const SELECTED: Color = Color::Rgb(0x1e, 0x66, 0xf5);
const EDITABLE: Color = Color::Rgb(0xd2, 0x0f, 0x39);
const AMBIGUOUS: Color = Color::Rgb(0xfe, 0x64, 0x0b);
const READ_ONLY: Color = Color::Rgb(0x7c, 0x7f, 0x93);

/// How a raster is laid onto the page panel.
///
/// Each cell shows two vertically stacked samples (upper half block), so one
/// sample covers `px_per_sample` raster pixels horizontally and vertically.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageFit {
    /// Panel interior in terminal cells
    pub area: Rect,
    /// Raster pixels per sample
    pub px_per_sample: f32,
    /// Columns left blank to center the page
    pub margin_cols: u16,
}

impl PageFit {
    pub fn new(area: Rect, surface_width: u32, surface_height: u32) -> Self {
        let cols = f32::from(area.width.max(1));
        let samples_tall = f32::from(area.height.max(1)) * 2.0;
        let px_per_sample = (surface_width as f32 / cols)
            .max(surface_height as f32 / samples_tall)
            .max(f32::EPSILON);
        let used_cols = (surface_width as f32 / px_per_sample).ceil() as u16;
        Self {
            area,
            px_per_sample,
            margin_cols: area.width.saturating_sub(used_cols) / 2,
        }
    }

    /// Offset of the raster inside the panel, in raster pixels
    pub fn surface_offset(&self) -> SurfaceOffset {
        SurfaceOffset::new(f32::from(self.margin_cols) * self.px_per_sample, 0.0)
    }

    /// Centre of a cell in panel pixel space, or `None` outside the panel
    pub fn cell_to_point(&self, column: u16, row: u16) -> Option<ScreenPoint> {
        let inside = column >= self.area.x
            && column < self.area.right()
            && row >= self.area.y
            && row < self.area.bottom();
        inside.then(|| {
            ScreenPoint::new(
                (f32::from(column - self.area.x) + 0.5) * self.px_per_sample,
                (f32::from(row - self.area.y) + 0.5) * self.px_per_sample * 2.0,
            )
        })
    }

    /// Cells covered by a panel-space rectangle, clipped to the panel
    pub fn rect_to_cells(&self, rect: &ScreenRect) -> Option<Rect> {
        let px = self.px_per_sample;
        let x0 = (rect.x / px).floor().max(0.0);
        let y0 = (rect.y / (px * 2.0)).floor().max(0.0);
        let x1 = (rect.right() / px).ceil().min(f32::from(self.area.width));
        let y1 = (rect.bottom() / (px * 2.0)).ceil().min(f32::from(self.area.height));
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect::new(
            self.area.x + x0 as u16,
            self.area.y + y0 as u16,
            (x1 - x0).max(1.0) as u16,
            (y1 - y0).max(1.0) as u16,
        ))
    }
}

/// Half-block rendition of the raster
struct PageRaster<'a> {
    surface: &'a RasterSurface,
    fit: PageFit,
}

impl PageRaster<'_> {
    fn sample(&self, x: f32, y: f32) -> Option<Color> {
        let surface = self.surface;
        let (px, py) = (x.floor() as i64, y.floor() as i64);
        if px < 0 || py < 0 || px >= i64::from(surface.width_px) || py >= i64::from(surface.height_px)
        {
            return None;
        }
        let index = (py as usize * surface.width_px as usize + px as usize) * 3;
        let rgb = surface.pixels.get(index..index + 3)?;
        Some(Color::Rgb(rgb[0], rgb[1], rgb[2]))
    }
}

impl Widget for PageRaster<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let px = self.fit.px_per_sample;
        for row in 0..area.height {
            for col in self.fit.margin_cols..area.width {
                let x = (f32::from(col - self.fit.margin_cols) + 0.5) * px;
                let top = self.sample(x, (f32::from(row) * 2.0 + 0.5) * px);
                let bottom = self.sample(x, (f32::from(row) * 2.0 + 1.5) * px);
                let (Some(top), bottom) = (top, bottom) else {
                    continue;
                };
                let cell = &mut buf[(area.x + col, area.y + row)];
                cell.set_char('▀');
                cell.set_fg(top);
                cell.set_bg(bottom.unwrap_or(Color::Reset));
            }
        }
    }
}

fn overlay_color(overlay: &Overlay) -> Color {
    if overlay.selected {
        SELECTED
    } else if !overlay.editable {
        READ_ONLY
    } else if overlay.placement == Placement::Ambiguous {
        AMBIGUOUS
    } else {
        EDITABLE
    }
}

fn draw_overlay(buf: &mut Buffer, cells: Rect, overlay: &Overlay) {
    let color = overlay_color(overlay);
    let style = Style::default().fg(color).add_modifier(if overlay.selected {
        Modifier::BOLD
    } else {
        Modifier::empty()
    });

    if cells.width >= 2 && cells.height >= 2 {
        Block::default()
            .borders(Borders::ALL)
            .border_style(style)
            .render(cells, buf);
    } else {
        for y in cells.top()..cells.bottom() {
            for x in cells.left()..cells.right() {
                buf[(x, y)].set_char(overlay.field_type.marker()).set_style(style);
            }
        }
        return;
    }

    let room = cells.width.saturating_sub(2) as usize;
    if room > 0 {
        let label: String = format!("{} {}", overlay.field_type.marker(), overlay.label)
            .chars()
            .take(room)
            .collect();
        buf.set_string(cells.x + 1, cells.y, label, style);
    }
}

/// Overlays with the cells they occupy, in draw order
pub fn overlay_cells(
    session: &DocumentSession,
    viewer: &FormViewer,
    fit: &PageFit,
) -> Vec<(Overlay, Rect)> {
    viewer
        .overlays_at(session, fit.surface_offset())
        .into_iter()
        .filter_map(|overlay| fit.rect_to_cells(&overlay.rect).map(|cells| (overlay, cells)))
        .collect()
}

fn centered_message(f: &mut Frame, area: Rect, lines: Vec<Line<'_>>) {
    let height = lines.len() as u16;
    let top = area.y + area.height.saturating_sub(height) / 2;
    let target = Rect::new(area.x, top, area.width, height.min(area.height));
    f.render_widget(
        Paragraph::new(lines)
            .alignment(ratatui::layout::Alignment::Center)
            .wrap(Wrap { trim: true }),
        target,
    );
}

/// Draw the page panel; returns the fit used so clicks can be mapped back
pub fn draw_page(
    f: &mut Frame,
    area: Rect,
    session: &DocumentSession,
    viewer: &FormViewer,
) -> Option<PageFit> {
    let title = match session.state() {
        SessionState::Ready => format!(
            " Page {}/{} - {:.0}% ",
            session.current_page(),
            session.total_pages(),
            session.scale() * 100.0
        ),
        _ => " formrenamer ".to_string(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    match session.state() {
        SessionState::Empty => {
            centered_message(
                f,
                inner,
                vec![
                    Line::from("No document loaded"),
                    Line::from(Span::styled(
                        "run: formrenamer <form.pdf>",
                        Style::default().fg(Color::DarkGray),
                    )),
                ],
            );
            None
        }
        SessionState::Loading => {
            centered_message(f, inner, vec![Line::from("Loading document...")]);
            None
        }
        SessionState::Error(message) => {
            centered_message(
                f,
                inner,
                vec![
                    Line::from(Span::styled(
                        "Could not load document",
                        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                    )),
                    Line::from(message.as_str()),
                ],
            );
            None
        }
        SessionState::Ready => {
            let Some(surface) = viewer.surface() else {
                let text = viewer.render_error().map_or_else(
                    || "Rendering...".to_string(),
                    |e| format!("Render failed: {e}"),
                );
                centered_message(f, inner, vec![Line::from(text)]);
                return None;
            };

            let fit = PageFit::new(inner, surface.width_px, surface.height_px);
            f.render_widget(PageRaster { surface, fit }, inner);

            let buf = f.buffer_mut();
            for (overlay, cells) in overlay_cells(session, viewer, &fit) {
                draw_overlay(buf, cells, &overlay);
            }
            Some(fit)
        }
    }
}

/// Field list with the inline editor at the bottom
pub fn draw_fields(f: &mut Frame, area: Rect, session: &DocumentSession, viewer: &FormViewer) {
    let changed = session.changed_fields().len();
    let title = format!(" Fields ({}, {changed} renamed) ", session.fields().len());
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let editing = viewer.editor.is_editing();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(if editing {
            vec![Constraint::Min(1), Constraint::Length(2)]
        } else {
            vec![Constraint::Min(1)]
        })
        .split(inner);

    let items: Vec<ListItem> = session
        .fields()
        .iter()
        .map(|field| {
            let mut style = Style::default();
            if field.page != session.current_page() {
                style = style.fg(Color::DarkGray);
            }
            let mut spans = vec![
                Span::styled(format!("{} ", field.field_type.marker()), style),
                Span::styled(field.name.clone(), style),
            ];
            if field.is_renamed() {
                spans.push(Span::styled(
                    format!(" (was {})", field.original_name),
                    Style::default().fg(Color::Yellow),
                ));
            }
            if !field.is_editable() {
                spans.push(Span::styled(" [ro]", Style::default().fg(READ_ONLY)));
            }
            if field.placement == Placement::Ambiguous {
                spans.push(Span::styled(" [?]", Style::default().fg(AMBIGUOUS)));
            }
            spans.push(Span::styled(
                format!("  p{}", field.page),
                Style::default().fg(Color::DarkGray),
            ));
            ListItem::new(Line::from(spans))
        })
        .collect();

    let mut state = ListState::default();
    state.select(session.selected_field());
    let list = List::new(items).highlight_style(
        Style::default()
            .bg(SELECTED)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );
    f.render_stateful_widget(list, chunks[0], &mut state);

    if editing {
        let buffer = viewer.editor.buffer().unwrap_or_default();
        let cursor = viewer.editor.cursor().unwrap_or_default();
        let (before, after): (String, String) = {
            let split = buffer
                .char_indices()
                .nth(cursor)
                .map_or(buffer.len(), |(i, _)| i);
            (buffer[..split].to_string(), buffer[split..].to_string())
        };
        let edit = Paragraph::new(vec![
            Line::from(Span::styled(
                "Rename (Enter saves, Esc cancels):",
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(vec![
                Span::raw(before),
                Span::styled("|", Style::default().fg(SELECTED)),
                Span::raw(after),
            ]),
        ]);
        f.render_widget(edit, chunks[1]);
    }
}

pub fn draw_status(f: &mut Frame, area: Rect, session: &DocumentSession, page_input: &str) {
    let line = match session.notifications.current() {
        _ if !page_input.is_empty() => Line::from(Span::styled(
            format!("Go to page {page_input} (g to jump, Esc to cancel)"),
            Style::default().fg(Color::Cyan),
        )),
        Some(notice) => {
            let color = match notice.level {
                NotificationLevel::Info => Color::Green,
                NotificationLevel::Warning => Color::Yellow,
                NotificationLevel::Error => Color::Red,
            };
            Line::from(Span::styled(notice.message.clone(), Style::default().fg(color)))
        }
        None => Line::from(Span::styled(
            format!(
                "n/p page  <n>g go to  +/- zoom  o overlay {}  j/k select  e edit  s save  x snapshot  r reset  q quit",
                if session.show_overlay() { "on" } else { "off" }
            ),
            Style::default().fg(Color::DarkGray),
        )),
    };
    f.render_widget(Paragraph::new(line), area);
}

/// Split the screen into page panel, field panel and status line
pub fn layout(area: Rect) -> (Rect, Rect, Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(rows[0]);
    (cols[0], cols[1], rows[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_uses_limiting_dimension() {
        // 600x800 raster into 60x20 cells: 40 samples tall is the limit
        let fit = PageFit::new(Rect::new(0, 0, 60, 20), 600, 800);
        assert_eq!(fit.px_per_sample, 20.0);
        assert_eq!(fit.margin_cols, 15);
        assert_eq!(fit.surface_offset(), SurfaceOffset::new(300.0, 0.0));
    }

    #[test]
    fn cell_and_rect_mapping_agree() {
        let fit = PageFit::new(Rect::new(2, 1, 60, 20), 600, 800);
        let rect = ScreenRect::new(400.0, 280.0, 200.0, 40.0);
        let cells = fit.rect_to_cells(&rect).unwrap();
        assert_eq!(cells, Rect::new(22, 8, 10, 1));

        let point = fit.cell_to_point(cells.x + 1, cells.y).unwrap();
        assert!(rect.contains(point));
        assert_eq!(fit.cell_to_point(0, 0), None);
    }
}
