// Paints both panes of a TableView into a ratatui frame.
// Every cell is pulled from the view at paint time; nothing is cached here.

use crate::data::table_model::{CellStyle, Image};
use crate::ui::pane::{NativePane, Pane, PaneStyle};
use crate::ui::table_view::{PaneEvent, TableView};
use crate::ui::terminal_pane::{ColumnSpan, TerminalPane, CHECK_BOX_WIDTH};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    prelude::*,
    style::{Color, Modifier, Style},
    widgets::{Scrollbar, ScrollbarOrientation, ScrollbarState},
};

const SEPARATOR: &str = "│";

/// Render the whole table; the view must have been given its bounds
pub fn render_table(f: &mut Frame, view: &mut TableView<TerminalPane>) {
    for pane in [Pane::Normal, Pane::Frozen] {
        view.handle_pane_event(pane, PaneEvent::EraseBackground);
    }

    for pane in [Pane::Frozen, Pane::Normal] {
        render_pane(f.buffer_mut(), view, pane);
    }

    render_separator(f.buffer_mut(), view);
    render_scrollbar(f, view);

    view.panes_mut().each(|p| {
        p.take_dirty_rows();
    });
}

/// Everything the painter needs from one pane, copied out so the view can
/// be borrowed mutably for cell queries
struct PaneSnapshot {
    bounds: Rect,
    offset: u16,
    header_height: u16,
    spans: Vec<ColumnSpan>,
    rows: std::ops::Range<usize>,
    sort_indicator: Option<(usize, crate::data::table_model::SortOrder)>,
    check_boxes: bool,
    focused: bool,
}

impl PaneSnapshot {
    fn take(pane: &TerminalPane) -> Self {
        Self {
            bounds: pane.bounds(),
            offset: pane.horizontal_offset(),
            header_height: pane.header_height(),
            spans: pane.column_spans(),
            rows: pane.visible_rows(),
            sort_indicator: pane.sort_indicator(),
            check_boxes: pane.style(PaneStyle::CheckBoxes),
            focused: pane.has_focus(),
        }
    }

    /// Screen x and the part of `span` that is visible: (x, skip, len)
    fn clip(&self, span: &ColumnSpan) -> Option<(u16, usize, usize)> {
        let start = span.start.max(self.offset);
        let end = span
            .start
            .saturating_add(span.width)
            .min(self.offset.saturating_add(self.bounds.width));
        if start >= end {
            return None;
        }
        Some((
            self.bounds.x + (start - self.offset),
            usize::from(start - span.start),
            usize::from(end - start),
        ))
    }
}

fn render_pane(buf: &mut Buffer, view: &mut TableView<TerminalPane>, pane: Pane) {
    let snapshot = PaneSnapshot::take(view.panes().get(pane));
    if snapshot.bounds.width == 0 || snapshot.bounds.height == 0 {
        return;
    }

    if !snapshot.rows.is_empty() {
        view.handle_pane_event(
            pane,
            PaneEvent::CacheHint {
                from: snapshot.rows.start,
                to: snapshot.rows.end - 1,
            },
        );
    }

    if snapshot.header_height > 0 {
        render_header(buf, view, pane, &snapshot);
    }

    let first_y = snapshot.bounds.y + snapshot.header_height;
    for (line, row) in snapshot.rows.clone().enumerate() {
        let y = first_y + line as u16;
        render_row(buf, view, pane, &snapshot, row, y);
    }
}

fn render_header(buf: &mut Buffer, view: &TableView<TerminalPane>, pane: Pane, snapshot: &PaneSnapshot) {
    let style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);

    for span in &snapshot.spans {
        let Some((x, skip, len)) = snapshot.clip(span) else {
            continue;
        };
        let Some((_, column)) = view.pane_column(pane, span.visual) else {
            continue;
        };

        let mut title = column.display_title().to_string();
        if let Some((visual, order)) = snapshot.sort_indicator {
            if visual == span.visual {
                title.push_str(order.indicator());
            }
        }
        let text = fit(&title, span.width, skip, len);
        buf.set_stringn(x, snapshot.bounds.y, text, len, style);
    }
}

fn render_row(
    buf: &mut Buffer,
    view: &mut TableView<TerminalPane>,
    pane: Pane,
    snapshot: &PaneSnapshot,
    row: usize,
    y: u16,
) {
    let selected = view.panes().get(pane).is_selected(row);
    let row_style = to_style(&view.row_style(row));

    for span in &snapshot.spans {
        let Some((x, skip, len)) = snapshot.clip(span) else {
            continue;
        };

        let mut text = String::new();
        if snapshot.check_boxes && span.visual == 0 {
            let mark = match view.cell_checked(pane, row, span.visual) {
                Some(true) => "☑",
                Some(false) => "☐",
                None => " ",
            };
            text.push_str(mark);
            text.push_str(&" ".repeat(usize::from(CHECK_BOX_WIDTH) - 1));
        }
        if let Some(icon) = view.cell_image(pane, row, span.visual) {
            text.push(icon_glyph(view.icon(icon)));
            text.push(' ');
        }
        text.push_str(&view.cell_text(pane, row, span.visual));

        let mut style = match view.cell_style(pane, row, span.visual) {
            Some(cell) => row_style.patch(to_style(&cell)),
            None => row_style,
        };
        if selected {
            style = style.bg(if snapshot.focused || pane == Pane::Frozen {
                Color::Blue
            } else {
                Color::DarkGray
            });
            style = style.add_modifier(Modifier::BOLD);
        }

        buf.set_stringn(x, y, fit(&text, span.width, skip, len), len, style);
    }
}

/// The divider drawn over the frozen pane's last cell column
fn render_separator(buf: &mut Buffer, view: &TableView<TerminalPane>) {
    let frozen = view.panes().frozen.bounds();
    if frozen.width == 0 || view.panes().normal.bounds().width == 0 {
        return;
    }
    let x = frozen.x + frozen.width - 1;
    let style = Style::default().fg(Color::DarkGray);
    for y in frozen.y..frozen.y + frozen.height {
        buf.set_string(x, y, SEPARATOR, style);
    }
}

fn render_scrollbar(f: &mut Frame, view: &TableView<TerminalPane>) {
    let normal = &view.panes().normal;
    if normal.horizontal_scrollbar_height() == 0 {
        return;
    }
    let overflow = normal.content_width().saturating_sub(normal.bounds().width);
    let mut state = ScrollbarState::new(usize::from(overflow) + 1)
        .position(usize::from(normal.horizontal_offset()));
    f.render_stateful_widget(
        Scrollbar::new(ScrollbarOrientation::HorizontalBottom)
            .begin_symbol(None)
            .end_symbol(None),
        normal.bounds(),
        &mut state,
    );
}

fn to_style(cell: &CellStyle) -> Style {
    let mut style = Style::default().add_modifier(cell.font);
    if let Some(bg) = cell.background {
        style = style.bg(bg);
    }
    if let Some(fg) = cell.text_color {
        style = style.fg(fg);
    }
    style
}

fn icon_glyph(image: Option<&Image>) -> char {
    match image {
        Some(Image::Glyph(c)) => *c,
        Some(_) => '◆',
        None => ' ',
    }
}

/// Pad or cut `text` to `width` cells, then take `len` cells from `skip`
fn fit(text: &str, width: u16, skip: usize, len: usize) -> String {
    let width = usize::from(width);
    // one cell of padding between columns
    let body: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{:<width$}", body, width = width)
        .chars()
        .skip(skip)
        .take(len)
        .collect()
}
