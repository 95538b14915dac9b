//! Thread distribution: state tally, clickable type ranking, and the grouped
//! thread listing with a scrollbar.

use crossterm::event::{KeyCode, KeyEvent, MouseEvent, MouseEventKind};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};

use crate::threads::{state_text, ListingRow, StateClass, ThreadView};
use crate::ui::theme::{state_color, DIM, SELECTED};
use crate::ui::util::{clamp_scroll, contains, draw_scrollbar, inner, truncate_middle};

const COLS: [Constraint; 4] = [
    Constraint::Length(8),      // TID
    Constraint::Percentage(45), // Name
    Constraint::Length(16),     // State
    Constraint::Min(10),        // Type
];

// tally, type chips, listing title
const HEADER_LINES: u16 = 3;

struct Regions {
    tally: Rect,
    chips: Rect,
    title: Rect,
    listing: Rect,
    scrollbar: Rect,
}

fn regions(area: Rect) -> Option<Regions> {
    let inner = inner(area);
    if inner.height <= HEADER_LINES || inner.width < 4 {
        return None;
    }
    let line = |dy: u16| Rect {
        x: inner.x,
        y: inner.y + dy,
        width: inner.width,
        height: 1,
    };
    let body_y = inner.y + HEADER_LINES;
    let body_h = inner.height - HEADER_LINES;
    Some(Regions {
        tally: line(0),
        chips: line(1),
        title: line(2),
        listing: Rect {
            x: inner.x,
            y: body_y,
            width: inner.width.saturating_sub(2),
            height: body_h,
        },
        scrollbar: Rect {
            x: inner.x + inner.width.saturating_sub(1),
            y: body_y,
            width: 1,
            height: body_h,
        },
    })
}

/// Rows of the listing visible at once.
pub fn listing_viewport(area: Rect) -> usize {
    regions(area).map(|r| r.listing.height as usize).unwrap_or(0)
}

// Chip labels laid out left to right on one line; chips that don't fit are dropped
fn chip_layout(view: &ThreadView, row: Rect) -> Vec<(Rect, usize, String)> {
    let mut out = Vec::new();
    let mut x = row.x;
    let end = row.x + row.width;
    for (i, b) in view.ranking().iter().enumerate() {
        let label = format!(" {} {} ({:.1}%) ", b.kind, b.count, b.percentage);
        let w = label.chars().count() as u16;
        if x + w > end {
            break;
        }
        out.push((
            Rect {
                x,
                y: row.y,
                width: w,
                height: 1,
            },
            i,
            label,
        ));
        x += w + 1;
    }
    out
}

pub fn draw_threads(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    view: &ThreadView,
    type_cursor: Option<usize>,
    scroll_offset: usize,
) {
    let t = view.tally();
    f.render_widget(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Thread distribution ({} threads)", t.total)),
        area,
    );
    let Some(r) = regions(area) else { return };

    let counted = |class: StateClass, n: usize| {
        Span::styled(
            format!("{} {n}", class.label().to_lowercase()),
            Style::default().fg(state_color(class)),
        )
    };
    let tally = Line::from(vec![
        counted(StateClass::Running, t.running),
        Span::raw("  "),
        counted(StateClass::Sleeping, t.sleeping),
        Span::raw("  "),
        counted(StateClass::Other, t.other),
    ]);
    f.render_widget(Paragraph::new(tally), r.tally);

    for (rect, i, label) in chip_layout(view, r.chips) {
        let kind = &view.ranking()[i].kind;
        let mut style = Style::default().fg(SELECTED);
        if view.filter() == Some(kind.as_str()) {
            style = Style::default().fg(Color::White).bg(SELECTED);
        }
        if type_cursor == Some(i) {
            style = style.add_modifier(Modifier::UNDERLINED | Modifier::BOLD);
        }
        f.render_widget(Paragraph::new(Span::styled(label, style)), rect);
    }

    f.render_widget(
        Paragraph::new(Span::styled(
            view.title(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        r.title,
    );

    if view.is_empty() {
        f.render_widget(
            Paragraph::new(Span::styled(
                "no thread data yet...",
                Style::default().fg(DIM).add_modifier(Modifier::ITALIC),
            )),
            r.listing,
        );
        return;
    }

    let listing = view.listing();
    let header_rows = 1usize;
    let viewport = (r.listing.height as usize).saturating_sub(header_rows);
    let mut offset = scroll_offset;
    clamp_scroll(&mut offset, listing.len(), viewport);
    let name_w = (r.listing.width as usize * 45 / 100).max(4);

    let rows = listing.iter().skip(offset).take(viewport).map(|row| match row {
        ListingRow::State { class, count } => Row::new(vec![Cell::from(format!(
            "● {} ({count})",
            class.label()
        ))])
        .style(
            Style::default()
                .fg(Color::White)
                .bg(state_color(*class))
                .add_modifier(Modifier::BOLD),
        ),
        ListingRow::Type { kind, count } => {
            Row::new(vec![Cell::from(format!("  ▸ {kind} ({count})"))])
                .style(Style::default().fg(DIM).add_modifier(Modifier::BOLD))
        }
        ListingRow::Thread(th) => Row::new(vec![
            Cell::from(th.tid.to_string()).style(Style::default().fg(Color::DarkGray)),
            Cell::from(truncate_middle(&th.name, name_w)),
            Cell::from(state_text(&th.state).to_string())
                .style(Style::default().fg(state_color(StateClass::of(&th.state)))),
            Cell::from(th.kind.clone()),
        ]),
    });

    let header = Row::new(vec!["TID", "Name", "State", "Type"]).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );
    let table = Table::new(rows, COLS.to_vec())
        .header(header)
        .column_spacing(1);
    f.render_widget(table, r.listing);

    draw_scrollbar(f, r.scrollbar, listing.len(), viewport, offset);
}

/// The type chip under a click, if any.
pub fn type_chip_at(area: Rect, view: &ThreadView, column: u16, row: u16) -> Option<String> {
    let r = regions(area)?;
    chip_layout(view, r.chips)
        .into_iter()
        .find(|(rect, _, _)| contains(*rect, column, row))
        .map(|(_, i, _)| view.ranking()[i].kind.clone())
}

/// Keyboard scrolling (Up/Down/PageUp/PageDown/Home/End).
pub fn threads_handle_key(scroll_offset: &mut usize, key: KeyEvent, page_size: usize) {
    match key.code {
        KeyCode::Up => *scroll_offset = scroll_offset.saturating_sub(1),
        KeyCode::Down => *scroll_offset = scroll_offset.saturating_add(1),
        KeyCode::PageUp => *scroll_offset = scroll_offset.saturating_sub(page_size.max(1)),
        KeyCode::PageDown => *scroll_offset = scroll_offset.saturating_add(page_size.max(1)),
        KeyCode::Home => *scroll_offset = 0,
        KeyCode::End => *scroll_offset = usize::MAX,
        _ => {}
    }
}

/// Wheel scrolling inside the listing.
pub fn threads_handle_mouse(scroll_offset: &mut usize, mouse: MouseEvent, area: Rect) {
    let Some(r) = regions(area) else { return };
    if !contains(r.listing, mouse.column, mouse.row) {
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollUp => *scroll_offset = scroll_offset.saturating_sub(3),
        MouseEventKind::ScrollDown => *scroll_offset = scroll_offset.saturating_add(3),
        _ => {}
    }
}
