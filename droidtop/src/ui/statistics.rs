//! Statistics table: current / average / max (min for fps) per channel.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table},
};

use crate::stats::StatsView;
use crate::ui::charts::channel_color;
use crate::ui::theme::DIM;

const COLS: [Constraint; 4] = [
    Constraint::Length(12),
    Constraint::Length(12),
    Constraint::Length(12),
    Constraint::Length(16),
];

pub fn draw_statistics(f: &mut ratatui::Frame<'_>, area: Rect, view: &StatsView, renders: u64) {
    let header = Row::new(vec!["Metric", "Current", "Average", "Max / Min"])
        .style(Style::default().fg(DIM).add_modifier(Modifier::BOLD));
    let rows = view.rows.iter().map(|r| {
        Row::new(vec![
            Cell::from(r.channel.title()).style(Style::default().fg(channel_color(r.channel))),
            Cell::from(r.current.clone()),
            Cell::from(r.avg.clone()),
            Cell::from(format!("{} {}", r.extreme_label, r.extreme)),
        ])
    });
    let table = Table::new(rows, COLS.to_vec())
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Statistics ({renders} updates)")),
        );
    f.render_widget(table, area);
}
