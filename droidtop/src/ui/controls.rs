//! The fixed controls panel: session state, device and app pickers with the
//! app search box, the latest raw values, and the current notice.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::session::{SessionController, SessionState};
use crate::ui::theme::{notice_color, DIM, SELECTED};
use crate::ui::util::{inner, truncate_middle};

/// Which part of the dashboard receives list navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Devices,
    Apps,
    /// Typing into the app search box.
    Search,
    Types,
    Threads,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Devices => Focus::Apps,
            Focus::Apps | Focus::Search => Focus::Types,
            Focus::Types => Focus::Threads,
            Focus::Threads => Focus::Devices,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PickerCursor {
    pub focus: Focus,
    pub device: usize,
    pub app: usize,
}

pub const CONTROLS_HEIGHT: u16 = 9;

fn state_badge(state: SessionState) -> Span<'static> {
    match state {
        SessionState::Idle => Span::styled("idle", Style::default().fg(DIM)),
        SessionState::Starting => Span::styled("starting...", Style::default().fg(Color::Yellow)),
        SessionState::Active => Span::styled(
            "monitoring",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
    }
}

// Window of `height` rows around `cursor`
fn window(len: usize, cursor: usize, height: usize) -> std::ops::Range<usize> {
    if len <= height {
        return 0..len;
    }
    let start = cursor.saturating_sub(height / 2).min(len - height);
    start..start + height
}

fn picker_lines<'a>(
    labels: &[(String, bool)],
    cursor: usize,
    focused: bool,
    height: usize,
    width: usize,
    empty: &'a str,
) -> Vec<Line<'a>> {
    if labels.is_empty() {
        return vec![Line::from(Span::styled(
            empty,
            Style::default().fg(DIM).add_modifier(Modifier::ITALIC),
        ))];
    }
    window(labels.len(), cursor, height)
        .map(|i| {
            let (label, selected) = &labels[i];
            let mark = if *selected { "● " } else { "  " };
            let mut style = Style::default();
            if *selected {
                style = style.fg(SELECTED).add_modifier(Modifier::BOLD);
            }
            if focused && i == cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Line::from(Span::styled(
                format!("{mark}{}", truncate_middle(label, width.saturating_sub(2))),
                style,
            ))
        })
        .collect()
}

pub fn draw_controls(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    ctl: &SessionController,
    cursor: &PickerCursor,
) {
    let session = ctl.session();
    let mut title = vec![
        Span::raw("droidtop — "),
        state_badge(session.state),
    ];
    if let Some(pkg) = &session.package_name {
        if session.state != SessionState::Idle {
            title.push(Span::raw(format!(" {pkg}")));
        }
    }
    title.push(Span::raw(if ctl.is_connected() {
        " | connected"
    } else {
        " | disconnected"
    }));
    title.push(Span::styled(
        "  (s start, x stop, d devices, a apps, / search, tab focus, r reset, q quit)",
        Style::default().fg(DIM),
    ));
    f.render_widget(
        Block::default().borders(Borders::ALL).title(Line::from(title)),
        area,
    );

    let inner = inner(area);
    if inner.height < 2 {
        return;
    }
    let body = Rect {
        height: inner.height - 1,
        ..inner
    };
    let notice_line = Rect {
        y: inner.y + inner.height - 1,
        height: 1,
        ..inner
    };
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Percentage(40),
            Constraint::Percentage(30),
        ])
        .split(body);

    // Devices
    let devices: Vec<(String, bool)> = ctl
        .devices()
        .iter()
        .map(|d| (d.label(), ctl.selected_device() == Some(d.id.as_str())))
        .collect();
    let mut lines = vec![Line::from(Span::styled(
        "Devices",
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    lines.extend(picker_lines(
        &devices,
        cursor.device,
        cursor.focus == Focus::Devices,
        cols[0].height.saturating_sub(1) as usize,
        cols[0].width as usize,
        "select a device (d to refresh)",
    ));
    f.render_widget(Paragraph::new(lines), cols[0]);

    // Apps + search
    let apps: Vec<(String, bool)> = ctl
        .filtered_apps()
        .into_iter()
        .map(|a| (a.label(), ctl.selected_package() == Some(a.package_name.as_str())))
        .collect();
    let search_style = if cursor.focus == Focus::Search {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(DIM)
    };
    let caret = if cursor.focus == Focus::Search { "_" } else { "" };
    let mut lines = vec![Line::from(vec![
        Span::styled("Apps ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(
            format!("[{}/{}] search: {}{caret}", apps.len(), ctl.apps().len(), ctl.app_query()),
            search_style,
        ),
    ])];
    lines.extend(picker_lines(
        &apps,
        cursor.app,
        matches!(cursor.focus, Focus::Apps | Focus::Search),
        cols[1].height.saturating_sub(1) as usize,
        cols[1].width as usize,
        "select an app",
    ));
    f.render_widget(Paragraph::new(lines), cols[1]);

    // Latest raw values, shown as they arrive (not coalesced)
    let lines: Vec<Line> = match ctl.latest() {
        Some(s) => {
            let mut l = vec![
                Line::from(format!("app cpu    {:.1}%", s.cpu)),
                Line::from(format!("system cpu {:.1}%", s.system_cpu)),
                Line::from(format!("memory     {:.1}MB", s.memory)),
                Line::from(format!(
                    "system mem {:.0}/{:.0}MB",
                    s.system_memory_used, s.system_memory_total
                )),
                Line::from(format!("threads {:.0}  fps {:.0}", s.threads, s.fps)),
            ];
            let disk = match (s.disk_reads, s.disk_writes) {
                (None, None) => None,
                (r, w) => Some(format!(
                    "disk r/w {}/{}",
                    r.map(|v| format!("{v:.1}MB")).unwrap_or_else(|| "--".into()),
                    w.map(|v| format!("{v:.1}MB")).unwrap_or_else(|| "--".into()),
                )),
            };
            l.extend(disk.map(Line::from));
            if let Some(cores) = s.cpu_cores {
                l.push(Line::from(format!("cores {cores:.0}")));
            }
            l
        }
        None => vec![Line::from(Span::styled(
            "waiting for data...",
            Style::default().fg(DIM).add_modifier(Modifier::ITALIC),
        ))],
    };
    f.render_widget(Paragraph::new(lines), cols[2]);

    if let Some(n) = ctl.notices().current() {
        f.render_widget(
            Paragraph::new(Span::styled(
                n.message.clone(),
                Style::default().fg(notice_color(n.kind)),
            )),
            notice_line,
        );
    }
}
