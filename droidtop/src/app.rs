//! App state and main loop: input handling, draining collector events into the
//! session controller, panel drag-to-reorder, and drawing.

use std::{
    io,
    time::{Duration, Instant},
};

use anyhow::Context;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    Terminal,
};
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::layout::{FileStore, KvStore, LayoutStore, PanelId, PanelLayout, PanelSpan};
use crate::session::{SessionController, SessionError};
use crate::types::{Inbound, Outbound};
use crate::ui::charts::draw_chart;
use crate::ui::controls::{draw_controls, Focus, PickerCursor, CONTROLS_HEIGHT};
use crate::ui::statistics::draw_statistics;
use crate::ui::threads::{
    draw_threads, listing_viewport, threads_handle_key, threads_handle_mouse, type_chip_at,
};
use crate::ui::util::{clamp_scroll, contains};
use crate::ws::{connect, spawn_io};

const STATS_HEIGHT: u16 = 9;
const CHART_HEIGHT: u16 = 5;
const THREADS_MIN_HEIGHT: u16 = 12;

pub struct App<S: KvStore = FileStore> {
    ctl: SessionController,
    layout: PanelLayout,
    layout_store: LayoutStore<S>,

    cursor: PickerCursor,
    type_cursor: usize,
    threads_scroll: usize,

    // Panel geometry from the last draw, for hit-testing
    areas: Vec<(PanelId, Rect)>,
    // Panel being dragged by its title bar
    drag: Option<PanelId>,

    should_quit: bool,
}

impl<S: KvStore> App<S> {
    pub fn new(ctl: SessionController, layout_store: LayoutStore<S>) -> Self {
        let mut layout = PanelLayout::default();
        if layout_store.restore_into(&mut layout) {
            debug!(order = ?layout.order(), "restored panel order");
        }
        Self {
            ctl,
            layout,
            layout_store,
            cursor: PickerCursor::default(),
            type_cursor: 0,
            threads_scroll: 0,
            areas: Vec::new(),
            drag: None,
            should_quit: false,
        }
    }

    pub fn controller(&self) -> &SessionController {
        &self.ctl
    }

    pub fn layout(&self) -> &PanelLayout {
        &self.layout
    }

    pub async fn run(&mut self, url: &str, tls_ca: Option<&str>) -> anyhow::Result<()> {
        // Connect to the collector
        let ws = connect(url, tls_ca)
            .await
            .with_context(|| format!("connecting to {url}"))?;
        info!(%url, "connected");
        let (mut rx, tx) = spawn_io(ws);

        // Terminal setup
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        // Main loop
        let res = self.event_loop(&mut terminal, &mut rx, &tx).await;

        // Teardown
        disable_raw_mode()?;
        let backend = terminal.backend_mut();
        execute!(backend, DisableMouseCapture, LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        res
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        rx: &mut UnboundedReceiver<Inbound>,
        tx: &UnboundedSender<Outbound>,
    ) -> anyhow::Result<()> {
        loop {
            // Input (non-blocking)
            while event::poll(Duration::from_millis(10))? {
                let now = Instant::now();
                let out = match event::read()? {
                    Event::Key(k) => self.on_key(k, now),
                    Event::Mouse(m) => {
                        self.on_mouse(m);
                        Vec::new()
                    }
                    _ => Vec::new(),
                };
                send_all(tx, out);
            }
            if self.should_quit {
                break;
            }

            // Collector events, in arrival order
            let now = Instant::now();
            loop {
                match rx.try_recv() {
                    Ok(ev) => {
                        let out = self.ctl.handle(ev, now);
                        send_all(tx, out);
                    }
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                }
            }
            self.ctl.tick(now);
            self.clamp_cursors();

            // Draw
            terminal.draw(|f| self.draw(f))?;

            sleep(Duration::from_millis(50)).await;
        }

        Ok(())
    }

    fn clamp_cursors(&mut self) {
        let n_dev = self.ctl.devices().len();
        self.cursor.device = self.cursor.device.min(n_dev.saturating_sub(1));
        let n_app = self.ctl.filtered_apps().len();
        self.cursor.app = self.cursor.app.min(n_app.saturating_sub(1));
        let n_types = self.ctl.threads().ranking().len();
        self.type_cursor = self.type_cursor.min(n_types.saturating_sub(1));
        if let Some(area) = self.area_of(PanelId::Threads) {
            let viewport = listing_viewport(area).saturating_sub(1);
            clamp_scroll(
                &mut self.threads_scroll,
                self.ctl.threads().listing().len(),
                viewport,
            );
        }
    }

    fn area_of(&self, id: PanelId) -> Option<Rect> {
        self.areas.iter().find(|(p, _)| *p == id).map(|(_, r)| *r)
    }

    fn request<F>(&mut self, now: Instant, f: F) -> Vec<Outbound>
    where
        F: FnOnce(&mut SessionController, Instant) -> Result<Outbound, SessionError>,
    {
        match f(&mut self.ctl, now) {
            Ok(out) => vec![out],
            Err(e) => {
                self.ctl.reject(e, now);
                Vec::new()
            }
        }
    }

    pub fn on_key(&mut self, k: KeyEvent, now: Instant) -> Vec<Outbound> {
        if self.cursor.focus == Focus::Search {
            match k.code {
                KeyCode::Char(c) if !k.modifiers.contains(KeyModifiers::CONTROL) => {
                    let mut q = self.ctl.app_query().to_string();
                    q.push(c);
                    self.ctl.set_app_query(q);
                    self.cursor.app = 0;
                }
                KeyCode::Backspace => {
                    let mut q = self.ctl.app_query().to_string();
                    q.pop();
                    self.ctl.set_app_query(q);
                    self.cursor.app = 0;
                }
                KeyCode::Enter | KeyCode::Esc | KeyCode::Down => self.cursor.focus = Focus::Apps,
                KeyCode::Tab => self.cursor.focus = self.cursor.focus.next(),
                _ => {}
            }
            return Vec::new();
        }

        match k.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
                Vec::new()
            }
            KeyCode::Char('c') if k.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
                Vec::new()
            }
            KeyCode::Tab => {
                self.cursor.focus = self.cursor.focus.next();
                Vec::new()
            }
            KeyCode::Char('/') => {
                self.cursor.focus = Focus::Search;
                Vec::new()
            }
            KeyCode::Char('s') => self.request(now, SessionController::start),
            KeyCode::Char('x') => vec![self.ctl.stop()],
            KeyCode::Char('d') => vec![self.ctl.request_devices(now)],
            KeyCode::Char('a') => self.request(now, SessionController::request_apps),
            KeyCode::Char('r') => {
                self.ctl.reset_stats();
                Vec::new()
            }
            KeyCode::Enter => self.activate(now),
            _ => {
                self.navigate(k);
                Vec::new()
            }
        }
    }

    // Enter on the focused list
    fn activate(&mut self, now: Instant) -> Vec<Outbound> {
        match self.cursor.focus {
            Focus::Devices => {
                let Some(id) = self.ctl.devices().get(self.cursor.device).map(|d| d.id.clone())
                else {
                    return Vec::new();
                };
                self.cursor.app = 0;
                self.request(now, |ctl, now| ctl.select_device(&id, now))
            }
            Focus::Apps | Focus::Search => {
                let pkg = self
                    .ctl
                    .filtered_apps()
                    .get(self.cursor.app)
                    .map(|a| a.package_name.clone());
                if let Some(pkg) = pkg {
                    self.ctl.select_package(&pkg);
                }
                Vec::new()
            }
            Focus::Types => {
                self.toggle_type(self.type_cursor);
                Vec::new()
            }
            Focus::Threads => Vec::new(),
        }
    }

    fn toggle_type(&mut self, idx: usize) {
        let kind = self.ctl.threads().ranking().get(idx).map(|b| b.kind.clone());
        if let Some(kind) = kind {
            self.ctl.threads_mut().toggle_filter(&kind);
            self.threads_scroll = 0;
        }
    }

    fn navigate(&mut self, k: KeyEvent) {
        let step_up = |v: &mut usize| *v = v.saturating_sub(1);
        let step_down = |v: &mut usize| *v = v.saturating_add(1);
        match (self.cursor.focus, k.code) {
            (Focus::Devices, KeyCode::Up) => step_up(&mut self.cursor.device),
            (Focus::Devices, KeyCode::Down) => step_down(&mut self.cursor.device),
            (Focus::Apps, KeyCode::Up) => step_up(&mut self.cursor.app),
            (Focus::Apps, KeyCode::Down) => step_down(&mut self.cursor.app),
            (Focus::Types, KeyCode::Left) => step_up(&mut self.type_cursor),
            (Focus::Types, KeyCode::Right) => step_down(&mut self.type_cursor),
            (Focus::Threads, _) | (Focus::Types, _) => {
                let page = self
                    .area_of(PanelId::Threads)
                    .map(listing_viewport)
                    .unwrap_or(1)
                    .saturating_sub(1);
                threads_handle_key(&mut self.threads_scroll, k, page);
            }
            _ => {}
        }
    }

    pub fn on_mouse(&mut self, m: MouseEvent) {
        match m.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                // Title bar grabs a panel for dragging
                let grabbed = self
                    .areas
                    .iter()
                    .find(|(id, r)| !id.is_fixed() && m.row == r.y && contains(*r, m.column, m.row))
                    .map(|(id, _)| *id);
                if grabbed.is_some() {
                    self.drag = grabbed;
                    return;
                }
                if let Some(area) = self.area_of(PanelId::Threads) {
                    if let Some(kind) = type_chip_at(area, self.ctl.threads(), m.column, m.row) {
                        self.ctl.threads_mut().toggle_filter(&kind);
                        self.threads_scroll = 0;
                    }
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if let Some(dragged) = self.drag.take() {
                    self.drop_panel(dragged, m.row);
                }
            }
            MouseEventKind::ScrollUp | MouseEventKind::ScrollDown => {
                if let Some(area) = self.area_of(PanelId::Threads) {
                    threads_handle_mouse(&mut self.threads_scroll, m, area);
                }
            }
            _ => {}
        }
    }

    fn spans(&self) -> Vec<PanelSpan> {
        self.areas
            .iter()
            .map(|(id, r)| PanelSpan {
                id: *id,
                top: r.y,
                height: r.height,
            })
            .collect()
    }

    fn drop_panel(&mut self, dragged: PanelId, row: u16) {
        let spans = self.spans();
        if !self.layout.drop_at(dragged, row, &spans) {
            return;
        }
        debug!(panel = %dragged, row, order = ?self.layout.order(), "panel moved");
        if let Err(e) = self.layout_store.save(&self.layout.order()) {
            warn!(error = %e, "failed to save panel order");
        }
    }

    pub fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let area = f.area();
        let constraints: Vec<Constraint> = self
            .layout
            .panels()
            .iter()
            .map(|p| match p {
                PanelId::Controls => Constraint::Length(CONTROLS_HEIGHT),
                PanelId::Statistics => Constraint::Length(STATS_HEIGHT),
                PanelId::Chart(_) => Constraint::Length(CHART_HEIGHT),
                PanelId::Threads => Constraint::Min(THREADS_MIN_HEIGHT),
            })
            .collect();
        let rects = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        // Cache for input handlers
        self.areas = self
            .layout
            .panels()
            .iter()
            .copied()
            .zip(rects.iter().copied())
            .collect();

        for (id, rect) in self.areas.clone() {
            match id {
                PanelId::Controls => draw_controls(f, rect, &self.ctl, &self.cursor),
                PanelId::Statistics => draw_statistics(
                    f,
                    rect,
                    self.ctl.stats_view(),
                    self.ctl.stats_renders(),
                ),
                PanelId::Chart(ch) => draw_chart(f, rect, ch, self.ctl.history()),
                PanelId::Threads => {
                    let cursor = (self.cursor.focus == Focus::Types).then_some(self.type_cursor);
                    draw_threads(f, rect, self.ctl.threads(), cursor, self.threads_scroll)
                }
            }
        }
    }
}

fn send_all(tx: &UnboundedSender<Outbound>, out: Vec<Outbound>) {
    for o in out {
        debug!(request = ?o, "sending");
        if tx.send(o).is_err() {
            warn!("collector writer has stopped; request dropped");
        }
    }
}
