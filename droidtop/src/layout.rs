//! Panel ordering: the live stack of dashboard panels, the drag-to-reorder
//! gesture, and persistence of the user's order across runs.
//!
//! The order is stored as one named entry (`panel_order`) holding a JSON list of
//! panel ids, inside a small key/value JSON file under the config dir:
//! $XDG_CONFIG_HOME/droidtop/layout.json (fallback ~/.config/droidtop/layout.json)

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, warn};

use crate::profiles::config_dir;
use crate::stats::MetricChannel;

pub const PANEL_ORDER_KEY: &str = "panel_order";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelId {
    /// Session state and device/app pickers. Never moves.
    Controls,
    Chart(MetricChannel),
    Statistics,
    Threads,
}

impl PanelId {
    pub fn is_fixed(self) -> bool {
        matches!(self, PanelId::Controls)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PanelId::Controls => "controls",
            PanelId::Statistics => "statistics",
            PanelId::Threads => "thread_distribution",
            PanelId::Chart(MetricChannel::Cpu) => "cpu_chart",
            PanelId::Chart(MetricChannel::Memory) => "memory_chart",
            PanelId::Chart(MetricChannel::Fps) => "fps_chart",
            PanelId::Chart(MetricChannel::Threads) => "threads_chart",
            PanelId::Chart(MetricChannel::DiskReads) => "disk_reads_chart",
            PanelId::Chart(MetricChannel::DiskWrites) => "disk_writes_chart",
        }
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown panel id: {0}")]
pub struct UnknownPanel(pub String);

impl FromStr for PanelId {
    type Err = UnknownPanel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fixed = [PanelId::Controls, PanelId::Statistics, PanelId::Threads];
        fixed
            .into_iter()
            .chain(MetricChannel::ALL.into_iter().map(PanelId::Chart))
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPanel(s.to_string()))
    }
}

/// Vertical extent of a panel as last drawn, used to resolve drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelSpan {
    pub id: PanelId,
    pub top: u16,
    pub height: u16,
}

/// Live top-to-bottom order of the dashboard panels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelLayout {
    panels: Vec<PanelId>,
}

impl PanelLayout {
    pub fn new(panels: Vec<PanelId>) -> Self {
        Self { panels }
    }

    pub fn panels(&self) -> &[PanelId] {
        &self.panels
    }

    /// Ids to persist: everything except fixed panels.
    pub fn order(&self) -> Vec<PanelId> {
        self.panels.iter().copied().filter(|p| !p.is_fixed()).collect()
    }

    // Lay `movable` back around fixed panels, which keep their slots.
    fn refill(&mut self, movable: Vec<PanelId>) {
        let mut it = movable.into_iter();
        for slot in self.panels.iter_mut().filter(|p| !p.is_fixed()) {
            if let Some(next) = it.next() {
                *slot = next;
            }
        }
    }

    /// Reorder to match a restored order. Named panels move to the end in
    /// that order; unnamed ones keep their relative order ahead of them.
    /// Unknown or absent ids are skipped, fixed panels never move.
    pub fn apply(&mut self, order: &[String]) {
        let mut movable = self.order();
        for raw in order {
            let Ok(id) = raw.parse::<PanelId>() else {
                debug!(id = %raw, "skipping unknown panel in saved layout");
                continue;
            };
            if id.is_fixed() {
                continue;
            }
            if let Some(pos) = movable.iter().position(|p| *p == id) {
                let p = movable.remove(pos);
                movable.push(p);
            }
        }
        self.refill(movable);
    }

    /// The panel a drop at row `y` lands in front of: the nearest panel whose
    /// vertical midpoint is below `y`. `None` means append to the end.
    pub fn drop_target(dragged: PanelId, y: u16, spans: &[PanelSpan]) -> Option<PanelId> {
        let y = f64::from(y);
        spans
            .iter()
            .filter(|s| s.id != dragged && !s.id.is_fixed())
            .map(|s| (y - f64::from(s.top) - f64::from(s.height) / 2.0, s.id))
            .filter(|(offset, _)| *offset < 0.0)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, id)| id)
    }

    /// Move `dragged` in front of `before`, or to the end when `before` is None.
    /// Returns false when nothing could move (fixed or unknown panel).
    pub fn move_before(&mut self, dragged: PanelId, before: Option<PanelId>) -> bool {
        if dragged.is_fixed() {
            return false;
        }
        let mut movable = self.order();
        let Some(from) = movable.iter().position(|p| *p == dragged) else {
            return false;
        };
        movable.remove(from);
        let to = before
            .and_then(|b| movable.iter().position(|p| *p == b))
            .unwrap_or(movable.len());
        movable.insert(to, dragged);
        self.refill(movable);
        true
    }

    /// Apply a full drag gesture against the spans from the last draw.
    pub fn drop_at(&mut self, dragged: PanelId, y: u16, spans: &[PanelSpan]) -> bool {
        let before = Self::drop_target(dragged, y, spans);
        self.move_before(dragged, before)
    }
}

impl Default for PanelLayout {
    fn default() -> Self {
        let mut panels = vec![PanelId::Controls, PanelId::Statistics];
        panels.extend(MetricChannel::ALL.into_iter().map(PanelId::Chart));
        panels.push(PanelId::Threads);
        Self { panels }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("layout storage i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("layout storage encoding: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable named-entry storage.
pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;
}

/// Entries kept in one JSON object on disk.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_path() -> PathBuf {
        config_dir().join("layout.json")
    }

    fn load(&self) -> BTreeMap<String, String> {
        match fs::read_to_string(&self.path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable layout file");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        }
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.load().remove(key)
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        let mut entries = self.load();
        entries.insert(key.to_string(), value);
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(&entries)?)?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    pub entries: BTreeMap<String, String>,
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

pub struct LayoutStore<S> {
    store: S,
}

impl<S: KvStore> LayoutStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    pub fn save(&mut self, order: &[PanelId]) -> Result<(), StoreError> {
        let ids: Vec<&str> = order
            .iter()
            .filter(|p| !p.is_fixed())
            .map(|p| p.as_str())
            .collect();
        let encoded = serde_json::to_string(&ids)?;
        self.store.set(PANEL_ORDER_KEY, encoded)
    }

    /// Saved order, or None when nothing usable is stored.
    pub fn restore(&self) -> Option<Vec<String>> {
        let raw = self.store.get(PANEL_ORDER_KEY)?;
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(order) => Some(order),
            Err(e) => {
                warn!(error = %e, "failed to restore panel order");
                None
            }
        }
    }

    /// Restore into `layout`; leaves it untouched when nothing is stored.
    pub fn restore_into(&self, layout: &mut PanelLayout) -> bool {
        match self.restore() {
            Some(order) => {
                layout.apply(&order);
                true
            }
            None => false,
        }
    }
}
