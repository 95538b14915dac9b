//! Monitoring session: the Idle/Starting/Active state machine, device and app
//! selection, and the gate that keeps snapshots out of the aggregates unless
//! the collector has acknowledged a running session.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::coalesce::{Coalescer, STATS_WINDOW};
use crate::history::ChartHistory;
use crate::stats::{StatsEngine, StatsView};
use crate::threads::ThreadView;
use crate::types::{
    AppInfo, AppsList, Device, DevicesList, Inbound, Outbound, PerformanceSample, Status,
    StatusCode, StatusType,
};

/// How long a notice stays on screen.
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// Start requested, waiting for the collector to acknowledge.
    Starting,
    Active,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitoringSession {
    pub state: SessionState,
    pub device_id: Option<String>,
    pub package_name: Option<String>,
}

impl MonitoringSession {
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("select a device first")]
    NoDevice,
    #[error("select an app first")]
    NoPackage,
    #[error("unknown device: {0}")]
    UnknownDevice(String),
    #[error("a start request is already pending")]
    StartPending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub kind: StatusType,
    pub expires: Instant,
}

/// Toast-style messages that expire on their own.
#[derive(Debug, Default)]
pub struct Notices {
    items: VecDeque<Notice>,
}

impl Notices {
    pub fn push(&mut self, message: impl Into<String>, kind: StatusType, now: Instant) {
        self.items.push_back(Notice {
            message: message.into(),
            kind,
            expires: now + NOTICE_TTL,
        });
        // only the newest is shown; keep a short tail for the log panel
        while self.items.len() > 8 {
            self.items.pop_front();
        }
    }

    pub fn prune(&mut self, now: Instant) {
        self.items.retain(|n| n.expires > now);
    }

    pub fn current(&self) -> Option<&Notice> {
        self.items.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.items.iter()
    }
}

pub struct SessionController {
    session: MonitoringSession,
    connected: bool,

    devices: Vec<Device>,
    selected_device: Option<String>,
    apps: Vec<AppInfo>,
    app_query: String,
    selected_package: Option<String>,
    preferred_device: Option<String>,
    preferred_package: Option<String>,

    stats: StatsEngine,
    stats_view: StatsView,
    stats_renders: u64,
    coalescer: Coalescer<PerformanceSample>,
    history: ChartHistory,
    latest: Option<PerformanceSample>,
    threads: ThreadView,

    notices: Notices,
}

impl SessionController {
    pub fn new() -> Self {
        let stats = StatsEngine::new();
        Self {
            session: MonitoringSession::default(),
            connected: false,
            devices: Vec::new(),
            selected_device: None,
            apps: Vec::new(),
            app_query: String::new(),
            selected_package: None,
            preferred_device: None,
            preferred_package: None,
            stats_view: stats.render(),
            stats,
            stats_renders: 0,
            coalescer: Coalescer::new(STATS_WINDOW),
            history: ChartHistory::default(),
            latest: None,
            threads: ThreadView::new(),
            notices: Notices::default(),
        }
    }

    /// Device and package to pick automatically once the collector lists them.
    pub fn with_preselection(mut self, device: Option<String>, package: Option<String>) -> Self {
        self.preferred_device = device;
        self.preferred_package = package;
        self
    }

    // ---------- inbound ----------

    /// Apply one inbound event. Returns any requests the controller wants sent
    /// in response (e.g. the device list on connect).
    pub fn handle(&mut self, ev: Inbound, now: Instant) -> Vec<Outbound> {
        match ev {
            Inbound::Connect => {
                info!("connected to collector");
                self.connected = true;
                vec![self.request_devices(now)]
            }
            Inbound::Disconnect => {
                warn!(state = ?self.session.state, "collector connection lost");
                self.connected = false;
                // state stays as is; only an explicit ack moves it
                if self.session.is_active() {
                    self.notices
                        .push("connection to collector lost", StatusType::Error, now);
                }
                Vec::new()
            }
            Inbound::DevicesList(list) => self.on_devices(list, now),
            Inbound::AppsList(list) => {
                self.on_apps(list, now);
                Vec::new()
            }
            Inbound::Status(status) => {
                self.on_status(status, now);
                Vec::new()
            }
            Inbound::MonitoringStarted(ms) => {
                // broadcast to every client; only our own pending start counts
                let ours = self.session.state == SessionState::Starting
                    && self.session.package_name.as_deref() == Some(ms.package_name.as_str());
                if ours {
                    self.acknowledge(StatusCode::MonitoringStarted);
                } else {
                    debug!(package = %ms.package_name, state = ?self.session.state, "ignoring monitoring_started for another session");
                }
                Vec::new()
            }
            Inbound::PerformanceData(sample) => {
                if self.session.is_active() {
                    self.history.push_sample(&sample);
                    self.coalescer.offer(sample.clone(), now);
                    self.latest = Some(sample);
                }
                Vec::new()
            }
            Inbound::ThreadDetails(details) => {
                if self.session.is_active() {
                    self.threads.update(details.threads);
                }
                Vec::new()
            }
        }
    }

    fn on_devices(&mut self, list: DevicesList, now: Instant) -> Vec<Outbound> {
        if let Some(err) = list.error {
            self.notices.push(err, StatusType::Error, now);
            self.devices.clear();
            self.clear_device_selection();
            return Vec::new();
        }
        self.devices = list.devices;
        if self.devices.is_empty() {
            self.notices.push(
                "no Android devices found, check the USB connection and adb",
                StatusType::Error,
                now,
            );
        } else {
            self.notices.push(
                format!("found {} Android device(s)", self.devices.len()),
                StatusType::Success,
                now,
            );
        }

        let still_there = self
            .selected_device
            .as_ref()
            .is_some_and(|id| self.devices.iter().any(|d| &d.id == id));
        if !still_there {
            self.clear_device_selection();
        }
        if self.selected_device.is_none() {
            if let Some(pref) = self.preferred_device.clone() {
                if let Ok(req) = self.select_device(&pref, now) {
                    return vec![req];
                }
            }
        }
        Vec::new()
    }

    fn on_apps(&mut self, list: AppsList, now: Instant) {
        self.selected_package = None;
        if let Some(err) = list.error {
            self.notices.push(err, StatusType::Error, now);
            self.apps.clear();
            return;
        }
        self.apps = list.apps;
        if self.apps.is_empty() {
            self.notices
                .push("no apps found on the device", StatusType::Error, now);
            return;
        }
        self.notices.push(
            format!("found {} app(s)", self.apps.len()),
            StatusType::Success,
            now,
        );
        if let Some(pref) = self.preferred_package.clone() {
            if self.apps.iter().any(|a| a.package_name == pref) {
                self.selected_package = Some(pref);
            }
        }
    }

    fn on_status(&mut self, status: Status, now: Instant) {
        self.notices.push(status.message.clone(), status.kind, now);
        match status.ack() {
            Some(code) => self.acknowledge(code),
            // a bare error while waiting can only be the start failing
            None if status.kind == StatusType::Error
                && self.session.state == SessionState::Starting =>
            {
                self.acknowledge(StatusCode::MonitoringFailed)
            }
            None => {}
        }
    }

    fn acknowledge(&mut self, code: StatusCode) {
        let before = self.session.state;
        self.session.state = match (code, before) {
            (StatusCode::MonitoringStarted, _) => SessionState::Active,
            (StatusCode::MonitoringStopped, _) => SessionState::Idle,
            (StatusCode::MonitoringFailed, SessionState::Starting) => SessionState::Idle,
            (StatusCode::MonitoringFailed, s) => s,
        };
        if before != self.session.state {
            info!(from = ?before, to = ?self.session.state, "session state changed");
        }
    }

    // ---------- outbound requests ----------

    pub fn request_devices(&mut self, now: Instant) -> Outbound {
        self.notices
            .push("refreshing device list...", StatusType::Info, now);
        Outbound::GetDevices {}
    }

    pub fn request_apps(&mut self, now: Instant) -> Result<Outbound, SessionError> {
        let device_id = self.selected_device.clone().ok_or(SessionError::NoDevice)?;
        self.notices.push("fetching app list...", StatusType::Info, now);
        Ok(Outbound::GetApps { device_id })
    }

    /// Select a device. Drops the cached app list and app selection and asks
    /// for the new device's apps.
    pub fn select_device(&mut self, id: &str, now: Instant) -> Result<Outbound, SessionError> {
        if !self.devices.iter().any(|d| d.id == id) {
            return Err(SessionError::UnknownDevice(id.to_string()));
        }
        debug!(device = id, "device selected");
        self.clear_device_selection();
        self.selected_device = Some(id.to_string());
        self.request_apps(now)
    }

    fn clear_device_selection(&mut self) {
        self.selected_device = None;
        self.apps.clear();
        self.app_query.clear();
        self.selected_package = None;
    }

    pub fn select_package(&mut self, package: &str) {
        self.selected_package = Some(package.to_string());
    }

    pub fn start(&mut self, now: Instant) -> Result<Outbound, SessionError> {
        if self.session.state == SessionState::Starting {
            return Err(SessionError::StartPending);
        }
        let device_id = self.selected_device.clone().ok_or(SessionError::NoDevice)?;
        let package_name = self
            .selected_package
            .clone()
            .ok_or(SessionError::NoPackage)?;
        info!(device = %device_id, package = %package_name, "start monitoring requested");
        // a restart goes back through Starting; the collector stops the old run itself
        self.session = MonitoringSession {
            state: SessionState::Starting,
            device_id: Some(device_id.clone()),
            package_name: Some(package_name.clone()),
        };
        self.notices.push(
            format!("starting {package_name}..."),
            StatusType::Info,
            now,
        );
        Ok(Outbound::StartMonitoring {
            device_id,
            package_name,
        })
    }

    /// Ask the collector to stop. The state only changes on its acknowledgement.
    pub fn stop(&mut self) -> Outbound {
        info!("stop monitoring requested");
        Outbound::StopMonitoring {}
    }

    /// Report a rejected request as a notice.
    pub fn reject(&mut self, err: SessionError, now: Instant) {
        debug!(error = %err, "request rejected");
        self.notices.push(err.to_string(), StatusType::Error, now);
    }

    // ---------- time ----------

    /// Release a coalesced sample whose window has closed, and expire notices.
    pub fn tick(&mut self, now: Instant) {
        if let Some(sample) = self.coalescer.poll(now) {
            // stop doesn't cancel the window; the release is just dropped
            if self.session.is_active() {
                self.stats.ingest_sample(&sample);
                self.stats_view = self.stats.render();
                self.stats_renders += 1;
            }
        }
        self.notices.prune(now);
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
        self.stats_view = self.stats.render();
    }

    // ---------- views ----------

    pub fn session(&self) -> &MonitoringSession {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn selected_device(&self) -> Option<&str> {
        self.selected_device.as_deref()
    }

    pub fn apps(&self) -> &[AppInfo] {
        &self.apps
    }

    pub fn app_query(&self) -> &str {
        &self.app_query
    }

    pub fn set_app_query(&mut self, q: impl Into<String>) {
        self.app_query = q.into();
    }

    /// Cached apps matching the search box (case-insensitive, name or package).
    pub fn filtered_apps(&self) -> Vec<&AppInfo> {
        let q = self.app_query.trim().to_lowercase();
        self.apps
            .iter()
            .filter(|a| {
                q.is_empty()
                    || a.package_name.to_lowercase().contains(&q)
                    || a.app_name.to_lowercase().contains(&q)
            })
            .collect()
    }

    pub fn selected_package(&self) -> Option<&str> {
        self.selected_package.as_deref()
    }

    pub fn stats(&self) -> &StatsEngine {
        &self.stats
    }

    /// Last coalesced render of the statistics.
    pub fn stats_view(&self) -> &StatsView {
        &self.stats_view
    }

    pub fn stats_renders(&self) -> u64 {
        self.stats_renders
    }

    pub fn latest(&self) -> Option<&PerformanceSample> {
        self.latest.as_ref()
    }

    pub fn history(&self) -> &ChartHistory {
        &self.history
    }

    pub fn threads(&self) -> &ThreadView {
        &self.threads
    }

    pub fn threads_mut(&mut self) -> &mut ThreadView {
        &mut self.threads
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}
