//! Types that mirror the collector's event schema.
//!
//! Every frame is a JSON envelope `{"event": "...", "data": {...}}`. Inbound
//! payloads are decoded leniently: the collector is a scripting-language
//! service and will happily send `"12"` where a number is expected, or drop
//! optional fields entirely.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub version: String,
}

impl Device {
    pub fn label(&self) -> String {
        format!("{} ({} - Android {})", self.name, self.brand, self.version)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub package_name: String,
    #[serde(default)]
    pub app_name: String,
    // older collectors send a preformatted label only
    #[serde(default)]
    pub display_name: Option<String>,
}

impl AppInfo {
    pub fn label(&self) -> String {
        match &self.display_name {
            Some(d) if !d.is_empty() => d.clone(),
            _ if self.app_name.is_empty() => self.package_name.clone(),
            _ => format!("{} ({})", self.app_name, self.package_name),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DevicesList {
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppsList {
    #[serde(default)]
    pub apps: Vec<AppInfo>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatusType {
    Success,
    Error,
    // unknown types ("warning", ...) still become a notice
    #[default]
    #[serde(other)]
    Info,
}

/// Explicit session acknowledgement carried by newer collectors.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    MonitoringStarted,
    MonitoringStopped,
    MonitoringFailed,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Status {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: StatusType,
    #[serde(default)]
    pub code: Option<StatusCode>,
}

impl Status {
    /// Resolve the acknowledgement this status carries, if any.
    ///
    /// Collectors that predate `code` only signal transitions through the
    /// message text, so fall back to matching it.
    pub fn ack(&self) -> Option<StatusCode> {
        if self.code.is_some() {
            return self.code;
        }
        let msg = self.message.to_lowercase();
        match self.kind {
            StatusType::Success if msg.contains("开始监控") || msg.contains("started") => {
                Some(StatusCode::MonitoringStarted)
            }
            StatusType::Info if msg.contains("已停止") || msg.contains("stopped") => {
                Some(StatusCode::MonitoringStopped)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonitoringStarted {
    pub package_name: String,
    #[serde(default)]
    pub platform: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct PerformanceSample {
    #[serde(default)]
    pub time: String,
    #[serde(default, deserialize_with = "coerce_f64")]
    pub cpu: f64,
    #[serde(default, deserialize_with = "coerce_f64")]
    pub system_cpu: f64,
    #[serde(default, deserialize_with = "coerce_f64")]
    pub memory: f64,
    #[serde(default, deserialize_with = "coerce_f64")]
    pub system_memory_used: f64,
    #[serde(default, deserialize_with = "coerce_f64")]
    pub system_memory_total: f64,
    #[serde(default, deserialize_with = "coerce_f64")]
    pub threads: f64,
    // zero when nothing was composited during the sample window
    #[serde(default, deserialize_with = "coerce_f64")]
    pub fps: f64,
    #[serde(default, deserialize_with = "numeric_or_none")]
    pub disk_reads: Option<f64>,
    #[serde(default, deserialize_with = "numeric_or_none")]
    pub disk_writes: Option<f64>,
    #[serde(default, deserialize_with = "numeric_or_none")]
    pub cpu_cores: Option<f64>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ThreadDescriptor {
    #[serde(deserialize_with = "tid_from_any")]
    pub tid: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: String,
    // absent on collectors that don't categorize; filled in by the pipeline
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ThreadDetails {
    #[serde(default, deserialize_with = "lenient_threads")]
    pub threads: Vec<ThreadDescriptor>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Events pushed by the collector, plus the transport's own lifecycle.
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Inbound {
    DevicesList(DevicesList),
    AppsList(AppsList),
    Status(Status),
    MonitoringStarted(MonitoringStarted),
    PerformanceData(PerformanceSample),
    ThreadDetails(ThreadDetails),
    Connect,
    Disconnect,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Outbound {
    StartMonitoring {
        device_id: String,
        package_name: String,
    },
    StopMonitoring {},
    GetDevices {},
    GetApps {
        device_id: String,
    },
}

/// Mandatory channels: anything that isn't a number (or numeric string) becomes 0.
fn coerce_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    })
}

/// Optional channels: only real JSON numbers count as a sample.
fn numeric_or_none<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::Number(n) => n.as_f64().filter(|x| x.is_finite()),
        _ => None,
    })
}

fn tid_from_any<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    let v = Value::deserialize(d)?;
    match v {
        Value::Number(n) => n
            .as_u64()
            .and_then(|x| u32::try_from(x).ok())
            .ok_or_else(|| serde::de::Error::custom(format!("tid out of range: {n}"))),
        Value::String(s) => s
            .trim()
            .parse::<u32>()
            .map_err(|_| serde::de::Error::custom(format!("tid is not numeric: {s:?}"))),
        other => Err(serde::de::Error::custom(format!(
            "tid must be a number, got {other}"
        ))),
    }
}

/// A bad row costs that row only, not the whole snapshot.
fn lenient_threads<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<ThreadDescriptor>, D::Error> {
    let rows = Option::<Vec<Value>>::deserialize(d)?.unwrap_or_default();
    Ok(rows
        .into_iter()
        .filter_map(|row| match ThreadDescriptor::deserialize(&row) {
            Ok(th) => Some(th),
            Err(e) => {
                debug!(error = %e, %row, "skipping undecodable thread row");
                None
            }
        })
        .collect())
}
