//! Running aggregates per metric channel and their display formatting.

use crate::types::PerformanceSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricChannel {
    Cpu,
    Memory,
    Fps,
    Threads,
    DiskReads,
    DiskWrites,
}

impl MetricChannel {
    pub const ALL: [MetricChannel; 6] = [
        MetricChannel::Cpu,
        MetricChannel::Memory,
        MetricChannel::Fps,
        MetricChannel::Threads,
        MetricChannel::DiskReads,
        MetricChannel::DiskWrites,
    ];

    pub fn key(self) -> &'static str {
        match self {
            MetricChannel::Cpu => "cpu",
            MetricChannel::Memory => "memory",
            MetricChannel::Fps => "fps",
            MetricChannel::Threads => "threads",
            MetricChannel::DiskReads => "disk_reads",
            MetricChannel::DiskWrites => "disk_writes",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            MetricChannel::Cpu => "CPU",
            MetricChannel::Memory => "Memory",
            MetricChannel::Fps => "FPS",
            MetricChannel::Threads => "Threads",
            MetricChannel::DiskReads => "Disk reads",
            MetricChannel::DiskWrites => "Disk writes",
        }
    }

    /// Optional channels drop non-numeric samples instead of counting them as 0.
    pub fn is_optional(self) -> bool {
        matches!(self, MetricChannel::DiskReads | MetricChannel::DiskWrites)
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Read this channel out of a sample. `None` means "no sample for this channel".
    pub fn value_of(self, s: &PerformanceSample) -> Option<f64> {
        match self {
            MetricChannel::Cpu => Some(s.cpu),
            MetricChannel::Memory => Some(s.memory),
            MetricChannel::Fps => Some(s.fps),
            MetricChannel::Threads => Some(s.threads),
            MetricChannel::DiskReads => s.disk_reads,
            MetricChannel::DiskWrites => s.disk_writes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunningAggregate {
    pub current: f64,
    pub sum: f64,
    pub count: u64,
    pub max: f64,
    // only tracked for fps
    pub min: f64,
}

impl Default for RunningAggregate {
    fn default() -> Self {
        Self {
            current: 0.0,
            sum: 0.0,
            count: 0,
            max: 0.0,
            min: f64::INFINITY,
        }
    }
}

impl RunningAggregate {
    pub fn avg(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    fn push(&mut self, v: f64) {
        self.current = v;
        self.sum += v;
        self.count += 1;
        self.max = self.max.max(v);
        self.min = self.min.min(v);
    }
}

/// Aggregates for every channel of one monitoring session.
#[derive(Debug, Clone, Default)]
pub struct StatsEngine {
    aggs: [RunningAggregate; 6],
}

impl StatsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ch: MetricChannel) -> &RunningAggregate {
        &self.aggs[ch.index()]
    }

    /// Feed one value. `None` is a non-numeric input: dropped for optional
    /// channels, counted as 0 for mandatory ones.
    pub fn ingest(&mut self, ch: MetricChannel, value: Option<f64>) {
        let v = match value.filter(|v| v.is_finite()) {
            Some(v) => v,
            None if ch.is_optional() => return,
            None => 0.0,
        };
        // no compositor activity shows up as fps 0; keep it out of the stats
        if ch == MetricChannel::Fps && v <= 0.0 {
            return;
        }
        self.aggs[ch.index()].push(v);
    }

    pub fn ingest_sample(&mut self, s: &PerformanceSample) {
        for ch in MetricChannel::ALL {
            self.ingest(ch, ch.value_of(s));
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn render(&self) -> StatsView {
        let rows = MetricChannel::ALL
            .iter()
            .map(|&ch| self.render_channel(ch))
            .collect();
        StatsView { rows }
    }

    fn render_channel(&self, ch: MetricChannel) -> StatRow {
        let a = self.get(ch);
        let extreme_label = if ch == MetricChannel::Fps { "min" } else { "max" };
        let Some(avg) = a.avg() else {
            return StatRow {
                channel: ch,
                current: PLACEHOLDER.into(),
                avg: PLACEHOLDER.into(),
                extreme: PLACEHOLDER.into(),
                extreme_label,
            };
        };
        let (current, avg, extreme) = match ch {
            MetricChannel::Cpu => (
                format!("{:.1}%", a.current),
                format!("{avg:.1}%"),
                format!("{:.1}%", a.max),
            ),
            MetricChannel::Memory => (
                format!("{:.1}MB", a.current),
                format!("{avg:.1}MB"),
                format!("{:.1}MB", a.max),
            ),
            MetricChannel::Fps => {
                let min = if a.min.is_finite() { a.min } else { 0.0 };
                (
                    format!("{:.0}FPS", a.current),
                    format!("{avg:.1}FPS"),
                    format!("{min:.0}FPS"),
                )
            }
            MetricChannel::Threads => (
                format!("{:.0}", a.current),
                format!("{avg:.1}"),
                format!("{:.0}", a.max),
            ),
            MetricChannel::DiskReads | MetricChannel::DiskWrites => (
                format!("{:.2}MB", a.current),
                format!("{avg:.2}MB"),
                format!("{:.2}MB", a.max),
            ),
        };
        StatRow {
            channel: ch,
            current,
            avg,
            extreme,
            extreme_label,
        }
    }
}

const PLACEHOLDER: &str = "--";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatRow {
    pub channel: MetricChannel,
    pub current: String,
    pub avg: String,
    pub extreme: String,
    /// "max" for most channels, "min" for fps.
    pub extreme_label: &'static str,
}

/// Display-ready statistics, one row per channel in `MetricChannel::ALL` order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsView {
    pub rows: Vec<StatRow>,
}

impl StatsView {
    pub fn row(&self, ch: MetricChannel) -> Option<&StatRow> {
        self.rows.iter().find(|r| r.channel == ch)
    }
}
