//! Bounded per-channel series for the sparkline panels.

use std::collections::VecDeque;

use crate::stats::MetricChannel;
use crate::types::PerformanceSample;

/// Points kept per chart.
pub const CHART_POINTS: usize = 50;

pub fn push_capped<T>(dq: &mut VecDeque<T>, v: T, cap: usize) {
    if dq.len() == cap {
        dq.pop_front();
    }
    dq.push_back(v);
}

// One deque of (label, value) per channel, indexed like MetricChannel::ALL
pub struct ChartHistory {
    series: Vec<VecDeque<(String, f64)>>,
    cap: usize,
}

impl ChartHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            series: MetricChannel::ALL
                .iter()
                .map(|_| VecDeque::with_capacity(cap))
                .collect(),
            cap,
        }
    }

    // Optional channels only get a point when the sample carried a number
    pub fn push_sample(&mut self, s: &PerformanceSample) {
        let label = time_label(&s.time);
        for (i, ch) in MetricChannel::ALL.iter().enumerate() {
            if let Some(v) = ch.value_of(s) {
                push_capped(&mut self.series[i], (label.clone(), v), self.cap);
            }
        }
    }

    pub fn series(&self, ch: MetricChannel) -> &VecDeque<(String, f64)> {
        let i = MetricChannel::ALL
            .iter()
            .position(|c| *c == ch)
            .unwrap_or_default();
        &self.series[i]
    }

    pub fn latest(&self, ch: MetricChannel) -> Option<f64> {
        self.series(ch).back().map(|(_, v)| *v)
    }

    /// Values scaled for a sparkline (hundredths, so sub-unit disk rates still show).
    pub fn spark_data(&self, ch: MetricChannel, max_points: usize) -> Vec<u64> {
        let s = self.series(ch);
        let start = s.len().saturating_sub(max_points);
        s.iter()
            .skip(start)
            .map(|(_, v)| (v.max(0.0) * 100.0).round() as u64)
            .collect()
    }
}

impl Default for ChartHistory {
    fn default() -> Self {
        Self::new(CHART_POINTS)
    }
}

/// "2024-05-01 10:00:03" -> "10:00:03"; anything unparseable is shown as sent.
pub fn time_label(raw: &str) -> String {
    chrono::NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M:%S")
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|_| raw.to_string())
}
