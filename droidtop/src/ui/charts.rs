//! Per-channel sparklines with the latest value in the title.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Sparkline},
};

use crate::history::ChartHistory;
use crate::stats::MetricChannel;
use crate::ui::theme;

pub fn channel_color(ch: MetricChannel) -> Color {
    match ch {
        MetricChannel::Cpu => theme::CPU,
        MetricChannel::Memory => theme::MEMORY,
        MetricChannel::Fps => theme::FPS,
        MetricChannel::Threads => theme::THREADS,
        MetricChannel::DiskReads => theme::DISK_READS,
        MetricChannel::DiskWrites => theme::DISK_WRITES,
    }
}

fn fmt_latest(ch: MetricChannel, v: f64) -> String {
    match ch {
        MetricChannel::Cpu => format!("{v:.1}%"),
        MetricChannel::Memory => format!("{v:.1}MB"),
        MetricChannel::Fps => format!("{v:.0}FPS"),
        MetricChannel::Threads => format!("{v:.0}"),
        MetricChannel::DiskReads | MetricChannel::DiskWrites => format!("{v:.1}MB"),
    }
}

pub fn draw_chart(f: &mut ratatui::Frame<'_>, area: Rect, ch: MetricChannel, hist: &ChartHistory) {
    let series = hist.series(ch);
    let title = match (series.back(), series.front()) {
        (Some((last_t, v)), Some((first_t, _))) => format!(
            "{} (now: {}) {first_t} → {last_t}",
            ch.title(),
            fmt_latest(ch, *v)
        ),
        _ => format!("{} (no data)", ch.title()),
    };
    let data = hist.spark_data(ch, area.width.saturating_sub(2) as usize);
    let mut spark = Sparkline::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .data(&data)
        .style(Style::default().fg(channel_color(ch)));
    // fps has a natural ceiling; the rest autoscale
    if ch == MetricChannel::Fps {
        spark = spark.max(60 * 100);
    }
    f.render_widget(spark, area);
}
