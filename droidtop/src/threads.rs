//! Thread snapshot classification: state tally, type ranking, and the grouped,
//! ordered listing shown in the thread distribution panel.
//!
//! Everything here is recomputed from scratch per snapshot; no tid is tracked
//! across snapshots.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::types::ThreadDescriptor;

/// Run-state buckets, declared in display priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StateClass {
    Running,
    Sleeping,
    Other,
}

impl StateClass {
    pub fn of(state: &str) -> Self {
        match state {
            "R" => StateClass::Running,
            "S" => StateClass::Sleeping,
            _ => StateClass::Other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StateClass::Running => "Running",
            StateClass::Sleeping => "Sleeping",
            StateClass::Other => "Other",
        }
    }
}

/// Human text for a `ps` state code.
pub fn state_text(code: &str) -> &str {
    match code {
        "R" => "running",
        "S" => "sleeping",
        "D" => "uninterruptible",
        "T" => "stopped",
        "Z" => "zombie",
        "" => "unknown",
        other => other,
    }
}

/// Bucket a thread by name when the collector didn't categorize it.
pub fn categorize(name: &str) -> &'static str {
    if name.is_empty() || name == "Unknown" {
        return "unknown";
    }
    let n = name.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| n.contains(w));
    // whole-token match; a plain substring test for "ad" would claim every "...thread" name
    let ad_token = n
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|tok| tok == "ad" || tok == "ads");
    if has(&["jit", "gc", "finalizer", "signal", "reference", "binder"]) {
        "system"
    } else if has(&["okhttp", "network", "http", "socket"]) {
        "network"
    } else if ad_token || has(&["ironsource", "applovin", "mbridge", "csj"]) {
        "ads"
    } else if has(&["ui", "render", "chrome", "webview", "gpu"]) {
        "ui/render"
    } else if has(&["glide", "picasso", "image"]) {
        "image"
    } else if has(&["pool", "thread", "executor", "worker"]) {
        "thread pool"
    } else if has(&["firebase", "google", "gms"]) {
        "google services"
    } else if has(&["log", "analytic", "track", "report"]) {
        "logging/analytics"
    } else {
        "app"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateTally {
    pub total: usize,
    pub running: usize,
    pub sleeping: usize,
    pub other: usize,
}

pub fn tally_states(threads: &[ThreadDescriptor]) -> StateTally {
    let mut t = StateTally {
        total: threads.len(),
        ..Default::default()
    };
    for th in threads {
        match StateClass::of(&th.state) {
            StateClass::Running => t.running += 1,
            StateClass::Sleeping => t.sleeping += 1,
            StateClass::Other => t.other += 1,
        }
    }
    t
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThreadTypeBucket {
    pub kind: String,
    pub count: usize,
    /// Share of the snapshot, rounded to one decimal.
    pub percentage: f64,
}

/// Type buckets by descending count; equal counts keep first-seen order.
pub fn rank_types(threads: &[ThreadDescriptor]) -> Vec<ThreadTypeBucket> {
    let total = threads.len();
    if total == 0 {
        return Vec::new();
    }
    let mut slot: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for th in threads {
        match slot.get(th.kind.as_str()) {
            Some(&i) => counts[i].1 += 1,
            None => {
                slot.insert(th.kind.as_str(), counts.len());
                counts.push((th.kind.as_str(), 1));
            }
        }
    }
    // sort_by is stable, which is what carries the first-seen tie-break
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .map(|(kind, count)| ThreadTypeBucket {
            kind: kind.to_string(),
            count,
            percentage: (count as f64 / total as f64 * 1000.0).round() / 10.0,
        })
        .collect()
}

fn listing_order(a: &ThreadDescriptor, b: &ThreadDescriptor) -> Ordering {
    StateClass::of(&a.state)
        .cmp(&StateClass::of(&b.state))
        .then_with(|| a.kind.cmp(&b.kind))
        .then_with(|| a.tid.cmp(&b.tid))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingRow {
    State { class: StateClass, count: usize },
    Type { kind: String, count: usize },
    Thread(ThreadDescriptor),
}

/// Sort by (state class, type, tid) and interleave group header rows.
///
/// Header counts come from a tally over the whole listing, so each header
/// already knows its group size when it is emitted.
pub fn ordered_listing(threads: &[ThreadDescriptor]) -> Vec<ListingRow> {
    let mut sorted: Vec<&ThreadDescriptor> = threads.iter().collect();
    sorted.sort_by(|a, b| listing_order(a, b));

    let mut class_sizes: HashMap<StateClass, usize> = HashMap::new();
    let mut group_sizes: HashMap<(StateClass, &str), usize> = HashMap::new();
    for th in &sorted {
        let class = StateClass::of(&th.state);
        *class_sizes.entry(class).or_default() += 1;
        *group_sizes.entry((class, th.kind.as_str())).or_default() += 1;
    }

    let mut rows = Vec::with_capacity(sorted.len() + class_sizes.len() + group_sizes.len());
    let mut cur_class: Option<StateClass> = None;
    let mut cur_kind: Option<&str> = None;
    for th in sorted {
        let class = StateClass::of(&th.state);
        if cur_class != Some(class) {
            cur_class = Some(class);
            cur_kind = None;
            rows.push(ListingRow::State {
                class,
                count: class_sizes[&class],
            });
        }
        if cur_kind != Some(th.kind.as_str()) {
            cur_kind = Some(th.kind.as_str());
            rows.push(ListingRow::Type {
                kind: th.kind.clone(),
                count: group_sizes[&(class, th.kind.as_str())],
            });
        }
        rows.push(ListingRow::Thread(th.clone()));
    }
    rows
}

/// Latest thread snapshot plus the user's drill-down selection.
#[derive(Debug, Clone, Default)]
pub struct ThreadView {
    threads: Vec<ThreadDescriptor>,
    tally: StateTally,
    ranking: Vec<ThreadTypeBucket>,
    filter: Option<String>,
    listing: Vec<ListingRow>,
}

impl ThreadView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot. Any drill-down selection is dropped.
    pub fn update(&mut self, mut threads: Vec<ThreadDescriptor>) {
        for th in threads.iter_mut().filter(|t| t.kind.is_empty()) {
            th.kind = categorize(&th.name).to_string();
        }
        self.tally = tally_states(&threads);
        self.ranking = rank_types(&threads);
        self.threads = threads;
        self.filter = None;
        self.listing = ordered_listing(&self.threads);
    }

    /// Select a type; selecting the active one again clears the filter.
    pub fn toggle_filter(&mut self, kind: &str) {
        if self.filter.as_deref() == Some(kind) {
            self.filter = None;
            self.listing = ordered_listing(&self.threads);
        } else {
            let only: Vec<ThreadDescriptor> = self
                .threads
                .iter()
                .filter(|t| t.kind == kind)
                .cloned()
                .collect();
            self.listing = ordered_listing(&only);
            self.filter = Some(kind.to_string());
        }
    }

    pub fn tally(&self) -> StateTally {
        self.tally
    }

    pub fn ranking(&self) -> &[ThreadTypeBucket] {
        &self.ranking
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn listing(&self) -> &[ListingRow] {
        &self.listing
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn title(&self) -> String {
        match &self.filter {
            Some(kind) => {
                let n = self.threads.iter().filter(|t| &t.kind == kind).count();
                format!("{kind} threads ({n})")
            }
            None => "All threads".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn th(tid: u32, state: &str, kind: &str) -> ThreadDescriptor {
        ThreadDescriptor {
            tid,
            name: format!("t{tid}"),
            state: state.into(),
            kind: kind.into(),
        }
    }

    #[test]
    fn categorize_follows_keyword_precedence() {
        assert_eq!(categorize("HeapTaskDaemon"), "app");
        assert_eq!(categorize("Binder:1234_2"), "system");
        assert_eq!(categorize("OkHttp Dispatch"), "network");
        assert_eq!(categorize("RenderThread"), "ui/render");
        assert_eq!(categorize("ad-loader"), "ads");
        assert_eq!(categorize("download-thread"), "thread pool");
        assert_eq!(categorize("glide-source-thread-1"), "image");
        assert_eq!(categorize(""), "unknown");
    }

    #[test]
    fn other_state_codes_share_one_group() {
        let rows = ordered_listing(&[th(3, "Z", "app"), th(1, "D", "app"), th(2, "T", "sys")]);
        assert_eq!(
            rows[0],
            ListingRow::State {
                class: StateClass::Other,
                count: 3
            }
        );
        assert_eq!(
            rows[1],
            ListingRow::Type {
                kind: "app".into(),
                count: 2
            }
        );
        assert_eq!(rows.len(), 1 + 2 + 3);
    }

    #[test]
    fn update_fills_missing_kinds() {
        let mut v = ThreadView::new();
        v.update(vec![ThreadDescriptor {
            tid: 9,
            name: "OkHttp ConnectionPool".into(),
            state: "S".into(),
            kind: String::new(),
        }]);
        assert_eq!(v.ranking()[0].kind, "network");
    }
}
