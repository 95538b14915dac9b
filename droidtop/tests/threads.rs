//! Thread classification, ranking and the grouped listing.
use droidtop::threads::{
    ordered_listing, rank_types, tally_states, ListingRow, StateClass, ThreadView,
};
use droidtop::types::ThreadDescriptor;

fn th(tid: u32, state: &str, kind: &str) -> ThreadDescriptor {
    ThreadDescriptor {
        tid,
        name: format!("thread-{tid}"),
        state: state.into(),
        kind: kind.into(),
    }
}

fn reference() -> Vec<ThreadDescriptor> {
    vec![th(1, "R", "UI"), th(2, "S", "UI"), th(3, "R", "GC")]
}

fn tids(rows: &[ListingRow]) -> Vec<u32> {
    rows.iter()
        .filter_map(|r| match r {
            ListingRow::Thread(t) => Some(t.tid),
            _ => None,
        })
        .collect()
}

#[test]
fn reference_snapshot() {
    let threads = reference();
    let t = tally_states(&threads);
    assert_eq!((t.total, t.running, t.sleeping, t.other), (3, 2, 1, 0));

    let ranking = rank_types(&threads);
    assert_eq!(ranking.len(), 2);
    assert_eq!((ranking[0].kind.as_str(), ranking[0].count, ranking[0].percentage), ("UI", 2, 66.7));
    assert_eq!((ranking[1].kind.as_str(), ranking[1].count, ranking[1].percentage), ("GC", 1, 33.3));

    let rows = ordered_listing(&threads);
    assert_eq!(tids(&rows), vec![3, 1, 2]);
    assert_eq!(
        rows,
        vec![
            ListingRow::State { class: StateClass::Running, count: 2 },
            ListingRow::Type { kind: "GC".into(), count: 1 },
            ListingRow::Thread(th(3, "R", "GC")),
            ListingRow::Type { kind: "UI".into(), count: 1 },
            ListingRow::Thread(th(1, "R", "UI")),
            ListingRow::State { class: StateClass::Sleeping, count: 1 },
            ListingRow::Type { kind: "UI".into(), count: 1 },
            ListingRow::Thread(th(2, "S", "UI")),
        ]
    );
}

#[test]
fn other_covers_every_unrecognised_state() {
    let threads = vec![th(1, "D", "a"), th(2, "T", "a"), th(3, "Z", "a"), th(4, "X", "a"), th(5, "", "a")];
    let t = tally_states(&threads);
    assert_eq!((t.running, t.sleeping, t.other), (0, 0, 5));
}

#[test]
fn ranking_ties_keep_first_seen_order() {
    let threads = vec![
        th(1, "S", "net"),
        th(2, "S", "gc"),
        th(3, "S", "ui"),
        th(4, "S", "gc"),
        th(5, "S", "ui"),
        th(6, "S", "net"),
    ];
    let kinds: Vec<String> = rank_types(&threads).into_iter().map(|b| b.kind).collect();
    assert_eq!(kinds, vec!["net", "gc", "ui"]);
}

#[test]
fn types_are_case_sensitive() {
    let threads = vec![th(1, "S", "UI"), th(2, "S", "ui")];
    assert_eq!(rank_types(&threads).len(), 2);
}

#[test]
fn empty_snapshot_is_empty_everywhere() {
    assert!(rank_types(&[]).is_empty());
    assert!(ordered_listing(&[]).is_empty());
    assert_eq!(tally_states(&[]).total, 0);
}

#[test]
fn tid_sorts_numerically() {
    let rows = ordered_listing(&[th(100, "S", "a"), th(9, "S", "a"), th(20, "S", "a")]);
    assert_eq!(tids(&rows), vec![9, 20, 100]);
}

#[test]
fn filter_toggle_round_trips() {
    let mut v = ThreadView::new();
    v.update(reference());
    let unfiltered = v.listing().to_vec();

    v.toggle_filter("UI");
    assert_eq!(v.filter(), Some("UI"));
    assert_eq!(tids(v.listing()), vec![1, 2]);
    assert_eq!(v.title(), "UI threads (2)");

    v.toggle_filter("UI");
    assert_eq!(v.filter(), None);
    assert_eq!(v.listing(), unfiltered.as_slice());
}

#[test]
fn switching_filter_goes_straight_to_the_new_type() {
    let mut v = ThreadView::new();
    v.update(reference());
    v.toggle_filter("UI");
    v.toggle_filter("GC");
    assert_eq!(v.filter(), Some("GC"));
    assert_eq!(tids(v.listing()), vec![3]);
}

#[test]
fn new_snapshot_clears_the_filter() {
    let mut v = ThreadView::new();
    v.update(reference());
    v.toggle_filter("GC");
    v.update(reference());
    assert_eq!(v.filter(), None);
    assert_eq!(tids(v.listing()), vec![3, 1, 2]);
}
