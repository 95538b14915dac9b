//! Panel ordering and its persistence.
use droidtop::layout::{
    KvStore, LayoutStore, MemoryStore, PanelId, PanelLayout, PanelSpan, PANEL_ORDER_KEY,
};
use droidtop::stats::MetricChannel;

fn ids(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

fn small() -> PanelLayout {
    PanelLayout::new(vec![
        PanelId::Controls,
        PanelId::Statistics,
        PanelId::Chart(MetricChannel::Cpu),
        PanelId::Threads,
    ])
}

#[test]
fn saved_order_never_contains_the_fixed_panel() {
    let mut store = LayoutStore::new(MemoryStore::default());
    store.save(PanelLayout::default().panels()).unwrap();
    let saved = store.restore().unwrap();
    assert!(!saved.iter().any(|s| s == "controls"));
    assert_eq!(saved.len(), PanelLayout::default().panels().len() - 1);
    assert_eq!(saved[0], "statistics");
}

#[test]
fn restore_reapplies_a_dragged_order() {
    let mut layout = small();
    assert!(layout.move_before(PanelId::Threads, Some(PanelId::Statistics)));
    let mut store = LayoutStore::new(MemoryStore::default());
    store.save(&layout.order()).unwrap();

    let mut fresh = small();
    assert!(store.restore_into(&mut fresh));
    assert_eq!(fresh, layout);
    assert_eq!(fresh.panels()[0], PanelId::Controls);
}

#[test]
fn fixed_panel_keeps_its_slot_even_if_named() {
    let mut layout = small();
    layout.apply(&ids(&["thread_distribution", "controls", "cpu_chart", "statistics"]));
    assert_eq!(
        layout.panels(),
        &[
            PanelId::Controls,
            PanelId::Threads,
            PanelId::Chart(MetricChannel::Cpu),
            PanelId::Statistics,
        ]
    );
}

#[test]
fn unknown_ids_are_skipped_and_unnamed_panels_lead() {
    let mut layout = small();
    layout.apply(&ids(&["gpu_chart", "statistics"]));
    assert_eq!(
        layout.panels(),
        &[
            PanelId::Controls,
            PanelId::Chart(MetricChannel::Cpu),
            PanelId::Threads,
            PanelId::Statistics,
        ]
    );
}

#[test]
fn corrupted_record_leaves_layout_untouched() {
    let mut mem = MemoryStore::default();
    mem.set(PANEL_ORDER_KEY, "{not json".into()).unwrap();
    let store = LayoutStore::new(mem);
    assert_eq!(store.restore(), None);

    let mut layout = PanelLayout::default();
    assert!(!store.restore_into(&mut layout));
    assert_eq!(layout, PanelLayout::default());
}

#[test]
fn missing_record_restores_nothing() {
    let store = LayoutStore::new(MemoryStore::default());
    assert_eq!(store.restore(), None);
}

#[test]
fn drop_lands_before_the_nearest_lower_midpoint() {
    let spans = [
        PanelSpan { id: PanelId::Controls, top: 0, height: 9 },
        PanelSpan { id: PanelId::Statistics, top: 9, height: 9 },
        PanelSpan { id: PanelId::Chart(MetricChannel::Cpu), top: 18, height: 6 },
        PanelSpan { id: PanelId::Threads, top: 24, height: 12 },
    ];
    // above the stats midpoint (13.5)
    assert_eq!(
        PanelLayout::drop_target(PanelId::Threads, 11, &spans),
        Some(PanelId::Statistics)
    );
    // the fixed panel is never a target
    assert_eq!(
        PanelLayout::drop_target(PanelId::Threads, 1, &spans),
        Some(PanelId::Statistics)
    );
    // below everything: append
    assert_eq!(PanelLayout::drop_target(PanelId::Statistics, 35, &spans), None);

    let mut layout = small();
    assert!(layout.drop_at(PanelId::Statistics, 35, &spans));
    assert_eq!(*layout.panels().last().unwrap(), PanelId::Statistics);
    assert!(!layout.drop_at(PanelId::Controls, 30, &spans));
}

#[test]
fn panel_ids_round_trip_through_their_names() {
    for id in PanelLayout::default().panels() {
        assert_eq!(id.as_str().parse::<PanelId>(), Ok(*id));
    }
    assert!("nope".parse::<PanelId>().is_err());
}
