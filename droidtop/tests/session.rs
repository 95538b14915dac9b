//! Session lifecycle driven by collector events.
use std::time::{Duration, Instant};

use droidtop::session::{SessionController, SessionError, SessionState};
use droidtop::stats::MetricChannel;
use droidtop::types::{Inbound, Outbound, StatusType};

fn ev(json: &str) -> Inbound {
    serde_json::from_str(json).unwrap()
}

fn devices() -> Inbound {
    ev(r#"{"event":"devices_list","data":{"devices":[
        {"id":"emulator-5554","name":"Pixel 7","brand":"google","version":"14"}]}}"#)
}

fn apps() -> Inbound {
    ev(r#"{"event":"apps_list","data":{"apps":[
        {"package_name":"com.example.shop","app_name":"Shop"},
        {"package_name":"com.example.maps","app_name":"Maps"}]}}"#)
}

fn perf(cpu: u32) -> Inbound {
    ev(&format!(
        r#"{{"event":"performance_data","data":{{"time":"2024-05-01 10:00:00","cpu":{cpu},"memory":"300.5","threads":42,"fps":60}}}}"#
    ))
}

fn threads() -> Inbound {
    ev(r#"{"event":"thread_details","data":{"threads":[
        {"tid":1,"name":"main","state":"R","type":"UI"},
        {"tid":"2","name":"RenderThread","state":"S","type":"UI"},
        {"tid":3,"name":"HeapTaskDaemon","state":"R","type":"GC"}]}}"#)
}

fn status(json_data: &str) -> Inbound {
    ev(&format!(r#"{{"event":"status","data":{json_data}}}"#))
}

/// Connected, device and app selected, start sent.
fn starting(t0: Instant) -> SessionController {
    let mut ctl = SessionController::new();
    assert_eq!(ctl.handle(Inbound::Connect, t0), vec![Outbound::GetDevices {}]);
    ctl.handle(devices(), t0);
    ctl.select_device("emulator-5554", t0).unwrap();
    ctl.handle(apps(), t0);
    ctl.select_package("com.example.shop");
    assert_eq!(
        ctl.start(t0),
        Ok(Outbound::StartMonitoring {
            device_id: "emulator-5554".into(),
            package_name: "com.example.shop".into(),
        })
    );
    assert_eq!(ctl.state(), SessionState::Starting);
    ctl
}

fn active(t0: Instant) -> SessionController {
    let mut ctl = starting(t0);
    ctl.handle(status(r#"{"message":"ok","type":"success","code":"monitoring_started"}"#), t0);
    assert_eq!(ctl.state(), SessionState::Active);
    ctl
}

#[test]
fn idle_ignores_snapshots() {
    let t0 = Instant::now();
    let mut ctl = SessionController::new();
    ctl.handle(perf(50), t0);
    ctl.handle(threads(), t0);
    ctl.tick(t0 + Duration::from_secs(1));

    assert_eq!(ctl.stats().get(MetricChannel::Cpu).count, 0);
    assert!(ctl.threads().is_empty());
    assert!(ctl.latest().is_none());
    assert_eq!(ctl.stats_renders(), 0);
}

#[test]
fn starting_ignores_snapshots_until_acknowledged() {
    let t0 = Instant::now();
    let mut ctl = starting(t0);
    ctl.handle(perf(50), t0);
    ctl.tick(t0 + Duration::from_secs(1));
    assert_eq!(ctl.stats().get(MetricChannel::Cpu).count, 0);
}

#[test]
fn burst_renders_once_with_the_last_sample() {
    let t0 = Instant::now();
    let mut ctl = active(t0);
    for i in 0..10u32 {
        let now = t0 + Duration::from_millis(u64::from(i) * 10);
        ctl.handle(perf(i + 1), now);
        ctl.tick(now);
    }
    assert_eq!(ctl.stats_renders(), 0);
    ctl.tick(t0 + Duration::from_millis(600));
    ctl.tick(t0 + Duration::from_millis(1200));

    assert_eq!(ctl.stats_renders(), 1);
    let cpu = ctl.stats().get(MetricChannel::Cpu);
    assert_eq!((cpu.count, cpu.current), (1, 10.0));
    assert_eq!(ctl.stats_view().row(MetricChannel::Cpu).unwrap().current, "10.0%");
    assert_eq!(ctl.stats().get(MetricChannel::Memory).current, 300.5);
    // every sample still reaches the chart
    assert_eq!(ctl.history().series(MetricChannel::Cpu).len(), 10);
}

#[test]
fn release_after_stop_is_dropped() {
    let t0 = Instant::now();
    let mut ctl = active(t0);
    ctl.handle(perf(70), t0);
    assert_eq!(ctl.stop(), Outbound::StopMonitoring {});
    ctl.handle(status(r#"{"message":"done","type":"info","code":"monitoring_stopped"}"#), t0);
    assert_eq!(ctl.state(), SessionState::Idle);

    ctl.tick(t0 + Duration::from_secs(1));
    assert_eq!(ctl.stats().get(MetricChannel::Cpu).count, 0);
    assert_eq!(ctl.stats_renders(), 0);
}

#[test]
fn thread_snapshot_replaces_the_view() {
    let t0 = Instant::now();
    let mut ctl = active(t0);
    ctl.handle(threads(), t0);
    let tally = ctl.threads().tally();
    assert_eq!((tally.running, tally.sleeping, tally.other), (2, 1, 0));
    assert_eq!(ctl.threads().ranking()[0].kind, "UI");
}

#[test]
fn legacy_messages_drive_the_same_transitions() {
    let t0 = Instant::now();

    let mut coded = starting(t0);
    coded.handle(status(r#"{"message":"x","type":"success","code":"monitoring_started"}"#), t0);
    let mut legacy = starting(t0);
    legacy.handle(status(r#"{"message":"开始监控 com.example.shop","type":"success"}"#), t0);
    assert_eq!(coded.state(), SessionState::Active);
    assert_eq!(legacy.state(), coded.state());

    coded.handle(status(r#"{"message":"x","type":"info","code":"monitoring_stopped"}"#), t0);
    legacy.handle(status(r#"{"message":"监控已停止","type":"info"}"#), t0);
    assert_eq!(coded.state(), SessionState::Idle);
    assert_eq!(legacy.state(), coded.state());
}

#[test]
fn plain_notices_do_not_move_the_state() {
    let t0 = Instant::now();
    let mut ctl = active(t0);
    ctl.handle(status(r#"{"message":"collector busy","type":"info"}"#), t0);
    ctl.handle(status(r#"{"message":"adb hiccup","type":"error"}"#), t0);
    assert_eq!(ctl.state(), SessionState::Active);
    assert_eq!(ctl.notices().current().unwrap().kind, StatusType::Error);
}

#[test]
fn failed_start_returns_to_idle() {
    let t0 = Instant::now();
    let mut ctl = starting(t0);
    ctl.handle(status(r#"{"message":"app not running","type":"error"}"#), t0);
    assert_eq!(ctl.state(), SessionState::Idle);

    let mut ctl = starting(t0);
    ctl.handle(status(r#"{"message":"x","type":"error","code":"monitoring_failed"}"#), t0);
    assert_eq!(ctl.state(), SessionState::Idle);
}

#[test]
fn monitoring_started_event_activates() {
    let t0 = Instant::now();
    let mut ctl = starting(t0);
    ctl.handle(
        ev(r#"{"event":"monitoring_started","data":{"package_name":"com.example.shop","platform":"android"}}"#),
        t0,
    );
    assert!(ctl.session().is_active());
}

#[test]
fn monitoring_started_for_another_client_is_ignored() {
    let t0 = Instant::now();
    let foreign = r#"{"event":"monitoring_started","data":{"package_name":"com.other"}}"#;

    let mut idle = SessionController::new();
    idle.handle(ev(foreign), t0);
    assert_eq!(idle.state(), SessionState::Idle);
    assert_eq!(idle.session().package_name, None);
    idle.handle(perf(40), t0);
    idle.tick(t0 + Duration::from_secs(1));
    assert_eq!(idle.stats().get(MetricChannel::Cpu).count, 0);

    // a pending start for a different package isn't acknowledged either
    let mut ctl = starting(t0);
    ctl.handle(ev(foreign), t0);
    assert_eq!(ctl.state(), SessionState::Starting);
    assert_eq!(ctl.session().package_name.as_deref(), Some("com.example.shop"));
}

#[test]
fn start_needs_a_selection_and_no_pending_start() {
    let t0 = Instant::now();
    let mut ctl = SessionController::new();
    assert_eq!(ctl.start(t0), Err(SessionError::NoDevice));
    ctl.handle(devices(), t0);
    ctl.select_device("emulator-5554", t0).unwrap();
    assert_eq!(ctl.start(t0), Err(SessionError::NoPackage));

    let mut ctl = starting(t0);
    assert_eq!(ctl.start(t0), Err(SessionError::StartPending));
}

#[test]
fn list_errors_clear_the_list_and_notify() {
    let t0 = Instant::now();
    let mut ctl = SessionController::new();
    ctl.handle(devices(), t0);
    ctl.handle(ev(r#"{"event":"devices_list","data":{"devices":[],"error":"adb not found"}}"#), t0);
    assert!(ctl.devices().is_empty());
    assert!(ctl.selected_device().is_none());
    let n = ctl.notices().current().unwrap();
    assert_eq!((n.message.as_str(), n.kind), ("adb not found", StatusType::Error));

    ctl.handle(devices(), t0);
    ctl.select_device("emulator-5554", t0).unwrap();
    ctl.handle(apps(), t0);
    ctl.handle(ev(r#"{"event":"apps_list","data":{"error":"device offline"}}"#), t0);
    assert!(ctl.apps().is_empty());
    assert_eq!(ctl.notices().current().unwrap().message, "device offline");
}

#[test]
fn selecting_a_device_resets_the_app_picker() {
    let t0 = Instant::now();
    let mut ctl = SessionController::new();
    ctl.handle(devices(), t0);
    ctl.select_device("emulator-5554", t0).unwrap();
    ctl.handle(apps(), t0);
    ctl.set_app_query("MAP");
    assert_eq!(ctl.filtered_apps().len(), 1);
    ctl.select_package("com.example.maps");

    let req = ctl.select_device("emulator-5554", t0).unwrap();
    assert_eq!(req, Outbound::GetApps { device_id: "emulator-5554".into() });
    assert!(ctl.apps().is_empty());
    assert_eq!(ctl.app_query(), "");
    assert!(ctl.selected_package().is_none());
    assert!(matches!(ctl.select_device("ghost", t0), Err(SessionError::UnknownDevice(_))));
}

#[test]
fn preselection_is_applied_when_lists_arrive() {
    let t0 = Instant::now();
    let mut ctl = SessionController::new()
        .with_preselection(Some("emulator-5554".into()), Some("com.example.maps".into()));
    let out = ctl.handle(devices(), t0);
    assert_eq!(out, vec![Outbound::GetApps { device_id: "emulator-5554".into() }]);
    ctl.handle(apps(), t0);
    assert_eq!(ctl.selected_package(), Some("com.example.maps"));
}

#[test]
fn disconnect_keeps_state_but_warns_when_active() {
    let t0 = Instant::now();
    let mut ctl = active(t0);
    ctl.handle(Inbound::Disconnect, t0);
    assert!(!ctl.is_connected());
    assert_eq!(ctl.state(), SessionState::Active);
    assert_eq!(ctl.notices().current().unwrap().kind, StatusType::Error);
}

#[test]
fn notices_expire() {
    let t0 = Instant::now();
    let mut ctl = SessionController::new();
    ctl.handle(Inbound::Connect, t0);
    assert!(ctl.notices().current().is_some());
    ctl.tick(t0 + Duration::from_secs(6));
    assert!(ctl.notices().current().is_none());
}
