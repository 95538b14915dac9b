//! Library surface of droidtop: the telemetry pipeline (session gate, rolling
//! statistics, thread classification, panel layout) plus the transport and UI.

pub mod app;
pub mod coalesce;
pub mod history;
pub mod layout;
pub mod profiles;
pub mod session;
pub mod stats;
pub mod threads;
pub mod types;
pub mod ui;
pub mod ws;
