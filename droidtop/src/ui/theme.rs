//! Shared UI theme constants.

use ratatui::style::Color;

use crate::threads::StateClass;
use crate::types::StatusType;

// Scrollbar colors
pub const SB_ARROW: Color = Color::Rgb(170, 170, 180);
pub const SB_TRACK: Color = Color::Rgb(170, 170, 180);
pub const SB_THUMB: Color = Color::Rgb(170, 170, 180);

pub const CPU: Color = Color::Rgb(255, 59, 48);
pub const MEMORY: Color = Color::Rgb(0, 122, 255);
pub const FPS: Color = Color::Rgb(52, 199, 89);
pub const THREADS: Color = Color::Rgb(255, 149, 0);
pub const DISK_READS: Color = Color::Rgb(175, 82, 222);
pub const DISK_WRITES: Color = Color::Rgb(255, 45, 146);

pub const SELECTED: Color = Color::Rgb(0, 122, 255);
pub const DIM: Color = Color::Rgb(134, 134, 139);

pub fn state_color(class: StateClass) -> Color {
    match class {
        StateClass::Running => CPU,
        StateClass::Sleeping => FPS,
        StateClass::Other => THREADS,
    }
}

pub fn notice_color(kind: StatusType) -> Color {
    match kind {
        StatusType::Success => Color::Green,
        StatusType::Info => Color::Cyan,
        StatusType::Error => Color::Red,
    }
}
