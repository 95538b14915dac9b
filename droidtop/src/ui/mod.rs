//! UI module root: drawing functions for the individual panels.

pub mod charts;
pub mod controls;
pub mod statistics;
pub mod theme;
pub mod threads;
pub mod util;
