//! Chart and difficulty types.
//!
//! This module contains:
//! - `Difficulty` - one playable variant, keyed by its content hash
//! - `Chart` - an aggregate of difficulties
//! - `ChartLibrary` - the loaded charts plus a hash index
//! - `group_difficulties` - reconciliation of flat difficulty lists into charts
//! - `BpmInfo` - BPM summary from timing points

mod bpm;
mod chart;
mod difficulty;
mod grouping;
mod library;

pub use bpm::*;
pub use chart::*;
pub use difficulty::*;
pub use grouping::*;
pub use library::*;
