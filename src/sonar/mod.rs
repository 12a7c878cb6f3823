//! Sonar - research saturation detection
//!
//! Tells a research agent whether freshly fetched text adds information to
//! what it already knows, and escalates when it keeps reading the same thing.
//!
//! ```text
//! fresh-streak ──saturated──▶ saturated(1) ──saturated──▶ saturated(n)
//!      ▲                            │                          │
//!      └────────── novel ───────────┴────────── novel ─────────┘
//! ```
//!
//! `saturated(n)` with `n >= escalation_threshold` reports critical saturation.

pub mod gate;
pub mod types;

pub use gate::{information_gain, NoveltyGate};
pub use types::{SaturationLevel, SaturationState, SonarResult};
