//! Engine tick timing.
//!
//! The studio's demo engine advances scene time with an [`EngineClock`]:
//! wall-clock deltas while previewing, fixed `1 / fps` steps while exporting
//! so every frame lands on an exact timestamp.

mod engine_clock;

pub use engine_clock::{ClockMode, EngineClock, Tick};
