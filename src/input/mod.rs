//! Input drivers.

pub mod rotary;

pub use rotary::{Direction, RotaryDecoder, StepMode};
