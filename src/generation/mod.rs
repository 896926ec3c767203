//! Whole-turn helpers over the event stream.

pub mod stream;

pub use stream::{collect_turn, TurnOutput};
