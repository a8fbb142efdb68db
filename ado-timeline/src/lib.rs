//! Timeline control for the day cursor.
//!
//! [`engine::Timeline`] is the synchronous state machine (stepping,
//! wrap-around, manual-interaction cancellation). [`player::Player`] drives
//! it from a tokio interval and owns the timer for its whole lifetime.

pub mod engine;
pub mod player;
pub mod speed;
