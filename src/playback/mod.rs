//! Playback of the cursor year.
//!
//! A small state machine, the timer it is driven by and the commands a
//! user can send it.

pub mod command;
pub mod controller;
pub mod scheduler;

pub use command::Command;
pub use controller::{PlaybackController, Speed};
pub use scheduler::TokioScheduler;
