//! Observation engine: wires the short-buffer stacker, rolling median,
//! trigger detector, post-trigger recorder, timelapse accumulator and
//! trigger throttle into the single control loop described by
//! [engine::observe].

mod composer;
mod constants;
mod engine;
mod error;
mod stacker;
mod state;
mod throttle;
mod trigger;

pub use constants::{nfrl, nfrt, nfrtl};
pub use engine::{observe, Engine};
pub use error::{Error, Result};
pub use state::RunState;
pub use throttle::Throttle;
pub use trigger::{test_trigger, TriggerOutcome};
