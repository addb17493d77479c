//! Core data types shared by the observation engine: [Frame], [Stack],
//! [MaxMap] and the rolling-median pair [MedianHistogram]/[MedianMap].
//!
//! These are plain grids over a fixed `width`/`height` for the life of a run,
//! in the spirit of the reference codebase's `basic-frame`/`timestamped-frame`
//! split: a frame carries its own timestamp, while the statistical
//! accumulators (stacks, max maps, histograms) are bare grids the controller
//! owns and mutates in place.

mod clip;
mod double_buffer;
mod frame;
mod maxmap;
mod median;
mod stack;

pub use clip::clip8;
pub use double_buffer::DoubleBuffer;
pub use frame::{utc_seconds_to_datetime, Frame, UtcSeconds};
pub use maxmap::MaxMap;
pub use median::{MedianHistogram, MedianMap};
pub use stack::Stack;
