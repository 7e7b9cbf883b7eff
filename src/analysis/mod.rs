//! Numeric helpers behind the plot
//!
//! This module provides the parts of the plotting engine that do real
//! arithmetic and know nothing about drawing:
//! - Tick planning for nested axis gridlines
//! - Peak-preserving point reduction for long series

pub mod downsample;
pub mod ticks;

pub use downsample::{downsample, peak_downsample, subsample, DownsampleMode};
pub use ticks::{format_tick, plan, TickLevel, TickPlan, TickPlanner};
