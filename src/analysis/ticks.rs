//! Axis tick planning
//!
//! Chooses nested gridline spacings for a value range drawn across a given
//! number of pixels. Spacings come from the sequence `{1, 2, 10, 20, 100}`
//! scaled by a power of ten, so every finer level divides the coarser one and
//! gridlines nest visually regardless of the magnitude of the data.
//!
//! The planner is a pure function of its inputs and does not know about any
//! drawing surface.

/// Multipliers applied to the power-of-ten base to form candidate spacings
pub const TICK_MULTIPLIERS: [f64; 5] = [1.0, 2.0, 10.0, 20.0, 100.0];

/// Maximum number of levels a plan can contain
pub const MAX_TICK_LEVELS: usize = 3;

/// Upper bound on ticks generated per level, guards against absurd ranges
const MAX_TICKS_PER_LEVEL: usize = 1000;

/// One level of ticks: every multiple of `spacing`, shifted by `offset`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickLevel {
    pub spacing: f64,
    pub offset: f64,
}

impl TickLevel {
    pub fn new(spacing: f64, offset: f64) -> Self {
        Self { spacing, offset }
    }
}

/// Tick levels ordered from coarsest to finest
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickPlan {
    levels: Vec<TickLevel>,
}

impl TickPlan {
    /// A plan without any ticks (degenerate range)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn levels(&self) -> &[TickLevel] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Spacing of each level, coarsest first
    pub fn spacings(&self) -> impl Iterator<Item = f64> + '_ {
        self.levels.iter().map(|l| l.spacing)
    }

    /// Keep only the `max_levels` coarsest levels
    pub fn truncated(mut self, max_levels: usize) -> Self {
        self.levels.truncate(max_levels);
        self
    }

    /// Tick positions within `[lo, hi]` for each level
    ///
    /// A value that already appears on a coarser level is not repeated on
    /// finer levels.
    pub fn tick_values(&self, lo: f64, hi: f64) -> Vec<Vec<f64>> {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let mut result: Vec<Vec<f64>> = Vec::with_capacity(self.levels.len());

        for (index, level) in self.levels.iter().enumerate() {
            let mut values = Vec::new();
            if level.spacing > 0.0 && level.spacing.is_finite() {
                let first = ((lo - level.offset) / level.spacing).ceil() as i64;
                let last = ((hi - level.offset) / level.spacing).floor() as i64;
                let count = (last - first + 1).clamp(0, MAX_TICKS_PER_LEVEL as i64);

                for k in first..first + count {
                    let value = k as f64 * level.spacing + level.offset;
                    let on_coarser = self.levels[..index]
                        .iter()
                        .any(|coarse| is_multiple_of(value - coarse.offset, coarse.spacing));
                    if !on_coarser {
                        values.push(value);
                    }
                }
            }
            result.push(values);
        }

        result
    }
}

fn is_multiple_of(value: f64, spacing: f64) -> bool {
    if spacing <= 0.0 {
        return false;
    }
    let ratio = value / spacing;
    (ratio - ratio.round()).abs() < 1e-6
}

/// Compute a tick plan for `[min_value, max_value]` spanning `pixel_extent`
/// pixels
///
/// Returns two levels (major and minor) and, when the finest candidate does
/// not crowd the axis, a third sub-minor level. A zero-width or non-finite
/// range yields an empty plan.
pub fn plan(min_value: f64, max_value: f64, pixel_extent: f64) -> TickPlan {
    let dif = (max_value - min_value).abs();
    if dif == 0.0 || !dif.is_finite() {
        return TickPlan::empty();
    }

    // More pixels means more gridlines, sub-linearly
    let optimal_tick_count = pixel_extent.ln().max(2.0);
    let optimal_spacing = dif / optimal_tick_count;

    // Largest power of ten at or below the optimal spacing
    let base = 10f64.powf(optimal_spacing.log10().floor());
    let candidates = TICK_MULTIPLIERS.map(|m| m * base);

    let mut minor_index = 0;
    while minor_index < 2 && candidates[minor_index + 1] <= optimal_spacing {
        minor_index += 1;
    }

    let mut levels = vec![
        TickLevel::new(candidates[minor_index + 2], 0.0),
        TickLevel::new(candidates[minor_index + 1], 0.0),
    ];

    let min_px_spacing = (pixel_extent / 20.0).min(30.0);
    let max_tick_count = pixel_extent / min_px_spacing;
    if dif / candidates[minor_index] <= max_tick_count {
        levels.push(TickLevel::new(candidates[minor_index], 0.0));
    }

    TickPlan { levels }
}

/// Tick planner limited to a configurable number of levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickPlanner {
    max_levels: usize,
}

impl Default for TickPlanner {
    fn default() -> Self {
        Self {
            max_levels: MAX_TICK_LEVELS,
        }
    }
}

impl TickPlanner {
    /// Create a planner that keeps at most `max_levels` levels (1 to 3)
    pub fn new(max_levels: usize) -> Self {
        Self {
            max_levels: max_levels.clamp(1, MAX_TICK_LEVELS),
        }
    }

    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    pub fn plan(&self, min_value: f64, max_value: f64, pixel_extent: f64) -> TickPlan {
        plan(min_value, max_value, pixel_extent).truncated(self.max_levels)
    }
}

/// Number of decimals needed to tell ticks `spacing` apart
pub fn label_precision(spacing: f64) -> usize {
    if spacing <= 0.0 || !spacing.is_finite() {
        return 0;
    }
    (-spacing.log10()).ceil().max(0.0) as usize
}

/// Format a tick value for display at the precision its spacing requires
pub fn format_tick(value: f64, spacing: f64) -> String {
    let precision = label_precision(spacing);
    // Avoid printing "-0" for values that are zero up to rounding
    let value = if value.abs() < spacing.abs() * 1e-9 {
        0.0
    } else {
        value
    };
    format!("{:.*}", precision, value)
}
