//! Point reduction for long series
//!
//! A day of history at 1 Hz is 86400 points per series, far more than the
//! pixel columns of any plot. Before rasterizing, series are reduced to a
//! few points per column.
//!
//! [`DownsampleMode::Peak`] keeps the minimum and maximum of every pixel
//! column, so a one-sample spike still reaches its full height on screen.
//! [`DownsampleMode::Subsample`] keeps every n-th point and can drop spikes.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Point reduction strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownsampleMode {
    /// Min/max per pixel column
    #[default]
    Peak,
    /// Every n-th point
    Subsample,
}

impl DownsampleMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            DownsampleMode::Peak => "peak",
            DownsampleMode::Subsample => "subsample",
        }
    }

    /// Whether the mode guarantees that extrema survive reduction
    pub fn preserves_extrema(&self) -> bool {
        matches!(self, DownsampleMode::Peak)
    }
}

/// Reduce `points` to roughly two points per column using `mode`
///
/// Points must be sorted by x. Returns the input unchanged when it already
/// fits.
pub fn downsample(points: &[[f64; 2]], mode: DownsampleMode, columns: usize) -> Cow<'_, [[f64; 2]]> {
    if columns == 0 || points.len() <= 2 * columns {
        return Cow::Borrowed(points);
    }
    match mode {
        DownsampleMode::Peak => Cow::Owned(peak_downsample(points, columns)),
        DownsampleMode::Subsample => Cow::Owned(subsample(points, 2 * columns)),
    }
}

/// Min/max downsample into `columns` equal-width x buckets
///
/// Each non-empty bucket contributes the point with the smallest and the
/// point with the largest y value, in x order. The first and last input
/// points are always kept.
pub fn peak_downsample(points: &[[f64; 2]], columns: usize) -> Vec<[f64; 2]> {
    let n = points.len();
    if columns == 0 || n <= 2 * columns {
        return points.to_vec();
    }

    let x_min = points[0][0];
    let x_max = points[n - 1][0];
    let x_range = x_max - x_min;

    #[derive(Clone, Copy)]
    struct Bucket {
        min_pt: [f64; 2],
        max_pt: [f64; 2],
        has_data: bool,
    }

    let mut buckets = vec![
        Bucket {
            min_pt: [0.0, f64::INFINITY],
            max_pt: [0.0, f64::NEG_INFINITY],
            has_data: false,
        };
        columns
    ];

    for &pt in points {
        let index = if x_range > 0.0 {
            (((pt[0] - x_min) / x_range) * columns as f64) as usize
        } else {
            0
        };
        let bucket = &mut buckets[index.min(columns - 1)];
        if pt[1] < bucket.min_pt[1] {
            bucket.min_pt = pt;
            bucket.has_data = true;
        }
        if pt[1] > bucket.max_pt[1] {
            bucket.max_pt = pt;
            bucket.has_data = true;
        }
    }

    let mut out: Vec<[f64; 2]> = Vec::with_capacity(2 * columns + 2);
    let push = |pt: [f64; 2], out: &mut Vec<[f64; 2]>| {
        if out.last() != Some(&pt) {
            out.push(pt);
        }
    };

    push(points[0], &mut out);
    for bucket in buckets.iter().filter(|b| b.has_data) {
        let (a, b) = if bucket.min_pt[0] <= bucket.max_pt[0] {
            (bucket.min_pt, bucket.max_pt)
        } else {
            (bucket.max_pt, bucket.min_pt)
        };
        // A bucket whose values are all NaN never records a point
        if a[1].is_finite() {
            push(a, &mut out);
        }
        if b[1].is_finite() {
            push(b, &mut out);
        }
    }
    push(points[n - 1], &mut out);

    out
}

/// Keep every n-th point so that at most about `target` remain, plus the last
pub fn subsample(points: &[[f64; 2]], target: usize) -> Vec<[f64; 2]> {
    let n = points.len();
    if target == 0 || n <= target {
        return points.to_vec();
    }
    let stride = n.div_ceil(target);
    let mut out: Vec<[f64; 2]> = points.iter().step_by(stride).copied().collect();
    if let Some(last) = points.last() {
        if out.last() != Some(last) {
            out.push(*last);
        }
    }
    out
}
