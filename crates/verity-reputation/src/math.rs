// crates/verity-reputation/src/math.rs
//
// Stateless scoring math: Bayesian-style blending, the logistic curve behind
// consistency updates, and ordinary least-squares fitting for trend
// prediction.

/// Center of the consistency logistic curve (normalized deviation).
pub const CONSISTENCY_CENTER: f64 = 0.5;
/// Steepness of the consistency logistic curve.
pub const CONSISTENCY_STEEPNESS: f64 = 10.0;
/// Scale mapping the logistic output onto a delta of roughly [-100, +100].
pub const CONSISTENCY_SCALE: f64 = 200.0;

/// Linear blend: `current * (1 - weight) + evidence * weight`.
///
/// `weight` is clamped to [0, 1]; a NaN weight leaves `current` unchanged.
pub fn blend(current: f64, evidence: f64, weight: f64) -> f64 {
    let w = if weight.is_nan() { 0.0 } else { weight.clamp(0.0, 1.0) };
    current * (1.0 - w) + evidence * w
}

/// Logistic function `1 / (1 + e^(-steepness * (x - center)))`.
pub fn sigmoid(x: f64, center: f64, steepness: f64) -> f64 {
    1.0 / (1.0 + (-steepness * (x - center)).exp())
}

/// Consistency delta for a submission that moved from `previous` to `new`
/// (both on the 0..=1000 scale).
///
/// Small deviations push the factor up (+99 at zero deviation), large ones
/// push it down (-99 at full deviation), with a smooth transition around a
/// deviation of 500.
pub fn consistency_delta(new: u32, previous: u32) -> i64 {
    let deviation = (new as f64 - previous as f64).abs() / 1000.0;
    let d = deviation.clamp(0.0, 1.0);
    let s = sigmoid(d, CONSISTENCY_CENTER, CONSISTENCY_STEEPNESS);
    ((CONSISTENCY_CENTER - s) * CONSISTENCY_SCALE).round() as i64
}

/// A fitted line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn evaluate(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Ordinary least-squares fit over `(x, y)` points.
///
/// Returns `None` for degenerate inputs: fewer than two points, no variance
/// in `x`, or any non-finite coordinate.
pub fn linear_regression(points: &[(f64, f64)]) -> Option<LinearFit> {
    if points.len() < 2 {
        return None;
    }
    if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return None;
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (x, y) in points {
        let dx = x - mean_x;
        sxx += dx * dx;
        sxy += dx * (y - mean_y);
    }

    if sxx <= f64::EPSILON {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    if !slope.is_finite() || !intercept.is_finite() {
        return None;
    }
    Some(LinearFit { slope, intercept })
}
