/// Result of an ordinary least squares fit over equally spaced samples
/// (x = 0, 1, 2, ... n-1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl LinearFit {
    pub fn value_at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Ordinary least squares over y-values at x = 0..n.
/// Returns None for fewer than 2 points (no x-variance to fit against).
pub fn ols_fit(values: &[f64]) -> Option<LinearFit> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;

    let mean_x = (nf - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / nf;

    let mut ss_xx = 0.0;
    let mut ss_xy = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        ss_xx += dx * dx;
        ss_xy += dx * (y - mean_y);
    }
    if ss_xx == 0.0 {
        return None;
    }

    let slope = ss_xy / ss_xx;
    let intercept = mean_y - slope * mean_x;

    // R² = 1 - SS_res / SS_tot. A perfectly flat series has zero total
    // variance; the fit is exact, so report 1.0 rather than dividing by zero.
    let mut ss_tot = 0.0;
    let mut ss_res = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let predicted = intercept + slope * i as f64;
        ss_tot += (y - mean_y) * (y - mean_y);
        ss_res += (y - predicted) * (y - predicted);
    }
    let r_squared = if ss_tot == 0.0 {
        1.0
    } else {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    };

    Some(LinearFit {
        slope,
        intercept,
        r_squared,
    })
}

/// Average of the `window` values ending at (and including) `idx`.
/// Shrinks the window near the start of the series instead of failing.
pub fn trailing_average(values: &[f64], idx: usize, window: usize) -> f64 {
    if values.is_empty() || window == 0 {
        return 0.0;
    }
    let idx = idx.min(values.len() - 1);
    let start = idx.saturating_sub(window - 1);
    let slice = &values[start..=idx];
    slice.iter().sum::<f64>() / slice.len() as f64
}
