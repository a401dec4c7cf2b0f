//! Naive linear extrapolation of a daily series.
//!
//! The fit is a plain least-squares line over the most recent window. There
//! is no seasonality and no confidence interval; results are a visual guide,
//! not a statistical forecast.

use crate::analysis::AnalysisError;
use crate::dataset::TimePoint;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Days between successive forecast timestamps. Inputs are assumed daily.
pub const FORECAST_STEP_DAYS: i64 = 1;

/// Minimum number of points a line can be fitted through.
pub const MIN_POINTS: usize = 2;

/// Longest horizon the CLI and API accept.
pub const MAX_HORIZON: usize = 365;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    /// Always >= 0; tracked metrics are counts.
    pub predicted: f64,
}

/// Slope and intercept of a least-squares line over x = 0..n-1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit a degree-1 polynomial against the integer index of `values`.
pub fn fit_line(values: &[f64]) -> Result<LinearFit, AnalysisError> {
    if values.len() < MIN_POINTS {
        return Err(AnalysisError::InsufficientData {
            needed: MIN_POINTS,
            have: values.len(),
        });
    }
    let n = values.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxx += dx * dx;
        sxy += dx * (y - mean_y);
    }
    let slope = sxy / sxx;

    Ok(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

/// Extrapolate the last `window` points `horizon` days past the final timestamp.
///
/// A shorter series is used whole. Fails with
/// [`AnalysisError::InsufficientData`] if fewer than two points are available
/// or `window` itself is below two, and with
/// [`AnalysisError::HorizonOutOfRange`] if the last step would overflow the
/// calendar.
pub fn forecast(
    series: &[TimePoint],
    window: usize,
    horizon: usize,
) -> Result<Vec<ForecastPoint>, AnalysisError> {
    if window < MIN_POINTS {
        return Err(AnalysisError::InsufficientData {
            needed: MIN_POINTS,
            have: window,
        });
    }
    let recent = &series[series.len().saturating_sub(window)..];
    let values: Vec<f64> = recent.iter().map(|p| p.value).collect();
    let fit = fit_line(&values)?;

    let Some(last) = recent.last() else {
        return Ok(Vec::new());
    };

    // every step date is checked up front so the loop below cannot overflow
    let out_of_range = AnalysisError::HorizonOutOfRange { horizon };
    i64::try_from(horizon)
        .ok()
        .and_then(|h| h.checked_mul(FORECAST_STEP_DAYS))
        .and_then(Duration::try_days)
        .and_then(|span| last.timestamp.checked_add_signed(span))
        .ok_or(out_of_range)?;

    let n = recent.len();
    let points = (0..horizon)
        .map(|step| ForecastPoint {
            timestamp: last.timestamp + Duration::days(FORECAST_STEP_DAYS * (step as i64 + 1)),
            predicted: fit.at((n + step) as f64).max(0.0),
        })
        .collect();

    Ok(points)
}

/// Trailing mean over up to `window` values; early positions use what exists.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        let count = (i + 1).min(window);
        out.push(sum / count as f64);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outlook {
    Increasing,
    Stable,
    Decreasing,
}

/// Headline numbers for a forecast relative to recent history.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastSummary {
    pub predicted_mean: f64,
    pub recent_mean: f64,
    pub change_pct: f64,
    pub peak: Option<ForecastPoint>,
    pub outlook: Outlook,
}

impl ForecastSummary {
    /// Compare the forecast mean with the mean of the last `recent_days` points.
    pub fn from_forecast(
        history: &[TimePoint],
        forecast: &[ForecastPoint],
        recent_days: usize,
    ) -> Self {
        let predicted_mean = mean_of(forecast.iter().map(|p| p.predicted));
        let tail = &history[history.len().saturating_sub(recent_days)..];
        let recent_mean = mean_of(tail.iter().map(|p| p.value));

        let change_pct = if recent_mean == 0.0 {
            0.0
        } else {
            (predicted_mean - recent_mean) / recent_mean * 100.0
        };

        let outlook = if change_pct > 10.0 {
            Outlook::Increasing
        } else if change_pct < -10.0 {
            Outlook::Decreasing
        } else {
            Outlook::Stable
        };

        // first maximum wins on ties
        let peak = forecast.iter().copied().fold(None, |best: Option<ForecastPoint>, p| {
            match best {
                Some(b) if b.predicted >= p.predicted => Some(b),
                _ => Some(p),
            }
        });

        Self {
            predicted_mean,
            recent_mean,
            change_pct,
            peak,
            outlook,
        }
    }
}

fn mean_of(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), x| (s + x, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
