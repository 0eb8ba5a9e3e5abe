/// Variances below this are treated as zero; a z-score against a flat series is meaningless.
const EPSILON: f64 = 1e-12;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divisor `n`).
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// How many standard deviations the latest value sits from the window mean.
pub fn z_score(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let std = std_dev(values)?;
    if std < EPSILON {
        return None;
    }
    let last = *values.last()?;
    Some((last - mean) / std)
}

/// Relative Strength Index using simple averages of the last `period` gains and losses.
///
/// Needs `period + 1` values. A window with gains but no losses is 100; a flat window is 50.
pub fn rsi(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period + 1 {
        return None;
    }
    let tail = &values[values.len() - (period + 1)..];
    let (gains, losses) = tail.windows(2).fold((0.0, 0.0), |(gains, losses), pair| {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            (gains + change, losses)
        } else {
            (gains, losses - change)
        }
    });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;
    if avg_loss < EPSILON {
        return Some(if avg_gain < EPSILON { 50.0 } else { 100.0 });
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// Result of an ordinary least squares fit of price against tick index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Mean of the fitted values, which for OLS equals the mean of the input.
    pub mean: f64,
}

impl Regression {
    /// Slope per tick as a fraction of the mean price.
    pub fn slope_pct(&self) -> f64 {
        if self.mean.abs() < EPSILON {
            return 0.0;
        }
        self.slope / self.mean
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// OLS over `x = 0..n-1`. A flat series fits perfectly but explains nothing, so its
/// `r_squared` is reported as 0.
pub fn linear_regression(values: &[f64]) -> Option<Regression> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(values)?;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        sxy += dx * (y - y_mean);
        sxx += dx * dx;
    }
    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;

    let ss_tot: f64 = values.iter().map(|y| (y - y_mean).powi(2)).sum();
    let r_squared = if ss_tot < EPSILON {
        0.0
    } else {
        let ss_res: f64 = values
            .iter()
            .enumerate()
            .map(|(i, y)| (y - (intercept + slope * i as f64)).powi(2))
            .sum();
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    };

    Some(Regression {
        slope,
        intercept,
        r_squared,
        mean: y_mean,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl Bands {
    /// Position of `price` inside the bands: 0 at the lower band, 1 at the upper band.
    pub fn percent_b(&self, price: f64) -> Option<f64> {
        let width = self.upper - self.lower;
        if width < EPSILON {
            return None;
        }
        Some((price - self.lower) / width)
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Bollinger bands: mean ± `k` population standard deviations.
pub fn bollinger(values: &[f64], k: f64) -> Option<Bands> {
    let middle = mean(values)?;
    let std = std_dev(values)?;
    Some(Bands {
        upper: middle + k * std,
        middle,
        lower: middle - k * std,
    })
}

/// Average true range for a close-only series: the mean absolute change over the last
/// `period` ticks. Needs `period + 1` values.
pub fn atr(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period + 1 {
        return None;
    }
    let tail = &values[values.len() - (period + 1)..];
    let total: f64 = tail.windows(2).map(|pair| (pair[1] - pair[0]).abs()).sum();
    Some(total / period as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn z_score_of_linear_series() {
        let z = z_score(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!(close(z, 2.0_f64.sqrt()));
    }

    #[test]
    fn z_score_undefined_for_flat_or_short_input() {
        assert_eq!(z_score(&[3.0, 3.0, 3.0]), None);
        assert_eq!(z_score(&[3.0]), None);
    }

    #[test]
    fn rsi_simple_average() {
        // changes: +1, +1, -1, +1 -> avg gain 0.75, avg loss 0.25, RS 3
        let value = rsi(&[1.0, 2.0, 3.0, 2.0, 3.0], 4).unwrap();
        assert!(close(value, 75.0));
    }

    #[test]
    fn rsi_uses_only_the_tail() {
        // The leading crash must not count with period 2.
        let value = rsi(&[100.0, 1.0, 2.0, 3.0], 2).unwrap();
        assert!(close(value, 100.0));
    }

    #[test]
    fn rsi_edge_cases() {
        assert_eq!(rsi(&[5.0, 5.0, 5.0], 2), Some(50.0));
        assert_eq!(rsi(&[1.0, 2.0], 2), None);
        assert_eq!(rsi(&[1.0, 2.0], 0), None);
        assert!(close(rsi(&[3.0, 2.0, 1.0], 2).unwrap(), 0.0));
    }

    #[test]
    fn regression_recovers_exact_line() {
        let fit = linear_regression(&[1.0, 3.0, 5.0, 7.0, 9.0]).unwrap();
        assert!(close(fit.slope, 2.0));
        assert!(close(fit.intercept, 1.0));
        assert!(close(fit.r_squared, 1.0));
        assert!(close(fit.slope_pct(), 0.4));
        assert!(close(fit.predict(5.0), 11.0));
    }

    #[test]
    fn regression_on_flat_series_explains_nothing() {
        let fit = linear_regression(&[4.0, 4.0, 4.0]).unwrap();
        assert!(close(fit.slope, 0.0));
        assert_eq!(fit.r_squared, 0.0);
        assert_eq!(linear_regression(&[4.0]), None);
    }

    #[test]
    fn regression_on_noisy_series_has_partial_fit() {
        let fit = linear_regression(&[1.0, 3.0, 2.0, 4.0, 3.0, 5.0]).unwrap();
        assert!(fit.slope > 0.0);
        assert!(fit.r_squared > 0.0 && fit.r_squared < 1.0);
    }

    #[test]
    fn bollinger_textbook_example() {
        let bands = bollinger(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 2.0).unwrap();
        assert!(close(bands.middle, 5.0));
        assert!(close(bands.upper, 9.0));
        assert!(close(bands.lower, 1.0));
        assert!(close(bands.percent_b(5.0).unwrap(), 0.5));
        assert!(close(bands.width(), 8.0));
    }

    #[test]
    fn atr_is_mean_absolute_change() {
        assert!(close(atr(&[10.0, 11.0, 9.0, 12.0], 3).unwrap(), 2.0));
        assert!(close(atr(&[50.0, 10.0, 11.0, 9.0, 12.0], 3).unwrap(), 2.0));
        assert_eq!(atr(&[10.0, 11.0], 3), None);
    }
}
