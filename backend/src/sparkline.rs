//! Synthetic 24-point sparkline shared by every price source.
//!
//! No tick history is available, only the current price and a 24h change, so
//! the series is reconstructed: a linear walk from the implied start price to
//! the current price, with proportional noise and a momentum carry-over.
//!
//! ```text
//! start = current / (1 + pct/100)
//! p[i]  = lerp(start, current, i/23) + noise + 0.3 * (p[i-1] - p[i-2])
//! p[i]  = clamp(p[i], 0.8 * start, 1.2 * current)
//! p[23] = current
//! ```

use rand::Rng;

use crate::types::SPARKLINE_POINTS;

/// Share of the previous step's delta carried into the next point.
const MOMENTUM: f64 = 0.3;

/// Noise floor as a fraction of the trend value.
const MIN_NOISE: f64 = 0.002;

/// Noise amplitude relative to the absolute 24h move.
const NOISE_PER_MOVE: f64 = 0.15;

/// Price 24 hours ago implied by `current` and `pct_change_24h`.
///
/// Falls back to `current` when the change is not finite or at or below -100%.
pub fn start_price(current: f64, pct_change_24h: f64) -> f64 {
    let divisor = 1.0 + pct_change_24h / 100.0;
    if !pct_change_24h.is_finite() || divisor <= 0.0 {
        return current;
    }
    let start = current / divisor;
    if start.is_finite() { start } else { current }
}

/// Generate the sparkline with the thread-local RNG.
pub fn generate(current: f64, pct_change_24h: f64) -> Vec<f64> {
    generate_with(current, pct_change_24h, &mut rand::thread_rng())
}

/// Generate the sparkline from an explicit RNG.
///
/// The last point is exactly `current`. Every point lies within
/// `[0.8 * start, 1.2 * current]`; when the 24h drop exceeds 20% the lower
/// bound is widened to `current` so the final point still fits.
pub fn generate_with<R: Rng + ?Sized>(current: f64, pct_change_24h: f64, rng: &mut R) -> Vec<f64> {
    if !current.is_finite() || current <= 0.0 {
        return vec![current; SPARKLINE_POINTS];
    }

    let start = start_price(current, pct_change_24h);
    let low = (0.8 * start).min(current);
    let high = 1.2 * current;
    let noise = (pct_change_24h.abs() / 100.0 * NOISE_PER_MOVE)
        .clamp(MIN_NOISE, 0.05);

    let last_index = (SPARKLINE_POINTS - 1) as f64;
    let mut points: Vec<f64> = Vec::with_capacity(SPARKLINE_POINTS);
    let mut prev_delta = 0.0;

    for i in 0..SPARKLINE_POINTS {
        let progress = i as f64 / last_index;
        let trend = start + (current - start) * progress;
        let jitter = trend * rng.gen_range(-noise..=noise);
        let value = (trend + jitter + MOMENTUM * prev_delta).clamp(low, high);

        if let Some(&previous) = points.last() {
            prev_delta = value - previous;
        }
        points.push(value);
    }

    if let Some(last) = points.last_mut() {
        *last = current;
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn within(points: &[f64], low: f64, high: f64) -> bool {
        let eps = high.abs() * 1e-12;
        points.iter().all(|p| *p >= low - eps && *p <= high + eps)
    }

    #[test]
    fn test_last_point_is_current_and_bounds_hold() {
        let mut rng = StdRng::seed_from_u64(7);
        for current in [0.000012, 0.65, 1.0, 24.5, 2050.0, 67_000.0] {
            for pct in [-20.0, -12.5, -3.0, 0.0, 0.4, 5.0, 18.0, 60.0] {
                let points = generate_with(current, pct, &mut rng);
                let start = start_price(current, pct);

                assert_eq!(points.len(), SPARKLINE_POINTS);
                assert_eq!(*points.last().unwrap(), current);
                assert!(
                    within(&points, 0.8 * start, 1.2 * current),
                    "out of bounds for current={} pct={}: {:?}",
                    current,
                    pct,
                    points
                );
            }
        }
    }

    #[test]
    fn test_start_price() {
        assert!((start_price(110.0, 10.0) - 100.0).abs() < 1e-9);
        assert_eq!(start_price(50.0, 0.0), 50.0);
        assert_eq!(start_price(50.0, -100.0), 50.0);
        assert_eq!(start_price(50.0, f64::NAN), 50.0);
    }

    #[test]
    fn test_deep_drop_keeps_current_inside_window() {
        let mut rng = StdRng::seed_from_u64(3);
        let points = generate_with(10.0, -60.0, &mut rng);
        assert_eq!(*points.last().unwrap(), 10.0);
        assert!(within(&points, 10.0, 12.0));
    }

    #[test]
    fn test_trend_direction_follows_change() {
        let mut rng = StdRng::seed_from_u64(11);
        let rising = generate_with(120.0, 20.0, &mut rng);
        assert!(rising[0] < rising[SPARKLINE_POINTS - 1]);

        let falling = generate_with(80.0, -15.0, &mut rng);
        assert!(falling[0] > falling[SPARKLINE_POINTS - 1]);
    }

    #[test]
    fn test_non_positive_price_yields_flat_series() {
        let points = generate(0.0, 5.0);
        assert!(points.iter().all(|p| *p == 0.0));
    }
}
