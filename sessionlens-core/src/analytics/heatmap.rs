//! Heatmap intensity binning
//!
//! Daily token totals are bucketed into five intensity levels for a
//! contribution-style calendar: 0 for no activity, then quartiles of the
//! non-zero distribution. Percentiles use linear interpolation between
//! order statistics, so small datasets still spread across the scale.

use crate::parsers::stats::DailyModelTokens;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Percentiles {
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
}

/// Quartiles of `values`. All zero when the input is empty.
pub fn compute_percentiles(values: &[f64]) -> Percentiles {
    if values.is_empty() {
        return Percentiles {
            p25: 0.0,
            p50: 0.0,
            p75: 0.0,
        };
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let percentile = |p: f64| -> f64 {
        let idx = p / 100.0 * (sorted.len() - 1) as f64;
        let lower = idx.floor() as usize;
        let upper = idx.ceil() as usize;
        if lower == upper {
            return sorted[lower];
        }
        sorted[lower] + (sorted[upper] - sorted[lower]) * (idx - lower as f64)
    };

    Percentiles {
        p25: percentile(25.0),
        p50: percentile(50.0),
        p75: percentile(75.0),
    }
}

/// Intensity level 0..=4 for one day's token total.
pub fn intensity_level(tokens: f64, percentiles: &Percentiles) -> u8 {
    if tokens == 0.0 {
        0
    } else if tokens <= percentiles.p25 {
        1
    } else if tokens <= percentiles.p50 {
        2
    } else if tokens <= percentiles.p75 {
        3
    } else {
        4
    }
}

/// Intensity per day from the daily model-token series. Percentiles are
/// computed over the non-zero days only; zero days stay at level 0.
pub fn daily_intensities(daily: &[DailyModelTokens]) -> Vec<(String, u8)> {
    let totals: Vec<(String, f64)> = daily
        .iter()
        .map(|d| (d.date.clone(), d.total() as f64))
        .collect();
    let non_zero: Vec<f64> = totals
        .iter()
        .map(|(_, t)| *t)
        .filter(|t| *t > 0.0)
        .collect();
    let percentiles = compute_percentiles(&non_zero);

    totals
        .into_iter()
        .map(|(date, tokens)| (date, intensity_level(tokens, &percentiles)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_percentiles_empty() {
        let p = compute_percentiles(&[]);
        assert_eq!(p.p25, 0.0);
        assert_eq!(p.p50, 0.0);
        assert_eq!(p.p75, 0.0);
    }

    #[test]
    fn test_percentiles_single_value() {
        let p = compute_percentiles(&[42.0]);
        assert_eq!(p.p25, 42.0);
        assert_eq!(p.p50, 42.0);
        assert_eq!(p.p75, 42.0);
    }

    #[test]
    fn test_percentiles_interpolate() {
        // indices: p25 -> 0.75, p50 -> 1.5, p75 -> 2.25
        let p = compute_percentiles(&[10.0, 20.0, 30.0, 40.0]);
        assert!((p.p25 - 17.5).abs() < 1e-9);
        assert!((p.p50 - 25.0).abs() < 1e-9);
        assert!((p.p75 - 32.5).abs() < 1e-9);
    }

    #[test]
    fn test_intensity_levels() {
        let p = Percentiles {
            p25: 10.0,
            p50: 20.0,
            p75: 30.0,
        };
        assert_eq!(intensity_level(0.0, &p), 0);
        assert_eq!(intensity_level(5.0, &p), 1);
        assert_eq!(intensity_level(10.0, &p), 1);
        assert_eq!(intensity_level(15.0, &p), 2);
        assert_eq!(intensity_level(25.0, &p), 3);
        assert_eq!(intensity_level(31.0, &p), 4);
    }

    #[test]
    fn test_daily_intensities_keep_zero_days_at_zero() {
        let day = |date: &str, tokens: u64| DailyModelTokens {
            date: date.to_string(),
            tokens_by_model: HashMap::from([("m".to_string(), tokens)]),
        };
        let daily = vec![
            day("2026-08-01", 0),
            day("2026-08-02", 100),
            day("2026-08-03", 200),
            day("2026-08-04", 300),
            day("2026-08-05", 400),
        ];

        let levels = daily_intensities(&daily);
        assert_eq!(levels[0], ("2026-08-01".to_string(), 0));
        assert_eq!(levels[1].1, 1);
        assert_eq!(levels[4].1, 4);
    }
}
