//! "Nice" axis tick generation

use splom_core::DataRange;

/// Upper bound on ticks emitted for one axis
const MAX_TICKS: usize = 1000;

/// One axis tick, ready for drawing
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    /// Position in data space
    pub value: f64,
    /// Position along the axis in pixel space
    pub pixel: f64,
    pub label: String,
}

/// Round step size closest to `span / desired`.
///
/// Candidates are 1, 2 and 5 times a power of ten.
pub fn nice_step(span: f64, desired: usize) -> Option<f64> {
    if desired == 0 {
        return None;
    }
    let raw = span / desired as f64;
    if !(raw > 0.0) || !raw.is_finite() {
        return None;
    }
    let base = 10f64.powf(raw.log10().floor());
    [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * base)
        .fold(None, |best: Option<f64>, candidate| match best {
            Some(b) if (b - raw).abs() <= (candidate - raw).abs() => Some(b),
            _ => Some(candidate),
        })
}

/// All multiples of the nice step inside `range`, endpoints included
pub fn compute_nice_ticks(range: DataRange, desired: usize) -> Vec<f64> {
    if !(range.min.is_finite() && range.max.is_finite()) || range.max < range.min {
        return Vec::new();
    }
    if range.min == range.max {
        return vec![range.min];
    }
    let Some(step) = nice_step(range.span(), desired) else {
        return Vec::new();
    };

    // tolerance keeps endpoints that are multiples of the step
    let first = (range.min / step - 1e-9).ceil() as i64;
    let last = (range.max / step + 1e-9).floor() as i64;
    (first..=last)
        .take(MAX_TICKS)
        .map(|k| {
            let v = k as f64 * step;
            if v == 0.0 { 0.0 } else { v }
        })
        .collect()
}

/// Label with as many decimals as the step needs
pub fn format_tick(value: f64, step: f64) -> String {
    let decimals = if step > 0.0 && step.is_finite() {
        (-step.log10().floor()).max(0.0) as usize
    } else {
        0
    };
    format!("{:.*}", decimals, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_ticks(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "{:?} vs {:?}", actual, expected);
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{:?} vs {:?}", actual, expected);
        }
    }

    #[test]
    fn test_ticks_include_endpoints() {
        assert_ticks(
            &compute_nice_ticks(DataRange::new(0.0, 10.0), 5),
            &[0.0, 2.0, 4.0, 6.0, 8.0, 10.0],
        );
        assert_ticks(
            &compute_nice_ticks(DataRange::new(0.0, 1.0), 5),
            &[0.0, 0.2, 0.4, 0.6, 0.8, 1.0],
        );
    }

    #[test]
    fn test_step_choice() {
        assert_eq!(nice_step(7.4, 3), Some(2.0));
        assert_eq!(nice_step(100.0, 4), Some(20.0));
        assert_eq!(nice_step(9.0, 1), Some(10.0));
        assert_ticks(&compute_nice_ticks(DataRange::new(0.3, 7.7), 3), &[2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_ticks_are_deterministic() {
        let range = DataRange::new(-3.7, 12.9);
        assert_eq!(compute_nice_ticks(range, 6), compute_nice_ticks(range, 6));
    }

    #[test]
    fn test_degenerate_ranges() {
        assert_eq!(compute_nice_ticks(DataRange::new(2.0, 2.0), 5), vec![2.0]);
        assert!(compute_nice_ticks(DataRange::new(1.0, 0.0), 5).is_empty());
        assert!(compute_nice_ticks(DataRange::new(0.0, 1.0), 0).is_empty());
        assert!(compute_nice_ticks(DataRange::new(0.0, f64::NAN), 5).is_empty());
    }

    #[test]
    fn test_format_tick() {
        assert_eq!(format_tick(4.0, 2.0), "4");
        assert_eq!(format_tick(0.6000000000000001, 0.2), "0.6");
        assert_eq!(format_tick(0.05, 0.05), "0.05");
    }
}
