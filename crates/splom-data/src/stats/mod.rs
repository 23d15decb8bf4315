//! Correlation statistics for column pairs

use itertools::Itertools;
use ordered_float::OrderedFloat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CorrelationKind {
    Pearson,
    Spearman,
}

/// Correlation coefficient of two columns.
///
/// Rows where either value is non-finite are skipped. Returns 0.0 when
/// fewer than two rows remain or either side has zero variance.
pub fn correlation(x: &[f64], y: &[f64], kind: CorrelationKind) -> f64 {
    let (xs, ys): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y.iter())
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(&a, &b)| (a, b))
        .unzip();

    if xs.len() < 2 {
        return 0.0;
    }

    match kind {
        CorrelationKind::Pearson => pearson(&xs, &ys),
        CorrelationKind::Spearman => pearson(&average_ranks(&xs), &average_ranks(&ys)),
    }
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;

    for (&a, &b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        0.0
    } else {
        (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0)
    }
}

/// 1-based ranks, ties sharing the mean of the ranks they span
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let order: Vec<usize> = (0..values.len())
        .sorted_by_key(|&i| OrderedFloat(values[i]))
        .collect();

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end hold ranks start+1..=end
        let rank = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = rank;
        }
        start = end;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_negative_pearson() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [4.0, 3.0, 2.0, 1.0, 0.0];
        assert!((correlation(&x, &y, CorrelationKind::Pearson) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_spearman_is_rank_based() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.0, 4.0, 9.0, 16.0, 1000.0];
        assert!((correlation(&x, &y, CorrelationKind::Spearman) - 1.0).abs() < 1e-12);
        assert!(correlation(&x, &y, CorrelationKind::Pearson) < 0.9);
    }

    #[test]
    fn test_average_ranks_with_ties() {
        assert_eq!(average_ranks(&[10.0, 20.0, 10.0, 30.0]), vec![1.5, 3.0, 1.5, 4.0]);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(correlation(&[], &[], CorrelationKind::Pearson), 0.0);
        assert_eq!(correlation(&[1.0], &[2.0], CorrelationKind::Spearman), 0.0);
        assert_eq!(correlation(&[5.0, 5.0, 5.0], &[1.0, 2.0, 3.0], CorrelationKind::Pearson), 0.0);
    }

    #[test]
    fn test_non_finite_rows_skipped() {
        let x = [0.0, f64::NAN, 1.0, 2.0];
        let y = [0.0, 7.0, 2.0, 4.0];
        assert!((correlation(&x, &y, CorrelationKind::Pearson) - 1.0).abs() < 1e-12);
    }
}
