//! Small descriptive statistics over plain slices

/// Quantile with linear interpolation between closest ranks.
///
/// `sorted` must be ascending and free of NaN. Returns NaN when empty.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Sort the non-null, non-NaN values ascending
pub fn sorted_present(values: &[Option<f64>]) -> Vec<f64> {
    let mut present: Vec<f64> = values
        .iter()
        .filter_map(|v| *v)
        .filter(|v| !v.is_nan())
        .collect();
    present.sort_by(|a, b| a.total_cmp(b));
    present
}

/// First and third quartile of the present values
pub fn quartiles(values: &[Option<f64>]) -> (f64, f64) {
    let sorted = sorted_present(values);
    (quantile_sorted(&sorted, 0.25), quantile_sorted(&sorted, 0.75))
}

pub fn median(values: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    quantile_sorted(&sorted, 0.5)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n)
pub fn population_std(values: &[f64]) -> f64 {
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Root mean squared error between observed and predicted values
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    debug_assert_eq!(actual.len(), predicted.len());
    if actual.is_empty() {
        return f64::NAN;
    }
    let mse = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64;
    mse.sqrt()
}

/// Coefficient of determination. A constant target scores 1 on an exact
/// fit and 0 otherwise.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    let m = mean(actual);
    let ss_tot: f64 = actual.iter().map(|a| (a - m).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert!((quantile_sorted(&sorted, 0.25) - 1.75).abs() < 1e-12);
        assert!((quantile_sorted(&sorted, 0.75) - 3.25).abs() < 1e-12);
        assert!((quantile_sorted(&sorted, 0.5) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_quartiles_skip_nulls_and_nan() {
        let values = [Some(1.0), None, Some(f64::NAN), Some(3.0), Some(2.0)];
        let (q1, q3) = quartiles(&values);
        assert!((q1 - 1.5).abs() < 1e-12);
        assert!((q3 - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_quantile_is_nan() {
        assert!(quantile_sorted(&[], 0.5).is_nan());
    }

    #[test]
    fn test_rmse_and_r2() {
        let actual = [1.0, 2.0, 3.0];
        assert_eq!(rmse(&actual, &actual), 0.0);
        assert_eq!(r2_score(&actual, &actual), 1.0);
        assert!((rmse(&actual, &[2.0, 2.0, 2.0]) - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!(r2_score(&actual, &[2.0, 2.0, 2.0]).abs() < 1e-12);
    }

    #[test]
    fn test_population_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((population_std(&values) - 2.0).abs() < 1e-12);
    }
}
