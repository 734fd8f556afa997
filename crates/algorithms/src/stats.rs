//! Small descriptive statistics shared by the engine stages

use num_traits::Float;

/// Arithmetic mean, `None` for an empty slice
pub fn mean<T: Float>(values: &[T]) -> Option<T> {
    if values.is_empty() {
        return None;
    }
    let n = T::from(values.len())?;
    Some(values.iter().fold(T::zero(), |acc, &v| acc + v) / n)
}

/// Standard deviation with `ddof` delta degrees of freedom.
///
/// `ddof = 0` is the population deviation, `ddof = 1` the sample deviation.
pub fn std_dev<T: Float>(values: &[T], ddof: usize) -> Option<T> {
    if values.len() <= ddof {
        return None;
    }
    let m = mean(values)?;
    let ss = values.iter().fold(T::zero(), |acc, &v| acc + (v - m) * (v - m));
    Some((ss / T::from(values.len() - ddof)?).sqrt())
}

/// Minimum and maximum, ignoring NaN
pub fn min_max<T: Float>(values: impl IntoIterator<Item = T>) -> Option<(T, T)> {
    values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_std() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&v).unwrap(), 5.0);
        assert_relative_eq!(std_dev(&v, 0).unwrap(), 2.0);
        assert_relative_eq!(std_dev(&v, 1).unwrap(), (32.0f64 / 7.0).sqrt());
        assert!(mean::<f64>(&[]).is_none());
        assert!(std_dev(&[1.0f64], 1).is_none());
    }

    #[test]
    fn test_min_max_skips_nan() {
        let (lo, hi) = min_max(vec![3.0, f64::NAN, -1.0, 8.0f32 as f64]).unwrap();
        assert_eq!((lo, hi), (-1.0, 8.0));
        assert!(min_max(Vec::<f64>::new()).is_none());
    }
}
