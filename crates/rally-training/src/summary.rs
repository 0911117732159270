/// Descriptive statistics of a generation's fitness values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitnessSummary {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub median: f32,
    pub std_dev: f32,
}

impl FitnessSummary {
    /// Returns `None` for an empty dataset.
    ///
    /// ```
    /// # use rally_training::FitnessSummary;
    /// let summary = FitnessSummary::new([5.0, 2.0, 4.0, 1.0, 3.0]).unwrap();
    /// assert_eq!(summary.min, 1.0);
    /// assert_eq!(summary.max, 5.0);
    /// assert_eq!(summary.mean, 3.0);
    /// assert_eq!(summary.median, 3.0);
    /// ```
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f32>,
    {
        let mut values = values.into_iter().collect::<Vec<_>>();
        values.sort_by(f32::total_cmp);
        let (&min, &max) = (values.first()?, values.last()?);

        #[expect(clippy::cast_precision_loss)]
        let n = values.len() as f32;
        let mean = values.iter().sum::<f32>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;

        let mid = values.len() / 2;
        let median = if values.len() % 2 == 0 {
            f32::midpoint(values[mid - 1], values[mid])
        } else {
            values[mid]
        };

        Some(Self {
            min,
            max,
            mean,
            median,
            std_dev: variance.sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(FitnessSummary::new(std::iter::empty()), None);
    }

    #[test]
    fn test_even_count() {
        let summary = FitnessSummary::new([-8.0, 2.0, 4.0, 2.0]).unwrap();
        assert!((summary.median - 2.0).abs() < f32::EPSILON);
        assert!((summary.mean - 0.0).abs() < f32::EPSILON);
        assert!((summary.std_dev - 24.0_f32.sqrt()).abs() < 1e-5);
    }
}
