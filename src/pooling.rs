use ndarray::{Array1, Array2, ArrayView1, Axis};
use std::fmt;
use std::str::FromStr;

use crate::utils::ToolError;

/// Summary statistic used for pooling and shifting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    Mean,
    Median,
}

impl Statistic {
    pub fn apply(self, values: ArrayView1<f64>) -> f64 {
        match self {
            Statistic::Mean => mean(values),
            Statistic::Median => median(values),
        }
    }
}

/// Arithmetic mean; NaN for an empty view
pub fn mean(values: ArrayView1<f64>) -> f64 {
    values.sum() / values.len() as f64
}

/// Median, averaging the two middle values for an even count
pub fn median(values: ArrayView1<f64>) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Population standard deviation (ddof = 0)
pub fn population_std(values: ArrayView1<f64>) -> f64 {
    let m = mean(values);
    let variance = values.iter().map(|&v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// How the pooled vector is shifted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shift {
    None,
    /// Subtract the pooling statistic re-applied to the pooled one-row
    /// matrix; this is the pooled vector itself, so the result is zero.
    ///
    /// The legacy scripts instead centered the pooled vector on its own
    /// element statistic, which is what `Elements` does. The zero output is
    /// kept on purpose for `*_shifted` and `*_shifted_std` alike; change
    /// both plans together if that ever changes.
    Repool,
    /// Subtract a statistic of the pooled vector's own elements
    Elements(Statistic),
}

/// Strategy for reducing the segment vectors of one work to a single vector
///
/// Every strategy pools across segments first. The `*_shifted` variants then
/// re-apply their own pooling statistic to the pooled row and subtract it, so
/// they always yield the zero vector. Cross shifts (`median_shift_mean`,
/// `mean_shift_median`, the `*_o_std` pair) subtract a statistic of the
/// pooled vector's own elements. Scaling divides by the population standard
/// deviation of the pooled vector's own elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolingStrategy {
    Mean,
    Median,
    MeanShifted,
    MedianShifted,
    MedianShiftMean,
    MeanShiftMedian,
    MeanShiftedStd,
    MedianShiftedStd,
    MeanShiftOStd,
    MedianShiftOStd,
}

impl PoolingStrategy {
    pub const ALL: [PoolingStrategy; 10] = [
        PoolingStrategy::Mean,
        PoolingStrategy::Median,
        PoolingStrategy::MeanShifted,
        PoolingStrategy::MedianShifted,
        PoolingStrategy::MedianShiftMean,
        PoolingStrategy::MeanShiftMedian,
        PoolingStrategy::MeanShiftedStd,
        PoolingStrategy::MedianShiftedStd,
        PoolingStrategy::MeanShiftOStd,
        PoolingStrategy::MedianShiftOStd,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PoolingStrategy::Mean => "mean",
            PoolingStrategy::Median => "median",
            PoolingStrategy::MeanShifted => "mean_shifted",
            PoolingStrategy::MedianShifted => "median_shifted",
            PoolingStrategy::MedianShiftMean => "median_shift_mean",
            PoolingStrategy::MeanShiftMedian => "mean_shift_median",
            PoolingStrategy::MeanShiftedStd => "mean_shifted_std",
            PoolingStrategy::MedianShiftedStd => "median_shifted_std",
            PoolingStrategy::MeanShiftOStd => "mean_shift_o_std",
            PoolingStrategy::MedianShiftOStd => "median_shift_o_std",
        }
    }

    /// (pooling statistic, shift, divide by own std)
    fn plan(self) -> (Statistic, Shift, bool) {
        use Statistic::{Mean, Median};
        match self {
            PoolingStrategy::Mean => (Mean, Shift::None, false),
            PoolingStrategy::Median => (Median, Shift::None, false),
            PoolingStrategy::MeanShifted => (Mean, Shift::Repool, false),
            PoolingStrategy::MedianShifted => (Median, Shift::Repool, false),
            PoolingStrategy::MedianShiftMean => (Median, Shift::Elements(Mean), false),
            PoolingStrategy::MeanShiftMedian => (Mean, Shift::Elements(Median), false),
            PoolingStrategy::MeanShiftedStd => (Mean, Shift::Repool, true),
            PoolingStrategy::MedianShiftedStd => (Median, Shift::Repool, true),
            PoolingStrategy::MeanShiftOStd => (Mean, Shift::Elements(Median), true),
            PoolingStrategy::MedianShiftOStd => (Median, Shift::Elements(Mean), true),
        }
    }

    /// Pool a matrix with one row per segment into one vector
    pub fn pool(self, segments: &Array2<f64>) -> Result<Array1<f64>, ToolError> {
        if segments.nrows() == 0 {
            return Err(ToolError::ValidationError(
                "cannot pool an empty group of segments".to_string(),
            ));
        }

        let (pooling, shift, scale) = self.plan();
        let pooled: Array1<f64> = segments
            .axis_iter(Axis(1))
            .map(|column| pooling.apply(column))
            .collect();

        // Statistics of the pooled vector are taken before it is shifted
        let shifted = match shift {
            Shift::None => pooled.clone(),
            Shift::Repool => {
                let repooled: Array1<f64> = pooled
                    .view()
                    .insert_axis(Axis(0))
                    .axis_iter(Axis(1))
                    .map(|column| pooling.apply(column))
                    .collect();
                &pooled - &repooled
            }
            Shift::Elements(statistic) => {
                let offset = statistic.apply(pooled.view());
                pooled.mapv(|v| v - offset)
            }
        };

        if scale {
            let spread = population_std(pooled.view());
            Ok(shifted.mapv(|v| v / spread))
        } else {
            Ok(shifted)
        }
    }
}

impl fmt::Display for PoolingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PoolingStrategy {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PoolingStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| ToolError::ConfigError(format!("unknown pooling method: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};

    fn pool(strategy: PoolingStrategy, rows: &Array2<f64>) -> Vec<f64> {
        strategy.pool(rows).unwrap().to_vec()
    }

    #[test]
    fn test_statistics() {
        let values = arr1(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(mean(values.view()), 2.5);
        assert_eq!(median(values.view()), 2.5);
        assert_eq!(median(arr1(&[5.0, 1.0, 3.0]).view()), 3.0);
        assert!((population_std(arr1(&[2.0, 4.0]).view()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_mean_pooling() {
        let rows = arr2(&[[1.0, 3.0], [3.0, 5.0]]);
        assert_eq!(pool(PoolingStrategy::Mean, &rows), vec![2.0, 4.0]);
    }

    #[test]
    fn test_median_pooling() {
        let rows = arr2(&[[1.0, 10.0], [2.0, 0.0], [9.0, 5.0]]);
        assert_eq!(pool(PoolingStrategy::Median, &rows), vec![2.0, 5.0]);
    }

    #[test]
    fn test_shifted_variants_degenerate_to_zero() {
        let rows = arr2(&[[1.0, 3.0, 8.0], [3.0, 5.0, -2.0], [0.5, 0.25, 7.0]]);
        for strategy in [PoolingStrategy::MeanShifted, PoolingStrategy::MedianShifted] {
            let pooled = pool(strategy, &rows);
            assert!(pooled.iter().all(|&v| v.abs() < 1e-12), "{}: {:?}", strategy, pooled);
        }
    }

    #[test]
    fn test_median_shift_mean() {
        // median pooling gives [2, 4]; its own mean is 3
        let rows = arr2(&[[2.0, 4.0]]);
        assert_eq!(pool(PoolingStrategy::MedianShiftMean, &rows), vec![-1.0, 1.0]);
    }

    #[test]
    fn test_mean_shift_median() {
        // mean pooling gives [1, 2, 6]; its own median is 2
        let rows = arr2(&[[0.0, 2.0, 6.0], [2.0, 2.0, 6.0]]);
        assert_eq!(pool(PoolingStrategy::MeanShiftMedian, &rows), vec![-1.0, 0.0, 4.0]);
    }

    #[test]
    fn test_std_scaled_variants() {
        // pooled [1, 2, 6]: mean 3, median 2, std sqrt(14/3)
        let rows = arr2(&[[1.0, 2.0, 6.0]]);
        let std = (14.0f64 / 3.0).sqrt();

        let o_std = pool(PoolingStrategy::MeanShiftOStd, &rows);
        let expected = [-1.0 / std, 0.0, 4.0 / std];
        for (got, want) in o_std.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12);
        }

        let shift_mean = pool(PoolingStrategy::MedianShiftOStd, &rows);
        let expected = [-2.0 / std, -1.0 / std, 3.0 / std];
        for (got, want) in shift_mean.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn test_shifted_std_variants_stay_zero() {
        let rows = arr2(&[[1.0, 2.0, 6.0], [3.0, 0.0, 2.0]]);
        for strategy in [PoolingStrategy::MeanShiftedStd, PoolingStrategy::MedianShiftedStd] {
            assert_eq!(pool(strategy, &rows), vec![0.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn test_std_of_constant_vector_is_nan() {
        let rows = arr2(&[[3.0, 3.0], [3.0, 3.0]]);
        let pooled = pool(PoolingStrategy::MeanShiftedStd, &rows);
        assert!(pooled.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_parse_names() {
        for strategy in PoolingStrategy::ALL {
            assert_eq!(strategy.name().parse::<PoolingStrategy>().unwrap(), strategy);
        }
        let err = "max".parse::<PoolingStrategy>().unwrap_err();
        assert_eq!(err, ToolError::ConfigError("unknown pooling method: max".to_string()));
    }

    #[test]
    fn test_pool_empty_group() {
        let rows = Array2::<f64>::zeros((0, 3));
        assert!(PoolingStrategy::Mean.pool(&rows).is_err());
    }
}
