use linfa_linalg::eigh::{EigSort, Eigh};
use ndarray::{s, Array2, Axis};
use tracing::debug;

use crate::utils::ToolError;

/// Samples projected onto their leading principal components
#[derive(Debug, Clone)]
pub struct Projection {
    /// One row per sample, exactly one column per requested component
    pub coordinates: Array2<f64>,
    /// Share of the total variance explained by each requested component
    pub explained_variance_ratio: Vec<f64>,
}

/// Flip each component so its largest-magnitude loading is positive
fn orient_components(components: &mut Array2<f64>) {
    for mut column in components.columns_mut() {
        let dominant = column
            .iter()
            .copied()
            .fold(0.0f64, |best, v| if v.abs() > best.abs() { v } else { best });
        if dominant < 0.0 {
            column.mapv_inplace(|v| -v);
        }
    }
}

/// Project `features` onto the first `n_components` principal components.
///
/// Data is centered but not scaled. The components are the eigenvectors of
/// the scatter matrix, computed exactly. Rank-deficient data still yields
/// `n_components` columns; the surplus components explain zero variance.
/// Explained variance ratios are relative to the total variance of all
/// dimensions, not just the kept components.
pub fn project(features: &Array2<f64>, n_components: usize) -> Result<Projection, ToolError> {
    let (n_samples, n_features) = features.dim();
    if n_samples < 2 || n_features < n_components {
        return Err(ToolError::ValidationError(format!(
            "need at least 2 samples and {} dimensions for PCA, got {} x {}",
            n_components, n_samples, n_features
        )));
    }

    let means = features
        .mean_axis(Axis(0))
        .ok_or_else(|| ToolError::ValidationError("no samples to project".to_string()))?;
    let centered = features - &means;
    let scatter = centered.t().dot(&centered);

    let total: f64 = scatter.diag().sum();
    if total <= 0.0 {
        return Err(ToolError::ValidationError(
            "all vectors are identical, nothing to project".to_string(),
        ));
    }

    let (eigenvalues, eigenvectors) = scatter
        .eigh()
        .map_err(|e| ToolError::ModelError(format!("PCA failed: {}", e)))?
        .sort_eig_desc();

    let mut components = eigenvectors.slice(s![.., ..n_components]).to_owned();
    orient_components(&mut components);
    let coordinates = centered.dot(&components);

    // Round-off can leave null directions slightly negative
    let explained_variance_ratio: Vec<f64> = eigenvalues
        .iter()
        .take(n_components)
        .map(|&value| value.max(0.0) / total)
        .collect();
    debug!(
        "PCA over {} x {}: explained variance {:?}, cumulated {:.3}",
        n_samples,
        n_features,
        explained_variance_ratio,
        explained_variance_ratio.iter().sum::<f64>()
    );

    Ok(Projection {
        coordinates,
        explained_variance_ratio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    fn assert_close(got: f64, want: f64, tolerance: f64) {
        assert!((got - want).abs() < tolerance, "got {}, want {}", got, want);
    }

    #[test]
    fn test_project_line_keeps_all_variance() {
        // points on the line y = 2x carry all variance in one direction
        let features = arr2(&[[0.0, 0.0], [1.0, 2.0], [2.0, 4.0], [3.0, 6.0]]);
        let projection = project(&features, 2).unwrap();

        assert_eq!(projection.coordinates.dim(), (4, 2));
        assert_close(projection.explained_variance_ratio[0], 1.0, 1e-9);
        assert_close(projection.explained_variance_ratio[1], 0.0, 1e-9);

        // distances along the first component are preserved
        let first = projection.coordinates.column(0);
        let spread = (first[3] - first[0]).abs();
        assert_close(spread, 45.0f64.sqrt(), 1e-9);
        for &v in projection.coordinates.column(1) {
            assert_close(v, 0.0, 1e-9);
        }
    }

    #[test]
    fn test_project_axis_aligned_cloud() {
        // per-axis scatter 18, 8 and 2 out of 28
        let features = arr2(&[
            [3.0, 0.0, 0.0],
            [-3.0, 0.0, 0.0],
            [0.0, 2.0, 0.0],
            [0.0, -2.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, -1.0],
        ]);
        let projection = project(&features, 2).unwrap();
        let ratios = &projection.explained_variance_ratio;
        assert_eq!(ratios.len(), 2);
        assert_close(ratios[0], 18.0 / 28.0, 1e-9);
        assert_close(ratios[1], 8.0 / 28.0, 1e-9);

        let expected_first = [3.0, -3.0, 0.0, 0.0, 0.0, 0.0];
        let expected_second = [0.0, 0.0, 2.0, -2.0, 0.0, 0.0];
        for (row, (&x, &y)) in expected_first.iter().zip(&expected_second).enumerate() {
            assert_close(projection.coordinates[[row, 0]], x, 1e-9);
            assert_close(projection.coordinates[[row, 1]], y, 1e-9);
        }
    }

    #[test]
    fn test_project_matches_exact_eigenvalues() {
        let features = arr2(&[
            [1.0, 0.0, 0.5],
            [0.0, 1.0, 0.2],
            [1.0, 1.0, 0.9],
            [0.0, 0.0, 0.1],
            [0.5, 0.2, 0.4],
        ]);
        let projection = project(&features, 2).unwrap();
        let ratios = &projection.explained_variance_ratio;
        assert_close(ratios[0], 0.562_799_5, 1e-6);
        assert_close(ratios[1], 0.429_949_5, 1e-6);
    }

    #[test]
    fn test_project_collinear_points_pad_second_component() {
        // [i, 2i, 1]: every point lies on one line through 3-d space
        let features = Array2::from_shape_fn((9, 3), |(i, j)| match j {
            0 => i as f64,
            1 => 2.0 * i as f64,
            _ => 1.0,
        });
        let projection = project(&features, 2).unwrap();
        assert_eq!(projection.coordinates.dim(), (9, 2));
        assert_eq!(projection.explained_variance_ratio.len(), 2);
        assert_close(projection.explained_variance_ratio[0], 1.0, 1e-9);
        assert_close(projection.explained_variance_ratio[1], 0.0, 1e-9);
    }

    #[test]
    fn test_project_is_deterministic() {
        let features = arr2(&[[1.0, 0.3], [0.2, 1.0], [0.9, 0.8], [0.1, 0.0]]);
        let first = project(&features, 2).unwrap();
        let second = project(&features, 2).unwrap();
        assert_eq!(first.coordinates, second.coordinates);
        assert_eq!(first.explained_variance_ratio, second.explained_variance_ratio);
    }

    #[test]
    fn test_project_too_few_samples() {
        let features = arr2(&[[1.0, 2.0]]);
        assert!(project(&features, 2).is_err());
    }

    #[test]
    fn test_project_too_few_dimensions() {
        let features = arr2(&[[1.0], [2.0], [4.0]]);
        assert!(matches!(project(&features, 2), Err(ToolError::ValidationError(_))));
    }

    #[test]
    fn test_project_constant_vectors() {
        let features = arr2(&[[1.0, 2.0], [1.0, 2.0], [1.0, 2.0]]);
        assert!(matches!(project(&features, 2), Err(ToolError::ValidationError(_))));
    }
}
