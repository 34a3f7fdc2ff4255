use ndarray::{Array1, Array2};
use std::collections::BTreeSet;

use crate::utils::ToolError;

/// Check that a matrix of document vectors can be fed to the learners.
///
/// Vectors come from JSON cells and may carry `nan` written by degenerate
/// pooling, so every value must be finite; the matrix needs at least one
/// document and one dimension.
pub fn validate_features(features: &Array2<f64>) -> Result<(), ToolError> {
    if features.nrows() == 0 {
        return Err(ToolError::ValidationError(
            "no document vectors to evaluate".to_string(),
        ));
    }

    if features.ncols() == 0 {
        return Err(ToolError::ValidationError(
            "document vectors have no dimensions".to_string(),
        ));
    }

    if let Some((row, _)) = features
        .outer_iter()
        .enumerate()
        .find(|(_, vector)| vector.iter().any(|v| !v.is_finite()))
    {
        return Err(ToolError::ValidationError(format!(
            "document vector {} contains NaN or Inf values",
            row
        )));
    }

    Ok(())
}

/// Build a feature matrix from equally long vectors, one row per vector
pub fn feature_matrix(vectors: &[Vec<f64>]) -> Result<Array2<f64>, ToolError> {
    let n_cols = vectors.first().map_or(0, Vec::len);
    if let Some((row, bad)) = vectors.iter().enumerate().find(|(_, v)| v.len() != n_cols) {
        return Err(ToolError::ParseError(format!(
            "vector {} has {} dimensions, expected {}",
            row,
            bad.len(),
            n_cols
        )));
    }
    let flat: Vec<f64> = vectors.iter().flatten().copied().collect();
    let features = Array2::from_shape_vec((vectors.len(), n_cols), flat)
        .map_err(|e| ToolError::ParseError(format!("failed to create Array2: {}", e)))?;
    validate_features(&features)?;
    Ok(features)
}

/// String labels encoded as class indices into the sorted list of classes
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedLabels {
    pub targets: Array1<usize>,
    pub classes: Vec<String>,
}

impl EncodedLabels {
    pub fn encode<S: AsRef<str>>(labels: &[S]) -> Self {
        let classes: Vec<String> = labels
            .iter()
            .map(|l| l.as_ref().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let targets = labels
            .iter()
            .map(|l| {
                classes
                    .binary_search_by(|c| c.as_str().cmp(l.as_ref()))
                    .unwrap_or_default()
            })
            .collect();
        Self { targets, classes }
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }
}
