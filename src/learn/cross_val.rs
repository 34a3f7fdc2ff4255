//! Stratified k-fold cross-validation.
//!
//! Fold assignment is deterministic: labels are ordered by first appearance,
//! the sorted label sequence is dealt round-robin over the folds to size each
//! fold's share of every class, and the members of each class then fill the
//! folds in sample order.

use ndarray::{Array1, Array2, Axis};
use tracing::warn;

use crate::utils::ToolError;

/// Test-fold index of every sample
pub fn stratified_folds(targets: &[usize], n_splits: usize) -> Result<Vec<usize>, ToolError> {
    if n_splits < 2 {
        return Err(ToolError::ConfigError(format!(
            "cross-validation needs at least 2 folds, got {}",
            n_splits
        )));
    }
    if n_splits > targets.len() {
        return Err(ToolError::DomainError(format!(
            "cannot split {} samples into {} folds",
            targets.len(),
            n_splits
        )));
    }

    // Re-encode classes in order of first appearance
    let mut order: Vec<usize> = Vec::new();
    let encoded: Vec<usize> = targets
        .iter()
        .map(|t| match order.iter().position(|o| o == t) {
            Some(pos) => pos,
            None => {
                order.push(*t);
                order.len() - 1
            }
        })
        .collect();
    let n_classes = order.len();

    let mut class_counts = vec![0usize; n_classes];
    for &c in &encoded {
        class_counts[c] += 1;
    }
    if class_counts.iter().all(|&count| count < n_splits) {
        return Err(ToolError::DomainError(format!(
            "{} folds cannot be greater than the number of members in each class",
            n_splits
        )));
    }
    if let Some(&smallest) = class_counts.iter().min() {
        if smallest < n_splits {
            warn!(
                "the least populated class has only {} members, which is less than {} folds",
                smallest, n_splits
            );
        }
    }

    let mut sorted = encoded.clone();
    sorted.sort_unstable();

    // allocation[fold][class]: how many members of the class land in the fold
    let mut allocation = vec![vec![0usize; n_classes]; n_splits];
    for (position, &class) in sorted.iter().enumerate() {
        allocation[position % n_splits][class] += 1;
    }

    let folds_for_class: Vec<Vec<usize>> = (0..n_classes)
        .map(|class| {
            (0..n_splits)
                .flat_map(|fold| std::iter::repeat(fold).take(allocation[fold][class]))
                .collect()
        })
        .collect();
    let mut next = vec![0usize; n_classes];

    let mut test_folds = vec![0usize; targets.len()];
    for (sample, &class) in encoded.iter().enumerate() {
        test_folds[sample] = folds_for_class[class][next[class]];
        next[class] += 1;
    }

    Ok(test_folds)
}

/// Fraction of predictions equal to the truth
pub fn accuracy(predicted: &Array1<usize>, truth: &Array1<usize>) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = predicted
        .iter()
        .zip(truth.iter())
        .filter(|(p, t)| p == t)
        .count();
    correct as f64 / truth.len() as f64
}

/// Mean accuracy of `fit_predict` over stratified folds.
///
/// `fit_predict(train_records, train_targets, test_records)` returns the
/// predicted class of every test record.
pub fn cross_val_accuracy<F>(
    records: &Array2<f64>,
    targets: &Array1<usize>,
    n_splits: usize,
    mut fit_predict: F,
) -> Result<f64, ToolError>
where
    F: FnMut(&Array2<f64>, &Array1<usize>, &Array2<f64>) -> Result<Array1<usize>, ToolError>,
{
    let test_folds = stratified_folds(&targets.to_vec(), n_splits)?;

    let mut scores = Vec::with_capacity(n_splits);
    for fold in 0..n_splits {
        let (test_idx, train_idx): (Vec<usize>, Vec<usize>) =
            (0..targets.len()).partition(|&i| test_folds[i] == fold);

        let train_records = records.select(Axis(0), &train_idx);
        let train_targets = targets.select(Axis(0), &train_idx);
        let test_records = records.select(Axis(0), &test_idx);
        let test_targets = targets.select(Axis(0), &test_idx);

        let predicted = fit_predict(&train_records, &train_targets, &test_records)?;
        scores.push(accuracy(&predicted, &test_targets));
    }

    Ok(scores.iter().sum::<f64>() / scores.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, Array2};

    #[test]
    fn test_stratified_folds_balance_classes() {
        // 20 of class 0 then 10 of class 1
        let targets: Vec<usize> = std::iter::repeat(0)
            .take(20)
            .chain(std::iter::repeat(1).take(10))
            .collect();
        let folds = stratified_folds(&targets, 10).unwrap();

        for fold in 0..10 {
            let zeros = (0..20).filter(|&i| folds[i] == fold).count();
            let ones = (20..30).filter(|&i| folds[i] == fold).count();
            assert_eq!((zeros, ones), (2, 1), "fold {}", fold);
        }
    }

    #[test]
    fn test_stratified_folds_fill_in_sample_order() {
        let targets = vec![1, 0, 1, 0, 1, 0];
        let folds = stratified_folds(&targets, 3).unwrap();
        assert_eq!(folds, vec![0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn test_stratified_folds_too_few_samples() {
        assert!(stratified_folds(&[0, 1, 0], 10).is_err());
    }

    #[test]
    fn test_stratified_folds_every_class_too_small() {
        // one class reaching the fold count is enough
        let targets = vec![0, 1, 2, 0, 1, 2, 0];
        assert!(stratified_folds(&targets, 3).is_ok());
        let targets = vec![0, 1, 2, 3, 0, 1, 2, 3];
        assert!(matches!(
            stratified_folds(&targets, 3),
            Err(ToolError::DomainError(_))
        ));
    }

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&arr1(&[0, 1, 1, 0]), &arr1(&[0, 1, 0, 0])), 0.75);
    }

    #[test]
    fn test_cross_val_accuracy_with_perfect_predictor() {
        let records = Array2::from_shape_fn((10, 1), |(i, _)| i as f64);
        let targets = Array1::from_iter((0..10).map(|i| i % 2));
        let score = cross_val_accuracy(&records, &targets, 5, |_, _, test| {
            Ok(test.column(0).mapv(|v| v as usize % 2))
        })
        .unwrap();
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_cross_val_accuracy_with_constant_predictor() {
        let records = Array2::zeros((10, 1));
        let targets = Array1::from_iter((0..10).map(|i| i % 2));
        let score = cross_val_accuracy(&records, &targets, 5, |_, _, test| {
            Ok(Array1::zeros(test.nrows()))
        })
        .unwrap();
        assert_eq!(score, 0.5);
    }
}
