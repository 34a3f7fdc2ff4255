use anyhow::Context;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::learn::{cross_val_accuracy, feature_matrix, ClassifierKind, ClassifierParams, EncodedLabels};
use crate::table::{self, GenreMetadata};
use crate::utils::ToolError;

/// Settings of the cross-validated evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationConfig {
    /// Number of cross-validation folds
    pub folds: usize,
    /// Classifiers to evaluate, in report column order
    pub classifiers: Vec<ClassifierKind>,
    pub params: ClassifierParams,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            folds: 10,
            classifiers: ClassifierKind::ALL.to_vec(),
            params: ClassifierParams::default(),
        }
    }
}

impl EvaluationConfig {
    /// Evaluate the named classifiers (`SVM`, `KNN`, `TRE`, `SGD`) instead
    /// of all of them
    pub fn with_classifiers<S: AsRef<str>>(mut self, names: &[S]) -> Result<Self, ToolError> {
        self.classifiers = names
            .iter()
            .map(|name| name.as_ref().parse())
            .collect::<Result<Vec<ClassifierKind>, ToolError>>()?;
        Ok(self)
    }

    /// Report header: model name, one column per classifier, average
    pub fn header(&self) -> String {
        let mut columns = vec!["model_name"];
        columns.extend(self.classifiers.iter().map(|c| c.name()));
        columns.push("average");
        columns.join("\t")
    }
}

/// Cross-validated accuracy of every classifier on one model
#[derive(Debug, Clone, PartialEq)]
pub struct AccuracyScores {
    pub scores: Vec<(ClassifierKind, f64)>,
}

impl AccuracyScores {
    /// Unweighted mean over the classifiers
    pub fn average(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.iter().map(|(_, s)| s).sum::<f64>() / self.scores.len() as f64
    }

    pub fn get(&self, kind: ClassifierKind) -> Option<f64> {
        self.scores.iter().find(|(k, _)| *k == kind).map(|(_, s)| *s)
    }

    /// Report row with three decimals per figure
    pub fn format_row(&self, model_name: &str) -> String {
        let mut cells = vec![model_name.to_string()];
        cells.extend(self.scores.iter().map(|(_, s)| format!("{:.3}", s)));
        cells.push(format!("{:.3}", self.average()));
        cells.join("\t")
    }
}

/// Cross-validate every configured classifier on labelled vectors
pub fn evaluate<S: AsRef<str>>(
    vectors: &[Vec<f64>],
    labels: &[S],
    config: &EvaluationConfig,
) -> Result<AccuracyScores, ToolError> {
    let records = feature_matrix(vectors)?;
    let encoded = EncodedLabels::encode(labels);

    let scores = config
        .classifiers
        .iter()
        .map(|&kind| {
            let accuracy = cross_val_accuracy(&records, &encoded.targets, config.folds, |train, targets, test| {
                kind.fit_predict(&config.params, train, targets, test)
            })?;
            Ok((kind, accuracy))
        })
        .collect::<Result<Vec<_>, ToolError>>()?;

    Ok(AccuracyScores { scores })
}

/// Evaluate one model file against the metadata
pub fn evaluate_model(
    metadata: &GenreMetadata,
    model: &Path,
    config: &EvaluationConfig,
) -> crate::Result<AccuracyScores> {
    let joined = metadata.join(table::load_vectors(model)?);
    let (rows, labels): (Vec<_>, Vec<String>) = joined.into_iter().unzip();
    let vectors: Vec<Vec<f64>> = rows.into_iter().map(|row| row.vector).collect();

    let scores = evaluate(&vectors, &labels, config)
        .with_context(|| format!("failed to classify {}", model.display()))?;
    info!(
        "{}: {} documents, average accuracy {:.3}",
        model.display(),
        vectors.len(),
        scores.average()
    );
    Ok(scores)
}

/// Evaluate every model, one report row per model
pub fn run<W: Write>(
    metadata: &Path,
    models: &[PathBuf],
    config: &EvaluationConfig,
    writer: &mut W,
) -> crate::Result<()> {
    let metadata = GenreMetadata::from_path(metadata)?;
    writeln!(writer, "{}", config.header())?;
    for model in models {
        let scores = evaluate_model(&metadata, model, config)?;
        writeln!(writer, "{}", scores.format_row(&model.display().to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_header() {
        assert_eq!(
            EvaluationConfig::default().header(),
            "model_name\tSVM\tKNN\tTRE\tSGD\taverage"
        );
    }

    #[test]
    fn test_with_classifiers() {
        let config = EvaluationConfig::default().with_classifiers(&["KNN", "TRE"]).unwrap();
        assert_eq!(config.classifiers, vec![ClassifierKind::Knn, ClassifierKind::Tree]);
        assert_eq!(config.header(), "model_name\tKNN\tTRE\taverage");

        let err = EvaluationConfig::default().with_classifiers(&["SVM", "MLP"]).unwrap_err();
        assert!(matches!(err, ToolError::ConfigError(_)));
    }

    #[test]
    fn test_average_and_row() {
        let scores = AccuracyScores {
            scores: vec![
                (ClassifierKind::Svm, 0.9),
                (ClassifierKind::Knn, 0.8),
                (ClassifierKind::Tree, 0.7),
                (ClassifierKind::Sgd, 0.6),
            ],
        };
        assert!((scores.average() - 0.75).abs() < 1e-12);
        assert_eq!(scores.get(ClassifierKind::Tree), Some(0.7));
        assert_eq!(scores.format_row("m.tsv"), "m.tsv\t0.900\t0.800\t0.700\t0.600\t0.750");
    }

    #[test]
    fn test_evaluate_separable_genres() {
        let mut vectors = Vec::new();
        let mut labels = Vec::new();
        for i in 0..12 {
            let jitter = i as f64 * 0.1;
            vectors.push(vec![1.0 + jitter, 9.0 - jitter]);
            labels.push("comedies");
            vectors.push(vec![9.0 - jitter, 1.0 + jitter]);
            labels.push("tragedies");
        }
        let config = EvaluationConfig {
            folds: 4,
            ..EvaluationConfig::default()
        };
        let scores = evaluate(&vectors, &labels, &config).unwrap();
        assert_eq!(scores.scores.len(), 4);
        for (kind, accuracy) in &scores.scores {
            assert_eq!(*accuracy, 1.0, "{}", kind);
        }
        assert_eq!(scores.average(), 1.0);
    }

    #[test]
    fn test_evaluate_rejects_nan_vectors() {
        let vectors = vec![vec![f64::NAN, 1.0]; 12];
        let labels = vec!["comedies"; 12];
        let result = evaluate(&vectors, &labels, &EvaluationConfig::default());
        assert!(matches!(result, Err(ToolError::ValidationError(_))));
    }
}
