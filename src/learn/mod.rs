/// Supervised learning and projection modules
pub mod classifiers;
pub mod cross_val;
pub mod feature;
pub mod pca;

// Re-export commonly used items
pub use classifiers::{ClassifierKind, ClassifierParams};
pub use cross_val::{cross_val_accuracy, stratified_folds};
pub use feature::{feature_matrix, validate_features, EncodedLabels};
pub use pca::{project, Projection};
