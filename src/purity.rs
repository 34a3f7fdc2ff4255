//! Genre purity of clusterings.
//!
//! The purity of a cluster is the share of its members that carry the
//! cluster's most frequent genre. Clusterings are compared by the average
//! purity weighted with cluster size, so that many tiny (trivially pure)
//! clusters cannot inflate the score.

use anyhow::Context;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::table::{self, GenreMetadata};
use crate::utils::{format_float, ToolError};

/// Purity and size of one cluster
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterPurity {
    pub cluster: String,
    pub purity: f64,
    pub members: usize,
}

/// Purity of a whole clustering
#[derive(Debug, Clone, PartialEq)]
pub struct PurityReport {
    /// Size-weighted average purity
    pub weighted: f64,
    /// Per-cluster purity in ascending cluster order
    pub clusters: Vec<ClusterPurity>,
}

impl PurityReport {
    /// Per-cluster purity as a JSON object, e.g. `{"0": 1.0, "1": 0.5}`
    pub fn breakdown_json(&self) -> String {
        let entries: Vec<String> = self
            .clusters
            .iter()
            .map(|c| {
                let key = serde_json::Value::String(c.cluster.clone()).to_string();
                format!("{}: {}", key, format_float(c.purity))
            })
            .collect();
        format!("{{{}}}", entries.join(", "))
    }
}

/// Purity of every cluster from `(cluster, genre)` pairs
pub fn cluster_purities<'a, I>(assignments: I) -> Vec<ClusterPurity>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut counts: BTreeMap<&str, HashMap<&str, usize>> = BTreeMap::new();
    for (cluster, genre) in assignments {
        *counts.entry(cluster).or_default().entry(genre).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|(cluster, genres)| {
            // Ties between genres give the same count, so the pick does not matter
            let members: usize = genres.values().sum();
            let top = genres.values().copied().max().unwrap_or(0);
            ClusterPurity {
                cluster: cluster.to_string(),
                purity: top as f64 / members as f64,
                members,
            }
        })
        .collect()
}

/// Average purity weighted by cluster size
pub fn weighted_purity(clusters: &[ClusterPurity]) -> Result<f64, ToolError> {
    let total: usize = clusters.iter().map(|c| c.members).sum();
    if total == 0 {
        return Err(ToolError::DomainError(
            "no cluster members to compute genre purity".to_string(),
        ));
    }
    let weighted: f64 = clusters
        .iter()
        .map(|c| c.purity * c.members as f64)
        .sum();
    Ok(weighted / total as f64)
}

pub fn genre_purity<'a, I>(assignments: I) -> Result<PurityReport, ToolError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let clusters = cluster_purities(assignments);
    let weighted = weighted_purity(&clusters)?;
    Ok(PurityReport { weighted, clusters })
}

/// Purity report for one model file
pub fn score_model(metadata: &GenreMetadata, model: &Path) -> crate::Result<PurityReport> {
    let joined = metadata.join(table::load_clusters(model)?);
    let report = genre_purity(
        joined
            .iter()
            .map(|(row, genre)| (row.cluster.as_str(), genre.as_str())),
    )
    .with_context(|| format!("no genre purity for {}", model.display()))?;
    info!(
        "{}: {} clusters, weighted purity {:.3}",
        model.display(),
        report.clusters.len(),
        report.weighted
    );
    Ok(report)
}

/// Score every model against the metadata, one output row per model
pub fn run<W: Write>(metadata: &Path, models: &[PathBuf], writer: &mut W) -> crate::Result<()> {
    let metadata = GenreMetadata::from_path(metadata)?;
    writeln!(writer, "model_name\tgenre_purity\tgenre_purity_by_cluster")?;
    for model in models {
        let report = score_model(&metadata, model)?;
        writeln!(
            writer,
            "{}\t{}\t{}",
            model.display(),
            format_float(report.weighted),
            report.breakdown_json()
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_cluster_purity() {
        let clusters = cluster_purities(vec![("c", "A"), ("c", "A"), ("c", "B"), ("c", "A")]);
        assert_eq!(
            clusters,
            vec![ClusterPurity {
                cluster: "c".to_string(),
                purity: 0.75,
                members: 4,
            }]
        );
    }

    #[test]
    fn test_tied_genres() {
        let clusters = cluster_purities(vec![("c", "A"), ("c", "B")]);
        assert_eq!(clusters[0].purity, 0.5);
    }

    #[test]
    fn test_weighted_purity_is_size_weighted() {
        let clusters = vec![
            ClusterPurity { cluster: "1".to_string(), purity: 1.0, members: 1 },
            ClusterPurity { cluster: "2".to_string(), purity: 0.5, members: 9 },
        ];
        let weighted = weighted_purity(&clusters).unwrap();
        assert!((weighted - 0.55).abs() < 1e-12);
        assert!((weighted - 0.75).abs() > 0.1);
    }

    #[test]
    fn test_weighted_purity_empty() {
        assert!(matches!(weighted_purity(&[]), Err(ToolError::DomainError(_))));
    }

    #[test]
    fn test_breakdown_json() {
        let mut assignments = vec![("0", "A")];
        for i in 0..9 {
            assignments.push(("1", if i < 5 { "A" } else { "B" }));
        }
        let report = genre_purity(assignments).unwrap();
        assert_eq!(report.clusters.len(), 2);
        assert_eq!(
            report.breakdown_json(),
            format!("{{\"0\": 1.0, \"1\": {}}}", format_float(5.0 / 9.0))
        );
    }
}
