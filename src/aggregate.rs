use anyhow::Context;
use ndarray::Array2;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::pooling::PoolingStrategy;
use crate::table::{self, VectorRow, LOWDIM_COLUMN};
use crate::utils::{format_vector, ToolError};

/// Separator between a work id and a segment id
pub const SEGMENT_SEPARATOR: char = '§';

/// Work id of a segment id (the text before the first `§`)
pub fn work_id(segment_id: &str) -> &str {
    segment_id
        .split_once(SEGMENT_SEPARATOR)
        .map_or(segment_id, |(work, _)| work)
}

/// Group segment vectors by work id, in ascending work-id order
pub fn group_by_work(rows: Vec<VectorRow>) -> BTreeMap<String, Vec<Vec<f64>>> {
    let mut groups: BTreeMap<String, Vec<Vec<f64>>> = BTreeMap::new();
    for row in rows {
        groups
            .entry(work_id(&row.id).to_string())
            .or_default()
            .push(row.vector);
    }
    groups
}

/// Stack equally long vectors into a matrix, one row per vector
pub fn stack_rows(id: &str, vectors: Vec<Vec<f64>>) -> Result<Array2<f64>, ToolError> {
    let n_rows = vectors.len();
    let n_cols = vectors.first().map_or(0, Vec::len);
    if let Some(bad) = vectors.iter().find(|v| v.len() != n_cols) {
        return Err(ToolError::ParseError(format!(
            "vectors of '{}' differ in length ({} vs {})",
            id,
            n_cols,
            bad.len()
        )));
    }
    let flat: Vec<f64> = vectors.into_iter().flatten().collect();
    Array2::from_shape_vec((n_rows, n_cols), flat)
        .map_err(|e| ToolError::ParseError(format!("failed to build matrix for '{}': {}", id, e)))
}

/// Pool the segments of every work into one vector per work
pub fn aggregate_rows(
    strategy: PoolingStrategy,
    rows: Vec<VectorRow>,
) -> Result<Vec<VectorRow>, ToolError> {
    group_by_work(rows)
        .into_iter()
        .map(|(id, vectors)| {
            let segments = stack_rows(&id, vectors)?;
            let pooled = strategy.pool(&segments)?;
            Ok(VectorRow {
                id,
                vector: pooled.to_vec(),
            })
        })
        .collect()
}

/// Write rows as an `id`/`lowdim` model table
pub fn write_model<W: Write>(writer: &mut W, rows: &[VectorRow]) -> std::io::Result<()> {
    writeln!(writer, "id\t{}", LOWDIM_COLUMN)?;
    for row in rows {
        writeln!(writer, "{}\t{}", row.id, format_vector(&row.vector))?;
    }
    Ok(())
}

/// Aggregate a segment-level model into a work-level model file.
///
/// The method name is checked before anything is read or written.
pub fn run(method: &str, input: &Path, output: &Path) -> crate::Result<()> {
    let strategy: PoolingStrategy = method.parse()?;

    let rows = table::load_vectors(input)?;
    let segment_count = rows.len();
    let works = aggregate_rows(strategy, rows)
        .with_context(|| format!("failed to aggregate {}", input.display()))?;
    info!(
        "pooled {} segments into {} works with {}",
        segment_count,
        works.len(),
        strategy
    );

    let file = File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    write_model(&mut writer, &works)?;
    writer.flush()?;
    Ok(())
}
