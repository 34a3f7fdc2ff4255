use anyhow::Context;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::info;

use crate::table::{HIGHDIM_COLUMN, LOWDIM_COLUMN};
use crate::utils::{format_vector, ToolError};

/// Parse one line of a legacy export into `(id, vector)`.
///
/// Field 1 is a path whose last `/` segment is the id, fields 2+ are numbers.
pub fn parse_legacy_line(line_no: usize, line: &str) -> Result<(String, Vec<f64>), ToolError> {
    let mut fields = line.split('\t');
    let path = fields.nth(1).ok_or_else(|| {
        ToolError::ParseError(format!("line {}: missing document path field", line_no))
    })?;
    let id = path.rsplit('/').next().unwrap_or(path).to_string();

    let vector = fields
        .map(|field| {
            field.trim().parse::<f64>().map_err(|e| {
                ToolError::ParseError(format!(
                    "line {}: invalid number '{}': {}",
                    line_no, field, e
                ))
            })
        })
        .collect::<Result<Vec<f64>, ToolError>>()?;

    Ok((id, vector))
}

/// Read a legacy export, keyed and sorted by id. A repeated id keeps its
/// last vector; blank lines are skipped.
pub fn read_legacy<R: BufRead>(reader: R) -> crate::Result<BTreeMap<String, Vec<f64>>> {
    let mut model = BTreeMap::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let (id, vector) = parse_legacy_line(idx + 1, &line)?;
        model.insert(id, vector);
    }
    Ok(model)
}

/// Write the converted model with identical `highdim` and `lowdim` columns
pub fn write_converted<W: Write>(
    writer: &mut W,
    model: &BTreeMap<String, Vec<f64>>,
) -> std::io::Result<()> {
    writeln!(writer, "id\t{}\t{}", HIGHDIM_COLUMN, LOWDIM_COLUMN)?;
    for (id, vector) in model {
        let cell = format_vector(vector);
        writeln!(writer, "{}\t{}\t{}", id, cell, cell)?;
    }
    Ok(())
}

/// Convert a legacy export at `input`, writing the model table to `writer`
pub fn run<W: Write>(input: &Path, writer: &mut W) -> crate::Result<()> {
    let file = File::open(input).with_context(|| format!("failed to open {}", input.display()))?;
    let model = read_legacy(BufReader::new(file))
        .with_context(|| format!("failed to convert {}", input.display()))?;
    info!("converted {} documents from {}", model.len(), input.display());
    write_converted(writer, &model)?;
    Ok(())
}
