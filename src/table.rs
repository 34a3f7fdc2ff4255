use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::utils::ToolError;

/// Column holding the reduced-dimensionality vectors
pub const LOWDIM_COLUMN: &str = "lowdim";
/// Column holding the original-dimensionality vectors
pub const HIGHDIM_COLUMN: &str = "highdim";

/// One document with its embedding vector
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRow {
    pub id: String,
    pub vector: Vec<f64>,
}

/// One document with its cluster assignment
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRow {
    pub id: String,
    pub cluster: String,
}

/// Anything keyed by a document id
pub trait Identified {
    fn id(&self) -> &str;
}

impl Identified for VectorRow {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for ClusterRow {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Deserialize)]
struct VectorRecord {
    id: String,
    lowdim: String,
}

#[derive(Debug, Deserialize)]
struct ClusterRecord {
    id: String,
    cluster: String,
}

#[derive(Debug, Deserialize)]
struct GenreRecord {
    id: String,
    genre: String,
}

fn tsv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(reader)
}

fn open(path: &Path) -> crate::Result<File> {
    File::open(path).with_context(|| format!("failed to open {}", path.display()))
}

/// Parse a JSON-encoded vector cell
pub fn parse_vector(id: &str, cell: &str) -> Result<Vec<f64>, ToolError> {
    serde_json::from_str(cell).map_err(|e| {
        ToolError::ParseError(format!("invalid vector for '{}': {}", id, e))
    })
}

/// Read the `id` and `lowdim` columns of a model table, keeping file order
pub fn read_vectors<R: Read>(reader: R) -> crate::Result<Vec<VectorRow>> {
    let mut rows = Vec::new();
    for result in tsv_reader(reader).deserialize() {
        let record: VectorRecord = result?;
        let vector = parse_vector(&record.id, &record.lowdim)?;
        rows.push(VectorRow {
            id: record.id,
            vector,
        });
    }
    Ok(rows)
}

/// Read the `id` and `cluster` columns of a model table, keeping file order
pub fn read_clusters<R: Read>(reader: R) -> crate::Result<Vec<ClusterRow>> {
    let mut rows = Vec::new();
    for result in tsv_reader(reader).deserialize() {
        let record: ClusterRecord = result?;
        rows.push(ClusterRow {
            id: record.id,
            cluster: record.cluster,
        });
    }
    Ok(rows)
}

pub fn load_vectors(path: &Path) -> crate::Result<Vec<VectorRow>> {
    read_vectors(open(path)?).with_context(|| format!("failed to read model {}", path.display()))
}

pub fn load_clusters(path: &Path) -> crate::Result<Vec<ClusterRow>> {
    read_clusters(open(path)?).with_context(|| format!("failed to read model {}", path.display()))
}

/// Genre labels keyed by document id
#[derive(Debug, Clone, Default)]
pub struct GenreMetadata {
    genres: HashMap<String, String>,
}

impl GenreMetadata {
    /// Read a metadata table with at least `id` and `genre` columns.
    /// A repeated id keeps its last genre.
    pub fn from_reader<R: Read>(reader: R) -> crate::Result<Self> {
        let mut genres = HashMap::new();
        for result in tsv_reader(reader).deserialize() {
            let record: GenreRecord = result?;
            genres.insert(record.id, record.genre);
        }
        Ok(Self { genres })
    }

    pub fn from_path(path: &Path) -> crate::Result<Self> {
        Self::from_reader(open(path)?)
            .with_context(|| format!("failed to read metadata {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.genres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
    }

    pub fn genre_of(&self, id: &str) -> Option<&str> {
        self.genres.get(id).map(String::as_str)
    }

    /// Inner join of `rows` with the genre labels, in row order.
    /// Rows without metadata are dropped.
    pub fn join<T: Identified>(&self, rows: Vec<T>) -> Vec<(T, String)> {
        let total = rows.len();
        let joined: Vec<(T, String)> = rows
            .into_iter()
            .filter_map(|row| {
                let genre = self.genre_of(row.id())?.to_string();
                Some((row, genre))
            })
            .collect();
        debug!(
            "joined {} of {} rows with genre metadata",
            joined.len(),
            total
        );
        joined
    }
}
