use anyhow::Context;
use plotters::prelude::*;
use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;
use tracing::info;

use crate::learn::{feature_matrix, project};
use crate::table::{self, GenreMetadata};
use crate::utils::ToolError;

/// The genre series drawn, in legend order
pub const GENRES: [&str; 3] = ["comedies", "tragicomedies", "tragedies"];

/// Look of the rendered plot
#[derive(Debug, Clone, PartialEq)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub font_family: String,
    pub title_font_size: u32,
    pub legend_font_size: u32,
    pub label_font_size: u32,
    /// Dot radius in pixels
    pub dot_size: u32,
    /// One color per entry of [`GENRES`]
    pub colors: [RGBColor; 3],
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            background: WHITE,
            font_family: "FreeSans".to_string(),
            title_font_size: 16,
            legend_font_size: 16,
            label_font_size: 12,
            dot_size: 2,
            colors: [
                RGBColor(139, 0, 0), // darkred
                RGBColor(0, 100, 0), // darkgreen
                RGBColor(0, 0, 128), // navy
            ],
        }
    }
}

/// Axis title such as `PC1 (42%)`
pub fn axis_title(component: usize, ratio: f64) -> String {
    format!("PC{} ({:.0}%)", component, ratio * 100.0)
}

/// Points of one genre series
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub genre: &'static str,
    pub points: Vec<(f64, f64)>,
}

/// Split projected points into the three genre series.
///
/// Every label must be one of [`GENRES`] and every genre must occur.
pub fn genre_series(points: &[(f64, f64)], labels: &[String]) -> Result<Vec<Series>, ToolError> {
    let mut by_genre: HashMap<&str, Vec<(f64, f64)>> = HashMap::new();
    for (point, label) in points.iter().zip(labels) {
        let genre = GENRES
            .iter()
            .find(|g| **g == label.as_str())
            .ok_or_else(|| ToolError::DomainError(format!("unexpected genre '{}'", label)))?;
        by_genre.entry(*genre).or_default().push(*point);
    }

    GENRES
        .iter()
        .map(|&genre| {
            let points = by_genre
                .remove(genre)
                .ok_or_else(|| ToolError::DomainError(format!("no documents of genre '{}'", genre)))?;
            Ok(Series { genre, points })
        })
        .collect()
}

/// Axis range covering all values with a 5% margin
fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return -1.0..1.0;
    }
    let margin = if max > min { (max - min) * 0.05 } else { 1.0 };
    (min - margin)..(max + margin)
}

fn render_error<E: std::fmt::Display>(e: E) -> ToolError {
    ToolError::ModelError(format!("failed to render plot: {}", e))
}

/// Draw the genre series as an SVG scatterplot
pub fn render_svg(
    path: &Path,
    series: &[Series],
    titles: (&str, &str),
    style: &PlotStyle,
) -> Result<(), ToolError> {
    let all_points = || series.iter().flat_map(|s| s.points.iter());
    let x_range = padded_range(all_points().map(|p| p.0));
    let y_range = padded_range(all_points().map(|p| p.1));

    let root = SVGBackend::new(path, (style.width, style.height)).into_drawing_area();
    root.fill(&style.background).map_err(render_error)?;

    let font = style.font_family.as_str();
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)
        .map_err(render_error)?;

    chart
        .configure_mesh()
        .x_desc(titles.0)
        .y_desc(titles.1)
        .label_style((font, f64::from(style.label_font_size)))
        .axis_desc_style((font, f64::from(style.title_font_size)))
        .draw()
        .map_err(render_error)?;

    for (s, color) in series.iter().zip(style.colors) {
        let radius = style.dot_size;
        chart
            .draw_series(
                s.points
                    .iter()
                    .map(move |&(x, y)| Circle::new((x, y), radius, color.filled())),
            )
            .map_err(render_error)?
            .label(s.genre)
            .legend(move |(x, y)| Circle::new((x, y), 5, color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerMiddle)
        .label_font((font, f64::from(style.legend_font_size)))
        .background_style(style.background.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(render_error)?;

    root.present().map_err(render_error)?;
    Ok(())
}

/// Project a model to two dimensions and render it to `image`
pub fn run(metadata: &Path, model: &Path, image: &Path, style: &PlotStyle) -> crate::Result<()> {
    let metadata = GenreMetadata::from_path(metadata)?;
    let joined = metadata.join(table::load_vectors(model)?);
    let (rows, labels): (Vec<_>, Vec<String>) = joined.into_iter().unzip();
    let vectors: Vec<Vec<f64>> = rows.into_iter().map(|row| row.vector).collect();

    let features = feature_matrix(&vectors)?;
    let projection = project(&features, 2)
        .with_context(|| format!("failed to project {}", model.display()))?;
    let points: Vec<(f64, f64)> = projection
        .coordinates
        .rows()
        .into_iter()
        .map(|row| (row[0], row[1]))
        .collect();
    let series = genre_series(&points, &labels)?;

    let x_title = axis_title(1, projection.explained_variance_ratio[0]);
    let y_title = axis_title(2, projection.explained_variance_ratio[1]);
    render_svg(image, &series, (&x_title, &y_title), style)
        .with_context(|| format!("failed to write {}", image.display()))?;
    info!(
        "plotted {} documents to {} ({}, {})",
        points.len(),
        image.display(),
        x_title,
        y_title
    );
    Ok(())
}
