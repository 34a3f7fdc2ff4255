use clap::{Parser, Subcommand};
use genre_tools::{aggregate, classify, convert, purity, scatterplot, EvaluationConfig, PlotStyle};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "genre-tools")]
#[command(version = "0.1.0")]
#[command(about = "Post-processing utilities for topic models of dramatic genre", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pool segment vectors into one vector per work
    Aggregate {
        /// Pooling method, e.g. mean, median, median_shift_mean
        method: String,

        /// Model file with one row per segment
        input: PathBuf,

        /// Model file to write, one row per work
        output: PathBuf,
    },

    /// Cross-validate genre classifiers on each model
    Classify {
        /// Metadata file with id and genre columns
        metadata: PathBuf,

        /// Model files to evaluate
        #[arg(required = true)]
        models: Vec<PathBuf>,
    },

    /// Convert a legacy vector export to a model file
    Convert {
        /// Legacy tab-separated export
        model: PathBuf,
    },

    /// Score how well each model's clusters match the genres
    GenrePurity {
        /// Metadata file with id and genre columns
        metadata: PathBuf,

        /// Model files with a cluster column
        #[arg(required = true)]
        models: Vec<PathBuf>,
    },

    /// Plot the first two principal components by genre
    Scatterplot {
        /// Metadata file with id and genre columns
        metadata: PathBuf,

        /// Model file to project
        model: PathBuf,

        /// SVG image to write
        image: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("genre_tools=warn")),
        )
        .init();

    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match cli.command {
        Commands::Aggregate { method, input, output } => {
            aggregate::run(&method, &input, &output)?;
        }

        Commands::Classify { metadata, models } => {
            classify::run(&metadata, &models, &EvaluationConfig::default(), &mut out)?;
        }

        Commands::Convert { model } => {
            convert::run(&model, &mut out)?;
        }

        Commands::GenrePurity { metadata, models } => {
            purity::run(&metadata, &models, &mut out)?;
        }

        Commands::Scatterplot { metadata, model, image } => {
            scatterplot::run(&metadata, &model, &image, &PlotStyle::default())?;
        }
    }

    out.flush()?;
    Ok(())
}
