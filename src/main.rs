use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use consolida::{
    consolidate, default_sources, execute_report, inspect_sources, load_manifest,
    ConsolidateConfig, ReportFilter, SentimentConfig, SourceOutcome, SourceSpec,
};

const DEFAULT_DATASET: &str = "base_consolidada_v2.csv";

#[derive(Parser)]
#[command(name = "consolida")]
#[command(author, version, about = "Survey export consolidation and satisfaction reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read every survey export, normalize it and write the consolidated dataset
    Consolidate {
        /// Directory containing the survey exports
        #[arg(short, long, default_value = ".")]
        input_dir: PathBuf,

        /// Consolidated dataset to write (overwritten)
        #[arg(short, long, default_value = DEFAULT_DATASET)]
        output: PathBuf,

        /// JSON manifest of sources ([{"file": ..., "origin": ...}]) replacing the built-in list
        #[arg(long)]
        sources: Option<PathBuf>,

        /// Write a JSON summary of the run to this file
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Extra agreement marker (repeatable)
        #[arg(long, value_name = "WORD")]
        agree: Vec<String>,

        /// Extra disagreement marker (repeatable)
        #[arg(long, value_name = "WORD")]
        disagree: Vec<String>,

        /// Extra neutral marker (repeatable)
        #[arg(long, value_name = "WORD")]
        neutral: Vec<String>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the satisfaction views of a consolidated dataset
    Report {
        /// Consolidated dataset to read
        #[arg(short, long, default_value = DEFAULT_DATASET)]
        dataset: PathBuf,

        /// Keep only these origins (repeatable)
        #[arg(long, value_name = "ORIGEM")]
        origin: Vec<String>,

        /// Keep only these sectors (repeatable)
        #[arg(long, value_name = "SETOR_CURSO")]
        sector: Vec<String>,

        /// Keep only these categories (repeatable)
        #[arg(long, value_name = "CATEGORIA")]
        category: Vec<String>,

        /// Also write the views as JSON to this file
        #[arg(long)]
        json: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show the detected encoding, delimiter and column mapping of each source
    Inspect {
        /// Directory containing the survey exports
        #[arg(short, long, default_value = ".")]
        input_dir: PathBuf,

        /// JSON manifest of sources replacing the built-in list
        #[arg(long)]
        sources: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Consolidate {
            input_dir,
            output,
            sources,
            summary,
            agree,
            disagree,
            neutral,
            verbose,
        } => {
            setup_logging(verbose);
            let config = ConsolidateConfig {
                input_dir,
                output_path: output,
                sources: resolve_sources(sources.as_deref())?,
                sentiment: SentimentConfig::default().extended(&agree, &disagree, &neutral),
                ..Default::default()
            };
            run_consolidate(&config, summary.as_deref())
        }
        Commands::Report {
            dataset,
            origin,
            sector,
            category,
            json,
            verbose,
        } => {
            setup_logging(verbose);
            let filter = ReportFilter {
                origins: origin,
                sectors: sector,
                categories: category,
            };
            run_report(&dataset, &filter, json.as_deref())
        }
        Commands::Inspect {
            input_dir,
            sources,
            verbose,
        } => {
            setup_logging(verbose);
            let config = ConsolidateConfig {
                input_dir,
                sources: resolve_sources(sources.as_deref())?,
                ..Default::default()
            };
            run_inspect(&config);
            Ok(())
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn resolve_sources(manifest: Option<&Path>) -> Result<Vec<SourceSpec>> {
    match manifest {
        Some(path) => {
            info!("Loading source manifest from {:?}", path);
            load_manifest(path)
        }
        None => Ok(default_sources()),
    }
}

fn run_consolidate(config: &ConsolidateConfig, summary: Option<&Path>) -> Result<()> {
    info!(
        "Consolidating {} sources from {:?}",
        config.sources.len(),
        config.input_dir
    );

    let result = consolidate(config)?;

    info!(
        "Complete: {} rows written from {} of {} sources ({} without RESPOSTA dropped)",
        result.records.len(),
        result.loaded_sources(),
        result.sources.len(),
        result.rows_dropped
    );
    info!(
        "Scores: {} satisfied, {} neutral, {} dissatisfied, {} unscored",
        result.scoring.satisfied,
        result.scoring.neutral,
        result.scoring.dissatisfied,
        result.scoring.unscored
    );

    if let Some(path) = summary {
        result.summary().write_json(path)?;
        info!("Run summary written to {:?}", path);
    }

    Ok(())
}

fn run_report(dataset: &Path, filter: &ReportFilter, json: Option<&Path>) -> Result<()> {
    let report = execute_report(dataset, filter)?;

    if report.filtered_rows == 0 {
        warn!("No data matches the selected filters");
    }
    print!("{}", report.format());

    if let Some(path) = json {
        report.write_json(path)?;
        info!("Report written to {:?}", path);
    }

    Ok(())
}

fn run_inspect(config: &ConsolidateConfig) {
    println!("Source Inspection");
    println!("=================");

    for (report, loaded) in inspect_sources(config) {
        println!();
        println!("{} ({:?})", report.spec.origin, report.path);

        match &report.outcome {
            SourceOutcome::Missing => println!("  status: file not found"),
            SourceOutcome::Unreadable { reason } => println!("  status: unreadable ({})", reason),
            SourceOutcome::Loaded {
                rows,
                encoding,
                delimiter,
            } => {
                println!(
                    "  status: {} rows, encoding {}, delimiter '{}'",
                    rows, encoding, delimiter
                );
            }
        }

        if let Some(loaded) = loaded {
            println!("  raw columns: {}", loaded.raw_columns.join(", "));
            for (field, source) in &loaded.resolution.fields {
                println!("  {:<16} <- {}", field.column_name(), source.describe());
            }
        }
    }
}
