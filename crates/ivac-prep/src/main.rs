//! CLI entry point for the IVAC preparation pipeline.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use ivac_prep::{
    CategoricalImputation, DuplicateRemoval, NumericImputation, OutlierMethod, Pipeline,
    PipelineConfig, PipelineOutput, SourceLocation, ViewFilter,
};
use std::env;
use std::path::PathBuf;
use tracing::{error, info};

/// Environment variable holding the default source path or URL.
const SOURCE_ENV: &str = "IVAC_SOURCE";

/// CLI-compatible numeric imputation strategy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliNumericImputation {
    /// Leave missing values as they are
    None,
    /// Use the mean of non-null values
    Mean,
    /// Use the median of non-null values
    Median,
    /// Use the most frequent value
    Mode,
    /// Propagate the previous value
    Ffill,
    /// Propagate the next value
    Bfill,
    /// Use K-Nearest Neighbors imputation
    Knn,
}

impl From<CliNumericImputation> for NumericImputation {
    fn from(cli: CliNumericImputation) -> Self {
        match cli {
            CliNumericImputation::None => NumericImputation::None,
            CliNumericImputation::Mean => NumericImputation::Mean,
            CliNumericImputation::Median => NumericImputation::Median,
            CliNumericImputation::Mode => NumericImputation::Mode,
            CliNumericImputation::Ffill => NumericImputation::Ffill,
            CliNumericImputation::Bfill => NumericImputation::Bfill,
            CliNumericImputation::Knn => NumericImputation::Knn,
        }
    }
}

/// CLI-compatible categorical imputation strategy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliCategoricalImputation {
    /// Leave missing values as they are
    None,
    /// Use the most frequent value (mode)
    Mode,
}

impl From<CliCategoricalImputation> for CategoricalImputation {
    fn from(cli: CliCategoricalImputation) -> Self {
        match cli {
            CliCategoricalImputation::None => CategoricalImputation::None,
            CliCategoricalImputation::Mode => CategoricalImputation::Mode,
        }
    }
}

/// CLI-compatible duplicate removal enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliDedup {
    /// Keep every row
    None,
    /// Drop rows identical on every column
    Exact,
    /// Drop rows repeating a (uai, session) key
    Key,
}

impl From<CliDedup> for DuplicateRemoval {
    fn from(cli: CliDedup) -> Self {
        match cli {
            CliDedup::None => DuplicateRemoval::None,
            CliDedup::Exact => DuplicateRemoval::ExactRow,
            CliDedup::Key => DuplicateRemoval::Key,
        }
    }
}

/// CLI-compatible outlier method enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutlierMethod {
    /// 1.5 x IQR fences
    Iqr,
    /// |z| > 3
    Zscore,
}

impl From<CliOutlierMethod> for OutlierMethod {
    fn from(cli: CliOutlierMethod) -> Self {
        match cli {
            CliOutlierMethod::Iqr => OutlierMethod::Iqr,
            CliOutlierMethod::Zscore => OutlierMethod::Zscore,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "IVAC data preparation and quality profiling",
    long_about = "Cleans the IVAC middle-school value-added export, runs validity and \
                  consistency checks and scores its quality.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  IVAC_SOURCE    Default path or URL when --input is omitted\n\n\
                  EXAMPLES:\n  \
                  # Profile a local export\n  \
                  ivac-prep -i fr-en-ivac.csv\n\n  \
                  # Median imputation per academie, then export the 2023 view\n  \
                  ivac-prep -i fr-en-ivac.csv --numeric-imputation median --group-by academie \\\n    \
                  --session 2023 --export"
)]
struct Args {
    /// Path or URL of the semicolon-separated IVAC export
    #[arg(short, long)]
    input: Option<String>,

    /// Output directory for exports
    #[arg(short, long, default_value = "output")]
    output: String,

    /// JSON pipeline configuration; replaces the processing flags below
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Strategy for imputing missing numeric values in the sandbox
    #[arg(long, value_enum, default_value = "none")]
    numeric_imputation: CliNumericImputation,

    /// Strategy for imputing missing categorical values in the sandbox
    #[arg(long, value_enum, default_value = "none")]
    categorical_imputation: CliCategoricalImputation,

    /// Column scoping mean/median imputation (e.g. academie)
    #[arg(long)]
    group_by: Option<String>,

    /// Number of neighbors for KNN imputation
    #[arg(long, default_value = "5")]
    knn_neighbors: usize,

    /// Duplicate removal applied to the sandbox before imputation
    #[arg(long, value_enum, default_value = "none")]
    dedup: CliDedup,

    /// Outlier detection method
    #[arg(long, value_enum, default_value = "iqr")]
    outlier_method: CliOutlierMethod,

    /// Keep only these sessions in the filtered export (repeatable)
    #[arg(long = "session")]
    sessions: Vec<i64>,

    /// Keep only these academic regions in the filtered export (repeatable)
    #[arg(long = "region")]
    regions: Vec<String>,

    /// Keep only these sectors in the filtered export (repeatable)
    #[arg(long = "sector")]
    sectors: Vec<String>,

    /// Write ivac_filtered.csv and quality_report.csv to the output directory
    #[arg(long)]
    export: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all logs; only the final JSON summary is written.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Only show warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Build the pipeline configuration from the processing flags.
fn config_from_flags(args: &Args) -> Result<PipelineConfig> {
    let mut config_builder = PipelineConfig::builder()
        .numeric_imputation(args.numeric_imputation.into())
        .categorical_imputation(args.categorical_imputation.into())
        .duplicate_removal(args.dedup.into())
        .outlier_method(args.outlier_method.into())
        .knn_neighbors(args.knn_neighbors)
        .filter(ViewFilter {
            sessions: args.sessions.clone(),
            regions: args.regions.clone(),
            sectors: args.sectors.clone(),
        })
        .output_dir(&args.output);

    if let Some(ref group) = args.group_by {
        config_builder = config_builder.group_by(group);
    }

    Ok(config_builder.build()?)
}

fn main() -> Result<()> {
    // Load .env before resolving the default source
    dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    let input = args
        .input
        .clone()
        .or_else(|| env::var(SOURCE_ENV).ok())
        .ok_or_else(|| anyhow!("No input given: pass --input or set {}", SOURCE_ENV))?;
    let location = SourceLocation::parse(&input);

    let config = match args.config {
        Some(ref path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Reading config {}", path.display()))?,
        None => config_from_flags(&args)?,
    };
    let pipeline = Pipeline::builder().config(config).build()?;

    let output = match pipeline.run(&location) {
        Ok(output) => output,
        Err(e) => {
            error!("Pipeline failed [{}]: {}", e.error_code(), e);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&e)?);
            }
            return Err(anyhow!("Pipeline failed: {}", e));
        }
    };

    if args.export {
        let files = pipeline
            .export(&output)
            .context("Failed to write exports")?;
        info!(
            "Exports written: {}, {}",
            files.filtered.display(),
            files.report.display()
        );
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output.summary())?);
        return Ok(());
    }

    print_human_readable_summary(&output, &location);
    Ok(())
}

/// Print a human-readable summary of the run.
///
/// Uses `println!` on purpose: this is the command's result, not a log line.
fn print_human_readable_summary(output: &PipelineOutput, location: &SourceLocation) {
    let (raw_rows, raw_cols) = output.raw.shape();
    let (clean_rows, clean_cols) = output.cleaned.df.shape();

    println!();
    println!("{}", "=".repeat(80));
    println!("IVAC PROFILE");
    println!("{}", "=".repeat(80));
    println!();

    println!("Source:  {}", location);
    println!(
        "Raw:     {} rows x {} columns ({} exact duplicates)",
        raw_rows, raw_cols, output.raw_duplicates
    );
    println!("Cleaned: {} rows x {} columns", clean_rows, clean_cols);
    println!();

    let diff = &output.diff;
    println!("Column Changes:");
    println!("  Engineered: {}", join_or_dash(&diff.engineered));
    println!("  Renamed:    {}", diff.renamed.len());
    println!("  Dropped:    {}", join_or_dash(&diff.dropped));
    if !output.cleaned.collisions.is_empty() {
        println!("  Collisions: {}", output.cleaned.collisions.join(", "));
    }
    println!();

    println!("Checks ({} issues):", output.checks.total_issue_count());
    let summary = output.checks.summary();
    if summary.is_empty() {
        println!("  No violations");
    }
    for (check, count) in summary {
        println!("  - {:<36} {}", check, count);
    }
    for kind in &output.checks.skipped {
        println!("  - {:<36} skipped (missing columns)", kind.name());
    }
    println!();

    println!("Outliers:");
    for outlier in &output.outliers {
        println!(
            "  - {:<36} {} ({:.1}%)",
            outlier.column, outlier.count, outlier.percentage
        );
    }
    println!();

    println!("Indicators:");
    println!("  Mean success rate: {}", format_optional(output.kpis.mean_success_rate));
    println!("  Mean value added:  {}", format_optional(output.kpis.mean_value_added));
    println!("  Total candidates:  {}", format_optional(output.kpis.total_candidates));
    println!();

    let score = &output.clean_score;
    println!("Quality Score: {:.1} / 100", score.overall);
    println!(
        "  completeness {:.1}, uniqueness {:.1}, validity {:.1}, consistency {:.1}",
        score.completeness, score.uniqueness, score.validity, score.consistency
    );
    println!(
        "  sandbox: {:.1} ({} rows)",
        output.sandbox_score.overall,
        output.sandbox.height()
    );
    println!();

    if !output.alerts.is_empty() {
        println!("Alerts:");
        for alert in &output.alerts {
            println!("  ! {}", alert);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("Use --export to write the filtered table and quality report");
    println!("{}", "=".repeat(80));
}

fn join_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

fn format_optional(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v))
}
