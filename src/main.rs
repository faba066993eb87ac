//! Command-line driver: clean a metadata dump, analyse the cleaned artifact,
//! and explore a sample of it.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use scholarstream::config::{
    AnalysisConfig, CleanConfig, DEFAULT_CLEANED, DEFAULT_IMAGE_DIR, DEFAULT_INPUT, SampleConfig,
    ViewConfig,
};
use scholarstream::explore::explore;
use scholarstream::pipeline::{ANALYSIS_SUMMARY, run_analysis, run_clean};
use scholarstream::render::SvgRenderer;
use std::path::PathBuf;
use std::process::ExitCode;

/// Bounded-memory pipeline over large scholarly metadata CSV files
#[derive(Parser, Debug)]
#[command(version, author)]
struct Cli {
    /// Log debug details, such as per-batch drop counts
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean the raw metadata into the cleaned artifact
    Clean(CleanArgs),
    /// Aggregate the cleaned artifact and render the static images
    Analyze(AnalyzeArgs),
    /// Sample the cleaned artifact, filter it and report the view
    Explore(ExploreArgs),
    /// Clean, then analyse
    Run {
        #[command(flatten)]
        clean: CleanArgs,
        #[command(flatten)]
        analyze: AnalyzeOptions,
    },
}

#[derive(Args, Debug)]
struct CleanArgs {
    /// Raw metadata file (optionally .gz/.zst/.bz2/.xz compressed)
    #[arg(short, long, default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// Cleaned artifact to create
    #[arg(short, long, default_value = DEFAULT_CLEANED)]
    output: PathBuf,

    /// Rows per cleaning window
    ///
    /// This is purely a memory knob: the cleaned artifact is identical for
    /// every window size.
    #[arg(long, default_value_t = 10_000)]
    clean_window: usize,

    /// Low-value columns removed when present
    #[arg(long, value_delimiter = ',', default_value = "journal,pmcid")]
    drop_columns: Vec<String>,

    /// Replace an existing cleaned artifact instead of refusing to run
    #[arg(long)]
    overwrite: bool,
}

impl From<CleanArgs> for CleanConfig {
    fn from(args: CleanArgs) -> Self {
        let CleanArgs {
            input,
            output,
            clean_window,
            drop_columns,
            overwrite,
        } = args;
        Self {
            input,
            output,
            window_size: clean_window,
            drop_columns,
            overwrite,
        }
    }
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Cleaned artifact to analyse
    #[arg(short, long, default_value = DEFAULT_CLEANED)]
    input: PathBuf,

    #[command(flatten)]
    options: AnalyzeOptions,
}

#[derive(Args, Debug)]
struct AnalyzeOptions {
    /// Directory receiving the images and the summary
    #[arg(long, default_value = DEFAULT_IMAGE_DIR)]
    image_dir: PathBuf,

    /// Rows per analysis window
    #[arg(long, default_value_t = 15_000)]
    analysis_window: usize,

    /// Number of sources kept in the top-sources view
    #[arg(long, default_value_t = 10)]
    top_categories: usize,

    /// Number of tokens kept in the word cloud
    #[arg(long, default_value_t = 50)]
    top_tokens: usize,

    /// Minimum length of a counted title token
    #[arg(long, default_value_t = 3)]
    min_token_len: usize,

    /// Categorical column counted as the source
    #[arg(long, default_value = "source")]
    source_field: String,

    /// Bins of the title word count histogram
    #[arg(long, default_value_t = 50)]
    bins: usize,
}

impl AnalyzeOptions {
    fn into_config(self, input: PathBuf) -> AnalysisConfig {
        AnalysisConfig {
            input,
            output_dir: self.image_dir,
            window_size: self.analysis_window,
            top_categories: self.top_categories,
            top_tokens: self.top_tokens,
            min_token_len: self.min_token_len,
            source_field: self.source_field,
            histogram_bins: self.bins,
            ..AnalysisConfig::default()
        }
    }
}

#[derive(Args, Debug)]
struct ExploreArgs {
    /// Cleaned artifact to sample
    #[arg(short, long, default_value = DEFAULT_CLEANED)]
    input: PathBuf,

    /// Share of the rows to load
    #[arg(short, long, default_value_t = 0.05)]
    fraction: f64,

    /// Sampling seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Rows per sampling window
    #[arg(long, default_value_t = 10_000)]
    sample_window: usize,

    /// Categorical column offered as the source filter
    #[arg(long, default_value = "source")]
    source_field: String,

    /// First year of the filter (defaults to five years before the last one)
    #[arg(long)]
    from_year: Option<i32>,

    /// Last year of the filter (defaults to the last year in the sample)
    #[arg(long, requires = "from_year")]
    to_year: Option<i32>,

    /// Sources to keep (defaults to the five most frequent)
    #[arg(long, value_delimiter = ',')]
    sources: Option<Vec<String>>,

    /// Rows shown in the preview
    #[arg(long, default_value_t = 10)]
    preview_rows: usize,

    /// Directory holding the static images of the analysis run
    #[arg(long, default_value = DEFAULT_IMAGE_DIR)]
    image_dir: PathBuf,

    /// Render the two filtered charts into this directory
    #[arg(long)]
    plot_dir: Option<PathBuf>,

    /// Also write the report as JSON
    #[arg(long)]
    json: Option<PathBuf>,
}

impl ExploreArgs {
    fn configs(self) -> (SampleConfig, ViewConfig, Option<PathBuf>) {
        let sample = SampleConfig {
            path: self.input,
            window_size: self.sample_window,
            fraction: self.fraction,
            seed: self.seed,
            source_field: self.source_field,
        };
        let year_range = self
            .from_year
            .map(|first| (first, self.to_year.unwrap_or(i32::MAX)));
        let view = ViewConfig {
            year_range,
            sources: self.sources,
            preview_rows: self.preview_rows,
            image_dir: self.image_dir,
            output_dir: self.plot_dir,
            ..ViewConfig::default()
        };
        (sample, view, self.json)
    }
}

fn setup_logging(cli: &Cli) {
    let level = if cli.verbose {
        LevelFilter::Debug
    } else if cli.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn clean(args: CleanArgs) -> Result<PathBuf> {
    let report = run_clean(&args.into())?;
    report.metrics.print();
    report.save_json(report.metrics_path())?;
    Ok(report.output)
}

fn analyze(cfg: &AnalysisConfig) -> Result<()> {
    let report = run_analysis(cfg, &SvgRenderer::default())?;
    report.summary.print();
    report.metrics.print();
    println!(
        "Summary saved in {}",
        cfg.output_dir.join(ANALYSIS_SUMMARY).display()
    );
    Ok(())
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Clean(args) => clean(args).map(|_| ()),
        Command::Analyze(args) => analyze(&args.options.into_config(args.input)),
        Command::Explore(args) => {
            let (sample, view, json) = args.configs();
            let report = explore(&sample, &view, &SvgRenderer::default())?;
            report.print();
            if let Some(path) = json {
                report.save_json(path)?;
            }
            Ok(())
        }
        Command::Run { clean: args, analyze: options } => {
            let cleaned = clean(args)?;
            analyze(&options.into_config(cleaned))
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(&cli);
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
