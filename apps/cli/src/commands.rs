//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tallycheck_artifacts::render_csv;
use tallycheck_core::pipeline::{self, ProgressReporter, RunResult};
use tallycheck_extract::TableExtractor;
use tallycheck_shared::{
    AppConfig, MergePolicy, RunConfig, TallycheckError, init_config, load_config,
};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// tallycheck: aggregate election results pages and cross-check tier totals.
#[derive(Parser)]
#[command(
    name = "tallycheck",
    version,
    about = "Aggregate downloaded election results pages and cross-check totals between tiers.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Parse every tier of a downloaded corpus and write CSVs and reports.
    Parse {
        /// Directory holding the downloaded pages.
        #[arg(short, long)]
        pages: Option<PathBuf>,

        /// Directory receiving CSVs and logs.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Skip cross-checking totals between tiers.
        #[arg(long)]
        no_check: bool,

        /// Keep the first count when two documents disagree about a location.
        #[arg(long)]
        strict: bool,

        /// Maximum documents parsed at once.
        #[arg(short, long)]
        concurrency: Option<usize>,
    },

    /// Extract a single page and print its fragment as CSV.
    Extract {
        /// Page file to extract.
        file: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "tallycheck=info",
        1 => "tallycheck=debug",
        _ => "tallycheck=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Parse {
            pages,
            out,
            no_check,
            strict,
            concurrency,
        } => {
            let overrides = ParseOverrides {
                pages,
                out,
                no_check,
                strict,
                concurrency,
            };
            cmd_parse(overrides).await
        }
        Command::Extract { file } => cmd_extract(&file),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

/// `parse` flags that override the config file.
struct ParseOverrides {
    pages: Option<PathBuf>,
    out: Option<PathBuf>,
    no_check: bool,
    strict: bool,
    concurrency: Option<usize>,
}

impl ParseOverrides {
    fn apply(self, config: &AppConfig) -> RunConfig {
        let mut run = RunConfig::from(config);
        if let Some(pages) = self.pages {
            run.page_dir = pages;
        }
        if let Some(out) = self.out {
            run.results_dir = out;
        }
        if self.no_check {
            run.cross_validate = false;
        }
        if self.strict {
            run.merge_policy = MergePolicy::Strict;
        }
        if let Some(n) = self.concurrency {
            run.concurrency = n.max(1);
        }
        run
    }
}

async fn cmd_parse(overrides: ParseOverrides) -> Result<()> {
    let config = load_config()?;
    let run_config = overrides.apply(&config);

    if !run_config.page_dir.is_dir() {
        return Err(eyre!(
            "page directory '{}' does not exist; download the corpus first or pass --pages",
            run_config.page_dir.display()
        ));
    }

    info!(
        pages = %run_config.page_dir.display(),
        results = %run_config.results_dir.display(),
        cross_validate = run_config.cross_validate,
        concurrency = run_config.concurrency,
        "parsing corpus"
    );

    let reporter = CliProgress::new();
    let result = pipeline::run(&run_config, &reporter).await?;

    // Print summary
    println!("  Results:   {}", result.results_dir.display());
    for outcome in &result.tiers {
        let patterns = match &outcome.fallback_from {
            Some(primary) => format!("{primary} then {}", outcome.pattern),
            None => outcome.pattern.clone(),
        };
        println!(
            "  {:<12} {} documents ({}), {} skipped, {} conflicts, {} rows",
            format!("{}:", outcome.tier),
            outcome.documents,
            patterns,
            outcome.errors.len(),
            outcome.conflicts,
            outcome.table.len(),
        );
    }
    if run_config.cross_validate {
        let dirty = result.reports.iter().filter(|r| !r.is_clean()).count();
        println!("  Checks:    {} of {} tier pairs disagree", dirty, result.reports.len());
    }
    println!("  Time:      {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_extract(file: &Path) -> Result<()> {
    let config = load_config()?;
    let extractor = TableExtractor::new(config.extract);

    let fragment = pipeline::extract_document(&extractor, file)?;
    info!(
        file = %file.display(),
        paths = fragment.len(),
        labels = fragment.labels().len(),
        "page extracted"
    );

    print!("{}", render_csv(&fragment)?);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter: a spinner for parsing, report sections on stdout.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn document_parsed(&self, name: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Parsing [{current}/{total}] {name}"));
    }

    fn document_failed(&self, name: &str, error: &TallycheckError) {
        let reason = match error {
            TallycheckError::MalformedPage { .. } => "no row labels",
            TallycheckError::NoGeography { .. } => "no location links",
            _ => "unreadable",
        };
        self.spinner
            .suspend(|| eprintln!("  skipped {name}: {reason}"));
    }

    fn report(&self, text: &str) {
        self.spinner.suspend(|| print!("{text}"));
    }

    fn done(&self, _result: &RunResult) {
        self.spinner.finish_and_clear();
    }
}
