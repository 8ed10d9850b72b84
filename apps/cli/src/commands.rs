//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use mdpress_artifacts::DocumentTemplate;
use mdpress_core::{ArtifactBuilder, FragmentStore, ProgressReporter, check_manifest, run_all};
use mdpress_render::{ChromeRenderer, RenderOptions, RetryPolicy, locate_browser};
use mdpress_shared::{
    AppConfig, ArtifactOutcome, ArtifactStatus, BuildReport, CONFIG_FILE_NAME, Manifest,
    MissingFragmentPolicy, expand_home, init_config, load_config, load_manifest,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// mdpress — print markdown knowledge bases to PDF.
#[derive(Parser)]
#[command(
    name = "mdpress",
    version,
    about = "Assemble markdown fragments into branded, print-ready PDFs.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ./mdpress.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

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

/// Input locations shared by every command that reads the manifest.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct SourceArgs {
    /// Manifest file.
    #[arg(long)]
    pub manifest: Option<String>,

    /// Directory fragment ids are resolved against.
    #[arg(long)]
    pub content: Option<String>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Render every artifact in the manifest.
    Build {
        #[command(flatten)]
        source: SourceArgs,

        /// Only build these categories (repeatable).
        #[arg(long = "category")]
        categories: Vec<String>,

        /// Artifacts rendered concurrently within a category.
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Fail artifacts with any missing fragment.
        #[arg(long)]
        strict: bool,

        /// Browser executable or name on PATH.
        #[arg(long, env = "MDPRESS_BROWSER")]
        browser: Option<String>,

        /// Output directory.
        #[arg(short, long)]
        out: Option<String>,

        /// Write the build report as JSON to this file.
        #[arg(long)]
        report_json: Option<PathBuf>,
    },

    /// Resolve every fragment without rendering.
    Check {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// List categories and artifacts.
    List {
        /// Manifest file.
        #[arg(long)]
        manifest: Option<String>,
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
    /// Write a config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "mdpress=info",
        1 => "mdpress=debug",
        _ => "mdpress=trace",
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
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Build {
            source,
            categories,
            jobs,
            strict,
            browser,
            out,
            report_json,
        } => {
            let mut config = load_config(config_path)?;
            apply_source(&mut config, &source);
            if let Some(out) = out {
                config.paths.output_root = out;
            }
            if let Some(jobs) = jobs {
                config.build.jobs = jobs.max(1);
            }
            if strict {
                config.build.missing_fragments = MissingFragmentPolicy::Fail;
            }
            if let Some(browser) = browser {
                config.render.browser = browser;
            }
            cmd_build(&config, &categories, report_json.as_deref()).await
        }
        Command::Check { source } => {
            let mut config = load_config(config_path)?;
            apply_source(&mut config, &source);
            cmd_check(&config)
        }
        Command::List { manifest } => {
            let mut config = load_config(config_path)?;
            if let Some(manifest) = manifest {
                config.paths.manifest = manifest;
            }
            cmd_list(&config)
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn apply_source(config: &mut AppConfig, source: &SourceArgs) {
    if let Some(manifest) = &source.manifest {
        config.paths.manifest = manifest.clone();
    }
    if let Some(content) = &source.content {
        config.paths.content_root = content.clone();
    }
}

fn load_selected_manifest(config: &AppConfig, categories: &[String]) -> Result<Manifest> {
    let manifest = load_manifest(&expand_home(&config.paths.manifest))?;
    if categories.is_empty() {
        Ok(manifest)
    } else {
        Ok(manifest.select_categories(categories)?)
    }
}

// ---------------------------------------------------------------------------
// build
// ---------------------------------------------------------------------------

async fn cmd_build(
    config: &AppConfig,
    categories: &[String],
    report_json: Option<&Path>,
) -> Result<()> {
    let manifest = load_selected_manifest(config, categories)?;

    let browser = locate_browser(Some(config.render.browser.as_str()))?;
    let output_root = expand_home(&config.paths.output_root);
    let content_root = expand_home(&config.paths.content_root);
    if !content_root.is_dir() {
        return Err(eyre!(
            "content root '{}' is not a directory",
            content_root.display()
        ));
    }

    info!(
        browser = %browser.display(),
        content_root = %content_root.display(),
        output_root = %output_root.display(),
        jobs = config.build.jobs,
        "building PDFs"
    );

    let renderer = ChromeRenderer::new(RenderOptions::from_config(
        &config.render,
        browser,
        config.paths.scratch_dir(),
    ));
    let builder = ArtifactBuilder::new(
        FragmentStore::new(content_root),
        DocumentTemplate::new(&config.branding),
        Arc::new(renderer),
    )
    .with_retry(RetryPolicy::from_config(&config.render))
    .with_missing_policy(config.build.missing_fragments);

    let progress = CliProgress::new(manifest.artifact_count());
    let report = run_all(
        &manifest,
        Arc::new(builder),
        &output_root,
        config.build.jobs,
        &progress,
    )
    .await;

    println!();
    println!("  COMPLETE: {}/{}", report.succeeded, report.total);
    println!("  Location: {}", report.output_root.display());
    if let Some(elapsed) = elapsed_secs(&report) {
        println!("  Time:     {elapsed:.1}s");
    }
    println!();

    if let Some(path) = report_json {
        std::fs::write(path, report.to_json()?)
            .map_err(|e| eyre!("cannot write report to '{}': {e}", path.display()))?;
        info!(path = %path.display(), "wrote build report");
    }

    if report.all_succeeded() {
        Ok(())
    } else {
        Err(eyre!(
            "{} of {} artifacts failed",
            report.failed(),
            report.total
        ))
    }
}

fn elapsed_secs(report: &BuildReport) -> Option<f64> {
    let finished = report.finished_at?;
    Some((finished - report.started_at).num_milliseconds() as f64 / 1000.0)
}

/// One summary line per finished artifact.
fn outcome_line(outcome: &ArtifactOutcome) -> String {
    let file = outcome
        .output_path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| outcome.artifact.clone());

    match &outcome.status {
        ArtifactStatus::Succeeded { bytes, .. } => {
            let kb = (*bytes as f64 / 1024.0).round();
            format!("     OK  {file} ({kb} KB)")
        }
        ArtifactStatus::Skipped { reason } | ArtifactStatus::Failed { reason } => {
            format!("     ERR {file}: {reason}")
        }
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Progress bar with per-artifact lines printed above it.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { bar }
    }
}

impl ProgressReporter for CliProgress {
    fn category_started(&self, category: &str, _artifacts: usize) {
        self.bar.suspend(|| println!("\n  [{category}]"));
        self.bar.set_message(category.to_string());
    }

    fn artifact_finished(&self, outcome: &ArtifactOutcome) {
        let line = outcome_line(outcome);
        self.bar.suspend(|| println!("{line}"));
        self.bar.inc(1);
    }

    fn done(&self, _report: &BuildReport) {
        self.bar.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// check / list
// ---------------------------------------------------------------------------

fn cmd_check(config: &AppConfig) -> Result<()> {
    let manifest = load_selected_manifest(config, &[])?;
    let store = FragmentStore::new(expand_home(&config.paths.content_root));
    let report = check_manifest(&manifest, &store);

    for entry in report.problems() {
        println!("  [{}] {}", entry.category, entry.artifact);
        for fragment in &entry.missing {
            println!("     missing  {fragment}");
        }
        if entry.empty {
            println!("     empty    every fragment is missing or blank");
        }
        if let Some(error) = &entry.error {
            println!("     error    {error}");
        }
    }

    let problems = report.problems().count();
    println!();
    println!(
        "  {} artifacts checked, {} with problems, {} missing fragments",
        report.entries.len(),
        problems,
        report.missing_count()
    );

    if report.is_clean() {
        Ok(())
    } else {
        Err(eyre!("{problems} artifacts have unresolved fragments"))
    }
}

fn cmd_list(config: &AppConfig) -> Result<()> {
    let manifest = load_selected_manifest(config, &[])?;

    for category in &manifest.categories {
        println!("{}", category.name);
        for artifact in &category.artifacts {
            println!(
                "  {:<40} {} fragments",
                artifact.name,
                artifact.fragments.len()
            );
        }
    }
    println!();
    println!(
        "{} categories, {} artifacts",
        manifest.categories.len(),
        manifest.artifact_count()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init(explicit: Option<&Path>) -> Result<()> {
    let path = explicit.unwrap_or(Path::new(CONFIG_FILE_NAME));
    let path = init_config(path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(explicit: Option<&Path>) -> Result<()> {
    let config = load_config(explicit)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
