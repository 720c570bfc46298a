//! plugdir - editor plugin resolver
//!
//! Usage:
//!   plugdir resolve           # Resolve plugdir.toml and write the link directory
//!   plugdir names --format lua
//!   plugdir prefetch owner/repo --rev v1.2.0
//!   plugdir hash <DIR>

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use plugdir_core::catalog::default_state_dir;
use plugdir_core::commands::{
    PrefetchCommand, PrefetchReport, ResolveCommand, ResolveOptions, ResolveReport,
};
use plugdir_core::fetch::{DEFAULT_FORGE, FetchBackend};
use plugdir_core::fs::{format_hash, hash_tree};
use plugdir_core::names::{NamesFormat, render_link_names};
use plugdir_core::reconcile::Strategy;
use plugdir_core::report::Severity;
use plugdir_core::types::Provenance;

#[derive(Parser)]
#[command(name = "plugdir")]
#[command(about = "Resolve editor plugins into a link directory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the catalog, write the link directory and the lockfile
    Resolve {
        #[command(flatten)]
        catalog: CatalogArgs,

        /// Replace regular files or directories standing where a link goes
        #[arg(long, short)]
        force: bool,

        /// Resolve only; write neither links nor lockfile
        #[arg(long)]
        dry_run: bool,

        /// Output format
        #[arg(short = 'o', long, default_value = "table")]
        format: OutputFormat,
    },

    /// Print the link names the catalog resolves to
    Names {
        #[command(flatten)]
        catalog: CatalogArgs,

        /// Output format (lines, lua, json)
        #[arg(long, default_value = "lines")]
        format: String,
    },

    /// Fetch one repository and print its tree hash
    Prefetch {
        /// Repository as owner/repo
        id: String,

        /// Tag, branch or commit (defaults to HEAD)
        #[arg(long)]
        rev: Option<String>,

        /// Fetch backend (git, archive)
        #[arg(long)]
        backend: Option<String>,

        /// Forge base URL
        #[arg(long)]
        forge: Option<String>,

        /// Cache directory for fetched sources
        #[arg(long)]
        state_dir: Option<PathBuf>,

        /// Output format
        #[arg(short = 'o', long, default_value = "table")]
        format: OutputFormat,
    },

    /// Print the content hash of a directory
    Hash {
        /// Directory to hash
        dir: PathBuf,
    },
}

#[derive(Args)]
struct CatalogArgs {
    /// Catalog file; repeat to layer several, lowest precedence first
    #[arg(long = "catalog", short = 'c', value_name = "FILE")]
    catalogs: Vec<PathBuf>,

    /// Registry snapshot (JSON)
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Reconciliation strategy (prefer-stable, prefer-freshest)
    #[arg(long)]
    strategy: Option<String>,

    /// Fetch backend (git, archive)
    #[arg(long)]
    backend: Option<String>,

    /// Forge base URL
    #[arg(long)]
    forge: Option<String>,

    /// Directory the links are written to
    #[arg(long)]
    link_dir: Option<PathBuf>,

    /// Lockfile path
    #[arg(long)]
    lockfile: Option<PathBuf>,

    /// Cache directory for fetched sources
    #[arg(long)]
    state_dir: Option<PathBuf>,
}

impl CatalogArgs {
    fn into_options(self) -> Result<ResolveOptions> {
        let mut options = ResolveOptions::new();
        options.catalogs = self.catalogs;
        options.registry = self.registry;
        options.strategy = self.strategy.as_deref().map(str::parse::<Strategy>).transpose()?;
        options.backend = self.backend.as_deref().map(str::parse::<FetchBackend>).transpose()?;
        options.forge = self.forge;
        options.link_dir = self.link_dir;
        options.lockfile = self.lockfile;
        options.state_dir = self.state_dir;
        Ok(options)
    }
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Table,
    Json,
    Quiet,
}

fn main() -> Result<()> {
    // Logs go to stderr so `names` output stays clean on stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plugdir=info,plugdir_core=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            catalog,
            force,
            dry_run,
            format,
        } => run_resolve(catalog, force, dry_run, format),
        Commands::Names { catalog, format } => run_names(catalog, &format),
        Commands::Prefetch {
            id,
            rev,
            backend,
            forge,
            state_dir,
            format,
        } => run_prefetch(&id, rev.as_deref(), backend, forge, state_dir, format),
        Commands::Hash { dir } => {
            println!("{}", format_hash(&hash_tree(&dir)?));
            Ok(())
        }
    }
}

fn run_resolve(catalog: CatalogArgs, force: bool, dry_run: bool, format: OutputFormat) -> Result<()> {
    let options = catalog
        .into_options()?
        .with_force(force)
        .with_dry_run(dry_run);

    let cmd = ResolveCommand::with_defaults()?;
    let report = cmd.execute(&options)?;
    tracing::debug!(
        project = %cmd.project_root().display(),
        strategy = %report.settings.strategy,
        "resolve finished"
    );

    match format {
        OutputFormat::Table => print_resolve_table(&report),
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Quiet => {
            if report.resolution.report.has_errors() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn run_names(catalog: CatalogArgs, format: &str) -> Result<()> {
    let format: NamesFormat = format.parse()?;
    let options = catalog.into_options()?.with_dry_run(true);

    let cmd = ResolveCommand::with_defaults()?;
    let report = cmd.execute(&options)?;

    print!(
        "{}",
        render_link_names(&report.resolution.link_names(), format)?
    );
    Ok(())
}

fn run_prefetch(
    id: &str,
    rev: Option<&str>,
    backend: Option<String>,
    forge: Option<String>,
    state_dir: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let backend = backend
        .as_deref()
        .map(str::parse::<FetchBackend>)
        .transpose()?
        .unwrap_or_default();
    let forge = forge.unwrap_or_else(|| DEFAULT_FORGE.to_string());
    let state_dir = match state_dir {
        Some(dir) => dir,
        None => default_state_dir()?,
    };

    let fetcher = backend.build(state_dir, &forge)?;
    let report = PrefetchCommand::new(fetcher).execute(id, rev)?;

    match format {
        OutputFormat::Table => print_prefetch_table(&report),
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Quiet => println!("{}", report.tree_hash),
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_resolve_table(report: &ResolveReport) {
    let resolution = &report.resolution;
    let specs = &resolution.report.specs;

    if specs.is_empty() {
        println!("No plugins in catalog.");
        return;
    }

    println!(
        "{:<28} {:<24} {:<12} Version",
        "Plugin", "Link", "Source"
    );
    println!("{}", "-".repeat(80));

    for spec in specs {
        let provenance = match spec.provenance {
            Provenance::Registry => style(format!("{:<12}", spec.provenance)).green(),
            Provenance::Fetched => style(format!("{:<12}", spec.provenance)).cyan(),
            Provenance::Unresolved => style(format!("{:<12}", spec.provenance)).red(),
        };
        println!(
            "{:<28} {:<24} {} {}",
            spec.id,
            spec.link_name,
            provenance,
            spec.concrete_version.as_deref().unwrap_or("-")
        );
    }

    if !resolution.report.diagnostics.is_empty() {
        println!();
        for diagnostic in &resolution.report.diagnostics {
            let label = match diagnostic.severity() {
                Severity::Warning => style("warning").yellow(),
                Severity::Error => style("error").red().bold(),
            };
            println!("{label}: {diagnostic}");
        }
    }

    let summary = resolution.report.summary();
    println!();
    println!(
        "{} plugins: {} registry, {} fetched, {} unresolved",
        summary.total, summary.registry, summary.fetched, summary.unresolved
    );

    match &report.layout {
        Some(layout) => {
            println!(
                "Links in {}: {} created, {} unchanged, {} removed",
                report.settings.link_dir.display(),
                layout.created.len(),
                layout.unchanged.len(),
                layout.removed.len()
            );
            if report.lockfile_written {
                println!("Updated {}", report.settings.lockfile.display());
            }
        }
        None => println!("Dry run: nothing written."),
    }
}

fn print_prefetch_table(report: &PrefetchReport) {
    println!("{:<10} {}", "Plugin", report.id);
    println!("{:<10} {}", "Revision", report.reference);
    if let Some(commit) = &report.commit {
        println!("{:<10} {}", "Commit", commit);
    }
    println!("{:<10} {}", "Path", report.path.display());
    println!("{:<10} {}", "Hash", style(&report.tree_hash).bold());
}
