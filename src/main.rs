//! nyrkio-report CLI - submit browser test durations to Nyrkiö.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use nyrkio_reporter::config::{self, Config};
use nyrkio_reporter::framework;
use nyrkio_reporter::git::GitResolver;
use nyrkio_reporter::orchestrator::Orchestrator;
use nyrkio_reporter::path::build_path;
use nyrkio_reporter::report::{ConsoleReporter, MultiReporter, NyrkioReporter, RunContext};
use nyrkio_reporter::submit::{DryRunTransport, HttpTransport, Submitter};

#[derive(Parser)]
#[command(name = "nyrkio-report")]
#[command(about = "Submit per-test durations to Nyrkiö", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "nyrkio.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit the results in one or more test reports
    Submit {
        /// JUnit XML (.xml) or Playwright JSON (.json) reports
        #[arg(required = true)]
        reports: Vec<PathBuf>,

        /// Print the requests instead of sending them
        #[arg(long)]
        dry_run: bool,

        /// Branch name to report instead of the checked-out one
        #[arg(long)]
        branch: Option<String>,
    },

    /// Print the result path of every test in the reports
    Paths {
        /// JUnit XML (.xml) or Playwright JSON (.json) reports
        #[arg(required = true)]
        reports: Vec<PathBuf>,

        /// Branch name to use instead of the checked-out one
        #[arg(long)]
        branch: Option<String>,
    },

    /// Validate configuration file
    Validate,

    /// Initialize a new configuration file
    Init {
        /// Project name (outermost result path segment)
        #[arg(short, long, default_value = "my-project")]
        project: String,

        /// Repository URL recorded with every result
        #[arg(short, long, default_value = "https://github.com/example/my-project")]
        git_repo: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Submit {
            reports,
            dry_run,
            branch,
        } => submit(&cli.config, &reports, dry_run, branch, cli.verbose).await,
        Commands::Paths { reports, branch } => print_paths(&cli.config, &reports, branch).await,
        Commands::Validate => validate_config(&cli.config),
        Commands::Init { project, git_repo } => init_config(&project, &git_repo),
    }
}

async fn submit(
    config_path: &Path,
    reports: &[PathBuf],
    dry_run: bool,
    branch: Option<String>,
    verbose: bool,
) -> Result<()> {
    let config = config::load_config(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    info!("Loaded configuration from {}", config_path.display());

    let submitter = create_submitter(&config, dry_run)?;

    let context = RunContext::resolve(&config, branch.as_deref())
        .await
        .context("Failed to resolve source-control metadata")?;
    info!(
        "Reporting {} on branch {} at commit {}",
        context.project_name(),
        context.branch(),
        context.git().commit
    );

    let events = framework::load_all_results(reports).context("Failed to read test reports")?;

    let nyrkio = Arc::new(NyrkioReporter::new(context, submitter));
    let reporter = MultiReporter::new()
        .with_reporter(ConsoleReporter::new(verbose))
        .with_reporter(nyrkio.clone());

    Orchestrator::new(reporter).run(&events).await;

    let report = nyrkio.take_flush_report().unwrap_or_default();
    if !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn create_submitter(config: &Config, dry_run: bool) -> Result<Submitter> {
    if dry_run {
        return Ok(Submitter::from_config(
            &config.nyrkio,
            String::new(),
            DryRunTransport,
        ));
    }

    let token_env = &config.nyrkio.token_env;
    let token = std::env::var(token_env)
        .with_context(|| format!("Environment variable {} is not set", token_env))?;
    if token.trim().is_empty() {
        bail!("Environment variable {} is empty", token_env);
    }

    let transport = HttpTransport::new(config.nyrkio.request_timeout())?;
    Ok(Submitter::from_config(&config.nyrkio, token, transport))
}

async fn print_paths(config_path: &Path, reports: &[PathBuf], branch: Option<String>) -> Result<()> {
    let config = config::load_config(config_path)?;

    let mut resolver = GitResolver::new();
    if let Some(dir) = &config.git.working_dir {
        resolver = resolver.with_working_dir(dir);
    }
    if let Some(branch) = branch.or_else(|| config.git.branch.clone()) {
        resolver = resolver.with_branch(branch);
    }
    let branch = resolver
        .branch()
        .await
        .context("Failed to resolve branch name")?;

    let events = framework::load_all_results(reports).context("Failed to read test reports")?;
    for event in &events {
        println!(
            "{}",
            build_path(&config.nyrkio.project_name, &branch, &event.test)
        );
    }

    Ok(())
}

fn validate_config(config_path: &Path) -> Result<()> {
    match config::load_config(config_path) {
        Ok(config) => {
            println!("Configuration is valid!");
            println!();
            println!("Settings:");
            println!("  Project: {}", config.nyrkio.project_name);
            println!("  Repository: {}", config.nyrkio.git_repo);
            println!("  API: {}", config.nyrkio.api_url);
            println!("  Site: {}", config.nyrkio.site_url);
            println!("  Token variable: {}", config.nyrkio.token_env);
            println!("  Request timeout: {}s", config.nyrkio.request_timeout_secs);
            println!("  Flush deadline: {}s", config.nyrkio.flush_deadline_secs);
            if let Some(branch) = &config.git.branch {
                println!("  Branch override: {}", branch);
            }

            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_config(project: &str, git_repo: &str) -> Result<()> {
    let config = format!(
        r#"# nyrkio-report configuration file

[nyrkio]
project_name = "{}"
git_repo = "{}"
api_url = "https://nyrkio.com"
site_url = "https://nyrkio.com"
# Environment variable holding the API token
token_env = "NYRKIO_TOKEN"
request_timeout_secs = 30
flush_deadline_secs = 300

[git]
# Set when CI checks out a detached HEAD
# branch = "main"
"#,
        project, git_repo
    );

    let path = PathBuf::from("nyrkio.toml");
    if path.exists() {
        eprintln!("nyrkio.toml already exists. Remove it first or edit manually.");
        std::process::exit(1);
    }

    std::fs::write(&path, config)?;
    println!("Created nyrkio.toml");
    println!();
    println!("Edit the configuration as needed, then run:");
    println!("  nyrkio-report submit test-results/junit.xml");

    Ok(())
}
