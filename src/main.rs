//! build_pcm_repo: builds the KiCad PCM release archive and repository indexes
//!
//! Reads `pcm/metadata.base.json` and `lib-content/`, and writes
//! `dist/releases/<identifier>_v<version>_pcm.zip`, `dist/packages.json` and
//! `dist/repository.json`.

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use kicad_pcm_builder::config;
use kicad_pcm_builder::pcm::{
    BuildRequest, GithubRepo, ReleaseVersion, RepositoryBuilder, VersionStatus,
};

/// Build KiCad PCM package zip and repository index files.
///
/// The release archive must be uploaded to the GitHub release tagged
/// `v<VERSION>`, and `dist/` committed to the configured branch.
// No `version` in the command attributes: `--version` is the release version.
#[derive(Parser, Debug)]
#[command(name = "build_pcm_repo")]
#[command(author, about, long_about = None)]
struct Args {
    /// Package version, e.g. 1.0.0
    #[arg(long, value_name = "VERSION")]
    version: String,

    /// GitHub username or organisation
    #[arg(long, value_name = "OWNER")]
    github_owner: String,

    /// GitHub repository name
    #[arg(long, value_name = "NAME")]
    repo: String,

    /// PCM version status
    #[arg(long, value_enum, default_value_t = VersionStatus::Stable)]
    status: VersionStatus,

    /// Project root containing `pcm/` and the library content
    #[arg(long, value_name = "DIR", default_value = ".")]
    root: PathBuf,

    /// Path to a build configuration file (default: <ROOT>/pcm/build.json if present)
    #[arg(long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Keep the other releases listed in the existing packages.json
    #[arg(long)]
    append: bool,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Formats an error followed by its chain of causes.
fn describe(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn main() -> ExitCode {
    // Usage errors exit 1 like every other failure; --help exits 0.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let cfg = match config::load_config(&args.root, args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", describe(&e));
            return ExitCode::FAILURE;
        }
    };

    init_tracing(get_log_level(args.verbose, args.quiet, &cfg.logging.level));

    let version = match ReleaseVersion::parse(&args.version) {
        Ok(version) => version,
        Err(e) => {
            error!(error = %describe(&e), "Invalid arguments");
            return ExitCode::FAILURE;
        }
    };

    let github = GithubRepo::new(args.github_owner, args.repo, cfg.branch.clone());
    let builder = match RepositoryBuilder::new(cfg) {
        Ok(builder) => builder,
        Err(e) => {
            eprintln!("Configuration error: {}", describe(&e));
            return ExitCode::FAILURE;
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        root = %args.root.display(),
        "Starting build_pcm_repo"
    );

    let request = BuildRequest {
        root: args.root,
        version,
        status: args.status,
        github,
        append: args.append,
    };

    match builder.build(&request) {
        Ok(report) => {
            println!("Built package: {}", report.archive_path.display());
            println!("Wrote index: {}", report.packages_path.display());
            println!("Wrote index: {}", report.repository_path.display());
            println!("Upload it to: {}", report.download_url);
            println!("Repository URL for KiCad PCM:");
            println!("{}", report.repository_url);
            ExitCode::SUCCESS
        }
        Err(e) => {
            let kind = if e.is_input_error() {
                "Invalid input"
            } else {
                "Build failed"
            };
            error!(error = %describe(&e), "{kind}");
            ExitCode::FAILURE
        }
    }
}
