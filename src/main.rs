//! SmokeRunner CLI Entry Point
//!
//! Provides command-line interface for running smoke tests.
//!
//! # Usage
//!
//! ```bash
//! # Run every test selected for tag "sit"
//! smokerunner smoke.txt sit
//!
//! # Only tests whose command contains "admin"
//! smokerunner smoke.txt sit '~=admin'
//!
//! # Declarative source, listing the 10 slowest passes
//! smokerunner smoke.json prod --top 10
//!
//! # Run commands from another directory
//! smokerunner smoke.yaml dev --working-dir /srv/app
//! ```

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use log::{error, info, warn};

use smokerunner::config::{exit_code, EnvNames, DEFAULT_SLOWEST_COUNT, ENV_PREFIX};
use smokerunner::execution::{run_batch, CommandUnit, ShellInvoker};
use smokerunner::report::{exit_status, render_report, ReportOptions};
use smokerunner::selection::{ScanOptions, SelectionFilter};
use smokerunner::source::{load_source, InvocationMeta};
use smokerunner::{SmokeError, APP_NAME, VERSION};

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    source_path: Option<String>,
    tag: Option<String>,
    filter: Option<String>,
    top: usize,
    env_prefix: Option<String>,
    working_dir: Option<PathBuf>,
    verbose: bool,
    no_color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_path: None,
            tag: None,
            filter: None,
            top: DEFAULT_SLOWEST_COUNT,
            env_prefix: None,
            working_dir: None,
            verbose: false,
            no_color: false,
        }
    }
}

/// A failed run and the exit code it maps to.
#[derive(Debug)]
struct Failure {
    code: u8,
    message: String,
}

impl Failure {
    fn new(code: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Maps a load or scan error to its exit code.
fn source_failure(e: SmokeError) -> Failure {
    let code = match e {
        SmokeError::Io(_) => exit_code::IO,
        _ => exit_code::CONFIG,
    };
    Failure::new(code, e.to_string())
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME, VERSION);
    println!("Parallel Smoke Test Runner");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: smokerunner [OPTIONS] <SOURCE> <TAG> [FILTER]");
    println!();
    println!("Arguments:");
    println!("  <SOURCE>            Text, JSON (.json) or YAML (.yaml/.yml) smoke test file");
    println!("  <TAG>               Selector tag, case insensitive (e.g. dev, sit, prod)");
    println!("  [FILTER]            Optional filter applied to already selected tests:");
    println!("                        ==REGEX    command matches regex");
    println!("                        =!REGEX    command does not match regex");
    println!("                        ~=TEXT     command contains text");
    println!("                        ~!TEXT     command does not contain text");
    println!("                        #ID#ID#    test id is listed");
    println!("                        TEXT       command contains text");
    println!();
    println!("Options:");
    println!("  --top N             Slowest passing tests to list (default: {})", DEFAULT_SLOWEST_COUNT);
    println!("  --env-prefix P      Prefix for injected variables (default: {})", ENV_PREFIX.as_str());
    println!("  --working-dir PATH  Directory commands run in");
    println!("  --no-color          Disable coloured output");
    println!("  --verbose           Enable debug logging");
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
    println!();
    println!("Exit codes:");
    println!("  {}  all selected tests passed", exit_code::SUCCESS);
    println!("  {}  usage error", exit_code::USAGE);
    println!("  {}  empty tag or invalid filter", exit_code::BAD_SELECTION);
    println!("  {}  configuration or engine error", exit_code::CONFIG);
    println!("  {}  source file could not be read", exit_code::IO);
    println!("  {}  at least one test did not pass", exit_code::FAILURES);
    println!();
    println!("Examples:");
    println!("  smokerunner scripts.txt sit");
    println!("  smokerunner scripts.txt prod '==^curl'");
    println!("  smokerunner smoke.json dev --top 10");
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut positional_index = 0;
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--no-color" => {
                config.no_color = true;
            }
            "--top" => {
                i += 1;
                if i >= args.len() {
                    return Err("--top requires a number argument".to_string());
                }
                config.top = args[i]
                    .parse()
                    .map_err(|_| format!("Invalid top value: {}", args[i]))?;
            }
            "--env-prefix" => {
                i += 1;
                if i >= args.len() {
                    return Err("--env-prefix requires a prefix argument".to_string());
                }
                config.env_prefix = Some(args[i].clone());
            }
            "--working-dir" => {
                i += 1;
                if i >= args.len() {
                    return Err("--working-dir requires a path argument".to_string());
                }
                config.working_dir = Some(PathBuf::from(&args[i]));
            }
            // A plain filter may itself start with a single dash
            arg if arg.starts_with("--") => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                // Positional argument
                match positional_index {
                    0 => config.source_path = Some(arg.clone()),
                    1 => config.tag = Some(arg.clone()),
                    2 => config.filter = Some(arg.clone()),
                    _ => return Err(format!("Unexpected argument: {}", arg)),
                }
                positional_index += 1;
            }
        }
        i += 1;
    }

    if positional_index < 2 {
        return Err("Need a source file and a selector tag".to_string());
    }

    Ok(config)
}

/// Validates the directory commands will run in.
fn check_working_directory(working_dir: Option<&PathBuf>) -> Result<(), Failure> {
    let Some(dir) = working_dir else {
        if let Ok(current) = env::current_dir() {
            info!("Working directory: {}", current.display());
        }
        return Ok(());
    };

    if !dir.is_dir() {
        return Err(Failure::new(
            exit_code::USAGE,
            format!("Working directory does not exist: {}", dir.display()),
        ));
    }

    info!("Working directory: {}", dir.display());
    Ok(())
}

/// Builds the scan options from the tag, filter and prefix arguments.
fn scan_options(config: &Config) -> Result<ScanOptions, Failure> {
    let bad_selection = |e: SmokeError| Failure::new(exit_code::BAD_SELECTION, e.to_string());

    let mut options = ScanOptions::new(config.tag.clone().unwrap_or_default())
        .map_err(bad_selection)?;

    if let Some(prefix) = &config.env_prefix {
        options = options.with_env_names(EnvNames::new(prefix.as_str()));
    }

    if let Some(filter) = &config.filter {
        info!("Filter: {}", filter);
        options = options.with_filter(SelectionFilter::parse(filter).map_err(bad_selection)?);
    }

    Ok(options)
}

/// Main application entry point.
fn run() -> Result<u8, Failure> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        Failure::new(exit_code::USAGE, e)
    })?;

    // Setup logging
    setup_logging(config.verbose);
    if config.no_color {
        colored::control::set_override(false);
    }

    // Print banner
    print_banner();

    check_working_directory(config.working_dir.as_ref())?;
    let options = scan_options(&config)?;
    info!("Unit environment: {}", options.env_names().all().join(", "));
    let source_path = config.source_path.clone().unwrap_or_default();

    // Load and select
    let meta = InvocationMeta::new(source_path.as_str(), args[1..].join(" "));
    let outcome = load_source(&source_path, &options, &meta).map_err(|e| {
        error!("Failed to load smoke tests: {}", e);
        source_failure(e)
    })?;

    let context = outcome.context;
    info!(
        "Tag [{}]: {} tests selected, pool size {}, timeout {}s",
        context.tag(),
        outcome.units.len(),
        context.pool_size(),
        context.timeout_seconds()
    );
    if outcome.units.is_empty() {
        warn!("No tests selected for tag [{}]", context.tag());
    }

    // Execute the batch
    let mut invoker = ShellInvoker::new();
    if let Some(dir) = &config.working_dir {
        invoker = invoker.with_working_dir(dir);
    }

    let started = Local::now();
    let start = Instant::now();
    let units = CommandUnit::boxed_batch(outcome.units, Arc::new(invoker));
    let results = run_batch(units, context.pool_size(), context.timeout_seconds())
        .map_err(|e| Failure::new(exit_code::CONFIG, e.to_string()))?;

    // Report
    let report = render_report(
        &results,
        &ReportOptions {
            top: config.top,
            elapsed: start.elapsed(),
            started,
        },
    );
    println!("{}", report);

    Ok(exit_status(&results))
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(failure) => {
            eprintln!();
            eprintln!("Error: {}", failure);
            ExitCode::from(failure.code)
        }
    }
}
