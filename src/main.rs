use clap::Parser;
use golden_harness::config::{ConfigLoader, env};
use golden_harness::harness::AggregateResult;
use golden_harness::{HarnessBuilder, HarnessOutcome};
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit code when the suite could not start at all.
const EXIT_FATAL: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "golden-harness",
    version,
    about = "Run a program through a golden-output regression suite"
)]
struct Cli {
    /// Root of the source tree holding inputs and golden files
    #[arg(value_name = "SOURCE_ROOT_PATH")]
    source_root: PathBuf,

    /// Root of the build tree holding the program under test
    #[arg(value_name = "BINARY_ROOT_PATH")]
    binary_root: PathBuf,

    /// Built-in suite name or path to a suite manifest
    #[arg(long, default_value = "seqan_tcoffee")]
    suite: String,

    /// Profile from the suite manifest to apply
    #[arg(long)]
    profile: Option<String>,

    /// Use this executable instead of searching the binary root
    #[arg(long, value_name = "FILE")]
    program: Option<PathBuf>,

    /// Per-case time limit in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Number of cases to run concurrently
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Architecture identifier for the platform gate
    #[arg(long, value_name = "ID")]
    arch: Option<String>,

    /// Write the aggregate result as JSON
    #[arg(long, value_name = "FILE")]
    report_json: Option<PathBuf>,

    /// Print the generated cases without running them
    #[arg(long)]
    list: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

/// Install the stderr subscriber; `RUST_LOG` wins over the verbosity default.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .try_init();
}

fn run(cli: Cli) -> golden_harness::Result<u8> {
    let mut loader = ConfigLoader::new(&cli.suite);
    if let Some(profile) = &cli.profile {
        loader = loader.profile(profile);
    }
    let mut suite = loader.load()?;

    // CLI flags override environment and manifest.
    if let Some(timeout) = cli.timeout {
        suite.run.timeout = Some(timeout);
    }
    if let Some(jobs) = cli.jobs {
        suite.run.jobs = jobs;
    }
    if cli.verbose {
        suite.run.verbose = true;
    }
    suite.validate()?;

    init_tracing(suite.run.verbose);
    for (key, value) in env::detect_active_overrides() {
        tracing::debug!("{key}={value}");
    }

    let mut builder = HarnessBuilder::new()
        .with_suite(suite)
        .source_root(cli.source_root)
        .binary_root(cli.binary_root);
    if let Some(arch) = cli.arch {
        builder = builder.arch(arch);
    }
    if let Some(program) = cli.program {
        builder = builder.program(program);
    }
    let harness = builder.build()?;

    if cli.list {
        for case in harness.plan()? {
            println!("{}\t{}", case.id(), case.command_line());
        }
        return Ok(0);
    }

    let outcome = harness.run()?;

    if let Some(path) = &cli.report_json {
        match &outcome {
            HarnessOutcome::Completed(result) => result.write_json(path)?,
            HarnessOutcome::Skipped { .. } => {
                AggregateResult::from_outcomes(Vec::new()).write_json(path)?
            }
        }
    }

    Ok(u8::try_from(outcome.exit_code()).unwrap_or(1))
}
