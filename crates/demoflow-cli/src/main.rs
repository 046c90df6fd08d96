//! Demoflow CLI: end-to-end checks for a "Request a Demo" flow
//!
//! ## Usage
//!
//! ```bash
//! demoflow run                              # All scenarios in Chromium
//! demoflow run -s valid-submission --headed # One scenario, visible browser
//! demoflow run --mock                       # Scripted site, no browser
//! demoflow list                             # Scenario catalogue
//! demoflow config --init                    # Write demoflow.yaml
//! ```

use clap::Parser;
use demoflow::{ScenarioId, SuiteConfig};
use demoflow_cli::{
    init_logging, load_fixtures, resolve_suite_config, select_scenarios, Cli, CliConfig,
    CliError, CliResult, ColorChoice, Commands, ConfigArgs, ProgressReporter, RunArgs,
    SuiteRunner, Verbosity,
};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let config = build_config(&cli);
    init_logging(
        config.verbosity,
        config.log_format,
        config.color.should_color(),
    );

    match cli.command {
        Commands::Run(ref args) => run_suite(&config, &cli.config, args),
        Commands::List => {
            run_list();
            Ok(())
        }
        Commands::Config(ref args) => run_config(&cli.config, args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let color: ColorChoice = cli.color.into();
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(color)
        .with_log_format(cli.log_format.into())
}

fn run_suite(config: &CliConfig, config_path: &Path, args: &RunArgs) -> CliResult<()> {
    let suite_config = resolve_suite_config(config_path, args)?;
    let fixtures = load_fixtures(&suite_config.fixtures, args.fixtures.is_some())?;
    let scenarios = select_scenarios(&args.scenarios)?;

    let reporter = ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet())
        .with_verbose(config.verbosity.is_verbose());
    let mut runner = SuiteRunner::new(suite_config, fixtures, reporter)
        .with_fail_fast(args.fail_fast)
        .with_mock(args.mock);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let suite = rt.block_on(runner.run(&scenarios))?;

    if suite.all_passed() {
        Ok(())
    } else {
        Err(CliError::ScenariosFailed {
            failed: suite.failed_count(),
            total: suite.total(),
        })
    }
}

fn run_list() {
    let width = ScenarioId::ALL
        .iter()
        .map(|id| id.name().len())
        .max()
        .unwrap_or(0);
    for id in ScenarioId::ALL {
        println!("{:<width$}  {}", id.name(), id.description());
    }
}

fn run_config(path: &Path, args: &ConfigArgs) -> CliResult<()> {
    if args.init {
        if path.exists() && !args.force {
            return Err(CliError::config(format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            )));
        }
        std::fs::write(path, SuiteConfig::default().to_yaml()?)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    // Without flags, show is the default
    let config = SuiteConfig::load_or_default(path)?;
    if !path.exists() {
        println!("# {} not found; showing defaults", path.display());
    }
    print!("{}", config.to_yaml()?);
    Ok(())
}
