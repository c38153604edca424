//! SlotLab CLI: tick-file processing and configuration commands.
//!
//! Commands:
//! - `run`: process every tick file × timeframe in a directory and write reports
//! - `bars`: write only the bar report for one tick file
//! - `init-config`: write the default configuration as TOML

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use slotlab_core::data::{load_ticks, symbol_from_path};
use slotlab_core::domain::Timeframe;
use slotlab_runner::export::export_bars_csv;
use slotlab_runner::{build_bars, ProcessorConfig, RunError, Runner, UnitReport, UnitStatus};

#[derive(Parser)]
#[command(
    name = "slotlab",
    about = "SlotLab CLI: forex tick backtesting by weekday and hour slot"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every tick file in a directory for every configured timeframe.
    Run {
        /// Directory of MT5 tick exports named `<SYMBOL>_<anything>`.
        #[arg(long)]
        input_dir: PathBuf,

        /// Directory that receives one `<SYMBOL>_<TIMEFRAME>/` folder per unit.
        #[arg(long)]
        output_dir: PathBuf,

        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Run units and replays on one thread.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Print unit reports as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Write the bar report (OHLC, indicator fields, signals) for one tick file.
    Bars {
        /// MT5 tick export.
        #[arg(long)]
        input: PathBuf,

        /// Instrument symbol. Defaults to the file name prefix.
        #[arg(long)]
        symbol: Option<String>,

        /// Timeframe name (M15, M30, H1, H2, H4, H8 or one from the config).
        #[arg(long, default_value = "M15")]
        timeframe: String,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output CSV path.
        #[arg(long)]
        output: PathBuf,
    },
    /// Write the default configuration.
    InitConfig {
        /// Output TOML path.
        #[arg(long)]
        output: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input_dir,
            output_dir,
            config,
            sequential,
            json,
        } => run_directory_cmd(&input_dir, &output_dir, config.as_deref(), sequential, json),
        Commands::Bars {
            input,
            symbol,
            timeframe,
            config,
            output,
        } => run_bars_cmd(&input, symbol, &timeframe, config.as_deref(), &output),
        Commands::InitConfig { output, force } => run_init_config(&output, force),
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the default `slotlab=info`.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("slotlab=info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ProcessorConfig> {
    match path {
        Some(path) => ProcessorConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(ProcessorConfig::default()),
    }
}

fn run_directory_cmd(
    input_dir: &Path,
    output_dir: &Path,
    config_path: Option<&Path>,
    sequential: bool,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    info!(fingerprint = %config.fingerprint(), "loaded config");

    let mut runner = Runner::new(config);
    if sequential {
        runner = runner.with_parallelism(false);
    }
    let reports = runner.run_directory(input_dir, output_dir)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        print_summary(&reports);
    }

    if reports.is_empty() {
        bail!("no tick files for configured symbols in {}", input_dir.display());
    }
    let failed = reports.iter().filter(|r| r.is_failed()).count();
    if failed > 0 {
        eprintln!("{failed} of {} unit(s) failed", reports.len());
        std::process::exit(1);
    }
    Ok(())
}

fn run_bars_cmd(
    input: &Path,
    symbol: Option<String>,
    timeframe_name: &str,
    config_path: Option<&Path>,
    output: &Path,
) -> Result<()> {
    let config = load_config(config_path)?;
    let symbol = match symbol.or_else(|| symbol_from_path(input)) {
        Some(symbol) => symbol,
        None => bail!("cannot infer symbol from {}; pass --symbol", input.display()),
    };
    if config.instrument(&symbol).is_none() {
        return Err(RunError::UnknownSymbol(symbol).into());
    }

    let timeframe = resolve_timeframe(&config, timeframe_name)?;
    let series = load_ticks(input)?;
    let (bars, _) = build_bars(&series.ticks, &timeframe, &config.indicators)?;

    let csv = export_bars_csv(&bars)?;
    std::fs::write(output, csv)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "{symbol} {timeframe}: {} ticks ({} malformed lines) -> {} bars",
        series.ticks.len(),
        series.stats.malformed,
        bars.len()
    );
    println!("Bar report saved to: {}", output.display());
    Ok(())
}

/// Configured timeframes take precedence over the built-in presets.
fn resolve_timeframe(config: &ProcessorConfig, name: &str) -> Result<Timeframe> {
    let timeframe = config
        .timeframes
        .iter()
        .find(|tf| tf.name.eq_ignore_ascii_case(name))
        .cloned()
        .or_else(|| Timeframe::preset(name));
    match timeframe {
        Some(tf) => Ok(tf),
        None => bail!("unknown timeframe '{name}'. Valid: M15, M30, H1, H2, H4, H8"),
    }
}

fn run_init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", output.display());
    }
    let toml = ProcessorConfig::default().to_toml()?;
    std::fs::write(output, toml).with_context(|| format!("failed to write {}", output.display()))?;
    println!("Default config written to: {}", output.display());
    Ok(())
}

fn print_summary(reports: &[UnitReport]) {
    println!();
    println!("=== SlotLab Run ===");
    println!(
        "{:<8} {:<4} {:>9} {:>7} {:>7} {:>6} {:>7} {:>6}  {}",
        "Symbol", "TF", "Ticks", "Bars", "Events", "Slots", "Trades", "Open", "Status"
    );
    println!("{}", "-".repeat(78));
    for report in reports {
        match &report.status {
            UnitStatus::Completed(s) => println!(
                "{:<8} {:<4} {:>9} {:>7} {:>7} {:>6} {:>7} {:>6}  ok",
                report.symbol,
                report.timeframe,
                s.ticks,
                s.bars,
                s.events,
                s.scopes,
                s.trades,
                s.open_outcomes
            ),
            UnitStatus::Failed(error) => println!(
                "{:<8} {:<4} {:>9} {:>7} {:>7} {:>6} {:>7} {:>6}  FAILED: {error}",
                report.symbol, report.timeframe, "-", "-", "-", "-", "-", "-"
            ),
        }
    }
    println!();
}
