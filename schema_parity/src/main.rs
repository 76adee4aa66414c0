use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

use schema_parity::config::{self, Config};
use schema_parity::report::{write_report, DiffReport, GatePolicy, ReportFormat};
use schema_parity::snapshot::write_catalog;
use schema_parity::utils::init_logging;
use schema_parity::{DiffResult, EntryKind, ParityClient};

#[derive(Parser, Debug)]
#[command(name = "schema_parity")]
#[command(version)]
#[command(about = "Compare two database catalogs and report what differs")]
#[command(long_about = "Compare a reference catalog with a target catalog.

Every table, view, sequence, column, index and constraint is reported as
missing, unexpected, changed or unchanged.

EXIT CODES:
  0  comparison ran and the gate passed
  1  comparison ran and the gate failed (check only)
  2  the comparison could not be run

EXAMPLES:
  # Compare the sources named in a config file
  schema_parity diff --config parity.toml

  # Compare two catalog documents and print a summary
  schema_parity diff --reference expected.json --target actual.json --format text

  # Fail a CI job when anything is missing or changed
  schema_parity check --config parity.toml

  # Save the target database's catalog as a CI artifact
  schema_parity snapshot --config parity.toml --side target --output target.json")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare the two sources and print or write the report
    Diff(DiffArgs),
    /// Compare the two sources and exit non-zero when the gate fails
    Check {
        #[command(flatten)]
        args: DiffArgs,
        /// Entry kinds that fail the gate (overrides the config)
        #[arg(long, value_enum, value_delimiter = ',', value_name = "KINDS")]
        fail_on: Vec<GateKind>,
    },
    /// Snapshot one source and write its catalog document
    Snapshot {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, value_enum, default_value = "target")]
        side: Side,
        /// Output file; the extension picks JSON, YAML or TOML
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Configuration file
    #[arg(short, long, value_name = "FILE", conflicts_with_all = ["reference", "target"])]
    config: Option<PathBuf>,

    /// Reference catalog document
    #[arg(long, value_name = "FILE", requires = "target")]
    reference: Option<PathBuf>,

    /// Target catalog document
    #[arg(long, value_name = "FILE", requires = "reference")]
    target: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DiffArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Report format (overrides the config)
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Write the report here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// List unchanged objects in the report
    #[arg(long)]
    include_unchanged: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Json,
    Yaml,
    Text,
}

impl From<FormatArg> for ReportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Json => ReportFormat::Json,
            FormatArg::Yaml => ReportFormat::Yaml,
            FormatArg::Text => ReportFormat::Text,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum GateKind {
    Missing,
    Unexpected,
    Changed,
    Unchanged,
}

impl From<GateKind> for EntryKind {
    fn from(kind: GateKind) -> Self {
        match kind {
            GateKind::Missing => EntryKind::Missing,
            GateKind::Unexpected => EntryKind::Unexpected,
            GateKind::Changed => EntryKind::Changed,
            GateKind::Unchanged => EntryKind::Unchanged,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Side {
    Reference,
    Target,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{:#}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Diff(args) => {
            let client = client(&args.source)?;
            let result = client.compare().await?;
            emit_report(client.config(), &args, &result)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { args, fail_on } => {
            let mut config = load_config(&args.source)?;
            if !fail_on.is_empty() {
                config.gate = GatePolicy::new(fail_on.into_iter().map(EntryKind::from));
            }
            let client = ParityClient::new(config);
            let (result, outcome) = client.check().await?;
            emit_report(client.config(), &args, &result)?;

            if !outcome.passed {
                for violation in &outcome.violations {
                    eprintln!("gate: {}", violation);
                }
            }
            Ok(ExitCode::from(outcome.exit_code() as u8))
        }
        Command::Snapshot {
            source,
            side,
            output,
        } => {
            let client = client(&source)?;
            let catalog = match side {
                Side::Reference => client.snapshot_reference().await?,
                Side::Target => client.snapshot_target().await?,
            };
            write_catalog(&catalog, &output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(source: &SourceArgs) -> anyhow::Result<Config> {
    let config = match (&source.config, &source.reference, &source.target) {
        (Some(path), _, _) => config::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        (None, Some(reference), Some(target)) => Config::from_catalog_files(reference, target),
        _ => bail!("Either --config or both --reference and --target are required"),
    };

    init_logging(&config.logging).context("Failed to initialize logging")?;
    Ok(config)
}

fn client(source: &SourceArgs) -> anyhow::Result<ParityClient> {
    Ok(ParityClient::new(load_config(source)?))
}

fn emit_report(config: &Config, args: &DiffArgs, result: &DiffResult) -> anyhow::Result<()> {
    let format = args
        .format
        .map(ReportFormat::from)
        .unwrap_or(config.output.format);
    let include_unchanged = args.include_unchanged || config.output.include_unchanged;

    match args.output.as_ref().or(config.output.path.as_ref()) {
        Some(path) => write_report(result, path, format, include_unchanged)
            .with_context(|| format!("Failed to write report to {}", path.display()))?,
        None => {
            let content = match format {
                ReportFormat::Json => DiffReport::from_result(result, include_unchanged).to_json()?,
                ReportFormat::Yaml => DiffReport::from_result(result, include_unchanged).to_yaml()?,
                ReportFormat::Text => schema_parity::report::render_summary(result),
            };
            println!("{}", content);
        }
    }

    Ok(())
}
