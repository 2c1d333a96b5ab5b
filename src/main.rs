//! CLI entrypoint for compliance tracking, reporting, and the MCP catalog server.

mod assessment;
mod client;
mod config;
mod csv_io;
mod evaluator;
mod mcp;
mod report;
mod schema;
mod types;

use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use cyber_compliance_catalog::{Catalog, score_counts};
use cyber_compliance_core::{FrameworkRegistry, Status, compare, normalize_framework_id};
use rmcp::ServiceExt;
use tracing::level_filters::LevelFilter;

use client::{ToolError, Transport};
use config::ComplianceConfig;
use evaluator::ComplianceEvaluator;
use mcp::ComplianceCatalogServer;

/// Exit code for an unreachable catalog/scoring service.
const EXIT_UNAVAILABLE: u8 = 2;

#[derive(Parser)]
#[command(
    name = "cyber-compliance",
    version,
    about = "Track cyber security compliance against NIST CSF, ISO 27001, SOC 2 and CIS v8"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Path to the assessment JSON
    #[arg(long, global = true)]
    assessment_file: Option<PathBuf>,
    /// Organization type used to filter checklists
    #[arg(long, global = true)]
    org_type: Option<String>,
    /// How to reach the catalog/scoring service
    #[arg(long, global = true, value_enum)]
    transport: Option<Transport>,
    /// MCP server command for the subprocess transport
    #[arg(long, global = true)]
    server_command: Option<String>,
    /// Catalog JSON file replacing the built-in catalog (also handed to the subprocess server)
    #[arg(long, global = true)]
    catalog_path: Option<PathBuf>,
    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,
    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Md,
    Pdf,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter assessment with empty status maps for every framework
    #[command(alias = "init-assessment")]
    Init {
        /// Where to write the starter assessment (defaults to the assessment file)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Record one control's status
    Set {
        #[arg(long)]
        framework: String,
        #[arg(long)]
        control: String,
        /// implemented, partial or missing; anything else is stored as missing
        #[arg(long)]
        status: String,
    },
    /// Evaluate one framework against the assessment
    Checklist {
        #[arg(long)]
        framework: String,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Evaluate every framework and list priority actions
    #[command(alias = "dashboard")]
    Summary {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Compute a weighted risk score from manual counts
    Score {
        /// Framework label printed with the score
        #[arg(long)]
        framework: String,
        #[arg(long, default_value_t = 0)]
        implemented: usize,
        #[arg(long, default_value_t = 0)]
        partial: usize,
        #[arg(long, default_value_t = 0)]
        missing: usize,
    },
    /// List catalog controls for a framework
    Controls {
        #[arg(long)]
        framework: String,
        /// Case-insensitive filter over id, title and domain
        #[arg(long)]
        query: Option<String>,
    },
    /// Export control statuses to CSV
    ExportCsv {
        #[arg(long, default_value = "assessment.csv")]
        output: PathBuf,
    },
    /// Import control statuses from CSV into the assessment
    ImportCsv {
        #[arg(long)]
        input: PathBuf,
    },
    /// Write a compliance report
    Report {
        #[arg(long, default_value = "compliance-report.md")]
        output: PathBuf,
        #[arg(long, value_enum, default_value = "md")]
        format: ReportFormat,
    },
    /// Validate the assessment schema and status values
    #[command(alias = "validate-assessment")]
    Validate,
    /// Compare two assessments and show progress and regressions
    Diff {
        /// Baseline assessment JSON
        #[arg(long, alias = "old-file")]
        old: PathBuf,
        /// Current assessment JSON
        #[arg(long, alias = "new-file")]
        new: PathBuf,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Start the MCP catalog server
    Serve {
        /// Run as MCP server over stdio
        #[arg(long)]
        mcp: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            exit_code_for(&err)
        }
    }
}

fn init_tracing(cli: &Cli) {
    // Logs go to stderr; stdout carries command output and the MCP transport.
    let level = if cli.global.verbose {
        LevelFilter::DEBUG
    } else if matches!(cli.command, Commands::Serve { .. }) {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_max_level(level)
        .init();
}

fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<ToolError>() {
        Some(tool_error) if tool_error.is_unavailable() => ExitCode::from(EXIT_UNAVAILABLE),
        _ => ExitCode::FAILURE,
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = resolve_config(&cli.global)?;
    let frameworks = FrameworkRegistry::standard();
    let use_color = !cli.global.no_color
        && std::io::stdout().is_terminal()
        && std::env::var_os("NO_COLOR").is_none();

    match cli.command {
        Commands::Init { output, force } => {
            let path = output.unwrap_or_else(|| config.assessment_file.clone());
            if path.exists() && !force {
                bail!(
                    "{} already exists; pass --force to overwrite it",
                    path.display()
                );
            }
            assessment::save_assessment(&path, &assessment::starter_assessment(&frameworks))?;
            println!("Created {}", path.display());
            println!("Fill statuses with implemented|partial|missing and rerun summary.");
        }
        Commands::Set {
            framework,
            control,
            status,
        } => {
            let framework = normalize_framework_id(&framework);
            if !frameworks.contains(&framework) {
                bail!(
                    "unsupported framework '{framework}'; supported frameworks: {}",
                    frameworks.ids().join(", ")
                );
            }
            let control = control.trim();
            if control.is_empty() {
                bail!("control must not be empty");
            }
            let mut store = assessment::load_assessment(&config.assessment_file);
            let stored = store.set(&framework, control, &status);
            if Status::parse_strict(&status).is_none() {
                tracing::warn!(status = %status, "unrecognized status stored as missing");
            }
            assessment::save_assessment(&config.assessment_file, &store)?;
            println!("{framework} | {control} -> {stored}");
        }
        Commands::Checklist { framework, format } => {
            let evaluator = build_evaluator(&config, frameworks).await?;
            let store = assessment::load_assessment(&config.assessment_file);
            let summary = evaluator
                .summarize(&normalize_framework_id(&framework), &store, &config.org_type)
                .await?;
            match format {
                OutputFormat::Text => println!("{}", report::render_framework(&summary, use_color)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
            }
        }
        Commands::Summary { format } => {
            let evaluator = build_evaluator(&config, frameworks).await?;
            let store = assessment::load_assessment(&config.assessment_file);
            let overview = evaluator.summarize_all(&store, &config.org_type).await?;
            match format {
                OutputFormat::Text => println!("{}", report::render_overview(&overview, use_color)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&overview)?),
            }
        }
        Commands::Score {
            framework,
            implemented,
            partial,
            missing,
        } => {
            let Some(total) = implemented
                .checked_add(partial)
                .and_then(|sum| sum.checked_add(missing))
            else {
                bail!("control counts are too large to add up");
            };
            if total == 0 {
                println!("No controls provided.");
                return Ok(ExitCode::SUCCESS);
            }
            let score = score_counts(implemented, partial, missing);
            println!("{}", report::render_manual_score(&framework, &score, use_color));
        }
        Commands::Controls { framework, query } => {
            let catalog = load_catalog(config.catalog_path.as_deref())?;
            let framework = normalize_framework_id(&framework);
            let controls = catalog.list_controls(&framework, query.as_deref())?;
            println!("{}", report::render_controls(&framework, &controls));
        }
        Commands::ExportCsv { output } => {
            let store = assessment::load_assessment(&config.assessment_file);
            let rows = csv_io::export_csv(&store, &frameworks, &output)?;
            println!("Exported {rows} rows to {}", output.display());
        }
        Commands::ImportCsv { input } => {
            let mut store = assessment::load_assessment(&config.assessment_file);
            let rows = csv_io::import_csv(&mut store, &input)?;
            assessment::save_assessment(&config.assessment_file, &store)?;
            println!(
                "Imported {rows} rows from {} -> {}",
                input.display(),
                config.assessment_file.display()
            );
        }
        Commands::Report { output, format } => {
            if let ReportFormat::Pdf = format {
                eprintln!("PDF reports are not supported; use --format md");
                return Ok(ExitCode::FAILURE);
            }
            let evaluator = build_evaluator(&config, frameworks).await?;
            let store = assessment::load_assessment(&config.assessment_file);
            let overview = evaluator.summarize_all(&store, &config.org_type).await?;
            let rendered = report::render_markdown_report(&overview, chrono::Utc::now());
            write_text(&output, &rendered)?;
            println!("Report written {}", output.display());
        }
        Commands::Validate => return validate(&config.assessment_file, &frameworks),
        Commands::Diff { old, new, format } => {
            if !old.exists() || !new.exists() {
                eprintln!("Both --old and --new must exist");
                return Ok(ExitCode::FAILURE);
            }
            let diff = compare(
                &assessment::load_assessment(&old),
                &assessment::load_assessment(&new),
            );
            match format {
                OutputFormat::Text => println!("{}", report::render_diff(&diff, use_color)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&diff)?),
            }
        }
        Commands::Serve { mcp } => {
            if !mcp {
                bail!("Only --mcp mode is currently supported");
            }

            tracing::info!("cyber-compliance MCP server starting");

            let server = ComplianceCatalogServer::new(config.catalog_path.as_deref())?;
            let service = server.serve(rmcp::transport::stdio()).await?;
            service.waiting().await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Config files first, then command-line overrides.
fn resolve_config(args: &GlobalArgs) -> anyhow::Result<ComplianceConfig> {
    let mut config = ComplianceConfig::load()?;
    if let Some(value) = &args.assessment_file {
        config.assessment_file = value.clone();
    }
    if let Some(value) = &args.org_type {
        config.org_type = config::normalize_org_type(value);
    }
    if let Some(value) = args.transport {
        config.transport = value;
    }
    if let Some(value) = &args.server_command {
        config.server_command = value.clone();
    }
    if let Some(value) = &args.catalog_path {
        config.catalog_path = Some(value.clone());
    }
    config.validate()?;
    Ok(config)
}

async fn build_evaluator(
    config: &ComplianceConfig,
    frameworks: FrameworkRegistry,
) -> anyhow::Result<ComplianceEvaluator> {
    let client = client::connect(config).await?;
    Ok(ComplianceEvaluator::new(client, frameworks)
        .with_limits(config.evaluator.max_gaps, config.report.max_priority_actions))
}

fn load_catalog(path: Option<&Path>) -> anyhow::Result<Catalog> {
    match path {
        Some(path) => Ok(Catalog::from_path(path)?),
        None => Ok(Catalog::builtin()),
    }
}

fn validate(path: &Path, frameworks: &FrameworkRegistry) -> anyhow::Result<ExitCode> {
    if !path.exists() {
        eprintln!("File not found: {}", path.display());
        return Ok(ExitCode::FAILURE);
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read assessment at {}", path.display()))?;
    let document = match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(document) => document,
        Err(err) => {
            eprintln!("Invalid JSON: {err}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let errors = schema::validate_assessment(&document, frameworks);
    if errors.is_empty() {
        println!("Assessment schema valid");
        return Ok(ExitCode::SUCCESS);
    }
    eprintln!("Assessment invalid:");
    for error in errors {
        eprintln!(" - {error}");
    }
    Ok(ExitCode::FAILURE)
}

fn write_text(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn unavailable_service_maps_to_exit_code_two() {
        let err = anyhow::Error::new(ToolError::Unavailable("no server".to_string()))
            .context("failed to build evaluator");
        assert_eq!(exit_code_for(&err), ExitCode::from(EXIT_UNAVAILABLE));

        let err = anyhow::anyhow!("something else");
        assert_eq!(exit_code_for(&err), ExitCode::FAILURE);
    }

    #[test]
    fn legacy_transport_flags_parse() {
        let cli = Cli::try_parse_from(["cyber-compliance", "summary", "--transport", "stdio"])
            .expect("parse");
        assert_eq!(cli.global.transport, Some(Transport::Subprocess));

        let cli = Cli::try_parse_from(["cyber-compliance", "--transport", "python", "summary"])
            .expect("parse");
        assert_eq!(cli.global.transport, Some(Transport::Direct));
    }

    #[test]
    fn legacy_command_names_parse() {
        assert!(Cli::try_parse_from(["cyber-compliance", "init-assessment"]).is_ok());
        assert!(Cli::try_parse_from(["cyber-compliance", "validate-assessment"]).is_ok());
        assert!(
            Cli::try_parse_from([
                "cyber-compliance",
                "diff",
                "--old-file",
                "a.json",
                "--new-file",
                "b.json"
            ])
            .is_ok()
        );
    }
}
