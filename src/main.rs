use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use phase_coordinator::audit_logger::AuditLogger;
use phase_coordinator::channel::{json_lines, EventSubscription};
use phase_coordinator::commands::JsonLinesPort;
use phase_coordinator::coordinator::{RemediationProbe, RemediationStatus, SystemProbe};
use phase_coordinator::domain::{InputAnswer, InstanceId, LogEntry, PhaseStatus, WorkflowDefinition};
use phase_coordinator::logging::init_tracing;
use phase_coordinator::{CoordinatorConfig, RunReport, WorkflowCoordinator};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;

#[derive(Parser)]
#[command(name = "phasectl")]
#[command(about = "Drive and inspect multi-phase agent workflow runs")]
#[command(version)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Config file (defaults to $PHASECTL_CONFIG, then ~/.phasectl/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug diagnostics on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Feed a recorded JSONL event stream through a coordinator.
    ///
    /// Outbound commands are written to stdout as JSON lines; the execution
    /// log is written to stderr.
    Replay {
        /// JSONL file of backend events
        #[arg(long)]
        events: PathBuf,

        /// Instance ID of the run to follow
        #[arg(long)]
        instance: String,

        /// Workflow definition (YAML)
        #[arg(long)]
        definition: PathBuf,

        /// Approve every approval gate with the backend-supplied output
        #[arg(long)]
        approve: bool,

        /// Answer every input request with this value
        #[arg(long)]
        answer: Option<String>,
    },

    /// Check whether an agent's CLI is installed and authenticated
    Doctor {
        /// Agent name as used in workflow definitions
        agent: String,

        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;
    let config = CoordinatorConfig::resolve(cli.config.as_deref())?;

    match cli.command {
        Command::Replay {
            events,
            instance,
            definition,
            approve,
            answer,
        } => {
            let options = ReplayOptions { approve, answer };
            let report = replay(&config, &events, instance.into(), &definition, &options).await?;
            print_summary(&report);
        }
        Command::Doctor { agent, json } => {
            let status = SystemProbe::new(&config).status(&agent).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }
    }
    Ok(())
}

struct ReplayOptions {
    approve: bool,
    answer: Option<String>,
}

async fn replay(
    config: &CoordinatorConfig,
    events_path: &std::path::Path,
    instance_id: InstanceId,
    definition_path: &std::path::Path,
    options: &ReplayOptions,
) -> Result<RunReport> {
    let definition = WorkflowDefinition::load(definition_path)?;
    let port = Arc::new(JsonLinesPort::new(tokio::io::stdout()));
    let (mut coordinator, _) =
        WorkflowCoordinator::new(instance_id.clone(), definition, config, port)?;

    if config.audit.enabled {
        let dir = config.audit.resolved_dir()?;
        let audit = AuditLogger::new(&instance_id, &dir)
            .with_context(|| format!("Failed to open audit log in {}", dir.display()))?;
        tracing::info!("Writing audit log to {}", audit.log_path().display());
        coordinator = coordinator.with_audit(Arc::new(audit));
    }

    let file = tokio::fs::File::open(events_path)
        .await
        .with_context(|| format!("Failed to open event file: {}", events_path.display()))?;
    let (subscription, mut events) =
        EventSubscription::channel(json_lines(BufReader::new(file)), config.channel_capacity);
    coordinator = coordinator.with_subscription(subscription);

    let mut printed = 0;
    while let Some(raw) = events.recv().await {
        coordinator.handle_raw(&raw);
        respond(&mut coordinator, options);
        coordinator.settle().await;
        printed = print_new_entries(coordinator.log(), printed);
    }

    Ok(coordinator.close())
}

/// Applies the scripted operator responses for whatever is pending.
fn respond(coordinator: &mut WorkflowCoordinator, options: &ReplayOptions) {
    if options.approve && coordinator.snapshot().awaiting_decision() {
        if let Err(e) = coordinator.approve() {
            tracing::warn!("Auto-approve failed: {}", e);
        }
    }

    let Some(answer) = &options.answer else {
        return;
    };
    let Some(request_id) = coordinator
        .pending_input()
        .map(|p| p.request.request_id.clone())
    else {
        return;
    };
    let result = coordinator
        .set_input_answer(InputAnswer::from(answer.as_str()))
        .and_then(|_| coordinator.submit_input(&request_id));
    if let Err(e) = result {
        tracing::warn!("Auto-answer for {} failed: {}", request_id, e);
    }
}

fn print_new_entries(log: &[LogEntry], already_printed: usize) -> usize {
    for entry in log.iter().skip(already_printed) {
        eprintln!(
            "{} {:<5} {}",
            entry.timestamp.format("%H:%M:%S"),
            entry.level.label(),
            entry.message
        );
    }
    log.len()
}

fn print_summary(report: &RunReport) {
    let completed = report
        .history
        .iter()
        .filter(|r| r.status == PhaseStatus::Completed)
        .count();
    let failed = report.history.len() - completed;
    eprintln!(
        "\n{} phase(s) finished: {} completed, {} failed",
        report.history.len(),
        completed,
        failed
    );
    for error in &report.errors {
        eprintln!("  error: {}", error.message);
    }
}

fn print_status(status: &RemediationStatus) {
    match &status.binary_path {
        Some(path) => println!("{}: installed at {}", status.binary, path.display()),
        None => println!("{}: not installed", status.binary),
    }
    match status.authenticated {
        Some(true) => println!("{}: authenticated", status.agent),
        Some(false) => println!("{}: not authenticated", status.agent),
        None => println!("{}: authentication unknown", status.agent),
    }
}
