//! CLI entrypoint for toolforge
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use toolforge_application::{
    AiGateway, AssistLoop, AssistOutcome, AutoApprove, AutonomousStop, CommandLoop, LoopContext, LoopScheduler,
    RegistryHandle, RuntimeConfig, SelfImprovement, StateStore, SwarmStop, TaskLoop,
    ToolRuntime, ToolStorePort, build_strategy,
};
use toolforge_domain::ConfigIssue;
use toolforge_infrastructure::{
    ConfigLoader, FileConfig, HashingEmbedder, JsonToolStore, JsonlTranscript, LuaSandbox,
    OpenAiGateway,
};
use toolforge_presentation::agent::read_line;
use toolforge_presentation::{
    Cli, Command, ConsoleFormatter, ConsoleReporter, InteractiveApproval, ToolsAction,
};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Rendered output of one mode plus whether it reached its goal.
struct Report {
    output: String,
    success: bool,
}

impl Report {
    fn ok(output: String) -> Self {
        Self {
            output,
            success: true,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        command,
        verbose,
        quiet,
        log_file,
        config: config_path,
        no_config,
        show_config,
        retrieval,
        store,
    } = Cli::parse();

    let log_guard = init_tracing(verbose, log_file.as_deref())?;

    if show_config {
        ConfigLoader::print_config_sources(config_path.as_ref());
        return Ok(());
    }

    let config = if no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(config_path.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };

    let issues = config.validate();
    if !issues.is_empty() {
        eprint!("{}", ConsoleFormatter::format_config_issues(&issues));
    }
    if ConfigIssue::has_errors(&issues) {
        bail!("Configuration has errors");
    }

    let Some(command) = command else {
        bail!("No command given. Run `toolforge --help` for usage.");
    };

    let mut runtime_config = config.to_runtime_config();
    if let Some(kind) = retrieval {
        runtime_config = runtime_config.with_retrieval(kind.into());
    }

    let store_path = store.unwrap_or_else(|| config.storage.resolved_path());
    info!(store = %store_path.display(), "Starting toolforge");
    let registry = open_registry(&store_path)?;

    if let Command::Tools { action } = &command {
        print!("{}", show_tools(&registry, action)?);
        return Ok(());
    }

    // Spinner redraws would garble stdin prompts
    let needs_stdin = matches!(
        command,
        Command::Assist { yes: false, .. } | Command::Swarm { .. }
    );

    let events = StateStore::new();
    let ctx = build_context(&config, runtime_config, registry, events.clone())?;

    let shutdown = CancellationToken::new();
    let reporter =
        (!quiet).then(|| ConsoleReporter::new(!needs_stdin).spawn(&events, shutdown.clone()));

    let report = dispatch(command, ctx).await;

    shutdown.cancel();
    if let Some(reporter) = reporter {
        let _ = reporter.await;
    }

    let report = report?;
    print!("{}", report.output);
    if !report.success {
        drop(log_guard);
        std::process::exit(1);
    }
    Ok(())
}

/// Install the tracing subscriber. Verbosity maps to the level filter;
/// `RUST_LOG` wins when set.
fn init_tracing(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("Log file path has no file name: {}", path.display()))?;
    std::fs::create_dir_all(&directory)
        .with_context(|| format!("Failed to create log directory {}", directory.display()))?;

    let appender = tracing_appender::rolling::never(&directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(writer)
        .init();
    Ok(Some(guard))
}

fn open_registry(path: &Path) -> Result<RegistryHandle> {
    let store = Arc::new(JsonToolStore::new(path));
    let document = store
        .load()
        .with_context(|| format!("Failed to load tool registry from {}", path.display()))?;
    Ok(RegistryHandle::from_document(document, store))
}

// === Dependency Injection ===
fn build_context(
    config: &FileConfig,
    runtime_config: RuntimeConfig,
    registry: RegistryHandle,
    events: StateStore,
) -> Result<LoopContext> {
    let api_key = config.gateway.api_key();
    if api_key.is_none() {
        warn!(
            env = %config.gateway.api_key_env,
            "No API key found, gateway requests will be sent unauthenticated"
        );
    }
    let gateway: Arc<dyn AiGateway> = Arc::new(
        OpenAiGateway::new(
            config.gateway.endpoint.as_str(),
            config.gateway.model.as_str(),
            config.gateway.timeout(),
        )?
        .with_api_key(api_key),
    );

    let sandbox = Arc::new(LuaSandbox::from_params(&runtime_config.sandbox));
    let embedder = Arc::new(HashingEmbedder::new());
    let retrieval = build_strategy(&runtime_config.retrieval, gateway.clone(), embedder);
    let runtime = ToolRuntime::new(registry, sandbox, gateway)
        .with_max_call_depth(runtime_config.sandbox.max_call_depth);

    let mut ctx = LoopContext::new(runtime, retrieval)
        .with_events(events)
        .with_config(runtime_config);
    if let Some(path) = &config.logging.transcript
        && let Some(transcript) = JsonlTranscript::open(path)
    {
        ctx = ctx.with_logger(Arc::new(transcript));
    }
    Ok(ctx)
}

fn show_tools(registry: &RegistryHandle, action: &ToolsAction) -> Result<String> {
    match action {
        ToolsAction::List => Ok(ConsoleFormatter::format_tool_list(&registry.list())),
        ToolsAction::Show { name } => match registry.get(name) {
            Some(tool) => Ok(ConsoleFormatter::format_tool(&tool)),
            None => bail!("Tool not found: {}", name),
        },
    }
}

async fn dispatch(command: Command, ctx: LoopContext) -> Result<Report> {
    match command {
        Command::Command { request } => {
            let outcome = CommandLoop::new(ctx).run(&request).await?;
            Ok(Report::ok(ConsoleFormatter::format_command(&outcome)))
        }
        Command::Assist { request, yes } => {
            let assist = AssistLoop::new(ctx);
            let outcome = if yes {
                assist.run(&request, &AutoApprove).await?
            } else {
                assist.run(&request, &InteractiveApproval::new()).await?
            };
            Ok(match outcome {
                AssistOutcome::Executed(result) => Report {
                    success: result.is_success(),
                    output: ConsoleFormatter::format_result(&result),
                },
                AssistOutcome::Rejected(proposal) => Report::ok(format!(
                    "Discarded proposed call to {}\n",
                    proposal.tool_call.name
                )),
                AssistOutcome::Answered(text) => Report::ok(format!(
                    "{}\n",
                    text.unwrap_or_else(|| "No tool call was chosen.".to_string())
                )),
            })
        }
        Command::Task {
            task,
            max_iterations,
        } => {
            let token = CancellationToken::new();
            let watcher = cancel_on_ctrl_c(token.clone());
            let mut task_loop = TaskLoop::new(ctx).with_cancellation(token);
            if let Some(max) = max_iterations {
                task_loop = task_loop.with_max_iterations(max);
            }
            let report = task_loop.run(&task).await;
            watcher.abort();
            let report = report?;
            Ok(Report {
                success: report.is_completed(),
                output: ConsoleFormatter::format_task(&report),
            })
        }
        Command::Autonomous { limit } => run_autonomous(ctx, limit).await,
        Command::Swarm { goal, workers } => run_swarm(ctx, goal, workers).await,
        Command::Improve {
            name,
            description,
            implementation_file,
        } => {
            let mut fields = Map::new();
            if let Some(description) = description {
                fields.insert("description".to_string(), Value::String(description));
            }
            if let Some(path) = implementation_file {
                let source = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                fields.insert("implementation".to_string(), Value::String(source));
            }
            if fields.is_empty() {
                bail!("Nothing to improve: pass --description and/or --implementation-file");
            }
            let report = SelfImprovement::new(ctx).run(&name, fields).await;
            Ok(Report {
                success: report.is_success(),
                output: ConsoleFormatter::format_improvement(&report),
            })
        }
        Command::Tools { action } => Ok(Report::ok(show_tools(ctx.runtime().registry(), &action)?)),
    }
}

fn cancel_on_ctrl_c(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping after the current step");
            token.cancel();
        }
    })
}

async fn run_autonomous(ctx: LoopContext, limit: Option<usize>) -> Result<Report> {
    let (scheduler, actor) = LoopScheduler::spawn(ctx);
    scheduler.start_autonomous(limit).await?;

    let stop = tokio::select! {
        stop = scheduler.wait_autonomous() => stop?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping autonomous mode");
            scheduler.stop_autonomous().await?;
            scheduler.wait_autonomous().await?
        }
    };

    scheduler.shutdown().await?;
    let _ = actor.await;
    let stop = stop.ok_or_else(|| anyhow!("Autonomous loop ended without a stop reason"))?;
    Ok(Report {
        success: stop != AutonomousStop::Aborted,
        output: ConsoleFormatter::format_autonomous_stop(stop),
    })
}

async fn run_swarm(ctx: LoopContext, goal: String, workers: Option<usize>) -> Result<Report> {
    let (scheduler, actor) = LoopScheduler::spawn(ctx);
    scheduler.start_swarm(goal, workers).await?;

    let stop = loop {
        let stop = tokio::select! {
            stop = scheduler.wait_swarm() => stop?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping swarm");
                scheduler.stop_swarm().await?;
                scheduler.wait_swarm().await?
            }
        };
        if !matches!(stop, Some(SwarmStop::Paused(_))) {
            break stop;
        }

        let answer = tokio::task::spawn_blocking(|| read_line("answer>")).await?;
        match answer {
            Ok(input) => scheduler.resume_swarm(input).await?,
            Err(e) => {
                warn!(error = %e, "No answer given, stopping swarm");
                scheduler.stop_swarm().await?;
                break Some(SwarmStop::Cancelled);
            }
        }
    };

    scheduler.shutdown().await?;
    let _ = actor.await;
    let stop = stop.ok_or_else(|| anyhow!("Swarm ended without a stop reason"))?;
    Ok(Report {
        success: matches!(stop, SwarmStop::Completed(_)),
        output: ConsoleFormatter::format_swarm_stop(&stop),
    })
}
