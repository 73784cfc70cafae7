//! # gambit
//!
//! Plan a query, execute the plan, and stream the execution's events to
//! stdout. Exits 0 when the execution completes, 1 when it fails, and 2
//! when it is stopped.

use anyhow::Context;
use clap::Parser;
use gambit_core::events::ExecutionEvent;
use llm::{OpenAiClient, ProviderConfig};
use orchestrator::service::AgentService;
use std::process::ExitCode;
use std::sync::Arc;
use tooling::config::EngineConfig;
use tooling::tools::builtin_registry;

#[derive(Parser)]
#[command(name = "gambit")]
#[command(about = "Run a natural-language query through the gambit plan engine", long_about = None)]
#[command(version)]
struct Cli {
    /// The query to plan and execute.
    query: Vec<String>,

    /// Print the generated plan before executing it.
    #[arg(long)]
    show_plan: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tooling::logging::init();
    let cli = Cli::parse();

    let query = cli.query.join(" ");
    if query.trim().is_empty() {
        anyhow::bail!("a query is required, e.g.: gambit \"what time is it?\"");
    }

    let config = EngineConfig::from_env().context("loading engine configuration")?;
    let provider = ProviderConfig::from_env().context("loading LLM provider configuration")?;
    let model = Arc::new(OpenAiClient::new(provider));
    let workspace_root = std::env::current_dir()?;
    let tools = Arc::new(builtin_registry(&config, workspace_root)?);

    let service = AgentService::new(model, tools, config);

    let planned = service.submit(&query).await.context("planning failed")?;
    if cli.show_plan {
        println!("{}", serde_json::to_string_pretty(&planned.plan)?);
    }

    let execution_id = service
        .start(planned.plan, planned.query)
        .context("starting execution")?;
    println!("execution {}", execution_id);

    let (replay, mut live) = service
        .subscribe(&execution_id)
        .context("subscribing to execution")?;

    let mut exit: Option<u8> = None;
    for event in replay {
        exit = print_event(&event);
        if exit.is_some() {
            break;
        }
    }
    while exit.is_none() {
        match live.recv().await {
            Some(event) => exit = print_event(&event),
            None => break,
        }
    }

    Ok(ExitCode::from(exit.unwrap_or(1)))
}

/// Print one event; returns the exit code when the event is terminal.
fn print_event(event: &ExecutionEvent) -> Option<u8> {
    match event {
        ExecutionEvent::ExecutionStarted { started_at } => {
            println!("started at {}", started_at);
            None
        }
        ExecutionEvent::StepStarted {
            step_id,
            step_type,
            description,
        } => {
            if description.is_empty() {
                println!("> {} [{}]", step_id, step_type);
            } else {
                println!("> {} [{}] {}", step_id, step_type, description);
            }
            None
        }
        ExecutionEvent::StepCompleted {
            step_id,
            success,
            result,
            error,
        } => {
            if *success {
                match result {
                    Some(text) => println!("  {} ok: {}", step_id, summarize(text)),
                    None => println!("  {} ok", step_id),
                }
            } else {
                println!(
                    "  {} failed: {}",
                    step_id,
                    error.as_deref().unwrap_or("unknown error")
                );
            }
            None
        }
        ExecutionEvent::ExecutionCompleted { result, .. } => {
            println!("completed: {}", result);
            Some(0)
        }
        ExecutionEvent::ExecutionFailed { reason, error, .. } => {
            eprintln!("failed ({}): {}", reason, error);
            Some(1)
        }
        ExecutionEvent::ExecutionStopped { .. } => {
            eprintln!("stopped");
            Some(2)
        }
        ExecutionEvent::Heartbeat {} => None,
    }
}

/// Trim long step results for terminal output.
fn summarize(text: &str) -> String {
    const LIMIT: usize = 120;
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= LIMIT {
        flat
    } else {
        let cut: String = flat.chars().take(LIMIT).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_short_text_unchanged() {
        assert_eq!(summarize("hello"), "hello");
    }

    #[test]
    fn test_summarize_flattens_newlines() {
        assert_eq!(summarize("a\nb"), "a b");
    }

    #[test]
    fn test_summarize_truncates_long_text() {
        let long = "x".repeat(500);
        let out = summarize(&long);
        assert!(out.ends_with("..."));
        assert!(out.chars().count() <= 123);
    }

    #[test]
    fn test_terminal_events_produce_exit_codes() {
        assert_eq!(print_event(&ExecutionEvent::completed("done")), Some(0));
        assert_eq!(print_event(&ExecutionEvent::failed("r", "e")), Some(1));
        assert_eq!(print_event(&ExecutionEvent::stopped()), Some(2));
        assert!(print_event(&ExecutionEvent::heartbeat()).is_none());
        assert!(print_event(&ExecutionEvent::step_succeeded("S1", None)).is_none());
    }
}
