//! Delete command - tear down and destroy resources of one type

use std::path::Path;
use std::time::Duration;

use clap::Args;
use console::style;
use fleet_core::Snapshot;
use fleet_state::{
    ConsoleProgress, DestroyContext, DestroyOptions, DestroySummary, JsonProgress, MemoryState,
    ProgressSink, QuietProgress, destroy_resources,
};
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, warn};

use crate::config::{FleetConfig, OutputFormat};
use crate::error::{CliError, Result};

#[derive(Debug, Clone, Args)]
pub struct DeleteArgs {
    /// Resource type: definition ID or alias, case-insensitive
    pub resource_type: String,

    /// Resource IDs to delete
    pub ids: Vec<String>,

    /// Namespace (defaults to the type's default namespace)
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Delete resources matching a label selector
    #[arg(short = 'l', long, conflicts_with = "all")]
    pub selector: Option<String>,

    /// Delete every resource of the type
    #[arg(long)]
    pub all: bool,

    /// Give up waiting for finalizers after this long (e.g. 30s, 5m)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,
}

/// Run the delete command
pub async fn run(args: DeleteArgs, config: &FleetConfig, state_path: &Path) -> Result<()> {
    let output = args.output.unwrap_or(config.output);

    let snapshot = load_snapshot(state_path)?;
    let state = MemoryState::from_snapshot(snapshot);

    let mut options = DestroyOptions::new(&args.resource_type)
        .with_ids(args.ids)
        .with_watch_kind_threshold(config.watch_kind_threshold);
    options.namespace = args.namespace;
    options.selector = args.selector;
    options.all = args.all;

    let cancel = CancellationToken::new();
    let mut ctx = DestroyContext::new().with_cancel(cancel.clone());
    if let Some(timeout) = args.timeout.or(config.timeout) {
        ctx = ctx.with_timeout(timeout);
    }
    let _interrupt = spawn_interrupt_handler(cancel);

    let progress: Box<dyn ProgressSink> = match output {
        OutputFormat::Text => Box::new(ConsoleProgress::new()),
        OutputFormat::Json => Box::new(JsonProgress::new()),
        OutputFormat::Quiet => Box::new(QuietProgress),
    };

    let result = destroy_resources(&state, &options, &ctx, progress.as_ref()).await;

    // Teardowns are not rolled back, so the state is saved either way
    if let Err(e) = state.snapshot().save_to(state_path) {
        if result.is_ok() {
            return Err(e.into());
        }
        warn!(error = %e, path = %state_path.display(), "failed to save state");
    }

    let summary = result?;
    print_summary(&summary, output)
}

fn load_snapshot(path: &Path) -> Result<Snapshot> {
    if !path.exists() {
        return Err(CliError::io_with_help(
            format!("state file {} not found", path.display()),
            "pass --state or set 'state' in the config file",
        ));
    }
    debug!(path = %path.display(), "loading state");
    Ok(Snapshot::load_from(path)?)
}

/// Cancel the operation on Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationToken) -> AbortOnDropHandle<()> {
    AbortOnDropHandle::new(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping");
            cancel.cancel();
        }
    }))
}

fn print_summary(summary: &DestroySummary, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Quiet => {}
        OutputFormat::Json => {
            let json = serde_json::to_string(summary)
                .map_err(|e| CliError::Other { message: e.to_string() })?;
            println!("{json}");
        }
        OutputFormat::Text => {
            if summary.is_empty() {
                println!(
                    "{} No {} resources matched in namespace {}",
                    style("→").blue().bold(),
                    style(&summary.resource_type).cyan(),
                    style(&summary.namespace).yellow()
                );
            } else {
                println!(
                    "{} Destroyed {} {} in namespace {}",
                    style("✓").green().bold(),
                    pluralize(summary.destroyed.len(), "resource", "resources"),
                    style(&summary.resource_type).cyan(),
                    style(&summary.namespace).yellow()
                );
                if !summary.skipped.is_empty() {
                    println!(
                        "  {} already gone: {}",
                        style("⚠").yellow(),
                        summary.skipped.join(", ")
                    );
                }
            }
        }
    }
    Ok(())
}

fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize(1, "resource", "resources"), "1 resource");
        assert_eq!(pluralize(0, "resource", "resources"), "0 resources");
        assert_eq!(pluralize(3, "resource", "resources"), "3 resources");
    }

    #[test]
    fn test_missing_state_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = load_snapshot(&dir.path().join("state.yaml")).unwrap_err();
        assert!(matches!(err, CliError::Io { help: Some(_), .. }));
    }
}
