//! Binary entry point for the `qarnot-deadline` operator CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use qarnot_deadline::{BatchReport, DeadlinePlugin, PluginConfig, PluginError, QarnotConnector};

mod cli;

use cli::Cli;

/// Exit status when some, but not all, batch items failed.
const PARTIAL_FAILURE: i32 = 2;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Plugin(#[from] PluginError),
    #[error("instance {id} is not an active plugin instance")]
    UnknownInstance { id: String },
    #[error("failed to write output: {0}")]
    Output(String),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

async fn dispatch(cli: Cli) -> Result<i32, CliError> {
    let config =
        PluginConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    let connector = QarnotConnector::new(config.lifecycle_options().call_timeout);
    let plugin = DeadlinePlugin::from_config(connector, &config);

    match cli {
        Cli::Verify => {
            let verified = plugin.verify_access().await?;
            print_json(&json!({ "verified": verified }))?;
            Ok(if verified { 0 } else { PARTIAL_FAILURE })
        }
        Cli::Hardware => {
            print_json(&plugin.available_hardware_types())?;
            Ok(0)
        }
        Cli::Images => {
            print_json(&plugin.available_os_images().await?)?;
            Ok(0)
        }
        Cli::List => {
            print_json(&plugin.active_instances().await?)?;
            Ok(0)
        }
        Cli::Create(args) => {
            let report = plugin
                .create_instances(&args.hardware, &args.image, args.count)
                .await?;
            print_report(&report)
        }
        Cli::Terminate(args) => print_report(&plugin.terminate_instances(&args.ids).await?),
        Cli::Stop(args) => print_report(&plugin.stop_instances(&args.ids).await?),
        Cli::Start(args) => print_report(&plugin.start_instances(&args.ids).await?),
        Cli::Reboot(args) => print_report(&plugin.reboot_instances(&args.ids).await?),
        Cli::Clone(args) => {
            let source = plugin
                .active_instances()
                .await?
                .into_iter()
                .find(|instance| instance.id == args.id)
                .ok_or(CliError::UnknownInstance { id: args.id })?;
            print_report(&plugin.clone_instance(&source, args.count).await?)
        }
    }
}

fn print_report<T: Serialize>(report: &BatchReport<T>) -> Result<i32, CliError> {
    print_json(report)?;
    Ok(exit_code_for(report))
}

fn exit_code_for<T>(report: &BatchReport<T>) -> i32 {
    if report.failures().next().is_some() {
        PARTIAL_FAILURE
    } else {
        0
    }
}

fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    write_json(io::stdout(), value)
}

fn write_json(mut target: impl Write, value: &impl Serialize) -> Result<(), CliError> {
    let rendered =
        serde_json::to_string_pretty(value).map_err(|err| CliError::Output(err.to_string()))?;
    writeln!(target, "{rendered}").map_err(|err| CliError::Output(err.to_string()))
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use qarnot_deadline::{FailureKind, ItemFailure, ItemOutcome};

    #[test]
    fn clean_reports_exit_zero() {
        let report: BatchReport<String> = vec![ItemOutcome::Succeeded(String::from("a"))].into();
        assert_eq!(exit_code_for(&report), 0);
    }

    #[test]
    fn failed_items_exit_with_partial_failure() {
        let report: BatchReport<String> = vec![
            ItemOutcome::Succeeded(String::from("a")),
            ItemOutcome::Failed(ItemFailure::new(FailureKind::Lookup, "missing")),
        ]
        .into();
        assert_eq!(exit_code_for(&report), PARTIAL_FAILURE);
    }

    #[test]
    fn write_json_renders_one_document() {
        let mut buf = Vec::new();
        write_json(&mut buf, &json!({ "verified": true })).expect("write");
        let rendered = String::from_utf8(buf).expect("utf8");
        assert!(rendered.contains("\"verified\": true"), "rendered: {rendered}");
        assert!(rendered.ends_with('\n'));
    }

    #[test]
    fn write_error_writes_cli_error() {
        let mut buf = Vec::new();
        let err = CliError::UnknownInstance {
            id: String::from("task-9"),
        };
        write_error(&mut buf, &err);
        let rendered = String::from_utf8(buf).expect("utf8");
        assert!(
            rendered.contains("instance task-9 is not an active plugin instance"),
            "rendered: {rendered}"
        );
    }
}
