use super::{Interrupts, failure_code, load_config};
use devops_core::{Action, ComponentId};
use devops_exec::{ExecuteOptions, Runner};
use std::path::Path;
use std::process::ExitCode;

/// Run one action and exit with the status of the command that stopped it.
pub async fn run_action(
    action: Action,
    component: ComponentId,
    container_name: Option<String>,
    config_path: Option<&Path>,
) -> anyhow::Result<ExitCode> {
    let config = load_config(config_path)?;
    let runner = Runner::new(config);
    let interrupts = Interrupts::install();

    let cancel = interrupts.begin().await;
    let options = ExecuteOptions { container_name };
    let result = runner.execute(action, component, &options, &cancel).await;
    interrupts.end().await;

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            // A failed command has already said why on its own stderr.
            if !e.is_reported() {
                eprintln!("{e}");
            }
            Ok(failure_code(e.exit_code()))
        }
    }
}
