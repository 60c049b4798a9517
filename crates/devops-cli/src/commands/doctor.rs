use super::{Interrupts, load_config};
use devops_core::config::CONFIG_FILE;
use devops_exec::{CheckResult, Runner};
use std::path::Path;
use std::process::ExitCode;

pub async fn doctor(config_path: Option<&Path>) -> anyhow::Result<ExitCode> {
    let config = load_config(config_path)?;
    let runner = Runner::new(config);
    let interrupts = Interrupts::install();

    let cancel = interrupts.begin().await;
    let mut report = runner.doctor(&cancel).await;
    interrupts.end().await;

    // load_config already failed if an explicit path was missing.
    let path = config_path.unwrap_or(Path::new(CONFIG_FILE));
    report.config_file = if path.exists() {
        CheckResult::ok(&path.display().to_string())
    } else {
        CheckResult::ok("not found, using built-in defaults")
    };

    println!();
    println!("{report}");

    if !report.all_passed() {
        anyhow::bail!("some checks failed — see above for details");
    }

    Ok(ExitCode::SUCCESS)
}
