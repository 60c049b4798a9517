use crate::executor::CommandExecutor;
use crate::plan::Invocation;
use crate::runner::Runner;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Readiness of the local toolchain and credentials.
#[derive(Debug, Default)]
pub struct DoctorReport {
    pub docker: CheckResult,
    pub aws_cli: CheckResult,
    pub identity: CheckResult,
    pub config_file: CheckResult,
}

impl DoctorReport {
    pub fn all_passed(&self) -> bool {
        self.docker.passed && self.aws_cli.passed && self.identity.passed && self.config_file.passed
    }
}

impl fmt::Display for DoctorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("Docker", &self.docker),
            ("AWS CLI", &self.aws_cli),
            ("AWS account", &self.identity),
            ("Config file", &self.config_file),
        ];
        for (label, result) in rows {
            writeln!(f, "  [{}] {label:<12} {}", result.icon(), result.detail)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct CheckResult {
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    pub fn ok(detail: &str) -> Self {
        Self {
            passed: true,
            detail: detail.to_owned(),
        }
    }

    pub fn fail(detail: &str) -> Self {
        Self {
            passed: false,
            detail: detail.to_owned(),
        }
    }

    pub fn icon(&self) -> &'static str {
        if self.passed { "OK" } else { "NG" }
    }
}

impl<E: CommandExecutor> Runner<E> {
    /// Run every check without early return. Nothing here mutates external state.
    ///
    /// `config_file` is left for the caller, which knows where the config came from.
    pub async fn doctor(&self, cancel: &CancellationToken) -> DoctorReport {
        let tools = &self.config().tools;
        let mut report = DoctorReport::default();

        let docker_version = Invocation::new(
            &tools.docker,
            ["version", "--format", "{{.Client.Version}}"],
        );
        report.docker = match self.executor().exec(&docker_version, cancel).await {
            Ok(v) => CheckResult::ok(v.trim()),
            Err(e) => CheckResult::fail(&e.to_string()),
        };

        let aws_version = Invocation::new(&tools.aws, ["--version"]);
        match self.executor().exec(&aws_version, cancel).await {
            // "aws-cli/2.15.0 Python/3.11.6 Linux/6.5.0 exe/x86_64"
            Ok(v) => {
                report.aws_cli = CheckResult::ok(v.split_whitespace().next().unwrap_or(v.trim()))
            }
            Err(e) => {
                report.aws_cli = CheckResult::fail(&e.to_string());
                report.identity = CheckResult::fail("skipped: AWS CLI unavailable");
                return report;
            }
        }

        report.identity = match self.resolve_identity(cancel).await {
            Ok(account) => CheckResult::ok(account.as_str()),
            Err(e) => CheckResult::fail(&e.to_string()),
        };

        report
    }
}
