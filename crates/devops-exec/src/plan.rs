//! Command lines for each lifecycle stage.
//!
//! Everything here is pure: the same configuration always yields the same
//! invocations, which is what lets the runner tests assert exact sequences.

use devops_core::{AwsConfig, ComponentConfig, ToolsConfig};
use std::fmt;

use crate::identity::AccountId;

/// One external process execution: program plus arguments. No shell is
/// involved, so arguments are passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_owned(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// `{account}.dkr.ecr.{region}.amazonaws.com`
pub fn registry_host(account: &AccountId, region: &str) -> String {
    format!("{account}.dkr.ecr.{region}.amazonaws.com")
}

/// Fully-qualified `:latest` image reference in the account's registry.
///
/// # Examples
///
/// ```
/// use devops_exec::identity::AccountId;
/// use devops_exec::plan::image_uri;
///
/// let account = AccountId::parse("123456789012").unwrap();
/// assert_eq!(
///     image_uri(&account, "ca-central-1", "cpsc319/recruit/backend"),
///     "123456789012.dkr.ecr.ca-central-1.amazonaws.com/cpsc319/recruit/backend:latest",
/// );
/// ```
pub fn image_uri(account: &AccountId, region: &str, repository: &str) -> String {
    format!(
        "{host}/{repository}:latest",
        host = registry_host(account, region)
    )
}

fn local_tag(component: &ComponentConfig) -> String {
    format!("{}:latest", component.image)
}

pub fn build_image(tools: &ToolsConfig, component: &ComponentConfig) -> Invocation {
    let context = component.context.trim_end_matches('/');
    let dockerfile = format!("{context}/Dockerfile");
    Invocation::new(
        &tools.docker,
        [
            "build".to_owned(),
            "-t".to_owned(),
            local_tag(component),
            "-f".to_owned(),
            dockerfile,
            context.to_owned(),
        ],
    )
}

/// Detached, auto-removed container. `--name` and `-p` are omitted when
/// their values are empty.
pub fn run_container(
    tools: &ToolsConfig,
    component: &ComponentConfig,
    container_name: &str,
) -> Invocation {
    let mut args = vec!["run".to_owned(), "--rm".to_owned()];
    if !container_name.is_empty() {
        args.push("--name".to_owned());
        args.push(container_name.to_owned());
    }
    if !component.ports.is_empty() {
        args.push("-p".to_owned());
        args.push(component.ports.clone());
    }
    args.push("-d".to_owned());
    args.push(local_tag(component));
    Invocation::new(&tools.docker, args)
}

pub fn caller_identity(tools: &ToolsConfig) -> Invocation {
    Invocation::new(&tools.aws, ["sts", "get-caller-identity", "--output", "json"])
}

pub fn login_password(tools: &ToolsConfig, aws: &AwsConfig) -> Invocation {
    Invocation::new(
        &tools.aws,
        ["ecr", "get-login-password", "--region", aws.region.as_str()],
    )
}

/// Reads the password from stdin.
pub fn registry_login(tools: &ToolsConfig, host: &str) -> Invocation {
    Invocation::new(
        &tools.docker,
        ["login", "--username", "AWS", "--password-stdin", host],
    )
}

pub fn tag_image(tools: &ToolsConfig, component: &ComponentConfig, target: &str) -> Invocation {
    Invocation::new(&tools.docker, ["tag".to_owned(), local_tag(component), target.to_owned()])
}

pub fn push_image(tools: &ToolsConfig, target: &str) -> Invocation {
    Invocation::new(&tools.docker, ["push", target])
}

pub fn force_deployment(
    tools: &ToolsConfig,
    aws: &AwsConfig,
    component: &ComponentConfig,
) -> Invocation {
    Invocation::new(
        &tools.aws,
        [
            "ecs",
            "update-service",
            "--cluster",
            aws.cluster.as_str(),
            "--service",
            component.service.as_str(),
            "--force-new-deployment",
            "--region",
            aws.region.as_str(),
        ],
    )
}
