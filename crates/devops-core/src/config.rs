use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ComponentId;

/// File name looked up by [`DevopsConfig::load`].
pub const CONFIG_FILE: &str = "devops.toml";

/// devops.toml configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevopsConfig {
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub exec: ExecConfig,
    #[serde(default = "default_frontend")]
    pub frontend: ComponentConfig,
    #[serde(default = "default_backend")]
    pub backend: ComponentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    /// AWS region hosting ECR and ECS (defaults to ca-central-1)
    #[serde(default = "default_region")]
    pub region: String,
    /// ECS cluster the services run on
    #[serde(default = "default_cluster")]
    pub cluster: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Container toolchain binary
    #[serde(default = "default_docker")]
    pub docker: String,
    /// AWS CLI binary
    #[serde(default = "default_aws")]
    pub aws: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecConfig {
    /// Per-invocation timeout in seconds. Absent or 0 means wait forever.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ExecConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// Docker build context; the Dockerfile is expected at its root
    pub context: String,
    /// Local image name, tagged `:latest`
    pub image: String,
    /// ECR repository path
    pub repository: String,
    /// ECS service name
    pub service: String,
    /// Container name used by `run` when none is given
    #[serde(default)]
    pub container: String,
    /// `host:container` port mapping used by `run`
    #[serde(default)]
    pub ports: String,
}

impl Default for DevopsConfig {
    fn default() -> Self {
        Self {
            aws: AwsConfig::default(),
            tools: ToolsConfig::default(),
            exec: ExecConfig::default(),
            frontend: default_frontend(),
            backend: default_backend(),
        }
    }
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            cluster: default_cluster(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            docker: default_docker(),
            aws: default_aws(),
        }
    }
}

impl DevopsConfig {
    /// Load from devops.toml in the given directory, or return defaults if not found.
    pub fn load(dir: &Path) -> crate::Result<Self> {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load_file(&config_path)
        } else {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from an explicit path. The file must exist.
    pub fn load_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| crate::Error::ConfigLoad {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Apply `DEVOPS_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> crate::Result<()> {
        self.apply_overrides(|name| {
            std::env::var_os(name).map(|v| v.to_string_lossy().into_owned())
        })
    }

    /// Apply `DEVOPS_*` overrides using the given lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> crate::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(region) = lookup("DEVOPS_REGION") {
            self.aws.region = region;
        }
        if let Some(cluster) = lookup("DEVOPS_CLUSTER") {
            self.aws.cluster = cluster;
        }
        if let Some(docker) = lookup("DEVOPS_DOCKER") {
            self.tools.docker = docker;
        }
        if let Some(aws) = lookup("DEVOPS_AWS") {
            self.tools.aws = aws;
        }
        if let Some(raw) = lookup("DEVOPS_TIMEOUT_SECS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| crate::Error::InvalidEnv {
                    name: "DEVOPS_TIMEOUT_SECS",
                    value: raw.clone(),
                    reason: e.to_string(),
                })?;
            self.exec.timeout_secs = Some(secs);
        }
        Ok(())
    }

    /// Reject configurations that would produce malformed command lines.
    pub fn validate(&self) -> crate::Result<()> {
        let mut fields = vec![
            ("aws.region".to_owned(), self.aws.region.as_str()),
            ("aws.cluster".to_owned(), self.aws.cluster.as_str()),
            ("tools.docker".to_owned(), self.tools.docker.as_str()),
            ("tools.aws".to_owned(), self.tools.aws.as_str()),
        ];
        for id in ComponentId::ALL {
            let c = self.component(id);
            fields.push((format!("{id}.context"), c.context.as_str()));
            fields.push((format!("{id}.image"), c.image.as_str()));
            fields.push((format!("{id}.repository"), c.repository.as_str()));
            fields.push((format!("{id}.service"), c.service.as_str()));
        }

        if let Some((field, _)) = fields.into_iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(crate::Error::InvalidConfig { field });
        }

        Ok(())
    }

    pub fn component(&self, id: ComponentId) -> &ComponentConfig {
        match id {
            ComponentId::Frontend => &self.frontend,
            ComponentId::Backend => &self.backend,
        }
    }
}

fn default_region() -> String {
    "ca-central-1".to_owned()
}

fn default_cluster() -> String {
    "DevCluster".to_owned()
}

fn default_docker() -> String {
    "docker".to_owned()
}

fn default_aws() -> String {
    "aws".to_owned()
}

fn default_frontend() -> ComponentConfig {
    ComponentConfig {
        context: "../frontend".to_owned(),
        image: "recruit-frontend".to_owned(),
        repository: "cpsc319/recruit/frontend".to_owned(),
        service: "recruit-frontend-service".to_owned(),
        container: "recruit-frontend-container".to_owned(),
        ports: "80:80".to_owned(),
    }
}

fn default_backend() -> ComponentConfig {
    ComponentConfig {
        context: "../backend".to_owned(),
        image: "recruit-backend".to_owned(),
        repository: "cpsc319/recruit/backend".to_owned(),
        service: "recruit-backend-service".to_owned(),
        container: "recruit-backend-container".to_owned(),
        ports: "3001:3001".to_owned(),
    }
}
