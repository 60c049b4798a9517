use crate::error::ExecError;
use crate::executor::{CommandExecutor, RealExecutor};
use crate::identity::{AccountId, IdentityError};
use crate::plan::{self, Invocation};
use devops_core::{Action, ComponentConfig, ComponentId, DevopsConfig, Stage};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Per-execution overrides.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Replaces the configured container name for `run`. Ignored by every other stage.
    pub container_name: Option<String>,
}

/// Resolves actions to command sequences and runs them, stopping at the first failure.
///
/// Parameterized over the executor for testability.
pub struct Runner<E: CommandExecutor = RealExecutor> {
    config: DevopsConfig,
    executor: E,
}

impl Runner<RealExecutor> {
    pub fn new(config: DevopsConfig) -> Self {
        let executor = RealExecutor::new().with_timeout(config.exec.timeout());
        Self { config, executor }
    }
}

impl<E: CommandExecutor> Runner<E> {
    pub fn with_executor(config: DevopsConfig, executor: E) -> Self {
        Self { config, executor }
    }

    pub fn config(&self) -> &DevopsConfig {
        &self.config
    }

    pub(crate) fn executor(&self) -> &E {
        &self.executor
    }

    /// Run every invocation of `action` for `component` in order.
    ///
    /// Returns the first failure; nothing after it is started. The account id
    /// is looked up only when the action reaches a push stage.
    pub async fn execute(
        &self,
        action: Action,
        component: ComponentId,
        options: &ExecuteOptions,
        cancel: &CancellationToken,
    ) -> Result<(), RunError> {
        debug!(%action, %component, "executing");
        let settings = self.config.component(component);

        for stage in action.stages() {
            match stage {
                Stage::Build => {
                    self.stream(&plan::build_image(&self.config.tools, settings), cancel)
                        .await?;
                }
                Stage::Run => {
                    let name = options
                        .container_name
                        .as_deref()
                        .unwrap_or(&settings.container);
                    self.stream(
                        &plan::run_container(&self.config.tools, settings, name),
                        cancel,
                    )
                    .await?;
                }
                Stage::Push => {
                    let account = self.resolve_identity(cancel).await?;
                    self.push(settings, &account, cancel).await?;
                }
                Stage::Deploy => {
                    let inv =
                        plan::force_deployment(&self.config.tools, &self.config.aws, settings);
                    self.stream(&inv, cancel).await?;
                }
            }
        }

        Ok(())
    }

    /// Ask the cloud identity service which account the current credentials belong to.
    pub async fn resolve_identity(
        &self,
        cancel: &CancellationToken,
    ) -> Result<AccountId, IdentityError> {
        let inv = plan::caller_identity(&self.config.tools);
        debug!(command = %inv, "resolving account id");
        let output = self
            .executor
            .exec(&inv, cancel)
            .await
            .map_err(|e| IdentityError::Query { source: e })?;
        let account = AccountId::from_caller_identity(&output)?;
        debug!(%account, "resolved account id");
        Ok(account)
    }

    async fn push(
        &self,
        settings: &ComponentConfig,
        account: &AccountId,
        cancel: &CancellationToken,
    ) -> Result<(), ExecError> {
        let tools = &self.config.tools;
        let region = &self.config.aws.region;
        let host = plan::registry_host(account, region);
        let target = plan::image_uri(account, region, &settings.repository);

        let password_inv = plan::login_password(tools, &self.config.aws);
        debug!(command = %password_inv, "fetching registry password");
        let password = self.executor.exec(&password_inv, cancel).await?;

        let login = plan::registry_login(tools, &host);
        debug!(command = %login, "running");
        self.executor
            .exec_streaming_with_stdin(&login, password.trim().as_bytes(), cancel)
            .await?;

        self.stream(&plan::tag_image(tools, settings, &target), cancel)
            .await?;
        self.stream(&plan::push_image(tools, &target), cancel).await
    }

    async fn stream(&self, inv: &Invocation, cancel: &CancellationToken) -> Result<(), ExecError> {
        debug!(command = %inv, "running");
        self.executor.exec_streaming(inv, cancel).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

impl RunError {
    /// The process exit status to propagate.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Exec(e) => e.exit_code(),
            RunError::Identity(_) => 1,
        }
    }

    /// Whether the failing command already printed its own diagnostic, so
    /// nothing should be added.
    pub fn is_reported(&self) -> bool {
        match self {
            RunError::Exec(e) => e.is_reported(),
            RunError::Identity(_) => false,
        }
    }
}
