mod action;
mod doctor;
mod interactive;

pub use action::run_action;
pub use doctor::doctor;
pub use interactive::interactive;

use devops_core::DevopsConfig;
use devops_exec::error::EXIT_CANCELLED;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Load devops.toml (explicit path or `./devops.toml`), then `DEVOPS_*` overrides.
pub(crate) fn load_config(path: Option<&Path>) -> anyhow::Result<DevopsConfig> {
    let mut config = match path {
        Some(p) => DevopsConfig::load_file(p)?,
        None => DevopsConfig::load(Path::new("."))?,
    };
    config.apply_env()?;
    config.validate()?;
    Ok(config)
}

/// Map a propagated status onto a process exit code. Zero never means failure here.
pub(crate) fn failure_code(code: i32) -> ExitCode {
    ExitCode::from(code.clamp(1, 255) as u8)
}

/// Routes Ctrl-C to the action in flight. With nothing running, Ctrl-C exits.
#[derive(Clone, Default)]
pub(crate) struct Interrupts {
    current: Arc<Mutex<Option<CancellationToken>>>,
}

impl Interrupts {
    /// Start listening for Ctrl-C.
    pub(crate) fn install() -> Self {
        let interrupts = Self::default();
        let current = Arc::clone(&interrupts.current);
        tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "cannot listen for Ctrl-C");
                    return;
                }
                match current.lock().await.as_ref() {
                    Some(token) => token.cancel(),
                    None => std::process::exit(EXIT_CANCELLED),
                }
            }
        });
        interrupts
    }

    /// Token for the next action; Ctrl-C cancels it until [`end`](Self::end).
    pub(crate) async fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.current.lock().await = Some(token.clone());
        token
    }

    pub(crate) async fn end(&self) {
        *self.current.lock().await = None;
    }
}
