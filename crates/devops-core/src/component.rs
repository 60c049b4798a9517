//! Deployable components and the lifecycle actions run against them.

use std::fmt;

/// A deployable unit with its own image, repository, and service.
///
/// The set is fixed; per-component settings live in
/// [`ComponentConfig`](crate::ComponentConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    Frontend,
    Backend,
}

impl ComponentId {
    pub const ALL: [ComponentId; 2] = [ComponentId::Frontend, ComponentId::Backend];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentId::Frontend => "frontend",
            ComponentId::Backend => "backend",
        }
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single step of an action. Each stage expands to one or more external
/// command invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Build,
    Run,
    Push,
    Deploy,
}

/// A named lifecycle operation.
///
/// # Examples
///
/// ```
/// use devops_core::{Action, Stage};
///
/// assert_eq!(Action::Release.stages(), &[Stage::Build, Stage::Push, Stage::Deploy]);
/// assert!(Action::Release.needs_account());
/// assert!(!Action::Deploy.needs_account());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Build,
    Run,
    Push,
    Deploy,
    /// Build, push, then deploy; fail-fast across the whole chain.
    Release,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Build,
        Action::Run,
        Action::Push,
        Action::Deploy,
        Action::Release,
    ];

    /// Stages in execution order.
    pub fn stages(&self) -> &'static [Stage] {
        match self {
            Action::Build => &[Stage::Build],
            Action::Run => &[Stage::Run],
            Action::Push => &[Stage::Push],
            Action::Deploy => &[Stage::Deploy],
            Action::Release => &[Stage::Build, Stage::Push, Stage::Deploy],
        }
    }

    /// Whether the action needs the AWS account id to address the registry.
    pub fn needs_account(&self) -> bool {
        self.stages().contains(&Stage::Push)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Build => "build",
            Action::Run => "run",
            Action::Push => "push",
            Action::Deploy => "deploy",
            Action::Release => "release",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
