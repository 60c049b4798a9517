//! Command runner for the recruit devops tool.
//!
//! Each [`Action`](devops_core::Action) expands to a fixed sequence of
//! `docker` / `aws` invocations ([`plan`]), executed one at a time by a
//! [`CommandExecutor`] and aborted on the first non-zero exit.

pub mod doctor;
pub mod error;
pub mod executor;
pub mod identity;
pub mod plan;
pub mod runner;

pub use doctor::{CheckResult, DoctorReport};
pub use error::ExecError;
pub use executor::{CommandExecutor, RealExecutor};
pub use identity::{AccountId, IdentityError};
pub use plan::Invocation;
pub use runner::{ExecuteOptions, RunError, Runner};
