/// Exit status used when a sequence is interrupted by a per-invocation timeout.
pub const EXIT_TIMED_OUT: i32 = 124;
/// Exit status used when a program exists but cannot be executed.
pub const EXIT_NOT_EXECUTABLE: i32 = 126;
/// Exit status used when a program cannot be found.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit status used when a sequence is cancelled (Ctrl-C).
pub const EXIT_CANCELLED: i32 = 130;

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("failed to start `{program}` — is it installed and on PATH?")]
    NotFound {
        program: String,
        source: std::io::Error,
    },

    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("`{command}` exited with {}", describe_code(*code))]
    Failed { command: String, code: Option<i32> },

    #[error("`{command}` timed out after {after:?}")]
    TimedOut {
        command: String,
        after: std::time::Duration,
    },

    #[error("`{command}` was cancelled")]
    Cancelled { command: String },

    #[error("`{command}` output was not valid UTF-8")]
    InvalidUtf8 {
        command: String,
        source: std::string::FromUtf8Error,
    },

    #[error("failed to write to `{command}` stdin")]
    StdinWrite {
        command: String,
        source: std::io::Error,
    },

    #[error("failed to wait for `{command}`")]
    Wait {
        command: String,
        source: std::io::Error,
    },
}

impl ExecError {
    /// The process exit status to propagate for this failure.
    ///
    /// A child that exited non-zero yields its own code; a child killed by a
    /// signal yields 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecError::Failed { code, .. } => match code {
                Some(c) if *c != 0 => *c,
                _ => 1,
            },
            ExecError::TimedOut { .. } => EXIT_TIMED_OUT,
            ExecError::Cancelled { .. } => EXIT_CANCELLED,
            ExecError::NotFound { .. } => EXIT_NOT_FOUND,
            ExecError::Spawn { source, .. } => match source.kind() {
                std::io::ErrorKind::PermissionDenied => EXIT_NOT_EXECUTABLE,
                _ => 1,
            },
            ExecError::InvalidUtf8 { .. }
            | ExecError::StdinWrite { .. }
            | ExecError::Wait { .. } => 1,
        }
    }

    /// Whether the external command already printed its own diagnostic.
    pub fn is_reported(&self) -> bool {
        matches!(self, ExecError::Failed { .. })
    }
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "no status (killed by signal)".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_propagates_child_code() {
        let err = ExecError::Failed {
            command: "docker push x".to_owned(),
            code: Some(3),
        };
        assert_eq!(err.exit_code(), 3);
        assert!(err.is_reported());
    }

    #[test]
    fn signal_kill_maps_to_one() {
        let err = ExecError::Failed {
            command: "docker build".to_owned(),
            code: None,
        };
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("killed by signal"));
    }

    #[test]
    fn timeout_and_cancel_codes() {
        let timed_out = ExecError::TimedOut {
            command: "docker push".to_owned(),
            after: std::time::Duration::from_secs(5),
        };
        let cancelled = ExecError::Cancelled {
            command: "docker push".to_owned(),
        };
        assert_eq!(timed_out.exit_code(), EXIT_TIMED_OUT);
        assert_eq!(cancelled.exit_code(), EXIT_CANCELLED);
        assert!(!timed_out.is_reported());
    }

    #[test]
    fn permission_denied_is_not_reported_as_missing() {
        let err = ExecError::Spawn {
            program: "./deploy.sh".to_owned(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert_eq!(err.exit_code(), EXIT_NOT_EXECUTABLE);
        assert!(!err.to_string().contains("PATH"));
        assert!(!err.is_reported());
    }
}
