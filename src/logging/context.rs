use crate::cli::Command;
use std::env;

/// How the process was launched, which decides where console logs may go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogContext {
    /// Catalog commands (`list`, `schema`, `validate`) whose stdout is the result.
    Catalog,
    /// A single step run from the terminal.
    StepRun,
    /// Invoked by a workflow engine that captures stdout and stderr itself.
    Embedded,
}

impl LogContext {
    /// Returns `true` when console sinks should be disabled.
    pub fn disables_console(self) -> bool {
        matches!(self, LogContext::Embedded)
    }
}

/// Derive the logging context from a parsed CLI command plus overrides.
pub fn detect_context(command: &Command) -> LogContext {
    if embedded_override_enabled() {
        return LogContext::Embedded;
    }

    match command {
        Command::List(_) | Command::Schema(_) | Command::Validate(_) => LogContext::Catalog,
        Command::Run(_) => LogContext::StepRun,
    }
}

fn embedded_override_enabled() -> bool {
    env::var("CRM_HELPERS_EMBEDDED")
        .map(|value| value.trim() == "1")
        .unwrap_or(false)
}
