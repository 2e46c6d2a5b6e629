use serde::{Deserialize, Serialize};

/// Error category enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Helper config failed schema or cross-field validation.
    ValidationError,
    /// Requested helper type has no registered factory.
    NotRegistered,
    /// Data the helper required could not be read from the CRM.
    ReadError,
    /// The CRM rejected a mutation.
    WriteError,
    /// Arithmetic, parsing or other domain computation failed.
    ComputationError,
    ConnectorError,
    NetworkError,
    TimeoutError,
    SerializationError,
    IoError,
    InternalError,
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Error severity enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Error,
    Warning,
    Info,
    Debug,
}
