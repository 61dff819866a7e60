//! CLI-specific error types
//!
//! Configuration and I/O errors end the process. Compile errors are reported
//! per request and processing continues.

use std::fmt;
use std::io;

use crate::compiler::CompileError;

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout) or malformed request JSON
    IoError,
    /// Expression failed to compile
    CompileError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "BINDSL_CLI_CONFIG_ERROR",
            Self::IoError => "BINDSL_CLI_IO_ERROR",
            Self::CompileError => "BINDSL_CLI_COMPILE_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
    /// Code of the underlying compile error, reported instead of ours
    compile_code: Option<&'static str>,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            compile_code: None,
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Stable code for responses; compile errors keep their DSL code
    pub fn code_str(&self) -> &'static str {
        self.compile_code.unwrap_or_else(|| self.code.code())
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<CompileError> for CliError {
    fn from(e: CompileError) -> Self {
        Self {
            code: CliErrorCode::CompileError,
            message: e.message().to_string(),
            compile_code: Some(e.code().code()),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_keeps_dsl_code() {
        let err = CliError::from(CompileError::unresolved("Undefined variable 'x'"));
        assert_eq!(err.code(), &CliErrorCode::CompileError);
        assert_eq!(err.code_str(), "DSL_UNRESOLVED_REFERENCE");
        assert_eq!(err.message(), "Undefined variable 'x'");
    }

    #[test]
    fn test_json_error_is_io() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = CliError::from(json_err);
        assert_eq!(err.code_str(), "BINDSL_CLI_IO_ERROR");
        assert!(err.to_string().starts_with("BINDSL_CLI_IO_ERROR: JSON error"));
    }
}
