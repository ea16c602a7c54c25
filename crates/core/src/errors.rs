//! Error types for the idlookup core library.
//!
//! Per-identifier failures are [`LookupError`]s and are recovered by the
//! batch runner. Configuration and report I/O failures are structural and
//! abort the run. [`CoreError`] unifies them for callers that want a single
//! error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

// ---------------------------------------------------------------------------
// Lookup errors
// ---------------------------------------------------------------------------

/// Why a single identifier could not be resolved.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The external query command exited with a non-zero status.
    #[error("query command failed (exit {status})")]
    CommandFailed {
        status: i32,
        /// Combined stdout and stderr of the command.
        output: String,
    },

    /// LDAP connection, bind, or search error.
    #[error("LDAP error: {0}")]
    Ldap(String),

    /// The directory returned no entry for the identifier.
    #[error("no directory entry for '{0}'")]
    NotFound(String),

    /// The entry was found but lacks a required attribute.
    #[error("directory entry is missing required attribute '{attribute}'")]
    MissingAttribute { attribute: String },

    /// The query command could not be spawned.
    #[error("query I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LookupError {
    /// Raw tool output attached to the failure, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            LookupError::CommandFailed { output, .. } => Some(output),
            _ => None,
        }
    }

    /// Numeric status for diagnostics: the command exit code, or -1 for
    /// failures that have no exit code.
    pub fn status(&self) -> i32 {
        match self {
            LookupError::CommandFailed { status, .. } => *status,
            _ => -1,
        }
    }
}

impl From<ldap3::LdapError> for LookupError {
    fn from(err: ldap3::LdapError) -> Self {
        LookupError::Ldap(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Report errors
// ---------------------------------------------------------------------------

/// Errors reading the identifier list or writing the two report files.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The input file could not be opened or read.
    #[error("cannot read input '{path}': {source}")]
    Input {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// An output file could not be created.
    #[error("cannot create output '{path}': {source}")]
    Output {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing or flushing an output line failed.
    #[error("report write error: {0}")]
    Write(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = LookupError::CommandFailed {
            status: 49,
            output: "ldap_bind: Invalid credentials (49)".into(),
        };
        assert_eq!(err.to_string(), "query command failed (exit 49)");
        assert_eq!(err.status(), 49);
        assert!(err.output().unwrap().contains("Invalid credentials"));

        let err = LookupError::MissingAttribute {
            attribute: "motFriendlyMail".into(),
        };
        assert!(err.to_string().contains("motFriendlyMail"));
        assert_eq!(err.status(), -1);
        assert!(err.output().is_none());

        let err = ConfigError::InvalidValue {
            field: "command.template".into(),
            detail: "must not be empty".into(),
        };
        assert!(err.to_string().contains("command.template"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let err: CoreError = LookupError::NotFound("jdoe123".into()).into();
        assert!(matches!(err, CoreError::Lookup(_)));

        let err: CoreError = ConfigError::FileNotFound("/nope.toml".into()).into();
        assert!(matches!(err, CoreError::Config(_)));
    }
}
