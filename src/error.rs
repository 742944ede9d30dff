//! Error types for time log processing.
//!
//! All errors implement `std::error::Error` and carry enough context (file
//! path, time log name, parse location) to be reported to a user without the
//! surrounding call stack.
//!
//! ## Error Categories
//!
//! - **File Errors**: a `.bin` file could not be opened, read or written
//! - **Parse Errors**: template or configuration data is malformed
//! - **Template Errors**: a time log has no usable template
//! - **Descriptor Limit**: an export tried to log more descriptors than an
//!   order byte can address
//!
//! ## Recovery
//!
//! An import of several time logs keeps going when one of them fails. Use
//! [`TimeLogError::is_recoverable`] to decide whether the failure is confined
//! to a single time log:
//!
//! ```rust
//! use timelog::TimeLogError;
//! use std::path::PathBuf;
//!
//! let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
//! let error = TimeLogError::file_error(PathBuf::from("TLG00001.bin"), io_err);
//! assert!(error.is_recoverable());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for time log operations.
pub type Result<T, E = TimeLogError> = std::result::Result<T, E>;

/// Main error type for time log operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TimeLogError {
    #[error("Time log file error: {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Invalid template for time log '{time_log}': {reason}")]
    Template { time_log: String, reason: String },

    #[error("Configuration error: {details}")]
    Config { details: String },

    #[error("{count} descriptors exceed the 256 addressable order bytes")]
    DescriptorLimit { count: usize },
}

impl TimeLogError {
    /// Returns whether an import can skip the affected time log and continue.
    pub fn is_recoverable(&self) -> bool {
        match self {
            TimeLogError::File { .. } => true,
            TimeLogError::Parse { .. } => true,
            TimeLogError::Template { .. } => true,
            TimeLogError::Config { .. } => false,
            TimeLogError::DescriptorLimit { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TimeLogError::File { .. } => vec![
                "Check the .bin file exists next to its template",
                "Check file permissions",
                "Ensure sufficient disk space when exporting",
            ],
            TimeLogError::Parse { .. } => vec![
                "Verify source data integrity",
                "Check the document was produced by an ISO 11783-10 compliant terminal",
            ],
            TimeLogError::Template { .. } => vec![
                "Check the TLG template declares a TIM element",
                "Verify the template and .bin share the same base name",
            ],
            TimeLogError::Config { .. } => vec![
                "Check option names and value types",
                "Remove unknown keys from the configuration file",
            ],
            TimeLogError::DescriptorLimit { .. } => vec![
                "Split the operation into several time logs",
                "Drop working data that does not need to be logged",
            ],
        }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        TimeLogError::File { path, source }
    }

    /// Helper constructor for parse errors.
    pub fn parse_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        TimeLogError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for template errors.
    pub fn template_error(time_log: impl Into<String>, reason: impl Into<String>) -> Self {
        TimeLogError::Template { time_log: time_log.into(), reason: reason.into() }
    }
}

impl From<std::io::Error> for TimeLogError {
    fn from(err: std::io::Error) -> Self {
        TimeLogError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn messages_carry_their_context(
            context in "[a-zA-Z ]+",
            details in ".*",
            time_log in "TLG[0-9]{5}",
            count in 257usize..10_000usize
        ) {
            let parse = TimeLogError::parse_error(context.clone(), details.clone());
            let template = TimeLogError::template_error(time_log.clone(), "no TIM element");
            let limit = TimeLogError::DescriptorLimit { count };

            prop_assert!(parse.to_string().contains(&context));
            prop_assert!(parse.to_string().contains(&details));
            prop_assert!(template.to_string().contains(&time_log));
            prop_assert!(limit.to_string().contains(&count.to_string()));
        }
    }

    #[test]
    fn file_errors_report_path_and_message() {
        let err = TimeLogError::file_error(
            PathBuf::from("data/TLG00003.bin"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let message = err.to_string();
        assert!(message.contains("TLG00003.bin"));
        assert!(message.contains("denied"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn recoverability_matches_import_policy() {
        let file = TimeLogError::from(std::io::Error::other("boom"));
        let config = TimeLogError::Config { details: "bad".to_string() };

        assert!(file.is_recoverable());
        assert!(!config.is_recoverable());
        assert!(!TimeLogError::DescriptorLimit { count: 300 }.is_recoverable());

        for error in [file, config] {
            assert!(!error.recovery_suggestions().is_empty());
        }
    }

    #[test]
    fn error_is_send_sync_static() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<TimeLogError>();
    }
}
