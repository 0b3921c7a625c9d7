//! Error types for lease file parsing.
//!
//! All fallible operations in this crate return [`Result<T>`], which uses
//! the [`Error`] enum for error variants.
//!
//! Blocks that are not real leases (for example a `lease` block without a
//! `hardware` line) are not errors at all: they are skipped during parsing.
//! The variants below split into two families:
//!
//! - format errors: a field is present but does not have its expected shape.
//!   These abort the whole parse, since partial results would be misleading.
//! - configuration errors: the caller supplied an unusable setting, such as a
//!   reference time without a UTC offset.

/// Errors that can occur while parsing a lease database.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File system I/O error (binary only; the parser never touches files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error (config file or output).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A timestamp does not match `<weekday> YYYY/MM/DD HH:MM:SS` or `epoch <seconds>`.
    #[error("Invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    /// An escaped string literal could not be decoded to bytes.
    #[error("Invalid escaped string {input:?}: {reason}")]
    InvalidEscape { input: String, reason: String },

    /// An IPv6 host identifier decoded to fewer than the 4 bytes of an IAID.
    #[error("Host identifier too short: {0} bytes (minimum 4)")]
    HostIdentifierTooShort(usize),

    /// A lifetime (`preferred-life`, `max-life`) is not a non-negative integer.
    #[error("Invalid {field} value: {value:?}")]
    InvalidLifetime { field: &'static str, value: String },

    /// A property is present but its value has the wrong shape.
    #[error("Invalid {field} property: {value:?}")]
    InvalidProperty { field: &'static str, value: String },

    /// A property the block grammar requires is missing.
    #[error("Missing required property: {0}")]
    MissingProperty(&'static str),

    /// A reference time was given without a UTC offset.
    ///
    /// Comparing a naive time against UTC lease bounds silently gives wrong
    /// answers, so it is rejected before any comparison is attempted.
    #[error("Reference time {0:?} has no UTC offset")]
    NaiveReferenceTime(String),

    /// Invalid configuration.
    ///
    /// Returned by [`Config::validate`](crate::Config::validate) when the
    /// configuration contains invalid values (e.g., a zero poll interval).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Returns true for errors caused by a malformed field in the lease file.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTimestamp(_)
                | Self::InvalidEscape { .. }
                | Self::HostIdentifierTooShort(_)
                | Self::InvalidLifetime { .. }
                | Self::InvalidProperty { .. }
                | Self::MissingProperty(_)
        )
    }

    /// Returns true for errors caused by caller-supplied settings.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::NaiveReferenceTime(_) | Self::InvalidConfig(_))
    }
}

/// A specialized Result type for lease parsing.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_families() {
        assert!(Error::InvalidTimestamp("x".to_string()).is_format_error());
        assert!(Error::HostIdentifierTooShort(2).is_format_error());
        assert!(Error::MissingProperty("cltt").is_format_error());
        assert!(!Error::MissingProperty("cltt").is_configuration_error());

        let naive = Error::NaiveReferenceTime("2015-07-06T08:15:00".to_string());
        assert!(naive.is_configuration_error());
        assert!(!naive.is_format_error());
    }

    #[test]
    fn test_error_display() {
        let error = Error::InvalidLifetime {
            field: "max-life",
            value: "-1".to_string(),
        };
        assert_eq!(error.to_string(), "Invalid max-life value: \"-1\"");
    }
}
