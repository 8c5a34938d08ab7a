//! # Model Errors
//!
//! Failures of the *tooling* around the model: unreadable files, malformed
//! JSON, bounded backends running out of room, trace events that cannot be
//! mapped onto a hook. Discipline violations of the analyzed program are not
//! errors in this sense; they are [`ViolationReport`](crate::domain::ViolationReport)s.

use std::path::PathBuf;

/// Errors raised by registration, configuration and trace handling
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was being read
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// JSON input did not match the expected shape
    #[error("invalid {what} JSON: {source}")]
    Json {
        /// What was being parsed (config, trace, scenario)
        what: &'static str,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// A bounded backend has no room for another entry
    #[error("{what} capacity exceeded (max {capacity})")]
    CapacityExceeded {
        /// Registry that overflowed
        what: &'static str,
        /// Its fixed capacity
        capacity: usize,
    },

    /// A trace call is missing a required argument
    #[error("call to {function} is missing argument #{index}")]
    MissingArgument {
        /// Instrumented function name
        function: String,
        /// Zero-based argument position
        index: usize,
    },

    /// A slot-less update-side call could not be tied to a single slot
    #[error("call to {function} does not name a slot and {declared} slots are declared")]
    AmbiguousSlot {
        /// Instrumented function name
        function: String,
        /// Number of declared slots
        declared: usize,
    },

    /// A scenario schedule names a thread that has no step left
    #[error("schedule position {position} names thread {thread}, which has no remaining step")]
    InvalidSchedule {
        /// Index into the explicit schedule
        position: usize,
        /// Thread index named at that position
        thread: usize,
    },
}

impl ModelError {
    /// Wrap a JSON error with what was being parsed
    pub fn json(what: &'static str, source: serde_json::Error) -> Self {
        Self::Json { what, source }
    }

    /// Whether the error comes from malformed input rather than the environment
    pub fn is_input_error(&self) -> bool {
        !matches!(self, Self::Io { .. } | Self::CapacityExceeded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ModelError::CapacityExceeded {
            what: "lock registry",
            capacity: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("lock registry"));
        assert!(msg.contains('4'));
        assert!(!err.is_input_error());

        let err = ModelError::MissingArgument {
            function: "ldv_rcu_dereference".into(),
            index: 0,
        };
        assert!(err.to_string().contains("ldv_rcu_dereference"));
        assert!(err.is_input_error());
    }

    #[test]
    fn test_json_error_keeps_source() {
        let source = serde_json::from_str::<u32>("not json").unwrap_err();
        let err = ModelError::json("trace", source);
        assert!(err.to_string().starts_with("invalid trace JSON"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
