// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Setup-time errors.
//!
//! Ordinary data-path outcomes (buffer full, consumer unreachable, ...) are
//! reported as [`BufferStatus`](crate::BufferStatus) /
//! [`PortStatus`](crate::PortStatus) codes and never surface here. This enum
//! only covers conditions a caller cannot recover from by retrying: unknown
//! factory identifiers, malformed properties, objects used before they were
//! wired together.

/// Errors returned when building or wiring engine objects.
///
/// # Example
///
/// ```rust
/// use rtm_core::{Error, Properties, Registry};
///
/// let registry = Registry::<i32>::with_defaults();
/// let mut props = Properties::new();
/// props.set("publisher_type", "carrier_pigeon");
///
/// match registry.create_publisher(&props) {
///     Err(Error::UnknownFactory { kind, id }) => {
///         assert_eq!(kind, "publisher");
///         assert_eq!(id, "carrier_pigeon");
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A property value is present but unusable (e.g. `publisher.push_rate = -1`).
    InvalidArgs(String),
    /// No factory registered under this identifier.
    UnknownFactory {
        /// Factory family ("buffer", "publisher", "provider", "consumer").
        kind: &'static str,
        /// Requested identifier.
        id: String,
    },
    /// Configuration document could not be parsed.
    Config(String),

    // ========================================================================
    // Wiring Errors
    // ========================================================================
    /// A required collaborator (buffer, consumer, provider) was not set.
    PreconditionNotMet(String),
    /// Interface subscription between provider and consumer failed.
    SubscriptionFailed(String),

    // ========================================================================
    // Runtime Errors
    // ========================================================================
    /// Worker thread could not be spawned.
    ThreadSpawn(std::io::Error),
    /// I/O error while reading configuration.
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidArgs(msg) => write!(f, "Invalid argument: {}", msg),
            Error::UnknownFactory { kind, id } => {
                write!(f, "No {} factory registered for '{}'", kind, id)
            }
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::PreconditionNotMet(msg) => write!(f, "Precondition not met: {}", msg),
            Error::SubscriptionFailed(msg) => write!(f, "Interface subscription failed: {}", msg),
            Error::ThreadSpawn(e) => write!(f, "Failed to spawn worker thread: {}", e),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ThreadSpawn(e) | Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// Convenient alias for setup results using the crate [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_display_unknown_factory() {
        let err = Error::UnknownFactory {
            kind: "buffer",
            id: "tape".to_string(),
        };
        assert_eq!(err.to_string(), "No buffer factory registered for 'tape'");
    }

    #[test]
    fn test_io_source_preserved() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.source().is_some());
        assert!(Error::InvalidArgs("x".into()).source().is_none());
    }
}
