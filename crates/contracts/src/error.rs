//! Layered error definitions
//!
//! Categorized by source: config / store / platform / stream

use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Configuration store failure
///
/// Always an underlying backend I/O failure. Surfaced to the caller, never fatal
/// once the store is open.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend could not be opened or initialised
    #[error("{backend} store open error: {message}")]
    Open { backend: String, message: String },

    /// Read / snapshot failure
    #[error("{backend} store read error: {message}")]
    Read { backend: String, message: String },

    /// Upsert / delete failure
    #[error("{backend} store write error: {message}")]
    Write { backend: String, message: String },
}

impl StoreError {
    pub fn open(backend: impl Into<String>, message: impl ToString) -> Self {
        Self::Open {
            backend: backend.into(),
            message: message.to_string(),
        }
    }

    pub fn read(backend: impl Into<String>, message: impl ToString) -> Self {
        Self::Read {
            backend: backend.into(),
            message: message.to_string(),
        }
    }

    pub fn write(backend: impl Into<String>, message: impl ToString) -> Self {
        Self::Write {
            backend: backend.into(),
            message: message.to_string(),
        }
    }
}

/// Chat platform call failure
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    /// Platform answered with a non-success status
    #[error("platform returned {status} for {endpoint}: {message}")]
    Http {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// Transport-level failure (connect, timeout, TLS)
    #[error("platform request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    /// Response body could not be decoded
    #[error("failed to decode platform response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    /// Referenced guild / user / channel is unknown
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },
}

impl PlatformError {
    pub fn http(endpoint: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            endpoint: endpoint.into(),
            status,
            message: message.into(),
        }
    }

    pub fn transport(endpoint: impl Into<String>, message: impl ToString) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    pub fn decode(endpoint: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

/// Upstream stream failure
///
/// Triggers a reconnect with backoff, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// Subscription could not be established
    #[error("stream connect error: {message}")]
    Connect { message: String },

    /// Connection dropped or body read failed mid-stream
    #[error("stream disconnected: {message}")]
    Disconnected { message: String },

    /// Error value delivered in-band by the upstream
    #[error("upstream error: {message}")]
    Upstream { message: String },

    /// Undecodable payload
    #[error("stream protocol error: {message}")]
    Protocol { message: String },
}

impl StreamError {
    pub fn connect(message: impl ToString) -> Self {
        Self::Connect {
            message: message.to_string(),
        }
    }

    pub fn disconnected(message: impl ToString) -> Self {
        Self::Disconnected {
            message: message.to_string(),
        }
    }

    pub fn upstream(message: impl ToString) -> Self {
        Self::Upstream {
            message: message.to_string(),
        }
    }

    pub fn protocol(message: impl ToString) -> Self {
        Self::Protocol {
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display_names_backend() {
        let err = StoreError::write("relational", "connection reset");
        assert_eq!(
            err.to_string(),
            "relational store write error: connection reset"
        );
    }

    #[test]
    fn test_platform_error_display() {
        let err = PlatformError::http("POST /channels/1/messages", 403, "Missing Access");
        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("Missing Access"));
    }
}
