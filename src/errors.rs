// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scanner Error Types
 * Typed errors surfaced to callers of the scan engine
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use thiserror::Error;

/// Main scanner error type.
///
/// Transport failures of individual requests are NOT represented here: the
/// executor turns them into inconclusive `RequestResult`s. These variants are
/// either fatal rejections raised before any traffic is sent, or wrap
/// failures of the engine's own resources.
#[derive(Error, Debug)]
pub enum ScannerError {
    /// Network-related errors
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unknown profile name
    #[error("Unknown scan profile '{0}' (expected mapping, quick, balanced, intense or stealth)")]
    InvalidProfile(String),

    /// Malformed credentials
    #[error("Invalid {kind} credentials: {reason}")]
    InvalidAuth {
        kind: &'static str,
        reason: String,
    },

    /// Target URL cannot be scanned
    #[error("Invalid target '{url}': {reason}")]
    InvalidTarget {
        url: String,
        reason: String,
    },

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Network-specific errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("DNS resolution failed for {host}: {reason}")]
    DnsResolutionFailed {
        host: String,
        reason: String,
    },

    #[error("TLS handshake failed for {host}: {reason}")]
    TlsHandshakeFailed {
        host: String,
        reason: String,
    },

    #[error("Proxy error: {reason}")]
    ProxyError {
        reason: String,
    },

    #[error("HTTP client could not be built: {0}")]
    ClientBuild(String),
}

impl ScannerError {
    /// Configuration-class errors reject a scan before it starts
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScannerError::Configuration(_)
                | ScannerError::InvalidProfile(_)
                | ScannerError::InvalidAuth { .. }
                | ScannerError::InvalidTarget { .. }
                | ScannerError::Validation(_)
        )
    }
}

impl From<validator::ValidationErrors> for ScannerError {
    fn from(err: validator::ValidationErrors) -> Self {
        ScannerError::Validation(err.to_string())
    }
}

pub type ScannerResult<T> = std::result::Result<T, ScannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScannerError::InvalidProfile("turbo".to_string());
        assert!(err.to_string().contains("turbo"));

        let err = ScannerError::InvalidAuth {
            kind: "basic",
            reason: "missing ':' separator".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid basic credentials: missing ':' separator"
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(ScannerError::Configuration("x".into()).is_fatal());
        assert!(ScannerError::InvalidProfile("x".into()).is_fatal());
        assert!(!ScannerError::Network(NetworkError::DnsResolutionFailed {
            host: "example.com".into(),
            reason: "no system config".into()
        })
        .is_fatal());
        assert!(!ScannerError::Network(NetworkError::ProxyError {
            reason: "refused".into()
        })
        .is_fatal());
    }
}
