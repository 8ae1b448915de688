//! Error taxonomy for provider calls and user-facing lookups.

use thiserror::Error;

/// A single provider call failed.
///
/// Never surfaces past the retry wrapper; the service turns it into
/// [`StatsError::Unavailable`].
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} returned {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Malformed {provider} response: {reason}")]
    Malformed {
        provider: &'static str,
        reason: String,
    },

    #[error("{0} API key not configured")]
    MissingApiKey(&'static str),
}

impl ProviderError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Transport errors, 5xx, 408 and 429 are transient. Bad ids, bad keys
    /// and bodies we cannot parse are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Http(e) => !e.is_decode() && !e.is_builder(),
            ProviderError::Status { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            ProviderError::Malformed { .. } | ProviderError::MissingApiKey(_) => false,
        }
    }

    pub(crate) fn malformed(provider: &'static str, reason: impl Into<String>) -> Self {
        ProviderError::Malformed {
            provider,
            reason: reason.into(),
        }
    }
}

/// Errors the service reports to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    #[error("{operation} unavailable after {attempts} attempt(s): {last_error}")]
    Unavailable {
        operation: String,
        attempts: u32,
        last_error: String,
    },

    #[error("{kind} not found: \"{query}\"")]
    NotFound { kind: &'static str, query: String },

    #[error("No records returned for {0}")]
    EmptyResult(String),
}

impl StatsError {
    /// Message suitable for showing to the user
    pub fn advisory(&self) -> String {
        match self {
            StatsError::Unavailable { .. } => {
                "Stats server is busy. Please wait 10 seconds and try again.".to_string()
            }
            StatsError::NotFound { kind, .. } => {
                format!("{} not found. Check the spelling.", kind)
            }
            StatsError::EmptyResult(entity) => format!("No games found for {}.", entity),
        }
    }

    /// Short machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            StatsError::Unavailable { .. } => "unavailable",
            StatsError::NotFound { .. } => "not_found",
            StatsError::EmptyResult(_) => "empty_result",
        }
    }
}
