//! Error taxonomy for the usage pipeline.
//!
//! Every failure crosses the library boundary as a [`UsageError`] variant
//! carrying stage context and, where a fetch was in flight, the number of
//! records already retrieved. Callers render consistent diagnostics from the
//! discriminant instead of unwinding raw HTTP or serde errors. The binary
//! wraps these in `anyhow` at its outermost layer only.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UsageError {
    /// Credential rejected by the provider. Never retried here; token
    /// refresh belongs to the credential provider.
    #[error("unauthorized: provider rejected the credential (HTTP {status})")]
    Unauthorized { status: u16 },

    /// Rate limiting persisted past the configured retry bound.
    #[error("rate limit exceeded after {attempts} attempts ({records_fetched} records fetched before giving up)")]
    RateLimitExceeded {
        attempts: u32,
        records_fetched: usize,
    },

    /// Network-level failure that survived the transient retry bound.
    #[error("transient fetch error after {attempts} attempts ({records_fetched} records fetched): {message}")]
    TransientFetch {
        attempts: u32,
        records_fetched: usize,
        message: String,
    },

    /// Response body did not match the expected page structure. Aborts the
    /// whole fetch; partial data is never passed off as complete.
    #[error("malformed response on page {page}: {message}")]
    MalformedResponse { page: usize, message: String },

    /// A record failed normalization. `field` names the missing or
    /// non-numeric property.
    #[error("invalid record at index {index}: missing or invalid field `{field}`")]
    InvalidRecord { index: usize, field: &'static str },

    /// Caller-supplied query parameters were unusable before any request
    /// went out.
    #[error("invalid query: {message}")]
    InvalidQuery { message: String },

    /// The two independent cost computations disagreed beyond tolerance.
    #[error("total mismatch: billing-currency total {cost_total} vs price*quantity total {computed_total} (tolerance {tolerance})")]
    TotalMismatch {
        cost_total: f64,
        computed_total: f64,
        tolerance: f64,
    },

    /// Fetch cancelled between pages.
    #[error("fetch cancelled ({records_fetched} records fetched before cancellation)")]
    Cancelled { records_fetched: usize },
}

impl UsageError {
    /// Records retrieved before the failure, where the stage tracks any.
    pub fn records_fetched(&self) -> Option<usize> {
        match self {
            UsageError::RateLimitExceeded { records_fetched, .. }
            | UsageError::TransientFetch { records_fetched, .. }
            | UsageError::Cancelled { records_fetched } => Some(*records_fetched),
            _ => None,
        }
    }

    /// Whether the fetch layer may retry the same page.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            UsageError::RateLimitExceeded { .. } | UsageError::TransientFetch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, UsageError>;
