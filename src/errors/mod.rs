//! Error type definitions for teamguide
//!
//! This module defines all error types used throughout the application,
//! providing a hierarchical error system that makes debugging and error
//! handling more straightforward.

use thiserror::Error;

/// Top-level application error type
///
/// This enum represents all possible errors that can occur in the application.
/// It uses `thiserror` to provide automatic error trait implementations and
/// proper error chaining.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Repository layer errors
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Upstream provider errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Stream matching errors
    #[error("Match error: {0}")]
    Match(#[from] MatchError),

    /// Channel lifecycle errors
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors surfaced by upstream sports data providers
///
/// Rate-limit waits never surface here; the clients wait them out. Only
/// genuine failures after the retry budget is exhausted become errors, and
/// most callers degrade to "no data" on `Timeout`/`Http`/`Malformed`.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Request exceeded the per-call timeout after all retries
    #[error("Request timed out: {url}")]
    Timeout { url: String },

    /// Non-success HTTP status after all retries
    #[error("HTTP {status} from {provider}: {message}")]
    Http {
        provider: String,
        status: u16,
        message: String,
    },

    /// Response parsed but a required field was missing or misshapen
    #[error("Malformed response from {provider}: {message}")]
    Malformed { provider: String, message: String },

    /// The requested resource does not exist upstream
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// No provider mapping exists for the league
    #[error("League not supported: {league}")]
    UnsupportedLeague { league: String },

    /// Network-level failure after all retries
    #[error("Request failed for {url}: {message}")]
    Network { url: String, message: String },
}

/// Errors from the stream matching pipeline
#[derive(Error, Debug)]
pub enum MatchError {
    /// A user-supplied regex failed to compile or lacked required groups
    #[error("Invalid custom regex for {field}: {message}")]
    InvalidRegex { field: String, message: String },

    /// No team data could be loaded for a league
    #[error("No team data available for league: {league}")]
    NoTeamData { league: String },
}

/// Errors from the channel lifecycle engine
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Downstream middleware call failed
    #[error("Middleware error: {operation} - {message}")]
    Middleware { operation: String, message: String },

    /// Two live managed channels exist for the same event
    #[error("Duplicate managed channel for event {event_id} in group {group_id}")]
    DuplicateChannel { event_id: String, group_id: i64 },

    /// Channel state transition was not valid
    #[error("Invalid channel state: {message}")]
    InvalidState { message: String },
}

/// Repository layer specific errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// SQL query execution failures
    #[error("Query failed: {query} - {message}")]
    QueryFailed { query: String, message: String },

    /// Data serialization/deserialization failures
    #[error("Serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// Constraint violations (unique, foreign key, etc.)
    #[error("Constraint violation: {constraint} - {message}")]
    ConstraintViolation { constraint: String, message: String },

    /// Record not found
    #[error("Record not found: {table} with {field} = {value}")]
    RecordNotFound {
        table: String,
        field: String,
        value: String,
    },

    /// Migration failures
    #[error("Migration failed: {version} - {message}")]
    MigrationFailed { version: String, message: String },
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error for a specific resource
    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl ProviderError {
    /// Create a timeout error
    pub fn timeout<U: Into<String>>(url: U) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Create a malformed-response error
    pub fn malformed<P: Into<String>, M: Into<String>>(provider: P, message: M) -> Self {
        Self::Malformed {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    /// True for failures callers should degrade on rather than propagate
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Network { .. } | Self::Http { .. }
        )
    }
}

impl RepositoryError {
    /// Create a query failed error
    pub fn query_failed<Q: Into<String>, M: Into<String>>(query: Q, message: M) -> Self {
        Self::QueryFailed {
            query: query.into(),
            message: message.into(),
        }
    }

    /// Create a record not found error
    pub fn record_not_found<T: Into<String>, F: Into<String>, V: Into<String>>(
        table: T,
        field: F,
        value: V,
    ) -> Self {
        Self::RecordNotFound {
            table: table.into(),
            field: field.into(),
            value: value.into(),
        }
    }
}
