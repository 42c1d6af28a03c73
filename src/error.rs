//! Unified error hierarchy for LiftRS
//!
//! Most planning conditions (empty muscle lists, exhausted candidate pools,
//! fatigue-suppressed volume) are policy and never surface here. Errors are
//! reserved for malformed static configuration and for persistence failures.

use thiserror::Error;

use crate::models::{ExperienceLevel, FitnessGoal};

/// Top-level error type for all LiftRS operations
#[derive(Debug, Error)]
pub enum LiftError {
    /// Set/rep template table errors
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Stimulus history persistence errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while building or validating the set-scheme template table
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// A (goal, experience) combination has no template
    #[error("Missing template for goal={goal:?}, experience={experience:?}")]
    MissingCombination {
        goal: FitnessGoal,
        experience: ExperienceLevel,
    },

    /// A range in a template is empty or starts below its allowed floor
    #[error("Invalid {field} range {min}..={max} for goal={goal:?}, experience={experience:?}")]
    InvalidRange {
        goal: FitnessGoal,
        experience: ExperienceLevel,
        field: &'static str,
        min: u32,
        max: u32,
    },
}

/// Stimulus history store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Stored value could not be decoded
    #[error("Corrupted record for {muscle}: {reason}")]
    Corrupted { muscle: String, reason: String },

    /// In-memory store lock was poisoned by a panicking writer
    #[error("Store lock poisoned")]
    Poisoned,
}

/// Result type alias for LiftRS operations
pub type Result<T> = std::result::Result<T, LiftError>;

impl LiftError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LiftError::Store(StoreError::Sqlite(_)) | LiftError::Io(_)
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LiftError::Template(_) => ErrorSeverity::Critical,
            LiftError::Validation(_) => ErrorSeverity::Warning,
            LiftError::Store(StoreError::Corrupted { .. }) => ErrorSeverity::Warning,
            LiftError::Store(_) => ErrorSeverity::Error,
            LiftError::Configuration(_) => ErrorSeverity::Error,
            LiftError::Internal(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            LiftError::Template(TemplateError::MissingCombination { goal, experience }) => {
                format!(
                    "No set/rep template is configured for {} at {} level. Check the [[templates]] section of your config.",
                    goal, experience
                )
            }
            LiftError::Store(StoreError::Sqlite(_)) => {
                "Unable to read workout history. Please check the history database path.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical error requiring immediate attention (bad static configuration)
    Critical,
    /// Error that prevents the operation
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}
