//! Common error infrastructure for arena-core.
//!
//! Domain-specific errors (`TagError`, `InventoryError`, `AbilityError`,
//! `WorldError`) live beside the code that raises them and implement
//! [`GameError`] so callers can classify them uniformly.
//!
//! # Design Principles
//!
//! - **Never fatal for gameplay misuse**: authority violations and double
//!   removals come back as `Err` values, the caller decides whether to log.
//! - **Severity Classification**: errors are categorized for recovery strategies.

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: expected rejections (non-authoritative caller, blocked ability)
/// - **Validation**: invalid input that should be rejected without retry
/// - **Internal**: unexpected state inconsistencies that require investigation
/// - **Fatal**: unrecoverable errors indicating corrupted game state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Expected rejection; the predictive paths rely on these.
    Recoverable,

    /// Invalid input, e.g. removing a weapon that was never added.
    Validation,

    /// Unexpected state inconsistency. Indicates a bug.
    Internal,

    /// Game state corrupted, cannot continue.
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }
}

/// Common trait for all arena-core errors.
///
/// # Implementation Guidelines
///
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait GameError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}
