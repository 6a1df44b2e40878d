// Copyright 2026 the Partforge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error taxonomy for planning and execution.
//!
//! Mirrors `original_source/partbuilder/errors.py`'s `PartbuilderException`
//! hierarchy: one enum carries the kinds, and [`UserError`] supplies the
//! brief/resolution/details/reportable quartet per variant instead of an
//! abstract base class.

use std::fmt;

/// Errors raised during planning or execution.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// A referenced `after` name, or a selected part name, does not exist.
    #[error("part {name:?} is not defined in the parts list")]
    InvalidPartName {
        /// The offending name.
        name: String,
    },

    /// The `after` relation is cyclic.
    #[error("part {witness:?} belongs to a circular dependency chain")]
    DependencyCycle {
        /// One part name witnessing the cycle.
        witness: String,
    },

    /// A switch over `Step`/`Action` saw an out-of-range value.
    ///
    /// Unreachable given the closed variant sets in this crate; kept so the
    /// failure mode is a reported error rather than a panic if the enums
    /// ever grow without updating every match.
    #[error("internal error: {0}")]
    Internal(String),

    /// Propagated from the external executor; never retried.
    #[error("executor failed: {0}")]
    Executor(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl LifecycleError {
    /// Constructs an [`LifecycleError::Executor`] from any boxed error.
    pub fn executor(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Executor(Box::new(err))
    }
}

/// Per-variant user-facing metadata, mirroring `PartbuilderException`.
pub trait UserError: fmt::Display {
    /// Concise, single-line description of the error.
    fn brief(&self) -> String;

    /// Concise suggestion for the user to resolve the error.
    fn resolution(&self) -> String;

    /// Detailed technical information, if useful for debugging.
    fn details(&self) -> Option<String> {
        None
    }

    /// Link to documentation, if applicable.
    fn docs_url(&self) -> Option<&'static str> {
        None
    }

    /// Whether this error is reportable (a bug, not user input).
    fn reportable(&self) -> bool {
        false
    }
}

impl UserError for LifecycleError {
    fn brief(&self) -> String {
        self.to_string()
    }

    fn resolution(&self) -> String {
        match self {
            LifecycleError::InvalidPartName { .. } => {
                "Check for typos in the part name or in the parts definition.".to_string()
            }
            LifecycleError::DependencyCycle { .. } => {
                "Review the parts definition to remove dependency cycles.".to_string()
            }
            LifecycleError::Internal(_) => {
                "Please report this as a bug; this should be unreachable.".to_string()
            }
            LifecycleError::Executor(_) => {
                "Inspect the executor's own diagnostics for the underlying failure.".to_string()
            }
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            LifecycleError::Executor(source) => Some(source.to_string()),
            _ => None,
        }
    }

    fn reportable(&self) -> bool {
        matches!(self, LifecycleError::Internal(_) | LifecycleError::Executor(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_and_executor_errors_are_reportable() {
        assert!(LifecycleError::Internal("x".into()).reportable());
        assert!(!LifecycleError::InvalidPartName { name: "x".into() }.reportable());
        assert!(!LifecycleError::DependencyCycle { witness: "x".into() }.reportable());
    }

    #[test]
    fn brief_mentions_the_offending_name() {
        let err = LifecycleError::InvalidPartName {
            name: "frobnicator".into(),
        };
        assert!(err.brief().contains("frobnicator"));
    }
}
