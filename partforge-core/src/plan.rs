// Copyright 2026 the Partforge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The ordered list of actions the sequencer emits.

use crate::action::Action;
use crate::step::Step;

/// One scheduled action, emitted by the sequencer. Immutable once appended
/// to a [`Plan`].
#[derive(Clone, Debug, PartialEq)]
pub struct PartAction {
    /// The part this action applies to.
    pub part_name: String,
    /// The step this action applies to.
    pub step: Step,
    /// The scheduled action.
    pub action: Action,
    /// A one-line human-readable reason, when the action isn't a plain
    /// fresh run (e.g. "requested step", "already ran", a dirty/outdated
    /// summary).
    pub reason: Option<String>,
}

impl PartAction {
    /// Constructs an action with no reason (a fresh run).
    #[must_use]
    pub fn new(part_name: impl Into<String>, step: Step, action: Action) -> Self {
        Self {
            part_name: part_name.into(),
            step,
            action,
            reason: None,
        }
    }

    /// Attaches a reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl std::fmt::Display for PartAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.part_name, self.action)?;
        if let Some(reason) = &self.reason {
            write!(f, " ({reason})")?;
        }
        Ok(())
    }
}

/// The ordered sequence of actions produced by one [`crate::sequencer::Sequencer::actions`]
/// call.
pub type Plan = Vec<PartAction>;
