// Copyright 2026 the Partforge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The action tags the sequencer emits, one per (step × modality).

use std::fmt;

/// A scheduled operation against one step of one part.
///
/// Tags are disjoint: exactly one is emitted per `(part, step)` within a
/// single plan. See `Step::action_for`/`rerun_action_for`/`skip_action_for`
/// for the canonical step-to-action maps.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Action {
    /// Fresh pull: the step has never run.
    Pull,
    /// Fresh build.
    Build,
    /// Fresh stage.
    Stage,
    /// Fresh prime.
    Prime,
    /// Re-run pull after cleaning a prior successful run.
    Repull,
    /// Re-run build after cleaning a prior successful run.
    Rebuild,
    /// Re-run stage after cleaning a prior successful run.
    Restage,
    /// Re-run prime after cleaning a prior successful run.
    Reprime,
    /// Pull is valid; nothing to do.
    SkipPull,
    /// Build is valid; nothing to do.
    SkipBuild,
    /// Stage is valid; nothing to do.
    SkipStage,
    /// Prime is valid; nothing to do.
    SkipPrime,
    /// Non-destructive refresh of pull (outdated, but not dirty).
    UpdatePull,
    /// Non-destructive refresh of build (outdated, but not dirty).
    UpdateBuild,
}

impl Action {
    /// Returns `true` for any of the `Skip*` variants.
    #[must_use]
    pub fn is_skip(self) -> bool {
        matches!(
            self,
            Action::SkipPull | Action::SkipBuild | Action::SkipStage | Action::SkipPrime
        )
    }

    /// Returns `true` for any of the `Re*` (re-run) variants.
    #[must_use]
    pub fn is_rerun(self) -> bool {
        matches!(
            self,
            Action::Repull | Action::Rebuild | Action::Restage | Action::Reprime
        )
    }

    /// Returns `true` for `UpdatePull`/`UpdateBuild`.
    #[must_use]
    pub fn is_update(self) -> bool {
        matches!(self, Action::UpdatePull | Action::UpdateBuild)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Pull => "PULL",
            Action::Build => "BUILD",
            Action::Stage => "STAGE",
            Action::Prime => "PRIME",
            Action::Repull => "REPULL",
            Action::Rebuild => "REBUILD",
            Action::Restage => "RESTAGE",
            Action::Reprime => "REPRIME",
            Action::SkipPull => "SKIP_PULL",
            Action::SkipBuild => "SKIP_BUILD",
            Action::SkipStage => "SKIP_STAGE",
            Action::SkipPrime => "SKIP_PRIME",
            Action::UpdatePull => "UPDATE_PULL",
            Action::UpdateBuild => "UPDATE_BUILD",
        };
        f.write_str(name)
    }
}
