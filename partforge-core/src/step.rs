// Copyright 2026 the Partforge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The four-step part lifecycle, totally ordered.

use std::fmt;

use crate::action::Action;
use crate::error::LifecycleError;

/// One step of a part's lifecycle.
///
/// Steps are totally ordered by their discriminant: `Pull < Build < Stage <
/// Prime`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(u8)]
pub enum Step {
    /// Fetch a part's sources.
    Pull = 1,
    /// Compile or otherwise produce build artifacts from the pulled sources.
    Build = 2,
    /// Copy build artifacts into the shared staging area.
    Stage = 3,
    /// Copy staged files into the final prime (install) tree.
    Prime = 4,
}

/// All steps in lifecycle order.
pub const STEPS: [Step; 4] = [Step::Pull, Step::Build, Step::Stage, Step::Prime];

impl Step {
    /// Returns every step strictly less than `self`, in ascending order.
    #[must_use]
    pub fn previous_steps(self) -> Vec<Step> {
        STEPS.iter().copied().filter(|s| *s < self).collect()
    }

    /// Returns every step strictly greater than `self`, in ascending order.
    #[must_use]
    pub fn next_steps(self) -> Vec<Step> {
        STEPS.iter().copied().filter(|s| *s > self).collect()
    }

    /// Returns the step immediately before `self` in the lifecycle, if any.
    #[must_use]
    pub fn previous(self) -> Option<Step> {
        self.previous_steps().last().copied()
    }

    /// The fresh-run action for this step.
    ///
    /// # Errors
    ///
    /// Never fails for a valid `Step`; the `Result` exists so an
    /// out-of-range value (unreachable given the enum's closed variant set)
    /// reports as [`LifecycleError::Internal`] rather than panicking.
    pub fn action_for(self) -> Result<Action, LifecycleError> {
        match self {
            Step::Pull => Ok(Action::Pull),
            Step::Build => Ok(Action::Build),
            Step::Stage => Ok(Action::Stage),
            Step::Prime => Ok(Action::Prime),
        }
    }

    /// The re-run (post-clean) action for this step.
    ///
    /// # Errors
    ///
    /// See [`Step::action_for`].
    pub fn rerun_action_for(self) -> Result<Action, LifecycleError> {
        match self {
            Step::Pull => Ok(Action::Repull),
            Step::Build => Ok(Action::Rebuild),
            Step::Stage => Ok(Action::Restage),
            Step::Prime => Ok(Action::Reprime),
        }
    }

    /// The skip action for this step.
    ///
    /// # Errors
    ///
    /// See [`Step::action_for`].
    pub fn skip_action_for(self) -> Result<Action, LifecycleError> {
        match self {
            Step::Pull => Ok(Action::SkipPull),
            Step::Build => Ok(Action::SkipBuild),
            Step::Stage => Ok(Action::SkipStage),
            Step::Prime => Ok(Action::SkipPrime),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Pull => "pull",
            Step::Build => "build",
            Step::Stage => "stage",
            Step::Prime => "prime",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Step {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pull" => Ok(Step::Pull),
            "build" => Ok(Step::Build),
            "stage" => Ok(Step::Stage),
            "prime" => Ok(Step::Prime),
            other => Err(LifecycleError::Internal(format!(
                "unrecognized step name {other:?}"
            ))),
        }
    }
}

/// For a dependency of a part executing `step`, the step the dependency must
/// have completed.
///
/// `Stage` for `step <= Stage`, else `step` itself — a part needs its
/// dependencies staged before its own pull/build/stage, and primed before its
/// own prime. See spec.md §9 for why PULL's prerequisite is STAGE rather than
/// nothing: v1 plugins may read dependency-staged files during pull.
#[must_use]
pub fn dependency_prerequisite_step(step: Step) -> Step {
    if step <= Step::Stage {
        Step::Stage
    } else {
        step
    }
}
