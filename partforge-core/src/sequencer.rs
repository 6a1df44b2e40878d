// Copyright 2026 the Partforge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The planning algorithm: turns a target step and a part selection into an
//! ordered [`Plan`].

use crate::action::Action;
use crate::error::LifecycleError;
use crate::ephemeral::{CurrentInputs, OutdatedSource, PassthroughInputs, NullOutdatedSource};
use crate::manager::StateManager;
use crate::part::Part;
use crate::plan::{PartAction, Plan};
use crate::state::StateStore;
use crate::step::Step;
use crate::topo::sort_parts;

/// Plans the ordered list of actions needed to bring `target_step` to
/// completion across all (or selected) parts.
///
/// Construction sorts `parts` topologically (see [`sort_parts`]) and builds
/// a [`StateManager`] over them; `actions` can then be called repeatedly
/// (each call re-derives memoized facts from scratch — see
/// [`StateManager::new`]'s per-call contract in spec, §5: memoization is
/// scoped to one `actions()` call).
pub struct Sequencer {
    parts: Vec<Part>,
    state_manager: StateManager,
}

impl std::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("parts", &self.parts.iter().map(Part::name).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Sequencer {
    /// Builds a sequencer over `parts`, using `adapter` to seed persistent
    /// state.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::DependencyCycle`] if `parts`' `after`
    /// relation is cyclic, or [`LifecycleError::InvalidPartName`] if an
    /// `after` entry names a part that doesn't exist.
    pub fn new(parts: Vec<Part>, adapter: &dyn StateStore) -> Result<Self, LifecycleError> {
        Self::with_staleness_inputs(
            parts,
            adapter,
            Box::new(PassthroughInputs::default()),
            Box::new(NullOutdatedSource),
        )
    }

    /// As [`Sequencer::new`], but with custom staleness-comparison hooks
    /// (see [`CurrentInputs`] and [`OutdatedSource`]).
    ///
    /// # Errors
    ///
    /// See [`Sequencer::new`].
    pub fn with_staleness_inputs(
        parts: Vec<Part>,
        adapter: &dyn StateStore,
        inputs: Box<dyn CurrentInputs>,
        source: Box<dyn OutdatedSource>,
    ) -> Result<Self, LifecycleError> {
        validate_after_references(&parts)?;
        let sorted = sort_parts(parts)?;
        let state_manager = StateManager::new(&sorted, adapter, inputs, source);
        Ok(Self {
            parts: sorted,
            state_manager,
        })
    }

    /// Determines the list of actions to execute for each selected part, to
    /// bring `target_step` to completion.
    ///
    /// `part_names` empty means "every part"; non-empty restricts the
    /// top-level scope to those parts (dependencies are still injected as
    /// needed to satisfy the prepare-step mechanism).
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidPartName`] if `part_names` contains
    /// a name not present in this sequencer's parts.
    pub fn actions(
        &mut self,
        target_step: Step,
        part_names: &[String],
    ) -> Result<Plan, LifecycleError> {
        for name in part_names {
            if !self.parts.iter().any(|p| p.name() == name) {
                return Err(LifecycleError::InvalidPartName { name: name.clone() });
            }
        }

        let mut plan = Plan::new();
        self.plan_into(target_step, part_names, &mut plan)?;
        Ok(plan)
    }

    fn parts_in_scope(&self, part_names: &[String]) -> Vec<Part> {
        if part_names.is_empty() {
            self.parts.clone()
        } else {
            self.parts
                .iter()
                .filter(|p| part_names.iter().any(|n| n == p.name()))
                .cloned()
                .collect()
        }
    }

    fn plan_into(
        &mut self,
        target_step: Step,
        part_names: &[String],
        plan: &mut Plan,
    ) -> Result<(), LifecycleError> {
        let scope = self.parts_in_scope(part_names);
        let mut steps = target_step.previous_steps();
        steps.push(target_step);

        for current_step in steps {
            for part in &scope {
                tracing::debug!(part = part.name(), step = %current_step, "scheduling");
                self.schedule(part, current_step, target_step, part_names, plan)?;
            }
        }
        Ok(())
    }

    fn schedule(
        &mut self,
        part: &Part,
        current: Step,
        target: Step,
        selected: &[String],
        plan: &mut Plan,
    ) -> Result<(), LifecycleError> {
        // Prepare-step recursion can revisit a (part, step) already decided
        // earlier in this same `actions()` call (e.g. two dependents of the
        // same dependency both trigger its prerequisite). Emit at most one
        // action per pair, keeping the plan's action-exclusivity invariant.
        if plan.iter().any(|a| a.part_name == part.name() && a.step == current) {
            return Ok(());
        }

        // 1. Never run.
        if !self.state_manager.has_step_run(part, current) {
            self.prepare(part, current, plan)?;
            self.run_fresh(part, current, plan)?;
            return Ok(());
        }

        // 2. Explicitly requested.
        if !selected.is_empty() && current == target && selected.iter().any(|n| n == part.name()) {
            self.rerun(part, current, plan, "requested step".to_string())?;
            return Ok(());
        }

        // 3. Dirty.
        if let Some(report) = self.state_manager.dirty_report(part, current) {
            self.rerun(part, current, plan, report.summary())?;
            return Ok(());
        }

        // 4. Outdated.
        if let Some(report) = self.state_manager.outdated_report(part, current) {
            let reason = report.summary();
            if matches!(current, Step::Pull | Step::Build) {
                self.update(part, current, plan, reason);
            } else {
                self.rerun(part, current, plan, reason)?;
            }
            return Ok(());
        }

        // 5. Otherwise: skip.
        self.skip(part, current, plan)?;
        Ok(())
    }

    /// Before a fresh or re-run on `(part, current)` when `current > Pull`,
    /// recursively ensures the prerequisite step of each transitive
    /// dependency is planned, injecting those actions before `part`'s own
    /// action at `current`.
    ///
    /// Guarded to `current > Pull` because PULL's "prerequisite" would
    /// otherwise be STAGE (see `dependency_prerequisite_step`), which would
    /// require staging dependencies before even fetching this part's
    /// sources — unnecessary for plugins that don't consult dependency
    /// artifacts during pull.
    fn prepare(&mut self, part: &Part, current: Step, plan: &mut Plan) -> Result<(), LifecycleError> {
        if current == Step::Pull {
            return Ok(());
        }
        let prerequisite = crate::step::dependency_prerequisite_step(current);
        let dependencies = self.state_manager.recursive_dependencies(part);
        for dependency in dependencies {
            if self.state_manager.should_step_run(&dependency, prerequisite) {
                let selection = vec![dependency.name().to_string()];
                self.plan_into(prerequisite, &selection, plan)?;
            }
        }
        Ok(())
    }

    fn run_fresh(&mut self, part: &Part, step: Step, plan: &mut Plan) -> Result<(), LifecycleError> {
        let action = step.action_for()?;
        plan.push(PartAction::new(part.name(), step, action));
        self.state_manager.add_step_run(part, step);
        Ok(())
    }

    fn rerun(
        &mut self,
        part: &Part,
        step: Step,
        plan: &mut Plan,
        reason: String,
    ) -> Result<(), LifecycleError> {
        self.prepare(part, step, plan)?;

        self.state_manager.clean_part(part, step);
        let mut to_clear = step.next_steps();
        to_clear.insert(0, step);
        for s in to_clear {
            self.state_manager.clear_step(part, s);
        }

        let action = step.rerun_action_for()?;
        plan.push(PartAction::new(part.name(), step, action).with_reason(reason));
        self.state_manager.add_step_run(part, step);
        Ok(())
    }

    fn update(&mut self, part: &Part, step: Step, plan: &mut Plan, reason: String) {
        let action = if step == Step::Pull {
            Action::UpdatePull
        } else {
            Action::UpdateBuild
        };
        plan.push(PartAction::new(part.name(), step, action).with_reason(reason));
        self.state_manager.add_step_run(part, step);
    }

    fn skip(&mut self, part: &Part, step: Step, plan: &mut Plan) -> Result<(), LifecycleError> {
        let action = step.skip_action_for()?;
        plan.push(PartAction::new(part.name(), step, action).with_reason("already ran"));
        Ok(())
    }

    /// The parts this sequencer was built over, in topological order.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }
}

fn validate_after_references(parts: &[Part]) -> Result<(), LifecycleError> {
    for part in parts {
        for dep in part.dependency_names() {
            if !parts.iter().any(|p| p.name() == dep) {
                return Err(LifecycleError::InvalidPartName { name: dep.clone() });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::PartOptions;
    use crate::state::EmptyStateStore;
    use std::path::Path;

    fn part(name: &str, after: &[&str]) -> Part {
        let options = PartOptions {
            after: after.iter().map(|s| s.to_string()).collect(),
            passthrough: Default::default(),
        };
        Part::new(name, options, Path::new("."))
    }

    fn action_strings(plan: &Plan) -> Vec<String> {
        plan.iter().map(|a| format!("{}:{}", a.part_name, a.action)).collect()
    }

    #[test]
    fn scenario_1_linear_three_part_prime_cold_run() {
        let parts = vec![part("foo", &[]), part("bar", &["baz"]), part("baz", &["foo"])];
        let mut seq = Sequencer::new(parts, &EmptyStateStore).unwrap();
        let plan = seq.actions(Step::Prime, &[]).unwrap();

        assert_eq!(
            action_strings(&plan),
            vec![
                "foo:PULL", "baz:PULL", "bar:PULL",
                "foo:BUILD", "baz:BUILD", "bar:BUILD",
                "foo:STAGE", "baz:STAGE", "bar:STAGE",
                "foo:PRIME", "baz:PRIME", "bar:PRIME",
            ]
        );
    }

    #[test]
    fn scenario_2_cycle_detection_raises_before_any_plan() {
        let parts = vec![part("foo", &[]), part("bar", &["baz"]), part("baz", &["bar"])];
        let err = Sequencer::new(parts, &EmptyStateStore).unwrap_err();
        match err {
            LifecycleError::DependencyCycle { witness } => assert_eq!(witness, "bar"),
            other => panic!("expected DependencyCycle, got {other:?}"),
        }
    }

    #[test]
    fn invalid_after_reference_is_rejected() {
        let parts = vec![part("foo", &["ghost"])];
        let err = Sequencer::new(parts, &EmptyStateStore).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidPartName { name } if name == "ghost"));
    }

    #[test]
    fn unknown_selection_name_is_rejected() {
        let parts = vec![part("foo", &[])];
        let mut seq = Sequencer::new(parts, &EmptyStateStore).unwrap();
        let err = seq.actions(Step::Prime, &["ghost".to_string()]).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidPartName { name } if name == "ghost"));
    }

    #[test]
    fn action_exclusivity_one_action_per_part_step() {
        let parts = vec![part("foo", &[]), part("bar", &["baz"]), part("baz", &["foo"])];
        let mut seq = Sequencer::new(parts, &EmptyStateStore).unwrap();
        let plan = seq.actions(Step::Prime, &[]).unwrap();

        let mut seen = std::collections::BTreeSet::new();
        for action in &plan {
            assert!(seen.insert((action.part_name.clone(), action.step)));
        }
    }
}
