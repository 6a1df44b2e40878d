// Copyright 2026 the Partforge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Staleness queries over the ephemeral store, memoized per planning pass.

use std::collections::{BTreeMap, BTreeSet};

use crate::ephemeral::{CurrentInputs, EphemeralStateStore, OutdatedSource};
use crate::part::Part;
use crate::report::{Dependency, DirtyReport, OutdatedReport};
use crate::state::{PartState, StateStore, Timestamp};
use crate::step::{dependency_prerequisite_step, Step, STEPS};

/// Staleness queries (has-run, dirty, outdated, should-run, clean) over an
/// [`EphemeralStateStore`], with three per-(part, step) facts memoized for
/// the lifetime of one [`crate::sequencer::Sequencer::actions`] call.
///
/// Owns the ephemeral store exclusively; nothing outside this type mutates
/// it during planning.
pub struct StateManager {
    parts: Vec<Part>,
    ephemeral: EphemeralStateStore,
    inputs: Box<dyn CurrentInputs>,
    source: Box<dyn OutdatedSource>,
    steps_run: BTreeMap<String, BTreeSet<Step>>,
    dirty_reports: BTreeMap<String, BTreeMap<Step, Option<DirtyReport>>>,
    outdated_reports: BTreeMap<String, BTreeMap<Step, Option<OutdatedReport>>>,
    next_tick: u64,
}

impl std::fmt::Debug for StateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateManager")
            .field("ephemeral", &self.ephemeral)
            .field("steps_run", &self.steps_run)
            .finish_non_exhaustive()
    }
}

impl StateManager {
    /// Constructs a state manager from `parts` and a persistent `adapter`,
    /// using the given staleness-comparison hooks.
    #[must_use]
    pub fn new(
        parts: &[Part],
        adapter: &dyn StateStore,
        inputs: Box<dyn CurrentInputs>,
        source: Box<dyn OutdatedSource>,
    ) -> Self {
        let ephemeral = EphemeralStateStore::load(parts, adapter);
        let next_tick = crate::ephemeral::next_tick(&ephemeral);
        Self {
            parts: parts.to_vec(),
            ephemeral,
            inputs,
            source,
            steps_run: BTreeMap::new(),
            dirty_reports: BTreeMap::new(),
            outdated_reports: BTreeMap::new(),
            next_tick,
        }
    }

    /// The recorded state for `(part, step)`, if any.
    #[must_use]
    pub fn state(&self, part: &Part, step: Step) -> Option<&PartState> {
        self.ephemeral.get(part.name(), step)
    }

    /// Allocates the next monotonic timestamp tick, for callers that
    /// synthesize [`PartState`] during planning-adjacent bookkeeping (the
    /// reference executor uses this; the sequencer itself never does).
    pub fn allocate_tick(&mut self) -> Timestamp {
        let tick = self.next_tick;
        self.next_tick += 1;
        Timestamp::at(tick)
    }

    /// `true` iff `(part, step)` has run: the ephemeral store's latest
    /// recorded step for `part` is `>= step` (all steps at or below the
    /// latest are considered run), or the sequencer has explicitly recorded
    /// a fresh/re-run action for it this pass via [`Self::add_step_run`].
    #[must_use]
    pub fn has_step_run(&mut self, part: &Part, step: Step) -> bool {
        self.ensure_steps_run(part);
        self.steps_run
            .get(part.name())
            .is_some_and(|set| set.contains(&step))
    }

    /// Records that the sequencer has scheduled a fresh/re-run action for
    /// `(part, step)`, so dependents observe it as run within this pass
    /// even though the ephemeral store isn't updated until a real executor
    /// calls [`StateStore::save_state`].
    pub fn add_step_run(&mut self, part: &Part, step: Step) {
        self.ensure_steps_run(part);
        self.steps_run.entry(part.name().to_string()).or_default().insert(step);
    }

    /// The memoized dirty report for `(part, step)`.
    pub fn dirty_report(&mut self, part: &Part, step: Step) -> Option<DirtyReport> {
        self.ensure_dirty_report(part, step);
        self.dirty_reports
            .get(part.name())
            .and_then(|per_step| per_step.get(&step))
            .cloned()
            .flatten()
    }

    /// The memoized outdated report for `(part, step)`.
    pub fn outdated_report(&mut self, part: &Part, step: Step) -> Option<OutdatedReport> {
        self.ensure_outdated_report(part, step);
        self.outdated_reports
            .get(part.name())
            .and_then(|per_step| per_step.get(&step))
            .cloned()
            .flatten()
    }

    /// `true` if `step` should run: it hasn't run, is dirty, is outdated, or
    /// the same holds for the immediately preceding step in the lifecycle.
    /// Recurses only along the linear `previous_steps` chain (depth <= 4),
    /// never along the dependency graph.
    pub fn should_step_run(&mut self, part: &Part, step: Step) -> bool {
        if !self.has_step_run(part, step)
            || self.outdated_report(part, step).is_some()
            || self.dirty_report(part, step).is_some()
        {
            return true;
        }
        match step.previous() {
            Some(previous) => self.should_step_run(part, previous),
            None => false,
        }
    }

    /// Marks `step` and every greater step of `part` clean by removing
    /// their ephemeral state.
    pub fn clean_part(&mut self, part: &Part, step: Step) {
        for s in STEPS.into_iter().rev() {
            if step <= s {
                self.ephemeral.remove(part.name(), s);
            }
        }
    }

    /// Invalidates the three memoized facts for one `(part, step)` pair, so
    /// the next query recomputes them against the current ephemeral state.
    pub fn clear_step(&mut self, part: &Part, step: Step) {
        if let Some(set) = self.steps_run.get_mut(part.name()) {
            set.remove(&step);
            if set.is_empty() {
                self.steps_run.remove(part.name());
            }
        }
        if let Some(per_step) = self.dirty_reports.get_mut(part.name()) {
            per_step.remove(&step);
        }
        if let Some(per_step) = self.outdated_reports.get_mut(part.name()) {
            per_step.remove(&step);
        }
    }

    /// All direct and transitive dependencies of `part`, resolved against
    /// the full parts list. Cycle-free by construction (the sequencer is
    /// only ever built from [`crate::topo::sort_parts`]'s output).
    #[must_use]
    pub fn recursive_dependencies(&self, part: &Part) -> Vec<Part> {
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut out: Vec<Part> = Vec::new();
        self.collect_dependencies(part, &mut seen, &mut out);
        out
    }

    fn collect_dependencies(&self, part: &Part, seen: &mut BTreeSet<String>, out: &mut Vec<Part>) {
        for name in part.dependency_names() {
            if seen.insert(name.clone()) {
                if let Some(dep) = self.parts.iter().find(|p| p.name() == name) {
                    out.push(dep.clone());
                    self.collect_dependencies(dep, seen, out);
                }
            }
        }
    }

    fn ensure_steps_run(&mut self, part: &Part) {
        if self.steps_run.contains_key(part.name()) {
            return;
        }
        let latest = self.ephemeral.latest_step(part.name());
        let set: BTreeSet<Step> = match latest {
            Some(latest) => STEPS.into_iter().filter(|s| *s <= latest).collect(),
            None => BTreeSet::new(),
        };
        self.steps_run.insert(part.name().to_string(), set);
    }

    fn ensure_outdated_report(&mut self, part: &Part, step: Step) {
        let slot = self
            .outdated_reports
            .entry(part.name().to_string())
            .or_default();
        if slot.contains_key(&step) {
            return;
        }
        let report = self.ephemeral.outdated_report_for_part(part, step, self.source.as_ref());
        self.outdated_reports
            .get_mut(part.name())
            .unwrap()
            .insert(step, report);
    }

    fn ensure_dirty_report(&mut self, part: &Part, step: Step) {
        if self
            .dirty_reports
            .get(part.name())
            .is_some_and(|per_step| per_step.contains_key(&step))
        {
            return;
        }

        if let Some(report) = self.ephemeral.dirty_report_for_part(part, step, self.inputs.as_ref()) {
            self.dirty_reports
                .entry(part.name().to_string())
                .or_default()
                .insert(step, Some(report));
            return;
        }

        let prerequisite = dependency_prerequisite_step(step);
        let dependencies = self.recursive_dependencies(part);
        let this_state = self.ephemeral.get(part.name(), step).cloned();

        let mut changed = Vec::new();
        for dependency in &dependencies {
            let prerequisite_state = self.ephemeral.get(dependency.name(), prerequisite).cloned();
            let dependency_changed = match (&prerequisite_state, &this_state) {
                (Some(prereq_state), Some(this_state)) => {
                    this_state.timestamp < prereq_state.timestamp
                }
                _ => false,
            };

            if dependency_changed || self.should_step_run(dependency, prerequisite) {
                changed.push(Dependency {
                    part_name: dependency.name().to_string(),
                    step: prerequisite,
                });
            }
        }

        let report = DirtyReport::from_changed_dependencies(changed);
        self.dirty_reports
            .entry(part.name().to_string())
            .or_default()
            .insert(step, report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeral::{NullOutdatedSource, PassthroughInputs};
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

    fn manager(parts: &[Part]) -> StateManager {
        StateManager::new(
            parts,
            &EmptyStateStore,
            Box::new(PassthroughInputs::default()),
            Box::new(NullOutdatedSource),
        )
    }

    #[test]
    fn cold_part_has_not_run_any_step() {
        let parts = vec![part("foo", &[])];
        let mut sm = manager(&parts);
        assert!(!sm.has_step_run(&parts[0], Step::Pull));
        assert!(sm.should_step_run(&parts[0], Step::Prime));
    }

    #[test]
    fn add_step_run_is_visible_without_touching_ephemeral_store() {
        let parts = vec![part("foo", &[])];
        let mut sm = manager(&parts);
        sm.add_step_run(&parts[0], Step::Pull);
        assert!(sm.has_step_run(&parts[0], Step::Pull));
        assert!(!sm.has_step_run(&parts[0], Step::Build));
    }

    #[test]
    fn clean_part_removes_step_and_later_from_ephemeral_state() {
        let parts = vec![part("foo", &[])];
        let mut sm = manager(&parts);
        sm.ephemeral.add(
            "foo",
            Step::Pull,
            PartState::new(Timestamp::at(1), Default::default(), Default::default()),
        );
        sm.ephemeral.add(
            "foo",
            Step::Build,
            PartState::new(Timestamp::at(2), Default::default(), Default::default()),
        );
        sm.clean_part(&parts[0], Step::Pull);
        assert!(!sm.ephemeral.test("foo", Step::Pull));
        assert!(!sm.ephemeral.test("foo", Step::Build));
    }

    #[test]
    fn recursive_dependencies_are_transitive_and_deduplicated() {
        let parts = vec![
            part("a", &[]),
            part("b", &["a"]),
            part("c", &["b"]),
        ];
        let sm = manager(&parts);
        let c = parts.iter().find(|p| p.name() == "c").unwrap();
        let deps: Vec<&str> = sm.recursive_dependencies(c).iter().map(Part::name).collect();
        assert_eq!(deps, vec!["b", "a"]);
    }
}
