// Copyright 2026 the Partforge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory mirror of persistent per-step state, mutated during planning.
//!
//! This module is the `partforge` analog of `execution_graph::dirty`: a
//! thin, crate-internal layer that owns the per-(part, step) facts the
//! sequencer reasons about, and nothing is ever written back to the
//! persistent adapter from here — see [`crate::state::StateStore`].

use std::collections::BTreeMap;

use crate::part::Part;
use crate::report::DirtyReport;
use crate::report::OutdatedReport;
use crate::state::{PartState, StateStore, Timestamp};
use crate::step::{Step, STEPS};

/// Supplies the "current" properties/options a step's recorded state is
/// compared against, to decide dirtiness.
///
/// The engine treats both maps as opaque string→string snapshots: only the
/// *set of differing keys* matters, never individual values' meaning.
pub trait CurrentInputs {
    /// Current property values relevant to `(part, step)`.
    fn current_properties(&self, part: &Part, step: Step) -> BTreeMap<String, String>;

    /// Current project-option values relevant to `(part, step)`.
    fn current_project_options(&self, part: &Part, step: Step) -> BTreeMap<String, String>;
}

/// Default [`CurrentInputs`]: properties come from the part's own
/// passthrough map (stringified via YAML), options from a fixed set of
/// project-wide passthrough values supplied at construction.
#[derive(Clone, Debug, Default)]
pub struct PassthroughInputs {
    /// Project-wide option values (e.g. `target-arch`), applied to every
    /// part and step alike.
    pub project_options: BTreeMap<String, String>,
}

impl CurrentInputs for PassthroughInputs {
    fn current_properties(&self, part: &Part, _step: Step) -> BTreeMap<String, String> {
        part.options()
            .passthrough
            .iter()
            .map(|(k, v)| (k.clone(), stringify_yaml(v)))
            .collect()
    }

    fn current_project_options(&self, _part: &Part, _step: Step) -> BTreeMap<String, String> {
        self.project_options.clone()
    }
}

fn stringify_yaml(value: &serde_yaml::Value) -> String {
    serde_yaml::to_string(value).unwrap_or_default()
}

/// Pluggable comparison source for PULL outdatedness: "the on-disk source
/// is newer than the recorded PULL state."
///
/// The engine only requires the contract; the comparison itself (mtimes,
/// content hashes, VCS revision, ...) is up to the implementation.
pub trait OutdatedSource {
    /// Returns `true` if `part`'s source has changed since `pull_state` was
    /// recorded.
    fn pull_source_changed(&self, part: &Part, pull_state: &PartState) -> bool;
}

/// An [`OutdatedSource`] that never reports a change. The default when no
/// filesystem (or other) comparison is wired up.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullOutdatedSource;

impl OutdatedSource for NullOutdatedSource {
    fn pull_source_changed(&self, _part: &Part, _pull_state: &PartState) -> bool {
        false
    }
}

/// An [`OutdatedSource`] backed by the real filesystem: `part.src`'s newest
/// file mtime (as seconds since the Unix epoch, matching
/// [`crate::executor::MarkerExecutor`]'s own tick convention) compared
/// against the recorded PULL timestamp.
///
/// A missing or unreadable `src` directory is not a change — there is
/// nothing newer to detect, not an error worth surfacing here.
#[derive(Clone, Copy, Debug, Default)]
pub struct FilesystemOutdatedSource;

impl OutdatedSource for FilesystemOutdatedSource {
    fn pull_source_changed(&self, part: &Part, pull_state: &PartState) -> bool {
        let Some(newest) = newest_mtime_tick(&part.paths().src) else {
            return false;
        };
        newest > pull_state.timestamp.tick()
    }
}

fn newest_mtime_tick(dir: &std::path::Path) -> Option<u64> {
    let mut newest: Option<u64> = None;
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&current) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if metadata.is_dir() {
                stack.push(path);
                continue;
            }
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            let tick = modified
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            newest = Some(newest.map_or(tick, |prev| prev.max(tick)));
        }
    }
    newest
}

/// In-memory mirror of persistent per-step state.
///
/// Constructed once per planning pass from a [`StateStore`]; all mutations
/// during planning (via [`crate::manager::StateManager`]) land here, and
/// nothing is written back.
#[derive(Debug, Default)]
pub struct EphemeralStateStore {
    state: BTreeMap<String, BTreeMap<Step, PartState>>,
}

impl EphemeralStateStore {
    /// Populates the store by loading all `(part, step)` pairs from
    /// `adapter`, keeping only entries whose timestamp is not the sentinel
    /// absent value.
    #[must_use]
    pub fn load(parts: &[Part], adapter: &dyn StateStore) -> Self {
        let mut state: BTreeMap<String, BTreeMap<Step, PartState>> = BTreeMap::new();
        for part in parts {
            let mut per_step = BTreeMap::new();
            for step in STEPS {
                let loaded = adapter.load_state(part, step);
                if !loaded.timestamp.is_absent() {
                    per_step.insert(step, loaded);
                }
            }
            state.insert(part.name().to_string(), per_step);
        }
        Self { state }
    }

    /// Records `state` for `(part_name, step)`.
    pub fn add(&mut self, part_name: &str, step: Step, state: PartState) {
        self.state.entry(part_name.to_string()).or_default().insert(step, state);
    }

    /// Removes any recorded state for `(part_name, step)`.
    pub fn remove(&mut self, part_name: &str, step: Step) {
        if let Some(per_step) = self.state.get_mut(part_name) {
            per_step.remove(&step);
        }
    }

    /// Returns `true` if state is recorded for `(part_name, step)`.
    #[must_use]
    pub fn test(&self, part_name: &str, step: Step) -> bool {
        self.state
            .get(part_name)
            .is_some_and(|per_step| per_step.contains_key(&step))
    }

    /// Returns the recorded state for `(part_name, step)`, if any.
    #[must_use]
    pub fn get(&self, part_name: &str, step: Step) -> Option<&PartState> {
        self.state.get(part_name).and_then(|per_step| per_step.get(&step))
    }

    /// The latest (highest) step recorded for `part_name`, if any.
    #[must_use]
    pub fn latest_step(&self, part_name: &str) -> Option<Step> {
        self.state
            .get(part_name)
            .and_then(|per_step| STEPS.iter().rev().copied().find(|s| per_step.contains_key(s)))
    }

    /// Per-step property/option dirty report, ignoring dependencies.
    ///
    /// Returns `None` if the step has no recorded state (a step that hasn't
    /// run is not "dirty" — it simply hasn't run) or if current values match
    /// the recorded snapshot.
    #[must_use]
    pub fn dirty_report_for_part(
        &self,
        part: &Part,
        step: Step,
        inputs: &dyn CurrentInputs,
    ) -> Option<DirtyReport> {
        let recorded = self.get(part.name(), step)?;

        let current_properties = inputs.current_properties(part, step);
        let current_options = inputs.current_project_options(part, step);

        let changed_properties = changed_keys(&recorded.properties_of_interest, &current_properties);
        let changed_options =
            changed_keys(&recorded.project_options_of_interest, &current_options);

        DirtyReport::from_changed_keys(changed_properties, changed_options)
    }

    /// Per-part outdated report: `true` when an earlier step in this part's
    /// own lifecycle ran more recently than `step`, or (for `Pull` only)
    /// when `source` reports the on-disk source changed.
    #[must_use]
    pub fn outdated_report_for_part(
        &self,
        part: &Part,
        step: Step,
        source: &dyn OutdatedSource,
    ) -> Option<OutdatedReport> {
        let this_state = self.get(part.name(), step)?;

        let newer_than_step = step.previous_steps().into_iter().find(|earlier| {
            self.get(part.name(), *earlier)
                .is_some_and(|earlier_state| earlier_state.timestamp > this_state.timestamp)
        });

        let source_changed = step == Step::Pull && source.pull_source_changed(part, this_state);

        if newer_than_step.is_some() || source_changed {
            Some(OutdatedReport {
                newer_than_step,
                source_changed,
            })
        } else {
            None
        }
    }
}

fn changed_keys(
    recorded: &BTreeMap<String, String>,
    current: &BTreeMap<String, String>,
) -> Vec<String> {
    let mut changed: Vec<String> = Vec::new();
    for (key, value) in current {
        match recorded.get(key) {
            Some(old) if old == value => {}
            _ => changed.push(key.clone()),
        }
    }
    for key in recorded.keys() {
        if !current.contains_key(key) {
            changed.push(key.clone());
        }
    }
    changed.sort();
    changed.dedup();
    changed
}

/// Convenience: the next tick after the highest timestamp in `store` for any
/// part/step, or `1` if the store is empty. Used by test doubles and the
/// reference executor to keep timestamps monotonic.
#[must_use]
pub fn next_tick(store: &EphemeralStateStore) -> u64 {
    store
        .state
        .values()
        .flat_map(|per_step| per_step.values())
        .map(|s| s.timestamp.tick())
        .max()
        .unwrap_or(0)
        + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::PartOptions;
    use std::path::Path;

    fn part(name: &str) -> Part {
        Part::new(name, PartOptions::default(), Path::new("."))
    }

    #[test]
    fn load_skips_absent_entries() {
        let parts = vec![part("foo")];
        let store = EphemeralStateStore::load(&parts, &crate::state::EmptyStateStore);
        assert!(!store.test("foo", Step::Pull));
    }

    #[test]
    fn add_then_test_then_remove_round_trips() {
        let mut store = EphemeralStateStore::default();
        store.add("foo", Step::Pull, PartState::new(Timestamp::at(1), Default::default(), Default::default()));
        assert!(store.test("foo", Step::Pull));
        store.remove("foo", Step::Pull);
        assert!(!store.test("foo", Step::Pull));
    }

    #[test]
    fn latest_step_is_the_highest_recorded() {
        let mut store = EphemeralStateStore::default();
        store.add("foo", Step::Pull, PartState::new(Timestamp::at(1), Default::default(), Default::default()));
        store.add("foo", Step::Build, PartState::new(Timestamp::at(2), Default::default(), Default::default()));
        assert_eq!(store.latest_step("foo"), Some(Step::Build));
    }

    #[test]
    fn dirty_report_absent_when_step_never_ran() {
        let store = EphemeralStateStore::default();
        let p = part("foo");
        let inputs = PassthroughInputs::default();
        assert!(store.dirty_report_for_part(&p, Step::Pull, &inputs).is_none());
    }

    #[test]
    fn dirty_report_present_when_property_changed() {
        let mut store = EphemeralStateStore::default();
        let mut recorded = BTreeMap::new();
        recorded.insert("source".to_string(), "old".to_string());
        store.add(
            "foo",
            Step::Pull,
            PartState::new(Timestamp::at(1), recorded, Default::default()),
        );

        let options = PartOptions {
            after: vec![],
            passthrough: [("source".to_string(), serde_yaml::Value::String("new".to_string()))]
                .into_iter()
                .collect(),
        };
        let p = Part::new("foo", options, Path::new("."));
        let inputs = PassthroughInputs::default();
        let report = store.dirty_report_for_part(&p, Step::Pull, &inputs).unwrap();
        assert!(report.dirty_properties.contains(&"source".to_string()));
    }

    #[test]
    fn outdated_report_present_when_earlier_step_is_newer() {
        let mut store = EphemeralStateStore::default();
        store.add("foo", Step::Pull, PartState::new(Timestamp::at(5), Default::default(), Default::default()));
        store.add("foo", Step::Build, PartState::new(Timestamp::at(1), Default::default(), Default::default()));
        let p = part("foo");
        let report = store
            .outdated_report_for_part(&p, Step::Build, &NullOutdatedSource)
            .unwrap();
        assert_eq!(report.newer_than_step, Some(Step::Pull));
    }

    #[test]
    fn filesystem_outdated_source_is_false_with_no_src_dir() {
        let dir = tempfile::tempdir().unwrap();
        let p = Part::new("foo", PartOptions::default(), dir.path());
        let pull_state = PartState::new(Timestamp::at(1), Default::default(), Default::default());
        assert!(!FilesystemOutdatedSource.pull_source_changed(&p, &pull_state));
    }

    #[test]
    fn filesystem_outdated_source_detects_a_file_newer_than_pull() {
        let dir = tempfile::tempdir().unwrap();
        let p = Part::new("foo", PartOptions::default(), dir.path());
        std::fs::create_dir_all(&p.paths().src).unwrap();
        std::fs::write(p.paths().src.join("main.c"), b"int main() {}").unwrap();

        let newest = newest_mtime_tick(&p.paths().src).unwrap();
        let pull_state = PartState::new(Timestamp::at(newest.saturating_sub(1)), Default::default(), Default::default());
        assert!(FilesystemOutdatedSource.pull_source_changed(&p, &pull_state));

        let pull_state = PartState::new(Timestamp::at(newest + 10), Default::default(), Default::default());
        assert!(!FilesystemOutdatedSource.pull_source_changed(&p, &pull_state));
    }
}
