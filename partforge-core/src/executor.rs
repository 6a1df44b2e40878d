// Copyright 2026 the Partforge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The executor contract, and a reference implementation that touches
//! marker files.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::action::Action;
use crate::part::Part;
use crate::state::{PartState, StateStore, Timestamp};
use crate::step::Step;

/// Carries out one scheduled [`crate::plan::PartAction`].
///
/// The sequencer never calls this directly; [`crate::facade::LifecycleManager::execute`]
/// iterates a [`crate::plan::Plan`] and dispatches each action here. An
/// executor is free to no-op on `Skip*` actions (the reference one does).
pub trait Executor {
    /// Runs `action` against `part`. Implementations that persist state
    /// should call [`StateStore::save_state`] on success.
    ///
    /// # Errors
    ///
    /// Returns any I/O or plugin failure; the facade wraps it as
    /// [`crate::error::LifecycleError::Executor`].
    fn run_action(
        &mut self,
        part: &Part,
        step: Step,
        action: Action,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Reference [`Executor`]/[`StateStore`]: records each step's completion by
/// touching an empty marker file under `part.paths().state`, and reads
/// mtimes back as the logical timestamp.
///
/// Mirrors `original_source/partbuilder/executor.py::run_action`, which does
/// the same thing against a `_save_state_file` helper — this crate just
/// makes the marker file double as the timestamp source instead of writing
/// a separate sidecar.
#[derive(Debug, Default)]
pub struct MarkerExecutor {
    /// In-process cache of property/option snapshots per `(part, step)`,
    /// threaded through to `save_state` so `load_state` can report them
    /// back; markers on disk only carry a timestamp.
    snapshots: BTreeMap<(String, Step), (BTreeMap<String, String>, BTreeMap<String, String>)>,
}

impl MarkerExecutor {
    /// Constructs an executor with no recorded snapshots yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn marker_path(part: &Part, step: Step) -> PathBuf {
        part.paths().state.join(step.to_string())
    }

    fn mtime_tick(path: &std::path::Path) -> io::Result<u64> {
        let metadata = fs::metadata(path)?;
        let modified = metadata.modified()?;
        let duration = modified
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        Ok(duration.as_secs())
    }

    fn touch(&self, part: &Part, step: Step) -> io::Result<()> {
        fs::create_dir_all(&part.paths().state)?;
        fs::write(Self::marker_path(part, step), b"")?;
        Ok(())
    }

    fn remove_marker(&self, part: &Part, step: Step) -> io::Result<()> {
        let path = Self::marker_path(part, step);
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

impl Executor for MarkerExecutor {
    fn run_action(
        &mut self,
        part: &Part,
        step: Step,
        action: Action,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!(part = part.name(), step = %step, action = %action, "running action");

        if action.is_skip() {
            return Ok(());
        }

        if action.is_rerun() {
            self.remove_marker(part, step)?;
        }

        self.touch(part, step)?;
        self.snapshots.insert(
            (part.name().to_string(), step),
            (
                part.options()
                    .passthrough
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_yaml::to_string(v).unwrap_or_default()))
                    .collect(),
                BTreeMap::new(),
            ),
        );
        Ok(())
    }
}

impl StateStore for MarkerExecutor {
    fn load_state(&self, part: &Part, step: Step) -> PartState {
        let path = Self::marker_path(part, step);
        let Ok(tick) = Self::mtime_tick(&path) else {
            return PartState::absent();
        };
        let (properties, options) = self
            .snapshots
            .get(&(part.name().to_string(), step))
            .cloned()
            .unwrap_or_default();
        PartState::new(Timestamp::at(tick.max(1)), properties, options)
    }

    fn save_state(&mut self, part: &Part, step: Step, state: PartState) {
        self.snapshots.insert(
            (part.name().to_string(), step),
            (state.properties_of_interest, state.project_options_of_interest),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::PartOptions;

    #[test]
    fn fresh_action_touches_marker_and_is_then_loadable() {
        let dir = tempfile::tempdir().unwrap();
        let part = Part::new("foo", PartOptions::default(), dir.path());
        let mut executor = MarkerExecutor::new();

        executor.run_action(&part, Step::Pull, Action::Pull).unwrap();
        let state = executor.load_state(&part, Step::Pull);
        assert!(!state.timestamp.is_absent());
    }

    #[test]
    fn skip_action_never_touches_disk() {
        let dir = tempfile::tempdir().unwrap();
        let part = Part::new("foo", PartOptions::default(), dir.path());
        let mut executor = MarkerExecutor::new();

        executor.run_action(&part, Step::Pull, Action::SkipPull).unwrap();
        assert!(executor.load_state(&part, Step::Pull).timestamp.is_absent());
    }

    #[test]
    fn rerun_action_recreates_the_marker() {
        let dir = tempfile::tempdir().unwrap();
        let part = Part::new("foo", PartOptions::default(), dir.path());
        let mut executor = MarkerExecutor::new();

        executor.run_action(&part, Step::Pull, Action::Pull).unwrap();
        executor.run_action(&part, Step::Pull, Action::Repull).unwrap();
        assert!(!executor.load_state(&part, Step::Pull).timestamp.is_absent());
    }
}
