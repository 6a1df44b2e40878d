// Copyright 2026 the Partforge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The top-level facade: parses a parts document, plans, and (optionally)
//! executes.
//!
//! Mirrors `original_source/partbuilder/_manager.py::LifecycleManager`, with
//! plugin registration and pre/post-step callback hooks dropped (see
//! SPEC_FULL.md's Non-goals) — `actions()` and `execute()` remain separate
//! entry points so a caller can plan without ever touching disk.

use crate::error::LifecycleError;
use crate::executor::Executor;
use crate::part::{parts_from_document, PartsDocument};
use crate::plan::Plan;
use crate::sequencer::Sequencer;
use crate::state::StateStore;
use crate::step::Step;
use crate::stepinfo::LifecycleConfig;

/// Owns a sorted part list and its [`Sequencer`]; the single entry point a
/// caller needs to plan and/or execute a lifecycle run.
pub struct LifecycleManager {
    sequencer: Sequencer,
    config: LifecycleConfig,
}

impl std::fmt::Debug for LifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleManager")
            .field("sequencer", &self.sequencer)
            .finish_non_exhaustive()
    }
}

impl LifecycleManager {
    /// Parses `document` into parts rooted at `config.work_dir`, sorts
    /// them, and builds a [`Sequencer`] seeded from `adapter`'s recorded
    /// state.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::DependencyCycle`] or
    /// [`LifecycleError::InvalidPartName`] if the parts' `after` relation is
    /// malformed.
    pub fn new(
        document: &PartsDocument,
        config: LifecycleConfig,
        adapter: &dyn StateStore,
    ) -> Result<Self, LifecycleError> {
        let parts = parts_from_document(document, &config.work_dir);
        let mut project_options = config.project_options.clone();
        if let Some(platform_id) = &config.platform_id {
            project_options.insert("platform-id".to_string(), platform_id.clone());
        }
        if let Some(version) = &config.platform_version_id {
            project_options.insert("platform-version-id".to_string(), version.clone());
        }
        project_options.insert("target-arch".to_string(), config.step_info.target_arch().to_string());
        if !config.build_packages.is_empty() {
            project_options.insert("build-packages".to_string(), config.build_packages.join(","));
        }
        for (key, value) in &config.passthrough {
            project_options.insert(key.clone(), serde_yaml::to_string(value).unwrap_or_default());
        }

        let inputs = Box::new(crate::ephemeral::PassthroughInputs { project_options });
        let source = Box::new(crate::ephemeral::NullOutdatedSource);
        let sequencer = Sequencer::with_staleness_inputs(parts, adapter, inputs, source)?;

        Ok(Self { sequencer, config })
    }

    /// Plans the actions needed to bring `target_step` to completion for
    /// `part_names` (empty means every part). Pure: touches no state.
    ///
    /// # Errors
    ///
    /// See [`Sequencer::actions`].
    pub fn actions(&mut self, target_step: Step, part_names: &[String]) -> Result<Plan, LifecycleError> {
        self.sequencer.actions(target_step, part_names)
    }

    /// Plans (as [`Self::actions`]) and then runs every action against
    /// `executor`, in plan order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Propagates planning errors as-is, and wraps the first executor
    /// failure as [`LifecycleError::Executor`].
    pub fn execute(
        &mut self,
        target_step: Step,
        part_names: &[String],
        executor: &mut dyn Executor,
    ) -> Result<Plan, LifecycleError> {
        let plan = self.actions(target_step, part_names)?;
        for action in &plan {
            let part = self
                .sequencer
                .parts()
                .iter()
                .find(|p| p.name() == action.part_name)
                .ok_or_else(|| LifecycleError::InvalidPartName {
                    name: action.part_name.clone(),
                })?;
            executor
                .run_action(part, action.step, action.action)
                .map_err(LifecycleError::Executor)?;
        }
        Ok(plan)
    }

    /// The run-wide configuration this manager was built with.
    #[must_use]
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::MarkerExecutor;
    use crate::part::PartOptions;
    use crate::state::EmptyStateStore;
    use std::collections::BTreeMap;

    fn document() -> PartsDocument {
        let mut parts = BTreeMap::new();
        parts.insert("foo".to_string(), PartOptions::default());
        parts.insert(
            "bar".to_string(),
            PartOptions {
                after: vec!["foo".to_string()],
                passthrough: BTreeMap::new(),
            },
        );
        PartsDocument { parts }
    }

    #[test]
    fn cold_prime_plans_all_four_steps_for_both_parts() {
        let doc = document();
        let dir = tempfile::tempdir().unwrap();
        let config = LifecycleConfig::new(dir.path(), "x86_64");
        let mut manager = LifecycleManager::new(&doc, config, &EmptyStateStore).unwrap();

        let plan = manager.actions(Step::Prime, &[]).unwrap();
        assert_eq!(plan.len(), 8);
        assert_eq!(plan[0].part_name, "foo");
        assert_eq!(plan[1].part_name, "bar");
    }

    #[test]
    fn execute_runs_plan_against_marker_executor() {
        let doc = document();
        let dir = tempfile::tempdir().unwrap();
        let config = LifecycleConfig::new(dir.path(), "x86_64");
        let mut manager = LifecycleManager::new(&doc, config, &EmptyStateStore).unwrap();
        let mut executor = MarkerExecutor::new();

        let plan = manager.execute(Step::Pull, &[], &mut executor).unwrap();
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn unknown_part_selection_is_rejected_before_execution() {
        let doc = document();
        let dir = tempfile::tempdir().unwrap();
        let config = LifecycleConfig::new(dir.path(), "x86_64");
        let mut manager = LifecycleManager::new(&doc, config, &EmptyStateStore).unwrap();

        let err = manager.actions(Step::Prime, &["ghost".to_string()]).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidPartName { name } if name == "ghost"));
    }
}
