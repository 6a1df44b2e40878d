// Copyright 2026 the Partforge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty and outdated reports: the staleness explanations the sequencer
//! turns into re-run reasons.

use crate::step::Step;

/// A dependency whose prerequisite step has newer state than the step being
/// inspected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dependency {
    /// The dependency's name.
    pub part_name: String,
    /// The prerequisite step of the dependency that changed.
    pub step: Step,
}

/// Why a `(part, step)` is dirty: either changed properties/options, or
/// changed dependencies. At least one field is non-empty whenever a report
/// exists at all — an all-empty report is represented as `None`, never as a
/// present-but-vacant value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirtyReport {
    /// Property keys whose current value differs from the recorded state.
    pub dirty_properties: Vec<String>,
    /// Project-option keys whose current value differs from the recorded
    /// state.
    pub dirty_project_options: Vec<String>,
    /// Dependencies whose prerequisite step has moved ahead of this step.
    pub changed_dependencies: Vec<Dependency>,
}

impl DirtyReport {
    /// Builds a report from changed property/option keys. Returns `None` if
    /// both are empty.
    #[must_use]
    pub fn from_changed_keys(properties: Vec<String>, options: Vec<String>) -> Option<Self> {
        if properties.is_empty() && options.is_empty() {
            None
        } else {
            Some(Self {
                dirty_properties: properties,
                dirty_project_options: options,
                changed_dependencies: Vec::new(),
            })
        }
    }

    /// Builds a report from changed dependencies. Returns `None` if empty.
    #[must_use]
    pub fn from_changed_dependencies(dependencies: Vec<Dependency>) -> Option<Self> {
        if dependencies.is_empty() {
            None
        } else {
            Some(Self {
                dirty_properties: Vec::new(),
                dirty_project_options: Vec::new(),
                changed_dependencies: dependencies,
            })
        }
    }

    /// A one-line human-readable summary, used as the re-run reason.
    #[must_use]
    pub fn summary(&self) -> String {
        if !self.changed_dependencies.is_empty() {
            let names: Vec<String> = self
                .changed_dependencies
                .iter()
                .map(|d| format!("{}@{}", d.part_name, d.step))
                .collect();
            format!("dependency changed: {}", names.join(", "))
        } else {
            let mut keys = self.dirty_properties.clone();
            keys.extend(self.dirty_project_options.clone());
            format!("properties changed: {}", keys.join(", "))
        }
    }
}

/// Why a `(part, step)` is outdated: an earlier step of the same part ran
/// more recently than this one (or, for `Pull`, the on-disk source changed).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutdatedReport {
    /// The earlier step whose state postdates this step's state, if any.
    pub newer_than_step: Option<Step>,
    /// Set when the pluggable `OutdatedSource` reported a disk-level change.
    pub source_changed: bool,
}

impl OutdatedReport {
    /// A one-line human-readable summary, used as the update/re-run reason.
    #[must_use]
    pub fn summary(&self) -> String {
        match self.newer_than_step {
            Some(step) => format!("{step} ran more recently than this step"),
            None if self.source_changed => "source changed on disk".to_string(),
            None => "outdated".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dirty_report_from_empty_keys_is_absent() {
        assert!(DirtyReport::from_changed_keys(vec![], vec![]).is_none());
    }

    #[test]
    fn dirty_report_from_changed_dependencies_summarizes_each() {
        let report = DirtyReport::from_changed_dependencies(vec![Dependency {
            part_name: "foo".to_string(),
            step: Step::Stage,
        }])
        .unwrap();
        assert_eq!(report.summary(), "dependency changed: foo@stage");
    }
}
