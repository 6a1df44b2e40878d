// Copyright 2026 the Partforge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Persistent per-step state and the adapter contract over it.

use std::collections::BTreeMap;

use crate::part::Part;
use crate::step::Step;

/// A monotonic point in the engine's logical clock.
///
/// `Timestamp(0)` is the sentinel meaning "no recorded state"; callers never
/// construct it directly for a real run (use [`Timestamp::at`]).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The sentinel timestamp meaning "absent".
    pub const ABSENT: Timestamp = Timestamp(0);

    /// Constructs a timestamp from a raw monotonic tick.
    #[must_use]
    pub const fn at(tick: u64) -> Self {
        Self(tick)
    }

    /// Returns `true` if this is the sentinel absent value.
    #[must_use]
    pub const fn is_absent(self) -> bool {
        self.0 == 0
    }

    /// The raw tick value.
    #[must_use]
    pub const fn tick(self) -> u64 {
        self.0
    }
}

/// Opaque record carrying a step's completion timestamp plus the property
/// and option snapshots used for dirtiness comparisons.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartState {
    /// When this step completed, in the engine's logical clock.
    pub timestamp: Timestamp,
    /// Snapshot of properties this step cared about, at the time it ran.
    pub properties_of_interest: BTreeMap<String, String>,
    /// Snapshot of project options this step cared about, at the time it
    /// ran.
    pub project_options_of_interest: BTreeMap<String, String>,
}

impl PartState {
    /// Constructs state for a step that just completed at `timestamp`.
    #[must_use]
    pub fn new(
        timestamp: Timestamp,
        properties_of_interest: BTreeMap<String, String>,
        project_options_of_interest: BTreeMap<String, String>,
    ) -> Self {
        Self {
            timestamp,
            properties_of_interest,
            project_options_of_interest,
        }
    }

    /// The sentinel "absent" state returned by a [`StateStore`] with no
    /// record for a `(part, step)` pair.
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }
}

/// Persistent per-(part, step) state adapter.
///
/// The engine requires only that `timestamp` be monotonic across saves
/// within a run; the on-disk layout is entirely up to the implementation
/// (see [`crate::executor::MarkerExecutor`] for the reference one, which
/// layers this on top of marker files under `part.state/<step>`).
pub trait StateStore {
    /// Loads the recorded state for `(part, step)`.
    ///
    /// Returns [`PartState::absent`] (`timestamp == Timestamp::ABSENT`) if no
    /// record exists.
    fn load_state(&self, part: &Part, step: Step) -> PartState;

    /// Saves `state` for `(part, step)`. Called by the executor, never by
    /// the sequencer or state manager.
    fn save_state(&mut self, part: &Part, step: Step, state: PartState);
}

/// A [`StateStore`] that never has any recorded state. Useful for cold-run
/// scenarios and as a base to layer a real adapter over.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyStateStore;

impl StateStore for EmptyStateStore {
    fn load_state(&self, _part: &Part, _step: Step) -> PartState {
        PartState::absent()
    }

    fn save_state(&mut self, _part: &Part, _step: Step, _state: PartState) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_state_has_sentinel_timestamp() {
        assert!(PartState::absent().timestamp.is_absent());
    }

    #[test]
    fn empty_store_always_reports_absent() {
        let store = EmptyStateStore;
        let part = Part::new(
            "foo",
            crate::part::PartOptions::default(),
            std::path::Path::new("."),
        );
        assert!(store.load_state(&part, Step::Pull).timestamp.is_absent());
    }
}
