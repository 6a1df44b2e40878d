// Copyright 2026 the Partforge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Topological ordering of parts under the `after` precedence relation.

use crate::error::LifecycleError;
use crate::part::Part;

/// Orders `parts` so that if `p` is in `q`'s `after` list, `p` precedes `q`.
///
/// Tie-break: the working queue starts in reverse-alphabetical order; at
/// each step the first part in the queue that is not mentioned in any
/// remaining part's `after` list is removed and prepended to the result.
/// The net effect is reproducible and alphabetical among independent peers
/// (see `original_source/partbuilder/_part.py::sort_parts`, which this
/// mirrors exactly, including the cycle witness).
///
/// # Errors
///
/// Returns [`LifecycleError::DependencyCycle`] naming the last part
/// inspected in the failing pass if no unmentioned part can be found while
/// the queue is non-empty.
pub fn sort_parts(parts: Vec<Part>) -> Result<Vec<Part>, LifecycleError> {
    let mut queue = parts;
    queue.sort_by(|a, b| b.name().cmp(a.name()));

    let mut sorted: Vec<Part> = Vec::with_capacity(queue.len());

    while !queue.is_empty() {
        let mut witness: Option<&str> = None;
        let mut found: Option<usize> = None;

        for (idx, part) in queue.iter().enumerate() {
            let mentioned = queue
                .iter()
                .any(|other| other.dependency_names().iter().any(|n| n == part.name()));
            witness = Some(part.name());
            if !mentioned {
                found = Some(idx);
                break;
            }
        }

        match found {
            Some(idx) => {
                let top = queue.remove(idx);
                sorted.insert(0, top);
            }
            None => {
                let witness = witness.unwrap_or_default().to_string();
                return Err(LifecycleError::DependencyCycle { witness });
            }
        }
    }

    Ok(sorted)
}
