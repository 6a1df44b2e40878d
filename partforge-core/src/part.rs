// Copyright 2026 the Partforge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parts: named, immutable descriptors of one unit of work.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Per-part options as parsed from the parts document.
///
/// Only `after` is inspected by the engine. `passthrough` carries every
/// other key verbatim for the executor and plugins; the engine never reads
/// it.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct PartOptions {
    /// Ordered list of part names this part must run after.
    #[serde(default)]
    pub after: Vec<String>,

    /// Everything else: opaque passthrough for the executor/plugins.
    #[serde(flatten)]
    pub passthrough: BTreeMap<String, serde_yaml::Value>,
}

/// The top-level parts document: a mapping from part name to its options.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct PartsDocument {
    /// All parts, keyed by name.
    pub parts: BTreeMap<String, PartOptions>,
}

/// Working directories derived for one part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartPaths {
    /// `work_dir/name`.
    pub part_dir: PathBuf,
    /// `part_dir/src`.
    pub src: PathBuf,
    /// `part_dir/build`.
    pub build: PathBuf,
    /// `part_dir/install`.
    pub install: PathBuf,
    /// `part_dir/state`.
    pub state: PathBuf,
}

impl PartPaths {
    fn derive(work_dir: &Path, name: &str) -> Self {
        let part_dir = work_dir.join(name);
        Self {
            src: part_dir.join("src"),
            build: part_dir.join("build"),
            install: part_dir.join("install"),
            state: part_dir.join("state"),
            part_dir,
        }
    }
}

/// An immutable descriptor of one unit of work.
///
/// Two parts are equal iff their names are equal; this is relied on for set
/// membership when tracking dependencies.
#[derive(Clone, Debug)]
pub struct Part {
    name: String,
    options: PartOptions,
    paths: PartPaths,
}

impl Part {
    /// Constructs a part from `(name, options, work_dir)`. Pure string-join;
    /// no I/O.
    #[must_use]
    pub fn new(name: impl Into<String>, options: PartOptions, work_dir: &Path) -> Self {
        let name = name.into();
        let paths = PartPaths::derive(work_dir, &name);
        Self {
            name,
            options,
            paths,
        }
    }

    /// The part's unique name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw options this part was constructed from.
    #[must_use]
    pub fn options(&self) -> &PartOptions {
        &self.options
    }

    /// Derived working paths for this part.
    #[must_use]
    pub fn paths(&self) -> &PartPaths {
        &self.paths
    }

    /// The names this part must run after (its direct `after` list).
    #[must_use]
    pub fn dependency_names(&self) -> &[String] {
        &self.options.after
    }
}

impl PartialEq for Part {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Part {}

impl std::hash::Hash for Part {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// Builds one [`Part`] per entry in `document`, rooted at `work_dir`.
///
/// Does not validate `after` references or check for cycles; callers
/// combine this with [`crate::topo::sort_parts`], which performs both
/// checks as a side effect of ordering.
#[must_use]
pub fn parts_from_document(document: &PartsDocument, work_dir: &Path) -> Vec<Part> {
    document
        .parts
        .iter()
        .map(|(name, options)| Part::new(name.clone(), options.clone(), work_dir))
        .collect()
}
