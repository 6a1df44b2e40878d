// Copyright 2026 the Partforge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Run-wide configuration and architecture metadata.
//!
//! Grounded on `original_source/partbuilder/_stepinfo.py`: the architecture
//! translation table and the cross-compilation properties it derives are
//! carried over verbatim in meaning, restated as a Rust lookup table.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// One entry of the architecture translation table: the Debian-style arch
/// name mapped to its triplet, kernel name and Debian multiarch fragments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArchTranslation {
    /// Debian architecture name (e.g. `"amd64"`).
    pub deb_arch: &'static str,
    /// GCC/LLVM target triplet fragment (e.g. `"x86_64-linux-gnu"`).
    pub triplet: &'static str,
    /// Kernel `uname -m` name (e.g. `"x86_64"`).
    pub kernel: &'static str,
}

/// The architecture translation table, keyed by kernel name (what
/// `uname -m` / Rust's `std::env::consts::ARCH` reports).
///
/// Mirrors `_ARCH_TRANSLATIONS` in `_stepinfo.py`.
const ARCH_TRANSLATIONS: &[ArchTranslation] = &[
    ArchTranslation { kernel: "aarch64", deb_arch: "arm64", triplet: "aarch64-linux-gnu" },
    ArchTranslation { kernel: "armv7l", deb_arch: "armhf", triplet: "arm-linux-gnueabihf" },
    ArchTranslation { kernel: "i686", deb_arch: "i386", triplet: "i386-linux-gnu" },
    ArchTranslation { kernel: "ppc", deb_arch: "powerpc", triplet: "powerpc-linux-gnu" },
    ArchTranslation { kernel: "ppc64le", deb_arch: "ppc64el", triplet: "powerpc64le-linux-gnu" },
    ArchTranslation { kernel: "riscv64", deb_arch: "riscv64", triplet: "riscv64-linux-gnu" },
    ArchTranslation { kernel: "s390x", deb_arch: "s390x", triplet: "s390x-linux-gnu" },
    ArchTranslation { kernel: "x86_64", deb_arch: "amd64", triplet: "x86_64-linux-gnu" },
];

/// Looks up the translation entry for a kernel architecture name.
#[must_use]
pub fn lookup_arch(kernel_arch: &str) -> Option<&'static ArchTranslation> {
    ARCH_TRANSLATIONS.iter().find(|t| t.kernel == kernel_arch)
}

/// Per-run architecture and cross-compilation metadata.
///
/// Constructed once for a [`crate::facade::LifecycleManager`] run from the
/// host's native architecture plus an optional target override.
#[derive(Clone, Debug)]
pub struct StepInfo {
    host_arch: String,
    target_arch: String,
}

impl StepInfo {
    /// Builds step info for `target_arch`, detecting the host architecture
    /// from `std::env::consts::ARCH`.
    #[must_use]
    pub fn new(target_arch: impl Into<String>) -> Self {
        Self {
            host_arch: std::env::consts::ARCH.to_string(),
            target_arch: target_arch.into(),
        }
    }

    /// Builds step info for an explicit `(host_arch, target_arch)` pair,
    /// bypassing host detection (used by tests and cross-building CI).
    #[must_use]
    pub fn with_host(host_arch: impl Into<String>, target_arch: impl Into<String>) -> Self {
        Self {
            host_arch: host_arch.into(),
            target_arch: target_arch.into(),
        }
    }

    /// The build host's architecture, in kernel (`uname -m`) form.
    #[must_use]
    pub fn host_arch(&self) -> &str {
        &self.host_arch
    }

    /// The target architecture, in kernel (`uname -m`) form.
    #[must_use]
    pub fn target_arch(&self) -> &str {
        &self.target_arch
    }

    /// `true` if the target architecture differs from the host's.
    #[must_use]
    pub fn is_cross_compiling(&self) -> bool {
        self.host_arch != self.target_arch
    }

    /// The target's GCC/LLVM triplet, if the architecture is recognized.
    #[must_use]
    pub fn arch_triplet(&self) -> Option<&'static str> {
        lookup_arch(&self.target_arch).map(|t| t.triplet)
    }

    /// The target's Debian architecture name, if recognized.
    #[must_use]
    pub fn deb_arch(&self) -> Option<&'static str> {
        lookup_arch(&self.target_arch).map(|t| t.deb_arch)
    }
}

/// Run-wide configuration for one [`crate::facade::LifecycleManager`]
/// invocation.
///
/// Corresponds to the constructor arguments of
/// `original_source/partbuilder/_manager.py::LifecycleManager`, trimmed to
/// the fields this crate actually threads through (plugin registration and
/// callback hooks are out of scope; see SPEC_FULL.md's Non-goals).
#[derive(Clone, Debug)]
pub struct LifecycleConfig {
    /// Root working directory; parts are rooted at `work_dir/<name>`.
    pub work_dir: PathBuf,
    /// Architecture/cross-compilation metadata for this run.
    pub step_info: StepInfo,
    /// Platform identifier (e.g. `"ubuntu"`), passed through to plugins.
    pub platform_id: Option<String>,
    /// Platform version identifier (e.g. `"24.04"`), passed through to
    /// plugins.
    pub platform_version_id: Option<String>,
    /// Upper bound on concurrent build jobs a plugin may request.
    pub parallel_build_count: u32,
    /// Additional directory to search for local plugins.
    pub local_plugins_dir: Option<PathBuf>,
    /// Extra build packages to install before running any part's BUILD step.
    /// Unused by the planning engine itself — carried through for an
    /// executor to consult, per spec.md §6's constructor-options table.
    pub build_packages: Vec<String>,
    /// Project-wide option values, used as the default
    /// [`crate::ephemeral::CurrentInputs`] project-options snapshot.
    pub project_options: BTreeMap<String, String>,
    /// Arbitrary extra configuration keys with no dedicated field, carried
    /// verbatim for the executor/plugins (mirrors [`crate::part::PartOptions::passthrough`]
    /// at the project level rather than the per-part one).
    pub passthrough: BTreeMap<String, serde_yaml::Value>,
}

impl LifecycleConfig {
    /// Builds a minimal configuration with the given `work_dir` and target
    /// architecture, and every other field at its default.
    #[must_use]
    pub fn new(work_dir: impl Into<PathBuf>, target_arch: impl Into<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            step_info: StepInfo::new(target_arch),
            platform_id: None,
            platform_version_id: None,
            parallel_build_count: 1,
            local_plugins_dir: None,
            build_packages: Vec::new(),
            project_options: BTreeMap::new(),
            passthrough: BTreeMap::new(),
        }
    }
}
