// Copyright 2026 the Partforge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference CLI driver for `partforge-core`: loads a parts document, plans
//! a lifecycle run, and (unless `--dry-run`) executes it against a
//! [`MarkerExecutor`].

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use partforge_core::error::UserError;
use partforge_core::part::PartsDocument;
use partforge_core::stepinfo::LifecycleConfig;
use partforge_core::{LifecycleManager, MarkerExecutor, Step};

/// Plan and run a four-step (pull/build/stage/prime) part lifecycle.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Step to bring every selected part up to: pull, build, stage, or
    /// prime.
    #[arg(default_value = "prime")]
    target_step: Step,

    /// Parts to restrict the plan to (others still run as dependency
    /// prerequisites where needed). Empty means every part.
    part_name: Vec<String>,

    /// Path to the YAML parts document.
    #[arg(long, default_value = "parts.yaml")]
    parts_file: PathBuf,

    /// Root working directory parts are rooted under.
    #[arg(long, default_value = ".partforge")]
    work_dir: PathBuf,

    /// Target architecture (kernel/`uname -m` form, e.g. `x86_64`).
    #[arg(long, default_value_t = std::env::consts::ARCH.to_string())]
    target_arch: String,

    /// Platform identifier passed through to the executor.
    #[arg(long)]
    platform_id: Option<String>,

    /// Platform version identifier passed through to the executor.
    #[arg(long)]
    platform_version_id: Option<String>,

    /// Upper bound on concurrent build jobs a plugin may request.
    #[arg(long, default_value_t = 1)]
    parallel_build_count: u32,

    /// Additional directory to search for local plugins.
    #[arg(long)]
    local_plugins_dir: Option<PathBuf>,

    /// Extra build packages to install before any part's BUILD step. May be
    /// given more than once or comma-separated.
    #[arg(long, value_delimiter = ',')]
    build_packages: Vec<String>,

    /// Arbitrary extra `key=value` configuration, for keys with no
    /// dedicated flag. May be given more than once.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    extra: Vec<String>,

    /// Print the plan without executing it.
    #[arg(long)]
    dry_run: bool,

    /// Enable debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.brief());
            eprintln!("  resolution: {}", err.resolution());
            if let Some(details) = err.details() {
                eprintln!("  details: {details}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), partforge_core::LifecycleError> {
    let yaml = fs::read_to_string(&args.parts_file).map_err(|err| {
        partforge_core::LifecycleError::executor(std::io::Error::new(
            err.kind(),
            format!("reading {}: {err}", args.parts_file.display()),
        ))
    })?;

    let document: PartsDocument = serde_yaml::from_str(&yaml).map_err(|err| {
        partforge_core::LifecycleError::Internal(format!(
            "{}: invalid parts document: {err}",
            args.parts_file.display()
        ))
    })?;

    let mut config = LifecycleConfig::new(&args.work_dir, &args.target_arch);
    config.platform_id = args.platform_id;
    config.platform_version_id = args.platform_version_id;
    config.parallel_build_count = args.parallel_build_count;
    config.local_plugins_dir = args.local_plugins_dir;
    config.build_packages = args.build_packages;
    for entry in &args.extra {
        let (key, value) = entry.split_once('=').ok_or_else(|| {
            partforge_core::LifecycleError::Internal(format!(
                "--set {entry}: expected KEY=VALUE"
            ))
        })?;
        config
            .passthrough
            .insert(key.to_string(), serde_yaml::Value::String(value.to_string()));
    }

    let mut executor = MarkerExecutor::new();
    let mut manager = LifecycleManager::new(&document, config, &executor)?;

    if args.dry_run {
        let plan = manager.actions(args.target_step, &args.part_name)?;
        for action in &plan {
            println!("{action}");
        }
        return Ok(());
    }

    let plan = manager.execute(args.target_step, &args.part_name, &mut executor)?;
    for action in &plan {
        println!("{action}");
    }
    Ok(())
}
