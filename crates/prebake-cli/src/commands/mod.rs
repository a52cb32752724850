//! Subcommands and the serializer flags they share.

pub mod build;
pub mod check;

use crate::config::Config;
use anyhow::Context;
use clap::Args;
use prebake_engine::{HeapGraphFormat, SerializerOptions, SourceUnit, MODULE_PRELUDE};
use std::path::{Path, PathBuf};

/// Name of the source unit holding the module prelude
pub const PRELUDE_UNIT: &str = "<module-prelude>";

/// Serializer flags. Each one overrides the configuration file when given.
#[derive(Debug, Clone, Default, Args)]
pub struct SerializerFlags {
    /// Count references first and inline values used once
    #[arg(long)]
    pub inline_expressions: bool,

    /// Emit objects through this lazy-object runtime global
    #[arg(long, value_name = "GLOBAL")]
    pub lazy_objects_runtime: Option<String>,

    /// Export the residual heap graph (dot-language or vis-js)
    #[arg(long, value_name = "FORMAT")]
    pub heap_graph: Option<HeapGraphFormat>,

    /// Force initialization of modules global code did not require
    #[arg(long)]
    pub initialize_more_modules: bool,

    /// Leave modules that fail to initialize uninitialized, with a warning
    #[arg(long)]
    pub delay_unsupported_requires: bool,

    /// Retry failed module initializations while others make progress
    #[arg(long)]
    pub accelerate_unsupported_requires: bool,

    /// Prepend the `__d`/`require` module prelude
    #[arg(long)]
    pub module_prelude: bool,

    /// Remove type annotations from the output
    #[arg(long)]
    pub strip_types: bool,

    /// Write a source map next to the output
    #[arg(long)]
    pub source_map: bool,

    /// Collect per-phase timings
    #[arg(long)]
    pub profile: bool,

    /// Log serializer statistics
    #[arg(long)]
    pub log_statistics: bool,

    /// Log initialized modules
    #[arg(long)]
    pub log_modules: bool,

    /// Dump internal tables at debug level
    #[arg(long)]
    pub internal_debug: bool,

    /// Trace interpreter calls at debug level
    #[arg(long)]
    pub trace: bool,
}

impl SerializerFlags {
    /// Apply the flags that were given on top of `options`
    pub fn apply(&self, options: &mut SerializerOptions) {
        let switches = [
            (self.inline_expressions, &mut options.inline_expressions),
            (self.initialize_more_modules, &mut options.initialize_more_modules),
            (self.delay_unsupported_requires, &mut options.delay_unsupported_requires),
            (
                self.accelerate_unsupported_requires,
                &mut options.accelerate_unsupported_requires,
            ),
            (self.strip_types, &mut options.strip_type_annotations),
            (self.source_map, &mut options.source_maps),
            (self.profile, &mut options.profile),
            (self.log_statistics, &mut options.log_statistics),
            (self.log_modules, &mut options.log_modules),
            (self.internal_debug, &mut options.internal_debug),
            (self.trace, &mut options.trace),
        ];
        for (given, option) in switches {
            if given {
                *option = true;
            }
        }
        if let Some(runtime) = &self.lazy_objects_runtime {
            options.lazy_objects_runtime = Some(runtime.clone());
        }
        if let Some(format) = self.heap_graph {
            options.heap_graph_format = Some(format);
        }
    }
}

/// Options from the configuration file with `flags` applied
pub fn resolve_options(
    config: Option<&Path>,
    flags: &SerializerFlags,
) -> anyhow::Result<SerializerOptions> {
    let mut options = Config::load(config)?.serializer;
    flags.apply(&mut options);
    tracing::debug!(?options, "serializer options");
    Ok(options)
}

/// Read `files` as source units, the module prelude first when requested
pub fn load_units(files: &[PathBuf], module_prelude: bool) -> anyhow::Result<Vec<SourceUnit>> {
    let mut units = Vec::with_capacity(files.len() + 1);
    if module_prelude {
        units.push(SourceUnit::new(PRELUDE_UNIT, MODULE_PRELUDE));
    }
    for file in files {
        let contents = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        units.push(SourceUnit::new(file.display().to_string(), contents));
    }
    Ok(units)
}
