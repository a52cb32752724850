//! `prebake build`: run the inputs and write the serialized heap.

use super::{load_units, resolve_options, SerializerFlags};
use crate::output::StyledOutput;
use anyhow::Context;
use prebake_engine::{HeapGraphFormat, Serializer};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use termcolor::ColorChoice;

/// Arguments of `prebake build`
pub struct BuildArgs {
    pub files: Vec<PathBuf>,
    pub out: Option<PathBuf>,
    pub heap_graph_out: Option<PathBuf>,
    pub stats: bool,
    pub flags: SerializerFlags,
    pub config: Option<PathBuf>,
    pub color: ColorChoice,
}

#[derive(Serialize)]
struct StatsReport<'a> {
    statistics: &'a prebake_engine::SerializerStatistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    timings: Option<&'a prebake_engine::TimingStatistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    react: Option<&'a prebake_engine::ReactStatistics>,
    #[serde(skip_serializing_if = "no_modules")]
    modules: &'a prebake_engine::ModuleReport,
}

fn no_modules(report: &&prebake_engine::ModuleReport) -> bool {
    report.is_empty()
}

/// Returns `Ok(false)` when the serializer reported errors.
pub fn execute(args: BuildArgs) -> anyhow::Result<bool> {
    let options = resolve_options(args.config.as_deref(), &args.flags)?;
    let units = load_units(&args.files, args.flags.module_prelude)?;
    let mut output = StyledOutput::new(args.color);

    let mut serializer = Serializer::new(options.clone());
    let outcome = serializer.init(&units);
    output.diagnostics(serializer.diagnostics(), &units);

    let result = match outcome {
        Ok(Some(result)) => result,
        Ok(None) => {
            let count = serializer.diagnostics().error_count();
            output.error_line(&format!("serialization failed with {} error(s)", count));
            return Ok(false);
        }
        // Fatal errors are already in the diagnostic log
        Err(prebake_engine::SerializerError::Fatal { .. }) => return Ok(false),
        Err(e) => return Err(e).context("serialization failed"),
    };

    match &args.out {
        Some(path) => {
            write_file(path, &result.code)?;
            output.success_line("wrote", &path.display().to_string());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(result.code.as_bytes())?;
            stdout.flush()?;
        }
    }

    if let Some(map) = &result.source_map {
        match &args.out {
            Some(path) => {
                let map_path = with_suffix(path, ".map");
                write_file(&map_path, &map.to_json()?)?;
                output.success_line("wrote", &map_path.display().to_string());
            }
            None => output.warning_line("source map skipped: no --out file"),
        }
    }

    if let (Some(graph), Some(format)) = (&result.heap_graph, options.heap_graph_format) {
        let extension = match format {
            HeapGraphFormat::DotLanguage => ".dot",
            HeapGraphFormat::VisJs => ".json",
        };
        let path = args
            .heap_graph_out
            .clone()
            .or_else(|| args.out.as_ref().map(|out| with_suffix(out, extension)));
        match path {
            Some(path) => {
                write_file(&path, graph)?;
                output.success_line("wrote", &path.display().to_string());
            }
            None => output.warning_line("heap graph skipped: no --heap-graph-out or --out file"),
        }
    }

    if args.stats {
        output.json(&StatsReport {
            statistics: &result.statistics,
            timings: result.timings.as_ref(),
            react: result.react_statistics.as_ref(),
            modules: &result.modules,
        })?;
    }
    Ok(true)
}

fn write_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

/// `out.js` + `.map` -> `out.js.map`
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_suffix_appends() {
        assert_eq!(with_suffix(Path::new("dist/out.js"), ".map"), PathBuf::from("dist/out.js.map"));
    }
}
