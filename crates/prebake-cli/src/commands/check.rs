//! `prebake check`: run the pipeline and report diagnostics only.

use super::{load_units, resolve_options, SerializerFlags};
use crate::output::StyledOutput;
use anyhow::Context;
use prebake_engine::{Serializer, SerializerError};
use std::path::PathBuf;
use termcolor::ColorChoice;

pub fn execute(
    files: Vec<PathBuf>,
    flags: SerializerFlags,
    config: Option<PathBuf>,
    color: ColorChoice,
) -> anyhow::Result<bool> {
    let options = resolve_options(config.as_deref(), &flags)?;
    let units = load_units(&files, flags.module_prelude)?;
    let mut output = StyledOutput::new(color);

    let mut serializer = Serializer::new(options);
    let outcome = serializer.init(&units);
    output.diagnostics(serializer.diagnostics(), &units);

    match outcome {
        Ok(Some(result)) => {
            let summary = format!(
                "{} file(s), {} declaration(s), {} scope(s)",
                units.len(),
                result.statistics.declarations,
                result.statistics.scopes
            );
            output.success_line("ok", &summary);
            Ok(true)
        }
        Ok(None) | Err(SerializerError::Fatal { .. }) => Ok(false),
        Err(e) => Err(e).context("serialization failed"),
    }
}
